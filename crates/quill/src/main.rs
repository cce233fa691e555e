//! # quill
//!
//! Command-line entry point — wires settings, the event log, and the
//! worker together.
//!
//! `enqueue` is the producer side, called from activity hooks: it reads
//! one JSON payload from stdin, appends it to the log, and always exits 0
//! so a broken pipeline can never fail the process being recorded. All
//! other subcommands are consumer-side.

#![deny(unsafe_code)]

mod logging;

use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use quill_events::{EventLog, event_from_hook_json};
use quill_settings::QuillSettings;
use quill_worker::{WorkerContext, drain, process_session_by_id, run_daemon, status, sweep};

use crate::logging::{LogConfig, LogFormat, init_logging};

/// Event-sourced session notes for a markdown vault.
#[derive(Parser, Debug)]
#[command(name = "quill", version, about = "Event-sourced session notes for a markdown vault")]
struct Cli {
    /// Settings file (defaults to `~/.quill/settings.json`).
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Vault root, overriding settings and environment.
    #[arg(long, global = true)]
    vault: Option<PathBuf>,

    /// Emit logs as JSON instead of plaintext.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Append one hook payload from stdin to the event log. Always exits 0.
    Enqueue,
    /// Run the polling worker daemon until interrupted.
    Worker,
    /// Flush everything pending once, bypassing debounce.
    Drain,
    /// Re-run materialization for one session, rewriting its note.
    Process {
        /// Session id to re-process.
        session_id: String,
    },
    /// Show per-session pipeline status.
    Status,
    /// List (or with --execute, remove) aged pipeline files.
    Clean {
        /// Actually remove the files instead of listing them.
        #[arg(long)]
        execute: bool,
    },
}

fn load_settings(cli: &Cli) -> QuillSettings {
    let mut settings = match &cli.settings {
        Some(path) => quill_settings::load_settings_from_path(path).unwrap_or_else(|err| {
            warn!(%err, path = %path.display(), "settings load failed, using defaults");
            QuillSettings::default()
        }),
        None => quill_settings::load_settings().unwrap_or_default(),
    };
    if let Some(vault) = &cli.vault {
        settings.vault_root = vault.to_string_lossy().into_owned();
    }
    settings
}

/// Producer side: append one event, never fail the caller.
///
/// Any problem here — unreadable stdin, malformed JSON, a full disk — is
/// reported on stderr and swallowed. The recorded process must not be
/// disturbed by its recorder.
fn enqueue(settings: &QuillSettings) {
    let mut raw = String::new();
    if let Err(err) = std::io::stdin().read_to_string(&mut raw) {
        eprintln!("quill: failed to read stdin: {err}");
        return;
    }
    let event = match event_from_hook_json(&raw) {
        Ok(event) => event,
        Err(err) => {
            eprintln!("quill: malformed hook payload: {err}");
            return;
        }
    };
    if let Err(err) = EventLog::new(settings.queue_dir()).append(&event) {
        eprintln!("quill: failed to append event: {err}");
    }
}

/// Daemon log destination plus any format override from the CLI.
fn resolve_log_config(cli: &Cli, settings: &QuillSettings) -> LogConfig {
    let mut config = match cli.command {
        Command::Worker => LogConfig::daemon(&settings.log_dir()),
        _ => LogConfig::foreground(),
    };
    if cli.json {
        config.format = LogFormat::Json;
    }
    config
}

async fn run_worker(ctx: &WorkerContext) -> Result<()> {
    let (tx, rx) = tokio::sync::watch::channel(false);
    let _signal_task = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = tx.send(true);
        }
    });
    run_daemon(ctx, rx).await.context("worker daemon failed")
}

fn print_status(ctx: &WorkerContext) {
    let report = status(ctx);
    println!("vault:  {}", ctx.settings.vault_root_path().display());
    println!("queue:  {}", ctx.log.queue_dir().display());
    println!(
        "{} session(s), {} log partition(s)",
        report.sessions.len(),
        report.partitions
    );
    for s in &report.sessions {
        let written = if s.written { "written" } else { "pending" };
        let note = s
            .note_path
            .as_ref()
            .map_or_else(|| "-".to_string(), |p| p.display().to_string());
        println!(
            "  {}  events={} folded={} last={} [{written}] {note}",
            s.session_id,
            s.pending_events,
            s.folded_events,
            s.last_event_ts.as_deref().unwrap_or("-"),
        );
    }
}

fn print_clean(ctx: &WorkerContext, execute: bool) -> Result<()> {
    let report = sweep(ctx, execute)?;
    let verb = if execute { "removed" } else { "would remove" };
    println!(
        "{verb} {} file(s): {} partition(s), {} aggregate(s), {} lock(s)",
        report.total(),
        report.partitions.len(),
        report.aggregates.len(),
        report.locks.len()
    );
    if !execute {
        for path in report
            .partitions
            .iter()
            .chain(&report.aggregates)
            .chain(&report.locks)
        {
            println!("  {}", path.display());
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let settings = load_settings(&cli);

    // Enqueue is exit-0 by contract, logging init included.
    if matches!(cli.command, Command::Enqueue) {
        enqueue(&settings);
        return ExitCode::SUCCESS;
    }

    let log_config = resolve_log_config(&cli, &settings);
    if let Err(err) = init_logging(log_config) {
        eprintln!("quill: logging init failed: {err}");
        return ExitCode::FAILURE;
    }

    let ctx = WorkerContext::from_settings(settings);
    let result: Result<()> = match cli.command {
        Command::Enqueue => unreachable!("handled above"),
        Command::Worker => run_worker(&ctx).await,
        Command::Drain => {
            let report = drain(&ctx).await;
            info!(?report, "drain complete");
            println!(
                "{} session(s): {} flushed, {} skipped, {} error(s)",
                report.sessions,
                report.flushed,
                report.locked + report.not_materialized,
                report.errors
            );
            Ok(())
        }
        Command::Process { ref session_id } => process_session_by_id(&ctx, session_id)
            .await
            .map(|outcome| println!("{session_id}: {outcome:?}"))
            .map_err(Into::into),
        Command::Status => {
            print_status(&ctx);
            Ok(())
        }
        Command::Clean { execute } => print_clean(&ctx, execute),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("quill: {err:#}");
            ExitCode::FAILURE
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn json_flag_switches_the_log_format() {
        let settings = QuillSettings::default();

        let cli = Cli::parse_from(["quill", "--json", "status"]);
        assert_eq!(resolve_log_config(&cli, &settings).format, LogFormat::Json);

        let cli = Cli::parse_from(["quill", "status"]);
        assert_eq!(
            resolve_log_config(&cli, &settings).format,
            LogFormat::Plaintext
        );
    }

    #[test]
    fn worker_logs_to_a_file() {
        let settings = QuillSettings::default();
        let cli = Cli::parse_from(["quill", "worker"]);
        assert!(matches!(
            resolve_log_config(&cli, &settings).output,
            logging::LogOutput::File(_)
        ));
    }
}
