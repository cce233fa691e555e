//! Logging subsystem.
//!
//! Structured logging via tracing with JSON or plaintext output, to
//! stderr for foreground commands and to a dated file under the vault's
//! `.quill/logs/` directory for the daemon.
//!
//! # Environment Variables
//!
//! - `QUILL_LOG` - Primary log level/filter (takes precedence)
//! - `RUST_LOG` - Fallback log level/filter

use std::fs::OpenOptions;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

use tracing::Level;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Guard to track if logging has been initialized
static INIT_GUARD: OnceLock<()> = OnceLock::new();

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// JSON format for machine consumption
    Json,
    /// Human-readable plaintext
    #[default]
    Plaintext,
}

/// Log output destination
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LogOutput {
    /// Write to stderr (foreground commands; stdout stays clean for output)
    #[default]
    Stderr,
    /// Append to a file at the given path
    File(PathBuf),
}

/// Configuration for the logging subsystem
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Output format (JSON or plaintext)
    pub format: LogFormat,
    /// Output destination (stderr or file)
    pub output: LogOutput,
    /// Default log level when no env filter is set
    pub default_level: Level,
}

impl LogConfig {
    /// Foreground configuration: plaintext to stderr at info.
    pub fn foreground() -> Self {
        Self {
            format: LogFormat::Plaintext,
            output: LogOutput::Stderr,
            default_level: Level::INFO,
        }
    }

    /// Daemon configuration: plaintext appended to a dated file under the
    /// log directory.
    pub fn daemon(log_dir: &std::path::Path) -> Self {
        let date = chrono::Utc::now().format("%Y-%m-%d");
        Self {
            format: LogFormat::Plaintext,
            output: LogOutput::File(log_dir.join(format!("worker-{date}.log"))),
            default_level: Level::INFO,
        }
    }
}

/// Error type for logging initialization
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    /// Failed to create or open the log file
    #[error("failed to open log file: {0}")]
    FileOpen(#[from] io::Error),
    /// Invalid filter directive in `QUILL_LOG` / `RUST_LOG`
    #[error("failed to parse log filter: {0}")]
    FilterParse(#[from] tracing_subscriber::filter::ParseError),
    /// [`init_logging`] called twice
    #[error("logging already initialized")]
    AlreadyInitialized,
    /// Registry installation failed
    #[error("failed to initialize subscriber: {0}")]
    TryInit(#[from] tracing_subscriber::util::TryInitError),
}

/// Build an `EnvFilter` from environment variables or the default level.
///
/// Checks `QUILL_LOG` first, then `RUST_LOG`, falling back to the default.
fn build_env_filter(default_level: Level) -> Result<EnvFilter, LoggingError> {
    if let Ok(filter) = std::env::var("QUILL_LOG") {
        return Ok(EnvFilter::try_new(filter)?);
    }
    if let Ok(filter) = std::env::var("RUST_LOG") {
        return Ok(EnvFilter::try_new(filter)?);
    }
    Ok(EnvFilter::try_new(
        default_level.as_str().to_lowercase(),
    )?)
}

/// Initialize the logging subsystem with the given configuration.
///
/// Called once at startup; subsequent calls return an error.
pub fn init_logging(config: LogConfig) -> Result<(), LoggingError> {
    if INIT_GUARD.set(()).is_err() {
        return Err(LoggingError::AlreadyInitialized);
    }

    let filter = build_env_filter(config.default_level)?;
    let timer = UtcTime::rfc_3339();

    match (config.format, config.output) {
        (LogFormat::Json, LogOutput::Stderr) => {
            let layer = tracing_subscriber::fmt::layer()
                .json()
                .with_timer(timer)
                .with_target(true)
                .with_writer(io::stderr)
                .with_filter(filter);
            tracing_subscriber::registry().with(layer).try_init()?;
        }
        (LogFormat::Plaintext, LogOutput::Stderr) => {
            let layer = tracing_subscriber::fmt::layer()
                .with_timer(timer)
                .with_target(true)
                .with_writer(io::stderr)
                .with_filter(filter);
            tracing_subscriber::registry().with(layer).try_init()?;
        }
        (format, LogOutput::File(path)) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let file = Arc::new(OpenOptions::new().create(true).append(true).open(&path)?);
            match format {
                LogFormat::Json => {
                    let layer = tracing_subscriber::fmt::layer()
                        .json()
                        .with_timer(timer)
                        .with_target(true)
                        .with_ansi(false)
                        .with_writer(file)
                        .with_filter(filter);
                    tracing_subscriber::registry().with(layer).try_init()?;
                }
                LogFormat::Plaintext => {
                    let layer = tracing_subscriber::fmt::layer()
                        .with_timer(timer)
                        .with_target(true)
                        .with_ansi(false)
                        .with_writer(file)
                        .with_filter(filter);
                    tracing_subscriber::registry().with(layer).try_init()?;
                }
            }
        }
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
