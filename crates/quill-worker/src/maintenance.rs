//! Retention sweeps for pipeline-internal files.
//!
//! Only files under `.quill/` are ever candidates: aged event log
//! partitions, aggregates for long-finished sessions, and stale lock
//! sentinels. Notes in the vault are never touched.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use chrono::Utc;
use tracing::{debug, info};

use quill_core::parse_iso;

use crate::context::WorkerContext;
use crate::errors::Result;

/// What a sweep found, and whether it acted.
#[derive(Clone, Debug, Default)]
pub struct SweepReport {
    /// Aged files, grouped for display.
    pub partitions: Vec<PathBuf>,
    /// Aggregates whose sessions ended past the retention window.
    pub aggregates: Vec<PathBuf>,
    /// Lock sentinels not touched within the retention window.
    pub locks: Vec<PathBuf>,
    /// Whether the candidates were actually removed.
    pub executed: bool,
}

impl SweepReport {
    /// Total candidate count.
    #[must_use]
    pub fn total(&self) -> usize {
        self.partitions.len() + self.aggregates.len() + self.locks.len()
    }
}

/// Find (and with `execute`, remove) aged pipeline files.
pub fn sweep(ctx: &WorkerContext, execute: bool) -> Result<SweepReport> {
    let queue_keep = ctx.settings.retention.queue_keep_days;
    let state_keep = ctx.settings.retention.state_keep_days;

    let mut report = SweepReport {
        executed: execute,
        ..SweepReport::default()
    };

    // Event log partitions, by date stem.
    let today = Utc::now().date_naive();
    for path in ctx.log.partition_files() {
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let Ok(date) = chrono::NaiveDate::parse_from_str(stem, "%Y-%m-%d") else {
            continue;
        };
        if (today - date).num_days() > i64::try_from(queue_keep).unwrap_or(i64::MAX) {
            report.partitions.push(path);
        }
    }

    // Aggregates, by their own last-event timestamp (mtime as fallback).
    let now = Utc::now();
    for session_id in ctx.store.session_ids() {
        let path = ctx.store.state_path(&session_id);
        let aged = match ctx.store.load(&session_id).and_then(|s| parse_iso(&s.last_event_ts)) {
            Some(last) => (now - last).num_days() > i64::try_from(state_keep).unwrap_or(i64::MAX),
            None => mtime_older_than(&path, state_keep),
        };
        if aged {
            report.aggregates.push(path);
        }
    }

    // Stale lock sentinels in both lock directories.
    for dir in [ctx.store.state_dir().to_path_buf(), ctx.settings.note_lock_dir()] {
        collect_stale_locks(&dir, state_keep, &mut report.locks);
    }

    if execute {
        for path in report
            .partitions
            .iter()
            .chain(&report.aggregates)
            .chain(&report.locks)
        {
            debug!(path = %path.display(), "removing aged file");
            std::fs::remove_file(path)?;
        }
        if report.total() > 0 {
            info!(removed = report.total(), "retention sweep removed aged files");
        }
    }
    Ok(report)
}

fn collect_stale_locks(dir: &Path, keep_days: u64, out: &mut Vec<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.filter_map(std::result::Result::ok) {
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "lock") && mtime_older_than(&path, keep_days) {
            out.push(path);
        }
    }
}

fn mtime_older_than(path: &Path, keep_days: u64) -> bool {
    let Ok(meta) = std::fs::metadata(path) else {
        return false;
    };
    let Ok(mtime) = meta.modified() else {
        return false;
    };
    let cutoff = Duration::from_secs(keep_days.saturating_mul(86_400));
    SystemTime::now()
        .duration_since(mtime)
        .is_ok_and(|age| age > cutoff)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use quill_settings::QuillSettings;
    use tempfile::TempDir;

    fn context(dir: &TempDir) -> WorkerContext {
        let settings = QuillSettings {
            vault_root: dir.path().to_string_lossy().into_owned(),
            ..QuillSettings::default()
        };
        WorkerContext::from_settings(settings)
    }

    #[test]
    fn dry_run_reports_without_removing() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir);
        let queue = ctx.settings.queue_dir();
        std::fs::create_dir_all(&queue).unwrap();
        let old_partition = queue.join("2020-01-01.jsonl");
        std::fs::write(&old_partition, "{}\n").unwrap();

        let report = sweep(&ctx, false).unwrap();
        assert_eq!(report.partitions, vec![old_partition.clone()]);
        assert!(!report.executed);
        assert!(old_partition.exists());
    }

    #[test]
    fn execute_removes_aged_partitions_only() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir);
        let queue = ctx.settings.queue_dir();
        std::fs::create_dir_all(&queue).unwrap();
        let old_partition = queue.join("2020-01-01.jsonl");
        let today = Utc::now().date_naive().format("%Y-%m-%d").to_string();
        let fresh_partition = queue.join(format!("{today}.jsonl"));
        std::fs::write(&old_partition, "{}\n").unwrap();
        std::fs::write(&fresh_partition, "{}\n").unwrap();

        let report = sweep(&ctx, true).unwrap();
        assert!(report.executed);
        assert!(!old_partition.exists());
        assert!(fresh_partition.exists());
    }

    #[test]
    fn non_date_files_are_left_alone() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir);
        let queue = ctx.settings.queue_dir();
        std::fs::create_dir_all(&queue).unwrap();
        let odd = queue.join("README.jsonl");
        std::fs::write(&odd, "not a partition\n").unwrap();

        let report = sweep(&ctx, true).unwrap();
        assert_eq!(report.total(), 0);
        assert!(odd.exists());
    }

    #[test]
    fn aged_aggregate_is_a_candidate() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir);
        std::fs::create_dir_all(ctx.store.state_dir()).unwrap();
        let mut state = quill_state::SessionState::new(
            "old-session",
            "2020-01-01T00:00:00Z",
            "/tmp",
            "",
        );
        state.last_event_ts = "2020-01-02T00:00:00Z".to_string();
        ctx.store.save(&state).unwrap();

        let report = sweep(&ctx, false).unwrap();
        assert_eq!(report.aggregates.len(), 1);
    }
}
