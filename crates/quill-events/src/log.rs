//! Append-only, day-partitioned JSONL event log.
//!
//! One file per UTC calendar day (`YYYY-MM-DD.jsonl`) under the queue
//! directory. Appends take an exclusive advisory lock on the partition
//! file itself, so concurrent producer processes serialize but never
//! corrupt or truncate each other's records. Reads are lazy and tolerant:
//! a malformed line is logged and skipped, never fatal.

use std::collections::{BTreeMap, VecDeque};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Lines, Write};
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, Utc};
use tracing::{debug, warn};

use quill_core::FileLock;

use crate::errors::Result;
use crate::types::QueuedEvent;

/// Append-only event log rooted at a queue directory.
#[derive(Clone, Debug)]
pub struct EventLog {
    queue_dir: PathBuf,
}

impl EventLog {
    /// Create an event log over `queue_dir` (created lazily on append).
    #[must_use]
    pub fn new(queue_dir: impl Into<PathBuf>) -> Self {
        Self {
            queue_dir: queue_dir.into(),
        }
    }

    /// The queue directory this log reads and writes.
    #[must_use]
    pub fn queue_dir(&self) -> &Path {
        &self.queue_dir
    }

    /// Partition file path for a calendar day.
    #[must_use]
    pub fn partition_path(&self, date: NaiveDate) -> PathBuf {
        self.queue_dir
            .join(format!("{}.jsonl", date.format("%Y-%m-%d")))
    }

    /// Append one event to today's partition.
    ///
    /// Opens the partition in append mode, takes an exclusive `flock` on
    /// it, writes a single JSON line, and releases. Crash-atomic with
    /// respect to a single writer holding the lock.
    pub fn append(&self, event: &QueuedEvent) -> Result<()> {
        std::fs::create_dir_all(&self.queue_dir)?;
        let path = self.partition_path(Utc::now().date_naive());

        let file = OpenOptions::new().append(true).create(true).open(&path)?;
        let mut lock = FileLock::acquire(file)?;

        let mut line = event.to_json_line()?;
        line.push('\n');
        lock.file_mut().write_all(line.as_bytes())?;
        lock.file_mut().flush()?;
        Ok(())
    }

    /// Partition files in chronological (lexicographic) order.
    #[must_use]
    pub fn partition_files(&self) -> Vec<PathBuf> {
        let Ok(entries) = std::fs::read_dir(&self.queue_dir) else {
            return Vec::new();
        };
        let mut files: Vec<PathBuf> = entries
            .filter_map(std::result::Result::ok)
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "jsonl"))
            .collect();
        files.sort();
        files
    }

    /// Lazy sequence of every event, in file-then-intra-file order.
    ///
    /// Malformed lines and unreadable partitions are skipped with a
    /// warning; iteration never aborts on them.
    #[must_use]
    pub fn read_all(&self) -> EventIter {
        EventIter {
            pending: self.partition_files().into(),
            lines: None,
        }
    }

    /// All events grouped by session id, preserving log order per session.
    #[must_use]
    pub fn events_by_session(&self) -> BTreeMap<String, Vec<QueuedEvent>> {
        let mut sessions: BTreeMap<String, Vec<QueuedEvent>> = BTreeMap::new();
        for event in self.read_all() {
            sessions.entry(event.session_id.clone()).or_default().push(event);
        }
        sessions
    }

    /// All events for one session, in log order.
    #[must_use]
    pub fn events_for_session(&self, session_id: &str) -> Vec<QueuedEvent> {
        self.read_all()
            .filter(|event| event.session_id == session_id)
            .collect()
    }

    /// Delete partitions older than `keep_days` (by date stem).
    ///
    /// Files whose stem is not a `YYYY-MM-DD` date are left alone. Returns
    /// the number of partitions removed.
    pub fn sweep_partitions(&self, keep_days: u32) -> Result<usize> {
        let today = Utc::now().date_naive();
        let mut removed = 0;
        for path in self.partition_files() {
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let Ok(date) = NaiveDate::parse_from_str(stem, "%Y-%m-%d") else {
                continue;
            };
            let age_days = (today - date).num_days();
            if age_days > i64::from(keep_days) {
                debug!(partition = %path.display(), age_days, "removing aged partition");
                std::fs::remove_file(&path)?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}

/// Lazy iterator over all events in the log.
///
/// Restartable by calling [`EventLog::read_all`] again; the underlying
/// files are immutable apart from appends, which a restarted read will
/// simply pick up.
#[derive(Debug)]
pub struct EventIter {
    pending: VecDeque<PathBuf>,
    lines: Option<Lines<BufReader<File>>>,
}

impl Iterator for EventIter {
    type Item = QueuedEvent;

    fn next(&mut self) -> Option<QueuedEvent> {
        loop {
            if let Some(lines) = &mut self.lines {
                for line in lines.by_ref() {
                    let line = match line {
                        Ok(line) => line,
                        Err(err) => {
                            warn!(error = %err, "unreadable line in event partition, skipping rest of file");
                            break;
                        }
                    };
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    match QueuedEvent::from_json_line(trimmed) {
                        Ok(event) => return Some(event),
                        Err(err) => {
                            warn!(error = %err, "malformed event record, skipping");
                        }
                    }
                }
                self.lines = None;
            }

            let path = self.pending.pop_front()?;
            match File::open(&path) {
                Ok(file) => self.lines = Some(BufReader::new(file).lines()),
                Err(err) => {
                    warn!(partition = %path.display(), error = %err, "cannot open partition, skipping");
                }
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EventKind;
    use serde_json::json;
    use tempfile::TempDir;

    fn event(session: &str, kind: &str) -> QueuedEvent {
        QueuedEvent::from_hook_input(json!({
            "session_id": session,
            "hook_event_name": kind,
        }))
    }

    #[test]
    fn append_then_read_round_trip() {
        let dir = TempDir::new().unwrap();
        let log = EventLog::new(dir.path());

        log.append(&event("s1", "SessionStart")).unwrap();
        log.append(&event("s1", "UserPromptSubmit")).unwrap();

        let events: Vec<_> = log.read_all().collect();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind, EventKind::SessionStart);
        assert_eq!(events[1].kind, EventKind::UserPromptSubmit);
    }

    #[test]
    fn read_all_on_missing_dir_is_empty() {
        let dir = TempDir::new().unwrap();
        let log = EventLog::new(dir.path().join("absent"));
        assert_eq!(log.read_all().count(), 0);
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let dir = TempDir::new().unwrap();
        let log = EventLog::new(dir.path());
        log.append(&event("s1", "SessionStart")).unwrap();

        // Corrupt the partition with junk lines between valid records.
        let path = log.partition_files()[0].clone();
        let mut content = std::fs::read_to_string(&path).unwrap();
        content.push_str("{truncated\n\n");
        let good = event("s1", "Stop");
        content.push_str(&good.to_json_line().unwrap());
        content.push('\n');
        std::fs::write(&path, content).unwrap();

        let events: Vec<_> = log.read_all().collect();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].kind, EventKind::Stop);
    }

    #[test]
    fn partitions_read_in_chronological_order() {
        let dir = TempDir::new().unwrap();
        let log = EventLog::new(dir.path());
        std::fs::create_dir_all(dir.path()).unwrap();

        let older = event("s1", "SessionStart");
        let newer = event("s1", "Stop");
        std::fs::write(
            dir.path().join("2025-01-14.jsonl"),
            format!("{}\n", older.to_json_line().unwrap()),
        )
        .unwrap();
        std::fs::write(
            dir.path().join("2025-01-15.jsonl"),
            format!("{}\n", newer.to_json_line().unwrap()),
        )
        .unwrap();

        let events: Vec<_> = log.read_all().collect();
        assert_eq!(events[0].kind, EventKind::SessionStart);
        assert_eq!(events[1].kind, EventKind::Stop);
    }

    #[test]
    fn events_by_session_groups_in_order() {
        let dir = TempDir::new().unwrap();
        let log = EventLog::new(dir.path());
        log.append(&event("a", "SessionStart")).unwrap();
        log.append(&event("b", "SessionStart")).unwrap();
        log.append(&event("a", "Stop")).unwrap();

        let grouped = log.events_by_session();
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped["a"].len(), 2);
        assert_eq!(grouped["a"][1].kind, EventKind::Stop);
        assert_eq!(grouped["b"].len(), 1);
    }

    #[test]
    fn sweep_removes_only_aged_date_partitions() {
        let dir = TempDir::new().unwrap();
        let log = EventLog::new(dir.path());
        std::fs::create_dir_all(dir.path()).unwrap();
        std::fs::write(dir.path().join("2020-01-01.jsonl"), "").unwrap();
        std::fs::write(dir.path().join("notes.jsonl"), "").unwrap();
        let today = Utc::now().date_naive();
        std::fs::write(log.partition_path(today), "").unwrap();

        let removed = log.sweep_partitions(7).unwrap();
        assert_eq!(removed, 1);
        assert!(!dir.path().join("2020-01-01.jsonl").exists());
        assert!(dir.path().join("notes.jsonl").exists());
        assert!(log.partition_path(today).exists());
    }

    #[test]
    fn appends_go_to_todays_partition() {
        let dir = TempDir::new().unwrap();
        let log = EventLog::new(dir.path());
        log.append(&event("s1", "SessionStart")).unwrap();

        let expected = log.partition_path(Utc::now().date_naive());
        assert!(expected.exists());
    }
}
