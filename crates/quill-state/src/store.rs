//! Session aggregate store.
//!
//! One pretty-printed JSON file per session id under the state directory.
//! Saves are atomic (temp file + rename) so a reader never observes a
//! partially written aggregate. Folding is idempotent by event id and
//! filtered through the caller-supplied recursion predicate.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::warn;

use quill_core::{atomic_write, now_iso, parse_iso, short_id};
use quill_events::QueuedEvent;

use crate::errors::{Result, StateError};
use crate::filter::RecursionFilter;
use crate::summary::summarize_event;
use crate::types::SessionState;

/// Durable store of per-session aggregates.
#[derive(Clone, Debug)]
pub struct SessionStore {
    state_dir: PathBuf,
}

impl SessionStore {
    /// Create a store rooted at `state_dir` (created lazily on save).
    #[must_use]
    pub fn new(state_dir: impl Into<PathBuf>) -> Self {
        Self {
            state_dir: state_dir.into(),
        }
    }

    /// The directory holding aggregate files.
    #[must_use]
    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }

    /// Aggregate file path for a session id.
    #[must_use]
    pub fn state_path(&self, session_id: &str) -> PathBuf {
        self.state_dir.join(format!("{session_id}.json"))
    }

    /// Load the persisted aggregate, or `None` if absent.
    ///
    /// A malformed aggregate file is treated as absent (logged, not fatal)
    /// — the retention sweep may have raced us, or the record may be from
    /// an incompatible version.
    #[must_use]
    pub fn load(&self, session_id: &str) -> Option<SessionState> {
        let path = self.state_path(session_id);
        let content = std::fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&content) {
            Ok(state) => Some(state),
            Err(err) => {
                warn!(
                    session = short_id(session_id),
                    error = %err,
                    "malformed aggregate file, treating as absent"
                );
                None
            }
        }
    }

    /// Persist the aggregate atomically.
    pub fn save(&self, state: &SessionState) -> Result<()> {
        let json = serde_json::to_string_pretty(state)?;
        atomic_write(&self.state_path(&state.session_id), &json)?;
        Ok(())
    }

    /// Load-or-create the aggregate for `session_id` and fold `events`
    /// into it. Returns the aggregate and the number of events actually
    /// applied, so callers can skip persisting an unchanged aggregate.
    ///
    /// Creation requires at least one event to seed the timestamps.
    pub fn fold(
        &self,
        session_id: &str,
        events: &[QueuedEvent],
        filter: &dyn RecursionFilter,
    ) -> Result<(SessionState, usize)> {
        let mut state = match self.load(session_id) {
            Some(state) => state,
            None => {
                let first = events
                    .first()
                    .ok_or_else(|| StateError::NoEvents(session_id.to_string()))?;
                SessionState::new(session_id, &first.ts, &first.cwd, &first.transcript_path)
            }
        };
        let applied = fold_events(&mut state, events, filter);
        Ok((state, applied))
    }

    /// Advance the write-completion marker and persist.
    ///
    /// The marker is monotonic: it never moves backwards, even if the
    /// clock does.
    pub fn mark_written(&self, state: &mut SessionState) -> Result<()> {
        let now = now_iso();
        let keep_existing = state.last_write_ts.as_deref().is_some_and(|prev| {
            match (parse_iso(prev), parse_iso(&now)) {
                (Some(prev_dt), Some(now_dt)) => prev_dt >= now_dt,
                _ => false,
            }
        });
        if !keep_existing {
            state.last_write_ts = Some(now);
        }
        self.save(state)
    }

    /// Session ids with a persisted aggregate.
    #[must_use]
    pub fn session_ids(&self) -> Vec<String> {
        let Ok(entries) = std::fs::read_dir(&self.state_dir) else {
            return Vec::new();
        };
        let mut ids: Vec<String> = entries
            .filter_map(std::result::Result::ok)
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .filter_map(|p| p.file_stem().map(|s| s.to_string_lossy().into_owned()))
            .collect();
        ids.sort();
        ids
    }
}

/// Fold events into an aggregate, idempotently by event id.
///
/// Events already recorded in `processed_event_ids` are silently ignored
/// (at-least-once delivery tolerance); events flagged by the recursion
/// filter are dropped without recording. Returns the number of events
/// actually applied.
pub fn fold_events(
    state: &mut SessionState,
    events: &[QueuedEvent],
    filter: &dyn RecursionFilter,
) -> usize {
    let mut seen: HashSet<&str> = state.processed_event_ids.iter().map(String::as_str).collect();
    let mut applied = Vec::new();

    for event in events {
        if seen.contains(event.event_id.as_str()) {
            continue;
        }
        if filter.is_recursive(event) {
            continue;
        }
        let _ = seen.insert(event.event_id.as_str());
        applied.push(event);
    }

    let count = applied.len();
    for event in applied {
        state.last_event_ts = event.ts.clone();
        state.processed_event_ids.push(event.event_id.clone());
        if !event.cwd.is_empty() {
            state.cwd = event.cwd.clone();
        }
        if !event.transcript_path.is_empty() {
            state.transcript_path = event.transcript_path.clone();
        }
        state.events.push(summarize_event(event));
    }
    count
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
