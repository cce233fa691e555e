//! Pipeline status inspection.

use std::path::PathBuf;

use quill_state::is_written;

use crate::context::WorkerContext;

/// One session's standing in the pipeline.
#[derive(Clone, Debug)]
pub struct SessionStatus {
    /// Session id.
    pub session_id: String,
    /// Events in the log for this session.
    pub pending_events: usize,
    /// Summaries folded into the aggregate so far.
    pub folded_events: usize,
    /// Last event timestamp, from the aggregate when one exists.
    pub last_event_ts: Option<String>,
    /// Whether the note is written at or after the last event.
    pub written: bool,
    /// The note path, when one exists on disk.
    pub note_path: Option<PathBuf>,
}

/// Snapshot of the whole pipeline.
#[derive(Clone, Debug, Default)]
pub struct StatusReport {
    /// Per-session standing, ordered by session id.
    pub sessions: Vec<SessionStatus>,
    /// Event log partitions on disk.
    pub partitions: usize,
}

/// Inspect the pipeline without mutating anything.
#[must_use]
pub fn status(ctx: &WorkerContext) -> StatusReport {
    let by_session = ctx.log.events_by_session();
    let mut ids: Vec<String> = by_session.keys().cloned().collect();
    for id in ctx.store.session_ids() {
        if !by_session.contains_key(&id) {
            ids.push(id);
        }
    }
    ids.sort();

    let sessions = ids
        .into_iter()
        .map(|session_id| {
            let pending = by_session.get(&session_id).map_or(0, Vec::len);
            let state = ctx.store.load(&session_id);
            let note_path = state.as_ref().map(|s| ctx.writer.note_path(s));
            SessionStatus {
                pending_events: pending,
                folded_events: state.as_ref().map_or(0, |s| s.events.len()),
                last_event_ts: state.as_ref().map(|s| s.last_event_ts.clone()),
                written: state.as_ref().is_some_and(is_written),
                note_path: note_path.filter(|p| p.exists()),
                session_id,
            }
        })
        .collect();

    StatusReport {
        sessions,
        partitions: ctx.log.partition_files().len(),
    }
}
