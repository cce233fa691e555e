//! Worker error types.

use thiserror::Error;

/// Errors surfaced by the consumer loop.
///
/// Per-session failures inside a cycle are caught and counted rather than
/// propagated, so these mostly appear from single-session entry points and
/// maintenance.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// Filesystem failure outside the component crates.
    #[error("worker io error: {0}")]
    Io(#[from] std::io::Error),
    /// Event log failure.
    #[error(transparent)]
    Events(#[from] quill_events::EventLogError),
    /// Aggregate store failure.
    #[error(transparent)]
    State(#[from] quill_state::StateError),
    /// Session lock failure.
    #[error(transparent)]
    Lock(#[from] quill_core::LockError),
    /// Note writing failure.
    #[error(transparent)]
    Note(#[from] quill_notes::NoteError),
    /// A session id with no events anywhere in the log.
    #[error("no events recorded for session {0}")]
    UnknownSession(String),
}

/// Result type for worker operations.
pub type Result<T> = std::result::Result<T, WorkerError>;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
