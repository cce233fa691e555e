//! Error types for note mutation.

use thiserror::Error;

/// Errors that can occur while reading or mutating notes.
#[derive(Debug, Error)]
pub enum NoteError {
    /// Filesystem access failed.
    #[error("note io error: {0}")]
    Io(#[from] std::io::Error),

    /// The document lock could not be acquired within the timeout.
    #[error("timed out waiting for document lock: {0}")]
    LockTimeout(String),

    /// Lock infrastructure failure.
    #[error(transparent)]
    Lock(#[from] quill_core::LockError),
}

/// Convenience type alias for note results.
pub type Result<T> = std::result::Result<T, NoteError>;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
