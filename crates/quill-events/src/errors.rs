//! Error types for the event log.

use thiserror::Error;

/// Errors that can occur during event log operations.
#[derive(Debug, Error)]
pub enum EventLogError {
    /// Filesystem access failed.
    #[error("event log io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("event serde error: {0}")]
    Serde(#[from] serde_json::Error),

    /// The ingested payload was not a JSON object.
    #[error("malformed hook input: {0}")]
    MalformedInput(String),
}

/// Convenience type alias for event log results.
pub type Result<T> = std::result::Result<T, EventLogError>;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
