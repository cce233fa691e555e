//! Error types for the aggregate store.

use thiserror::Error;

/// Errors that can occur during session state operations.
#[derive(Debug, Error)]
pub enum StateError {
    /// Filesystem access failed.
    #[error("state io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("state serde error: {0}")]
    Serde(#[from] serde_json::Error),

    /// An aggregate cannot be created without at least one event.
    #[error("cannot create session state with no events: {0}")]
    NoEvents(String),
}

/// Convenience type alias for state results.
pub type Result<T> = std::result::Result<T, StateError>;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_display() {
        let err = StateError::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        assert!(err.to_string().contains("state io error"));
    }

    #[test]
    fn no_events_display() {
        let err = StateError::NoEvents("sess-1".into());
        assert_eq!(
            err.to_string(),
            "cannot create session state with no events: sess-1"
        );
    }

    #[test]
    fn from_serde_conversion() {
        let serde_err = serde_json::from_str::<String>("bad").unwrap_err();
        let err: StateError = serde_err.into();
        assert!(matches!(err, StateError::Serde(_)));
    }
}
