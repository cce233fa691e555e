//! Aggregate types.

use serde::{Deserialize, Serialize};

/// A derived, human-readable projection of one folded event.
///
/// Append-only within an aggregate: produced once per folded event, never
/// revised.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSummary {
    /// ISO-8601 UTC timestamp of the source event.
    pub ts: String,
    /// Wire string of the source event kind.
    pub event: String,
    /// Markdown description (tool bolded, argument in backticks).
    pub description: String,
}

/// Persisted processing state for one session.
///
/// Derived by folding new events into previously persisted state. Folding
/// the same event id twice is a no-op; `last_write_ts`, once set, only
/// ever advances.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    /// Logical session id.
    pub session_id: String,
    /// Timestamp of the first folded event.
    pub first_event_ts: String,
    /// Timestamp of the most recently folded event.
    pub last_event_ts: String,
    /// When the session note was last materialized; `None` means never.
    #[serde(default)]
    pub last_write_ts: Option<String>,
    /// Every event id ever folded into this aggregate.
    #[serde(default)]
    pub processed_event_ids: Vec<String>,
    /// Most recent non-empty working directory seen.
    #[serde(default)]
    pub cwd: String,
    /// Most recent non-empty transcript reference seen.
    #[serde(default)]
    pub transcript_path: String,
    /// Ordered event summaries, one per folded (non-filtered) event.
    #[serde(default)]
    pub events: Vec<EventSummary>,
}

impl SessionState {
    /// Fresh aggregate seeded from the first event's fields.
    #[must_use]
    pub fn new(session_id: &str, first_ts: &str, cwd: &str, transcript_path: &str) -> Self {
        Self {
            session_id: session_id.to_string(),
            first_event_ts: first_ts.to_string(),
            last_event_ts: first_ts.to_string(),
            last_write_ts: None,
            processed_event_ids: Vec::new(),
            cwd: cwd.to_string(),
            transcript_path: transcript_path.to_string(),
            events: Vec::new(),
        }
    }

    /// Whether any folded summary is a user prompt.
    ///
    /// Sessions that never saw a prompt are not worth materializing.
    #[must_use]
    pub fn has_user_prompt(&self) -> bool {
        self.events.iter().any(|s| s.event == "UserPromptSubmit")
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
