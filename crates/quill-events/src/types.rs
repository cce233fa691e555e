//! Event record types.
//!
//! [`QueuedEvent`] is the immutable fact appended to the log: never mutated
//! or deleted except by the out-of-core retention sweep. [`EventKind`]
//! enumerates the recorder's hook event names, with a catch-all for kinds
//! this version does not know about — unknown kinds still round-trip
//! through the log unchanged.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use quill_core::{event_fingerprint, now_iso};

/// Enumerated event kinds, stored as their exact wire strings.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventKind {
    /// A session began.
    SessionStart,
    /// A session ended.
    SessionEnd,
    /// The recorder stopped the session.
    Stop,
    /// Context compaction ran in the recorder.
    PreCompact,
    /// The user submitted a prompt.
    UserPromptSubmit,
    /// A tool invocation completed.
    PostToolUse,
    /// A tool invocation failed.
    PostToolUseFailure,
    /// Any kind this version does not recognize (preserved verbatim).
    Other(String),
}

impl EventKind {
    /// The exact wire string for this kind.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::SessionStart => "SessionStart",
            Self::SessionEnd => "SessionEnd",
            Self::Stop => "Stop",
            Self::PreCompact => "PreCompact",
            Self::UserPromptSubmit => "UserPromptSubmit",
            Self::PostToolUse => "PostToolUse",
            Self::PostToolUseFailure => "PostToolUseFailure",
            Self::Other(s) => s,
        }
    }

    /// Terminal kinds flush the session immediately, without debounce.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Stop | Self::SessionEnd)
    }
}

impl From<String> for EventKind {
    fn from(s: String) -> Self {
        match s.as_str() {
            "SessionStart" => Self::SessionStart,
            "SessionEnd" => Self::SessionEnd,
            "Stop" => Self::Stop,
            "PreCompact" => Self::PreCompact,
            "UserPromptSubmit" => Self::UserPromptSubmit,
            "PostToolUse" => Self::PostToolUse,
            "PostToolUseFailure" => Self::PostToolUseFailure,
            _ => Self::Other(s),
        }
    }
}

impl From<EventKind> for String {
    fn from(kind: EventKind) -> Self {
        kind.as_str().to_string()
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An immutable activity event queued for processing.
///
/// Appended once, read many times, never updated. The `event_id` is a
/// content-derived fingerprint so re-delivery of the same logical
/// occurrence is detectable downstream.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QueuedEvent {
    /// Content-derived fingerprint: `sha256(session_id + ts + kind)[..16]`.
    pub event_id: String,
    /// ISO-8601 UTC timestamp.
    pub ts: String,
    /// Hook event kind.
    #[serde(rename = "event")]
    pub kind: EventKind,
    /// Logical session this event belongs to.
    pub session_id: String,
    /// Working directory of the recorded process.
    pub cwd: String,
    /// Opaque pointer to richer detail held elsewhere.
    pub transcript_path: String,
    /// Raw hook payload, carried opaquely.
    pub data: Value,
}

impl QueuedEvent {
    /// Build an event from a raw hook payload.
    ///
    /// Missing fields fall back to `"unknown"` / empty strings — ingestion
    /// must never fail loudly. The timestamp is assigned here, at ingest
    /// time, and the fingerprint is derived from it.
    #[must_use]
    pub fn from_hook_input(hook_data: Value) -> Self {
        let ts = now_iso();
        let session_id = str_field(&hook_data, "session_id").unwrap_or("unknown").to_string();
        let kind: EventKind = str_field(&hook_data, "hook_event_name")
            .unwrap_or("unknown")
            .to_string()
            .into();
        let cwd = str_field(&hook_data, "cwd").unwrap_or_default().to_string();
        let transcript_path = str_field(&hook_data, "transcript_path")
            .unwrap_or_default()
            .to_string();

        let event_id = event_fingerprint(&session_id, &ts, kind.as_str());

        Self {
            event_id,
            ts,
            kind,
            session_id,
            cwd,
            transcript_path,
            data: hook_data,
        }
    }

    /// Serialize to one JSONL line (no trailing newline).
    pub fn to_json_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Parse one JSONL line.
    pub fn from_json_line(line: &str) -> serde_json::Result<Self> {
        serde_json::from_str(line)
    }
}

fn str_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
