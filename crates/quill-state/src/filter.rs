//! Recursion-prevention predicate.
//!
//! The pipeline's own writes (notes, state files) generate recorder events
//! in turn; folding those back in would feed the pipeline its own output.
//! The predicate is a pluggable collaborator supplied to the fold step,
//! not core logic — swap it out in tests or for other recorders.

use serde_json::Value;

use quill_events::QueuedEvent;

/// Decides whether an event originated from the pipeline itself.
pub trait RecursionFilter: Send + Sync {
    /// `true` if the event must be excluded from folding.
    fn is_recursive(&self, event: &QueuedEvent) -> bool;
}

/// Substring-marker filter over the event fields that can carry paths,
/// commands, or prompts.
///
/// An event is recursive when any configured marker appears in its `cwd`,
/// its tool input's `file_path` / `command` / `pattern` / `path`, or its
/// `prompt`.
#[derive(Clone, Debug)]
pub struct MarkerFilter {
    markers: Vec<String>,
}

impl MarkerFilter {
    /// Create a filter from marker substrings.
    #[must_use]
    pub fn new(markers: Vec<String>) -> Self {
        Self { markers }
    }

    fn matches(&self, text: &str) -> bool {
        !text.is_empty() && self.markers.iter().any(|m| text.contains(m.as_str()))
    }
}

impl RecursionFilter for MarkerFilter {
    fn is_recursive(&self, event: &QueuedEvent) -> bool {
        if self.matches(&event.cwd) {
            return true;
        }

        let tool_input = event.data.get("tool_input");
        for key in ["file_path", "command", "pattern", "path"] {
            let text = tool_input
                .and_then(|i| i.get(key))
                .and_then(Value::as_str)
                .unwrap_or_default();
            if self.matches(text) {
                return true;
            }
        }

        let prompt = event.data.get("prompt").and_then(Value::as_str).unwrap_or_default();
        self.matches(prompt)
    }
}

/// Filter that never excludes anything (for tests and manual re-runs).
#[derive(Clone, Copy, Debug, Default)]
pub struct AcceptAll;

impl RecursionFilter for AcceptAll {
    fn is_recursive(&self, _event: &QueuedEvent) -> bool {
        false
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
