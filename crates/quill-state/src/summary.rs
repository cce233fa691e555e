//! Event summary extraction.
//!
//! Projects a raw event into the one-line markdown description stored in
//! the aggregate. Tool events get a tool-specific rendering with the
//! noisiest argument truncated; everything else falls back to the kind
//! string.

use std::path::Path;

use serde_json::Value;

use quill_events::{EventKind, QueuedEvent};

use crate::types::EventSummary;

const PROMPT_LIMIT: usize = 80;
const COMMAND_LIMIT: usize = 60;

/// Extract a human-readable summary from an event.
#[must_use]
pub fn summarize_event(event: &QueuedEvent) -> EventSummary {
    let description = match &event.kind {
        EventKind::SessionStart => "Session started".to_string(),
        EventKind::SessionEnd => "Session ended".to_string(),
        EventKind::Stop => "Session stopped".to_string(),
        EventKind::PreCompact => "Context compaction".to_string(),
        EventKind::UserPromptSubmit => {
            let prompt = str_field(&event.data, "prompt").unwrap_or_default();
            format!("User prompt: \"{}\"", truncate(prompt, PROMPT_LIMIT))
        }
        EventKind::PostToolUse | EventKind::PostToolUseFailure => {
            let mut description = describe_tool(&event.data);
            if event.kind == EventKind::PostToolUseFailure {
                description.push_str(" (failed)");
            }
            description
        }
        EventKind::Other(kind) => kind.clone(),
    };

    EventSummary {
        ts: event.ts.clone(),
        event: event.kind.as_str().to_string(),
        description,
    }
}

fn describe_tool(data: &Value) -> String {
    let tool_name = str_field(data, "tool_name").unwrap_or("unknown");
    let input = data.get("tool_input");
    let input_field = |key: &str| -> &str {
        input.and_then(|i| i.get(key)).and_then(Value::as_str).unwrap_or_default()
    };

    match tool_name {
        "Read" | "Write" | "Edit" => {
            format!("**{tool_name}** `{}`", file_name(input_field("file_path")))
        }
        "Bash" => format!("**Bash** `{}`", truncate(input_field("command"), COMMAND_LIMIT)),
        "Grep" | "Glob" => format!("**{tool_name}** `{}`", input_field("pattern")),
        "Task" => format!("**Task** {}", input_field("description")),
        other => format!("**{other}**"),
    }
}

fn file_name(path: &str) -> &str {
    Path::new(path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(path)
}

fn truncate(s: &str, limit: usize) -> String {
    if s.chars().count() <= limit {
        return s.to_string();
    }
    let kept: String = s.chars().take(limit.saturating_sub(3)).collect();
    format!("{kept}...")
}

fn str_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
