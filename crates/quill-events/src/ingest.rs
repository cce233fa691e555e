//! Hook ingestion boundary.
//!
//! The recorder pipes one JSON object per invocation. Parsing is strict
//! about shape (must be a JSON object) but the caller is expected to treat
//! every error as non-fatal — the enqueue path logs and exits 0 no matter
//! what.

use serde_json::Value;

use crate::errors::{EventLogError, Result};
use crate::types::QueuedEvent;

/// Parse a raw hook payload into a [`QueuedEvent`].
///
/// Rejects non-object payloads; field-level absence is tolerated and
/// defaulted inside [`QueuedEvent::from_hook_input`].
pub fn event_from_hook_json(raw: &str) -> Result<QueuedEvent> {
    let value: Value = serde_json::from_str(raw)?;
    if !value.is_object() {
        return Err(EventLogError::MalformedInput(format!(
            "expected a JSON object, got {}",
            json_type_name(&value)
        )));
    }
    Ok(QueuedEvent::from_hook_input(value))
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
