//! Debounce / flush decision.
//!
//! Pure functions over a [`SessionState`] — `now` is a parameter, so every
//! decision is deterministic and directly testable. Terminal events flush
//! without delay; all other activity coalesces bursts into a single write,
//! bounding write amplification while keeping staleness bounded by the
//! debounce window.

use chrono::{DateTime, Utc};

use quill_core::parse_iso;
use quill_events::QueuedEvent;

use crate::types::SessionState;

/// Whether the session is ready to be materialized.
///
/// - Already written at or after the last event → `false` (idempotence
///   guard, even when `immediate` is set).
/// - `immediate` (the fold included a terminal event) → `true`.
/// - Otherwise `true` iff `now - last_event_ts >= debounce_seconds`.
#[must_use]
pub fn should_flush(
    state: &SessionState,
    debounce_seconds: u64,
    immediate: bool,
    now: DateTime<Utc>,
) -> bool {
    if is_written(state) {
        return false;
    }
    if immediate {
        return true;
    }
    let Some(last_event) = parse_iso(&state.last_event_ts) else {
        return false;
    };
    let elapsed = (now - last_event).num_seconds();
    elapsed >= 0 && elapsed.unsigned_abs() >= debounce_seconds
}

/// Whether the session note was already written at or after the last event.
#[must_use]
pub fn is_written(state: &SessionState) -> bool {
    let Some(write_ts) = state.last_write_ts.as_deref() else {
        return false;
    };
    match (parse_iso(write_ts), parse_iso(&state.last_event_ts)) {
        (Some(write), Some(event)) => write >= event,
        _ => false,
    }
}

/// Whether any of the newly delivered events is a terminal kind.
#[must_use]
pub fn has_terminal_event(events: &[QueuedEvent]) -> bool {
    events.iter().any(|e| e.kind.is_terminal())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
