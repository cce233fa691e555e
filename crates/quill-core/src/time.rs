//! ISO-8601 time helpers.
//!
//! All persisted timestamps are UTC ISO-8601 strings with a trailing `Z`.
//! Parsing is tolerant: naive timestamps (no offset) are interpreted as UTC,
//! matching records written by older producers.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};

/// Current UTC time as an ISO-8601 string with trailing `Z`.
#[must_use]
pub fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse an ISO-8601 timestamp, tolerating a missing offset.
///
/// Returns `None` for unparseable input rather than erroring — malformed
/// timestamps in persisted records must never abort processing.
#[must_use]
pub fn parse_iso(ts: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(ts) {
        return Some(dt.with_timezone(&Utc));
    }
    // Naive fallback: "2025-01-15T10:00:00" or with fractional seconds.
    let trimmed = ts.trim_end_matches('Z');
    NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Format a timestamp as `HH:MM:SS` for timeline lines.
///
/// Unparseable input renders as `??:??:??` so one bad record cannot break
/// a whole timeline.
#[must_use]
pub fn format_clock(ts: &str) -> String {
    parse_iso(ts).map_or_else(|| "??:??:??".to_string(), |dt| dt.format("%H:%M:%S").to_string())
}

/// Extract the `YYYY-MM-DD` date component of a timestamp.
#[must_use]
pub fn date_of(ts: &str) -> Option<String> {
    parse_iso(ts).map(|dt| dt.format("%Y-%m-%d").to_string())
}

/// Human-readable duration between two timestamps (`45s`, `3m 12s`, `1h 05m`).
#[must_use]
pub fn humanize_span(first_ts: &str, last_ts: &str) -> String {
    let (Some(first), Some(last)) = (parse_iso(first_ts), parse_iso(last_ts)) else {
        return "unknown".to_string();
    };
    let total = (last - first).num_seconds().max(0);
    if total < 60 {
        format!("{total}s")
    } else if total < 3600 {
        format!("{}m {}s", total / 60, total % 60)
    } else {
        format!("{}h {:02}m", total / 3600, (total % 3600) / 60)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn now_iso_has_trailing_z() {
        let ts = now_iso();
        assert!(ts.ends_with('Z'), "expected trailing Z: {ts}");
        assert!(parse_iso(&ts).is_some());
    }

    #[test]
    fn parse_rfc3339() {
        let dt = parse_iso("2025-01-15T10:30:00Z").unwrap();
        assert_eq!(dt.format("%H:%M").to_string(), "10:30");
    }

    #[test]
    fn parse_naive_without_offset() {
        let dt = parse_iso("2025-01-15T10:30:00.123456").unwrap();
        assert_eq!(dt.format("%Y-%m-%d").to_string(), "2025-01-15");
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(parse_iso("not a timestamp").is_none());
        assert!(parse_iso("").is_none());
    }

    #[test]
    fn format_clock_valid_and_invalid() {
        assert_eq!(format_clock("2025-01-15T09:05:07Z"), "09:05:07");
        assert_eq!(format_clock("garbage"), "??:??:??");
    }

    #[test]
    fn date_of_extracts_day() {
        assert_eq!(date_of("2025-01-15T09:05:07Z").as_deref(), Some("2025-01-15"));
        assert!(date_of("nope").is_none());
    }

    #[test]
    fn humanize_span_formats() {
        assert_eq!(
            humanize_span("2025-01-15T10:00:00Z", "2025-01-15T10:00:45Z"),
            "45s"
        );
        assert_eq!(
            humanize_span("2025-01-15T10:00:00Z", "2025-01-15T10:03:12Z"),
            "3m 12s"
        );
        assert_eq!(
            humanize_span("2025-01-15T10:00:00Z", "2025-01-15T11:05:00Z"),
            "1h 05m"
        );
    }

    #[test]
    fn humanize_span_unknown_on_bad_input() {
        assert_eq!(humanize_span("bad", "2025-01-15T10:00:00Z"), "unknown");
    }

    #[test]
    fn humanize_span_clamps_negative() {
        // last before first: clamp to zero rather than printing negatives
        assert_eq!(
            humanize_span("2025-01-15T11:00:00Z", "2025-01-15T10:00:00Z"),
            "0s"
        );
    }
}
