//! Deterministic timeline rendering with bounded output.
//!
//! Event summaries are first coalesced: consecutive runs of the same kind
//! tag collapse into one group carrying a count and a time range. When the
//! group count still exceeds the configured cap, the head and tail groups
//! are kept verbatim and the middle collapses into a single synthetic
//! summary group, so rendered output never exceeds `max_entries + 1` lines
//! for any input size. The whole pass is a pure function of its inputs and
//! re-renders identically on every flush.

use std::collections::HashMap;

use quill_core::format_clock;
use quill_state::EventSummary;

/// A run of consecutive same-kind events, collapsed to one timeline line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TimelineGroup {
    /// Kind tag shared by every event in the run.
    pub tag: String,
    /// Number of events collapsed into this group.
    pub count: usize,
    /// Timestamp of the first event in the run.
    pub first_ts: String,
    /// Timestamp of the last event in the run.
    pub last_ts: String,
    /// Description of the first event, shown when the group is a singleton.
    pub sample: String,
}

/// Tag used by the synthetic middle group produced by [`compact`].
const ELISION_TAG: &str = "Elided";

/// Classify a summary into its kind tag.
///
/// Tool summaries render as `**ToolName** detail`, so the tag is the text
/// between the leading `**` pair. Prompts and session lifecycle events get
/// fixed tags; anything unrecognized is `Other`.
fn kind_tag(summary: &EventSummary) -> String {
    let desc = summary.description.as_str();
    if let Some(rest) = desc.strip_prefix("**") {
        if let Some(end) = rest.find("**") {
            let name = &rest[..end];
            if !name.is_empty() && name.chars().all(|c| c.is_alphanumeric()) {
                return name.to_string();
            }
        }
    }
    if desc.starts_with("User prompt:") {
        return "UserPrompt".to_string();
    }
    if desc.starts_with("Session") {
        return "Session".to_string();
    }
    "Other".to_string()
}

/// Collapse consecutive same-tag summaries into groups.
fn coalesce(summaries: &[EventSummary]) -> Vec<TimelineGroup> {
    let mut groups: Vec<TimelineGroup> = Vec::new();
    for summary in summaries {
        let tag = kind_tag(summary);
        match groups.last_mut() {
            Some(last) if last.tag == tag => {
                last.count += 1;
                last.last_ts = summary.ts.clone();
            }
            _ => groups.push(TimelineGroup {
                tag,
                count: 1,
                first_ts: summary.ts.clone(),
                last_ts: summary.ts.clone(),
                sample: summary.description.clone(),
            }),
        }
    }
    groups
}

/// Bound the group list to at most `max_entries + 1` groups.
///
/// Keeps `min(10, max_entries / 2)` groups from each end and replaces the
/// middle with one synthetic group describing what was elided, with per-tag
/// counts sorted by descending count (ties alphabetical) so the output is
/// deterministic.
fn compact(groups: Vec<TimelineGroup>, max_entries: usize) -> Vec<TimelineGroup> {
    if groups.len() <= max_entries {
        return groups;
    }
    let keep = std::cmp::min(10, max_entries / 2);
    let middle = &groups[keep..groups.len() - keep];

    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut total = 0usize;
    for group in middle {
        *counts.entry(group.tag.as_str()).or_default() += group.count;
        total += group.count;
    }
    let mut ranked: Vec<(&str, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
    let breakdown = ranked
        .iter()
        .map(|(tag, n)| format!("{tag} x{n}"))
        .collect::<Vec<_>>()
        .join(", ");

    let synthetic = TimelineGroup {
        tag: ELISION_TAG.to_string(),
        count: total,
        first_ts: middle.first().map(|g| g.first_ts.clone()).unwrap_or_default(),
        last_ts: middle.last().map(|g| g.last_ts.clone()).unwrap_or_default(),
        sample: format!("... {total} operations ({breakdown}) ..."),
    };

    let mut out = Vec::with_capacity(keep * 2 + 1);
    out.extend_from_slice(&groups[..keep]);
    out.push(synthetic);
    out.extend_from_slice(&groups[groups.len() - keep..]);
    out
}

fn render_group(group: &TimelineGroup) -> String {
    if group.tag == ELISION_TAG {
        return format!(
            "- `{}-{}` {}",
            format_clock(&group.first_ts),
            format_clock(&group.last_ts),
            group.sample
        );
    }
    if group.count == 1 {
        format!("- `{}` {}", format_clock(&group.first_ts), group.sample)
    } else {
        format!(
            "- `{}-{}` **{}** x{}",
            format_clock(&group.first_ts),
            format_clock(&group.last_ts),
            group.tag,
            group.count
        )
    }
}

/// Render a session's summaries into timeline markdown.
///
/// Output is at most `max_entries + 1` lines regardless of input size, and
/// identical for identical input.
#[must_use]
pub fn render_timeline(summaries: &[EventSummary], max_entries: usize) -> String {
    if summaries.is_empty() {
        return "(No events recorded)".to_string();
    }
    let groups = compact(coalesce(summaries), max_entries);
    groups
        .iter()
        .map(render_group)
        .collect::<Vec<_>>()
        .join("\n")
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn summary(ts: &str, description: &str) -> EventSummary {
        EventSummary {
            ts: ts.to_string(),
            event: "PostToolUse".to_string(),
            description: description.to_string(),
        }
    }

    #[test]
    fn tags_parse_from_descriptions() {
        assert_eq!(kind_tag(&summary("t", "**Edit** `main.rs`")), "Edit");
        assert_eq!(kind_tag(&summary("t", "User prompt: \"hi\"")), "UserPrompt");
        assert_eq!(kind_tag(&summary("t", "Session started")), "Session");
        assert_eq!(kind_tag(&summary("t", "Session stopped")), "Session");
        assert_eq!(kind_tag(&summary("t", "Context compaction")), "Other");
    }

    #[test]
    fn consecutive_same_kind_collapses_to_one_group() {
        let summaries = vec![
            summary("2025-01-15T10:00:00Z", "**Edit** `a.rs`"),
            summary("2025-01-15T10:00:05Z", "**Edit** `b.rs`"),
            summary("2025-01-15T10:00:09Z", "**Edit** `c.rs`"),
        ];
        let groups = coalesce(&summaries);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].count, 3);
        assert_eq!(groups[0].first_ts, "2025-01-15T10:00:00Z");
        assert_eq!(groups[0].last_ts, "2025-01-15T10:00:09Z");
    }

    #[test]
    fn interleaved_kinds_do_not_collapse() {
        let summaries = vec![
            summary("t1", "**Edit** `a.rs`"),
            summary("t2", "**Bash** `ls`"),
            summary("t3", "**Edit** `a.rs`"),
        ];
        assert_eq!(coalesce(&summaries).len(), 3);
    }

    #[test]
    fn singleton_renders_its_description() {
        let out = render_timeline(&[summary("2025-01-15T10:03:00Z", "**Read** `lib.rs`")], 100);
        assert_eq!(out, "- `10:03:00` **Read** `lib.rs`");
    }

    #[test]
    fn group_renders_range_and_count() {
        let summaries = vec![
            summary("2025-01-15T10:00:00Z", "**Edit** `a.rs`"),
            summary("2025-01-15T10:00:09Z", "**Edit** `b.rs`"),
        ];
        let out = render_timeline(&summaries, 100);
        assert_eq!(out, "- `10:00:00-10:00:09` **Edit** x2");
    }

    #[test]
    fn empty_input_renders_placeholder() {
        assert_eq!(render_timeline(&[], 100), "(No events recorded)");
    }

    #[test]
    fn large_timeline_elides_the_middle() {
        // 500 alternating groups, far over the cap.
        let mut summaries = Vec::new();
        for i in 0..500 {
            let desc = if i % 2 == 0 {
                "**Edit** `a.rs`"
            } else {
                "**Bash** `cargo check`"
            };
            summaries.push(summary(&format!("2025-01-15T10:{:02}:{:02}Z", i / 60, i % 60), desc));
        }
        let out = render_timeline(&summaries, 100);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 21); // 10 head + 1 elision + 10 tail
        assert!(lines[10].contains("operations"));
        assert!(lines[10].contains("Edit x"));
        assert!(lines[10].contains("Bash x"));
    }

    #[test]
    fn rendering_is_deterministic() {
        let summaries: Vec<EventSummary> = (0..300)
            .map(|i| summary(&format!("2025-01-15T10:00:{:02}Z", i % 60), if i % 3 == 0 {
                "**Read** `x`"
            } else {
                "**Write** `y`"
            }))
            .collect();
        assert_eq!(render_timeline(&summaries, 50), render_timeline(&summaries, 50));
    }

    proptest! {
        #[test]
        fn rendered_lines_never_exceed_cap_plus_one(
            kinds in proptest::collection::vec(0u8..5, 0..400),
            max_entries in 0usize..128,
        ) {
            let summaries: Vec<EventSummary> = kinds
                .iter()
                .enumerate()
                .map(|(i, k)| summary(
                    &format!("2025-01-15T10:00:{:02}Z", i % 60),
                    &format!("**Tool{k}** `arg`"),
                ))
                .collect();
            let out = render_timeline(&summaries, max_entries);
            prop_assert!(out.lines().count() <= max_entries + 1);
        }
    }
}
