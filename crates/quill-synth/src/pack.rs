//! The distilled output of a session.

use serde::{Deserialize, Serialize};

/// Structured knowledge distilled from one session.
///
/// Deserialized from extractor output; unknown fields are ignored and
/// missing fields default to empty, so partial extractor output still
/// yields a usable pack.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct KnowledgePack {
    /// One-line session title.
    pub title: String,
    /// Notable things that happened.
    pub highlights: Vec<String>,
    /// Concepts or subsystems the session touched.
    pub concepts: Vec<String>,
    /// Decisions made, with their reasoning if captured.
    pub decisions: Vec<String>,
    /// Questions left unresolved at session end.
    pub open_questions: Vec<String>,
}

impl KnowledgePack {
    /// Whether the pack carries nothing worth writing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.title.trim().is_empty()
            && self.highlights.is_empty()
            && self.concepts.is_empty()
            && self.decisions.is_empty()
            && self.open_questions.is_empty()
    }

    /// Render the pack as the markdown digest for the note's summary block.
    #[must_use]
    pub fn render_digest(&self) -> String {
        let mut out = String::new();
        if !self.title.trim().is_empty() {
            out.push_str(&format!("**{}**\n", self.title.trim()));
        }
        push_section(&mut out, "Highlights", &self.highlights);
        push_section(&mut out, "Concepts", &self.concepts);
        push_section(&mut out, "Decisions", &self.decisions);
        push_section(&mut out, "Open questions", &self.open_questions);
        out.trim_end().to_string()
    }
}

fn push_section(out: &mut String, heading: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    if !out.is_empty() {
        out.push('\n');
    }
    out.push_str(&format!("_{heading}_\n"));
    for item in items {
        out.push_str(&format!("- {item}\n"));
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_pack_is_empty() {
        assert!(KnowledgePack::default().is_empty());
        let whitespace_title = KnowledgePack {
            title: "   ".to_string(),
            ..KnowledgePack::default()
        };
        assert!(whitespace_title.is_empty());
    }

    #[test]
    fn digest_renders_only_populated_sections() {
        let pack = KnowledgePack {
            title: "Fixed the retry loop".to_string(),
            highlights: vec!["Found the off-by-one in backoff".to_string()],
            decisions: vec!["Cap retries at 5".to_string()],
            ..KnowledgePack::default()
        };
        let digest = pack.render_digest();
        assert!(digest.starts_with("**Fixed the retry loop**"));
        assert!(digest.contains("_Highlights_\n- Found the off-by-one in backoff"));
        assert!(digest.contains("_Decisions_\n- Cap retries at 5"));
        assert!(!digest.contains("Concepts"));
        assert!(!digest.contains("Open questions"));
        assert!(!digest.ends_with('\n'));
    }

    #[test]
    fn partial_json_deserializes_with_defaults() {
        let pack: KnowledgePack =
            serde_json::from_str(r#"{"title": "t", "unknown_field": 1}"#).unwrap();
        assert_eq!(pack.title, "t");
        assert!(pack.highlights.is_empty());
    }
}
