//! Per-session note materialization.
//!
//! Each session owns exactly one markdown note in the vault, named
//! `session-<date>-<short_id>.md` after the session's first event. The note
//! is created once with frontmatter and headings, then updated purely
//! through its managed blocks (`session-info`, `summary`, `timeline`), so
//! anything a human writes outside the blocks survives every flush.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use quill_core::{atomic_write, date_of, humanize_span, short_id};
use quill_state::SessionState;

use crate::blocks::{BlockMutator, WriteOutcome};
use crate::errors::Result;
use crate::timeline::render_timeline;

/// Block id for working directory and duration.
pub const INFO_BLOCK: &str = "session-info";
/// Block id for the synthesized knowledge digest.
pub const SUMMARY_BLOCK: &str = "summary";
/// Block id for the compacted event timeline.
pub const TIMELINE_BLOCK: &str = "timeline";

const SUMMARY_PLACEHOLDER: &str = "_No summary yet._";

/// Writes and updates session notes in the vault.
#[derive(Clone, Debug)]
pub struct NoteWriter {
    vault_root: PathBuf,
    mutator: BlockMutator,
    max_entries: usize,
}

impl NoteWriter {
    /// Create a writer rooted at the vault directory.
    #[must_use]
    pub fn new(vault_root: PathBuf, mutator: BlockMutator, max_entries: usize) -> Self {
        Self {
            vault_root,
            mutator,
            max_entries,
        }
    }

    /// The note path a session materializes to.
    ///
    /// The date comes from the session's first event, so the path is stable
    /// across flushes even when a session spans midnight.
    #[must_use]
    pub fn note_path(&self, state: &SessionState) -> PathBuf {
        let date = session_date(state);
        let short = short_id(&state.session_id);
        self.vault_root.join(format!("session-{date}-{short}.md"))
    }

    /// Materialize a session: create the note if absent, otherwise rewrite
    /// only its managed blocks. Returns the note path.
    pub fn write(&self, state: &SessionState) -> Result<PathBuf> {
        let path = self.note_path(state);
        let timeline = render_timeline(&state.events, self.max_entries);

        if !path.exists() {
            // Create under the document lock, then release it before the
            // block writes below take it again. Another consumer may have
            // created the note between the check and the lock.
            let created = {
                let _guard = self.mutator.lock_document(&path)?;
                if path.exists() {
                    false
                } else {
                    atomic_write(&path, &render_skeleton(state, &timeline))?;
                    true
                }
            };
            if created {
                info!(path = %path.display(), "created session note");
                return Ok(path);
            }
        }

        let info = self.mutator.write(&path, INFO_BLOCK, &session_info(state), true)?;
        let tl = self.mutator.write(&path, TIMELINE_BLOCK, &timeline, true)?;
        debug!(
            path = %path.display(),
            info = ?info,
            timeline = ?tl,
            "updated session note"
        );
        Ok(path)
    }

    /// Upsert the knowledge digest into the summary block.
    pub fn write_summary(&self, state: &SessionState, digest: &str) -> Result<WriteOutcome> {
        let path = self.note_path(state);
        self.mutator.write(&path, SUMMARY_BLOCK, digest, true)
    }
}

fn session_info(state: &SessionState) -> String {
    format!(
        "**Working directory:** `{}`\n**Duration:** {}",
        state.cwd,
        humanize_span(&state.first_event_ts, &state.last_event_ts)
    )
}

fn session_date(state: &SessionState) -> String {
    date_of(&state.first_event_ts).unwrap_or_else(|| "undated".to_string())
}

fn render_skeleton(state: &SessionState, timeline: &str) -> String {
    let date = session_date(state);
    let short = short_id(&state.session_id);
    format!(
        "---\n\
         tags:\n  - log\n  - quill\n\
         created: {date}\n\
         session_id: {session_id}\n\
         ---\n\
         \n\
         # Session {date} ({short})\n\
         \n\
         <!-- quill:{info}:start -->\n{info_body}\n<!-- quill:{info}:end -->\n\
         \n\
         ## Summary\n\
         \n\
         <!-- quill:{summary}:start -->\n{placeholder}\n<!-- quill:{summary}:end -->\n\
         \n\
         ## Timeline\n\
         \n\
         <!-- quill:{tl}:start -->\n{timeline}\n<!-- quill:{tl}:end -->\n",
        session_id = state.session_id,
        info = INFO_BLOCK,
        info_body = session_info(state),
        summary = SUMMARY_BLOCK,
        placeholder = SUMMARY_PLACEHOLDER,
        tl = TIMELINE_BLOCK,
    )
}

/// Whether a path looks like a pipeline-owned session note. The writer
/// never deletes notes; this only exists so maintenance can report them.
#[must_use]
pub fn is_session_note(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with("session-") && n.ends_with(".md"))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
