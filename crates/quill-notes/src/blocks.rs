//! Managed blocks: machine-owned regions inside human-owned documents.
//!
//! Block format:
//!
//! ```text
//! <!-- quill:{block_id}:start -->
//! content here...
//! <!-- quill:{block_id}:end -->
//! ```
//!
//! Content strictly between the delimiters belongs to the pipeline and may
//! be rewritten freely; everything outside any managed block belongs to the
//! human author and is never altered. The full delimiter string ends in
//! `:start -->` / `:end -->`, so no block id's delimiter can be a prefix of
//! another's.
//!
//! Location is an explicit position state machine (start found / end found
//! after start / malformed), not repeated pattern matching, which makes the
//! self-healing path precise: a start delimiter with no matching end is
//! corrupt, the stray start is stripped, and the block is recreated at the
//! document end when creation is requested.
//!
//! Every mutation runs under the document's advisory lock and lands via
//! temp-file-plus-atomic-rename; there are no in-place partial writes.

use std::path::Path;
use std::time::Duration;

use tracing::debug;

use quill_core::{LockGuard, LockManager, atomic_write, path_lock_name};

use crate::errors::{NoteError, Result};

fn start_marker(block_id: &str) -> String {
    format!("<!-- quill:{block_id}:start -->")
}

fn end_marker(block_id: &str) -> String {
    format!("<!-- quill:{block_id}:end -->")
}

/// Where a block sits inside a document, in byte offsets.
#[derive(Clone, Debug, PartialEq, Eq)]
enum BlockLocation {
    /// No start delimiter present.
    Missing,
    /// Start delimiter present but no matching end: the block is corrupt.
    Malformed {
        start_idx: usize,
        marker_len: usize,
    },
    /// Well-formed delimiter pair.
    Found {
        /// Start of the start delimiter.
        block_start: usize,
        /// Interior range, strictly between the delimiters.
        interior: std::ops::Range<usize>,
        /// One past the end delimiter.
        block_end: usize,
    },
}

fn locate(content: &str, block_id: &str) -> BlockLocation {
    let start = start_marker(block_id);
    let end = end_marker(block_id);

    let Some(start_idx) = content.find(&start) else {
        return BlockLocation::Missing;
    };
    let interior_start = start_idx + start.len();
    let Some(end_rel) = content[interior_start..].find(&end) else {
        return BlockLocation::Malformed {
            start_idx,
            marker_len: start.len(),
        };
    };
    let end_idx = interior_start + end_rel;
    BlockLocation::Found {
        block_start: start_idx,
        interior: interior_start..end_idx,
        block_end: end_idx + end.len(),
    }
}

/// Result of a [`BlockMutator::write`] call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriteOutcome {
    /// An existing block's interior was replaced.
    Replaced,
    /// A fresh block was appended at the document end.
    Created,
    /// The block was absent and creation was not requested; the document
    /// was left byte-identical.
    SkippedMissing,
    /// The document itself does not exist.
    NoDocument,
}

impl WriteOutcome {
    /// Whether the document was modified.
    #[must_use]
    pub fn wrote(self) -> bool {
        matches!(self, Self::Replaced | Self::Created)
    }
}

/// Mutator for managed blocks, holding the per-document lock directory.
#[derive(Clone, Debug)]
pub struct BlockMutator {
    locks: LockManager,
    lock_timeout: Duration,
}

impl BlockMutator {
    /// Create a mutator whose document locks live under `lock_dir`.
    #[must_use]
    pub fn new(locks: LockManager, lock_timeout: Duration) -> Self {
        Self { locks, lock_timeout }
    }

    /// Acquire the advisory lock for a document path.
    ///
    /// Lock files are named by a hash of the path. Errors with
    /// [`NoteError::LockTimeout`] when the timeout elapses.
    pub fn lock_document(&self, path: &Path) -> Result<LockGuard> {
        let resource = path_lock_name(path);
        self.locks
            .acquire(&resource, self.lock_timeout)?
            .ok_or_else(|| NoteError::LockTimeout(path.display().to_string()))
    }

    /// Read a block's interior (trimmed), or `None` if the document or a
    /// well-formed delimiter pair is missing.
    pub fn read(&self, path: &Path, block_id: &str) -> Result<Option<String>> {
        let Some(content) = read_if_exists(path)? else {
            return Ok(None);
        };
        match locate(&content, block_id) {
            BlockLocation::Found { interior, .. } => {
                Ok(Some(content[interior].trim().to_string()))
            }
            BlockLocation::Missing | BlockLocation::Malformed { .. } => Ok(None),
        }
    }

    /// Replace a block's interior, optionally creating the block.
    ///
    /// - Well-formed pair present: replace the interior verbatim.
    /// - Orphaned start delimiter: strip it, then fall through to the
    ///   missing-block path (self-heal).
    /// - Block missing and `create_if_missing`: append a fresh block at the
    ///   document end.
    /// - Block missing otherwise: [`WriteOutcome::SkippedMissing`], document
    ///   untouched.
    pub fn write(
        &self,
        path: &Path,
        block_id: &str,
        content: &str,
        create_if_missing: bool,
    ) -> Result<WriteOutcome> {
        if !path.exists() {
            return Ok(WriteOutcome::NoDocument);
        }
        let _guard = self.lock_document(path)?;

        let document = std::fs::read_to_string(path)?;
        let (new_document, outcome) = apply_write(&document, block_id, content, create_if_missing);
        if outcome.wrote() {
            atomic_write(path, &new_document)?;
        }
        Ok(outcome)
    }

    /// Remove a block including its delimiters and at most one adjoining
    /// newline on each side. Returns `true` if the block was removed.
    pub fn delete(&self, path: &Path, block_id: &str) -> Result<bool> {
        if !path.exists() {
            return Ok(false);
        }
        let _guard = self.lock_document(path)?;

        let document = std::fs::read_to_string(path)?;
        match apply_delete(&document, block_id) {
            Some(new_document) => {
                atomic_write(path, &new_document)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Every block id present in the document, in order of appearance.
    pub fn list(&self, path: &Path) -> Result<Vec<String>> {
        let Some(content) = read_if_exists(path)? else {
            return Ok(Vec::new());
        };
        Ok(list_block_ids(&content))
    }
}

fn read_if_exists(path: &Path) -> Result<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err.into()),
    }
}

/// Pure write transition over document text.
fn apply_write(
    document: &str,
    block_id: &str,
    content: &str,
    create_if_missing: bool,
) -> (String, WriteOutcome) {
    match locate(document, block_id) {
        BlockLocation::Found {
            block_start,
            block_end,
            ..
        } => {
            let replacement = format!(
                "{}\n{content}\n{}",
                start_marker(block_id),
                end_marker(block_id)
            );
            let mut out = String::with_capacity(document.len() + content.len());
            out.push_str(&document[..block_start]);
            out.push_str(&replacement);
            out.push_str(&document[block_end..]);
            (out, WriteOutcome::Replaced)
        }
        BlockLocation::Malformed {
            start_idx,
            marker_len,
        } => {
            debug!(block_id, "stripping orphaned start delimiter");
            let mut healed = String::with_capacity(document.len());
            healed.push_str(&document[..start_idx]);
            healed.push_str(&document[start_idx + marker_len..]);
            if create_if_missing {
                (append_block(&healed, block_id, content), WriteOutcome::Created)
            } else {
                // Healing alone is not worth a write the caller didn't ask for.
                (document.to_string(), WriteOutcome::SkippedMissing)
            }
        }
        BlockLocation::Missing => {
            if create_if_missing {
                (append_block(document, block_id, content), WriteOutcome::Created)
            } else {
                (document.to_string(), WriteOutcome::SkippedMissing)
            }
        }
    }
}

fn append_block(document: &str, block_id: &str, content: &str) -> String {
    format!(
        "{}\n\n{}\n{content}\n{}\n",
        document.trim_end(),
        start_marker(block_id),
        end_marker(block_id)
    )
}

/// Pure delete transition; `None` when the block is absent or malformed.
fn apply_delete(document: &str, block_id: &str) -> Option<String> {
    let BlockLocation::Found {
        block_start,
        block_end,
        ..
    } = locate(document, block_id)
    else {
        return None;
    };

    let mut start = block_start;
    let mut end = block_end;
    // At most one adjoining newline on each side goes with the block.
    if document[end..].starts_with('\n') {
        end += 1;
    }
    if document[..start].ends_with('\n') {
        start -= 1;
    }

    let mut out = String::with_capacity(document.len());
    out.push_str(&document[..start]);
    out.push_str(&document[end..]);
    Some(out)
}

fn list_block_ids(content: &str) -> Vec<String> {
    const PREFIX: &str = "<!-- quill:";

    let mut ids = Vec::new();
    let mut rest = content;
    while let Some(idx) = rest.find(PREFIX) {
        rest = &rest[idx + PREFIX.len()..];
        if let Some(end) = rest.find(" -->") {
            if let Some(id) = rest[..end].strip_suffix(":start") {
                ids.push(id.to_string());
            }
        }
    }
    ids
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn mutator(dir: &TempDir) -> BlockMutator {
        BlockMutator::new(
            LockManager::new(dir.path().join("note_locks")),
            Duration::from_secs(2),
        )
    }

    fn doc_with_block(id: &str, interior: &str) -> String {
        format!(
            "# Title\n\nhuman text\n\n{}\n{interior}\n{}\n\nmore human text\n",
            start_marker(id),
            end_marker(id)
        )
    }

    // ── pure transitions ─────────────────────────────────────────────

    #[test]
    fn locate_states() {
        assert_eq!(locate("no blocks here", "a"), BlockLocation::Missing);
        assert!(matches!(
            locate("<!-- quill:a:start -->\ndangling", "a"),
            BlockLocation::Malformed { .. }
        ));
        assert!(matches!(
            locate(&doc_with_block("a", "x"), "a"),
            BlockLocation::Found { .. }
        ));
    }

    #[test]
    fn block_ids_are_prefix_free() {
        // "synth" must not match inside "synth-a"'s delimiters.
        let doc = doc_with_block("synth-a", "content");
        assert_eq!(locate(&doc, "synth"), BlockLocation::Missing);
    }

    #[test]
    fn write_replaces_only_the_interior() {
        let doc = doc_with_block("a", "old text");
        let (out, outcome) = apply_write(&doc, "a", "new text", false);
        assert_eq!(outcome, WriteOutcome::Replaced);
        assert!(out.contains("new text"));
        assert!(!out.contains("old text"));
        // Everything outside the block is byte-identical.
        assert!(out.starts_with("# Title\n\nhuman text\n\n"));
        assert!(out.ends_with("\n\nmore human text\n"));
    }

    #[test]
    fn write_missing_without_create_is_noop() {
        let doc = doc_with_block("a", "old");
        let (out, outcome) = apply_write(&doc, "b", "stuff", false);
        assert_eq!(outcome, WriteOutcome::SkippedMissing);
        assert_eq!(out, doc);
    }

    #[test]
    fn write_missing_with_create_appends() {
        let doc = "# Note\n\nbody\n".to_string();
        let (out, outcome) = apply_write(&doc, "b", "fresh", true);
        assert_eq!(outcome, WriteOutcome::Created);
        assert!(out.ends_with(&format!(
            "{}\nfresh\n{}\n",
            start_marker("b"),
            end_marker("b")
        )));
        assert!(out.starts_with("# Note\n\nbody\n\n"));
    }

    #[test]
    fn write_heals_orphaned_start() {
        let doc = format!("# Note\n\n{}\norphaned interior\n", start_marker("a"));
        let (out, outcome) = apply_write(&doc, "a", "rebuilt", true);
        assert_eq!(outcome, WriteOutcome::Created);
        // Exactly one start delimiter remains, paired with an end.
        assert_eq!(out.matches(&start_marker("a")).count(), 1);
        assert_eq!(out.matches(&end_marker("a")).count(), 1);
        assert!(out.contains("rebuilt"));
    }

    #[test]
    fn delete_removes_block_and_one_adjoining_newline() {
        let doc = doc_with_block("a", "bye");
        let out = apply_delete(&doc, "a").unwrap();
        assert!(!out.contains("quill:a"));
        assert!(!out.contains("bye"));
        assert!(out.contains("human text"));
        assert!(out.contains("more human text"));
    }

    #[test]
    fn delete_absent_is_none() {
        assert!(apply_delete("nothing here", "a").is_none());
        let malformed = format!("{}\ndangling", start_marker("a"));
        assert!(apply_delete(&malformed, "a").is_none());
    }

    #[test]
    fn list_finds_all_ids_in_order() {
        let doc = format!(
            "{}\n{}",
            doc_with_block("timeline", "t"),
            doc_with_block("summary", "s")
        );
        assert_eq!(list_block_ids(&doc), vec!["timeline", "summary"]);
    }

    // ── filesystem paths ─────────────────────────────────────────────

    #[test]
    fn round_trip_through_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("note.md");
        std::fs::write(&path, doc_with_block("timeline", "old")).unwrap();

        let m = mutator(&dir);
        let outcome = m.write(&path, "timeline", "line one\nline two", false).unwrap();
        assert_eq!(outcome, WriteOutcome::Replaced);
        assert_eq!(
            m.read(&path, "timeline").unwrap().as_deref(),
            Some("line one\nline two")
        );
    }

    #[test]
    fn write_absent_block_leaves_document_unchanged() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("note.md");
        let original = doc_with_block("synth-a", "old text");
        std::fs::write(&path, &original).unwrap();

        let m = mutator(&dir);
        let outcome = m.write(&path, "synth-b", "new", false).unwrap();
        assert_eq!(outcome, WriteOutcome::SkippedMissing);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), original);
    }

    #[test]
    fn write_to_missing_document() {
        let dir = TempDir::new().unwrap();
        let m = mutator(&dir);
        let outcome = m
            .write(&dir.path().join("absent.md"), "a", "x", true)
            .unwrap();
        assert_eq!(outcome, WriteOutcome::NoDocument);
    }

    #[test]
    fn read_missing_document_is_none() {
        let dir = TempDir::new().unwrap();
        let m = mutator(&dir);
        assert!(m.read(&dir.path().join("absent.md"), "a").unwrap().is_none());
    }

    #[test]
    fn delete_through_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("note.md");
        std::fs::write(&path, doc_with_block("a", "going away")).unwrap();

        let m = mutator(&dir);
        assert!(m.delete(&path, "a").unwrap());
        assert!(!std::fs::read_to_string(&path).unwrap().contains("quill:a"));
        assert!(!m.delete(&path, "a").unwrap());
    }

    #[test]
    fn list_through_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("note.md");
        std::fs::write(&path, doc_with_block("only", "x")).unwrap();

        let m = mutator(&dir);
        assert_eq!(m.list(&path).unwrap(), vec!["only"]);
        assert!(m.list(&dir.path().join("absent.md")).unwrap().is_empty());
    }
}
