//! Atomic file writes.
//!
//! Every durable write in the pipeline goes through temp-file-then-rename:
//! content is written to a temporary file in the target's directory, then
//! renamed over the final path in one filesystem operation. A reader never
//! observes a partially written file.

use std::io::{self, Write};
use std::path::Path;

use tempfile::NamedTempFile;

/// Atomically replace `path` with `content`.
///
/// The temporary file is created in `path`'s parent directory so the final
/// rename stays on one filesystem. Parent directories are created if absent.
pub fn atomic_write(path: &Path, content: &str) -> io::Result<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent)?;

    let mut tmp = NamedTempFile::new_in(parent)?;
    tmp.write_all(content.as_bytes())?;
    tmp.flush()?;
    let _ = tmp
        .persist(path)
        .map_err(|persist_err| persist_err.error)?;
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn writes_new_file() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("out.md");
        atomic_write(&target, "hello").unwrap();
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "hello");
    }

    #[test]
    fn replaces_existing_file() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("out.md");
        std::fs::write(&target, "old").unwrap();
        atomic_write(&target, "new").unwrap();
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "new");
    }

    #[test]
    fn creates_missing_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("a").join("b").join("out.json");
        atomic_write(&target, "{}").unwrap();
        assert!(target.exists());
    }

    #[test]
    fn abandoned_temp_write_leaves_target_intact() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("out.md");
        atomic_write(&target, "original").unwrap();

        // A writer dying between the temp write and the rename must not
        // disturb the target.
        let mut tmp = NamedTempFile::new_in(dir.path()).unwrap();
        tmp.write_all(b"partial").unwrap();
        tmp.flush().unwrap();
        drop(tmp);

        assert_eq!(std::fs::read_to_string(&target).unwrap(), "original");
    }

    #[test]
    fn leaves_no_temp_files_behind() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("out.md");
        atomic_write(&target, "content").unwrap();

        let entries: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries.len(), 1, "only the target should remain: {entries:?}");
    }
}
