//! Advisory file locking.
//!
//! Cross-process mutual exclusion via `flock(2)` on a sentinel file. Locks
//! are cooperative: they only exclude other participants that take the same
//! lock. [`FileLock`] is an RAII guard over an already-open file handle
//! (used by the event log to serialize appends); [`LockManager`] owns a
//! directory of named `.lock` files and polls for acquisition with a
//! timeout (used for session and document locks).
//!
//! On non-Unix platforms the lock degrades to a no-op, which is safe for
//! the single-process case.

// flock requires raw fd calls.
#![allow(unsafe_code)]

use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::trace;

/// Interval between acquisition attempts while polling.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Errors from lock acquisition.
#[derive(Debug, Error)]
pub enum LockError {
    /// Creating or locking the sentinel file failed.
    #[error("lock io error: {0}")]
    Io(#[from] io::Error),
}

/// Result type for lock operations.
pub type Result<T> = std::result::Result<T, LockError>;

/// RAII exclusive advisory lock held on an open file.
///
/// Released when dropped. Used where the locked file is also the data file
/// (event-log partitions lock themselves during append).
#[derive(Debug)]
pub struct FileLock {
    file: File,
}

impl FileLock {
    /// Block until an exclusive lock is held on `file`.
    pub fn acquire(file: File) -> io::Result<Self> {
        flock_exclusive(&file)?;
        Ok(Self { file })
    }

    /// Access the locked file handle.
    pub fn file(&self) -> &File {
        &self.file
    }

    /// Mutable access to the locked file handle (for appends).
    pub fn file_mut(&mut self) -> &mut File {
        &mut self.file
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        flock_unlock(&self.file);
    }
}

/// Guard for a named lock obtained through [`LockManager`].
///
/// Holds the sentinel file open with an exclusive flock; released on drop
/// on every exit path.
#[derive(Debug)]
pub struct LockGuard {
    _file: File,
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        flock_unlock(&self._file);
    }
}

/// Named advisory locks over a directory of sentinel files.
///
/// Each resource id maps to `<dir>/<resource>.lock`. Acquisition polls at a
/// fixed 100 ms interval until the lock is obtained or the timeout elapses;
/// on timeout the caller must skip the resource this cycle rather than
/// block indefinitely.
#[derive(Clone, Debug)]
pub struct LockManager {
    dir: PathBuf,
}

impl LockManager {
    /// Create a lock manager rooted at `dir` (created lazily on acquire).
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Sentinel path for a resource id.
    #[must_use]
    pub fn lock_path(&self, resource: &str) -> PathBuf {
        self.dir.join(format!("{resource}.lock"))
    }

    /// Try to acquire the lock for `resource`, polling until `timeout`.
    ///
    /// Returns `Ok(Some(guard))` on success and `Ok(None)` on timeout.
    pub fn acquire(&self, resource: &str, timeout: Duration) -> Result<Option<LockGuard>> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.lock_path(resource);
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        let start = Instant::now();
        loop {
            if flock_try_exclusive(&file)? {
                trace!(resource, "lock acquired");
                return Ok(Some(LockGuard { _file: file }));
            }
            if start.elapsed() >= timeout {
                trace!(resource, "lock timed out");
                return Ok(None);
            }
            std::thread::sleep(POLL_INTERVAL);
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Unix implementation using libc::flock
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(unix)]
fn flock_exclusive(file: &File) -> io::Result<()> {
    use std::os::unix::io::AsRawFd;
    let rc = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX) };
    if rc == 0 { Ok(()) } else { Err(io::Error::last_os_error()) }
}

#[cfg(unix)]
fn flock_try_exclusive(file: &File) -> io::Result<bool> {
    use std::os::unix::io::AsRawFd;
    let rc = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
    if rc == 0 {
        return Ok(true);
    }
    let err = io::Error::last_os_error();
    if err.kind() == io::ErrorKind::WouldBlock {
        Ok(false)
    } else {
        Err(err)
    }
}

#[cfg(unix)]
fn flock_unlock(file: &File) {
    use std::os::unix::io::AsRawFd;
    unsafe {
        let _ = libc::flock(file.as_raw_fd(), libc::LOCK_UN);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Non-Unix: no-op implementation
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(not(unix))]
fn flock_exclusive(_file: &File) -> io::Result<()> {
    Ok(())
}

#[cfg(not(unix))]
fn flock_try_exclusive(_file: &File) -> io::Result<bool> {
    Ok(true)
}

#[cfg(not(unix))]
fn flock_unlock(_file: &File) {}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn acquire_and_release_named_lock() {
        let dir = TempDir::new().unwrap();
        let locks = LockManager::new(dir.path());

        let guard = locks.acquire("sess-1", Duration::from_secs(1)).unwrap();
        assert!(guard.is_some());
        assert!(locks.lock_path("sess-1").exists());
        drop(guard);

        // Re-acquire after release.
        let again = locks.acquire("sess-1", Duration::from_secs(1)).unwrap();
        assert!(again.is_some());
    }

    #[cfg(unix)]
    #[test]
    fn contended_lock_times_out() {
        let dir = TempDir::new().unwrap();
        let locks = LockManager::new(dir.path());

        let _held = locks.acquire("sess-1", Duration::from_secs(1)).unwrap().unwrap();
        let second = locks.acquire("sess-1", Duration::from_millis(250)).unwrap();
        assert!(second.is_none(), "second acquire should time out");
    }

    #[test]
    fn different_resources_do_not_contend() {
        let dir = TempDir::new().unwrap();
        let locks = LockManager::new(dir.path());

        let a = locks.acquire("sess-a", Duration::from_secs(1)).unwrap();
        let b = locks.acquire("sess-b", Duration::from_secs(1)).unwrap();
        assert!(a.is_some());
        assert!(b.is_some());
    }

    #[test]
    fn guard_released_on_drop() {
        let dir = TempDir::new().unwrap();
        let locks = LockManager::new(dir.path());
        {
            let _guard = locks.acquire("sess-1", Duration::from_secs(1)).unwrap().unwrap();
        }
        let reclaimed = locks.acquire("sess-1", Duration::from_millis(200)).unwrap();
        assert!(reclaimed.is_some());
    }

    #[test]
    fn file_lock_on_open_handle() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("2025-01-15.jsonl");
        let file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&path)
            .unwrap();
        let lock = FileLock::acquire(file).unwrap();
        drop(lock);
    }
}
