//! Content-derived identifiers.
//!
//! Event ids are sha256 fingerprints over the fields that make an event a
//! distinct logical occurrence (session id, timestamp, kind), so a
//! re-delivered event hashes to the same id and folding stays idempotent.

use sha2::{Digest, Sha256};

/// Number of hex characters kept from a sha256 digest.
const FINGERPRINT_LEN: usize = 16;

/// Compute the content-derived fingerprint for an event.
///
/// `sha256(session_id + ts + kind)` truncated to 16 hex characters.
/// Collisions are treated as true duplicates downstream (the fold is
/// idempotent by event id).
#[must_use]
pub fn event_fingerprint(session_id: &str, ts: &str, kind: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(session_id.as_bytes());
    hasher.update(ts.as_bytes());
    hasher.update(kind.as_bytes());
    let digest = hasher.finalize();
    hex_prefix(&digest, FINGERPRINT_LEN)
}

/// Derive a lock-file stem for a document path.
///
/// Document paths can contain separators and arbitrary unicode, so lock
/// files are named by a truncated sha256 of the full path instead.
#[must_use]
pub fn path_lock_name(path: &std::path::Path) -> String {
    let mut hasher = Sha256::new();
    hasher.update(path.to_string_lossy().as_bytes());
    let digest = hasher.finalize();
    hex_prefix(&digest, FINGERPRINT_LEN)
}

/// Shorten an id for log lines and filenames (first 8 characters).
#[must_use]
pub fn short_id(id: &str) -> &str {
    let end = id
        .char_indices()
        .nth(8)
        .map_or(id.len(), |(idx, _)| idx);
    &id[..end]
}

fn hex_prefix(digest: &[u8], len: usize) -> String {
    let mut out = String::with_capacity(len);
    for byte in digest {
        if out.len() >= len {
            break;
        }
        out.push_str(&format!("{byte:02x}"));
    }
    out.truncate(len);
    out
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
