//! # quill-core
//!
//! Shared primitives for the quill pipeline: content-derived event
//! fingerprints, ISO-8601 time helpers, atomic file writes, and advisory
//! file locks with a polling lock manager.

#![deny(unsafe_code)]

pub mod fsutil;
pub mod ids;
pub mod lock;
pub mod time;

pub use fsutil::atomic_write;
pub use ids::{event_fingerprint, path_lock_name, short_id};
pub use lock::{FileLock, LockError, LockGuard, LockManager};
pub use time::{date_of, format_clock, humanize_span, now_iso, parse_iso};
