//! # quill-state
//!
//! The per-session aggregate: [`SessionState`] is derived by folding log
//! events into previously persisted state, idempotently by event id.
//! The store persists one JSON file per session with atomic renames; the
//! debounce module is the pure flush decision over an aggregate.

pub mod debounce;
pub mod errors;
pub mod filter;
pub mod store;
pub mod summary;
pub mod types;

pub use debounce::{has_terminal_event, is_written, should_flush};
pub use errors::{Result, StateError};
pub use filter::{AcceptAll, MarkerFilter, RecursionFilter};
pub use store::{SessionStore, fold_events};
pub use summary::summarize_event;
pub use types::{EventSummary, SessionState};
