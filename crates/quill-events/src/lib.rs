//! # quill-events
//!
//! The event side of the pipeline: the immutable [`QueuedEvent`] record,
//! the ingestion boundary that turns raw hook payloads into events, and
//! the append-only, day-partitioned JSONL [`EventLog`] that is the single
//! source of truth for "what happened".

pub mod errors;
pub mod ingest;
pub mod log;
pub mod types;

pub use errors::{EventLogError, Result};
pub use ingest::event_from_hook_json;
pub use log::EventLog;
pub use types::{EventKind, QueuedEvent};
