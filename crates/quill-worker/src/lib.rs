//! # quill-worker
//!
//! The consumer side of the pipeline: polls the append-only event log,
//! folds per-session aggregates, applies the debounce decision, and
//! materializes session notes.
//!
//! Three entry points share the same cycle machinery:
//! - [`run_daemon`] — long-running poll loop with graceful shutdown
//! - [`drain`] — one-shot pass that bypasses debounce
//! - [`process_session_by_id`] — deterministic single-session re-run

#![deny(unsafe_code)]

pub mod context;
pub mod cycle;
pub mod daemon;
pub mod errors;
pub mod maintenance;
pub mod status;

pub use context::WorkerContext;
pub use cycle::{CycleReport, SessionOutcome, process_session, process_session_by_id, run_cycle};
pub use daemon::{drain, run_daemon};
pub use errors::{Result, WorkerError};
pub use maintenance::{SweepReport, sweep};
pub use status::{SessionStatus, StatusReport, status};
