//! Knowledge extraction from finished sessions.
//!
//! When a session reaches a terminal flush, the worker asks an extractor to
//! distill what happened into a [`KnowledgePack`], which is rendered into
//! the note's summary block. Extraction is strictly best-effort: every
//! failure mode (spawn errors, timeouts, malformed output) degrades to "no
//! summary", never to a failed flush.

pub mod extract;
pub mod pack;

pub use extract::{CommandExtractor, KnowledgeExtractor, NoopExtractor};
pub use pack::KnowledgePack;
