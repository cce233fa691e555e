//! # quill-notes
//!
//! The document side of the pipeline: the managed-block mutator that
//! rewrites machine-owned regions of a note without touching human edits,
//! the timeline compactor that bounds rendered output for arbitrarily long
//! sessions, and the session note writer built on both.

pub mod blocks;
pub mod errors;
pub mod note;
pub mod timeline;

pub use blocks::{BlockMutator, WriteOutcome};
pub use errors::{NoteError, Result};
pub use note::NoteWriter;
pub use timeline::{TimelineGroup, render_timeline};
