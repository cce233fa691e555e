//! Wiring for the consumer loop.

use std::sync::Arc;
use std::time::Duration;

use quill_core::LockManager;
use quill_events::EventLog;
use quill_notes::{BlockMutator, NoteWriter};
use quill_settings::{QuillSettings, SynthesisMode};
use quill_state::{MarkerFilter, RecursionFilter, SessionStore};
use quill_synth::{CommandExtractor, KnowledgeExtractor, NoopExtractor};

/// Everything a worker cycle needs, built once from settings.
///
/// Components are owned here so single-session entry points, the daemon,
/// and tests all run against the same wiring.
pub struct WorkerContext {
    /// Loaded settings snapshot.
    pub settings: QuillSettings,
    /// Append-only event log.
    pub log: EventLog,
    /// Per-session aggregate store.
    pub store: SessionStore,
    /// Session advisory locks, living next to the aggregates.
    pub session_locks: LockManager,
    /// Note materialization.
    pub writer: NoteWriter,
    /// Recursion filter applied during folds.
    pub filter: Arc<dyn RecursionFilter>,
    /// Knowledge extractor for terminal flushes.
    pub extractor: Arc<dyn KnowledgeExtractor>,
}

impl WorkerContext {
    /// Build the full pipeline wiring from settings.
    #[must_use]
    pub fn from_settings(settings: QuillSettings) -> Self {
        let lock_timeout = Duration::from_secs(settings.timing.lock_timeout_seconds);
        let mutator = BlockMutator::new(LockManager::new(settings.note_lock_dir()), lock_timeout);
        let writer = NoteWriter::new(
            settings.vault_root_path(),
            mutator,
            settings.timeline.max_entries,
        );
        let extractor: Arc<dyn KnowledgeExtractor> = match settings.synthesis.mode {
            SynthesisMode::Log => Arc::new(NoopExtractor),
            SynthesisMode::Full => Arc::new(CommandExtractor::new(
                settings.synthesis.command.clone(),
                Duration::from_secs(settings.synthesis.timeout_seconds),
            )),
        };

        Self {
            log: EventLog::new(settings.queue_dir()),
            store: SessionStore::new(settings.state_dir()),
            session_locks: LockManager::new(settings.state_dir()),
            writer,
            filter: Arc::new(MarkerFilter::new(settings.recursion_markers.clone())),
            extractor,
            settings,
        }
    }

    /// How long to wait on a contended session lock.
    #[must_use]
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_secs(self.settings.timing.lock_timeout_seconds)
    }
}
