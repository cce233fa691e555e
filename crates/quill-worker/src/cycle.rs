//! One consumer pass over the event log.
//!
//! A cycle groups pending events by session and processes each session
//! independently: lock, fold, decide, maybe materialize. One session
//! failing (or being locked by another consumer) never blocks the rest.
//! Every step is idempotent, so overlapping consumers and crash-rerun
//! both converge on the same notes.

use chrono::Utc;
use tracing::{debug, info, warn};

use quill_events::QueuedEvent;
use quill_settings::SynthesisMode;
use quill_state::{has_terminal_event, is_written, should_flush};

use crate::context::WorkerContext;
use crate::errors::Result;

/// How one session fared in a cycle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionOutcome {
    /// Note written (created or updated).
    Flushed,
    /// Another consumer holds the session lock; retried next cycle.
    Locked,
    /// Debounce window still open; state saved, note untouched.
    Deferred,
    /// Already materialized at or after the last event.
    AlreadyWritten,
    /// Session never saw a user prompt, or every event was filtered out;
    /// state persisted but no note exists for it.
    NotMaterialized,
}

/// Aggregate counts for one cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Sessions with pending events.
    pub sessions: usize,
    /// Notes written.
    pub flushed: usize,
    /// Sessions skipped because another consumer held the lock.
    pub locked: usize,
    /// Sessions still inside their debounce window.
    pub deferred: usize,
    /// Sessions persisted but not materialized.
    pub not_materialized: usize,
    /// Sessions that errored; details are in the log.
    pub errors: usize,
}

/// Process every session with pending events.
///
/// `force` bypasses the debounce window (drain semantics) but not the
/// already-written guard or the recursion/prompt gates.
pub async fn run_cycle(ctx: &WorkerContext, force: bool) -> CycleReport {
    let sessions = ctx.log.events_by_session();
    let mut report = CycleReport {
        sessions: sessions.len(),
        ..CycleReport::default()
    };

    for (session_id, events) in sessions {
        match process_session(ctx, &session_id, &events, force, false).await {
            Ok(SessionOutcome::Flushed) => report.flushed += 1,
            Ok(SessionOutcome::Locked) => report.locked += 1,
            Ok(SessionOutcome::Deferred) => report.deferred += 1,
            Ok(SessionOutcome::AlreadyWritten) => {}
            Ok(SessionOutcome::NotMaterialized) => report.not_materialized += 1,
            Err(err) => {
                report.errors += 1;
                warn!(session_id, %err, "session processing failed, continuing");
            }
        }
    }

    if report.sessions > 0 {
        debug!(?report, "cycle complete");
    }
    report
}

/// Process a single session's pending events.
///
/// `force` bypasses the debounce window; `bypass_written` additionally
/// ignores the already-written guard so an explicit re-run can rewrite
/// the note. Neither touches the persisted write marker, which only ever
/// advances.
pub async fn process_session(
    ctx: &WorkerContext,
    session_id: &str,
    events: &[QueuedEvent],
    force: bool,
    bypass_written: bool,
) -> Result<SessionOutcome> {
    let Some(_guard) = ctx.session_locks.acquire(session_id, ctx.lock_timeout())? else {
        debug!(session_id, "session locked by another consumer, skipping");
        return Ok(SessionOutcome::Locked);
    };

    let (mut state, applied) = ctx.store.fold(session_id, events, ctx.filter.as_ref())?;
    // A fold that applied nothing leaves the aggregate byte-identical, so
    // lingering sessions skip the rewrite instead of churning their state
    // file every poll.
    let dirty = applied > 0 || !ctx.store.state_path(session_id).exists();

    // Sessions with nothing materializable still persist their aggregate,
    // so replays stay idempotent, but never produce a note.
    if state.events.is_empty() || !state.has_user_prompt() {
        if dirty {
            ctx.store.save(&state)?;
        }
        debug!(session_id, "nothing to materialize");
        return Ok(SessionOutcome::NotMaterialized);
    }

    if !bypass_written && is_written(&state) {
        if dirty {
            ctx.store.save(&state)?;
        }
        return Ok(SessionOutcome::AlreadyWritten);
    }

    let immediate = has_terminal_event(events);
    let flush = force
        || should_flush(
            &state,
            ctx.settings.timing.debounce_seconds,
            immediate,
            Utc::now(),
        );
    if !flush {
        if dirty {
            ctx.store.save(&state)?;
        }
        return Ok(SessionOutcome::Deferred);
    }

    let path = ctx.writer.write(&state)?;
    info!(session_id, note = %path.display(), "session materialized");

    // Knowledge extraction runs once, on the terminal flush, and is
    // best-effort: a failed extraction still completes the flush.
    if immediate && ctx.settings.synthesis.mode == SynthesisMode::Full {
        if let Some(pack) = ctx.extractor.extract(&state).await {
            match ctx.writer.write_summary(&state, &pack.render_digest()) {
                Ok(outcome) => debug!(session_id, ?outcome, "summary written"),
                Err(err) => warn!(session_id, %err, "summary write failed"),
            }
        } else {
            debug!(session_id, "no knowledge pack produced");
        }
    }

    ctx.store.mark_written(&mut state)?;
    Ok(SessionOutcome::Flushed)
}

/// Re-process one session by id, rewriting its note even when already
/// written. Materialization is deterministic, so a re-run converges on
/// the same note content.
///
/// Errors with [`crate::WorkerError::UnknownSession`] when the log holds
/// no events for the id.
pub async fn process_session_by_id(
    ctx: &WorkerContext,
    session_id: &str,
) -> Result<SessionOutcome> {
    let events = ctx.log.events_for_session(session_id);
    if events.is_empty() {
        return Err(crate::WorkerError::UnknownSession(session_id.to_string()));
    }

    process_session(ctx, session_id, &events, true, true).await
}
