//! Long-running poll daemon and one-shot drain.

use std::time::Duration;

use tokio::sync::watch;
use tracing::{info, warn};

use crate::context::WorkerContext;
use crate::cycle::{CycleReport, run_cycle};
use crate::errors::Result;
use crate::maintenance::sweep;

/// Poll the event log until `shutdown` flips to `true`.
///
/// Each tick runs one cycle and then a retention sweep. Cycle-level
/// errors never stop the daemon.
pub async fn run_daemon(ctx: &WorkerContext, mut shutdown: watch::Receiver<bool>) -> Result<()> {
    let poll = Duration::from_secs(ctx.settings.timing.poll_seconds);
    info!(
        poll_seconds = ctx.settings.timing.poll_seconds,
        queue = %ctx.log.queue_dir().display(),
        "worker daemon started"
    );

    let mut ticker = tokio::time::interval(poll);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let _ = run_cycle(ctx, false).await;
                if let Err(err) = sweep(ctx, true) {
                    warn!(%err, "retention sweep failed");
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }

    // One regular pass on the way out; anything still deferred stays in
    // the log and is picked up on the next start.
    let report = run_cycle(ctx, false).await;
    info!(?report, "worker daemon stopped");
    Ok(())
}

/// Process everything pending once, bypassing debounce, then return.
pub async fn drain(ctx: &WorkerContext) -> CycleReport {
    run_cycle(ctx, true).await
}
