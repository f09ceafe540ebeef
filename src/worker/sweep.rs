//! Stuck-job recovery
//!
//! A job left `running` by a process that died mid-crawl would never finish.
//! The sweep moves every `running` job whose last update is older than the
//! staleness threshold back to `queued` so it is picked up again.

use crate::storage::JobStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Requeues running jobs not updated within `threshold`
///
/// Returns how many jobs were reset. Store failures are logged and count as
/// zero; a failed sweep must not stop the dispatcher from starting.
pub fn reset_stuck_jobs(store: &dyn JobStore, threshold: Duration) -> u64 {
    match store.reset_stale_running(threshold) {
        Ok(0) => {
            tracing::debug!(threshold_secs = threshold.as_secs(), "No stuck jobs found");
            0
        }
        Ok(reset) => {
            tracing::info!(
                reset,
                threshold_secs = threshold.as_secs(),
                "Reset stuck jobs to queued"
            );
            reset
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to reset stuck jobs");
            0
        }
    }
}

/// Repeats the sweep every `every` until `shutdown` is cancelled
///
/// The first tick is skipped; the dispatcher already sweeps once at startup.
/// The task resolves to the total number of jobs it reset.
pub fn spawn_periodic_sweep(
    store: Arc<dyn JobStore>,
    threshold: Duration,
    every: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<u64> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        ticker.tick().await;

        let mut total = 0;
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    total += reset_stuck_jobs(store.as_ref(), threshold);
                }
            }
        }

        tracing::debug!(total, "Periodic sweep stopped");
        total
    })
}
