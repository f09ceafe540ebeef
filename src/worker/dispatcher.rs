//! Dispatcher loop
//!
//! Polls the job store for queued work, claims one job at a time and hands
//! it to the worker pool. The loop never claims a job unless a worker slot
//! is already reserved for it, so a claimed job never sits `running` in a
//! queue waiting for a worker.

use crate::config::WorkerConfig;
use crate::storage::JobStore;
use crate::worker::pool::WorkerPool;
use crate::worker::sweep::{reset_stuck_jobs, spawn_periodic_sweep};
use crate::worker::PageAnalyzer;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Summary of one dispatcher run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DispatchReport {
    /// Stuck jobs requeued by the startup and periodic sweeps
    pub recovered: u64,
    /// Jobs claimed from the queue
    pub claimed: u64,
    /// Jobs that finished as `done`
    pub completed: u64,
    /// Jobs that finished as `error`
    pub failed: u64,
}

/// Owns the worker pool and the claim loop
pub struct Dispatcher {
    config: WorkerConfig,
    store: Arc<dyn JobStore>,
    analyzer: Arc<dyn PageAnalyzer>,
}

impl Dispatcher {
    pub fn new(
        config: WorkerConfig,
        store: Arc<dyn JobStore>,
        analyzer: Arc<dyn PageAnalyzer>,
    ) -> Self {
        Self {
            config,
            store,
            analyzer,
        }
    }

    /// Runs the dispatcher on its own task
    pub fn start(self, shutdown: CancellationToken) -> JoinHandle<DispatchReport> {
        tokio::spawn(self.run(shutdown))
    }

    /// Runs until `shutdown` is cancelled and every in-flight job is written
    ///
    /// # Behavior
    ///
    /// - Sweeps stuck jobs once before the first claim
    /// - Optionally keeps sweeping on `sweep-interval-secs`
    /// - Reserves a worker slot, then claims the oldest queued job
    /// - Sleeps for the poll interval when the queue is empty or the claim
    ///   fails, waking early on shutdown
    /// - On shutdown stops claiming, lets in-flight jobs finish and returns
    pub async fn run(self, shutdown: CancellationToken) -> DispatchReport {
        let mut report = DispatchReport {
            recovered: reset_stuck_jobs(self.store.as_ref(), self.config.stale_after()),
            ..DispatchReport::default()
        };

        let sweeper = self.config.sweep_interval().map(|every| {
            spawn_periodic_sweep(
                self.store.clone(),
                self.config.stale_after(),
                every,
                shutdown.child_token(),
            )
        });

        let pool = WorkerPool::spawn(
            self.config.pool_size as usize,
            self.store.clone(),
            self.analyzer.clone(),
            self.config.job_timeout(),
        );
        let poll_interval = self.config.poll_interval();

        tracing::info!(
            pool_size = self.config.pool_size,
            poll_interval_ms = self.config.poll_interval_ms,
            "Dispatcher started"
        );

        loop {
            let Some(permit) = pool.reserve(&shutdown).await else {
                break;
            };
            if shutdown.is_cancelled() {
                drop(permit);
                break;
            }

            let job = match self.store.claim_next_queued() {
                Ok(Some(job)) => job,
                Ok(None) => {
                    drop(permit);
                    if idle(&shutdown, poll_interval).await {
                        break;
                    }
                    continue;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to claim next job");
                    drop(permit);
                    if idle(&shutdown, poll_interval).await {
                        break;
                    }
                    continue;
                }
            };

            report.claimed += 1;
            tracing::debug!(job_id = job.id, url = %job.url, "Claimed job");

            if let Err(job) = pool.submit(job, permit).await {
                // Every worker is gone; the job stays `running` until a sweep
                // requeues it.
                tracing::error!(job_id = job.id, "Worker pool closed, stopping dispatcher");
                break;
            }
        }

        tracing::info!("Shutdown requested, waiting for in-flight jobs");
        let totals = pool.shutdown().await;
        report.completed = totals.completed;
        report.failed = totals.failed;

        if let Some(sweeper) = sweeper {
            match sweeper.await {
                Ok(reset) => report.recovered += reset,
                Err(e) => tracing::warn!(error = %e, "Periodic sweep task failed"),
            }
        }

        tracing::info!(
            recovered = report.recovered,
            claimed = report.claimed,
            completed = report.completed,
            failed = report.failed,
            "Dispatcher stopped"
        );
        report
    }
}

/// Sleeps for `period`; returns true if shutdown was requested meanwhile
async fn idle(shutdown: &CancellationToken, period: std::time::Duration) -> bool {
    tokio::select! {
        biased;
        _ = shutdown.cancelled() => true,
        _ = tokio::time::sleep(period) => false,
    }
}
