//! Fixed-size worker pool
//!
//! Workers share one bounded handoff channel. A worker slot is reserved with a
//! semaphore permit *before* the dispatcher claims a job, and the permit
//! travels with the job until its result has been written back, so no more
//! than `size` jobs are ever claimed and unfinished at once.

use crate::crawler::FetchError;
use crate::state::JobStatus;
use crate::storage::{JobRecord, JobStore};
use crate::worker::PageAnalyzer;
use std::any::Any;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex, OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// A claimed job together with the worker slot reserved for it
struct Assignment {
    job: JobRecord,
    permit: OwnedSemaphorePermit,
}

/// Shared dependencies of every worker
struct WorkerContext {
    store: Arc<dyn JobStore>,
    analyzer: Arc<dyn PageAnalyzer>,
    job_timeout: Option<Duration>,
}

/// Terminal outcomes written by the pool
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PoolTotals {
    pub completed: u64,
    pub failed: u64,
}

impl PoolTotals {
    fn record(&mut self, status: JobStatus) {
        match status {
            JobStatus::Done => self.completed += 1,
            JobStatus::Error => self.failed += 1,
            other => tracing::warn!(status = %other, "Worker finished a job in a non-terminal status"),
        }
    }

    fn merge(&mut self, other: PoolTotals) {
        self.completed += other.completed;
        self.failed += other.failed;
    }
}

/// Handle to a running pool of workers
pub struct WorkerPool {
    sender: mpsc::Sender<Assignment>,
    slots: Arc<Semaphore>,
    workers: JoinSet<PoolTotals>,
}

impl WorkerPool {
    /// Spawns `size` workers onto the current runtime
    pub fn spawn(
        size: usize,
        store: Arc<dyn JobStore>,
        analyzer: Arc<dyn PageAnalyzer>,
        job_timeout: Option<Duration>,
    ) -> Self {
        let size = size.max(1);
        let (sender, receiver) = mpsc::channel(size);
        let receiver = Arc::new(Mutex::new(receiver));
        let context = Arc::new(WorkerContext {
            store,
            analyzer,
            job_timeout,
        });

        let mut workers = JoinSet::new();
        for worker_id in 1..=size {
            workers.spawn(run_worker(worker_id, receiver.clone(), context.clone()));
        }

        tracing::info!(size, "Worker pool started");

        Self {
            sender,
            slots: Arc::new(Semaphore::new(size)),
            workers,
        }
    }

    /// Waits until a worker slot is free
    ///
    /// Returns `None` once shutdown is requested, even if a slot is free.
    pub async fn reserve(&self, shutdown: &CancellationToken) -> Option<OwnedSemaphorePermit> {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => None,
            permit = self.slots.clone().acquire_owned() => permit.ok(),
        }
    }

    /// Hands a claimed job to the next free worker
    ///
    /// Gives the job back if every worker has exited.
    pub async fn submit(
        &self,
        job: JobRecord,
        permit: OwnedSemaphorePermit,
    ) -> Result<(), JobRecord> {
        self.sender
            .send(Assignment { job, permit })
            .await
            .map_err(|mpsc::error::SendError(assignment)| assignment.job)
    }

    /// Closes the handoff channel and waits for every worker to drain it
    pub async fn shutdown(self) -> PoolTotals {
        let WorkerPool {
            sender,
            mut workers,
            ..
        } = self;
        drop(sender);

        let mut totals = PoolTotals::default();
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(worker_totals) => totals.merge(worker_totals),
                Err(e) => tracing::error!(error = %e, "Worker task ended abnormally"),
            }
        }

        tracing::info!(
            completed = totals.completed,
            failed = totals.failed,
            "All workers finished"
        );
        totals
    }
}

async fn run_worker(
    worker_id: usize,
    receiver: Arc<Mutex<mpsc::Receiver<Assignment>>>,
    context: Arc<WorkerContext>,
) -> PoolTotals {
    let mut totals = PoolTotals::default();

    loop {
        let next = {
            let mut receiver = receiver.lock().await;
            receiver.recv().await
        };
        let Some(assignment) = next else {
            break;
        };

        let Assignment { job, permit } = assignment;
        let job_id = job.id;
        tracing::debug!(worker = worker_id, job_id, url = %job.url, "Started crawling");
        let status = process_job(&context, job).await;
        tracing::debug!(worker = worker_id, job_id, status = %status, "Finished crawling");

        totals.record(status);
        drop(permit);
    }

    tracing::debug!(worker = worker_id, "Handoff channel closed, worker exiting");
    totals
}

/// Runs the analyzer for one job and writes the terminal status back
///
/// The analysis runs in its own task: a panic there becomes an `error`
/// status on the job instead of taking the worker down.
async fn process_job(context: &WorkerContext, mut job: JobRecord) -> JobStatus {
    let analyzer = context.analyzer.clone();
    let job_timeout = context.job_timeout;
    let snapshot = job.clone();

    let analysis = tokio::spawn(async move {
        let run = analyzer.analyze(&snapshot);
        match job_timeout {
            Some(limit) => match tokio::time::timeout(limit, run).await {
                Ok(outcome) => outcome,
                Err(_) => Err(FetchError::Timeout(limit)),
            },
            None => run.await,
        }
    });

    let outcome = match analysis.await {
        Ok(outcome) => outcome,
        Err(e) if e.is_panic() => Err(FetchError::Panicked(panic_message(e.into_panic()))),
        Err(e) => Err(FetchError::Panicked(e.to_string())),
    };

    match outcome {
        Ok(result) => {
            tracing::info!(
                job_id = job.id,
                url = %job.url,
                document_type = %result.document_type,
                broken_links = result.broken_links,
                "Analysis complete"
            );
            job.record_success(result);
        }
        Err(e) => {
            tracing::warn!(job_id = job.id, url = %job.url, error = %e, "Analysis failed");
            job.record_failure(e.to_string());
        }
    }

    if let Err(e) = context.store.save_result(&job) {
        tracing::error!(job_id = job.id, error = %e, "Failed to save crawl result");
    }

    job.status
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "worker task panicked".to_string()
    }
}
