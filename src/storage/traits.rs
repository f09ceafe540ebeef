//! Storage traits and error types
//!
//! This module defines the trait interface for job store backends and
//! associated error types.

use crate::state::JobStatus;
use crate::storage::{BrokenLinkRecord, JobQuery, JobRecord};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Job not found: {0}")]
    JobNotFound(i64),

    #[error("Storage lock poisoned")]
    LockPoisoned,

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for job store implementations
///
/// Implementations synchronize internally; every method takes `&self` so a
/// single store can be shared between the dispatcher and all workers.
pub trait JobStore: Send + Sync {
    // ===== Submission and lookup =====

    /// Inserts a new job with status `queued` and returns its ID
    fn create_job(&self, url: &str, owner: Option<&str>) -> StorageResult<i64>;

    /// Gets a job by ID
    fn get_job(&self, job_id: i64) -> StorageResult<JobRecord>;

    /// Lists jobs matching the query, oldest first
    fn list_jobs(&self, query: &JobQuery) -> StorageResult<Vec<JobRecord>>;

    /// Counts jobs, optionally restricted to one status
    fn count_jobs(&self, status: Option<JobStatus>) -> StorageResult<u64>;

    // ===== Worker contract =====

    /// Finds one queued job, marks it running and returns it
    ///
    /// The transition is a conditional update on `status = 'queued'`, so two
    /// claimers can never both receive the same job.
    fn claim_next_queued(&self) -> StorageResult<Option<JobRecord>>;

    /// Persists the job's status and every result field as held in memory
    fn save_result(&self, job: &JobRecord) -> StorageResult<()>;

    /// Appends a broken-link record to a job
    fn create_broken_link(
        &self,
        job_id: i64,
        link: &str,
        status_code: Option<u16>,
    ) -> StorageResult<i64>;

    /// Transitions every `running` job last updated more than `older_than`
    /// ago back to `queued`, returning how many changed
    fn reset_stale_running(&self, older_than: Duration) -> StorageResult<u64>;

    // ===== Host-side operations =====

    /// Sets `to` on the given jobs
    ///
    /// With `from` set, only jobs currently in that status change. Without
    /// it, only jobs whose current status may legally move to `to` change.
    /// Returns the number of jobs changed.
    fn bulk_set_status(
        &self,
        ids: &[i64],
        from: Option<JobStatus>,
        to: JobStatus,
    ) -> StorageResult<u64>;

    /// Gets the broken links recorded for a job
    fn get_broken_links(&self, job_id: i64) -> StorageResult<Vec<BrokenLinkRecord>>;

    /// Counts broken-link records across all jobs
    fn count_broken_links(&self) -> StorageResult<u64>;

    /// Deletes jobs together with their broken-link records
    fn delete_jobs(&self, ids: &[i64]) -> StorageResult<u64>;
}
