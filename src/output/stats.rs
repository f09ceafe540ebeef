//! Statistics generation from the job store
//!
//! This module provides functionality for extracting and displaying
//! queue statistics from the storage layer.

use crate::state::JobStatus;
use crate::storage::JobStore;
use crate::AnalyzerError;
use std::collections::HashMap;

/// Job queue statistics summary
#[derive(Debug, Clone, Default)]
pub struct JobStatistics {
    /// Total number of jobs in the store
    pub total_jobs: u64,

    /// Count of jobs by status
    pub jobs_by_status: HashMap<JobStatus, u64>,

    /// Broken-link records across all jobs
    pub total_broken_links: u64,
}

impl JobStatistics {
    pub fn count(&self, status: JobStatus) -> u64 {
        self.jobs_by_status.get(&status).copied().unwrap_or(0)
    }

    /// Jobs still waiting for or undergoing a crawl
    pub fn active(&self) -> u64 {
        JobStatus::ALL
            .into_iter()
            .filter(JobStatus::is_active)
            .map(|status| self.count(status))
            .sum()
    }

    /// Share of finished jobs that ended as `done`, in percent
    pub fn success_rate(&self) -> f64 {
        let done = self.count(JobStatus::Done);
        let finished = done + self.count(JobStatus::Error);
        if finished == 0 {
            0.0
        } else {
            (done as f64 / finished as f64) * 100.0
        }
    }
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `store` - The job store to query
///
/// # Returns
///
/// * `Ok(JobStatistics)` - Successfully loaded statistics
/// * `Err(AnalyzerError)` - Failed to query statistics
pub fn load_statistics(store: &dyn JobStore) -> Result<JobStatistics, AnalyzerError> {
    let total_jobs = store.count_jobs(None)?;
    let total_broken_links = store.count_broken_links()?;

    let mut jobs_by_status = HashMap::new();
    for status in JobStatus::ALL {
        let count = store.count_jobs(Some(status))?;
        if count > 0 {
            jobs_by_status.insert(status, count);
        }
    }

    Ok(JobStatistics {
        total_jobs,
        jobs_by_status,
        total_broken_links,
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &JobStatistics) {
    println!("=== Job Statistics ===\n");

    println!("Overview:");
    println!("  Total jobs: {}", stats.total_jobs);
    println!("  Queued or running: {}", stats.active());
    println!("  Broken links recorded: {}", stats.total_broken_links);
    println!();

    println!("Jobs by Status:");
    for status in JobStatus::ALL {
        let count = stats.count(status);
        let percentage = if stats.total_jobs > 0 {
            (count as f64 / stats.total_jobs as f64) * 100.0
        } else {
            0.0
        };
        println!("  {}: {} ({:.1}%)", status, count, percentage);
    }
    println!();

    println!(
        "Success Rate: {:.1}% ({} done / {} error)",
        stats.success_rate(),
        stats.count(JobStatus::Done),
        stats.count(JobStatus::Error)
    );
}
