//! Output module for job statistics and reports
//!
//! This module handles:
//! - Loading per-status job counts from the job store
//! - Rendering single jobs and job listings as plain text

mod report;
pub mod stats;

pub use report::{format_job_detail, format_job_line};
pub use stats::{load_statistics, print_statistics, JobStatistics};
