//! Storage module for persisting analysis jobs
//!
//! This module handles all database operations for the analyzer, including:
//! - SQLite database initialization and schema management
//! - Claiming queued jobs and writing crawl results back
//! - Broken-link records attached to a job
//! - Bulk status changes (requeue / stop) and stale-job recovery

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteJobStore;
pub use traits::{JobStore, StorageError, StorageResult};

use crate::crawler::{CrawlResult, HeadingCounts};
use crate::state::JobStatus;
use crate::AnalyzerError;

use std::path::Path;

/// Opens (or creates) the job store at the given path
pub fn open_store(path: &Path) -> Result<SqliteJobStore, AnalyzerError> {
    SqliteJobStore::new(path)
}

/// Represents one submitted URL in the database
#[derive(Debug, Clone)]
pub struct JobRecord {
    pub id: i64,
    pub url: String,
    /// Opaque reference to the submitting user
    pub owner: Option<String>,
    pub status: JobStatus,
    pub document_type: Option<String>,
    pub title: Option<String>,
    pub headings: HeadingCounts,
    pub internal_links: u32,
    pub external_links: u32,
    pub broken_links: u32,
    pub has_login_form: bool,
    pub error_message: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl JobRecord {
    /// Folds a finished crawl into the job: status `done`, every result
    /// field replaced, previous error cleared.
    pub fn record_success(&mut self, result: CrawlResult) {
        self.status = JobStatus::Done;
        self.document_type = Some(result.document_type);
        self.title = result.title;
        self.headings = result.headings;
        self.internal_links = result.internal_links;
        self.external_links = result.external_links;
        self.broken_links = result.broken_links;
        self.has_login_form = result.has_login_form;
        self.error_message = None;
    }

    /// Marks the job failed. Result fields are reset so they are only ever
    /// populated on a `done` job.
    pub fn record_failure(&mut self, reason: impl Into<String>) {
        self.status = JobStatus::Error;
        self.document_type = None;
        self.title = None;
        self.headings = HeadingCounts::default();
        self.internal_links = 0;
        self.external_links = 0;
        self.broken_links = 0;
        self.has_login_form = false;
        self.error_message = Some(reason.into());
    }
}

/// A hyperlink found on an analyzed page that failed its liveness check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokenLinkRecord {
    pub id: i64,
    pub job_id: i64,
    pub link: String,
    /// HTTP status observed; `None` when the link was unreachable
    pub status_code: Option<u16>,
    pub created_at: String,
}

/// Filter and paging options for listing jobs
#[derive(Debug, Clone)]
pub struct JobQuery {
    pub status: Option<JobStatus>,
    /// Substring match against the job URL
    pub search: Option<String>,
    pub owner: Option<String>,
    pub limit: u32,
    pub offset: u32,
}

impl Default for JobQuery {
    fn default() -> Self {
        Self {
            status: None,
            search: None,
            owner: None,
            limit: 10,
            offset: 0,
        }
    }
}
