//! Plain-text rendering of jobs for the command line

use crate::state::JobStatus;
use crate::storage::{BrokenLinkRecord, JobRecord};
use std::fmt::Write;

/// Formats a single job with its results and broken links
pub fn format_job_detail(job: &JobRecord, broken: &[BrokenLinkRecord]) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "Job #{}", job.id);
    let _ = writeln!(out, "  URL: {}", job.url);
    if let Some(owner) = &job.owner {
        let _ = writeln!(out, "  Owner: {}", owner);
    }
    let _ = writeln!(out, "  Status: {}", job.status);
    let _ = writeln!(out, "  Created: {}", job.created_at);
    let _ = writeln!(out, "  Updated: {}", job.updated_at);

    if let Some(message) = &job.error_message {
        let _ = writeln!(out, "  Error: {}", message);
    }

    if job.status == JobStatus::Done {
        out.push('\n');
        let _ = writeln!(
            out,
            "  Document type: {}",
            job.document_type.as_deref().unwrap_or("-")
        );
        let _ = writeln!(out, "  Title: {}", job.title.as_deref().unwrap_or("-"));

        let levels = job
            .headings
            .levels()
            .iter()
            .enumerate()
            .map(|(i, count)| format!("h{}={}", i + 1, count))
            .collect::<Vec<_>>()
            .join(" ");
        let _ = writeln!(out, "  Headings: {}", levels);
        let _ = writeln!(out, "  Internal links: {}", job.internal_links);
        let _ = writeln!(out, "  External links: {}", job.external_links);
        let _ = writeln!(out, "  Broken links: {}", job.broken_links);
        let _ = writeln!(
            out,
            "  Login form: {}",
            if job.has_login_form { "yes" } else { "no" }
        );
    }

    if !broken.is_empty() {
        out.push('\n');
        let _ = writeln!(out, "  Broken link details ({}):", broken.len());
        for record in broken {
            match record.status_code {
                Some(status) => {
                    let _ = writeln!(out, "    - [{}] {}", status, record.link);
                }
                None => {
                    let _ = writeln!(out, "    - [unreachable] {}", record.link);
                }
            }
        }
    }

    out
}

/// Formats a job as one row of a listing
pub fn format_job_line(job: &JobRecord) -> String {
    let title = job.title.as_deref().unwrap_or("");
    format!(
        "{:>6}  {:<8}  {}  {}",
        job.id, job.status, job.url, title
    )
    .trim_end()
    .to_string()
}
