//! State module for tracking job progress
//!
//! `JobStatus` is the status machine every submitted URL moves through:
//! `queued -> running -> {done, error}`, plus the externally triggered
//! `running -> stopped` and `any -> queued` (requeue).

mod job_status;

pub use job_status::JobStatus;
