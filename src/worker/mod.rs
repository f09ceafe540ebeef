//! Background job processing
//!
//! This module contains the long-running side of the analyzer:
//! - The stuck-job sweep that recovers jobs abandoned by a crashed process
//! - The dispatcher loop that claims queued jobs
//! - The fixed-size worker pool that runs the crawl pipeline
//!
//! # Architecture
//!
//! ```text
//! Dispatcher::run
//!     │
//!     ├─► reset_stuck_jobs (once) ──► optional periodic sweep task
//!     ├─► reserve worker slot (semaphore)
//!     ├─► JobStore::claim_next_queued
//!     └─► mpsc handoff ──► worker 1..N
//!                              ├─► PageAnalyzer::analyze (own task, deadline)
//!                              └─► JobStore::save_result
//! ```

mod dispatcher;
mod pool;
mod sweep;

pub use dispatcher::{DispatchReport, Dispatcher};
pub use pool::{PoolTotals, WorkerPool};
pub use sweep::{reset_stuck_jobs, spawn_periodic_sweep};

use crate::crawler::{CrawlResult, FetchError};
use crate::storage::JobRecord;
use async_trait::async_trait;

/// Something that can turn a claimed job into a crawl result
///
/// The production implementation is [`crate::crawler::Crawler`].
#[async_trait]
pub trait PageAnalyzer: Send + Sync {
    async fn analyze(&self, job: &JobRecord) -> Result<CrawlResult, FetchError>;
}
