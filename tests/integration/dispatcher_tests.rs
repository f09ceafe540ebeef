//! Worker pool and dispatcher behavior with scripted analyzers

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url_analyzer::config::WorkerConfig;
use url_analyzer::crawler::HeadingCounts;
use url_analyzer::storage::{JobStore, SqliteJobStore};
use url_analyzer::{CrawlResult, Dispatcher, FetchError, JobRecord, JobStatus, PageAnalyzer};

fn result_for(job: &JobRecord) -> CrawlResult {
    CrawlResult {
        document_type: "HTML5".to_string(),
        title: Some(job.url.clone()),
        headings: HeadingCounts::default(),
        internal_links: 0,
        external_links: 0,
        broken_links: 0,
        has_login_form: false,
    }
}

fn worker_config(pool_size: u32) -> WorkerConfig {
    WorkerConfig {
        pool_size,
        poll_interval_ms: 20,
        ..WorkerConfig::default()
    }
}

fn queue_jobs(store: &SqliteJobStore, count: usize, prefix: &str) -> Vec<i64> {
    (0..count)
        .map(|i| {
            store
                .create_job(&format!("https://{}{}.example/", prefix, i), None)
                .unwrap()
        })
        .collect()
}

async fn wait_for<F>(mut condition: F)
where
    F: FnMut() -> bool,
{
    for _ in 0..500 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached in time");
}

fn all_terminal(store: &SqliteJobStore, ids: &[i64]) -> bool {
    ids.iter()
        .all(|id| store.get_job(*id).unwrap().status.is_terminal())
}

/// Sleeps for a fixed time and records how many analyses overlap
struct SlowAnalyzer {
    delay: Duration,
    started: AtomicUsize,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl SlowAnalyzer {
    fn new(delay: Duration) -> Self {
        Self {
            delay,
            started: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl PageAnalyzer for SlowAnalyzer {
    async fn analyze(&self, job: &JobRecord) -> Result<CrawlResult, FetchError> {
        self.started.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        tokio::time::sleep(self.delay).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(result_for(job))
    }
}

#[tokio::test]
async fn test_concurrency_never_exceeds_pool_size() {
    let store = Arc::new(SqliteJobStore::open_in_memory().unwrap());
    let ids = queue_jobs(&store, 10, "site");
    let analyzer = Arc::new(SlowAnalyzer::new(Duration::from_millis(40)));

    let shutdown = CancellationToken::new();
    let handle =
        Dispatcher::new(worker_config(3), store.clone(), analyzer.clone()).start(shutdown.clone());

    wait_for(|| all_terminal(&store, &ids)).await;
    shutdown.cancel();
    let report = handle.await.unwrap();

    assert_eq!(report.claimed, 10);
    assert_eq!(report.completed, 10);
    assert!(analyzer.peak.load(Ordering::SeqCst) <= 3);
    assert!(ids
        .iter()
        .all(|id| store.get_job(*id).unwrap().status == JobStatus::Done));
}

#[tokio::test]
async fn test_cancel_finishes_in_flight_and_leaves_rest_queued() {
    let store = Arc::new(SqliteJobStore::open_in_memory().unwrap());
    let ids = queue_jobs(&store, 6, "site");
    let analyzer = Arc::new(SlowAnalyzer::new(Duration::from_millis(300)));

    let shutdown = CancellationToken::new();
    let handle =
        Dispatcher::new(worker_config(3), store.clone(), analyzer.clone()).start(shutdown.clone());

    wait_for(|| analyzer.started.load(Ordering::SeqCst) == 3).await;
    shutdown.cancel();
    let report = handle.await.unwrap();

    assert_eq!(report.claimed, 3);
    assert_eq!(report.completed, 3);

    let statuses: Vec<JobStatus> = ids
        .iter()
        .map(|id| store.get_job(*id).unwrap().status)
        .collect();
    assert_eq!(
        statuses.iter().filter(|s| **s == JobStatus::Done).count(),
        3
    );
    assert_eq!(
        statuses.iter().filter(|s| **s == JobStatus::Queued).count(),
        3
    );
    assert!(!statuses.contains(&JobStatus::Running));
}

#[tokio::test]
async fn test_cancel_with_free_slots_claims_nothing_more() {
    let store = Arc::new(SqliteJobStore::open_in_memory().unwrap());
    let in_flight = queue_jobs(&store, 3, "first");
    let analyzer = Arc::new(SlowAnalyzer::new(Duration::from_millis(300)));
    let config = WorkerConfig {
        pool_size: 5,
        poll_interval_ms: 60_000,
        ..WorkerConfig::default()
    };

    let shutdown = CancellationToken::new();
    let handle = Dispatcher::new(config, store.clone(), analyzer.clone()).start(shutdown.clone());

    wait_for(|| analyzer.started.load(Ordering::SeqCst) == 3).await;
    let later = queue_jobs(&store, 3, "later");
    shutdown.cancel();
    let report = handle.await.unwrap();

    assert_eq!(report.claimed, 3);
    assert_eq!(report.completed, 3);
    assert_eq!(analyzer.started.load(Ordering::SeqCst), 3);
    assert!(in_flight
        .iter()
        .all(|id| store.get_job(*id).unwrap().status == JobStatus::Done));
    assert!(later
        .iter()
        .all(|id| store.get_job(*id).unwrap().status == JobStatus::Queued));
}

/// Panics on URLs containing "panic", succeeds otherwise
struct PanickyAnalyzer;

#[async_trait]
impl PageAnalyzer for PanickyAnalyzer {
    async fn analyze(&self, job: &JobRecord) -> Result<CrawlResult, FetchError> {
        if job.url.contains("panic") {
            panic!("parser blew up on {}", job.url);
        }
        Ok(result_for(job))
    }
}

#[tokio::test]
async fn test_panic_marks_job_failed_and_worker_survives() {
    let store = Arc::new(SqliteJobStore::open_in_memory().unwrap());
    let bad = store.create_job("https://panic.example/", None).unwrap();
    let good = store.create_job("https://fine.example/", None).unwrap();

    let shutdown = CancellationToken::new();
    let handle = Dispatcher::new(worker_config(1), store.clone(), Arc::new(PanickyAnalyzer))
        .start(shutdown.clone());

    wait_for(|| all_terminal(&store, &[bad, good])).await;
    shutdown.cancel();
    let report = handle.await.unwrap();

    assert_eq!(report.completed, 1);
    assert_eq!(report.failed, 1);

    let bad = store.get_job(bad).unwrap();
    assert_eq!(bad.status, JobStatus::Error);
    assert!(bad
        .error_message
        .unwrap()
        .contains("parser blew up on https://panic.example/"));

    assert_eq!(store.get_job(good).unwrap().status, JobStatus::Done);
}

#[tokio::test]
async fn test_job_timeout_marks_job_failed() {
    let store = Arc::new(SqliteJobStore::open_in_memory().unwrap());
    let job_id = store.create_job("https://slow.example/", None).unwrap();

    let config = WorkerConfig {
        job_timeout_secs: 1,
        ..worker_config(1)
    };
    let analyzer = Arc::new(SlowAnalyzer::new(Duration::from_secs(30)));

    let shutdown = CancellationToken::new();
    let handle = Dispatcher::new(config, store.clone(), analyzer).start(shutdown.clone());

    wait_for(|| all_terminal(&store, &[job_id])).await;
    shutdown.cancel();
    handle.await.unwrap();

    let job = store.get_job(job_id).unwrap();
    assert_eq!(job.status, JobStatus::Error);
    assert_eq!(
        job.error_message.as_deref(),
        Some("analysis timed out after 1s")
    );
}

/// Counts how often each job is analyzed
#[derive(Default)]
struct CountingAnalyzer {
    calls: Mutex<HashMap<i64, u32>>,
}

#[async_trait]
impl PageAnalyzer for CountingAnalyzer {
    async fn analyze(&self, job: &JobRecord) -> Result<CrawlResult, FetchError> {
        *self.calls.lock().unwrap().entry(job.id).or_insert(0) += 1;
        tokio::time::sleep(Duration::from_millis(5)).await;
        Ok(result_for(job))
    }
}

#[tokio::test]
async fn test_competing_dispatchers_analyze_each_job_once() {
    let store = Arc::new(SqliteJobStore::open_in_memory().unwrap());
    let ids = queue_jobs(&store, 30, "race");
    let analyzer = Arc::new(CountingAnalyzer::default());

    let shutdown = CancellationToken::new();
    let first = Dispatcher::new(worker_config(4), store.clone(), analyzer.clone())
        .start(shutdown.clone());
    let second = Dispatcher::new(worker_config(4), store.clone(), analyzer.clone())
        .start(shutdown.clone());

    wait_for(|| all_terminal(&store, &ids)).await;
    shutdown.cancel();
    let first = first.await.unwrap();
    let second = second.await.unwrap();

    assert_eq!(first.claimed + second.claimed, 30);
    assert_eq!(first.completed + second.completed, 30);

    let calls = analyzer.calls.lock().unwrap();
    assert_eq!(calls.len(), 30);
    assert!(calls.values().all(|count| *count == 1));
}
