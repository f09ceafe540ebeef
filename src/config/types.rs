use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for URL Analyzer
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub worker: WorkerConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
}

/// Dispatcher, worker pool and sweep configuration
#[derive(Debug, Clone, Deserialize)]
pub struct WorkerConfig {
    /// Number of concurrent crawl workers
    #[serde(rename = "pool-size", default = "default_pool_size")]
    pub pool_size: u32,

    /// Delay before polling again when no queued job exists (milliseconds)
    #[serde(rename = "poll-interval-ms", default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// A running job untouched for this long is considered abandoned (seconds)
    #[serde(rename = "stale-after-secs", default = "default_stale_after_secs")]
    pub stale_after_secs: u64,

    /// Deadline for one whole crawl (seconds, 0 disables)
    #[serde(rename = "job-timeout-secs", default = "default_job_timeout_secs")]
    pub job_timeout_secs: u64,

    /// Period of the recurring stuck-job sweep (seconds, 0 = startup only)
    #[serde(rename = "sweep-interval-secs", default)]
    pub sweep_interval_secs: u64,

    /// How long the host waits for in-flight jobs after shutdown is requested
    #[serde(rename = "shutdown-grace-secs", default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,
}

impl WorkerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn stale_after(&self) -> Duration {
        Duration::from_secs(self.stale_after_secs)
    }

    pub fn job_timeout(&self) -> Option<Duration> {
        (self.job_timeout_secs > 0).then(|| Duration::from_secs(self.job_timeout_secs))
    }

    pub fn sweep_interval(&self) -> Option<Duration> {
        (self.sweep_interval_secs > 0).then(|| Duration::from_secs(self.sweep_interval_secs))
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            pool_size: default_pool_size(),
            poll_interval_ms: default_poll_interval_ms(),
            stale_after_secs: default_stale_after_secs(),
            job_timeout_secs: default_job_timeout_secs(),
            sweep_interval_secs: 0,
            shutdown_grace_secs: default_shutdown_grace_secs(),
        }
    }
}

/// Outbound HTTP configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// User-Agent header sent with every request
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    /// Per-request timeout for the page GET and each link HEAD (seconds)
    #[serde(rename = "request-timeout-secs", default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// TCP/TLS connect timeout (seconds)
    #[serde(rename = "connect-timeout-secs", default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Number of link liveness checks in flight at once for one page
    #[serde(
        rename = "link-check-concurrency",
        default = "default_link_check_concurrency"
    )]
    pub link_check_concurrency: u32,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            request_timeout_secs: default_request_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            link_check_concurrency: default_link_check_concurrency(),
        }
    }
}

/// Job store location
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file
    #[serde(default = "default_database_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

fn default_pool_size() -> u32 {
    5
}

fn default_poll_interval_ms() -> u64 {
    3_000
}

fn default_stale_after_secs() -> u64 {
    600
}

fn default_job_timeout_secs() -> u64 {
    120
}

fn default_shutdown_grace_secs() -> u64 {
    5
}

fn default_user_agent() -> String {
    format!("url-analyzer/{}", env!("CARGO_PKG_VERSION"))
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_link_check_concurrency() -> u32 {
    1
}

fn default_database_path() -> String {
    "./url-analyzer.db".to_string()
}
