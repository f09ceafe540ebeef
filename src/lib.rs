//! URL Analyzer: background crawl workers for submitted web pages
//!
//! Users queue URLs in a job store; this crate claims queued jobs, fetches and
//! parses each page, extracts structural and SEO metrics, validates outbound
//! links and writes the outcome back to the store.

pub mod config;
pub mod crawler;
pub mod output;
pub mod state;
pub mod storage;
pub mod worker;

use thiserror::Error;

/// Main error type for URL Analyzer operations
#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("Unsupported URL scheme for {url}: only http and https can be analyzed")]
    UnsupportedScheme { url: String },
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Result type alias for URL Analyzer operations
pub type Result<T> = std::result::Result<T, AnalyzerError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CrawlResult, Crawler, FetchError};
pub use state::JobStatus;
pub use storage::{BrokenLinkRecord, JobRecord, JobStore, SqliteJobStore};
pub use worker::{DispatchReport, Dispatcher, PageAnalyzer};
