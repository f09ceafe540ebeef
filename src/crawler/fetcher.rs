//! HTTP fetcher implementation
//!
//! This module handles the page request for the crawler:
//! - Building the HTTP client with user agent and timeouts
//! - GET requests to fetch page content
//! - Error classification into `FetchError`

use crate::config::HttpConfig;
use reqwest::Client;
use std::borrow::Cow;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Number of leading body bytes inspected for the document type
pub const DOCTYPE_PREFIX_LEN: usize = 4096;

/// Reasons an analysis can fail as a whole
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("bad response from server: HTTP {status}")]
    BadStatus { status: u16 },

    #[error("failed to read response body from {url}: {source}")]
    Body {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("analysis timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("analysis aborted unexpectedly: {0}")]
    Panicked(String),
}

/// A fetched page body together with where it was finally served from
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final URL after redirects
    pub final_url: Url,
    /// Raw body bytes
    pub body: Vec<u8>,
}

impl FetchedPage {
    /// The leading bytes used for document type detection
    ///
    /// This borrows from the body, so the full document stays available for
    /// parsing afterwards.
    pub fn prefix(&self) -> &[u8] {
        &self.body[..self.body.len().min(DOCTYPE_PREFIX_LEN)]
    }

    /// The whole body as text, replacing invalid UTF-8 sequences
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

/// Builds an HTTP client with proper configuration
///
/// The request timeout applies to the page GET and to every link HEAD, so a
/// single unresponsive server cannot hold a worker indefinitely.
///
/// # Example
///
/// ```no_run
/// use url_analyzer::config::HttpConfig;
/// use url_analyzer::crawler::build_http_client;
///
/// let client = build_http_client(&HttpConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &HttpConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches a page with a single GET request
///
/// # Error Mapping
///
/// | Condition | Result |
/// |-----------|--------|
/// | Transport failure (DNS, connect, TLS, timeout) | `FetchError::Transport` |
/// | HTTP status >= 400 | `FetchError::BadStatus` |
/// | Body read interrupted | `FetchError::Body` |
///
/// There is no retry; a failed fetch fails the job.
pub async fn fetch_page(client: &Client, url: Url) -> Result<FetchedPage, FetchError> {
    let response = client
        .get(url.clone())
        .send()
        .await
        .map_err(|source| FetchError::Transport {
            url: url.to_string(),
            source,
        })?;

    let status = response.status();
    if status.as_u16() >= 400 {
        return Err(FetchError::BadStatus {
            status: status.as_u16(),
        });
    }

    let final_url = response.url().clone();
    let body = response
        .bytes()
        .await
        .map_err(|source| FetchError::Body {
            url: url.to_string(),
            source,
        })?;

    Ok(FetchedPage {
        final_url,
        body: body.to_vec(),
    })
}
