//! Crawler module for analyzing a single page
//!
//! This module contains the crawl pipeline and its pieces:
//! - HTTP fetching and error classification
//! - Document type detection from the body prefix
//! - HTML parsing and metric extraction
//! - Link classification and liveness checks

mod doctype;
mod fetcher;
mod links;
mod parser;
mod pipeline;

pub use doctype::{detect_document_type, UNKNOWN_DOCUMENT_TYPE};
pub use fetcher::{build_http_client, fetch_page, FetchError, FetchedPage, DOCTYPE_PREFIX_LEN};
pub use links::{check_link, classify_link, LinkCheck, LinkClass};
pub use parser::{parse_page, HeadingCounts, PageMetrics};
pub use pipeline::{crawl_url, CrawlResult, Crawler};

use crate::AnalyzerError;
use url::Url;

/// Parses a submitted URL and checks that it can be analyzed
///
/// Only absolute `http` and `https` URLs with a host are accepted.
pub fn parse_target_url(raw: &str) -> Result<Url, AnalyzerError> {
    let url = Url::parse(raw.trim())?;

    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(AnalyzerError::UnsupportedScheme {
            url: raw.to_string(),
        });
    }

    Ok(url)
}
