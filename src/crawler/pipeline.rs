//! The crawl pipeline: fetch, classify, parse, extract, validate links
//!
//! One invocation analyzes one page and either returns a `CrawlResult` or
//! fails as a whole with a `FetchError`. Broken links are written to the
//! job store as they are found; a failing link never fails the crawl.

use crate::config::HttpConfig;
use crate::crawler::doctype::detect_document_type;
use crate::crawler::fetcher::{build_http_client, fetch_page, FetchError};
use crate::crawler::links::{check_link, classify_link, LinkClass};
use crate::crawler::parser::{parse_page, HeadingCounts};
use crate::crawler::parse_target_url;
use crate::storage::{JobRecord, JobStore};
use crate::worker::PageAnalyzer;
use crate::AnalyzerError;
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use reqwest::Client;
use std::sync::Arc;

/// Metrics gathered from one successfully fetched page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlResult {
    pub document_type: String,
    pub title: Option<String>,
    pub headings: HeadingCounts,
    pub internal_links: u32,
    pub external_links: u32,
    /// Internal and external links combined
    pub broken_links: u32,
    pub has_login_form: bool,
}

/// Runs the full pipeline for one job
///
/// # Steps
///
/// 1. GET the page; transport failures and HTTP >= 400 abort
/// 2. Detect the document type from the body prefix
/// 3. Parse the full body
/// 4. Extract title, heading counts and the login-form flag
/// 5. Count absolute links as internal or external
/// 6. HEAD every absolute link, recording each broken one
///
/// `link_concurrency` bounds how many HEAD checks run at once; with 1 the
/// links are checked one after another in document order.
pub async fn crawl_url(
    client: &Client,
    store: &dyn JobStore,
    job_id: i64,
    url: &str,
    link_concurrency: usize,
) -> Result<CrawlResult, FetchError> {
    let target = parse_target_url(url).map_err(|e| FetchError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    let page = fetch_page(client, target).await?;
    let document_type = detect_document_type(page.prefix());
    let metrics = parse_page(&page.text());

    let document_host = page.final_url.host_str().unwrap_or_default().to_string();
    let mut internal_links = 0;
    let mut external_links = 0;
    for link in &metrics.absolute_links {
        match classify_link(link, &document_host) {
            LinkClass::Internal => internal_links += 1,
            LinkClass::External => external_links += 1,
        }
    }

    tracing::debug!(
        job_id,
        url,
        document_type,
        links = metrics.absolute_links.len(),
        "Parsed page, checking links"
    );

    let mut checks = stream::iter(metrics.absolute_links.clone())
        .map(|link| {
            let client = client.clone();
            async move {
                let check = check_link(&client, &link).await;
                (link, check)
            }
        })
        .buffer_unordered(link_concurrency.max(1));

    let mut broken_links = 0;
    while let Some((link, check)) = checks.next().await {
        if !check.is_broken() {
            continue;
        }

        broken_links += 1;
        tracing::debug!(job_id, link = %link, outcome = ?check, "Broken link");
        if let Err(e) = store.create_broken_link(job_id, &link, check.status_code()) {
            tracing::error!(job_id, link = %link, error = %e, "Failed to record broken link");
        }
    }

    Ok(CrawlResult {
        document_type: document_type.to_string(),
        title: metrics.title,
        headings: metrics.headings,
        internal_links,
        external_links,
        broken_links,
        has_login_form: metrics.has_login_form,
    })
}

/// The production analyzer: crawls each job's URL over HTTP
pub struct Crawler {
    client: Client,
    store: Arc<dyn JobStore>,
    link_concurrency: usize,
}

impl Crawler {
    pub fn new(config: &HttpConfig, store: Arc<dyn JobStore>) -> Result<Self, AnalyzerError> {
        Ok(Self {
            client: build_http_client(config)?,
            store,
            link_concurrency: config.link_check_concurrency as usize,
        })
    }
}

#[async_trait]
impl PageAnalyzer for Crawler {
    async fn analyze(&self, job: &JobRecord) -> Result<CrawlResult, FetchError> {
        crawl_url(
            &self.client,
            self.store.as_ref(),
            job.id,
            &job.url,
            self.link_concurrency,
        )
        .await
    }
}
