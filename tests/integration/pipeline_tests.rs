//! Crawl pipeline tests against mock HTTP servers
//!
//! The analyzed page is always served from `127.0.0.1`; links to
//! `127.0.0.2` are therefore external and, with nothing listening on port 1,
//! unreachable.

use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url_analyzer::config::{HttpConfig, WorkerConfig};
use url_analyzer::crawler::{build_http_client, crawl_url, FetchError};
use url_analyzer::storage::{JobStore, SqliteJobStore};
use url_analyzer::{Crawler, Dispatcher, JobStatus};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const UNREACHABLE_LINK: &str = "http://127.0.0.2:1/gone";

fn http_config() -> HttpConfig {
    HttpConfig {
        user_agent: "url-analyzer-tests".to_string(),
        request_timeout_secs: 5,
        connect_timeout_secs: 2,
        link_check_concurrency: 4,
    }
}

async fn mount_page(server: &MockServer, route: &str, html: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_string(html))
        .mount(server)
        .await;
}

async fn mount_head(server: &MockServer, route: &str, status: u16) {
    Mock::given(method("HEAD"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

async fn wait_until_finished(store: &SqliteJobStore, job_id: i64) {
    for _ in 0..500 {
        if store.get_job(job_id).unwrap().status.is_terminal() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job {} did not finish", job_id);
}

#[tokio::test]
async fn test_end_to_end_job_analysis() {
    let server = MockServer::start().await;
    let base = server.uri();
    let port = server.address().port();
    // Same server, but a different host than the page was served from
    let external = format!("http://localhost:{}/b", port);

    let html = format!(
        r#"<!DOCTYPE html>
<html>
<head><title>  Example Home  </title></head>
<body>
  <h1>Welcome</h1>
  <h2>News</h2>
  <h2>Events</h2>
  <h4>Small print</h4>
  <form action="/login">
    <input type="text" name="user">
    <input type="PASSWORD" name="pass">
  </form>
  <a href="{base}/a">About</a>
  <a href="{external}">Elsewhere</a>
  <a href="/relative">Relative</a>
  <a href="mailto:someone@example.com">Mail</a>
  <a>No href</a>
</body>
</html>"#,
        base = base,
        external = external,
    );
    mount_page(&server, "/", html).await;
    mount_head(&server, "/a", 200).await;
    mount_head(&server, "/b", 404).await;

    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(SqliteJobStore::new(&dir.path().join("jobs.db")).unwrap());
    let job_id = store
        .create_job(&format!("{}/", base), Some("tester"))
        .unwrap();

    let crawler = Arc::new(Crawler::new(&http_config(), store.clone()).unwrap());
    let config = WorkerConfig {
        pool_size: 2,
        poll_interval_ms: 20,
        ..WorkerConfig::default()
    };
    let shutdown = CancellationToken::new();
    let handle = Dispatcher::new(config, store.clone(), crawler).start(shutdown.clone());

    wait_until_finished(&store, job_id).await;
    shutdown.cancel();
    let report = handle.await.unwrap();
    assert_eq!(report.completed, 1);

    let job = store.get_job(job_id).unwrap();
    assert_eq!(job.status, JobStatus::Done);
    assert_eq!(job.document_type.as_deref(), Some("HTML5"));
    assert_eq!(job.title.as_deref(), Some("Example Home"));
    assert_eq!(job.headings.levels(), [1, 2, 0, 1, 0, 0]);
    assert_eq!(job.internal_links, 1);
    assert_eq!(job.external_links, 1);
    assert_eq!(job.broken_links, 1);
    assert!(job.has_login_form);
    assert!(job.error_message.is_none());

    let broken = store.get_broken_links(job_id).unwrap();
    assert_eq!(broken.len(), 1);
    assert_eq!(broken[0].job_id, job_id);
    assert_eq!(broken[0].link, external);
    assert_eq!(broken[0].status_code, Some(404));
}

#[tokio::test]
async fn test_unreachable_and_missing_links_are_both_recorded() {
    let server = MockServer::start().await;
    let base = server.uri();

    let html = format!(
        r#"<!DOCTYPE html><html><body>
  <a href="{base}/missing">Missing</a>
  <a href="{unreachable}">Gone</a>
</body></html>"#,
        base = base,
        unreachable = UNREACHABLE_LINK,
    );
    mount_page(&server, "/links", html).await;
    mount_head(&server, "/missing", 404).await;

    let client = build_http_client(&http_config()).unwrap();
    let store = SqliteJobStore::open_in_memory().unwrap();
    let job_id = store.create_job(&format!("{}/links", base), None).unwrap();

    let result = crawl_url(&client, &store, job_id, &format!("{}/links", base), 2)
        .await
        .unwrap();

    assert_eq!(result.internal_links, 1);
    assert_eq!(result.external_links, 1);
    assert_eq!(result.broken_links, 2);

    let mut broken = store.get_broken_links(job_id).unwrap();
    broken.sort_by(|a, b| a.link.cmp(&b.link));
    assert_eq!(broken.len(), 2);
    // "http://127.0.0.1:..." sorts before "http://127.0.0.2:..."
    assert_eq!(broken[0].link, format!("{}/missing", base));
    assert_eq!(broken[0].status_code, Some(404));
    assert_eq!(broken[1].link, UNREACHABLE_LINK);
    assert_eq!(broken[1].status_code, None);
}

#[tokio::test]
async fn test_bad_status_fails_job_with_message() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/down"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let store = Arc::new(SqliteJobStore::open_in_memory().unwrap());
    let job_id = store
        .create_job(&format!("{}/down", server.uri()), None)
        .unwrap();

    let crawler = Arc::new(Crawler::new(&http_config(), store.clone()).unwrap());
    let config = WorkerConfig {
        pool_size: 1,
        poll_interval_ms: 20,
        ..WorkerConfig::default()
    };
    let shutdown = CancellationToken::new();
    let handle = Dispatcher::new(config, store.clone(), crawler).start(shutdown.clone());

    wait_until_finished(&store, job_id).await;
    shutdown.cancel();
    let report = handle.await.unwrap();
    assert_eq!(report.failed, 1);

    let job = store.get_job(job_id).unwrap();
    assert_eq!(job.status, JobStatus::Error);
    assert_eq!(
        job.error_message.as_deref(),
        Some("bad response from server: HTTP 503")
    );
    assert!(job.document_type.is_none());
    assert_eq!(job.broken_links, 0);
    assert!(store.get_broken_links(job_id).unwrap().is_empty());
}

#[tokio::test]
async fn test_legacy_doctype_and_missing_title() {
    let server = MockServer::start().await;
    let html = concat!(
        "\n  <!DOCTYPE HTML PUBLIC \"-//W3C//DTD HTML 4.01 Transitional//EN\"\n",
        "   \"http://www.w3.org/TR/html4/loose.dtd\">\n",
        "<html><head><title>   </title></head><body><h3>Only</h3></body></html>"
    );
    mount_page(&server, "/legacy", html.to_string()).await;

    let client = build_http_client(&http_config()).unwrap();
    let store = SqliteJobStore::open_in_memory().unwrap();
    let job_id = store.create_job("placeholder", None).unwrap();

    let result = crawl_url(
        &client,
        &store,
        job_id,
        &format!("{}/legacy", server.uri()),
        1,
    )
    .await
    .unwrap();

    assert_eq!(result.document_type, "HTML 4.01 Transitional");
    assert_eq!(result.title, None);
    assert_eq!(result.headings.level(3), 1);
    assert_eq!(result.headings.total(), 1);
    assert_eq!(result.internal_links, 0);
    assert_eq!(result.external_links, 0);
    assert_eq!(result.broken_links, 0);
    assert!(!result.has_login_form);
}

#[tokio::test]
async fn test_page_without_doctype_is_unknown() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/bare",
        "<html><body><p>no declaration</p></body></html>".to_string(),
    )
    .await;

    let client = build_http_client(&http_config()).unwrap();
    let store = SqliteJobStore::open_in_memory().unwrap();
    let job_id = store.create_job("placeholder", None).unwrap();

    let result = crawl_url(&client, &store, job_id, &format!("{}/bare", server.uri()), 1)
        .await
        .unwrap();

    assert_eq!(result.document_type, "Unknown");
}

#[tokio::test]
async fn test_unsupported_scheme_is_rejected_before_fetch() {
    let client = build_http_client(&http_config()).unwrap();
    let store = SqliteJobStore::open_in_memory().unwrap();

    let err = crawl_url(&client, &store, 1, "ftp://example.com/file", 1)
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::InvalidUrl { .. }));
}
