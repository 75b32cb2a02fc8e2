//! Integration tests for the crawl pipeline
//!
//! These tests use wiremock to serve pages and robots.txt files and run
//! full pipeline passes against a SQLite store in a temporary directory.

use crawlflow::config::{load_job_config, load_policies};
use crawlflow::crawler::run_pipeline;
use crawlflow::state::FetchStatus;
use crawlflow::storage::{open_store, DocumentStore, SqliteStore};
use crawlflow::RunReport;
use std::path::Path;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Writes a job file and fetcher policy into `dir`
///
/// `url_filter` entries are written to a filter file when non-empty.
fn write_job(dir: &Path, url_filter: &[&str]) {
    let filter_line = if url_filter.is_empty() {
        String::new()
    } else {
        let entries: String = url_filter
            .iter()
            .map(|entry| format!("  - \"{}\"\n", entry))
            .collect();
        std::fs::write(
            dir.join("url_filter.yaml"),
            format!("domain_urlfilter:\n{}", entries),
        )
        .unwrap();
        "url-filter = \"url_filter.yaml\"\n".to_string()
    };

    std::fs::write(
        dir.join("crawl.toml"),
        format!(
            r#"[job]
name = "test-crawl"
shard-count = 2
max-shard-attempts = 2
work-dir = "work"

[storage]
database-path = "crawl.db"

[policies]
fetcher-policy = "fetcher_policy.yaml"
{}"#,
            filter_line
        ),
    )
    .unwrap();

    std::fs::write(
        dir.join("fetcher_policy.yaml"),
        r#"fetcher_policy:
  agent_name: TestBot
  email_address: bot@example.com
  web_address: https://example.com/bot
  max_content_size:
    - content_type: text/html
      size: 65536
  max_redirects: 3
  accept_language: en
  valid_mime_types: text/html,text/plain
  request_timeout: 5000
"#,
    )
    .unwrap();
}

fn seed(dir: &Path, urls: &[String]) {
    let store = open_store(&dir.join("crawl.db")).unwrap();
    for url in urls {
        assert!(store.insert_seed(url).unwrap());
    }
}

async fn run(dir: &Path) -> RunReport {
    let config = load_job_config(&dir.join("crawl.toml")).unwrap();
    let policies = load_policies(&config, dir).unwrap();
    let mut report = run_pipeline(&config, &policies, dir).await.unwrap();
    report.wait_for_cleanup().await;
    report
}

fn store(dir: &Path) -> SqliteStore {
    open_store(&dir.join("crawl.db")).unwrap()
}

fn status_of(store: &SqliteStore, url: &str) -> FetchStatus {
    store
        .get_record(url)
        .unwrap()
        .unwrap_or_else(|| panic!("no record for {}", url))
        .status
}

fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.into_bytes(), "text/html")
}

#[tokio::test]
async fn test_full_pass_fetches_skips_and_grows_frontier() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /private"),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(format!(
            r#"<html><body>
            <a href="{base}/private">private</a>
            <a href="http://b.example/x">x</a>
            <a href="/private">relative</a>
            </body></html>"#
        )))
        .expect(1)
        .mount(&server)
        .await;

    // Disallowed pages must never be requested
    Mock::given(method("GET"))
        .and(path("/private/secret"))
        .respond_with(html("secret".to_string()))
        .expect(0)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    write_job(dir.path(), &[]);
    let root = format!("{}/", base);
    let secret = format!("{}/private/secret", base);
    seed(dir.path(), &[root.clone(), secret.clone()]);

    let report = run(dir.path()).await;
    assert_eq!(report.stages.len(), 5);
    assert!(report.outlinks_succeeded());

    let store = store(dir.path());
    assert_eq!(status_of(&store, &root), FetchStatus::Fetched);
    assert_eq!(status_of(&store, &secret), FetchStatus::Skipped);

    let content = store.get_content(&root).unwrap().unwrap();
    assert_eq!(content.mime_type, "text/html");
    assert!(content.content_text.unwrap().contains("b.example"));

    let external = store.get_record("http://b.example/x").unwrap().unwrap();
    assert_eq!(external.status, FetchStatus::Unfetched);
    assert_eq!(external.crawl_depth, 1);
    assert_eq!(external.parent_url.as_deref(), Some(root.as_str()));
    assert_eq!(external.domain, None);

    let private = store
        .get_record(&format!("{}/private", base))
        .unwrap()
        .unwrap();
    assert_eq!(private.status, FetchStatus::Unfetched);
    assert_eq!(private.crawl_depth, 1);

    // Two seeds plus two absolute outlinks; the relative link is dropped
    assert_eq!(store.count_total().unwrap(), 4);
}

#[tokio::test]
async fn test_missing_robots_allows_everything() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(html("<p>a</p>".to_string()))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/private"))
        .respond_with(html("<p>private</p>".to_string()))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    write_job(dir.path(), &[]);
    let urls = vec![format!("{}/a", base), format!("{}/private", base)];
    seed(dir.path(), &urls);

    run(dir.path()).await;

    let store = store(dir.path());
    for url in &urls {
        assert_eq!(status_of(&store, url), FetchStatus::Fetched);
    }
}

#[tokio::test]
async fn test_failed_fetch_does_not_stop_other_records() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nAllow: /"))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/ok"))
        .respond_with(html("<p>ok</p>".to_string()))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/image"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(vec![0u8; 16], "image/png"))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    write_job(dir.path(), &[]);
    let ok = format!("{}/ok", base);
    let broken = format!("{}/broken", base);
    let image = format!("{}/image", base);
    seed(dir.path(), &[ok.clone(), broken.clone(), image.clone()]);

    run(dir.path()).await;

    let store = store(dir.path());
    assert_eq!(status_of(&store, &ok), FetchStatus::Fetched);

    let failed = store.get_record(&broken).unwrap().unwrap();
    assert_eq!(failed.status, FetchStatus::Failed);
    assert!(failed.failure.unwrap().contains("500"));
    assert!(store.get_content(&broken).unwrap().is_none());

    assert_eq!(status_of(&store, &image), FetchStatus::Failed);
}

#[tokio::test]
async fn test_discovered_pages_are_fetched_on_the_next_run() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nAllow: /"))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(format!(
            r#"<a href="{base}/next">next</a> <a href="http://b.example/x">x</a>"#
        )))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/next"))
        .respond_with(html(format!(r#"<a href="{base}/">home</a>"#)))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    // Keeps the unreachable external link out of the frontier
    write_job(dir.path(), &["127.0.0.1"]);
    let root = format!("{}/", base);
    let next = format!("{}/next", base);
    seed(dir.path(), &[root.clone()]);

    run(dir.path()).await;
    {
        let store = store(dir.path());
        assert_eq!(status_of(&store, &next), FetchStatus::Unfetched);
        assert!(store.get_record("http://b.example/x").unwrap().is_none());
    }

    run(dir.path()).await;
    let store = store(dir.path());
    let record = store.get_record(&next).unwrap().unwrap();
    assert_eq!(record.status, FetchStatus::Fetched);
    assert_eq!(record.crawl_depth, 1);

    // The link back to the seed does not touch the fetched record
    let seed_record = store.get_record(&root).unwrap().unwrap();
    assert_eq!(seed_record.status, FetchStatus::Fetched);
    assert_eq!(seed_record.crawl_depth, 0);
    assert_eq!(store.count_total().unwrap(), 2);
}

#[tokio::test]
async fn test_run_with_nothing_pending_is_a_no_op() {
    let dir = TempDir::new().unwrap();
    write_job(dir.path(), &[]);
    seed(dir.path(), &[]);

    let report = run(dir.path()).await;
    assert_eq!(report.stages.len(), 5);
    assert_eq!(store(dir.path()).count_total().unwrap(), 0);
}

#[tokio::test]
async fn test_stage_artifacts_are_cleaned_up() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html("<p>done</p>".to_string()))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    write_job(dir.path(), &[]);
    seed(dir.path(), &[format!("{}/", base)]);

    run(dir.path()).await;

    let job_dir = dir.path().join("work").join("test-crawl");
    for stage in ["extract-domains", "fetch-robots", "admission-filter", "fetch-pages"] {
        assert!(
            !job_dir.join(stage).exists(),
            "artifacts of {} were not removed",
            stage
        );
    }
}
