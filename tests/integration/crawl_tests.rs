//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full crawl cycle end-to-end.

use page_ledger::config::{parse_config, Config};
use page_ledger::crawler::{crawl, seed_cursor};
use page_ledger::storage::{open_store, CheckpointStore};
use page_ledger::{Cursor, FieldValue, ItemKey, LedgerError};
use std::path::Path;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration against the mock server
fn create_test_config(base_url: &str, dir: &Path, backend: &str, policy: &str) -> Config {
    let toml = format!(
        r#"
[crawler]
max-parallel-requests = 3
page-size = 2
request-timeout-secs = 5
max-retries = 2
retry-base-delay-ms = 1
retry-max-delay-ms = 10
item-failure-policy = "{policy}"

[session]
cookie = "sid=xyz"
user-agent = "TestLedger/1.0"

[listing]
url = "{base}/search?db=census"
pagination = "offset"

[detail]
url-template = "{base}/detail?recid={{record_id}}&h={{page_id}}&db={{db_id}}"

[output]
backend = "{backend}"
directory = '{dir}'
database-path = '{db}'
"#,
        policy = policy,
        base = base_url,
        backend = backend,
        dir = dir.join("crawl").display(),
        db = dir.join("crawl.db").display(),
    );
    parse_config(&toml).expect("test config should be valid")
}

fn listing_page(from: u64, to: u64, total: u64, rids: &[&str]) -> String {
    let rows: String = rids
        .iter()
        .map(|rid| {
            format!(
                r#"<tr class="record" rid="{}" pid="p{}" dbid="census"><td>Row {}</td></tr>"#,
                rid, rid, rid
            )
        })
        .collect();
    format!(
        r#"<html><body>
        <h2 id="results-header">Results {}-{} of {}</h2>
        <table>{}</table>
        </body></html>"#,
        from, to, total, rows
    )
}

fn detail_page(name: &str) -> String {
    format!(
        r#"<html><body><div class="hoverDataWrapper"><table>
        <tr><td>Name:</td><td>{}</td></tr>
        <tr><td>Household:</td><td><span class="unveiled_label">Bo</span><span class="unveiled_label">Cy</span></td></tr>
        </table></div></body></html>"#,
        name
    )
}

/// Mounts a three-item listing (1, 2 | 3) with a detail page per item
async fn mount_listing(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("fh", "0"))
        .and(header("cookie", "sid=xyz"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(listing_page(1, 2, 3, &["1", "2"])),
        )
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("fh", "2"))
        .and(header("cookie", "sid=xyz"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_page(3, 3, 3, &["3"])))
        .mount(server)
        .await;

    for (rid, name) in [("1", "Ada"), ("2", "Grace"), ("3", "Edsger")] {
        Mock::given(method("GET"))
            .and(path("/detail"))
            .and(query_param("recid", rid))
            .and(header("cookie", "sid=xyz"))
            .respond_with(ResponseTemplate::new(200).set_body_string(detail_page(name)))
            .mount(server)
            .await;
    }
}

fn key(rid: &str) -> ItemKey {
    ItemKey::from(format!("{}-p{}-census", rid, rid).as_str())
}

async fn request_count(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .map(|requests| requests.len())
        .unwrap_or(0)
}

#[tokio::test]
async fn test_full_crawl_then_rerun_fetches_nothing() {
    let mock_server = MockServer::start().await;
    mount_listing(&mock_server).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&mock_server.uri(), dir.path(), "files", "abort");
    let store = open_store(&config.output).unwrap();

    let seeded = seed_cursor(&config, store.as_ref()).unwrap();
    assert!(seeded.is_some());

    let report = crawl(&config, store.clone()).await.unwrap();
    assert_eq!(report.pages, 2);
    assert_eq!(report.fetched, 3);
    assert_eq!(report.failed, 0);

    // 2 listing pages + 3 details
    assert_eq!(request_count(&mock_server).await, 5);
    assert_eq!(store.count_records().unwrap(), 3);
    assert_eq!(store.read_cursor().unwrap(), Some(Cursor::Done));

    let record = store.read_record(&key("2")).unwrap().unwrap();
    assert_eq!(
        record.get("Name"),
        Some(&FieldValue::Single("Grace".to_string()))
    );
    assert_eq!(
        record.get("Household"),
        Some(&FieldValue::Multi(vec!["Bo".to_string(), "Cy".to_string()]))
    );

    // Files land where an operator expects them
    let root = dir.path().join("crawl");
    assert!(root.join("records").join("1-p1-census.json").is_file());
    assert!(root.join("pages").join("0001.page").is_file());

    let report = crawl(&config, store.clone()).await.unwrap();
    assert_eq!(report.pages, 0);
    assert_eq!(request_count(&mock_server).await, 5);
}

#[tokio::test]
async fn test_resume_with_sqlite_skips_saved_items() {
    let mock_server = MockServer::start().await;

    // Item 1 is already saved and must never be requested
    Mock::given(method("GET"))
        .and(path("/detail"))
        .and(query_param("recid", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(detail_page("Ada")))
        .expect(0)
        .mount(&mock_server)
        .await;
    mount_listing(&mock_server).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&mock_server.uri(), dir.path(), "sqlite", "abort");
    let store = open_store(&config.output).unwrap();
    seed_cursor(&config, store.as_ref()).unwrap();

    let mut saved = page_ledger::Record::new();
    saved.insert("Name".to_string(), FieldValue::from("Ada"));
    store.write_record(&key("1"), &saved).unwrap();

    let report = crawl(&config, store.clone()).await.unwrap();
    assert_eq!(report.skipped, 1);
    assert_eq!(report.fetched, 2);
    assert_eq!(store.count_records().unwrap(), 3);
    assert!(dir.path().join("crawl.db").is_file());
}

#[tokio::test]
async fn test_transient_error_is_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/detail"))
        .and(query_param("recid", "3"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&mock_server)
        .await;
    mount_listing(&mock_server).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&mock_server.uri(), dir.path(), "files", "abort");
    let store = open_store(&config.output).unwrap();
    seed_cursor(&config, store.as_ref()).unwrap();

    let report = crawl(&config, store.clone()).await.unwrap();
    assert_eq!(report.fetched, 3);
    assert_eq!(request_count(&mock_server).await, 6);
}

#[tokio::test]
async fn test_missing_item_skipped_under_skip_policy() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/detail"))
        .and(query_param("recid", "2"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;
    mount_listing(&mock_server).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&mock_server.uri(), dir.path(), "files", "skip");
    let store = open_store(&config.output).unwrap();
    seed_cursor(&config, store.as_ref()).unwrap();

    let report = crawl(&config, store.clone()).await.unwrap();
    assert_eq!(report.fetched, 2);
    assert_eq!(report.failed, 1);
    assert_eq!(store.count_failures().unwrap(), 1);
    assert!(!store.has_record(&key("2")).unwrap());
    assert_eq!(store.read_cursor().unwrap(), Some(Cursor::Done));
}

#[tokio::test]
async fn test_missing_item_aborts_under_default_policy() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/detail"))
        .and(query_param("recid", "2"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;
    mount_listing(&mock_server).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&mock_server.uri(), dir.path(), "files", "abort");
    let store = open_store(&config.output).unwrap();
    let seeded = seed_cursor(&config, store.as_ref()).unwrap().unwrap();

    let result = crawl(&config, store.clone()).await;
    assert!(matches!(result, Err(LedgerError::Fetch(_))));

    // The page is not checkpointed and the cursor has not moved
    assert_eq!(store.completed_pages().unwrap(), 0);
    assert_eq!(store.read_cursor().unwrap(), Some(seeded));
    assert!(store.has_record(&key("1")).unwrap());
}

#[tokio::test]
async fn test_session_expired_stops_crawl() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><body><form id="signInForm" action="/login"></form></body></html>"#,
        ))
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&mock_server.uri(), dir.path(), "files", "skip");
    let store = open_store(&config.output).unwrap();
    let seeded = seed_cursor(&config, store.as_ref()).unwrap().unwrap();

    let result = crawl(&config, store.clone()).await;
    assert!(matches!(result, Err(LedgerError::SessionExpired { .. })));
    assert_eq!(store.read_cursor().unwrap(), Some(seeded));
    assert_eq!(store.count_records().unwrap(), 0);
}

#[tokio::test]
async fn test_crawl_without_seed_fails() {
    let mock_server = MockServer::start().await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&mock_server.uri(), dir.path(), "files", "abort");
    let store = open_store(&config.output).unwrap();

    let result = crawl(&config, store).await;
    assert!(matches!(result, Err(LedgerError::NoCursor)));
    assert_eq!(request_count(&mock_server).await, 0);
}
