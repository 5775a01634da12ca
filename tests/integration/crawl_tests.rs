//! Integration tests for the crawler
//!
//! These tests use wiremock to stand in for the review endpoint and a
//! temporary SQLite database to check the full crawl cycle end-to-end.

use review_harvest::config::{Config, CrawlerConfig, EndpointConfig, OutputConfig, UserAgentConfig};
use review_harvest::crawler::{CrawlDriver, ItemOutcome};
use review_harvest::model::{FailureKind, Item};
use review_harvest::storage::{RecordStore, RunStatus, SqliteStorage};
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration pointing at the mock endpoint
fn create_test_config(base_url: &str, db_path: &str) -> Config {
    Config {
        crawler: CrawlerConfig {
            request_timeout_secs: 1,
            max_concurrent_pages: 4,
            page_size: 1_000_000,
        },
        endpoint: EndpointConfig {
            base_url: format!("{}/list_detail_rate.htm", base_url),
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestHarvester".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
            contact_email: "test@example.com".to_string(),
        },
        output: OutputConfig {
            database_path: db_path.to_string(),
        },
    }
}

/// Opens a fresh database in a temporary directory
fn open_temp_storage() -> (TempDir, SqliteStorage, String) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("reviews.db");
    let db_path_str = db_path.to_str().expect("Non UTF-8 temp path").to_string();
    let storage = SqliteStorage::new(&db_path).expect("Failed to open storage");
    (temp_dir, storage, db_path_str)
}

/// Builds a review page body with the outer braces stripped
fn page_body(last_page: u32, review_ids: &[i64]) -> String {
    let reviews: Vec<String> = review_ids
        .iter()
        .map(|id| {
            format!(
                r#"{{"id":{},"auctionSku":"color:gold","rateContent":"review {}","buyCount":1,"rateDate":"2017-11-23 23:16:40","useful":true,"anony":false}}"#,
                id, id
            )
        })
        .collect();
    format!(
        r#""rateDetail":{{"paginator":{{"lastPage":{}}},"rateList":[{}]}}"#,
        last_page,
        reviews.join(",")
    )
}

/// Mounts one review page for an item
async fn mount_page(server: &MockServer, item_id: &str, page: u32, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path("/list_detail_rate.htm"))
        .and(query_param("itemId", item_id))
        .and(query_param("currentPage", page.to_string()))
        .respond_with(response)
        .mount(server)
        .await;
}

fn requests_for_page(requests: &[wiremock::Request], page: u32) -> usize {
    let needle = format!("currentPage={}", page);
    requests
        .iter()
        .filter(|request| request.url.query().unwrap_or("").contains(&needle))
        .count()
}

#[tokio::test]
async fn test_two_page_item_is_fully_ingested() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "I1",
        1,
        ResponseTemplate::new(200).set_body_string(page_body(2, &[1])),
    )
    .await;
    mount_page(
        &server,
        "I1",
        2,
        ResponseTemplate::new(200).set_body_string(page_body(2, &[2])),
    )
    .await;

    let (_temp_dir, mut storage, db_path) = open_temp_storage();
    storage.upsert_item(&Item::new("I1", "S1")).unwrap();

    let config = create_test_config(&server.uri(), &db_path);
    let mut driver = CrawlDriver::new(&config, "test-hash", storage).unwrap();
    let summary = driver.run().await.unwrap();

    assert_eq!(summary.counters.items_completed, 1);
    assert_eq!(summary.counters.reviews_inserted, 2);

    let report = &summary.reports[0];
    assert_eq!(report.outcome, ItemOutcome::Completed);
    assert_eq!(report.pages_discovered, 2);
    assert_eq!(report.pages_ingested, 2);

    // Probe plus one fetch per page
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 3);
    assert_eq!(requests_for_page(&requests, 1), 2);
    assert_eq!(requests_for_page(&requests, 2), 1);
    for request in &requests {
        let query = request.url.query().unwrap_or("");
        assert!(query.contains("itemId=I1"));
        assert!(query.contains("sellerId=S1"));
        assert!(query.contains("pageSize=1000000"));
    }

    let storage = driver.into_store();
    let item = storage.get_item("I1").unwrap().unwrap();
    assert!(item.reviews_crawled);

    let mut ids: Vec<i64> = storage
        .get_reviews_for_item("I1")
        .unwrap()
        .iter()
        .map(|review| review.review_id)
        .collect();
    ids.sort();
    assert_eq!(ids, vec![1, 2]);
    assert_eq!(storage.count_reviews().unwrap(), 2);
    assert!(storage.list_failures(10).unwrap().is_empty());

    let run = storage.get_run(summary.run_id).unwrap();
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.config_hash, "test-hash");
}

#[tokio::test]
async fn test_review_repeated_across_pages_is_stored_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/list_detail_rate.htm"))
        .and(query_param("itemId", "I1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(page_body(2, &[1])))
        .expect(3)
        .mount(&server)
        .await;

    let (_temp_dir, mut storage, db_path) = open_temp_storage();
    storage.upsert_item(&Item::new("I1", "S1")).unwrap();

    let config = create_test_config(&server.uri(), &db_path);
    let mut driver = CrawlDriver::new(&config, "hash", storage).unwrap();
    let summary = driver.run().await.unwrap();

    let report = &summary.reports[0];
    assert_eq!(report.reviews.inserted, 1);
    assert_eq!(report.reviews.duplicates, 1);

    let storage = driver.into_store();
    assert_eq!(storage.count_reviews().unwrap(), 1);
    assert!(storage.get_item("I1").unwrap().unwrap().reviews_crawled);
}

#[tokio::test]
async fn test_page_count_drives_number_of_fetches() {
    let server = MockServer::start().await;
    for page in 1..=5 {
        mount_page(
            &server,
            "I5",
            page,
            ResponseTemplate::new(200).set_body_string(page_body(5, &[i64::from(page) * 10])),
        )
        .await;
    }

    let (_temp_dir, mut storage, db_path) = open_temp_storage();
    storage.upsert_item(&Item::new("I5", "S1")).unwrap();

    let config = create_test_config(&server.uri(), &db_path);
    let mut driver = CrawlDriver::new(&config, "hash", storage).unwrap();
    let summary = driver.run().await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 6);
    for page in 2..=5 {
        assert_eq!(requests_for_page(&requests, page), 1);
    }
    assert_eq!(requests_for_page(&requests, 6), 0);
    assert_eq!(summary.counters.reviews_inserted, 5);
}

#[tokio::test]
async fn test_reprocessing_does_not_duplicate_reviews() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "I1",
        1,
        ResponseTemplate::new(200).set_body_string(page_body(1, &[1, 2, 3])),
    )
    .await;

    let (_temp_dir, mut storage, db_path) = open_temp_storage();
    storage.upsert_item(&Item::new("I1", "S1")).unwrap();

    let config = create_test_config(&server.uri(), &db_path);
    let mut driver = CrawlDriver::new(&config, "hash", storage).unwrap();
    let first = driver.run().await.unwrap();
    assert_eq!(first.counters.reviews_inserted, 3);

    // Put the item back in the pending set and crawl it again
    let storage = driver.into_store();
    let conn = rusqlite::Connection::open(&db_path).unwrap();
    conn.execute(
        "UPDATE items SET reviews_crawled = 0 WHERE item_id = 'I1'",
        [],
    )
    .unwrap();
    drop(conn);

    let mut driver = CrawlDriver::new(&config, "hash", storage).unwrap();
    let second = driver.run().await.unwrap();

    assert_eq!(second.counters.items_completed, 1);
    assert_eq!(second.counters.reviews_inserted, 0);
    assert_eq!(second.reports[0].reviews.duplicates, 3);

    let storage = driver.into_store();
    assert_eq!(storage.count_reviews().unwrap(), 3);
    assert!(storage.get_item("I1").unwrap().unwrap().reviews_crawled);
}

#[tokio::test]
async fn test_unreadable_page_count_completes_without_fetching() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "I1",
        1,
        ResponseTemplate::new(200).set_body_string("<html>please log in</html>"),
    )
    .await;

    let (_temp_dir, mut storage, db_path) = open_temp_storage();
    storage.upsert_item(&Item::new("I1", "S1")).unwrap();

    let config = create_test_config(&server.uri(), &db_path);
    let mut driver = CrawlDriver::new(&config, "hash", storage).unwrap();
    let summary = driver.run().await.unwrap();

    // Only the probe went out
    assert_eq!(server.received_requests().await.unwrap().len(), 1);

    let report = &summary.reports[0];
    assert_eq!(report.outcome, ItemOutcome::Completed);
    assert_eq!(report.pages_discovered, 0);

    let storage = driver.into_store();
    assert!(storage.get_item("I1").unwrap().unwrap().reviews_crawled);
    assert_eq!(storage.count_reviews().unwrap(), 0);
}

#[tokio::test]
async fn test_empty_probe_abandons_item() {
    let server = MockServer::start().await;
    mount_page(&server, "I1", 1, ResponseTemplate::new(200).set_body_string("")).await;

    let (_temp_dir, mut storage, db_path) = open_temp_storage();
    storage.upsert_item(&Item::new("I1", "S1")).unwrap();

    let config = create_test_config(&server.uri(), &db_path);
    let mut driver = CrawlDriver::new(&config, "hash", storage).unwrap();
    let summary = driver.run().await.unwrap();

    assert_eq!(server.received_requests().await.unwrap().len(), 1);
    assert_eq!(summary.counters.items_abandoned, 1);
    assert_eq!(summary.reports[0].outcome, ItemOutcome::Abandoned);

    let storage = driver.into_store();
    assert!(!storage.get_item("I1").unwrap().unwrap().reviews_crawled);
    assert_eq!(storage.count_reviews().unwrap(), 0);

    let failures = storage.list_failures(10).unwrap();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].failure.kind, FailureKind::EmptyPayload);
    assert_eq!(failures[0].failure.item_id, "I1");
    assert!(failures[0].failure.url.contains("currentPage=1"));
    assert_eq!(failures[0].run_id, Some(summary.run_id));

    // Still pending for the next run
    assert_eq!(storage.load_pending_items().unwrap().len(), 1);
}

#[tokio::test]
async fn test_failed_page_is_logged_and_siblings_are_stored() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "I2",
        1,
        ResponseTemplate::new(200).set_body_string(page_body(3, &[41])),
    )
    .await;
    mount_page(&server, "I2", 2, ResponseTemplate::new(500)).await;
    mount_page(
        &server,
        "I2",
        3,
        ResponseTemplate::new(200).set_body_string(page_body(3, &[42])),
    )
    .await;

    let (_temp_dir, mut storage, db_path) = open_temp_storage();
    storage.upsert_item(&Item::new("I2", "S2")).unwrap();

    let config = create_test_config(&server.uri(), &db_path);
    let mut driver = CrawlDriver::new(&config, "hash", storage).unwrap();
    let summary = driver.run().await.unwrap();

    let report = &summary.reports[0];
    assert_eq!(report.outcome, ItemOutcome::Completed);
    assert_eq!(report.pages_ingested, 2);
    assert_eq!(report.pages_failed, 1);

    let storage = driver.into_store();
    assert!(storage.get_item("I2").unwrap().unwrap().reviews_crawled);

    let mut ids: Vec<i64> = storage
        .get_reviews_for_item("I2")
        .unwrap()
        .iter()
        .map(|review| review.review_id)
        .collect();
    ids.sort();
    assert_eq!(ids, vec![41, 42]);

    let failures = storage.list_failures(10).unwrap();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].failure.kind, FailureKind::Transport);
    assert!(failures[0].failure.url.contains("currentPage=2"));
}

#[tokio::test]
async fn test_page_timeout_is_logged_and_item_completes() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "I3",
        1,
        ResponseTemplate::new(200).set_body_string(page_body(2, &[42])),
    )
    .await;
    mount_page(
        &server,
        "I3",
        2,
        ResponseTemplate::new(200)
            .set_body_string(page_body(2, &[43]))
            .set_delay(Duration::from_secs(3)),
    )
    .await;

    let (_temp_dir, mut storage, db_path) = open_temp_storage();
    storage.upsert_item(&Item::new("I3", "S1")).unwrap();

    let config = create_test_config(&server.uri(), &db_path);
    let mut driver = CrawlDriver::new(&config, "hash", storage).unwrap();
    let summary = driver.run().await.unwrap();

    assert_eq!(summary.reports[0].outcome, ItemOutcome::Completed);

    let storage = driver.into_store();
    let reviews = storage.get_reviews_for_item("I3").unwrap();
    assert_eq!(reviews.len(), 1);
    assert_eq!(reviews[0].review_id, 42);
    assert!(storage.get_item("I3").unwrap().unwrap().reviews_crawled);

    let failures = storage.list_failures(10).unwrap();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].failure.kind, FailureKind::Transport);
    assert!(failures[0].failure.url.contains("currentPage=2"));
}

#[tokio::test]
async fn test_malformed_page_is_logged_as_parse_failure() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "I4",
        1,
        ResponseTemplate::new(200).set_body_string(page_body(2, &[7])),
    )
    .await;
    mount_page(
        &server,
        "I4",
        2,
        ResponseTemplate::new(200).set_body_string(r#""rateDetail":{"rateList":[{"id":8}]}"#),
    )
    .await;

    let (_temp_dir, mut storage, db_path) = open_temp_storage();
    storage.upsert_item(&Item::new("I4", "S1")).unwrap();

    let config = create_test_config(&server.uri(), &db_path);
    let mut driver = CrawlDriver::new(&config, "hash", storage).unwrap();
    driver.run().await.unwrap();

    let storage = driver.into_store();
    assert_eq!(storage.count_reviews().unwrap(), 1);
    assert!(storage.get_item("I4").unwrap().unwrap().reviews_crawled);

    let failures = storage.list_failures(10).unwrap();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].failure.kind, FailureKind::Parse);
}

#[tokio::test]
async fn test_run_continues_past_abandoned_item() {
    let server = MockServer::start().await;
    mount_page(&server, "A", 1, ResponseTemplate::new(502)).await;
    mount_page(
        &server,
        "B",
        1,
        ResponseTemplate::new(200).set_body_string(page_body(1, &[100, 101])),
    )
    .await;
    mount_page(
        &server,
        "C",
        1,
        ResponseTemplate::new(200).set_body_string(page_body(1, &[200])),
    )
    .await;

    let (_temp_dir, mut storage, db_path) = open_temp_storage();
    for item_id in ["A", "B", "C"] {
        storage.upsert_item(&Item::new(item_id, "S1")).unwrap();
    }

    let config = create_test_config(&server.uri(), &db_path);
    let mut driver = CrawlDriver::new(&config, "hash", storage).unwrap();
    let summary = driver.run().await.unwrap();

    assert_eq!(summary.counters.items_seen, 3);
    assert_eq!(summary.counters.items_completed, 2);
    assert_eq!(summary.counters.items_abandoned, 1);
    assert_eq!(summary.counters.reviews_inserted, 3);

    let storage = driver.into_store();
    let pending: Vec<String> = storage
        .load_pending_items()
        .unwrap()
        .into_iter()
        .map(|item| item.item_id)
        .collect();
    assert_eq!(pending, vec!["A".to_string()]);

    let run = storage.get_latest_run().unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.counters, summary.counters);
}

#[tokio::test]
async fn test_crawled_items_are_skipped() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(page_body(1, &[1])))
        .expect(0)
        .mount(&server)
        .await;

    let (_temp_dir, mut storage, db_path) = open_temp_storage();
    storage.upsert_item(&Item::new("DONE", "S1")).unwrap();
    storage.mark_reviews_crawled("DONE").unwrap();

    let config = create_test_config(&server.uri(), &db_path);
    let mut driver = CrawlDriver::new(&config, "hash", storage).unwrap();
    let summary = driver.run().await.unwrap();

    assert_eq!(summary.counters.items_seen, 0);
    assert!(summary.reports.is_empty());
}
