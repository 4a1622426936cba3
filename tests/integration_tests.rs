//! End-to-end ingestion scenarios against a mock HTTP server.

use foodfacts_ingest::{
    CheckpointStore, IngestConfig, Ingestor, MemoryObjectStore, ObjectStore, PageClient,
    PageOutcome, RateGate,
};
use mockito::Matcher;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// JSON page body with `count` generated products.
fn products_body(page: u64, count: usize) -> String {
    let products: Vec<serde_json::Value> = (0..count)
        .map(|i| {
            serde_json::json!({
                "id": format!("p{}-{}", page, i),
                "code": format!("{}{:04}", page, i),
                "product_name": format!("Product {}", i),
                "brands": "TestBrand",
                "nutriments": {"energy_100g": 100 + i, "sugars_100g": 1.5}
            })
        })
        .collect();
    serde_json::json!({ "products": products }).to_string()
}

fn page_mock(server: &mut mockito::ServerGuard, page: u64) -> mockito::Mock {
    server
        .mock("GET", "/search")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("page".into(), page.to_string()),
            Matcher::UrlEncoded("page_size".into(), "100".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
}

fn test_config(server: &mockito::ServerGuard, total_pages: u64, concurrency: usize) -> IngestConfig {
    IngestConfig {
        endpoint: format!("{}/search", server.url()),
        total_pages,
        page_size: 100,
        concurrency,
        min_spacing: Duration::ZERO,
        max_attempts: 3,
        backoff_base: Duration::from_millis(1),
        backoff_cap: Duration::from_millis(8),
        request_timeout: Duration::from_secs(5),
        max_rows_per_batch: 150,
        ..IngestConfig::default()
    }
}

fn build_ingestor(config: IngestConfig, store: Arc<MemoryObjectStore>) -> Ingestor {
    let gate = Arc::new(RateGate::new(config.concurrency, config.min_spacing));
    let client = Arc::new(PageClient::new(&config, gate).unwrap());
    let (_tx, rx) = watch::channel(false);
    Ingestor::new(config, client, store as Arc<dyn ObjectStore>, rx)
}

#[tokio::test]
async fn test_three_pages_two_waves_one_rollover() {
    let mut server = mockito::Server::new_async().await;
    let mut mocks = Vec::new();
    for page in 1..=3 {
        mocks.push(
            page_mock(&mut server, page)
                .with_body(products_body(page, 100))
                .expect(1)
                .create_async()
                .await,
        );
    }

    let store = Arc::new(MemoryObjectStore::new());
    let config = test_config(&server, 3, 2);
    let report = build_ingestor(config, Arc::clone(&store)).run().await.unwrap();

    for mock in &mocks {
        mock.assert_async().await;
    }

    assert_eq!(report.start_page, 1);
    assert_eq!(report.pages_attempted, 3);
    assert_eq!(report.records_ingested, 300);
    // Wave 1 appends 200 rows >= 150 -> rollover; final flush holds page 3
    assert_eq!(report.batches_committed, 2);
    assert!(report.failed_pages.is_empty());
    assert!(!report.interrupted);

    let batch1 = store.get("bronze/product_part_1.csv").await.unwrap().unwrap();
    let batch1 = String::from_utf8(batch1).unwrap();
    assert_eq!(batch1.lines().count(), 201); // header + 200 rows
    assert!(batch1.starts_with("id,code,product_name"));

    let batch2 = store.get("bronze/product_part_2.csv").await.unwrap().unwrap();
    assert_eq!(String::from_utf8(batch2).unwrap().lines().count(), 101);

    let checkpoint = CheckpointStore::new(
        Arc::clone(&store) as Arc<dyn ObjectStore>,
        "checkpoint/checkpoint.json",
    );
    assert_eq!(checkpoint.load().await, Some(3));

    // Empty ledger writes no report artifact
    assert!(store.get("reports/failed_pages.json").await.unwrap().is_none());
}

#[tokio::test]
async fn test_resume_skips_pages_covered_by_checkpoint() {
    let mut server = mockito::Server::new_async().await;
    let mut early_pages = Vec::new();
    for page in 1..=2 {
        early_pages.push(
            page_mock(&mut server, page)
                .with_body(products_body(page, 1))
                .expect(0)
                .create_async()
                .await,
        );
    }
    let page3 = page_mock(&mut server, 3)
        .with_body(products_body(3, 40))
        .expect(1)
        .create_async()
        .await;

    let store = Arc::new(MemoryObjectStore::new());
    let checkpoint = CheckpointStore::new(
        Arc::clone(&store) as Arc<dyn ObjectStore>,
        "checkpoint/checkpoint.json",
    );
    checkpoint.save(2).await;

    let config = test_config(&server, 3, 2);
    let report = build_ingestor(config, Arc::clone(&store)).run().await.unwrap();

    for mock in &early_pages {
        mock.assert_async().await; // zero hits
    }
    page3.assert_async().await;

    assert_eq!(report.start_page, 3);
    assert_eq!(report.pages_attempted, 1);
    assert_eq!(report.records_ingested, 40);
    assert_eq!(checkpoint.load().await, Some(3));
}

#[tokio::test]
async fn test_fully_checkpointed_run_fetches_nothing() {
    let server = mockito::Server::new_async().await;
    let store = Arc::new(MemoryObjectStore::new());
    let checkpoint = CheckpointStore::new(
        Arc::clone(&store) as Arc<dyn ObjectStore>,
        "checkpoint/checkpoint.json",
    );
    checkpoint.save(3).await;

    let config = test_config(&server, 3, 2);
    let report = build_ingestor(config, Arc::clone(&store)).run().await.unwrap();

    assert_eq!(report.pages_attempted, 0);
    assert_eq!(report.records_ingested, 0);
    assert_eq!(report.batches_committed, 0);
    // Checkpoint untouched
    assert_eq!(checkpoint.load().await, Some(3));
}

#[tokio::test]
async fn test_terminal_page_lands_in_ledger_and_wave_advances() {
    let mut server = mockito::Server::new_async().await;
    let _page1 = page_mock(&mut server, 1)
        .with_body(products_body(1, 5))
        .create_async()
        .await;
    let page2 = server
        .mock("GET", "/search")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("page".into(), "2".into()),
            Matcher::UrlEncoded("page_size".into(), "100".into()),
        ]))
        .with_status(404)
        .expect(1) // terminal: exactly one request, no retries
        .create_async()
        .await;
    let _page3 = page_mock(&mut server, 3)
        .with_body(products_body(3, 5))
        .create_async()
        .await;

    let store = Arc::new(MemoryObjectStore::new());
    let config = test_config(&server, 3, 3);
    let report = build_ingestor(config, Arc::clone(&store)).run().await.unwrap();

    page2.assert_async().await;
    assert_eq!(report.failed_pages, vec![2]);
    assert_eq!(report.records_ingested, 10);

    // The failed page's wave still resolved, so the checkpoint moved past it
    let checkpoint = CheckpointStore::new(
        Arc::clone(&store) as Arc<dyn ObjectStore>,
        "checkpoint/checkpoint.json",
    );
    assert_eq!(checkpoint.load().await, Some(3));

    // Replay artifact lists the failed page
    let bytes = store.get("reports/failed_pages.json").await.unwrap().unwrap();
    let artifact: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(artifact["failed_pages"][0], 2);
}

#[tokio::test]
async fn test_retry_exhaustion_counts_attempts() {
    let mut server = mockito::Server::new_async().await;
    let throttled = server
        .mock("GET", "/search")
        .match_query(Matcher::Any)
        .with_status(429)
        .expect(3) // max_attempts
        .create_async()
        .await;

    let store = Arc::new(MemoryObjectStore::new());
    let config = test_config(&server, 1, 1);
    let report = build_ingestor(config, Arc::clone(&store)).run().await.unwrap();

    throttled.assert_async().await;
    assert_eq!(report.failed_pages, vec![1]);
    assert_eq!(report.records_ingested, 0);
    assert_eq!(report.batches_committed, 0);
}

#[tokio::test]
async fn test_transient_rate_limit_recovers_mid_fetch() {
    let mut server = mockito::Server::new_async().await;
    let throttled = server
        .mock("GET", "/search")
        .match_query(Matcher::Any)
        .with_status(429)
        .create_async()
        .await;

    let config = IngestConfig {
        endpoint: format!("{}/search", server.url()),
        max_attempts: 5,
        backoff_base: Duration::from_millis(400),
        backoff_cap: Duration::from_millis(800),
        min_spacing: Duration::ZERO,
        request_timeout: Duration::from_secs(5),
        ..IngestConfig::default()
    };
    let gate = Arc::new(RateGate::new(2, Duration::ZERO));
    let client = Arc::new(PageClient::new(&config, gate).unwrap());

    let fetch_task = {
        let client = Arc::clone(&client);
        tokio::spawn(async move { client.fetch(2).await })
    };

    // Let the first attempt hit 429, then bring the endpoint back up
    tokio::time::sleep(Duration::from_millis(150)).await;
    throttled.remove_async().await;
    server
        .mock("GET", "/search")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(products_body(2, 8))
        .create_async()
        .await;

    let fetch = fetch_task.await.unwrap();
    assert_eq!(fetch.outcome, PageOutcome::Success);
    assert_eq!(fetch.records.len(), 8);
}

#[tokio::test]
async fn test_shutdown_stops_before_dispatching_waves() {
    let server = mockito::Server::new_async().await;
    let store = Arc::new(MemoryObjectStore::new());
    let config = test_config(&server, 10, 2);

    let gate = Arc::new(RateGate::new(config.concurrency, config.min_spacing));
    let client = Arc::new(PageClient::new(&config, gate).unwrap());
    let (tx, rx) = watch::channel(false);
    tx.send(true).unwrap();

    let ingestor = Ingestor::new(config, client, Arc::clone(&store) as Arc<dyn ObjectStore>, rx);
    let report = ingestor.run().await.unwrap();

    assert!(report.interrupted);
    assert_eq!(report.pages_attempted, 0);
    assert_eq!(report.batches_committed, 0);

    let checkpoint = CheckpointStore::new(
        Arc::clone(&store) as Arc<dyn ObjectStore>,
        "checkpoint/checkpoint.json",
    );
    assert_eq!(checkpoint.load().await, None);
}
