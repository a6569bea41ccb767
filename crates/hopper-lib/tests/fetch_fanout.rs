mod common;

use common::Recorder;
use hopper_lib::config::TransportConfig;
use hopper_lib::game::installer::{FetchEngine, FetchItem, Transport};
use reqwest::Client;
use std::sync::Arc;
use tempfile::TempDir;
use wiremock::matchers::{method, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ITEMS: usize = 12;
const FAILING: usize = 3;

#[tokio::test]
async fn every_item_reports_once_and_failures_leave_no_files() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/missing/.*"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/ok/.*"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"payload".to_vec()))
        .mount(&server)
        .await;

    let dir = TempDir::new().expect("tmpdir");
    let policy = TransportConfig {
        attempts: 1,
        attempt_timeout_secs: 5,
        retry_delay_secs: 0,
    };
    let engine = FetchEngine::new(Arc::new(Transport::new(Client::new(), None, &policy)), 4);

    let items: Vec<FetchItem> = (0..ITEMS)
        .map(|i| {
            let bucket = if i < FAILING { "missing" } else { "ok" };
            FetchItem::new(
                format!("{}/{}/{}.bin", server.uri(), bucket, i),
                dir.path().join(format!("{}.bin", i)),
            )
        })
        .collect();

    let sink = Recorder::default();
    let report = engine.fetch_all(items, &sink, &sink).await;

    assert_eq!(report.total, ITEMS);
    assert_eq!(report.succeeded, ITEMS - FAILING);
    assert_eq!(report.failed.len(), FAILING);
    assert!(!report.all_succeeded());

    let progress = sink.progress_values();
    assert_eq!(progress.len(), ITEMS);
    assert_eq!(progress.last(), Some(&(ITEMS as i64)));

    let files = std::fs::read_dir(dir.path()).unwrap().count();
    assert_eq!(files, ITEMS - FAILING);
    assert_eq!(sink.lines().len(), FAILING);
}
