//! End-to-end collection passes against a scripted API

use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::TempDir;

use research_data_downloader::config::CollectionConfig;
use research_data_downloader::downloader::CollectionRunner;
use research_data_downloader::fetcher::pagination::Termination;
use research_data_downloader::fetcher::retry::RetryPolicy;
use research_data_downloader::fetcher::{ApiResponse, Endpoint, FetcherError};
use research_data_downloader::output::read_column;
use research_data_downloader::shutdown::ShutdownCoordinator;

use crate::support::{video, video_page, video_page_more, FakeApi, FakeConnector};

fn config(dir: &TempDir, body: &str) -> CollectionConfig {
    let out_base = dir.path().join("collect");
    let yaml = format!("out_base: {}\n{}", out_base.display(), body);
    CollectionConfig::from_yaml_str(&yaml).unwrap()
}

const TWO_WINDOWS: &str = r#"
d_start: 2024-01-01
d_end: 2024-01-07
increment: 3
field_names: [region_code]
field_values: [GB, US]
schedule: daily
total: 1
"#;

fn fast_retry() -> RetryPolicy {
    RetryPolicy::unbounded().with_interval(Duration::from_millis(1))
}

fn csv_rows(path: &std::path::Path) -> Vec<csv::StringRecord> {
    csv::Reader::from_path(path)
        .unwrap()
        .records()
        .map(|r| r.unwrap())
        .collect()
}

#[tokio::test]
async fn test_pass_pages_windows_and_deduplicates() {
    let dir = TempDir::new().unwrap();
    let config = config(&dir, TWO_WINDOWS);

    let api = FakeApi::new(|endpoint, body| {
        assert_eq!(endpoint, Endpoint::VideoQuery);
        match (body["start_date"].as_str(), body.get("cursor")) {
            (Some("20240101"), None) => Ok(video_page_more(
                json!([video(1, "alice")]),
                "search-1",
                100,
            )),
            (Some("20240101"), Some(_)) => Ok(video_page(json!([video(2, "bob")]))),
            (Some("20240104"), _) => Ok(video_page(json!([video(2, "bob"), video(3, "carol")]))),
            other => panic!("unexpected request {other:?}"),
        }
    });
    let connector = FakeConnector::new(api.clone());

    let passes = CollectionRunner::new(connector.clone())
        .with_page_policy(fast_retry())
        .with_test_mode(true)
        .run(&config)
        .await
        .unwrap();

    assert_eq!(passes.len(), 1);
    let pass = &passes[0];
    assert_eq!(pass.videos, 3);
    assert_eq!(pass.duplicates, 1);
    assert_eq!(pass.windows, 2);
    assert!(pass.stopped.is_none());
    assert!(pass.written);
    assert_eq!(connector.connects(), 1);
    assert_eq!(api.request_count(), 3);

    // Second page of the first window carries the cursor of the first
    let requests = api.requests();
    assert_eq!(requests[1].1["search_id"], json!("search-1"));
    assert_eq!(requests[1].1["cursor"], json!(100));
    assert_eq!(requests[0].1["max_count"], json!(100));

    assert_eq!(read_column(&pass.output, "id").unwrap(), vec!["1", "2", "3"]);
    assert_eq!(
        read_column(&pass.output, "url").unwrap()[0],
        "https://www.tiktok.com/@alice/video/1"
    );
    assert_eq!(csv_rows(&pass.output).len(), 3);
}

#[tokio::test]
async fn test_quota_error_ends_pass_with_partial_results() {
    let dir = TempDir::new().unwrap();
    let config = config(&dir, TWO_WINDOWS);

    let api = FakeApi::new(|_, body| match body["start_date"].as_str() {
        Some("20240101") => Ok(video_page(json!([video(1, "alice")]))),
        _ => Ok(ApiResponse::rejected("daily_quota_limit_exceeded", "quota")),
    });

    let passes = CollectionRunner::new(FakeConnector::new(api.clone()))
        .with_page_policy(fast_retry())
        .with_test_mode(true)
        .run(&config)
        .await
        .unwrap();

    let pass = &passes[0];
    assert_eq!(api.request_count(), 2);
    assert_eq!(pass.videos, 1);
    assert!(pass.written);
    match &pass.stopped {
        Some(Termination::ApiError { code, .. }) => {
            assert_eq!(code.as_str(), "daily_quota_limit_exceeded")
        }
        other => panic!("expected quota termination, got {other:?}"),
    }
    assert_eq!(csv_rows(&pass.output).len(), 1);
}

#[tokio::test]
async fn test_non_fatal_error_moves_to_next_window() {
    let dir = TempDir::new().unwrap();
    let config = config(&dir, TWO_WINDOWS);

    let api = FakeApi::new(|_, body| match body["start_date"].as_str() {
        Some("20240101") => Ok(ApiResponse::rejected("invalid_params", "bad window")),
        _ => Ok(video_page(json!([video(5, "erin")]))),
    });

    let passes = CollectionRunner::new(FakeConnector::new(api.clone()))
        .with_page_policy(fast_retry())
        .with_test_mode(true)
        .run(&config)
        .await
        .unwrap();

    assert_eq!(api.request_count(), 2);
    assert_eq!(passes[0].videos, 1);
    assert!(passes[0].stopped.is_none());
}

#[tokio::test]
async fn test_transient_failures_are_retried_with_same_body() {
    let dir = TempDir::new().unwrap();
    let config = config(&dir, TWO_WINDOWS);
    let calls = AtomicUsize::new(0);

    let api = FakeApi::new(move |_, _| {
        if calls.fetch_add(1, Ordering::SeqCst) == 0 {
            Err(FetcherError::Transport("connection reset".into()))
        } else {
            Ok(video_page(json!([])))
        }
    });

    let passes = CollectionRunner::new(FakeConnector::new(api.clone()))
        .with_page_policy(fast_retry())
        .with_test_mode(true)
        .run(&config)
        .await
        .unwrap();

    // Two windows plus one retry
    assert_eq!(api.request_count(), 3);
    let requests = api.requests();
    assert_eq!(requests[0].1, requests[1].1);

    // Nothing collected, nothing written
    assert_eq!(passes[0].videos, 0);
    assert!(!passes[0].written);
    assert!(!passes[0].output.exists());
}

#[tokio::test]
async fn test_two_fields_cover_every_subquery_each_pass() {
    let dir = TempDir::new().unwrap();
    let config = config(
        &dir,
        r#"
d_start: 2024-01-01
d_end: 2024-01-10
increment: 3
field_names: [region_code, keyword]
field_values: [[GB, US], [cats, dogs]]
schedule: hourly
total: 2
"#,
    );

    let api = FakeApi::new(|_, _| Ok(video_page(json!([]))));
    let connector = FakeConnector::new(api.clone());

    let passes = CollectionRunner::new(connector.clone())
        .with_page_policy(fast_retry())
        .with_test_mode(true)
        .run(&config)
        .await
        .unwrap();

    assert_eq!(passes.len(), 2);
    assert_eq!(connector.connects(), 2);
    // 2 passes x 4 base queries x 3 windows
    assert_eq!(api.request_count(), 24);

    let queries: Vec<Value> = api
        .requests()
        .iter()
        .take(12)
        .map(|(_, body)| body["query"].clone())
        .collect();
    let constraints = queries[0]["and"].as_array().unwrap();
    assert_eq!(constraints.len(), 2);
    assert_eq!(constraints[0]["operation"], json!("IN"));
}

#[tokio::test]
async fn test_passes_with_different_fields_stay_readable() {
    let dir = TempDir::new().unwrap();
    let config = config(&dir, &TWO_WINDOWS.replace("total: 1", "total: 2"));
    let calls = AtomicUsize::new(0);

    // Pass 1 sees {id, username}, pass 2 sees an extra region_code column
    let api = FakeApi::new(move |_, _| {
        let call = calls.fetch_add(1, Ordering::SeqCst);
        let videos = match call {
            0 => json!([{"id": 1, "username": "a"}]),
            1 => json!([]),
            2 => json!([{"id": 2, "region_code": "GB", "username": "b"}]),
            _ => json!([]),
        };
        Ok(video_page(videos))
    });

    let passes = CollectionRunner::new(FakeConnector::new(api.clone()))
        .with_page_policy(fast_retry())
        .with_test_mode(true)
        .run(&config)
        .await
        .unwrap();
    assert_eq!(passes.len(), 2);

    // Passes within the same second share one file
    let mut outputs: Vec<_> = passes.iter().map(|p| p.output.clone()).collect();
    outputs.dedup();

    let mut ids = Vec::new();
    for output in &outputs {
        ids.extend(read_column(output, "id").unwrap());
        assert_eq!(read_column(output, "url").unwrap().len(), csv_rows(output).len());
    }
    ids.sort();
    assert_eq!(ids, vec!["1", "2"]);
}

#[tokio::test]
async fn test_shutdown_stops_after_current_pass() {
    let dir = TempDir::new().unwrap();
    let config = config(&dir, &TWO_WINDOWS.replace("total: 1", "total: 3"));

    let shutdown = ShutdownCoordinator::shared();
    shutdown.request_shutdown();

    let api = FakeApi::new(|_, _| Ok(video_page(json!([video(1, "alice")]))));
    let passes = CollectionRunner::new(FakeConnector::new(api.clone()))
        .with_page_policy(fast_retry())
        .with_shutdown(shutdown)
        .run(&config)
        .await
        .unwrap();

    assert_eq!(passes.len(), 1);
}

#[tokio::test]
async fn test_invalid_field_setup_fails_before_connecting() {
    let dir = TempDir::new().unwrap();
    let mut config = config(&dir, TWO_WINDOWS);
    config.field_names = vec!["a".into(), "b".into(), "c".into()];

    let api = FakeApi::new(|_, _| Ok(video_page(json!([]))));
    let connector = FakeConnector::new(api.clone());

    let result = CollectionRunner::new(connector.clone())
        .with_test_mode(true)
        .run(&config)
        .await;

    assert!(result.is_err());
    assert_eq!(connector.connects(), 0);
    assert_eq!(api.request_count(), 0);
}
