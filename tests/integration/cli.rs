//! Binary-level tests: argument handling, exit codes and full runs against a
//! mock API

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn cmd() -> Command {
    let mut cmd = Command::cargo_bin("research-data-downloader").unwrap();
    cmd.env_remove("RESEARCH_CLIENT_KEY")
        .env_remove("RESEARCH_CLIENT_SECRET")
        .env_remove("RESEARCH_API_BASE")
        .env_remove("LOG_FORMAT");
    cmd
}

async fn mount_token(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/v2/oauth/token/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "clt.test",
            "expires_in": 7200
        })))
        .mount(server)
        .await;
}

fn files_with_extension(dir: &Path, extension: &str) -> Vec<PathBuf> {
    fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .filter(|p| p.extension().and_then(|e| e.to_str()) == Some(extension))
        .collect()
}

#[test]
fn test_help_lists_commands() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("videos"))
        .stdout(predicate::str::contains("users"))
        .stdout(predicate::str::contains("comments"))
        .stdout(predicate::str::contains("media"));
}

#[test]
fn test_missing_config_exits_with_config_code() {
    let dir = TempDir::new().unwrap();

    cmd()
        .args(["videos", dir.path().join("missing.yaml").to_str().unwrap()])
        .assert()
        .failure()
        .code(2);
}

#[test]
fn test_invalid_config_exits_with_config_code() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("bad.yaml");
    fs::write(
        &config,
        "out_base: out\nd_start: 2024-02-01\nd_end: 2024-01-01\nincrement: 3\n\
         field_names: [region_code]\nfield_values: [GB]\nschedule: daily\ntotal: 1\n",
    )
    .unwrap();

    cmd()
        .args(["videos", config.to_str().unwrap(), "--test"])
        .assert()
        .failure()
        .code(2);

    // No run was started, so no log file either
    assert!(files_with_extension(dir.path(), "log").is_empty());
}

#[test]
fn test_lookup_with_missing_input_fails() {
    let dir = TempDir::new().unwrap();

    cmd()
        .args([
            "--client-key",
            "k",
            "--client-secret",
            "s",
            "users",
            "--input",
            dir.path().join("videos.csv").to_str().unwrap(),
            "--output",
            dir.path().join("users.csv").to_str().unwrap(),
        ])
        .assert()
        .failure()
        .code(1);
}

#[test]
fn test_lookup_without_credentials_fails() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("videos.csv");
    fs::write(&input, "id,username\n1,alice\n").unwrap();

    cmd()
        .args([
            "users",
            "--input",
            input.to_str().unwrap(),
            "--output",
            dir.path().join("users.csv").to_str().unwrap(),
        ])
        .assert()
        .failure()
        .code(1);
}

#[test]
fn test_unwritable_log_directory_is_reported() {
    let dir = TempDir::new().unwrap();
    // A regular file where the output directory should be
    let blocker = dir.path().join("blocker");
    fs::write(&blocker, "").unwrap();
    let config = dir.path().join("collect.yaml");
    fs::write(
        &config,
        format!(
            "out_base: {}\nd_start: 2024-01-01\nd_end: 2024-01-03\nincrement: 1\n\
             field_names: [region_code]\nfield_values: [GB]\nschedule: daily\ntotal: 1\n",
            blocker.join("collect").display()
        ),
    )
    .unwrap();

    // Fails on the missing credentials, after logging the disabled file layer
    cmd()
        .args(["videos", config.to_str().unwrap(), "--test"])
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::contains("JSON log file disabled"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_videos_run_writes_csv_and_log() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    Mock::given(method("POST"))
        .and(path("/v2/research/video/query/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "videos": [{"id": 7001, "username": "alice", "region_code": "GB"}],
                "has_more": false
            },
            "error": {"code": "ok", "message": ""}
        })))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = dir.path().join("collect.yaml");
    fs::write(
        &config,
        format!(
            "out_base: {}\nd_start: 2024-01-01\nd_end: 2024-01-03\nincrement: 1\n\
             field_names: [region_code]\nfield_values: [GB]\nschedule: daily\ntotal: 1\n",
            dir.path().join("collect").display()
        ),
    )
    .unwrap();

    let uri = server.uri();
    let config_arg = config.to_str().unwrap().to_string();
    tokio::task::spawn_blocking(move || {
        cmd()
            .args([
                "--api-base",
                uri.as_str(),
                "--client-key",
                "k",
                "--client-secret",
                "s",
                "videos",
                config_arg.as_str(),
                "--test",
            ])
            .assert()
            .success();
    })
    .await
    .unwrap();

    let csvs = files_with_extension(dir.path(), "csv");
    assert_eq!(csvs.len(), 1);
    let content = fs::read_to_string(&csvs[0]).unwrap();
    assert!(content.starts_with("id,username,region_code,url"));
    // Same video from both windows is written once
    assert_eq!(content.lines().count(), 2);
    assert!(content.contains("https://www.tiktok.com/@alice/video/7001"));

    let logs = files_with_extension(dir.path(), "log");
    assert_eq!(logs.len(), 1);
    let log = fs::read_to_string(&logs[0]).unwrap();
    assert!(log.contains("Collection finished"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_users_run_writes_profiles() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    Mock::given(method("POST"))
        .and(path("/v2/research/user/info/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"display_name": "Alice", "follower_count": 12},
            "error": {"code": "ok"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let input = dir.path().join("videos.csv");
    let output = dir.path().join("users.csv");
    fs::write(&input, "id,username\n1,alice\n2,alice\n").unwrap();

    let uri = server.uri();
    let args: Vec<String> = vec![
        "--api-base".into(),
        uri,
        "--client-key".into(),
        "k".into(),
        "--client-secret".into(),
        "s".into(),
        "users".into(),
        "--input".into(),
        input.display().to_string(),
        "--output".into(),
        output.display().to_string(),
    ];
    tokio::task::spawn_blocking(move || {
        cmd().args(&args).assert().success();
    })
    .await
    .unwrap();

    let content = fs::read_to_string(&output).unwrap();
    let mut lines = content.lines();
    assert_eq!(lines.next(), Some("display_name,follower_count,username"));
    assert_eq!(lines.next(), Some("Alice,12,alice"));
    assert_eq!(lines.next(), None);
}
