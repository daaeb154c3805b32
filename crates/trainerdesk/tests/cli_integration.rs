//! CLI integration tests for the TrainerDesk command-line interface.
//!
//! Parsing and local-state tests run the binary directly. Tests that talk to
//! a server start a mock HTTP server and run the binary on a blocking thread
//! so the mock keeps serving.

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// A `trainerdesk` command isolated inside `dir`.
fn trainerdesk_in(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("trainerdesk").unwrap();
    cmd.current_dir(dir)
        .env("TRAINERDESK_CONFIG_DIR", dir.join("config"))
        .env_remove("TRAINERDESK_SERVER_URL")
        .env_remove("TRAINERDESK_TOKEN");
    cmd
}

/// Write a user config keeping cache and logs inside `dir`.
fn write_config(dir: &Path, extra: &str) {
    let config_dir = dir.join("config");
    std::fs::create_dir_all(&config_dir).unwrap();
    let contents = format!(
        "[cache]\nsnapshot_path = '{}'\n\n[logging]\ndirectory = '{}'\n\n{}",
        snapshot_path(dir).display(),
        dir.join("logs").display(),
        extra
    );
    std::fs::write(config_dir.join("config.toml"), contents).unwrap();
}

fn snapshot_path(dir: &Path) -> PathBuf {
    dir.join("cache").join("active-upload.json")
}

fn fast_polling() -> &'static str {
    "[tracker]\npoll_interval_ms = 20\nmax_wait_secs = 10\n"
}

/// Run a prepared command off the async runtime.
async fn run_blocking<F>(f: F)
where
    F: FnOnce() + Send + 'static,
{
    tokio::task::spawn_blocking(f).await.unwrap();
}

// ─────────────────────────────────────────────────────────────────────────────
// Help and Parsing
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_help_lists_subcommands() {
    let dir = TempDir::new().unwrap();
    trainerdesk_in(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("upload"))
        .stdout(predicate::str::contains("watch"))
        .stdout(predicate::str::contains("status"))
        .stdout(predicate::str::contains("cancel"))
        .stdout(predicate::str::contains("reset"))
        .stdout(predicate::str::contains("health"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_version_displays() {
    let dir = TempDir::new().unwrap();
    trainerdesk_in(dir.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("trainerdesk"));
}

#[test]
fn test_upload_requires_files() {
    let dir = TempDir::new().unwrap();
    trainerdesk_in(dir.path())
        .arg("upload")
        .assert()
        .failure()
        .stderr(predicate::str::contains("required"));
}

#[test]
fn test_status_rejects_placeholder_id() {
    let dir = TempDir::new().unwrap();
    write_config(dir.path(), "");
    trainerdesk_in(dir.path())
        .args(["status", "undefined"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid task id"));
}

#[test]
fn test_upload_missing_file_fails() {
    let dir = TempDir::new().unwrap();
    write_config(dir.path(), "");
    trainerdesk_in(dir.path())
        .args(["upload", "does-not-exist.pdf"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read upload files"));
}

#[test]
fn test_cancel_json_requires_yes() {
    let dir = TempDir::new().unwrap();
    write_config(dir.path(), "");
    trainerdesk_in(dir.path())
        .args(["--json", "cancel", "abc123"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--yes"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Local State
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_config_show_reports_file_values() {
    let dir = TempDir::new().unwrap();
    write_config(dir.path(), "[server]\nurl = 'https://trainers.example.com'\n");

    let output = trainerdesk_in(dir.path())
        .args(["--json", "config"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["server_url"], "https://trainers.example.com");
    assert_eq!(value["config"]["tracker"]["poll_interval_ms"], 2500);
    assert_eq!(value["loaded_from"].as_array().unwrap().len(), 1);
}

#[test]
fn test_server_flag_overrides_config() {
    let dir = TempDir::new().unwrap();
    write_config(dir.path(), "[server]\nurl = 'https://trainers.example.com'\n");

    trainerdesk_in(dir.path())
        .args(["--json", "--server", "http://override:9000", "config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("http://override:9000"));
}

#[test]
fn test_invalid_config_is_fatal() {
    let dir = TempDir::new().unwrap();
    write_config(dir.path(), "[tracker]\npoll_interval_ms = 0\n");

    trainerdesk_in(dir.path())
        .arg("config")
        .assert()
        .failure()
        .stderr(predicate::str::contains("poll_interval_ms"));
}

#[test]
fn test_config_init_refuses_to_overwrite() {
    let dir = TempDir::new().unwrap();
    let config_dir = dir.path().join("fresh");

    trainerdesk_in(dir.path())
        .arg("--config-dir")
        .arg(&config_dir)
        .args(["config", "init"])
        .assert()
        .success();
    let written = std::fs::read_to_string(config_dir.join("config.toml")).unwrap();
    assert!(written.contains("[tracker]"));
    assert!(written.contains("poll_interval_ms = 2500"));

    trainerdesk_in(dir.path())
        .arg("--config-dir")
        .arg(&config_dir)
        .args(["config", "init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn test_reset_clears_snapshot() {
    let dir = TempDir::new().unwrap();
    write_config(dir.path(), "");
    let snapshot = snapshot_path(dir.path());
    std::fs::create_dir_all(snapshot.parent().unwrap()).unwrap();
    std::fs::write(
        &snapshot,
        r#"{"task_id":"abc123","status":{"state":"PENDING"},"saved_at":"2026-01-01T00:00:00Z"}"#,
    )
    .unwrap();

    trainerdesk_in(dir.path())
        .args(["--json", "reset"])
        .assert()
        .success()
        .stdout(predicate::str::contains("abc123"));
    assert!(!snapshot.exists());

    trainerdesk_in(dir.path())
        .arg("reset")
        .assert()
        .success()
        .stdout(predicate::str::contains("No upload was remembered"));
}

#[test]
fn test_watch_without_snapshot_fails() {
    let dir = TempDir::new().unwrap();
    write_config(dir.path(), "");
    trainerdesk_in(dir.path())
        .arg("watch")
        .assert()
        .failure()
        .stderr(predicate::str::contains("no upload in progress"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Against a Server
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_health_reachable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"status": "ok", "version": "2.1.0"})),
        )
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    write_config(dir.path(), "");
    let mut cmd = trainerdesk_in(dir.path());
    cmd.args(["--json", "--server", &server.uri(), "health"]);

    run_blocking(move || {
        cmd.assert()
            .success()
            .stdout(predicate::str::contains("\"reachable\": true"))
            .stdout(predicate::str::contains("2.1.0"));
    })
    .await;
}

#[test]
fn test_health_unreachable_exits_nonzero() {
    let dir = TempDir::new().unwrap();
    write_config(dir.path(), "[server]\nurl = 'http://127.0.0.1:1'\ntimeout_secs = 2\n");
    trainerdesk_in(dir.path())
        .args(["--json", "health"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("\"reachable\": false"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_status_prints_decoded_outcome() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tasks/abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "state": "SUCCESS",
            "result": {"imported": 3, "total": 4, "failed_files": ["d.pdf"]}
        })))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    write_config(dir.path(), "");
    let mut cmd = trainerdesk_in(dir.path());
    cmd.args(["--json", "--server", &server.uri(), "status", "abc123"]);

    run_blocking(move || {
        cmd.assert()
            .success()
            .stdout(predicate::str::contains("\"state\": \"SUCCESS\""))
            .stdout(predicate::str::contains("\"imported\": 3"))
            .stdout(predicate::str::contains("d.pdf"));
    })
    .await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_upload_detach_remembers_task() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/tasks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"task_id": "abc123"})))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    write_config(dir.path(), "");
    std::fs::write(dir.path().join("trainers.json"), r#"[{"name":"Ada"}]"#).unwrap();

    let mut cmd = trainerdesk_in(dir.path());
    cmd.args(["--json", "--server", &server.uri(), "upload", "--detach", "trainers.json"]);

    run_blocking(move || {
        cmd.assert()
            .success()
            .stdout(predicate::str::contains("\"task_id\": \"abc123\""))
            .stdout(predicate::str::contains("trainers.json"));
    })
    .await;

    let snapshot = std::fs::read_to_string(snapshot_path(dir.path())).unwrap();
    assert!(snapshot.contains("abc123"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_upload_follows_to_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/tasks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"task_id": "abc123"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/tasks/abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "state": "PROGRESS",
            "info": {"current": 1, "total": 2}
        })))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/tasks/abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "state": "SUCCESS",
            "result": {"imported": 2, "total": 2}
        })))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    write_config(dir.path(), fast_polling());
    std::fs::write(dir.path().join("a.pdf"), b"%PDF-a").unwrap();
    std::fs::write(dir.path().join("b.pdf"), b"%PDF-b").unwrap();

    let mut cmd = trainerdesk_in(dir.path());
    cmd.args(["--json", "--server", &server.uri(), "upload", "a.pdf", "b.pdf"]);

    run_blocking(move || {
        cmd.assert()
            .success()
            .stdout(predicate::str::contains("\"state\": \"SUCCESS\""))
            .stdout(predicate::str::contains("\"imported\": 2"));
    })
    .await;

    assert!(!snapshot_path(dir.path()).exists());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_watch_failure_exits_nonzero() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tasks/abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "state": "FAILURE",
            "info": "Invalid file format"
        })))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    write_config(dir.path(), fast_polling());
    let mut cmd = trainerdesk_in(dir.path());
    cmd.args(["--json", "--server", &server.uri(), "watch", "abc123"]);

    run_blocking(move || {
        cmd.assert()
            .code(1)
            .stdout(predicate::str::contains("Invalid file format"));
    })
    .await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_cancel_with_yes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tasks/abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "state": "PROGRESS",
            "info": {"current": 1, "total": 5}
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/tasks/abc123/cancel"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "message": "Task cancelled"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    write_config(dir.path(), "");
    let mut cmd = trainerdesk_in(dir.path());
    cmd.args(["--json", "--server", &server.uri(), "cancel", "--yes", "abc123"]);

    run_blocking(move || {
        cmd.assert()
            .success()
            .stdout(predicate::str::contains("\"cancelled\": true"));
    })
    .await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_rejected_cancel_keeps_remembered_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tasks/abc123"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({"detail": "busy"})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/tasks/abc123/cancel"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "message": "Task already completed"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    write_config(dir.path(), "");
    let snapshot = snapshot_path(dir.path());
    std::fs::create_dir_all(snapshot.parent().unwrap()).unwrap();
    let remembered = format!(
        r#"{{"task_id":"abc123","status":{{"state":"PROGRESS","current":2,"total":5}},"saved_at":"{}"}}"#,
        (chrono::Utc::now() - chrono::Duration::minutes(10)).to_rfc3339()
    );
    std::fs::write(&snapshot, &remembered).unwrap();

    let mut cmd = trainerdesk_in(dir.path());
    cmd.args(["--json", "--server", &server.uri(), "cancel", "--yes", "abc123"]);

    run_blocking(move || {
        cmd.assert()
            .failure()
            .stdout(predicate::str::contains("\"cancelled\": false"))
            .stdout(predicate::str::contains("Task already completed"));
    })
    .await;

    assert_eq!(std::fs::read_to_string(&snapshot).unwrap(), remembered);
}
