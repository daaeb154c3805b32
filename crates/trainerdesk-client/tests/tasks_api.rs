//! HTTP-level tests for the tasks API against a mock server.

use trainerdesk_client::{
    ApiRoutes, Error, TaskState, TrainerDeskClient, UploadBatch, UploadFile,
};
use wiremock::matchers::{header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> TrainerDeskClient {
    TrainerDeskClient::builder()
        .base_url(server.uri())
        .auth_token("admin-token")
        .build()
        .unwrap()
}

fn three_files() -> UploadBatch {
    UploadBatch::new()
        .with_file(UploadFile::new("a.pdf", b"%PDF-a".to_vec()))
        .with_file(UploadFile::new("b.pdf", b"%PDF-b".to_vec()))
        .with_file(UploadFile::new("c.docx", b"PK-c".to_vec()))
}

#[tokio::test]
async fn test_submit_returns_task_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/tasks"))
        .and(header("authorization", "Bearer admin-token"))
        .and(header_exists("content-type"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "task_id": "abc123"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let resp = client_for(&server).tasks().submit(&three_files()).await.unwrap();
    assert_eq!(resp.task_id.as_deref(), Some("abc123"));

    let requests = server.received_requests().await.unwrap();
    let body = String::from_utf8_lossy(&requests[0].body);
    assert_eq!(body.matches("name=\"files\"").count(), 3);
    assert!(body.contains("filename=\"c.docx\""));
}

#[tokio::test]
async fn test_submit_server_error_uses_detail() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/tasks"))
        .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({
            "detail": "Failed to queue upload task: broker down"
        })))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .tasks()
        .submit(&three_files())
        .await
        .unwrap_err();
    match err {
        Error::Api { status, message, .. } => {
            assert_eq!(status, 500);
            assert!(message.contains("broker down"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_status_progress_payload() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tasks/abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "state": "PROGRESS",
            "info": {"current": 1, "total": 3, "status": "Processed 1/3 files"}
        })))
        .mount(&server)
        .await;

    let status = client_for(&server).tasks().status("abc123").await.unwrap();
    assert_eq!(status.task_state(), TaskState::Progress);
    assert_eq!(status.info.unwrap()["current"], 1);
}

#[tokio::test]
async fn test_status_html_page_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tasks/abc123"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html; charset=utf-8")
                .set_body_string("<!doctype html><html><body>app shell</body></html>"),
        )
        .mount(&server)
        .await;

    let err = client_for(&server)
        .tasks()
        .status("abc123")
        .await
        .unwrap_err();
    assert!(err.is_malformed(), "expected malformed, got {err:?}");
}

#[tokio::test]
async fn test_status_proxy_error_page_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tasks/abc123"))
        .respond_with(ResponseTemplate::new(502).set_body_string("<html>Bad Gateway</html>"))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .tasks()
        .status("abc123")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::UnexpectedContent { status: 502, .. }));
}

#[tokio::test]
async fn test_status_json_server_error_is_not_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tasks/abc123"))
        .respond_with(ResponseTemplate::new(503).set_body_json(serde_json::json!({
            "detail": "worker unavailable"
        })))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .tasks()
        .status("abc123")
        .await
        .unwrap_err();
    assert!(!err.is_malformed());
    assert!(err.is_server_error());
}

#[tokio::test]
async fn test_cancel_with_custom_routes() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/admin/tasks/abc123/cancel"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": false,
            "message": "Task abc123 is already success and cannot be cancelled"
        })))
        .mount(&server)
        .await;

    let client = TrainerDeskClient::builder()
        .base_url(server.uri())
        .routes(ApiRoutes {
            cancel: "admin/tasks/{task_id}/cancel".to_string(),
            ..ApiRoutes::default()
        })
        .build()
        .unwrap();

    let resp = client.tasks().cancel("abc123").await.unwrap();
    assert!(!resp.success);
    assert!(resp.message.unwrap().contains("already success"));
}

#[tokio::test]
async fn test_health_check() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "ok"
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    assert!(client.health().is_healthy().await);
    assert_eq!(client.health().check().await.unwrap().status, "ok");
}

#[tokio::test]
async fn test_unreachable_server_is_http_error() {
    let client = TrainerDeskClient::builder()
        .base_url("http://127.0.0.1:9")
        .build()
        .unwrap();
    let err = client.tasks().status("abc123").await.unwrap_err();
    assert!(matches!(err, Error::Http(_)));
    assert!(!client.health().is_healthy().await);
}
