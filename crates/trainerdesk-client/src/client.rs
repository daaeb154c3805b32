//! The TrainerDesk HTTP client and its builder.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use url::Url;

use crate::api::{HealthApi, TasksApi};
use crate::error::{Error, ErrorResponse, Result};

/// Default timeout for requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default timeout for batch uploads, which carry whole files.
const DEFAULT_UPLOAD_TIMEOUT: Duration = Duration::from_secs(300);

/// Placeholder substituted with the task identifier in route templates.
pub const TASK_ID_PLACEHOLDER: &str = "{task_id}";

/// Path templates for the task endpoints, relative to the base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRoutes {
    /// Batch submission (`POST`).
    pub submit: String,
    /// Status polling (`GET`).
    pub status: String,
    /// Cancellation (`POST`).
    pub cancel: String,
    /// Health check (`GET`).
    pub health: String,
}

impl Default for ApiRoutes {
    fn default() -> Self {
        Self {
            submit: "tasks".to_string(),
            status: "tasks/{task_id}".to_string(),
            cancel: "tasks/{task_id}/cancel".to_string(),
            health: "health".to_string(),
        }
    }
}

/// TrainerDesk API client.
///
/// # Example
///
/// ```no_run
/// use trainerdesk_client::TrainerDeskClient;
///
/// # async fn example() -> trainerdesk_client::Result<()> {
/// let client = TrainerDeskClient::builder()
///     .base_url("http://localhost:8000")
///     .auth_token("secret")
///     .build()?;
///
/// let status = client.tasks().status("abc123").await?;
/// println!("{}", status.state);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct TrainerDeskClient {
    inner: Arc<ClientInner>,
}

/// State shared by every clone of a client.
pub(crate) struct ClientInner {
    pub(crate) http: reqwest::Client,
    pub(crate) base_url: Url,
    pub(crate) routes: ApiRoutes,
    pub(crate) timeout: Duration,
    pub(crate) upload_timeout: Duration,
}

impl TrainerDeskClient {
    /// Create a new client builder.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Client for a server on the default local address.
    pub fn localhost() -> Result<Self> {
        Self::builder().base_url("http://127.0.0.1:8000").build()
    }

    /// Server root all routes are resolved against.
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Get the configured route templates.
    pub fn routes(&self) -> &ApiRoutes {
        &self.inner.routes
    }

    /// Upload task endpoints.
    pub fn tasks(&self) -> TasksApi {
        TasksApi::new(self.clone())
    }

    /// Server health checks.
    pub fn health(&self) -> HealthApi {
        HealthApi::new(self.clone())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internal HTTP methods
    // ─────────────────────────────────────────────────────────────────────────

    /// Build a URL from a route template.
    ///
    /// Each template segment is appended to the base URL path; the
    /// `{task_id}` segment is replaced by the (percent-encoded) identifier,
    /// or appended when the template has no placeholder.
    pub(crate) fn route_url(&self, template: &str, task_id: Option<&str>) -> Result<Url> {
        let mut url = self.inner.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| Error::Config("base_url cannot carry a path".to_string()))?;
            segments.pop_if_empty();
            let mut substituted = false;
            for segment in template.split('/').filter(|s| !s.is_empty()) {
                match (segment, task_id) {
                    (TASK_ID_PLACEHOLDER, Some(id)) => {
                        segments.push(id);
                        substituted = true;
                    }
                    (TASK_ID_PLACEHOLDER, None) => {
                        return Err(Error::Config(format!(
                            "route '{template}' requires a task id"
                        )));
                    }
                    (literal, _) => {
                        segments.push(literal);
                    }
                }
            }
            // Templates without a placeholder take the id as a trailing segment.
            if let (Some(id), false) = (task_id, substituted) {
                segments.push(id);
            }
        }
        Ok(url)
    }

    /// Make a GET request.
    pub(crate) async fn get<T: serde::de::DeserializeOwned>(&self, url: Url) -> Result<T> {
        tracing::trace!(%url, "GET");
        let response = self
            .inner
            .http
            .get(url)
            .timeout(self.inner.timeout)
            .send()
            .await?;
        self.handle_response(response).await
    }

    /// Make a POST request with a JSON body.
    pub(crate) async fn post<T, B>(&self, url: Url, body: &B) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
        B: serde::Serialize + ?Sized,
    {
        tracing::trace!(%url, "POST");
        let response = self
            .inner
            .http
            .post(url)
            .json(body)
            .timeout(self.inner.timeout)
            .send()
            .await?;
        self.handle_response(response).await
    }

    /// Make a multipart POST request.
    pub(crate) async fn post_multipart<T: serde::de::DeserializeOwned>(
        &self,
        url: Url,
        form: reqwest::multipart::Form,
    ) -> Result<T> {
        tracing::trace!(%url, "POST multipart");
        let response = self
            .inner
            .http
            .post(url)
            .multipart(form)
            .timeout(self.inner.upload_timeout)
            .send()
            .await?;
        self.handle_response(response).await
    }

    /// Decode a JSON body, or classify the failure.
    ///
    /// Documents (HTML pages, plain text) are reported as
    /// [`Error::UnexpectedContent`] whatever the status code, so callers can
    /// tell a misrouted request apart from an application error.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T> {
        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await?;

        if is_document(content_type.as_deref(), &body) {
            return Err(Error::UnexpectedContent {
                status: status.as_u16(),
                content_type: content_type.unwrap_or_else(|| "non-JSON".to_string()),
            });
        }

        if status.is_success() {
            Ok(serde_json::from_slice(&body)?)
        } else {
            Err(extract_error(status.as_u16(), &body))
        }
    }
}

/// Decide whether a body is a document rather than structured data.
fn is_document(content_type: Option<&str>, body: &[u8]) -> bool {
    if content_type.is_some_and(|ct| ct.to_ascii_lowercase().contains("html")) {
        return true;
    }
    let trimmed = body.trim_ascii_start();
    if trimmed.is_empty() {
        return false;
    }
    if trimmed.starts_with(b"<") {
        return true;
    }
    serde_json::from_slice::<serde::de::IgnoredAny>(trimmed).is_err()
}

/// Build an error from a failed JSON response.
fn extract_error(status: u16, body: &[u8]) -> Error {
    let parsed: ErrorResponse = serde_json::from_slice(body).unwrap_or_default();
    let message = parsed
        .message()
        .unwrap_or_else(|| format!("HTTP {}", status));

    match status {
        404 => Error::NotFound(message),
        401 => Error::Auth(message),
        _ => Error::Api {
            status,
            code: parsed.code.unwrap_or_else(|| "unknown".to_string()),
            message,
        },
    }
}

/// Builder for creating a [`TrainerDeskClient`].
#[derive(Debug)]
pub struct ClientBuilder {
    base_url: Option<String>,
    auth_token: Option<String>,
    routes: ApiRoutes,
    timeout: Duration,
    upload_timeout: Duration,
    user_agent: Option<String>,
}

impl ClientBuilder {
    /// Create a new builder with defaults.
    pub fn new() -> Self {
        Self {
            base_url: None,
            auth_token: None,
            routes: ApiRoutes::default(),
            timeout: DEFAULT_TIMEOUT,
            upload_timeout: DEFAULT_UPLOAD_TIMEOUT,
            user_agent: None,
        }
    }

    /// Server root URL (required).
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the bearer token sent with every request.
    pub fn auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    /// Override the endpoint route templates.
    pub fn routes(mut self, routes: ApiRoutes) -> Self {
        self.routes = routes;
        self
    }

    /// Set the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the upload request timeout.
    pub fn upload_timeout(mut self, timeout: Duration) -> Self {
        self.upload_timeout = timeout;
        self
    }

    /// Set a custom user agent.
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<TrainerDeskClient> {
        let base_url = self
            .base_url
            .ok_or_else(|| Error::Config("base_url is required".to_string()))?;

        // Trailing slash required: routes are joined onto this path.
        let mut base_url = Url::parse(&base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(Error::Config(format!("'{}' is not a base URL", base_url)));
        }
        if !base_url.path().ends_with('/') {
            base_url.set_path(&format!("{}/", base_url.path()));
        }

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        if let Some(token) = &self.auth_token {
            let value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|_| Error::Config("Invalid auth token".to_string()))?;
            headers.insert(AUTHORIZATION, value);
        }

        let user_agent = self
            .user_agent
            .unwrap_or_else(|| format!("trainerdesk-client/{}", env!("CARGO_PKG_VERSION")));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(user_agent)
            .build()?;

        Ok(TrainerDeskClient {
            inner: Arc::new(ClientInner {
                http,
                base_url,
                routes: self.routes,
                timeout: self.timeout,
                upload_timeout: self.upload_timeout,
            }),
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_requires_base_url() {
        let result = ClientBuilder::new().build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_builder_normalizes_trailing_slash() {
        let client = ClientBuilder::new()
            .base_url("http://localhost:8000/api")
            .build()
            .unwrap();

        assert_eq!(client.base_url().as_str(), "http://localhost:8000/api/");
    }

    #[test]
    fn test_route_url_substitutes_task_id() {
        let client = ClientBuilder::new()
            .base_url("http://localhost:8000")
            .build()
            .unwrap();

        let routes = client.routes().clone();
        let url = client.route_url(&routes.submit, None).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8000/tasks");

        let url = client.route_url(&routes.cancel, Some("abc123")).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8000/tasks/abc123/cancel");
    }

    #[test]
    fn test_route_url_keeps_base_path_and_encodes_id() {
        let client = ClientBuilder::new()
            .base_url("https://example.com/backend/")
            .routes(ApiRoutes {
                submit: "admin/bulk_upload_start".to_string(),
                cancel: "/admin/tasks/{task_id}/cancel".to_string(),
                ..ApiRoutes::default()
            })
            .build()
            .unwrap();

        let url = client.route_url(&client.routes().submit, None).unwrap();
        assert_eq!(url.as_str(), "https://example.com/backend/admin/bulk_upload_start");

        let url = client
            .route_url(&client.routes().status, Some("a/b c"))
            .unwrap();
        assert_eq!(url.as_str(), "https://example.com/backend/tasks/a%2Fb%20c");

        let url = client
            .route_url(&client.routes().cancel, Some("t1"))
            .unwrap();
        assert_eq!(url.as_str(), "https://example.com/backend/admin/tasks/t1/cancel");
    }

    #[test]
    fn test_route_url_appends_id_without_placeholder() {
        let client = TrainerDeskClient::localhost().unwrap();
        let url = client.route_url("upload/status", Some("t9")).unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:8000/upload/status/t9");
    }

    #[test]
    fn test_route_url_requires_task_id() {
        let client = TrainerDeskClient::localhost().unwrap();
        let err = client.route_url("tasks/{task_id}", None).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_is_document() {
        assert!(is_document(Some("text/html; charset=utf-8"), b"{}"));
        assert!(is_document(None, b"  <!DOCTYPE html><html></html>"));
        assert!(is_document(Some("text/plain"), b"Internal Server Error"));
        assert!(!is_document(Some("application/json"), br#"{"state":"PENDING"}"#));
        assert!(!is_document(Some("application/json"), b""));
    }

    #[test]
    fn test_extract_error_maps_status() {
        assert!(matches!(
            extract_error(404, br#"{"detail":"Not Found"}"#),
            Error::NotFound(m) if m == "Not Found"
        ));
        assert!(matches!(extract_error(401, b"{}"), Error::Auth(_)));
        match extract_error(500, br#"{"detail":"Error cancelling task: boom"}"#) {
            Error::Api { status, message, .. } => {
                assert_eq!(status, 500);
                assert_eq!(message, "Error cancelling task: boom");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
