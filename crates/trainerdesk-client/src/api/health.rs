//! Health API.

use crate::client::TrainerDeskClient;
use crate::error::Result;
use crate::types::HealthResponse;

/// Health API client.
///
/// Note: Health endpoints typically don't require authentication.
pub struct HealthApi {
    client: TrainerDeskClient,
}

impl HealthApi {
    pub(crate) fn new(client: TrainerDeskClient) -> Self {
        Self { client }
    }

    /// Check basic health.
    pub async fn check(&self) -> Result<HealthResponse> {
        let url = self.client.route_url(&self.client.routes().health, None)?;
        self.client.get(url).await
    }

    /// Simple connectivity check - returns true if server is reachable.
    pub async fn is_healthy(&self) -> bool {
        self.check().await.is_ok()
    }
}
