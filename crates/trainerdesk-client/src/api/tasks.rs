//! Tasks API.

use reqwest::multipart::{Form, Part};

use crate::client::TrainerDeskClient;
use crate::error::Result;
use crate::types::{CancelResponse, SubmitResponse, TaskStatusResponse, UploadBatch};

/// Tasks API client.
pub struct TasksApi {
    client: TrainerDeskClient,
}

impl TasksApi {
    pub(crate) fn new(client: TrainerDeskClient) -> Self {
        Self { client }
    }

    /// Submit a batch of files as one background task.
    pub async fn submit(&self, batch: &UploadBatch) -> Result<SubmitResponse> {
        let url = self.client.route_url(&self.client.routes().submit, None)?;
        let form = batch.files.iter().fold(Form::new(), |form, file| {
            form.part(
                "files",
                Part::bytes(file.bytes.clone()).file_name(file.filename.clone()),
            )
        });
        tracing::debug!(files = batch.len(), bytes = batch.total_bytes(), "submitting batch");
        self.client.post_multipart(url, form).await
    }

    /// Get the current status of a task.
    pub async fn status(&self, task_id: &str) -> Result<TaskStatusResponse> {
        let url = self
            .client
            .route_url(&self.client.routes().status, Some(task_id))?;
        self.client.get(url).await
    }

    /// Ask the server to revoke a task.
    pub async fn cancel(&self, task_id: &str) -> Result<CancelResponse> {
        let url = self
            .client
            .route_url(&self.client.routes().cancel, Some(task_id))?;
        self.client.post(url, &serde_json::json!({})).await
    }
}
