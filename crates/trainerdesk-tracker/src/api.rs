//! The task API seam the tracker drives.

use async_trait::async_trait;
use trainerdesk_client::{
    CancelResponse, SubmitResponse, TaskStatusResponse, TrainerDeskClient, UploadBatch,
};

/// Remote operations needed to follow a task.
///
/// Implemented for [`TrainerDeskClient`]; tests supply scripted fakes.
#[async_trait]
pub trait TaskApi: Send + Sync {
    /// Queue a batch and return the raw submission reply.
    async fn submit(&self, batch: &UploadBatch) -> trainerdesk_client::Result<SubmitResponse>;

    /// Fetch the status of a task.
    async fn status(&self, task_id: &str) -> trainerdesk_client::Result<TaskStatusResponse>;

    /// Ask the server to revoke a task.
    async fn cancel(&self, task_id: &str) -> trainerdesk_client::Result<CancelResponse>;
}

#[async_trait]
impl TaskApi for TrainerDeskClient {
    async fn submit(&self, batch: &UploadBatch) -> trainerdesk_client::Result<SubmitResponse> {
        self.tasks().submit(batch).await
    }

    async fn status(&self, task_id: &str) -> trainerdesk_client::Result<TaskStatusResponse> {
        self.tasks().status(task_id).await
    }

    async fn cancel(&self, task_id: &str) -> trainerdesk_client::Result<CancelResponse> {
        self.tasks().cancel(task_id).await
    }
}
