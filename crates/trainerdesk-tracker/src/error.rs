//! Error types for tracker operations.

/// Error type for tracker operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Submission failed or produced an unusable task identifier.
    #[error("Submission failed: {0}")]
    Submission(String),

    /// The server understood the cancellation but refused it.
    #[error("Cancellation rejected: {0}")]
    CancelRejected(String),

    /// A task is already being submitted or tracked by this tracker.
    #[error("A task is already active: {0}")]
    TaskActive(String),

    /// There is no task to act on.
    #[error("No active task")]
    NoActiveTask,

    /// The task already reached a terminal state.
    #[error("Task {task_id} already finished with {state}")]
    AlreadyFinished { task_id: String, state: String },

    /// The given identifier is not the task this tracker follows.
    #[error("Task {requested} is not tracked (tracking {tracked})")]
    TaskMismatch { requested: String, tracked: String },

    /// Transport error from the API client.
    #[error(transparent)]
    Client(#[from] trainerdesk_client::Error),

    /// Snapshot store failure.
    #[error("Snapshot error: {0}")]
    Snapshot(String),
}

/// Result type for tracker operations.
pub type Result<T> = std::result::Result<T, Error>;
