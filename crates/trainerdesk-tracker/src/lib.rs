//! Progress tracking for long-running TrainerDesk import tasks.
//!
//! A [`TaskTracker`] submits a batch of files, then polls the task status
//! endpoint until the task reaches a terminal state. It degrades gracefully
//! when the endpoint misbehaves:
//!
//! - repeated non-JSON replies end tracking with an *unverified* success
//! - repeated failures of any kind end tracking with [`TaskStatus::Unknown`]
//! - a wall-clock ceiling ends tracking with [`TaskStatus::Timeout`]
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use trainerdesk_client::{TrainerDeskClient, UploadBatch};
//! use trainerdesk_tracker::{TaskTracker, TrackerConfig};
//!
//! let client = Arc::new(TrainerDeskClient::localhost()?);
//! let tracker = TaskTracker::new(client, TrackerConfig::default());
//!
//! let batch = UploadBatch::from_paths(&["trainers.json"]).await?;
//! let task_id = tracker.submit(batch).await?;
//! let status = tracker.wait().await;
//! println!("{task_id}: {status:?}");
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod monitor;
pub mod snapshot;
pub mod status;
pub mod task;
pub mod tracker;

pub use api::TaskApi;
pub use config::TrackerConfig;
pub use error::{Error, Result};
pub use monitor::{FailureKind, PollMonitor, PollOutcome, TransportFailure, Verdict};
pub use snapshot::{FileSnapshotStore, MemorySnapshotStore, NoSnapshots, Snapshot, SnapshotStore};
pub use status::{FailedFile, ImportOutcome, ProgressInfo, TaskStatus};
pub use task::{InvalidTaskId, TaskId, TrackedTask, TrackerPhase};
pub use tracker::{CancelOutcome, TaskTracker};
