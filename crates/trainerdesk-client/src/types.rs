//! Request and response types for the TrainerDesk task API.
//!
//! These types mirror the server's wire contract. Interpretation of the
//! loosely-typed `info`/`result` payloads is left to the caller.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ─────────────────────────────────────────────────────────────────────────────
// Uploads
// ─────────────────────────────────────────────────────────────────────────────

/// A single file in an upload batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    /// File name reported to the server.
    pub filename: String,
    /// Raw file contents.
    pub bytes: Vec<u8>,
}

impl UploadFile {
    /// Create an upload from in-memory contents.
    pub fn new(filename: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            bytes: bytes.into(),
        }
    }

    /// Read an upload from disk, using the path's file name.
    pub async fn from_path(path: &Path) -> Result<Self> {
        let bytes = tokio::fs::read(path).await.map_err(|e| Error::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self { filename, bytes })
    }
}

/// A batch of resumes submitted as one task.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadBatch {
    /// Files in submission order.
    pub files: Vec<UploadFile>,
}

impl UploadBatch {
    /// Create an empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file to the batch.
    pub fn with_file(mut self, file: UploadFile) -> Self {
        self.files.push(file);
        self
    }

    /// Read every path into a batch.
    pub async fn from_paths<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        let mut files = Vec::with_capacity(paths.len());
        for path in paths {
            files.push(UploadFile::from_path(path.as_ref()).await?);
        }
        Ok(Self { files })
    }

    /// Number of files in the batch.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Check if the batch has no files.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Total payload size in bytes.
    pub fn total_bytes(&self) -> usize {
        self.files.iter().map(|f| f.bytes.len()).sum()
    }

    /// File names in submission order.
    pub fn filenames(&self) -> Vec<&str> {
        self.files.iter().map(|f| f.filename.as_str()).collect()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tasks
// ─────────────────────────────────────────────────────────────────────────────

/// Response to a batch submission.
///
/// The identifier is kept raw; a missing or placeholder value is the
/// caller's to reject.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubmitResponse {
    /// Identifier of the queued task.
    #[serde(default)]
    pub task_id: Option<String>,
}

/// Lifecycle state reported by the status endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TaskState {
    /// Accepted, not yet picked up by a worker.
    Pending,
    /// Picked up by a worker.
    Started,
    /// Being retried by the worker.
    Retry,
    /// Running, with a progress payload.
    Progress,
    /// Completed.
    Success,
    /// Completed with an application error.
    Failure,
    /// Status lookup itself failed server-side; equivalent to `Failure`.
    Error,
    /// Cancelled.
    Revoked,
    /// Any state this client does not know about.
    Other(String),
}

impl TaskState {
    /// Parse a wire state (case-insensitive).
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Self::Pending,
            "STARTED" => Self::Started,
            "RETRY" => Self::Retry,
            "PROGRESS" => Self::Progress,
            "SUCCESS" => Self::Success,
            "FAILURE" => Self::Failure,
            "ERROR" => Self::Error,
            "REVOKED" => Self::Revoked,
            _ => Self::Other(raw.to_string()),
        }
    }

    /// Whether the server will never report another state for this task.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Success | Self::Failure | Self::Error | Self::Revoked
        )
    }

    /// Canonical wire spelling.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "PENDING",
            Self::Started => "STARTED",
            Self::Retry => "RETRY",
            Self::Progress => "PROGRESS",
            Self::Success => "SUCCESS",
            Self::Failure => "FAILURE",
            Self::Error => "ERROR",
            Self::Revoked => "REVOKED",
            Self::Other(s) => s,
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot returned by the status endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskStatusResponse {
    /// Raw state tag.
    pub state: String,
    /// Progress or error details (free text or structured).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<serde_json::Value>,
    /// Outcome payload for completed tasks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
}

impl TaskStatusResponse {
    /// Parsed state tag.
    pub fn task_state(&self) -> TaskState {
        TaskState::parse(&self.state)
    }
}

/// Response to a cancellation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelResponse {
    /// Whether the server accepted the cancellation.
    pub success: bool,
    /// Human-readable explanation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Health
// ─────────────────────────────────────────────────────────────────────────────

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Health status (e.g. "ok").
    pub status: String,
    /// Server version, when reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}
