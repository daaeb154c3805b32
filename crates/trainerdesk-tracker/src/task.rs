//! Task identity and tracker lifecycle phases.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier values some servers send in place of a missing id.
const SENTINEL_IDS: &[&str] = &["undefined", "null", "none", "nil"];

/// Server-assigned identifier of a background task.
///
/// Always non-empty and never one of the textual "missing" placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TaskId(String);

impl TaskId {
    /// Validate a raw identifier.
    pub fn parse(raw: &str) -> Result<Self, InvalidTaskId> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(InvalidTaskId(raw.to_string()));
        }
        if SENTINEL_IDS
            .iter()
            .any(|s| trimmed.eq_ignore_ascii_case(s))
        {
            return Err(InvalidTaskId(raw.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Borrow the identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for TaskId {
    type Error = InvalidTaskId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TaskId> for String {
    fn from(id: TaskId) -> Self {
        id.0
    }
}

impl AsRef<str> for TaskId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A raw identifier that failed validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid task id {0:?}")]
pub struct InvalidTaskId(pub String);

/// The task a tracker is following.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedTask {
    /// Server-assigned identifier.
    pub id: TaskId,
    /// When the task was submitted (or when tracking began for a task
    /// submitted elsewhere).
    pub submitted_at: DateTime<Utc>,
}

/// Where a tracker is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerPhase {
    /// No task.
    Idle,
    /// Waiting for the server to accept a batch.
    Submitting,
    /// Polling a non-terminal task.
    Tracking,
    /// The task reached a terminal state; polling has stopped.
    Finished,
}

impl TrackerPhase {
    /// Whether a new task may be started from this phase.
    pub fn accepts_new_task(self) -> bool {
        matches!(self, Self::Idle | Self::Finished)
    }
}
