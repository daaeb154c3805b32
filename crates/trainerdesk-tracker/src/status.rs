//! Typed task status and decoding of the loosely-typed wire payloads.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use trainerdesk_client::{TaskState, TaskStatusResponse};

/// Message used when a failed task carries no usable error text.
const UNKNOWN_FAILURE: &str = "Task failed with unknown error";

/// Latest known state of a tracked task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    /// Accepted, not started.
    Pending {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    /// Running.
    Progress(ProgressInfo),
    /// Completed.
    Success(ImportOutcome),
    /// Completed with an application error (wire `FAILURE` or `ERROR`).
    Failure { message: String },
    /// Cancelled.
    Revoked {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    /// Tracking gave up after repeated failed polls.
    Unknown { message: String },
    /// Tracking gave up after the wall-clock ceiling.
    Timeout { message: String },
}

impl TaskStatus {
    /// Placeholder status seeded right after a successful submission.
    pub fn pending() -> Self {
        Self::Pending { message: None }
    }

    /// Decode a status endpoint reply.
    pub fn from_response(resp: &TaskStatusResponse) -> Self {
        let info = resp.info.as_ref();
        let result = resp.result.as_ref();

        match resp.task_state() {
            TaskState::Pending => Self::Pending {
                message: info.and_then(text_of),
            },
            TaskState::Progress => Self::Progress(ProgressInfo::from_value(info)),
            TaskState::Started | TaskState::Retry | TaskState::Other(_) => {
                let mut progress = ProgressInfo::from_value(info);
                if progress.status.is_none() {
                    progress.status = Some(format!("Task is {}", resp.state.to_lowercase()));
                }
                Self::Progress(progress)
            }
            TaskState::Success => Self::Success(ImportOutcome::from_value(result.or(info))),
            TaskState::Failure | TaskState::Error => Self::Failure {
                message: info
                    .and_then(error_text)
                    .or_else(|| result.and_then(error_text))
                    .unwrap_or_else(|| UNKNOWN_FAILURE.to_string()),
            },
            TaskState::Revoked => Self::Revoked {
                message: info.and_then(text_of).or_else(|| result.and_then(text_of)),
            },
        }
    }

    /// Upper-case tag of this status.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Pending { .. } => "PENDING",
            Self::Progress(_) => "PROGRESS",
            Self::Success(_) => "SUCCESS",
            Self::Failure { .. } => "FAILURE",
            Self::Revoked { .. } => "REVOKED",
            Self::Unknown { .. } => "UNKNOWN",
            Self::Timeout { .. } => "TIMEOUT",
        }
    }

    /// Whether no further state can follow this one.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending { .. } | Self::Progress(_))
    }

    /// Whether the task finished successfully (verified or not).
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Progress payload, if running.
    pub fn progress(&self) -> Option<&ProgressInfo> {
        match self {
            Self::Progress(p) => Some(p),
            _ => None,
        }
    }

    /// Import outcome, if successful.
    pub fn outcome(&self) -> Option<&ImportOutcome> {
        match self {
            Self::Success(o) => Some(o),
            _ => None,
        }
    }

    /// Human-readable message carried by the status.
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Pending { message } | Self::Revoked { message } => message.as_deref(),
            Self::Progress(p) => p.status.as_deref(),
            Self::Success(o) => o.message.as_deref(),
            Self::Failure { message } | Self::Unknown { message } | Self::Timeout { message } => {
                Some(message)
            }
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Progress(p) => match (p.current, p.total) {
                (Some(current), Some(total)) => write!(f, "PROGRESS {current}/{total}"),
                _ => f.write_str("PROGRESS"),
            },
            Self::Success(o) => match (o.imported, o.total) {
                (Some(imported), Some(total)) => {
                    write!(f, "SUCCESS imported {imported}/{total}")
                }
                _ => f.write_str("SUCCESS (counts unavailable)"),
            },
            other => match other.message() {
                Some(message) => write!(f, "{}: {}", other.label(), message),
                None => f.write_str(other.label()),
            },
        }
    }
}

/// Progress payload of a running task.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressInfo {
    /// Items processed so far.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current: Option<u64>,
    /// Items in the batch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    /// Free-text status line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Current processing step, when reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<String>,
}

impl ProgressInfo {
    fn from_value(info: Option<&Value>) -> Self {
        match info {
            Some(info @ Value::Object(_)) => Self {
                current: u64_field(info, "current"),
                total: u64_field(info, "total"),
                status: str_field(info, "status"),
                step: str_field(info, "step"),
            },
            Some(Value::String(s)) => Self {
                status: Some(s.clone()),
                ..Self::default()
            },
            _ => Self::default(),
        }
    }

    /// Completed fraction in `0.0..=1.0`, when both counts are known.
    pub fn fraction(&self) -> Option<f64> {
        match (self.current, self.total) {
            (Some(current), Some(total)) if total > 0 => {
                Some((current as f64 / total as f64).clamp(0.0, 1.0))
            }
            _ => None,
        }
    }
}

/// A file the import worker could not process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedFile {
    pub filename: String,
    pub error: String,
}

/// Outcome of a completed import.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportOutcome {
    /// Items imported (including partial imports). `None` when unknown.
    pub imported: Option<u64>,
    /// Items in the batch. `None` when unknown.
    pub total: Option<u64>,
    /// Names of files that failed.
    #[serde(default)]
    pub failed_files: Vec<String>,
    /// Per-file failure reasons, when reported.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed_details: Vec<FailedFile>,
    /// Items imported with missing fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partial_imports: Option<u64>,
    /// Free-text summary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// False when completion was inferred rather than reported by the server.
    pub verified: bool,
}

impl ImportOutcome {
    /// Completion inferred without confirmation from the server.
    pub fn unverified(message: impl Into<String>) -> Self {
        Self {
            imported: None,
            total: None,
            failed_files: Vec::new(),
            failed_details: Vec::new(),
            partial_imports: None,
            message: Some(message.into()),
            verified: false,
        }
    }

    fn from_value(result: Option<&Value>) -> Self {
        let Some(result) = result else {
            return Self {
                verified: true,
                ..Self::unverified("Task completed successfully")
            };
        };

        if let Value::String(s) = result {
            return Self {
                verified: true,
                ..Self::unverified(s.clone())
            };
        }

        let imported = u64_field(result, "imported");
        let failed_files: Vec<String> = result
            .get("failed_files")
            .and_then(Value::as_array)
            .map(|files| {
                files
                    .iter()
                    .filter_map(|f| f.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();
        let failed = u64_field(result, "failed").unwrap_or(failed_files.len() as u64);
        let total = u64_field(result, "total")
            .or_else(|| imported.and_then(|i| i.checked_add(failed)));

        let failed_details = result
            .get("failed_details")
            .and_then(Value::as_array)
            .map(|details| {
                details
                    .iter()
                    .filter_map(|d| {
                        Some(FailedFile {
                            filename: str_field(d, "filename")?,
                            error: str_field(d, "error").unwrap_or_default(),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            imported,
            total,
            failed_files,
            failed_details,
            partial_imports: u64_field(result, "partial_imports"),
            message: str_field(result, "message").or_else(|| str_field(result, "status")),
            verified: true,
        }
    }

    /// Whether both imported and total counts are known.
    pub fn counts_known(&self) -> bool {
        self.imported.is_some() && self.total.is_some()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn u64_field(value: &Value, key: &str) -> Option<u64> {
    let field = value.get(key)?;
    field.as_u64().or_else(|| {
        field
            .as_f64()
            .filter(|f| f.is_finite() && *f >= 0.0)
            .map(|f| f as u64)
    })
}

fn str_field(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
}

/// Free text of an info payload: the payload itself, or its message/status.
fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Object(_) => str_field(value, "message").or_else(|| str_field(value, "status")),
        _ => None,
    }
}

/// Error text of a failure payload.
fn error_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Object(_) => str_field(value, "error")
            .or_else(|| str_field(value, "message"))
            .or_else(|| {
                value
                    .get("failed_details")
                    .and_then(Value::as_array)
                    .and_then(|d| d.first())
                    .and_then(|d| str_field(d, "error"))
            }),
        _ => None,
    }
}
