//! Poll bookkeeping: failure counting, degradation and the wall-clock ceiling.
//!
//! [`PollMonitor`] holds no timers and performs no I/O. The tracker feeds it
//! the current instant before each poll and the outcome after it, and acts on
//! the returned [`Verdict`]. Keeping the decisions here makes every threshold
//! testable without a runtime.

use std::time::Duration;

use tokio::time::Instant;

use crate::config::TrackerConfig;
use crate::status::{ImportOutcome, TaskStatus};

/// Why a poll did not yield a decodable status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The endpoint answered with a document instead of structured data.
    Malformed,
    /// Anything else: connection errors, API errors, undecodable JSON.
    Network,
}

/// A failed poll attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportFailure {
    pub kind: FailureKind,
    pub detail: String,
}

impl TransportFailure {
    pub fn malformed(detail: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Malformed,
            detail: detail.into(),
        }
    }

    pub fn network(detail: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Network,
            detail: detail.into(),
        }
    }
}

impl From<&trainerdesk_client::Error> for TransportFailure {
    fn from(err: &trainerdesk_client::Error) -> Self {
        if err.is_malformed() {
            Self::malformed(err.to_string())
        } else {
            Self::network(err.to_string())
        }
    }
}

/// Result of one poll.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// The endpoint returned a decodable status.
    Status(TaskStatus),
    /// The poll failed.
    Failed(TransportFailure),
}

/// What the tracker should do after a poll.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// Keep polling. Carries the new status when one was decoded.
    Continue(Option<TaskStatus>),
    /// Stop polling and finalize with this status.
    Finish(TaskStatus),
    /// The monitor already finished; discard the outcome.
    Stale,
}

/// Decision core of the polling loop.
#[derive(Debug)]
pub struct PollMonitor {
    malformed_threshold: u32,
    failure_threshold: u32,
    max_wait: Duration,
    first_poll_at: Option<Instant>,
    consecutive_failures: u32,
    consecutive_malformed: u32,
    polls: u64,
    finished: bool,
}

impl PollMonitor {
    pub fn new(config: &TrackerConfig) -> Self {
        Self {
            malformed_threshold: config.malformed_threshold.max(1),
            failure_threshold: config.failure_threshold.max(1),
            max_wait: config.max_wait,
            first_poll_at: None,
            consecutive_failures: 0,
            consecutive_malformed: 0,
            polls: 0,
            finished: false,
        }
    }

    /// Called before each poll. Returns a synthesized `Timeout` once the
    /// ceiling measured from the first poll has elapsed.
    pub fn begin_poll(&mut self, now: Instant) -> Option<TaskStatus> {
        if self.finished {
            return None;
        }
        let first = *self.first_poll_at.get_or_insert(now);
        let elapsed = now.saturating_duration_since(first);
        if elapsed >= self.max_wait {
            self.finished = true;
            return Some(TaskStatus::Timeout {
                message: format!(
                    "Task did not finish within {}s. It may still be running; check the results later.",
                    self.max_wait.as_secs()
                ),
            });
        }
        self.polls += 1;
        None
    }

    /// Record the outcome of a poll.
    pub fn observe(&mut self, outcome: PollOutcome) -> Verdict {
        if self.finished {
            return Verdict::Stale;
        }

        match outcome {
            PollOutcome::Status(status) => {
                self.consecutive_failures = 0;
                self.consecutive_malformed = 0;
                if status.is_terminal() {
                    self.finished = true;
                    Verdict::Finish(status)
                } else {
                    Verdict::Continue(Some(status))
                }
            }
            PollOutcome::Failed(failure) => {
                self.consecutive_failures += 1;
                match failure.kind {
                    FailureKind::Malformed => self.consecutive_malformed += 1,
                    FailureKind::Network => self.consecutive_malformed = 0,
                }

                if self.consecutive_malformed >= self.malformed_threshold {
                    self.finished = true;
                    return Verdict::Finish(TaskStatus::Success(ImportOutcome::unverified(
                        format!(
                            "Upload likely completed, but the status endpoint returned {} non-JSON responses in a row so the counts could not be verified. Check the trainer list to confirm.",
                            self.consecutive_malformed
                        ),
                    )));
                }

                if self.consecutive_failures >= self.failure_threshold {
                    self.finished = true;
                    return Verdict::Finish(TaskStatus::Unknown {
                        message: format!(
                            "Lost contact with the status endpoint after {} failed checks (last error: {}). The task may still be running; verify the results before retrying.",
                            self.consecutive_failures, failure.detail
                        ),
                    });
                }

                Verdict::Continue(None)
            }
        }
    }

    /// Stop accepting outcomes (cancellation or reset).
    pub fn finish(&mut self) {
        self.finished = true;
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Polls started so far.
    pub fn polls(&self) -> u64 {
        self.polls
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn consecutive_malformed(&self) -> u32 {
        self.consecutive_malformed
    }
}
