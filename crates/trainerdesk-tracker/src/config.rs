//! Configuration for the task tracker.

use std::time::Duration;

/// Default delay between two status polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2500);

/// Consecutive document (non-JSON) replies before completion is assumed.
pub const DEFAULT_MALFORMED_THRESHOLD: u32 = 10;

/// Consecutive failed polls of any kind before the tracker gives up.
pub const DEFAULT_FAILURE_THRESHOLD: u32 = 20;

/// Wall-clock ceiling measured from the first poll.
pub const DEFAULT_MAX_WAIT: Duration = Duration::from_secs(5 * 60);

/// Snapshots older than this are discarded on resume.
pub const DEFAULT_SNAPSHOT_MAX_AGE: Duration = Duration::from_secs(60 * 60);

/// Tunables for a [`TaskTracker`](crate::TaskTracker).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerConfig {
    /// Fixed delay between polls. There is no backoff.
    pub poll_interval: Duration,

    /// Consecutive malformed replies that end tracking with an unverified
    /// success.
    pub malformed_threshold: u32,

    /// Consecutive failures of any kind that end tracking with an unknown
    /// outcome.
    pub failure_threshold: u32,

    /// Maximum time to wait for a terminal state.
    pub max_wait: Duration,

    /// Maximum age of a snapshot that `resume` will still act on.
    pub snapshot_max_age: Duration,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            malformed_threshold: DEFAULT_MALFORMED_THRESHOLD,
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            max_wait: DEFAULT_MAX_WAIT,
            snapshot_max_age: DEFAULT_SNAPSHOT_MAX_AGE,
        }
    }
}

impl TrackerConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the malformed-reply threshold.
    pub fn with_malformed_threshold(mut self, threshold: u32) -> Self {
        self.malformed_threshold = threshold;
        self
    }

    /// Set the generic failure threshold.
    pub fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold;
        self
    }

    /// Set the wall-clock ceiling.
    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = max_wait;
        self
    }

    /// Set the maximum snapshot age honoured by `resume`.
    pub fn with_snapshot_max_age(mut self, age: Duration) -> Self {
        self.snapshot_max_age = age;
        self
    }
}
