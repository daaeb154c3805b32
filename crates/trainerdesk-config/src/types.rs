//! Configuration types mapping to the TOML schema.
//!
//! ```toml
//! [server]
//! url = "https://trainers.example.com"
//! token_env = "TRAINERDESK_TOKEN"
//! timeout_secs = 30
//!
//! [server.routes]
//! submit = "api/admin/trainers/upload"
//! status = "api/admin/trainers/upload/{task_id}/status"
//!
//! [tracker]
//! poll_interval_ms = 2500
//! malformed_threshold = 10
//! failure_threshold = 20
//! max_wait_secs = 300
//!
//! [cache]
//! enabled = true
//!
//! [logging]
//! file_filter = "trainerdesk=debug,info"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Application name used for platform directories.
pub const APP_NAME: &str = "trainerdesk";

/// File name of the in-flight task snapshot inside the cache directory.
pub const SNAPSHOT_FILE: &str = "active-upload.json";

// ─────────────────────────────────────────────────────────────────────────────
// Top-level Config
// ─────────────────────────────────────────────────────────────────────────────

/// Root configuration structure.
///
/// All sections are optional so that partial configs (e.g. a project-local
/// override that only sets the server URL) can be loaded and merged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerDeskConfig {
    /// Server connection settings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server: Option<ServerConfig>,

    /// Polling behaviour.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracker: Option<TrackerSection>,

    /// Snapshot cache.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache: Option<CacheConfig>,

    /// File logging.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,
}

impl TrainerDeskConfig {
    /// Create an empty config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> crate::Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> crate::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Merge another config on top of this one (other takes priority).
    ///
    /// Sections are replaced wholesale, matching how a later file shadows an
    /// earlier one.
    pub fn merge(&mut self, other: TrainerDeskConfig) {
        if other.server.is_some() {
            self.server = other.server;
        }
        if other.tracker.is_some() {
            self.tracker = other.tracker;
        }
        if other.cache.is_some() {
            self.cache = other.cache;
        }
        if other.logging.is_some() {
            self.logging = other.logging;
        }
    }

    /// Effective server section.
    pub fn server(&self) -> ServerConfig {
        self.server.clone().unwrap_or_default()
    }

    /// Effective tracker section.
    pub fn tracker(&self) -> TrackerSection {
        self.tracker.clone().unwrap_or_default()
    }

    /// Effective cache section.
    pub fn cache(&self) -> CacheConfig {
        self.cache.clone().unwrap_or_default()
    }

    /// Effective logging section.
    pub fn logging(&self) -> LoggingConfig {
        self.logging.clone().unwrap_or_default()
    }

    /// Check the effective values.
    ///
    /// Unusable values are errors. Suspicious but workable combinations are
    /// returned as warnings.
    pub fn validate(&self) -> crate::Result<Vec<String>> {
        let mut warnings = Vec::new();

        let server = self.server();
        let url = server.url.trim();
        if url.is_empty() {
            return Err(ConfigError::invalid("server.url", "must not be empty"));
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::invalid(
                "server.url",
                format!("'{url}' must start with http:// or https://"),
            ));
        }
        if server.timeout_secs == 0 {
            return Err(ConfigError::invalid("server.timeout_secs", "must be greater than zero"));
        }
        for (field, route) in server.routes.entries() {
            if route.trim().is_empty() {
                return Err(ConfigError::invalid(field, "must not be empty"));
            }
        }
        for (field, route) in [
            ("server.routes.status", &server.routes.status),
            ("server.routes.cancel", &server.routes.cancel),
        ] {
            if !route.contains(TASK_ID_PLACEHOLDER) {
                warnings.push(format!(
                    "{field} does not contain {TASK_ID_PLACEHOLDER}; the task id will be appended"
                ));
            }
        }

        let tracker = self.tracker();
        let positive = [
            ("tracker.poll_interval_ms", tracker.poll_interval_ms),
            ("tracker.malformed_threshold", u64::from(tracker.malformed_threshold)),
            ("tracker.failure_threshold", u64::from(tracker.failure_threshold)),
            ("tracker.max_wait_secs", tracker.max_wait_secs),
        ];
        for (field, value) in positive {
            if value == 0 {
                return Err(ConfigError::invalid(field, "must be greater than zero"));
            }
        }

        if tracker.malformed_threshold >= tracker.failure_threshold {
            warnings.push(format!(
                "tracker.malformed_threshold ({}) is not below tracker.failure_threshold ({}); \
                 repeated non-JSON replies will end as UNKNOWN instead of an unverified success",
                tracker.malformed_threshold, tracker.failure_threshold
            ));
        }
        if tracker.poll_interval() >= tracker.max_wait() {
            warnings.push(format!(
                "tracker.poll_interval_ms ({}) is not shorter than tracker.max_wait_secs ({}s); \
                 at most one poll will be made",
                tracker.poll_interval_ms, tracker.max_wait_secs
            ));
        }

        Ok(warnings)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Server Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Placeholder substituted with the task id in route templates.
pub const TASK_ID_PLACEHOLDER: &str = "{task_id}";

/// Default server URL.
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:8000";

/// Default environment variable holding the API token.
pub const DEFAULT_TOKEN_ENV: &str = "TRAINERDESK_TOKEN";

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Base URL of the API.
    pub url: String,
    /// Environment variable holding the bearer token.
    pub token_env: String,
    /// File holding the bearer token. Takes priority over `token_env`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_file: Option<PathBuf>,
    /// Timeout for ordinary requests, in seconds.
    pub timeout_secs: u64,
    /// Timeout for batch uploads, in seconds.
    pub upload_timeout_secs: u64,
    /// Endpoint paths relative to `url`.
    pub routes: RoutesConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_SERVER_URL.to_string(),
            token_env: DEFAULT_TOKEN_ENV.to_string(),
            token_file: None,
            timeout_secs: 30,
            upload_timeout_secs: 300,
            routes: RoutesConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn upload_timeout(&self) -> Duration {
        Duration::from_secs(self.upload_timeout_secs)
    }

    /// Resolve the bearer token: `token_file` first, then `token_env`.
    ///
    /// Empty values count as absent.
    pub fn resolve_token(&self) -> crate::Result<Option<String>> {
        if let Some(path) = &self.token_file {
            let path = expand_path(path);
            let token = std::fs::read_to_string(&path).map_err(|e| ConfigError::TokenFile {
                path: path.display().to_string(),
                source: e,
            })?;
            let token = token.trim();
            if !token.is_empty() {
                return Ok(Some(token.to_string()));
            }
        }

        if !self.token_env.is_empty()
            && let Ok(token) = std::env::var(&self.token_env)
            && !token.trim().is_empty()
        {
            return Ok(Some(token.trim().to_string()));
        }

        Ok(None)
    }
}

/// Endpoint paths, relative to the server URL.
///
/// `status` and `cancel` contain `{task_id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutesConfig {
    pub submit: String,
    pub status: String,
    pub cancel: String,
    pub health: String,
}

impl Default for RoutesConfig {
    fn default() -> Self {
        Self {
            submit: "tasks".to_string(),
            status: "tasks/{task_id}".to_string(),
            cancel: "tasks/{task_id}/cancel".to_string(),
            health: "health".to_string(),
        }
    }
}

impl RoutesConfig {
    fn entries(&self) -> [(&'static str, &str); 4] {
        [
            ("server.routes.submit", &self.submit),
            ("server.routes.status", &self.status),
            ("server.routes.cancel", &self.cancel),
            ("server.routes.health", &self.health),
        ]
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tracker Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Polling behaviour (`[tracker]`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerSection {
    /// Delay between status polls, in milliseconds.
    pub poll_interval_ms: u64,
    /// Consecutive non-JSON replies before completion is assumed.
    pub malformed_threshold: u32,
    /// Consecutive failed polls before giving up.
    pub failure_threshold: u32,
    /// Ceiling on how long to wait for a terminal state, in seconds.
    pub max_wait_secs: u64,
    /// Snapshots older than this are ignored, in seconds.
    pub snapshot_max_age_secs: u64,
}

impl Default for TrackerSection {
    fn default() -> Self {
        Self {
            poll_interval_ms: 2500,
            malformed_threshold: 10,
            failure_threshold: 20,
            max_wait_secs: 300,
            snapshot_max_age_secs: 3600,
        }
    }
}

impl TrackerSection {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn max_wait(&self) -> Duration {
        Duration::from_secs(self.max_wait_secs)
    }

    pub fn snapshot_max_age(&self) -> Duration {
        Duration::from_secs(self.snapshot_max_age_secs)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Cache Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Snapshot cache (`[cache]`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Whether the in-flight task is persisted for later resume.
    pub enabled: bool,
    /// Snapshot file. Defaults to the platform cache directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot_path: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            snapshot_path: None,
        }
    }
}

impl CacheConfig {
    /// Where the snapshot lives, or `None` when caching is disabled or no
    /// cache directory can be determined.
    pub fn resolve_snapshot_path(&self) -> Option<PathBuf> {
        if !self.enabled {
            return None;
        }
        match &self.snapshot_path {
            Some(path) => Some(expand_path(path)),
            None => dirs::cache_dir().map(|d| d.join(APP_NAME).join(SNAPSHOT_FILE)),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Logging Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Default `EnvFilter` directive for the log file.
pub const DEFAULT_FILE_FILTER: &str =
    "trainerdesk=debug,trainerdesk_client=debug,trainerdesk_tracker=debug,trainerdesk_config=debug,info";

/// File logging (`[logging]`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Directory for rolling JSON logs. Defaults to `logs/` under the
    /// user config directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
    /// `EnvFilter` directive for the file layer.
    pub file_filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: None,
            file_filter: DEFAULT_FILE_FILTER.to_string(),
        }
    }
}

impl LoggingConfig {
    /// Effective log directory.
    pub fn resolve_directory(&self) -> PathBuf {
        match &self.directory {
            Some(dir) => expand_path(dir),
            None => crate::discovery::xdg_config_dir()
                .map(|d| d.join("logs"))
                .unwrap_or_else(|| PathBuf::from("logs")),
        }
    }
}

/// Expand a leading `~` to the home directory.
pub fn expand_path(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => path.to_path_buf(),
        },
        Err(_) => path.to_path_buf(),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
