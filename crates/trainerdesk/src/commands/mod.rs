//! CLI command handlers.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use trainerdesk_client::{ApiRoutes, TrainerDeskClient};
use trainerdesk_config::LoadedConfig;
use trainerdesk_tracker::{FileSnapshotStore, NoSnapshots, SnapshotStore, TaskTracker, TrackerConfig};

pub mod cancel;
pub mod config;
pub mod health;
pub mod output;
pub mod reset;
pub mod status;
pub mod upload;
pub mod watch;

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Server URL to connect to.
    pub server_url: String,
    /// Output as JSON for scripting.
    pub json_output: bool,
    /// Verbose output enabled.
    pub verbose: bool,
    /// Explicit config directory, if one was given.
    pub config_dir: Option<PathBuf>,
    /// Merged configuration and where it came from.
    pub loaded: LoadedConfig,
}

impl Context {
    /// Build an API client from the server settings.
    pub fn client(&self) -> Result<TrainerDeskClient> {
        let server = self.loaded.config.server();
        let routes = ApiRoutes {
            submit: server.routes.submit.clone(),
            status: server.routes.status.clone(),
            cancel: server.routes.cancel.clone(),
            health: server.routes.health.clone(),
        };

        let mut builder = TrainerDeskClient::builder()
            .base_url(&self.server_url)
            .routes(routes)
            .timeout(server.timeout())
            .upload_timeout(server.upload_timeout())
            .user_agent(concat!("trainerdesk/", env!("CARGO_PKG_VERSION")));
        if let Some(token) = server.resolve_token()? {
            builder = builder.auth_token(token);
        }
        Ok(builder.build()?)
    }

    /// Tracker tunables from the `[tracker]` section.
    pub fn tracker_config(&self) -> TrackerConfig {
        let section = self.loaded.config.tracker();
        TrackerConfig::new()
            .with_poll_interval(section.poll_interval())
            .with_malformed_threshold(section.malformed_threshold)
            .with_failure_threshold(section.failure_threshold)
            .with_max_wait(section.max_wait())
            .with_snapshot_max_age(section.snapshot_max_age())
    }

    /// The snapshot store, or a no-op store when caching is disabled.
    pub fn snapshot_store(&self) -> Arc<dyn SnapshotStore> {
        match self.loaded.config.cache().resolve_snapshot_path() {
            Some(path) => Arc::new(FileSnapshotStore::new(path)),
            None => Arc::new(NoSnapshots),
        }
    }

    /// A tracker persisting to the configured snapshot store.
    pub fn tracker(&self) -> Result<TaskTracker<TrainerDeskClient>> {
        self.tracker_with_store(self.snapshot_store())
    }

    pub fn tracker_with_store(
        &self,
        store: Arc<dyn SnapshotStore>,
    ) -> Result<TaskTracker<TrainerDeskClient>> {
        Ok(TaskTracker::with_store(
            Arc::new(self.client()?),
            self.tracker_config(),
            store,
        ))
    }
}
