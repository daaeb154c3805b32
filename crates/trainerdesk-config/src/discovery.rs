//! Locating the TrainerDesk config files and merging them into one config.
//!
//! Layers, lowest precedence first:
//! 1. `~/.config/trainerdesk/config.toml` (user config)
//! 2. `./trainerdesk.toml` (project-local)
//! 3. CLI arguments (handled by the binary)

use std::path::{Path, PathBuf};

use crate::types::APP_NAME;
use crate::{ConfigError, Result, TrainerDeskConfig};

/// File name looked up in the project directory.
pub const PROJECT_CONFIG_FILE: &str = "trainerdesk.toml";

/// Default config filename within the user config directory.
pub const USER_CONFIG_FILE: &str = "config.toml";

/// Environment variable overriding the user config directory.
pub const CONFIG_DIR_ENV: &str = "TRAINERDESK_CONFIG_DIR";

/// A config file that was considered during discovery.
#[derive(Debug, Clone)]
pub struct ConfigSource {
    /// Candidate location.
    pub path: PathBuf,
    /// Set when the file existed and parsed.
    pub loaded: bool,
}

/// Merged configuration plus a record of where it came from.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// Every loaded layer merged in order.
    pub config: TrainerDeskConfig,
    /// Sources that were checked, lowest precedence first.
    pub sources: Vec<ConfigSource>,
    /// Problems that did not stop loading (unreadable files, odd values).
    pub warnings: Vec<String>,
}

impl LoadedConfig {
    /// Paths of the sources that were actually loaded.
    pub fn loaded_from(&self) -> Vec<&Path> {
        self.sources
            .iter()
            .filter(|s| s.loaded)
            .map(|s| s.path.as_path())
            .collect()
    }
}

/// Discover, merge and validate all config layers.
pub fn load_config(project_dir: Option<&Path>) -> Result<LoadedConfig> {
    load_config_with_options(project_dir, None)
}

/// Like [`load_config`], with the user config directory chosen by the caller.
///
/// `config_dir` overrides both `TRAINERDESK_CONFIG_DIR` and the platform
/// default. Files that fail to parse are skipped with a warning; values that
/// fail validation are an error.
pub fn load_config_with_options(
    project_dir: Option<&Path>,
    config_dir: Option<&Path>,
) -> Result<LoadedConfig> {
    let mut config = TrainerDeskConfig::new();
    let mut sources = Vec::new();
    let mut warnings = Vec::new();

    let user_config_path = match config_dir {
        Some(dir) => Some(dir.join(USER_CONFIG_FILE)),
        None => xdg_config_path(),
    };
    if let Some(path) = user_config_path {
        sources.push(load_layer(&mut config, &path, &mut warnings));
    }

    let project_path = project_dir
        .map(|d| d.join(PROJECT_CONFIG_FILE))
        .unwrap_or_else(|| PathBuf::from(PROJECT_CONFIG_FILE));
    sources.push(load_layer(&mut config, &project_path, &mut warnings));

    warnings.extend(config.validate()?);

    Ok(LoadedConfig {
        config,
        sources,
        warnings,
    })
}

/// Load config from a specific file path (no discovery, no validation).
pub fn load_config_file(path: &Path) -> Result<TrainerDeskConfig> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.display().to_string(),
        source: e,
    })?;
    TrainerDeskConfig::from_toml(&contents)
}

/// Save configuration to a file, creating parent directories.
pub fn save_config(config: &TrainerDeskConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::WriteFile {
            path: parent.display().to_string(),
            source: e,
        })?;
    }

    let contents = config.to_toml()?;
    std::fs::write(path, contents).map_err(|e| ConfigError::WriteFile {
        path: path.display().to_string(),
        source: e,
    })
}

/// Path of the user config file.
pub fn xdg_config_path() -> Option<PathBuf> {
    xdg_config_dir().map(|d| d.join(USER_CONFIG_FILE))
}

/// User config directory: `TRAINERDESK_CONFIG_DIR`, else the platform
/// default (`~/.config/trainerdesk` on Linux).
pub fn xdg_config_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var(CONFIG_DIR_ENV)
        && !dir.is_empty()
    {
        return Some(PathBuf::from(dir));
    }
    dirs::config_dir().map(|d| d.join(APP_NAME))
}

/// Merge one file into `config` if it exists and parses.
fn load_layer(config: &mut TrainerDeskConfig, path: &Path, warnings: &mut Vec<String>) -> ConfigSource {
    let mut source = ConfigSource {
        path: path.to_path_buf(),
        loaded: false,
    };
    if !path.is_file() {
        return source;
    }

    match load_config_file(path) {
        Ok(layer) => {
            config.merge(layer);
            source.loaded = true;
        }
        Err(e) => warnings.push(format!("Skipped {}: {}", path.display(), e)),
    }
    source
}
