//! Configuration for the TrainerDesk upload tools.
//!
//! TOML files are discovered in the user config directory and the current
//! project, then merged section by section. Each section falls back to
//! defaults that match the hosted API, so an empty config is valid.

pub mod discovery;
pub mod error;
pub mod types;

pub use discovery::{
    CONFIG_DIR_ENV, ConfigSource, LoadedConfig, PROJECT_CONFIG_FILE, USER_CONFIG_FILE,
    load_config, load_config_file, load_config_with_options, save_config, xdg_config_dir,
    xdg_config_path,
};
pub use error::{ConfigError, Result};
pub use types::*;
