//! TrainerDesk - bulk trainer profile uploads from the command line.
//!
//! Main entry point for the `trainerdesk` CLI.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};

mod commands;

use commands::{cancel, config, health, reset, status, upload, watch};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// TrainerDesk - upload trainer profiles and follow the import
#[derive(Parser)]
#[command(name = "trainerdesk")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,

    /// Server URL (default: from config, then http://127.0.0.1:8000)
    #[arg(long, global = true, env = "TRAINERDESK_SERVER_URL")]
    pub server: Option<String>,

    /// Directory holding config.toml (default: platform config dir)
    #[arg(long, global = true, env = "TRAINERDESK_CONFIG_DIR")]
    pub config_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Upload files and follow the import
    Upload(upload::UploadArgs),

    /// Follow a running import
    Watch(watch::WatchArgs),

    /// Show the current status of a task
    Status(status::StatusArgs),

    /// Cancel a running import
    Cancel(cancel::CancelArgs),

    /// Forget the remembered upload
    Reset(reset::ResetArgs),

    /// Check that the server is reachable
    Health(health::HealthArgs),

    /// Show or initialize configuration
    Config(config::ConfigArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let loaded = trainerdesk_config::load_config_with_options(None, cli.config_dir.as_deref())
        .context("failed to load configuration")?;

    let _guard = init_tracing(cli.verbose, &loaded.config.logging());

    for warning in &loaded.warnings {
        tracing::warn!("{}", warning);
    }

    let server_url = cli
        .server
        .clone()
        .unwrap_or_else(|| loaded.config.server().url);

    let ctx = commands::Context {
        server_url,
        json_output: cli.json,
        verbose: cli.verbose,
        config_dir: cli.config_dir.clone(),
        loaded,
    };

    match cli.command {
        Commands::Upload(args) => upload::run(args, &ctx).await,
        Commands::Watch(args) => watch::run(args, &ctx).await,
        Commands::Status(args) => status::run(args, &ctx).await,
        Commands::Cancel(args) => cancel::run(args, &ctx).await,
        Commands::Reset(args) => reset::run(args, &ctx).await,
        Commands::Health(args) => health::run(args, &ctx).await,
        Commands::Config(args) => config::run(args, &ctx).await,
    }
}

/// Console (human-readable, stderr) plus a daily-rotated JSON file.
///
/// File logging is skipped when the log directory cannot be created.
fn init_tracing(verbose: bool, logging: &trainerdesk_config::LoggingConfig) -> Option<WorkerGuard> {
    use tracing_subscriber::prelude::*;

    let console_filter = if verbose {
        "trainerdesk=debug,trainerdesk_client=debug,trainerdesk_tracker=debug,trainerdesk_config=debug,info"
    } else {
        "warn"
    };

    let log_dir = logging.resolve_directory();
    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("trainerdesk")
        .filename_suffix("log")
        .build(&log_dir);

    let (file_layer, guard) = match appender {
        Ok(appender) => {
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_filter(tracing_subscriber::EnvFilter::new(&logging.file_filter));
            (Some(layer), Some(guard))
        }
        Err(_) => (None, None),
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .with_filter(tracing_subscriber::EnvFilter::new(console_filter)),
        )
        .with(file_layer)
        .init();

    guard
}
