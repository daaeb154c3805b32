//! Config command - inspect and initialize configuration.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Result, anyhow, bail};
use clap::{Args, Subcommand};
use console::{Style, style};
use serde::Serialize;
use trainerdesk_config::{
    PROJECT_CONFIG_FILE, TrainerDeskConfig, USER_CONFIG_FILE, save_config, xdg_config_dir,
};

use super::Context;

/// Arguments for the config command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: Option<ConfigCommand>,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show the effective configuration (default)
    Show,

    /// Show which config files are loaded and their precedence
    Which,

    /// Write a config file with the default values
    Init {
        /// Create project-local config (./trainerdesk.toml) instead of user config
        #[arg(long)]
        local: bool,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Show the user configuration file path
    Path,
}

/// Effective configuration for JSON output.
#[derive(Debug, Serialize)]
struct ShowOutput<'a> {
    server_url: &'a str,
    loaded_from: Vec<String>,
    warnings: &'a [String],
    config: TrainerDeskConfig,
}

/// Run the config command.
pub async fn run(args: ConfigArgs, ctx: &Context) -> Result<ExitCode> {
    match args.command.unwrap_or(ConfigCommand::Show) {
        ConfigCommand::Show => cmd_show(ctx)?,
        ConfigCommand::Which => cmd_which(ctx),
        ConfigCommand::Init { local, force } => cmd_init(ctx, local, force)?,
        ConfigCommand::Path => println!("{}", user_config_path(ctx)?.display()),
    }
    Ok(ExitCode::SUCCESS)
}

/// Every section filled in, so defaults are visible.
fn effective(config: &TrainerDeskConfig) -> TrainerDeskConfig {
    TrainerDeskConfig {
        server: Some(config.server()),
        tracker: Some(config.tracker()),
        cache: Some(config.cache()),
        logging: Some(config.logging()),
    }
}

fn cmd_show(ctx: &Context) -> Result<()> {
    let loaded = &ctx.loaded;
    let config = effective(&loaded.config);

    if ctx.json_output {
        let output = ShowOutput {
            server_url: &ctx.server_url,
            loaded_from: loaded
                .loaded_from()
                .iter()
                .map(|p| p.display().to_string())
                .collect(),
            warnings: &loaded.warnings,
            config,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let dim = Style::new().dim();
    println!("{}", style("# TrainerDesk Configuration").bold());
    let sources = loaded.loaded_from();
    if sources.is_empty() {
        println!("{}", dim.apply_to("# No config files loaded (using defaults)"));
    } else {
        for path in sources {
            println!("{}", dim.apply_to(format!("# from {}", path.display())));
        }
    }
    if ctx.server_url != config.server().url {
        println!(
            "{}",
            dim.apply_to(format!("# server url overridden: {}", ctx.server_url))
        );
    }
    for warning in &loaded.warnings {
        println!("{} {}", style("# warning:").yellow(), warning);
    }
    println!();
    print!("{}", config.to_toml()?);
    Ok(())
}

fn cmd_which(ctx: &Context) {
    println!("Config file search order (later overrides earlier):\n");
    for source in &ctx.loaded.sources {
        let status = if source.loaded {
            style("✓ loaded").green()
        } else {
            style("· not found").dim()
        };
        println!("  {} {}", status, source.path.display());
    }

    println!();
    let loaded_count = ctx.loaded.loaded_from().len();
    if loaded_count == 0 {
        println!("No config files found. Run 'trainerdesk config init' to create one.");
    } else {
        println!("{} config file(s) loaded.", loaded_count);
    }
}

fn cmd_init(ctx: &Context, local: bool, force: bool) -> Result<()> {
    let path = if local {
        PathBuf::from(PROJECT_CONFIG_FILE)
    } else {
        user_config_path(ctx)?
    };

    if path.exists() && !force {
        bail!(
            "config file already exists: {} (use --force to overwrite)",
            path.display()
        );
    }

    save_config(&effective(&TrainerDeskConfig::new()), &path)?;
    if ctx.json_output {
        println!("{}", serde_json::json!({ "path": path.display().to_string() }));
    } else {
        println!("Wrote {}", path.display());
    }
    Ok(())
}

fn user_config_path(ctx: &Context) -> Result<PathBuf> {
    let dir = match &ctx.config_dir {
        Some(dir) => dir.clone(),
        None => xdg_config_dir().ok_or_else(|| anyhow!("could not determine config directory"))?,
    };
    Ok(dir.join(USER_CONFIG_FILE))
}
