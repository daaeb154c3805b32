//! Health command - check that the server is reachable.

use std::process::ExitCode;

use anyhow::Result;
use clap::Args;
use console::{Style, style};
use serde::Serialize;

use super::Context;

/// Arguments for the health command.
#[derive(Args, Debug)]
pub struct HealthArgs {}

/// Health result for JSON output.
#[derive(Debug, Serialize)]
struct HealthOutput {
    reachable: bool,
    status: Option<String>,
    version: Option<String>,
    server_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Run the health command.
pub async fn run(_args: HealthArgs, ctx: &Context) -> Result<ExitCode> {
    let client = ctx.client()?;
    let result = client.health().check().await;

    let output = match &result {
        Ok(health) => HealthOutput {
            reachable: true,
            status: Some(health.status.clone()),
            version: health.version.clone(),
            server_url: ctx.server_url.clone(),
            error: None,
        },
        Err(e) => HealthOutput {
            reachable: false,
            status: None,
            version: None,
            server_url: ctx.server_url.clone(),
            error: Some(e.to_string()),
        },
    };

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        let dim = Style::new().dim();
        println!();
        println!("{}", style("TrainerDesk Server").bold());
        println!("{}", dim.apply_to("─".repeat(40)));
        if output.reachable {
            println!(
                "  {} {}",
                dim.apply_to("Status:"),
                style(format!("● {}", output.status.as_deref().unwrap_or("ok"))).green()
            );
            if let Some(version) = &output.version {
                println!("  {} {}", dim.apply_to("Version:"), version);
            }
        } else {
            println!(
                "  {} {}",
                dim.apply_to("Status:"),
                style("● unreachable").red()
            );
        }
        println!("  {} {}", dim.apply_to("Server:"), ctx.server_url);
        if let (Some(error), true) = (&output.error, ctx.verbose) {
            println!("  {} {}", dim.apply_to("Error:"), error);
        }
        println!();
    }

    Ok(if output.reachable {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
