//! Reset command - forget the remembered upload.

use std::process::ExitCode;

use anyhow::Result;
use clap::Args;
use console::{Style, style};
use serde::Serialize;

use super::Context;

/// Arguments for the reset command.
#[derive(Args, Debug)]
pub struct ResetArgs {}

#[derive(Debug, Serialize)]
struct ResetOutput {
    forgotten: Option<String>,
}

/// Run the reset command.
///
/// Only local state is cleared; a task still running on the server is not
/// cancelled.
pub async fn run(_args: ResetArgs, ctx: &Context) -> Result<ExitCode> {
    let store = ctx.snapshot_store();
    let forgotten = match store.load() {
        Ok(snapshot) => snapshot.map(|s| s.task_id.to_string()),
        Err(e) => {
            tracing::debug!(error = %e, "snapshot unreadable, clearing anyway");
            None
        }
    };

    ctx.tracker_with_store(store)?.reset()?;

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&ResetOutput { forgotten })?);
    } else {
        let dim = Style::new().dim();
        match forgotten {
            Some(task_id) => {
                println!("Forgot task {}", style(&task_id).bold());
                println!(
                    "{}",
                    dim.apply_to("It keeps running on the server; use `trainerdesk cancel` to stop it.")
                );
            }
            None => println!("{}", dim.apply_to("No upload was remembered.")),
        }
    }
    Ok(ExitCode::SUCCESS)
}
