//! Status command - one-shot status lookup.

use std::process::ExitCode;

use anyhow::Result;
use clap::Args;
use trainerdesk_tracker::{TaskId, TaskStatus};

use super::Context;
use super::output::print_status;

/// Arguments for the status command.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Task ID
    pub task_id: String,
}

/// Run the status command.
pub async fn run(args: StatusArgs, ctx: &Context) -> Result<ExitCode> {
    let task_id = TaskId::parse(&args.task_id)?;
    let client = ctx.client()?;

    let response = client.tasks().status(task_id.as_str()).await?;
    if ctx.verbose && !ctx.json_output {
        eprintln!("raw state: {}", response.state);
    }

    let status = TaskStatus::from_response(&response);
    print_status(ctx, &task_id, &status)?;
    Ok(ExitCode::SUCCESS)
}
