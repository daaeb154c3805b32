//! Cancel command - revoke a running import.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Result, bail};
use clap::Args;
use console::{Style, Term, style};
use serde::Serialize;
use trainerdesk_tracker::{Error as TrackerError, NoSnapshots, SnapshotStore, TaskId};

use super::Context;

/// Arguments for the cancel command.
#[derive(Args, Debug)]
pub struct CancelArgs {
    /// Task ID
    pub task_id: String,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

/// Cancellation result for JSON output.
#[derive(Debug, Serialize)]
struct CancelOutput<'a> {
    task_id: &'a str,
    cancelled: bool,
    message: Option<String>,
}

/// Run the cancel command.
pub async fn run(args: CancelArgs, ctx: &Context) -> Result<ExitCode> {
    let task_id = TaskId::parse(&args.task_id)?;
    let dim = Style::new().dim();

    if !args.yes && ctx.json_output {
        bail!("--yes is required with --json");
    }
    if !args.yes {
        eprintln!(
            "Files already processed by task {} will stay imported.",
            style(&task_id).bold()
        );
        if !confirm("Cancel the import?")? {
            println!("{}", dim.apply_to("Aborted."));
            return Ok(ExitCode::SUCCESS);
        }
    }

    // Only touch the remembered upload when it is the one being cancelled.
    let store: Arc<dyn SnapshotStore> = ctx.snapshot_store();
    let owns_snapshot = store
        .load()
        .ok()
        .flatten()
        .is_some_and(|snapshot| snapshot.task_id == task_id);

    let resumed = if owns_snapshot {
        let tracker = ctx.tracker_with_store(store)?;
        tracker.resume()?.is_some().then_some(tracker)
    } else {
        None
    };
    let tracker = match resumed {
        Some(tracker) => tracker,
        None => {
            let tracker = ctx.tracker_with_store(Arc::new(NoSnapshots))?;
            tracker.track(task_id.clone())?;
            tracker
        }
    };

    let (cancelled, message) = match tracker.cancel(&task_id).await {
        Ok(outcome) => (true, outcome.message),
        Err(TrackerError::AlreadyFinished { state, .. }) => {
            (false, Some(format!("Task already finished with {state}")))
        }
        Err(TrackerError::CancelRejected(reason)) => (false, Some(reason)),
        Err(e) => return Err(e.into()),
    };

    if ctx.json_output {
        let output = CancelOutput {
            task_id: task_id.as_str(),
            cancelled,
            message,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else if cancelled {
        println!("{} Task {} cancelled", style("■").yellow(), task_id);
        if let Some(message) = message {
            println!("  {}", dim.apply_to(message));
        }
    } else {
        println!("{} Task {} was not cancelled", style("!").red(), task_id);
        if let Some(message) = message {
            println!("  {}", message);
        }
    }

    Ok(if cancelled {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Ask a yes/no question on the terminal. Anything but "y"/"yes" is a no.
fn confirm(prompt: &str) -> Result<bool> {
    let term = Term::stderr();
    term.write_str(&format!("{prompt} [y/N] "))?;
    let input = term.read_line()?;
    let input = input.trim();
    Ok(input.eq_ignore_ascii_case("y") || input.eq_ignore_ascii_case("yes"))
}
