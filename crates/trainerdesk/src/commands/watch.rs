//! Watch command - follow a running import until it finishes.

use std::process::ExitCode;

use anyhow::{Result, bail};
use clap::Args;
use console::Style;
use trainerdesk_client::TrainerDeskClient;
use trainerdesk_tracker::{TaskId, TaskStatus, TaskTracker};

use super::Context;
use super::output::{ProgressView, exit_code, print_status};

/// Arguments for the watch command.
#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Task to follow (default: the upload remembered from the last run)
    pub task_id: Option<String>,
}

/// Run the watch command.
pub async fn run(args: WatchArgs, ctx: &Context) -> Result<ExitCode> {
    let tracker = ctx.tracker()?;

    let task_id = match args.task_id {
        Some(raw) => {
            let task_id = TaskId::parse(&raw)?;
            tracker.track(task_id.clone())?;
            task_id
        }
        None => match tracker.resume()? {
            Some(task_id) => task_id,
            None => bail!("no upload in progress; pass a task id to watch"),
        },
    };

    follow(&tracker, &task_id, ctx).await
}

/// Follow the tracked task until it is terminal or the user presses Ctrl-C.
///
/// Interrupting leaves the snapshot in place so `watch` can pick the task
/// up again.
pub async fn follow(
    tracker: &TaskTracker<TrainerDeskClient>,
    task_id: &TaskId,
    ctx: &Context,
) -> Result<ExitCode> {
    let mut view = (!ctx.json_output).then(|| ProgressView::new(task_id));
    let mut rx = tracker.subscribe();

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let last: Option<TaskStatus> = loop {
        let current = rx.borrow_and_update().clone();
        if let Some(status) = current {
            if let Some(view) = view.as_mut() {
                view.update(&status);
            }
            if status.is_terminal() {
                break Some(status);
            }
        }

        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break tracker.current_status();
                }
            }
            _ = &mut ctrl_c => {
                if let Some(view) = view.as_ref() {
                    view.finish();
                }
                if !ctx.json_output {
                    let dim = Style::new().dim();
                    eprintln!();
                    eprintln!("Stopped watching. The import keeps running on the server.");
                    eprintln!("{}", dim.apply_to("Resume with: trainerdesk watch"));
                }
                return Ok(ExitCode::from(130));
            }
        }
    };

    if let Some(view) = view.as_ref() {
        view.finish();
    }

    let Some(status) = last else {
        bail!("tracking of task {task_id} stopped without a final status");
    };
    print_status(ctx, task_id, &status)?;
    Ok(exit_code(&status))
}
