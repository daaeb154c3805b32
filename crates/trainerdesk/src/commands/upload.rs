//! Upload command - submit files and follow the import.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context as _, Result};
use clap::Args;
use console::{Style, style};
use serde::Serialize;
use trainerdesk_client::UploadBatch;

use super::Context;
use super::watch::follow;

/// Arguments for the upload command.
#[derive(Args, Debug)]
pub struct UploadArgs {
    /// Files to upload (PDF, DOCX, JSON...)
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Submit and exit without waiting for the import to finish
    #[arg(short, long)]
    pub detach: bool,
}

/// Submission receipt for JSON output.
#[derive(Debug, Serialize)]
struct SubmittedOutput<'a> {
    task_id: &'a str,
    files: &'a [String],
    bytes: usize,
}

/// Run the upload command.
pub async fn run(args: UploadArgs, ctx: &Context) -> Result<ExitCode> {
    let batch = UploadBatch::from_paths(&args.files)
        .await
        .context("failed to read upload files")?;

    let filenames: Vec<String> = batch.filenames().into_iter().map(str::to_string).collect();
    let total_bytes = batch.total_bytes();

    let tracker = ctx.tracker()?;
    let task_id = tracker.submit(batch).await?;

    if ctx.json_output {
        if args.detach {
            let output = SubmittedOutput {
                task_id: task_id.as_str(),
                files: &filenames,
                bytes: total_bytes,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    } else {
        let dim = Style::new().dim();
        eprintln!(
            "{} {} file(s) submitted as task {}",
            style("↑").cyan(),
            filenames.len(),
            style(&task_id).bold()
        );
        if ctx.verbose {
            for name in &filenames {
                eprintln!("    {}", dim.apply_to(name));
            }
        }
        if args.detach {
            eprintln!(
                "{}",
                dim.apply_to(format!("Follow with: trainerdesk watch {task_id}"))
            );
        }
    }

    if args.detach {
        return Ok(ExitCode::SUCCESS);
    }

    follow(&tracker, &task_id, ctx).await
}
