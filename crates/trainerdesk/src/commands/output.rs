//! Rendering of task statuses for humans and scripts.

use std::process::ExitCode;
use std::time::Duration;

use anyhow::Result;
use console::{Style, style};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use trainerdesk_tracker::{ImportOutcome, TaskId, TaskStatus};

use super::Context;

/// Exit code for a status the user should not treat as done.
pub fn exit_code(status: &TaskStatus) -> ExitCode {
    match status {
        TaskStatus::Failure { .. } => ExitCode::from(1),
        TaskStatus::Unknown { .. } => ExitCode::from(2),
        TaskStatus::Timeout { .. } => ExitCode::from(3),
        _ => ExitCode::SUCCESS,
    }
}

/// Status line for JSON output.
#[derive(Debug, Serialize)]
struct StatusOutput<'a> {
    task_id: &'a str,
    #[serde(flatten)]
    status: &'a TaskStatus,
}

/// Print a status, as JSON or as a short human summary.
pub fn print_status(ctx: &Context, task_id: &TaskId, status: &TaskStatus) -> Result<()> {
    if ctx.json_output {
        let output = StatusOutput {
            task_id: task_id.as_str(),
            status,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let dim = Style::new().dim();
    let green = Style::new().green();
    let yellow = Style::new().yellow();
    let red = Style::new().red();

    println!();
    match status {
        TaskStatus::Pending { message } => {
            println!("  {} Waiting for a worker", dim.apply_to("…"));
            if let Some(message) = message {
                println!("    {}", dim.apply_to(message));
            }
        }
        TaskStatus::Progress(progress) => {
            let counts = match (progress.current, progress.total) {
                (Some(current), Some(total)) => format!(" {current}/{total}"),
                _ => String::new(),
            };
            let percent = progress
                .fraction()
                .map(|f| format!(" ({:.0}%)", f * 100.0))
                .unwrap_or_default();
            println!("  {} Processing{}{}", style("▶").cyan(), counts, percent);
            if let Some(message) = &progress.status {
                println!("    {}", dim.apply_to(message));
            }
        }
        TaskStatus::Success(outcome) => print_outcome(outcome),
        TaskStatus::Failure { message } => {
            println!("  {} Import failed", red.apply_to("✗"));
            println!("    {}", message);
        }
        TaskStatus::Revoked { message } => {
            println!("  {} Import cancelled", yellow.apply_to("■"));
            println!(
                "    {}",
                dim.apply_to(
                    message
                        .as_deref()
                        .unwrap_or("Files processed before the cancellation stay imported.")
                )
            );
        }
        TaskStatus::Unknown { message } => {
            println!("  {} Outcome unknown", yellow.apply_to("?"));
            println!("    {}", message);
        }
        TaskStatus::Timeout { message } => {
            println!("  {} Stopped waiting", yellow.apply_to("⏱"));
            println!("    {}", message);
        }
    }
    println!("  {} {}", dim.apply_to("Task:"), task_id);
    if matches!(status, TaskStatus::Success(_)) {
        println!("  {}", green.apply_to("Done."));
    }
    println!();
    Ok(())
}

fn print_outcome(outcome: &ImportOutcome) {
    let green = Style::new().green();
    let yellow = Style::new().yellow();
    let dim = Style::new().dim();

    if !outcome.verified {
        println!("  {} Upload likely completed", yellow.apply_to("✓"));
        if let Some(message) = &outcome.message {
            println!("    {}", dim.apply_to(message));
        }
        return;
    }

    match (outcome.imported, outcome.total) {
        (Some(imported), Some(total)) => println!(
            "  {} Imported {} of {} trainers",
            green.apply_to("✓"),
            imported,
            total
        ),
        (Some(imported), None) => {
            println!("  {} Imported {} trainers", green.apply_to("✓"), imported)
        }
        _ => println!("  {} Import completed", green.apply_to("✓")),
    }
    if let Some(partial) = outcome.partial_imports.filter(|p| *p > 0) {
        println!(
            "    {} imported with missing fields",
            yellow.apply_to(partial)
        );
    }
    if !outcome.failed_files.is_empty() {
        println!("    {}", style("Failed files:").bold());
        for file in &outcome.failed_files {
            let reason = outcome
                .failed_details
                .iter()
                .find(|d| &d.filename == file)
                .map(|d| d.error.as_str())
                .filter(|e| !e.is_empty());
            match reason {
                Some(reason) => println!("      - {} {}", file, dim.apply_to(format!("({reason})"))),
                None => println!("      - {}", file),
            }
        }
    }
    if let Some(message) = &outcome.message {
        println!("    {}", dim.apply_to(message));
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Live progress
// ─────────────────────────────────────────────────────────────────────────────

/// Spinner that turns into a bar once the task reports counts.
pub struct ProgressView {
    bar: ProgressBar,
    counted: bool,
}

impl ProgressView {
    pub fn new(task_id: &TaskId) -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.dim} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_prefix(task_id.to_string());
        bar.set_message("Submitted, waiting for a worker");
        bar.enable_steady_tick(Duration::from_millis(120));
        Self { bar, counted: false }
    }

    pub fn update(&mut self, status: &TaskStatus) {
        match status {
            TaskStatus::Pending { message } => {
                self.bar.set_message(
                    message
                        .clone()
                        .unwrap_or_else(|| "Waiting for a worker".to_string()),
                );
            }
            TaskStatus::Progress(progress) => {
                if let (Some(current), Some(total)) = (progress.current, progress.total) {
                    if !self.counted {
                        self.bar.set_style(
                            ProgressStyle::with_template(
                                "{spinner:.cyan} {prefix:.dim} [{bar:30.cyan/blue}] {pos}/{len} {msg}",
                            )
                            .unwrap_or_else(|_| ProgressStyle::default_bar())
                            .progress_chars("=> "),
                        );
                        self.counted = true;
                    }
                    self.bar.set_length(total);
                    self.bar.set_position(current.min(total));
                }
                if let Some(message) = &progress.status {
                    self.bar.set_message(message.clone());
                }
            }
            _ => {}
        }
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}
