//! Shared output helpers: styled run summaries, tables, JSON and spinners.

use std::process::ExitCode;
use std::time::Duration;

use comfy_table::{presets, Cell, Color, ContentArrangement, Table};
use console::style;
use herald_types::workflow::{Channel, DeliveryOutcome, WorkflowState, WorkflowStatus};
use indicatif::{ProgressBar, ProgressStyle};

/// Output mode selected by the global `--json` / `--quiet` flags.
#[derive(Debug, Clone, Copy)]
pub struct Output {
    pub json: bool,
    pub quiet: bool,
}

impl Output {
    pub fn new(json: bool, quiet: bool) -> Self {
        Self { json, quiet }
    }

    /// Styled text goes to stdout only when neither flag is set.
    pub fn styled(self) -> bool {
        !self.json && !self.quiet
    }

    /// Start a spinner, or a hidden one when output is not styled.
    pub fn spinner(self, message: &str) -> ProgressBar {
        if !self.styled() {
            return ProgressBar::hidden();
        }
        let spinner = ProgressBar::new_spinner();
        if let Ok(spinner_style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}")
        {
            spinner.set_style(spinner_style);
        }
        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(Duration::from_millis(80));
        spinner
    }

    /// Print a run in the selected mode and map its status to an exit code.
    pub fn finish(self, state: &WorkflowState) -> anyhow::Result<ExitCode> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(state)?);
        } else if !self.quiet {
            print_state(state);
        }
        Ok(exit_code(state))
    }
}

/// `failed` runs exit with 1; everything else, including a paused run, is 0.
pub fn exit_code(state: &WorkflowState) -> ExitCode {
    if state.status == WorkflowStatus::Failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

pub fn format_status(status: WorkflowStatus) -> Cell {
    let color = match status {
        WorkflowStatus::Pending | WorkflowStatus::Generating => Color::Blue,
        WorkflowStatus::AwaitingReview => Color::Yellow,
        WorkflowStatus::Delivering => Color::Magenta,
        WorkflowStatus::Completed => Color::Green,
        WorkflowStatus::Failed => Color::Red,
        WorkflowStatus::Cancelled => Color::DarkYellow,
    };
    Cell::new(status.as_str()).fg(color)
}

fn format_outcome(outcome: &DeliveryOutcome) -> Cell {
    match outcome {
        DeliveryOutcome::NotAttempted => Cell::new("not attempted").fg(Color::DarkGrey),
        DeliveryOutcome::Sent => Cell::new("sent").fg(Color::Green),
        DeliveryOutcome::Failed { error } => Cell::new(format!("failed: {error}")).fg(Color::Red),
    }
}

/// One row per channel with its target and outcome.
pub fn results_table(state: &WorkflowState) -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Channel").fg(Color::Cyan),
            Cell::new("Target").fg(Color::Cyan),
            Cell::new("Result").fg(Color::Cyan),
        ]);

    let email_target = if state.targets.has_email() {
        state.targets.email_recipients.join(", ")
    } else {
        "-".to_string()
    };
    let chat_target = state.targets.chat_room.clone().unwrap_or_else(|| "-".to_string());

    table.add_row(vec![
        Cell::new("Email"),
        Cell::new(email_target),
        format_outcome(state.outcome(Channel::Email)),
    ]);
    table.add_row(vec![
        Cell::new("Webex"),
        Cell::new(chat_target),
        format_outcome(state.outcome(Channel::Chat)),
    ]);
    table
}

/// Table of paused runs, oldest first.
pub fn pending_table(states: &[WorkflowState]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Thread").fg(Color::Cyan),
            Cell::new("Sender").fg(Color::Cyan),
            Cell::new("Subject").fg(Color::Cyan),
            Cell::new("Created").fg(Color::Cyan),
        ]);

    for state in states {
        table.add_row(vec![
            Cell::new(&state.thread_id),
            Cell::new(&state.sender_name),
            Cell::new(state.generated_subject.as_deref().unwrap_or("-")),
            Cell::new(state.created_at.format("%Y-%m-%d %H:%M").to_string()),
        ]);
    }
    table
}

/// Email and chat drafts as they stand on the run.
pub fn print_drafts(state: &WorkflowState) {
    if state.targets.has_email() {
        println!();
        println!("  {}", style("Email").bold().underlined());
        println!(
            "  {} {}",
            style("To:").dim(),
            state.targets.email_recipients.join(", ")
        );
        println!(
            "  {} {}",
            style("Subject:").dim(),
            style(state.generated_subject.as_deref().unwrap_or("")).bold()
        );
        println!();
        for line in state.generated_body.as_deref().unwrap_or("").lines() {
            println!("    {line}");
        }
    }

    if let Some(room) = state.targets.chat_room.as_deref() {
        println!();
        println!("  {}", style("Webex").bold().underlined());
        println!("  {} {}", style("Room:").dim(), room);
        if !state.targets.chat_mentions.is_empty() {
            println!(
                "  {} {}",
                style("Mentions:").dim(),
                state.targets.chat_mentions.join(", ")
            );
        }
        println!();
        for line in state.generated_chat_message.as_deref().unwrap_or("").lines() {
            println!("    {line}");
        }
    }
    println!();
}

fn print_state(state: &WorkflowState) {
    println!();
    println!(
        "  {} {}",
        style("Thread:").bold(),
        style(&state.thread_id).cyan()
    );
    println!("  {} {}", style("Status:").bold(), format_status(state.status).content());

    match state.status {
        WorkflowStatus::AwaitingReview => {
            print_drafts(state);
            println!("  Review with:");
            println!("    herald approve {}", state.thread_id);
            println!("    herald reject {} --reason \"...\"", state.thread_id);
        }
        WorkflowStatus::Completed => {
            println!();
            println!("{}", results_table(state));
            println!();
            println!("  {} Workflow completed", style("*").green().bold());
        }
        WorkflowStatus::Cancelled => {
            println!(
                "  {} Workflow cancelled: {}",
                style("*").yellow().bold(),
                state.rejection_reason.as_deref().unwrap_or("-")
            );
        }
        WorkflowStatus::Failed => {
            println!();
            println!("{}", results_table(state));
            println!();
            println!("  {} Workflow failed", style("x").red().bold());
        }
        WorkflowStatus::Pending | WorkflowStatus::Generating | WorkflowStatus::Delivering => {}
    }

    for error in &state.errors {
        println!("    {} {}", style("-").red(), style(error).red());
    }
    println!();
}
