//! `herald show` and `herald pending`: read-only views of stored runs.

use std::process::ExitCode;

use anyhow::Result;
use console::style;

use super::Output;
use super::render::pending_table;
use crate::state::AppState;

pub async fn show(state: &AppState, thread_id: &str, out: Output) -> Result<ExitCode> {
    let run = state.engine.resume(thread_id).await?;
    out.finish(&run)
}

pub async fn pending(state: &AppState, out: Output) -> Result<ExitCode> {
    let runs = state.engine.pending().await?;

    if out.json {
        println!("{}", serde_json::to_string_pretty(&runs)?);
    } else if !out.quiet {
        if runs.is_empty() {
            println!("No runs awaiting review.");
        } else {
            println!("{}", pending_table(&runs));
            println!(
                "\n  {} awaiting review. Use {} to inspect one.",
                style(runs.len()).bold(),
                style("herald show <thread>").cyan()
            );
        }
    }
    Ok(ExitCode::SUCCESS)
}
