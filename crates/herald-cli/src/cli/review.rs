//! `herald approve` and `herald reject` for runs paused at review.

use std::process::ExitCode;

use anyhow::Result;
use herald_observe::attrs;
use herald_types::workflow::ReviewEdits;
use tracing::{field, info_span, Instrument};

use super::Output;
use crate::state::AppState;

pub async fn approve(
    state: &AppState,
    thread_id: &str,
    subject: Option<String>,
    body: Option<String>,
    chat_message: Option<String>,
    out: Output,
) -> Result<ExitCode> {
    let edits = ReviewEdits {
        subject,
        body,
        chat_message,
    };
    let span = info_span!(
        "herald.approve",
        herald.thread_id = %thread_id,
        herald.status = field::Empty,
    );

    async move {
        let spinner = out.spinner("Delivering...");
        let approved = state.engine.approve(thread_id, edits).await;
        spinner.finish_and_clear();
        let run = approved?;

        tracing::Span::current().record(attrs::HERALD_STATUS, run.status.as_str());
        out.finish(&run)
    }
    .instrument(span)
    .await
}

pub async fn reject(
    state: &AppState,
    thread_id: &str,
    reason: Option<String>,
    out: Output,
) -> Result<ExitCode> {
    let span = info_span!("herald.reject", herald.thread_id = %thread_id);
    let run = state
        .engine
        .reject(thread_id, reason)
        .instrument(span)
        .await?;
    out.finish(&run)
}
