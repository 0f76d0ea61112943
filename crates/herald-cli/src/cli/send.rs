//! `herald send`: start a run and, on a terminal, review it in place.

use std::io::IsTerminal;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use console::{style, Term};
use dialoguer::{Confirm, Editor, Input, Select};
use herald_core::channel::TextGenerator;
use herald_core::workflow::StartRequest;
use herald_observe::attrs;
use herald_types::channel::GenerationRequest;
use herald_types::config::split_list;
use herald_types::workflow::{DeliveryTargets, ReviewEdits, WorkflowState, WorkflowStatus};
use tracing::{field, info_span, Instrument};

use super::{Output, SendArgs};
use crate::cli::render::print_drafts;
use crate::state::AppState;

pub async fn send(state: &AppState, args: SendArgs, out: Output) -> Result<ExitCode> {
    let targets = state.config.targets(
        args.emails.as_deref().map(split_list),
        args.room.clone(),
        args.mentions.as_deref().map(split_list),
    );

    if args.dry_run {
        return dry_run(state, args, targets, out).await;
    }

    let mut request = StartRequest::new(args.message, args.sender)
        .targets(targets)
        .skip_review(args.no_review);
    if let Some(thread_id) = args.thread_id {
        request = request.thread_id(thread_id);
    }

    let span = info_span!(
        "herald.send",
        herald.thread_id = %request.thread_id,
        herald.status = field::Empty,
    );

    async move {
        let spinner = out.spinner(if request.skip_review {
            "Drafting and delivering..."
        } else {
            "Drafting..."
        });
        let started = state.engine.start(request).await;
        spinner.finish_and_clear();
        let mut run = started?;

        if run.status == WorkflowStatus::AwaitingReview && out.styled() && interactive() {
            run = review_interactively(state, run, out).await?;
        }

        tracing::Span::current().record(attrs::HERALD_STATUS, run.status.as_str());
        out.finish(&run)
    }
    .instrument(span)
    .await
}

/// Prompts need a terminal on both ends: stdin for keys, stderr for drawing.
fn interactive() -> bool {
    std::io::stdin().is_terminal() && Term::stderr().is_term()
}

async fn review_interactively(
    state: &AppState,
    run: WorkflowState,
    out: Output,
) -> Result<WorkflowState> {
    print_drafts(&run);

    let items = ["Approve and send", "Edit before sending", "Reject"];
    let choice = Select::new()
        .with_prompt("Review")
        .items(&items[..])
        .default(0)
        .interact()?;

    match choice {
        0 => deliver(state, &run.thread_id, ReviewEdits::default(), out).await,
        1 => {
            let edits = edit_drafts(&run)?;
            let mut preview = run.clone();
            preview.apply_edits(edits.clone());
            println!("\n  {}", style("Updated drafts").bold());
            print_drafts(&preview);

            if Confirm::new()
                .with_prompt("Send the edited drafts?")
                .default(true)
                .interact()?
            {
                deliver(state, &run.thread_id, edits, out).await
            } else {
                println!(
                    "  {} Left for review. Resume with `herald approve {}`.",
                    style("*").yellow().bold(),
                    run.thread_id
                );
                Ok(run)
            }
        }
        _ => {
            let reason: String = Input::new()
                .with_prompt("Reason for rejection (optional)")
                .allow_empty(true)
                .interact_text()?;
            let reason = Some(reason).filter(|r| !r.trim().is_empty());
            Ok(state.engine.reject(&run.thread_id, reason).await?)
        }
    }
}

async fn deliver(
    state: &AppState,
    thread_id: &str,
    edits: ReviewEdits,
    out: Output,
) -> Result<WorkflowState> {
    let spinner = out.spinner("Delivering...");
    let approved = state.engine.approve(thread_id, edits).await;
    spinner.finish_and_clear();
    Ok(approved?)
}

/// Collect edits for every channel the run targets. Unchanged fields stay
/// `None`, so an edit pass that changes nothing approves as-is.
fn edit_drafts(run: &WorkflowState) -> Result<ReviewEdits> {
    let mut edits = ReviewEdits::default();

    if run.targets.has_email() {
        let subject = run.generated_subject.clone().unwrap_or_default();
        let edited: String = Input::new()
            .with_prompt("Subject")
            .with_initial_text(subject.clone())
            .interact_text()?;
        edits.subject = changed(&subject, edited);

        let body = run.generated_body.clone().unwrap_or_default();
        if Confirm::new()
            .with_prompt("Edit the email body?")
            .default(false)
            .interact()?
        {
            edits.body = edit_in_editor(&body)?;
        }
    }

    if run.targets.has_chat() {
        let message = run.generated_chat_message.clone().unwrap_or_default();
        if Confirm::new()
            .with_prompt("Edit the Webex message?")
            .default(false)
            .interact()?
        {
            edits.chat_message = edit_in_editor(&message)?;
        }
    }

    Ok(edits)
}

fn edit_in_editor(current: &str) -> Result<Option<String>> {
    let edited = Editor::new()
        .edit(current)
        .context("failed to open editor")?;
    Ok(edited.and_then(|text| changed(current, text.trim_end().to_string())))
}

fn changed(current: &str, edited: String) -> Option<String> {
    (edited.trim() != current.trim()).then_some(edited)
}

/// Generate the drafts without creating a run.
async fn dry_run(
    state: &AppState,
    args: SendArgs,
    targets: DeliveryTargets,
    out: Output,
) -> Result<ExitCode> {
    if args.message.trim().is_empty() {
        bail!("message must not be empty");
    }

    let request = GenerationRequest {
        message: args.message.clone(),
        sender_name: args.sender.clone(),
        mentions: targets.chat_mentions.clone(),
    };

    let spinner = out.spinner("Drafting...");
    let generated = match state.engine.options().call_timeout {
        Some(after) => tokio::time::timeout(after, state.engine.generator().generate(&request))
            .await
            .with_context(|| format!("generation timed out after {after:?}"))?,
        None => state.engine.generator().generate(&request).await,
    };
    spinner.finish_and_clear();
    let content = generated.context("generation failed")?;

    if out.json {
        let json = serde_json::json!({
            "dry_run": true,
            "targets": targets,
            "subject": content.subject,
            "body": content.body,
            "chat_message": content.chat_message,
        });
        println!("{}", serde_json::to_string_pretty(&json)?);
    } else if !out.quiet {
        let mut preview = WorkflowState::new(
            args.thread_id.unwrap_or_default(),
            args.message,
            args.sender,
            targets,
        );
        preview.apply_generated(content);
        println!(
            "\n  {} nothing will be stored or sent",
            style("Dry run:").yellow().bold()
        );
        print_drafts(&preview);
    }

    Ok(ExitCode::SUCCESS)
}
