//! CLI command definitions for the `herald` binary.
//!
//! Uses clap derive macros for argument parsing. `send` starts a run;
//! `approve` and `reject` answer a paused one by thread id.

pub mod config;
pub mod render;
pub mod review;
pub mod send;
pub mod thread;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

pub use render::Output;

/// Draft, review and deliver team announcements by email and Webex.
#[derive(Parser)]
#[command(name = "herald", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for info, -vv for debug, -vvv for trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Export spans through the OpenTelemetry stdout exporter.
    #[arg(long, global = true)]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Draft a message and deliver it after review.
    Send(SendArgs),

    /// Approve a paused run, optionally replacing the draft.
    Approve {
        /// Thread id printed by `send`.
        thread: String,

        /// Replacement email subject.
        #[arg(long)]
        subject: Option<String>,

        /// Replacement email body.
        #[arg(long)]
        body: Option<String>,

        /// Replacement chat message.
        #[arg(long)]
        chat_message: Option<String>,
    },

    /// Reject a paused run. Nothing is delivered.
    Reject {
        thread: String,

        /// Why the draft was rejected.
        #[arg(long)]
        reason: Option<String>,
    },

    /// Show the stored state of a run.
    Show { thread: String },

    /// List runs waiting for review.
    Pending,

    /// Report which settings are present and which are missing.
    CheckConfig,

    /// Write a template config.toml into the data directory.
    Init {
        /// Overwrite an existing config file.
        #[arg(long)]
        force: bool,
    },

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// What to announce, in your own words.
    pub message: String,

    /// Name used to sign the email.
    #[arg(short, long, default_value = "Team Member")]
    pub sender: String,

    /// Comma-separated email recipients (overrides config).
    #[arg(short, long)]
    pub emails: Option<String>,

    /// Webex room id (overrides config).
    #[arg(short, long)]
    pub room: Option<String>,

    /// Comma-separated emails to mention in Webex (overrides config).
    #[arg(short, long)]
    pub mentions: Option<String>,

    /// Deliver without a review step.
    #[arg(short = 'y', long)]
    pub no_review: bool,

    /// Generate the drafts only; nothing is stored or sent.
    #[arg(short, long)]
    pub dry_run: bool,

    /// Use this thread id instead of a generated one.
    #[arg(long)]
    pub thread_id: Option<String>,
}
