//! Herald CLI entry point.
//!
//! Binary name: `herald`
//!
//! Parses CLI arguments, loads configuration, wires the workflow engine and
//! dispatches to the command handlers.

mod cli;
mod state;

use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use clap_complete::generate;
use herald_infra::config::{load_config, load_dotenv, resolve_data_dir};
use herald_observe::tracing_setup::{init_tracing, shutdown_tracing, verbosity_filter};

use cli::{Cli, Commands};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(verbosity_filter(cli.verbose, cli.quiet), cli.otel) {
        eprintln!("Warning: failed to initialize tracing: {e}");
    }

    let result = run(cli).await;
    shutdown_tracing();
    result
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    load_dotenv();
    let data_dir = resolve_data_dir();
    let out = cli::Output::new(cli.json, cli.quiet);

    match cli.command {
        Commands::Send(args) => cli::send::send(&open(&data_dir).await?, args, out).await,

        Commands::Approve {
            thread,
            subject,
            body,
            chat_message,
        } => {
            let state = open(&data_dir).await?;
            cli::review::approve(&state, &thread, subject, body, chat_message, out).await
        }

        Commands::Reject { thread, reason } => {
            cli::review::reject(&open(&data_dir).await?, &thread, reason, out).await
        }

        Commands::Show { thread } => cli::thread::show(&open(&data_dir).await?, &thread, out).await,

        Commands::Pending => cli::thread::pending(&open(&data_dir).await?, out).await,

        Commands::CheckConfig => {
            let config = load_config(&data_dir).await?;
            Ok(cli::config::check_config(&config, &data_dir, cli.json))
        }

        Commands::Init { force } => {
            cli::config::init(&data_dir, force, cli.json).await?;
            Ok(ExitCode::SUCCESS)
        }

        // Shell completions don't need config or a database
        Commands::Completions { shell } => {
            let mut cmd = <Cli as clap::CommandFactory>::command();
            generate(shell, &mut cmd, "herald", &mut std::io::stdout());
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Load configuration and open the database.
async fn open(data_dir: &Path) -> anyhow::Result<AppState> {
    let config = load_config(data_dir).await?;
    AppState::init(data_dir, config).await
}
