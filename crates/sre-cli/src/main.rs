//! `sre-bot`: answers SRE questions from the incident knowledge base.
#![cfg_attr(
    test,
    allow(
        dead_code,
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::panic,
        clippy::missing_panics_doc,
        clippy::missing_errors_doc,
        reason = "Allow for tests"
    )
)]

use anyhow::Result;
use clap::Parser as _;
use cli::{Cli, Commands};
use std::process::ExitCode;

mod cli;
mod handlers;
mod interactive;
mod render;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    handlers::init_logging(cli.verbose);

    match cli.command {
        Some(Commands::Ask { question }) => handlers::handle_ask(cli.config, &question).await,
        Some(Commands::Config { full }) => {
            handlers::handle_config(cli.config, full)?;
            Ok(ExitCode::SUCCESS)
        }
        Some(Commands::Interactive) | None => {
            handlers::handle_interactive(cli.config).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
