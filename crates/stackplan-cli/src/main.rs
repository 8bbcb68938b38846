//! # stackplan — compose deployment planner CLI
//!
//! Parses a compose document, resolves profiles and dependencies, and
//! prints the resulting deployment plan without touching a container
//! engine.

mod commands;
mod envfile;
mod output;

use clap::Parser;

use crate::commands::Cli;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
        )
        .init();

    let cli = Cli::parse();
    commands::execute(cli)
}
