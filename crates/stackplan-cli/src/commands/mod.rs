//! CLI command definitions and dispatch.

pub mod check;
pub mod plan;

use clap::{Parser, Subcommand};

/// Stackplan — compose deployment planner.
#[derive(Parser, Debug)]
#[command(name = stackplan_common::constants::BIN_NAME, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Resolve profiles and dependencies and print the deployment plan.
    Plan(plan::PlanArgs),
    /// Validate a compose file without producing a plan.
    Check(check::CheckArgs),
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn execute(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Plan(args) => plan::execute(args),
        Command::Check(args) => check::execute(args),
    }
}
