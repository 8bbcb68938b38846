//! `stackplan check` — validate a compose file without planning.

use std::path::PathBuf;

use clap::Args;
use stackplan_compose::document::Node;
use stackplan_compose::{subst, validate};

/// Arguments for the `check` command.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Path to the compose file.
    #[arg(default_value = "docker-compose.yml")]
    pub file: PathBuf,
}

/// Executes the `check` command.
///
/// Substitutes from the process environment, runs structural validation,
/// and reports findings. Exits non-zero on fatal errors.
///
/// # Errors
///
/// Returns an error if the file cannot be read or fails validation.
pub fn execute(args: CheckArgs) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(&args.file)?;
    let root = Node::parse(&text).map_err(|e| anyhow::anyhow!("{e}"))?;
    let substituted = subst::substitute(&root, &|name: &str| std::env::var(name).ok());
    let diag = validate::validate(&substituted);

    crate::output::print_diagnostics(&diag);
    if diag.is_valid() {
        println!("{}: OK", args.file.display());
        Ok(())
    } else {
        anyhow::bail!("{} fatal error(s) found", diag.errors.len())
    }
}
