//! `stackplan plan` — resolve a compose file into a deployment plan.

use std::path::PathBuf;

use clap::Args;
use stackplan_compose::plan::PlanOptions;

use crate::envfile;
use crate::output;

/// Arguments for the `plan` command.
#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Path to the compose file.
    #[arg(default_value = "docker-compose.yml")]
    pub file: PathBuf,

    /// Activation profile (repeatable).
    #[arg(short, long = "profile")]
    pub profiles: Vec<String>,

    /// Stack identifier used to scope named volumes.
    #[arg(long, default_value = "default")]
    pub stack_id: String,

    /// Path to a .env file merged below the process environment.
    #[arg(long)]
    pub env_file: Option<PathBuf>,

    /// Ignore the process environment during substitution and env merging.
    #[arg(long)]
    pub no_process_env: bool,

    /// Emit the plan as JSON instead of human-readable text.
    #[arg(long)]
    pub json: bool,
}

/// Executes the `plan` command.
///
/// Exits non-zero when the plan carries fatal errors, since such a plan
/// must not be executed.
///
/// # Errors
///
/// Returns an error if the compose or env file cannot be read, or if the
/// resulting plan is not executable.
pub fn execute(args: PlanArgs) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(&args.file)?;
    tracing::info!(path = %args.file.display(), "planning compose stack");

    let env_file = match &args.env_file {
        Some(path) => envfile::read(path)?,
        None => std::collections::BTreeMap::new(),
    };
    let process_env = if args.no_process_env {
        std::collections::BTreeMap::new()
    } else {
        std::env::vars().collect()
    };

    let options = PlanOptions {
        stack_id: args.stack_id,
        profiles: args.profiles,
        env_file,
        process_env,
    };
    let plan = stackplan_compose::plan::plan(&text, &options);

    if args.json {
        output::print_json(&plan)?;
    } else {
        output::print_plan(&plan);
    }

    if !plan.is_executable() {
        anyhow::bail!("plan has {} fatal error(s); not deployable", plan.errors.len());
    }
    Ok(())
}
