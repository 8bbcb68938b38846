//! Formatted output helpers for CLI commands.

use stackplan_common::diag::Diagnostics;
use stackplan_compose::plan::DeploymentPlan;

/// Prints a plan as pretty JSON.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn print_json(plan: &DeploymentPlan) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(plan)?);
    Ok(())
}

/// Prints a human-readable rendering of a deployment plan.
pub fn print_plan(plan: &DeploymentPlan) {
    println!("Deployment plan");
    println!("===============");
    println!();

    for (index, batch) in plan.batches.iter().enumerate() {
        println!("  Batch {}:", index + 1);
        for name in batch {
            if let Some(service) = plan.services.get(name) {
                let image = service.image.as_deref().unwrap_or("(build)");
                println!("    + {name}  [{image}]");
                for dep in &service.dependencies {
                    println!(
                        "        waits for {} ({}, {}ms)",
                        dep.target,
                        dep.condition.as_str(),
                        dep.timeout_ms
                    );
                }
            } else {
                println!("    + {name}");
            }
        }
    }

    if !plan.skipped.is_empty() {
        println!();
        println!("  Skipped:");
        for skip in &plan.skipped {
            println!("    - {}: {}", skip.name, skip.reason);
        }
    }
    if !plan.volumes_to_create.is_empty() {
        println!();
        println!("  Volumes to create: {}", plan.volumes_to_create.join(", "));
    }
    if !plan.networks_to_create.is_empty() {
        println!("  Networks to create: {}", plan.networks_to_create.join(", "));
    }

    println!();
    println!(
        "  {} of {} service(s) deployable across {} batch(es); profiles: [{}]",
        plan.summary.deployable_services,
        plan.summary.total_services,
        plan.batches.len(),
        plan.summary.resolved_profiles.join(", ")
    );

    for warning in &plan.warnings {
        println!("  warning: {warning}");
    }
    for error in &plan.errors {
        println!("  error: {error}");
    }
}

/// Prints validator findings.
pub fn print_diagnostics(diag: &Diagnostics) {
    for warning in &diag.warnings {
        println!("warning: {warning}");
    }
    for error in &diag.errors {
        println!("error: {error}");
    }
}
