//! Deployment plan assembly.
//!
//! Orchestrates the full pipeline: parse → substitute → validate →
//! decode → profile filter → dependency ordering → per-service translation.
//! Every stage's errors and warnings are aggregated onto the final plan;
//! the pipeline short-circuits before dependency ordering once a fatal
//! error has been recorded. Malformed input of any kind becomes a
//! structured error entry, never a panic.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use stackplan_common::diag::Diagnostics;

use crate::document::{ComposeDocument, Node, ServiceSpec};
use crate::graph::{self, DependencySpec};
use crate::profiles::{self, ProfileSummary, SkippedService};
use crate::subst;
use crate::translate::healthcheck::{HealthConfig, translate_healthcheck};
use crate::translate::limits::{Ulimit, parse_memory_bytes, translate_ulimits};
use crate::translate::ports::{PortBinding, translate_ports};
use crate::translate::volumes::translate_volumes;
use crate::translate::{
    LogConfig, RestartPolicy, config_hash, environment::merge_environment, extra_hosts,
    log_config, restart_policy,
};

/// Caller-supplied context for one planning run.
#[derive(Debug, Clone)]
pub struct PlanOptions {
    /// Stack identifier used to scope named volumes (`{stack}_{volume}`).
    pub stack_id: String,
    /// Requested activation profiles; empty means `{"default"}`.
    pub profiles: Vec<String>,
    /// Parsed contents of the stack's `.env` file.
    pub env_file: BTreeMap<String, String>,
    /// Process environment, overriding the `.env` file per key.
    pub process_env: BTreeMap<String, String>,
}

impl Default for PlanOptions {
    fn default() -> Self {
        Self {
            stack_id: "default".to_owned(),
            profiles: Vec::new(),
            env_file: BTreeMap::new(),
            process_env: BTreeMap::new(),
        }
    }
}

/// Engine-ready arguments for creating one service's container.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServicePlan {
    /// Image reference, when the service runs a prebuilt image.
    pub image: Option<String>,
    /// Flat `KEY=VALUE` container environment.
    pub environment: Vec<String>,
    /// Host bindings keyed by `"{containerPort}/{protocol}"`.
    pub port_bindings: BTreeMap<String, Vec<PortBinding>>,
    /// Bind and named-volume mount strings.
    pub binds: Vec<String>,
    /// Tmpfs mount strings.
    pub tmpfs: Vec<String>,
    /// Restart policy.
    pub restart_policy: RestartPolicy,
    /// Healthcheck, when declared and not disabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub healthcheck: Option<HealthConfig>,
    /// Resource limits.
    pub ulimits: Vec<Ulimit>,
    /// Log driver configuration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_config: Option<LogConfig>,
    /// Additional `host:ip` entries.
    pub extra_hosts: Vec<String>,
    /// Networks the container joins.
    pub networks: Vec<String>,
    /// Memory limit in bytes, when declared.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_bytes: Option<u64>,
    /// Declared dependencies with wait metadata.
    pub dependencies: Vec<DependencySpec>,
    /// Deterministic hash of the service's source fragment, for drift
    /// detection against previously deployed state.
    pub config_hash: String,
}

/// The fully resolved, ordered, translated deployment plan.
///
/// A plan with a non-empty `errors` list must not be executed. Batches are
/// advisory to the external orchestrator: services within one batch start
/// concurrently; the orchestrator waits on each service's dependency
/// conditions (per-dependency `timeout_ms`) before moving to the next batch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeploymentPlan {
    /// Topologically ordered service batches.
    pub batches: Vec<Vec<String>>,
    /// Per-service engine arguments, keyed by service name.
    pub services: BTreeMap<String, ServicePlan>,
    /// Services excluded by profile filtering.
    pub skipped: Vec<SkippedService>,
    /// Stack-scoped volume names the engine must create.
    pub volumes_to_create: Vec<String>,
    /// Network names the engine must create.
    pub networks_to_create: Vec<String>,
    /// Profile counts and listings for operator-facing output.
    pub summary: ProfileSummary,
    /// Fatal findings; non-empty means do not deploy.
    pub errors: Vec<String>,
    /// Advisory findings; deploy, but surface these to the operator.
    pub warnings: Vec<String>,
}

impl DeploymentPlan {
    /// Returns `true` if the plan may be submitted to an engine.
    #[must_use]
    pub fn is_executable(&self) -> bool {
        self.errors.is_empty()
    }

    fn from_diag(diag: Diagnostics) -> Self {
        Self {
            errors: diag.errors,
            warnings: diag.warnings,
            ..Self::default()
        }
    }
}

/// Assembles a deployment plan from raw compose text.
///
/// Never panics on malformed input: parse failures and every downstream
/// finding are reported through the plan's `errors` and `warnings`.
#[must_use]
pub fn plan(compose_text: &str, options: &PlanOptions) -> DeploymentPlan {
    let mut diag = Diagnostics::new();
    tracing::info!(stack = %options.stack_id, "assembling deployment plan");

    let root = match Node::parse(compose_text) {
        Ok(root) => root,
        Err(err) => {
            diag.error(err.to_string());
            return DeploymentPlan::from_diag(diag);
        }
    };

    let substituted = subst::substitute(&root, &|name: &str| {
        options
            .process_env
            .get(name)
            .or_else(|| options.env_file.get(name))
            .cloned()
    });

    diag.merge(crate::validate::validate(&substituted));
    if !diag.is_valid() {
        return DeploymentPlan::from_diag(diag);
    }

    let document = ComposeDocument::decode(&substituted);

    let resolution = profiles::resolve_profiles(&document, &options.profiles);
    diag.merge(resolution.diag.clone());
    let filtered = profiles::filter_document(&document, &resolution.profiles);

    let mut out = DeploymentPlan {
        skipped: filtered.skipped.clone(),
        summary: filtered.summary.clone(),
        ..DeploymentPlan::default()
    };

    if !diag.is_valid() {
        out.errors = diag.errors;
        out.warnings = diag.warnings;
        return out;
    }

    let ordering = graph::resolve(&filtered.document.services);
    diag.merge(ordering.diag.clone());
    out.batches = ordering.batches.clone();

    for (name, spec) in &filtered.document.services {
        let deps = ordering
            .dependencies
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, d)| d.clone())
            .unwrap_or_default();
        let service_plan = translate_service(name, spec, deps, options, &mut out, &mut diag);
        let _ = out.services.insert(name.clone(), service_plan);
    }

    out.volumes_to_create.sort();
    out.volumes_to_create.dedup();
    out.networks_to_create = filtered
        .document
        .networks
        .iter()
        .filter(|(_, spec)| !spec.external)
        .map(|(name, _)| name.clone())
        .collect();

    out.errors = diag.errors;
    out.warnings = diag.warnings;
    tracing::info!(
        batches = out.batches.len(),
        services = out.services.len(),
        errors = out.errors.len(),
        warnings = out.warnings.len(),
        "deployment plan assembled"
    );
    out
}

fn translate_service(
    name: &str,
    spec: &ServiceSpec,
    dependencies: Vec<DependencySpec>,
    options: &PlanOptions,
    out: &mut DeploymentPlan,
    diag: &mut Diagnostics,
) -> ServicePlan {
    let mounts = translate_volumes(name, &spec.volumes, &options.stack_id);
    diag.merge(mounts.diag);
    out.volumes_to_create.extend(mounts.volumes_to_create);

    ServicePlan {
        image: spec.image.clone(),
        environment: merge_environment(
            &options.env_file,
            &options.process_env,
            spec.environment.as_ref(),
        ),
        port_bindings: translate_ports(&spec.ports),
        binds: mounts.binds,
        tmpfs: mounts.tmpfs,
        restart_policy: restart_policy(spec.restart.as_deref()),
        healthcheck: translate_healthcheck(spec.healthcheck.as_ref()),
        ulimits: translate_ulimits(spec.ulimits.as_ref()),
        log_config: log_config(spec.logging.as_ref()),
        extra_hosts: extra_hosts(spec.extra_hosts.as_ref()),
        networks: spec.networks.clone(),
        memory_bytes: spec.mem_limit.as_deref().and_then(parse_memory_bytes),
        dependencies,
        config_hash: config_hash(&spec.raw),
    }
}
