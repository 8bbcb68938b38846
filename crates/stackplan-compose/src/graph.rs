//! Dependency graph resolution: `depends_on` parsing, cycle detection, and
//! topological batching, built on `petgraph`.
//!
//! Edges point from dependency to dependent, so zero in-degree means "no
//! unmet dependency" and Kahn's frontier extraction yields batches that are
//! deployable concurrently. Cycles are surfaced as warnings and the services
//! involved are routed into one final best-effort batch rather than dropped:
//! the resolved service count always equals the input count.

use petgraph::Direction;
use petgraph::graph::{Graph, NodeIndex};
use serde::{Deserialize, Serialize};
use stackplan_common::constants::{
    COMPLETED_TIMEOUT_MS, HEALTHY_TIMEOUT_MS, STARTED_TIMEOUT_MS,
};
use stackplan_common::diag::Diagnostics;

use crate::document::{Node, ServiceSpec};

/// Readiness criterion a dependency target must reach before the dependent
/// service may start.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitCondition {
    /// The target container has started.
    #[default]
    ServiceStarted,
    /// The target container reports healthy.
    ServiceHealthy,
    /// The target container exited with status zero.
    ServiceCompletedSuccessfully,
}

impl WaitCondition {
    /// Parses a compose `condition` value.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "service_started" => Some(Self::ServiceStarted),
            "service_healthy" => Some(Self::ServiceHealthy),
            "service_completed_successfully" => Some(Self::ServiceCompletedSuccessfully),
            _ => None,
        }
    }

    /// The compose-schema spelling of this condition.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ServiceStarted => "service_started",
            Self::ServiceHealthy => "service_healthy",
            Self::ServiceCompletedSuccessfully => "service_completed_successfully",
        }
    }

    /// Wait timeout the external orchestrator should enforce, in
    /// milliseconds. Fixed per condition, not user-overridable.
    #[must_use]
    pub const fn timeout_ms(self) -> u64 {
        match self {
            Self::ServiceStarted => STARTED_TIMEOUT_MS,
            Self::ServiceHealthy => HEALTHY_TIMEOUT_MS,
            Self::ServiceCompletedSuccessfully => COMPLETED_TIMEOUT_MS,
        }
    }
}

/// One declared dependency edge, with its wait metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencySpec {
    /// Name of the service depended upon.
    pub target: String,
    /// Readiness criterion for the target.
    pub condition: WaitCondition,
    /// Whether the dependent should be restarted when the target fails.
    pub restart: bool,
    /// Wait timeout for the external orchestrator, in milliseconds.
    pub timeout_ms: u64,
}

impl DependencySpec {
    fn new(target: String, condition: WaitCondition, restart: bool) -> Self {
        Self {
            target,
            condition,
            restart,
            timeout_ms: condition.timeout_ms(),
        }
    }
}

/// Ordering output for a set of deployable services.
#[derive(Debug, Clone, Default)]
pub struct GraphResolution {
    /// Topologically ordered batches; services within a batch have no
    /// unresolved dependency on one another and may start concurrently.
    pub batches: Vec<Vec<String>>,
    /// Detected dependency cycles, each as the ordered loop of names with
    /// the starting service repeated at the end.
    pub cycles: Vec<Vec<String>>,
    /// Parsed dependency specs per service, in document order.
    pub dependencies: Vec<(String, Vec<DependencySpec>)>,
    /// Cycle warnings and condition errors.
    pub diag: Diagnostics,
}

/// Parses a service's `depends_on` fragment into dependency specs.
///
/// Array form implies `service_started` with no restart for every listed
/// name. Map form reads `condition` (default `service_started`) and
/// `restart` (default `false`) per entry; an unknown condition is a fatal
/// error attributed to the declaring service.
#[must_use]
pub fn parse_dependencies(
    service: &str,
    spec: &ServiceSpec,
    diag: &mut Diagnostics,
) -> Vec<DependencySpec> {
    match &spec.depends_on {
        Some(Node::Sequence(items)) => items
            .iter()
            .filter_map(Node::scalar_string)
            .map(|target| DependencySpec::new(target, WaitCondition::default(), false))
            .collect(),
        Some(Node::Mapping(entries)) => entries
            .iter()
            .map(|(target, body)| {
                let condition = match body.get("condition").and_then(Node::as_str) {
                    None => WaitCondition::default(),
                    Some(raw) => WaitCondition::parse(raw).unwrap_or_else(|| {
                        diag.error(format!(
                            "service \"{service}\" declares unknown dependency condition \"{raw}\" for \"{target}\""
                        ));
                        WaitCondition::default()
                    }),
                };
                let restart = body.get("restart").and_then(Node::as_bool).unwrap_or(false);
                DependencySpec::new(target.clone(), condition, restart)
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Resolves dependency ordering for the deployable services.
///
/// Produces topological batches (Kahn's algorithm), detected cycles, and the
/// parsed per-service dependency metadata. Dependencies on services absent
/// from the deployable set (filtered out by profiles) are dropped with a
/// warning. A `service_healthy` dependency on a target without an effective
/// healthcheck draws a warning since the wait can never be satisfied.
#[must_use]
pub fn resolve(services: &[(String, ServiceSpec)]) -> GraphResolution {
    let mut resolution = GraphResolution::default();
    let mut graph: Graph<String, ()> = Graph::new();
    let mut indices: Vec<(String, NodeIndex)> = Vec::with_capacity(services.len());

    for (name, _) in services {
        let idx = graph.add_node(name.clone());
        indices.push((name.clone(), idx));
    }
    let index_of = |name: &str| -> Option<NodeIndex> {
        indices.iter().find(|(n, _)| n == name).map(|(_, i)| *i)
    };

    for (name, spec) in services {
        let deps = parse_dependencies(name, spec, &mut resolution.diag);
        let mut kept = Vec::with_capacity(deps.len());
        for dep in deps {
            let Some(target_idx) = index_of(&dep.target) else {
                resolution.diag.warning(format!(
                    "service \"{name}\" depends on \"{}\", which is not part of this deployment",
                    dep.target
                ));
                continue;
            };
            if dep.condition == WaitCondition::ServiceHealthy {
                let target_healthy = services
                    .iter()
                    .find(|(n, _)| *n == dep.target)
                    .is_some_and(|(_, s)| s.has_effective_healthcheck());
                if !target_healthy {
                    resolution.diag.warning(format!(
                        "service \"{name}\" waits for \"{}\" to become healthy, but \"{}\" has no healthcheck; the wait can never be satisfied",
                        dep.target, dep.target
                    ));
                }
            }
            if let Some(source_idx) = index_of(name) {
                let _ = graph.add_edge(target_idx, source_idx, ());
            }
            kept.push(dep);
        }
        resolution.dependencies.push((name.clone(), kept));
    }

    resolution.cycles = find_cycles(&graph, &indices);
    for cycle in &resolution.cycles {
        resolution.diag.warning(format!(
            "circular dependency detected: {}",
            cycle.join(" -> ")
        ));
    }

    resolution.batches = batch_topologically(&graph, &indices, &mut resolution.diag);
    resolution
}

/// Depth-first cycle search over the dependency edges.
///
/// Walks from each service toward its dependencies tracking the recursion
/// stack; a back-edge into the stack yields the loop as an ordered name
/// list with the entry point repeated at the end.
fn find_cycles(graph: &Graph<String, ()>, indices: &[(String, NodeIndex)]) -> Vec<Vec<String>> {
    let mut cycles = Vec::new();
    let mut visited = vec![false; graph.node_count()];
    let mut on_stack = vec![false; graph.node_count()];
    let mut stack: Vec<NodeIndex> = Vec::new();

    for &(_, start) in indices {
        if !visited[start.index()] {
            dfs(graph, start, &mut visited, &mut on_stack, &mut stack, &mut cycles);
        }
    }
    cycles
}

fn dfs(
    graph: &Graph<String, ()>,
    node: NodeIndex,
    visited: &mut [bool],
    on_stack: &mut [bool],
    stack: &mut Vec<NodeIndex>,
    cycles: &mut Vec<Vec<String>>,
) {
    visited[node.index()] = true;
    on_stack[node.index()] = true;
    stack.push(node);

    // Incoming edges lead to this node's dependencies.
    for dep in graph.neighbors_directed(node, Direction::Incoming) {
        if !visited[dep.index()] {
            dfs(graph, dep, visited, on_stack, stack, cycles);
        } else if on_stack[dep.index()] {
            let loop_start = stack
                .iter()
                .position(|&n| n == dep)
                .unwrap_or_default();
            let mut cycle: Vec<String> = stack[loop_start..]
                .iter()
                .filter_map(|&n| graph.node_weight(n).cloned())
                .collect();
            if let Some(first) = cycle.first().cloned() {
                cycle.push(first);
            }
            cycles.push(cycle);
        }
    }

    let _ = stack.pop();
    on_stack[node.index()] = false;
}

/// Kahn's algorithm over the dependency edges, extracting the zero
/// in-degree frontier as one batch per round. Services that never reach
/// zero in-degree (unresolved cycles) are appended as one final batch.
fn batch_topologically(
    graph: &Graph<String, ()>,
    indices: &[(String, NodeIndex)],
    diag: &mut Diagnostics,
) -> Vec<Vec<String>> {
    let mut in_degree: Vec<usize> = (0..graph.node_count())
        .map(|i| {
            graph
                .neighbors_directed(NodeIndex::new(i), Direction::Incoming)
                .count()
        })
        .collect();
    let mut placed = vec![false; graph.node_count()];
    let mut batches = Vec::new();
    let mut remaining = graph.node_count();

    while remaining > 0 {
        let frontier: Vec<NodeIndex> = indices
            .iter()
            .map(|&(_, idx)| idx)
            .filter(|idx| !placed[idx.index()] && in_degree[idx.index()] == 0)
            .collect();
        if frontier.is_empty() {
            break;
        }
        for &idx in &frontier {
            placed[idx.index()] = true;
            remaining -= 1;
            for dependent in graph.neighbors_directed(idx, Direction::Outgoing) {
                in_degree[dependent.index()] = in_degree[dependent.index()].saturating_sub(1);
            }
        }
        batches.push(
            frontier
                .iter()
                .filter_map(|&idx| graph.node_weight(idx).cloned())
                .collect(),
        );
    }

    if remaining > 0 {
        let leftover: Vec<String> = indices
            .iter()
            .filter(|(_, idx)| !placed[idx.index()])
            .map(|(name, _)| name.clone())
            .collect();
        diag.warning(format!(
            "services [{}] form unresolved dependency cycles; deploying them together in a final batch",
            leftover.join(", ")
        ));
        batches.push(leftover);
    }

    batches
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::ComposeDocument;

    fn services(text: &str) -> Vec<(String, ServiceSpec)> {
        let root = Node::parse(text).expect("should parse");
        ComposeDocument::decode(&root).services
    }

    #[test]
    fn condition_timeouts_follow_policy() {
        assert_eq!(WaitCondition::ServiceStarted.timeout_ms(), 30_000);
        assert_eq!(WaitCondition::ServiceHealthy.timeout_ms(), 60_000);
        assert_eq!(WaitCondition::ServiceCompletedSuccessfully.timeout_ms(), 120_000);
    }

    #[test]
    fn array_form_defaults_to_started() {
        let svcs = services(
            "services:\n  web:\n    image: x\n    depends_on: [db, cache]\n  db:\n    image: x\n  cache:\n    image: x\n",
        );
        let mut diag = Diagnostics::new();
        let spec = &svcs.iter().find(|(n, _)| n == "web").expect("web").1;
        let deps = parse_dependencies("web", spec, &mut diag);
        assert_eq!(deps.len(), 2);
        assert!(deps.iter().all(|d| d.condition == WaitCondition::ServiceStarted));
        assert!(deps.iter().all(|d| !d.restart));
        assert!(deps.iter().all(|d| d.timeout_ms == 30_000));
    }

    #[test]
    fn map_form_reads_condition_and_restart() {
        let svcs = services(
            "services:\n  web:\n    image: x\n    depends_on:\n      db:\n        condition: service_healthy\n        restart: true\n      init:\n        condition: service_completed_successfully\n      cache: {}\n  db:\n    image: x\n  init:\n    image: x\n  cache:\n    image: x\n",
        );
        let mut diag = Diagnostics::new();
        let spec = &svcs.iter().find(|(n, _)| n == "web").expect("web").1;
        let deps = parse_dependencies("web", spec, &mut diag);
        assert!(diag.is_valid());
        assert_eq!(deps[0].condition, WaitCondition::ServiceHealthy);
        assert!(deps[0].restart);
        assert_eq!(deps[0].timeout_ms, 60_000);
        assert_eq!(deps[1].condition, WaitCondition::ServiceCompletedSuccessfully);
        assert_eq!(deps[2].condition, WaitCondition::ServiceStarted);
    }

    #[test]
    fn unknown_condition_is_fatal_and_attributed() {
        let svcs = services(
            "services:\n  web:\n    image: x\n    depends_on:\n      db:\n        condition: service_woke_up\n  db:\n    image: x\n",
        );
        let resolution = resolve(&svcs);
        assert!(!resolution.diag.is_valid());
        assert!(resolution.diag.errors[0].contains("web"));
        assert!(resolution.diag.errors[0].contains("service_woke_up"));
    }

    #[test]
    fn healthy_wait_without_healthcheck_warns() {
        let svcs = services(
            "services:\n  web:\n    image: x\n    depends_on:\n      db:\n        condition: service_healthy\n  db:\n    image: x\n",
        );
        let resolution = resolve(&svcs);
        assert!(resolution.diag.is_valid());
        assert!(
            resolution
                .diag
                .warnings
                .iter()
                .any(|w| w.contains("never be satisfied")),
            "{:?}",
            resolution.diag.warnings
        );
    }

    #[test]
    fn healthy_wait_with_healthcheck_is_clean() {
        let svcs = services(
            "services:\n  web:\n    image: x\n    depends_on:\n      db:\n        condition: service_healthy\n  db:\n    image: x\n    healthcheck:\n      test: ['CMD', 'true']\n",
        );
        let resolution = resolve(&svcs);
        assert!(resolution.diag.is_valid());
        assert!(resolution.diag.warnings.is_empty(), "{:?}", resolution.diag.warnings);
    }

    #[test]
    fn fan_out_batches() {
        let svcs = services(
            "services:\n  a:\n    image: x\n  b:\n    image: x\n    depends_on: [a]\n  c:\n    image: x\n    depends_on: [a]\n",
        );
        let resolution = resolve(&svcs);
        assert_eq!(resolution.batches.len(), 2);
        assert_eq!(resolution.batches[0], vec!["a"]);
        let mut second = resolution.batches[1].clone();
        second.sort();
        assert_eq!(second, vec!["b", "c"]);
    }

    #[test]
    fn three_node_cycle_detected_and_batched() {
        let svcs = services(
            "services:\n  a:\n    image: x\n    depends_on: [b]\n  b:\n    image: x\n    depends_on: [c]\n  c:\n    image: x\n    depends_on: [a]\n",
        );
        let resolution = resolve(&svcs);
        assert_eq!(resolution.cycles.len(), 1);
        let cycle = &resolution.cycles[0];
        assert_eq!(cycle.len(), 4);
        assert_eq!(cycle.first(), cycle.last());
        for name in ["a", "b", "c"] {
            assert!(cycle.contains(&name.to_owned()), "{cycle:?}");
        }
        // Best-effort: everything still lands in a batch.
        let total: usize = resolution.batches.iter().map(Vec::len).sum();
        assert_eq!(total, 3);
        assert!(
            resolution
                .diag
                .warnings
                .iter()
                .any(|w| w.contains("final batch"))
        );
    }

    #[test]
    fn cycle_plus_independent_service_still_orders_the_rest() {
        let svcs = services(
            "services:\n  a:\n    image: x\n    depends_on: [b]\n  b:\n    image: x\n    depends_on: [a]\n  solo:\n    image: x\n",
        );
        let resolution = resolve(&svcs);
        assert_eq!(resolution.batches[0], vec!["solo"]);
        let total: usize = resolution.batches.iter().map(Vec::len).sum();
        assert_eq!(total, 3);
    }

    #[test]
    fn dependency_on_filtered_service_is_dropped_with_warning() {
        let svcs = services(
            "services:\n  web:\n    image: x\n    depends_on: [db]\n",
        );
        let resolution = resolve(&svcs);
        assert!(resolution.diag.is_valid());
        assert!(
            resolution
                .diag
                .warnings
                .iter()
                .any(|w| w.contains("not part of this deployment"))
        );
        assert_eq!(resolution.batches, vec![vec!["web"]]);
    }

    #[test]
    fn no_service_appears_twice_across_batches() {
        let svcs = services(
            "services:\n  a:\n    image: x\n  b:\n    image: x\n    depends_on: [a]\n  c:\n    image: x\n    depends_on: [a, b]\n  d:\n    image: x\n    depends_on: [c]\n",
        );
        let resolution = resolve(&svcs);
        let mut seen = std::collections::HashSet::new();
        for batch in &resolution.batches {
            for name in batch {
                assert!(seen.insert(name.clone()), "duplicate {name}");
            }
        }
        assert_eq!(seen.len(), 4);
    }
}
