//! Activation-profile resolution and document filtering.
//!
//! Resolving expands the requested profile set with declared profile
//! dependencies until fixpoint and rejects declared conflicts. Filtering
//! then derives a *new* compose document containing only the services,
//! volumes, and networks active under the resolved set — the source
//! document is never mutated, so one parse supports re-planning with
//! different profile sets.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use stackplan_common::constants::{DEFAULT_NETWORK, DEFAULT_NETWORK_DRIVER, DEFAULT_PROFILE};
use stackplan_common::diag::Diagnostics;

use crate::document::{ComposeDocument, NetworkSpec};
use crate::translate::volumes::named_volume_source;

/// Outcome of expanding a requested profile set against the document's
/// profile declarations.
#[derive(Debug, Clone)]
pub struct ProfileResolution {
    /// The final resolved profile set, in order of activation.
    pub profiles: Vec<String>,
    /// Diagnostics from resolution (auto-added dependencies, conflicts).
    pub diag: Diagnostics,
}

/// A service excluded from the deployment, with the reason why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedService {
    /// Service name.
    pub name: String,
    /// Human-readable explanation of the skip.
    pub reason: String,
}

/// Operator-facing counts and profile listings for one filtering pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileSummary {
    /// Services in the source document.
    pub total_services: usize,
    /// Services active under the resolved profile set.
    pub deployable_services: usize,
    /// Services excluded by profile filtering.
    pub skipped_services: usize,
    /// The resolved profile set.
    pub resolved_profiles: Vec<String>,
    /// Every profile mentioned anywhere in the document.
    pub declared_profiles: Vec<String>,
}

/// A profile-filtered view of a compose document.
#[derive(Debug, Clone)]
pub struct FilteredDocument {
    /// The filtered document (services, networks, volumes active under the
    /// resolved profiles).
    pub document: ComposeDocument,
    /// Services excluded by filtering, with reasons.
    pub skipped: Vec<SkippedService>,
    /// Counts and profile listings.
    pub summary: ProfileSummary,
}

/// Expands `requested` with declared profile dependencies and checks
/// declared conflicts.
///
/// An empty request defaults to `{"default"}`. Every auto-added dependency
/// profile draws a warning; an intersection between any resolved profile's
/// `conflicts` list and the resolved set is a fatal error.
#[must_use]
pub fn resolve_profiles(doc: &ComposeDocument, requested: &[String]) -> ProfileResolution {
    let mut diag = Diagnostics::new();
    let mut resolved: Vec<String> = if requested.is_empty() {
        vec![DEFAULT_PROFILE.to_owned()]
    } else {
        let mut seen = HashSet::new();
        requested
            .iter()
            .filter(|p| seen.insert(p.as_str()))
            .cloned()
            .collect()
    };

    // Propagate declared profile dependencies until fixpoint.
    let mut index = 0;
    while index < resolved.len() {
        let current = resolved[index].clone();
        if let Some((_, spec)) = doc.profiles.iter().find(|(name, _)| *name == current) {
            for dep in &spec.depends_on {
                if !resolved.contains(dep) {
                    diag.warning(format!(
                        "profile \"{current}\" requires profile \"{dep}\"; activating it automatically"
                    ));
                    resolved.push(dep.clone());
                }
            }
        }
        index += 1;
    }

    for profile in &resolved {
        if let Some((_, spec)) = doc.profiles.iter().find(|(name, _)| name == profile) {
            for conflict in &spec.conflicts {
                if resolved.contains(conflict) {
                    diag.error(format!(
                        "profile \"{profile}\" conflicts with active profile \"{conflict}\""
                    ));
                }
            }
        }
    }

    tracing::debug!(profiles = ?resolved, "resolved activation profiles");
    ProfileResolution {
        profiles: resolved,
        diag,
    }
}

/// Filters a document down to the services active under `resolved` and the
/// resources those services reference.
#[must_use]
pub fn filter_document(doc: &ComposeDocument, resolved: &[String]) -> FilteredDocument {
    let mut filtered = ComposeDocument {
        version: doc.version.clone(),
        profiles: doc.profiles.clone(),
        ..ComposeDocument::default()
    };
    let mut skipped = Vec::new();

    for (name, spec) in &doc.services {
        // A service without a profiles attribute is always deployable.
        if spec.profiles.is_empty()
            || spec.profiles.iter().any(|p| resolved.contains(p))
        {
            filtered.services.push((name.clone(), spec.clone()));
        } else {
            skipped.push(SkippedService {
                name: name.clone(),
                reason: format!(
                    "requires one of profiles [{}] but active profiles are [{}]",
                    spec.profiles.join(", "),
                    resolved.join(", ")
                ),
            });
        }
    }

    let referenced_networks: HashSet<&str> = filtered
        .services
        .iter()
        .flat_map(|(_, spec)| spec.networks.iter().map(String::as_str))
        .collect();
    filtered.networks = doc
        .networks
        .iter()
        .filter(|(name, _)| referenced_networks.contains(name.as_str()))
        .cloned()
        .collect();

    let referenced_volumes: HashSet<String> = filtered
        .services
        .iter()
        .flat_map(|(_, spec)| spec.volumes.iter().filter_map(named_volume_source))
        .collect();
    filtered.volumes = doc
        .volumes
        .iter()
        .filter(|(name, _)| referenced_volumes.contains(name.as_str()))
        .cloned()
        .collect();

    // Containers still need connectivity when every declared network was
    // filtered away.
    if filtered.networks.is_empty() && !filtered.services.is_empty() {
        filtered.networks.push((
            DEFAULT_NETWORK.to_owned(),
            NetworkSpec {
                driver: Some(DEFAULT_NETWORK_DRIVER.to_owned()),
                ..NetworkSpec::default()
            },
        ));
    }

    let summary = ProfileSummary {
        total_services: doc.services.len(),
        deployable_services: filtered.services.len(),
        skipped_services: skipped.len(),
        resolved_profiles: resolved.to_vec(),
        declared_profiles: declared_profiles(doc),
    };

    FilteredDocument {
        document: filtered,
        skipped,
        summary,
    }
}

/// Collects every profile mentioned in the document: top-level declarations
/// first, then profiles introduced only on services.
fn declared_profiles(doc: &ComposeDocument) -> Vec<String> {
    let mut all: Vec<String> = doc.profiles.iter().map(|(name, _)| name.clone()).collect();
    for (_, spec) in &doc.services {
        for profile in &spec.profiles {
            if !all.contains(profile) {
                all.push(profile.clone());
            }
        }
    }
    all
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Node;

    fn doc(text: &str) -> ComposeDocument {
        let root = Node::parse(text).expect("should parse");
        ComposeDocument::decode(&root)
    }

    fn owned(profiles: &[&str]) -> Vec<String> {
        profiles.iter().map(|p| (*p).to_owned()).collect()
    }

    #[test]
    fn empty_request_defaults_to_default_profile() {
        let doc = doc("services:\n  a:\n    image: x\n");
        let res = resolve_profiles(&doc, &[]);
        assert_eq!(res.profiles, vec!["default"]);
        assert!(res.diag.is_valid());
    }

    #[test]
    fn profile_dependencies_propagate_with_warning() {
        let doc = doc(
            "services:\n  a:\n    image: x\nprofiles:\n  full:\n    depends_on: [metrics]\n  metrics:\n    depends_on: [storage]\n",
        );
        let res = resolve_profiles(&doc, &owned(&["full"]));
        assert_eq!(res.profiles, vec!["full", "metrics", "storage"]);
        assert_eq!(res.diag.warnings.len(), 2);
    }

    #[test]
    fn conflicting_profiles_are_fatal() {
        let doc = doc(
            "services:\n  a:\n    image: x\nprofiles:\n  full:\n    conflicts: [minimal]\n  minimal: {}\n",
        );
        let res = resolve_profiles(&doc, &owned(&["full", "minimal"]));
        assert!(!res.diag.is_valid());
        assert!(res.diag.errors[0].contains("conflicts"));
    }

    #[test]
    fn services_filter_by_profile_membership() {
        let doc = doc(
            "services:\n  a:\n    image: x\n  b:\n    image: x\n    profiles: [x]\n  c:\n    image: x\n    profiles: [y]\n",
        );
        let filtered = filter_document(&doc, &owned(&["x"]));
        let names: Vec<&str> = filtered
            .document
            .services
            .iter()
            .map(|(n, _)| n.as_str())
            .collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(filtered.skipped.len(), 1);
        assert_eq!(filtered.skipped[0].name, "c");
        assert!(filtered.skipped[0].reason.contains('y'));
    }

    #[test]
    fn unreferenced_resources_are_dropped() {
        let doc = doc(
            "services:\n  a:\n    image: x\n    networks: [frontend]\n    volumes:\n      - data:/data\n  b:\n    image: x\n    profiles: [extra]\n    networks: [backend]\n    volumes:\n      - logs:/logs\nnetworks:\n  frontend: {}\n  backend: {}\nvolumes:\n  data: {}\n  logs: {}\n",
        );
        let filtered = filter_document(&doc, &owned(&["default"]));
        let networks: Vec<&str> = filtered
            .document
            .networks
            .iter()
            .map(|(n, _)| n.as_str())
            .collect();
        let volumes: Vec<&str> = filtered
            .document
            .volumes
            .iter()
            .map(|(n, _)| n.as_str())
            .collect();
        assert_eq!(networks, vec!["frontend"]);
        assert_eq!(volumes, vec!["data"]);
    }

    #[test]
    fn default_network_synthesized_when_all_filtered() {
        let doc = doc(
            "services:\n  a:\n    image: x\n  b:\n    image: x\n    profiles: [extra]\n    networks: [backend]\nnetworks:\n  backend: {}\n",
        );
        let filtered = filter_document(&doc, &owned(&["default"]));
        assert_eq!(filtered.document.networks.len(), 1);
        let (name, spec) = &filtered.document.networks[0];
        assert_eq!(name, "default");
        assert_eq!(spec.driver.as_deref(), Some("bridge"));
    }

    #[test]
    fn summary_counts_and_declared_profiles() {
        let doc = doc(
            "services:\n  a:\n    image: x\n  b:\n    image: x\n    profiles: [x]\nprofiles:\n  - x\n  - y\n",
        );
        let filtered = filter_document(&doc, &owned(&["default"]));
        assert_eq!(filtered.summary.total_services, 2);
        assert_eq!(filtered.summary.deployable_services, 1);
        assert_eq!(filtered.summary.skipped_services, 1);
        assert_eq!(filtered.summary.declared_profiles, vec!["x", "y"]);
    }
}
