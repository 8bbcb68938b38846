//! Container environment assembly.
//!
//! Merge order, lowest to highest precedence: the stack's `.env` file
//! contents, the process environment, then the service's compose
//! `environment` block. Later sources override earlier ones per key. The
//! result is the flat `KEY=VALUE` array a container engine accepts.

use std::collections::BTreeMap;

use crate::document::Node;

/// Merges the environment sources for one service into `KEY=VALUE` strings.
///
/// The compose block may be the array form (`KEY=VALUE` entries, or a bare
/// `KEY` pulling the value from the lower-precedence sources) or the map
/// form. Output is sorted by key for determinism.
#[must_use]
pub fn merge_environment(
    env_file: &BTreeMap<String, String>,
    process_env: &BTreeMap<String, String>,
    block: Option<&Node>,
) -> Vec<String> {
    let mut merged: BTreeMap<String, String> = env_file.clone();
    for (key, value) in process_env {
        let _ = merged.insert(key.clone(), value.clone());
    }

    match block {
        Some(Node::Sequence(items)) => {
            for item in items {
                let Some(entry) = item.scalar_string() else {
                    continue;
                };
                if let Some((key, value)) = entry.split_once('=') {
                    let _ = merged.insert(key.to_owned(), value.to_owned());
                }
                // Bare KEY entries inherit whatever the lower-precedence
                // sources already provide, so nothing to do when absent.
            }
        }
        Some(Node::Mapping(entries)) => {
            for (key, value) in entries {
                let value = value.scalar_string().unwrap_or_default();
                let _ = merged.insert(key.clone(), value);
            }
        }
        _ => {}
    }

    merged
        .into_iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect()
}
