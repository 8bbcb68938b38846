//! Pure translators from compose-schema fragments to container-engine-ready
//! argument shapes.
//!
//! Each function is independent and side-effect free (the single exception
//! is the bind-mount existence check in [`volumes`], a blocking filesystem
//! probe). Output structs serialize to the field names a container engine's
//! create-container call expects.

pub mod environment;
pub mod healthcheck;
pub mod limits;
pub mod ports;
pub mod volumes;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::document::Node;

/// Engine-shaped restart policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RestartPolicy {
    /// Policy name (`no`, `always`, `unless-stopped`, `on-failure`).
    pub name: String,
    /// Retry cap for `on-failure`; absent for other policies.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum_retry_count: Option<u32>,
}

impl Default for RestartPolicy {
    fn default() -> Self {
        Self {
            name: "no".to_owned(),
            maximum_retry_count: None,
        }
    }
}

/// Translates a compose `restart` value into an engine restart policy.
///
/// `on-failure:N` carries its retry cap; anything unrecognized falls back
/// to `no`.
#[must_use]
pub fn restart_policy(restart: Option<&str>) -> RestartPolicy {
    let policy = |name: &str, retries: Option<u32>| RestartPolicy {
        name: name.to_owned(),
        maximum_retry_count: retries,
    };
    match restart {
        Some("always") => policy("always", None),
        Some("unless-stopped") => policy("unless-stopped", None),
        Some("on-failure") => policy("on-failure", Some(0)),
        Some(value) if value.starts_with("on-failure:") => {
            let retries = value
                .trim_start_matches("on-failure:")
                .parse()
                .unwrap_or(0);
            policy("on-failure", Some(retries))
        }
        _ => policy("no", None),
    }
}

/// Engine-shaped log configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LogConfig {
    /// Logging driver name.
    #[serde(rename = "Type")]
    pub driver: String,
    /// Driver options.
    pub config: BTreeMap<String, String>,
}

/// Translates a compose `logging` fragment into an engine log config.
#[must_use]
pub fn log_config(logging: Option<&Node>) -> Option<LogConfig> {
    let logging = logging?;
    let driver = logging
        .get("driver")
        .and_then(Node::scalar_string)
        .unwrap_or_else(|| "json-file".to_owned());
    let mut config = BTreeMap::new();
    if let Some(options) = logging.get("options").and_then(Node::as_mapping) {
        for (key, value) in options {
            if let Some(value) = value.scalar_string() {
                let _ = config.insert(key.clone(), value);
            }
        }
    }
    Some(LogConfig { driver, config })
}

/// Translates `extra_hosts` (list of `host:ip` strings, or map form) into
/// the engine's flat `host:ip` list.
#[must_use]
pub fn extra_hosts(node: Option<&Node>) -> Vec<String> {
    match node {
        Some(Node::Sequence(items)) => items.iter().filter_map(Node::scalar_string).collect(),
        Some(Node::Mapping(entries)) => entries
            .iter()
            .filter_map(|(host, ip)| ip.scalar_string().map(|ip| format!("{host}:{ip}")))
            .collect(),
        _ => Vec::new(),
    }
}

/// Deterministic per-service configuration hash, used to detect drift
/// between a planned service and previously deployed state. Only stability
/// matters: the same fragment always hashes to the same value.
#[must_use]
pub fn config_hash(fragment: &Node) -> String {
    let mut hasher = Sha256::new();
    hasher.update(canonical_render(fragment));
    format!("{:x}", hasher.finalize())
}

/// Order-preserving canonical rendering of a tree fragment.
fn canonical_render(node: &Node) -> String {
    match node {
        Node::Null => "null".to_owned(),
        Node::Bool(b) => b.to_string(),
        Node::Int(n) => n.to_string(),
        Node::Float(f) => f.to_string(),
        Node::String(s) => format!("{s:?}"),
        Node::Sequence(items) => {
            let inner: Vec<String> = items.iter().map(canonical_render).collect();
            format!("[{}]", inner.join(","))
        }
        Node::Mapping(entries) => {
            let inner: Vec<String> = entries
                .iter()
                .map(|(k, v)| format!("{k:?}:{}", canonical_render(v)))
                .collect();
            format!("{{{}}}", inner.join(","))
        }
    }
}
