//! Healthcheck translation and duration normalization.
//!
//! The engine takes the `test` command as an exec-form array and all
//! durations in nanoseconds. Compose allows bare numbers (whole seconds)
//! or duration strings with `ns`/`us`/`ms`/`s`/`m`/`h` suffixes.

use serde::{Deserialize, Serialize};

use crate::document::Node;

const NANOS_PER_SECOND: f64 = 1_000_000_000.0;

/// Engine-shaped healthcheck configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HealthConfig {
    /// Exec-form test command (`["CMD", ...]`, `["CMD-SHELL", ...]`, or
    /// `["NONE"]`).
    pub test: Vec<String>,
    /// Interval between probes, in nanoseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval: Option<u64>,
    /// Per-probe timeout, in nanoseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
    /// Consecutive failures before unhealthy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retries: Option<u64>,
    /// Grace period after start, in nanoseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_period: Option<u64>,
}

/// Translates a compose `healthcheck` fragment.
///
/// Returns `None` when the fragment is absent or explicitly disabled
/// (`disable: true`).
#[must_use]
pub fn translate_healthcheck(node: Option<&Node>) -> Option<HealthConfig> {
    let node = node?;
    if node.get("disable").and_then(Node::as_bool) == Some(true) {
        return None;
    }

    let test = match node.get("test") {
        Some(Node::Sequence(items)) => items.iter().filter_map(Node::scalar_string).collect(),
        Some(Node::String(s)) if s == "NONE" => vec!["NONE".to_owned()],
        Some(Node::String(s)) => vec!["CMD-SHELL".to_owned(), s.clone()],
        _ => Vec::new(),
    };

    Some(HealthConfig {
        test,
        interval: node.get("interval").and_then(duration_ns),
        timeout: node.get("timeout").and_then(duration_ns),
        retries: node.get("retries").and_then(|n| match n {
            Node::Int(v) if *v >= 0 => u64::try_from(*v).ok(),
            _ => None,
        }),
        start_period: node.get("start_period").and_then(duration_ns),
    })
}

/// Normalizes a numeric-or-duration-string node to nanoseconds.
///
/// Bare numbers are whole seconds; strings recognize the `ns`, `us`, `ms`,
/// `s`, `m`, `h` suffixes, and a numeric string without a suffix defaults
/// to seconds.
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::cast_sign_loss, clippy::cast_possible_truncation)]
pub fn duration_ns(node: &Node) -> Option<u64> {
    match node {
        Node::Int(n) if *n >= 0 => Some((*n as f64 * NANOS_PER_SECOND) as u64),
        Node::Float(f) if *f >= 0.0 => Some((f * NANOS_PER_SECOND) as u64),
        Node::String(s) => parse_duration_str(s),
        _ => None,
    }
}

/// Parses a duration string (`"500ms"`, `"1m"`, `"90"`) to nanoseconds.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn parse_duration_str(input: &str) -> Option<u64> {
    let input = input.trim();
    let (value, multiplier) = if let Some(v) = input.strip_suffix("ns") {
        (v, 1.0)
    } else if let Some(v) = input.strip_suffix("us") {
        (v, 1e3)
    } else if let Some(v) = input.strip_suffix("ms") {
        (v, 1e6)
    } else if let Some(v) = input.strip_suffix('s') {
        (v, 1e9)
    } else if let Some(v) = input.strip_suffix('m') {
        (v, 60.0 * 1e9)
    } else if let Some(v) = input.strip_suffix('h') {
        (v, 3600.0 * 1e9)
    } else {
        // No suffix: whole seconds.
        (input, NANOS_PER_SECOND)
    };

    let value: f64 = value.trim().parse().ok()?;
    if value < 0.0 {
        return None;
    }
    Some((value * multiplier) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_durations_are_seconds() {
        assert_eq!(duration_ns(&Node::Int(30)), Some(30_000_000_000));
    }

    #[test]
    fn suffixed_durations() {
        assert_eq!(parse_duration_str("500ms"), Some(500_000_000));
        assert_eq!(parse_duration_str("1m"), Some(60_000_000_000));
        assert_eq!(parse_duration_str("2h"), Some(7_200_000_000_000));
        assert_eq!(parse_duration_str("100ns"), Some(100));
        assert_eq!(parse_duration_str("250us"), Some(250_000));
        assert_eq!(parse_duration_str("3s"), Some(3_000_000_000));
    }

    #[test]
    fn unsuffixed_string_is_seconds() {
        assert_eq!(parse_duration_str("90"), Some(90_000_000_000));
    }

    #[test]
    fn garbage_duration_is_none() {
        assert_eq!(parse_duration_str("soon"), None);
    }

    #[test]
    fn array_test_passes_through() {
        let node = Node::parse("test: ['CMD', 'pg_isready']\n").expect("parse");
        let config = translate_healthcheck(Some(&node)).expect("config");
        assert_eq!(config.test, vec!["CMD", "pg_isready"]);
    }

    #[test]
    fn string_test_becomes_cmd_shell() {
        let node = Node::parse("test: curl -f http://localhost/\n").expect("parse");
        let config = translate_healthcheck(Some(&node)).expect("config");
        assert_eq!(config.test, vec!["CMD-SHELL", "curl -f http://localhost/"]);
    }

    #[test]
    fn none_string_is_wrapped() {
        let node = Node::parse("test: NONE\n").expect("parse");
        let config = translate_healthcheck(Some(&node)).expect("config");
        assert_eq!(config.test, vec!["NONE"]);
    }

    #[test]
    fn disabled_healthcheck_is_none() {
        let node = Node::parse("disable: true\ntest: NONE\n").expect("parse");
        assert!(translate_healthcheck(Some(&node)).is_none());
        assert!(translate_healthcheck(None).is_none());
    }

    #[test]
    fn durations_and_retries_are_read() {
        let node = Node::parse(
            "test: ['CMD', 'true']\ninterval: 30\ntimeout: 500ms\nretries: 3\nstart_period: 1m\n",
        )
        .expect("parse");
        let config = translate_healthcheck(Some(&node)).expect("config");
        assert_eq!(config.interval, Some(30_000_000_000));
        assert_eq!(config.timeout, Some(500_000_000));
        assert_eq!(config.retries, Some(3));
        assert_eq!(config.start_period, Some(60_000_000_000));
    }
}
