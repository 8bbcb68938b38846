//! Port translation.
//!
//! Short form `[hostip:]hostport:containerport[/proto]` (or a bare
//! `containerport[/proto]` with no host binding) and long form
//! (`target`/`published`/`protocol`/`host_ip`) both translate into a map
//! keyed by `"{containerPort}/{protocol}"`, each key carrying the list of
//! host bindings for that exposed port.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::document::Node;

/// One host-side binding for an exposed container port.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PortBinding {
    /// Host interface to bind, when restricted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_ip: Option<String>,
    /// Host port, absent for an exposed-only container port.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_port: Option<String>,
}

/// Translates a service's port entries.
///
/// Multiple entries for the same container port accumulate bindings under
/// one key. Entries the validator already rejected are skipped here.
#[must_use]
pub fn translate_ports(entries: &[Node]) -> BTreeMap<String, Vec<PortBinding>> {
    let mut bindings: BTreeMap<String, Vec<PortBinding>> = BTreeMap::new();
    for entry in entries {
        let parsed = match entry {
            Node::Mapping(_) => parse_long(entry),
            other => other.scalar_string().and_then(|spec| parse_short(&spec)),
        };
        if let Some((key, binding)) = parsed {
            bindings.entry(key).or_default().push(binding);
        }
    }
    bindings
}

fn parse_short(spec: &str) -> Option<(String, PortBinding)> {
    let (address, protocol) = match spec.split_once('/') {
        Some((address, proto)) => (address, proto),
        None => (spec, "tcp"),
    };

    let segments: Vec<&str> = address.split(':').collect();
    let (host_ip, host_port, container_port) = match segments.as_slice() {
        [container] => (None, None, *container),
        [host, container] => (None, Some((*host).to_owned()), *container),
        [ip, host, container] => (
            Some((*ip).to_owned()),
            Some((*host).to_owned()),
            *container,
        ),
        _ => return None,
    };
    if container_port.is_empty() {
        return None;
    }

    Some((
        format!("{container_port}/{protocol}"),
        PortBinding { host_ip, host_port },
    ))
}

fn parse_long(entry: &Node) -> Option<(String, PortBinding)> {
    let target = entry.get("target").and_then(Node::scalar_string)?;
    let protocol = entry
        .get("protocol")
        .and_then(Node::scalar_string)
        .unwrap_or_else(|| "tcp".to_owned());
    Some((
        format!("{target}/{protocol}"),
        PortBinding {
            host_ip: entry.get("host_ip").and_then(Node::scalar_string),
            host_port: entry.get("published").and_then(Node::scalar_string),
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(text: &str) -> Vec<Node> {
        Node::parse(text)
            .expect("should parse")
            .as_sequence()
            .expect("sequence")
            .to_vec()
    }

    #[test]
    fn host_and_container_port_with_protocol() {
        let out = translate_ports(&entries("- '8080:80/udp'\n"));
        let bindings = out.get("80/udp").expect("80/udp");
        assert_eq!(bindings[0].host_port.as_deref(), Some("8080"));
        assert_eq!(bindings[0].host_ip, None);
    }

    #[test]
    fn bare_container_port_defaults_to_tcp_and_no_binding() {
        let out = translate_ports(&entries("- '80'\n"));
        let bindings = out.get("80/tcp").expect("80/tcp");
        assert_eq!(bindings[0], PortBinding::default());
    }

    #[test]
    fn numeric_entry_is_accepted() {
        let out = translate_ports(&entries("- 443\n"));
        assert!(out.contains_key("443/tcp"));
    }

    #[test]
    fn host_ip_form() {
        let out = translate_ports(&entries("- '127.0.0.1:9090:90'\n"));
        let bindings = out.get("90/tcp").expect("90/tcp");
        assert_eq!(bindings[0].host_ip.as_deref(), Some("127.0.0.1"));
        assert_eq!(bindings[0].host_port.as_deref(), Some("9090"));
    }

    #[test]
    fn multiple_bindings_per_container_port() {
        let out = translate_ports(&entries("- '8080:80'\n- '8081:80'\n"));
        assert_eq!(out.get("80/tcp").map(Vec::len), Some(2));
    }

    #[test]
    fn long_form_entry() {
        let out = translate_ports(&entries(
            "- target: 80\n  published: 8080\n  protocol: udp\n  host_ip: 0.0.0.0\n",
        ));
        let bindings = out.get("80/udp").expect("80/udp");
        assert_eq!(bindings[0].host_port.as_deref(), Some("8080"));
        assert_eq!(bindings[0].host_ip.as_deref(), Some("0.0.0.0"));
    }

    #[test]
    fn serializes_to_engine_field_names() {
        let out = translate_ports(&entries("- '8080:80'\n"));
        let json = serde_json::to_string(&out).expect("serialize");
        assert!(json.contains("\"HostPort\":\"8080\""), "{json}");
    }
}
