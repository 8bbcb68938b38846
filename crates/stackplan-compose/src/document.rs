//! Generic YAML document model and the typed compose decode.
//!
//! Compose input is parsed into an untyped [`Node`] tree first (no compose
//! knowledge), substitution and structural validation run against that tree,
//! and only then is the tree decoded into [`ComposeDocument`] by explicit
//! field-by-field extraction with defaults.

use serde::Serialize;
use stackplan_common::error::{Result, StackplanError};

/// One node of a parsed YAML document.
///
/// Mapping entries preserve document order; keys of non-string scalar kinds
/// are rendered to their string form on decode.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Node {
    /// YAML null or missing value.
    #[default]
    Null,
    /// Boolean scalar.
    Bool(bool),
    /// Integer scalar.
    Int(i64),
    /// Floating-point scalar.
    Float(f64),
    /// String scalar.
    String(String),
    /// Ordered sequence of nodes.
    Sequence(Vec<Node>),
    /// Ordered mapping of string keys to nodes.
    Mapping(Vec<(String, Node)>),
}

impl Node {
    /// Parses raw compose text into a generic tree.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not well-formed YAML.
    pub fn parse(text: &str) -> Result<Self> {
        let value: serde_yaml::Value = serde_yaml::from_str(text)?;
        Ok(Self::from_value(value))
    }

    fn from_value(value: serde_yaml::Value) -> Self {
        match value {
            serde_yaml::Value::Null => Self::Null,
            serde_yaml::Value::Bool(b) => Self::Bool(b),
            serde_yaml::Value::Number(n) => n.as_i64().map_or_else(
                || Self::Float(n.as_f64().unwrap_or(0.0)),
                Self::Int,
            ),
            serde_yaml::Value::String(s) => Self::String(s),
            serde_yaml::Value::Sequence(seq) => {
                Self::Sequence(seq.into_iter().map(Self::from_value).collect())
            }
            serde_yaml::Value::Mapping(map) => Self::Mapping(
                map.into_iter()
                    .map(|(k, v)| (render_key(&k), Self::from_value(v)))
                    .collect(),
            ),
            serde_yaml::Value::Tagged(tagged) => Self::from_value(tagged.value),
        }
    }

    /// Returns the string value if this node is a string scalar.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the boolean value if this node is a bool scalar.
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the sequence items if this node is a sequence.
    #[must_use]
    pub fn as_sequence(&self) -> Option<&[Node]> {
        match self {
            Self::Sequence(items) => Some(items),
            _ => None,
        }
    }

    /// Returns the mapping entries if this node is a mapping.
    #[must_use]
    pub fn as_mapping(&self) -> Option<&[(String, Node)]> {
        match self {
            Self::Mapping(entries) => Some(entries),
            _ => None,
        }
    }

    /// Looks up a key in a mapping node.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Node> {
        self.as_mapping()?
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Renders a scalar node to its string form.
    ///
    /// Compose documents freely mix quoted and bare scalars (`- 80` vs
    /// `- "80"`); translators accept either through this accessor.
    /// Returns `None` for sequences, mappings, and null.
    #[must_use]
    pub fn scalar_string(&self) -> Option<String> {
        match self {
            Self::Bool(b) => Some(b.to_string()),
            Self::Int(n) => Some(n.to_string()),
            Self::Float(f) => Some(f.to_string()),
            Self::String(s) => Some(s.clone()),
            Self::Null | Self::Sequence(_) | Self::Mapping(_) => None,
        }
    }
}

fn render_key(key: &serde_yaml::Value) -> String {
    match key {
        serde_yaml::Value::String(s) => s.clone(),
        serde_yaml::Value::Bool(b) => b.to_string(),
        serde_yaml::Value::Number(n) => n.to_string(),
        _ => String::new(),
    }
}

/// A compose document decoded from the generic tree.
///
/// Immutable once decoded; the profile resolver produces a *new* filtered
/// document rather than mutating this one, so the same source supports
/// re-planning with different profile sets.
#[derive(Debug, Clone, Default)]
pub struct ComposeDocument {
    /// Declared compose file version, if any.
    pub version: Option<String>,
    /// Services in document order.
    pub services: Vec<(String, ServiceSpec)>,
    /// Top-level network declarations in document order.
    pub networks: Vec<(String, NetworkSpec)>,
    /// Top-level volume declarations in document order.
    pub volumes: Vec<(String, VolumeSpec)>,
    /// Profile declarations (map form carries dependencies and conflicts).
    pub profiles: Vec<(String, ProfileSpec)>,
}

impl ComposeDocument {
    /// Decodes a substituted, validated tree into typed compose structures.
    ///
    /// The decode is lenient: fields of an unexpected shape fall back to
    /// their defaults, since fatal shape problems were already reported by
    /// the validator.
    #[must_use]
    pub fn decode(root: &Node) -> Self {
        let mut doc = Self {
            version: root
                .get("version")
                .and_then(Node::scalar_string),
            ..Self::default()
        };

        if let Some(services) = root.get("services").and_then(Node::as_mapping) {
            for (name, body) in services {
                doc.services
                    .push((name.clone(), ServiceSpec::decode(body)));
            }
        }
        if let Some(networks) = root.get("networks").and_then(Node::as_mapping) {
            for (name, body) in networks {
                doc.networks
                    .push((name.clone(), NetworkSpec::decode(body)));
            }
        }
        if let Some(volumes) = root.get("volumes").and_then(Node::as_mapping) {
            for (name, body) in volumes {
                doc.volumes.push((name.clone(), VolumeSpec::decode(body)));
            }
        }
        doc.profiles = decode_profiles(root.get("profiles"));
        doc
    }

    /// Looks up a service by name.
    #[must_use]
    pub fn service(&self, name: &str) -> Option<&ServiceSpec> {
        self.services
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, s)| s)
    }

    /// Looks up a service by name, as an error-returning variant.
    ///
    /// # Errors
    ///
    /// Returns [`StackplanError::NotFound`] if no such service exists.
    pub fn require_service(&self, name: &str) -> Result<&ServiceSpec> {
        self.service(name).ok_or_else(|| StackplanError::NotFound {
            kind: "service",
            id: name.to_owned(),
        })
    }
}

/// One service block of a compose document, decoded field-by-field.
///
/// Polymorphic fields (`depends_on`, `environment`, `ports`, `volumes`, ...)
/// keep their raw tree fragment; the stage that consumes each field owns the
/// short-form/long-form interpretation.
#[derive(Debug, Clone, Default)]
pub struct ServiceSpec {
    /// Image reference, when the service runs a prebuilt image.
    pub image: Option<String>,
    /// Raw `build` fragment (string context or mapping form).
    pub build: Option<Node>,
    /// Raw `depends_on` fragment (array or map form).
    pub depends_on: Option<Node>,
    /// Activation profiles this service belongs to.
    pub profiles: Vec<String>,
    /// Raw port entries.
    pub ports: Vec<Node>,
    /// Raw volume entries.
    pub volumes: Vec<Node>,
    /// Raw `environment` fragment (array or map form).
    pub environment: Option<Node>,
    /// Raw `healthcheck` fragment.
    pub healthcheck: Option<Node>,
    /// Restart policy string.
    pub restart: Option<String>,
    /// Memory limit string (`512m`, `1g`, raw bytes).
    pub mem_limit: Option<String>,
    /// Names of networks the service attaches to.
    pub networks: Vec<String>,
    /// Raw `extra_hosts` fragment (array or map form).
    pub extra_hosts: Option<Node>,
    /// Raw `ulimits` fragment.
    pub ulimits: Option<Node>,
    /// Raw `logging` fragment.
    pub logging: Option<Node>,
    /// The full service fragment, kept for config hashing.
    pub raw: Node,
}

impl ServiceSpec {
    fn decode(body: &Node) -> Self {
        Self {
            image: body.get("image").and_then(Node::scalar_string),
            build: body.get("build").cloned(),
            depends_on: body.get("depends_on").cloned(),
            profiles: decode_string_or_list(body.get("profiles")),
            ports: decode_list(body.get("ports")),
            volumes: decode_list(body.get("volumes")),
            environment: body.get("environment").cloned(),
            healthcheck: body.get("healthcheck").cloned(),
            restart: body.get("restart").and_then(Node::scalar_string),
            mem_limit: body.get("mem_limit").and_then(Node::scalar_string),
            networks: decode_network_names(body.get("networks")),
            extra_hosts: body.get("extra_hosts").cloned(),
            ulimits: body.get("ulimits").cloned(),
            logging: body.get("logging").cloned(),
            raw: body.clone(),
        }
    }

    /// Returns `true` if the service has an effective healthcheck: a
    /// `healthcheck` block that is not explicitly disabled.
    #[must_use]
    pub fn has_effective_healthcheck(&self) -> bool {
        self.healthcheck.as_ref().is_some_and(|hc| {
            hc.get("disable").and_then(Node::as_bool) != Some(true)
        })
    }
}

/// A top-level network declaration.
#[derive(Debug, Clone, Default, Serialize)]
pub struct NetworkSpec {
    /// Network driver, when declared.
    pub driver: Option<String>,
    /// Whether the network is marked external.
    pub external: bool,
    /// Explicit engine-side name for an external network.
    pub external_name: Option<String>,
}

impl NetworkSpec {
    fn decode(body: &Node) -> Self {
        let (external, external_name) = decode_external(body);
        Self {
            driver: body.get("driver").and_then(Node::scalar_string),
            external,
            external_name,
        }
    }
}

/// A top-level volume declaration.
#[derive(Debug, Clone, Default, Serialize)]
pub struct VolumeSpec {
    /// Volume driver, when declared.
    pub driver: Option<String>,
    /// Whether the volume is marked external.
    pub external: bool,
    /// Explicit engine-side name for an external volume.
    pub external_name: Option<String>,
}

impl VolumeSpec {
    fn decode(body: &Node) -> Self {
        let (external, external_name) = decode_external(body);
        Self {
            driver: body.get("driver").and_then(Node::scalar_string),
            external,
            external_name,
        }
    }
}

/// A declared activation profile (map form carries metadata).
#[derive(Debug, Clone, Default)]
pub struct ProfileSpec {
    /// Profiles automatically activated alongside this one.
    pub depends_on: Vec<String>,
    /// Profiles that must not be active together with this one.
    pub conflicts: Vec<String>,
    /// Free-form description for operator-facing output.
    pub description: Option<String>,
}

/// `external:` accepts a bare bool or a `{name: ...}` mapping. The explicit
/// name also satisfies a string-valued `name` key beside `external: true`.
fn decode_external(body: &Node) -> (bool, Option<String>) {
    match body.get("external") {
        Some(Node::Bool(flag)) => {
            let name = body.get("name").and_then(Node::scalar_string);
            (*flag, name)
        }
        Some(ext @ Node::Mapping(_)) => {
            (true, ext.get("name").and_then(Node::scalar_string))
        }
        _ => (false, None),
    }
}

fn decode_list(node: Option<&Node>) -> Vec<Node> {
    node.and_then(Node::as_sequence)
        .map(<[Node]>::to_vec)
        .unwrap_or_default()
}

fn decode_string_or_list(node: Option<&Node>) -> Vec<String> {
    match node {
        Some(Node::String(s)) => vec![s.clone()],
        Some(Node::Sequence(items)) => {
            items.iter().filter_map(Node::scalar_string).collect()
        }
        _ => Vec::new(),
    }
}

/// Service `networks:` is either a list of names or a map of name→config.
fn decode_network_names(node: Option<&Node>) -> Vec<String> {
    match node {
        Some(Node::Sequence(items)) => {
            items.iter().filter_map(Node::scalar_string).collect()
        }
        Some(Node::Mapping(entries)) => entries.iter().map(|(k, _)| k.clone()).collect(),
        _ => Vec::new(),
    }
}

/// Top-level `profiles:` is either a bare list of names or a map of
/// name→{depends_on, conflicts, description}.
fn decode_profiles(node: Option<&Node>) -> Vec<(String, ProfileSpec)> {
    match node {
        Some(Node::Sequence(items)) => items
            .iter()
            .filter_map(Node::scalar_string)
            .map(|name| (name, ProfileSpec::default()))
            .collect(),
        Some(Node::Mapping(entries)) => entries
            .iter()
            .map(|(name, body)| {
                let spec = ProfileSpec {
                    depends_on: decode_string_or_list(body.get("depends_on")),
                    conflicts: decode_string_or_list(body.get("conflicts")),
                    description: body.get("description").and_then(Node::scalar_string),
                };
                (name.clone(), spec)
            })
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r"
version: '3.8'
services:
  web:
    image: nginx:latest
    ports:
      - '8080:80'
    depends_on:
      - db
    profiles: [frontend]
  db:
    image: postgres:16
    healthcheck:
      test: ['CMD', 'pg_isready']
networks:
  backend:
    driver: bridge
volumes:
  db-data:
    external:
      name: shared-db-data
";

    #[test]
    fn parse_preserves_mapping_order() {
        let root = Node::parse(SAMPLE).expect("should parse");
        let services = root.get("services").expect("services");
        let names: Vec<&str> = services
            .as_mapping()
            .expect("mapping")
            .iter()
            .map(|(k, _)| k.as_str())
            .collect();
        assert_eq!(names, vec!["web", "db"]);
    }

    #[test]
    fn scalar_string_renders_numbers() {
        let root = Node::parse("ports:\n  - 80\n").expect("should parse");
        let ports = root.get("ports").and_then(Node::as_sequence).expect("seq");
        assert_eq!(ports[0].scalar_string().as_deref(), Some("80"));
    }

    #[test]
    fn malformed_yaml_is_an_error() {
        assert!(Node::parse("services: [unclosed").is_err());
    }

    #[test]
    fn decode_extracts_service_fields() {
        let root = Node::parse(SAMPLE).expect("should parse");
        let doc = ComposeDocument::decode(&root);
        assert_eq!(doc.version.as_deref(), Some("3.8"));
        assert_eq!(doc.services.len(), 2);

        let web = doc.service("web").expect("web");
        assert_eq!(web.image.as_deref(), Some("nginx:latest"));
        assert_eq!(web.profiles, vec!["frontend"]);
        assert_eq!(web.ports.len(), 1);
        assert!(web.depends_on.is_some());
    }

    #[test]
    fn decode_external_volume_name() {
        let root = Node::parse(SAMPLE).expect("should parse");
        let doc = ComposeDocument::decode(&root);
        let (name, vol) = &doc.volumes[0];
        assert_eq!(name, "db-data");
        assert!(vol.external);
        assert_eq!(vol.external_name.as_deref(), Some("shared-db-data"));
    }

    #[test]
    fn effective_healthcheck_respects_disable() {
        let root = Node::parse(
            "services:\n  a:\n    image: x\n    healthcheck:\n      disable: true\n",
        )
        .expect("should parse");
        let doc = ComposeDocument::decode(&root);
        assert!(!doc.service("a").expect("a").has_effective_healthcheck());
    }

    #[test]
    fn require_service_reports_missing() {
        let doc = ComposeDocument::default();
        let err = doc.require_service("ghost").unwrap_err();
        assert!(err.to_string().contains("ghost"));
    }

    #[test]
    fn profiles_map_form_carries_dependencies() {
        let root = Node::parse(
            "services:\n  a:\n    image: x\nprofiles:\n  full:\n    depends_on: [metrics]\n    conflicts: [minimal]\n",
        )
        .expect("should parse");
        let doc = ComposeDocument::decode(&root);
        let (name, spec) = &doc.profiles[0];
        assert_eq!(name, "full");
        assert_eq!(spec.depends_on, vec!["metrics"]);
        assert_eq!(spec.conflicts, vec!["minimal"]);
    }
}
