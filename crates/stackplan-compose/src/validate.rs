//! Structural validation of a substituted compose tree.
//!
//! A pure inspection pass: the input tree is never mutated. Fatal findings
//! (wrong document shape, bad service names, dangling `depends_on`
//! references, invalid port syntax) land in `errors`; advisory findings
//! (version quirks, undeclared resource references, uncommon drivers) land
//! in `warnings`.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use stackplan_common::constants::{COMMON_NETWORK_DRIVERS, SUPPORTED_COMPOSE_VERSIONS};
use stackplan_common::diag::Diagnostics;

use crate::document::Node;
use crate::translate::volumes::named_volume_source;

static SERVICE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^[a-zA-Z0-9._-]+$").expect("service name pattern is valid")
});

static PORT_SYNTAX: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^(?:(\d{1,3}(?:\.\d{1,3}){3}):)?(?:(\d+):)?(\d+)(?:/(tcp|udp))?$")
        .expect("port pattern is valid")
});

/// Validates a substituted compose tree against structural invariants.
#[must_use]
pub fn validate(root: &Node) -> Diagnostics {
    let mut diag = Diagnostics::new();
    tracing::debug!("validating compose document structure");

    let Some(_) = root.as_mapping() else {
        diag.error("compose document must be a mapping at the top level");
        return diag;
    };

    check_version(root, &mut diag);

    let Some(services) = root.get("services").and_then(Node::as_mapping) else {
        diag.error("compose document has no 'services' mapping");
        return diag;
    };
    if services.is_empty() {
        diag.error("'services' mapping is empty; nothing to deploy");
        return diag;
    }

    let service_names: HashSet<&str> = services.iter().map(|(n, _)| n.as_str()).collect();
    let declared_networks = declared_names(root.get("networks"));
    let declared_volumes = declared_names(root.get("volumes"));

    for (name, body) in services {
        check_service_name(name, &mut diag);
        check_image_or_build(name, body, &mut diag);
        check_depends_on_references(name, body, &service_names, &mut diag);
        check_ports(name, body, &mut diag);
        check_network_references(name, body, &declared_networks, &mut diag);
        check_volume_references(name, body, &declared_volumes, &mut diag);
    }

    check_resource_declarations(root.get("networks"), "network", &mut diag);
    check_resource_declarations(root.get("volumes"), "volume", &mut diag);
    check_network_drivers(root.get("networks"), &mut diag);

    diag
}

fn declared_names(section: Option<&Node>) -> HashSet<String> {
    section
        .and_then(Node::as_mapping)
        .map(|entries| entries.iter().map(|(k, _)| k.clone()).collect())
        .unwrap_or_default()
}

fn check_version(root: &Node, diag: &mut Diagnostics) {
    match root.get("version").and_then(Node::scalar_string) {
        None => diag.warning("no 'version' field declared; assuming a recent compose schema"),
        Some(version) => {
            let major = version.split('.').next().unwrap_or_default();
            if !SUPPORTED_COMPOSE_VERSIONS.contains(&major) {
                diag.warning(format!("unsupported compose version \"{version}\""));
            }
        }
    }
}

fn check_service_name(name: &str, diag: &mut Diagnostics) {
    if !SERVICE_NAME.is_match(name) {
        diag.error(format!(
            "service name \"{name}\" contains invalid characters (allowed: letters, digits, '.', '_', '-')"
        ));
    }
}

fn check_image_or_build(name: &str, body: &Node, diag: &mut Diagnostics) {
    // At-least-one check only; declaring both image and build is accepted.
    if body.get("image").is_none() && body.get("build").is_none() {
        diag.error(format!("service \"{name}\" declares neither 'image' nor 'build'"));
    }
}

fn check_depends_on_references(
    name: &str,
    body: &Node,
    service_names: &HashSet<&str>,
    diag: &mut Diagnostics,
) {
    let targets: Vec<String> = match body.get("depends_on") {
        Some(Node::Sequence(items)) => items.iter().filter_map(Node::scalar_string).collect(),
        Some(Node::Mapping(entries)) => entries.iter().map(|(k, _)| k.clone()).collect(),
        _ => Vec::new(),
    };
    for target in targets {
        if !service_names.contains(target.as_str()) {
            diag.error(format!(
                "service \"{name}\" depends on undefined service \"{target}\""
            ));
        }
    }
}

fn check_ports(name: &str, body: &Node, diag: &mut Diagnostics) {
    let Some(ports) = body.get("ports").and_then(Node::as_sequence) else {
        return;
    };
    for entry in ports {
        // Long-form (mapping) entries are shaped by the translator; only
        // short-form strings carry the colon syntax validated here.
        if let Some(spec) = entry.scalar_string() {
            if !PORT_SYNTAX.is_match(&spec) {
                diag.error(format!(
                    "service \"{name}\" has invalid port specification \"{spec}\""
                ));
            }
        }
    }
}

fn check_network_references(
    name: &str,
    body: &Node,
    declared: &HashSet<String>,
    diag: &mut Diagnostics,
) {
    let referenced: Vec<String> = match body.get("networks") {
        Some(Node::Sequence(items)) => items.iter().filter_map(Node::scalar_string).collect(),
        Some(Node::Mapping(entries)) => entries.iter().map(|(k, _)| k.clone()).collect(),
        _ => Vec::new(),
    };
    for network in referenced {
        if !declared.contains(&network) {
            diag.warning(format!(
                "service \"{name}\" references network \"{network}\" not declared at top level"
            ));
        }
    }
}

fn check_volume_references(
    name: &str,
    body: &Node,
    declared: &HashSet<String>,
    diag: &mut Diagnostics,
) {
    let Some(volumes) = body.get("volumes").and_then(Node::as_sequence) else {
        return;
    };
    for entry in volumes {
        if let Some(source) = named_volume_source(entry) {
            if !declared.contains(&source) {
                diag.warning(format!(
                    "service \"{name}\" references volume \"{source}\" not declared at top level"
                ));
            }
        }
    }
}

fn check_resource_declarations(section: Option<&Node>, kind: &str, diag: &mut Diagnostics) {
    let Some(entries) = section.and_then(Node::as_mapping) else {
        return;
    };
    for (name, body) in entries {
        let is_external = matches!(body.get("external"), Some(Node::Bool(true) | Node::Mapping(_)));
        if is_external {
            let has_name = body.get("name").and_then(Node::as_str).is_some()
                || body
                    .get("external")
                    .and_then(|ext| ext.get("name"))
                    .and_then(Node::as_str)
                    .is_some();
            if !has_name {
                diag.warning(format!(
                    "external {kind} \"{name}\" has no explicit 'name'; the engine-side name may not match"
                ));
            }
        }
    }
}

fn check_network_drivers(section: Option<&Node>, diag: &mut Diagnostics) {
    let Some(entries) = section.and_then(Node::as_mapping) else {
        return;
    };
    for (name, body) in entries {
        if let Some(driver) = body.get("driver").and_then(Node::as_str) {
            if !COMMON_NETWORK_DRIVERS.contains(&driver) {
                diag.warning(format!(
                    "network \"{name}\" uses uncommon driver \"{driver}\""
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validate_text(text: &str) -> Diagnostics {
        let root = Node::parse(text).expect("should parse");
        validate(&root)
    }

    #[test]
    fn minimal_valid_document_passes() {
        let diag = validate_text("version: '3'\nservices:\n  web:\n    image: nginx\n");
        assert!(diag.is_valid(), "errors: {:?}", diag.errors);
        assert!(diag.warnings.is_empty(), "warnings: {:?}", diag.warnings);
    }

    #[test]
    fn non_mapping_document_is_fatal() {
        let diag = validate_text("- just\n- a\n- list\n");
        assert!(!diag.is_valid());
    }

    #[test]
    fn missing_services_is_fatal() {
        let diag = validate_text("version: '3'\n");
        assert!(!diag.is_valid());
        assert!(diag.errors[0].contains("services"));
    }

    #[test]
    fn invalid_service_name_is_fatal() {
        let diag = validate_text("services:\n  'bad name!':\n    image: x\n");
        assert!(!diag.is_valid());
        assert!(diag.errors.iter().any(|e| e.contains("invalid characters")), "{:?}", diag.errors);
    }

    #[test]
    fn missing_image_and_build_is_fatal() {
        let diag = validate_text("services:\n  web:\n    restart: always\n");
        assert!(!diag.is_valid());
        assert!(diag.errors.iter().any(|e| e.contains("neither")));
    }

    #[test]
    fn build_without_image_is_accepted() {
        let diag = validate_text("services:\n  web:\n    build: .\n");
        assert!(diag.is_valid(), "errors: {:?}", diag.errors);
    }

    #[test]
    fn dangling_dependency_is_fatal() {
        let diag = validate_text(
            "services:\n  web:\n    image: x\n    depends_on:\n      - db\n",
        );
        assert!(!diag.is_valid());
        assert!(diag.errors.iter().any(|e| e.contains("db")));
    }

    #[test]
    fn dangling_dependency_map_form_is_fatal() {
        let diag = validate_text(
            "services:\n  web:\n    image: x\n    depends_on:\n      db:\n        condition: service_started\n",
        );
        assert!(!diag.is_valid());
    }

    #[test]
    fn invalid_port_syntax_is_fatal() {
        let diag = validate_text(
            "services:\n  web:\n    image: x\n    ports:\n      - 'eighty:80'\n",
        );
        assert!(!diag.is_valid());
        assert!(diag.errors.iter().any(|e| e.contains("port")));
    }

    #[test]
    fn valid_port_forms_pass() {
        let diag = validate_text(
            "services:\n  web:\n    image: x\n    ports:\n      - '8080:80'\n      - '127.0.0.1:9090:90/udp'\n      - 80\n      - '443/tcp'\n",
        );
        assert!(diag.is_valid(), "errors: {:?}", diag.errors);
    }

    #[test]
    fn missing_version_is_a_warning() {
        let diag = validate_text("services:\n  web:\n    image: x\n");
        assert!(diag.is_valid());
        assert!(diag.warnings.iter().any(|w| w.contains("version")));
    }

    #[test]
    fn unknown_version_is_a_warning() {
        let diag = validate_text("version: '9'\nservices:\n  web:\n    image: x\n");
        assert!(diag.is_valid());
        assert!(diag.warnings.iter().any(|w| w.contains("unsupported")));
    }

    #[test]
    fn undeclared_network_reference_is_a_warning() {
        let diag = validate_text(
            "version: '3'\nservices:\n  web:\n    image: x\n    networks:\n      - backend\n",
        );
        assert!(diag.is_valid());
        assert!(diag.warnings.iter().any(|w| w.contains("backend")));
    }

    #[test]
    fn undeclared_named_volume_is_a_warning() {
        let diag = validate_text(
            "version: '3'\nservices:\n  db:\n    image: x\n    volumes:\n      - data:/var/lib/data\n",
        );
        assert!(diag.is_valid());
        assert!(diag.warnings.iter().any(|w| w.contains("data")));
    }

    #[test]
    fn bind_mount_paths_need_no_declaration() {
        let diag = validate_text(
            "version: '3'\nservices:\n  db:\n    image: x\n    volumes:\n      - /host/data:/var/lib/data\n      - ./conf:/etc/conf\n",
        );
        assert!(diag.is_valid());
        assert!(diag.warnings.is_empty(), "warnings: {:?}", diag.warnings);
    }

    #[test]
    fn external_network_without_name_is_a_warning() {
        let diag = validate_text(
            "version: '3'\nservices:\n  web:\n    image: x\nnetworks:\n  shared:\n    external: true\n",
        );
        assert!(diag.is_valid());
        assert!(diag.warnings.iter().any(|w| w.contains("explicit 'name'")));
    }

    #[test]
    fn uncommon_network_driver_is_a_warning() {
        let diag = validate_text(
            "version: '3'\nservices:\n  web:\n    image: x\nnetworks:\n  exotic:\n    driver: wireguard\n",
        );
        assert!(diag.is_valid());
        assert!(diag.warnings.iter().any(|w| w.contains("wireguard")));
    }
}
