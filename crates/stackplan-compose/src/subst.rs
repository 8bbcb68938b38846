//! Environment-variable substitution over the generic tree.
//!
//! Recognized token forms inside string scalars:
//!
//! - `${NAME:-default}` — value if found and non-empty, else `default`.
//! - `${NAME-default}` — value if found (even when empty), else `default`.
//! - `${NAME}` — value if found, else the token is left as-is.
//! - `$NAME` (bare, `[A-Z_][A-Z0-9_]*`) — same fallback-to-literal rule.
//!
//! A malformed `${` without a closing brace matches nothing and passes
//! through untouched. Substitution is a pure function of the input tree and
//! the lookup results.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::document::Node;

static VAR_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(
        r"\$\{(?P<name>[A-Za-z_][A-Za-z0-9_]*)(?:(?P<op>:?-)(?P<default>[^}]*))?\}|\$(?P<bare>[A-Z_][A-Z0-9_]*)",
    )
    .expect("variable token pattern is valid")
});

/// Environment lookup used during substitution.
///
/// `None` means "not found"; `Some("")` means "found, empty" — the two are
/// distinguished by the `${NAME:-d}` / `${NAME-d}` operators.
pub trait Lookup {
    /// Resolves a variable name to its value.
    fn get(&self, name: &str) -> Option<String>;
}

impl<F> Lookup for F
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, name: &str) -> Option<String> {
        self(name)
    }
}

/// Returns a new tree with all variable tokens in string scalars replaced.
///
/// Non-string leaves are returned unchanged; sequences and mappings are
/// descended recursively.
#[must_use]
pub fn substitute(node: &Node, lookup: &dyn Lookup) -> Node {
    match node {
        Node::String(s) => Node::String(substitute_str(s, lookup)),
        Node::Sequence(items) => {
            Node::Sequence(items.iter().map(|n| substitute(n, lookup)).collect())
        }
        Node::Mapping(entries) => Node::Mapping(
            entries
                .iter()
                .map(|(k, v)| (k.clone(), substitute(v, lookup)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Substitutes variable tokens in a single string.
#[must_use]
pub fn substitute_str(input: &str, lookup: &dyn Lookup) -> String {
    VAR_TOKEN
        .replace_all(input, |caps: &Captures<'_>| expand(caps, lookup))
        .into_owned()
}

fn expand(caps: &Captures<'_>, lookup: &dyn Lookup) -> String {
    if let Some(bare) = caps.name("bare") {
        return lookup
            .get(bare.as_str())
            .unwrap_or_else(|| format!("${}", bare.as_str()));
    }

    let name = caps.name("name").map_or("", |m| m.as_str());
    let value = lookup.get(name);

    match (caps.name("op"), value) {
        // ${NAME:-default}: found-and-non-empty wins, default otherwise.
        (Some(op), found) if op.as_str() == ":-" => match found {
            Some(v) if !v.is_empty() => v,
            _ => caps.name("default").map_or("", |m| m.as_str()).to_owned(),
        },
        // ${NAME-default}: found wins even when empty.
        (Some(_), Some(v)) => v,
        (Some(_), None) => caps.name("default").map_or("", |m| m.as_str()).to_owned(),
        // ${NAME}: unset tokens stay literal.
        (None, Some(v)) => v,
        (None, None) => format!("${{{name}}}"),
    }
}
