//! Memory-string parsing and ulimit translation.

use serde::{Deserialize, Serialize};

use crate::document::Node;

/// Parses a compose memory string into bytes.
///
/// The `k`/`m`/`g` suffixes (case-insensitive) multiply by 1024, 1024²,
/// and 1024³; a bare number is raw bytes.
#[must_use]
pub fn parse_memory_bytes(input: &str) -> Option<u64> {
    let input = input.trim();
    let (value, multiplier) = match input.chars().last()? {
        'k' | 'K' => (&input[..input.len() - 1], 1024),
        'm' | 'M' => (&input[..input.len() - 1], 1024 * 1024),
        'g' | 'G' => (&input[..input.len() - 1], 1024 * 1024 * 1024),
        _ => (input, 1),
    };
    let value: u64 = value.trim().parse().ok()?;
    value.checked_mul(multiplier)
}

/// Engine-shaped resource limit for one named resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Ulimit {
    /// Resource name (`nofile`, `nproc`, ...).
    pub name: String,
    /// Soft limit.
    pub soft: i64,
    /// Hard limit.
    pub hard: i64,
}

/// Translates a compose `ulimits` fragment into engine ulimit entries.
///
/// Map form accepts a bare number (soft = hard) or a `{soft, hard}` object
/// with either lower- or upper-case keys. Already-array input (entries
/// carrying their own `name`) passes through unchanged.
#[must_use]
pub fn translate_ulimits(node: Option<&Node>) -> Vec<Ulimit> {
    match node {
        Some(Node::Mapping(entries)) => entries
            .iter()
            .filter_map(|(name, body)| decode_map_entry(name, body))
            .collect(),
        Some(Node::Sequence(items)) => items.iter().filter_map(decode_array_entry).collect(),
        _ => Vec::new(),
    }
}

fn decode_map_entry(name: &str, body: &Node) -> Option<Ulimit> {
    match body {
        Node::Int(n) => Some(Ulimit {
            name: name.to_owned(),
            soft: *n,
            hard: *n,
        }),
        Node::Mapping(_) => {
            let soft = int_field(body, "soft").or_else(|| int_field(body, "Soft"))?;
            let hard = int_field(body, "hard")
                .or_else(|| int_field(body, "Hard"))
                .unwrap_or(soft);
            Some(Ulimit {
                name: name.to_owned(),
                soft,
                hard,
            })
        }
        _ => None,
    }
}

fn decode_array_entry(entry: &Node) -> Option<Ulimit> {
    let name = entry
        .get("name")
        .or_else(|| entry.get("Name"))
        .and_then(Node::scalar_string)?;
    let soft = int_field(entry, "soft").or_else(|| int_field(entry, "Soft"))?;
    let hard = int_field(entry, "hard")
        .or_else(|| int_field(entry, "Hard"))
        .unwrap_or(soft);
    Some(Ulimit { name, soft, hard })
}

fn int_field(node: &Node, key: &str) -> Option<i64> {
    match node.get(key) {
        Some(Node::Int(n)) => Some(*n),
        _ => None,
    }
}
