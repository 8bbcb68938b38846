//! Stack `.env` file reader.
//!
//! A thin I/O wrapper around the planner's env-file input: `KEY=VALUE`
//! lines, `#` comments, blank lines, and optional single or double quotes
//! around the value.

use std::collections::BTreeMap;
use std::path::Path;

use stackplan_common::error::{Result, StackplanError};

/// Reads a `.env` file into a key/value map.
///
/// # Errors
///
/// Returns an error if the file cannot be read.
pub fn read(path: &Path) -> Result<BTreeMap<String, String>> {
    let text = std::fs::read_to_string(path).map_err(|source| StackplanError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parse(&text))
}

/// Parses `.env` text into a key/value map.
#[must_use]
pub fn parse(text: &str) -> BTreeMap<String, String> {
    let mut vars = BTreeMap::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        let _ = vars.insert(key.to_owned(), unquote(value.trim()).to_owned());
    }
    vars
}

fn unquote(value: &str) -> &str {
    let stripped = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')));
    stripped.unwrap_or(value)
}
