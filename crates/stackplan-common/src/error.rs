//! Unified error types for the Stackplan workspace.
//!
//! The planner itself reports most problems through [`crate::diag::Diagnostics`]
//! rather than error returns; this enum covers the hard failures that occur
//! before a plan can even be assembled (I/O, malformed input handed to a
//! function that has no diagnostics channel).

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum StackplanError {
    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The raw compose text could not be parsed as YAML.
    #[error("YAML parse error: {source}")]
    Yaml {
        /// Underlying YAML parser error.
        #[from]
        source: serde_yaml::Error,
    },

    /// A configuration value is invalid.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the invalid configuration.
        message: String,
    },

    /// A required resource was not found.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Type of the missing resource.
        kind: &'static str,
        /// Identifier of the missing resource.
        id: String,
    },
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, StackplanError>;
