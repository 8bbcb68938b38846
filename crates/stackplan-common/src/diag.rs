//! Two-tier diagnostics: fatal errors and advisory warnings.
//!
//! Every planning stage returns its findings through a [`Diagnostics`] value
//! instead of raising errors. Errors mean the resulting plan must not be
//! executed; warnings mean deployment may proceed but the operator should be
//! told. The assembler concatenates the diagnostics of all stages into one
//! list on the final plan.

use serde::{Deserialize, Serialize};

/// Accumulator for the errors and warnings produced by a planning stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostics {
    /// Fatal findings. A plan carrying any of these must not be executed.
    pub errors: Vec<String>,
    /// Advisory findings. Deployment may proceed; surface these to the operator.
    pub warnings: Vec<String>,
}

impl Diagnostics {
    /// Creates an empty diagnostics set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a fatal error.
    pub fn error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    /// Records an advisory warning.
    pub fn warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    /// Returns `true` if no fatal error has been recorded.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Absorbs another stage's diagnostics, preserving order.
    pub fn merge(&mut self, other: Self) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }
}
