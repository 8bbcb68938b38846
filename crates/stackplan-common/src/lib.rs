//! # stackplan-common
//!
//! Shared error types, diagnostics accumulators, and constants used across
//! the Stackplan workspace.
//!
//! This crate is the leaf of the dependency graph — it depends on no other
//! internal crate and provides the foundational primitives that the planner
//! and CLI build upon.

pub mod constants;
pub mod diag;
pub mod error;
