//! # stackplan-compose
//!
//! Compose deployment planner.
//!
//! Turns a raw compose document into an ordered, fully translated
//! [`plan::DeploymentPlan`] ready for submission to a container engine:
//!
//! - **Document**: generic YAML tree model and the typed compose decode.
//! - **Subst**: `${VAR}` environment-variable substitution over the tree.
//! - **Validate**: structural invariants (naming, references, port syntax).
//! - **Profiles**: activation-profile resolution and service filtering.
//! - **Graph**: `depends_on` parsing, cycle detection, topological batching.
//! - **Translate**: compose constructs to engine-ready argument shapes.
//! - **Plan**: the assembler composing all of the above.

pub mod document;
pub mod graph;
pub mod plan;
pub mod profiles;
pub mod subst;
pub mod translate;
pub mod validate;
