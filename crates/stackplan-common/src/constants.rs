//! Planner-wide constants and default values.

/// Profile assumed when the caller requests no activation profiles.
pub const DEFAULT_PROFILE: &str = "default";

/// Name of the network synthesized when profile filtering removes every
/// declared network but services remain.
pub const DEFAULT_NETWORK: &str = "default";

/// Driver assigned to the synthesized fallback network.
pub const DEFAULT_NETWORK_DRIVER: &str = "bridge";

/// Network drivers considered common; anything else draws a warning.
pub const COMMON_NETWORK_DRIVERS: &[&str] = &["bridge", "host", "overlay", "macvlan", "none"];

/// Compose file major versions the validator recognizes.
pub const SUPPORTED_COMPOSE_VERSIONS: &[&str] = &["2", "3"];

/// Wait timeout for a `service_started` dependency, in milliseconds.
pub const STARTED_TIMEOUT_MS: u64 = 30_000;

/// Wait timeout for a `service_healthy` dependency, in milliseconds.
pub const HEALTHY_TIMEOUT_MS: u64 = 60_000;

/// Wait timeout for a `service_completed_successfully` dependency, in milliseconds.
pub const COMPLETED_TIMEOUT_MS: u64 = 120_000;

/// Application name used in CLI output.
pub const APP_NAME: &str = "stackplan";

/// Binary name for the CLI.
pub const BIN_NAME: &str = "stackplan";
