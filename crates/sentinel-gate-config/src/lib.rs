// crates/sentinel-gate-config/src/lib.rs
// ============================================================================
// Module: Sentinel Gate Config
// Description: Runtime configuration, policy files, and workflow catalogs.
// Purpose: Load and validate everything the control plane reads from disk.
// Dependencies: sentinel-gate-core, serde, serde_json, serde_yaml, thiserror, toml
// ============================================================================

//! ## Overview
//! Configuration is TOML; policies and workflows are YAML or JSON documents.
//! Loading is idempotent, and a policy reload replaces the whole set
//! atomically through the core policy set. Validation happens at load time:
//! an empty audit secret, an unknown effect, or a malformed document is a
//! load error, never a runtime surprise.

/// Runtime configuration file.
pub mod config;
/// Policy file and directory loading.
pub mod policies;
/// Workflow definitions and the built-in catalog.
pub mod workflows;

pub use config::ConfigError;
pub use config::ControlPlaneConfig;
pub use policies::PolicyLoadError;
pub use policies::load_policies_from_dir;
pub use policies::load_policy_file;
pub use policies::reload_into;
pub use workflows::default_workflows;
pub use workflows::load_workflow_file;
pub use workflows::load_workflows_from_dir;
