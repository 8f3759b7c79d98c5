// crates/sentinel-gate-config/src/config.rs
// ============================================================================
// Module: Sentinel Gate Runtime Configuration
// Description: TOML configuration for the control plane.
// Purpose: Give operators one validated file for secrets, thresholds, and
// cadences.
// Dependencies: serde, thiserror, toml, sentinel-gate-core
// ============================================================================

//! ## Overview
//! The configuration carries the audit secret, circuit-breaker thresholds,
//! the approval sweep cadence, the enforce-mode toggle, and the policy
//! directory. The audit secret is required: the control plane refuses to
//! start without one, because an unsigned audit trail cannot keep the
//! product promise.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use sentinel_gate_core::hashing::HashError;
use sentinel_gate_core::hashing::SigningSecret;
use sentinel_gate_core::runtime::enforcer::CircuitBreakerConfig;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors produced while loading configuration.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config {path}: {source}")]
    Read {
        /// Path that failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The configuration file failed to parse.
    #[error("failed to parse config: {0}")]
    Parse(String),
    /// The audit secret is missing or empty.
    #[error("audit.secret is required and must not be empty")]
    MissingAuditSecret,
}

// ============================================================================
// SECTION: Sections
// ============================================================================

/// `[policy_engine]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyEngineSection {
    /// Directory policies are loaded from; absent means an empty set.
    #[serde(default)]
    pub directory: Option<PathBuf>,
}

/// `[audit]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditSection {
    /// HMAC secret for audit signatures; required.
    #[serde(default)]
    pub secret: String,
}

/// `[circuit_breaker]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitBreakerSection {
    /// Consecutive failures before the circuit opens.
    #[serde(default = "CircuitBreakerSection::default_failure_threshold")]
    pub failure_threshold: u32,
    /// Consecutive half-open successes before the circuit closes.
    #[serde(default = "CircuitBreakerSection::default_success_threshold")]
    pub success_threshold: u32,
    /// Seconds before a recovery probe is admitted.
    #[serde(default = "CircuitBreakerSection::default_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl CircuitBreakerSection {
    /// Default failure threshold.
    const fn default_failure_threshold() -> u32 {
        5
    }

    /// Default success threshold.
    const fn default_success_threshold() -> u32 {
        2
    }

    /// Default recovery timeout.
    const fn default_timeout_seconds() -> u64 {
        60
    }
}

impl Default for CircuitBreakerSection {
    fn default() -> Self {
        Self {
            failure_threshold: Self::default_failure_threshold(),
            success_threshold: Self::default_success_threshold(),
            timeout_seconds: Self::default_timeout_seconds(),
        }
    }
}

/// `[approval]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalSection {
    /// Timeout-sweeper cadence in seconds.
    #[serde(default = "ApprovalSection::default_sweep_interval_seconds")]
    pub sweep_interval_seconds: u64,
}

impl ApprovalSection {
    /// Default sweep cadence.
    const fn default_sweep_interval_seconds() -> u64 {
        30
    }
}

impl Default for ApprovalSection {
    fn default() -> Self {
        Self {
            sweep_interval_seconds: Self::default_sweep_interval_seconds(),
        }
    }
}

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Validated control-plane configuration.
///
/// # Invariants
/// - `audit.secret` is non-empty once validation passes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlPlaneConfig {
    /// Whether fail-closed blocking is enforced.
    #[serde(default = "ControlPlaneConfig::default_enforce_mode")]
    pub enforce_mode: bool,
    /// Policy-engine settings.
    #[serde(default)]
    pub policy_engine: PolicyEngineSection,
    /// Audit settings.
    #[serde(default)]
    pub audit: AuditSection,
    /// Circuit-breaker settings.
    #[serde(default)]
    pub circuit_breaker: CircuitBreakerSection,
    /// Approval settings.
    #[serde(default)]
    pub approval: ApprovalSection,
}

impl ControlPlaneConfig {
    /// Enforcement is on unless declared otherwise.
    const fn default_enforce_mode() -> bool {
        true
    }

    /// Loads and validates configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when the file cannot be read or parsed, or
    /// when validation fails.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&raw)
    }

    /// Parses and validates configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when parsing or validation fails.
    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(raw).map_err(|error| ConfigError::Parse(error.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingAuditSecret`] when the audit secret is
    /// empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.audit.secret.is_empty() {
            return Err(ConfigError::MissingAuditSecret);
        }
        Ok(())
    }

    /// Produces the signing secret for the audit trail.
    ///
    /// # Errors
    ///
    /// Returns a [`HashError`] when the secret is empty; [`Self::validate`]
    /// rules this out for loaded configurations.
    pub fn signing_secret(&self) -> Result<SigningSecret, HashError> {
        SigningSecret::new(self.audit.secret.as_bytes())
    }

    /// Produces the circuit-breaker configuration.
    #[must_use]
    pub const fn circuit_breaker_config(&self) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: self.circuit_breaker.failure_threshold,
            success_threshold: self.circuit_breaker.success_threshold,
            timeout_seconds: self.circuit_breaker.timeout_seconds,
        }
    }

    /// Produces the sweep interval as a duration.
    #[must_use]
    pub const fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.approval.sweep_interval_seconds)
    }
}

impl Default for ControlPlaneConfig {
    fn default() -> Self {
        Self {
            enforce_mode: true,
            policy_engine: PolicyEngineSection::default(),
            audit: AuditSection::default(),
            circuit_breaker: CircuitBreakerSection::default(),
            approval: ApprovalSection::default(),
        }
    }
}
