// crates/sentinel-gate-core/src/core/agent.rs
// ============================================================================
// Module: Sentinel Gate Agent Model
// Description: Registered agent records and their closed vocabularies.
// Purpose: Describe the catalog entries the registry governs.
// Dependencies: serde, thiserror, crate::core::{identifiers, time}
// ============================================================================

//! ## Overview
//! An agent is a registered AI endpoint through which model calls are
//! governed. The vocabularies here are closed enums with stable wire labels;
//! free-form strings only survive at the parse boundary, where they convert
//! into these types or fail with a typed error.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::identifiers::AgentId;
use crate::core::identifiers::PolicyId;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Environment
// ============================================================================

/// Deployment environment tag.
///
/// # Invariants
/// - Variants are stable for serialization and policy-scope matching.
/// - Long-form aliases (`production`, `development`) parse to the same
///   variants as the short labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    /// Development environment.
    #[serde(alias = "development")]
    Dev,
    /// Staging environment.
    Staging,
    /// Production environment.
    #[serde(alias = "production")]
    Prod,
    /// Test environment.
    Test,
}

impl Environment {
    /// Returns the stable label for the environment.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Dev => "dev",
            Self::Staging => "staging",
            Self::Prod => "prod",
            Self::Test => "test",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error produced when an environment label is outside the vocabulary.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid environment: {0:?} (expected dev, staging, prod, or test)")]
pub struct EnvironmentParseError(pub String);

impl FromStr for Environment {
    type Err = EnvironmentParseError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "dev" | "development" => Ok(Self::Dev),
            "staging" => Ok(Self::Staging),
            "prod" | "production" => Ok(Self::Prod),
            "test" => Ok(Self::Test),
            other => Err(EnvironmentParseError(other.to_string())),
        }
    }
}

// ============================================================================
// SECTION: Agent Status
// ============================================================================

/// Lifecycle status of a registered agent.
///
/// # Invariants
/// - Only [`AgentStatus::Active`] agents are executable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    /// Agent may execute requests.
    Active,
    /// Agent is registered but temporarily disabled.
    Inactive,
    /// Agent is suspended pending investigation.
    Suspended,
    /// Agent is permanently retired; kept for audit references.
    Decommissioned,
}

impl AgentStatus {
    /// Returns the stable label for the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Suspended => "suspended",
            Self::Decommissioned => "decommissioned",
        }
    }
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Risk Level
// ============================================================================

/// Risk classification for a registered agent.
///
/// # Invariants
/// - The derived ordering (`Low < Medium < High < Critical`) is relied on by
///   escalation-rule thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    /// Low risk.
    Low,
    /// Medium risk.
    Medium,
    /// High risk.
    High,
    /// Critical risk.
    Critical,
}

impl RiskLevel {
    /// Returns the stable label for the risk level.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error produced when a risk-level label is outside the vocabulary.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid risk level: {0:?} (expected low, medium, high, or critical)")]
pub struct RiskLevelParseError(pub String);

impl FromStr for RiskLevel {
    type Err = RiskLevelParseError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "critical" => Ok(Self::Critical),
            other => Err(RiskLevelParseError(other.to_string())),
        }
    }
}

// ============================================================================
// SECTION: Agent Record
// ============================================================================

/// Registered agent record.
///
/// # Invariants
/// - `id`, `created_at`, and `created_by` never change after registration.
/// - An agent in any non-active status is not executable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    /// Identifier derived from the agent name.
    pub id: AgentId,
    /// Human-readable display name.
    pub name: String,
    /// Model descriptor the agent fronts.
    pub model: String,
    /// Deployment environment tag.
    pub environment: Environment,
    /// Lifecycle status.
    pub status: AgentStatus,
    /// Risk classification.
    pub risk_level: RiskLevel,
    /// Ordered list of policy identifiers attached to the agent.
    pub policies: Vec<PolicyId>,
    /// Optional request-rate cap in requests per minute.
    pub rate_limit_per_minute: Option<u32>,
    /// Optional advisory cost cap in cents.
    pub cost_cap_cents: Option<u64>,
    /// Free-form metadata mapping.
    pub metadata: BTreeMap<String, String>,
    /// Registration timestamp.
    pub created_at: Timestamp,
    /// Last mutation timestamp.
    pub updated_at: Timestamp,
    /// Identity that registered the agent.
    pub created_by: Option<String>,
    /// Agent definition version.
    pub version: String,
}

impl Agent {
    /// Returns whether the agent may execute requests.
    #[must_use]
    pub fn is_executable(&self) -> bool {
        self.status == AgentStatus::Active
    }
}

// ============================================================================
// SECTION: Agent Patch
// ============================================================================

/// Field-wise update for a registered agent.
///
/// # Invariants
/// - Absent fields leave the corresponding agent field unchanged.
/// - `id`, `created_at`, and `created_by` are not representable here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentPatch {
    /// Replacement display name.
    pub name: Option<String>,
    /// Replacement model descriptor.
    pub model: Option<String>,
    /// Replacement environment tag.
    pub environment: Option<Environment>,
    /// Replacement lifecycle status.
    pub status: Option<AgentStatus>,
    /// Replacement risk classification.
    pub risk_level: Option<RiskLevel>,
    /// Replacement policy attachment list.
    pub policies: Option<Vec<PolicyId>>,
    /// Replacement rate cap; `Some(None)` clears the cap.
    pub rate_limit_per_minute: Option<Option<u32>>,
    /// Replacement cost cap; `Some(None)` clears the cap.
    pub cost_cap_cents: Option<Option<u64>>,
    /// Replacement metadata mapping.
    pub metadata: Option<BTreeMap<String, String>>,
}
