// crates/sentinel-gate-core/src/core/policy.rs
// ============================================================================
// Module: Sentinel Gate Policy Model
// Description: Declarative policy records with scope, conditions, and effect.
// Purpose: Describe the rules the deterministic engine evaluates.
// Dependencies: serde, thiserror, crate::core::{agent, identifiers}
// ============================================================================

//! ## Overview
//! Policies are declarative configuration, not executable code. A policy
//! names what it applies to (scope), when it triggers (conditions), what
//! happens (effect), and how conflicts resolve (priority). Policies are
//! immutable for the duration of an evaluation; hot reload swaps the whole
//! set atomically through [`crate::runtime::engine::PolicySet`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use thiserror::Error;

use crate::core::agent::Environment;
use crate::core::identifiers::PolicyId;

// ============================================================================
// SECTION: Policy Effect
// ============================================================================

/// Effect a matching policy applies to the request.
///
/// # Invariants
/// - Exactly one of three values; no other outcome is representable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PolicyEffect {
    /// Proceed automatically.
    Allow,
    /// Block immediately.
    Deny,
    /// Pause and require human approval.
    Review,
}

impl PolicyEffect {
    /// Returns the stable label for the effect.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Allow => "ALLOW",
            Self::Deny => "DENY",
            Self::Review => "REVIEW",
        }
    }
}

impl fmt::Display for PolicyEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error produced when an effect label is outside the vocabulary.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid policy effect: {0:?} (expected ALLOW, DENY, or REVIEW)")]
pub struct PolicyEffectParseError(pub String);

impl FromStr for PolicyEffect {
    type Err = PolicyEffectParseError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "ALLOW" => Ok(Self::Allow),
            "DENY" => Ok(Self::Deny),
            "REVIEW" => Ok(Self::Review),
            other => Err(PolicyEffectParseError(other.to_string())),
        }
    }
}

// ============================================================================
// SECTION: Policy Scope
// ============================================================================

/// What a policy applies to.
///
/// # Invariants
/// - An absent facet matches every value of that facet.
/// - An empty scope matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyScope {
    /// Environments the policy applies to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<BTreeSet<Environment>>,
    /// Resource types the policy applies to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<BTreeSet<String>>,
    /// Actor roles the policy applies to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor_role: Option<BTreeSet<String>>,
}

impl PolicyScope {
    /// Returns whether the scope constrains nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.environment.is_none() && self.resource_type.is_none() && self.actor_role.is_none()
    }
}

// ============================================================================
// SECTION: Policy Conditions
// ============================================================================

/// Deserializes an intent condition given as a single value or a set.
fn intent_one_or_many<'de, D>(deserializer: D) -> Result<Option<BTreeSet<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    /// Wire forms accepted for the `intent` condition.
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        /// A single intent value.
        One(String),
        /// A set of intent values.
        Many(BTreeSet<String>),
    }

    let parsed = Option::<OneOrMany>::deserialize(deserializer)?;
    Ok(parsed.map(|value| match value {
        OneOrMany::One(intent) => BTreeSet::from([intent]),
        OneOrMany::Many(intents) => intents,
    }))
}

/// When a policy triggers.
///
/// # Invariants
/// - An absent condition always holds.
/// - Empty conditions always trigger.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyConditions {
    /// Tags of which at least one must be present on the request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<BTreeSet<String>>,
    /// Metadata entries that must all match exactly.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<BTreeMap<String, String>>,
    /// Intents of which the request's intent must be one.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "intent_one_or_many"
    )]
    pub intent: Option<BTreeSet<String>>,
}

impl PolicyConditions {
    /// Returns whether the conditions constrain nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.tags.is_none() && self.metadata.is_none() && self.intent.is_none()
    }
}

// ============================================================================
// SECTION: Policy Record
// ============================================================================

/// Declarative policy record.
///
/// # Invariants
/// - `effect` is exactly one of the three canonical values.
/// - Records are immutable once handed to the engine; reloads swap whole
///   sets, never individual policies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    /// Policy identifier.
    pub id: PolicyId,
    /// Policy definition version.
    #[serde(default = "Policy::default_version")]
    pub version: String,
    /// Human-readable description used in decision reasons.
    #[serde(default)]
    pub description: String,
    /// What the policy applies to.
    #[serde(default)]
    pub scope: PolicyScope,
    /// When the policy triggers.
    #[serde(default)]
    pub conditions: PolicyConditions,
    /// Effect applied when the policy matches.
    pub effect: PolicyEffect,
    /// Conflict-resolution priority; higher evaluates first.
    #[serde(default)]
    pub priority: i64,
    /// Whether the policy participates in evaluation.
    #[serde(default = "Policy::default_enabled")]
    pub enabled: bool,
}

impl Policy {
    /// Default version for policies that do not declare one.
    fn default_version() -> String {
        "1.0.0".to_string()
    }

    /// Policies are enabled unless declared otherwise.
    const fn default_enabled() -> bool {
        true
    }
}
