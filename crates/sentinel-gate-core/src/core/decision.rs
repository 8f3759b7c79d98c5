// crates/sentinel-gate-core/src/core/decision.rs
// ============================================================================
// Module: Sentinel Gate Decision Model
// Description: Canonical policy decision output.
// Purpose: Represent the one unambiguous answer every evaluation produces.
// Dependencies: serde, crate::core::identifiers
// ============================================================================

//! ## Overview
//! Every policy evaluation produces exactly one of three outcomes. The
//! decision carries the ordered list of policies that matched on the way to
//! the outcome and a human-readable reason. There is no "maybe" and no
//! partially-evaluated state.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::PolicyId;

// ============================================================================
// SECTION: Decision Outcome
// ============================================================================

/// Canonical decision outcomes.
///
/// # Invariants
/// - Exactly one of three values; no other outcome is representable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionOutcome {
    /// Proceed automatically.
    Allow,
    /// Block immediately.
    Deny,
    /// Pause and require human approval.
    Review,
}

impl DecisionOutcome {
    /// Returns the stable label for the outcome.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Allow => "ALLOW",
            Self::Deny => "DENY",
            Self::Review => "REVIEW",
        }
    }
}

impl fmt::Display for DecisionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Decision
// ============================================================================

/// Output of one policy evaluation.
///
/// # Invariants
/// - `reason` is non-empty; the constructors guarantee it.
/// - `matched_policies` preserves evaluation order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    /// The canonical outcome.
    pub outcome: DecisionOutcome,
    /// Policies that matched, in evaluation order.
    pub matched_policies: Vec<PolicyId>,
    /// Human-readable explanation for the outcome.
    pub reason: String,
}

impl Decision {
    /// Creates an allow decision.
    #[must_use]
    pub fn allow(matched_policies: Vec<PolicyId>, reason: impl Into<String>) -> Self {
        Self::with_outcome(DecisionOutcome::Allow, matched_policies, reason)
    }

    /// Creates a deny decision.
    #[must_use]
    pub fn deny(matched_policies: Vec<PolicyId>, reason: impl Into<String>) -> Self {
        Self::with_outcome(DecisionOutcome::Deny, matched_policies, reason)
    }

    /// Creates a review decision.
    #[must_use]
    pub fn review(matched_policies: Vec<PolicyId>, reason: impl Into<String>) -> Self {
        Self::with_outcome(DecisionOutcome::Review, matched_policies, reason)
    }

    /// Creates a decision, substituting a placeholder for an empty reason.
    fn with_outcome(
        outcome: DecisionOutcome,
        matched_policies: Vec<PolicyId>,
        reason: impl Into<String>,
    ) -> Self {
        let reason = reason.into();
        let reason = if reason.is_empty() {
            "No reason recorded".to_string()
        } else {
            reason
        };
        Self {
            outcome,
            matched_policies,
            reason,
        }
    }

    /// Returns the identifier of the policy that settled the outcome.
    ///
    /// This is the last matched policy for deny and review outcomes, and
    /// `None` for fall-through allows.
    #[must_use]
    pub fn deciding_policy(&self) -> Option<&PolicyId> {
        match self.outcome {
            DecisionOutcome::Allow => None,
            DecisionOutcome::Deny | DecisionOutcome::Review => self.matched_policies.last(),
        }
    }
}
