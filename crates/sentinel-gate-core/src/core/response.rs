// crates/sentinel-gate-core/src/core/response.rs
// ============================================================================
// Module: Sentinel Gate Ingress Envelopes
// Description: Wire-shaped response envelopes for the submission surface.
// Purpose: Let the external HTTP collaborator map pipeline outcomes one-to-one.
// Dependencies: serde, crate::core::{error, identifiers}
// ============================================================================

//! ## Overview
//! The HTTP surface lives outside this workspace; these envelopes define the
//! exact shapes it serializes. Kill-switch and policy blocks share the
//! `blocked` shape, discriminated by `details.error_type`. The matched-policy
//! list is deliberately absent here: block fingerprints expose only
//! `(error_type, policy_id, reason)`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::error::GovernanceError;
use crate::core::identifiers::ApprovalId;
use crate::core::identifiers::ExecutionId;
use crate::core::identifiers::PolicyId;

// ============================================================================
// SECTION: Block Details
// ============================================================================

/// Discriminator payload for blocked responses.
///
/// # Invariants
/// - `error_type` is one of the stable error-kind labels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockDetails {
    /// Stable error-kind label for the block.
    pub error_type: String,
}

// ============================================================================
// SECTION: Submit Response
// ============================================================================

/// Response envelope for the request-submission surface.
///
/// # Invariants
/// - Exactly one of three shapes, discriminated by `status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SubmitResponse {
    /// The request completed and carries the model response.
    Success {
        /// Execution identifier for the request.
        execution_id: ExecutionId,
        /// Model response text.
        response: String,
        /// End-to-end latency in milliseconds.
        latency_ms: u64,
    },
    /// The request was refused before or during execution.
    Blocked {
        /// Execution identifier for the request.
        execution_id: ExecutionId,
        /// Human-readable reason for the refusal.
        reason: String,
        /// The deciding policy, when one exists.
        policy_id: Option<PolicyId>,
        /// Error-kind discriminator.
        details: BlockDetails,
    },
    /// The request is suspended awaiting human approval.
    PendingApproval {
        /// Execution identifier for the request.
        execution_id: ExecutionId,
        /// Approval identifier the caller can poll.
        approval_id: ApprovalId,
        /// Human-readable reason review is required.
        reason: String,
    },
}

impl SubmitResponse {
    /// Builds a success envelope.
    #[must_use]
    pub fn success(execution_id: ExecutionId, response: String, latency_ms: u64) -> Self {
        Self::Success {
            execution_id,
            response,
            latency_ms,
        }
    }

    /// Builds a pending-approval envelope.
    #[must_use]
    pub fn pending_approval(
        execution_id: ExecutionId,
        approval_id: ApprovalId,
        reason: impl Into<String>,
    ) -> Self {
        Self::PendingApproval {
            execution_id,
            approval_id,
            reason: reason.into(),
        }
    }

    /// Builds the envelope for a governance error.
    ///
    /// Review outcomes map to the pending-approval shape; every other kind
    /// maps to the blocked shape with its error-kind discriminator.
    #[must_use]
    pub fn from_error(execution_id: ExecutionId, error: &GovernanceError) -> Self {
        match error {
            GovernanceError::ApprovalRequired {
                approval_id,
                reason,
            } => Self::pending_approval(execution_id, approval_id.clone(), reason.clone()),
            GovernanceError::PolicyViolation {
                policy_id,
                reason,
            } => Self::Blocked {
                execution_id,
                reason: reason.clone(),
                policy_id: policy_id.clone(),
                details: BlockDetails {
                    error_type: error.error_kind().to_string(),
                },
            },
            other => Self::Blocked {
                execution_id,
                reason: other.to_string(),
                policy_id: None,
                details: BlockDetails {
                    error_type: other.error_kind().to_string(),
                },
            },
        }
    }

    /// Returns the HTTP status for the envelope.
    ///
    /// Blocked envelopes derive the status from their error-kind
    /// discriminator; unrecognized kinds default to 403.
    #[must_use]
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Success { .. } | Self::PendingApproval { .. } => 200,
            Self::Blocked { details, .. } => match details.error_type.as_str() {
                "agent_not_found" => 404,
                "missing_rationale" | "invalid_scope" | "missing_agent_id"
                | "invalid_risk_level" | "duplicate_agent" => 400,
                "rate_limited" => 429,
                "execution_failed" => 500,
                "audit_tamper_detected" | "circuit_open" | "fail_closed" => 503,
                _ => 403,
            },
        }
    }
}
