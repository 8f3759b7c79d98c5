// crates/sentinel-gate-core/src/core/error.rs
// ============================================================================
// Module: Sentinel Gate Error Taxonomy
// Description: Crate-level governance error kinds with wire mappings.
// Purpose: Give every refusal a stable kind, status, and safe message.
// Dependencies: thiserror, crate::core::identifiers
// ============================================================================

//! ## Overview
//! Runtime modules define their own focused error enums; this module defines
//! the taxonomy the pipeline surfaces to callers. Every variant carries a
//! stable `error_kind` label and an HTTP status for the external gateway
//! collaborator. Messages never leak evaluation internals: the matched-policy
//! list is an audit-surface fact, not a user-facing one.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::core::identifiers::AgentId;
use crate::core::identifiers::ApprovalId;
use crate::core::identifiers::PolicyId;

// ============================================================================
// SECTION: Governance Errors
// ============================================================================

/// Crate-level governance error taxonomy.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
/// - `error_kind` labels and HTTP statuses never change for a variant.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GovernanceError {
    /// An emergency stop is set for the request's scope.
    #[error("kill switch active ({scope}): {reason}")]
    KillSwitchActive {
        /// Scope label, `global` or `agent`.
        scope: String,
        /// Reason recorded at activation.
        reason: String,
    },
    /// The agent is unknown or not executable.
    #[error("agent not found or inactive: {agent_id}")]
    AgentNotFound {
        /// The agent identifier that failed resolution.
        agent_id: AgentId,
    },
    /// A policy produced a deny decision.
    #[error("policy violation: {reason}")]
    PolicyViolation {
        /// The deciding policy, when one exists.
        policy_id: Option<PolicyId>,
        /// Human-readable reason for the denial.
        reason: String,
    },
    /// A policy produced a review decision; not an error at the wire layer.
    #[error("approval required: {reason}")]
    ApprovalRequired {
        /// The approval the caller can poll.
        approval_id: ApprovalId,
        /// Human-readable reason review is required.
        reason: String,
    },
    /// The reviewer's role is not accepted by the workflow.
    #[error("role {role:?} is not authorized to review (accepted: {required:?})")]
    NotAuthorized {
        /// Role the reviewer presented.
        role: String,
        /// Roles the workflow accepts.
        required: Vec<String>,
    },
    /// The workflow requires a rationale and none was given.
    #[error("rationale is required for this review")]
    MissingRationale,
    /// Audit-chain integrity verification failed.
    #[error("audit trail integrity verification failed ({issues} issues)")]
    AuditTamperDetected {
        /// Number of broken invariants found.
        issues: usize,
    },
    /// The circuit breaker is open.
    #[error("circuit breaker is open; control plane is unavailable")]
    CircuitOpen,
    /// A critical component is unhealthy and enforcement is on.
    #[error("failing closed: {reason}")]
    FailClosed {
        /// Why the request was refused.
        reason: String,
    },
    /// The injected model call failed.
    #[error("execution failed: {reason}")]
    ExecutionFailed {
        /// Sanitized cause of the failure.
        reason: String,
    },
    /// The agent exceeded its configured request-rate cap.
    #[error("rate limit exceeded for agent {agent_id}")]
    RateLimited {
        /// The rate-limited agent.
        agent_id: AgentId,
    },
    /// A kill-switch scope label was outside the vocabulary.
    #[error("invalid scope: {value:?} (expected global or agent)")]
    InvalidScope {
        /// The rejected label.
        value: String,
    },
    /// Agent scope was requested without an agent identifier.
    #[error("agent_id is required for agent-scoped kill switches")]
    MissingAgentId,
    /// A risk-level label was outside the vocabulary.
    #[error("invalid risk level: {value:?}")]
    InvalidRiskLevel {
        /// The rejected label.
        value: String,
    },
    /// An agent with the derived identifier already exists.
    #[error("agent already registered: {agent_id}")]
    DuplicateAgent {
        /// The conflicting identifier.
        agent_id: AgentId,
    },
}

impl GovernanceError {
    /// Returns the stable error-kind label for the variant.
    #[must_use]
    pub const fn error_kind(&self) -> &'static str {
        match self {
            Self::KillSwitchActive { .. } => "kill_switch_active",
            Self::AgentNotFound { .. } => "agent_not_found",
            Self::PolicyViolation { .. } => "policy_violation",
            Self::ApprovalRequired { .. } => "approval_required",
            Self::NotAuthorized { .. } => "not_authorized",
            Self::MissingRationale => "missing_rationale",
            Self::AuditTamperDetected { .. } => "audit_tamper_detected",
            Self::CircuitOpen => "circuit_open",
            Self::FailClosed { .. } => "fail_closed",
            Self::ExecutionFailed { .. } => "execution_failed",
            Self::RateLimited { .. } => "rate_limited",
            Self::InvalidScope { .. } => "invalid_scope",
            Self::MissingAgentId => "missing_agent_id",
            Self::InvalidRiskLevel { .. } => "invalid_risk_level",
            Self::DuplicateAgent { .. } => "duplicate_agent",
        }
    }

    /// Returns the HTTP status the external gateway maps the variant to.
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        match self {
            Self::KillSwitchActive { .. }
            | Self::PolicyViolation { .. }
            | Self::NotAuthorized { .. } => 403,
            Self::AgentNotFound { .. } => 404,
            Self::ApprovalRequired { .. } => 200,
            Self::MissingRationale
            | Self::InvalidScope { .. }
            | Self::MissingAgentId
            | Self::InvalidRiskLevel { .. }
            | Self::DuplicateAgent { .. } => 400,
            Self::RateLimited { .. } => 429,
            Self::ExecutionFailed { .. } => 500,
            Self::AuditTamperDetected { .. } | Self::CircuitOpen | Self::FailClosed { .. } => 503,
        }
    }

    /// Returns whether the caller may retry without operator intervention.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::CircuitOpen | Self::FailClosed { .. } | Self::RateLimited { .. }
        )
    }
}
