// crates/sentinel-gate-core/src/core/event.rs
// ============================================================================
// Module: Sentinel Gate Event Vocabulary
// Description: Closed vocabulary of governance event types.
// Purpose: Give audit and observability records stable, typed event labels.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Every audit entry and observability event carries one of these types.
//! Wire labels use the `family.action` form so exported bundles group
//! naturally by prefix; the enum keeps the vocabulary closed at compile time.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Event Types
// ============================================================================

/// Governance event types.
///
/// # Invariants
/// - Variants are stable for serialization, export, and query filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AuditEventType {
    /// A request entered the pipeline.
    #[serde(rename = "request.submitted")]
    RequestSubmitted,
    /// A policy matched during evaluation.
    #[serde(rename = "policy.evaluated")]
    PolicyEvaluated,
    /// A request was blocked before model invocation.
    #[serde(rename = "request.blocked")]
    RequestBlocked,
    /// A request is suspended awaiting human approval.
    #[serde(rename = "request.pending_approval")]
    RequestPendingApproval,
    /// A request completed successfully.
    #[serde(rename = "request.completed")]
    RequestCompleted,
    /// A request failed during model invocation.
    #[serde(rename = "request.failed")]
    RequestFailed,
    /// A human approval was requested.
    #[serde(rename = "approval.requested")]
    ApprovalRequested,
    /// An approval was granted.
    #[serde(rename = "approval.approved")]
    ApprovalApproved,
    /// An approval was rejected.
    #[serde(rename = "approval.rejected")]
    ApprovalRejected,
    /// An approval expired without review.
    #[serde(rename = "approval.timeout")]
    ApprovalTimeout,
    /// An approval was escalated to new reviewers.
    #[serde(rename = "approval.escalated")]
    ApprovalEscalated,
    /// An approval was cancelled by an operator.
    #[serde(rename = "approval.cancelled")]
    ApprovalCancelled,
    /// A kill switch was activated.
    #[serde(rename = "kill_switch.activated")]
    KillSwitchActivated,
    /// A kill switch was deactivated.
    #[serde(rename = "kill_switch.deactivated")]
    KillSwitchDeactivated,
    /// An agent was registered.
    #[serde(rename = "agent.registered")]
    AgentRegistered,
    /// An agent definition was updated.
    #[serde(rename = "agent.updated")]
    AgentUpdated,
    /// A health probe sweep completed.
    #[serde(rename = "health.checked")]
    HealthChecked,
}

impl AuditEventType {
    /// Returns the stable label for the event type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RequestSubmitted => "request.submitted",
            Self::PolicyEvaluated => "policy.evaluated",
            Self::RequestBlocked => "request.blocked",
            Self::RequestPendingApproval => "request.pending_approval",
            Self::RequestCompleted => "request.completed",
            Self::RequestFailed => "request.failed",
            Self::ApprovalRequested => "approval.requested",
            Self::ApprovalApproved => "approval.approved",
            Self::ApprovalRejected => "approval.rejected",
            Self::ApprovalTimeout => "approval.timeout",
            Self::ApprovalEscalated => "approval.escalated",
            Self::ApprovalCancelled => "approval.cancelled",
            Self::KillSwitchActivated => "kill_switch.activated",
            Self::KillSwitchDeactivated => "kill_switch.deactivated",
            Self::AgentRegistered => "agent.registered",
            Self::AgentUpdated => "agent.updated",
            Self::HealthChecked => "health.checked",
        }
    }
}

impl fmt::Display for AuditEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
