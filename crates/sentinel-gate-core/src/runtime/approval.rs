// crates/sentinel-gate-core/src/runtime/approval.rs
// ============================================================================
// Module: Sentinel Gate Approval Workflow
// Description: Human-in-the-loop review queue, timeouts, and escalation.
// Purpose: Route review decisions to authorized humans and preserve the
// rationale behind every outcome.
// Dependencies: serde, serde_json, thiserror, tokio, crate::core, crate::runtime::audit
// ============================================================================

//! ## Overview
//! Review decisions enroll a pending approval in a FIFO queue. Reviewers
//! whose role the workflow accepts approve or reject with a rationale; every
//! terminal transition produces an immutable decision record and an audit
//! entry. The timeout sweeper is an idempotent periodic scan: an expired
//! approval moves exactly once into its terminal state (or is escalated to
//! new reviewers with a fresh window), no matter how often the sweeper runs.
//!
//! Escalation mutates the existing approval in place. The approval id is
//! stable across escalations so callers polling it never lose the binding
//! to their execution.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::RwLock;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;
use thiserror::Error;

use crate::core::agent::RiskLevel;
use crate::core::event::AuditEventType;
use crate::core::identifiers::AgentId;
use crate::core::identifiers::ApprovalId;
use crate::core::identifiers::ExecutionId;
use crate::core::identifiers::IdMinter;
use crate::core::identifiers::PolicyId;
use crate::core::identifiers::RecordId;
use crate::core::identifiers::WorkflowId;
use crate::core::time::Clock;
use crate::core::time::Timestamp;
use crate::runtime::audit::AuditTrail;

// ============================================================================
// SECTION: Vocabulary
// ============================================================================

/// Lifecycle status of an approval request.
///
/// # Invariants
/// - Terminal states never transition again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    /// Awaiting review.
    Pending,
    /// Granted by a reviewer or by timeout action.
    Approved,
    /// Refused by a reviewer.
    Rejected,
    /// Expired without review.
    Timeout,
    /// Withdrawn by an operator.
    Cancelled,
}

impl ApprovalStatus {
    /// Returns the stable label for the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Timeout => "timeout",
            Self::Cancelled => "cancelled",
        }
    }

    /// Returns whether the status is terminal.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome recorded on a decision record.
///
/// # Invariants
/// - Variants are stable for serialization and export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApprovalOutcome {
    /// The request was approved.
    Approved,
    /// The request was rejected.
    Rejected,
    /// The request expired without review.
    Timeout,
    /// The request was escalated to new reviewers.
    Escalated,
    /// The request was cancelled by an operator.
    Cancelled,
}

impl ApprovalOutcome {
    /// Returns the stable label for the outcome.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
            Self::Timeout => "TIMEOUT",
            Self::Escalated => "ESCALATED",
            Self::Cancelled => "CANCELLED",
        }
    }
}

/// Action taken when an approval expires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeoutAction {
    /// Finalize the approval as timed out; treated as denial downstream.
    Reject,
    /// Auto-approve with reviewer `system`.
    Approve,
    /// Consult escalation rules; fall back to the reject path.
    Escalate,
}

/// Escalation target level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationLevel {
    /// First-level approver.
    L1,
    /// Manager or supervisor.
    L2,
    /// Director or executive.
    L3,
    /// C-level or board.
    L4,
}

// ============================================================================
// SECTION: Workflow Definition
// ============================================================================

/// Rule describing when and where to escalate an approval.
///
/// # Invariants
/// - A rule with no trigger fields never fires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalationRule {
    /// Rule identifier.
    pub rule_id: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Fire when the approval has been pending at least this long.
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
    /// Fire after this many rejections.
    #[serde(default)]
    pub rejection_count: Option<u32>,
    /// Fire when the risk level is at or above this threshold.
    #[serde(default)]
    pub risk_level_threshold: Option<RiskLevel>,
    /// Level the approval escalates to.
    pub escalate_to_level: EscalationLevel,
    /// Roles that review after escalation.
    #[serde(default)]
    pub escalate_to_roles: Vec<String>,
    /// Maximum escalations this rule may perform.
    #[serde(default = "EscalationRule::default_max_attempts")]
    pub max_attempts: u32,
}

impl EscalationRule {
    /// Default escalation attempt cap.
    const fn default_max_attempts() -> u32 {
        3
    }

    /// Returns whether the rule fires for the given approval facts.
    fn fires(
        &self,
        pending_secs: u64,
        rejection_count: u32,
        risk_level: Option<RiskLevel>,
    ) -> bool {
        if let Some(timeout_seconds) = self.timeout_seconds
            && pending_secs >= timeout_seconds
        {
            return true;
        }
        if let Some(required_rejections) = self.rejection_count
            && rejection_count >= required_rejections
        {
            return true;
        }
        if let Some(threshold) = self.risk_level_threshold
            && risk_level.is_some_and(|risk| risk >= threshold)
        {
            return true;
        }
        false
    }
}

/// Approval workflow configuration.
///
/// # Invariants
/// - `approver_roles` is the authorization list; an empty list authorizes
///   nobody.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalWorkflow {
    /// Workflow identifier.
    pub id: WorkflowId,
    /// Human-readable name.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Roles accepted for review.
    pub approver_roles: Vec<String>,
    /// Approvals required to finalize; V1 finalizes on the first.
    #[serde(default = "ApprovalWorkflow::default_required_approvals")]
    pub required_approvals: u32,
    /// Seconds before a pending approval expires.
    pub timeout_seconds: u64,
    /// Action taken on expiry.
    pub timeout_action: TimeoutAction,
    /// Ordered escalation rules; the first firing rule wins.
    #[serde(default)]
    pub escalation_rules: Vec<EscalationRule>,
    /// Whether reviewers must supply a rationale.
    #[serde(default = "ApprovalWorkflow::default_require_rationale")]
    pub require_rationale: bool,
}

impl ApprovalWorkflow {
    /// Default approval count.
    const fn default_required_approvals() -> u32 {
        1
    }

    /// Rationales are required unless declared otherwise.
    const fn default_require_rationale() -> bool {
        true
    }

    /// Returns whether the role may review under this workflow.
    #[must_use]
    pub fn is_authorized(&self, role: &str) -> bool {
        self.approver_roles.iter().any(|accepted| accepted == role)
    }

    /// Returns whether an approval requested at `requested_at` has expired.
    #[must_use]
    pub fn is_expired(&self, requested_at: Timestamp, now: Timestamp) -> bool {
        now.secs_since(requested_at) >= self.timeout_seconds
    }

    /// Returns the first escalation rule that fires, if any.
    #[must_use]
    pub fn should_escalate(
        &self,
        pending_secs: u64,
        rejection_count: u32,
        risk_level: Option<RiskLevel>,
    ) -> Option<&EscalationRule> {
        self.escalation_rules
            .iter()
            .find(|rule| rule.fires(pending_secs, rejection_count, risk_level))
    }
}

// ============================================================================
// SECTION: Approval Records
// ============================================================================

/// One pending or resolved approval request.
///
/// # Invariants
/// - `approval_id` is stable across escalations.
/// - Terminal fields (`reviewed_at`, `reviewer`) are set exactly once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalRequest {
    /// Approval identifier.
    pub approval_id: ApprovalId,
    /// Execution the approval gates.
    pub execution_id: ExecutionId,
    /// Agent requesting approval.
    pub agent_id: AgentId,
    /// Identity that made the original request.
    pub requested_by: Option<String>,
    /// Original prompt under review.
    pub prompt: String,
    /// Why approval is required.
    pub reason: String,
    /// Policy that triggered the review, when any.
    pub policy_id: Option<PolicyId>,
    /// Workflow governing the review.
    pub workflow_id: WorkflowId,
    /// Current status.
    pub status: ApprovalStatus,
    /// When the approval entered (or re-entered, after escalation) the queue.
    pub requested_at: Timestamp,
    /// When the approval was reviewed.
    pub reviewed_at: Option<Timestamp>,
    /// Reviewer identity; `system` for timeout actions.
    pub reviewer: Option<String>,
    /// Optional reviewer comment.
    pub comment: Option<String>,
    /// Risk level carried from the agent, when known.
    pub risk_level: Option<RiskLevel>,
    /// Additional context shown to reviewers; includes the workflow's
    /// timeout and risk level.
    pub context: BTreeMap<String, String>,
    /// Rejections recorded against this approval.
    pub rejection_count: u32,
    /// Escalations performed so far.
    pub escalation_attempts: u32,
    /// Replacement approver roles installed by escalation.
    pub approver_roles_override: Option<Vec<String>>,
}

/// Summary of a prior decision carried on later records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorDecision {
    /// Outcome of the prior decision.
    pub outcome: ApprovalOutcome,
    /// When it was decided.
    pub decided_at: Timestamp,
    /// Who decided it.
    pub decided_by: Option<String>,
}

/// Immutable record of one approval decision.
///
/// # Invariants
/// - Once written, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRecord {
    /// Record identifier.
    pub record_id: RecordId,
    /// Approval the record belongs to.
    pub approval_id: ApprovalId,
    /// Decision outcome.
    pub outcome: ApprovalOutcome,
    /// When the decision was made.
    pub decided_at: Timestamp,
    /// Identity that decided.
    pub decided_by: String,
    /// Role of the deciding identity.
    pub decided_by_role: String,
    /// Rationale for the decision.
    pub rationale: String,
    /// Risk level at decision time, when known.
    pub risk_level: Option<RiskLevel>,
    /// Workflow that governed the decision.
    pub workflow_id: WorkflowId,
    /// Snapshot of the context the reviewer saw.
    pub reviewed_context: BTreeMap<String, String>,
    /// Prior rejections and escalations on the same approval.
    pub previous_decisions: Vec<PriorDecision>,
}

/// Disposition of one expired approval handled by the sweeper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutDisposition {
    /// The expired approval.
    pub approval_id: ApprovalId,
    /// Action the workflow prescribed.
    pub action: TimeoutAction,
    /// Whether the approval was escalated rather than finalized.
    pub escalated: bool,
}

/// Queue statistics for the status surface.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalStatistics {
    /// Total approvals ever enqueued.
    pub total: usize,
    /// Approvals awaiting review.
    pub pending: usize,
    /// Approvals granted.
    pub approved: usize,
    /// Approvals refused.
    pub rejected: usize,
    /// Approvals expired.
    pub timeout: usize,
    /// Approvals cancelled.
    pub cancelled: usize,
    /// Decision records written.
    pub decision_records: usize,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors returned by approval operations.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ApprovalError {
    /// The approval is unknown.
    #[error("approval not found: {0}")]
    NotFound(ApprovalId),
    /// The reviewer's role is not accepted by the workflow.
    #[error("role {role:?} is not authorized to review (accepted: {required:?})")]
    NotAuthorized {
        /// Role the reviewer presented.
        role: String,
        /// Roles currently accepted for this approval.
        required: Vec<String>,
    },
    /// The workflow requires a rationale and none was given.
    #[error("rationale is required for this review")]
    MissingRationale,
    /// The workflow is unknown.
    #[error("workflow not found: {0}")]
    UnknownWorkflow(WorkflowId),
}

// ============================================================================
// SECTION: Approval Service
// ============================================================================

/// Queue interior: FIFO order plus O(1) lookup.
#[derive(Debug, Default)]
struct QueueInner {
    /// Enqueue order.
    order: VecDeque<ApprovalId>,
    /// Approval records by identifier.
    index: BTreeMap<ApprovalId, ApprovalRequest>,
}

/// Human-in-the-loop approval service.
///
/// # Invariants
/// - Approve and reject are idempotent on terminal approvals: repeated calls
///   return the terminal decision record unchanged.
/// - The timeout sweeper moves each expired approval exactly once.
pub struct ApprovalService {
    /// FIFO queue with O(1) lookup.
    queue: Mutex<QueueInner>,
    /// Registered workflows.
    workflows: RwLock<BTreeMap<WorkflowId, ApprovalWorkflow>>,
    /// Decision records per approval, in decision order.
    records: Mutex<BTreeMap<ApprovalId, Vec<DecisionRecord>>>,
    /// Audit trail receiving approval events.
    audit: Arc<AuditTrail>,
    /// Clock for request and review timestamps.
    clock: Arc<dyn Clock>,
    /// Minter for approval and record identifiers.
    minter: Arc<IdMinter>,
}

impl ApprovalService {
    /// Creates a service with no workflows registered.
    #[must_use]
    pub fn new(audit: Arc<AuditTrail>, clock: Arc<dyn Clock>, minter: Arc<IdMinter>) -> Self {
        Self {
            queue: Mutex::new(QueueInner::default()),
            workflows: RwLock::new(BTreeMap::new()),
            records: Mutex::new(BTreeMap::new()),
            audit,
            clock,
            minter,
        }
    }

    /// Registers or replaces a workflow.
    pub fn add_workflow(&self, workflow: ApprovalWorkflow) {
        self.workflows
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(workflow.id.clone(), workflow);
    }

    /// Returns the workflow with the given identifier.
    #[must_use]
    pub fn workflow(&self, id: &WorkflowId) -> Option<ApprovalWorkflow> {
        self.workflows
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    /// Enrolls a review decision as a pending approval.
    ///
    /// The stored context is enriched with the workflow identifier, the
    /// configured timeout, and the risk level so reviewers see the full
    /// review terms.
    ///
    /// # Errors
    ///
    /// Returns [`ApprovalError::UnknownWorkflow`] when the workflow is not
    /// registered.
    #[allow(
        clippy::too_many_arguments,
        reason = "Enrollment binds the full review context in one call."
    )]
    pub fn request_approval(
        &self,
        execution_id: ExecutionId,
        agent_id: AgentId,
        prompt: impl Into<String>,
        reason: impl Into<String>,
        requested_by: Option<String>,
        policy_id: Option<PolicyId>,
        risk_level: Option<RiskLevel>,
        workflow_id: &WorkflowId,
    ) -> Result<ApprovalRequest, ApprovalError> {
        let workflow = self
            .workflow(workflow_id)
            .ok_or_else(|| ApprovalError::UnknownWorkflow(workflow_id.clone()))?;
        let reason = reason.into();
        let mut context = BTreeMap::new();
        context.insert("workflow_id".to_string(), workflow.id.to_string());
        context.insert(
            "timeout_seconds".to_string(),
            workflow.timeout_seconds.to_string(),
        );
        if let Some(risk) = risk_level {
            context.insert("risk_level".to_string(), risk.as_str().to_string());
        }
        let approval = ApprovalRequest {
            approval_id: self.minter.approval_id(),
            execution_id,
            agent_id,
            requested_by,
            prompt: prompt.into(),
            reason: reason.clone(),
            policy_id,
            workflow_id: workflow.id.clone(),
            status: ApprovalStatus::Pending,
            requested_at: self.clock.now(),
            reviewed_at: None,
            reviewer: None,
            comment: None,
            risk_level,
            context,
            rejection_count: 0,
            escalation_attempts: 0,
            approver_roles_override: None,
        };
        {
            let mut queue = self.lock_queue();
            queue.order.push_back(approval.approval_id.clone());
            queue.index.insert(approval.approval_id.clone(), approval.clone());
        }
        self.emit_approval_event(
            AuditEventType::ApprovalRequested,
            &approval,
            json!({
                "reason": reason,
                "workflow_id": approval.workflow_id.as_str(),
                "timeout_seconds": workflow.timeout_seconds,
            }),
        );
        Ok(approval)
    }

    /// Approves a pending request.
    ///
    /// Idempotent on terminal approvals: returns the terminal decision
    /// record unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`ApprovalError::NotFound`] for unknown approvals,
    /// [`ApprovalError::NotAuthorized`] when the role is not accepted, and
    /// [`ApprovalError::MissingRationale`] when the workflow requires a
    /// rationale and none was given.
    pub fn approve(
        &self,
        approval_id: &ApprovalId,
        reviewer: &str,
        reviewer_role: &str,
        rationale: Option<&str>,
        comment: Option<&str>,
    ) -> Result<DecisionRecord, ApprovalError> {
        self.review(
            approval_id,
            reviewer,
            reviewer_role,
            rationale,
            comment,
            ApprovalOutcome::Approved,
        )
    }

    /// Rejects a pending request; symmetric to [`ApprovalService::approve`].
    ///
    /// # Errors
    ///
    /// Same as [`ApprovalService::approve`].
    pub fn reject(
        &self,
        approval_id: &ApprovalId,
        reviewer: &str,
        reviewer_role: &str,
        rationale: Option<&str>,
        comment: Option<&str>,
    ) -> Result<DecisionRecord, ApprovalError> {
        self.review(
            approval_id,
            reviewer,
            reviewer_role,
            rationale,
            comment,
            ApprovalOutcome::Rejected,
        )
    }

    /// Cancels a pending request on behalf of an operator.
    ///
    /// # Errors
    ///
    /// Returns [`ApprovalError::NotFound`] for unknown approvals.
    pub fn cancel(
        &self,
        approval_id: &ApprovalId,
        cancelled_by: &str,
        rationale: Option<&str>,
    ) -> Result<DecisionRecord, ApprovalError> {
        let now = self.clock.now();
        let mut queue = self.lock_queue();
        let approval = queue
            .index
            .get_mut(approval_id)
            .ok_or_else(|| ApprovalError::NotFound(approval_id.clone()))?;
        if approval.status.is_terminal() {
            drop(queue);
            return self.terminal_record(approval_id);
        }
        approval.status = ApprovalStatus::Cancelled;
        approval.reviewed_at = Some(now);
        approval.reviewer = Some(cancelled_by.to_string());
        let snapshot = approval.clone();
        drop(queue);
        let record = self.write_record(
            &snapshot,
            ApprovalOutcome::Cancelled,
            cancelled_by,
            "operator",
            rationale.unwrap_or("Cancelled by operator"),
        );
        self.emit_approval_event(
            AuditEventType::ApprovalCancelled,
            &snapshot,
            json!({ "cancelled_by": cancelled_by }),
        );
        Ok(record)
    }

    /// Shared approve/reject path.
    fn review(
        &self,
        approval_id: &ApprovalId,
        reviewer: &str,
        reviewer_role: &str,
        rationale: Option<&str>,
        comment: Option<&str>,
        outcome: ApprovalOutcome,
    ) -> Result<DecisionRecord, ApprovalError> {
        let now = self.clock.now();
        let mut queue = self.lock_queue();
        let approval = queue
            .index
            .get_mut(approval_id)
            .ok_or_else(|| ApprovalError::NotFound(approval_id.clone()))?;
        if approval.status.is_terminal() {
            drop(queue);
            return self.terminal_record(approval_id);
        }
        let workflow = self
            .workflow(&approval.workflow_id)
            .ok_or_else(|| ApprovalError::UnknownWorkflow(approval.workflow_id.clone()))?;
        let accepted = approval
            .approver_roles_override
            .clone()
            .unwrap_or_else(|| workflow.approver_roles.clone());
        if !accepted.iter().any(|role| role == reviewer_role) {
            return Err(ApprovalError::NotAuthorized {
                role: reviewer_role.to_string(),
                required: accepted,
            });
        }
        if workflow.require_rationale && rationale.is_none_or(str::is_empty) {
            return Err(ApprovalError::MissingRationale);
        }
        let (status, event_type) = match outcome {
            ApprovalOutcome::Approved => (ApprovalStatus::Approved, AuditEventType::ApprovalApproved),
            _ => (ApprovalStatus::Rejected, AuditEventType::ApprovalRejected),
        };
        if status == ApprovalStatus::Rejected {
            approval.rejection_count += 1;
        }
        approval.status = status;
        approval.reviewed_at = Some(now);
        approval.reviewer = Some(reviewer.to_string());
        approval.comment = comment.map(ToString::to_string);
        let snapshot = approval.clone();
        drop(queue);
        let rationale = rationale
            .or(comment)
            .unwrap_or(match outcome {
                ApprovalOutcome::Approved => "Approved",
                _ => "Rejected",
            });
        let record = self.write_record(&snapshot, outcome, reviewer, reviewer_role, rationale);
        self.emit_approval_event(
            event_type,
            &snapshot,
            json!({
                "reviewer": reviewer,
                "reviewer_role": reviewer_role,
                "record_id": record.record_id.as_str(),
            }),
        );
        Ok(record)
    }

    /// Sweeps expired approvals and applies their workflow's timeout action.
    ///
    /// Idempotent: each expired approval is finalized or escalated exactly
    /// once; running the sweep again after the same wall-clock moment has no
    /// additional effect.
    #[must_use]
    pub fn check_timeouts(&self) -> Vec<TimeoutDisposition> {
        let now = self.clock.now();
        let pending = self.get_pending(usize::MAX);
        let mut handled = Vec::new();
        for approval in pending {
            let Some(workflow) = self.workflow(&approval.workflow_id) else {
                continue;
            };
            if !workflow.is_expired(approval.requested_at, now) {
                continue;
            }
            let escalated = match workflow.timeout_action {
                TimeoutAction::Reject => {
                    self.finalize_timeout(&approval.approval_id, now);
                    false
                }
                TimeoutAction::Approve => {
                    self.finalize_auto_approve(&approval.approval_id, now);
                    false
                }
                TimeoutAction::Escalate => self.escalate_or_reject(&approval, &workflow, now),
            };
            handled.push(TimeoutDisposition {
                approval_id: approval.approval_id,
                action: workflow.timeout_action,
                escalated,
            });
        }
        handled
    }

    /// Returns the oldest pending approvals, FIFO.
    #[must_use]
    pub fn get_pending(&self, limit: usize) -> Vec<ApprovalRequest> {
        let queue = self.lock_queue();
        queue
            .order
            .iter()
            .filter_map(|id| queue.index.get(id))
            .filter(|approval| approval.status == ApprovalStatus::Pending)
            .take(limit)
            .cloned()
            .collect()
    }

    /// Returns the approval with the given identifier.
    #[must_use]
    pub fn get(&self, approval_id: &ApprovalId) -> Option<ApprovalRequest> {
        self.lock_queue().index.get(approval_id).cloned()
    }

    /// Returns every decision record for an approval, in decision order.
    #[must_use]
    pub fn decision_history(&self, approval_id: &ApprovalId) -> Vec<DecisionRecord> {
        self.lock_records()
            .get(approval_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Returns queue statistics.
    #[must_use]
    pub fn statistics(&self) -> ApprovalStatistics {
        let queue = self.lock_queue();
        let mut stats = ApprovalStatistics {
            total: queue.index.len(),
            ..ApprovalStatistics::default()
        };
        for approval in queue.index.values() {
            match approval.status {
                ApprovalStatus::Pending => stats.pending += 1,
                ApprovalStatus::Approved => stats.approved += 1,
                ApprovalStatus::Rejected => stats.rejected += 1,
                ApprovalStatus::Timeout => stats.timeout += 1,
                ApprovalStatus::Cancelled => stats.cancelled += 1,
            }
        }
        drop(queue);
        stats.decision_records = self.lock_records().values().map(Vec::len).sum();
        stats
    }

    /// Finalizes an expired approval as timed out.
    fn finalize_timeout(&self, approval_id: &ApprovalId, now: Timestamp) {
        let Some(snapshot) = self.finalize(approval_id, ApprovalStatus::Timeout, now) else {
            return;
        };
        let _ = self.write_record(
            &snapshot,
            ApprovalOutcome::Timeout,
            "system",
            "system",
            "Approval request timed out and was rejected",
        );
        self.emit_approval_event(
            AuditEventType::ApprovalTimeout,
            &snapshot,
            json!({ "action": "reject" }),
        );
    }

    /// Finalizes an expired approval as auto-approved.
    fn finalize_auto_approve(&self, approval_id: &ApprovalId, now: Timestamp) {
        let Some(snapshot) = self.finalize(approval_id, ApprovalStatus::Approved, now) else {
            return;
        };
        let _ = self.write_record(
            &snapshot,
            ApprovalOutcome::Approved,
            "system",
            "system",
            "Approval request timed out and was auto-approved",
        );
        self.emit_approval_event(
            AuditEventType::ApprovalApproved,
            &snapshot,
            json!({ "reviewer": "system", "action": "auto_approve" }),
        );
    }

    /// Escalates an expired approval, or falls back to the reject path.
    fn escalate_or_reject(
        &self,
        approval: &ApprovalRequest,
        workflow: &ApprovalWorkflow,
        now: Timestamp,
    ) -> bool {
        let pending_secs = now.secs_since(approval.requested_at);
        let rule = workflow.should_escalate(
            pending_secs,
            approval.rejection_count,
            approval.risk_level,
        );
        let Some(rule) = rule else {
            self.finalize_timeout(&approval.approval_id, now);
            return false;
        };
        if approval.escalation_attempts >= rule.max_attempts {
            self.finalize_timeout(&approval.approval_id, now);
            return false;
        }
        {
            let mut queue = self.lock_queue();
            let Some(stored) = queue.index.get_mut(&approval.approval_id) else {
                return false;
            };
            if stored.status.is_terminal() {
                return false;
            }
            stored.escalation_attempts += 1;
            stored.requested_at = now;
            stored.approver_roles_override = Some(rule.escalate_to_roles.clone());
        }
        let snapshot = self.get(&approval.approval_id);
        if let Some(snapshot) = snapshot {
            let _ = self.write_record(
                &snapshot,
                ApprovalOutcome::Escalated,
                "system",
                "system",
                &format!("Escalated by rule {}", rule.rule_id),
            );
            self.emit_approval_event(
                AuditEventType::ApprovalEscalated,
                &snapshot,
                json!({
                    "rule_id": rule.rule_id,
                    "escalate_to_roles": rule.escalate_to_roles,
                    "attempt": snapshot.escalation_attempts,
                }),
            );
        }
        true
    }

    /// Marks an approval terminal and returns its snapshot.
    fn finalize(
        &self,
        approval_id: &ApprovalId,
        status: ApprovalStatus,
        now: Timestamp,
    ) -> Option<ApprovalRequest> {
        let mut queue = self.lock_queue();
        let approval = queue.index.get_mut(approval_id)?;
        if approval.status.is_terminal() {
            return None;
        }
        approval.status = status;
        approval.reviewed_at = Some(now);
        approval.reviewer = Some("system".to_string());
        Some(approval.clone())
    }

    /// Returns the terminal decision record for an already-resolved approval.
    fn terminal_record(&self, approval_id: &ApprovalId) -> Result<DecisionRecord, ApprovalError> {
        self.lock_records()
            .get(approval_id)
            .and_then(|records| records.last())
            .cloned()
            .ok_or_else(|| ApprovalError::NotFound(approval_id.clone()))
    }

    /// Writes one decision record, carrying forward prior decisions.
    fn write_record(
        &self,
        approval: &ApprovalRequest,
        outcome: ApprovalOutcome,
        decided_by: &str,
        decided_by_role: &str,
        rationale: &str,
    ) -> DecisionRecord {
        let mut records = self.lock_records();
        let history = records.entry(approval.approval_id.clone()).or_default();
        let previous_decisions = history
            .iter()
            .map(|record| PriorDecision {
                outcome: record.outcome,
                decided_at: record.decided_at,
                decided_by: Some(record.decided_by.clone()),
            })
            .collect();
        let record = DecisionRecord {
            record_id: self.minter.record_id(),
            approval_id: approval.approval_id.clone(),
            outcome,
            decided_at: self.clock.now(),
            decided_by: decided_by.to_string(),
            decided_by_role: decided_by_role.to_string(),
            rationale: rationale.to_string(),
            risk_level: approval.risk_level,
            workflow_id: approval.workflow_id.clone(),
            reviewed_context: approval.context.clone(),
            previous_decisions,
        };
        history.push(record.clone());
        record
    }

    /// Emits an approval event onto the audit trail, best effort.
    fn emit_approval_event(&self, event_type: AuditEventType, approval: &ApprovalRequest, extra: Value) {
        let mut data = Map::new();
        data.insert(
            "approval_id".to_string(),
            Value::String(approval.approval_id.to_string()),
        );
        data.insert("status".to_string(), Value::String(approval.status.to_string()));
        if let Some(policy_id) = &approval.policy_id {
            data.insert("policy_id".to_string(), Value::String(policy_id.to_string()));
        }
        if let Value::Object(extra) = extra {
            data.extend(extra);
        }
        let _ = self.audit.append(
            event_type,
            data,
            Some(&approval.execution_id),
            Some(&approval.agent_id),
            approval.requested_by.as_deref(),
        );
    }

    /// Acquires the queue lock, recovering from a poisoned writer.
    fn lock_queue(&self) -> std::sync::MutexGuard<'_, QueueInner> {
        self.queue.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Acquires the records lock, recovering from a poisoned writer.
    fn lock_records(
        &self,
    ) -> std::sync::MutexGuard<'_, BTreeMap<ApprovalId, Vec<DecisionRecord>>> {
        self.records.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl fmt::Debug for ApprovalService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApprovalService")
            .field("statistics", &self.statistics())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// SECTION: Timeout Sweeper
// ============================================================================

/// Spawns the periodic timeout sweeper.
///
/// The sweep itself is idempotent, so the interval only bounds detection
/// latency; hosts should keep it at or below one tenth of the shortest
/// workflow timeout. The task runs until aborted.
pub fn spawn_timeout_sweeper(
    service: Arc<ApprovalService>,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let _ = service.check_timeouts();
        }
    })
}
