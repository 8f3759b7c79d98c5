// crates/sentinel-gate-core/tests/approval_workflow.rs
// ============================================================================
// Module: Approval Workflow Tests
// Description: Review state machine, idempotency, timeouts, and escalation.
// ============================================================================

//! ## Overview
//! Exercises the approval state machine: authorized approve and reject with
//! rationale rules, idempotent terminal transitions, the idempotent timeout
//! sweep for each timeout action, and in-place escalation with a stable
//! approval id.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

mod common;

use common::Harness;
use common::harness;
use sentinel_gate_core::RiskLevel;
use sentinel_gate_core::core::AuditEventType;
use sentinel_gate_core::core::identifiers::AgentId;
use sentinel_gate_core::core::identifiers::ExecutionId;
use sentinel_gate_core::core::identifiers::WorkflowId;
use sentinel_gate_core::runtime::approval::ApprovalError;
use sentinel_gate_core::runtime::approval::ApprovalOutcome;
use sentinel_gate_core::runtime::approval::ApprovalRequest;
use sentinel_gate_core::runtime::approval::ApprovalStatus;
use sentinel_gate_core::runtime::approval::ApprovalWorkflow;
use sentinel_gate_core::runtime::approval::EscalationLevel;
use sentinel_gate_core::runtime::approval::EscalationRule;
use sentinel_gate_core::runtime::approval::TimeoutAction;
use sentinel_gate_core::runtime::audit::AuditFilter;

/// Enrolls one pending approval under the given workflow.
fn enroll(harness: &Harness, workflow: &str) -> ApprovalRequest {
    harness
        .approvals
        .request_approval(
            ExecutionId::new("exec-1"),
            AgentId::from_slug("support-bot"),
            "summarize customer record",
            "Review required by policy prod_pii",
            Some("alice".to_string()),
            None,
            Some(RiskLevel::High),
            &WorkflowId::new(workflow),
        )
        .expect("enroll")
}

/// Workflow whose timeout escalates to admins once.
fn escalating_workflow() -> ApprovalWorkflow {
    ApprovalWorkflow {
        id: WorkflowId::new("escalating"),
        name: "Escalating".to_string(),
        description: "Escalates to admins on timeout".to_string(),
        approver_roles: vec!["approver".to_string()],
        required_approvals: 1,
        timeout_seconds: 600,
        timeout_action: TimeoutAction::Escalate,
        escalation_rules: vec![EscalationRule {
            rule_id: "timeout-to-admin".to_string(),
            description: "Escalate to admins after the window".to_string(),
            timeout_seconds: Some(600),
            rejection_count: None,
            risk_level_threshold: None,
            escalate_to_level: EscalationLevel::L2,
            escalate_to_roles: vec!["admin".to_string()],
            max_attempts: 1,
        }],
        require_rationale: false,
    }
}

#[test]
fn enrollment_is_pending_and_context_carries_review_terms() {
    let harness = harness();
    let approval = enroll(&harness, "standard");
    assert_eq!(approval.status, ApprovalStatus::Pending);
    assert_eq!(approval.context.get("timeout_seconds").map(String::as_str), Some("3600"));
    assert_eq!(approval.context.get("risk_level").map(String::as_str), Some("high"));
    let requested = harness.audit.query(
        &AuditFilter {
            event_type: Some(AuditEventType::ApprovalRequested),
            ..AuditFilter::default()
        },
        10,
    );
    assert_eq!(requested.len(), 1);
}

#[test]
fn authorized_approval_finalizes_with_record() {
    let harness = harness();
    let approval = enroll(&harness, "standard");
    let record = harness
        .approvals
        .approve(&approval.approval_id, "bob", "approver", Some("reviewed"), None)
        .expect("approve");
    assert_eq!(record.outcome, ApprovalOutcome::Approved);
    assert_eq!(record.decided_by, "bob");
    let resolved = harness.approvals.get(&approval.approval_id).expect("approval");
    assert_eq!(resolved.status, ApprovalStatus::Approved);
    assert_eq!(resolved.reviewer.as_deref(), Some("bob"));
    assert!(resolved.reviewed_at.is_some());
}

#[test]
fn unauthorized_role_is_rejected() {
    let harness = harness();
    let approval = enroll(&harness, "standard");
    let error = harness
        .approvals
        .approve(&approval.approval_id, "eve", "developer", Some("lgtm"), None)
        .expect_err("must reject");
    assert!(matches!(error, ApprovalError::NotAuthorized { role, .. } if role == "developer"));
    let still_pending = harness.approvals.get(&approval.approval_id).expect("approval");
    assert_eq!(still_pending.status, ApprovalStatus::Pending);
}

#[test]
fn missing_rationale_is_rejected_when_required() {
    let harness = harness();
    let approval = enroll(&harness, "standard");
    assert!(matches!(
        harness
            .approvals
            .approve(&approval.approval_id, "bob", "approver", None, None),
        Err(ApprovalError::MissingRationale)
    ));
    assert!(matches!(
        harness
            .approvals
            .reject(&approval.approval_id, "bob", "approver", Some(""), None),
        Err(ApprovalError::MissingRationale)
    ));
}

#[test]
fn second_approve_is_idempotent_and_returns_the_same_record() {
    let harness = harness();
    let approval = enroll(&harness, "standard");
    let first = harness
        .approvals
        .approve(&approval.approval_id, "bob", "approver", Some("reviewed"), None)
        .expect("approve");
    let second = harness
        .approvals
        .approve(&approval.approval_id, "carol", "admin", Some("again"), None)
        .expect("idempotent approve");
    assert_eq!(first.record_id, second.record_id);
    assert_eq!(second.decided_by, "bob");
    assert_eq!(harness.approvals.decision_history(&approval.approval_id).len(), 1);
}

#[test]
fn reject_after_approve_returns_the_approval_record() {
    let harness = harness();
    let approval = enroll(&harness, "standard");
    let approved = harness
        .approvals
        .approve(&approval.approval_id, "bob", "approver", Some("reviewed"), None)
        .expect("approve");
    let rejected = harness
        .approvals
        .reject(&approval.approval_id, "carol", "admin", Some("no"), None)
        .expect("idempotent reject");
    assert_eq!(approved.record_id, rejected.record_id);
    assert_eq!(rejected.outcome, ApprovalOutcome::Approved);
}

#[test]
fn unknown_approval_is_not_found() {
    let harness = harness();
    assert!(matches!(
        harness.approvals.approve(
            &sentinel_gate_core::core::identifiers::ApprovalId::new("approval-ghost"),
            "bob",
            "approver",
            Some("reviewed"),
            None,
        ),
        Err(ApprovalError::NotFound(_))
    ));
}

#[test]
fn pending_queue_is_fifo_with_limit() {
    let harness = harness();
    let first = enroll(&harness, "standard");
    harness.clock.advance_secs(1);
    let second = enroll(&harness, "standard");
    harness.clock.advance_secs(1);
    let third = enroll(&harness, "standard");
    let pending = harness.approvals.get_pending(2);
    assert_eq!(pending.len(), 2);
    assert_eq!(pending[0].approval_id, first.approval_id);
    assert_eq!(pending[1].approval_id, second.approval_id);
    assert_eq!(harness.approvals.get_pending(10).len(), 3);
    assert_eq!(
        harness.approvals.get_pending(10)[2].approval_id,
        third.approval_id
    );
}

#[test]
fn timeout_reject_finalizes_once_and_sweep_is_idempotent() {
    let harness = harness();
    let approval = enroll(&harness, "standard");
    assert!(harness.approvals.check_timeouts().is_empty());

    harness.clock.advance_secs(3_601);
    let handled = harness.approvals.check_timeouts();
    assert_eq!(handled.len(), 1);
    assert_eq!(handled[0].action, TimeoutAction::Reject);
    assert!(!handled[0].escalated);
    let resolved = harness.approvals.get(&approval.approval_id).expect("approval");
    assert_eq!(resolved.status, ApprovalStatus::Timeout);
    assert_eq!(resolved.reviewer.as_deref(), Some("system"));

    let again = harness.approvals.check_timeouts();
    assert!(again.is_empty(), "second sweep after the same clock is a no-op");
    assert_eq!(harness.approvals.decision_history(&approval.approval_id).len(), 1);
}

#[test]
fn timeout_approve_action_auto_approves_as_system() {
    let harness = harness();
    let mut workflow = common::standard_workflow();
    workflow.id = WorkflowId::new("auto-approve");
    workflow.timeout_seconds = 60;
    workflow.timeout_action = TimeoutAction::Approve;
    harness.approvals.add_workflow(workflow);
    let approval = enroll(&harness, "auto-approve");
    harness.clock.advance_secs(61);
    let handled = harness.approvals.check_timeouts();
    assert_eq!(handled.len(), 1);
    let resolved = harness.approvals.get(&approval.approval_id).expect("approval");
    assert_eq!(resolved.status, ApprovalStatus::Approved);
    assert_eq!(resolved.reviewer.as_deref(), Some("system"));
    let history = harness.approvals.decision_history(&approval.approval_id);
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].outcome, ApprovalOutcome::Approved);
}

#[test]
fn timeout_escalation_re_enqueues_with_new_roles_and_same_id() {
    let harness = harness();
    harness.approvals.add_workflow(escalating_workflow());
    let approval = enroll(&harness, "escalating");

    harness.clock.advance_secs(601);
    let handled = harness.approvals.check_timeouts();
    assert_eq!(handled.len(), 1);
    assert!(handled[0].escalated);

    let escalated = harness.approvals.get(&approval.approval_id).expect("approval");
    assert_eq!(escalated.status, ApprovalStatus::Pending, "still pending after escalation");
    assert_eq!(escalated.escalation_attempts, 1);
    assert_eq!(
        escalated.approver_roles_override.as_deref(),
        Some(&["admin".to_string()][..])
    );

    let error = harness
        .approvals
        .approve(&approval.approval_id, "bob", "approver", Some("late"), None)
        .expect_err("original approver role no longer accepted");
    assert!(matches!(error, ApprovalError::NotAuthorized { .. }));
    harness
        .approvals
        .approve(&approval.approval_id, "carol", "admin", Some("escalated review"), None)
        .expect("admin approves after escalation");
}

#[test]
fn escalation_attempt_cap_falls_back_to_timeout() {
    let harness = harness();
    harness.approvals.add_workflow(escalating_workflow());
    let approval = enroll(&harness, "escalating");

    harness.clock.advance_secs(601);
    assert!(harness.approvals.check_timeouts()[0].escalated);

    harness.clock.advance_secs(601);
    let second = harness.approvals.check_timeouts();
    assert_eq!(second.len(), 1);
    assert!(!second[0].escalated, "attempt cap reached, falls back to reject");
    let resolved = harness.approvals.get(&approval.approval_id).expect("approval");
    assert_eq!(resolved.status, ApprovalStatus::Timeout);
}

#[test]
fn cancel_finalizes_a_pending_approval() {
    let harness = harness();
    let approval = enroll(&harness, "standard");
    let record = harness
        .approvals
        .cancel(&approval.approval_id, "ops", Some("superseded"))
        .expect("cancel");
    assert_eq!(record.outcome, ApprovalOutcome::Cancelled);
    let resolved = harness.approvals.get(&approval.approval_id).expect("approval");
    assert_eq!(resolved.status, ApprovalStatus::Cancelled);
}

#[test]
fn decision_records_carry_prior_decisions() {
    let harness = harness();
    harness.approvals.add_workflow(escalating_workflow());
    let approval = enroll(&harness, "escalating");
    harness.clock.advance_secs(601);
    assert!(harness.approvals.check_timeouts()[0].escalated);
    let record = harness
        .approvals
        .approve(&approval.approval_id, "carol", "admin", Some("after escalation"), None)
        .expect("approve");
    assert_eq!(record.previous_decisions.len(), 1);
    assert_eq!(record.previous_decisions[0].outcome, ApprovalOutcome::Escalated);
}

#[test]
fn statistics_track_every_terminal_state() {
    let harness = harness();
    let approved = enroll(&harness, "standard");
    let rejected = enroll(&harness, "standard");
    enroll(&harness, "standard");
    harness
        .approvals
        .approve(&approved.approval_id, "bob", "approver", Some("ok"), None)
        .expect("approve");
    harness
        .approvals
        .reject(&rejected.approval_id, "bob", "approver", Some("no"), None)
        .expect("reject");
    let stats = harness.approvals.statistics();
    assert_eq!(stats.total, 3);
    assert_eq!(stats.pending, 1);
    assert_eq!(stats.approved, 1);
    assert_eq!(stats.rejected, 1);
    assert_eq!(stats.decision_records, 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn background_sweeper_finalizes_expired_approvals() {
    let harness = harness();
    let approval = enroll(&harness, "standard");
    harness.clock.advance_secs(3_601);
    let handle = sentinel_gate_core::runtime::approval::spawn_timeout_sweeper(
        std::sync::Arc::clone(&harness.approvals),
        std::time::Duration::from_millis(10),
    );
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    handle.abort();
    let resolved = harness.approvals.get(&approval.approval_id).expect("approval");
    assert_eq!(resolved.status, ApprovalStatus::Timeout);
    assert_eq!(
        harness.approvals.decision_history(&approval.approval_id).len(),
        1,
        "repeated background sweeps finalize exactly once"
    );
}

#[test]
fn terminal_transitions_append_audit_entries() {
    let harness = harness();
    let approval = enroll(&harness, "standard");
    harness
        .approvals
        .approve(&approval.approval_id, "bob", "approver", Some("reviewed"), None)
        .expect("approve");
    let approved_events = harness.audit.query(
        &AuditFilter {
            event_type: Some(AuditEventType::ApprovalApproved),
            ..AuditFilter::default()
        },
        10,
    );
    assert_eq!(approved_events.len(), 1);
    assert!(harness.audit.verify_integrity().valid);
}
