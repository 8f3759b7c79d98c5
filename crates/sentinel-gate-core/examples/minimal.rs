// crates/sentinel-gate-core/examples/minimal.rs
// ============================================================================
// Module: Sentinel Gate Minimal Example
// Description: Minimal end-to-end governed execution using in-memory services.
// Purpose: Demonstrate the allow, review, and kill-switch paths in one run.
// Dependencies: sentinel-gate-core, tokio
// ============================================================================

//! ## Overview
//! Wires the full pipeline with in-memory services and a stub model, then
//! drives three requests: an allowed completion, a review that a human
//! approves and resumes, and a kill-switch block. Finishes by verifying the
//! audit chain.

#![allow(
    clippy::print_stdout,
    clippy::use_debug,
    reason = "Examples communicate through stdout."
)]

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sentinel_gate_core::Agent;
use sentinel_gate_core::AgentRegistry;
use sentinel_gate_core::ApprovalService;
use sentinel_gate_core::AuditTrail;
use sentinel_gate_core::Environment;
use sentinel_gate_core::EventStore;
use sentinel_gate_core::ExecutionOutcome;
use sentinel_gate_core::ExecutionRequest;
use sentinel_gate_core::Executor;
use sentinel_gate_core::IdentityMetadata;
use sentinel_gate_core::KillSwitch;
use sentinel_gate_core::KillSwitchScope;
use sentinel_gate_core::PluginRegistry;
use sentinel_gate_core::Policy;
use sentinel_gate_core::PolicyEffect;
use sentinel_gate_core::PolicySet;
use sentinel_gate_core::RiskLevel;
use sentinel_gate_core::core::Clock;
use sentinel_gate_core::core::IdMinter;
use sentinel_gate_core::core::SystemClock;
use sentinel_gate_core::core::identifiers::PolicyId;
use sentinel_gate_core::core::identifiers::WorkflowId;
use sentinel_gate_core::core::policy::PolicyConditions;
use sentinel_gate_core::core::policy::PolicyScope;
use sentinel_gate_core::hashing::SigningSecret;
use sentinel_gate_core::interfaces::InvokeError;
use sentinel_gate_core::interfaces::ModelInvoker;
use sentinel_gate_core::runtime::FailClosedEnforcer;
use sentinel_gate_core::runtime::approval::ApprovalWorkflow;
use sentinel_gate_core::runtime::approval::TimeoutAction;
use sentinel_gate_core::runtime::enforcer::CircuitBreakerConfig;
use sentinel_gate_core::runtime::registry::NewAgent;
use serde_json::json;

/// Stub model echoing the prompt.
struct EchoModel;

#[async_trait]
impl ModelInvoker for EchoModel {
    async fn invoke(
        &self,
        agent: &Agent,
        prompt: &str,
        _context: &BTreeMap<String, String>,
        _deadline: Duration,
    ) -> Result<String, InvokeError> {
        Ok(format!("[{}] {prompt}", agent.model))
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let minter = Arc::new(IdMinter::new(Arc::clone(&clock)));
    let secret = SigningSecret::new(b"minimal-example-secret")?;
    let audit = Arc::new(AuditTrail::new(secret, Arc::clone(&clock), Arc::clone(&minter)));
    let kill_switch = Arc::new(KillSwitch::new(Arc::clone(&clock)));
    let registry = Arc::new(AgentRegistry::new(Arc::clone(&clock)));
    let approvals = Arc::new(ApprovalService::new(
        Arc::clone(&audit),
        Arc::clone(&clock),
        Arc::clone(&minter),
    ));
    approvals.add_workflow(ApprovalWorkflow {
        id: WorkflowId::new("standard"),
        name: "Standard Approval".to_string(),
        description: "Single approver".to_string(),
        approver_roles: vec!["approver".to_string()],
        required_approvals: 1,
        timeout_seconds: 3_600,
        timeout_action: TimeoutAction::Reject,
        escalation_rules: Vec::new(),
        require_rationale: true,
    });
    let policies = Arc::new(PolicySet::from_policies(vec![Policy {
        id: PolicyId::new("prod_pii_requires_review"),
        version: "1.0.0".to_string(),
        description: "Access to PII in production requires human approval".to_string(),
        scope: PolicyScope {
            environment: Some(std::iter::once(Environment::Prod).collect()),
            resource_type: None,
            actor_role: None,
        },
        conditions: PolicyConditions {
            tags: Some(std::iter::once("pii".to_string()).collect()),
            metadata: None,
            intent: None,
        },
        effect: PolicyEffect::Review,
        priority: 100,
        enabled: true,
    }]));
    let enforcer = Arc::new(FailClosedEnforcer::new(
        CircuitBreakerConfig::default(),
        Arc::clone(&clock),
    ));
    let executor = Executor::builder()
        .kill_switch(Arc::clone(&kill_switch))
        .registry(Arc::clone(&registry))
        .policies(Arc::clone(&policies))
        .audit(Arc::clone(&audit))
        .approvals(Arc::clone(&approvals))
        .enforcer(enforcer)
        .plugins(Arc::new(PluginRegistry::new()))
        .observability(Arc::new(EventStore::new()))
        .invoker(Arc::new(EchoModel))
        .clock(Arc::clone(&clock))
        .minter(minter)
        .build()?;

    let agent = registry.register(NewAgent {
        name: "Customer Support Bot".to_string(),
        model: "gpt-4o".to_string(),
        environment: Environment::Prod,
        risk_level: RiskLevel::Medium,
        policies: vec![PolicyId::new("prod_pii_requires_review")],
        rate_limit_per_minute: None,
        cost_cap_cents: None,
        metadata: BTreeMap::new(),
        created_by: Some("ops".to_string()),
    })?;
    println!("registered agent: {}", agent.id);

    // Allowed request: no PII tag, no blocking policy.
    let identity = IdentityMetadata::new("alice", "developer")?;
    let allowed = executor
        .execute(ExecutionRequest::new(
            agent.id.clone(),
            "summarize yesterday's tickets",
            identity.clone(),
        ))
        .await?;
    if let ExecutionOutcome::Completed {
        response,
        latency_ms,
        ..
    } = &allowed
    {
        println!("allowed: {response} ({latency_ms} ms)");
    }

    // Review request: the PII tag matches the review policy.
    let mut context = serde_json::Map::new();
    context.insert("tags".to_string(), json!(["pii"]));
    let pending = executor
        .execute(
            ExecutionRequest::new(
                agent.id.clone(),
                "summarize the customer's account history",
                identity.clone(),
            )
            .with_context(context),
        )
        .await?;
    let ExecutionOutcome::PendingApproval {
        approval_id,
        reason,
        ..
    } = pending
    else {
        return Err("expected a pending approval".into());
    };
    println!("pending approval {approval_id}: {reason}");

    approvals.approve(
        &approval_id,
        "bob",
        "approver",
        Some("reviewed the account scope"),
        None,
    )?;
    let resumed = executor.resume(&approval_id, Duration::from_secs(30)).await?;
    if let ExecutionOutcome::Completed {
        response, ..
    } = &resumed
    {
        println!("approved and completed: {response}");
    }

    // Kill switch: every request is refused until deactivation.
    kill_switch.activate(
        KillSwitchScope::Global,
        "maintenance window",
        None,
        Some("ops"),
    )?;
    let blocked = executor
        .execute(ExecutionRequest::new(
            agent.id.clone(),
            "hello",
            identity,
        ))
        .await;
    println!("kill switch verdict: {:?}", blocked.err().map(|e| e.error_kind()));
    kill_switch.deactivate(KillSwitchScope::Global, None)?;

    let report = audit.verify_integrity();
    println!(
        "audit chain: {} entries, valid = {}",
        report.total_entries, report.valid
    );
    Ok(())
}
