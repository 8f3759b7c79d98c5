// crates/sentinel-gate-core/tests/common/mod.rs
// ============================================================================
// Module: Common Test Utilities
// Description: Shared helpers for sentinel-gate-core tests.
// Purpose: Provide a fully wired pipeline harness with a manual clock and a
// scriptable model stub.
// Dependencies: sentinel-gate-core, async-trait, serde_json
// ============================================================================

//! ## Overview
//! Builds the complete service bundle the executor composes, backed by a
//! manual clock so tests control time, and a stub model invoker whose
//! behavior is scriptable per test.

#![allow(
    dead_code,
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only helpers are shared across test binaries that each use a subset."
)]

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use async_trait::async_trait;
use sentinel_gate_core::Agent;
use sentinel_gate_core::AgentRegistry;
use sentinel_gate_core::ApprovalService;
use sentinel_gate_core::AuditTrail;
use sentinel_gate_core::Environment;
use sentinel_gate_core::EventStore;
use sentinel_gate_core::Executor;
use sentinel_gate_core::IdentityMetadata;
use sentinel_gate_core::KillSwitch;
use sentinel_gate_core::PluginRegistry;
use sentinel_gate_core::Policy;
use sentinel_gate_core::PolicyEffect;
use sentinel_gate_core::PolicySet;
use sentinel_gate_core::RiskLevel;
use sentinel_gate_core::core::IdMinter;
use sentinel_gate_core::core::ManualClock;
use sentinel_gate_core::core::Timestamp;
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

// ============================================================================
// SECTION: Stub Invoker
// ============================================================================

/// Scriptable model stub counting invocations.
#[derive(Debug, Default)]
pub struct StubInvoker {
    /// Whether invocations fail.
    pub fail: AtomicBool,
    /// Whether invocations report caller cancellation.
    pub cancel: AtomicBool,
    /// Number of invocations observed.
    pub calls: AtomicUsize,
}

impl StubInvoker {
    /// Creates a succeeding stub.
    pub fn new() -> Self {
        Self::default()
    }

    /// Switches the stub into failure mode.
    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Switches the stub into cancellation mode.
    pub fn set_cancel(&self, cancel: bool) {
        self.cancel.store(cancel, Ordering::SeqCst);
    }

    /// Returns how many invocations the stub observed.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ModelInvoker for StubInvoker {
    async fn invoke(
        &self,
        _agent: &Agent,
        prompt: &str,
        _context: &BTreeMap<String, String>,
        _deadline: Duration,
    ) -> Result<String, InvokeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.cancel.load(Ordering::SeqCst) {
            return Err(InvokeError::Cancelled);
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(InvokeError::Failed("provider unavailable".to_string()));
        }
        Ok(format!("[model] {prompt}"))
    }
}

// ============================================================================
// SECTION: Harness
// ============================================================================

/// Fully wired pipeline harness.
pub struct Harness {
    /// Manual clock driving every service.
    pub clock: Arc<ManualClock>,
    /// Identifier minter.
    pub minter: Arc<IdMinter>,
    /// Kill switch.
    pub kill_switch: Arc<KillSwitch>,
    /// Agent registry.
    pub registry: Arc<AgentRegistry>,
    /// Policy set.
    pub policies: Arc<PolicySet>,
    /// Audit trail.
    pub audit: Arc<AuditTrail>,
    /// Approval service.
    pub approvals: Arc<ApprovalService>,
    /// Fail-closed enforcer.
    pub enforcer: Arc<FailClosedEnforcer>,
    /// Plugin registry.
    pub plugins: Arc<PluginRegistry>,
    /// Observability store.
    pub observability: Arc<EventStore>,
    /// Scriptable model stub.
    pub invoker: Arc<StubInvoker>,
    /// Executor under test.
    pub executor: Executor,
}

/// Builds a harness with the standard workflow registered.
pub fn harness() -> Harness {
    let clock = Arc::new(ManualClock::starting_at(Timestamp::from_unix_millis(
        1_700_000_000_000,
    )));
    let clock_dyn: Arc<dyn sentinel_gate_core::core::Clock> = clock.clone();
    let minter = Arc::new(IdMinter::new(Arc::clone(&clock_dyn)));
    let secret = SigningSecret::new(b"test-chain-secret").expect("secret");
    let audit = Arc::new(AuditTrail::new(
        secret,
        Arc::clone(&clock_dyn),
        Arc::clone(&minter),
    ));
    let kill_switch = Arc::new(KillSwitch::new(Arc::clone(&clock_dyn)));
    let registry = Arc::new(AgentRegistry::new(Arc::clone(&clock_dyn)));
    let policies = Arc::new(PolicySet::new());
    let approvals = Arc::new(ApprovalService::new(
        Arc::clone(&audit),
        Arc::clone(&clock_dyn),
        Arc::clone(&minter),
    ));
    approvals.add_workflow(standard_workflow());
    let enforcer = Arc::new(FailClosedEnforcer::new(
        CircuitBreakerConfig::default(),
        Arc::clone(&clock_dyn),
    ));
    let plugins = Arc::new(PluginRegistry::new());
    let observability = Arc::new(EventStore::new());
    let invoker = Arc::new(StubInvoker::new());
    let executor = Executor::builder()
        .kill_switch(Arc::clone(&kill_switch))
        .registry(Arc::clone(&registry))
        .policies(Arc::clone(&policies))
        .audit(Arc::clone(&audit))
        .approvals(Arc::clone(&approvals))
        .enforcer(Arc::clone(&enforcer))
        .plugins(Arc::clone(&plugins))
        .observability(Arc::clone(&observability))
        .invoker(invoker.clone() as Arc<dyn sentinel_gate_core::interfaces::ModelInvoker>)
        .clock(Arc::clone(&clock_dyn))
        .minter(Arc::clone(&minter))
        .build()
        .expect("executor wiring");
    Harness {
        clock,
        minter,
        kill_switch,
        registry,
        policies,
        audit,
        approvals,
        enforcer,
        plugins,
        observability,
        invoker,
        executor,
    }
}

/// Returns the standard review workflow used across tests.
pub fn standard_workflow() -> ApprovalWorkflow {
    ApprovalWorkflow {
        id: WorkflowId::new("standard"),
        name: "Standard Approval".to_string(),
        description: "Single approver with a one-hour window".to_string(),
        approver_roles: vec!["approver".to_string(), "admin".to_string()],
        required_approvals: 1,
        timeout_seconds: 3_600,
        timeout_action: TimeoutAction::Reject,
        escalation_rules: Vec::new(),
        require_rationale: true,
    }
}

/// Registers a production agent named `Support Bot` and returns it.
pub fn register_support_bot(harness: &Harness) -> Agent {
    harness
        .registry
        .register(NewAgent {
            name: "Support Bot".to_string(),
            model: "gpt-4o".to_string(),
            environment: Environment::Prod,
            risk_level: RiskLevel::Medium,
            policies: Vec::new(),
            rate_limit_per_minute: None,
            cost_cap_cents: None,
            metadata: BTreeMap::new(),
            created_by: Some("ops".to_string()),
        })
        .expect("register agent")
}

/// Returns developer identity metadata for `alice`.
pub fn alice() -> IdentityMetadata {
    IdentityMetadata::new("alice", "developer").expect("identity")
}

/// Builds a policy with the given effect, priority, and tag condition.
pub fn tag_policy(id: &str, priority: i64, effect: PolicyEffect, tag: Option<&str>) -> Policy {
    Policy {
        id: PolicyId::new(id),
        version: "1.0.0".to_string(),
        description: format!("test policy {id}"),
        scope: PolicyScope::default(),
        conditions: PolicyConditions {
            tags: tag.map(|tag| std::iter::once(tag.to_string()).collect()),
            metadata: None,
            intent: None,
        },
        effect,
        priority,
        enabled: true,
    }
}
