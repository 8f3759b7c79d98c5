// crates/sentinel-gate-core/tests/fail_closed.rs
// ============================================================================
// Module: Fail-Closed Tests
// Description: Health gating and circuit-breaker transitions.
// ============================================================================

//! ## Overview
//! Verifies the fail-closed round trip: a critical-down probe blocks without
//! invoking the operation, repeated operation failures open the breaker,
//! the recovery timeout admits a half-open probe, and consecutive successes
//! close the circuit again.

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

use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use common::harness;
use sentinel_gate_core::KillSwitchScope;
use sentinel_gate_core::core::Clock;
use sentinel_gate_core::core::ManualClock;
use sentinel_gate_core::core::Timestamp;
use sentinel_gate_core::runtime::FailClosedEnforcer;
use sentinel_gate_core::runtime::enforcer::BlockPhase;
use sentinel_gate_core::runtime::enforcer::CircuitBreakerConfig;
use sentinel_gate_core::runtime::enforcer::CircuitState;
use sentinel_gate_core::runtime::enforcer::HealthProbe;
use sentinel_gate_core::runtime::enforcer::HealthReport;
use sentinel_gate_core::runtime::enforcer::HealthState;
use sentinel_gate_core::runtime::enforcer::ProtectedOutcome;
use sentinel_gate_core::runtime::enforcer::audit_trail_probe;
use sentinel_gate_core::runtime::enforcer::kill_switch_probe;

/// Builds an enforcer over a manual clock with tight thresholds.
fn enforcer() -> (Arc<ManualClock>, FailClosedEnforcer) {
    let clock = Arc::new(ManualClock::starting_at(Timestamp::from_unix_millis(
        1_700_000_000_000,
    )));
    let clock_dyn: Arc<dyn Clock> = clock.clone();
    let enforcer = FailClosedEnforcer::new(
        CircuitBreakerConfig {
            failure_threshold: 3,
            success_threshold: 2,
            timeout_seconds: 60,
        },
        clock_dyn,
    );
    (clock, enforcer)
}

/// Probe that always reports critical-down.
fn critical_down() -> Arc<dyn HealthProbe> {
    Arc::new(|| HealthReport::down(true, "store unreachable"))
}

/// Counts invocations and fails when told to.
struct Counter {
    /// Invocations observed.
    calls: AtomicUsize,
}

impl Counter {
    /// Creates a zeroed counter.
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }

    /// Runs one operation through the enforcer.
    async fn run(&self, enforcer: &FailClosedEnforcer, fail: bool) -> ProtectedOutcome<&'static str> {
        enforcer
            .execute_with_protection(|| async move {
                self.calls.fetch_add(1, Ordering::SeqCst);
                if fail {
                    Err("backend exploded")
                } else {
                    Ok("done")
                }
            })
            .await
    }
}

#[tokio::test]
async fn critical_down_probe_blocks_without_invoking() {
    let (_clock, enforcer) = enforcer();
    enforcer.register_probe("policy_store", critical_down());
    let counter = Counter::new();
    let outcome = counter.run(&enforcer, false).await;
    match outcome {
        ProtectedOutcome::Blocked {
            fail_closed,
            phase,
            ..
        } => {
            assert!(fail_closed);
            assert_eq!(phase, BlockPhase::Health);
        }
        ProtectedOutcome::Allowed { .. } => panic!("must block"),
    }
    assert_eq!(counter.calls.load(Ordering::SeqCst), 0, "operation never ran");
}

#[tokio::test]
async fn enforce_mode_off_computes_but_does_not_block() {
    let (_clock, enforcer) = enforcer();
    enforcer.register_probe("policy_store", critical_down());
    enforcer.set_enforce_mode(false);
    let counter = Counter::new();
    match counter.run(&enforcer, false).await {
        ProtectedOutcome::Allowed { value, health } => {
            assert_eq!(value, "done");
            assert!(health.fail_closed, "health is still computed");
        }
        ProtectedOutcome::Blocked { .. } => panic!("must not block with enforcement off"),
    }
    assert_eq!(counter.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn breaker_opens_after_threshold_and_fails_fast() {
    let (_clock, enforcer) = enforcer();
    let counter = Counter::new();
    for _ in 0..3 {
        match counter.run(&enforcer, true).await {
            ProtectedOutcome::Blocked { phase, .. } => assert_eq!(phase, BlockPhase::Operation),
            ProtectedOutcome::Allowed { .. } => panic!("operation fails"),
        }
    }
    assert_eq!(enforcer.circuit_snapshot().state, CircuitState::Open);

    match counter.run(&enforcer, false).await {
        ProtectedOutcome::Blocked { phase, .. } => assert_eq!(phase, BlockPhase::Circuit),
        ProtectedOutcome::Allowed { .. } => panic!("open circuit fails fast"),
    }
    assert_eq!(
        counter.calls.load(Ordering::SeqCst),
        3,
        "the fast-fail never invoked the operation"
    );
}

#[tokio::test]
async fn recovery_probe_half_opens_then_closes_after_successes() {
    let (clock, enforcer) = enforcer();
    let counter = Counter::new();
    for _ in 0..3 {
        let _ = counter.run(&enforcer, true).await;
    }
    assert_eq!(enforcer.circuit_snapshot().state, CircuitState::Open);

    clock.advance_secs(61);
    match counter.run(&enforcer, false).await {
        ProtectedOutcome::Allowed { .. } => {}
        ProtectedOutcome::Blocked { .. } => panic!("recovery probe admitted after timeout"),
    }
    assert_eq!(enforcer.circuit_snapshot().state, CircuitState::HalfOpen);

    let _ = counter.run(&enforcer, false).await;
    assert_eq!(enforcer.circuit_snapshot().state, CircuitState::Closed);
}

#[tokio::test]
async fn half_open_failure_reopens_the_circuit() {
    let (clock, enforcer) = enforcer();
    let counter = Counter::new();
    for _ in 0..3 {
        let _ = counter.run(&enforcer, true).await;
    }
    clock.advance_secs(61);
    let _ = counter.run(&enforcer, true).await;
    assert_eq!(enforcer.circuit_snapshot().state, CircuitState::Open);
}

#[tokio::test]
async fn degraded_noncritical_probe_does_not_block() {
    let (_clock, enforcer) = enforcer();
    let cache_probe: Arc<dyn HealthProbe> = Arc::new(|| HealthReport::degraded("cache cold"));
    enforcer.register_probe("cache", cache_probe);
    let health = enforcer.check_health();
    assert_eq!(health.status, HealthState::Degraded);
    assert!(!health.fail_closed);
    let counter = Counter::new();
    assert!(matches!(
        counter.run(&enforcer, false).await,
        ProtectedOutcome::Allowed { .. }
    ));
}

#[test]
fn builtin_probes_reflect_component_state() {
    let harness = harness();
    let audit_probe = audit_trail_probe(std::sync::Arc::clone(&harness.audit));
    assert_eq!(audit_probe.check().status, HealthState::Healthy);

    let switch_probe = kill_switch_probe(std::sync::Arc::clone(&harness.kill_switch));
    assert_eq!(switch_probe.check().status, HealthState::Healthy);
    harness
        .kill_switch
        .activate(KillSwitchScope::Global, "lockdown", None, None)
        .expect("activate");
    let report = switch_probe.check();
    assert_eq!(report.status, HealthState::Degraded);
    assert!(!report.critical, "lockdown surfaces without pre-empting the specific error");
}
