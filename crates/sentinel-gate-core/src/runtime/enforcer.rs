// crates/sentinel-gate-core/src/runtime/enforcer.rs
// ============================================================================
// Module: Sentinel Gate Fail-Closed Enforcer
// Description: Health probes and circuit breaker gating the pipeline.
// Purpose: Deny rather than allow when any critical component is unhealthy.
// Dependencies: serde, thiserror, crate::core, crate::runtime::{audit, kill_switch}
// ============================================================================

//! ## Overview
//! The enforcer runs every registered health probe before the pipeline and
//! refuses the request outright when a critical probe reports down and
//! enforcement is on. Operations then pass through a three-state circuit
//! breaker: repeated failures open the circuit, a recovery timeout admits a
//! probe call half-open, and consecutive successes close it again. Breaker
//! transitions are checked on the next call through the breaker, never on a
//! timer.
//!
//! With enforcement off the enforcer still computes health and breaker
//! state but does not block, which supports staged rollouts.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::RwLock;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use serde::Deserialize;
use serde::Serialize;

use crate::core::time::Clock;
use crate::core::time::Timestamp;
use crate::runtime::audit::AuditTrail;
use crate::runtime::kill_switch::KillSwitch;
use crate::runtime::kill_switch::KillSwitchScope;

// ============================================================================
// SECTION: Health Model
// ============================================================================

/// Health status of one component or of the whole plane.
///
/// # Invariants
/// - Variants are stable for serialization and the status surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
    /// Fully operational.
    Healthy,
    /// Operational with degraded non-critical components.
    Degraded,
    /// Not operational but not blocking.
    Unhealthy,
    /// Not operational; blocks when critical.
    Down,
}

impl HealthState {
    /// Returns the stable label for the state.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Degraded => "degraded",
            Self::Unhealthy => "unhealthy",
            Self::Down => "down",
        }
    }
}

/// Result of one health probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    /// Probe status.
    pub status: HealthState,
    /// Whether a down status must fail the plane closed.
    pub critical: bool,
    /// Human-readable status message.
    pub message: String,
    /// Error detail, when the probe itself failed.
    pub error: Option<String>,
}

impl HealthReport {
    /// Builds a healthy report.
    #[must_use]
    pub fn healthy(critical: bool, message: impl Into<String>) -> Self {
        Self {
            status: HealthState::Healthy,
            critical,
            message: message.into(),
            error: None,
        }
    }

    /// Builds a down report.
    #[must_use]
    pub fn down(critical: bool, message: impl Into<String>) -> Self {
        Self {
            status: HealthState::Down,
            critical,
            message: message.into(),
            error: None,
        }
    }

    /// Builds a degraded report.
    #[must_use]
    pub fn degraded(message: impl Into<String>) -> Self {
        Self {
            status: HealthState::Degraded,
            critical: false,
            message: message.into(),
            error: None,
        }
    }
}

/// Health probe contract.
pub trait HealthProbe: Send + Sync {
    /// Runs the probe and reports component health.
    fn check(&self) -> HealthReport;
}

impl<F> HealthProbe for F
where
    F: Fn() -> HealthReport + Send + Sync,
{
    fn check(&self) -> HealthReport {
        self()
    }
}

/// Aggregated result of one probe sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthSummary {
    /// Overall status: down when any critical probe is down, degraded when
    /// any probe is non-healthy, healthy otherwise.
    pub status: HealthState,
    /// Per-component reports.
    pub components: BTreeMap<String, HealthReport>,
    /// Whether every probe reported healthy.
    pub all_healthy: bool,
    /// Whether a critical probe demands failing closed.
    pub fail_closed: bool,
    /// When the sweep ran.
    pub checked_at: Timestamp,
}

// ============================================================================
// SECTION: Circuit Breaker
// ============================================================================

/// Circuit breaker states.
///
/// # Invariants
/// - Variants are stable for serialization and the status surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Normal operation; requests pass through.
    Closed,
    /// Failures exceeded the threshold; requests fail fast.
    Open,
    /// Probing recovery; limited requests pass through.
    HalfOpen,
}

impl CircuitState {
    /// Returns the stable label for the state.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Open => "open",
            Self::HalfOpen => "half_open",
        }
    }
}

/// Circuit breaker tuning parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures before the circuit opens.
    pub failure_threshold: u32,
    /// Consecutive half-open successes before the circuit closes.
    pub success_threshold: u32,
    /// Seconds after the last failure before a recovery probe is admitted.
    pub timeout_seconds: u64,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 2,
            timeout_seconds: 60,
        }
    }
}

/// Breaker interior guarded by the lock.
#[derive(Debug)]
struct BreakerInner {
    /// Current state.
    state: CircuitState,
    /// Consecutive failures observed in the closed state.
    failure_count: u32,
    /// Consecutive successes observed in the half-open state.
    success_count: u32,
    /// When the most recent failure was recorded.
    last_failure_at: Option<Timestamp>,
    /// When the state last changed.
    last_transition_at: Timestamp,
}

/// Serializable breaker state for the status surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitSnapshot {
    /// Current state.
    pub state: CircuitState,
    /// Consecutive failures observed.
    pub failure_count: u32,
    /// Consecutive half-open successes observed.
    pub success_count: u32,
    /// When the most recent failure was recorded.
    pub last_failure_at: Option<Timestamp>,
    /// Seconds spent in the current state.
    pub state_duration_secs: u64,
}

/// Three-state circuit breaker.
///
/// # Invariants
/// - Transitions happen only inside calls; there is no background timer.
pub struct CircuitBreaker {
    /// Tuning parameters.
    config: CircuitBreakerConfig,
    /// Guarded interior state.
    inner: Mutex<BreakerInner>,
    /// Clock driving the recovery timeout.
    clock: Arc<dyn Clock>,
}

impl CircuitBreaker {
    /// Creates a closed breaker.
    #[must_use]
    pub fn new(config: CircuitBreakerConfig, clock: Arc<dyn Clock>) -> Self {
        let now = clock.now();
        Self {
            config,
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                failure_count: 0,
                success_count: 0,
                last_failure_at: None,
                last_transition_at: now,
            }),
            clock,
        }
    }

    /// Admits or refuses the next call.
    ///
    /// In the open state, once the recovery timeout has elapsed since the
    /// last failure the breaker transitions to half-open and admits the
    /// call; otherwise the call is refused.
    pub fn preflight(&self) -> Result<(), CircuitOpen> {
        let now = self.clock.now();
        let mut inner = self.lock_inner();
        match inner.state {
            CircuitState::Closed | CircuitState::HalfOpen => Ok(()),
            CircuitState::Open => {
                let elapsed = inner
                    .last_failure_at
                    .map_or(0, |at| now.secs_since(at));
                if elapsed >= self.config.timeout_seconds {
                    inner.state = CircuitState::HalfOpen;
                    inner.success_count = 0;
                    inner.last_transition_at = now;
                    Ok(())
                } else {
                    Err(CircuitOpen)
                }
            }
        }
    }

    /// Records a successful call.
    pub fn record_success(&self) {
        let now = self.clock.now();
        let mut inner = self.lock_inner();
        inner.failure_count = 0;
        if inner.state == CircuitState::HalfOpen {
            inner.success_count += 1;
            if inner.success_count >= self.config.success_threshold {
                inner.state = CircuitState::Closed;
                inner.success_count = 0;
                inner.last_transition_at = now;
            }
        }
    }

    /// Records a failed call.
    pub fn record_failure(&self) {
        let now = self.clock.now();
        let mut inner = self.lock_inner();
        inner.failure_count += 1;
        inner.success_count = 0;
        inner.last_failure_at = Some(now);
        match inner.state {
            CircuitState::HalfOpen => {
                inner.state = CircuitState::Open;
                inner.last_transition_at = now;
            }
            CircuitState::Closed => {
                if inner.failure_count >= self.config.failure_threshold {
                    inner.state = CircuitState::Open;
                    inner.last_transition_at = now;
                }
            }
            CircuitState::Open => {}
        }
    }

    /// Returns the breaker state for the status surface.
    #[must_use]
    pub fn snapshot(&self) -> CircuitSnapshot {
        let now = self.clock.now();
        let inner = self.lock_inner();
        CircuitSnapshot {
            state: inner.state,
            failure_count: inner.failure_count,
            success_count: inner.success_count,
            last_failure_at: inner.last_failure_at,
            state_duration_secs: now.secs_since(inner.last_transition_at),
        }
    }

    /// Acquires the breaker lock, recovering from a poisoned writer.
    fn lock_inner(&self) -> std::sync::MutexGuard<'_, BreakerInner> {
        self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// Marker returned when the breaker refuses a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitOpen;

impl fmt::Display for CircuitOpen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("circuit breaker is open")
    }
}

// ============================================================================
// SECTION: Protected Execution
// ============================================================================

/// Where a protected execution was refused.
///
/// # Invariants
/// - `Health` and `Circuit` refusals never invoked the operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockPhase {
    /// A critical probe reported down before the operation ran.
    Health,
    /// The circuit breaker refused the call.
    Circuit,
    /// The operation ran and failed.
    Operation,
}

/// Outcome of a protected execution.
///
/// # Invariants
/// - `Blocked` means the operation either never ran or failed; `Allowed`
///   carries the operation's output.
#[derive(Debug)]
pub enum ProtectedOutcome<T> {
    /// The operation ran and succeeded.
    Allowed {
        /// Output of the operation.
        value: T,
        /// Health summary computed before the operation.
        health: HealthSummary,
    },
    /// The operation was refused or failed.
    Blocked {
        /// Why the request was refused.
        reason: String,
        /// Whether the refusal is a fail-closed posture.
        fail_closed: bool,
        /// Where the refusal happened.
        phase: BlockPhase,
        /// Health summary computed before the operation, when available.
        health: Option<HealthSummary>,
    },
}

/// Enforcer status for the status surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnforcerStatus {
    /// Whether fail-closed blocking is enforced.
    pub enforce_mode: bool,
    /// Latest health summary.
    pub health: HealthSummary,
    /// Breaker state.
    pub circuit: CircuitSnapshot,
}

/// Fail-closed enforcement coordinator.
///
/// # Invariants
/// - A critical-down probe with enforcement on blocks before the operation
///   is invoked.
pub struct FailClosedEnforcer {
    /// Registered probes by component name.
    probes: RwLock<BTreeMap<String, Arc<dyn HealthProbe>>>,
    /// Circuit breaker guarding the pipeline.
    breaker: CircuitBreaker,
    /// Whether fail-closed blocking is enforced.
    enforce_mode: AtomicBool,
    /// Clock stamping health sweeps.
    clock: Arc<dyn Clock>,
}

impl FailClosedEnforcer {
    /// Creates an enforcer with no probes registered and enforcement on.
    #[must_use]
    pub fn new(config: CircuitBreakerConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            probes: RwLock::new(BTreeMap::new()),
            breaker: CircuitBreaker::new(config, Arc::clone(&clock)),
            enforce_mode: AtomicBool::new(true),
            clock,
        }
    }

    /// Registers a component health probe.
    pub fn register_probe(&self, name: impl Into<String>, probe: Arc<dyn HealthProbe>) {
        self.probes
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(name.into(), probe);
    }

    /// Runs every probe and aggregates the plane's health.
    #[must_use]
    pub fn check_health(&self) -> HealthSummary {
        let probes = self
            .probes
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone();
        let mut components = BTreeMap::new();
        let mut all_healthy = true;
        let mut fail_closed = false;
        for (name, probe) in probes {
            let report = probe.check();
            if report.status != HealthState::Healthy {
                all_healthy = false;
            }
            if report.critical && report.status == HealthState::Down {
                fail_closed = true;
            }
            components.insert(name, report);
        }
        let status = if fail_closed {
            HealthState::Down
        } else if all_healthy {
            HealthState::Healthy
        } else {
            HealthState::Degraded
        };
        HealthSummary {
            status,
            components,
            all_healthy,
            fail_closed,
            checked_at: self.clock.now(),
        }
    }

    /// Executes an operation under fail-closed protection.
    ///
    /// Health is checked first: a critical-down probe with enforcement on
    /// blocks without invoking the operation. The operation then passes
    /// through the circuit breaker; a failure is wrapped into a blocked
    /// outcome with its reason.
    pub async fn execute_with_protection<T, E, F, Fut>(&self, operation: F) -> ProtectedOutcome<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        let health = self.check_health();
        if health.fail_closed && self.enforce_mode.load(Ordering::SeqCst) {
            return ProtectedOutcome::Blocked {
                reason: "Control plane is unhealthy. Failing closed for safety.".to_string(),
                fail_closed: true,
                phase: BlockPhase::Health,
                health: Some(health),
            };
        }
        if self.breaker.preflight().is_err() {
            return ProtectedOutcome::Blocked {
                reason: "Circuit breaker is open. Control plane is unavailable. Failing closed \
                         to protect system integrity."
                    .to_string(),
                fail_closed: true,
                phase: BlockPhase::Circuit,
                health: Some(health),
            };
        }
        match operation().await {
            Ok(value) => {
                self.breaker.record_success();
                ProtectedOutcome::Allowed {
                    value,
                    health,
                }
            }
            Err(error) => {
                self.breaker.record_failure();
                ProtectedOutcome::Blocked {
                    reason: format!("Execution failed: {error}"),
                    fail_closed: true,
                    phase: BlockPhase::Operation,
                    health: Some(health),
                }
            }
        }
    }

    /// Returns the breaker state for the status surface.
    #[must_use]
    pub fn circuit_snapshot(&self) -> CircuitSnapshot {
        self.breaker.snapshot()
    }

    /// Returns the enforcer status.
    #[must_use]
    pub fn status(&self) -> EnforcerStatus {
        EnforcerStatus {
            enforce_mode: self.enforce_mode.load(Ordering::SeqCst),
            health: self.check_health(),
            circuit: self.breaker.snapshot(),
        }
    }

    /// Enables or disables fail-closed blocking. Use carefully.
    pub fn set_enforce_mode(&self, enforce: bool) {
        self.enforce_mode.store(enforce, Ordering::SeqCst);
    }

    /// Returns whether fail-closed blocking is enforced.
    #[must_use]
    pub fn enforce_mode(&self) -> bool {
        self.enforce_mode.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for FailClosedEnforcer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FailClosedEnforcer")
            .field("enforce_mode", &self.enforce_mode())
            .field("circuit", &self.breaker.snapshot())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// SECTION: Built-in Probes
// ============================================================================

/// Probe reporting audit-chain integrity; critical.
///
/// A tampered chain is promoted to a critical health failure, so the plane
/// blocks further requests until an operator intervenes.
#[must_use]
pub fn audit_trail_probe(audit: Arc<AuditTrail>) -> Arc<dyn HealthProbe> {
    Arc::new(move || {
        let report = audit.verify_integrity();
        if report.valid {
            HealthReport::healthy(true, "Audit trail operational")
        } else {
            HealthReport {
                status: HealthState::Down,
                critical: true,
                message: "Audit trail integrity failed".to_string(),
                error: Some(format!("{} issues detected", report.issues.len())),
            }
        }
    })
}

/// Probe surfacing kill-switch lockdown; non-critical.
///
/// The executor refuses tripped requests itself with a specific error, so
/// this probe only surfaces lockdown on the status page rather than
/// pre-empting that error with a generic fail-closed block.
#[must_use]
pub fn kill_switch_probe(kill_switch: Arc<KillSwitch>) -> Arc<dyn HealthProbe> {
    Arc::new(move || {
        if kill_switch.is_active(KillSwitchScope::Global, None) {
            HealthReport::degraded("Kill switch is ACTIVE - system locked down")
        } else {
            HealthReport::healthy(false, "Kill switch operational")
        }
    })
}
