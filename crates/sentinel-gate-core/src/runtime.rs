// crates/sentinel-gate-core/src/runtime.rs
// ============================================================================
// Module: Sentinel Gate Runtime Services
// Description: Stateful services composing the request-governance pipeline.
// Purpose: Group the runtime half of the crate behind one module.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! Runtime services hold the in-memory state of the control plane: the kill
//! switch, the agent registry, the hot-reloadable policy set, the audit
//! trail, the approval queue, the fail-closed enforcer, the plugin bus, the
//! observability store, and the executor that composes them per request.

/// Human-in-the-loop approval workflow.
pub mod approval;
/// Hash-chained, HMAC-signed audit trail.
pub mod audit;
/// Deterministic policy evaluation.
pub mod engine;
/// Health probes and circuit breaker.
pub mod enforcer;
/// Per-request pipeline orchestrator.
pub mod executor;
/// Global and per-agent emergency stop.
pub mod kill_switch;
/// Append-only observability event store.
pub mod observability;
/// Typed plugin registry and hook fan-out.
pub mod plugins;
/// Authoritative agent catalog.
pub mod registry;

pub use self::approval::ApprovalService;
pub use self::approval::ApprovalWorkflow;
pub use self::audit::AuditTrail;
pub use self::engine::PolicySet;
pub use self::engine::evaluate;
pub use self::enforcer::FailClosedEnforcer;
pub use self::executor::ExecutionOutcome;
pub use self::executor::ExecutionRequest;
pub use self::executor::Executor;
pub use self::kill_switch::KillSwitch;
pub use self::kill_switch::KillSwitchScope;
pub use self::observability::EventStore;
pub use self::plugins::PluginRegistry;
pub use self::registry::AgentRegistry;
