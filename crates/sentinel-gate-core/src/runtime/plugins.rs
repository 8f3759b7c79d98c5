// crates/sentinel-gate-core/src/runtime/plugins.rs
// ============================================================================
// Module: Sentinel Gate Plugin Bus
// Description: Typed plugin registry and lifecycle hook fan-out.
// Purpose: Extend the pipeline with host logic without modifying the core.
// Dependencies: serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Plugins are concrete objects registered at startup; each declares its
//! kind, and lifecycle hooks additionally declare the stage they observe.
//! Hook fan-out is isolated: a failing hook is captured as an error outcome
//! and never prevents other hooks from running or aborts the pipeline. What
//! to do with collected outcomes is the executor's decision.
//!
//! A pre-request hook may veto the request or replace the working context;
//! every other stage is observe-only.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::sync::RwLock;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Vocabulary
// ============================================================================

/// Plugin taxonomy.
///
/// # Invariants
/// - Variants are stable for serialization and registry indexing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PluginKind {
    /// Custom policy evaluation logic.
    PolicyEvaluator,
    /// Custom risk scoring.
    RiskScorer,
    /// Full risk engine.
    RiskEngine,
    /// Compliance validation module.
    ComplianceModule,
    /// Lifecycle hook.
    LifecycleHook,
    /// Data sanitization.
    DataSanitizer,
}

impl PluginKind {
    /// Returns the stable label for the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PolicyEvaluator => "policy_evaluator",
            Self::RiskScorer => "risk_scorer",
            Self::RiskEngine => "risk_engine",
            Self::ComplianceModule => "compliance_module",
            Self::LifecycleHook => "lifecycle_hook",
            Self::DataSanitizer => "data_sanitizer",
        }
    }
}

/// Pipeline stages a lifecycle hook may observe.
///
/// # Invariants
/// - Variants are stable for serialization and registry indexing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookStage {
    /// Before request validation; the earliest interception point.
    PreRequest,
    /// Before model execution.
    PreExecute,
    /// After the policy decision is made.
    PostDecision,
    /// After successful execution.
    PostExecute,
    /// On execution error.
    OnError,
    /// When a request is blocked.
    OnBlock,
    /// When a request is escalated for approval.
    OnEscalate,
    /// When a security or compliance incident is triggered.
    OnIncident,
}

impl HookStage {
    /// Returns the stable label for the stage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PreRequest => "pre_request",
            Self::PreExecute => "pre_execute",
            Self::PostDecision => "post_decision",
            Self::PostExecute => "post_execute",
            Self::OnError => "on_error",
            Self::OnBlock => "on_block",
            Self::OnEscalate => "on_escalate",
            Self::OnIncident => "on_incident",
        }
    }
}

impl fmt::Display for HookStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Plugin Contracts
// ============================================================================

/// Working context handed to hooks.
pub type HookContext = Map<String, Value>;

/// Error surfaced by a hook invocation.
///
/// # Invariants
/// - Captured per hook; never propagates out of the fan-out.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("hook failed: {0}")]
pub struct HookError(pub String);

/// Signal a hook returns to the pipeline.
///
/// # Invariants
/// - Only pre-request hooks may abort or replace the context; the executor
///   ignores those signals from other stages.
#[derive(Debug, Clone, PartialEq)]
pub enum HookSignal {
    /// Proceed unchanged.
    Continue,
    /// Proceed with a replacement working context.
    ReplaceContext(HookContext),
    /// Veto the request.
    Abort {
        /// Why the hook vetoed the request.
        reason: String,
    },
}

/// Base contract every plugin implements.
pub trait ControlPlugin: Send + Sync {
    /// Unique plugin identifier.
    fn plugin_id(&self) -> &str;

    /// Human-readable plugin name.
    fn plugin_name(&self) -> &str;

    /// Plugin taxonomy kind.
    fn kind(&self) -> PluginKind;

    /// Plugin version.
    fn version(&self) -> &str {
        "1.0.0"
    }
}

/// Lifecycle hook contract.
pub trait LifecycleHook: ControlPlugin {
    /// Stage the hook observes.
    fn stage(&self) -> HookStage;

    /// Runs the hook for its stage.
    ///
    /// # Errors
    ///
    /// Returns a [`HookError`] carrying the hook's failure; the bus captures
    /// it and continues with the remaining hooks.
    fn on_stage(&self, context: &HookContext) -> Result<HookSignal, HookError>;
}

/// Outcome of one hook invocation during fan-out.
#[derive(Debug, Clone, PartialEq)]
pub struct HookOutcome {
    /// Identifier of the invoked plugin.
    pub plugin_id: String,
    /// Signal or captured failure.
    pub result: Result<HookSignal, HookError>,
}

// ============================================================================
// SECTION: Plugin Registry
// ============================================================================

/// Typed plugin registry with per-stage hook indexing.
///
/// # Invariants
/// - Hooks fan out in registration order.
/// - Registering a plugin with an existing identifier replaces it in the id
///   index but not in stage fan-out order.
#[derive(Default)]
pub struct PluginRegistry {
    /// Plugins by identifier.
    by_id: RwLock<BTreeMap<String, Arc<dyn ControlPlugin>>>,
    /// Plugins by kind.
    by_kind: RwLock<BTreeMap<PluginKind, Vec<Arc<dyn ControlPlugin>>>>,
    /// Lifecycle hooks by stage, in registration order.
    hooks: RwLock<BTreeMap<HookStage, Vec<Arc<dyn LifecycleHook>>>>,
}

impl PluginRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a plugin under its declared kind.
    pub fn register(&self, plugin: Arc<dyn ControlPlugin>) {
        self.by_id
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(plugin.plugin_id().to_string(), Arc::clone(&plugin));
        self.by_kind
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .entry(plugin.kind())
            .or_default()
            .push(plugin);
    }

    /// Registers a lifecycle hook under its declared stage.
    pub fn register_hook(&self, hook: Arc<dyn LifecycleHook>) {
        let plugin: Arc<dyn ControlPlugin> = hook.clone();
        self.register(plugin);
        self.hooks
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .entry(hook.stage())
            .or_default()
            .push(hook);
    }

    /// Returns the plugin with the given identifier.
    #[must_use]
    pub fn get(&self, plugin_id: &str) -> Option<Arc<dyn ControlPlugin>> {
        self.by_id
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(plugin_id)
            .cloned()
    }

    /// Returns every plugin of the given kind.
    #[must_use]
    pub fn of_kind(&self, kind: PluginKind) -> Vec<Arc<dyn ControlPlugin>> {
        self.by_kind
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(&kind)
            .cloned()
            .unwrap_or_default()
    }

    /// Invokes every hook registered for the stage.
    ///
    /// A failing hook is captured as an error outcome; remaining hooks still
    /// run. The executor decides what to do with the collected outcomes.
    #[must_use]
    pub fn execute_hooks(&self, stage: HookStage, context: &HookContext) -> Vec<HookOutcome> {
        let hooks = self
            .hooks
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(&stage)
            .cloned()
            .unwrap_or_default();
        hooks
            .into_iter()
            .map(|hook| HookOutcome {
                plugin_id: hook.plugin_id().to_string(),
                result: hook.on_stage(context),
            })
            .collect()
    }
}

impl fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let plugins = self
            .by_id
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len();
        f.debug_struct("PluginRegistry")
            .field("plugins", &plugins)
            .finish_non_exhaustive()
    }
}
