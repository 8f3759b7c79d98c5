// crates/sentinel-gate-core/src/runtime/executor.rs
// ============================================================================
// Module: Sentinel Gate Executor
// Description: Per-request pipeline orchestrator; the choke point.
// Purpose: Compose kill switch, registry, policies, approvals, audit, hooks,
// and the model call into one governed state machine.
// Dependencies: serde_json, crate::core, crate::interfaces, crate::runtime
// ============================================================================

//! ## Overview
//! Every model call flows through [`Executor::execute`]. The pipeline checks
//! the kill switch, resolves the agent, fans out pre-request hooks, freezes
//! the request context, evaluates policies, and either blocks, enrolls an
//! approval, or invokes the injected model capability. Every phase appends
//! to the audit trail and mirrors into the observability store.
//!
//! Steps after submission run inside the fail-closed enforcer. Governed
//! refusals (kill switch, unknown agent, policy deny) are verdicts, not
//! faults: they pass through the breaker without tripping it. Model-call
//! failures are faults and feed the breaker.
//!
//! The executor owns no long-lived state; it holds shared references to the
//! services it composes, injected at construction.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Map;
use serde_json::Value;
use serde_json::json;

use crate::core::agent::Agent;
use crate::core::context::RequestContext;
use crate::core::decision::Decision;
use crate::core::decision::DecisionOutcome;
use crate::core::error::GovernanceError;
use crate::core::event::AuditEventType;
use crate::core::identifiers::AgentId;
use crate::core::identifiers::ApprovalId;
use crate::core::identifiers::ExecutionId;
use crate::core::identifiers::IdMinter;
use crate::core::identifiers::WorkflowId;
use crate::core::identity::IdentityMetadata;
use crate::core::response::SubmitResponse;
use crate::core::time::Clock;
use crate::core::time::Timestamp;
use crate::interfaces::InvokeError;
use crate::interfaces::ModelInvoker;
use crate::runtime::approval::ApprovalService;
use crate::runtime::approval::ApprovalStatus;
use crate::runtime::audit::AuditTrail;
use crate::runtime::engine;
use crate::runtime::engine::PolicySet;
use crate::runtime::enforcer::BlockPhase;
use crate::runtime::enforcer::FailClosedEnforcer;
use crate::runtime::enforcer::ProtectedOutcome;
use crate::runtime::kill_switch::KillSwitch;
use crate::runtime::kill_switch::KillSwitchScope;
use crate::runtime::observability::EventStore;
use crate::runtime::observability::GovernanceEvent;
use crate::runtime::plugins::HookContext;
use crate::runtime::plugins::HookSignal;
use crate::runtime::plugins::HookStage;
use crate::runtime::plugins::PluginRegistry;
use crate::runtime::registry::AgentRegistry;
use crate::runtime::registry::RegistryError;

// ============================================================================
// SECTION: Request and Outcome
// ============================================================================

/// Default model-call deadline.
const DEFAULT_DEADLINE: Duration = Duration::from_secs(30);

/// One governed execution request.
#[derive(Debug, Clone)]
pub struct ExecutionRequest {
    /// Agent to execute.
    pub agent_id: AgentId,
    /// Prompt for the model.
    pub prompt: String,
    /// Caller-supplied context mapping.
    pub context: Map<String, Value>,
    /// Identity established by the upstream authenticator.
    pub identity: IdentityMetadata,
    /// Deadline for the model call.
    pub deadline: Duration,
}

impl ExecutionRequest {
    /// Creates a request with the default deadline and empty context.
    #[must_use]
    pub fn new(agent_id: AgentId, prompt: impl Into<String>, identity: IdentityMetadata) -> Self {
        Self {
            agent_id,
            prompt: prompt.into(),
            context: Map::new(),
            identity,
            deadline: DEFAULT_DEADLINE,
        }
    }

    /// Replaces the caller context.
    #[must_use]
    pub fn with_context(mut self, context: Map<String, Value>) -> Self {
        self.context = context;
        self
    }

    /// Replaces the model-call deadline.
    #[must_use]
    pub const fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }
}

/// Successful pipeline outcomes; refusals surface as [`GovernanceError`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    /// The model call completed.
    Completed {
        /// Execution identifier.
        execution_id: ExecutionId,
        /// Model response text.
        response: String,
        /// End-to-end latency in milliseconds.
        latency_ms: u64,
    },
    /// The request is suspended awaiting human approval.
    PendingApproval {
        /// Execution identifier.
        execution_id: ExecutionId,
        /// Approval the caller can poll.
        approval_id: ApprovalId,
        /// Why review is required.
        reason: String,
    },
}

impl ExecutionOutcome {
    /// Converts the outcome into its wire envelope.
    #[must_use]
    pub fn into_response(self) -> SubmitResponse {
        match self {
            Self::Completed {
                execution_id,
                response,
                latency_ms,
            } => SubmitResponse::success(execution_id, response, latency_ms),
            Self::PendingApproval {
                execution_id,
                approval_id,
                reason,
            } => SubmitResponse::pending_approval(execution_id, approval_id, reason),
        }
    }
}

/// Internal fault feeding the circuit breaker.
struct PipelineFault(String);

impl fmt::Display for PipelineFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Verdict of one pipeline run: outcome or governed refusal.
type PipelineVerdict = Result<ExecutionOutcome, GovernanceError>;

// ============================================================================
// SECTION: Builder
// ============================================================================

/// Error produced when the executor is assembled incompletely.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("executor is missing a required component: {0}")]
pub struct ExecutorBuildError(pub &'static str);

/// Builder wiring the executor's service bundle.
///
/// # Invariants
/// - `build` succeeds only when every required component is present.
#[derive(Default)]
pub struct ExecutorBuilder {
    /// Kill-switch service.
    kill_switch: Option<Arc<KillSwitch>>,
    /// Agent registry.
    registry: Option<Arc<AgentRegistry>>,
    /// Hot-reloadable policy set.
    policies: Option<Arc<PolicySet>>,
    /// Audit trail.
    audit: Option<Arc<AuditTrail>>,
    /// Approval service.
    approvals: Option<Arc<ApprovalService>>,
    /// Fail-closed enforcer.
    enforcer: Option<Arc<FailClosedEnforcer>>,
    /// Plugin registry.
    plugins: Option<Arc<PluginRegistry>>,
    /// Observability store.
    observability: Option<Arc<EventStore>>,
    /// Injected model capability.
    invoker: Option<Arc<dyn ModelInvoker>>,
    /// Clock for latency accounting.
    clock: Option<Arc<dyn Clock>>,
    /// Identifier minter.
    minter: Option<Arc<IdMinter>>,
    /// Workflow used for review enrollments.
    default_workflow: Option<WorkflowId>,
}

impl ExecutorBuilder {
    /// Sets the kill-switch service.
    #[must_use]
    pub fn kill_switch(mut self, kill_switch: Arc<KillSwitch>) -> Self {
        self.kill_switch = Some(kill_switch);
        self
    }

    /// Sets the agent registry.
    #[must_use]
    pub fn registry(mut self, registry: Arc<AgentRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Sets the policy set.
    #[must_use]
    pub fn policies(mut self, policies: Arc<PolicySet>) -> Self {
        self.policies = Some(policies);
        self
    }

    /// Sets the audit trail.
    #[must_use]
    pub fn audit(mut self, audit: Arc<AuditTrail>) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Sets the approval service.
    #[must_use]
    pub fn approvals(mut self, approvals: Arc<ApprovalService>) -> Self {
        self.approvals = Some(approvals);
        self
    }

    /// Sets the fail-closed enforcer.
    #[must_use]
    pub fn enforcer(mut self, enforcer: Arc<FailClosedEnforcer>) -> Self {
        self.enforcer = Some(enforcer);
        self
    }

    /// Sets the plugin registry.
    #[must_use]
    pub fn plugins(mut self, plugins: Arc<PluginRegistry>) -> Self {
        self.plugins = Some(plugins);
        self
    }

    /// Sets the observability store.
    #[must_use]
    pub fn observability(mut self, observability: Arc<EventStore>) -> Self {
        self.observability = Some(observability);
        self
    }

    /// Sets the injected model capability.
    #[must_use]
    pub fn invoker(mut self, invoker: Arc<dyn ModelInvoker>) -> Self {
        self.invoker = Some(invoker);
        self
    }

    /// Sets the clock.
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Sets the identifier minter.
    #[must_use]
    pub fn minter(mut self, minter: Arc<IdMinter>) -> Self {
        self.minter = Some(minter);
        self
    }

    /// Sets the workflow used for review enrollments.
    #[must_use]
    pub fn default_workflow(mut self, workflow: WorkflowId) -> Self {
        self.default_workflow = Some(workflow);
        self
    }

    /// Builds the executor.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorBuildError`] naming the first missing component.
    pub fn build(self) -> Result<Executor, ExecutorBuildError> {
        Ok(Executor {
            kill_switch: self.kill_switch.ok_or(ExecutorBuildError("kill_switch"))?,
            registry: self.registry.ok_or(ExecutorBuildError("registry"))?,
            policies: self.policies.ok_or(ExecutorBuildError("policies"))?,
            audit: self.audit.ok_or(ExecutorBuildError("audit"))?,
            approvals: self.approvals.ok_or(ExecutorBuildError("approvals"))?,
            enforcer: self.enforcer.ok_or(ExecutorBuildError("enforcer"))?,
            plugins: self.plugins.ok_or(ExecutorBuildError("plugins"))?,
            observability: self
                .observability
                .ok_or(ExecutorBuildError("observability"))?,
            invoker: self.invoker.ok_or(ExecutorBuildError("invoker"))?,
            clock: self.clock.ok_or(ExecutorBuildError("clock"))?,
            minter: self.minter.ok_or(ExecutorBuildError("minter"))?,
            default_workflow: self
                .default_workflow
                .unwrap_or_else(|| WorkflowId::new("standard")),
        })
    }
}

// ============================================================================
// SECTION: Executor
// ============================================================================

/// The per-request pipeline orchestrator.
pub struct Executor {
    /// Kill-switch service, read on every request.
    kill_switch: Arc<KillSwitch>,
    /// Agent registry.
    registry: Arc<AgentRegistry>,
    /// Hot-reloadable policy set.
    policies: Arc<PolicySet>,
    /// Audit trail; the authoritative record.
    audit: Arc<AuditTrail>,
    /// Approval service for review decisions.
    approvals: Arc<ApprovalService>,
    /// Fail-closed enforcer wrapping the pipeline.
    enforcer: Arc<FailClosedEnforcer>,
    /// Plugin registry for lifecycle hooks.
    plugins: Arc<PluginRegistry>,
    /// Observability store; best effort.
    observability: Arc<EventStore>,
    /// Injected model capability.
    invoker: Arc<dyn ModelInvoker>,
    /// Clock for latency accounting.
    clock: Arc<dyn Clock>,
    /// Identifier minter.
    minter: Arc<IdMinter>,
    /// Workflow used for review enrollments.
    default_workflow: WorkflowId,
}

impl Executor {
    /// Starts building an executor.
    #[must_use]
    pub fn builder() -> ExecutorBuilder {
        ExecutorBuilder::default()
    }

    /// Executes one request end to end.
    ///
    /// # Errors
    ///
    /// Returns a [`GovernanceError`] for every refusal: kill switch, unknown
    /// or inactive agent, rate cap, policy deny, hook veto, fail-closed
    /// block, open circuit, or model failure. A review decision is not an
    /// error; it returns [`ExecutionOutcome::PendingApproval`].
    pub async fn execute(
        &self,
        request: ExecutionRequest,
    ) -> Result<ExecutionOutcome, GovernanceError> {
        let execution_id = self.minter.execution_id();
        let started = self.clock.now();
        self.emit(
            AuditEventType::RequestSubmitted,
            &execution_id,
            Some(&request.agent_id),
            &request.identity,
            json_map(json!({
                "prompt": request.prompt,
                "context": Value::Object(request.context.clone()),
            })),
        );

        let protected = self
            .enforcer
            .execute_with_protection(|| self.run_pipeline(&request, &execution_id, started))
            .await;
        match protected {
            ProtectedOutcome::Allowed {
                value: Ok(outcome), ..
            } => Ok(outcome),
            ProtectedOutcome::Allowed {
                value: Err(refusal),
                ..
            } => Err(refusal),
            ProtectedOutcome::Blocked {
                reason,
                phase,
                ..
            } => {
                let error = match phase {
                    BlockPhase::Circuit => GovernanceError::CircuitOpen,
                    BlockPhase::Health => GovernanceError::FailClosed {
                        reason,
                    },
                    BlockPhase::Operation => GovernanceError::ExecutionFailed {
                        reason,
                    },
                };
                if matches!(phase, BlockPhase::Health | BlockPhase::Circuit) {
                    self.emit(
                        AuditEventType::RequestBlocked,
                        &execution_id,
                        Some(&request.agent_id),
                        &request.identity,
                        json_map(json!({
                            "reason": error.to_string(),
                            "error_type": error.error_kind(),
                        })),
                    );
                }
                Err(error)
            }
        }
    }

    /// Resumes an approved execution and performs the model call.
    ///
    /// # Errors
    ///
    /// Returns [`GovernanceError::PolicyViolation`] when the approval was
    /// rejected, timed out, or cancelled; [`GovernanceError::AgentNotFound`]
    /// when the agent no longer resolves; [`GovernanceError::ExecutionFailed`]
    /// when the model call fails. A still-pending approval is also a
    /// [`GovernanceError::ApprovalRequired`].
    pub async fn resume(
        &self,
        approval_id: &ApprovalId,
        deadline: Duration,
    ) -> Result<ExecutionOutcome, GovernanceError> {
        let approval = self
            .approvals
            .get(approval_id)
            .ok_or_else(|| GovernanceError::PolicyViolation {
                policy_id: None,
                reason: format!("approval not found: {approval_id}"),
            })?;
        match approval.status {
            ApprovalStatus::Approved => {}
            ApprovalStatus::Pending => {
                return Err(GovernanceError::ApprovalRequired {
                    approval_id: approval.approval_id,
                    reason: approval.reason,
                });
            }
            ApprovalStatus::Rejected | ApprovalStatus::Timeout | ApprovalStatus::Cancelled => {
                let reason = format!(
                    "approval {} was {}",
                    approval.approval_id, approval.status
                );
                self.audit_entry(
                    AuditEventType::RequestBlocked,
                    &approval.execution_id,
                    Some(&approval.agent_id),
                    approval.requested_by.as_deref(),
                    json_map(json!({
                        "reason": reason,
                        "approval_id": approval.approval_id.as_str(),
                    })),
                );
                return Err(GovernanceError::PolicyViolation {
                    policy_id: approval.policy_id,
                    reason,
                });
            }
        }
        let started = self.clock.now();
        let agent = self
            .registry
            .resolve_executable(&approval.agent_id)
            .map_err(registry_refusal)?;
        let model_context = BTreeMap::from([(
            "approval_id".to_string(),
            approval.approval_id.to_string(),
        )]);
        match self
            .invoker
            .invoke(&agent, &approval.prompt, &model_context, deadline)
            .await
        {
            Ok(response) => {
                let latency_ms = self.clock.now().millis_since(started);
                self.audit_entry(
                    AuditEventType::RequestCompleted,
                    &approval.execution_id,
                    Some(&agent.id),
                    approval.requested_by.as_deref(),
                    json_map(json!({
                        "status": "success",
                        "latency_ms": latency_ms,
                        "approval_id": approval.approval_id.as_str(),
                        "approved_by": approval.reviewer,
                    })),
                );
                let hook_context = json_map(json!({
                    "execution_id": approval.execution_id.as_str(),
                    "approval_id": approval.approval_id.as_str(),
                }));
                let _ = self.plugins.execute_hooks(HookStage::PostExecute, &hook_context);
                Ok(ExecutionOutcome::Completed {
                    execution_id: approval.execution_id,
                    response,
                    latency_ms,
                })
            }
            Err(error) => {
                let reason = invoke_reason(&error);
                self.audit_entry(
                    AuditEventType::RequestFailed,
                    &approval.execution_id,
                    Some(&agent.id),
                    approval.requested_by.as_deref(),
                    json_map(json!({ "reason": reason })),
                );
                Err(GovernanceError::ExecutionFailed {
                    reason,
                })
            }
        }
    }

    /// Runs pipeline steps 2 through 9.
    async fn run_pipeline(
        &self,
        request: &ExecutionRequest,
        execution_id: &ExecutionId,
        started: Timestamp,
    ) -> Result<PipelineVerdict, PipelineFault> {
        // Step 2: kill switch, global then agent scope.
        for scope in [KillSwitchScope::Global, KillSwitchScope::Agent] {
            if self.kill_switch.is_active(scope, Some(&request.agent_id)) {
                let reason = self
                    .kill_switch
                    .reason(scope, Some(&request.agent_id))
                    .unwrap_or_default();
                let error = GovernanceError::KillSwitchActive {
                    scope: scope.as_str().to_string(),
                    reason,
                };
                self.emit_blocked(execution_id, request, &error, None);
                return Ok(Err(error));
            }
        }

        // Step 3: registry lookup and rate cap.
        let agent = match self.registry.resolve_executable(&request.agent_id) {
            Ok(agent) => agent,
            Err(error) => {
                let error = registry_refusal(error);
                self.emit_blocked(execution_id, request, &error, None);
                return Ok(Err(error));
            }
        };

        // Step 4: pre-request hooks; a hook may veto or replace the context.
        let mut working_context = request.context.clone();
        working_context.insert(
            "execution_id".to_string(),
            Value::String(execution_id.to_string()),
        );
        working_context.insert("agent_id".to_string(), Value::String(agent.id.to_string()));
        working_context.insert("prompt".to_string(), Value::String(request.prompt.clone()));
        for outcome in self
            .plugins
            .execute_hooks(HookStage::PreRequest, &working_context)
        {
            match outcome.result {
                Ok(HookSignal::Abort {
                    reason,
                }) => {
                    let error = GovernanceError::PolicyViolation {
                        policy_id: None,
                        reason: format!("aborted by plugin {}: {reason}", outcome.plugin_id),
                    };
                    self.emit_blocked(execution_id, request, &error, None);
                    self.run_observer_hooks(HookStage::OnBlock, &working_context);
                    return Ok(Err(error));
                }
                Ok(HookSignal::ReplaceContext(replacement)) => {
                    working_context = replacement;
                }
                Ok(HookSignal::Continue) | Err(_) => {}
            }
        }

        // Step 5: freeze the request context.
        let context = match self.build_context(&agent, request, &working_context) {
            Ok(context) => context,
            Err(error) => {
                self.emit_blocked(execution_id, request, &error, None);
                return Ok(Err(error));
            }
        };

        // Step 6: deterministic policy evaluation.
        let policies = self.policies.snapshot();
        let decision = engine::evaluate(&policies, &context);
        for policy_id in &decision.matched_policies {
            self.emit(
                AuditEventType::PolicyEvaluated,
                execution_id,
                Some(&agent.id),
                &request.identity,
                json_map(json!({
                    "policy_id": policy_id.as_str(),
                    "decision": decision.outcome.as_str(),
                    "reason": decision.reason,
                })),
            );
        }
        let decision_context = json_map(json!({
            "execution_id": execution_id.as_str(),
            "decision": decision.outcome.as_str(),
            "reason": decision.reason,
            "policies_matched": decision.matched_policies.len(),
        }));
        self.run_observer_hooks(HookStage::PostDecision, &decision_context);

        match decision.outcome {
            DecisionOutcome::Deny => {
                // Step 7: short-circuit on deny.
                let error = GovernanceError::PolicyViolation {
                    policy_id: decision.deciding_policy().cloned(),
                    reason: decision.reason.clone(),
                };
                self.emit_blocked(execution_id, request, &error, Some(&decision));
                self.run_observer_hooks(HookStage::OnBlock, &decision_context);
                Ok(Err(error))
            }
            DecisionOutcome::Review => {
                // Step 8: enroll in the approval workflow and suspend.
                self.enroll_review(execution_id, &agent, request, &decision)
                    .map(Ok)
            }
            DecisionOutcome::Allow => {
                // Step 9: invoke the model.
                self.invoke_model(execution_id, &agent, request, &working_context, started)
                    .await
            }
        }
    }

    /// Enrolls a review decision and returns the pending outcome.
    fn enroll_review(
        &self,
        execution_id: &ExecutionId,
        agent: &Agent,
        request: &ExecutionRequest,
        decision: &Decision,
    ) -> Result<ExecutionOutcome, PipelineFault> {
        let approval = self
            .approvals
            .request_approval(
                execution_id.clone(),
                agent.id.clone(),
                request.prompt.clone(),
                decision.reason.clone(),
                Some(request.identity.actor_id().to_string()),
                decision.deciding_policy().cloned(),
                Some(agent.risk_level),
                &self.default_workflow,
            )
            .map_err(|error| PipelineFault(error.to_string()))?;
        self.emit(
            AuditEventType::RequestPendingApproval,
            execution_id,
            Some(&agent.id),
            &request.identity,
            json_map(json!({
                "approval_id": approval.approval_id.as_str(),
                "reason": decision.reason,
            })),
        );
        let hook_context = json_map(json!({
            "execution_id": execution_id.as_str(),
            "approval_id": approval.approval_id.as_str(),
            "reason": decision.reason,
        }));
        self.run_observer_hooks(HookStage::OnEscalate, &hook_context);
        Ok(ExecutionOutcome::PendingApproval {
            execution_id: execution_id.clone(),
            approval_id: approval.approval_id,
            reason: decision.reason.clone(),
        })
    }

    /// Invokes the model and settles the allow path.
    async fn invoke_model(
        &self,
        execution_id: &ExecutionId,
        agent: &Agent,
        request: &ExecutionRequest,
        working_context: &HookContext,
        started: Timestamp,
    ) -> Result<PipelineVerdict, PipelineFault> {
        self.run_observer_hooks(HookStage::PreExecute, working_context);
        let model_context = string_entries(working_context);
        match self
            .invoker
            .invoke(agent, &request.prompt, &model_context, request.deadline)
            .await
        {
            Ok(response) => {
                let latency_ms = self.clock.now().millis_since(started);
                self.emit(
                    AuditEventType::RequestCompleted,
                    execution_id,
                    Some(&agent.id),
                    &request.identity,
                    json_map(json!({
                        "status": "success",
                        "latency_ms": latency_ms,
                    })),
                );
                self.run_observer_hooks(HookStage::PostExecute, working_context);
                Ok(Ok(ExecutionOutcome::Completed {
                    execution_id: execution_id.clone(),
                    response,
                    latency_ms,
                }))
            }
            Err(error) => {
                let reason = invoke_reason(&error);
                self.emit(
                    AuditEventType::RequestFailed,
                    execution_id,
                    Some(&agent.id),
                    &request.identity,
                    json_map(json!({ "reason": reason })),
                );
                self.run_observer_hooks(HookStage::OnError, working_context);
                Err(PipelineFault(reason))
            }
        }
    }

    /// Freezes the request context from agent, caller context, and identity.
    fn build_context(
        &self,
        agent: &Agent,
        request: &ExecutionRequest,
        working_context: &HookContext,
    ) -> Result<RequestContext, GovernanceError> {
        let mut builder = RequestContext::builder()
            .actor_id(request.identity.actor_id())
            .actor_role(request.identity.actor_role())
            .resource_id(agent.id.clone())
            .environment(agent.environment);
        if let Some(Value::String(resource_type)) = working_context.get("resource_type") {
            builder = builder.resource_type(resource_type.clone());
        }
        if let Some(Value::String(intent)) = working_context.get("intent") {
            builder = builder.intent(intent.clone());
        }
        if let Some(Value::Array(tags)) = working_context.get("tags") {
            for tag in tags {
                if let Value::String(tag) = tag {
                    builder = builder.tag(tag.clone());
                }
            }
        }
        if let Some(Value::Object(metadata)) = working_context.get("metadata") {
            for (key, value) in metadata {
                if let Value::String(value) = value {
                    builder = builder.metadata_entry(key.clone(), value.clone());
                }
            }
        }
        builder
            .build()
            .map_err(|error| GovernanceError::ExecutionFailed {
                reason: format!("invalid request context: {error}"),
            })
    }

    /// Emits the blocked audit entry and mirrors it to observability.
    fn emit_blocked(
        &self,
        execution_id: &ExecutionId,
        request: &ExecutionRequest,
        error: &GovernanceError,
        decision: Option<&Decision>,
    ) {
        let mut data = json_map(json!({
            "reason": error.to_string(),
            "error_type": error.error_kind(),
        }));
        if let Some(decision) = decision
            && let Some(policy_id) = decision.deciding_policy()
        {
            data.insert(
                "policy_id".to_string(),
                Value::String(policy_id.to_string()),
            );
        }
        self.emit(
            AuditEventType::RequestBlocked,
            execution_id,
            Some(&request.agent_id),
            &request.identity,
            data,
        );
    }

    /// Runs observe-only hooks, discarding their signals.
    fn run_observer_hooks(&self, stage: HookStage, context: &HookContext) {
        let _ = self.plugins.execute_hooks(stage, context);
    }

    /// Appends one audit entry and mirrors it into the observability store.
    fn emit(
        &self,
        event_type: AuditEventType,
        execution_id: &ExecutionId,
        agent_id: Option<&AgentId>,
        identity: &IdentityMetadata,
        data: Map<String, Value>,
    ) {
        self.audit_entry(
            event_type,
            execution_id,
            agent_id,
            Some(identity.actor_id()),
            data,
        );
    }

    /// Appends one audit entry with explicit actor binding.
    fn audit_entry(
        &self,
        event_type: AuditEventType,
        execution_id: &ExecutionId,
        agent_id: Option<&AgentId>,
        actor_id: Option<&str>,
        data: Map<String, Value>,
    ) {
        let _ = self
            .audit
            .append(event_type, data.clone(), Some(execution_id), agent_id, actor_id);
        self.observability.append(GovernanceEvent {
            event_id: self.minter.event_id(),
            event_type,
            timestamp: self.clock.now(),
            execution_id: Some(execution_id.clone()),
            agent_id: agent_id.cloned(),
            actor_id: actor_id.map(ToString::to_string),
            payload: data,
        });
    }
}

impl fmt::Debug for Executor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Executor")
            .field("default_workflow", &self.default_workflow)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Extracts the object map from a `json!` literal.
fn json_map(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Projects the string-valued entries of a hook context for the model call.
fn string_entries(context: &HookContext) -> BTreeMap<String, String> {
    context
        .iter()
        .filter_map(|(key, value)| match value {
            Value::String(text) => Some((key.clone(), text.clone())),
            _ => None,
        })
        .collect()
}

/// Maps a registry refusal into the governance taxonomy.
fn registry_refusal(error: RegistryError) -> GovernanceError {
    match error {
        RegistryError::AgentNotFound(agent_id) | RegistryError::AgentNotActive(agent_id) => {
            GovernanceError::AgentNotFound {
                agent_id,
            }
        }
        RegistryError::RateLimited(agent_id) => GovernanceError::RateLimited {
            agent_id,
        },
        RegistryError::DuplicateAgent(agent_id) => GovernanceError::DuplicateAgent {
            agent_id,
        },
        RegistryError::InvalidName(error) => GovernanceError::ExecutionFailed {
            reason: error.to_string(),
        },
    }
}

/// Renders the sanitized failure reason for an invocation error.
fn invoke_reason(error: &InvokeError) -> String {
    match error {
        InvokeError::Cancelled => "cancelled".to_string(),
        InvokeError::DeadlineExceeded => "deadline exceeded".to_string(),
        InvokeError::Failed(reason) => reason.clone(),
    }
}
