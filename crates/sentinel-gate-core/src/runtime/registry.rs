// crates/sentinel-gate-core/src/runtime/registry.rs
// ============================================================================
// Module: Sentinel Gate Agent Registry
// Description: Authoritative catalog of permitted agents with rate caps.
// Purpose: Guarantee that only registered, active agents can execute.
// Dependencies: serde, thiserror, crate::core
// ============================================================================

//! ## Overview
//! The registry is the system of record for agents. If an agent is not in
//! the registry, it cannot execute. Reads vastly outnumber mutations, so the
//! catalog sits behind a read-write lock and pipelines observe either the
//! pre- or post-mutation definition, never a partial one. The registry also
//! owns the per-agent token buckets that enforce request-rate caps.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::RwLock;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::agent::Agent;
use crate::core::agent::AgentPatch;
use crate::core::agent::AgentStatus;
use crate::core::agent::Environment;
use crate::core::agent::RiskLevel;
use crate::core::identifiers::AgentId;
use crate::core::identifiers::AgentIdError;
use crate::core::identifiers::PolicyId;
use crate::core::time::Clock;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors returned by registry operations.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// The derived agent identifier already exists.
    #[error("agent already registered: {0}")]
    DuplicateAgent(AgentId),
    /// The agent is unknown to the registry.
    #[error("agent not found: {0}")]
    AgentNotFound(AgentId),
    /// The agent exists but is not executable.
    #[error("agent {0} is not active")]
    AgentNotActive(AgentId),
    /// The agent exceeded its configured request-rate cap.
    #[error("rate limit exceeded for agent {0}")]
    RateLimited(AgentId),
    /// The agent name reduces to an empty identifier.
    #[error(transparent)]
    InvalidName(#[from] AgentIdError),
}

// ============================================================================
// SECTION: Registration Attributes
// ============================================================================

/// Attributes for registering a new agent.
///
/// # Invariants
/// - `name` drives the derived identifier; it must survive slug derivation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAgent {
    /// Human-readable display name.
    pub name: String,
    /// Model descriptor the agent fronts.
    pub model: String,
    /// Deployment environment tag.
    pub environment: Environment,
    /// Risk classification.
    pub risk_level: RiskLevel,
    /// Ordered list of policy identifiers attached to the agent.
    #[serde(default)]
    pub policies: Vec<PolicyId>,
    /// Optional request-rate cap in requests per minute.
    #[serde(default)]
    pub rate_limit_per_minute: Option<u32>,
    /// Optional advisory cost cap in cents.
    #[serde(default)]
    pub cost_cap_cents: Option<u64>,
    /// Free-form metadata mapping.
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    /// Identity registering the agent.
    #[serde(default)]
    pub created_by: Option<String>,
}

/// Filters for listing agents.
///
/// # Invariants
/// - Absent filters match every agent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentFilter {
    /// Restrict to one environment.
    pub environment: Option<Environment>,
    /// Restrict to one risk level.
    pub risk_level: Option<RiskLevel>,
    /// Restrict to executable agents; defaults to true in [`AgentFilter::active_only`].
    pub include_inactive: bool,
}

impl AgentFilter {
    /// Returns the default filter: active agents only, no other constraint.
    #[must_use]
    pub fn active_only() -> Self {
        Self::default()
    }
}

// ============================================================================
// SECTION: Rate Limiting
// ============================================================================

/// Token bucket for one agent's request-rate cap.
#[derive(Debug)]
struct TokenBucket {
    /// Requests permitted per minute; also the burst capacity.
    per_minute: u32,
    /// Tokens currently available.
    tokens: f64,
    /// Last refill timestamp.
    refilled_at: Timestamp,
}

impl TokenBucket {
    /// Creates a full bucket.
    fn new(per_minute: u32, now: Timestamp) -> Self {
        Self {
            per_minute,
            tokens: f64::from(per_minute),
            refilled_at: now,
        }
    }

    /// Refills earned tokens and takes one when available.
    fn try_take(&mut self, now: Timestamp) -> bool {
        let elapsed_ms = now.millis_since(self.refilled_at);
        #[allow(
            clippy::cast_precision_loss,
            reason = "Elapsed milliseconds are far below f64 integer precision."
        )]
        let earned = (elapsed_ms as f64 / 60_000.0) * f64::from(self.per_minute);
        self.tokens = (self.tokens + earned).min(f64::from(self.per_minute));
        self.refilled_at = now;
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

// ============================================================================
// SECTION: Agent Registry
// ============================================================================

/// Authoritative catalog of permitted agents.
///
/// # Invariants
/// - `id`, `created_at`, and `created_by` never change after registration.
/// - Readers observe either the pre- or post-mutation definition.
pub struct AgentRegistry {
    /// Read-mostly agent catalog.
    agents: RwLock<BTreeMap<AgentId, Agent>>,
    /// Per-agent token buckets; touched only when a cap is configured.
    buckets: Mutex<BTreeMap<AgentId, TokenBucket>>,
    /// Clock stamping registration and update times.
    clock: Arc<dyn Clock>,
}

impl AgentRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            agents: RwLock::new(BTreeMap::new()),
            buckets: Mutex::new(BTreeMap::new()),
            clock,
        }
    }

    /// Registers a new agent.
    ///
    /// The identifier is derived from the display name by the slug rule.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::InvalidName`] when the name reduces to an
    /// empty identifier and [`RegistryError::DuplicateAgent`] when the
    /// derived identifier already exists.
    pub fn register(&self, attrs: NewAgent) -> Result<Agent, RegistryError> {
        let id = AgentId::from_name(&attrs.name)?;
        let now = self.clock.now();
        let agent = Agent {
            id: id.clone(),
            name: attrs.name,
            model: attrs.model,
            environment: attrs.environment,
            status: AgentStatus::Active,
            risk_level: attrs.risk_level,
            policies: attrs.policies,
            rate_limit_per_minute: attrs.rate_limit_per_minute,
            cost_cap_cents: attrs.cost_cap_cents,
            metadata: attrs.metadata,
            created_at: now,
            updated_at: now,
            created_by: attrs.created_by,
            version: "1.0.0".to_string(),
        };
        let mut agents = self.write_agents();
        if agents.contains_key(&id) {
            return Err(RegistryError::DuplicateAgent(id));
        }
        agents.insert(id, agent.clone());
        Ok(agent)
    }

    /// Returns the agent with the given identifier.
    #[must_use]
    pub fn get(&self, id: &AgentId) -> Option<Agent> {
        self.read_agents().get(id).cloned()
    }

    /// Resolves an agent that must be executable, consuming one rate token.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::AgentNotFound`] for unknown agents,
    /// [`RegistryError::AgentNotActive`] for non-active agents, and
    /// [`RegistryError::RateLimited`] when the agent's cap is exhausted.
    pub fn resolve_executable(&self, id: &AgentId) -> Result<Agent, RegistryError> {
        let agent = self
            .get(id)
            .ok_or_else(|| RegistryError::AgentNotFound(id.clone()))?;
        if !agent.is_executable() {
            return Err(RegistryError::AgentNotActive(id.clone()));
        }
        if let Some(per_minute) = agent.rate_limit_per_minute {
            self.take_rate_token(id, per_minute)?;
        }
        Ok(agent)
    }

    /// Lists agents matching the filter.
    #[must_use]
    pub fn list(&self, filter: &AgentFilter) -> Vec<Agent> {
        self.read_agents()
            .values()
            .filter(|agent| {
                filter
                    .environment
                    .is_none_or(|environment| agent.environment == environment)
            })
            .filter(|agent| {
                filter
                    .risk_level
                    .is_none_or(|risk_level| agent.risk_level == risk_level)
            })
            .filter(|agent| filter.include_inactive || agent.is_executable())
            .cloned()
            .collect()
    }

    /// Applies a field-wise update to an agent.
    ///
    /// The fields `id`, `created_at`, and `created_by` are immutable and not
    /// representable in the patch.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::AgentNotFound`] for unknown agents.
    pub fn update(&self, id: &AgentId, patch: AgentPatch) -> Result<Agent, RegistryError> {
        let now = self.clock.now();
        let mut agents = self.write_agents();
        let agent = agents
            .get_mut(id)
            .ok_or_else(|| RegistryError::AgentNotFound(id.clone()))?;
        if let Some(name) = patch.name {
            agent.name = name;
        }
        if let Some(model) = patch.model {
            agent.model = model;
        }
        if let Some(environment) = patch.environment {
            agent.environment = environment;
        }
        if let Some(status) = patch.status {
            agent.status = status;
        }
        if let Some(risk_level) = patch.risk_level {
            agent.risk_level = risk_level;
        }
        if let Some(policies) = patch.policies {
            agent.policies = policies;
        }
        if let Some(rate_limit_per_minute) = patch.rate_limit_per_minute {
            agent.rate_limit_per_minute = rate_limit_per_minute;
        }
        if let Some(cost_cap_cents) = patch.cost_cap_cents {
            agent.cost_cap_cents = cost_cap_cents;
        }
        if let Some(metadata) = patch.metadata {
            agent.metadata = metadata;
        }
        agent.updated_at = now;
        Ok(agent.clone())
    }

    /// Soft-deactivates an agent.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::AgentNotFound`] for unknown agents.
    pub fn deactivate(&self, id: &AgentId) -> Result<Agent, RegistryError> {
        self.update(
            id,
            AgentPatch {
                status: Some(AgentStatus::Inactive),
                ..AgentPatch::default()
            },
        )
    }

    /// Reactivates a deactivated agent.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::AgentNotFound`] for unknown agents.
    pub fn activate(&self, id: &AgentId) -> Result<Agent, RegistryError> {
        self.update(
            id,
            AgentPatch {
                status: Some(AgentStatus::Active),
                ..AgentPatch::default()
            },
        )
    }

    /// Hard-deletes an agent. Admin-only; prefer [`AgentRegistry::deactivate`].
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::AgentNotFound`] for unknown agents.
    pub fn delete(&self, id: &AgentId) -> Result<(), RegistryError> {
        let mut agents = self.write_agents();
        agents
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| RegistryError::AgentNotFound(id.clone()))
    }

    /// Consumes one token from the agent's bucket.
    fn take_rate_token(&self, id: &AgentId, per_minute: u32) -> Result<(), RegistryError> {
        let now = self.clock.now();
        let mut buckets = self
            .buckets
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let bucket = buckets
            .entry(id.clone())
            .or_insert_with(|| TokenBucket::new(per_minute, now));
        bucket.per_minute = per_minute;
        if bucket.try_take(now) {
            Ok(())
        } else {
            Err(RegistryError::RateLimited(id.clone()))
        }
    }

    /// Acquires the catalog read lock, recovering from a poisoned writer.
    fn read_agents(&self) -> std::sync::RwLockReadGuard<'_, BTreeMap<AgentId, Agent>> {
        self.agents.read().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Acquires the catalog write lock, recovering from a poisoned writer.
    fn write_agents(&self) -> std::sync::RwLockWriteGuard<'_, BTreeMap<AgentId, Agent>> {
        self.agents.write().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl fmt::Debug for AgentRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentRegistry")
            .field("agents", &self.read_agents().len())
            .finish_non_exhaustive()
    }
}
