// crates/sentinel-gate-core/src/runtime/kill_switch.rs
// ============================================================================
// Module: Sentinel Gate Kill Switch
// Description: Global and per-agent emergency stop, read on every request.
// Purpose: Give operators an instant, reliable halt for AI execution.
// Dependencies: serde, thiserror, crate::core
// ============================================================================

//! ## Overview
//! The kill switch is in-memory state read at the top of every pipeline
//! invocation. `is_active` takes a read lock only and performs no I/O and no
//! allocation. A global trip masks every agent query; pipelines that begin
//! after a trip is visible observe it, while requests already past the check
//! are not interrupted.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::RwLock;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::identifiers::AgentId;
use crate::core::time::Clock;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Scope
// ============================================================================

/// Scope of a kill-switch operation.
///
/// # Invariants
/// - Variants are stable for serialization and audit records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KillSwitchScope {
    /// Halt all AI execution.
    Global,
    /// Halt a single agent.
    Agent,
}

impl KillSwitchScope {
    /// Returns the stable label for the scope.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Global => "global",
            Self::Agent => "agent",
        }
    }
}

impl fmt::Display for KillSwitchScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KillSwitchScope {
    type Err = KillSwitchError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "global" => Ok(Self::Global),
            "agent" => Ok(Self::Agent),
            other => Err(KillSwitchError::InvalidScope(other.to_string())),
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors returned by kill-switch operations.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum KillSwitchError {
    /// The scope label is outside the vocabulary.
    #[error("invalid scope: {0:?} (expected global or agent)")]
    InvalidScope(String),
    /// Agent scope requires an agent identifier.
    #[error("agent_id is required for agent-scoped kill switches")]
    MissingAgentId,
}

// ============================================================================
// SECTION: State Records
// ============================================================================

/// Activation record for one tripped switch.
///
/// # Invariants
/// - `reason` reflects the most recent activation for the scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchRecord {
    /// Why the switch was tripped.
    pub reason: String,
    /// Identity that tripped the switch.
    pub activated_by: Option<String>,
    /// When the switch was tripped.
    pub activated_at: Timestamp,
}

/// Full kill-switch state for the status surface.
///
/// # Invariants
/// - `global` is present exactly when the global switch is tripped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KillSwitchSnapshot {
    /// Global activation record, when tripped.
    pub global: Option<SwitchRecord>,
    /// Per-agent activation records.
    pub agents: BTreeMap<AgentId, SwitchRecord>,
}

/// Interior state guarded by the lock.
#[derive(Debug, Default)]
struct SwitchState {
    /// Global activation record, when tripped.
    global: Option<SwitchRecord>,
    /// Per-agent activation records; presence means tripped.
    agents: BTreeMap<AgentId, SwitchRecord>,
}

// ============================================================================
// SECTION: Kill Switch
// ============================================================================

/// Global and per-agent emergency stop.
///
/// # Invariants
/// - Reads never block on anything longer than the lock hand-off.
/// - A trip is observed by every pipeline invocation that begins after it.
pub struct KillSwitch {
    /// Guarded switch state; writers are rare, readers are every request.
    state: RwLock<SwitchState>,
    /// Clock stamping activation records.
    clock: Arc<dyn Clock>,
}

impl KillSwitch {
    /// Creates an untripped kill switch.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: RwLock::new(SwitchState::default()),
            clock,
        }
    }

    /// Trips the switch for the given scope.
    ///
    /// # Errors
    ///
    /// Returns [`KillSwitchError::MissingAgentId`] when `scope` is
    /// [`KillSwitchScope::Agent`] and no agent identifier is supplied.
    pub fn activate(
        &self,
        scope: KillSwitchScope,
        reason: impl Into<String>,
        agent_id: Option<&AgentId>,
        activated_by: Option<&str>,
    ) -> Result<SwitchRecord, KillSwitchError> {
        let record = SwitchRecord {
            reason: reason.into(),
            activated_by: activated_by.map(ToString::to_string),
            activated_at: self.clock.now(),
        };
        let mut state = self.write_state();
        match scope {
            KillSwitchScope::Global => {
                state.global = Some(record.clone());
            }
            KillSwitchScope::Agent => {
                let agent_id = agent_id.ok_or(KillSwitchError::MissingAgentId)?;
                state.agents.insert(agent_id.clone(), record.clone());
            }
        }
        Ok(record)
    }

    /// Clears the switch for the given scope.
    ///
    /// Clearing an untripped switch is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`KillSwitchError::MissingAgentId`] when `scope` is
    /// [`KillSwitchScope::Agent`] and no agent identifier is supplied.
    pub fn deactivate(
        &self,
        scope: KillSwitchScope,
        agent_id: Option<&AgentId>,
    ) -> Result<(), KillSwitchError> {
        let mut state = self.write_state();
        match scope {
            KillSwitchScope::Global => {
                state.global = None;
            }
            KillSwitchScope::Agent => {
                let agent_id = agent_id.ok_or(KillSwitchError::MissingAgentId)?;
                state.agents.remove(agent_id);
            }
        }
        Ok(())
    }

    /// Returns whether the switch blocks execution for the given scope.
    ///
    /// A global trip answers true for every query regardless of agent.
    #[must_use]
    pub fn is_active(&self, scope: KillSwitchScope, agent_id: Option<&AgentId>) -> bool {
        let state = self.read_state();
        if state.global.is_some() {
            return true;
        }
        match scope {
            KillSwitchScope::Global => false,
            KillSwitchScope::Agent => {
                agent_id.is_some_and(|agent_id| state.agents.contains_key(agent_id))
            }
        }
    }

    /// Returns the activation reason for the given scope, when tripped.
    ///
    /// A global trip reports the global reason for agent queries too.
    #[must_use]
    pub fn reason(&self, scope: KillSwitchScope, agent_id: Option<&AgentId>) -> Option<String> {
        let state = self.read_state();
        if let Some(global) = &state.global {
            return Some(global.reason.clone());
        }
        match scope {
            KillSwitchScope::Global => None,
            KillSwitchScope::Agent => agent_id
                .and_then(|agent_id| state.agents.get(agent_id))
                .map(|record| record.reason.clone()),
        }
    }

    /// Returns the complete switch state.
    #[must_use]
    pub fn snapshot(&self) -> KillSwitchSnapshot {
        let state = self.read_state();
        KillSwitchSnapshot {
            global: state.global.clone(),
            agents: state.agents.clone(),
        }
    }

    /// Acquires the read lock, recovering from a poisoned writer.
    fn read_state(&self) -> std::sync::RwLockReadGuard<'_, SwitchState> {
        self.state.read().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Acquires the write lock, recovering from a poisoned writer.
    fn write_state(&self) -> std::sync::RwLockWriteGuard<'_, SwitchState> {
        self.state.write().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl fmt::Debug for KillSwitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KillSwitch")
            .field("snapshot", &self.snapshot())
            .finish_non_exhaustive()
    }
}
