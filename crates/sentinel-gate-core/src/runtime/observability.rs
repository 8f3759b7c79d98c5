// crates/sentinel-gate-core/src/runtime/observability.rs
// ============================================================================
// Module: Sentinel Gate Observability Store
// Description: Append-only event log feeding dashboard queries and replay.
// Purpose: Answer who did what, when, and why without touching the audit chain.
// Dependencies: serde, serde_json, crate::core
// ============================================================================

//! ## Overview
//! The observability store mirrors pipeline phases as queryable events,
//! indexed by execution, actor, agent, and event type. It is best effort by
//! contract: appends never fail the pipeline, because the audit trail is the
//! authoritative record. Queries are bounded and return newest entries
//! first; replay rebuilds one execution's timeline in append order.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;
use std::sync::RwLock;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

use crate::core::event::AuditEventType;
use crate::core::identifiers::AgentId;
use crate::core::identifiers::EventId;
use crate::core::identifiers::ExecutionId;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Events
// ============================================================================

/// Default query bound.
pub const DEFAULT_QUERY_LIMIT: usize = 100;

/// One observability event.
///
/// # Invariants
/// - Events are append-only; the store never mutates a recorded event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GovernanceEvent {
    /// Event identifier.
    pub event_id: EventId,
    /// Event type tag.
    pub event_type: AuditEventType,
    /// When the event occurred.
    pub timestamp: Timestamp,
    /// Execution the event belongs to, when any.
    pub execution_id: Option<ExecutionId>,
    /// Agent involved, when any.
    pub agent_id: Option<AgentId>,
    /// Actor involved, when any.
    pub actor_id: Option<String>,
    /// Event payload.
    pub payload: Map<String, Value>,
}

/// Filters for bounded event queries.
///
/// # Invariants
/// - Absent filters match every event.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventFilter {
    /// Restrict to one execution.
    pub execution_id: Option<ExecutionId>,
    /// Restrict to one agent.
    pub agent_id: Option<AgentId>,
    /// Restrict to one actor.
    pub actor_id: Option<String>,
    /// Restrict to one event type.
    pub event_type: Option<AuditEventType>,
}

impl EventFilter {
    /// Returns whether the event passes every filter present.
    fn matches(&self, event: &GovernanceEvent) -> bool {
        self.execution_id
            .as_ref()
            .is_none_or(|execution_id| event.execution_id.as_ref() == Some(execution_id))
            && self
                .agent_id
                .as_ref()
                .is_none_or(|agent_id| event.agent_id.as_ref() == Some(agent_id))
            && self
                .actor_id
                .as_ref()
                .is_none_or(|actor_id| event.actor_id.as_ref() == Some(actor_id))
            && self
                .event_type
                .is_none_or(|event_type| event.event_type == event_type)
    }
}

// ============================================================================
// SECTION: Event Store
// ============================================================================

/// Store interior guarded by the writer lock.
#[derive(Debug, Default)]
struct StoreInner {
    /// Append-ordered events.
    events: Vec<GovernanceEvent>,
    /// Positions by execution.
    by_execution: BTreeMap<ExecutionId, Vec<usize>>,
    /// Positions by agent.
    by_agent: BTreeMap<AgentId, Vec<usize>>,
    /// Positions by actor.
    by_actor: BTreeMap<String, Vec<usize>>,
    /// Positions by event type.
    by_type: BTreeMap<AuditEventType, Vec<usize>>,
}

/// Append-only in-memory event store.
///
/// # Invariants
/// - Appends never fail; this store is not on the authoritative path.
#[derive(Default)]
pub struct EventStore {
    /// Guarded interior; one writer, concurrent readers.
    inner: RwLock<StoreInner>,
}

impl EventStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one event.
    pub fn append(&self, event: GovernanceEvent) {
        let mut inner = self
            .inner
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let position = inner.events.len();
        if let Some(execution_id) = &event.execution_id {
            inner
                .by_execution
                .entry(execution_id.clone())
                .or_default()
                .push(position);
        }
        if let Some(agent_id) = &event.agent_id {
            inner.by_agent.entry(agent_id.clone()).or_default().push(position);
        }
        if let Some(actor_id) = &event.actor_id {
            inner.by_actor.entry(actor_id.clone()).or_default().push(position);
        }
        inner.by_type.entry(event.event_type).or_default().push(position);
        inner.events.push(event);
    }

    /// Returns the newest events matching the filter, newest first.
    #[must_use]
    pub fn query(&self, filter: &EventFilter, limit: usize) -> Vec<GovernanceEvent> {
        let inner = self
            .inner
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        inner
            .events
            .iter()
            .rev()
            .filter(|event| filter.matches(event))
            .take(limit)
            .cloned()
            .collect()
    }

    /// Rebuilds one execution's timeline in append order.
    #[must_use]
    pub fn replay_execution(&self, execution_id: &ExecutionId) -> Vec<GovernanceEvent> {
        let inner = self
            .inner
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        inner
            .by_execution
            .get(execution_id)
            .map(|positions| {
                positions
                    .iter()
                    .filter_map(|position| inner.events.get(*position))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Returns the number of recorded events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .events
            .len()
    }

    /// Returns whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for EventStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStore").field("events", &self.len()).finish()
    }
}
