// crates/sentinel-gate-core/src/runtime/engine.rs
// ============================================================================
// Module: Sentinel Gate Policy Engine
// Description: Deterministic policy evaluation over frozen request contexts.
// Purpose: Turn declared rules into exactly one canonical decision.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! The evaluator is pure: no I/O, no time reads, no mutation of inputs. Two
//! evaluations with identical inputs return identical decisions, including
//! identical matched-policy ordering. Policies sort by priority descending
//! with a stable sort, so equal priorities evaluate in input order. The
//! first matching deny or review settles the outcome immediately; allows
//! accumulate and fall through.
//!
//! [`PolicySet`] holds the hot-reloadable set. In-flight evaluations always
//! see one coherent snapshot because the pipeline clones the shared slice at
//! entry and the swap replaces the whole set atomically.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::RwLock;

use crate::core::context::RequestContext;
use crate::core::decision::Decision;
use crate::core::policy::Policy;
use crate::core::policy::PolicyConditions;
use crate::core::policy::PolicyEffect;
use crate::core::policy::PolicyScope;

// ============================================================================
// SECTION: Evaluation
// ============================================================================

/// Evaluates policies against a frozen request context.
///
/// Disabled policies never participate. The returned decision's
/// `matched_policies` lists every matched policy in evaluation order, ending
/// with the deciding policy for deny and review outcomes.
#[must_use]
pub fn evaluate(policies: &[Policy], context: &RequestContext) -> Decision {
    let mut ordered: Vec<&Policy> = policies.iter().filter(|policy| policy.enabled).collect();
    ordered.sort_by(|a, b| b.priority.cmp(&a.priority));

    let mut matched = Vec::new();
    for policy in ordered {
        if !scope_matches(&policy.scope, context) {
            continue;
        }
        if !conditions_match(&policy.conditions, context) {
            continue;
        }
        matched.push(policy.id.clone());
        match policy.effect {
            PolicyEffect::Deny => {
                let reason = format!("Denied by policy {}: {}", policy.id, policy.description);
                return Decision::deny(matched, reason);
            }
            PolicyEffect::Review => {
                let reason =
                    format!("Review required by policy {}: {}", policy.id, policy.description);
                return Decision::review(matched, reason);
            }
            PolicyEffect::Allow => {}
        }
    }
    Decision::allow(matched, "No blocking policies matched")
}

/// Returns whether every scope facet present permits the context value.
fn scope_matches(scope: &PolicyScope, context: &RequestContext) -> bool {
    if let Some(environments) = &scope.environment
        && !environments.contains(&context.environment())
    {
        return false;
    }
    if let Some(resource_types) = &scope.resource_type
        && !resource_types.contains(context.resource_type())
    {
        return false;
    }
    if let Some(actor_roles) = &scope.actor_role
        && !actor_roles.contains(context.actor_role())
    {
        return false;
    }
    true
}

/// Returns whether every condition present holds for the context.
fn conditions_match(conditions: &PolicyConditions, context: &RequestContext) -> bool {
    if let Some(tags) = &conditions.tags
        && tags.is_disjoint(context.tags())
    {
        return false;
    }
    if let Some(metadata) = &conditions.metadata {
        for (key, required) in metadata {
            if context.metadata().get(key) != Some(required) {
                return false;
            }
        }
    }
    if let Some(intents) = &conditions.intent
        && !intents.contains(context.intent())
    {
        return false;
    }
    true
}

// ============================================================================
// SECTION: Policy Set
// ============================================================================

/// Atomically swappable policy snapshot.
///
/// # Invariants
/// - Readers always observe one coherent set; a reload replaces the whole
///   slice, never individual policies.
pub struct PolicySet {
    /// Shared current snapshot.
    current: RwLock<Arc<[Policy]>>,
}

impl PolicySet {
    /// Creates an empty policy set.
    #[must_use]
    pub fn new() -> Self {
        Self {
            current: RwLock::new(Arc::from(Vec::new())),
        }
    }

    /// Creates a policy set from an initial load.
    #[must_use]
    pub fn from_policies(policies: Vec<Policy>) -> Self {
        Self {
            current: RwLock::new(Arc::from(policies)),
        }
    }

    /// Returns the current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Arc<[Policy]> {
        Arc::clone(
            &self
                .current
                .read()
                .unwrap_or_else(std::sync::PoisonError::into_inner),
        )
    }

    /// Replaces the whole set atomically.
    pub fn replace(&self, policies: Vec<Policy>) {
        let mut current = self
            .current
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        *current = Arc::from(policies);
    }

    /// Returns the number of policies in the current snapshot.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    /// Returns whether the current snapshot is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }
}

impl Default for PolicySet {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PolicySet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolicySet")
            .field("policies", &self.len())
            .finish()
    }
}
