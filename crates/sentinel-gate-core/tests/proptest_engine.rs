// crates/sentinel-gate-core/tests/proptest_engine.rs
// ============================================================================
// Module: Policy Engine Property Tests
// Description: Determinism and ordering properties over generated policies.
// ============================================================================

//! ## Overview
//! Property checks for the evaluator: identical inputs always produce
//! identical decisions, matched policies respect priority order, and the
//! decision outcome always equals the effect of the last matched policy (or
//! allow on fall-through).

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

use std::collections::BTreeSet;

use proptest::prelude::*;
use sentinel_gate_core::DecisionOutcome;
use sentinel_gate_core::Environment;
use sentinel_gate_core::Policy;
use sentinel_gate_core::PolicyEffect;
use sentinel_gate_core::RequestContext;
use sentinel_gate_core::core::identifiers::AgentId;
use sentinel_gate_core::core::policy::PolicyConditions;
use sentinel_gate_core::core::policy::PolicyScope;
use sentinel_gate_core::runtime::engine::evaluate;

/// Strategy over the three effects.
fn effect() -> impl Strategy<Value = PolicyEffect> {
    prop_oneof![
        Just(PolicyEffect::Allow),
        Just(PolicyEffect::Deny),
        Just(PolicyEffect::Review),
    ]
}

/// Strategy over small tag vocabularies.
fn tags() -> impl Strategy<Value = Option<BTreeSet<String>>> {
    proptest::option::of(proptest::collection::btree_set("[a-c]{1}", 1..3))
}

/// Strategy over policies with bounded priorities and tag conditions.
fn policy(index: usize) -> impl Strategy<Value = Policy> {
    (effect(), -5_i64..5, tags(), proptest::bool::ANY).prop_map(
        move |(effect, priority, tags, enabled)| Policy {
            id: sentinel_gate_core::core::identifiers::PolicyId::new(format!("p{index}")),
            version: "1.0.0".to_string(),
            description: String::new(),
            scope: PolicyScope::default(),
            conditions: PolicyConditions {
                tags,
                metadata: None,
                intent: None,
            },
            effect,
            priority,
            enabled,
        },
    )
}

/// Strategy over policy sets of up to eight policies with distinct ids.
fn policies() -> impl Strategy<Value = Vec<Policy>> {
    (0_usize..8).prop_flat_map(|count| (0..count).map(policy).collect::<Vec<_>>())
}

/// Strategy over request contexts varying only by tags.
fn context() -> impl Strategy<Value = RequestContext> {
    proptest::collection::btree_set("[a-c]{1}", 0..3).prop_map(|tags| {
        RequestContext::builder()
            .actor_id("alice")
            .actor_role("developer")
            .resource_id(AgentId::from_slug("support-bot"))
            .environment(Environment::Prod)
            .tags(tags)
            .build()
            .expect("context")
    })
}

proptest! {
    #[test]
    fn evaluation_is_deterministic(policies in policies(), context in context()) {
        let first = evaluate(&policies, &context);
        let second = evaluate(&policies, &context);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn matched_policies_are_priority_ordered(policies in policies(), context in context()) {
        let decision = evaluate(&policies, &context);
        let priorities: Vec<i64> = decision
            .matched_policies
            .iter()
            .filter_map(|id| {
                policies
                    .iter()
                    .find(|policy| &policy.id == id)
                    .map(|policy| policy.priority)
            })
            .collect();
        prop_assert!(
            priorities.windows(2).all(|pair| pair[0] >= pair[1]),
            "matched order {:?} violates priority order",
            priorities
        );
    }

    #[test]
    fn outcome_matches_the_last_matched_effect(policies in policies(), context in context()) {
        let decision = evaluate(&policies, &context);
        match decision.matched_policies.last() {
            None => prop_assert_eq!(decision.outcome, DecisionOutcome::Allow),
            Some(last) => {
                let effect = policies
                    .iter()
                    .find(|policy| &policy.id == last)
                    .map(|policy| policy.effect);
                match decision.outcome {
                    DecisionOutcome::Deny => prop_assert_eq!(effect, Some(PolicyEffect::Deny)),
                    DecisionOutcome::Review => prop_assert_eq!(effect, Some(PolicyEffect::Review)),
                    DecisionOutcome::Allow => prop_assert_eq!(effect, Some(PolicyEffect::Allow)),
                }
            }
        }
    }

    #[test]
    fn disabled_policies_never_match(policies in policies(), context in context()) {
        let decision = evaluate(&policies, &context);
        for id in &decision.matched_policies {
            let enabled = policies
                .iter()
                .find(|policy| &policy.id == id)
                .map(|policy| policy.enabled);
            prop_assert_eq!(enabled, Some(true));
        }
    }
}
