// crates/sentinel-gate-core/tests/policy_engine.rs
// ============================================================================
// Module: Policy Engine Tests
// Description: Deterministic evaluation, precedence, and scope filtering.
// ============================================================================

//! ## Overview
//! Verifies the evaluator's determinism, priority ordering, effect
//! precedence, scope and condition matching, and the canonical scenario
//! decisions for production PII review and banned-tag denial.

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

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use common::tag_policy;
use sentinel_gate_core::DecisionOutcome;
use sentinel_gate_core::Environment;
use sentinel_gate_core::Policy;
use sentinel_gate_core::PolicyEffect;
use sentinel_gate_core::PolicySet;
use sentinel_gate_core::RequestContext;
use sentinel_gate_core::core::identifiers::AgentId;
use sentinel_gate_core::core::identifiers::PolicyId;
use sentinel_gate_core::core::policy::PolicyConditions;
use sentinel_gate_core::core::policy::PolicyScope;
use sentinel_gate_core::runtime::engine::evaluate;

/// Builds a context in the given environment with the given tags.
fn context(environment: Environment, tags: &[&str]) -> RequestContext {
    RequestContext::builder()
        .actor_id("alice")
        .actor_role("developer")
        .resource_id(AgentId::from_slug("support-bot"))
        .resource_type("model")
        .environment(environment)
        .intent("generation")
        .tags(tags.iter().map(ToString::to_string).collect())
        .build()
        .expect("context")
}

/// Builds the production PII review policy used by several tests.
fn prod_pii_policy() -> Policy {
    Policy {
        id: PolicyId::new("prod_pii"),
        version: "1.0.0".to_string(),
        description: "PII in production requires review".to_string(),
        scope: PolicyScope {
            environment: Some(BTreeSet::from([Environment::Prod])),
            resource_type: None,
            actor_role: None,
        },
        conditions: PolicyConditions {
            tags: Some(BTreeSet::from(["pii".to_string()])),
            metadata: None,
            intent: None,
        },
        effect: PolicyEffect::Review,
        priority: 100,
        enabled: true,
    }
}

#[test]
fn prod_pii_requires_review() {
    let policies = vec![prod_pii_policy()];
    let decision = evaluate(&policies, &context(Environment::Prod, &["pii"]));
    assert_eq!(decision.outcome, DecisionOutcome::Review);
    assert_eq!(decision.matched_policies, vec![PolicyId::new("prod_pii")]);
    assert!(decision.reason.contains("prod_pii"));
}

#[test]
fn dev_pii_falls_through_to_allow() {
    let policies = vec![prod_pii_policy()];
    let decision = evaluate(&policies, &context(Environment::Dev, &["pii"]));
    assert_eq!(decision.outcome, DecisionOutcome::Allow);
    assert!(decision.matched_policies.is_empty());
    assert_eq!(decision.reason, "No blocking policies matched");
}

#[test]
fn prod_banned_tag_denies() {
    let mut policy = prod_pii_policy();
    policy.id = PolicyId::new("prod_ban");
    policy.conditions.tags = Some(BTreeSet::from(["banned".to_string()]));
    policy.effect = PolicyEffect::Deny;
    policy.priority = 200;
    let decision = evaluate(&[policy], &context(Environment::Prod, &["banned"]));
    assert_eq!(decision.outcome, DecisionOutcome::Deny);
    assert_eq!(decision.matched_policies, vec![PolicyId::new("prod_ban")]);
}

#[test]
fn unscoped_pii_condition_denies_regardless_of_environment() {
    let policy = tag_policy("no_ssn", 50, PolicyEffect::Deny, Some("pii"));
    let decision = evaluate(&[policy], &context(Environment::Staging, &["pii"]));
    assert_eq!(decision.outcome, DecisionOutcome::Deny);
    assert_eq!(decision.matched_policies, vec![PolicyId::new("no_ssn")]);
}

#[test]
fn higher_priority_deny_precedes_matching_allow() {
    let allow = tag_policy("allow_all", 50, PolicyEffect::Allow, None);
    let deny = tag_policy("deny_all", 100, PolicyEffect::Deny, None);
    let decision = evaluate(
        &[allow, deny],
        &context(Environment::Prod, &["anything"]),
    );
    assert_eq!(decision.outcome, DecisionOutcome::Deny);
    assert_eq!(
        decision.matched_policies,
        vec![PolicyId::new("deny_all")],
        "the higher-priority deny settles before the allow is reached"
    );
}

#[test]
fn matching_allow_accumulates_before_deny() {
    let allow = tag_policy("allow_first", 200, PolicyEffect::Allow, None);
    let deny = tag_policy("deny_second", 100, PolicyEffect::Deny, None);
    let decision = evaluate(&[allow, deny], &context(Environment::Prod, &[]));
    assert_eq!(decision.outcome, DecisionOutcome::Deny);
    assert_eq!(
        decision.matched_policies,
        vec![PolicyId::new("allow_first"), PolicyId::new("deny_second")]
    );
}

#[test]
fn equal_priorities_evaluate_in_input_order() {
    let first = tag_policy("first", 10, PolicyEffect::Review, None);
    let second = tag_policy("second", 10, PolicyEffect::Deny, None);
    let decision = evaluate(
        &[first.clone(), second.clone()],
        &context(Environment::Prod, &[]),
    );
    assert_eq!(decision.outcome, DecisionOutcome::Review);
    assert_eq!(decision.matched_policies, vec![PolicyId::new("first")]);

    let flipped = evaluate(&[second, first], &context(Environment::Prod, &[]));
    assert_eq!(flipped.outcome, DecisionOutcome::Deny);
    assert_eq!(flipped.matched_policies, vec![PolicyId::new("second")]);
}

#[test]
fn unmet_scope_facet_never_appears_in_matches() {
    let mut scoped = tag_policy("prod_only", 100, PolicyEffect::Allow, None);
    scoped.scope.environment = Some(BTreeSet::from([Environment::Prod]));
    let open = tag_policy("open", 50, PolicyEffect::Allow, None);
    let decision = evaluate(&[scoped, open], &context(Environment::Dev, &[]));
    assert_eq!(decision.outcome, DecisionOutcome::Allow);
    assert_eq!(decision.matched_policies, vec![PolicyId::new("open")]);
}

#[test]
fn metadata_conditions_require_every_pair() {
    let mut policy = tag_policy("metadata_gate", 10, PolicyEffect::Deny, None);
    policy.conditions.metadata = Some(BTreeMap::from([
        ("team".to_string(), "payments".to_string()),
        ("region".to_string(), "eu".to_string()),
    ]));
    let matching = RequestContext::builder()
        .actor_id("alice")
        .resource_id(AgentId::from_slug("support-bot"))
        .environment(Environment::Prod)
        .metadata_entry("team", "payments")
        .metadata_entry("region", "eu")
        .build()
        .expect("context");
    assert_eq!(
        evaluate(std::slice::from_ref(&policy), &matching).outcome,
        DecisionOutcome::Deny
    );

    let partial = RequestContext::builder()
        .actor_id("alice")
        .resource_id(AgentId::from_slug("support-bot"))
        .environment(Environment::Prod)
        .metadata_entry("team", "payments")
        .build()
        .expect("context");
    assert_eq!(
        evaluate(&[policy], &partial).outcome,
        DecisionOutcome::Allow
    );
}

#[test]
fn intent_condition_matches_any_listed_intent() {
    let mut policy = tag_policy("intent_gate", 10, PolicyEffect::Review, None);
    policy.conditions.intent = Some(BTreeSet::from([
        "tool_call".to_string(),
        "data_access".to_string(),
    ]));
    let tool_call = RequestContext::builder()
        .actor_id("alice")
        .resource_id(AgentId::from_slug("support-bot"))
        .environment(Environment::Prod)
        .intent("tool_call")
        .build()
        .expect("context");
    assert_eq!(
        evaluate(std::slice::from_ref(&policy), &tool_call).outcome,
        DecisionOutcome::Review
    );

    let generation = context(Environment::Prod, &[]);
    assert_eq!(
        evaluate(&[policy], &generation).outcome,
        DecisionOutcome::Allow
    );
}

#[test]
fn disabled_policies_never_participate() {
    let mut deny = tag_policy("disabled_deny", 100, PolicyEffect::Deny, None);
    deny.enabled = false;
    let decision = evaluate(&[deny], &context(Environment::Prod, &[]));
    assert_eq!(decision.outcome, DecisionOutcome::Allow);
    assert!(decision.matched_policies.is_empty());
}

#[test]
fn empty_policy_set_allows() {
    let decision = evaluate(&[], &context(Environment::Prod, &["pii"]));
    assert_eq!(decision.outcome, DecisionOutcome::Allow);
    assert_eq!(decision.reason, "No blocking policies matched");
}

#[test]
fn repeated_evaluations_return_identical_decisions() {
    let policies = vec![
        tag_policy("allow_one", 30, PolicyEffect::Allow, None),
        tag_policy("allow_two", 30, PolicyEffect::Allow, None),
        prod_pii_policy(),
    ];
    let ctx = context(Environment::Prod, &["pii"]);
    let first = evaluate(&policies, &ctx);
    for _ in 0..10 {
        assert_eq!(evaluate(&policies, &ctx), first);
    }
}

#[test]
fn policy_set_swaps_atomically() {
    let set = PolicySet::new();
    assert!(set.is_empty());
    let before = set.snapshot();
    set.replace(vec![prod_pii_policy()]);
    assert_eq!(set.len(), 1);
    assert!(
        before.is_empty(),
        "snapshots taken before the swap keep the old set"
    );
}
