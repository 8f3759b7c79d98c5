// crates/sentinel-gate-core/tests/audit_chain.rs
// ============================================================================
// Module: Audit Chain Tests
// Description: Chain integrity, tamper detection, and export bundles.
// ============================================================================

//! ## Overview
//! Exercises the hash chain end to end: clean appends verify, and every
//! tampering shape (field mutation, reordering, forged insertion, deletion,
//! wrong secret) is detected and reported.

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

use std::sync::Arc;

use common::harness;
use sentinel_gate_core::core::AuditEventType;
use sentinel_gate_core::core::identifiers::AgentId;
use sentinel_gate_core::core::identifiers::ExecutionId;
use sentinel_gate_core::hashing::SigningSecret;
use sentinel_gate_core::runtime::audit::AuditEntry;
use sentinel_gate_core::runtime::audit::AuditFilter;
use sentinel_gate_core::runtime::audit::IntegrityIssue;
use sentinel_gate_core::runtime::audit::verify_chain;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;

/// Appends `count` entries bound to the given request id.
fn append_entries(harness: &common::Harness, request: &ExecutionId, count: usize) -> Vec<AuditEntry> {
    (0..count)
        .map(|index| {
            let mut data = Map::new();
            data.insert("step".to_string(), json!(index));
            harness
                .audit
                .append(
                    AuditEventType::RequestSubmitted,
                    data,
                    Some(request),
                    Some(&AgentId::from_slug("support-bot")),
                    Some("alice"),
                )
                .expect("append")
        })
        .collect()
}

#[test]
fn clean_chain_verifies() {
    let harness = harness();
    let request = ExecutionId::new("exec-clean");
    let entries = append_entries(&harness, &request, 5);
    assert_eq!(entries.first().map(|entry| entry.sequence), Some(1));
    assert_eq!(entries.last().map(|entry| entry.sequence), Some(5));
    assert!(entries[0].previous_hash.is_none());
    for window in entries.windows(2) {
        assert_eq!(window[1].previous_hash.as_ref(), Some(&window[0].hash));
    }
    let report = harness.audit.verify_integrity();
    assert!(report.valid, "unexpected issues: {:?}", report.issues);
    assert_eq!(report.total_entries, 5);
}

#[test]
fn empty_chain_is_valid() {
    let harness = harness();
    let report = harness.audit.verify_integrity();
    assert!(report.valid);
    assert_eq!(report.total_entries, 0);
}

#[test]
fn mutating_one_data_byte_is_detected() {
    let harness = harness();
    let mut entries = append_entries(&harness, &ExecutionId::new("exec-tamper"), 3);
    entries[1]
        .data
        .insert("step".to_string(), json!(99));
    let secret = SigningSecret::new(b"test-chain-secret").expect("secret");
    let report = verify_chain(&entries, &secret);
    assert!(!report.valid);
    assert!(report.issues.iter().any(|issue| matches!(
        issue,
        IntegrityIssue::HashMismatch { sequence: 2, .. }
    )));
}

#[test]
fn reordering_entries_is_detected() {
    let harness = harness();
    let mut entries = append_entries(&harness, &ExecutionId::new("exec-reorder"), 3);
    entries.swap(0, 2);
    let secret = SigningSecret::new(b"test-chain-secret").expect("secret");
    let report = verify_chain(&entries, &secret);
    assert!(!report.valid);
    assert!(report.issues.iter().any(|issue| matches!(
        issue,
        IntegrityIssue::SequenceMismatch { .. }
    )));
    assert!(report.issues.iter().any(|issue| matches!(
        issue,
        IntegrityIssue::ChainBroken { .. }
    )));
}

#[test]
fn inserting_a_forged_entry_is_detected() {
    let harness = harness();
    let mut entries = append_entries(&harness, &ExecutionId::new("exec-forge"), 3);
    let mut forged = entries[1].clone();
    forged.data.insert("forged".to_string(), json!(true));
    entries.insert(2, forged);
    let secret = SigningSecret::new(b"test-chain-secret").expect("secret");
    let report = verify_chain(&entries, &secret);
    assert!(!report.valid);
}

#[test]
fn deleting_an_entry_is_detected() {
    let harness = harness();
    let mut entries = append_entries(&harness, &ExecutionId::new("exec-delete"), 4);
    entries.remove(1);
    let secret = SigningSecret::new(b"test-chain-secret").expect("secret");
    let report = verify_chain(&entries, &secret);
    assert!(!report.valid);
    assert!(report.issues.iter().any(|issue| matches!(
        issue,
        IntegrityIssue::ChainBroken { .. }
    )));
}

#[test]
fn wrong_secret_invalidates_every_signature() {
    let harness = harness();
    let entries = append_entries(&harness, &ExecutionId::new("exec-secret"), 3);
    let wrong = SigningSecret::new(b"not-the-secret").expect("secret");
    let report = verify_chain(&entries, &wrong);
    assert!(!report.valid);
    let signature_issues = report
        .issues
        .iter()
        .filter(|issue| matches!(issue, IntegrityIssue::InvalidSignature { .. }))
        .count();
    assert_eq!(signature_issues, 3);
}

#[test]
fn verify_entry_accepts_genuine_and_rejects_tampered() {
    let harness = harness();
    let entries = append_entries(&harness, &ExecutionId::new("exec-single"), 1);
    let genuine = &entries[0];
    assert!(harness.audit.verify_entry(genuine));
    let mut tampered = genuine.clone();
    tampered.actor_id = Some("mallory".to_string());
    assert!(!harness.audit.verify_entry(&tampered));
}

#[test]
fn chain_of_custody_preserves_append_order() {
    let harness = harness();
    let ours = ExecutionId::new("exec-ours");
    let theirs = ExecutionId::new("exec-theirs");
    append_entries(&harness, &ours, 2);
    append_entries(&harness, &theirs, 1);
    append_entries(&harness, &ours, 1);
    let custody = harness.audit.chain_of_custody(&ours);
    assert_eq!(custody.len(), 3);
    assert!(custody.windows(2).all(|pair| pair[0].sequence < pair[1].sequence));
}

#[test]
fn query_returns_newest_first_with_limit() {
    let harness = harness();
    append_entries(&harness, &ExecutionId::new("exec-query"), 10);
    let newest = harness.audit.query(&AuditFilter::default(), 3);
    assert_eq!(newest.len(), 3);
    assert_eq!(newest[0].sequence, 10);
    assert_eq!(newest[2].sequence, 8);
}

#[test]
fn export_bundle_carries_report_and_filters() {
    let harness = harness();
    let request = ExecutionId::new("exec-export");
    append_entries(&harness, &request, 4);
    let bundle = harness.audit.export(AuditFilter {
        request_id: Some(request),
        ..AuditFilter::default()
    });
    assert!(bundle.export_metadata.integrity_verified);
    assert_eq!(bundle.export_metadata.total_entries, 4);
    assert_eq!(bundle.entries.len(), 4);
    assert!(bundle.integrity_report.valid);
    assert!(bundle.export_metadata.generated_at.is_some());
    let rendered = serde_json::to_string(&bundle).expect("bundle serializes");
    assert!(rendered.contains("export_metadata"));
}

#[test]
fn statistics_count_event_types() {
    let harness = harness();
    append_entries(&harness, &ExecutionId::new("exec-stats"), 3);
    let mut data = Map::new();
    data.insert("reason".to_string(), Value::String("tripped".to_string()));
    harness
        .audit
        .append(AuditEventType::RequestBlocked, data, None, None, None)
        .expect("append");
    let stats = harness.audit.statistics();
    assert_eq!(stats.total_entries, 4);
    assert_eq!(stats.event_types.get("request.submitted"), Some(&3));
    assert_eq!(stats.event_types.get("request.blocked"), Some(&1));
    assert!(stats.first_entry.is_some());
}

#[test]
fn empty_secret_is_refused() {
    assert!(SigningSecret::new(b"").is_err());
}

#[test]
fn canonical_hash_is_field_order_independent() {
    let a: Value = serde_json::from_str(r#"{"b":2,"a":1}"#).expect("json");
    let b: Value = serde_json::from_str(r#"{"a":1,"b":2}"#).expect("json");
    let hash_a = sentinel_gate_core::hashing::hash_canonical_json(&a).expect("hash");
    let hash_b = sentinel_gate_core::hashing::hash_canonical_json(&b).expect("hash");
    assert_eq!(hash_a, hash_b);
}

#[test]
fn concurrent_appends_keep_the_chain_linear() {
    let harness = Arc::new(harness());
    let mut handles = Vec::new();
    for worker in 0..4 {
        let harness = Arc::clone(&harness);
        handles.push(std::thread::spawn(move || {
            for step in 0..25 {
                let mut data = Map::new();
                data.insert("worker".to_string(), json!(worker));
                data.insert("step".to_string(), json!(step));
                harness
                    .audit
                    .append(AuditEventType::RequestSubmitted, data, None, None, None)
                    .expect("append");
            }
        }));
    }
    for handle in handles {
        handle.join().expect("worker");
    }
    let report = harness.audit.verify_integrity();
    assert!(report.valid, "unexpected issues: {:?}", report.issues);
    assert_eq!(report.total_entries, 100);
}
