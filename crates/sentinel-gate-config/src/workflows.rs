// crates/sentinel-gate-config/src/workflows.rs
// ============================================================================
// Module: Sentinel Gate Workflow Catalog
// Description: Approval workflow loading and the built-in catalog.
// Purpose: Ship review workflows operators can use before writing their own.
// Dependencies: serde_json, serde_yaml, sentinel-gate-core
// ============================================================================

//! ## Overview
//! Workflows load from the same YAML/JSON document style as policies. The
//! built-in catalog mirrors common review postures: a standard single
//! approver with a one-hour window, a high-risk two-level escalation, and a
//! critical workflow that escalates to executives immediately.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;

use sentinel_gate_core::RiskLevel;
use sentinel_gate_core::core::identifiers::WorkflowId;
use sentinel_gate_core::runtime::approval::ApprovalWorkflow;
use sentinel_gate_core::runtime::approval::EscalationLevel;
use sentinel_gate_core::runtime::approval::EscalationRule;
use sentinel_gate_core::runtime::approval::TimeoutAction;

use crate::policies::PolicyLoadError;

// ============================================================================
// SECTION: Loading
// ============================================================================

/// Loads one workflow from a YAML or JSON file, chosen by extension.
///
/// # Errors
///
/// Returns a [`PolicyLoadError`] when the file cannot be read, has an
/// unrecognized extension, or fails to parse.
pub fn load_workflow_file(path: &Path) -> Result<ApprovalWorkflow, PolicyLoadError> {
    let raw = std::fs::read_to_string(path).map_err(|source| PolicyLoadError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let extension = path
        .extension()
        .and_then(|extension| extension.to_str())
        .unwrap_or_default();
    match extension {
        "yaml" | "yml" => {
            serde_yaml::from_str(&raw).map_err(|error| PolicyLoadError::Parse {
                path: path.to_path_buf(),
                message: error.to_string(),
            })
        }
        "json" => serde_json::from_str(&raw).map_err(|error| PolicyLoadError::Parse {
            path: path.to_path_buf(),
            message: error.to_string(),
        }),
        _ => Err(PolicyLoadError::UnsupportedFormat {
            path: path.to_path_buf(),
        }),
    }
}

/// Loads every workflow from a directory, in sorted file order.
///
/// # Errors
///
/// Returns a [`PolicyLoadError`] when the directory cannot be read or any
/// recognized file fails to parse.
pub fn load_workflows_from_dir(directory: &Path) -> Result<Vec<ApprovalWorkflow>, PolicyLoadError> {
    let entries = std::fs::read_dir(directory).map_err(|source| PolicyLoadError::Read {
        path: directory.to_path_buf(),
        source,
    })?;
    let mut paths: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            path.extension()
                .and_then(|extension| extension.to_str())
                .is_some_and(|extension| matches!(extension, "yaml" | "yml" | "json"))
        })
        .collect();
    paths.sort();
    let mut workflows = Vec::with_capacity(paths.len());
    for path in paths {
        workflows.push(load_workflow_file(&path)?);
    }
    Ok(workflows)
}

// ============================================================================
// SECTION: Built-in Catalog
// ============================================================================

/// Returns the built-in workflow catalog.
///
/// `standard`: one approver, one-hour window, escalate on timeout.
/// `high-risk`: thirty-minute window, immediate escalation at high risk.
/// `critical`: fifteen-minute window, executive escalation at critical risk.
#[must_use]
pub fn default_workflows() -> Vec<ApprovalWorkflow> {
    vec![
        ApprovalWorkflow {
            id: WorkflowId::new("standard"),
            name: "Standard Approval".to_string(),
            description: "Standard single-approver workflow with 1-hour timeout".to_string(),
            approver_roles: vec!["approver".to_string(), "admin".to_string()],
            required_approvals: 1,
            timeout_seconds: 3_600,
            timeout_action: TimeoutAction::Escalate,
            escalation_rules: vec![EscalationRule {
                rule_id: "timeout-escalation".to_string(),
                description: "Escalate to L2 after 1 hour".to_string(),
                timeout_seconds: Some(3_600),
                rejection_count: None,
                risk_level_threshold: None,
                escalate_to_level: EscalationLevel::L2,
                escalate_to_roles: vec!["admin".to_string()],
                max_attempts: 2,
            }],
            require_rationale: true,
        },
        ApprovalWorkflow {
            id: WorkflowId::new("high-risk"),
            name: "High-Risk Approval".to_string(),
            description: "Multi-level approval for high-risk AI operations".to_string(),
            approver_roles: vec!["approver".to_string(), "admin".to_string()],
            required_approvals: 2,
            timeout_seconds: 1_800,
            timeout_action: TimeoutAction::Escalate,
            escalation_rules: vec![
                EscalationRule {
                    rule_id: "immediate-escalation".to_string(),
                    description: "Escalate high-risk immediately to L2".to_string(),
                    timeout_seconds: None,
                    rejection_count: None,
                    risk_level_threshold: Some(RiskLevel::High),
                    escalate_to_level: EscalationLevel::L2,
                    escalate_to_roles: vec!["admin".to_string()],
                    max_attempts: 3,
                },
                EscalationRule {
                    rule_id: "timeout-escalation".to_string(),
                    description: "Escalate to L3 after 30 minutes".to_string(),
                    timeout_seconds: Some(1_800),
                    rejection_count: None,
                    risk_level_threshold: None,
                    escalate_to_level: EscalationLevel::L3,
                    escalate_to_roles: vec!["admin".to_string()],
                    max_attempts: 2,
                },
            ],
            require_rationale: true,
        },
        ApprovalWorkflow {
            id: WorkflowId::new("critical"),
            name: "Critical System Approval".to_string(),
            description: "Executive-level approval for critical AI systems".to_string(),
            approver_roles: vec!["admin".to_string()],
            required_approvals: 2,
            timeout_seconds: 900,
            timeout_action: TimeoutAction::Escalate,
            escalation_rules: vec![EscalationRule {
                rule_id: "immediate-executive-escalation".to_string(),
                description: "Escalate critical systems to L4 immediately".to_string(),
                timeout_seconds: None,
                rejection_count: None,
                risk_level_threshold: Some(RiskLevel::Critical),
                escalate_to_level: EscalationLevel::L4,
                escalate_to_roles: vec!["admin".to_string()],
                max_attempts: 1,
            }],
            require_rationale: true,
        },
    ]
}
