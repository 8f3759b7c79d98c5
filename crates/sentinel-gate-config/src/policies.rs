// crates/sentinel-gate-config/src/policies.rs
// ============================================================================
// Module: Sentinel Gate Policy Loading
// Description: YAML and JSON policy file loading with atomic reload.
// Purpose: Keep policies as auditable configuration, not code.
// Dependencies: serde_json, serde_yaml, thiserror, sentinel-gate-core
// ============================================================================

//! ## Overview
//! Policies live on disk as YAML or JSON documents carrying the declarative
//! fields of the policy record. Directory loading walks files in sorted
//! order so equal-priority policies keep a stable evaluation order across
//! reloads. A reload replaces the whole set atomically; in-flight
//! evaluations keep the snapshot they started with.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;

use sentinel_gate_core::Policy;
use sentinel_gate_core::PolicySet;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors produced while loading policy files.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum PolicyLoadError {
    /// The file or directory could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        /// Path that failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The document failed to parse as a policy.
    #[error("failed to parse policy {path}: {message}")]
    Parse {
        /// Path that failed.
        path: PathBuf,
        /// Parser diagnostic.
        message: String,
    },
    /// The file extension is not a recognized policy format.
    #[error("unsupported policy format: {path}")]
    UnsupportedFormat {
        /// Path with the unrecognized extension.
        path: PathBuf,
    },
}

// ============================================================================
// SECTION: Loading
// ============================================================================

/// Loads one policy from a YAML or JSON file, chosen by extension.
///
/// # Errors
///
/// Returns a [`PolicyLoadError`] when the file cannot be read, has an
/// unrecognized extension, or fails to parse.
pub fn load_policy_file(path: &Path) -> Result<Policy, PolicyLoadError> {
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

/// Loads every policy from a directory, in sorted file order.
///
/// Files with unrecognized extensions are skipped; malformed policy files
/// are errors. A missing directory is an error; an absent configuration
/// entry should instead skip loading entirely.
///
/// # Errors
///
/// Returns a [`PolicyLoadError`] when the directory cannot be read or any
/// recognized file fails to parse.
pub fn load_policies_from_dir(directory: &Path) -> Result<Vec<Policy>, PolicyLoadError> {
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
    let mut policies = Vec::with_capacity(paths.len());
    for path in paths {
        policies.push(load_policy_file(&path)?);
    }
    Ok(policies)
}

/// Reloads a directory into a policy set, replacing the set atomically.
///
/// Loading is idempotent: reloading an unchanged directory yields an
/// identical set.
///
/// # Errors
///
/// Returns a [`PolicyLoadError`] when loading fails; the set keeps its
/// previous snapshot in that case.
pub fn reload_into(set: &PolicySet, directory: &Path) -> Result<usize, PolicyLoadError> {
    let policies = load_policies_from_dir(directory)?;
    let count = policies.len();
    set.replace(policies);
    Ok(count)
}
