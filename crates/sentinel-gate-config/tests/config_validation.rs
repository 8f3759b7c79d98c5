// crates/sentinel-gate-config/tests/config_validation.rs
// ============================================================================
// Module: Config Validation Tests
// Description: TOML parsing, defaults, and required-field validation.
// ============================================================================

//! ## Overview
//! Verifies that configuration defaults match the documented values, that a
//! missing audit secret refuses to load, and that the derived breaker and
//! sweep settings round-trip into their runtime forms.

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

use std::time::Duration;

use sentinel_gate_config::ConfigError;
use sentinel_gate_config::ControlPlaneConfig;

#[test]
fn minimal_config_gets_documented_defaults() {
    let config = ControlPlaneConfig::from_toml("[audit]\nsecret = \"chain-secret\"\n")
        .expect("minimal config");
    assert!(config.enforce_mode);
    assert!(config.policy_engine.directory.is_none());
    assert_eq!(config.circuit_breaker.failure_threshold, 5);
    assert_eq!(config.circuit_breaker.success_threshold, 2);
    assert_eq!(config.circuit_breaker.timeout_seconds, 60);
    assert_eq!(config.approval.sweep_interval_seconds, 30);
    assert_eq!(config.sweep_interval(), Duration::from_secs(30));
}

#[test]
fn missing_audit_secret_refuses_to_load() {
    assert!(matches!(
        ControlPlaneConfig::from_toml("enforce_mode = true\n"),
        Err(ConfigError::MissingAuditSecret)
    ));
    assert!(matches!(
        ControlPlaneConfig::from_toml("[audit]\nsecret = \"\"\n"),
        Err(ConfigError::MissingAuditSecret)
    ));
}

#[test]
fn full_config_overrides_every_default() {
    let config = ControlPlaneConfig::from_toml(concat!(
        "enforce_mode = false\n",
        "[policy_engine]\n",
        "directory = \"/etc/sentinel/policies\"\n",
        "[audit]\n",
        "secret = \"chain-secret\"\n",
        "[circuit_breaker]\n",
        "failure_threshold = 7\n",
        "success_threshold = 3\n",
        "timeout_seconds = 120\n",
        "[approval]\n",
        "sweep_interval_seconds = 10\n",
    ))
    .expect("full config");
    assert!(!config.enforce_mode);
    assert_eq!(
        config.policy_engine.directory.as_deref(),
        Some(std::path::Path::new("/etc/sentinel/policies"))
    );
    let breaker = config.circuit_breaker_config();
    assert_eq!(breaker.failure_threshold, 7);
    assert_eq!(breaker.success_threshold, 3);
    assert_eq!(breaker.timeout_seconds, 120);
    assert_eq!(config.sweep_interval(), Duration::from_secs(10));
}

#[test]
fn malformed_toml_is_a_parse_error() {
    assert!(matches!(
        ControlPlaneConfig::from_toml("audit = ["),
        Err(ConfigError::Parse(_))
    ));
}

#[test]
fn signing_secret_derives_from_the_audit_section() {
    let config = ControlPlaneConfig::from_toml("[audit]\nsecret = \"chain-secret\"\n")
        .expect("config");
    assert!(config.signing_secret().is_ok());
}

#[test]
fn missing_file_is_a_read_error() {
    let error = ControlPlaneConfig::from_path(std::path::Path::new("/nonexistent/sentinel.toml"))
        .expect_err("missing file");
    assert!(matches!(error, ConfigError::Read { .. }));
}
