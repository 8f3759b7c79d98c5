// crates/sentinel-gate-cli/src/main.rs
// ============================================================================
// Module: Sentinel Gate CLI Entry Point
// Description: Operator commands for offline policy and audit workflows.
// Purpose: Evaluate policies, verify exported audit bundles, and validate
// configuration without a running control plane.
// Dependencies: clap, sentinel-gate-config, sentinel-gate-core, serde_json
// ============================================================================

//! ## Overview
//! The CLI covers the offline half of operating Sentinel Gate: dry-running a
//! policy directory against a request context, verifying the integrity of an
//! exported audit bundle with the signing secret, and validating a
//! configuration file before deployment. Inputs are untrusted and validated
//! before use.

// ============================================================================
// SECTION: Modules
// ============================================================================


// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use clap::Subcommand;
use sentinel_gate_config::ControlPlaneConfig;
use sentinel_gate_config::load_policies_from_dir;
use sentinel_gate_core::RequestContext;
use sentinel_gate_core::hashing::SigningSecret;
use sentinel_gate_core::runtime::audit::ExportBundle;
use sentinel_gate_core::runtime::audit::verify_chain;
use sentinel_gate_core::runtime::engine;
use thiserror::Error;

// ============================================================================
// SECTION: CLI Definition
// ============================================================================

/// Sentinel Gate operator CLI.
#[derive(Debug, Parser)]
#[command(name = "sentinel-gate", version, about = "Sentinel Gate operator tools")]
struct Cli {
    /// Command to run.
    #[command(subcommand)]
    command: Command,
}

/// Operator commands.
#[derive(Debug, Subcommand)]
enum Command {
    /// Evaluates a policy directory against a request-context file.
    Evaluate {
        /// Directory containing YAML or JSON policy files.
        #[arg(long)]
        policies: PathBuf,
        /// JSON file containing the request context.
        #[arg(long)]
        context: PathBuf,
    },
    /// Verifies the integrity of an exported audit bundle.
    VerifyExport {
        /// JSON file containing the export bundle.
        #[arg(long)]
        bundle: PathBuf,
        /// HMAC secret the trail was signed with.
        #[arg(long)]
        secret: String,
    },
    /// Loads and validates a configuration file.
    CheckConfig {
        /// TOML configuration file.
        #[arg(long)]
        config: PathBuf,
    },
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI failure carrying the message shown to the operator.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Operator-facing failure message.
    message: String,
}

impl CliError {
    /// Creates a CLI error from any displayable cause.
    fn new(message: impl ToString) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes one line to stdout.
fn write_stdout_line(line: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(line.as_bytes())?;
    stdout.write_all(b"\n")
}

/// Writes one line to stderr.
fn write_stderr_line(line: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr().lock();
    stderr.write_all(line.as_bytes())?;
    stderr.write_all(b"\n")
}

/// Renders a value as pretty JSON and writes it to stdout.
fn write_json<T: serde::Serialize>(value: &T) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value).map_err(CliError::new)?;
    write_stdout_line(&rendered).map_err(CliError::new)
}

// ============================================================================
// SECTION: Commands
// ============================================================================

/// Runs the evaluate command.
fn run_evaluate(policies: &Path, context: &Path) -> Result<(), CliError> {
    let policies = load_policies_from_dir(policies).map_err(CliError::new)?;
    let raw = std::fs::read_to_string(context).map_err(CliError::new)?;
    let context: RequestContext = serde_json::from_str(&raw).map_err(CliError::new)?;
    let decision = engine::evaluate(&policies, &context);
    write_json(&decision)
}

/// Runs the verify-export command.
///
/// Exits nonzero when the bundle does not verify.
fn run_verify_export(bundle: &Path, secret: &str) -> Result<(), CliError> {
    let raw = std::fs::read_to_string(bundle).map_err(CliError::new)?;
    let bundle: ExportBundle = serde_json::from_str(&raw).map_err(CliError::new)?;
    let secret = SigningSecret::new(secret.as_bytes()).map_err(CliError::new)?;
    let report = verify_chain(&bundle.entries, &secret);
    write_json(&report)?;
    if report.valid {
        Ok(())
    } else {
        Err(CliError::new(format!(
            "export bundle failed verification with {} issues",
            report.issues.len()
        )))
    }
}

/// Runs the check-config command.
fn run_check_config(config: &Path) -> Result<(), CliError> {
    let config = ControlPlaneConfig::from_path(config).map_err(CliError::new)?;
    write_stdout_line(&format!(
        "config ok (enforce_mode={}, sweep_interval={}s, breaker={}:{}:{}s)",
        config.enforce_mode,
        config.approval.sweep_interval_seconds,
        config.circuit_breaker.failure_threshold,
        config.circuit_breaker.success_threshold,
        config.circuit_breaker.timeout_seconds,
    ))
    .map_err(CliError::new)
}

/// Dispatches one parsed command.
fn run(cli: Cli) -> Result<(), CliError> {
    match &cli.command {
        Command::Evaluate {
            policies,
            context,
        } => run_evaluate(policies, context),
        Command::VerifyExport {
            bundle,
            secret,
        } => run_verify_export(bundle, secret),
        Command::CheckConfig {
            config,
        } => run_check_config(config),
    }
}

/// CLI entry point.
fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            let _ = write_stderr_line(&error.message);
            ExitCode::FAILURE
        }
    }
}
