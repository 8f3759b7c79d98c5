// crates/sentinel-gate-core/src/interfaces/mod.rs
// ============================================================================
// Module: Sentinel Gate Interfaces
// Description: Backend-agnostic seams for model calls, identity, and storage.
// Purpose: Define the contract surfaces the runtime depends on without
// embedding backend-specific details.
// Dependencies: async-trait, serde, thiserror, crate::core
// ============================================================================

//! ## Overview
//! Interfaces define how Sentinel Gate integrates with external systems. The
//! model provider, the upstream authenticator, and the audit persistence
//! backend are all injected capabilities. Implementations must fail closed
//! on missing or invalid data.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::core::agent::Agent;
use crate::core::identity::IdentityMetadata;
use crate::runtime::audit::AuditEntry;

// ============================================================================
// SECTION: Model Invocation
// ============================================================================

/// Errors returned by the injected model capability.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvokeError {
    /// The provider reported a failure.
    #[error("model invocation failed: {0}")]
    Failed(String),
    /// The caller cancelled the invocation.
    #[error("model invocation cancelled")]
    Cancelled,
    /// The caller-supplied deadline elapsed.
    #[error("model invocation deadline exceeded")]
    DeadlineExceeded,
}

/// Abstract capability that performs the actual model call.
///
/// The core does not prescribe a wire protocol; hosts supply an
/// implementation per provider. The deadline is caller-specified and
/// cancellation must propagate as [`InvokeError::Cancelled`].
#[async_trait]
pub trait ModelInvoker: Send + Sync {
    /// Invokes the model behind the agent with the given prompt.
    ///
    /// # Errors
    ///
    /// Returns an [`InvokeError`] when the provider fails, the caller
    /// cancels, or the deadline elapses.
    async fn invoke(
        &self,
        agent: &Agent,
        prompt: &str,
        context: &BTreeMap<String, String>,
        deadline: Duration,
    ) -> Result<String, InvokeError>;
}

// ============================================================================
// SECTION: Token Validation
// ============================================================================

/// Upstream authenticator contract.
///
/// Production implementations must verify signature, issuer, audience, and
/// expiration before producing identity metadata.
pub trait TokenValidator: Send + Sync {
    /// Validates a bearer token into identity metadata, or rejects it.
    fn validate(&self, token: &str) -> Option<IdentityMetadata>;
}

// ============================================================================
// SECTION: Audit Storage
// ============================================================================

/// Errors returned by audit stores.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend rejected the append.
    #[error("audit store append failed: {0}")]
    AppendFailed(String),
}

/// Pluggable persistence seam for the audit chain.
///
/// The trail owns the chain invariants; stores only persist entries in
/// append order and return them in the same order.
pub trait AuditStore: Send + Sync {
    /// Persists one entry at the end of the log.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when the backend rejects the entry.
    fn append(&self, entry: AuditEntry) -> Result<(), StoreError>;

    /// Returns every entry in append order.
    fn scan(&self) -> Vec<AuditEntry>;

    /// Returns the number of persisted entries.
    fn len(&self) -> usize;

    /// Returns whether the log is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-memory audit store; the V1 default backend.
///
/// # Invariants
/// - Entries are returned in exactly the order they were appended.
#[derive(Debug, Default)]
pub struct InMemoryAuditStore {
    /// Append-ordered entries.
    entries: RwLock<Vec<AuditEntry>>,
}

impl InMemoryAuditStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl AuditStore for InMemoryAuditStore {
    fn append(&self, entry: AuditEntry) -> Result<(), StoreError> {
        self.entries
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(entry);
        Ok(())
    }

    fn scan(&self) -> Vec<AuditEntry> {
        self.entries
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }
}
