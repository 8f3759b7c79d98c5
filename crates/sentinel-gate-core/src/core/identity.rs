// crates/sentinel-gate-core/src/core/identity.rs
// ============================================================================
// Module: Sentinel Gate Identity Context
// Description: Immutable per-request descriptor of the calling identity.
// Purpose: Bind every governance decision to who made the request and from where.
// Dependencies: serde, crate::core::identifiers
// ============================================================================

//! ## Overview
//! Identity metadata is established by an upstream authenticator and enters
//! the pipeline fully formed. Construction validates the required fields,
//! so the record cannot exist without an actor and a role. It is immutable
//! afterwards; the executor copies its fields into the request context and
//! stamps the actor onto every audit entry it emits.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::identifiers::CorrelationId;

// ============================================================================
// SECTION: Identity Errors
// ============================================================================

/// Errors produced while constructing identity metadata.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdentityError {
    /// The acting principal was not supplied.
    #[error("actor_id is required")]
    MissingActorId,
    /// The actor role was not supplied.
    #[error("actor_role is required")]
    MissingActorRole,
}

// ============================================================================
// SECTION: Identity Metadata
// ============================================================================

/// Immutable descriptor of the identity behind a request.
///
/// # Invariants
/// - `actor_id` and `actor_role` are non-empty by construction.
/// - No mutation path exists after construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityMetadata {
    /// Stable identifier of the acting principal.
    actor_id: String,
    /// Role the actor holds for authorization decisions.
    actor_role: String,
    /// Optional email address of the actor.
    email: Option<String>,
    /// Optional source address the request arrived from.
    source_ip: Option<String>,
    /// Optional user-agent string of the calling client.
    user_agent: Option<String>,
    /// Optional correlation identifier propagated from upstream systems.
    correlation_id: Option<CorrelationId>,
}

impl IdentityMetadata {
    /// Creates identity metadata for the given actor and role.
    ///
    /// # Errors
    ///
    /// Returns an [`IdentityError`] when the actor identifier or role is
    /// empty.
    pub fn new(
        actor_id: impl Into<String>,
        actor_role: impl Into<String>,
    ) -> Result<Self, IdentityError> {
        let actor_id = actor_id.into();
        if actor_id.is_empty() {
            return Err(IdentityError::MissingActorId);
        }
        let actor_role = actor_role.into();
        if actor_role.is_empty() {
            return Err(IdentityError::MissingActorRole);
        }
        Ok(Self {
            actor_id,
            actor_role,
            email: None,
            source_ip: None,
            user_agent: None,
            correlation_id: None,
        })
    }

    /// Attaches an email address.
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Attaches the source address of the request.
    #[must_use]
    pub fn with_source_ip(mut self, source_ip: impl Into<String>) -> Self {
        self.source_ip = Some(source_ip.into());
        self
    }

    /// Attaches the user-agent string of the calling client.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Attaches an upstream correlation identifier.
    #[must_use]
    pub fn with_correlation_id(mut self, correlation_id: CorrelationId) -> Self {
        self.correlation_id = Some(correlation_id);
        self
    }

    /// Returns the actor identifier.
    #[must_use]
    pub fn actor_id(&self) -> &str {
        &self.actor_id
    }

    /// Returns the actor role.
    #[must_use]
    pub fn actor_role(&self) -> &str {
        &self.actor_role
    }

    /// Returns the actor email when provided.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    /// Returns the source address when provided.
    #[must_use]
    pub fn source_ip(&self) -> Option<&str> {
        self.source_ip.as_deref()
    }

    /// Returns the user-agent string when provided.
    #[must_use]
    pub fn user_agent(&self) -> Option<&str> {
        self.user_agent.as_deref()
    }

    /// Returns the correlation identifier when provided.
    #[must_use]
    pub fn correlation_id(&self) -> Option<&CorrelationId> {
        self.correlation_id.as_ref()
    }
}
