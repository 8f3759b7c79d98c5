// crates/sentinel-gate-core/src/core/context.rs
// ============================================================================
// Module: Sentinel Gate Request Context
// Description: Frozen truth payload judged by the policy engine.
// Purpose: Guarantee the facts under evaluation cannot change mid-decision.
// Dependencies: serde, thiserror, crate::core::{agent, identifiers}
// ============================================================================

//! ## Overview
//! The request context is the complete, frozen set of facts a policy
//! evaluation judges. It is constructed once at pipeline entry through
//! [`RequestContextBuilder`], which validates required fields before the
//! value exists; afterwards no mutation path exists, by construction rather
//! than by runtime check.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::agent::Environment;
use crate::core::identifiers::AgentId;

// ============================================================================
// SECTION: Context Errors
// ============================================================================

/// Errors produced while building a request context.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ContextError {
    /// The acting principal was not supplied.
    #[error("actor_id is required")]
    MissingActorId,
    /// The governed resource was not supplied.
    #[error("resource_id is required")]
    MissingResourceId,
    /// The deployment environment was not supplied.
    #[error("environment is required")]
    MissingEnvironment,
}

// ============================================================================
// SECTION: Request Context
// ============================================================================

/// Frozen request context for policy evaluation.
///
/// # Invariants
/// - `actor_id`, `resource_id`, and `environment` are present and non-empty.
/// - No field can be mutated after construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    /// Who initiated the request.
    actor_id: String,
    /// Role of the actor.
    actor_role: String,
    /// The governed resource, always the agent identifier in this pipeline.
    resource_id: AgentId,
    /// Type of the governed resource.
    resource_type: String,
    /// Deployment environment the request targets.
    environment: Environment,
    /// Action being performed.
    intent: String,
    /// Classification tags attached to the request.
    tags: BTreeSet<String>,
    /// Additional context facts.
    metadata: BTreeMap<String, String>,
}

impl RequestContext {
    /// Starts building a request context.
    #[must_use]
    pub fn builder() -> RequestContextBuilder {
        RequestContextBuilder::default()
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

    /// Returns the governed resource identifier.
    #[must_use]
    pub const fn resource_id(&self) -> &AgentId {
        &self.resource_id
    }

    /// Returns the resource type.
    #[must_use]
    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    /// Returns the deployment environment.
    #[must_use]
    pub const fn environment(&self) -> Environment {
        self.environment
    }

    /// Returns the intent.
    #[must_use]
    pub fn intent(&self) -> &str {
        &self.intent
    }

    /// Returns the classification tags.
    #[must_use]
    pub const fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    /// Returns the metadata mapping.
    #[must_use]
    pub const fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }
}

// ============================================================================
// SECTION: Builder
// ============================================================================

/// Validating builder for [`RequestContext`].
///
/// # Invariants
/// - `build` succeeds only when every required field is present.
#[derive(Debug, Default)]
pub struct RequestContextBuilder {
    /// Acting principal.
    actor_id: Option<String>,
    /// Actor role; defaults to empty when not supplied.
    actor_role: String,
    /// Governed resource identifier.
    resource_id: Option<AgentId>,
    /// Resource type; defaults to `agent`.
    resource_type: Option<String>,
    /// Deployment environment.
    environment: Option<Environment>,
    /// Intent; defaults to `generation`.
    intent: Option<String>,
    /// Classification tags.
    tags: BTreeSet<String>,
    /// Additional context facts.
    metadata: BTreeMap<String, String>,
}

impl RequestContextBuilder {
    /// Sets the acting principal.
    #[must_use]
    pub fn actor_id(mut self, actor_id: impl Into<String>) -> Self {
        self.actor_id = Some(actor_id.into());
        self
    }

    /// Sets the actor role.
    #[must_use]
    pub fn actor_role(mut self, actor_role: impl Into<String>) -> Self {
        self.actor_role = actor_role.into();
        self
    }

    /// Sets the governed resource identifier.
    #[must_use]
    pub fn resource_id(mut self, resource_id: AgentId) -> Self {
        self.resource_id = Some(resource_id);
        self
    }

    /// Sets the resource type.
    #[must_use]
    pub fn resource_type(mut self, resource_type: impl Into<String>) -> Self {
        self.resource_type = Some(resource_type.into());
        self
    }

    /// Sets the deployment environment.
    #[must_use]
    pub const fn environment(mut self, environment: Environment) -> Self {
        self.environment = Some(environment);
        self
    }

    /// Sets the intent.
    #[must_use]
    pub fn intent(mut self, intent: impl Into<String>) -> Self {
        self.intent = Some(intent.into());
        self
    }

    /// Adds one classification tag.
    #[must_use]
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    /// Replaces the classification tags.
    #[must_use]
    pub fn tags(mut self, tags: BTreeSet<String>) -> Self {
        self.tags = tags;
        self
    }

    /// Adds one metadata fact.
    #[must_use]
    pub fn metadata_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Replaces the metadata mapping.
    #[must_use]
    pub fn metadata(mut self, metadata: BTreeMap<String, String>) -> Self {
        self.metadata = metadata;
        self
    }

    /// Builds the frozen request context.
    ///
    /// # Errors
    ///
    /// Returns a [`ContextError`] when a required field is absent or empty.
    pub fn build(self) -> Result<RequestContext, ContextError> {
        let actor_id = self
            .actor_id
            .filter(|value| !value.is_empty())
            .ok_or(ContextError::MissingActorId)?;
        let resource_id = self
            .resource_id
            .filter(|value| !value.as_str().is_empty())
            .ok_or(ContextError::MissingResourceId)?;
        let environment = self.environment.ok_or(ContextError::MissingEnvironment)?;
        Ok(RequestContext {
            actor_id,
            actor_role: self.actor_role,
            resource_id,
            resource_type: self.resource_type.unwrap_or_else(|| "agent".to_string()),
            environment,
            intent: self.intent.unwrap_or_else(|| "generation".to_string()),
            tags: self.tags,
            metadata: self.metadata,
        })
    }
}
