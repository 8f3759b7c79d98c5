// crates/sentinel-gate-core/src/core/identifiers.rs
// ============================================================================
// Module: Sentinel Gate Identifiers
// Description: Canonical opaque identifiers for governed entities and events.
// Purpose: Provide strongly typed, serializable identifiers with stable wire forms.
// Dependencies: serde, thiserror, crate::core::time
// ============================================================================

//! ## Overview
//! This module defines the canonical identifiers used throughout Sentinel
//! Gate. Identifiers are opaque strings on the wire. Agent identifiers are
//! the one exception to full opacity: they are derived from display names by
//! a stable slug rule so operators can predict them, and the derivation is
//! validated at construction.
//!
//! The [`IdMinter`] is the single source of fresh identifiers. It combines a
//! process-local monotonic counter with clock milliseconds, which keeps ids
//! unique within a process and legible in exported audit bundles.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::time::Clock;

// ============================================================================
// SECTION: Identifier Macro
// ============================================================================

/// Declares an opaque string identifier newtype with stable wire form.
macro_rules! string_identifier {
    ($(#[$docs:meta])* $name:ident) => {
        $(#[$docs])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates an identifier from a raw string value.
            #[must_use]
            pub fn new(raw: impl Into<String>) -> Self {
                Self(raw.into())
            }

            /// Returns the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(raw: &str) -> Self {
                Self::new(raw)
            }
        }
    };
}

string_identifier! {
    /// Execution identifier minted at pipeline entry.
    ///
    /// # Invariants
    /// - Unique per request within a process.
    ExecutionId
}

string_identifier! {
    /// Approval identifier bound to a single review request.
    ///
    /// # Invariants
    /// - Stable across escalations of the same approval.
    ApprovalId
}

string_identifier! {
    /// Event identifier for audit and observability entries.
    EventId
}

string_identifier! {
    /// Decision record identifier for approval outcomes.
    RecordId
}

string_identifier! {
    /// Policy identifier as declared in policy configuration.
    PolicyId
}

string_identifier! {
    /// Approval workflow identifier.
    WorkflowId
}

string_identifier! {
    /// Correlation identifier supplied by upstream callers.
    CorrelationId
}

// ============================================================================
// SECTION: Agent Identifier
// ============================================================================

/// Error produced when an agent name cannot be reduced to a slug.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AgentIdError {
    /// The display name contains no usable characters.
    #[error("agent name {0:?} reduces to an empty identifier")]
    EmptySlug(String),
}

/// Agent identifier derived from the agent's display name.
///
/// # Invariants
/// - Contains only lowercase ASCII alphanumerics and hyphens.
/// - Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(String);

impl AgentId {
    /// Derives an agent identifier from a display name.
    ///
    /// Lowercases the name, maps spaces and underscores to hyphens, and
    /// drops every character that is not alphanumeric or a hyphen.
    ///
    /// # Errors
    ///
    /// Returns [`AgentIdError::EmptySlug`] when nothing survives the
    /// derivation.
    pub fn from_name(name: &str) -> Result<Self, AgentIdError> {
        let slug: String = name
            .to_lowercase()
            .chars()
            .map(|ch| if ch == ' ' || ch == '_' { '-' } else { ch })
            .filter(|ch| ch.is_alphanumeric() || *ch == '-')
            .collect();
        if slug.is_empty() {
            return Err(AgentIdError::EmptySlug(name.to_string()));
        }
        Ok(Self(slug))
    }

    /// Creates an agent identifier from an already-derived slug.
    #[must_use]
    pub fn from_slug(slug: impl Into<String>) -> Self {
        Self(slug.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// SECTION: Identifier Minting
// ============================================================================

/// Mints unique, prefixed identifiers from a counter and a clock.
///
/// # Invariants
/// - The counter is monotonic per minter instance; ids never repeat within a
///   process even when the clock stands still.
pub struct IdMinter {
    /// Clock used for the millisecond component of minted ids.
    clock: Arc<dyn Clock>,
    /// Monotonic per-process counter.
    counter: AtomicU64,
}

impl IdMinter {
    /// Creates a minter backed by the provided clock.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            counter: AtomicU64::new(0),
        }
    }

    /// Mints a raw identifier with the provided prefix.
    fn mint(&self, prefix: &str) -> String {
        let sequence = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        let millis = self.clock.now().as_unix_millis();
        format!("{prefix}-{sequence}-{millis}")
    }

    /// Mints a fresh execution identifier.
    #[must_use]
    pub fn execution_id(&self) -> ExecutionId {
        ExecutionId::new(self.mint("exec"))
    }

    /// Mints a fresh approval identifier.
    #[must_use]
    pub fn approval_id(&self) -> ApprovalId {
        ApprovalId::new(self.mint("approval"))
    }

    /// Mints a fresh event identifier.
    #[must_use]
    pub fn event_id(&self) -> EventId {
        EventId::new(self.mint("evt"))
    }

    /// Mints a fresh decision record identifier.
    #[must_use]
    pub fn record_id(&self) -> RecordId {
        RecordId::new(self.mint("record"))
    }
}

impl fmt::Debug for IdMinter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdMinter")
            .field("counter", &self.counter.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}
