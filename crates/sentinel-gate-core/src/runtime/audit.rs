// crates/sentinel-gate-core/src/runtime/audit.rs
// ============================================================================
// Module: Sentinel Gate Audit Trail
// Description: Hash-chained, HMAC-signed, append-only governance record.
// Purpose: Bind every response to the identity, policy, and decision behind it.
// Dependencies: serde, serde_json, thiserror, crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! Every governance event appends one entry to the chain. Each entry hashes
//! over the canonical serialization of its own fields and links to the hash
//! of the previous entry, so mutating, reordering, inserting, or deleting
//! history is detectable. An HMAC signature over the entry hash separates
//! what is on the chain from who can mint chain entries.
//!
//! Appends serialize through one lock; the append-and-hash operation is the
//! serialization point for the whole pipeline. Readers scan snapshots
//! concurrently. Tampering is detected, never repaired.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::sync::Mutex;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use thiserror::Error;

use crate::core::event::AuditEventType;
use crate::core::hashing::HashDigest;
use crate::core::hashing::HashError;
use crate::core::hashing::Signature;
use crate::core::hashing::SigningSecret;
use crate::core::hashing::hash_canonical_json;
use crate::core::identifiers::AgentId;
use crate::core::identifiers::EventId;
use crate::core::identifiers::ExecutionId;
use crate::core::identifiers::IdMinter;
use crate::core::time::Clock;
use crate::core::time::Timestamp;
use crate::interfaces::AuditStore;
use crate::interfaces::InMemoryAuditStore;
use crate::interfaces::StoreError;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors returned by audit-trail operations.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum AuditError {
    /// Canonicalization or signing failed.
    #[error(transparent)]
    Hashing(#[from] HashError),
    /// The backing store rejected an append.
    #[error(transparent)]
    Store(#[from] StoreError),
}

// ============================================================================
// SECTION: Audit Entry
// ============================================================================

/// One link in the audit chain.
///
/// # Invariants
/// - `hash` equals the canonical hash of every field except `hash` and
///   `signature`.
/// - `previous_hash` equals the prior entry's hash; `None` only at sequence 1.
/// - Sequence numbers start at 1 and increase by exactly 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Monotonically increasing sequence number.
    pub sequence: u64,
    /// Event identifier.
    pub event_id: EventId,
    /// Event type tag.
    pub event_type: AuditEventType,
    /// Wall-clock timestamp in unix-epoch milliseconds.
    pub timestamp: Timestamp,
    /// Associated request, when any.
    pub request_id: Option<ExecutionId>,
    /// Associated agent, when any.
    pub agent_id: Option<AgentId>,
    /// Associated actor, when any.
    pub actor_id: Option<String>,
    /// Opaque event data.
    pub data: Map<String, Value>,
    /// Hash of the immediately preceding entry.
    pub previous_hash: Option<HashDigest>,
    /// Canonical hash of the fields above.
    pub hash: HashDigest,
    /// HMAC signature over `hash`.
    pub signature: Signature,
}

/// Hash preimage of an entry: every field except `hash` and `signature`.
///
/// # Invariants
/// - Field names match [`AuditEntry`] exactly; canonical serialization sorts
///   them, so the preimage is stable regardless of declaration order.
#[derive(Serialize)]
struct EntryPreimage<'a> {
    /// Sequence number under hash.
    sequence: u64,
    /// Event identifier under hash.
    event_id: &'a EventId,
    /// Event type under hash.
    event_type: AuditEventType,
    /// Timestamp under hash.
    timestamp: Timestamp,
    /// Request binding under hash.
    request_id: &'a Option<ExecutionId>,
    /// Agent binding under hash.
    agent_id: &'a Option<AgentId>,
    /// Actor binding under hash.
    actor_id: &'a Option<String>,
    /// Event data under hash.
    data: &'a Map<String, Value>,
    /// Chain link under hash.
    previous_hash: &'a Option<HashDigest>,
}

impl AuditEntry {
    /// Recomputes the canonical hash of the entry's preimage.
    ///
    /// # Errors
    ///
    /// Returns a [`HashError`] when canonical serialization fails.
    pub fn recompute_hash(&self) -> Result<HashDigest, HashError> {
        hash_canonical_json(&EntryPreimage {
            sequence: self.sequence,
            event_id: &self.event_id,
            event_type: self.event_type,
            timestamp: self.timestamp,
            request_id: &self.request_id,
            agent_id: &self.agent_id,
            actor_id: &self.actor_id,
            data: &self.data,
            previous_hash: &self.previous_hash,
        })
    }
}

// ============================================================================
// SECTION: Integrity Report
// ============================================================================

/// One broken chain invariant.
///
/// # Invariants
/// - Variants are stable for export serialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum IntegrityIssue {
    /// An entry's hash does not match its fields.
    HashMismatch {
        /// Sequence number of the damaged entry.
        sequence: u64,
        /// Hash recomputed from the entry's fields.
        expected: HashDigest,
        /// Hash recorded on the entry.
        actual: HashDigest,
    },
    /// An entry's previous-hash does not match the prior entry.
    ChainBroken {
        /// Sequence number of the entry whose link is broken.
        sequence: u64,
        /// Hash of the prior entry.
        expected_previous: Option<HashDigest>,
        /// Previous-hash recorded on the entry.
        actual_previous: Option<HashDigest>,
    },
    /// An entry's sequence number does not match its position.
    SequenceMismatch {
        /// Zero-based position in the chain.
        index: usize,
        /// Sequence expected at this position.
        expected: u64,
        /// Sequence recorded on the entry.
        actual: u64,
    },
    /// An entry's HMAC signature does not verify.
    InvalidSignature {
        /// Sequence number of the entry.
        sequence: u64,
    },
}

/// Result of walking the whole chain.
///
/// # Invariants
/// - `valid` is true exactly when `issues` is empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrityReport {
    /// Whether every invariant held.
    pub valid: bool,
    /// Number of entries examined.
    pub total_entries: usize,
    /// Every broken invariant found.
    pub issues: Vec<IntegrityIssue>,
}

// ============================================================================
// SECTION: Query and Export
// ============================================================================

/// Filters for audit queries and exports.
///
/// # Invariants
/// - Absent filters match every entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuditFilter {
    /// Restrict to one event type.
    pub event_type: Option<AuditEventType>,
    /// Restrict to one agent.
    pub agent_id: Option<AgentId>,
    /// Restrict to one request.
    pub request_id: Option<ExecutionId>,
    /// Restrict to entries at or after this timestamp.
    pub start_time: Option<Timestamp>,
    /// Restrict to entries at or before this timestamp.
    pub end_time: Option<Timestamp>,
}

impl AuditFilter {
    /// Returns whether the entry passes every filter present.
    fn matches(&self, entry: &AuditEntry) -> bool {
        self.event_type
            .is_none_or(|event_type| entry.event_type == event_type)
            && self
                .agent_id
                .as_ref()
                .is_none_or(|agent_id| entry.agent_id.as_ref() == Some(agent_id))
            && self
                .request_id
                .as_ref()
                .is_none_or(|request_id| entry.request_id.as_ref() == Some(request_id))
            && self.start_time.is_none_or(|start| entry.timestamp >= start)
            && self.end_time.is_none_or(|end| entry.timestamp <= end)
    }
}

/// Metadata accompanying an export bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportMetadata {
    /// RFC 3339 generation time, when representable.
    pub generated_at: Option<String>,
    /// Number of entries in the bundle after filtering.
    pub total_entries: usize,
    /// Filters applied to the bundle.
    pub filters: AuditFilter,
    /// Whether the full chain verified at export time.
    pub integrity_verified: bool,
}

/// Compliance export bundle: metadata, integrity report, filtered entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportBundle {
    /// Export metadata.
    pub export_metadata: ExportMetadata,
    /// Integrity report over the full chain.
    pub integrity_report: IntegrityReport,
    /// Filtered entries.
    pub entries: Vec<AuditEntry>,
}

/// Aggregate statistics over the chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditStatistics {
    /// Total number of entries.
    pub total_entries: usize,
    /// Entry counts per event-type label.
    pub event_types: std::collections::BTreeMap<String, u64>,
    /// Timestamp of the first entry, when any.
    pub first_entry: Option<Timestamp>,
    /// Timestamp of the last entry, when any.
    pub last_entry: Option<Timestamp>,
}

// ============================================================================
// SECTION: Audit Trail
// ============================================================================

/// Chain tail guarded by the append lock.
#[derive(Debug, Default)]
struct ChainTail {
    /// Sequence of the most recent entry; zero before the first append.
    sequence: u64,
    /// Hash of the most recent entry.
    last_hash: Option<HashDigest>,
}

/// Hash-chained, HMAC-signed, append-only audit trail.
///
/// # Invariants
/// - The trail exclusively owns its chain; callers receive clones.
/// - Appends serialize through the tail lock.
pub struct AuditTrail {
    /// Signing secret; construction guarantees it is non-empty.
    secret: SigningSecret,
    /// Pluggable entry store.
    store: Arc<dyn AuditStore>,
    /// Chain tail; the append serialization point.
    tail: Mutex<ChainTail>,
    /// Clock stamping entries.
    clock: Arc<dyn Clock>,
    /// Minter for event identifiers.
    minter: Arc<IdMinter>,
}

impl AuditTrail {
    /// Creates a trail over the in-memory store.
    #[must_use]
    pub fn new(secret: SigningSecret, clock: Arc<dyn Clock>, minter: Arc<IdMinter>) -> Self {
        Self::with_store(secret, Arc::new(InMemoryAuditStore::new()), clock, minter)
    }

    /// Creates a trail over a caller-provided store.
    #[must_use]
    pub fn with_store(
        secret: SigningSecret,
        store: Arc<dyn AuditStore>,
        clock: Arc<dyn Clock>,
        minter: Arc<IdMinter>,
    ) -> Self {
        Self {
            secret,
            store,
            tail: Mutex::new(ChainTail::default()),
            clock,
            minter,
        }
    }

    /// Appends one entry to the chain.
    ///
    /// # Errors
    ///
    /// Returns an [`AuditError`] when canonicalization fails or the backing
    /// store rejects the entry. Under correct usage neither occurs.
    pub fn append(
        &self,
        event_type: AuditEventType,
        data: Map<String, Value>,
        request_id: Option<&ExecutionId>,
        agent_id: Option<&AgentId>,
        actor_id: Option<&str>,
    ) -> Result<AuditEntry, AuditError> {
        let mut tail = self
            .tail
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let sequence = tail.sequence + 1;
        let event_id = self.minter.event_id();
        let timestamp = self.clock.now();
        let request_id = request_id.cloned();
        let agent_id = agent_id.cloned();
        let actor_id = actor_id.map(ToString::to_string);
        let hash = hash_canonical_json(&EntryPreimage {
            sequence,
            event_id: &event_id,
            event_type,
            timestamp,
            request_id: &request_id,
            agent_id: &agent_id,
            actor_id: &actor_id,
            data: &data,
            previous_hash: &tail.last_hash,
        })?;
        let signature = self.secret.sign(&hash);
        let entry = AuditEntry {
            sequence,
            event_id,
            event_type,
            timestamp,
            request_id,
            agent_id,
            actor_id,
            data,
            previous_hash: tail.last_hash.clone(),
            hash: hash.clone(),
            signature,
        };
        self.store.append(entry.clone())?;
        tail.sequence = sequence;
        tail.last_hash = Some(hash);
        Ok(entry)
    }

    /// Walks the chain and reports every broken invariant.
    #[must_use]
    pub fn verify_integrity(&self) -> IntegrityReport {
        verify_chain(&self.store.scan(), &self.secret)
    }

    /// Verifies a single entry's hash and signature.
    #[must_use]
    pub fn verify_entry(&self, entry: &AuditEntry) -> bool {
        let hash_ok = entry
            .recompute_hash()
            .is_ok_and(|computed| computed == entry.hash);
        hash_ok && self.secret.verify(&entry.hash, &entry.signature)
    }

    /// Returns the ordered entries bound to one request.
    #[must_use]
    pub fn chain_of_custody(&self, request_id: &ExecutionId) -> Vec<AuditEntry> {
        self.store
            .scan()
            .into_iter()
            .filter(|entry| entry.request_id.as_ref() == Some(request_id))
            .collect()
    }

    /// Returns the newest entries matching the filter, newest first.
    #[must_use]
    pub fn query(&self, filter: &AuditFilter, limit: usize) -> Vec<AuditEntry> {
        self.store
            .scan()
            .into_iter()
            .rev()
            .filter(|entry| filter.matches(entry))
            .take(limit)
            .collect()
    }

    /// Builds a compliance export bundle.
    ///
    /// The bundle always carries an integrity report over the full chain,
    /// regardless of the filters applied to the exported entries.
    #[must_use]
    pub fn export(&self, filter: AuditFilter) -> ExportBundle {
        let integrity_report = self.verify_integrity();
        let entries: Vec<AuditEntry> = self
            .store
            .scan()
            .into_iter()
            .filter(|entry| filter.matches(entry))
            .collect();
        ExportBundle {
            export_metadata: ExportMetadata {
                generated_at: self.clock.now().rfc3339(),
                total_entries: entries.len(),
                filters: filter,
                integrity_verified: integrity_report.valid,
            },
            integrity_report,
            entries,
        }
    }

    /// Returns aggregate statistics over the chain.
    #[must_use]
    pub fn statistics(&self) -> AuditStatistics {
        let entries = self.store.scan();
        let mut event_types = std::collections::BTreeMap::new();
        for entry in &entries {
            *event_types
                .entry(entry.event_type.as_str().to_string())
                .or_insert(0_u64) += 1;
        }
        AuditStatistics {
            total_entries: entries.len(),
            event_types,
            first_entry: entries.first().map(|entry| entry.timestamp),
            last_entry: entries.last().map(|entry| entry.timestamp),
        }
    }
}

impl fmt::Debug for AuditTrail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuditTrail")
            .field("entries", &self.store.len())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// SECTION: Chain Verification
// ============================================================================

/// Walks a chain of entries and reports every broken invariant.
///
/// Usable offline over exported bundles as well as over the live store.
#[must_use]
pub fn verify_chain(entries: &[AuditEntry], secret: &SigningSecret) -> IntegrityReport {
    let mut issues = Vec::new();
    let mut expected_previous: Option<HashDigest> = None;
    for (index, entry) in entries.iter().enumerate() {
        let expected_sequence = u64::try_from(index).unwrap_or(u64::MAX).saturating_add(1);
        if entry.sequence != expected_sequence {
            issues.push(IntegrityIssue::SequenceMismatch {
                index,
                expected: expected_sequence,
                actual: entry.sequence,
            });
        }
        if entry.previous_hash != expected_previous {
            issues.push(IntegrityIssue::ChainBroken {
                sequence: entry.sequence,
                expected_previous: expected_previous.clone(),
                actual_previous: entry.previous_hash.clone(),
            });
        }
        match entry.recompute_hash() {
            Ok(computed) if computed == entry.hash => {}
            Ok(computed) => issues.push(IntegrityIssue::HashMismatch {
                sequence: entry.sequence,
                expected: computed,
                actual: entry.hash.clone(),
            }),
            Err(_) => issues.push(IntegrityIssue::HashMismatch {
                sequence: entry.sequence,
                expected: HashDigest::from_hex(""),
                actual: entry.hash.clone(),
            }),
        }
        if !secret.verify(&entry.hash, &entry.signature) {
            issues.push(IntegrityIssue::InvalidSignature {
                sequence: entry.sequence,
            });
        }
        expected_previous = Some(entry.hash.clone());
    }
    IntegrityReport {
        valid: issues.is_empty(),
        total_entries: entries.len(),
        issues,
    }
}
