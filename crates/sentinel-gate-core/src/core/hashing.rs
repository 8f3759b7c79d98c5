// crates/sentinel-gate-core/src/core/hashing.rs
// ============================================================================
// Module: Sentinel Gate Canonical Hashing
// Description: Canonical JSON hashing and HMAC signing for audit entries.
// Purpose: Make tampering with recorded history mathematically detectable.
// Dependencies: serde_jcs, sha2, hmac, subtle
// ============================================================================

//! ## Overview
//! Audit entries hash over an RFC 8785 canonical JSON serialization of their
//! fields, so byte-identical preimages are reproducible regardless of field
//! ordering in memory or on the wire. Hashes separate *what is on the chain*;
//! HMAC signatures separate *who can mint chain entries*. Signature checks
//! are constant-time.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::fmt::Write as _;

use hmac::Hmac;
use hmac::Mac;
use serde::Deserialize;
use serde::Serialize;
use sha2::Digest;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

// ============================================================================
// SECTION: Hashing Errors
// ============================================================================

/// Errors produced by canonicalization and signing.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum HashError {
    /// Canonical serialization failed.
    #[error("canonicalization failure: {0}")]
    Canonicalization(String),
    /// The signing secret is empty.
    #[error("signing secret must not be empty")]
    EmptySecret,
}

// ============================================================================
// SECTION: Digests
// ============================================================================

/// Lowercase hex SHA-256 digest.
///
/// # Invariants
/// - Always 64 lowercase hex characters when produced by this module.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HashDigest(String);

impl HashDigest {
    /// Wraps an externally produced hex digest.
    #[must_use]
    pub fn from_hex(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    /// Returns the digest as a hex string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HashDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Encodes bytes as lowercase hex.
fn hex_encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        // Writing to a String cannot fail; ignore the fmt plumbing result.
        let _ = write!(out, "{byte:02x}");
    }
    out
}

/// Hashes raw bytes with SHA-256.
#[must_use]
pub fn hash_bytes(bytes: &[u8]) -> HashDigest {
    let digest = Sha256::digest(bytes);
    HashDigest(hex_encode(&digest))
}

/// Serializes a value to RFC 8785 canonical JSON bytes.
///
/// # Errors
///
/// Returns [`HashError::Canonicalization`] when the value cannot be
/// canonically serialized (for example non-finite floats).
pub fn canonical_json_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, HashError> {
    serde_jcs::to_vec(value).map_err(|err| HashError::Canonicalization(err.to_string()))
}

/// Hashes a value over its canonical JSON serialization.
///
/// # Errors
///
/// Returns [`HashError::Canonicalization`] when canonical serialization
/// fails.
pub fn hash_canonical_json<T: Serialize>(value: &T) -> Result<HashDigest, HashError> {
    let bytes = canonical_json_bytes(value)?;
    Ok(hash_bytes(&bytes))
}

// ============================================================================
// SECTION: Signing
// ============================================================================

/// HMAC-SHA-256 keyed by the audit secret.
type HmacSha256 = Hmac<Sha256>;

/// Signature over an entry hash.
///
/// # Invariants
/// - Always 64 lowercase hex characters when produced by this module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Signature(String);

impl Signature {
    /// Wraps an externally produced hex signature.
    #[must_use]
    pub fn from_hex(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    /// Returns the signature as a hex string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Secret key for HMAC signing of audit entries.
///
/// # Invariants
/// - Never empty; construction rejects empty secrets.
/// - The keyed MAC state is prepared once at construction, so signing has no
///   fallible path.
#[derive(Clone)]
pub struct SigningSecret {
    /// Prepared MAC state keyed by the secret.
    mac: HmacSha256,
}

impl SigningSecret {
    /// Creates a signing secret from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns [`HashError::EmptySecret`] when the secret is empty.
    pub fn new(secret: impl AsRef<[u8]>) -> Result<Self, HashError> {
        let secret = secret.as_ref();
        if secret.is_empty() {
            return Err(HashError::EmptySecret);
        }
        let mac = HmacSha256::new_from_slice(secret).map_err(|_| HashError::EmptySecret)?;
        Ok(Self { mac })
    }

    /// Signs an entry hash.
    #[must_use]
    pub fn sign(&self, digest: &HashDigest) -> Signature {
        let mut mac = self.mac.clone();
        mac.update(digest.as_str().as_bytes());
        Signature(hex_encode(&mac.finalize().into_bytes()))
    }

    /// Verifies a signature over an entry hash in constant time.
    #[must_use]
    pub fn verify(&self, digest: &HashDigest, signature: &Signature) -> bool {
        let expected = self.sign(digest);
        expected
            .as_str()
            .as_bytes()
            .ct_eq(signature.as_str().as_bytes())
            .into()
    }
}

impl fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningSecret").finish_non_exhaustive()
    }
}
