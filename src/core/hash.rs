//! Ledger Addressing Hashes
//!
//! Provides deterministic hashing for:
//! - Schema identifiers (one fixed record shape, one id)
//! - Record keys (idempotent addressing of completion records)
//! - Transaction identifiers returned by ledger clients
//!
//! All derivations are domain-separated SHA-256; order of updates is
//! critical for determinism.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Raw 256-bit hash output.
pub type Hash32 = [u8; 32];

/// Identifier of a registered record schema.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SchemaId(pub Hash32);

impl fmt::Display for SchemaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

/// Address of one record on the ledger.
///
/// Derived deterministically from the logical event, so re-submitting the
/// same event overwrites rather than duplicates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecordKey(pub Hash32);

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

/// Transaction identifier returned by a ledger submission.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TransactionId(pub Hash32);

impl TransactionId {
    /// Build from raw bytes.
    pub const fn new(bytes: Hash32) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

/// Deterministic hasher with a domain separator.
///
/// Wraps SHA-256 with helpers for the integer types this crate hashes.
pub struct DomainHasher {
    hasher: Sha256,
}

impl DomainHasher {
    /// Create a new hasher with domain separator.
    pub fn new(domain: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(domain);
        Self { hasher }
    }

    /// Update with raw bytes.
    #[inline]
    pub fn update_bytes(&mut self, bytes: &[u8]) {
        self.hasher.update(bytes);
    }

    /// Update with a u32 value (little-endian).
    #[inline]
    pub fn update_u32(&mut self, value: u32) {
        self.hasher.update(value.to_le_bytes());
    }

    /// Update with a u64 value (little-endian).
    #[inline]
    pub fn update_u64(&mut self, value: u64) {
        self.hasher.update(value.to_le_bytes());
    }

    /// Finalize and return the hash.
    pub fn finalize(self) -> Hash32 {
        self.hasher.finalize().into()
    }
}

/// Compute the identifier for a record schema.
///
/// The id is a pure function of the schema text, so every process that
/// knows the shape derives the same id without a registry round trip.
pub fn schema_id(schema: &str) -> SchemaId {
    let mut hasher = DomainHasher::new(b"TILEPATH_SCHEMA_V1");
    hasher.update_bytes(schema.as_bytes());
    SchemaId(hasher.finalize())
}

/// Compute the ledger key for one completion record.
///
/// The key is a function of (submitter, level, end time): the same logical
/// event always lands at the same address, so a repeated submission
/// overwrites instead of accumulating duplicates under random keys.
pub fn record_key(player: &[u8], level: u32, end_time: u64) -> RecordKey {
    let mut hasher = DomainHasher::new(b"TILEPATH_RECORD_V1");
    hasher.update_bytes(player);
    hasher.update_u32(level);
    hasher.update_u64(end_time);
    RecordKey(hasher.finalize())
}

// =============================================================================
// TESTS
// =============================================================================
