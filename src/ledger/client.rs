//! Ledger Client Abstraction
//!
//! The only surface the publisher talks to. A concrete implementation
//! wraps a real ledger SDK (signing, encoding to the wire, receipts);
//! [`crate::ledger::mock::MemoryLedger`] implements it in-memory for
//! tests and demos.

use async_trait::async_trait;

use crate::core::hash::{RecordKey, SchemaId, TransactionId};
use crate::ledger::record::PlayerAddress;

/// Ledger operation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LedgerError {
    /// The schema was registered by an earlier process or instance.
    ///
    /// Registration is idempotent; callers treat this as success.
    #[error("schema already registered")]
    SchemaAlreadyRegistered,

    /// The ledger endpoint could not be reached or answered abnormally.
    #[error("network error: {0}")]
    Network(String),

    /// The submission could not be signed.
    #[error("signing error: {0}")]
    Signing(String),

    /// Backend-specific error.
    #[error("ledger backend error: {0}")]
    Backend(String),
}

/// One record headed for the ledger.
#[derive(Debug, Clone)]
pub struct RecordSubmission {
    /// Deterministic record address; resubmitting the same logical event
    /// overwrites rather than duplicates.
    pub key: RecordKey,
    /// Schema the payload conforms to.
    pub schema_id: SchemaId,
    /// Identity the record is filed under.
    pub submitter: PlayerAddress,
    /// Encoded record blob.
    pub payload: Vec<u8>,
}

/// An append-only ledger keyed by (schema, submitter, record key).
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Declare a record shape to the ledger.
    ///
    /// Returns `Ok(None)` when nothing needed to be submitted (the ledger
    /// already knew the schema); a [`LedgerError::SchemaAlreadyRegistered`]
    /// error means the same thing and is equally fine.
    async fn register_schema(
        &self,
        schema_id: SchemaId,
        schema: &str,
    ) -> Result<Option<TransactionId>, LedgerError>;

    /// Submit one record under the caller's signing identity.
    ///
    /// `Ok(None)` means the ledger accepted the call but produced no
    /// transaction identifier (for example, a no-op overwrite).
    async fn submit_record(
        &self,
        submission: RecordSubmission,
    ) -> Result<Option<TransactionId>, LedgerError>;

    /// All record blobs filed by `submitter` under `schema_id`.
    async fn records_of(
        &self,
        schema_id: SchemaId,
        submitter: &PlayerAddress,
    ) -> Result<Vec<Vec<u8>>, LedgerError>;

    /// Verify the connection to the ledger.
    async fn health_check(&self) -> Result<(), LedgerError>;
}
