//! In-memory ledger for tests and demos.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::core::hash::{RecordKey, SchemaId, TransactionId};
use crate::ledger::client::{LedgerClient, LedgerError, RecordSubmission};
use crate::ledger::record::PlayerAddress;

type RecordStore = BTreeMap<SchemaId, BTreeMap<PlayerAddress, BTreeMap<RecordKey, Vec<u8>>>>;

/// Simulates an append-only ledger in memory.
///
/// Records live under (schema, submitter, key), so a resubmission with
/// the same key overwrites, exactly as deterministic addressing intends.
/// Failure injection switches let tests drive every error path.
#[derive(Clone, Default)]
pub struct MemoryLedger {
    schemas: Arc<Mutex<BTreeMap<SchemaId, String>>>,
    records: Arc<Mutex<RecordStore>>,
    transaction_counter: Arc<Mutex<u64>>,

    fail_submissions: Arc<Mutex<Option<String>>>,
    fail_registrations: Arc<Mutex<Option<String>>>,
    fail_reads: Arc<Mutex<Option<String>>>,
    suppress_tx_ids: Arc<Mutex<bool>>,
}

impl MemoryLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    fn next_tx_id(&self) -> TransactionId {
        let mut counter = self.transaction_counter.lock().unwrap();
        *counter += 1;
        let mut bytes = [0u8; 32];
        bytes[..8].copy_from_slice(&counter.to_le_bytes());
        TransactionId::new(bytes)
    }

    /// Make every subsequent submission fail with a network error.
    pub fn fail_submissions_with(&self, message: &str) {
        *self.fail_submissions.lock().unwrap() = Some(message.to_string());
    }

    /// Make every subsequent registration fail with a backend error.
    pub fn fail_registrations_with(&self, message: &str) {
        *self.fail_registrations.lock().unwrap() = Some(message.to_string());
    }

    /// Make every subsequent read fail with a network error.
    pub fn fail_reads_with(&self, message: &str) {
        *self.fail_reads.lock().unwrap() = Some(message.to_string());
    }

    /// Accept submissions but stop returning transaction identifiers.
    pub fn suppress_tx_ids(&self) {
        *self.suppress_tx_ids.lock().unwrap() = true;
    }

    /// Clear all failure injection.
    pub fn heal(&self) {
        *self.fail_submissions.lock().unwrap() = None;
        *self.fail_registrations.lock().unwrap() = None;
        *self.fail_reads.lock().unwrap() = None;
        *self.suppress_tx_ids.lock().unwrap() = false;
    }

    /// Plant a raw blob under a submitter, bypassing the codec. Lets
    /// tests exercise per-record decode-failure handling.
    pub fn inject_raw_record(
        &self,
        schema_id: SchemaId,
        submitter: PlayerAddress,
        key: RecordKey,
        payload: Vec<u8>,
    ) {
        self.records
            .lock()
            .unwrap()
            .entry(schema_id)
            .or_default()
            .entry(submitter)
            .or_default()
            .insert(key, payload);
    }

    /// Number of records stored for a submitter.
    pub fn record_count(&self, schema_id: SchemaId, submitter: &PlayerAddress) -> usize {
        self.records
            .lock()
            .unwrap()
            .get(&schema_id)
            .and_then(|by_player| by_player.get(submitter))
            .map(|records| records.len())
            .unwrap_or(0)
    }

    /// Whether a schema has been registered.
    pub fn has_schema(&self, schema_id: SchemaId) -> bool {
        self.schemas.lock().unwrap().contains_key(&schema_id)
    }

    /// Registrations seen so far.
    pub fn schema_count(&self) -> usize {
        self.schemas.lock().unwrap().len()
    }
}

#[async_trait]
impl LedgerClient for MemoryLedger {
    async fn register_schema(
        &self,
        schema_id: SchemaId,
        schema: &str,
    ) -> Result<Option<TransactionId>, LedgerError> {
        if let Some(message) = self.fail_registrations.lock().unwrap().clone() {
            return Err(LedgerError::Backend(message));
        }

        let mut schemas = self.schemas.lock().unwrap();
        if schemas.contains_key(&schema_id) {
            return Err(LedgerError::SchemaAlreadyRegistered);
        }

        schemas.insert(schema_id, schema.to_string());
        Ok(Some(self.next_tx_id()))
    }

    async fn submit_record(
        &self,
        submission: RecordSubmission,
    ) -> Result<Option<TransactionId>, LedgerError> {
        if let Some(message) = self.fail_submissions.lock().unwrap().clone() {
            return Err(LedgerError::Network(message));
        }

        if !self.schemas.lock().unwrap().contains_key(&submission.schema_id) {
            return Err(LedgerError::Backend(format!(
                "unknown schema {}",
                submission.schema_id
            )));
        }

        self.records
            .lock()
            .unwrap()
            .entry(submission.schema_id)
            .or_default()
            .entry(submission.submitter)
            .or_default()
            .insert(submission.key, submission.payload);

        if *self.suppress_tx_ids.lock().unwrap() {
            Ok(None)
        } else {
            Ok(Some(self.next_tx_id()))
        }
    }

    async fn records_of(
        &self,
        schema_id: SchemaId,
        submitter: &PlayerAddress,
    ) -> Result<Vec<Vec<u8>>, LedgerError> {
        if let Some(message) = self.fail_reads.lock().unwrap().clone() {
            return Err(LedgerError::Network(message));
        }

        Ok(self
            .records
            .lock()
            .unwrap()
            .get(&schema_id)
            .and_then(|by_player| by_player.get(submitter))
            .map(|records| records.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn health_check(&self) -> Result<(), LedgerError> {
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::hash::{record_key, schema_id};

    fn test_schema() -> SchemaId {
        schema_id("uint32 level")
    }

    async fn registered_ledger() -> (MemoryLedger, SchemaId) {
        let ledger = MemoryLedger::new();
        let sid = test_schema();
        ledger.register_schema(sid, "uint32 level").await.unwrap();
        (ledger, sid)
    }

    fn submission(sid: SchemaId, player: PlayerAddress, level: u32) -> RecordSubmission {
        RecordSubmission {
            key: record_key(player.as_bytes(), level, 100),
            schema_id: sid,
            submitter: player,
            payload: vec![level as u8],
        }
    }

    #[tokio::test]
    async fn test_double_registration_conflicts() {
        let (ledger, sid) = registered_ledger().await;

        let second = ledger.register_schema(sid, "uint32 level").await;
        assert!(matches!(second, Err(LedgerError::SchemaAlreadyRegistered)));
        assert_eq!(ledger.schema_count(), 1);
    }

    #[tokio::test]
    async fn test_same_key_overwrites() {
        let (ledger, sid) = registered_ledger().await;
        let player = PlayerAddress::new([1; 20]);

        let sub = submission(sid, player, 3);
        ledger.submit_record(sub.clone()).await.unwrap();
        ledger.submit_record(sub).await.unwrap();

        // Addressably identical: one record, not two
        assert_eq!(ledger.record_count(sid, &player), 1);
    }

    #[tokio::test]
    async fn test_unknown_schema_rejected() {
        let ledger = MemoryLedger::new();
        let player = PlayerAddress::new([1; 20]);

        let result = ledger.submit_record(submission(test_schema(), player, 1)).await;
        assert!(matches!(result, Err(LedgerError::Backend(_))));
    }

    #[tokio::test]
    async fn test_records_scoped_by_submitter() {
        let (ledger, sid) = registered_ledger().await;
        let alice = PlayerAddress::new([1; 20]);
        let bob = PlayerAddress::new([2; 20]);

        ledger.submit_record(submission(sid, alice, 1)).await.unwrap();
        ledger.submit_record(submission(sid, alice, 2)).await.unwrap();
        ledger.submit_record(submission(sid, bob, 1)).await.unwrap();

        assert_eq!(ledger.records_of(sid, &alice).await.unwrap().len(), 2);
        assert_eq!(ledger.records_of(sid, &bob).await.unwrap().len(), 1);

        let stranger = PlayerAddress::new([9; 20]);
        assert!(ledger.records_of(sid, &stranger).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let (ledger, sid) = registered_ledger().await;
        let player = PlayerAddress::new([1; 20]);

        ledger.fail_submissions_with("link down");
        let result = ledger.submit_record(submission(sid, player, 1)).await;
        assert!(matches!(result, Err(LedgerError::Network(_))));

        ledger.heal();
        ledger.submit_record(submission(sid, player, 1)).await.unwrap();

        ledger.suppress_tx_ids();
        let tx = ledger.submit_record(submission(sid, player, 2)).await.unwrap();
        assert!(tx.is_none());
    }
}
