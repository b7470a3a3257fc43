//! Ledger Publisher
//!
//! Bridges completion records to the ledger: one-time schema
//! registration, deterministic record addressing, and the read queries
//! behind the history and leaderboard screens.
//!
//! The client is constructor-injected and the publisher holds no global
//! state, so independent instances (one per test, one per composition
//! root) coexist freely.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::core::hash::{record_key, schema_id, SchemaId, TransactionId};
use crate::ledger::client::{LedgerClient, LedgerError, RecordSubmission};
use crate::ledger::record::{
    sort_leaderboard, CompletionRecord, LeaderboardEntry, PlayerAddress, COMPLETION_SCHEMA,
};

/// Publishes completion records and answers read queries.
pub struct LedgerPublisher {
    client: Arc<dyn LedgerClient>,
    schema: Option<SchemaId>,
    signer: Option<PlayerAddress>,
    initialized: bool,
}

impl LedgerPublisher {
    /// Create a publisher over a ledger client. No IO happens until
    /// [`initialize`](Self::initialize).
    pub fn new(client: Arc<dyn LedgerClient>) -> Self {
        Self {
            client,
            schema: None,
            signer: None,
            initialized: false,
        }
    }

    /// Connect to the ledger and register the record schema.
    ///
    /// Idempotent: a second call on an initialized publisher returns
    /// immediately, except that a signer supplied where none existed is
    /// attached in place without touching the schema again. A
    /// schema-already-registered conflict counts as success; any other
    /// registration failure propagates and leaves the publisher
    /// uninitialized.
    pub async fn initialize(
        &mut self,
        signer: Option<PlayerAddress>,
    ) -> Result<(), LedgerError> {
        if self.initialized {
            if let Some(new_signer) = signer {
                if self.signer.is_none() {
                    info!(signer = %new_signer, "signer attached to initialized publisher");
                    self.signer = Some(new_signer);
                }
            }
            return Ok(());
        }

        let id = schema_id(COMPLETION_SCHEMA);

        match self.client.register_schema(id, COMPLETION_SCHEMA).await {
            Ok(Some(tx)) => info!(schema = %id, tx = %tx, "schema registered"),
            Ok(None) => info!(schema = %id, "schema registration was a no-op"),
            Err(LedgerError::SchemaAlreadyRegistered) => {
                info!(schema = %id, "schema already registered, continuing");
            }
            Err(e) => return Err(e),
        }

        self.schema = Some(id);
        self.signer = signer;
        self.initialized = true;
        Ok(())
    }

    /// True when records can be published: initialized with a signer.
    /// Reads need only initialization.
    pub fn is_ready(&self) -> bool {
        self.initialized && self.signer.is_some()
    }

    /// The attached signing identity, if any.
    pub fn signer(&self) -> Option<PlayerAddress> {
        self.signer
    }

    /// Clear all state, forcing re-initialization before further use.
    pub fn reset(&mut self) {
        self.schema = None;
        self.signer = None;
        self.initialized = false;
        debug!("publisher reset");
    }

    /// Submit one completion record.
    ///
    /// Returns `Ok(None)` without touching the ledger when preconditions
    /// are unmet (not initialized, no signer), and `Ok(None)` when the
    /// ledger accepted the record but produced no transaction id. The
    /// record key is a hash of (submitter, level, end time), so a
    /// resubmission of the same logical clear lands on the same address.
    pub async fn publish(
        &self,
        record: &CompletionRecord,
    ) -> Result<Option<TransactionId>, LedgerError> {
        let Some(schema) = self.schema.filter(|_| self.initialized) else {
            warn!("publish skipped: publisher not initialized");
            return Ok(None);
        };
        if self.signer.is_none() {
            warn!("publish skipped: no signing identity");
            return Ok(None);
        }

        let submission = RecordSubmission {
            key: record_key(record.player.as_bytes(), record.level, record.end_time),
            schema_id: schema,
            submitter: record.player,
            payload: record.encode(),
        };

        let tx = self.client.submit_record(submission).await?;
        match &tx {
            Some(tx) => info!(level = record.level, tx = %tx, "completion published"),
            None => warn!(level = record.level, "ledger returned no transaction id"),
        }
        Ok(tx)
    }

    /// All completion records filed by `player`, most recent first.
    ///
    /// Records that fail to decode are skipped, not fatal to the fetch.
    pub async fn fetch_history(
        &self,
        player: &PlayerAddress,
    ) -> Result<Vec<CompletionRecord>, LedgerError> {
        let Some(schema) = self.schema.filter(|_| self.initialized) else {
            debug!("history fetch skipped: publisher not initialized");
            return Ok(Vec::new());
        };

        let blobs = self.client.records_of(schema, player).await?;

        let mut records = Vec::with_capacity(blobs.len());
        for blob in &blobs {
            match CompletionRecord::decode(blob) {
                Ok(record) => records.push(record),
                Err(e) => warn!(player = %player, error = %e, "skipping undecodable record"),
            }
        }

        records.sort_by(|a, b| b.end_time.cmp(&a.end_time));
        Ok(records)
    }

    /// Aggregate standings for a set of identities.
    ///
    /// Identities whose records cannot be fetched (or decode to nothing)
    /// are skipped. Sorted by highest level, then total score.
    pub async fn fetch_leaderboard(&self, players: &[PlayerAddress]) -> Vec<LeaderboardEntry> {
        let mut entries = Vec::with_capacity(players.len());

        for player in players {
            let records = match self.fetch_history(player).await {
                Ok(records) => records,
                Err(e) => {
                    warn!(player = %player, error = %e, "skipping player in leaderboard");
                    continue;
                }
            };

            if let Some(entry) = LeaderboardEntry::aggregate(*player, &records) {
                entries.push(entry);
            }
        }

        sort_leaderboard(&mut entries);
        entries
    }
}

// =============================================================================
// TESTS
// =============================================================================
