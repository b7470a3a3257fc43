//! Completion Records
//!
//! The one fixed data shape this system writes to the ledger: one record
//! per cleared level, encoded as a single binary blob. Also the derived
//! leaderboard aggregate computed from those records at read time.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Canonical schema text for the completion record shape.
///
/// The schema identifier is derived from this string, so it must never
/// change for records to stay addressable.
pub const COMPLETION_SCHEMA: &str = "address player, uint32 level, uint64 start_time, \
     uint64 end_time, uint64 score, uint32 lives_remaining";

/// Record codec errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RecordError {
    /// The blob did not decode as a completion record.
    #[error("undecodable record: {0}")]
    Decode(String),

    /// An address string was not 20 hex-encoded bytes.
    #[error("invalid address: {0}")]
    InvalidAddress(String),
}

// =============================================================================
// PLAYER ADDRESS
// =============================================================================

/// Opaque address-like identity a submitter files records under.
///
/// Implements Ord for deterministic BTreeMap ordering.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlayerAddress(pub [u8; 20]);

impl PlayerAddress {
    /// Create from raw bytes.
    pub const fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Get raw bytes.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl fmt::Display for PlayerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for PlayerAddress {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let stripped = s.strip_prefix("0x").unwrap_or(s);
        let bytes =
            hex::decode(stripped).map_err(|e| RecordError::InvalidAddress(e.to_string()))?;
        let arr: [u8; 20] = bytes
            .try_into()
            .map_err(|_| RecordError::InvalidAddress(format!("wrong length: {s}")))?;
        Ok(Self(arr))
    }
}

// =============================================================================
// COMPLETION RECORD
// =============================================================================

/// One successful level clear, as filed on the ledger.
///
/// Immutable once constructed; a failed publish discards it rather than
/// retrying.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionRecord {
    /// Identity the clear is credited to.
    pub player: PlayerAddress,

    /// Level that was cleared.
    pub level: u32,

    /// Unix seconds when the player's turn began.
    pub start_time: u64,

    /// Unix seconds when the final tile was matched.
    pub end_time: u64,

    /// Session score at the moment of the clear, bonus included.
    pub score: u64,

    /// Lives remaining at the clear.
    pub lives_remaining: u32,
}

impl CompletionRecord {
    /// Encode to the single-blob wire form.
    pub fn encode(&self) -> Vec<u8> {
        bincode::serialize(self).expect("completion record always encodes")
    }

    /// Decode from the wire form.
    pub fn decode(bytes: &[u8]) -> Result<Self, RecordError> {
        bincode::deserialize(bytes).map_err(|e| RecordError::Decode(e.to_string()))
    }

    /// Seconds the clear took.
    pub fn duration_secs(&self) -> u64 {
        self.end_time.saturating_sub(self.start_time)
    }
}

// =============================================================================
// LEADERBOARD
// =============================================================================

/// Aggregate standing of one player, derived from their records.
///
/// Never persisted; recomputed on every fetch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    /// Player the entry describes.
    pub player: PlayerAddress,

    /// Highest level seen across the player's records.
    pub highest_level: u32,

    /// Sum of record scores.
    pub total_score: u64,

    /// Number of records.
    pub completions: u32,
}

impl LeaderboardEntry {
    /// Aggregate a player's records; `None` when there are none.
    pub fn aggregate(player: PlayerAddress, records: &[CompletionRecord]) -> Option<Self> {
        if records.is_empty() {
            return None;
        }

        Some(Self {
            player,
            highest_level: records.iter().map(|r| r.level).max().unwrap_or(0),
            total_score: records.iter().map(|r| r.score).sum(),
            completions: records.len() as u32,
        })
    }
}

/// Sort standings: highest level first, total score as tiebreak.
pub fn sort_leaderboard(entries: &mut [LeaderboardEntry]) {
    entries.sort_by(|a, b| {
        b.highest_level
            .cmp(&a.highest_level)
            .then(b.total_score.cmp(&a.total_score))
    });
}

// =============================================================================
// TESTS
// =============================================================================
