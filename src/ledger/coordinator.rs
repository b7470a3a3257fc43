//! Publish Coordination
//!
//! Sits between the engine's completion events and the publisher: tracks
//! connection readiness and per-publish status for presentation, scopes
//! leaderboard queries with a locally persisted set of known submitters,
//! and gates everything behind an environment feature toggle.
//!
//! Unavailable preconditions (feature off, not connected, no signer) are
//! expected steady states, reported as [`PublishOutcome::Unavailable`]
//! rather than errors.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::core::hash::TransactionId;
use crate::game::events::GameEvent;
use crate::ledger::publisher::LedgerPublisher;
use crate::ledger::record::{CompletionRecord, LeaderboardEntry, PlayerAddress};

/// Longest error message surfaced to the presentation layer.
const ERROR_DISPLAY_MAX: usize = 120;

/// How long a success banner stays up before auto-clearing.
const SUCCESS_DISPLAY: Duration = Duration::from_secs(5);

/// Environment switch gating the whole publishing pipeline.
pub const PUBLISH_ENABLED_VAR: &str = "TILEPATH_PUBLISH_ENABLED";

// =============================================================================
// CONFIGURATION
// =============================================================================

/// Publishing pipeline configuration.
#[derive(Clone, Debug)]
pub struct PublishConfig {
    /// Master switch; when off the coordinator never touches the ledger.
    pub enabled: bool,
    /// Success-banner display window before status returns to idle.
    pub success_display: Duration,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            success_display: SUCCESS_DISPLAY,
        }
    }
}

impl PublishConfig {
    /// Read the feature toggle from the environment. Publishing is off
    /// unless [`PUBLISH_ENABLED_VAR`] is `true` or `1`.
    pub fn from_env() -> Self {
        let enabled = matches!(
            std::env::var(PUBLISH_ENABLED_VAR).as_deref(),
            Ok("true") | Ok("1")
        );
        Self {
            enabled,
            ..Self::default()
        }
    }
}

// =============================================================================
// STATUS TYPES
// =============================================================================

/// Lifecycle of the ledger connection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    /// No connection attempted since construction or disconnect.
    Uninitialized,
    /// Initialization in flight.
    Initializing,
    /// Initialized; reads work, publishes need a signer too.
    Ready,
    /// Initialization failed.
    Failed(String),
}

/// Status of the most recent publish, for presentation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishStatus {
    /// Nothing in flight or recently finished.
    Idle,
    /// A record is on its way to the ledger.
    Publishing {
        /// Level being recorded.
        level: u32,
    },
    /// The last publish landed. Auto-clears after the display window.
    Succeeded {
        /// Level that was recorded.
        level: u32,
        /// Ledger transaction.
        tx: TransactionId,
    },
    /// The last publish failed. Cleared by the next publish attempt.
    Failed {
        /// Level whose record was lost.
        level: u32,
        /// Truncated, display-ready reason.
        message: String,
    },
}

/// Why a completion was not offered to the ledger.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnavailableReason {
    /// The feature toggle is off.
    Disabled,
    /// The connection is not ready.
    NotConnected,
    /// No signing identity is attached.
    NoSigner,
}

impl std::fmt::Display for UnavailableReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let reason = match self {
            Self::Disabled => "publishing disabled",
            Self::NotConnected => "ledger not connected",
            Self::NoSigner => "no signing identity",
        };
        f.write_str(reason)
    }
}

/// Three-way outcome of handling one completion event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PublishOutcome {
    /// The record is durable under this transaction.
    Published(TransactionId),
    /// Preconditions unmet; the record was silently skipped.
    Unavailable(UnavailableReason),
    /// The ledger was attempted and failed; the record is gone (no
    /// automatic retry).
    Failed(String),
}

// =============================================================================
// KNOWN-SUBMITTER REGISTRY
// =============================================================================

/// Append-only set of identities that have published at least once.
///
/// The ledger has no global index, so leaderboard queries are scoped by
/// this locally persisted set. Players outside it are invisible until
/// their address lands here; with per-device storage that makes the
/// leaderboard effectively device-scoped.
pub trait KnownPlayers: Send + Sync {
    /// Every known identity, sorted.
    fn all(&self) -> Vec<PlayerAddress>;

    /// Record an identity. Duplicates are ignored.
    fn add(&self, player: PlayerAddress);
}

/// Registry held in memory; gone at process exit.
#[derive(Default)]
pub struct MemoryKnownPlayers {
    players: Mutex<BTreeSet<PlayerAddress>>,
}

impl MemoryKnownPlayers {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }
}

impl KnownPlayers for MemoryKnownPlayers {
    fn all(&self) -> Vec<PlayerAddress> {
        self.players.lock().unwrap().iter().copied().collect()
    }

    fn add(&self, player: PlayerAddress) {
        self.players.lock().unwrap().insert(player);
    }
}

/// Registry persisted as a JSON array of hex addresses.
///
/// Best-effort: IO problems are logged and swallowed, the registry only
/// scopes leaderboard visibility.
pub struct JsonKnownPlayers {
    path: PathBuf,
}

impl JsonKnownPlayers {
    /// Registry backed by the file at `path`; created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn load(&self) -> BTreeSet<PlayerAddress> {
        let Ok(data) = std::fs::read_to_string(&self.path) else {
            return BTreeSet::new();
        };

        let addresses: Vec<String> = match serde_json::from_str(&data) {
            Ok(addresses) => addresses,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "unreadable registry, starting empty");
                return BTreeSet::new();
            }
        };

        addresses
            .iter()
            .filter_map(|s| match s.parse() {
                Ok(addr) => Some(addr),
                Err(e) => {
                    warn!(address = %s, error = %e, "skipping bad registry entry");
                    None
                }
            })
            .collect()
    }

    fn store(&self, players: &BTreeSet<PlayerAddress>) {
        let addresses: Vec<String> = players.iter().map(|p| p.to_string()).collect();
        let json = serde_json::to_string_pretty(&addresses).expect("string list always encodes");
        if let Err(e) = std::fs::write(&self.path, json) {
            warn!(path = %self.path.display(), error = %e, "could not persist registry");
        }
    }
}

impl KnownPlayers for JsonKnownPlayers {
    fn all(&self) -> Vec<PlayerAddress> {
        self.load().into_iter().collect()
    }

    fn add(&self, player: PlayerAddress) {
        let mut players = self.load();
        if players.insert(player) {
            self.store(&players);
        }
    }
}

// =============================================================================
// COORDINATOR
// =============================================================================

struct CoordinatorInner {
    publisher: RwLock<LedgerPublisher>,
    connection: RwLock<ConnectionStatus>,
    publish: RwLock<PublishStatus>,
    publish_generation: AtomicU64,
    known: Box<dyn KnownPlayers>,
}

/// Orchestrates the publishing pipeline for one composition of the game.
pub struct PublishCoordinator {
    config: PublishConfig,
    inner: Arc<CoordinatorInner>,
}

impl PublishCoordinator {
    /// Build a coordinator over a publisher and a known-submitter store.
    pub fn new(
        publisher: LedgerPublisher,
        known: Box<dyn KnownPlayers>,
        config: PublishConfig,
    ) -> Self {
        Self {
            config,
            inner: Arc::new(CoordinatorInner {
                publisher: RwLock::new(publisher),
                connection: RwLock::new(ConnectionStatus::Uninitialized),
                publish: RwLock::new(PublishStatus::Idle),
                publish_generation: AtomicU64::new(0),
                known,
            }),
        }
    }

    /// Current connection status.
    pub async fn connection_status(&self) -> ConnectionStatus {
        self.inner.connection.read().await.clone()
    }

    /// Current publish status.
    pub async fn publish_status(&self) -> PublishStatus {
        self.inner.publish.read().await.clone()
    }

    /// True while a publish is in flight; UIs disable "next level" then.
    pub async fn is_publishing(&self) -> bool {
        matches!(*self.inner.publish.read().await, PublishStatus::Publishing { .. })
    }

    /// Initialize the publisher, optionally attaching a signer.
    ///
    /// A no-op while the feature toggle is off. Failure is reflected in
    /// the connection status as well as the return value.
    pub async fn connect(
        &self,
        signer: Option<PlayerAddress>,
    ) -> Result<(), crate::ledger::client::LedgerError> {
        if !self.config.enabled {
            debug!("publishing disabled, skipping ledger connection");
            return Ok(());
        }

        *self.inner.connection.write().await = ConnectionStatus::Initializing;

        let result = self.inner.publisher.write().await.initialize(signer).await;
        match &result {
            Ok(()) => {
                info!("ledger connection ready");
                *self.inner.connection.write().await = ConnectionStatus::Ready;
            }
            Err(e) => {
                warn!(error = %e, "ledger initialization failed");
                *self.inner.connection.write().await =
                    ConnectionStatus::Failed(truncate_message(&e.to_string()));
            }
        }
        result
    }

    /// Tear the connection down, as when the external identity goes away.
    /// A publish already dispatched may still complete or fail on its own.
    pub async fn disconnect(&self) {
        self.inner.publisher.write().await.reset();
        *self.inner.connection.write().await = ConnectionStatus::Uninitialized;
        *self.inner.publish.write().await = PublishStatus::Idle;
        debug!("ledger connection reset");
    }

    /// React to an engine event.
    ///
    /// Only `LevelCompleted` matters; everything else returns `None`.
    /// For completions, verifies the pipeline is usable, publishes, and
    /// reflects the three-way outcome in [`PublishStatus`].
    pub async fn handle_event(&self, event: &GameEvent) -> Option<PublishOutcome> {
        let &GameEvent::LevelCompleted {
            level,
            started_at,
            ended_at,
            score,
            lives,
        } = event
        else {
            return None;
        };

        Some(self.publish_completion(level, started_at, ended_at, score, lives).await)
    }

    async fn publish_completion(
        &self,
        level: u32,
        started_at: i64,
        ended_at: i64,
        score: u64,
        lives: u32,
    ) -> PublishOutcome {
        if let Some(reason) = self.unavailable_reason().await {
            debug!(level, %reason, "completion not published");
            return PublishOutcome::Unavailable(reason);
        }

        let publisher = self.inner.publisher.read().await;
        let signer = match publisher.signer() {
            Some(signer) => signer,
            None => return PublishOutcome::Unavailable(UnavailableReason::NoSigner),
        };

        let generation = self.inner.publish_generation.fetch_add(1, Ordering::SeqCst) + 1;
        *self.inner.publish.write().await = PublishStatus::Publishing { level };

        let record = CompletionRecord {
            player: signer,
            level,
            start_time: started_at.max(0) as u64,
            end_time: ended_at.max(0) as u64,
            score,
            lives_remaining: lives,
        };

        match publisher.publish(&record).await {
            Ok(Some(tx)) => {
                self.inner.known.add(signer);
                *self.inner.publish.write().await = PublishStatus::Succeeded { level, tx };
                self.schedule_success_reset(generation);
                PublishOutcome::Published(tx)
            }
            Ok(None) => {
                let message = truncate_message(
                    "no transaction identifier returned; the signer may need to approve the submission",
                );
                *self.inner.publish.write().await = PublishStatus::Failed {
                    level,
                    message: message.clone(),
                };
                PublishOutcome::Failed(message)
            }
            Err(e) => {
                let message = truncate_message(&e.to_string());
                warn!(level, error = %e, "publish failed");
                *self.inner.publish.write().await = PublishStatus::Failed {
                    level,
                    message: message.clone(),
                };
                PublishOutcome::Failed(message)
            }
        }
    }

    /// The signing identity's completion history, most recent first.
    /// Empty when the pipeline is unavailable or the fetch fails.
    pub async fn history(&self) -> Vec<CompletionRecord> {
        if self.unavailable_reason().await.is_some() {
            return Vec::new();
        }

        let publisher = self.inner.publisher.read().await;
        let Some(signer) = publisher.signer() else {
            return Vec::new();
        };

        match publisher.fetch_history(&signer).await {
            Ok(records) => records,
            Err(e) => {
                warn!(error = %e, "history fetch failed");
                Vec::new()
            }
        }
    }

    /// Standings across every known submitter. Empty when the pipeline
    /// is unavailable or nobody is known yet.
    pub async fn leaderboard(&self) -> Vec<LeaderboardEntry> {
        if !self.config.enabled {
            return Vec::new();
        }
        if *self.inner.connection.read().await != ConnectionStatus::Ready {
            return Vec::new();
        }

        let players = self.inner.known.all();
        if players.is_empty() {
            debug!("no known players yet");
            return Vec::new();
        }

        self.inner.publisher.read().await.fetch_leaderboard(&players).await
    }

    /// Add the current signer to the known-submitter registry.
    pub async fn register_known_player(&self) {
        if let Some(signer) = self.inner.publisher.read().await.signer() {
            self.inner.known.add(signer);
        }
    }

    async fn unavailable_reason(&self) -> Option<UnavailableReason> {
        if !self.config.enabled {
            return Some(UnavailableReason::Disabled);
        }
        if *self.inner.connection.read().await != ConnectionStatus::Ready {
            return Some(UnavailableReason::NotConnected);
        }
        if self.inner.publisher.read().await.signer().is_none() {
            return Some(UnavailableReason::NoSigner);
        }
        None
    }

    /// Return the success banner to idle after the display window,
    /// unless a newer publish has taken over the status slot.
    fn schedule_success_reset(&self, generation: u64) {
        let inner = Arc::clone(&self.inner);
        let window = self.config.success_display;

        tokio::spawn(async move {
            tokio::time::sleep(window).await;
            if inner.publish_generation.load(Ordering::SeqCst) != generation {
                return;
            }
            let mut status = inner.publish.write().await;
            if matches!(*status, PublishStatus::Succeeded { .. }) {
                *status = PublishStatus::Idle;
            }
        });
    }
}

/// Clip a message for display.
fn truncate_message(message: &str) -> String {
    if message.len() <= ERROR_DISPLAY_MAX {
        message.to_string()
    } else {
        let mut cut = ERROR_DISPLAY_MAX;
        while !message.is_char_boundary(cut) {
            cut -= 1;
        }
        format!("{}…", &message[..cut])
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::mock::MemoryLedger;
    use std::sync::Arc as StdArc;

    fn player(seed: u8) -> PlayerAddress {
        PlayerAddress::new([seed; 20])
    }

    fn completion(level: u32) -> GameEvent {
        GameEvent::LevelCompleted {
            level,
            started_at: 1_700_000_000,
            ended_at: 1_700_000_000 + level as i64,
            score: level as u64 * 150,
            lives: 3,
        }
    }

    fn coordinator_with(ledger: &MemoryLedger, config: PublishConfig) -> PublishCoordinator {
        let publisher = LedgerPublisher::new(StdArc::new(ledger.clone()));
        PublishCoordinator::new(publisher, Box::new(MemoryKnownPlayers::new()), config)
    }

    fn coordinator(ledger: &MemoryLedger) -> PublishCoordinator {
        coordinator_with(ledger, PublishConfig::default())
    }

    #[tokio::test]
    async fn test_unavailable_when_not_connected() {
        let ledger = MemoryLedger::new();
        let coord = coordinator(&ledger);

        let outcome = coord.handle_event(&completion(1)).await;

        // Reported as unavailable, no error, ledger untouched
        assert_eq!(
            outcome,
            Some(PublishOutcome::Unavailable(UnavailableReason::NotConnected))
        );
        assert_eq!(ledger.schema_count(), 0);
        assert_eq!(coord.publish_status().await, PublishStatus::Idle);
    }

    #[tokio::test]
    async fn test_unavailable_when_disabled() {
        let ledger = MemoryLedger::new();
        let config = PublishConfig {
            enabled: false,
            ..PublishConfig::default()
        };
        let coord = coordinator_with(&ledger, config);

        // connect is a no-op while disabled
        coord.connect(Some(player(1))).await.unwrap();
        assert_eq!(coord.connection_status().await, ConnectionStatus::Uninitialized);

        let outcome = coord.handle_event(&completion(1)).await;
        assert_eq!(
            outcome,
            Some(PublishOutcome::Unavailable(UnavailableReason::Disabled))
        );
    }

    #[tokio::test]
    async fn test_unavailable_without_signer() {
        let ledger = MemoryLedger::new();
        let coord = coordinator(&ledger);
        coord.connect(None).await.unwrap();

        let outcome = coord.handle_event(&completion(1)).await;
        assert_eq!(
            outcome,
            Some(PublishOutcome::Unavailable(UnavailableReason::NoSigner))
        );
    }

    #[tokio::test]
    async fn test_non_completion_events_ignored() {
        let ledger = MemoryLedger::new();
        let coord = coordinator(&ledger);

        let event = GameEvent::LifeLost {
            level: 1,
            cell: 4,
            lives: 2,
        };
        assert_eq!(coord.handle_event(&event).await, None);
    }

    #[tokio::test]
    async fn test_successful_publish_flow() {
        let ledger = MemoryLedger::new();
        let coord = coordinator(&ledger);
        coord.connect(Some(player(1))).await.unwrap();
        assert_eq!(coord.connection_status().await, ConnectionStatus::Ready);

        let outcome = coord.handle_event(&completion(2)).await.unwrap();
        let PublishOutcome::Published(tx) = outcome else {
            panic!("expected publish, got {outcome:?}");
        };

        assert_eq!(
            coord.publish_status().await,
            PublishStatus::Succeeded { level: 2, tx }
        );

        // The signer became a known submitter and shows up everywhere
        let history = coord.history().await;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].level, 2);

        let board = coord.leaderboard().await;
        assert_eq!(board.len(), 1);
        assert_eq!(board[0].player, player(1));
    }

    #[tokio::test]
    async fn test_failed_publish_reports_truncated_message() {
        let ledger = MemoryLedger::new();
        let coord = coordinator(&ledger);
        coord.connect(Some(player(1))).await.unwrap();

        let long_reason = "x".repeat(500);
        ledger.fail_submissions_with(&long_reason);

        let outcome = coord.handle_event(&completion(1)).await.unwrap();
        let PublishOutcome::Failed(message) = outcome else {
            panic!("expected failure, got {outcome:?}");
        };
        assert!(message.chars().count() <= ERROR_DISPLAY_MAX + 1);

        match coord.publish_status().await {
            PublishStatus::Failed { level: 1, .. } => {}
            other => panic!("expected failed status, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_tx_id_is_a_failure() {
        let ledger = MemoryLedger::new();
        let coord = coordinator(&ledger);
        coord.connect(Some(player(1))).await.unwrap();

        ledger.suppress_tx_ids();
        let outcome = coord.handle_event(&completion(1)).await.unwrap();
        assert!(matches!(outcome, PublishOutcome::Failed(_)));
    }

    #[tokio::test]
    async fn test_success_banner_auto_clears() {
        let ledger = MemoryLedger::new();
        let config = PublishConfig {
            success_display: Duration::from_millis(20),
            ..PublishConfig::default()
        };
        let coord = coordinator_with(&ledger, config);
        coord.connect(Some(player(1))).await.unwrap();

        coord.handle_event(&completion(1)).await.unwrap();
        assert!(matches!(
            coord.publish_status().await,
            PublishStatus::Succeeded { .. }
        ));

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(coord.publish_status().await, PublishStatus::Idle);
    }

    #[tokio::test]
    async fn test_stale_success_reset_never_clears_newer_status() {
        let ledger = MemoryLedger::new();
        let config = PublishConfig {
            success_display: Duration::from_millis(20),
            ..PublishConfig::default()
        };
        let coord = coordinator_with(&ledger, config);
        coord.connect(Some(player(1))).await.unwrap();

        // Success schedules a reset, then a failure takes the slot
        coord.handle_event(&completion(1)).await.unwrap();
        ledger.fail_submissions_with("link down");
        coord.handle_event(&completion(2)).await.unwrap();

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(matches!(
            coord.publish_status().await,
            PublishStatus::Failed { level: 2, .. }
        ));
    }

    #[tokio::test]
    async fn test_disconnect_requires_reconnection() {
        let ledger = MemoryLedger::new();
        let coord = coordinator(&ledger);
        coord.connect(Some(player(1))).await.unwrap();

        coord.disconnect().await;
        assert_eq!(coord.connection_status().await, ConnectionStatus::Uninitialized);

        let outcome = coord.handle_event(&completion(1)).await;
        assert_eq!(
            outcome,
            Some(PublishOutcome::Unavailable(UnavailableReason::NotConnected))
        );
    }

    #[tokio::test]
    async fn test_failed_initialization_reflected_in_status() {
        let ledger = MemoryLedger::new();
        ledger.fail_registrations_with("backend down");
        let coord = coordinator(&ledger);

        assert!(coord.connect(Some(player(1))).await.is_err());
        assert!(matches!(
            coord.connection_status().await,
            ConnectionStatus::Failed(_)
        ));
    }

    #[tokio::test]
    async fn test_reads_empty_when_unavailable() {
        let ledger = MemoryLedger::new();
        let coord = coordinator(&ledger);

        assert!(coord.history().await.is_empty());
        assert!(coord.leaderboard().await.is_empty());
    }

    #[test]
    fn test_memory_registry_dedups() {
        let registry = MemoryKnownPlayers::new();
        registry.add(player(1));
        registry.add(player(1));
        registry.add(player(2));

        assert_eq!(registry.all(), vec![player(1), player(2)]);
    }

    #[test]
    fn test_json_registry_roundtrip() {
        let path = std::env::temp_dir().join(format!(
            "tilepath-registry-{}.json",
            std::process::id()
        ));
        let _ = std::fs::remove_file(&path);

        let registry = JsonKnownPlayers::new(&path);
        assert!(registry.all().is_empty());

        registry.add(player(1));
        registry.add(player(2));
        registry.add(player(1));

        // A fresh instance reads the same set back
        let reopened = JsonKnownPlayers::new(&path);
        assert_eq!(reopened.all(), vec![player(1), player(2)]);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_json_registry_survives_garbage_file() {
        let path = std::env::temp_dir().join(format!(
            "tilepath-registry-bad-{}.json",
            std::process::id()
        ));
        std::fs::write(&path, "not json at all").unwrap();

        let registry = JsonKnownPlayers::new(&path);
        assert!(registry.all().is_empty());

        registry.add(player(3));
        assert_eq!(registry.all(), vec![player(3)]);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_truncate_message() {
        assert_eq!(truncate_message("short"), "short");

        let long = "e".repeat(500);
        let cut = truncate_message(&long);
        assert!(cut.chars().count() == ERROR_DISPLAY_MAX + 1);
        assert!(cut.ends_with('…'));
    }
}
