//! # Tilepath Game Engine
//!
//! Sequence-memory puzzle engine: the player watches a path traced over a
//! tile grid, then reproduces it from memory. Completed levels can be
//! recorded to an external append-only ledger for history and leaderboards.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        TILEPATH                              │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Deterministic primitives                  │
//! │  ├── grid.rs     - Square-grid cell arithmetic               │
//! │  ├── rng.rs      - Deterministic Xorshift128+ PRNG           │
//! │  └── hash.rs     - Record keys, schema ids, tx ids           │
//! │                                                              │
//! │  game/           - Game logic (deterministic)                │
//! │  ├── catalog.rs  - Level difficulty ladder                   │
//! │  ├── path.rs     - Self-avoiding walk generation             │
//! │  ├── engine.rs   - Screen and turn state machine             │
//! │  └── events.rs   - Engine event types                        │
//! │                                                              │
//! │  ledger/         - Publishing pipeline (async, IO-facing)    │
//! │  ├── client.rs   - Ledger client trait                       │
//! │  ├── record.rs   - Completion record and codec               │
//! │  ├── publisher.rs- Schema registration and publish           │
//! │  ├── coordinator.rs - Publish orchestration and status       │
//! │  └── mock.rs     - In-memory ledger for tests and demos      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Determinism Guarantee
//!
//! The `core/` and `game/` modules are **100% deterministic**:
//! - No system time dependencies (virtual clock, injectable wall clock)
//! - All randomness from seeded Xorshift128+
//! - BTreeMap for sorted iteration where ordering matters
//!
//! Given identical inputs, a seed, and a clock, a play session produces
//! identical paths, scores, and events on any platform. Only the `ledger/`
//! layer performs IO, and it talks to an abstract
//! [`LedgerClient`](ledger::client::LedgerClient).

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod game;
pub mod ledger;

// Re-export commonly used types
pub use crate::core::rng::DeterministicRng;
pub use game::catalog::{LevelCatalog, LevelConfig};
pub use game::engine::{GameEngine, Screen, TileMark, TurnPhase};
pub use game::events::GameEvent;
pub use ledger::client::{LedgerClient, LedgerError};
pub use ledger::coordinator::{PublishCoordinator, PublishOutcome, PublishStatus};
pub use ledger::publisher::LedgerPublisher;
pub use ledger::record::{CompletionRecord, LeaderboardEntry, PlayerAddress};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Lives granted at the start of a fresh session.
pub const STARTING_LIVES: u32 = 3;

/// Spacing between tile reveals during path presentation (virtual ms).
///
/// Fixed across all levels. The catalog's per-level reveal interval is
/// carried as configuration data but does not drive this loop.
pub const REVEAL_STEP_MS: u64 = 500;

/// Delay between entering the game screen and the first reveal (virtual ms).
pub const SETUP_DELAY_MS: u64 = 100;

/// Delay before feedback transitions fire: level-complete screen, game-over
/// screen, and mistake recovery (virtual ms).
pub const FEEDBACK_DELAY_MS: u64 = 800;
