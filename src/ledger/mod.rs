//! Publishing pipeline: completion records on an append-only ledger.
//!
//! The game engine knows nothing about ledgers; it emits events. This
//! module turns `LevelCompleted` events into durable records behind an
//! abstract [`client::LedgerClient`], and answers history and leaderboard
//! queries by scanning known submitters.

pub mod client;
pub mod coordinator;
pub mod mock;
pub mod publisher;
pub mod record;
