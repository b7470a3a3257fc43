//! Game Events
//!
//! Events generated by the engine for observers: UI layers react to them,
//! and the publishing pipeline consumes `LevelCompleted`. Events are
//! buffered inside the engine and drained with
//! [`GameEngine::take_events`](crate::game::engine::GameEngine::take_events);
//! the engine itself knows nothing about its consumers.

use serde::{Deserialize, Serialize};

use crate::core::grid::Cell;

/// Something the engine wants observers to know about.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEvent {
    /// A fresh level attempt began presenting its path.
    LevelStarted {
        /// Level number.
        level: u32,
        /// Board dimension for this level.
        grid_dim: u16,
        /// Length of the path to memorize.
        path_len: usize,
    },

    /// The presentation finished and input is now accepted.
    InputEnabled {
        /// Level number.
        level: u32,
        /// Unix-seconds timestamp when the player's turn began.
        started_at: i64,
    },

    /// A wrong tile cost a life.
    LifeLost {
        /// Level number.
        level: u32,
        /// The tile that was wrongly selected.
        cell: Cell,
        /// Lives remaining after the loss.
        lives: u32,
    },

    /// The player reproduced the whole path.
    ///
    /// Emitted at most once per clear, from the scoring step, before the
    /// level-complete screen transition is scheduled.
    LevelCompleted {
        /// Level that was cleared.
        level: u32,
        /// Unix-seconds timestamp when input was enabled.
        started_at: i64,
        /// Unix-seconds timestamp of the final correct tile.
        ended_at: i64,
        /// Running session score after the clear, bonus included.
        score: u64,
        /// Lives remaining at the clear.
        lives: u32,
    },

    /// The session ended.
    GameOver {
        /// Level the session ended on.
        level: u32,
        /// Final session score.
        score: u64,
        /// True when the session ended by finishing the ladder rather
        /// than by running out of lives.
        cleared_ladder: bool,
    },
}

// =============================================================================
// TESTS
// =============================================================================
