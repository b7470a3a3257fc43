//! Level Difficulty Ladder
//!
//! A static ordered table mapping level number to board dimension, path
//! length, and reveal interval. Levels beyond the table reuse the last
//! entry (difficulty plateau).

use serde::{Deserialize, Serialize};

use crate::core::grid::cell_count;

/// Parameters for one level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelConfig {
    /// Board dimension N (the board has N² cells).
    pub grid_dim: u16,

    /// Number of cells in the path to memorize.
    pub path_len: usize,

    /// Configured reveal interval for this level (ms).
    ///
    /// Carried for the presentation layer; the engine's reveal loop paces
    /// at a fixed step instead (see [`crate::REVEAL_STEP_MS`]).
    pub reveal_interval_ms: u64,
}

/// Catalog validation errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    /// The catalog has no entries.
    #[error("catalog has no entries")]
    Empty,

    /// An entry has a zero board dimension.
    #[error("level {level}: board dimension must be positive")]
    ZeroDimension {
        /// 1-based level number of the offending entry.
        level: u32,
    },

    /// An entry has a zero path length.
    #[error("level {level}: path length must be positive")]
    ZeroPathLength {
        /// 1-based level number of the offending entry.
        level: u32,
    },

    /// An entry's path cannot fit on its board.
    ///
    /// A self-avoiding walk of the full board is not guaranteed to exist
    /// from every start, so path length must stay strictly below the cell
    /// count or generation could retry forever.
    #[error("level {level}: path length {path_len} must be < {cells} cells")]
    PathTooLong {
        /// 1-based level number of the offending entry.
        level: u32,
        /// Requested path length.
        path_len: usize,
        /// Cells available on the board.
        cells: u32,
    },
}

/// Ordered difficulty table, indexed by level number starting at 1.
#[derive(Clone, Debug)]
pub struct LevelCatalog {
    entries: Vec<LevelConfig>,
}

impl LevelCatalog {
    /// Build a catalog from explicit entries, validating each one.
    pub fn new(entries: Vec<LevelConfig>) -> Result<Self, CatalogError> {
        if entries.is_empty() {
            return Err(CatalogError::Empty);
        }

        for (i, entry) in entries.iter().enumerate() {
            let level = (i + 1) as u32;
            if entry.grid_dim == 0 {
                return Err(CatalogError::ZeroDimension { level });
            }
            if entry.path_len == 0 {
                return Err(CatalogError::ZeroPathLength { level });
            }
            let cells = cell_count(entry.grid_dim);
            if entry.path_len as u32 >= cells {
                return Err(CatalogError::PathTooLong {
                    level,
                    path_len: entry.path_len,
                    cells,
                });
            }
        }

        Ok(Self { entries })
    }

    /// The standard 15-level ladder: 3×3 boards with 3-cell paths up to
    /// 8×8 boards with 12-cell paths, reveal intervals tightening from
    /// 2000 ms to 1200 ms.
    pub fn standard() -> Self {
        let entries = vec![
            LevelConfig { grid_dim: 3, path_len: 3, reveal_interval_ms: 2000 },
            LevelConfig { grid_dim: 3, path_len: 4, reveal_interval_ms: 2000 },
            LevelConfig { grid_dim: 4, path_len: 4, reveal_interval_ms: 2000 },
            LevelConfig { grid_dim: 4, path_len: 5, reveal_interval_ms: 1800 },
            LevelConfig { grid_dim: 4, path_len: 6, reveal_interval_ms: 1800 },
            LevelConfig { grid_dim: 5, path_len: 6, reveal_interval_ms: 1800 },
            LevelConfig { grid_dim: 5, path_len: 7, reveal_interval_ms: 1600 },
            LevelConfig { grid_dim: 5, path_len: 8, reveal_interval_ms: 1600 },
            LevelConfig { grid_dim: 6, path_len: 8, reveal_interval_ms: 1500 },
            LevelConfig { grid_dim: 6, path_len: 9, reveal_interval_ms: 1500 },
            LevelConfig { grid_dim: 6, path_len: 10, reveal_interval_ms: 1400 },
            LevelConfig { grid_dim: 7, path_len: 10, reveal_interval_ms: 1400 },
            LevelConfig { grid_dim: 7, path_len: 11, reveal_interval_ms: 1300 },
            LevelConfig { grid_dim: 7, path_len: 12, reveal_interval_ms: 1300 },
            LevelConfig { grid_dim: 8, path_len: 12, reveal_interval_ms: 1200 },
        ];

        // The built-in table always validates
        Self::new(entries).expect("standard catalog is valid")
    }

    /// Parameters for a level, clamped to the last entry beyond the table.
    pub fn config_for(&self, level: u32) -> &LevelConfig {
        let idx = (level.max(1) as usize - 1).min(self.entries.len() - 1);
        &self.entries[idx]
    }

    /// Number of defined levels.
    pub fn len(&self) -> u32 {
        self.entries.len() as u32
    }

    /// Whether the catalog is empty. Construction forbids this, so always
    /// false; present for clippy's len-without-is-empty lint.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for LevelCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_shape() {
        let catalog = LevelCatalog::standard();
        assert_eq!(catalog.len(), 15);

        let first = catalog.config_for(1);
        assert_eq!(first.grid_dim, 3);
        assert_eq!(first.path_len, 3);
        assert_eq!(first.reveal_interval_ms, 2000);

        let last = catalog.config_for(15);
        assert_eq!(last.grid_dim, 8);
        assert_eq!(last.path_len, 12);
        assert_eq!(last.reveal_interval_ms, 1200);
    }

    #[test]
    fn test_plateau_beyond_table() {
        let catalog = LevelCatalog::standard();
        let last = *catalog.config_for(catalog.len());

        // Levels past the table reuse the final entry, never out-of-range
        assert_eq!(*catalog.config_for(16), last);
        assert_eq!(*catalog.config_for(100), last);
        assert_eq!(*catalog.config_for(u32::MAX), last);
    }

    #[test]
    fn test_level_zero_clamps_to_first() {
        let catalog = LevelCatalog::standard();
        assert_eq!(catalog.config_for(0), catalog.config_for(1));
    }

    #[test]
    fn test_rejects_empty() {
        assert!(matches!(LevelCatalog::new(vec![]), Err(CatalogError::Empty)));
    }

    #[test]
    fn test_rejects_path_filling_board() {
        // 2x2 board with a 4-cell path: a walk visiting every cell may
        // never terminate generation, so the catalog must refuse it.
        let result = LevelCatalog::new(vec![LevelConfig {
            grid_dim: 2,
            path_len: 4,
            reveal_interval_ms: 1000,
        }]);

        assert!(matches!(
            result,
            Err(CatalogError::PathTooLong { level: 1, path_len: 4, cells: 4 })
        ));
    }

    #[test]
    fn test_rejects_zero_fields() {
        let zero_dim = LevelCatalog::new(vec![LevelConfig {
            grid_dim: 0,
            path_len: 1,
            reveal_interval_ms: 1000,
        }]);
        assert!(matches!(zero_dim, Err(CatalogError::ZeroDimension { level: 1 })));

        let zero_path = LevelCatalog::new(vec![LevelConfig {
            grid_dim: 3,
            path_len: 0,
            reveal_interval_ms: 1000,
        }]);
        assert!(matches!(zero_path, Err(CatalogError::ZeroPathLength { level: 1 })));
    }

    #[test]
    fn test_every_standard_entry_is_generable() {
        let catalog = LevelCatalog::standard();
        for level in 1..=catalog.len() {
            let entry = catalog.config_for(level);
            assert!((entry.path_len as u32) < cell_count(entry.grid_dim));
        }
    }
}
