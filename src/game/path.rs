//! Self-Avoiding Walk Generation
//!
//! Produces the path the player must memorize: a random walk on the grid
//! graph that never revisits a cell. A walk that dead-ends before reaching
//! the target length is discarded and generation restarts from a fresh
//! random cell.

use crate::core::grid::{cell_count, neighbors, Cell};
use crate::core::rng::DeterministicRng;

/// Ceiling on full restarts before generation gives up.
///
/// Catalog validation keeps path length well below the cell count, so in
/// practice a handful of restarts suffice even on a 3×3 board; the ceiling
/// exists so a pathological configuration fails instead of spinning.
pub const MAX_RESTARTS: u32 = 10_000;

/// Path generation errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    /// Requested length of zero.
    #[error("path length must be positive")]
    ZeroLength,

    /// Board dimension of zero.
    #[error("board dimension must be positive")]
    ZeroDimension,

    /// The path cannot fit on the board with room to spare.
    #[error("path length {path_len} must be < {cells} cells on a {dim}x{dim} board")]
    LengthExceedsGrid {
        /// Requested path length.
        path_len: usize,
        /// Cells available.
        cells: u32,
        /// Board dimension.
        dim: u16,
    },

    /// Every restart dead-ended before reaching the target length.
    #[error("gave up after {0} restarts")]
    RetriesExhausted(u32),
}

/// Generate a self-avoiding walk of exactly `length` cells on a
/// `dim`×`dim` board.
///
/// Picks a uniformly random start, then repeatedly steps to a uniformly
/// random unvisited 4-neighbor. A dead end discards the whole attempt and
/// restarts from a new random cell. Deterministic given the RNG state:
/// the same seed always yields the same path.
pub fn generate(rng: &mut DeterministicRng, length: usize, dim: u16) -> Result<Vec<Cell>, PathError> {
    if length == 0 {
        return Err(PathError::ZeroLength);
    }
    if dim == 0 {
        return Err(PathError::ZeroDimension);
    }
    let cells = cell_count(dim);
    if length as u32 >= cells {
        return Err(PathError::LengthExceedsGrid {
            path_len: length,
            cells,
            dim,
        });
    }

    for _ in 0..MAX_RESTARTS {
        if let Some(path) = attempt(rng, length, dim, cells) {
            return Ok(path);
        }
    }

    Err(PathError::RetriesExhausted(MAX_RESTARTS))
}

/// One generation attempt; `None` on a dead end.
fn attempt(rng: &mut DeterministicRng, length: usize, dim: u16, cells: u32) -> Option<Vec<Cell>> {
    let mut path = Vec::with_capacity(length);
    let mut visited = vec![false; cells as usize];

    let start = rng.next_int(cells) as Cell;
    path.push(start);
    visited[start as usize] = true;

    while path.len() < length {
        let last = path[path.len() - 1];
        let open: Vec<Cell> = neighbors(last, dim)
            .into_iter()
            .filter(|&c| !visited[c as usize])
            .collect();

        let next = *rng.choose(&open)?;
        visited[next as usize] = true;
        path.push(next);
    }

    Some(path)
}

// =============================================================================
// TESTS
// =============================================================================
