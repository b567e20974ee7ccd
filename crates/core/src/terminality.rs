//! "No moves left" detection.

use crate::grid::Grid;

/// Whether the game can continue on `grid`.
///
/// Any empty cell counts as a remaining move, even when no slide or merge
/// is possible, because the next turn can still spawn into it. A full grid
/// has moves iff two orthogonally adjacent tiles share a power; the upgrade
/// flag is ignored here since it only describes the previous turn.
pub fn has_moves(grid: &Grid) -> bool {
    if grid.occupied_count() < grid.capacity() {
        return true;
    }

    for y in 0..grid.rows() as i8 {
        for x in 0..grid.cols() as i8 {
            let Some(tile) = grid.get(x, y) else {
                continue;
            };
            let right = grid.get(x + 1, y);
            let below = grid.get(x, y + 1);
            if [right, below]
                .into_iter()
                .flatten()
                .any(|n| n.power == tile.power)
            {
                return true;
            }
        }
    }

    false
}
