//! Tile spawning
//!
//! A spawn draws the tile power first, then a uniformly random start cell,
//! and probes row-major (wrapping from the last cell to the first) until it
//! finds an empty cell. The probe is not uniform over empty cells: an empty
//! cell right after a run of occupied cells is hit by every start inside the
//! run. Replays depend on this exact draw order.

use rand::Rng;

use crate::error::GridError;
use crate::grid::Grid;
use crate::types::{NewTileSpec, Position, Tile};

/// First empty cell at or after `start` in row-major order, wrapping around
pub fn probe_empty(grid: &Grid, start: usize) -> Option<Position> {
    let capacity = grid.capacity();
    let cells = grid.cells();
    (0..capacity)
        .map(|offset| (start + offset) % capacity)
        .find(|&idx| cells[idx].is_none())
        .map(|idx| grid.position_of(idx))
}

/// Place one new tile on `grid`.
///
/// Fails with [`GridError::GridFull`] when there is no empty cell; the grid
/// is left untouched and no randomness is consumed in that case.
pub fn spawn_tile<R: Rng>(
    grid: &mut Grid,
    spec: &NewTileSpec,
    rng: &mut R,
) -> Result<(Position, Tile), GridError> {
    if grid.is_full() {
        return Err(GridError::GridFull);
    }

    let roll: f64 = rng.random();
    let tile = Tile::new(spec.power_for_roll(roll));
    let start = rng.random_range(0..grid.capacity());

    let position = probe_empty(grid, start).ok_or(GridError::GridFull)?;
    grid.replace(position, Some(tile));
    Ok((position, tile))
}
