//! Tile mover - slide and merge tiles toward one edge
//!
//! Cells are visited starting with the line closest to the target edge
//! (moving up scans rows top to bottom, moving right scans columns right to
//! left), so every tile in front of the current one has already settled.
//! From each tile a ray walks toward the edge until it meets another tile
//! or the boundary:
//!
//! - a tile that [`TileMover::can_merge`] with the moving one absorbs it and
//!   becomes the next power, flagged `upgraded_this_turn`
//! - anything else stops the moving tile on the last empty cell of the ray
//!
//! The upgrade flag keeps a freshly merged tile from merging again in the
//! same move, so `[2, 2, 4]` moved left becomes `[4, 4, _]`, not `[8, _, _]`.

use arrayvec::ArrayVec;

use crate::grid::Grid;
use crate::types::{Direction, Position, Tile, MAX_CELLS, MAX_TILE_POWER};

/// A tile that changed cell without merging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slide {
    pub from: Position,
    pub to: Position,
    pub tile: Tile,
}

/// Two tiles combined into one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Merge {
    /// Where the moving tile started
    pub from: Position,
    /// The absorbing tile's cell, which now holds `tile`
    pub into: Position,
    /// The upgraded tile
    pub tile: Tile,
}

/// Everything a single move did to the grid.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MoveOutcome {
    pub slides: ArrayVec<Slide, MAX_CELLS>,
    pub merges: ArrayVec<Merge, MAX_CELLS>,
    /// Points earned by the merges (twice the absorbed tile's value each)
    pub score_gained: u32,
}

impl MoveOutcome {
    /// True iff at least one tile changed cell or merged
    pub fn changed(&self) -> bool {
        !self.slides.is_empty() || !self.merges.is_empty()
    }

    /// Highest value produced by a merge in this move
    pub fn best_merge_value(&self) -> Option<u32> {
        self.merges.iter().map(|m| m.tile.value).max()
    }
}

/// What stopped a ray.
enum Obstacle {
    Boundary,
    Tile(Position, Tile),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileMover {
    max_tile_value: u32,
}

impl TileMover {
    /// Tiles with `max_tile_value` never merge further
    pub fn new(max_tile_value: u32) -> Self {
        Self { max_tile_value }
    }

    pub fn max_tile_value(&self) -> u32 {
        self.max_tile_value
    }

    /// Merge rule: equal powers, moving tile below the cap, neither tile
    /// produced by a merge earlier this turn.
    ///
    /// Tiles of [`MAX_TILE_POWER`] never merge since their upgrade would not
    /// fit in a `u32`, whatever the configured cap.
    pub fn can_merge(&self, moving: &Tile, obstacle: &Tile) -> bool {
        moving.power == obstacle.power
            && moving.power < MAX_TILE_POWER
            && moving.value != self.max_tile_value
            && !moving.upgraded_this_turn
            && !obstacle.upgraded_this_turn
    }

    /// Move every tile toward `direction`, returning true iff the grid changed
    pub fn move_tiles(&self, grid: &mut Grid, direction: Direction) -> bool {
        self.shift(grid, direction).changed()
    }

    /// Dry run of [`TileMover::move_tiles`] on a copy of the grid
    pub fn can_shift(&self, grid: &Grid, direction: Direction) -> bool {
        let mut scratch = grid.clone();
        self.move_tiles(&mut scratch, direction)
    }

    /// Directions that would change the grid, indexed like [`Direction::ALL`]
    pub fn legal_moves(&self, grid: &Grid) -> [bool; 4] {
        Direction::ALL.map(|direction| self.can_shift(grid, direction))
    }

    /// Move every tile toward `direction` and report what happened
    pub fn shift(&self, grid: &mut Grid, direction: Direction) -> MoveOutcome {
        let mut outcome = MoveOutcome::default();

        for pos in scan_order(grid.rows(), grid.cols(), direction) {
            let Some(Some(tile)) = grid.at(pos) else {
                continue;
            };

            let (landing, obstacle) = cast(grid, pos, direction);
            match obstacle {
                Obstacle::Tile(at, other) if self.can_merge(&tile, &other) => {
                    let merged = other.upgraded();
                    grid.replace(pos, None);
                    grid.replace(at, Some(merged));
                    outcome.score_gained = outcome.score_gained.saturating_add(merged.value);
                    outcome.merges.push(Merge {
                        from: pos,
                        into: at,
                        tile: merged,
                    });
                }
                _ => {
                    if landing != pos {
                        grid.replace(pos, None);
                        grid.replace(landing, Some(tile));
                        outcome.slides.push(Slide {
                            from: pos,
                            to: landing,
                            tile,
                        });
                    }
                }
            }
        }

        outcome
    }
}

/// Walk from `from` toward `direction`; returns the farthest empty cell
/// reached (or `from` itself) and what blocked further travel.
fn cast(grid: &Grid, from: Position, direction: Direction) -> (Position, Obstacle) {
    let mut last_free = from;
    loop {
        let next = last_free.step(direction);
        match grid.at(next) {
            None => return (last_free, Obstacle::Boundary),
            Some(None) => last_free = next,
            Some(Some(tile)) => return (last_free, Obstacle::Tile(next, tile)),
        }
    }
}

/// Cells ordered so the line nearest the target edge comes first.
fn scan_order(rows: u8, cols: u8, direction: Direction) -> ArrayVec<Position, MAX_CELLS> {
    let (rows, cols) = (rows as i8, cols as i8);
    let mut order = ArrayVec::new();
    match direction {
        Direction::Up | Direction::Down => {
            for i in 0..rows {
                let y = if direction == Direction::Up { i } else { rows - 1 - i };
                for x in 0..cols {
                    order.push(Position::new(x, y));
                }
            }
        }
        Direction::Left | Direction::Right => {
            for i in 0..cols {
                let x = if direction == Direction::Left { i } else { cols - 1 - i };
                for y in 0..rows {
                    order.push(Position::new(x, y));
                }
            }
        }
    }
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DEFAULT_MAX_TILE_VALUE;

    fn mover() -> TileMover {
        TileMover::new(DEFAULT_MAX_TILE_VALUE)
    }

    fn grid(rows: &[&[u32]]) -> Grid {
        Grid::from_values(rows).unwrap()
    }

    #[test]
    fn test_two_by_two_merge_left() {
        let mut g = grid(&[&[2, 2], &[0, 0]]);
        let outcome = mover().shift(&mut g, Direction::Left);

        assert!(outcome.changed());
        assert_eq!(outcome.score_gained, 4);
        assert_eq!(g.to_values(), vec![vec![4, 0], vec![0, 0]]);
        assert_eq!(outcome.merges.len(), 1);
        assert_eq!(outcome.merges[0].from, Position::new(1, 0));
        assert_eq!(outcome.merges[0].into, Position::new(0, 0));
        assert!(g.get(0, 0).unwrap().upgraded_this_turn);
    }

    #[test]
    fn test_slide_to_boundary() {
        let mut g = grid(&[&[0, 0, 0, 2], &[0, 0, 0, 0], &[0, 4, 0, 0], &[0, 0, 0, 0]]);
        assert!(mover().move_tiles(&mut g, Direction::Left));
        assert_eq!(
            g.to_values(),
            vec![vec![2, 0, 0, 0], vec![0; 4], vec![4, 0, 0, 0], vec![0; 4]]
        );
    }

    #[test]
    fn test_slide_flush_against_different_tile() {
        let mut g = grid(&[&[2], &[0], &[0], &[4]]);
        let outcome = mover().shift(&mut g, Direction::Down);
        assert_eq!(g.to_values(), vec![vec![0], vec![0], vec![2], vec![4]]);
        assert_eq!(outcome.slides.len(), 1);
        assert_eq!(outcome.slides[0].from, Position::new(0, 0));
        assert_eq!(outcome.slides[0].to, Position::new(0, 2));
        assert_eq!(outcome.score_gained, 0);
    }

    #[test]
    fn test_each_tile_merges_once_per_move() {
        let mut g = grid(&[&[2, 2, 4, 0]]);
        mover().move_tiles(&mut g, Direction::Left);
        assert_eq!(g.to_values(), vec![vec![4, 4, 0, 0]]);

        let mut g = grid(&[&[2, 2, 2, 2]]);
        let outcome = mover().shift(&mut g, Direction::Left);
        assert_eq!(g.to_values(), vec![vec![4, 4, 0, 0]]);
        assert_eq!(outcome.score_gained, 8);
    }

    #[test]
    fn test_merge_prefers_tiles_nearest_the_edge() {
        let mut g = grid(&[&[2, 2, 2, 0]]);
        mover().move_tiles(&mut g, Direction::Right);
        assert_eq!(g.to_values(), vec![vec![0, 0, 2, 4]]);

        let mut g = grid(&[&[2, 2, 2, 0]]);
        mover().move_tiles(&mut g, Direction::Left);
        assert_eq!(g.to_values(), vec![vec![4, 2, 0, 0]]);
    }

    #[test]
    fn test_all_four_directions() {
        let start = grid(&[&[2, 0, 0], &[0, 0, 0], &[0, 0, 2]]);

        let mut up = start.clone();
        mover().move_tiles(&mut up, Direction::Up);
        assert_eq!(up.to_values(), vec![vec![2, 0, 2], vec![0; 3], vec![0; 3]]);

        let mut down = start.clone();
        mover().move_tiles(&mut down, Direction::Down);
        assert_eq!(down.to_values(), vec![vec![0; 3], vec![0; 3], vec![2, 0, 2]]);

        let mut left = start.clone();
        mover().move_tiles(&mut left, Direction::Left);
        assert_eq!(left.to_values(), vec![vec![2, 0, 0], vec![0; 3], vec![2, 0, 0]]);

        let mut right = start;
        mover().move_tiles(&mut right, Direction::Right);
        assert_eq!(right.to_values(), vec![vec![0, 0, 2], vec![0; 3], vec![0, 0, 2]]);
    }

    #[test]
    fn test_unchanged_move_reports_false() {
        let mut g = grid(&[&[2, 4], &[0, 0]]);
        let before = g.clone();
        let outcome = mover().shift(&mut g, Direction::Left);
        assert!(!outcome.changed());
        assert_eq!(g, before);

        assert!(!mover().move_tiles(&mut g, Direction::Up));
    }

    #[test]
    fn test_already_upgraded_tile_does_not_merge() {
        let mut g = Grid::new(1, 2).unwrap();
        g.set(0, 0, Some(Tile::new(0).upgraded())).unwrap();
        g.set(1, 0, Some(Tile::new(1))).unwrap();

        assert!(!mover().can_merge(&g.get(1, 0).unwrap(), &g.get(0, 0).unwrap()));
        assert!(!mover().move_tiles(&mut g, Direction::Left));
        assert_eq!(g.to_values(), vec![vec![4, 4]]);
    }

    #[test]
    fn test_max_value_tiles_do_not_merge() {
        let capped = TileMover::new(8);
        let mut g = grid(&[&[8, 8]]);
        assert!(!capped.move_tiles(&mut g, Direction::Left));

        let mut g = grid(&[&[4, 4]]);
        let outcome = capped.shift(&mut g, Direction::Left);
        assert_eq!(outcome.best_merge_value(), Some(8));
    }

    #[test]
    fn test_top_power_tiles_do_not_merge() {
        const TOP: u32 = 1 << 31;
        let mut g = grid(&[&[TOP, TOP], &[0, 0]]);
        let outcome = mover().shift(&mut g, Direction::Left);
        assert!(!outcome.changed());
        assert_eq!(g.to_values(), vec![vec![TOP, TOP], vec![0, 0]]);
        assert!(!mover().can_merge(&Tile::new(MAX_TILE_POWER), &Tile::new(MAX_TILE_POWER)));
    }

    #[test]
    fn test_score_saturates_on_huge_merges() {
        const HALF: u32 = 1 << 30;
        let mut g = grid(&[&[HALF, HALF], &[HALF, HALF]]);
        let outcome = mover().shift(&mut g, Direction::Left);
        assert_eq!(outcome.merges.len(), 2);
        assert_eq!(g.to_values(), vec![vec![HALF * 2, 0], vec![HALF * 2, 0]]);
        assert_eq!(outcome.score_gained, u32::MAX);
    }

    #[test]
    fn test_legal_moves_mask() {
        let g = grid(&[&[2, 4], &[0, 0]]);
        // [up, down, left, right]
        assert_eq!(mover().legal_moves(&g), [false, true, false, false]);

        let full = grid(&[&[2, 4], &[4, 2]]);
        assert_eq!(mover().legal_moves(&full), [false; 4]);
    }

    #[test]
    fn test_scan_order_starts_at_target_edge() {
        let order = scan_order(2, 3, Direction::Right);
        assert_eq!(order[0], Position::new(2, 0));
        assert_eq!(order[1], Position::new(2, 1));
        assert_eq!(order[5], Position::new(0, 1));

        let order = scan_order(2, 3, Direction::Down);
        assert_eq!(order[0], Position::new(0, 1));
        assert_eq!(order[3], Position::new(0, 0));
    }
}
