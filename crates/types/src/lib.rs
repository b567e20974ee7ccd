//! Core types module - shared data structures and constants
//!
//! This module defines the fundamental types used throughout the application.
//! All types are pure data structures with no external dependencies, making them
//! usable in any context (core logic, terminal rendering, AI protocol).
//!
//! # Grid Dimensions
//!
//! The classic puzzle is played on a 4x4 grid, but any rectangle up to
//! [`MAX_GRID_DIM`] cells per side is supported. Coordinates are `(x, y)` with
//! `x` growing to the right and `y` growing downward; `(0, 0)` is top-left.
//!
//! # Tile Values
//!
//! A tile stores its *power*; the displayed value is derived from it:
//!
//! | Power | Value |
//! |-------|-------|
//! | 0 | 2 |
//! | 1 | 4 |
//! | 2 | 8 |
//! | 10 | 2048 |
//!
//! # Examples
//!
//! ```
//! use tui_2048_types::{Direction, GameAction, Tile, DEFAULT_COLS, DEFAULT_ROWS};
//!
//! let tile = Tile::new(1);
//! assert_eq!(tile.value, 4);
//! assert_eq!(tile.upgraded().value, 8);
//!
//! assert_eq!(Direction::from_str("left"), Some(Direction::Left));
//! assert_eq!(GameAction::from_str("reset"), Some(GameAction::Reset));
//!
//! assert_eq!(DEFAULT_ROWS, 4);
//! assert_eq!(DEFAULT_COLS, 4);
//! ```

/// Default number of rows (4)
pub const DEFAULT_ROWS: u8 = 4;

/// Default number of columns (4)
pub const DEFAULT_COLS: u8 = 4;

/// Largest supported side length of a grid
pub const MAX_GRID_DIM: u8 = 8;

/// Upper bound on cells in any supported grid
pub const MAX_CELLS: usize = (MAX_GRID_DIM as usize) * (MAX_GRID_DIM as usize);

/// Value of a power-0 tile
pub const TILE_BASE_VALUE: u32 = 2;

/// Highest representable tile power (value 2^31)
pub const MAX_TILE_POWER: u8 = 30;

/// Tiles of this value stop merging by default
pub const DEFAULT_MAX_TILE_VALUE: u32 = 2048;

/// Chance that a spawned tile uses the high power
pub const DEFAULT_HIGH_PROBABILITY: f64 = 0.1;

/// Fixed frame interval for the terminal host in milliseconds
pub const TICK_MS: u32 = 16;

/// Duration of the spawn/merge highlight in the terminal host
pub const TILE_FLASH_MS: u32 = 120;

/// Minimum drag length (terminal cells) that counts as a swipe
pub const DEFAULT_MIN_SWIPE_DISTANCE: f32 = 2.0;

/// Value of a tile with the given power.
#[inline]
pub const fn value_for_power(power: u8) -> u32 {
    TILE_BASE_VALUE << power
}

/// Inverse of [`value_for_power`]; `None` for anything that is not `2 << p`.
pub fn power_for_value(value: u32) -> Option<u8> {
    if value < TILE_BASE_VALUE || !value.is_power_of_two() {
        return None;
    }
    let power = (value.trailing_zeros() - 1) as u8;
    (power <= MAX_TILE_POWER).then_some(power)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hand_built_tiles_must_match_their_power() {
        assert!(Tile::new(MAX_TILE_POWER).is_consistent());
        assert!(Tile::new(3).upgraded().is_consistent());
        let odd = Tile {
            power: 1,
            value: 3,
            upgraded_this_turn: false,
        };
        assert!(!odd.is_consistent());
        let too_big = Tile {
            power: MAX_TILE_POWER + 1,
            value: 0,
            upgraded_this_turn: false,
        };
        assert!(!too_big.is_consistent());
    }

    #[test]
    fn classic_defaults() {
        assert_eq!(DEFAULT_ROWS, 4);
        assert_eq!(DEFAULT_COLS, 4);
        assert_eq!(DEFAULT_MAX_TILE_VALUE, 2048);
        assert_eq!(MAX_CELLS, 64);
    }

    #[test]
    fn power_value_mapping() {
        assert_eq!(value_for_power(0), 2);
        assert_eq!(value_for_power(10), 2048);
        assert_eq!(power_for_value(2), Some(0));
        assert_eq!(power_for_value(2048), Some(10));
        assert_eq!(power_for_value(0), None);
        assert_eq!(power_for_value(1), None);
        assert_eq!(power_for_value(6), None);
    }

    #[test]
    fn tile_upgrade_doubles_value_and_marks_turn() {
        let tile = Tile::new(3);
        assert_eq!(tile.value, 16);
        assert!(!tile.upgraded_this_turn);

        let up = tile.upgraded();
        assert_eq!(up.power, 4);
        assert_eq!(up.value, 32);
        assert!(up.upgraded_this_turn);
    }

    #[test]
    fn direction_deltas_point_toward_edges() {
        assert_eq!(Direction::Up.delta(), (0, -1));
        assert_eq!(Direction::Down.delta(), (0, 1));
        assert_eq!(Direction::Left.delta(), (-1, 0));
        assert_eq!(Direction::Right.delta(), (1, 0));
    }

    #[test]
    fn new_tile_spec_threshold() {
        let spec = NewTileSpec::default();
        assert_eq!(spec.power_for_roll(0.0), 0);
        assert_eq!(spec.power_for_roll(0.5), 0);
        assert_eq!(spec.power_for_roll(0.95), 1);
        assert_eq!(spec.power_for_roll(0.999), 1);
    }
}

/// A numbered tile
///
/// Only the power is authoritative; `value` is cached for display and merge
/// scoring. `upgraded_this_turn` is set on tiles produced by a merge and
/// cleared once the turn resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tile {
    pub power: u8,
    pub value: u32,
    pub upgraded_this_turn: bool,
}

impl Tile {
    /// Create a fresh tile of the given power
    pub const fn new(power: u8) -> Self {
        Self {
            power,
            value: value_for_power(power),
            upgraded_this_turn: false,
        }
    }

    /// Create a tile from a displayed value (2, 4, 8, ...)
    pub fn from_value(value: u32) -> Option<Self> {
        power_for_value(value).map(Self::new)
    }

    /// Power in range and `value` matching it
    pub const fn is_consistent(&self) -> bool {
        self.power <= MAX_TILE_POWER && self.value == value_for_power(self.power)
    }

    /// The tile a merge of two `self`-power tiles produces
    pub const fn upgraded(&self) -> Self {
        Self {
            power: self.power + 1,
            value: self.value * 2,
            upgraded_this_turn: true,
        }
    }
}

/// A cell on the grid
///
/// - `None`: Empty cell
/// - `Some(Tile)`: Cell holding a tile
pub type Cell = Option<Tile>;

/// Grid coordinate, `x` = column, `y` = row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Position {
    pub x: i8,
    pub y: i8,
}

impl Position {
    pub const fn new(x: i8, y: i8) -> Self {
        Self { x, y }
    }

    /// Neighbour one step toward `direction`
    pub const fn step(self, direction: Direction) -> Self {
        let (dx, dy) = direction.delta();
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

/// Swipe/key direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// All four directions in protocol order
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    /// Unit step `(dx, dy)` toward the edge tiles move to
    pub const fn delta(&self) -> (i8, i8) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }

    /// Index into [`Direction::ALL`]
    pub const fn index(&self) -> usize {
        match self {
            Direction::Up => 0,
            Direction::Down => 1,
            Direction::Left => 2,
            Direction::Right => 3,
        }
    }

    /// Parse direction from string (case-insensitive)
    ///
    /// Accepts full names, single letters and the `moveX` protocol form.
    ///
    /// # Examples
    ///
    /// ```
    /// use tui_2048_types::Direction;
    ///
    /// assert_eq!(Direction::from_str("up"), Some(Direction::Up));
    /// assert_eq!(Direction::from_str("D"), Some(Direction::Down));
    /// assert_eq!(Direction::from_str("moveLeft"), Some(Direction::Left));
    /// assert_eq!(Direction::from_str("sideways"), None);
    /// ```
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "up" | "u" | "moveup" => Some(Direction::Up),
            "down" | "d" | "movedown" => Some(Direction::Down),
            "left" | "l" | "moveleft" => Some(Direction::Left),
            "right" | "r" | "moveright" => Some(Direction::Right),
            _ => None,
        }
    }

    /// Convert to lowercase string
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Left => "left",
            Direction::Right => "right",
        }
    }
}

/// Commands accepted by the game loop
///
/// Used by both human input and AI control. `Quit` is routed through the
/// same channel but only the host acts on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameAction {
    /// Slide every tile toward an edge
    Move(Direction),
    /// Abort the session and start a new one
    Reset,
    /// Leave the program (host only)
    Quit,
}

impl GameAction {
    /// Parse action from string (for AI protocol)
    ///
    /// # Examples
    ///
    /// ```
    /// use tui_2048_types::{Direction, GameAction};
    ///
    /// assert_eq!(GameAction::from_str("up"), Some(GameAction::Move(Direction::Up)));
    /// assert_eq!(GameAction::from_str("restart"), Some(GameAction::Reset));
    /// assert_eq!(GameAction::from_str("quit"), Some(GameAction::Quit));
    /// assert_eq!(GameAction::from_str("hardDrop"), None);
    /// ```
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "reset" | "restart" => Some(GameAction::Reset),
            "quit" => Some(GameAction::Quit),
            other => Direction::from_str(other).map(GameAction::Move),
        }
    }

    /// Convert to lowercase string for AI protocol
    pub fn as_str(&self) -> &'static str {
        match self {
            GameAction::Move(direction) => direction.as_str(),
            GameAction::Reset => "reset",
            GameAction::Quit => "quit",
        }
    }
}

/// Game loop states
///
/// The cycle is `Loaded → WaitingForInput ⇄ CheckingMatches`, with
/// `GameOver` terminal until a reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum GameState {
    #[default]
    Loaded,
    WaitingForInput,
    CheckingMatches,
    GameOver,
}

impl GameState {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameState::Loaded => "loaded",
            GameState::WaitingForInput => "waiting_for_input",
            GameState::CheckingMatches => "checking_matches",
            GameState::GameOver => "game_over",
        }
    }
}

/// Spawn value selection
///
/// A roll in `[0, 1)` at or above `1 - high_probability` spawns
/// `high_power`; everything below spawns `low_power`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NewTileSpec {
    pub low_power: u8,
    pub high_power: u8,
    pub high_probability: f64,
}

impl NewTileSpec {
    pub fn power_for_roll(&self, roll: f64) -> u8 {
        if roll >= 1.0 - self.high_probability {
            self.high_power
        } else {
            self.low_power
        }
    }
}

impl Default for NewTileSpec {
    fn default() -> Self {
        Self {
            low_power: 0,
            high_power: 1,
            high_probability: DEFAULT_HIGH_PROBABILITY,
        }
    }
}

/// Notification emitted by the session for renderers, score displays and
/// remote observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameEvent {
    TileSpawned {
        position: Position,
        tile: Tile,
    },
    TileMoved {
        from: Position,
        to: Position,
        tile: Tile,
    },
    /// `from[0]` is the moving tile, `from[1]` the tile it landed on (== `to`).
    TileMerged {
        from: [Position; 2],
        to: Position,
        tile: Tile,
    },
    ScoreChanged {
        score: u32,
    },
    MaxTileReached {
        value: u32,
    },
    GameOver {
        score: u32,
    },
    Reset,
}
