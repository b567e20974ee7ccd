//! Error types for grid access, spawning and configuration.

use thiserror::Error;

/// Failures of grid construction, access and tile placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GridError {
    /// Spawn attempted with no empty cell left.
    #[error("unable to create new tile: grid is already full")]
    GridFull,

    #[error("coordinate ({x}, {y}) is outside the {cols}x{rows} grid")]
    InvalidCoordinate { x: i8, y: i8, cols: u8, rows: u8 },

    #[error("grid dimensions {cols}x{rows} are not supported (1..={max} per side)")]
    InvalidDimensions { cols: usize, rows: usize, max: u8 },

    #[error("tile value {0} is not a power of two >= 2 matching its power")]
    InvalidTile(u32),
}

/// Rejected [`GameConfig`](crate::config::GameConfig) values.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("grid must be between {min}x{min} and {max}x{max}, got {cols}x{rows}")]
    Dimensions { cols: u8, rows: u8, min: u8, max: u8 },

    #[error("max tile value {0} must be a power of two >= 4")]
    MaxTileValue(u32),

    #[error("high tile probability {0} must be within [0, 1]")]
    HighProbability(f64),

    #[error("spawn power {0} is not representable")]
    SpawnPower(u8),
}
