//! Session configuration.
//!
//! Values come from environment variables with defaults for anything missing
//! or unparsable:
//!
//! - `TUI_2048_ROWS` / `TUI_2048_COLS`: grid size (default 4x4)
//! - `TUI_2048_MAX_TILE`: value at which tiles stop merging (default 2048)
//! - `TUI_2048_HIGH_PROBABILITY`: chance of spawning the high tile (default 0.1)
//! - `TUI_2048_SEED`: RNG seed (random when unset)

use crate::error::ConfigError;
use crate::types::{
    power_for_value, NewTileSpec, DEFAULT_COLS, DEFAULT_MAX_TILE_VALUE, DEFAULT_ROWS,
    MAX_GRID_DIM, MAX_TILE_POWER,
};

/// Smallest playable side length.
pub const MIN_GRID_DIM: u8 = 2;

#[derive(Debug, Clone, PartialEq)]
pub struct GameConfig {
    pub rows: u8,
    pub cols: u8,
    pub new_tile: NewTileSpec,
    pub max_tile_value: u32,
    pub seed: Option<u64>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            rows: DEFAULT_ROWS,
            cols: DEFAULT_COLS,
            new_tile: NewTileSpec::default(),
            max_tile_value: DEFAULT_MAX_TILE_VALUE,
            seed: None,
        }
    }
}

impl GameConfig {
    /// Create from environment variables
    pub fn from_env() -> Self {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Build from a variable lookup; missing or unparsable values keep the
    /// defaults.
    fn from_vars<F: Fn(&str) -> Option<String>>(lookup: F) -> Self {
        let parsed = |name: &str| lookup(name).map(|s| s.trim().to_string());

        let defaults = Self::default();
        let mut new_tile = defaults.new_tile;
        if let Some(p) = parsed("TUI_2048_HIGH_PROBABILITY").and_then(|s| s.parse().ok()) {
            new_tile.high_probability = p;
        }

        Self {
            rows: parsed("TUI_2048_ROWS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.rows),
            cols: parsed("TUI_2048_COLS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.cols),
            new_tile,
            max_tile_value: parsed("TUI_2048_MAX_TILE")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_tile_value),
            seed: parsed("TUI_2048_SEED").and_then(|s| s.parse().ok()),
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_size(mut self, rows: u8, cols: u8) -> Self {
        self.rows = rows;
        self.cols = cols;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let dims_ok = (MIN_GRID_DIM..=MAX_GRID_DIM).contains(&self.rows)
            && (MIN_GRID_DIM..=MAX_GRID_DIM).contains(&self.cols);
        if !dims_ok {
            return Err(ConfigError::Dimensions {
                cols: self.cols,
                rows: self.rows,
                min: MIN_GRID_DIM,
                max: MAX_GRID_DIM,
            });
        }

        // A max tile of 2 would forbid every merge.
        match power_for_value(self.max_tile_value) {
            Some(p) if p >= 1 => {}
            _ => return Err(ConfigError::MaxTileValue(self.max_tile_value)),
        }

        let p = self.new_tile.high_probability;
        if !(0.0..=1.0).contains(&p) {
            return Err(ConfigError::HighProbability(p));
        }

        for power in [self.new_tile.low_power, self.new_tile.high_power] {
            if power >= MAX_TILE_POWER {
                return Err(ConfigError::SpawnPower(power));
            }
        }

        Ok(())
    }

    /// Number of cells in the configured grid
    pub fn capacity(&self) -> usize {
        self.rows as usize * self.cols as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = GameConfig::default();
        assert_eq!(config.rows, 4);
        assert_eq!(config.cols, 4);
        assert_eq!(config.capacity(), 16);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_out_of_range_dimensions() {
        let config = GameConfig::default().with_size(1, 4);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Dimensions { rows: 1, cols: 4, .. })
        ));

        let config = GameConfig::default().with_size(4, MAX_GRID_DIM + 1);
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_bad_max_tile() {
        let mut config = GameConfig::default();
        config.max_tile_value = 1000;
        assert_eq!(config.validate(), Err(ConfigError::MaxTileValue(1000)));

        config.max_tile_value = 2;
        assert_eq!(config.validate(), Err(ConfigError::MaxTileValue(2)));
    }

    #[test]
    fn rejects_probability_outside_unit_interval() {
        let mut config = GameConfig::default();
        config.new_tile.high_probability = 1.5;
        assert_eq!(config.validate(), Err(ConfigError::HighProbability(1.5)));
    }

    #[test]
    fn from_vars_reads_values_and_falls_back_on_garbage() {
        let vars = |name: &str| {
            match name {
                "TUI_2048_ROWS" => Some(" 5 "),
                "TUI_2048_COLS" => Some("wide"),
                "TUI_2048_MAX_TILE" => Some("-3"),
                "TUI_2048_HIGH_PROBABILITY" => Some("0.25"),
                "TUI_2048_SEED" => Some("42"),
                _ => None,
            }
            .map(str::to_string)
        };
        let config = GameConfig::from_vars(vars);
        assert_eq!(config.rows, 5);
        assert_eq!(config.cols, DEFAULT_COLS);
        assert_eq!(config.max_tile_value, DEFAULT_MAX_TILE_VALUE);
        assert_eq!(config.new_tile.high_probability, 0.25);
        assert_eq!(config.seed, Some(42));
    }

    #[test]
    fn from_vars_without_variables_is_default() {
        assert_eq!(GameConfig::from_vars(|_| None), GameConfig::default());
    }
}
