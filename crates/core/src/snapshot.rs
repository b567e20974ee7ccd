use crate::types::{Direction, GameState, MAX_CELLS};

/// Copyable, allocation-free view of a session for renderers and observers.
///
/// `cells` is row-major over `cols`; only the first `rows * cols` entries are
/// meaningful, `0` marks an empty cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionSnapshot {
    pub rows: u8,
    pub cols: u8,
    pub cells: [u32; MAX_CELLS],
    pub state: GameState,
    pub score: u32,
    pub best_tile: u32,
    pub max_tile_value: u32,
    pub max_tile_reached: bool,
    pub episode_id: u32,
    pub turn: u32,
    pub seed: u64,
    /// Indexed like [`Direction::ALL`]
    pub legal_moves: [bool; 4],
}

impl SessionSnapshot {
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Value at `(x, y)`, `0` for empty or out-of-range cells
    pub fn value_at(&self, x: usize, y: usize) -> u32 {
        if x >= self.cols as usize || y >= self.rows as usize {
            return 0;
        }
        self.cells[y * self.cols as usize + x]
    }

    /// Cell values row by row
    pub fn rows_iter(&self) -> impl Iterator<Item = &[u32]> + '_ {
        let len = self.rows as usize * self.cols as usize;
        self.cells[..len].chunks(self.cols.max(1) as usize)
    }

    pub fn is_legal(&self, direction: Direction) -> bool {
        self.legal_moves[direction.index()]
    }

    pub fn playable(&self) -> bool {
        self.state == GameState::WaitingForInput
    }

    pub fn game_over(&self) -> bool {
        self.state == GameState::GameOver
    }
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self {
            rows: 0,
            cols: 0,
            cells: [0; MAX_CELLS],
            state: GameState::Loaded,
            score: 0,
            best_tile: 0,
            max_tile_value: 0,
            max_tile_reached: false,
            episode_id: 0,
            turn: 0,
            seed: 0,
            legal_moves: [false; 4],
        }
    }
}
