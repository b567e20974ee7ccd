//! Grid module - the tile matrix
//!
//! A `rows x cols` matrix where each cell is empty or holds one tile.
//! Cells live in a fixed-capacity flat array (row-major, `y * cols + x`), so
//! cloning a grid for dry runs never touches the heap.
//!
//! Coordinates: `(x, y)` with `x` in `0..cols` (left to right) and `y` in
//! `0..rows` (top to bottom). Lookups outside the grid answer "nothing here"
//! instead of failing, which lets the mover treat the edge as an obstacle.

use arrayvec::ArrayVec;

use crate::error::GridError;
use crate::types::{Cell, Position, Tile, MAX_CELLS, MAX_GRID_DIM};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    rows: u8,
    cols: u8,
    /// Flat array of cells, row-major order (y * cols + x)
    cells: ArrayVec<Cell, MAX_CELLS>,
}

impl Grid {
    /// Create an empty grid
    pub fn new(rows: u8, cols: u8) -> Result<Self, GridError> {
        Self::check_dimensions(rows as usize, cols as usize)?;
        let len = rows as usize * cols as usize;
        Ok(Self {
            rows,
            cols,
            cells: (0..len).map(|_| None).collect(),
        })
    }

    fn check_dimensions(rows: usize, cols: usize) -> Result<(), GridError> {
        let max = MAX_GRID_DIM as usize;
        if rows == 0 || cols == 0 || rows > max || cols > max {
            return Err(GridError::InvalidDimensions {
                cols,
                rows,
                max: MAX_GRID_DIM,
            });
        }
        Ok(())
    }

    /// Build a grid from displayed values, `0` meaning empty.
    ///
    /// Every row must have the same length and every non-zero value must be
    /// a tile value (2, 4, 8, ...).
    ///
    /// ```
    /// use tui_2048_core::Grid;
    ///
    /// let grid = Grid::from_values(&[&[2, 2], &[0, 4]]).unwrap();
    /// assert_eq!(grid.occupied_count(), 3);
    /// assert_eq!(grid.get(1, 1).map(|t| t.value), Some(4));
    /// assert!(grid.get(0, 1).is_none());
    /// ```
    pub fn from_values(rows: &[&[u32]]) -> Result<Self, GridError> {
        let height = rows.len();
        let width = rows.first().map(|r| r.len()).unwrap_or(0);
        Self::check_dimensions(height, width)?;
        if rows.iter().any(|r| r.len() != width) {
            return Err(GridError::InvalidDimensions {
                cols: width,
                rows: height,
                max: MAX_GRID_DIM,
            });
        }

        let mut grid = Self::new(height as u8, width as u8)?;
        for (y, row) in rows.iter().enumerate() {
            for (x, &value) in row.iter().enumerate() {
                if value == 0 {
                    continue;
                }
                let tile = Tile::from_value(value).ok_or(GridError::InvalidTile(value))?;
                grid.set(x as i8, y as i8, Some(tile))?;
            }
        }
        Ok(grid)
    }

    /// Displayed values, row by row, `0` for empty cells
    pub fn to_values(&self) -> Vec<Vec<u32>> {
        let width = self.cols as usize;
        self.cells
            .chunks(width)
            .map(|row| row.iter().map(|c| c.map_or(0, |t| t.value)).collect())
            .collect()
    }

    /// Calculate flat index from (x, y) coordinates
    #[inline(always)]
    fn index(&self, x: i8, y: i8) -> Option<usize> {
        if self.is_out_of_bounds(x, y) {
            return None;
        }
        Some((y as usize) * (self.cols as usize) + (x as usize))
    }

    pub fn rows(&self) -> u8 {
        self.rows
    }

    pub fn cols(&self) -> u8 {
        self.cols
    }

    /// Total number of cells
    pub fn capacity(&self) -> usize {
        self.cells.len()
    }

    /// Tile at `(x, y)`; `None` for empty cells and out-of-bounds coordinates
    pub fn get(&self, x: i8, y: i8) -> Option<Tile> {
        self.cell(x, y).flatten()
    }

    /// Cell at `(x, y)`; `None` only when out of bounds
    pub fn cell(&self, x: i8, y: i8) -> Option<Cell> {
        self.index(x, y).map(|idx| self.cells[idx])
    }

    pub fn at(&self, pos: Position) -> Option<Cell> {
        self.cell(pos.x, pos.y)
    }

    /// Replace the cell at `(x, y)`.
    ///
    /// Tiles whose cached value does not match their power are rejected.
    pub fn set(&mut self, x: i8, y: i8, cell: Cell) -> Result<(), GridError> {
        if let Some(tile) = cell.filter(|t| !t.is_consistent()) {
            return Err(GridError::InvalidTile(tile.value));
        }
        match self.index(x, y) {
            Some(idx) => {
                self.cells[idx] = cell;
                Ok(())
            }
            None => Err(GridError::InvalidCoordinate {
                x,
                y,
                cols: self.cols,
                rows: self.rows,
            }),
        }
    }

    /// Swap a cell by position, returning the previous content.
    ///
    /// Callers inside the crate only pass positions produced by iterating
    /// this grid.
    pub(crate) fn replace(&mut self, pos: Position, cell: Cell) -> Cell {
        let idx = (pos.y as usize) * (self.cols as usize) + (pos.x as usize);
        std::mem::replace(&mut self.cells[idx], cell)
    }

    /// Check if position is within bounds and empty
    pub fn is_empty_at(&self, x: i8, y: i8) -> bool {
        matches!(self.cell(x, y), Some(None))
    }

    /// Check if position is within bounds and occupied
    pub fn is_occupied(&self, x: i8, y: i8) -> bool {
        matches!(self.cell(x, y), Some(Some(_)))
    }

    pub fn is_out_of_bounds(&self, x: i8, y: i8) -> bool {
        x < 0 || x >= self.cols as i8 || y < 0 || y >= self.rows as i8
    }

    pub fn occupied_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }

    pub fn is_full(&self) -> bool {
        self.cells.iter().all(|c| c.is_some())
    }

    /// Position of the flat row-major index `idx`
    pub fn position_of(&self, idx: usize) -> Position {
        let cols = self.cols as usize;
        Position::new((idx % cols) as i8, (idx / cols) as i8)
    }

    /// Occupied cells in row-major order
    pub fn tiles(&self) -> impl Iterator<Item = (Position, Tile)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter_map(|(idx, cell)| cell.map(|tile| (self.position_of(idx), tile)))
    }

    /// Largest value on the grid (0 when empty)
    pub fn max_value(&self) -> u32 {
        self.tiles().map(|(_, t)| t.value).max().unwrap_or(0)
    }

    /// Sum of all tile values
    pub fn value_sum(&self) -> u64 {
        self.tiles().map(|(_, t)| t.value as u64).sum()
    }

    /// Forget which tiles were produced by a merge this turn
    pub fn clear_upgrades(&mut self) {
        for tile in self.cells.iter_mut().flatten() {
            tile.upgraded_this_turn = false;
        }
    }

    /// Remove every tile
    pub fn clear(&mut self) {
        for cell in &mut self.cells {
            *cell = None;
        }
    }

    /// Get a reference to the internal cells array
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }
}
