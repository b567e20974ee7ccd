//! Mouse-drag swipes.
//!
//! A left-button press followed by a release is a swipe when the drag is at
//! least `min_distance` long. The normalised drag picks the direction: within
//! 30 degrees of vertical is Up/Down, within 30 degrees of horizontal is
//! Left/Right, anything in between is ignored.
//!
//! Terminal rows grow downward, so the row delta is negated before the
//! direction test. Terminal cells are about twice as tall as wide; the
//! column delta is scaled by [`CELL_ASPECT`] so a drag that looks diagonal
//! on screen is treated as diagonal.

use crate::types::{Direction, DEFAULT_MIN_SWIPE_DISTANCE};
use crossterm::event::{MouseButton, MouseEvent, MouseEventKind};

/// Width / height of one terminal cell
pub const CELL_ASPECT: f32 = 0.5;

/// Direction of a drag in screen space with `dy` pointing up.
///
/// Returns `None` for drags shorter than `min_distance` and for diagonals.
pub fn swipe_direction(dx: f32, dy: f32, min_distance: f32) -> Option<Direction> {
    let length = (dx * dx + dy * dy).sqrt();
    if length < min_distance || length == 0.0 {
        return None;
    }
    let (x, y) = (dx / length, dy / length);

    if y > 0.0 && x > -0.5 && x < 0.5 {
        Some(Direction::Up)
    } else if y < 0.0 && x > -0.5 && x < 0.5 {
        Some(Direction::Down)
    } else if x > 0.0 && y > -0.5 && y < 0.5 {
        Some(Direction::Right)
    } else if x < 0.0 && y > -0.5 && y < 0.5 {
        Some(Direction::Left)
    } else {
        None
    }
}

/// Turns crossterm mouse events into swipe directions.
#[derive(Debug, Clone)]
pub struct SwipeTracker {
    start: Option<(u16, u16)>,
    min_distance: f32,
}

impl Default for SwipeTracker {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_SWIPE_DISTANCE)
    }
}

impl SwipeTracker {
    pub fn new(min_distance: f32) -> Self {
        Self {
            start: None,
            min_distance,
        }
    }

    /// Feed one mouse event; returns a direction when it completes a swipe
    pub fn handle_mouse_event(&mut self, event: MouseEvent) -> Option<Direction> {
        match event.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                self.start = Some((event.column, event.row));
                None
            }
            MouseEventKind::Up(MouseButton::Left) => {
                let (col, row) = self.start.take()?;
                let dx = (event.column as f32 - col as f32) * CELL_ASPECT;
                let dy = row as f32 - event.row as f32;
                swipe_direction(dx, dy, self.min_distance)
            }
            _ => None,
        }
    }

    /// Forget a press that has not been released yet
    pub fn cancel(&mut self) {
        self.start = None;
    }

    pub fn is_tracking(&self) -> bool {
        self.start.is_some()
    }
}
