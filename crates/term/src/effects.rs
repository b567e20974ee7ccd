//! Short-lived highlights for spawned and merged tiles.
//!
//! The session resolves a turn instantly; [`TileEffects`] listens to its
//! events and keeps a countdown per cell so the view can flash the tiles a
//! turn touched. Nothing here feeds back into game state.

use crate::core::GameObserver;
use crate::types::{Position, Tile, MAX_GRID_DIM, TILE_FLASH_MS};

const STRIDE: usize = MAX_GRID_DIM as usize;
const BANNER_MS: u32 = 2_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashKind {
    Spawn,
    Merge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Flash {
    pub kind: FlashKind,
    pub remaining_ms: u32,
}

impl Flash {
    /// Highlight strength in `0..=255`, fading linearly
    pub fn intensity(&self) -> u8 {
        let ms = self.remaining_ms.min(TILE_FLASH_MS);
        (ms * 255 / TILE_FLASH_MS.max(1)) as u8
    }
}

#[derive(Debug, Clone)]
pub struct TileEffects {
    flashes: [Option<Flash>; STRIDE * STRIDE],
    banner: Option<(u32, u32)>,
    flash_ms: u32,
}

impl Default for TileEffects {
    fn default() -> Self {
        Self::new()
    }
}

impl TileEffects {
    pub fn new() -> Self {
        Self {
            flashes: [None; STRIDE * STRIDE],
            banner: None,
            flash_ms: TILE_FLASH_MS,
        }
    }

    fn slot(pos: Position) -> Option<usize> {
        let (x, y) = (pos.x as usize, pos.y as usize);
        (pos.x >= 0 && pos.y >= 0 && x < STRIDE && y < STRIDE).then_some(y * STRIDE + x)
    }

    fn start(&mut self, pos: Position, kind: FlashKind) {
        if let Some(i) = Self::slot(pos) {
            self.flashes[i] = Some(Flash {
                kind,
                remaining_ms: self.flash_ms,
            });
        }
    }

    /// Advance all timers by `elapsed_ms`
    pub fn tick(&mut self, elapsed_ms: u32) {
        for slot in &mut self.flashes {
            *slot = slot.and_then(|mut flash| {
                flash.remaining_ms = flash.remaining_ms.saturating_sub(elapsed_ms);
                (flash.remaining_ms > 0).then_some(flash)
            });
        }
        if let Some((value, ms)) = self.banner {
            let ms = ms.saturating_sub(elapsed_ms);
            self.banner = (ms > 0).then_some((value, ms));
        }
    }

    pub fn flash_at(&self, x: u8, y: u8) -> Option<Flash> {
        Self::slot(Position::new(x as i8, y as i8)).and_then(|i| self.flashes[i])
    }

    /// Value of a max tile reached within the last couple of seconds
    pub fn banner(&self) -> Option<u32> {
        self.banner.map(|(value, _)| value)
    }

    pub fn is_idle(&self) -> bool {
        self.banner.is_none() && self.flashes.iter().all(Option::is_none)
    }

    pub fn clear(&mut self) {
        self.flashes = [None; STRIDE * STRIDE];
        self.banner = None;
    }
}

impl GameObserver for TileEffects {
    fn on_tile_spawned(&mut self, position: Position, _tile: Tile) {
        self.start(position, FlashKind::Spawn);
    }

    fn on_tile_merged(&mut self, _from: [Position; 2], to: Position, _tile: Tile) {
        self.start(to, FlashKind::Merge);
    }

    fn on_max_tile_reached(&mut self, value: u32) {
        self.banner = Some((value, BANNER_MS));
    }

    fn on_reset(&mut self) {
        self.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::dispatch;
    use crate::types::GameEvent;

    #[test]
    fn flashes_fade_out() {
        let mut fx = TileEffects::new();
        fx.on_tile_spawned(Position::new(1, 2), Tile::new(0));
        let flash = fx.flash_at(1, 2).unwrap();
        assert_eq!(flash.kind, FlashKind::Spawn);
        assert_eq!(flash.intensity(), 255);

        fx.tick(TILE_FLASH_MS / 2);
        assert!(fx.flash_at(1, 2).unwrap().intensity() < 255);

        fx.tick(TILE_FLASH_MS);
        assert_eq!(fx.flash_at(1, 2), None);
        assert!(fx.is_idle());
    }

    #[test]
    fn merge_flashes_destination() {
        let mut fx = TileEffects::new();
        dispatch(
            &GameEvent::TileMerged {
                from: [Position::new(3, 0), Position::new(0, 0)],
                to: Position::new(0, 0),
                tile: Tile::new(1),
            },
            &mut fx,
        );
        assert_eq!(fx.flash_at(0, 0).map(|f| f.kind), Some(FlashKind::Merge));
        assert_eq!(fx.flash_at(3, 0), None);
    }

    #[test]
    fn reset_clears_everything() {
        let mut fx = TileEffects::new();
        fx.on_tile_spawned(Position::new(0, 0), Tile::new(0));
        fx.on_max_tile_reached(2048);
        assert_eq!(fx.banner(), Some(2048));

        fx.on_reset();
        assert!(fx.is_idle());
    }
}
