//! Callback-style access to [`GameEvent`]s.
//!
//! Hosts that prefer callbacks over matching on drained events implement
//! [`GameObserver`] and hand it to [`Session::notify`](crate::Session::notify).
//! Every method has an empty default so observers only override what they
//! care about.

use crate::types::{GameEvent, Position, Tile};

pub trait GameObserver {
    fn on_tile_spawned(&mut self, _position: Position, _tile: Tile) {}

    fn on_tile_moved(&mut self, _from: Position, _to: Position, _tile: Tile) {}

    /// `from[0]` moved onto `from[1]`, which is also `to`
    fn on_tile_merged(&mut self, _from: [Position; 2], _to: Position, _tile: Tile) {}

    fn on_score_changed(&mut self, _score: u32) {}

    fn on_max_tile_reached(&mut self, _value: u32) {}

    fn on_game_over(&mut self, _score: u32) {}

    fn on_reset(&mut self) {}
}

/// Route one event to the matching observer callback
pub fn dispatch<O: GameObserver + ?Sized>(event: &GameEvent, observer: &mut O) {
    match *event {
        GameEvent::TileSpawned { position, tile } => observer.on_tile_spawned(position, tile),
        GameEvent::TileMoved { from, to, tile } => observer.on_tile_moved(from, to, tile),
        GameEvent::TileMerged { from, to, tile } => observer.on_tile_merged(from, to, tile),
        GameEvent::ScoreChanged { score } => observer.on_score_changed(score),
        GameEvent::MaxTileReached { value } => observer.on_max_tile_reached(value),
        GameEvent::GameOver { score } => observer.on_game_over(score),
        GameEvent::Reset => observer.on_reset(),
    }
}
