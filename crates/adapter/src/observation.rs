//! Session snapshot -> observation message.

use std::hash::{Hash, Hasher};

use arrayvec::ArrayVec;

use crate::core::SessionSnapshot;
use crate::protocol::{
    current_timestamp_ms, ActionName, BoardSnapshot, EventRecord, ObservationMessage,
    ObservationType, StateHash,
};
use crate::types::{Direction, GameEvent, Position, MAX_GRID_DIM};

const GRID: usize = MAX_GRID_DIM as usize;

/// Stable 64-bit FNV-1a hasher for `state_hash`.
///
/// `DefaultHasher` output is not guaranteed stable across Rust versions.
#[derive(Debug, Clone)]
struct Fnv1aHasher {
    state: u64,
}

impl Fnv1aHasher {
    const OFFSET_BASIS: u64 = 0xcbf29ce484222325;
    const PRIME: u64 = 0x100000001b3;

    fn new() -> Self {
        Self {
            state: Self::OFFSET_BASIS,
        }
    }
}

impl Hasher for Fnv1aHasher {
    fn finish(&self) -> u64 {
        self.state
    }

    fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.state ^= b as u64;
            self.state = self.state.wrapping_mul(Self::PRIME);
        }
    }
}

fn xy(p: Position) -> [i8; 2] {
    [p.x, p.y]
}

impl From<&GameEvent> for EventRecord {
    fn from(event: &GameEvent) -> Self {
        match *event {
            GameEvent::TileSpawned { position, tile } => EventRecord::Spawned {
                at: xy(position),
                value: tile.value,
            },
            GameEvent::TileMoved { from, to, tile } => EventRecord::Moved {
                from: xy(from),
                to: xy(to),
                value: tile.value,
            },
            GameEvent::TileMerged { from, to, tile } => EventRecord::Merged {
                from: xy(from[0]),
                into: xy(to),
                value: tile.value,
            },
            GameEvent::ScoreChanged { score } => EventRecord::Score { score },
            GameEvent::MaxTileReached { value } => EventRecord::MaxTile { value },
            GameEvent::GameOver { score } => EventRecord::GameOver { score },
            GameEvent::Reset => EventRecord::Reset,
        }
    }
}

/// Hash of everything a client can act on; the sequence number and
/// timestamp are left out so identical states hash identically.
pub fn state_hash(snap: &SessionSnapshot) -> StateHash {
    let mut hasher = Fnv1aHasher::new();
    snap.hash(&mut hasher);
    StateHash(hasher.finish())
}

/// Build an observation from a snapshot and the events that led to it.
pub fn build_observation(
    seq: u64,
    snap: &SessionSnapshot,
    events: &[GameEvent],
) -> ObservationMessage {
    let cells: ArrayVec<ArrayVec<u32, GRID>, GRID> = snap
        .rows_iter()
        .map(|row| row.iter().copied().collect::<ArrayVec<u32, GRID>>())
        .collect();

    let legal_moves: ArrayVec<ActionName, 4> = Direction::ALL
        .into_iter()
        .filter(|d| snap.is_legal(*d))
        .map(ActionName::from)
        .collect();

    ObservationMessage {
        msg_type: ObservationType::Observation,
        seq,
        ts: current_timestamp_ms(),
        state: snap.state.into(),
        playable: snap.playable(),
        game_over: snap.game_over(),
        episode_id: snap.episode_id,
        turn: snap.turn,
        seed: snap.seed,
        board: BoardSnapshot {
            rows: snap.rows,
            cols: snap.cols,
            cells,
        },
        score: snap.score,
        best_tile: snap.best_tile,
        max_tile_value: snap.max_tile_value,
        max_tile_reached: snap.max_tile_reached,
        legal_moves,
        state_hash: state_hash(snap),
        events: events.iter().map(EventRecord::from).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{GameConfig, Grid, Session};
    use crate::types::{GameAction, Tile};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn session(values: &[&[u32]]) -> Session {
        let grid = Grid::from_values(values).unwrap();
        let config = GameConfig::default().with_size(grid.rows(), grid.cols());
        Session::from_grid(config, grid, StdRng::seed_from_u64(3)).unwrap()
    }

    #[test]
    fn board_rows_follow_the_grid() {
        let s = session(&[&[2, 0, 0], &[0, 4, 0], &[0, 0, 8]]);
        let obs = build_observation(1, &s.snapshot(), &[]);
        assert_eq!(obs.board.rows, 3);
        assert_eq!(obs.board.cols, 3);
        assert_eq!(obs.board.cells[1].as_slice(), &[0, 4, 0]);
        assert_eq!(obs.board.cells[2][2], 8);
        assert!(obs.playable);
        assert!(!obs.game_over);
        assert!(obs.events.is_empty());
    }

    #[test]
    fn legal_moves_list_only_changing_directions() {
        // Left column filled with distinct values: only Right changes anything.
        let s = session(&[&[2, 0], &[4, 0]]);
        let obs = build_observation(1, &s.snapshot(), &[]);
        assert_eq!(obs.legal_moves.as_slice(), &[ActionName::Right]);
    }

    #[test]
    fn state_hash_ignores_seq_but_tracks_state() {
        let mut s = session(&[&[2, 2], &[0, 0]]);
        let before = s.snapshot();
        assert_eq!(
            build_observation(1, &before, &[]).state_hash,
            build_observation(99, &before, &[]).state_hash
        );

        s.play(GameAction::Move(Direction::Left)).unwrap();
        assert_ne!(state_hash(&before), state_hash(&s.snapshot()));
    }

    #[test]
    fn events_are_mapped_in_order() {
        let events = [
            GameEvent::TileMerged {
                from: [Position::new(1, 0), Position::new(0, 0)],
                to: Position::new(0, 0),
                tile: Tile::new(1).upgraded(),
            },
            GameEvent::ScoreChanged { score: 4 },
            GameEvent::TileSpawned {
                position: Position::new(1, 1),
                tile: Tile::new(0),
            },
        ];
        let obs = build_observation(5, &SessionSnapshot::default(), &events);
        assert_eq!(
            obs.events,
            vec![
                EventRecord::Merged {
                    from: [1, 0],
                    into: [0, 0],
                    value: 4
                },
                EventRecord::Score { score: 4 },
                EventRecord::Spawned {
                    at: [1, 1],
                    value: 2
                },
            ]
        );

        let v = serde_json::to_value(&obs).unwrap();
        assert_eq!(v["type"], "observation");
        assert_eq!(v["events"][0]["kind"], "merged");
        assert_eq!(v["state"], "loaded");
    }
}
