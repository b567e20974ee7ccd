//! Session module - the game loop state machine
//!
//! A [`Session`] owns one grid and drives it through
//! `Loaded → WaitingForInput ⇄ CheckingMatches → GameOver`:
//!
//! - `Loaded`: [`Session::tick`] spawns two tiles and waits for input
//! - `WaitingForInput`: a direction that changes the grid moves to
//!   `CheckingMatches`; one that changes nothing is dropped without events
//! - `CheckingMatches`: [`Session::tick`] spawns one tile, then either clears
//!   the upgrade flags and waits for input again, or ends the game
//! - `GameOver`: only a reset leaves it
//!
//! Reset is accepted in every state. Inputs and automatic transitions are
//! separate calls so a host can render between them; [`Session::advance`]
//! runs the automatic ones back to back.
//!
//! Everything observable is queued as [`GameEvent`]s and handed out through
//! [`Session::drain_events`] or [`Session::notify`].

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::GameConfig;
use crate::error::{ConfigError, GridError};
use crate::grid::Grid;
use crate::mover::{MoveOutcome, TileMover};
use crate::observer::{dispatch, GameObserver};
use crate::snapshot::SessionSnapshot;
use crate::spawn::spawn_tile;
use crate::terminality::has_moves;
use crate::types::{Direction, GameAction, GameEvent, GameState};

/// Tiles placed when a session (re)starts
const INITIAL_TILES: usize = 2;

#[derive(Debug, Clone)]
pub struct Session<R = StdRng> {
    config: GameConfig,
    grid: Grid,
    mover: TileMover,
    state: GameState,
    score: u32,
    rng: R,
    /// Seed the RNG was built from (0 when supplied by the caller)
    seed: u64,
    /// Pending notifications, oldest first
    events: Vec<GameEvent>,
    /// Incremented on every reset
    episode_id: u32,
    /// Accepted moves in the current episode
    turn: u32,
    max_tile_reached: bool,
}

impl Session<StdRng> {
    /// Create a session seeded from `config.seed`, or from entropy when unset
    pub fn new(config: GameConfig) -> Result<Self, ConfigError> {
        let seed = config.seed.unwrap_or_else(rand::random::<u64>);
        let mut session = Self::with_rng(config, StdRng::seed_from_u64(seed))?;
        session.seed = seed;
        Ok(session)
    }
}

impl<R: Rng> Session<R> {
    /// Create a session drawing spawns from `rng`
    pub fn with_rng(config: GameConfig, rng: R) -> Result<Self, ConfigError> {
        config.validate()?;
        let grid = Grid::new(config.rows, config.cols).map_err(|_| ConfigError::Dimensions {
            cols: config.cols,
            rows: config.rows,
            min: crate::config::MIN_GRID_DIM,
            max: crate::types::MAX_GRID_DIM,
        })?;

        log::debug!(
            "new session {}x{} max_tile={}",
            config.cols,
            config.rows,
            config.max_tile_value
        );

        Ok(Self {
            mover: TileMover::new(config.max_tile_value),
            seed: config.seed.unwrap_or_default(),
            config,
            grid,
            state: GameState::Loaded,
            score: 0,
            rng,
            events: Vec::with_capacity(32),
            episode_id: 0,
            turn: 0,
            max_tile_reached: false,
        })
    }

    /// Resume play on an existing grid.
    ///
    /// The grid's dimensions replace the configured ones. The session starts
    /// in `WaitingForInput`, or `GameOver` if the grid is already stuck.
    pub fn from_grid(mut config: GameConfig, grid: Grid, rng: R) -> Result<Self, ConfigError> {
        config.rows = grid.rows();
        config.cols = grid.cols();
        let mut session = Self::with_rng(config, rng)?;
        session.max_tile_reached = grid.max_value() >= session.config.max_tile_value;
        session.state = if has_moves(&grid) {
            GameState::WaitingForInput
        } else {
            GameState::GameOver
        };
        session.grid = grid;
        Ok(session)
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn state(&self) -> GameState {
        self.state
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn episode_id(&self) -> u32 {
        self.episode_id
    }

    pub fn turn(&self) -> u32 {
        self.turn
    }

    pub fn game_over(&self) -> bool {
        self.state == GameState::GameOver
    }

    pub fn max_tile_reached(&self) -> bool {
        self.max_tile_reached
    }

    /// Largest tile value on the grid
    pub fn best_tile(&self) -> u32 {
        self.grid.max_value()
    }

    /// Directions that would change the grid right now, indexed like
    /// [`Direction::ALL`]. All false unless the session waits for input.
    pub fn legal_moves(&self) -> [bool; 4] {
        if self.state != GameState::WaitingForInput {
            return [false; 4];
        }
        self.mover.legal_moves(&self.grid)
    }

    /// Run one automatic transition and return the resulting state.
    ///
    /// Does nothing in `WaitingForInput` and `GameOver`. An `Err` means a
    /// spawn found the grid full, which the state machine never allows.
    pub fn tick(&mut self) -> Result<GameState, GridError> {
        match self.state {
            GameState::Loaded => {
                for _ in 0..INITIAL_TILES {
                    self.spawn()?;
                }
                self.state = GameState::WaitingForInput;
                log::debug!("episode {} loaded", self.episode_id);
            }
            GameState::CheckingMatches => {
                self.spawn()?;
                if has_moves(&self.grid) {
                    self.grid.clear_upgrades();
                    self.state = GameState::WaitingForInput;
                } else {
                    self.state = GameState::GameOver;
                    self.events.push(GameEvent::GameOver { score: self.score });
                    log::info!(
                        "game over: episode={} score={} best={} turns={}",
                        self.episode_id,
                        self.score,
                        self.best_tile(),
                        self.turn
                    );
                }
            }
            GameState::WaitingForInput | GameState::GameOver => {}
        }
        Ok(self.state)
    }

    /// Tick until the session waits for input or is over
    pub fn advance(&mut self) -> Result<GameState, GridError> {
        while matches!(self.state, GameState::Loaded | GameState::CheckingMatches) {
            self.tick()?;
        }
        Ok(self.state)
    }

    /// Apply one input. Returns true if it changed the session.
    ///
    /// Directions outside `WaitingForInput` and moves that change nothing
    /// are ignored. `Quit` is left to the host.
    pub fn apply_action(&mut self, action: GameAction) -> bool {
        match action {
            GameAction::Move(direction) => self.try_move(direction),
            GameAction::Reset => {
                self.reset();
                true
            }
            GameAction::Quit => false,
        }
    }

    /// Apply an input and resolve the automatic transitions it triggers
    pub fn play(&mut self, action: GameAction) -> Result<bool, GridError> {
        let applied = self.apply_action(action);
        self.advance()?;
        Ok(applied)
    }

    /// Abort the current episode and return to `Loaded`
    pub fn reset(&mut self) {
        log::info!(
            "reset: episode {} ended with score={} turns={}",
            self.episode_id,
            self.score,
            self.turn
        );
        self.grid.clear();
        self.score = 0;
        self.turn = 0;
        self.max_tile_reached = false;
        self.state = GameState::Loaded;
        self.episode_id = self.episode_id.wrapping_add(1);
        self.events.push(GameEvent::Reset);
    }

    fn try_move(&mut self, direction: Direction) -> bool {
        if self.state != GameState::WaitingForInput {
            return false;
        }

        let outcome = self.mover.shift(&mut self.grid, direction);
        if !outcome.changed() {
            return false;
        }

        self.record_move(&outcome);
        self.turn += 1;
        self.state = GameState::CheckingMatches;
        log::debug!(
            "turn {}: {} slides={} merges={} +{}",
            self.turn,
            direction.as_str(),
            outcome.slides.len(),
            outcome.merges.len(),
            outcome.score_gained
        );
        true
    }

    fn record_move(&mut self, outcome: &MoveOutcome) {
        for slide in &outcome.slides {
            self.events.push(GameEvent::TileMoved {
                from: slide.from,
                to: slide.to,
                tile: slide.tile,
            });
        }
        for merge in &outcome.merges {
            self.events.push(GameEvent::TileMerged {
                from: [merge.from, merge.into],
                to: merge.into,
                tile: merge.tile,
            });
        }

        if outcome.score_gained > 0 {
            self.score = self.score.saturating_add(outcome.score_gained);
            self.events.push(GameEvent::ScoreChanged { score: self.score });
        }

        if !self.max_tile_reached {
            if let Some(best) = outcome.best_merge_value() {
                if best >= self.config.max_tile_value {
                    self.max_tile_reached = true;
                    self.events.push(GameEvent::MaxTileReached { value: best });
                    log::info!("max tile {} reached on turn {}", best, self.turn + 1);
                }
            }
        }
    }

    fn spawn(&mut self) -> Result<(), GridError> {
        let (position, tile) = spawn_tile(&mut self.grid, &self.config.new_tile, &mut self.rng)?;
        log::debug!("spawned {} at ({}, {})", tile.value, position.x, position.y);
        self.events.push(GameEvent::TileSpawned { position, tile });
        Ok(())
    }

    /// Hand out queued events, oldest first
    pub fn drain_events(&mut self) -> std::vec::Drain<'_, GameEvent> {
        self.events.drain(..)
    }

    /// Dispatch and clear queued events
    pub fn notify<O: GameObserver + ?Sized>(&mut self, observer: &mut O) {
        for event in self.events.drain(..) {
            dispatch(&event, observer);
        }
    }

    pub fn pending_events(&self) -> &[GameEvent] {
        &self.events
    }

    pub fn snapshot_into(&self, out: &mut SessionSnapshot) {
        out.clear();
        out.rows = self.grid.rows();
        out.cols = self.grid.cols();
        for (dst, cell) in out.cells.iter_mut().zip(self.grid.cells()) {
            *dst = cell.map_or(0, |t| t.value);
        }
        out.state = self.state;
        out.score = self.score;
        out.best_tile = self.best_tile();
        out.max_tile_value = self.config.max_tile_value;
        out.max_tile_reached = self.max_tile_reached;
        out.episode_id = self.episode_id;
        out.turn = self.turn;
        out.seed = self.seed;
        out.legal_moves = self.legal_moves();
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let mut s = SessionSnapshot::default();
        self.snapshot_into(&mut s);
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Position, Tile};

    fn seeded(seed: u64) -> Session {
        Session::new(GameConfig::default().with_seed(seed)).unwrap()
    }

    fn on_grid(rows: &[&[u32]]) -> Session {
        let grid = Grid::from_values(rows).unwrap();
        Session::from_grid(GameConfig::default(), grid, StdRng::seed_from_u64(3)).unwrap()
    }

    #[test]
    fn test_new_session_starts_loaded() {
        let session = seeded(1);
        assert_eq!(session.state(), GameState::Loaded);
        assert_eq!(session.grid().occupied_count(), 0);
        assert_eq!(session.score(), 0);
        assert_eq!(session.seed(), 1);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = GameConfig::default().with_size(1, 1);
        assert!(matches!(
            Session::new(config),
            Err(ConfigError::Dimensions { .. })
        ));
    }

    #[test]
    fn test_loaded_spawns_two_tiles() {
        let mut session = seeded(2);
        assert_eq!(session.tick().unwrap(), GameState::WaitingForInput);
        assert_eq!(session.grid().occupied_count(), 2);

        let spawned = session
            .drain_events()
            .filter(|e| matches!(e, GameEvent::TileSpawned { .. }))
            .count();
        assert_eq!(spawned, 2);
    }

    #[test]
    fn test_direction_ignored_until_loaded() {
        let mut session = seeded(3);
        assert!(!session.apply_action(GameAction::Move(Direction::Left)));
        assert_eq!(session.state(), GameState::Loaded);
        assert!(session.pending_events().is_empty());
    }

    #[test]
    fn test_merge_turn_flow() {
        let mut session = on_grid(&[&[2, 2], &[0, 0]]);
        assert_eq!(session.state(), GameState::WaitingForInput);

        assert!(session.apply_action(GameAction::Move(Direction::Left)));
        assert_eq!(session.state(), GameState::CheckingMatches);
        assert_eq!(session.score(), 4);
        assert_eq!(session.turn(), 1);
        assert!(session.grid().get(0, 0).unwrap().upgraded_this_turn);

        let events: Vec<GameEvent> = session.drain_events().collect();
        assert_eq!(
            events,
            vec![
                GameEvent::TileMerged {
                    from: [Position::new(1, 0), Position::new(0, 0)],
                    to: Position::new(0, 0),
                    tile: Tile::new(0).upgraded(),
                },
                GameEvent::ScoreChanged { score: 4 },
            ]
        );

        assert_eq!(session.tick().unwrap(), GameState::WaitingForInput);
        assert_eq!(session.grid().occupied_count(), 2);
        assert!(session.grid().tiles().all(|(_, t)| !t.upgraded_this_turn));
    }

    #[test]
    fn test_unchanged_move_has_no_side_effects() {
        let mut session = on_grid(&[&[2, 4], &[0, 0]]);
        let before = session.grid().clone();
        assert!(!session.apply_action(GameAction::Move(Direction::Left)));
        assert_eq!(session.state(), GameState::WaitingForInput);
        assert_eq!(session.grid(), &before);
        assert_eq!(session.turn(), 0);
        assert!(session.pending_events().is_empty());
    }

    #[test]
    fn test_last_spawn_ends_game() {
        // After sliding left only (1, 1) is empty, and no value 2 or 4
        // spawned there can pair with 8 or 16.
        let mut session = on_grid(&[&[4, 8], &[0, 16]]);
        assert!(session.apply_action(GameAction::Move(Direction::Left)));
        assert_eq!(session.tick().unwrap(), GameState::GameOver);
        assert!(session.game_over());
        assert_eq!(session.legal_moves(), [false; 4]);

        let events: Vec<GameEvent> = session.drain_events().collect();
        assert_eq!(events.last(), Some(&GameEvent::GameOver { score: 0 }));

        // Only reset leaves game over.
        assert!(!session.apply_action(GameAction::Move(Direction::Up)));
        assert_eq!(session.tick().unwrap(), GameState::GameOver);
    }

    #[test]
    fn test_stuck_grid_starts_game_over() {
        let session = on_grid(&[&[2, 4], &[4, 2]]);
        assert_eq!(session.state(), GameState::GameOver);
    }

    #[test]
    fn test_reset_from_any_state() {
        let mut session = on_grid(&[&[2, 4], &[4, 2]]);
        assert!(session.apply_action(GameAction::Reset));
        assert_eq!(session.state(), GameState::Loaded);
        assert_eq!(session.episode_id(), 1);
        assert_eq!(session.grid().occupied_count(), 0);
        assert_eq!(session.drain_events().last(), Some(GameEvent::Reset));

        session.advance().unwrap();
        assert_eq!(session.state(), GameState::WaitingForInput);
        assert_eq!(session.grid().occupied_count(), 2);
    }

    #[test]
    fn test_quit_is_ignored() {
        let mut session = seeded(4);
        session.advance().unwrap();
        let before = session.snapshot();
        assert!(!session.apply_action(GameAction::Quit));
        assert_eq!(session.snapshot(), before);
    }

    #[test]
    fn test_max_tile_reached_once() {
        let config = GameConfig {
            max_tile_value: 8,
            ..GameConfig::default()
        };
        let grid = Grid::from_values(&[&[4, 4, 0, 0], &[4, 4, 0, 0], &[0; 4], &[0; 4]]).unwrap();
        let mut session = Session::from_grid(config, grid, StdRng::seed_from_u64(5)).unwrap();

        assert!(session.apply_action(GameAction::Move(Direction::Left)));
        assert!(session.max_tile_reached());
        let reached = session
            .drain_events()
            .filter(|e| matches!(e, GameEvent::MaxTileReached { .. }))
            .count();
        assert_eq!(reached, 1);
    }

    #[test]
    fn test_same_seed_same_game() {
        let moves = [
            Direction::Left,
            Direction::Up,
            Direction::Right,
            Direction::Down,
        ];
        let run = |seed: u64| {
            let mut session = seeded(seed);
            session.advance().unwrap();
            for _ in 0..25 {
                for d in moves {
                    session.play(GameAction::Move(d)).unwrap();
                }
            }
            session.snapshot()
        };
        assert_eq!(run(99), run(99));
    }

    #[test]
    fn test_snapshot_reflects_grid() {
        let session = on_grid(&[&[2, 0], &[0, 4]]);
        let snap = session.snapshot();
        assert_eq!(snap.rows, 2);
        assert_eq!(snap.cols, 2);
        assert_eq!(snap.value_at(0, 0), 2);
        assert_eq!(snap.value_at(1, 1), 4);
        assert_eq!(snap.value_at(5, 5), 0);
        assert_eq!(snap.best_tile, 4);
        assert!(snap.playable());
        assert!(snap.is_legal(Direction::Right));
    }
}
