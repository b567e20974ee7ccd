//! Core game logic - pure, deterministic, and testable
//!
//! This crate contains the sliding-tile rules and the game loop around them.
//! It has no dependencies on terminals, networking or other I/O, so the same
//! code drives the terminal host, the AI adapter and headless tests.
//!
//! # Module Structure
//!
//! - [`grid`]: bounds-checked `rows x cols` tile matrix
//! - [`mover`]: slide/merge resolution for one direction
//! - [`terminality`]: "no moves left" detection
//! - [`spawn`]: new tile placement (linear probe from a random cell)
//! - [`session`]: the state machine tying the above together
//! - [`snapshot`]: copyable session view for renderers and the adapter
//! - [`observer`]: callback interface for session events
//! - [`config`]: environment-driven configuration
//!
//! # Game Rules
//!
//! - Every tile slides as far as it can toward the chosen edge
//! - Two tiles of equal power merge into the next power, at most once per
//!   tile per turn; the merge scores twice the absorbed tile's value
//! - Tiles at the configured max value (2048 by default) stop merging
//! - Every turn that changes the grid spawns one tile (2, or 4 with 10%
//!   probability by default)
//! - The game ends when the grid is full and no neighbours share a power
//!
//! # Example
//!
//! ```
//! use tui_2048_core::{GameConfig, Session};
//! use tui_2048_types::{Direction, GameAction, GameState};
//!
//! let mut session = Session::new(GameConfig::default().with_seed(12345)).unwrap();
//! assert_eq!(session.advance().unwrap(), GameState::WaitingForInput);
//! assert_eq!(session.grid().occupied_count(), 2);
//!
//! for direction in Direction::ALL {
//!     session.play(GameAction::Move(direction)).unwrap();
//! }
//! assert!(session.turn() >= 1);
//! ```
//!
//! # Determinism
//!
//! Spawns are the only source of randomness. A session built from a seed
//! replays identically for the same sequence of inputs, across resets.

pub mod config;
pub mod error;
pub mod grid;
pub mod mover;
pub mod observer;
pub mod session;
pub mod snapshot;
pub mod spawn;
pub mod terminality;

pub use tui_2048_types as types;

// Re-export commonly used types for convenience
pub use config::GameConfig;
pub use error::{ConfigError, GridError};
pub use grid::Grid;
pub use mover::{Merge, MoveOutcome, Slide, TileMover};
pub use observer::{dispatch, GameObserver};
pub use session::Session;
pub use snapshot::SessionSnapshot;
pub use spawn::{probe_empty, spawn_tile};
pub use terminality::has_moves;
