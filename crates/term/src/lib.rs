//! Terminal "game renderer" module.
//!
//! A small, game-oriented rendering layer: the view draws a session snapshot
//! into a plain framebuffer, and the renderer flushes only what changed to
//! the terminal. No widget toolkit is involved.
//!
//! - [`fb`]: glyph framebuffer and styles
//! - [`game_view`]: snapshot → framebuffer layout
//! - [`effects`]: spawn/merge highlights driven by session events
//! - [`renderer`]: crossterm output with per-row diffing

pub mod effects;
pub mod fb;
pub mod game_view;
pub mod renderer;

pub use tui_2048_core as core;
pub use tui_2048_types as types;

pub use effects::{Flash, FlashKind, TileEffects};
pub use fb::{FrameBuffer, Glyph, Rgb, Style};
pub use game_view::{tile_colors, AdapterStatusView, GameView, Viewport};
pub use renderer::{encode_diff_into, encode_full_into, TerminalRenderer};
