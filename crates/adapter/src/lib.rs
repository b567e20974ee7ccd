//! Adapter - remote control over a TCP socket with a JSON line protocol
//!
//! Lets external agents (AI players, test harnesses) drive the game. The
//! server runs on its own tokio runtime; the game loop only polls channels
//! (see [`runtime::Adapter`]).
//!
//! # Protocol Overview
//!
//! 1. **Connection**: client connects (default `127.0.0.1:7778`)
//! 2. **Handshake**: client sends `hello`, server answers `welcome`
//! 3. **Controller**: the first client to say hello controls the game; when it
//!    disconnects the lowest remaining client id takes over
//! 4. **Commanding**: the controller sends `command` with a list of actions;
//!    the game applies them and answers `ack`
//! 5. **Observations**: clients that asked for `stream_observations` get an
//!    `observation` after every change, and one right after `welcome`
//!
//! Every message carries a `seq` that must strictly increase per client.
//! Failures are reported as `error` with one of `handshake_required`,
//! `protocol_mismatch`, `not_controller`, `invalid_command` or
//! `backpressure` (command queue full).
//!
//! # Environment Variables
//!
//! - `TUI_2048_AI_HOST`: bind address (default `127.0.0.1`)
//! - `TUI_2048_AI_PORT`: port (default 7778)
//! - `TUI_2048_AI_MAX_PENDING`: command queue depth (default 10)
//! - `TUI_2048_AI_DISABLED`: `1` or `true` disables the adapter
//!
//! # Example
//!
//! ```text
//! -> {"type":"hello","seq":1,"ts":0,"client":{"name":"bot","version":"0.1"},"protocol_version":"1.0.0","requested":{"stream_observations":true}}
//! <- {"type":"welcome","seq":1,"ts":...,"protocol_version":"1.0.0","client_id":1,"role":"controller","controller_id":1,"game_id":"tui-2048",...}
//! <- {"type":"observation","seq":1,"ts":...,"state":"waiting_for_input","board":{"rows":4,"cols":4,"cells":[[0,2,0,0],...]},...}
//! -> {"type":"command","seq":2,"ts":0,"actions":["left","up"]}
//! <- {"type":"ack","seq":2,"ts":...,"status":"ok"}
//! ```

pub mod observation;
pub mod protocol;
pub mod runtime;
pub mod server;

pub use tui_2048_core as core;
pub use tui_2048_types as types;

pub use observation::{build_observation, state_hash};
pub use runtime::{
    Adapter, AdapterStatus, InboundCommand, InboundPayload, OutboundMessage, SharedStatus,
};
pub use server::{run_server, run_server_with_status, ServerConfig, ServerState};
