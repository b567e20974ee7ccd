//! Adapter runtime integration.
//!
//! Bridges the synchronous game loop with the async TCP server: the server
//! runs on its own tokio runtime and the game loop only ever polls channels.

use std::sync::atomic::{AtomicU16, AtomicUsize, Ordering};
use std::sync::Arc;

use arrayvec::ArrayVec;
use tokio::runtime::Runtime;
use tokio::sync::mpsc;

use crate::protocol::{
    AckMessage, ErrorMessage, ObservationMessage, MAX_ACTIONS_PER_COMMAND,
};
use crate::server::{run_server_with_status, ServerConfig, ServerState};
use crate::types::GameAction;

/// Command delivered to the game loop.
#[derive(Debug, Clone)]
pub struct InboundCommand {
    pub client_id: usize,
    pub seq: u64,
    pub payload: InboundPayload,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundPayload {
    /// Apply in order, then ack `seq`
    Actions(ArrayVec<GameAction, MAX_ACTIONS_PER_COMMAND>),
    /// A client just said hello and wants the current state
    SnapshotRequest,
}

/// Outbound message to be delivered by the server.
#[derive(Debug, Clone)]
pub enum OutboundMessage {
    ToClientAck { client_id: usize, ack: AckMessage },
    ToClientError { client_id: usize, err: ErrorMessage },
    ToClientObservation {
        client_id: usize,
        obs: Box<ObservationMessage>,
    },
    /// Sent to every client that asked for streamed observations
    BroadcastObservation { obs: Box<ObservationMessage> },
}

/// Connection counters, written by the server and read by the UI thread.
#[derive(Debug, Default)]
pub struct SharedStatus {
    clients: AtomicU16,
    streaming: AtomicU16,
    /// 0 = no controller (client ids start at 1)
    controller: AtomicUsize,
}

impl SharedStatus {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn store(&self, clients: usize, streaming: usize, controller: Option<usize>) {
        self.clients
            .store(clients.min(u16::MAX as usize) as u16, Ordering::Relaxed);
        self.streaming
            .store(streaming.min(u16::MAX as usize) as u16, Ordering::Relaxed);
        self.controller
            .store(controller.unwrap_or(0), Ordering::Relaxed);
    }

    pub fn load(&self) -> AdapterStatus {
        let controller = self.controller.load(Ordering::Relaxed);
        AdapterStatus {
            client_count: self.clients.load(Ordering::Relaxed),
            streaming_count: self.streaming.load(Ordering::Relaxed),
            controller_id: (controller != 0).then_some(controller),
        }
    }
}

/// Point-in-time copy of [`SharedStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AdapterStatus {
    pub client_count: u16,
    pub streaming_count: u16,
    pub controller_id: Option<usize>,
}

/// Running adapter instance.
pub struct Adapter {
    _rt: Runtime,
    cmd_rx: mpsc::Receiver<InboundCommand>,
    out_tx: mpsc::UnboundedSender<OutboundMessage>,
    status: Arc<SharedStatus>,
}

impl Adapter {
    /// Start the adapter from environment variables.
    ///
    /// Returns `Ok(None)` if `TUI_2048_AI_DISABLED` is set.
    pub fn start_from_env() -> anyhow::Result<Option<Self>> {
        if ServerState::is_disabled() {
            log::info!("[Adapter] AI control disabled via TUI_2048_AI_DISABLED");
            return Ok(None);
        }
        Self::start(ServerConfig::from_env()).map(Some)
    }

    /// Start the server on a dedicated runtime.
    ///
    /// Bind failures are logged from the server task; the game keeps running
    /// without remote control.
    pub fn start(config: ServerConfig) -> anyhow::Result<Self> {
        let max_pending = config.max_pending_commands.max(1);
        let (cmd_tx, cmd_rx) = mpsc::channel::<InboundCommand>(max_pending);
        let (out_tx, out_rx) = mpsc::unbounded_channel::<OutboundMessage>();
        let status = Arc::new(SharedStatus::new());

        let rt = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("tui-2048-adapter")
            .enable_all()
            .build()?;

        let server_status = Arc::clone(&status);
        rt.spawn(async move {
            if let Err(e) = run_server_with_status(config, cmd_tx, out_rx, None, server_status).await
            {
                log::error!("[Adapter] server stopped: {:#}", e);
            }
        });

        Ok(Self {
            _rt: rt,
            cmd_rx,
            out_tx,
            status,
        })
    }

    pub fn try_recv(&mut self) -> Option<InboundCommand> {
        self.cmd_rx.try_recv().ok()
    }

    pub fn send(&self, msg: OutboundMessage) {
        let _ = self.out_tx.send(msg);
    }

    pub fn status(&self) -> AdapterStatus {
        self.status.load()
    }

    /// True when at least one client wants streamed observations
    pub fn has_streaming_clients(&self) -> bool {
        self.status.load().streaming_count > 0
    }
}
