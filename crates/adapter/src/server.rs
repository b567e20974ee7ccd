//! TCP server for the AI adapter
//!
//! Accepts connections, performs the hello/welcome handshake, enforces
//! per-client sequencing and controller ownership, and forwards commands to
//! the game loop over a bounded channel.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use arrayvec::ArrayVec;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot, RwLock};

use crate::protocol::*;
use crate::runtime::{InboundCommand, InboundPayload, OutboundMessage, SharedStatus};
use crate::types::GameAction;

/// Pull `"seq": <digits>` out of a line that failed to parse.
fn extract_seq_best_effort(s: &str) -> Option<u64> {
    let start = s.find("\"seq\"")?;
    let after_key = &s[start + 5..];
    let colon = after_key.find(':')?;
    let rest = after_key[colon + 1..].trim_start();
    let end = rest.bytes().take_while(u8::is_ascii_digit).count();
    if end == 0 {
        return None;
    }
    rest[..end].parse::<u64>().ok()
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub protocol_version: String,
    pub max_pending_commands: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 7778,
            protocol_version: PROTOCOL_VERSION.to_string(),
            max_pending_commands: 10,
        }
    }
}

impl ServerConfig {
    /// Create from `TUI_2048_AI_*` environment variables
    pub fn from_env() -> Self {
        use std::env;

        let defaults = Self::default();
        let host = env::var("TUI_2048_AI_HOST")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.host);
        let port = env::var("TUI_2048_AI_PORT")
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(defaults.port);
        let max_pending_commands = env::var("TUI_2048_AI_MAX_PENDING")
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(defaults.max_pending_commands);

        Self {
            host,
            port,
            protocol_version: defaults.protocol_version,
            max_pending_commands,
        }
    }

    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid adapter address {}:{}", self.host, self.port))
    }
}

/// Shared server state
pub struct ServerState {
    config: ServerConfig,
    clients: RwLock<Vec<ClientHandle>>,
    controller: RwLock<Option<usize>>,
    status: Arc<SharedStatus>,
}

impl ServerState {
    pub fn new(config: ServerConfig, status: Arc<SharedStatus>) -> Self {
        Self {
            config,
            clients: RwLock::new(Vec::new()),
            controller: RwLock::new(None),
            status,
        }
    }

    /// Check if AI control is disabled via environment
    pub fn is_disabled() -> bool {
        std::env::var("TUI_2048_AI_DISABLED")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    }

    /// Mirror the connection table into the lock-free status.
    ///
    /// Takes the already-locked data; tokio's locks are not reentrant.
    fn publish(&self, controller: Option<usize>, clients: &[ClientHandle]) {
        let streaming = clients.iter().filter(|c| c.stream_observations).count();
        self.status.store(clients.len(), streaming, controller);
    }

    async fn is_handshaken(&self, client_id: usize) -> bool {
        let clients = self.clients.read().await;
        clients
            .iter()
            .find(|c| c.id == client_id)
            .map(|c| c.handshaken)
            .unwrap_or(false)
    }

    /// Record `seq` for the client; false if it does not increase.
    async fn check_and_update_seq(&self, client_id: usize, seq: u64) -> bool {
        let mut clients = self.clients.write().await;
        let Some(client) = clients.iter_mut().find(|c| c.id == client_id) else {
            return true;
        };
        match client.last_seq {
            Some(prev) if seq <= prev => false,
            _ => {
                client.last_seq = Some(seq);
                true
            }
        }
    }

    async fn is_controller(&self, client_id: usize) -> bool {
        *self.controller.read().await == Some(client_id)
    }
}

/// Handle to a connected client
pub struct ClientHandle {
    pub id: usize,
    pub addr: SocketAddr,
    pub stream_observations: bool,
    pub handshaken: bool,
    pub last_seq: Option<u64>,
    pub tx: mpsc::UnboundedSender<ClientOutbound>,
}

#[derive(Debug, Clone)]
pub enum ClientOutbound {
    Welcome(WelcomeMessage),
    Ack(AckMessage),
    Error(ErrorMessage),
    Observation(Box<ObservationMessage>),
}

impl ClientOutbound {
    /// Serialize as one JSON line into `buf`, replacing its contents
    fn encode_into(&self, buf: &mut Vec<u8>) -> serde_json::Result<()> {
        buf.clear();
        match self {
            ClientOutbound::Welcome(m) => serde_json::to_writer(&mut *buf, m)?,
            ClientOutbound::Ack(m) => serde_json::to_writer(&mut *buf, m)?,
            ClientOutbound::Error(m) => serde_json::to_writer(&mut *buf, m)?,
            ClientOutbound::Observation(m) => serde_json::to_writer(&mut *buf, m)?,
        }
        buf.push(b'\n');
        Ok(())
    }
}

/// Start the TCP server with a private status block
pub async fn run_server(
    config: ServerConfig,
    command_tx: mpsc::Sender<InboundCommand>,
    out_rx: mpsc::UnboundedReceiver<OutboundMessage>,
    ready_tx: Option<oneshot::Sender<SocketAddr>>,
) -> anyhow::Result<()> {
    run_server_with_status(
        config,
        command_tx,
        out_rx,
        ready_tx,
        Arc::new(SharedStatus::new()),
    )
    .await
}

/// Start the TCP server.
///
/// `ready_tx` receives the bound address (useful with port 0).
pub async fn run_server_with_status(
    config: ServerConfig,
    command_tx: mpsc::Sender<InboundCommand>,
    mut out_rx: mpsc::UnboundedReceiver<OutboundMessage>,
    ready_tx: Option<oneshot::Sender<SocketAddr>>,
    status: Arc<SharedStatus>,
) -> anyhow::Result<()> {
    let addr = config.socket_addr()?;
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind adapter on {}", addr))?;
    let bound = listener.local_addr()?;
    log::info!("[Adapter] TCP server listening on {}", bound);
    if let Some(tx) = ready_tx {
        let _ = tx.send(bound);
    }

    let state = Arc::new(ServerState::new(config, status));
    let mut client_id_counter = 0usize;

    // Outbound dispatcher.
    {
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            while let Some(msg) = out_rx.recv().await {
                let clients = state.clients.read().await;
                let send_to = |client_id: usize, out: ClientOutbound| {
                    if let Some(c) = clients.iter().find(|c| c.id == client_id) {
                        let _ = c.tx.send(out);
                    }
                };
                match msg {
                    OutboundMessage::ToClientAck { client_id, ack } => {
                        send_to(client_id, ClientOutbound::Ack(ack));
                    }
                    OutboundMessage::ToClientError { client_id, err } => {
                        send_to(client_id, ClientOutbound::Error(err));
                    }
                    OutboundMessage::ToClientObservation { client_id, obs } => {
                        send_to(client_id, ClientOutbound::Observation(obs));
                    }
                    OutboundMessage::BroadcastObservation { obs } => {
                        for c in clients.iter().filter(|c| c.stream_observations) {
                            let _ = c.tx.send(ClientOutbound::Observation(obs.clone()));
                        }
                    }
                }
            }
        });
    }

    // Accept incoming connections
    loop {
        let (socket, addr) = listener.accept().await?;
        client_id_counter += 1;
        let client_id = client_id_counter;

        log::info!("[Adapter] Client {} connected from {}", client_id, addr);

        let state = Arc::clone(&state);
        let command_tx = command_tx.clone();

        tokio::spawn(async move {
            if let Err(e) = handle_client(socket, addr, client_id, state, command_tx).await {
                log::warn!("[Adapter] Client {} error: {:#}", client_id, e);
            }
            log::info!("[Adapter] Client {} disconnected", client_id);
        });
    }
}

/// Handle a single client connection
async fn handle_client(
    socket: TcpStream,
    addr: SocketAddr,
    client_id: usize,
    state: Arc<ServerState>,
    command_tx: mpsc::Sender<InboundCommand>,
) -> anyhow::Result<()> {
    let (reader, mut writer) = socket.into_split();
    let mut reader = BufReader::new(reader);

    let (tx, mut rx) = mpsc::unbounded_channel::<ClientOutbound>();

    {
        let controller = state.controller.read().await;
        let mut clients = state.clients.write().await;
        clients.push(ClientHandle {
            id: client_id,
            addr,
            stream_observations: false,
            handshaken: false,
            last_seq: None,
            tx: tx.clone(),
        });
        state.publish(*controller, &clients);
    }

    let write_task = tokio::spawn(async move {
        let mut buf: Vec<u8> = Vec::with_capacity(4096);
        while let Some(msg) = rx.recv().await {
            if msg.encode_into(&mut buf).is_err() {
                continue;
            }
            if writer.write_all(&buf).await.is_err() || writer.flush().await.is_err() {
                break;
            }
        }
    });

    // Cleanup runs however the read loop ends.
    let result = read_loop(&mut reader, client_id, &state, &command_tx, &tx).await;

    remove_client(&state, client_id).await;

    drop(tx);
    let _ = write_task.await;

    result
}

/// Read until EOF, a fatal protocol error or an I/O error.
async fn read_loop(
    reader: &mut BufReader<OwnedReadHalf>,
    client_id: usize,
    state: &ServerState,
    command_tx: &mpsc::Sender<InboundCommand>,
    tx: &mpsc::UnboundedSender<ClientOutbound>,
) -> anyhow::Result<()> {
    let mut line = String::new();
    loop {
        line.clear();
        if reader.read_line(&mut line).await? == 0 {
            return Ok(());
        }
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if !handle_line(trimmed, client_id, state, command_tx, tx).await? {
            return Ok(());
        }
    }
}

/// Process one inbound line. Returns false when the connection must close.
async fn handle_line(
    line: &str,
    client_id: usize,
    state: &ServerState,
    command_tx: &mpsc::Sender<InboundCommand>,
    tx: &mpsc::UnboundedSender<ClientOutbound>,
) -> anyhow::Result<bool> {
    let reply_error = |seq: u64, code: ErrorCode, message: &str| {
        let _ = tx.send(ClientOutbound::Error(create_error(seq, code, message)));
    };

    match parse_message(line) {
        Ok(ParsedMessage::Hello(hello)) => {
            if state.is_handshaken(client_id).await
                && !state.check_and_update_seq(client_id, hello.seq).await
            {
                reply_error(
                    hello.seq,
                    ErrorCode::InvalidCommand,
                    "seq must be strictly increasing",
                );
                return Ok(true);
            }

            if !is_compatible_version(&hello.protocol_version) {
                reply_error(
                    hello.seq,
                    ErrorCode::ProtocolMismatch,
                    &format!("Protocol version {} not supported", hello.protocol_version),
                );
                return Ok(false);
            }

            let stream = hello.requested.stream_observations;
            let (role, controller_id) = {
                let mut controller = state.controller.write().await;
                let mut clients = state.clients.write().await;
                if let Some(client) = clients.iter_mut().find(|c| c.id == client_id) {
                    client.handshaken = true;
                    client.last_seq = Some(hello.seq);
                    client.stream_observations = stream;
                }
                // First client to hello becomes controller
                if controller.is_none() {
                    *controller = Some(client_id);
                    log::info!(
                        "[Adapter] Client {} ({}) is now controller",
                        client_id,
                        hello.client.name
                    );
                }
                state.publish(*controller, &clients);
                let role = if *controller == Some(client_id) {
                    AssignedRole::Controller
                } else {
                    AssignedRole::Observer
                };
                (role, (*controller).map(|id| id as u64))
            };

            let welcome = create_welcome(
                hello.seq,
                &state.config.protocol_version,
                client_id as u64,
                role,
                controller_id,
            );
            let _ = tx.send(ClientOutbound::Welcome(welcome));

            // Current state for the new client; a full queue just means it
            // waits for the next broadcast.
            if stream {
                let _ = command_tx.try_send(InboundCommand {
                    client_id,
                    seq: hello.seq,
                    payload: InboundPayload::SnapshotRequest,
                });
            }
        }

        Ok(ParsedMessage::Command(cmd)) => {
            if !state.is_handshaken(client_id).await {
                reply_error(
                    cmd.seq,
                    ErrorCode::HandshakeRequired,
                    "Send hello before command",
                );
                return Ok(true);
            }

            if !state.check_and_update_seq(client_id, cmd.seq).await {
                reply_error(
                    cmd.seq,
                    ErrorCode::InvalidCommand,
                    "seq must be strictly increasing",
                );
                return Ok(true);
            }

            if !state.is_controller(client_id).await {
                reply_error(
                    cmd.seq,
                    ErrorCode::NotController,
                    "Only controller may send commands",
                );
                return Ok(true);
            }

            if cmd.actions.0.is_empty() {
                reply_error(cmd.seq, ErrorCode::InvalidCommand, "Empty action list");
                return Ok(true);
            }

            let actions: ArrayVec<GameAction, MAX_ACTIONS_PER_COMMAND> =
                cmd.actions.0.iter().map(|a| a.to_action()).collect();

            // Ack is sent by the game loop once the actions are applied.
            match command_tx.try_send(InboundCommand {
                client_id,
                seq: cmd.seq,
                payload: InboundPayload::Actions(actions),
            }) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    reply_error(cmd.seq, ErrorCode::Backpressure, "Command queue is full");
                }
                Err(TrySendError::Closed(_)) => {
                    anyhow::bail!("game loop is gone");
                }
            }
        }

        Ok(ParsedMessage::Unknown(unknown)) => {
            if state.is_handshaken(client_id).await
                && !state.check_and_update_seq(client_id, unknown.seq).await
            {
                reply_error(
                    unknown.seq,
                    ErrorCode::InvalidCommand,
                    "seq must be strictly increasing",
                );
                return Ok(true);
            }
            reply_error(unknown.seq, ErrorCode::InvalidCommand, "Unknown message type");
        }

        Err(e) => {
            let seq = extract_seq_best_effort(line).unwrap_or(0);
            log::debug!("[Adapter] Client {} sent bad JSON: {}", client_id, e);
            reply_error(
                seq,
                ErrorCode::InvalidCommand,
                &format!("JSON parse error: {}", e),
            );
        }
    }

    Ok(true)
}

/// Drop a client and hand control to the lowest remaining handshaken id.
async fn remove_client(state: &ServerState, client_id: usize) {
    let mut controller = state.controller.write().await;
    let mut clients = state.clients.write().await;

    clients.retain(|c| c.id != client_id);

    if *controller == Some(client_id) {
        *controller = clients
            .iter()
            .filter(|c| c.handshaken)
            .map(|c| c.id)
            .min();
        match *controller {
            Some(new_id) => log::info!("[Adapter] Controller {} promoted", new_id),
            None => log::info!("[Adapter] Controller {} released", client_id),
        }
    }

    state.publish(*controller, &clients);
}
