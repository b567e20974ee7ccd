//! Protocol module - JSON message types for the AI adapter
//!
//! Line-delimited JSON. Every message carries `type`, `seq` (sender-side
//! sequence number) and `ts` (milliseconds since the Unix epoch).

use arrayvec::ArrayVec;
use serde::{Deserialize, Serialize};

use crate::types::{Direction, GameAction, GameState, MAX_GRID_DIM};

/// Version spoken by this adapter. Clients must share the major version.
pub const PROTOCOL_VERSION: &str = "1.0.0";

/// Reported in `welcome.game_id`.
pub const GAME_ID: &str = "tui-2048";

/// Most actions accepted in a single command.
pub const MAX_ACTIONS_PER_COMMAND: usize = 32;

const GRID: usize = MAX_GRID_DIM as usize;

// ============== Client -> Game Messages ==============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum HelloType {
    #[default]
    #[serde(rename = "hello")]
    Hello,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CommandType {
    #[default]
    #[serde(rename = "command")]
    Command,
}

/// Client hello message (first message of a connection)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HelloMessage {
    #[serde(rename = "type")]
    #[serde(default)]
    pub msg_type: HelloType,
    pub seq: u64,
    pub ts: u64,
    pub client: ClientInfo,
    pub protocol_version: String,
    #[serde(default)]
    pub requested: RequestedCapabilities,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientInfo {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestedCapabilities {
    /// Receive an observation after every change of the game
    #[serde(default)]
    pub stream_observations: bool,
}

/// Command message (controller only)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandMessage {
    #[serde(rename = "type")]
    #[serde(default)]
    pub msg_type: CommandType,
    pub seq: u64,
    pub ts: u64,
    pub actions: ActionList,
}

/// Wire name of a game input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionName {
    Up,
    Down,
    Left,
    Right,
    Reset,
}

impl ActionName {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionName::Up => "up",
            ActionName::Down => "down",
            ActionName::Left => "left",
            ActionName::Right => "right",
            ActionName::Reset => "reset",
        }
    }

    /// Parse a wire name, case-insensitively
    pub fn from_str(s: &str) -> Option<Self> {
        [
            ActionName::Up,
            ActionName::Down,
            ActionName::Left,
            ActionName::Right,
            ActionName::Reset,
        ]
        .into_iter()
        .find(|a| s.eq_ignore_ascii_case(a.as_str()))
    }

    pub fn to_action(self) -> GameAction {
        match self {
            ActionName::Up => GameAction::Move(Direction::Up),
            ActionName::Down => GameAction::Move(Direction::Down),
            ActionName::Left => GameAction::Move(Direction::Left),
            ActionName::Right => GameAction::Move(Direction::Right),
            ActionName::Reset => GameAction::Reset,
        }
    }
}

impl From<Direction> for ActionName {
    fn from(value: Direction) -> Self {
        match value {
            Direction::Up => Self::Up,
            Direction::Down => Self::Down,
            Direction::Left => Self::Left,
            Direction::Right => Self::Right,
        }
    }
}

impl<'de> Deserialize<'de> for ActionName {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = <&str>::deserialize(deserializer)?;
        Self::from_str(s).ok_or_else(|| serde::de::Error::custom("unknown action"))
    }
}

impl Serialize for ActionName {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

/// Bounded list of actions; longer lists fail to parse.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ActionList(pub ArrayVec<ActionName, MAX_ACTIONS_PER_COMMAND>);

impl<'de> Deserialize<'de> for ActionList {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct V;
        impl<'de> serde::de::Visitor<'de> for V {
            type Value = ActionList;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                write!(f, "an array of action strings")
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
            where
                A: serde::de::SeqAccess<'de>,
            {
                let mut out = ArrayVec::new();
                while let Some(a) = seq.next_element::<ActionName>()? {
                    out.try_push(a)
                        .map_err(|_| serde::de::Error::custom("too many actions"))?;
                }
                Ok(ActionList(out))
            }
        }

        deserializer.deserialize_seq(V)
    }
}

impl Serialize for ActionList {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_seq(self.0.iter())
    }
}

// ============== Game -> Client Messages ==============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WelcomeType {
    #[serde(rename = "welcome")]
    Welcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AckType {
    #[serde(rename = "ack")]
    Ack,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AckStatus {
    #[serde(rename = "ok")]
    Ok,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorType {
    #[serde(rename = "error")]
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObservationType {
    #[serde(rename = "observation")]
    Observation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    HandshakeRequired,
    ProtocolMismatch,
    NotController,
    InvalidCommand,
    Backpressure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignedRole {
    Controller,
    Observer,
}

/// Welcome message (response to hello)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WelcomeMessage {
    #[serde(rename = "type")]
    pub msg_type: WelcomeType,
    pub seq: u64,
    pub ts: u64,
    pub protocol_version: String,
    pub client_id: u64,
    pub role: AssignedRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub controller_id: Option<u64>,
    pub game_id: String,
    pub capabilities: ServerCapabilities,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerCapabilities {
    pub formats: [CapabilityFormat; 1],
    pub actions: [ActionName; 5],
    pub max_actions_per_command: usize,
}

impl Default for ServerCapabilities {
    fn default() -> Self {
        Self {
            formats: [CapabilityFormat::Json],
            actions: [
                ActionName::Up,
                ActionName::Down,
                ActionName::Left,
                ActionName::Right,
                ActionName::Reset,
            ],
            max_actions_per_command: MAX_ACTIONS_PER_COMMAND,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CapabilityFormat {
    #[serde(rename = "json")]
    Json,
}

/// Acknowledgment, sent once a command has been applied
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AckMessage {
    #[serde(rename = "type")]
    pub msg_type: AckType,
    pub seq: u64,
    pub ts: u64,
    pub status: AckStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorMessage {
    #[serde(rename = "type")]
    pub msg_type: ErrorType,
    pub seq: u64,
    pub ts: u64,
    pub code: ErrorCode,
    pub message: String,
}

/// Game state observation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservationMessage {
    #[serde(rename = "type")]
    pub msg_type: ObservationType,
    pub seq: u64,
    pub ts: u64,
    pub state: StateLower,
    pub playable: bool,
    pub game_over: bool,
    pub episode_id: u32,
    pub turn: u32,
    pub seed: u64,
    pub board: BoardSnapshot,
    pub score: u32,
    pub best_tile: u32,
    pub max_tile_value: u32,
    pub max_tile_reached: bool,
    /// Directions that would change the grid right now
    pub legal_moves: ArrayVec<ActionName, 4>,
    pub state_hash: StateHash,
    /// What happened since the previous observation, oldest first
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<EventRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardSnapshot {
    pub rows: u8,
    pub cols: u8,
    /// Row-major tile values, 0 = empty
    pub cells: ArrayVec<ArrayVec<u32, GRID>, GRID>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateLower {
    Loaded,
    WaitingForInput,
    CheckingMatches,
    GameOver,
}

impl From<GameState> for StateLower {
    fn from(value: GameState) -> Self {
        match value {
            GameState::Loaded => Self::Loaded,
            GameState::WaitingForInput => Self::WaitingForInput,
            GameState::CheckingMatches => Self::CheckingMatches,
            GameState::GameOver => Self::GameOver,
        }
    }
}

/// A game event on the wire. Positions are `[x, y]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventRecord {
    Spawned { at: [i8; 2], value: u32 },
    Moved { from: [i8; 2], to: [i8; 2], value: u32 },
    Merged { from: [i8; 2], into: [i8; 2], value: u32 },
    Score { score: u32 },
    MaxTile { value: u32 },
    GameOver { score: u32 },
    Reset,
}

/// Deterministic state hash serialized as 16 lowercase hex digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StateHash(pub u64);

impl Serialize for StateHash {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        const HEX: &[u8; 16] = b"0123456789abcdef";
        let mut buf = [0u8; 16];
        let mut v = self.0;
        for slot in buf.iter_mut().rev() {
            *slot = HEX[(v & 0x0f) as usize];
            v >>= 4;
        }
        // Only ASCII hex digits were written.
        let s = std::str::from_utf8(&buf).map_err(<S::Error as serde::ser::Error>::custom)?;
        serializer.serialize_str(s)
    }
}

impl<'de> Deserialize<'de> for StateHash {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = <&str>::deserialize(deserializer)?;
        u64::from_str_radix(s.trim(), 16)
            .map(StateHash)
            .map_err(|_| serde::de::Error::custom("invalid hex"))
    }
}

// ============== Message Parsing ==============

/// Parsed incoming message
#[derive(Debug, Clone)]
pub enum ParsedMessage {
    Hello(HelloMessage),
    Command(CommandMessage),
    Unknown(UnknownMessage),
}

/// Well-formed JSON with a `type` this adapter does not speak.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownMessage {
    pub seq: u64,
}

/// Parse one JSON line.
///
/// A malformed hello or command is an error; any other `type` parses to
/// [`ParsedMessage::Unknown`].
pub fn parse_message(json: &str) -> Result<ParsedMessage, serde_json::Error> {
    #[derive(Debug, Deserialize)]
    #[serde(tag = "type")]
    enum InboundMessage {
        #[serde(rename = "hello")]
        Hello(HelloMessage),
        #[serde(rename = "command")]
        Command(CommandMessage),
    }

    match serde_json::from_str::<InboundMessage>(json) {
        Ok(InboundMessage::Hello(m)) => Ok(ParsedMessage::Hello(m)),
        Ok(InboundMessage::Command(m)) => Ok(ParsedMessage::Command(m)),
        Err(e) => {
            #[derive(Debug, Deserialize)]
            struct Envelope<'a> {
                #[serde(rename = "type", borrow)]
                msg_type: Option<&'a str>,
                seq: Option<u64>,
            }
            let envelope = serde_json::from_str::<Envelope>(json)?;
            match envelope.msg_type {
                Some("hello") | Some("command") => Err(e),
                _ => Ok(ParsedMessage::Unknown(UnknownMessage {
                    seq: envelope.seq.unwrap_or(0),
                })),
            }
        }
    }
}

// ============== Utility Functions ==============

/// Create a hello message
pub fn create_hello(seq: u64, client_name: &str, protocol_version: &str) -> HelloMessage {
    HelloMessage {
        msg_type: HelloType::Hello,
        seq,
        ts: current_timestamp_ms(),
        client: ClientInfo {
            name: client_name.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
        protocol_version: protocol_version.to_string(),
        requested: RequestedCapabilities {
            stream_observations: true,
        },
    }
}

/// Create a command message
pub fn create_command(seq: u64, actions: &[ActionName]) -> CommandMessage {
    CommandMessage {
        msg_type: CommandType::Command,
        seq,
        ts: current_timestamp_ms(),
        actions: ActionList(actions.iter().copied().take(MAX_ACTIONS_PER_COMMAND).collect()),
    }
}

/// Create a welcome message
pub fn create_welcome(
    seq: u64,
    protocol_version: &str,
    client_id: u64,
    role: AssignedRole,
    controller_id: Option<u64>,
) -> WelcomeMessage {
    WelcomeMessage {
        msg_type: WelcomeType::Welcome,
        seq,
        ts: current_timestamp_ms(),
        protocol_version: protocol_version.to_string(),
        client_id,
        role,
        controller_id,
        game_id: GAME_ID.to_string(),
        capabilities: ServerCapabilities::default(),
    }
}

/// Create an acknowledgment for the command with sequence number `seq`
pub fn create_ack(seq: u64) -> AckMessage {
    AckMessage {
        msg_type: AckType::Ack,
        seq,
        ts: current_timestamp_ms(),
        status: AckStatus::Ok,
    }
}

pub fn create_error(seq: u64, code: ErrorCode, message: &str) -> ErrorMessage {
    ErrorMessage {
        msg_type: ErrorType::Error,
        seq,
        ts: current_timestamp_ms(),
        code,
        message: message.to_string(),
    }
}

/// True when `version` shares the adapter's major version
pub fn is_compatible_version(version: &str) -> bool {
    version.split('.').next().map(str::trim) == PROTOCOL_VERSION.split('.').next()
}

/// Current timestamp in milliseconds
pub fn current_timestamp_ms() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hello() {
        let json = r#"{"type":"hello","seq":1,"ts":1234567890,"client":{"name":"test-ai","version":"1.0.0"},"protocol_version":"1.0.0","requested":{"stream_observations":true}}"#;

        match parse_message(json).unwrap() {
            ParsedMessage::Hello(msg) => {
                assert_eq!(msg.msg_type, HelloType::Hello);
                assert_eq!(msg.seq, 1);
                assert_eq!(msg.client.name, "test-ai");
                assert!(msg.requested.stream_observations);
            }
            other => panic!("Expected Hello message, got {:?}", other),
        }
    }

    #[test]
    fn test_hello_without_requested_defaults_to_no_stream() {
        let json = r#"{"type":"hello","seq":1,"ts":0,"client":{"name":"a","version":"0"},"protocol_version":"1.0.0"}"#;
        match parse_message(json).unwrap() {
            ParsedMessage::Hello(msg) => assert!(!msg.requested.stream_observations),
            other => panic!("Expected Hello message, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_command_actions() {
        let json = r#"{"type":"command","seq":2,"ts":1234567900,"actions":["left","UP","reset"]}"#;

        match parse_message(json).unwrap() {
            ParsedMessage::Command(msg) => {
                assert_eq!(
                    msg.actions.0.as_slice(),
                    &[ActionName::Left, ActionName::Up, ActionName::Reset]
                );
                assert_eq!(
                    msg.actions.0[0].to_action(),
                    GameAction::Move(Direction::Left)
                );
            }
            other => panic!("Expected Command message, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_action_is_an_error() {
        let json = r#"{"type":"command","seq":2,"ts":1,"actions":["rotate"]}"#;
        assert!(parse_message(json).is_err());
    }

    #[test]
    fn test_too_many_actions_is_an_error() {
        let actions = vec!["\"up\""; MAX_ACTIONS_PER_COMMAND + 1].join(",");
        let json = format!(r#"{{"type":"command","seq":2,"ts":1,"actions":[{}]}}"#, actions);
        assert!(parse_message(&json).is_err());
    }

    #[test]
    fn test_unknown_type_keeps_seq() {
        let json = r#"{"type":"control","seq":9,"ts":1,"action":"claim"}"#;
        match parse_message(json).unwrap() {
            ParsedMessage::Unknown(m) => assert_eq!(m.seq, 9),
            other => panic!("Expected Unknown message, got {:?}", other),
        }
        assert!(parse_message("not json").is_err());
    }

    #[test]
    fn test_create_welcome() {
        let welcome = create_welcome(1, PROTOCOL_VERSION, 7, AssignedRole::Controller, Some(7));
        let v = serde_json::to_value(&welcome).unwrap();
        assert_eq!(v["type"], "welcome");
        assert_eq!(v["client_id"], 7);
        assert_eq!(v["role"], "controller");
        assert_eq!(v["game_id"], "tui-2048");
        assert_eq!(v["capabilities"]["actions"][4], "reset");
    }

    #[test]
    fn test_create_error_wire_code() {
        let error = create_error(5, ErrorCode::NotController, "Only controller may send commands");
        let v = serde_json::to_value(&error).unwrap();
        assert_eq!(v["type"], "error");
        assert_eq!(v["code"], "not_controller");
        assert_eq!(v["seq"], 5);
    }

    #[test]
    fn test_version_compatibility() {
        assert!(is_compatible_version("1.0.0"));
        assert!(is_compatible_version("1.4"));
        assert!(!is_compatible_version("2.0.0"));
        assert!(!is_compatible_version(""));
    }

    #[test]
    fn test_state_hash_is_fixed_width_hex() {
        let s = serde_json::to_string(&StateHash(0xabc)).unwrap();
        assert_eq!(s, "\"0000000000000abc\"");
        let back: StateHash = serde_json::from_str(&s).unwrap();
        assert_eq!(back, StateHash(0xabc));
    }

    #[test]
    fn test_event_record_tagging() {
        let v = serde_json::to_value(EventRecord::Merged {
            from: [3, 0],
            into: [0, 0],
            value: 8,
        })
        .unwrap();
        assert_eq!(v["kind"], "merged");
        assert_eq!(v["into"][0], 0);
        assert_eq!(serde_json::to_value(EventRecord::Reset).unwrap()["kind"], "reset");
    }
}
