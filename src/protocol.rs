//! Wire types for the drawing-game relay protocol.
//!
//! Every frame is a single JSON object carrying the event name and its
//! payload:
//!
//! ```json
//! {"event": "join_room", "data": {"room_code": "AB12CD", "username": "Alice"}}
//! ```
//!
//! Payload keys are snake_case and match what the relay emits. Optional
//! fields that older relays omit are modelled as `Option` or `#[serde(default)]`
//! so that a missing key never fails the whole frame.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

// ── Constants ───────────────────────────────────────────────────────

/// Length of a room code.
pub const ROOM_CODE_LENGTH: usize = 6;

/// Minimum username length, after trimming.
pub const USERNAME_MIN_LEN: usize = 2;

/// Maximum username length, after trimming.
pub const USERNAME_MAX_LEN: usize = 20;

// ── Type aliases ────────────────────────────────────────────────────

/// Relay-assigned connection identifier.
///
/// Opaque and only stable for one transport session. Never persisted.
pub type ConnectionId = String;

// ── Input normalization ─────────────────────────────────────────────

/// Trim, uppercase and check a user-entered room code.
///
/// # Errors
///
/// Returns [`ValidationError::InvalidRoomCode`] unless the result is exactly
/// six ASCII alphanumeric characters.
///
/// ```
/// use scribble_client::protocol::normalize_room_code;
///
/// assert_eq!(normalize_room_code(" ab12cd ").unwrap(), "AB12CD");
/// assert!(normalize_room_code("AB12").is_err());
/// ```
pub fn normalize_room_code(input: &str) -> Result<String, ValidationError> {
    let code = input.trim().to_ascii_uppercase();
    if is_room_code(&code) {
        Ok(code)
    } else {
        Err(ValidationError::InvalidRoomCode)
    }
}

/// Returns `true` if `code` is a well-formed, already-normalized room code.
pub fn is_room_code(code: &str) -> bool {
    code.len() == ROOM_CODE_LENGTH
        && code
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase())
}

/// Trim and length-check a user-entered name.
///
/// # Errors
///
/// Returns [`ValidationError::EmptyUsername`] for a blank name and
/// [`ValidationError::UsernameLength`] when the trimmed name is outside
/// `2..=20` characters.
pub fn normalize_username(input: &str) -> Result<String, ValidationError> {
    let name = input.trim();
    if name.is_empty() {
        return Err(ValidationError::EmptyUsername);
    }
    let len = name.chars().count();
    if !(USERNAME_MIN_LEN..=USERNAME_MAX_LEN).contains(&len) {
        return Err(ValidationError::UsernameLength {
            min: USERNAME_MIN_LEN,
            max: USERNAME_MAX_LEN,
        });
    }
    Ok(name.to_string())
}

// ── Structs ─────────────────────────────────────────────────────────

/// A player as listed by the relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub sid: ConnectionId,
    pub username: String,
    #[serde(default)]
    pub score: u32,
    #[serde(default)]
    pub has_guessed: bool,
}

/// Room snapshot carried by `room_created` and `room_joined`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomInfo {
    #[serde(default)]
    pub room_code: String,
    pub host_sid: ConnectionId,
    /// Ordered by join time. Missing lists decode as empty and are rejected
    /// later by the session store.
    #[serde(default)]
    pub players: Vec<PlayerInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_count: Option<u32>,
    #[serde(default)]
    pub game_started: bool,
}

/// Turn-level game state attached to `game_started` and `new_turn`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct GameStateInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_round: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_rounds: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drawer_sid: Option<ConnectionId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_remaining: Option<u32>,
    #[serde(default)]
    pub game_active: bool,
    #[serde(default)]
    pub game_ended: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub word_category: Option<String>,
    #[serde(default)]
    pub guessed_count: u32,
}

/// Answer to `get_game_state`.
///
/// `word` is only ever filled in for the drawer's own connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct GameStateUpdate {
    /// Username of the current drawer.
    #[serde(default)]
    pub current_drawer: Option<String>,
    #[serde(default)]
    pub drawer_sid: Option<ConnectionId>,
    #[serde(default)]
    pub word: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub current_round: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub word_length: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_remaining: Option<u32>,
}

/// One row of a leaderboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    #[serde(default)]
    pub sid: ConnectionId,
    pub username: String,
    pub score: u32,
}

/// One atomic drawing primitive in canvas pixel space.
///
/// Coordinates are absolute, so losing one event breaks a line visually but
/// never corrupts anything that follows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StrokeEvent {
    Dot {
        x: f64,
        y: f64,
        color: String,
        size: f64,
    },
    Line {
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
        color: String,
        size: f64,
    },
}

impl StrokeEvent {
    /// Stroke color as a hex RGB string.
    pub fn color(&self) -> &str {
        match self {
            Self::Dot { color, .. } | Self::Line { color, .. } => color,
        }
    }

    /// Stroke width in pixels.
    pub fn size(&self) -> f64 {
        match self {
            Self::Dot { size, .. } | Self::Line { size, .. } => *size,
        }
    }

    /// Check that the stroke is renderable.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidStroke`] when a coordinate is not
    /// finite, the size is not a positive finite number, or the color is not
    /// `#RGB`/`#RRGGBB`.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let coords_finite = match self {
            Self::Dot { x, y, .. } => x.is_finite() && y.is_finite(),
            Self::Line { x1, y1, x2, y2, .. } => [x1, y1, x2, y2].iter().all(|v| v.is_finite()),
        };
        if !coords_finite {
            return Err(ValidationError::InvalidStroke(
                "coordinates must be finite".into(),
            ));
        }
        let size = self.size();
        if !(size.is_finite() && size > 0.0) {
            return Err(ValidationError::InvalidStroke(format!(
                "size must be positive, got {size}"
            )));
        }
        if !is_hex_color(self.color()) {
            return Err(ValidationError::InvalidStroke(format!(
                "color must be a hex RGB string, got {:?}",
                self.color()
            )));
        }
        Ok(())
    }
}

fn is_hex_color(color: &str) -> bool {
    match color.strip_prefix('#') {
        Some(hex) => (hex.len() == 3 || hex.len() == 6) && hex.chars().all(|c| c.is_ascii_hexdigit()),
        None => false,
    }
}

/// Payload of an outbound `draw` frame: the room plus the flattened stroke.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawPayload {
    pub room_code: String,
    #[serde(flatten)]
    pub stroke: StrokeEvent,
}

// ── Messages ────────────────────────────────────────────────────────

/// Frames sent from client to relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Create a new room hosted by this connection.
    CreateRoom { username: String },
    /// Join an existing room.
    JoinRoom { room_code: String, username: String },
    /// Ask the relay to start the game (host only).
    StartGame { room_code: String },
    /// Forward one stroke to the other players.
    Draw(DrawPayload),
    /// Wipe every other player's canvas.
    ClearCanvas { room_code: String },
    /// Submit a guess for the hidden word.
    Guess {
        room_code: String,
        #[serde(rename = "guess")]
        text: String,
    },
    /// Plain chat message.
    ChatMessage { room_code: String, message: String },
    /// Emoji reaction at a position given in percent of the canvas.
    Reaction {
        room_code: String,
        emoji: String,
        x: f64,
        y: f64,
    },
    /// Request a `game_state_update` for the given room.
    GetGameState { room_code: String },
}

/// Frames sent from relay to client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Connection identity assigned for this transport session.
    Connected { sid: ConnectionId },
    /// The room this connection asked for has been created.
    RoomCreated { room_code: String, room: RoomInfo },
    /// This connection joined a room.
    RoomJoined { room_code: String, room: RoomInfo },
    /// Joining failed (room missing, full, already started, name taken).
    JoinError { message: String },
    /// Someone joined; `players` is the full membership list.
    PlayerJoined {
        username: String,
        players: Vec<PlayerInfo>,
    },
    /// Someone left; `players` is the full membership list.
    PlayerLeft {
        username: String,
        players: Vec<PlayerInfo>,
    },
    /// The host started the game; the first turn is beginning.
    GameStarted {
        drawer_sid: ConnectionId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        drawer_username: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        game_state: Option<GameStateInfo>,
    },
    /// Sent only to the drawer: the plaintext word for this turn.
    YourTurnToDraw { word: String, category: String },
    /// A new turn started.
    NewTurn {
        drawer_sid: ConnectionId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        drawer_username: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        category: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        word_length: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        game_state: Option<GameStateInfo>,
    },
    /// Authoritative countdown correction.
    TimerUpdate { time_remaining: u32 },
    /// The turn is over; the word is revealed.
    TurnEnded {
        word: String,
        leaderboard: Vec<LeaderboardEntry>,
    },
    /// The game is over.
    GameEnded {
        final_leaderboard: Vec<LeaderboardEntry>,
        #[serde(default)]
        winners: Vec<LeaderboardEntry>,
    },
    /// Answer to `get_game_state`.
    GameStateUpdate(GameStateUpdate),
    /// A stroke from the current drawer.
    Draw(StrokeEvent),
    /// The drawer wiped the canvas.
    ClearCanvas {},
    /// Chat line (also used for wrong guesses).
    ChatMessage {
        username: String,
        message: String,
        #[serde(default)]
        is_system: bool,
    },
    /// Someone guessed the word.
    CorrectGuess {
        username: String,
        points: u32,
        leaderboard: Vec<LeaderboardEntry>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sid: Option<ConnectionId>,
    },
    /// This connection already guessed correctly this turn.
    AlreadyGuessed { message: String },
    /// Emoji reaction.
    Reaction {
        emoji: String,
        x: f64,
        y: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        username: Option<String>,
    },
    /// Generic relay error.
    Error {
        #[serde(default)]
        message: String,
    },
}

impl ServerMessage {
    /// Wire name of the event, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Connected { .. } => "connected",
            Self::RoomCreated { .. } => "room_created",
            Self::RoomJoined { .. } => "room_joined",
            Self::JoinError { .. } => "join_error",
            Self::PlayerJoined { .. } => "player_joined",
            Self::PlayerLeft { .. } => "player_left",
            Self::GameStarted { .. } => "game_started",
            Self::YourTurnToDraw { .. } => "your_turn_to_draw",
            Self::NewTurn { .. } => "new_turn",
            Self::TimerUpdate { .. } => "timer_update",
            Self::TurnEnded { .. } => "turn_ended",
            Self::GameEnded { .. } => "game_ended",
            Self::GameStateUpdate(_) => "game_state_update",
            Self::Draw(_) => "draw",
            Self::ClearCanvas {} => "clear_canvas",
            Self::ChatMessage { .. } => "chat_message",
            Self::CorrectGuess { .. } => "correct_guess",
            Self::AlreadyGuessed { .. } => "already_guessed",
            Self::Reaction { .. } => "reaction",
            Self::Error { .. } => "error",
        }
    }
}

impl ClientMessage {
    /// Wire name of the event, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateRoom { .. } => "create_room",
            Self::JoinRoom { .. } => "join_room",
            Self::StartGame { .. } => "start_game",
            Self::Draw(_) => "draw",
            Self::ClearCanvas { .. } => "clear_canvas",
            Self::Guess { .. } => "guess",
            Self::ChatMessage { .. } => "chat_message",
            Self::Reaction { .. } => "reaction",
            Self::GetGameState { .. } => "get_game_state",
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;

    #[test]
    fn room_code_is_uppercased_and_trimmed() {
        assert_eq!(normalize_room_code("  ab12cd").unwrap(), "AB12CD");
        assert_eq!(
            normalize_room_code("AB12C"),
            Err(ValidationError::InvalidRoomCode)
        );
        assert_eq!(
            normalize_room_code("AB-2CD"),
            Err(ValidationError::InvalidRoomCode)
        );
    }

    #[test]
    fn username_bounds() {
        assert_eq!(normalize_username("  Al "), Ok("Al".to_string()));
        assert_eq!(normalize_username("   "), Err(ValidationError::EmptyUsername));
        assert!(matches!(
            normalize_username("A"),
            Err(ValidationError::UsernameLength { .. })
        ));
        assert!(normalize_username(&"x".repeat(21)).is_err());
        assert!(normalize_username(&"x".repeat(20)).is_ok());
    }

    #[test]
    fn stroke_validation() {
        let ok = StrokeEvent::Dot {
            x: 1.0,
            y: 2.0,
            color: "#FFF".into(),
            size: 3.0,
        };
        assert!(ok.validate().is_ok());

        let bad_color = StrokeEvent::Dot {
            x: 1.0,
            y: 2.0,
            color: "red".into(),
            size: 3.0,
        };
        assert!(bad_color.validate().is_err());

        let bad_size = StrokeEvent::Line {
            x1: 0.0,
            y1: 0.0,
            x2: 1.0,
            y2: 1.0,
            color: "#000000".into(),
            size: 0.0,
        };
        assert!(bad_size.validate().is_err());

        let nan = StrokeEvent::Dot {
            x: f64::NAN,
            y: 0.0,
            color: "#000000".into(),
            size: 1.0,
        };
        assert!(nan.validate().is_err());
    }

    #[test]
    fn draw_frame_flattens_stroke_next_to_room_code() {
        let msg = ClientMessage::Draw(DrawPayload {
            room_code: "AB12CD".into(),
            stroke: StrokeEvent::Dot {
                x: 10.0,
                y: 20.0,
                color: "#000000".into(),
                size: 3.0,
            },
        });
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["event"], "draw");
        assert_eq!(value["data"]["room_code"], "AB12CD");
        assert_eq!(value["data"]["type"], "dot");
        assert_eq!(value["data"]["x"], 10.0);
    }

    #[test]
    fn guess_text_uses_guess_key() {
        let msg = ClientMessage::Guess {
            room_code: "AB12CD".into(),
            text: "cat".into(),
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["data"]["guess"], "cat");
    }

    #[test]
    fn clear_canvas_accepts_empty_payload() {
        let msg: ServerMessage =
            serde_json::from_str(r#"{"event":"clear_canvas","data":{}}"#).unwrap();
        assert_eq!(msg, ServerMessage::ClearCanvas {});
        assert_eq!(msg.name(), "clear_canvas");
    }
}
