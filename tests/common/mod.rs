#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing,
    dead_code
)]
//! Shared test utilities for scribble-client integration tests.
//!
//! Provides a scripted [`MockTransport`], a [`MockConnector`] that hands out
//! one scripted transport per connection attempt, and helpers that build
//! relay frames as JSON strings.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use scribble_client::protocol::{
    GameStateInfo, GameStateUpdate, LeaderboardEntry, PlayerInfo, RoomInfo, ServerMessage,
    StrokeEvent,
};
use scribble_client::transport::{BoxedTransport, Connector};
use scribble_client::{ClientMessage, ScribbleError, Transport};

/// One scripted `recv()` result. `None` means the relay closed the socket.
pub type Scripted = Option<Result<String, ScribbleError>>;

// ── MockTransport ───────────────────────────────────────────────────

/// A scripted transport.
///
/// Scripted relay frames are consumed in order by `recv()`. Once the script
/// runs out, `recv()` pends forever so the session stays up until shutdown.
/// Every frame the client sends is recorded in `sent`.
pub struct MockTransport {
    incoming: VecDeque<Scripted>,
    pub sent: Arc<StdMutex<Vec<String>>>,
    pub closed: Arc<AtomicBool>,
}

impl MockTransport {
    pub fn new(incoming: Vec<Scripted>) -> (Self, Arc<StdMutex<Vec<String>>>, Arc<AtomicBool>) {
        let sent = Arc::new(StdMutex::new(Vec::new()));
        let closed = Arc::new(AtomicBool::new(false));
        let transport = Self {
            incoming: VecDeque::from(incoming),
            sent: Arc::clone(&sent),
            closed: Arc::clone(&closed),
        };
        (transport, sent, closed)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&mut self, message: String) -> Result<(), ScribbleError> {
        self.sent.lock().unwrap().push(message);
        Ok(())
    }

    async fn recv(&mut self) -> Option<Result<String, ScribbleError>> {
        match self.incoming.pop_front() {
            Some(item) => item,
            None => std::future::pending().await,
        }
    }

    async fn close(&mut self) -> Result<(), ScribbleError> {
        self.closed.store(true, Ordering::Relaxed);
        Ok(())
    }
}

// ── MockConnector ───────────────────────────────────────────────────

/// Hands out one scripted [`MockTransport`] per successful connect.
///
/// All transports record into the same `sent` log. When the scripts run out
/// every further attempt fails, which drives the reconnect policy.
pub struct MockConnector {
    scripts: StdMutex<VecDeque<Vec<Scripted>>>,
    sent: Arc<StdMutex<Vec<String>>>,
    attempts: Arc<AtomicUsize>,
}

/// Handles for inspecting a [`MockConnector`] after it was moved into a client.
#[derive(Clone)]
pub struct ConnectorProbe {
    pub sent: Arc<StdMutex<Vec<String>>>,
    pub attempts: Arc<AtomicUsize>,
}

impl ConnectorProbe {
    /// Every frame sent so far, decoded.
    pub fn sent_messages(&self) -> Vec<ClientMessage> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|raw| serde_json::from_str(raw).expect("client frame parses"))
            .collect()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl MockConnector {
    pub fn new(scripts: Vec<Vec<Scripted>>) -> (Self, ConnectorProbe) {
        let sent = Arc::new(StdMutex::new(Vec::new()));
        let attempts = Arc::new(AtomicUsize::new(0));
        let connector = Self {
            scripts: StdMutex::new(VecDeque::from(scripts)),
            sent: Arc::clone(&sent),
            attempts: Arc::clone(&attempts),
        };
        (connector, ConnectorProbe { sent, attempts })
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self) -> Result<BoxedTransport, ScribbleError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let script = self.scripts.lock().unwrap().pop_front();
        match script {
            Some(incoming) => Ok(Box::new(MockTransport {
                incoming: VecDeque::from(incoming),
                sent: Arc::clone(&self.sent),
                closed: Arc::new(AtomicBool::new(false)),
            })),
            None => Err(ScribbleError::TransportReceive("connection refused".into())),
        }
    }
}

// ── Builders ────────────────────────────────────────────────────────

pub fn player(sid: &str, username: &str, score: u32) -> PlayerInfo {
    PlayerInfo {
        sid: sid.into(),
        username: username.into(),
        score,
        has_guessed: false,
    }
}

pub fn entry(sid: &str, username: &str, score: u32) -> LeaderboardEntry {
    LeaderboardEntry {
        sid: sid.into(),
        username: username.into(),
        score,
    }
}

pub fn room(code: &str, host_sid: &str, players: Vec<PlayerInfo>) -> RoomInfo {
    RoomInfo {
        room_code: code.into(),
        host_sid: host_sid.into(),
        player_count: u32::try_from(players.len()).ok(),
        players,
        game_started: false,
    }
}

pub fn dot(x: f64, y: f64) -> StrokeEvent {
    StrokeEvent::Dot {
        x,
        y,
        color: "#000000".into(),
        size: 3.0,
    }
}

pub fn line(x1: f64, y1: f64, x2: f64, y2: f64) -> StrokeEvent {
    StrokeEvent::Line {
        x1,
        y1,
        x2,
        y2,
        color: "#FF0000".into(),
        size: 5.0,
    }
}

// ── Relay messages ──────────────────────────────────────────────────

pub fn connected(sid: &str) -> ServerMessage {
    ServerMessage::Connected { sid: sid.into() }
}

pub fn room_created(code: &str, host_sid: &str, players: Vec<PlayerInfo>) -> ServerMessage {
    ServerMessage::RoomCreated {
        room_code: code.into(),
        room: room(code, host_sid, players),
    }
}

pub fn room_joined(code: &str, host_sid: &str, players: Vec<PlayerInfo>) -> ServerMessage {
    ServerMessage::RoomJoined {
        room_code: code.into(),
        room: room(code, host_sid, players),
    }
}

pub fn game_started(drawer_sid: &str) -> ServerMessage {
    ServerMessage::GameStarted {
        drawer_sid: drawer_sid.into(),
        drawer_username: None,
        game_state: Some(GameStateInfo {
            current_round: Some(1),
            total_rounds: Some(3),
            drawer_sid: Some(drawer_sid.into()),
            time_remaining: Some(60),
            game_active: true,
            ..GameStateInfo::default()
        }),
    }
}

pub fn new_turn(drawer_sid: &str) -> ServerMessage {
    ServerMessage::NewTurn {
        drawer_sid: drawer_sid.into(),
        drawer_username: None,
        category: None,
        word_length: None,
        game_state: None,
    }
}

pub fn new_turn_with_length(drawer_sid: &str, category: &str, word_length: u32) -> ServerMessage {
    ServerMessage::NewTurn {
        drawer_sid: drawer_sid.into(),
        drawer_username: None,
        category: Some(category.into()),
        word_length: Some(word_length),
        game_state: None,
    }
}

pub fn your_turn(word: &str, category: &str) -> ServerMessage {
    ServerMessage::YourTurnToDraw {
        word: word.into(),
        category: category.into(),
    }
}

pub fn timer_update(seconds: u32) -> ServerMessage {
    ServerMessage::TimerUpdate {
        time_remaining: seconds,
    }
}

pub fn turn_ended(word: &str, leaderboard: Vec<LeaderboardEntry>) -> ServerMessage {
    ServerMessage::TurnEnded {
        word: word.into(),
        leaderboard,
    }
}

pub fn game_ended(final_leaderboard: Vec<LeaderboardEntry>) -> ServerMessage {
    ServerMessage::GameEnded {
        final_leaderboard,
        winners: Vec::new(),
    }
}

pub fn game_state_update(drawer_sid: &str, drawer: &str, word: Option<&str>) -> ServerMessage {
    ServerMessage::GameStateUpdate(GameStateUpdate {
        current_drawer: Some(drawer.into()),
        drawer_sid: Some(drawer_sid.into()),
        word: word.map(Into::into),
        category: Some("animals".into()),
        current_round: Some(2),
        word_length: None,
        time_remaining: Some(42),
    })
}

pub fn correct_guess(username: &str, points: u32, leaderboard: Vec<LeaderboardEntry>) -> ServerMessage {
    ServerMessage::CorrectGuess {
        username: username.into(),
        points,
        leaderboard,
        sid: None,
    }
}

/// Serialize a relay message as the JSON frame a transport would carry.
pub fn frame(msg: &ServerMessage) -> Scripted {
    Some(Ok(serde_json::to_string(msg).expect("server frame serialization")))
}
