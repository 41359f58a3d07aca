//! # Scribble Client
//!
//! Client session state machine and sync protocol for a multiplayer
//! drawing-and-guessing game.
//!
//! A relay server owns all authoritative state. This crate mirrors it,
//! predicts it where the UI needs an answer before the relay replies, and
//! reconciles it across reconnects through a small persisted snapshot.
//!
//! ## Features
//!
//! - **Transport-agnostic**: implement [`Transport`] and [`Connector`] for any backend
//! - **WebSocket built-in**: `transport-websocket` provides `WebSocketTransport`
//! - **TCP fallback**: `transport-tcp` provides newline-delimited JSON framing
//! - **Automatic rejoin**: a lost connection reconnects and rejoins the room
//! - **Event-driven**: the UI receives typed [`SessionEvent`]s
//!
//! ## Layout
//!
//! | Module          | Role                                              |
//! |-----------------|---------------------------------------------------|
//! | [`connection`]  | transport lifecycle, reconnect and rejoin         |
//! | [`store`]       | mirror of room, membership and turn state         |
//! | [`persistence`] | snapshot that survives reloads                    |
//! | [`turn`]        | whose turn it is and what this client may do      |
//! | [`draw`]        | stroke relay between input, canvas and relay      |
//! | [`timer`]       | locally ticking, relay-corrected countdown        |
//! | [`scoreboard`]  | ordered leaderboard and winners                   |
//! | [`session`]     | all of the above behind one dispatch point        |
//! | [`client`]      | async driver tying the session to a connection    |

pub mod config;
pub mod draw;
pub mod error;
pub mod event;
pub mod persistence;
pub mod protocol;
pub mod scoreboard;
pub mod session;
pub mod store;
pub mod timer;
pub mod transport;
pub mod transports;
pub mod turn;

#[cfg(feature = "tokio-runtime")]
pub mod client;
#[cfg(feature = "tokio-runtime")]
pub mod connection;

pub use config::ClientConfig;
pub use draw::{Canvas, DrawRelay, StrokeLog};
pub use error::{ScribbleError, ValidationError};
pub use event::{NotificationLevel, PageContext, SessionEvent};
pub use persistence::{PersistedSnapshot, PersistenceBridge, SnapshotStore};
pub use protocol::{ClientMessage, ServerMessage, StrokeEvent};
pub use scoreboard::{compute_winners, ScoreboardSync};
pub use session::Session;
pub use store::{SessionStore, SessionView};
pub use timer::TimerSync;
pub use transport::{Connector, Transport};
pub use transports::FallbackConnector;
pub use turn::{TurnPhase, TurnStateMachine};

#[cfg(feature = "transport-tcp")]
pub use transports::{LineConnector, LineTransport};
#[cfg(feature = "transport-websocket")]
pub use transports::{WebSocketConnector, WebSocketTransport};

#[cfg(feature = "tokio-runtime")]
pub use client::GameClient;
#[cfg(feature = "tokio-runtime")]
pub use connection::{ConnectionConfig, ConnectionEvent, ConnectionManager};
