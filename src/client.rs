//! Async driver that owns the session and talks to the relay.
//!
//! [`GameClient`] puts three inputs on one path: connection events from the
//! background [`ConnectionManager`] loop, a one-second tick for the local
//! countdowns, and the local input methods. They all take `&mut self`, so
//! session state is only ever touched from the caller's task.
//!
//! # Example
//!
//! ```rust,no_run
//! use scribble_client::client::GameClient;
//! use scribble_client::config::ClientConfig;
//! use scribble_client::event::SessionEvent;
//!
//! # async fn run() -> scribble_client::error::Result<()> {
//! let mut client = GameClient::connect(&ClientConfig::from_env());
//!
//! while let Some(event) = client.next_event().await {
//!     match event {
//!         SessionEvent::Connected => client.create_room("Alice")?,
//!         SessionEvent::RoomCreated { room_code, .. } => println!("share {room_code}"),
//!         SessionEvent::ConnectionFailed { .. } => break,
//!         _ => {}
//!     }
//! }
//! client.shutdown().await;
//! # Ok(())
//! # }
//! ```

use std::collections::VecDeque;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::connection::{ConnectionEvent, ConnectionManager, RejoinSource};
use crate::draw::{Canvas, DrawRelay, StrokeLog};
use crate::error::{Result, ScribbleError};
use crate::event::{PageContext, SessionEvent};
use crate::protocol::{ClientMessage, ConnectionId, StrokeEvent};
use crate::session::Session;
use crate::store::SessionView;
use crate::transport::Connector;

/// Period of the local countdown tick.
const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Client handle for one player.
pub struct GameClient<C: Canvas = StrokeLog> {
    session: Session<C>,
    connection: ConnectionManager,
    events: mpsc::Receiver<ConnectionEvent>,
    ticker: Interval,
    pending: VecDeque<SessionEvent>,
    /// Set once an unrelayed stroke was reported, until a stroke goes out again.
    stroke_warned: bool,
    finished: bool,
}

#[cfg(feature = "transport-websocket")]
impl GameClient<StrokeLog> {
    /// Connect to `config.server_url` over WebSocket.
    ///
    /// With a `fallback_addr`, each connection attempt that cannot reach the
    /// WebSocket endpoint falls back to newline-delimited JSON over TCP.
    /// Must be called inside a Tokio runtime.
    #[cfg(feature = "transport-tcp")]
    pub fn connect(config: &ClientConfig) -> Self {
        use crate::transports::{FallbackConnector, LineConnector, WebSocketConnector};

        let primary = WebSocketConnector::new(config.server_url.clone());
        match &config.fallback_addr {
            Some(addr) => {
                let connector = FallbackConnector::new(primary, LineConnector::new(addr.clone()));
                Self::start(connector, StrokeLog::new(), config)
            }
            None => Self::start(primary, StrokeLog::new(), config),
        }
    }

    /// Connect to `config.server_url` over WebSocket.
    ///
    /// Must be called inside a Tokio runtime.
    #[cfg(not(feature = "transport-tcp"))]
    pub fn connect(config: &ClientConfig) -> Self {
        if config.fallback_addr.is_some() {
            warn!("fallback address ignored without the transport-tcp feature");
        }
        let primary = crate::transports::WebSocketConnector::new(config.server_url.clone());
        Self::start(primary, StrokeLog::new(), config)
    }
}

impl<C: Canvas> GameClient<C> {
    /// Start a client over any [`Connector`], drawing into `canvas`.
    ///
    /// If the configured page needs a room, the persisted snapshot is shown
    /// provisionally and the first connect rejoins it.
    pub fn start(connector: impl Connector, canvas: C, config: &ClientConfig) -> Self {
        let persistence = config.persistence();
        let mut session = Session::new(canvas, persistence.clone(), config.page)
            .with_turn_duration(config.turn_duration);
        let pending: VecDeque<_> = session.restore_provisional().into();

        let rejoin = RejoinSource::new(session.page_receiver(), persistence);
        let (connection, events) =
            ConnectionManager::connect(connector, config.connection_config(), rejoin);

        let mut ticker = tokio::time::interval_at(Instant::now() + TICK_PERIOD, TICK_PERIOD);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        Self {
            session,
            connection,
            events,
            ticker,
            pending,
            stroke_warned: false,
            finished: false,
        }
    }

    /// Wait for the next UI event.
    ///
    /// Returns `None` once the connection loop has exited, either after
    /// [`shutdown`](Self::shutdown) or after reconnecting gave up.
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Some(event);
            }
            if self.finished {
                return None;
            }
            tokio::select! {
                event = self.events.recv() => match event {
                    Some(event) => {
                        let out = self.on_connection_event(event);
                        self.pending.extend(out);
                    }
                    None => {
                        debug!("connection events closed");
                        self.finished = true;
                    }
                },
                _ = self.ticker.tick() => {
                    let out = self.session.tick();
                    self.pending.extend(out);
                }
            }
        }
    }

    fn on_connection_event(&mut self, event: ConnectionEvent) -> Vec<SessionEvent> {
        match event {
            ConnectionEvent::Connected => self.session.on_connected(),
            ConnectionEvent::Rejoining {
                room_code,
                username,
            } => self.session.on_rejoining(&room_code, username),
            ConnectionEvent::Message(msg) => self.session.handle_message(msg),
            ConnectionEvent::Disconnected { reason } => self.session.on_disconnected(reason),
            ConnectionEvent::Reconnecting {
                attempt,
                max_attempts,
            } => self.session.on_reconnecting(attempt, max_attempts),
            ConnectionEvent::ConnectionFailed { attempts } => {
                self.session.on_connection_failed(attempts)
            }
        }
    }

    // ── Local input ─────────────────────────────────────────────────

    /// # Errors
    ///
    /// Returns a validation error for a bad username, or
    /// [`ScribbleError::NotConnected`].
    pub fn create_room(&mut self, username: &str) -> Result<()> {
        let built = self.session.create_room(username);
        self.dispatch(built)
    }

    /// # Errors
    ///
    /// Returns a validation error for a bad room code or username, or
    /// [`ScribbleError::NotConnected`].
    pub fn join_room(&mut self, room_code: &str, username: &str) -> Result<()> {
        let built = self.session.join_room(room_code, username);
        self.dispatch(built)
    }

    /// # Errors
    ///
    /// Fails outside a room, for anyone but the host, or while disconnected.
    pub fn start_game(&mut self) -> Result<()> {
        let built = self.session.start_game();
        self.dispatch(built)
    }

    /// # Errors
    ///
    /// Fails outside a room, for the drawer, after a correct guess, or
    /// while disconnected.
    pub fn guess(&mut self, text: &str) -> Result<()> {
        let built = self.session.guess(text);
        self.dispatch(built)
    }

    /// # Errors
    ///
    /// Fails outside a room, for a blank message, or while disconnected.
    pub fn chat(&mut self, message: &str) -> Result<()> {
        let built = self.session.chat(message);
        self.dispatch(built)
    }

    /// # Errors
    ///
    /// Fails outside a room, for a blank emoji, or while disconnected.
    pub fn react(&mut self, emoji: &str, x: f64, y: f64) -> Result<()> {
        let built = self.session.react(emoji, x, y);
        self.dispatch(built)
    }

    /// Render and relay a stroke. Returns `true` if the stroke was accepted.
    pub fn submit_stroke(&mut self, stroke: StrokeEvent) -> bool {
        let built = self.session.submit_stroke(stroke);
        self.relay(built)
    }

    pub fn pointer_down(&mut self, x: f64, y: f64) -> bool {
        let built = self.session.pointer_down(x, y);
        self.relay(built)
    }

    pub fn pointer_move(&mut self, x: f64, y: f64) -> bool {
        let built = self.session.pointer_move(x, y);
        self.relay(built)
    }

    pub fn pointer_up(&mut self) {
        self.session.pointer_up();
    }

    /// Wipe and relay a clear. Returns `true` if this client may clear.
    pub fn clear_canvas(&mut self) -> bool {
        let built = self.session.clear_canvas();
        self.relay(built)
    }

    // ── State ───────────────────────────────────────────────────────

    pub fn view(&self) -> &SessionView {
        self.session.view()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionView> {
        self.session.subscribe()
    }

    pub fn session(&self) -> &Session<C> {
        &self.session
    }

    /// Brush, geometry and canvas access.
    pub fn draw_mut(&mut self) -> &mut DrawRelay<C> {
        self.session.draw_mut()
    }

    pub fn page(&self) -> PageContext {
        self.session.page()
    }

    /// The UI switched pages. Decides what the next reconnect rejoins.
    pub fn set_page(&mut self, page: PageContext) {
        self.session.set_page(page);
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }

    pub async fn connection_id(&self) -> Option<ConnectionId> {
        self.connection.connection_id().await
    }

    /// Close the transport and stop reconnecting.
    pub async fn shutdown(&mut self) {
        self.connection.shutdown().await;
    }

    fn dispatch(&mut self, built: Result<ClientMessage>) -> Result<()> {
        let sent = built.and_then(|msg| self.connection.send(msg));
        if let Err(e) = &sent {
            self.pending.push_back(SessionEvent::warning(send_notice(e)));
        }
        sent
    }

    /// Strokes stay on the local canvas even when they cannot be relayed.
    /// One warning covers a run of failed strokes.
    fn relay(&mut self, built: Option<ClientMessage>) -> bool {
        let Some(msg) = built else {
            return false;
        };
        match self.connection.send(msg) {
            Ok(()) => self.stroke_warned = false,
            Err(e) => {
                warn!(error = %e, "stroke rendered locally but not relayed");
                if !self.stroke_warned {
                    self.stroke_warned = true;
                    self.pending.push_back(SessionEvent::warning(send_notice(&e)));
                }
            }
        }
        true
    }
}

fn send_notice(err: &ScribbleError) -> String {
    match err {
        ScribbleError::NotConnected => "Not connected to server".to_string(),
        other => other.to_string(),
    }
}

impl<C: Canvas> std::fmt::Debug for GameClient<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameClient")
            .field("connection", &self.connection)
            .field("page", &self.session.page())
            .field("phase", &self.session.turn().phase())
            .field("pending", &self.pending.len())
            .finish()
    }
}
