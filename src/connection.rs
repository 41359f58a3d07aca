//! Transport session lifecycle: connect, rejoin, reconnect.
//!
//! [`ConnectionManager`] is a thin handle to a background loop that owns the
//! transport. Outbound frames go over an unbounded MPSC channel; everything
//! the loop observes comes back as [`ConnectionEvent`]s on a bounded channel.
//!
//! After every successful connect, including the first, the loop looks at
//! the current [`PageContext`]. If the page needs a room and a usable
//! snapshot exists, `join_room` (plus `get_game_state` on the game page) is
//! written before any queued command or inbound frame is handled.
//!
//! A lost transport is retried after a fixed delay, up to a bounded number
//! of attempts. When they run out the loop emits
//! [`ConnectionEvent::ConnectionFailed`] and exits.
//!
//! # Example
//!
//! ```rust,ignore
//! let (page_tx, page_rx) = tokio::sync::watch::channel(PageContext::Home);
//! let rejoin = RejoinSource::new(page_rx, PersistenceBridge::in_memory());
//! let (manager, mut events) =
//!     ConnectionManager::connect(connector, ConnectionConfig::default(), rejoin);
//!
//! while let Some(event) = events.recv().await {
//!     if let ConnectionEvent::ConnectionFailed { .. } = event {
//!         break;
//!     }
//! }
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch, Mutex};
use tracing::{debug, error, info, warn};

use crate::error::{Result, ScribbleError};
use crate::event::PageContext;
use crate::persistence::{PersistedSnapshot, PersistenceBridge};
use crate::protocol::{ClientMessage, ConnectionId, ServerMessage};
use crate::transport::{BoxedTransport, Connector};

/// Default delay between reconnect attempts.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(1000);

/// Default number of reconnect attempts before giving up.
pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 5;

/// Default capacity of the bounded event channel.
const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 256;

/// Default timeout for the graceful shutdown.
const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

// ── Configuration ───────────────────────────────────────────────────

/// Tuning for a [`ConnectionManager`].
///
/// ```
/// use scribble_client::connection::ConnectionConfig;
/// use std::time::Duration;
///
/// let config = ConnectionConfig::default()
///     .with_reconnect_delay(Duration::from_millis(250))
///     .with_max_reconnect_attempts(3);
/// assert_eq!(config.max_reconnect_attempts, 3);
/// ```
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Fixed wait before each reconnect attempt. Defaults to **1 second**.
    pub reconnect_delay: Duration,
    /// Reconnect attempts after a loss (or a failed first connect) before
    /// the terminal `ConnectionFailed`. Defaults to **5**. Zero disables
    /// reconnecting.
    pub max_reconnect_attempts: u32,
    /// Capacity of the bounded event channel.
    ///
    /// When the consumer falls behind, relayed strokes are dropped with a
    /// warning. Every other relay frame, `Disconnected` and
    /// `ConnectionFailed` wait for capacity.
    ///
    /// Defaults to **256**. Values below 1 are clamped to 1.
    pub event_channel_capacity: usize,
    /// How long [`ConnectionManager::shutdown`] waits for the loop to close
    /// the transport before aborting it. Defaults to **1 second**.
    pub shutdown_timeout: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }
}

impl ConnectionConfig {
    #[must_use]
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    #[must_use]
    pub fn with_max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.max_reconnect_attempts = attempts;
        self
    }

    /// Values below 1 are clamped to 1.
    #[must_use]
    pub fn with_event_channel_capacity(mut self, capacity: usize) -> Self {
        self.event_channel_capacity = capacity.max(1);
        self
    }

    #[must_use]
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }
}

// ── Events ──────────────────────────────────────────────────────────

/// What the connection loop observed.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionEvent {
    /// A transport session is up. The relay has not assigned an id yet.
    Connected,
    /// A rejoin was written as the first frames of this session.
    Rejoining { room_code: String, username: String },
    /// A decoded frame from the relay.
    Message(ServerMessage),
    /// The transport session ended.
    Disconnected { reason: Option<String> },
    /// About to wait and retry.
    Reconnecting { attempt: u32, max_attempts: u32 },
    /// Terminal. No further events follow.
    ConnectionFailed { attempts: u32 },
}

// ── Rejoin ──────────────────────────────────────────────────────────

/// Where the loop reads the rejoin decision from.
#[derive(Debug, Clone)]
pub struct RejoinSource {
    page: watch::Receiver<PageContext>,
    persistence: PersistenceBridge,
}

impl RejoinSource {
    pub fn new(page: watch::Receiver<PageContext>, persistence: PersistenceBridge) -> Self {
        Self { page, persistence }
    }

    /// Frames to write first on a fresh transport, with the snapshot they
    /// came from.
    fn plan(&self) -> Option<(PersistedSnapshot, Vec<ClientMessage>)> {
        let page = *self.page.borrow();
        if !page.requires_room() {
            return None;
        }
        let Some(snapshot) = self.persistence.rejoin_target() else {
            debug!(?page, "no usable snapshot, skipping rejoin");
            return None;
        };
        let mut frames = vec![ClientMessage::JoinRoom {
            room_code: snapshot.room_code.clone(),
            username: snapshot.username.clone(),
        }];
        if page == PageContext::Game {
            frames.push(ClientMessage::GetGameState {
                room_code: snapshot.room_code.clone(),
            });
        }
        Some((snapshot, frames))
    }
}

// ── Shared state ────────────────────────────────────────────────────

struct ConnectionState {
    connected: AtomicBool,
    connection_id: Mutex<Option<ConnectionId>>,
}

impl ConnectionState {
    fn new() -> Self {
        Self {
            connected: AtomicBool::new(false),
            connection_id: Mutex::new(None),
        }
    }
}

// ── Handle ──────────────────────────────────────────────────────────

/// Handle to the background connection loop.
///
/// Sends are fire-and-forget: they return once the frame is queued. Replies
/// arrive later as independent [`ConnectionEvent::Message`]s.
pub struct ConnectionManager {
    cmd_tx: mpsc::UnboundedSender<ClientMessage>,
    state: Arc<ConnectionState>,
    task: Option<tokio::task::JoinHandle<()>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    shutdown_timeout: Duration,
}

impl ConnectionManager {
    /// Spawn the connection loop and return its handle plus event receiver.
    ///
    /// The first connection attempt starts immediately.
    #[must_use = "the event receiver must be used to receive events"]
    pub fn connect(
        connector: impl Connector,
        config: ConnectionConfig,
        rejoin: RejoinSource,
    ) -> (Self, mpsc::Receiver<ConnectionEvent>) {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<ClientMessage>();
        // tokio panics on a zero-capacity channel.
        let capacity = config.event_channel_capacity.max(1);
        let (event_tx, event_rx) = mpsc::channel::<ConnectionEvent>(capacity);
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let state = Arc::new(ConnectionState::new());
        let shutdown_timeout = config.shutdown_timeout;

        let task = tokio::spawn(connection_loop(
            connector,
            LoopChannels {
                cmd_rx,
                event_tx,
                shutdown_rx,
            },
            Arc::clone(&state),
            config,
            rejoin,
        ));

        let manager = Self {
            cmd_tx,
            state,
            task: Some(task),
            shutdown_tx: Some(shutdown_tx),
            shutdown_timeout,
        };
        (manager, event_rx)
    }

    /// Queue a frame for the relay.
    ///
    /// # Errors
    ///
    /// Returns [`ScribbleError::NotConnected`] while no transport is live.
    pub fn send(&self, msg: ClientMessage) -> Result<()> {
        if !self.is_connected() {
            return Err(ScribbleError::NotConnected);
        }
        self.cmd_tx
            .send(msg)
            .map_err(|_| ScribbleError::NotConnected)
    }

    /// Returns `true` while a transport session is live.
    pub fn is_connected(&self) -> bool {
        self.state.connected.load(Ordering::Acquire)
    }

    /// Id the relay assigned to the current transport session.
    pub async fn connection_id(&self) -> Option<ConnectionId> {
        self.state.connection_id.lock().await.clone()
    }

    /// Stop the loop, closing the transport.
    ///
    /// The event receiver yields `None` once the loop has exited.
    pub async fn shutdown(&mut self) {
        debug!("connection shutdown requested");

        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        if let Some(mut task) = self.task.take() {
            match tokio::time::timeout(self.shutdown_timeout, &mut task).await {
                Ok(Ok(())) => {}
                Ok(Err(join_err)) => {
                    warn!("connection loop terminated with join error: {join_err}");
                }
                Err(_) => {
                    warn!("connection loop did not exit within timeout; aborting task");
                    task.abort();
                    if let Err(join_err) = task.await {
                        debug!("connection loop aborted: {join_err}");
                    }
                }
            }
        }

        self.state.connected.store(false, Ordering::Release);
    }
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("connected", &self.is_connected())
            .field("has_task", &self.task.is_some())
            .finish()
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        // No executor to drive a graceful close from a synchronous drop.
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

// ── Connection loop ─────────────────────────────────────────────────

struct LoopChannels {
    cmd_rx: mpsc::UnboundedReceiver<ClientMessage>,
    event_tx: mpsc::Sender<ConnectionEvent>,
    shutdown_rx: oneshot::Receiver<()>,
}

impl LoopChannels {
    /// Emit an event that carries relay state, waiting for channel capacity.
    ///
    /// Returns `false` if shutdown was requested while waiting.
    async fn deliver(&mut self, event: ConnectionEvent) -> bool {
        tokio::select! {
            sent = self.event_tx.send(event) => {
                if sent.is_err() {
                    debug!("event channel closed, receiver dropped");
                }
                true
            }
            _ = &mut self.shutdown_rx => {
                debug!("shutdown signal received while delivering an event");
                false
            }
        }
    }
}

/// How a live transport session ended.
enum SessionEnd {
    /// Shutdown was requested or the handle went away.
    Stopped,
    /// The transport failed or the relay closed it.
    Lost(Option<String>),
}

/// Connect, run one session, and retry until stopped or out of attempts.
async fn connection_loop(
    connector: impl Connector,
    mut channels: LoopChannels,
    state: Arc<ConnectionState>,
    config: ConnectionConfig,
    rejoin: RejoinSource,
) {
    debug!("connection loop started");
    let max_attempts = config.max_reconnect_attempts;
    let mut attempt: u32 = 0;

    loop {
        if attempt > 0 {
            if attempt > max_attempts {
                error!(attempts = max_attempts, "giving up on the relay");
                let event = ConnectionEvent::ConnectionFailed {
                    attempts: max_attempts,
                };
                if channels.event_tx.send(event).await.is_err() {
                    debug!("event channel closed, receiver dropped");
                }
                break;
            }
            emit_event(
                &channels.event_tx,
                ConnectionEvent::Reconnecting {
                    attempt,
                    max_attempts,
                },
            );
            tokio::select! {
                () = tokio::time::sleep(config.reconnect_delay) => {}
                _ = &mut channels.shutdown_rx => {
                    debug!("shutdown signal received while waiting to reconnect");
                    break;
                }
            }
        }

        let connected = tokio::select! {
            res = connector.connect() => res,
            _ = &mut channels.shutdown_rx => {
                debug!("shutdown signal received while connecting");
                break;
            }
        };

        let mut transport = match connected {
            Ok(transport) => transport,
            Err(e) => {
                error!(error = %e, attempt, "connection attempt failed");
                attempt += 1;
                continue;
            }
        };
        attempt = 0;

        match run_session(&mut transport, &mut channels, &state, &rejoin).await {
            SessionEnd::Stopped => {
                let _ = transport.close().await;
                emit_disconnected(
                    &channels.event_tx,
                    &state,
                    Some("client shut down".into()),
                )
                .await;
                break;
            }
            SessionEnd::Lost(reason) => {
                emit_disconnected(&channels.event_tx, &state, reason).await;
                let mut dropped = 0usize;
                while channels.cmd_rx.try_recv().is_ok() {
                    dropped += 1;
                }
                if dropped > 0 {
                    debug!(dropped, "discarded frames queued for the lost transport");
                }
                attempt = 1;
            }
        }
    }

    state.connected.store(false, Ordering::Release);
    debug!("connection loop exited");
}

/// Drive one live transport session until it ends.
async fn run_session(
    transport: &mut BoxedTransport,
    channels: &mut LoopChannels,
    state: &ConnectionState,
    rejoin: &RejoinSource,
) -> SessionEnd {
    *state.connection_id.lock().await = None;
    state.connected.store(true, Ordering::Release);
    info!("connected to relay");
    if !channels.deliver(ConnectionEvent::Connected).await {
        return SessionEnd::Stopped;
    }

    if let Some((snapshot, frames)) = rejoin.plan() {
        info!(room_code = %snapshot.room_code, "rejoining room");
        for frame in frames {
            if let Err(e) = send_frame(transport, &frame).await {
                return SessionEnd::Lost(Some(format!("transport send error: {e}")));
            }
        }
        let rejoining = ConnectionEvent::Rejoining {
            room_code: snapshot.room_code,
            username: snapshot.username,
        };
        if !channels.deliver(rejoining).await {
            return SessionEnd::Stopped;
        }
    }

    loop {
        tokio::select! {
            cmd = channels.cmd_rx.recv() => {
                let Some(msg) = cmd else {
                    debug!("command channel closed, stopping connection loop");
                    return SessionEnd::Stopped;
                };
                if let Err(e) = send_frame(transport, &msg).await {
                    return SessionEnd::Lost(Some(format!("transport send error: {e}")));
                }
            }

            _ = &mut channels.shutdown_rx => {
                debug!("shutdown signal received");
                return SessionEnd::Stopped;
            }

            incoming = transport.recv() => {
                match incoming {
                    Some(Ok(text)) => match serde_json::from_str::<ServerMessage>(&text) {
                        // Strokes are the only frames that may be shed under load.
                        Ok(msg @ ServerMessage::Draw(_)) => {
                            emit_event(&channels.event_tx, ConnectionEvent::Message(msg));
                        }
                        Ok(msg) => {
                            if let ServerMessage::Connected { sid } = &msg {
                                debug!(connection_id = %sid, "identity assigned");
                                *state.connection_id.lock().await = Some(sid.clone());
                            }
                            if !channels.deliver(ConnectionEvent::Message(msg)).await {
                                return SessionEnd::Stopped;
                            }
                        }
                        Err(e) => {
                            warn!("dropping malformed frame: {e} (raw: {text})");
                        }
                    },
                    Some(Err(e)) => {
                        error!("transport receive error: {e}");
                        return SessionEnd::Lost(Some(format!("transport receive error: {e}")));
                    }
                    None => {
                        debug!("transport closed by relay");
                        return SessionEnd::Lost(None);
                    }
                }
            }
        }
    }
}

async fn send_frame(transport: &mut BoxedTransport, msg: &ClientMessage) -> Result<()> {
    let json = match serde_json::to_string(msg) {
        Ok(json) => json,
        Err(e) => {
            // Dropped; the session stays up.
            error!(event = msg.name(), "failed to serialize frame: {e}");
            return Ok(());
        }
    };
    debug!(event = msg.name(), "sending frame");
    transport.send(json).await.map_err(|e| {
        error!("transport send error: {e}");
        e
    })
}

/// Emit an event without blocking. A full channel drops the event.
fn emit_event(event_tx: &mpsc::Sender<ConnectionEvent>, event: ConnectionEvent) {
    match event_tx.try_send(event) {
        Ok(()) => {}
        Err(mpsc::error::TrySendError::Full(dropped)) => {
            warn!(
                "event channel full, dropping event: {:?}",
                std::mem::discriminant(&dropped)
            );
        }
        Err(mpsc::error::TrySendError::Closed(_)) => {
            debug!("event channel closed, receiver dropped");
        }
    }
}

/// Emit [`ConnectionEvent::Disconnected`] and clear the live flags.
///
/// Waits for channel capacity: a disconnect must never be dropped.
async fn emit_disconnected(
    event_tx: &mpsc::Sender<ConnectionEvent>,
    state: &ConnectionState,
    reason: Option<String>,
) {
    state.connected.store(false, Ordering::Release);
    *state.connection_id.lock().await = None;
    if event_tx
        .send(ConnectionEvent::Disconnected { reason })
        .await
        .is_err()
    {
        debug!("event channel closed, receiver dropped");
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use crate::persistence::MemorySnapshotStore;
    use crate::transport::Transport;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex as StdMutex;

    type Script = Vec<Option<std::result::Result<String, ScribbleError>>>;

    struct ScriptedTransport {
        incoming: VecDeque<Option<std::result::Result<String, ScribbleError>>>,
        sent: Arc<StdMutex<Vec<String>>>,
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn send(&mut self, message: String) -> std::result::Result<(), ScribbleError> {
            self.sent.lock().unwrap().push(message);
            Ok(())
        }

        async fn recv(&mut self) -> Option<std::result::Result<String, ScribbleError>> {
            match self.incoming.pop_front() {
                Some(item) => item,
                None => std::future::pending().await,
            }
        }

        async fn close(&mut self) -> std::result::Result<(), ScribbleError> {
            Ok(())
        }
    }

    /// Hands out one scripted transport per connect; fails once they run out.
    struct ScriptedConnector {
        scripts: StdMutex<VecDeque<Script>>,
        sent: Arc<StdMutex<Vec<String>>>,
        connects: Arc<AtomicUsize>,
    }

    impl ScriptedConnector {
        fn new(scripts: Vec<Script>) -> (Self, Arc<StdMutex<Vec<String>>>, Arc<AtomicUsize>) {
            let sent = Arc::new(StdMutex::new(Vec::new()));
            let connects = Arc::new(AtomicUsize::new(0));
            let connector = Self {
                scripts: StdMutex::new(VecDeque::from(scripts)),
                sent: Arc::clone(&sent),
                connects: Arc::clone(&connects),
            };
            (connector, sent, connects)
        }
    }

    #[async_trait]
    impl Connector for ScriptedConnector {
        async fn connect(&self) -> std::result::Result<BoxedTransport, ScribbleError> {
            self.connects.fetch_add(1, Ordering::SeqCst);
            let script = self.scripts.lock().unwrap().pop_front();
            match script {
                Some(script) => Ok(Box::new(ScriptedTransport {
                    incoming: VecDeque::from(script),
                    sent: Arc::clone(&self.sent),
                })),
                None => Err(ScribbleError::TransportClosed),
            }
        }
    }

    fn rejoin(page: PageContext, snapshot: Option<PersistedSnapshot>) -> RejoinSource {
        let (_tx, rx) = watch::channel(page);
        let store = match snapshot {
            Some(s) => MemorySnapshotStore::with_snapshot(s),
            None => MemorySnapshotStore::new(),
        };
        RejoinSource::new(rx, PersistenceBridge::new(store))
    }

    fn snapshot() -> PersistedSnapshot {
        PersistedSnapshot {
            username: "Alice".into(),
            room_code: "AB12CD".into(),
            is_drawer: false,
            drawer_username: None,
        }
    }

    fn fast() -> ConnectionConfig {
        ConnectionConfig::default()
            .with_reconnect_delay(Duration::from_millis(10))
            .with_shutdown_timeout(Duration::from_millis(100))
    }

    #[test]
    fn config_defaults() {
        let config = ConnectionConfig::default();
        assert_eq!(config.reconnect_delay, Duration::from_millis(1000));
        assert_eq!(config.max_reconnect_attempts, 5);
        assert_eq!(config.event_channel_capacity, 256);
        assert_eq!(config.with_event_channel_capacity(0).event_channel_capacity, 1);
    }

    #[test]
    fn rejoin_plan_depends_on_page() {
        assert!(rejoin(PageContext::Home, Some(snapshot())).plan().is_none());
        assert!(rejoin(PageContext::Lobby, None).plan().is_none());

        let (_, frames) = rejoin(PageContext::Lobby, Some(snapshot())).plan().unwrap();
        assert_eq!(frames.len(), 1);

        let (_, frames) = rejoin(PageContext::Game, Some(snapshot())).plan().unwrap();
        assert_eq!(
            frames,
            vec![
                ClientMessage::JoinRoom {
                    room_code: "AB12CD".into(),
                    username: "Alice".into(),
                },
                ClientMessage::GetGameState {
                    room_code: "AB12CD".into(),
                },
            ]
        );
    }

    #[tokio::test]
    async fn connected_frame_assigns_identity() {
        let (connector, _sent, _) =
            ScriptedConnector::new(vec![vec![Some(Ok(
                r#"{"event":"connected","data":{"sid":"abc"}}"#.to_string()
            ))]]);
        let (mut manager, mut events) =
            ConnectionManager::connect(connector, fast(), rejoin(PageContext::Home, None));

        assert_eq!(events.recv().await.unwrap(), ConnectionEvent::Connected);
        assert!(matches!(
            events.recv().await.unwrap(),
            ConnectionEvent::Message(ServerMessage::Connected { .. })
        ));
        assert_eq!(manager.connection_id().await.as_deref(), Some("abc"));
        assert!(manager.is_connected());

        manager.shutdown().await;
        assert!(!manager.is_connected());
        assert_eq!(
            events.recv().await.unwrap(),
            ConnectionEvent::Disconnected {
                reason: Some("client shut down".into())
            }
        );
        assert!(events.recv().await.is_none());
    }

    #[tokio::test]
    async fn malformed_frames_are_dropped() {
        let (connector, _sent, _) = ScriptedConnector::new(vec![vec![
            Some(Ok("{not json".to_string())),
            Some(Ok(r#"{"event":"no_such_event","data":{}}"#.to_string())),
            Some(Ok(r#"{"event":"clear_canvas","data":{}}"#.to_string())),
        ]]);
        let (mut manager, mut events) =
            ConnectionManager::connect(connector, fast(), rejoin(PageContext::Home, None));

        assert_eq!(events.recv().await.unwrap(), ConnectionEvent::Connected);
        assert_eq!(
            events.recv().await.unwrap(),
            ConnectionEvent::Message(ServerMessage::ClearCanvas {})
        );
        manager.shutdown().await;
    }

    #[tokio::test]
    async fn slow_consumer_still_receives_every_state_frame() {
        let (connector, _sent, _) = ScriptedConnector::new(vec![vec![
            Some(Ok(r#"{"event":"connected","data":{"sid":"sid-b"}}"#.to_string())),
            Some(Ok(r#"{"event":"clear_canvas","data":{}}"#.to_string())),
            Some(Ok(r#"{"event":"new_turn","data":{"drawer_sid":"sid-a"}}"#.to_string())),
        ]]);
        let config = fast().with_event_channel_capacity(1);
        let (mut manager, mut events) =
            ConnectionManager::connect(connector, config, rejoin(PageContext::Home, None));

        // Let the loop run into the full channel before reading anything.
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(events.recv().await.unwrap(), ConnectionEvent::Connected);
        assert!(matches!(
            events.recv().await.unwrap(),
            ConnectionEvent::Message(ServerMessage::Connected { .. })
        ));
        assert_eq!(
            events.recv().await.unwrap(),
            ConnectionEvent::Message(ServerMessage::ClearCanvas {})
        );
        assert!(matches!(
            events.recv().await.unwrap(),
            ConnectionEvent::Message(ServerMessage::NewTurn { ref drawer_sid, .. }) if drawer_sid == "sid-a"
        ));
        manager.shutdown().await;
    }

    #[tokio::test]
    async fn shutdown_is_not_blocked_by_a_full_channel() {
        let (connector, _sent, _) = ScriptedConnector::new(vec![vec![
            Some(Ok(r#"{"event":"connected","data":{"sid":"sid-b"}}"#.to_string())),
            Some(Ok(r#"{"event":"clear_canvas","data":{}}"#.to_string())),
        ]]);
        let config = fast().with_event_channel_capacity(1);
        let (mut manager, mut events) =
            ConnectionManager::connect(connector, config, rejoin(PageContext::Home, None));
        tokio::time::sleep(Duration::from_millis(50)).await;

        tokio::time::timeout(Duration::from_secs(1), manager.shutdown())
            .await
            .unwrap();
        assert!(!manager.is_connected());
        assert_eq!(events.recv().await.unwrap(), ConnectionEvent::Connected);
    }

    #[tokio::test]
    async fn rejoin_is_written_before_queued_commands() {
        let (connector, sent, _) = ScriptedConnector::new(vec![vec![]]);
        let (mut manager, mut events) = ConnectionManager::connect(
            connector,
            fast(),
            rejoin(PageContext::Game, Some(snapshot())),
        );

        assert_eq!(events.recv().await.unwrap(), ConnectionEvent::Connected);
        assert_eq!(
            events.recv().await.unwrap(),
            ConnectionEvent::Rejoining {
                room_code: "AB12CD".into(),
                username: "Alice".into(),
            }
        );
        manager
            .send(ClientMessage::ChatMessage {
                room_code: "AB12CD".into(),
                message: "hi".into(),
            })
            .unwrap();
        tokio::time::timeout(Duration::from_secs(1), async {
            while sent.lock().unwrap().len() < 3 {
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        })
        .await
        .unwrap();
        manager.shutdown().await;

        let sent = sent.lock().unwrap();
        assert!(sent[0].contains("join_room"));
        assert!(sent[1].contains("get_game_state"));
        assert!(sent[2].contains("chat_message"));
    }

    #[tokio::test]
    async fn exhausted_reconnects_are_terminal() {
        let (connector, _sent, connects) = ScriptedConnector::new(vec![vec![None]]);
        let config = fast().with_max_reconnect_attempts(2);
        let (manager, mut events) =
            ConnectionManager::connect(connector, config, rejoin(PageContext::Home, None));

        let mut seen = Vec::new();
        while let Some(event) = events.recv().await {
            seen.push(event);
        }
        assert_eq!(
            seen,
            vec![
                ConnectionEvent::Connected,
                ConnectionEvent::Disconnected { reason: None },
                ConnectionEvent::Reconnecting {
                    attempt: 1,
                    max_attempts: 2
                },
                ConnectionEvent::Reconnecting {
                    attempt: 2,
                    max_attempts: 2
                },
                ConnectionEvent::ConnectionFailed { attempts: 2 },
            ]
        );
        assert_eq!(connects.load(Ordering::SeqCst), 3);
        assert!(!manager.is_connected());
        assert!(matches!(
            manager.send(ClientMessage::StartGame {
                room_code: "AB12CD".into()
            }),
            Err(ScribbleError::NotConnected)
        ));
    }
}
