//! Client configuration.
//!
//! ```
//! use scribble_client::config::ClientConfig;
//! use std::time::Duration;
//!
//! let config = ClientConfig::new("ws://localhost:5000/ws")
//!     .with_fallback_addr("localhost:5001")
//!     .with_reconnect_delay(Duration::from_millis(500))
//!     .with_turn_duration(80);
//! assert_eq!(config.turn_duration, 80);
//! assert_eq!(config.fallback_addr.as_deref(), Some("localhost:5001"));
//! ```

use std::path::PathBuf;
use std::time::Duration;

use crate::event::PageContext;
use crate::persistence::{FileSnapshotStore, PersistenceBridge};
use crate::timer::DEFAULT_TURN_DURATION_SECS;

/// Relay URL used when `SCRIBBLE_SERVER_URL` is unset.
pub const DEFAULT_SERVER_URL: &str = "ws://127.0.0.1:5000/ws";

const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(1000);
const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 5;
const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 256;
const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

/// Everything a [`GameClient`](crate::client::GameClient) needs to start.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// WebSocket URL of the relay.
    pub server_url: String,
    /// `host:port` of the newline-delimited JSON endpoint, tried when the
    /// WebSocket endpoint cannot be reached.
    pub fallback_addr: Option<String>,
    /// Where the session snapshot is kept. `None` keeps it in memory only.
    pub snapshot_path: Option<PathBuf>,
    /// Fixed wait before each reconnect attempt. Defaults to **1 second**.
    pub reconnect_delay: Duration,
    /// Defaults to **5**.
    pub max_reconnect_attempts: u32,
    /// Defaults to **256**. Values below 1 are clamped to 1.
    pub event_channel_capacity: usize,
    /// Defaults to **1 second**.
    pub shutdown_timeout: Duration,
    /// Countdown for a turn that starts without a relay value, in seconds.
    /// Defaults to **60**.
    pub turn_duration: u32,
    /// Page the client starts on. Decides whether the first connect rejoins.
    pub page: PageContext,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_SERVER_URL)
    }
}

impl ClientConfig {
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            fallback_addr: None,
            snapshot_path: None,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            turn_duration: DEFAULT_TURN_DURATION_SECS,
            page: PageContext::Home,
        }
    }

    /// Read `SCRIBBLE_SERVER_URL`, `SCRIBBLE_FALLBACK_ADDR` and
    /// `SCRIBBLE_SNAPSHOT_PATH` from the environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env) with a custom variable source.
    /// Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::new(get("SCRIBBLE_SERVER_URL").unwrap_or_else(|| DEFAULT_SERVER_URL.into()));
        config.fallback_addr = get("SCRIBBLE_FALLBACK_ADDR");
        config.snapshot_path = get("SCRIBBLE_SNAPSHOT_PATH").map(PathBuf::from);
        config
    }

    #[must_use]
    pub fn with_fallback_addr(mut self, addr: impl Into<String>) -> Self {
        self.fallback_addr = Some(addr.into());
        self
    }

    #[must_use]
    pub fn with_snapshot_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.snapshot_path = Some(path.into());
        self
    }

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

    #[must_use]
    pub fn with_turn_duration(mut self, seconds: u32) -> Self {
        self.turn_duration = seconds;
        self
    }

    #[must_use]
    pub fn with_page(mut self, page: PageContext) -> Self {
        self.page = page;
        self
    }

    /// Snapshot storage for this configuration.
    pub fn persistence(&self) -> PersistenceBridge {
        match &self.snapshot_path {
            Some(path) => PersistenceBridge::new(FileSnapshotStore::new(path.clone())),
            None => PersistenceBridge::in_memory(),
        }
    }

    /// The connection-loop subset of this configuration.
    #[cfg(feature = "tokio-runtime")]
    pub fn connection_config(&self) -> crate::connection::ConnectionConfig {
        crate::connection::ConnectionConfig::default()
            .with_reconnect_delay(self.reconnect_delay)
            .with_max_reconnect_attempts(self.max_reconnect_attempts)
            .with_event_channel_capacity(self.event_channel_capacity)
            .with_shutdown_timeout(self.shutdown_timeout)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn defaults_match_the_reconnect_policy() {
        let config = ClientConfig::new("ws://relay/ws");
        assert_eq!(config.reconnect_delay, Duration::from_millis(1000));
        assert_eq!(config.max_reconnect_attempts, 5);
        assert_eq!(config.turn_duration, 60);
        assert_eq!(config.page, PageContext::Home);
        assert!(config.fallback_addr.is_none());
        assert!(config.snapshot_path.is_none());
    }

    #[test]
    fn capacity_is_clamped() {
        let config = ClientConfig::default().with_event_channel_capacity(0);
        assert_eq!(config.event_channel_capacity, 1);
    }

    #[test]
    fn lookup_fills_known_keys_and_skips_blank_values() {
        let vars: HashMap<&str, &str> = [
            ("SCRIBBLE_SERVER_URL", "wss://draw.example/ws"),
            ("SCRIBBLE_FALLBACK_ADDR", "  "),
            ("SCRIBBLE_SNAPSHOT_PATH", "/tmp/scribble.json"),
        ]
        .into_iter()
        .collect();
        let config = ClientConfig::from_lookup(|k| vars.get(k).map(|v| (*v).to_string()));
        assert_eq!(config.server_url, "wss://draw.example/ws");
        assert!(config.fallback_addr.is_none());
        assert_eq!(
            config.snapshot_path.as_deref(),
            Some(std::path::Path::new("/tmp/scribble.json"))
        );
    }

    #[test]
    fn empty_lookup_uses_the_default_url() {
        let config = ClientConfig::from_lookup(|_| None);
        assert_eq!(config.server_url, DEFAULT_SERVER_URL);
    }

    #[cfg(feature = "tokio-runtime")]
    #[test]
    fn connection_config_carries_the_policy() {
        let config = ClientConfig::default()
            .with_max_reconnect_attempts(2)
            .with_reconnect_delay(Duration::from_millis(10))
            .connection_config();
        assert_eq!(config.max_reconnect_attempts, 2);
        assert_eq!(config.reconnect_delay, Duration::from_millis(10));
    }
}
