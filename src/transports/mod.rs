//! Concrete transports and connectors.
//!
//! | Feature               | Transport              | Connector              |
//! |-----------------------|------------------------|------------------------|
//! | `transport-websocket` | [`WebSocketTransport`] | [`WebSocketConnector`] |
//! | `transport-tcp`       | [`LineTransport`]      | [`LineConnector`]      |
//!
//! [`FallbackConnector`] combines any two connectors: the primary framing
//! is tried first and the fallback only when it is unavailable.

pub mod fallback;

#[cfg(feature = "transport-tcp")]
pub mod line;

#[cfg(feature = "transport-websocket")]
pub mod websocket;

pub use fallback::FallbackConnector;

#[cfg(feature = "transport-tcp")]
pub use line::{LineConnector, LineTransport};

#[cfg(feature = "transport-websocket")]
pub use websocket::{WebSocketConnector, WebSocketTransport};
