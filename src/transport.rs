//! Transport abstraction for the relay protocol.
//!
//! A [`Transport`] is one live, bidirectional text channel to the relay. The
//! protocol uses JSON text frames, so each implementation handles framing
//! internally (WebSocket frames, newline-delimited TCP, ...).
//!
//! Because the connection manager reconnects on its own, it does not take a
//! ready transport. It takes a [`Connector`] that can open a fresh transport
//! each time one is needed.
//!
//! # Implementing a Custom Transport
//!
//! ```rust,no_run
//! use async_trait::async_trait;
//! use scribble_client::error::ScribbleError;
//! use scribble_client::transport::{BoxedTransport, Connector, Transport};
//!
//! struct MyTransport { /* ... */ }
//!
//! #[async_trait]
//! impl Transport for MyTransport {
//!     async fn send(&mut self, message: String) -> Result<(), ScribbleError> {
//!         unimplemented!()
//!     }
//!
//!     async fn recv(&mut self) -> Option<Result<String, ScribbleError>> {
//!         unimplemented!()
//!     }
//!
//!     async fn close(&mut self) -> Result<(), ScribbleError> {
//!         unimplemented!()
//!     }
//! }
//!
//! struct MyConnector;
//!
//! #[async_trait]
//! impl Connector for MyConnector {
//!     async fn connect(&self) -> Result<BoxedTransport, ScribbleError> {
//!         Ok(Box::new(MyTransport {}))
//!     }
//! }
//! ```

use async_trait::async_trait;

use crate::error::ScribbleError;

/// A bidirectional text message transport to the relay.
///
/// Each call to [`send`](Transport::send) transmits one complete JSON frame.
/// Each call to [`recv`](Transport::recv) returns one complete JSON frame.
///
/// # Cancel Safety
///
/// [`recv`](Transport::recv) **MUST** be cancel-safe because it is polled
/// inside `tokio::select!`. Cancelling it must not lose a frame.
#[async_trait]
pub trait Transport: Send + 'static {
    /// Send a JSON text frame to the relay.
    ///
    /// # Errors
    ///
    /// Returns [`ScribbleError::TransportSend`] if the frame could not be sent.
    async fn send(&mut self, message: String) -> Result<(), ScribbleError>;

    /// Receive the next JSON text frame from the relay.
    ///
    /// Returns:
    /// - `Some(Ok(text))`: a complete frame was received
    /// - `Some(Err(e))`: a transport error occurred
    /// - `None`: the relay closed the connection cleanly
    async fn recv(&mut self) -> Option<Result<String, ScribbleError>>;

    /// Close the connection gracefully.
    ///
    /// # Errors
    ///
    /// Returns an error if the close handshake fails. Resources are released
    /// regardless.
    async fn close(&mut self) -> Result<(), ScribbleError>;
}

/// A transport behind dynamic dispatch, as produced by a [`Connector`].
pub type BoxedTransport = Box<dyn Transport>;

/// Opens new transport sessions to the relay.
///
/// Called once for the initial connection and once per reconnect attempt.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Establish a new transport session.
    ///
    /// # Errors
    ///
    /// Returns an error if the relay cannot be reached.
    async fn connect(&self) -> Result<BoxedTransport, ScribbleError>;
}
