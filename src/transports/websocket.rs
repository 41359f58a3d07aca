//! WebSocket transport built on `tokio-tungstenite`.
//!
//! This is the primary framing: one JSON frame per WebSocket text message.
//! `ws://` and `wss://` are both supported through
//! [`MaybeTlsStream`](tokio_tungstenite::MaybeTlsStream).
//!
//! # Example
//!
//! ```rust,no_run
//! # async fn example() -> Result<(), scribble_client::ScribbleError> {
//! use scribble_client::{Transport, WebSocketTransport};
//!
//! let mut transport = WebSocketTransport::connect("ws://localhost:5000/ws").await?;
//! transport
//!     .send(r#"{"event":"create_room","data":{"username":"Alice"}}"#.to_string())
//!     .await?;
//! transport.close().await?;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::protocol::Message;

use crate::error::ScribbleError;
use crate::transport::{BoxedTransport, Connector, Transport};

/// The underlying WebSocket stream type.
pub type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// A [`Transport`] backed by a WebSocket connection.
///
/// Text frames carry protocol messages. Binary frames that hold valid UTF-8
/// are accepted as well, since some relays send JSON as binary. Anything else
/// is skipped.
///
/// # Cancel Safety
///
/// [`recv`](Transport::recv) is cancel-safe.
#[derive(Debug)]
pub struct WebSocketTransport {
    stream: WsStream,
    closed: bool,
}

impl WebSocketTransport {
    /// Open a WebSocket connection to `url`.
    ///
    /// # Errors
    ///
    /// Returns [`ScribbleError::Io`] if the URL is invalid or the handshake
    /// fails. I/O error kinds are preserved.
    pub async fn connect(url: &str) -> Result<Self, ScribbleError> {
        tracing::debug!(url = %url, "connecting to relay over WebSocket");

        let (stream, _response) = tokio_tungstenite::connect_async(url).await.map_err(|e| {
            let kind = match &e {
                tokio_tungstenite::tungstenite::Error::Io(io) => io.kind(),
                _ => std::io::ErrorKind::Other,
            };
            ScribbleError::Io(std::io::Error::new(kind, e))
        })?;

        tracing::info!(url = %url, "WebSocket connection established");
        Ok(Self::from_stream(stream))
    }

    /// Wrap an already-established stream (custom TLS, headers, proxies).
    pub fn from_stream(stream: WsStream) -> Self {
        Self {
            stream,
            closed: false,
        }
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn send(&mut self, message: String) -> Result<(), ScribbleError> {
        if self.closed {
            return Err(ScribbleError::TransportClosed);
        }
        self.stream
            .send(Message::Text(message.into()))
            .await
            .map_err(|e| ScribbleError::TransportSend(e.to_string()))
    }

    async fn recv(&mut self) -> Option<Result<String, ScribbleError>> {
        loop {
            let msg = match self.stream.next().await? {
                Ok(msg) => msg,
                Err(e) => return Some(Err(ScribbleError::TransportReceive(e.to_string()))),
            };

            match msg {
                Message::Text(text) => return Some(Ok(text.to_string())),
                Message::Binary(bytes) => match String::from_utf8(bytes.to_vec()) {
                    Ok(text) => return Some(Ok(text)),
                    Err(_) => tracing::warn!("skipping non-UTF-8 binary frame"),
                },
                Message::Close(frame) => {
                    tracing::debug!(?frame, "relay sent close frame");
                    return None;
                }
                // tungstenite answers pings itself.
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {}
            }
        }
    }

    async fn close(&mut self) -> Result<(), ScribbleError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.stream
            .close(None)
            .await
            .map_err(|e| ScribbleError::TransportSend(e.to_string()))
    }
}

/// [`Connector`] that opens a [`WebSocketTransport`] to a fixed URL.
#[derive(Debug, Clone)]
pub struct WebSocketConnector {
    url: String,
    timeout: Option<Duration>,
}

impl WebSocketConnector {
    /// Connector for `url`, with no handshake timeout.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout: None,
        }
    }

    /// Fail a connection attempt with [`ScribbleError::Timeout`] after `timeout`.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// The relay URL this connector dials.
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Connector for WebSocketConnector {
    async fn connect(&self) -> Result<BoxedTransport, ScribbleError> {
        let transport = match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout, WebSocketTransport::connect(&self.url))
                .await
                .map_err(|_| ScribbleError::Timeout)??,
            None => WebSocketTransport::connect(&self.url).await?,
        };
        Ok(Box::new(transport))
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
    use tokio::net::TcpListener;

    async fn start_relay<F, Fut>(handler: F) -> String
    where
        F: FnOnce(tokio_tungstenite::WebSocketStream<tokio::net::TcpStream>) -> Fut
            + Send
            + 'static,
        Fut: std::future::Future<Output = ()> + Send,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
            handler(ws).await;
        });

        format!("ws://{addr}")
    }

    #[tokio::test]
    async fn connect_fails_with_invalid_url() {
        let err = WebSocketTransport::connect("not-a-url").await.unwrap_err();
        assert!(matches!(err, ScribbleError::Io(_)));
    }

    #[tokio::test]
    async fn connector_times_out_on_unroutable_host() {
        let connector =
            WebSocketConnector::new("ws://192.0.2.1:1").with_timeout(Duration::from_millis(50));
        let err = connector.connect().await.err().unwrap();
        assert!(matches!(err, ScribbleError::Timeout | ScribbleError::Io(_)));
    }

    #[tokio::test]
    async fn text_and_utf8_binary_frames_are_delivered() {
        let url = start_relay(|mut ws| async move {
            ws.send(Message::Text(r#"{"event":"connected","data":{"sid":"a"}}"#.into()))
                .await
                .unwrap();
            ws.send(Message::Binary(b"{\"event\":\"clear_canvas\",\"data\":{}}".to_vec().into()))
                .await
                .unwrap();
            ws.send(Message::Binary(vec![0xff, 0xfe].into())).await.unwrap();
            ws.send(Message::Text("last".into())).await.unwrap();
            ws.close(None).await.unwrap();
        })
        .await;

        let mut transport = WebSocketConnector::new(url).connect().await.unwrap();
        assert!(transport.recv().await.unwrap().unwrap().contains("connected"));
        assert!(transport.recv().await.unwrap().unwrap().contains("clear_canvas"));
        // Invalid UTF-8 is skipped.
        assert_eq!(transport.recv().await.unwrap().unwrap(), "last");
        assert!(transport.recv().await.is_none());
    }

    #[tokio::test]
    async fn send_after_close_returns_transport_closed() {
        let url =
            start_relay(|mut ws| async move { while let Some(Ok(_)) = ws.next().await {} }).await;

        let mut transport = WebSocketTransport::connect(&url).await.unwrap();
        transport.close().await.unwrap();
        transport.close().await.unwrap();

        let err = transport.send("late".into()).await.unwrap_err();
        assert!(matches!(err, ScribbleError::TransportClosed));
    }

    #[tokio::test]
    async fn frames_reach_the_relay() {
        let (tx, rx) = tokio::sync::oneshot::channel::<String>();
        let url = start_relay(|mut ws| async move {
            if let Some(Ok(Message::Text(text))) = ws.next().await {
                let _ = tx.send(text.to_string());
            }
        })
        .await;

        let mut transport = WebSocketTransport::connect(&url).await.unwrap();
        transport.send("hello relay".into()).await.unwrap();
        assert_eq!(rx.await.unwrap(), "hello relay");
    }
}
