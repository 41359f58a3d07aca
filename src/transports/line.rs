//! Newline-delimited JSON over plain TCP.
//!
//! This is the fallback framing for networks where the WebSocket upgrade is
//! unavailable. Each frame is one JSON object followed by `\n`. Blank lines
//! are ignored.

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

use crate::error::ScribbleError;
use crate::transport::{BoxedTransport, Connector, Transport};

/// A [`Transport`] speaking newline-delimited JSON over TCP.
///
/// # Cancel Safety
///
/// [`recv`](Transport::recv) relies on [`Lines::next_line`], which is
/// cancel-safe.
#[derive(Debug)]
pub struct LineTransport {
    reader: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
    closed: bool,
}

impl LineTransport {
    /// Connect to `addr` (`host:port`).
    ///
    /// # Errors
    ///
    /// Returns [`ScribbleError::Io`] if the TCP connection cannot be opened.
    pub async fn connect(addr: &str) -> Result<Self, ScribbleError> {
        tracing::debug!(addr = %addr, "connecting to relay over TCP");
        let stream = TcpStream::connect(addr).await?;
        tracing::info!(addr = %addr, "TCP connection established");
        Ok(Self::from_stream(stream))
    }

    /// Wrap an already-connected TCP stream.
    pub fn from_stream(stream: TcpStream) -> Self {
        let (read, write) = stream.into_split();
        Self {
            reader: BufReader::new(read).lines(),
            writer: write,
            closed: false,
        }
    }
}

#[async_trait]
impl Transport for LineTransport {
    async fn send(&mut self, message: String) -> Result<(), ScribbleError> {
        if self.closed {
            return Err(ScribbleError::TransportClosed);
        }
        if message.contains('\n') {
            return Err(ScribbleError::TransportSend(
                "frame contains a newline".into(),
            ));
        }
        let mut frame = message.into_bytes();
        frame.push(b'\n');
        self.writer
            .write_all(&frame)
            .await
            .map_err(|e| ScribbleError::TransportSend(e.to_string()))
    }

    async fn recv(&mut self) -> Option<Result<String, ScribbleError>> {
        loop {
            match self.reader.next_line().await {
                Ok(Some(line)) if line.trim().is_empty() => continue,
                Ok(Some(line)) => return Some(Ok(line)),
                Ok(None) => return None,
                Err(e) => return Some(Err(ScribbleError::TransportReceive(e.to_string()))),
            }
        }
    }

    async fn close(&mut self) -> Result<(), ScribbleError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.writer.shutdown().await.map_err(ScribbleError::from)
    }
}

/// [`Connector`] that opens a [`LineTransport`] to a fixed address.
#[derive(Debug, Clone)]
pub struct LineConnector {
    addr: String,
}

impl LineConnector {
    /// Connector for `addr` (`host:port`).
    pub fn new(addr: impl Into<String>) -> Self {
        Self { addr: addr.into() }
    }
}

#[async_trait]
impl Connector for LineConnector {
    async fn connect(&self) -> Result<BoxedTransport, ScribbleError> {
        Ok(Box::new(LineTransport::connect(&self.addr).await?))
    }
}
