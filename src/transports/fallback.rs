//! Connector that falls back to a second framing when the first is unavailable.

use async_trait::async_trait;

use crate::error::ScribbleError;
use crate::transport::{BoxedTransport, Connector};

/// Tries `primary` first and `fallback` only when `primary` fails.
///
/// The choice is made again on every connection attempt, so a relay whose
/// WebSocket endpoint comes back is picked up on the next reconnect.
#[derive(Debug, Clone)]
pub struct FallbackConnector<P, F> {
    primary: P,
    fallback: F,
}

impl<P, F> FallbackConnector<P, F> {
    pub fn new(primary: P, fallback: F) -> Self {
        Self { primary, fallback }
    }
}

#[async_trait]
impl<P: Connector, F: Connector> Connector for FallbackConnector<P, F> {
    async fn connect(&self) -> Result<BoxedTransport, ScribbleError> {
        match self.primary.connect().await {
            Ok(transport) => Ok(transport),
            Err(primary_err) => {
                tracing::warn!(error = %primary_err, "primary framing unavailable, trying fallback");
                self.fallback.connect().await
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::transport::Transport;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct NullTransport;

    #[async_trait]
    impl Transport for NullTransport {
        async fn send(&mut self, _message: String) -> Result<(), ScribbleError> {
            Ok(())
        }
        async fn recv(&mut self) -> Option<Result<String, ScribbleError>> {
            None
        }
        async fn close(&mut self) -> Result<(), ScribbleError> {
            Ok(())
        }
    }

    struct Counting {
        succeed: bool,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Connector for Counting {
        async fn connect(&self) -> Result<BoxedTransport, ScribbleError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.succeed {
                Ok(Box::new(NullTransport))
            } else {
                Err(ScribbleError::TransportClosed)
            }
        }
    }

    fn counting(succeed: bool) -> (Counting, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Counting {
                succeed,
                calls: Arc::clone(&calls),
            },
            calls,
        )
    }

    #[tokio::test]
    async fn primary_success_skips_fallback() {
        let (primary, p_calls) = counting(true);
        let (fallback, f_calls) = counting(true);
        FallbackConnector::new(primary, fallback)
            .connect()
            .await
            .unwrap();
        assert_eq!(p_calls.load(Ordering::SeqCst), 1);
        assert_eq!(f_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn primary_failure_uses_fallback() {
        let (primary, _) = counting(false);
        let (fallback, f_calls) = counting(true);
        assert!(FallbackConnector::new(primary, fallback)
            .connect()
            .await
            .is_ok());
        assert_eq!(f_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn both_failing_reports_fallback_error() {
        let (primary, _) = counting(false);
        let (fallback, _) = counting(false);
        let err = FallbackConnector::new(primary, fallback)
            .connect()
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ScribbleError::TransportClosed));
    }
}
