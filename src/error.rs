//! Error types for the scribble client.

use thiserror::Error;

/// Errors that can occur when using the scribble client.
#[derive(Debug, Error)]
pub enum ScribbleError {
    /// Failed to send a frame through the transport.
    #[error("transport send error: {0}")]
    TransportSend(String),

    /// Failed to receive a frame from the transport.
    #[error("transport receive error: {0}")]
    TransportReceive(String),

    /// The transport connection was closed unexpectedly.
    #[error("transport connection closed")]
    TransportClosed,

    /// Failed to serialize or deserialize a protocol message.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Attempted an operation that requires a live transport session.
    #[error("not connected to server")]
    NotConnected,

    /// Attempted a room operation but the client is not in a room.
    #[error("not in a room")]
    NotInRoom,

    /// The server sent a payload that is malformed or inconsistent.
    ///
    /// The update that carried it has been rejected without touching state.
    #[error("protocol violation: {reason}")]
    ProtocolViolation {
        /// What was wrong with the payload.
        reason: String,
    },

    /// Local input was rejected before anything was sent.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The server reported an error.
    #[error("server error: {message}")]
    ServerError {
        /// Human-readable error message from the server.
        message: String,
    },

    /// An operation timed out.
    #[error("operation timed out")]
    Timeout,

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The persisted session snapshot could not be read or written.
    #[error("persistence error: {0}")]
    Persistence(String),
}

impl ScribbleError {
    /// Shorthand for a [`ScribbleError::ProtocolViolation`].
    pub(crate) fn protocol(reason: impl Into<String>) -> Self {
        Self::ProtocolViolation {
            reason: reason.into(),
        }
    }
}

/// Local input validation failures.
///
/// These never reach the server and never change session state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("please enter your name")]
    EmptyUsername,

    #[error("name must be {min}-{max} characters")]
    UsernameLength { min: usize, max: usize },

    #[error("please enter a valid 6-character room code")]
    InvalidRoomCode,

    #[error("only the host can start the game")]
    NotHost,

    #[error("you already guessed correctly")]
    AlreadyGuessed,

    #[error("the drawer cannot guess")]
    DrawerCannotGuess,

    #[error("message is empty")]
    EmptyMessage,

    #[error("invalid stroke: {0}")]
    InvalidStroke(String),
}

/// A specialized [`Result`] type for scribble client operations.
pub type Result<T> = std::result::Result<T, ScribbleError>;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn validation_messages_match_user_facing_text() {
        let err = ScribbleError::from(ValidationError::UsernameLength { min: 2, max: 20 });
        assert_eq!(err.to_string(), "name must be 2-20 characters");
        assert_eq!(
            ValidationError::InvalidRoomCode.to_string(),
            "please enter a valid 6-character room code"
        );
    }

    #[test]
    fn protocol_shorthand_builds_violation() {
        let err = ScribbleError::protocol("room has no players");
        assert!(matches!(err, ScribbleError::ProtocolViolation { .. }));
        assert_eq!(err.to_string(), "protocol violation: room has no players");
    }
}
