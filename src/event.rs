//! Events surfaced to the UI layer.
//!
//! Every inbound frame, timer tick and local action is folded into the
//! session and comes back out as zero or more [`SessionEvent`]s. The UI is a
//! pure projection of these plus [`SessionView`](crate::store::SessionView).

use crate::protocol::{ConnectionId, LeaderboardEntry, PlayerInfo};
use crate::turn::TurnPhase;

/// Which view the user is currently on.
///
/// Only `Lobby` and `Game` own a live room, so only they trigger an
/// automatic rejoin after a (re)connect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PageContext {
    /// Landing page: create or join a room.
    #[default]
    Home,
    /// Waiting room before the host starts the game.
    Lobby,
    /// The game itself.
    Game,
}

impl PageContext {
    /// Returns `true` if this page needs a live room.
    pub fn requires_room(self) -> bool {
        matches!(self, Self::Lobby | Self::Game)
    }
}

/// Severity of a user-visible notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// State changes and notifications for the UI.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// A transport session is up.
    Connected,
    /// The transport session was lost.
    Disconnected { reason: Option<String> },
    /// Waiting before reconnect attempt `attempt` of `max_attempts`.
    Reconnecting { attempt: u32, max_attempts: u32 },
    /// Every reconnect attempt failed. Terminal: the user must refresh.
    ConnectionFailed { attempts: u32 },
    /// The relay assigned this transport session an id.
    IdentityAssigned { connection_id: ConnectionId },

    /// A room was created by this client.
    RoomCreated { room_code: String, is_host: bool },
    /// This client joined (or rejoined) a room.
    RoomJoined { room_code: String, is_host: bool },
    /// Room membership changed. Always the full list.
    PlayersChanged { players: Vec<PlayerInfo> },

    /// Toast-style message.
    Notification {
        level: NotificationLevel,
        message: String,
    },

    /// The turn state machine moved.
    TurnPhaseChanged { from: TurnPhase, to: TurnPhase },
    /// Drawing tools should be shown (`true`) or hidden.
    DrawPermissionChanged { enabled: bool },
    /// Text for the word area: the word, a placeholder, or blanks.
    WordDisplayChanged {
        text: String,
        category: Option<String>,
    },
    /// The local canvas was wiped.
    CanvasCleared,

    /// Seconds left in the turn.
    TimerChanged { remaining: u32, warning: bool },
    /// Leaderboard re-sorted or re-scored.
    ScoreboardChanged { entries: Vec<LeaderboardEntry> },

    /// The turn ended and the word is revealed.
    RoundOver {
        word: String,
        leaderboard: Vec<LeaderboardEntry>,
    },
    /// Seconds left before the round-over overlay closes.
    RoundOverCountdown { remaining: u32 },
    /// The round-over overlay closed.
    RoundOverDismissed,
    /// The game is over.
    GameOver {
        final_leaderboard: Vec<LeaderboardEntry>,
        winners: Vec<LeaderboardEntry>,
    },

    /// Chat line. `is_system` marks relay-generated lines.
    ChatMessage {
        username: String,
        message: String,
        is_system: bool,
    },
    /// Someone guessed the word.
    CorrectGuess { username: String, points: u32 },
    /// Emoji reaction at `x`/`y` percent of the canvas.
    Reaction { emoji: String, x: f64, y: f64 },

    /// The UI should switch to another page.
    NavigateTo(PageContext),
}

impl SessionEvent {
    pub(crate) fn info(message: impl Into<String>) -> Self {
        Self::Notification {
            level: NotificationLevel::Info,
            message: message.into(),
        }
    }

    pub(crate) fn success(message: impl Into<String>) -> Self {
        Self::Notification {
            level: NotificationLevel::Success,
            message: message.into(),
        }
    }

    pub(crate) fn warning(message: impl Into<String>) -> Self {
        Self::Notification {
            level: NotificationLevel::Warning,
            message: message.into(),
        }
    }

    pub(crate) fn error(message: impl Into<String>) -> Self {
        Self::Notification {
            level: NotificationLevel::Error,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_room_pages_require_a_room() {
        assert!(!PageContext::Home.requires_room());
        assert!(PageContext::Lobby.requires_room());
        assert!(PageContext::Game.requires_room());
    }

    #[test]
    fn notification_helpers_set_level() {
        assert_eq!(
            SessionEvent::warning("slow down"),
            SessionEvent::Notification {
                level: NotificationLevel::Warning,
                message: "slow down".into(),
            }
        );
    }
}
