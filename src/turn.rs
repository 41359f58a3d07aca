//! Turn lifecycle state machine.
//!
//! ```text
//! Idle ──new_turn (drawer)──► DrawingPending ──your_turn_to_draw──► Drawing
//! Idle ──new_turn (guesser)─► Spectating
//! Drawing | Spectating ──turn_ended──► RoundOver ──3 s──► Idle
//! * ──game_ended──► GameOver
//! ```
//!
//! The machine drives drawing permission and what the word area shows. It
//! never decides when a turn ends; that is always relay-declared.

use std::fmt;

/// Seconds the round-over overlay stays up before returning to `Idle`.
pub const ROUND_OVER_COUNTDOWN_SECS: u32 = 3;

/// Word area text while the drawer waits for `your_turn_to_draw`.
pub const WORD_LOADING: &str = "Loading word...";

/// Word area text for a guesser whose word length is unknown.
pub const WORD_WAITING: &str = "Waiting for turn...";

/// Phase of the current turn, from this client's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TurnPhase {
    /// No active turn.
    #[default]
    Idle,
    /// This client draws, but the word has not arrived yet.
    DrawingPending,
    /// This client draws and knows the word.
    Drawing,
    /// Someone else draws.
    Spectating,
    /// The turn ended; the word is revealed.
    RoundOver,
    /// The game ended. Terminal until [`TurnStateMachine::reset`].
    GameOver,
}

impl TurnPhase {
    /// Returns `true` if local stroke capture is enabled.
    pub fn can_draw(self) -> bool {
        matches!(self, Self::Drawing | Self::DrawingPending)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::DrawingPending => "drawing_pending",
            Self::Drawing => "drawing",
            Self::Spectating => "spectating",
            Self::RoundOver => "round_over",
            Self::GameOver => "game_over",
        }
    }
}

impl fmt::Display for TurnPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a phase change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: TurnPhase,
    pub to: TurnPhase,
    /// The local canvas must be wiped. True for every change except the
    /// word arriving for a drawer who is already drawing.
    pub clears_canvas: bool,
}

/// Outcome of one second passing for the round-over overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundOverTick {
    /// Not in `RoundOver`.
    Inactive,
    /// Still counting; seconds left.
    Counting(u32),
    /// The overlay closed and the machine returned to `Idle`.
    Dismissed(Transition),
}

/// Interprets turn-lifecycle events into a [`TurnPhase`].
#[derive(Debug, Default)]
pub struct TurnStateMachine {
    phase: TurnPhase,
    before_round_over: Option<TurnPhase>,
    word: Option<String>,
    category: Option<String>,
    word_length: Option<usize>,
    round_over_remaining: Option<u32>,
}

impl TurnStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    /// Returns `true` if local strokes may be captured and sent.
    pub fn can_draw(&self) -> bool {
        self.phase.can_draw()
    }

    /// Returns `true` if strokes from the relay should be rendered.
    ///
    /// Guessers render while spectating and during the round-over overlay
    /// that follows. The drawer never does, so its own strokes are never
    /// applied twice.
    pub fn accepts_remote_strokes(&self) -> bool {
        match self.phase {
            TurnPhase::Spectating => true,
            TurnPhase::RoundOver => self.before_round_over == Some(TurnPhase::Spectating),
            _ => false,
        }
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    /// Plaintext word, when this client is allowed to see it.
    pub fn word(&self) -> Option<&str> {
        match self.phase {
            TurnPhase::Drawing | TurnPhase::RoundOver => self.word.as_deref(),
            _ => None,
        }
    }

    pub fn word_length(&self) -> Option<usize> {
        self.word_length
    }

    /// Seconds left on the round-over overlay.
    pub fn round_over_remaining(&self) -> Option<u32> {
        self.round_over_remaining
    }

    /// Text for the word area.
    ///
    /// ```
    /// use scribble_client::turn::TurnStateMachine;
    ///
    /// let mut turn = TurnStateMachine::new();
    /// turn.begin_turn(false, Some("Animals".into()), Some(5));
    /// assert_eq!(turn.word_display(), "_ _ _ _ _");
    /// ```
    pub fn word_display(&self) -> String {
        match self.phase {
            TurnPhase::Drawing | TurnPhase::RoundOver => self.word.clone().unwrap_or_default(),
            TurnPhase::DrawingPending => WORD_LOADING.to_string(),
            TurnPhase::Spectating => match self.word_length {
                Some(len) if len > 0 => vec!["_"; len].join(" "),
                _ => WORD_WAITING.to_string(),
            },
            TurnPhase::Idle | TurnPhase::GameOver => String::new(),
        }
    }

    /// A turn started. Ignored once the game is over.
    pub fn begin_turn(
        &mut self,
        local_is_drawer: bool,
        category: Option<String>,
        word_length: Option<usize>,
    ) -> Option<Transition> {
        if self.phase == TurnPhase::GameOver {
            return None;
        }
        self.word = None;
        self.category = category;
        self.word_length = word_length;
        let to = if local_is_drawer {
            TurnPhase::DrawingPending
        } else {
            TurnPhase::Spectating
        };
        Some(self.enter(to, true))
    }

    /// The plaintext word arrived for this client.
    ///
    /// Returns `None` if the phase did not change. A word that arrives while
    /// spectating, during the round-over pause or after game over is ignored
    /// and leaves the stored word untouched.
    pub fn word_arrived(&mut self, word: String, category: String) -> Option<Transition> {
        if matches!(
            self.phase,
            TurnPhase::Spectating | TurnPhase::RoundOver | TurnPhase::GameOver
        ) {
            return None;
        }
        self.word_length = Some(word.chars().count());
        self.word = Some(word);
        self.category = Some(category);
        match self.phase {
            TurnPhase::Drawing => None,
            TurnPhase::DrawingPending => Some(self.enter(TurnPhase::Drawing, false)),
            _ => Some(self.enter(TurnPhase::Drawing, true)),
        }
    }

    /// The relay ended the turn and revealed `word`.
    pub fn end_turn(&mut self, word: String) -> Option<Transition> {
        if self.phase == TurnPhase::GameOver {
            return None;
        }
        let before = self.phase;
        let transition = self.enter(TurnPhase::RoundOver, true);
        self.before_round_over = Some(before);
        self.round_over_remaining = Some(ROUND_OVER_COUNTDOWN_SECS);
        self.word_length = Some(word.chars().count());
        self.word = Some(word);
        Some(transition)
    }

    /// The relay ended the game.
    pub fn end_game(&mut self) -> Option<Transition> {
        if self.phase == TurnPhase::GameOver {
            return None;
        }
        self.word = None;
        self.category = None;
        self.word_length = None;
        Some(self.enter(TurnPhase::GameOver, true))
    }

    /// Advance the round-over countdown by one second.
    pub fn tick_round_over(&mut self) -> RoundOverTick {
        let Some(remaining) = self.round_over_remaining else {
            return RoundOverTick::Inactive;
        };
        let remaining = remaining.saturating_sub(1);
        if remaining > 0 {
            self.round_over_remaining = Some(remaining);
            return RoundOverTick::Counting(remaining);
        }
        self.word = None;
        self.category = None;
        self.word_length = None;
        RoundOverTick::Dismissed(self.enter(TurnPhase::Idle, true))
    }

    /// Forget everything. Used when a room is created or joined.
    pub fn reset(&mut self) -> Option<Transition> {
        let from = self.phase;
        *self = Self::default();
        (from != TurnPhase::Idle).then_some(Transition {
            from,
            to: TurnPhase::Idle,
            clears_canvas: true,
        })
    }

    fn enter(&mut self, to: TurnPhase, clears_canvas: bool) -> Transition {
        let from = self.phase;
        self.phase = to;
        if to != TurnPhase::RoundOver {
            self.before_round_over = None;
            self.round_over_remaining = None;
        }
        tracing::debug!(%from, %to, "turn phase changed");
        Transition {
            from,
            to,
            clears_canvas,
        }
    }
}
