//! The single owned session object.
//!
//! [`Session`] holds every component and is the only place state changes.
//! Inbound frames go through [`Session::handle_message`], one arm per event
//! kind; local input goes through the methods that build outbound frames.
//! Both return what the UI needs to know as [`SessionEvent`]s.
//!
//! Nothing here does I/O. The async driver in [`client`](crate::client)
//! feeds it and sends what it returns.

use tokio::sync::watch;

use crate::draw::{Canvas, DrawRelay, StrokeLog};
use crate::error::{Result, ScribbleError, ValidationError};
use crate::event::{PageContext, SessionEvent};
use crate::persistence::{PersistedSnapshot, PersistenceBridge};
use crate::protocol::{
    normalize_room_code, normalize_username, ClientMessage, DrawPayload, GameStateInfo,
    GameStateUpdate, LeaderboardEntry, PlayerInfo, RoomInfo, ServerMessage, StrokeEvent,
};
use crate::scoreboard::{compute_winners, ScoreboardSync};
use crate::store::{SessionStore, SessionView};
use crate::timer::{TimerSync, DEFAULT_TURN_DURATION_SECS};
use crate::turn::{RoundOverTick, Transition, TurnPhase, TurnStateMachine};

/// Client session state and the rules that change it.
#[derive(Debug)]
pub struct Session<C: Canvas = StrokeLog> {
    store: SessionStore,
    turn: TurnStateMachine,
    draw: DrawRelay<C>,
    timer: TimerSync,
    scoreboard: ScoreboardSync,
    persistence: PersistenceBridge,
    page: watch::Sender<PageContext>,
    turn_duration: u32,
}

impl Session<StrokeLog> {
    /// Session drawing into a [`StrokeLog`], starting on `page`.
    pub fn headless(persistence: PersistenceBridge, page: PageContext) -> Self {
        Self::new(StrokeLog::new(), persistence, page)
    }
}

impl<C: Canvas> Session<C> {
    pub fn new(canvas: C, persistence: PersistenceBridge, page: PageContext) -> Self {
        let (page, _rx) = watch::channel(page);
        Self {
            store: SessionStore::new(),
            turn: TurnStateMachine::new(),
            draw: DrawRelay::new(canvas),
            timer: TimerSync::new(),
            scoreboard: ScoreboardSync::new(),
            persistence,
            page,
            turn_duration: DEFAULT_TURN_DURATION_SECS,
        }
    }

    /// Countdown used when a turn starts without a relay-supplied value.
    #[must_use]
    pub fn with_turn_duration(mut self, seconds: u32) -> Self {
        self.turn_duration = seconds;
        self
    }

    // ── Accessors ───────────────────────────────────────────────────

    pub fn view(&self) -> &SessionView {
        self.store.view()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionView> {
        self.store.subscribe()
    }

    pub fn turn(&self) -> &TurnStateMachine {
        &self.turn
    }

    pub fn timer(&self) -> &TimerSync {
        &self.timer
    }

    pub fn scoreboard(&self) -> &ScoreboardSync {
        &self.scoreboard
    }

    pub fn draw(&self) -> &DrawRelay<C> {
        &self.draw
    }

    pub fn draw_mut(&mut self) -> &mut DrawRelay<C> {
        &mut self.draw
    }

    pub fn persistence(&self) -> &PersistenceBridge {
        &self.persistence
    }

    pub fn page(&self) -> PageContext {
        *self.page.borrow()
    }

    /// Receiver the connection loop reads the page from when rejoining.
    pub fn page_receiver(&self) -> watch::Receiver<PageContext> {
        self.page.subscribe()
    }

    /// The UI switched pages.
    pub fn set_page(&mut self, page: PageContext) {
        self.page.send_if_modified(|current| {
            let changed = *current != page;
            *current = page;
            changed
        });
    }

    // ── Connection lifecycle ────────────────────────────────────────

    pub fn on_connected(&mut self) -> Vec<SessionEvent> {
        vec![
            SessionEvent::Connected,
            SessionEvent::success("Connected to server"),
        ]
    }

    pub fn on_disconnected(&mut self, reason: Option<String>) -> Vec<SessionEvent> {
        self.store.clear_connection_id();
        vec![
            SessionEvent::Disconnected { reason },
            SessionEvent::warning("Disconnected from server"),
        ]
    }

    pub fn on_reconnecting(&mut self, attempt: u32, max_attempts: u32) -> Vec<SessionEvent> {
        vec![
            SessionEvent::Reconnecting {
                attempt,
                max_attempts,
            },
            SessionEvent::info(format!("Reconnecting ({attempt}/{max_attempts})...")),
        ]
    }

    pub fn on_connection_failed(&mut self, attempts: u32) -> Vec<SessionEvent> {
        vec![
            SessionEvent::ConnectionFailed { attempts },
            SessionEvent::error("Connection failed. Please refresh the page."),
        ]
    }

    /// The connection loop wrote a rejoin for `room_code`.
    pub fn on_rejoining(&mut self, room_code: &str, username: String) -> Vec<SessionEvent> {
        if self.view().identity.username.is_none() {
            self.store.set_username(username);
        }
        vec![SessionEvent::info(format!("Rejoining room {room_code}..."))]
    }

    /// Show the persisted snapshot until live state arrives.
    ///
    /// Only acts on the game page, before any turn is known.
    pub fn restore_provisional(&mut self) -> Vec<SessionEvent> {
        if self.page() != PageContext::Game || self.turn.phase() != TurnPhase::Idle {
            return Vec::new();
        }
        let Some(snapshot) = self.persistence.load() else {
            return Vec::new();
        };
        let has_drawer = snapshot.drawer_username.is_some();
        let is_drawer = snapshot.is_drawer;
        tracing::debug!(room_code = %snapshot.room_code, is_drawer, "restoring provisional state");
        self.store.restore_provisional(snapshot);
        if !has_drawer {
            return Vec::new();
        }
        match self.turn.begin_turn(is_drawer, None, None) {
            Some(t) => self.apply_transition(t),
            None => Vec::new(),
        }
    }

    // ── Inbound dispatch ────────────────────────────────────────────

    /// Apply one relay frame.
    pub fn handle_message(&mut self, msg: ServerMessage) -> Vec<SessionEvent> {
        tracing::debug!(event = msg.name(), "handling relay frame");
        match msg {
            ServerMessage::Connected { sid } => self.on_identity(sid),
            ServerMessage::RoomCreated { room_code, room } => {
                self.on_room(&room_code, &room, true)
            }
            ServerMessage::RoomJoined { room_code, room } => {
                self.on_room(&room_code, &room, false)
            }
            ServerMessage::JoinError { message } => vec![SessionEvent::error(message)],
            ServerMessage::PlayerJoined { username, players } => {
                self.on_membership(&players, format!("{username} joined the room"))
            }
            ServerMessage::PlayerLeft { username, players } => {
                self.on_membership(&players, format!("{username} left the room"))
            }
            ServerMessage::GameStarted {
                drawer_sid,
                drawer_username,
                game_state,
            } => self.on_turn_start(
                TurnStart {
                    drawer_sid,
                    drawer_username,
                    category: None,
                    word_length: None,
                    game_state,
                },
                true,
            ),
            ServerMessage::NewTurn {
                drawer_sid,
                drawer_username,
                category,
                word_length,
                game_state,
            } => self.on_turn_start(
                TurnStart {
                    drawer_sid,
                    drawer_username,
                    category,
                    word_length,
                    game_state,
                },
                false,
            ),
            ServerMessage::YourTurnToDraw { word, category } => self.on_word(word, category),
            ServerMessage::TimerUpdate { time_remaining } => self.on_timer_update(time_remaining),
            ServerMessage::TurnEnded { word, leaderboard } => self.on_turn_ended(word, leaderboard),
            ServerMessage::GameEnded {
                final_leaderboard,
                winners,
            } => self.on_game_ended(final_leaderboard, &winners),
            ServerMessage::GameStateUpdate(update) => self.on_game_state(&update),
            ServerMessage::Draw(stroke) => {
                self.draw.apply_remote_stroke(&self.turn, &stroke);
                Vec::new()
            }
            ServerMessage::ClearCanvas {} => {
                if self.draw.apply_remote_clear(&self.turn) {
                    vec![SessionEvent::CanvasCleared]
                } else {
                    Vec::new()
                }
            }
            ServerMessage::ChatMessage {
                username,
                message,
                is_system,
            } => vec![SessionEvent::ChatMessage {
                username,
                message,
                is_system,
            }],
            ServerMessage::CorrectGuess {
                username,
                points,
                leaderboard,
                sid,
            } => self.on_correct_guess(username, points, &leaderboard, sid),
            ServerMessage::AlreadyGuessed { message } => {
                if let Some(id) = self.view().identity.connection_id.clone() {
                    self.scoreboard.mark_guessed(&id);
                }
                vec![SessionEvent::warning(message)]
            }
            ServerMessage::Reaction { emoji, x, y, .. } => {
                vec![SessionEvent::Reaction { emoji, x, y }]
            }
            ServerMessage::Error { message } => {
                let message = if message.is_empty() {
                    "An error occurred".to_string()
                } else {
                    message
                };
                vec![SessionEvent::error(message)]
            }
        }
    }

    /// One second passed.
    pub fn tick(&mut self) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        if let Some(remaining) = self.timer.tick() {
            events.push(self.timer_event(remaining));
        }
        match self.turn.tick_round_over() {
            RoundOverTick::Inactive => {}
            RoundOverTick::Counting(remaining) => {
                events.push(SessionEvent::RoundOverCountdown { remaining });
            }
            RoundOverTick::Dismissed(t) => {
                events.push(SessionEvent::RoundOverDismissed);
                events.extend(self.apply_transition(t));
            }
        }
        events
    }

    fn on_identity(&mut self, sid: String) -> Vec<SessionEvent> {
        self.store.set_connection_id(sid.clone());
        vec![SessionEvent::IdentityAssigned { connection_id: sid }]
    }

    fn on_room(&mut self, room_code: &str, room: &RoomInfo, created: bool) -> Vec<SessionEvent> {
        if let Err(e) = self.store.apply_room(room_code, room) {
            tracing::warn!(room_code = %room_code, error = %e, "room update rejected");
            return vec![SessionEvent::error(e.to_string())];
        }

        let mut events = Vec::new();
        if let Some(t) = self.turn.reset() {
            events.extend(self.apply_transition(t));
        }
        self.timer.stop();
        self.scoreboard.clear_guessed();
        self.scoreboard.set_drawer(None);
        self.scoreboard.update(&room.players);
        self.record_snapshot();

        let is_host = self.view().is_host();
        let room_code = room_code.to_string();
        events.push(if created {
            SessionEvent::RoomCreated { room_code, is_host }
        } else {
            SessionEvent::RoomJoined { room_code, is_host }
        });
        events.push(SessionEvent::PlayersChanged {
            players: room.players.clone(),
        });
        events.push(self.scoreboard_event());

        // A rejoin from the lobby or game page stays where it is.
        if created || self.page() == PageContext::Home {
            events.extend(self.navigate(PageContext::Lobby));
        }
        events
    }

    fn on_membership(&mut self, players: &[PlayerInfo], notice: String) -> Vec<SessionEvent> {
        if let Err(e) = self.store.replace_players(players) {
            tracing::warn!(error = %e, "membership update rejected");
            return vec![SessionEvent::error(e.to_string())];
        }
        self.scoreboard.update(players);
        vec![
            SessionEvent::info(notice),
            SessionEvent::PlayersChanged {
                players: players.to_vec(),
            },
            self.scoreboard_event(),
        ]
    }

    fn on_turn_start(&mut self, start: TurnStart, game_start: bool) -> Vec<SessionEvent> {
        let TurnStart {
            drawer_sid,
            drawer_username,
            category,
            word_length,
            game_state,
        } = start;

        if !game_start && self.turn.phase() == TurnPhase::GameOver {
            tracing::warn!(drawer = %drawer_sid, "new turn after game over, ignored");
            return Vec::new();
        }
        if let Err(e) = self.store.begin_turn(
            &drawer_sid,
            drawer_username,
            category,
            word_length,
            game_state.as_ref(),
        ) {
            tracing::warn!(drawer = %drawer_sid, error = %e, "turn start ignored");
            return Vec::new();
        }

        let mut events = Vec::new();
        if game_start && self.turn.phase() == TurnPhase::GameOver {
            if let Some(t) = self.turn.reset() {
                events.extend(self.apply_transition(t));
            }
        }

        let view = self.store.view();
        let local_is_drawer = view.is_local_drawer();
        let turn = view.turn.clone().unwrap_or_default();
        let seconds = game_state
            .as_ref()
            .and_then(|g| g.time_remaining)
            .filter(|&s| s > 0)
            .unwrap_or(self.turn_duration);
        let players = view
            .room
            .as_ref()
            .map(|r| r.players.clone())
            .unwrap_or_default();

        let word_length = turn.word_length.and_then(|n| usize::try_from(n).ok());
        if let Some(t) = self
            .turn
            .begin_turn(local_is_drawer, turn.category.clone(), word_length)
        {
            events.extend(self.apply_transition(t));
        }

        self.scoreboard.clear_guessed();
        self.scoreboard.set_drawer(Some(drawer_sid));
        self.scoreboard.update(&players);
        self.timer.start(seconds);
        self.record_snapshot();

        events.push(self.timer_event(seconds));
        events.push(self.scoreboard_event());
        events.push(if local_is_drawer {
            SessionEvent::info("It's your turn to draw!")
        } else {
            match turn.drawer_username {
                Some(name) => SessionEvent::info(format!("{name} is drawing...")),
                None => SessionEvent::info("New turn started!"),
            }
        });
        if game_start {
            events.extend(self.navigate(PageContext::Game));
        }
        events
    }

    fn on_word(&mut self, word: String, category: String) -> Vec<SessionEvent> {
        if self.turn.phase() == TurnPhase::GameOver {
            tracing::warn!("word arrived after game over, ignored");
            return Vec::new();
        }
        let foreign_turn = self.view().drawer_id().is_some() && !self.view().is_local_drawer();
        let spectating = matches!(
            self.turn.phase(),
            TurnPhase::Spectating | TurnPhase::RoundOver
        );
        if foreign_turn || spectating {
            tracing::warn!(
                drawer = ?self.view().drawer_id(),
                phase = ?self.turn.phase(),
                "word arrived for a turn this client is not drawing, ignored"
            );
            let err =
                ScribbleError::protocol("received a word for a turn this client is not drawing");
            return vec![SessionEvent::error(err.to_string())];
        }
        self.store.set_word(word.clone(), category.clone());
        let events = match self.turn.word_arrived(word, category) {
            Some(t) => self.apply_transition(t),
            None => vec![self.word_event()],
        };
        self.record_snapshot();
        events
    }

    fn on_timer_update(&mut self, seconds: u32) -> Vec<SessionEvent> {
        if matches!(self.turn.phase(), TurnPhase::RoundOver | TurnPhase::GameOver) {
            tracing::debug!(seconds, "timer update after the turn ended, ignored");
            return Vec::new();
        }
        self.timer.correct(seconds);
        self.store.set_time_remaining(seconds);
        vec![self.timer_event(seconds)]
    }

    fn on_turn_ended(&mut self, word: String, leaderboard: Vec<LeaderboardEntry>) -> Vec<SessionEvent> {
        self.store.end_turn(word.clone(), &leaderboard);
        self.timer.stop();
        self.scoreboard.update_from_leaderboard(&leaderboard);

        let mut events = Vec::new();
        let entered = self.turn.end_turn(word.clone());
        if let Some(t) = entered {
            events.extend(self.apply_transition(t));
        }
        events.push(self.scoreboard_event());
        events.push(SessionEvent::RoundOver { word, leaderboard });
        if let Some(remaining) = entered.and(self.turn.round_over_remaining()) {
            events.push(SessionEvent::RoundOverCountdown { remaining });
        }
        events
    }

    fn on_game_ended(
        &mut self,
        final_leaderboard: Vec<LeaderboardEntry>,
        relay_winners: &[LeaderboardEntry],
    ) -> Vec<SessionEvent> {
        let winners = compute_winners(&final_leaderboard);
        if !relay_winners.is_empty() && !same_players(relay_winners, &winners) {
            tracing::debug!(
                relay = relay_winners.len(),
                local = winners.len(),
                "relay winner list differs from the top scores"
            );
        }

        self.store.end_game(&final_leaderboard);
        self.timer.stop();
        self.scoreboard.set_drawer(None);
        self.scoreboard.update_from_leaderboard(&final_leaderboard);
        self.record_snapshot();

        let mut events = Vec::new();
        if let Some(t) = self.turn.end_game() {
            events.extend(self.apply_transition(t));
        }
        events.push(self.scoreboard_event());
        events.push(SessionEvent::GameOver {
            final_leaderboard,
            winners,
        });
        events
    }

    fn on_game_state(&mut self, update: &GameStateUpdate) -> Vec<SessionEvent> {
        if update.drawer_sid.is_none() && update.current_drawer.is_none() {
            return Vec::new();
        }
        if self.turn.phase() == TurnPhase::GameOver {
            return Vec::new();
        }
        let previous_drawer = self.store.view().drawer_id().map(str::to_string);
        self.store.apply_game_state(update);

        let view = self.store.view();
        let local_is_drawer = view.is_local_drawer();
        let turn = view.turn.clone().unwrap_or_default();
        let word_length = turn.word_length.and_then(|n| usize::try_from(n).ok());

        // Same drawer, same role: keep the canvas.
        let in_step = match self.turn.phase() {
            TurnPhase::DrawingPending | TurnPhase::Drawing => local_is_drawer,
            TurnPhase::Spectating => !local_is_drawer,
            _ => false,
        };
        let mut events = Vec::new();
        if !(in_step && previous_drawer == turn.drawer_id) {
            if let Some(t) = self
                .turn
                .begin_turn(local_is_drawer, turn.category.clone(), word_length)
            {
                events.extend(self.apply_transition(t));
            }
        }
        if let (true, Some(word)) = (local_is_drawer, turn.word) {
            let category = turn.category.unwrap_or_default();
            if let Some(t) = self.turn.word_arrived(word, category) {
                events.extend(self.apply_transition(t));
            }
        }
        if let Some(seconds) = update.time_remaining {
            self.timer.correct(seconds);
            events.push(self.timer_event(seconds));
        }
        self.scoreboard.set_drawer(turn.drawer_id);
        self.record_snapshot();
        events.push(self.scoreboard_event());
        events
    }

    fn on_correct_guess(
        &mut self,
        username: String,
        points: u32,
        leaderboard: &[LeaderboardEntry],
        sid: Option<String>,
    ) -> Vec<SessionEvent> {
        self.store.replace_leaderboard(leaderboard);
        self.scoreboard.update_from_leaderboard(leaderboard);
        let sid = match sid {
            Some(sid) => {
                self.scoreboard.mark_guessed(&sid);
                Some(sid)
            }
            None => self.scoreboard.mark_guessed_by_name(&username),
        };
        if let Some(sid) = sid {
            self.store.mark_guessed(&sid);
        }

        vec![
            SessionEvent::CorrectGuess {
                username: username.clone(),
                points,
            },
            SessionEvent::success(format!("{username} guessed correctly! +{points} points")),
            SessionEvent::ChatMessage {
                username: "System".into(),
                message: format!("{username} guessed the word!"),
                is_system: true,
            },
            self.scoreboard_event(),
        ]
    }

    // ── Local operations ────────────────────────────────────────────

    /// Build a `create_room` frame.
    ///
    /// # Errors
    ///
    /// Returns [`ScribbleError::Validation`] for a bad username.
    pub fn create_room(&mut self, username: &str) -> Result<ClientMessage> {
        let username = normalize_username(username)?;
        self.store.set_username(username.clone());
        Ok(ClientMessage::CreateRoom { username })
    }

    /// Build a `join_room` frame.
    ///
    /// # Errors
    ///
    /// Returns [`ScribbleError::Validation`] for a bad room code or username.
    pub fn join_room(&mut self, room_code: &str, username: &str) -> Result<ClientMessage> {
        let room_code = normalize_room_code(room_code)?;
        let username = normalize_username(username)?;
        self.store.set_username(username.clone());
        Ok(ClientMessage::JoinRoom {
            room_code,
            username,
        })
    }

    /// Build a `start_game` frame.
    ///
    /// # Errors
    ///
    /// Returns [`ScribbleError::NotInRoom`] outside a room and
    /// [`ValidationError::NotHost`] for anyone but the host.
    pub fn start_game(&self) -> Result<ClientMessage> {
        let room_code = self.room_code()?;
        if !self.view().is_host() {
            return Err(ValidationError::NotHost.into());
        }
        Ok(ClientMessage::StartGame { room_code })
    }

    /// Render a local stroke and build its `draw` frame.
    ///
    /// Returns `None`, with no canvas change, outside a room, when this
    /// client is not drawing, or for an invalid stroke.
    pub fn submit_stroke(&mut self, stroke: StrokeEvent) -> Option<ClientMessage> {
        let room_code = self.room_code().ok()?;
        let stroke = self.draw.submit_stroke(self.turn.phase(), stroke)?;
        Some(draw_frame(room_code, stroke))
    }

    /// Pointer pressed at display coordinates.
    pub fn pointer_down(&mut self, x: f64, y: f64) -> Option<ClientMessage> {
        let room_code = self.room_code().ok()?;
        let stroke = self.draw.pointer_down(self.turn.phase(), x, y)?;
        Some(draw_frame(room_code, stroke))
    }

    /// Pointer moved at display coordinates.
    pub fn pointer_move(&mut self, x: f64, y: f64) -> Option<ClientMessage> {
        let room_code = self.room_code().ok()?;
        let stroke = self.draw.pointer_move(self.turn.phase(), x, y)?;
        Some(draw_frame(room_code, stroke))
    }

    pub fn pointer_up(&mut self) {
        self.draw.pointer_up();
    }

    /// Wipe the canvas and build a `clear_canvas` frame. Drawer only.
    pub fn clear_canvas(&mut self) -> Option<ClientMessage> {
        let room_code = self.room_code().ok()?;
        self.draw
            .clear_local(self.turn.phase())
            .then_some(ClientMessage::ClearCanvas { room_code })
    }

    /// Build a `guess` frame.
    ///
    /// # Errors
    ///
    /// Returns [`ScribbleError::NotInRoom`] outside a room, or a
    /// [`ValidationError`] for an empty guess, a guess from the drawer, or a
    /// second guess after a correct one.
    pub fn guess(&self, text: &str) -> Result<ClientMessage> {
        let room_code = self.room_code()?;
        let text = text.trim();
        if text.is_empty() {
            return Err(ValidationError::EmptyMessage.into());
        }
        if self.turn.can_draw() || self.view().is_local_drawer() {
            return Err(ValidationError::DrawerCannotGuess.into());
        }
        if let Some(id) = self.view().connection_id() {
            if self.scoreboard.has_guessed(id) {
                return Err(ValidationError::AlreadyGuessed.into());
            }
        }
        Ok(ClientMessage::Guess {
            room_code,
            text: text.to_string(),
        })
    }

    /// Build a `chat_message` frame.
    ///
    /// # Errors
    ///
    /// Returns [`ScribbleError::NotInRoom`] outside a room and
    /// [`ValidationError::EmptyMessage`] for a blank message.
    pub fn chat(&self, message: &str) -> Result<ClientMessage> {
        let room_code = self.room_code()?;
        let message = message.trim();
        if message.is_empty() {
            return Err(ValidationError::EmptyMessage.into());
        }
        Ok(ClientMessage::ChatMessage {
            room_code,
            message: message.to_string(),
        })
    }

    /// Build a `reaction` frame. `x`/`y` are percent of the canvas and are
    /// clamped to `0..=100`.
    ///
    /// # Errors
    ///
    /// Returns [`ScribbleError::NotInRoom`] outside a room and
    /// [`ValidationError::EmptyMessage`] for a blank emoji.
    pub fn react(&self, emoji: &str, x: f64, y: f64) -> Result<ClientMessage> {
        let room_code = self.room_code()?;
        let emoji = emoji.trim();
        if emoji.is_empty() {
            return Err(ValidationError::EmptyMessage.into());
        }
        Ok(ClientMessage::Reaction {
            room_code,
            emoji: emoji.to_string(),
            x: clamp_percent(x),
            y: clamp_percent(y),
        })
    }

    // ── Helpers ─────────────────────────────────────────────────────

    fn room_code(&self) -> Result<String> {
        self.view()
            .room_code()
            .map(str::to_string)
            .ok_or(ScribbleError::NotInRoom)
    }

    /// Side effects of a phase change: canvas wipe, tool visibility, word.
    fn apply_transition(&mut self, t: Transition) -> Vec<SessionEvent> {
        let mut events = vec![SessionEvent::TurnPhaseChanged {
            from: t.from,
            to: t.to,
        }];
        if t.clears_canvas {
            self.draw.wipe();
            events.push(SessionEvent::CanvasCleared);
        }
        if t.from.can_draw() != t.to.can_draw() {
            events.push(SessionEvent::DrawPermissionChanged {
                enabled: t.to.can_draw(),
            });
        }
        events.push(self.word_event());
        events
    }

    fn navigate(&mut self, page: PageContext) -> Option<SessionEvent> {
        if self.page() == page {
            return None;
        }
        self.set_page(page);
        Some(SessionEvent::NavigateTo(page))
    }

    fn record_snapshot(&self) {
        let view = self.store.view();
        let (Some(username), Some(room_code)) = (&view.identity.username, view.room_code()) else {
            return;
        };
        self.persistence.record(&PersistedSnapshot {
            username: username.clone(),
            room_code: room_code.to_string(),
            is_drawer: view.is_local_drawer(),
            drawer_username: view.turn.as_ref().and_then(|t| t.drawer_username.clone()),
        });
    }

    fn word_event(&self) -> SessionEvent {
        SessionEvent::WordDisplayChanged {
            text: self.turn.word_display(),
            category: self.turn.category().map(str::to_string),
        }
    }

    fn timer_event(&self, remaining: u32) -> SessionEvent {
        SessionEvent::TimerChanged {
            remaining,
            warning: self.timer.is_warning(),
        }
    }

    fn scoreboard_event(&self) -> SessionEvent {
        SessionEvent::ScoreboardChanged {
            entries: self.scoreboard.entries(),
        }
    }
}

/// Fields shared by `game_started` and `new_turn`.
struct TurnStart {
    drawer_sid: String,
    drawer_username: Option<String>,
    category: Option<String>,
    word_length: Option<u32>,
    game_state: Option<GameStateInfo>,
}

fn draw_frame(room_code: String, stroke: StrokeEvent) -> ClientMessage {
    ClientMessage::Draw(DrawPayload { room_code, stroke })
}

fn clamp_percent(v: f64) -> f64 {
    if v.is_finite() {
        v.clamp(0.0, 100.0)
    } else {
        50.0
    }
}

/// Same set of players, keyed by connection id when both sides carry one.
fn same_players(a: &[LeaderboardEntry], b: &[LeaderboardEntry]) -> bool {
    a.len() == b.len() && a.iter().all(|x| b.iter().any(|y| same_player(x, y)))
}

fn same_player(a: &LeaderboardEntry, b: &LeaderboardEntry) -> bool {
    if a.sid.is_empty() || b.sid.is_empty() {
        a.username == b.username
    } else {
        a.sid == b.sid
    }
}
