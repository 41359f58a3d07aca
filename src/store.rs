//! In-memory mirror of the relay's authoritative state.
//!
//! Every update replaces a whole sub-state (room, membership, turn,
//! leaderboard). Nothing is patched field by field, so the view never mixes
//! two relay snapshots. Validation happens before anything is written: a
//! rejected update leaves the view exactly as it was.
//!
//! Subscribers get a fresh [`SessionView`] through a
//! [`tokio::sync::watch`] channel after every accepted update.

use tokio::sync::watch;

use crate::error::{Result, ScribbleError};
use crate::persistence::PersistedSnapshot;
use crate::protocol::{
    is_room_code, ConnectionId, GameStateInfo, GameStateUpdate, LeaderboardEntry, PlayerInfo,
    RoomInfo,
};

/// Who this client is.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Identity {
    /// Relay-assigned id for the current transport session.
    pub connection_id: Option<ConnectionId>,
    pub username: Option<String>,
}

/// The room this client is in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomView {
    pub code: String,
    pub host_id: ConnectionId,
    /// Join order, as listed by the relay.
    pub players: Vec<PlayerInfo>,
    pub game_started: bool,
}

/// The turn in progress.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TurnView {
    pub drawer_id: Option<ConnectionId>,
    pub drawer_username: Option<String>,
    /// Only ever set on the drawer's client, or after the reveal.
    pub word: Option<String>,
    pub category: Option<String>,
    pub word_length: Option<u32>,
    pub round: Option<u32>,
    pub total_rounds: Option<u32>,
    pub time_remaining: Option<u32>,
}

/// Read-only projection of the session.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionView {
    pub identity: Identity,
    pub room: Option<RoomView>,
    pub turn: Option<TurnView>,
    pub leaderboard: Vec<LeaderboardEntry>,
    /// Snapshot shown until the relay confirms live state.
    pub provisional: Option<PersistedSnapshot>,
    pub game_over: bool,
}

impl SessionView {
    pub fn room_code(&self) -> Option<&str> {
        self.room.as_ref().map(|r| r.code.as_str())
    }

    pub fn connection_id(&self) -> Option<&str> {
        self.identity.connection_id.as_deref()
    }

    /// Returns `true` if this connection hosts the room.
    pub fn is_host(&self) -> bool {
        match (&self.room, self.connection_id()) {
            (Some(room), Some(id)) => room.host_id == id,
            _ => false,
        }
    }

    /// Returns `true` if this connection is the current drawer.
    pub fn is_local_drawer(&self) -> bool {
        match (self.drawer_id(), self.connection_id()) {
            (Some(drawer), Some(id)) => drawer == id,
            _ => false,
        }
    }

    pub fn drawer_id(&self) -> Option<&str> {
        self.turn.as_ref().and_then(|t| t.drawer_id.as_deref())
    }

    /// This connection's entry in the membership list.
    pub fn local_player(&self) -> Option<&PlayerInfo> {
        let id = self.connection_id()?;
        self.room.as_ref()?.players.iter().find(|p| p.sid == id)
    }

    /// Username of the player with `sid`, if listed.
    pub fn username_of(&self, sid: &str) -> Option<&str> {
        self.room
            .as_ref()?
            .players
            .iter()
            .find(|p| p.sid == sid)
            .map(|p| p.username.as_str())
    }
}

/// Owner of the [`SessionView`].
#[derive(Debug)]
pub struct SessionStore {
    view: SessionView,
    tx: watch::Sender<SessionView>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(SessionView::default());
        Self {
            view: SessionView::default(),
            tx,
        }
    }

    pub fn view(&self) -> &SessionView {
        &self.view
    }

    /// Receiver that sees every accepted update.
    pub fn subscribe(&self) -> watch::Receiver<SessionView> {
        self.tx.subscribe()
    }

    pub fn set_connection_id(&mut self, sid: ConnectionId) {
        self.view.identity.connection_id = Some(sid);
        self.publish();
    }

    /// The transport session ended; its id is meaningless now.
    pub fn clear_connection_id(&mut self) {
        if self.view.identity.connection_id.take().is_some() {
            self.publish();
        }
    }

    pub fn set_username(&mut self, username: String) {
        self.view.identity.username = Some(username);
        self.publish();
    }

    /// Replace the room from `room_created`/`room_joined`.
    ///
    /// A new room starts with no turn, no leaderboard and no game-over flag.
    ///
    /// # Errors
    ///
    /// Returns [`ScribbleError::ProtocolViolation`] if the room code is
    /// malformed or disagrees with the room body, or if the room has no
    /// players. The view is left unchanged.
    pub fn apply_room(&mut self, room_code: &str, room: &RoomInfo) -> Result<()> {
        if !is_room_code(room_code) {
            return Err(ScribbleError::protocol(format!(
                "malformed room code {room_code:?}"
            )));
        }
        if !room.room_code.is_empty() && room.room_code != room_code {
            return Err(ScribbleError::protocol(format!(
                "room code mismatch: {room_code} vs {}",
                room.room_code
            )));
        }
        if room.player_count == Some(0) {
            return Err(ScribbleError::protocol("room reports zero players"));
        }
        if room.players.is_empty() {
            return Err(ScribbleError::protocol("room has no players"));
        }

        self.view.room = Some(RoomView {
            code: room_code.to_string(),
            host_id: room.host_sid.clone(),
            players: room.players.clone(),
            game_started: room.game_started,
        });
        self.view.turn = None;
        self.view.leaderboard.clear();
        self.view.game_over = false;
        tracing::debug!(room_code = %room_code, players = room.players.len(), "room replaced");
        self.publish();
        Ok(())
    }

    /// Replace membership from `player_joined`/`player_left`.
    ///
    /// # Errors
    ///
    /// Returns [`ScribbleError::NotInRoom`] without a room, or
    /// [`ScribbleError::ProtocolViolation`] for an empty list.
    pub fn replace_players(&mut self, players: &[PlayerInfo]) -> Result<()> {
        if players.is_empty() {
            return Err(ScribbleError::protocol("membership list is empty"));
        }
        let room = self.view.room.as_mut().ok_or(ScribbleError::NotInRoom)?;
        room.players = players.to_vec();
        self.publish();
        Ok(())
    }

    /// Replace the turn at `game_started`/`new_turn`.
    ///
    /// Clears every `has_guessed` flag and any provisional snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`ScribbleError::NotInRoom`] without a room.
    pub fn begin_turn(
        &mut self,
        drawer_sid: &str,
        drawer_username: Option<String>,
        category: Option<String>,
        word_length: Option<u32>,
        game_state: Option<&GameStateInfo>,
    ) -> Result<()> {
        let room = self.view.room.as_mut().ok_or(ScribbleError::NotInRoom)?;
        room.game_started = true;
        for player in &mut room.players {
            player.has_guessed = false;
        }
        let drawer_username = drawer_username.or_else(|| {
            room.players
                .iter()
                .find(|p| p.sid == drawer_sid)
                .map(|p| p.username.clone())
        });

        self.view.turn = Some(TurnView {
            drawer_id: Some(drawer_sid.to_string()),
            drawer_username,
            word: None,
            category: category.or_else(|| game_state.and_then(|g| g.word_category.clone())),
            word_length,
            round: game_state.and_then(|g| g.current_round),
            total_rounds: game_state.and_then(|g| g.total_rounds),
            time_remaining: game_state.and_then(|g| g.time_remaining),
        });
        self.view.provisional = None;
        self.view.game_over = false;
        tracing::debug!(drawer = %drawer_sid, "turn replaced");
        self.publish();
        Ok(())
    }

    /// Record the plaintext word sent to this client as drawer.
    pub fn set_word(&mut self, word: String, category: String) {
        let local = self.view.identity.connection_id.clone();
        let turn = self.view.turn.get_or_insert_with(|| TurnView {
            drawer_id: local,
            ..TurnView::default()
        });
        turn.word_length = u32::try_from(word.chars().count()).ok();
        turn.word = Some(word);
        turn.category = Some(category);
        self.publish();
    }

    pub fn set_time_remaining(&mut self, seconds: u32) {
        if let Some(turn) = self.view.turn.as_mut() {
            turn.time_remaining = Some(seconds);
            self.publish();
        }
    }

    /// Record the reveal and leaderboard from `turn_ended`.
    pub fn end_turn(&mut self, word: String, leaderboard: &[LeaderboardEntry]) {
        if let Some(turn) = self.view.turn.as_mut() {
            turn.word = Some(word);
            turn.time_remaining = Some(0);
        }
        self.replace_leaderboard_inner(leaderboard);
        self.publish();
    }

    /// Record the final standings from `game_ended`.
    pub fn end_game(&mut self, final_leaderboard: &[LeaderboardEntry]) {
        self.view.turn = None;
        if let Some(room) = self.view.room.as_mut() {
            room.game_started = false;
        }
        self.view.game_over = true;
        self.replace_leaderboard_inner(final_leaderboard);
        self.publish();
    }

    /// Replace the leaderboard (e.g. after a correct guess) and copy the
    /// scores onto the membership list.
    pub fn replace_leaderboard(&mut self, leaderboard: &[LeaderboardEntry]) {
        self.replace_leaderboard_inner(leaderboard);
        self.publish();
    }

    pub fn mark_guessed(&mut self, sid: &str) {
        let Some(room) = self.view.room.as_mut() else {
            return;
        };
        let mut changed = false;
        for player in room.players.iter_mut().filter(|p| p.sid == sid) {
            player.has_guessed = true;
            changed = true;
        }
        if changed {
            self.publish();
        }
    }

    /// Replace the turn from a `game_state_update`.
    ///
    /// The plaintext word is kept only if this connection is the drawer.
    /// Guessers keep its length.
    pub fn apply_game_state(&mut self, update: &GameStateUpdate) {
        let local_is_drawer = match (&update.drawer_sid, &self.view.identity.connection_id) {
            (Some(drawer), Some(id)) => drawer == id,
            _ => false,
        };
        let word_length = update.word_length.or_else(|| {
            update
                .word
                .as_ref()
                .and_then(|w| u32::try_from(w.chars().count()).ok())
        });
        self.view.turn = Some(TurnView {
            drawer_id: update.drawer_sid.clone(),
            drawer_username: update.current_drawer.clone(),
            word: update.word.clone().filter(|_| local_is_drawer),
            category: update.category.clone(),
            word_length,
            round: update.current_round,
            total_rounds: None,
            time_remaining: update.time_remaining,
        });
        if let Some(room) = self.view.room.as_mut() {
            room.game_started = true;
        }
        self.view.provisional = None;
        self.publish();
    }

    /// Show a persisted snapshot until live state arrives.
    pub fn restore_provisional(&mut self, snapshot: PersistedSnapshot) {
        if self.view.identity.username.is_none() {
            self.view.identity.username = Some(snapshot.username.clone());
        }
        self.view.provisional = Some(snapshot);
        self.publish();
    }

    fn replace_leaderboard_inner(&mut self, leaderboard: &[LeaderboardEntry]) {
        self.view.leaderboard = leaderboard.to_vec();
        if let Some(room) = self.view.room.as_mut() {
            for player in &mut room.players {
                let entry = leaderboard.iter().find(|e| {
                    if e.sid.is_empty() {
                        e.username == player.username
                    } else {
                        e.sid == player.sid
                    }
                });
                if let Some(entry) = entry {
                    player.score = entry.score;
                }
            }
        }
    }

    fn publish(&self) {
        self.tx.send_replace(self.view.clone());
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

    fn player(sid: &str, name: &str) -> PlayerInfo {
        PlayerInfo {
            sid: sid.into(),
            username: name.into(),
            score: 0,
            has_guessed: false,
        }
    }

    fn room(players: Vec<PlayerInfo>) -> RoomInfo {
        RoomInfo {
            room_code: "AB12CD".into(),
            host_sid: "s1".into(),
            player_count: Some(u32::try_from(players.len()).unwrap()),
            players,
            game_started: false,
        }
    }

    fn joined_store() -> SessionStore {
        let mut store = SessionStore::new();
        store.set_connection_id("s1".into());
        store
            .apply_room("AB12CD", &room(vec![player("s1", "Alice"), player("s2", "Bob")]))
            .unwrap();
        store
    }

    #[test]
    fn zero_player_room_is_rejected_without_mutation() {
        let mut store = SessionStore::new();
        store.set_connection_id("s1".into());
        let before = store.view().clone();

        let mut empty = room(vec![]);
        empty.player_count = Some(0);
        let err = store.apply_room("AB12CD", &empty).unwrap_err();
        assert!(matches!(err, ScribbleError::ProtocolViolation { .. }));
        assert_eq!(store.view(), &before);

        let mut miscounted = room(vec![player("s1", "Alice")]);
        miscounted.player_count = Some(0);
        assert!(store.apply_room("AB12CD", &miscounted).is_err());
        assert!(store.apply_room("ab12cd", &room(vec![player("s1", "A")])).is_err());
        assert_eq!(store.view(), &before);
    }

    #[test]
    fn host_and_drawer_are_derived_from_identity() {
        let mut store = joined_store();
        assert!(store.view().is_host());
        assert!(!store.view().is_local_drawer());

        store.begin_turn("s1", None, None, Some(4), None).unwrap();
        assert!(store.view().is_local_drawer());
        assert_eq!(
            store.view().turn.as_ref().unwrap().drawer_username.as_deref(),
            Some("Alice")
        );
    }

    #[test]
    fn new_turn_resets_every_guess_flag() {
        let mut store = joined_store();
        store.mark_guessed("s2");
        assert!(store.view().room.as_ref().unwrap().players[1].has_guessed);

        store.begin_turn("s2", None, None, None, None).unwrap();
        assert!(store
            .view()
            .room
            .as_ref()
            .unwrap()
            .players
            .iter()
            .all(|p| !p.has_guessed));
    }

    #[test]
    fn membership_is_a_full_replace() {
        let mut store = joined_store();
        store.replace_players(&[player("s3", "Cara")]).unwrap();
        let players = &store.view().room.as_ref().unwrap().players;
        assert_eq!(players.len(), 1);
        assert_eq!(players[0].sid, "s3");
        assert!(store.replace_players(&[]).is_err());

        let mut lonely = SessionStore::new();
        assert!(matches!(
            lonely.replace_players(&[player("s1", "A")]),
            Err(ScribbleError::NotInRoom)
        ));
    }

    #[test]
    fn game_state_hides_word_from_guessers() {
        let mut store = joined_store();
        store.apply_game_state(&GameStateUpdate {
            current_drawer: Some("Bob".into()),
            drawer_sid: Some("s2".into()),
            word: Some("zebra".into()),
            category: Some("Animals".into()),
            current_round: Some(2),
            ..GameStateUpdate::default()
        });
        let turn = store.view().turn.clone().unwrap();
        assert_eq!(turn.word, None);
        assert_eq!(turn.word_length, Some(5));
        assert_eq!(turn.round, Some(2));
    }

    #[test]
    fn authoritative_turn_clears_provisional_snapshot() {
        let mut store = joined_store();
        store.restore_provisional(PersistedSnapshot {
            username: "Alice".into(),
            room_code: "AB12CD".into(),
            is_drawer: true,
            drawer_username: Some("Alice".into()),
        });
        assert!(store.view().provisional.is_some());
        store.begin_turn("s2", None, None, None, None).unwrap();
        assert!(store.view().provisional.is_none());
    }

    #[test]
    fn leaderboard_scores_flow_onto_players() {
        let mut store = joined_store();
        store.replace_leaderboard(&[LeaderboardEntry {
            sid: String::new(),
            username: "Bob".into(),
            score: 120,
        }]);
        assert_eq!(store.view().room.as_ref().unwrap().players[1].score, 120);

        store.end_game(&[]);
        assert!(store.view().game_over);
        assert!(store.view().turn.is_none());
    }

    #[tokio::test]
    async fn subscribers_see_accepted_updates() {
        let mut store = SessionStore::new();
        let mut rx = store.subscribe();
        store.set_username("Alice".into());
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().identity.username.as_deref(), Some("Alice"));
    }
}
