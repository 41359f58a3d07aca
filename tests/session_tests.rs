//! Session behaviour driven by relay frames, without any transport.
//!
//! Each test feeds [`ServerMessage`]s straight into [`Session::handle_message`]
//! and inspects the returned [`SessionEvent`]s and the resulting view.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing
)]

mod common;

use scribble_client::error::{ScribbleError, ValidationError};
use scribble_client::event::{NotificationLevel, PageContext, SessionEvent};
use scribble_client::persistence::{MemorySnapshotStore, PersistedSnapshot, PersistenceBridge};
use scribble_client::protocol::{ClientMessage, ServerMessage};
use scribble_client::session::Session;
use scribble_client::turn::TurnPhase;

use common::{
    connected, correct_guess, dot, entry, game_ended, game_started, game_state_update, line,
    new_turn, new_turn_with_length, player, room_created, room_joined, timer_update, turn_ended,
    your_turn,
};

// ════════════════════════════════════════════════════════════════════
// Helpers
// ════════════════════════════════════════════════════════════════════

const ROOM: &str = "AB12CD";

fn players() -> Vec<scribble_client::protocol::PlayerInfo> {
    vec![
        player("sid-a", "Alice", 0),
        player("sid-b", "Bob", 0),
        player("sid-c", "Cara", 0),
    ]
}

/// A session for `me` that has joined [`ROOM`], hosted by Alice.
fn joined_as(me: &str, username: &str) -> Session {
    let mut session = Session::headless(PersistenceBridge::in_memory(), PageContext::Home);
    session.join_room(ROOM, username).unwrap();
    session.handle_message(connected(me));
    let events = session.handle_message(room_joined(ROOM, "sid-a", players()));
    assert!(
        events.iter().any(|e| matches!(e, SessionEvent::RoomJoined { .. })),
        "join should be accepted, got {events:?}"
    );
    session
}

fn notifications(events: &[SessionEvent], level: NotificationLevel) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match e {
            SessionEvent::Notification { level: l, message } if *l == level => {
                Some(message.clone())
            }
            _ => None,
        })
        .collect()
}

fn word_display(events: &[SessionEvent]) -> Option<(String, Option<String>)> {
    events.iter().rev().find_map(|e| match e {
        SessionEvent::WordDisplayChanged { text, category } => {
            Some((text.clone(), category.clone()))
        }
        _ => None,
    })
}

// ════════════════════════════════════════════════════════════════════
// Turns
// ════════════════════════════════════════════════════════════════════

#[test]
fn exactly_one_client_may_draw_after_every_new_turn() {
    let mut sessions = vec![
        joined_as("sid-a", "Alice"),
        joined_as("sid-b", "Bob"),
        joined_as("sid-c", "Cara"),
    ];

    for drawer in ["sid-b", "sid-c", "sid-a", "sid-a", "sid-b"] {
        for session in &mut sessions {
            // Leave some guessed markers behind from the previous turn.
            session.handle_message(correct_guess(
                "Cara",
                10,
                vec![entry("sid-c", "Cara", 10)],
            ));
            session.handle_message(new_turn(drawer));
        }

        let drawers: Vec<_> = sessions
            .iter()
            .filter(|s| s.turn().can_draw())
            .map(|s| s.view().connection_id().unwrap().to_string())
            .collect();
        assert_eq!(drawers, [drawer]);

        for session in &sessions {
            let room = session.view().room.as_ref().unwrap();
            assert!(room.players.iter().all(|p| !p.has_guessed));
            assert!(session.scoreboard().rows().iter().all(|r| !r.has_guessed));
            assert_eq!(session.view().drawer_id(), Some(drawer));
        }
    }
}

#[test]
fn spectator_sees_blanks_category_and_no_tools() {
    let mut session = joined_as("sid-b", "Bob");
    let events = session.handle_message(new_turn_with_length("sid-a", "animals", 5));

    assert_eq!(session.turn().phase(), TurnPhase::Spectating);
    assert!(!session.turn().can_draw());
    assert_eq!(session.turn().word_display(), "_ _ _ _ _");
    assert_eq!(session.turn().category(), Some("animals"));
    assert_eq!(
        word_display(&events),
        Some(("_ _ _ _ _".to_string(), Some("animals".to_string())))
    );
    assert!(events.contains(&SessionEvent::CanvasCleared));
}

#[test]
fn spectator_without_word_length_waits() {
    let mut session = joined_as("sid-b", "Bob");
    session.handle_message(new_turn("sid-a"));
    assert_eq!(session.turn().word_display(), "Waiting for turn...");
}

#[test]
fn drawer_keeps_early_strokes_when_the_word_arrives() {
    let mut session = joined_as("sid-a", "Alice");
    let events = session.handle_message(new_turn("sid-a"));
    assert_eq!(session.turn().phase(), TurnPhase::DrawingPending);
    assert!(events.contains(&SessionEvent::DrawPermissionChanged { enabled: true }));
    assert_eq!(session.turn().word_display(), "Loading word...");

    let frame = session.submit_stroke(dot(10.0, 10.0));
    assert!(matches!(frame, Some(ClientMessage::Draw(_))));

    let events = session.handle_message(your_turn("apple", "food"));
    assert_eq!(session.turn().phase(), TurnPhase::Drawing);
    assert!(!events.contains(&SessionEvent::CanvasCleared));
    assert_eq!(session.draw().canvas().strokes().len(), 1);
    assert_eq!(session.turn().word_display(), "apple");
    assert_eq!(session.view().turn.as_ref().unwrap().word.as_deref(), Some("apple"));
}

#[test]
fn stray_word_does_not_make_a_guesser_the_drawer() {
    let mut session = joined_as("sid-b", "Bob");
    session.handle_message(new_turn("sid-a"));
    assert_eq!(session.turn().phase(), TurnPhase::Spectating);

    let events = session.handle_message(your_turn("kiwi", "food"));
    assert_eq!(session.turn().phase(), TurnPhase::Spectating);
    assert!(!session.turn().can_draw());
    assert_eq!(session.turn().word(), None);
    assert!(session.view().turn.as_ref().unwrap().word.is_none());
    assert!(!session.view().is_local_drawer());
    assert!(!events.contains(&SessionEvent::DrawPermissionChanged { enabled: true }));
    assert!(!events.contains(&SessionEvent::CanvasCleared));
    assert_eq!(notifications(&events, NotificationLevel::Error).len(), 1);
    assert!(session.submit_stroke(dot(10.0, 10.0)).is_none());
}

#[test]
fn round_over_dismisses_after_three_ticks() {
    let mut session = joined_as("sid-b", "Bob");
    session.handle_message(new_turn("sid-a"));

    let events = session.handle_message(turn_ended(
        "zebra",
        vec![entry("sid-a", "Alice", 20), entry("sid-b", "Bob", 50)],
    ));
    assert_eq!(session.turn().phase(), TurnPhase::RoundOver);
    assert_eq!(session.turn().word_display(), "zebra");
    assert!(events.contains(&SessionEvent::RoundOverCountdown { remaining: 3 }));
    assert!(!session.timer().is_active());

    assert!(session
        .tick()
        .contains(&SessionEvent::RoundOverCountdown { remaining: 2 }));
    assert!(session
        .tick()
        .contains(&SessionEvent::RoundOverCountdown { remaining: 1 }));
    let events = session.tick();
    assert!(events.contains(&SessionEvent::RoundOverDismissed));
    assert_eq!(session.turn().phase(), TurnPhase::Idle);
    assert!(session.tick().is_empty());
}

#[test]
fn game_over_is_terminal_until_a_new_room() {
    let mut session = joined_as("sid-b", "Bob");
    session.handle_message(new_turn("sid-a"));

    let events = session.handle_message(game_ended(vec![
        entry("sid-a", "Alice", 50),
        entry("sid-b", "Bob", 50),
        entry("sid-c", "Cara", 30),
    ]));
    assert_eq!(session.turn().phase(), TurnPhase::GameOver);
    let winners = events
        .iter()
        .find_map(|e| match e {
            SessionEvent::GameOver { winners, .. } => Some(winners.clone()),
            _ => None,
        })
        .expect("GameOver event");
    let names: Vec<_> = winners.iter().map(|w| w.username.as_str()).collect();
    assert_eq!(names, ["Alice", "Bob"]);
    assert!(session.view().game_over);

    assert!(session.handle_message(new_turn("sid-b")).is_empty());
    assert!(session.handle_message(your_turn("kiwi", "food")).is_empty());
    assert_eq!(session.turn().phase(), TurnPhase::GameOver);
    assert!(session.view().game_over);

    session.handle_message(room_joined(ROOM, "sid-a", players()));
    assert_eq!(session.turn().phase(), TurnPhase::Idle);
    assert!(!session.view().game_over);
}

#[test]
fn game_started_navigates_to_the_game_page() {
    let mut session = joined_as("sid-b", "Bob");
    assert_eq!(session.page(), PageContext::Lobby);

    let events = session.handle_message(game_started("sid-a"));
    assert!(events.contains(&SessionEvent::NavigateTo(PageContext::Game)));
    assert_eq!(session.page(), PageContext::Game);
    assert_eq!(session.timer().remaining(), 60);
    assert_eq!(session.view().turn.as_ref().unwrap().total_rounds, Some(3));
}

// ════════════════════════════════════════════════════════════════════
// Room validation and navigation
// ════════════════════════════════════════════════════════════════════

#[test]
fn empty_room_is_rejected_without_touching_state() {
    let mut session = joined_as("sid-b", "Bob");
    session.handle_message(new_turn("sid-a"));
    let before = session.view().clone();

    let mut bad = room_created("ZZ99ZZ", "sid-b", players());
    if let ServerMessage::RoomCreated { room, .. } = &mut bad {
        room.player_count = Some(0);
    }
    let events = session.handle_message(bad);

    assert_eq!(notifications(&events, NotificationLevel::Error).len(), 1);
    assert_eq!(events.len(), 1);
    assert_eq!(session.view(), &before);
    assert_eq!(session.turn().phase(), TurnPhase::Spectating);
}

#[test]
fn malformed_room_code_is_rejected() {
    let mut session = Session::headless(PersistenceBridge::in_memory(), PageContext::Home);
    let events = session.handle_message(room_joined("abc", "sid-a", players()));
    assert_eq!(notifications(&events, NotificationLevel::Error).len(), 1);
    assert!(session.view().room.is_none());
    assert_eq!(session.page(), PageContext::Home);
}

#[test]
fn rejoin_on_game_page_stays_on_game_page() {
    let mut session = Session::headless(PersistenceBridge::in_memory(), PageContext::Game);
    session.handle_message(connected("sid-b"));
    let events = session.handle_message(room_joined(ROOM, "sid-a", players()));
    assert!(!events.iter().any(|e| matches!(e, SessionEvent::NavigateTo(_))));
    assert_eq!(session.page(), PageContext::Game);
}

#[test]
fn created_room_makes_the_creator_host() {
    let mut session = Session::headless(PersistenceBridge::in_memory(), PageContext::Home);
    session.create_room("  Alice ").unwrap();
    session.handle_message(connected("sid-a"));
    let events =
        session.handle_message(room_created(ROOM, "sid-a", vec![player("sid-a", "Alice", 0)]));

    assert!(events.contains(&SessionEvent::RoomCreated {
        room_code: ROOM.into(),
        is_host: true,
    }));
    assert!(events.contains(&SessionEvent::NavigateTo(PageContext::Lobby)));
    assert_eq!(
        session.start_game().unwrap(),
        ClientMessage::StartGame {
            room_code: ROOM.into()
        }
    );
}

#[test]
fn only_the_host_may_start() {
    let session = joined_as("sid-b", "Bob");
    assert!(matches!(
        session.start_game(),
        Err(ScribbleError::Validation(ValidationError::NotHost))
    ));
}

#[test]
fn membership_changes_replace_the_list() {
    let mut session = joined_as("sid-b", "Bob");
    let events = session.handle_message(ServerMessage::PlayerLeft {
        username: "Cara".into(),
        players: vec![player("sid-a", "Alice", 0), player("sid-b", "Bob", 0)],
    });
    assert_eq!(
        notifications(&events, NotificationLevel::Info),
        ["Cara left the room"]
    );
    assert_eq!(session.view().room.as_ref().unwrap().players.len(), 2);
    assert_eq!(session.scoreboard().rows().len(), 2);
}

// ════════════════════════════════════════════════════════════════════
// Timer
// ════════════════════════════════════════════════════════════════════

#[test]
fn timer_follows_corrections_and_never_goes_negative() {
    let mut session = joined_as("sid-b", "Bob");
    session.handle_message(new_turn("sid-a"));
    assert_eq!(session.timer().remaining(), 60);

    session.tick();
    session.tick();
    assert_eq!(session.timer().remaining(), 58);

    let events = session.handle_message(timer_update(45));
    assert_eq!(session.timer().remaining(), 45);
    assert!(events.contains(&SessionEvent::TimerChanged {
        remaining: 45,
        warning: false,
    }));

    session.handle_message(timer_update(50));
    assert_eq!(session.timer().remaining(), 50);

    for _ in 0..80 {
        session.tick();
    }
    assert_eq!(session.timer().remaining(), 0);
    assert!(session.timer().is_warning());
    // Reaching zero does not end the turn locally.
    assert_eq!(session.turn().phase(), TurnPhase::Spectating);
}

// ════════════════════════════════════════════════════════════════════
// Drawing
// ════════════════════════════════════════════════════════════════════

#[test]
fn spectator_strokes_are_neither_sent_nor_drawn() {
    let mut session = joined_as("sid-b", "Bob");
    session.handle_message(new_turn("sid-a"));

    assert!(session.submit_stroke(line(0.0, 0.0, 10.0, 10.0)).is_none());
    assert!(session.pointer_down(5.0, 5.0).is_none());
    assert!(session.clear_canvas().is_none());
    assert!(session.draw().canvas().strokes().is_empty());
}

#[test]
fn remote_strokes_reach_spectators_only() {
    let mut spectator = joined_as("sid-b", "Bob");
    let mut drawer = joined_as("sid-a", "Alice");
    spectator.handle_message(new_turn("sid-a"));
    drawer.handle_message(new_turn("sid-a"));

    let stroke = ServerMessage::Draw(dot(1.0, 2.0));
    spectator.handle_message(stroke.clone());
    drawer.handle_message(stroke);
    assert_eq!(spectator.draw().canvas().strokes(), [dot(1.0, 2.0)]);
    assert!(drawer.draw().canvas().strokes().is_empty());

    let events = spectator.handle_message(ServerMessage::ClearCanvas {});
    assert!(events.contains(&SessionEvent::CanvasCleared));
    assert!(spectator.draw().canvas().strokes().is_empty());
}

#[test]
fn drawer_pointer_input_becomes_draw_frames() {
    let mut session = joined_as("sid-a", "Alice");
    session.handle_message(new_turn("sid-a"));
    session.handle_message(your_turn("apple", "food"));

    let down = session.pointer_down(10.0, 10.0);
    let moved = session.pointer_move(20.0, 15.0);
    session.pointer_up();
    assert!(session.pointer_move(30.0, 30.0).is_none());

    let Some(ClientMessage::Draw(first)) = down else {
        panic!("expected draw frame, got {down:?}");
    };
    let Some(ClientMessage::Draw(second)) = moved else {
        panic!("expected draw frame, got {moved:?}");
    };
    assert_eq!(first.room_code, ROOM);
    assert!(matches!(first.stroke, scribble_client::StrokeEvent::Dot { .. }));
    assert!(matches!(second.stroke, scribble_client::StrokeEvent::Line { .. }));
    assert_eq!(session.draw().canvas().strokes().len(), 2);
}

#[test]
fn turn_boundary_wipes_the_canvas() {
    let mut session = joined_as("sid-b", "Bob");
    session.handle_message(new_turn("sid-a"));
    session.handle_message(ServerMessage::Draw(dot(1.0, 1.0)));
    assert_eq!(session.draw().canvas().strokes().len(), 1);

    session.handle_message(new_turn("sid-c"));
    assert!(session.draw().canvas().strokes().is_empty());
}

// ════════════════════════════════════════════════════════════════════
// Guessing, chat and reactions
// ════════════════════════════════════════════════════════════════════

#[test]
fn correct_guess_marks_the_guesser_by_name() {
    let mut session = joined_as("sid-b", "Bob");
    session.handle_message(new_turn("sid-a"));

    let events = session.handle_message(correct_guess(
        "Bob",
        80,
        vec![entry("sid-b", "Bob", 80), entry("sid-a", "Alice", 40)],
    ));
    assert_eq!(
        notifications(&events, NotificationLevel::Success),
        ["Bob guessed correctly! +80 points"]
    );
    assert!(events.contains(&SessionEvent::ChatMessage {
        username: "System".into(),
        message: "Bob guessed the word!".into(),
        is_system: true,
    }));
    assert!(session.scoreboard().has_guessed("sid-b"));
    assert!(session.view().local_player().unwrap().has_guessed);
    assert_eq!(session.view().local_player().unwrap().score, 80);
    assert_eq!(session.scoreboard().rows()[0].username, "Bob");

    assert!(matches!(
        session.guess("zebra"),
        Err(ScribbleError::Validation(ValidationError::AlreadyGuessed))
    ));
}

#[test]
fn drawer_cannot_guess_and_blank_guesses_are_refused() {
    let mut session = joined_as("sid-a", "Alice");
    session.handle_message(new_turn("sid-a"));
    assert!(matches!(
        session.guess("apple"),
        Err(ScribbleError::Validation(ValidationError::DrawerCannotGuess))
    ));

    let mut guesser = joined_as("sid-b", "Bob");
    guesser.handle_message(new_turn("sid-a"));
    assert!(matches!(
        guesser.guess("   "),
        Err(ScribbleError::Validation(ValidationError::EmptyMessage))
    ));
    assert_eq!(
        guesser.guess(" apple ").unwrap(),
        ClientMessage::Guess {
            room_code: ROOM.into(),
            text: "apple".into(),
        }
    );
}

#[test]
fn already_guessed_is_a_warning() {
    let mut session = joined_as("sid-b", "Bob");
    session.handle_message(new_turn("sid-a"));
    let events = session.handle_message(ServerMessage::AlreadyGuessed {
        message: "You already guessed the word!".into(),
    });
    assert_eq!(
        notifications(&events, NotificationLevel::Warning),
        ["You already guessed the word!"]
    );
    assert!(session.guess("again").is_err());
}

#[test]
fn reactions_are_clamped_to_the_canvas() {
    let session = joined_as("sid-b", "Bob");
    assert_eq!(
        session.react("🎉", 150.0, -5.0).unwrap(),
        ClientMessage::Reaction {
            room_code: ROOM.into(),
            emoji: "🎉".into(),
            x: 100.0,
            y: 0.0,
        }
    );
}

#[test]
fn operations_outside_a_room_fail() {
    let session = Session::headless(PersistenceBridge::in_memory(), PageContext::Home);
    assert!(matches!(session.chat("hi"), Err(ScribbleError::NotInRoom)));
    assert!(matches!(session.guess("hi"), Err(ScribbleError::NotInRoom)));
}

#[test]
fn bad_join_input_is_refused_locally() {
    let mut session = Session::headless(PersistenceBridge::in_memory(), PageContext::Home);
    assert!(matches!(
        session.join_room("AB12", "Bob"),
        Err(ScribbleError::Validation(ValidationError::InvalidRoomCode))
    ));
    assert!(matches!(
        session.join_room("ab12cd", "B"),
        Err(ScribbleError::Validation(ValidationError::UsernameLength { .. }))
    ));
    assert_eq!(
        session.join_room(" ab12cd ", "Bob").unwrap(),
        ClientMessage::JoinRoom {
            room_code: ROOM.into(),
            username: "Bob".into(),
        }
    );
}

#[test]
fn relay_errors_become_notifications() {
    let mut session = joined_as("sid-b", "Bob");
    let events = session.handle_message(ServerMessage::Error {
        message: String::new(),
    });
    assert_eq!(
        notifications(&events, NotificationLevel::Error),
        ["An error occurred"]
    );
    let events = session.handle_message(ServerMessage::JoinError {
        message: "Room not found".into(),
    });
    assert_eq!(
        notifications(&events, NotificationLevel::Error),
        ["Room not found"]
    );
}

// ════════════════════════════════════════════════════════════════════
// Persistence and provisional state
// ════════════════════════════════════════════════════════════════════

#[test]
fn snapshot_follows_room_and_drawer() {
    let mut session = joined_as("sid-a", "Alice");
    let snapshot = session.persistence().load().unwrap();
    assert_eq!(snapshot.username, "Alice");
    assert_eq!(snapshot.room_code, ROOM);
    assert!(!snapshot.is_drawer);

    session.handle_message(new_turn("sid-a"));
    let snapshot = session.persistence().load().unwrap();
    assert!(snapshot.is_drawer);
    assert_eq!(snapshot.drawer_username.as_deref(), Some("Alice"));
}

#[test]
fn provisional_drawer_state_until_live_state_arrives() {
    let persistence = PersistenceBridge::new(MemorySnapshotStore::with_snapshot(
        PersistedSnapshot {
            username: "Alice".into(),
            room_code: ROOM.into(),
            is_drawer: true,
            drawer_username: Some("Alice".into()),
        },
    ));
    let mut session = Session::headless(persistence, PageContext::Game);
    let events = session.restore_provisional();

    assert!(events.contains(&SessionEvent::DrawPermissionChanged { enabled: true }));
    assert_eq!(session.turn().phase(), TurnPhase::DrawingPending);
    assert!(session.view().provisional.is_some());
    assert_eq!(session.view().identity.username.as_deref(), Some("Alice"));

    session.handle_message(connected("sid-a2"));
    session.handle_message(room_joined(
        ROOM,
        "sid-a2",
        vec![player("sid-a2", "Alice", 0), player("sid-b", "Bob", 0)],
    ));
    session.handle_message(game_state_update("sid-a2", "Alice", Some("apple")));

    assert!(session.view().provisional.is_none());
    assert_eq!(session.turn().phase(), TurnPhase::Drawing);
    assert_eq!(session.turn().word(), Some("apple"));
    assert!(session.timer().is_active());
    assert_eq!(session.timer().remaining(), 42);
}

#[test]
fn provisional_restore_is_skipped_off_the_game_page() {
    let persistence = PersistenceBridge::new(MemorySnapshotStore::with_snapshot(
        PersistedSnapshot {
            username: "Alice".into(),
            room_code: ROOM.into(),
            is_drawer: true,
            drawer_username: Some("Alice".into()),
        },
    ));
    let mut session = Session::headless(persistence, PageContext::Lobby);
    assert!(session.restore_provisional().is_empty());
    assert!(session.view().provisional.is_none());
}

#[test]
fn guesser_never_keeps_the_word_from_a_state_update() {
    let mut session = joined_as("sid-b", "Bob");
    session.handle_message(game_state_update("sid-a", "Alice", Some("apple")));
    assert_eq!(session.turn().phase(), TurnPhase::Spectating);
    assert!(session.view().turn.as_ref().unwrap().word.is_none());
    assert_eq!(session.turn().word_display(), "_ _ _ _ _");
}

#[test]
fn repeated_state_update_keeps_the_canvas() {
    let mut session = joined_as("sid-b", "Bob");
    session.handle_message(game_state_update("sid-a", "Alice", None));
    session.handle_message(ServerMessage::Draw(dot(3.0, 4.0)));
    let events = session.handle_message(game_state_update("sid-a", "Alice", None));
    assert!(!events.contains(&SessionEvent::CanvasCleared));
    assert_eq!(session.draw().canvas().strokes().len(), 1);
}

#[test]
fn disconnect_clears_identity() {
    let mut session = joined_as("sid-b", "Bob");
    let events = session.on_disconnected(Some("transport receive error".into()));
    assert!(session.view().connection_id().is_none());
    assert_eq!(
        notifications(&events, NotificationLevel::Warning),
        ["Disconnected from server"]
    );
    assert!(session.view().room.is_some());
}
