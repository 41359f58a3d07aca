//! # Headless Guesser
//!
//! A bot player with no canvas. It joins a room, watches the word blanks,
//! and guesses every word in a small vocabulary whose length matches.
//!
//! ## Running
//!
//! ```sh
//! # Start the relay on localhost:5000, create a room in a browser, then:
//! SCRIBBLE_ROOM=K7QX2M cargo run --example headless_guesser
//!
//! # Point at another relay or pick a name:
//! SCRIBBLE_SERVER_URL=ws://relay:5000/ws SCRIBBLE_USERNAME=Bot \
//!     SCRIBBLE_ROOM=K7QX2M cargo run --example headless_guesser
//! ```

use scribble_client::event::{NotificationLevel, SessionEvent};
use scribble_client::{ClientConfig, GameClient};

const VOCABULARY: &[&str] = &[
    "cat", "dog", "sun", "tree", "fish", "apple", "house", "pizza", "guitar", "rocket",
    "banana", "elephant",
];

/// Count the blanks in a masked word such as `"_ _ _ _"`.
fn blank_count(text: &str) -> Option<usize> {
    let blanks = text.split(' ').filter(|part| *part == "_").count();
    (blanks > 0 && blanks == text.split(' ').count()).then_some(blanks)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // ── Logging ─────────────────────────────────────────────────────
    // Set `RUST_LOG=scribble_client=debug` for protocol traces.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // ── Configuration ───────────────────────────────────────────────
    let config = ClientConfig::from_env();
    let room_code = std::env::var("SCRIBBLE_ROOM")
        .map_err(|_| "set SCRIBBLE_ROOM to the code of the room to join")?;
    let username = std::env::var("SCRIBBLE_USERNAME").unwrap_or_else(|_| "GuessBot".to_string());
    tracing::info!("Connecting to {}", config.server_url);

    let mut client = GameClient::connect(&config);

    // ── Event loop ──────────────────────────────────────────────────
    loop {
        tokio::select! {
            event = client.next_event() => {
                let Some(event) = event else {
                    tracing::info!("Connection closed, exiting");
                    break;
                };

                match event {
                    SessionEvent::Connected if client.view().room.is_none() => {
                        client.join_room(&room_code, &username)?;
                    }

                    SessionEvent::RoomJoined { room_code, .. } => {
                        tracing::info!("Joined room {room_code} as {username}");
                    }

                    SessionEvent::WordDisplayChanged { text, category } => {
                        let Some(length) = blank_count(&text) else {
                            continue;
                        };
                        tracing::info!(
                            "Guessing a {length}-letter word ({})",
                            category.as_deref().unwrap_or("no category")
                        );
                        for word in VOCABULARY.iter().filter(|w| w.len() == length) {
                            if client.guess(word).is_err() {
                                break;
                            }
                        }
                    }

                    SessionEvent::CorrectGuess { username, points } => {
                        tracing::info!("{username} scored {points}");
                    }

                    SessionEvent::RoundOver { word, .. } => {
                        tracing::info!("The word was {word}");
                    }

                    SessionEvent::GameOver { winners, .. } => {
                        let names: Vec<_> = winners.iter().map(|w| w.username.as_str()).collect();
                        tracing::info!("Game over, winners: {}", names.join(", "));
                        break;
                    }

                    SessionEvent::Notification { level: NotificationLevel::Error, message } => {
                        tracing::error!("{message}");
                    }

                    SessionEvent::ConnectionFailed { .. } => break,

                    other => {
                        tracing::debug!("Event: {other:?}");
                    }
                }
            }

            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Ctrl+C received, shutting down");
                break;
            }
        }
    }

    // ── Cleanup ─────────────────────────────────────────────────────
    client.shutdown().await;
    Ok(())
}
