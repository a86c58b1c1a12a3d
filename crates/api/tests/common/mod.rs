// All functions in this module are shared test helpers. Not every test
// binary uses every helper, so we suppress dead_code warnings here.
#![allow(dead_code)]

use std::str::FromStr;
use std::sync::Arc;

use axum::extract::ws::Message;
use axum::Router;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tokio::sync::mpsc;

use poker_api::config::ServerConfig;
use poker_api::router::build_app_router;
use poker_api::state::AppState;
use poker_api::ws::auto_reveal::AutoRevealScheduler;
use poker_api::ws::limits::SEND_BUFFER_SIZE;
use poker_api::ws::{Connection, Hub};
use poker_core::config::RoomConfig;
use poker_db::models::participant::{CreateParticipant, Participant, ParticipantRole};
use poker_db::models::room::{CreateRoom, Room};
use poker_db::repositories::{ParticipantRepo, RoomRepo};
use poker_db::DbPool;

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:3000".to_string()],
        request_timeout_secs: 30,
        ws_allowed_origins: vec!["localhost:*".to_string(), "127.0.0.1:*".to_string()],
        dev_mode: true,
    }
}

/// Build a migrated in-memory database.
pub async fn test_pool() -> DbPool {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .expect("valid sqlite url")
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .expect("connect to in-memory sqlite");
    poker_db::run_migrations(&pool).await.expect("run migrations");
    pool
}

/// Build a full `AppState` over a fresh in-memory database.
pub async fn test_state() -> AppState {
    AppState {
        pool: test_pool().await,
        config: Arc::new(test_config()),
        hub: Arc::new(Hub::new()),
        auto_reveal: Arc::new(AutoRevealScheduler::new()),
    }
}

/// Build the full application router over a fresh state, exercising the
/// same middleware stack production uses.
pub async fn build_test_app() -> (Router, AppState) {
    let state = test_state().await;
    let app = build_app_router(state.clone(), &state.config.clone());
    (app, state)
}

/// Create a room with the given config.
pub async fn create_room_with_config(state: &AppState, name: &str, config: RoomConfig) -> Room {
    RoomRepo::create(
        &state.pool,
        &CreateRoom {
            name: name.to_string(),
            pointing_method: "fibonacci".to_string(),
            custom_values: poker_core::votes::fibonacci_values(),
            config,
        },
    )
    .await
    .expect("create room")
}

/// Create a room with the default (permissive) config.
pub async fn create_room(state: &AppState, name: &str) -> Room {
    create_room_with_config(state, name, RoomConfig::default()).await
}

/// Join a participant with a fresh session token.
pub async fn join(state: &AppState, room_id: &str, name: &str, role: ParticipantRole) -> Participant {
    ParticipantRepo::create(
        &state.pool,
        &CreateParticipant {
            room_id: room_id.to_string(),
            name: name.to_string(),
            role,
            session_token: uuid::Uuid::new_v4().to_string(),
        },
    )
    .await
    .expect("join participant")
}

/// Register a hub connection for a participant, returning the handle and
/// the receiving end of its send buffer.
pub async fn attach(
    state: &AppState,
    room_id: &str,
    participant_id: Option<&str>,
) -> (Arc<Connection>, mpsc::Receiver<Message>) {
    let (tx, rx) = mpsc::channel(SEND_BUFFER_SIZE);
    let conn = Arc::new(Connection::new(
        state.hub.next_connection_id(),
        room_id.to_string(),
        participant_id.map(str::to_string),
        tx,
    ));
    state.hub.register(Arc::clone(&conn)).await;
    (conn, rx)
}

/// Pop the next queued frame from a connection's buffer as JSON.
pub fn next_event(rx: &mut mpsc::Receiver<Message>) -> Option<serde_json::Value> {
    match rx.try_recv() {
        Ok(Message::Text(text)) => {
            Some(serde_json::from_str(&text).expect("frame is valid JSON"))
        }
        Ok(other) => panic!("expected text frame, got {other:?}"),
        Err(_) => None,
    }
}

/// Drain frames until one matches `event_type` (or the buffer empties).
pub fn find_event(
    rx: &mut mpsc::Receiver<Message>,
    event_type: &str,
) -> Option<serde_json::Value> {
    while let Some(event) = next_event(rx) {
        if event["type"] == event_type {
            return Some(event);
        }
    }
    None
}

/// Await the next frame (for events produced by background tasks).
pub async fn wait_event(
    rx: &mut mpsc::Receiver<Message>,
    event_type: &str,
) -> Option<serde_json::Value> {
    loop {
        let message = tokio::time::timeout(std::time::Duration::from_secs(3), rx.recv())
            .await
            .ok()??;
        if let Message::Text(text) = message {
            let event: serde_json::Value =
                serde_json::from_str(&text).expect("frame is valid JSON");
            if event["type"] == event_type {
                return Some(event);
            }
        }
    }
}
