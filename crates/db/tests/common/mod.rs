#![allow(dead_code)]

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

use poker_core::config::RoomConfig;
use poker_db::models::participant::{CreateParticipant, Participant, ParticipantRole};
use poker_db::models::room::{CreateRoom, Room};
use poker_db::repositories::{ParticipantRepo, RoomRepo};
use poker_db::DbPool;

/// Build a migrated in-memory database.
///
/// A single connection keeps every query on the same in-memory instance
/// (each SQLite `:memory:` connection is otherwise its own database).
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

/// Create a room with a custom value set and default config.
pub async fn create_room(pool: &DbPool, name: &str) -> Room {
    RoomRepo::create(
        pool,
        &CreateRoom {
            name: name.to_string(),
            pointing_method: "custom".to_string(),
            custom_values: vec!["1".into(), "2".into(), "3".into(), "5".into(), "8".into()],
            config: RoomConfig::default(),
        },
    )
    .await
    .expect("create room")
}

/// Join a participant to a room with a fresh session token.
pub async fn join(pool: &DbPool, room_id: &str, name: &str, role: ParticipantRole) -> Participant {
    ParticipantRepo::create(
        pool,
        &CreateParticipant {
            room_id: room_id.to_string(),
            name: name.to_string(),
            role,
            session_token: uuid::Uuid::new_v4().to_string(),
        },
    )
    .await
    .expect("create participant")
}
