//! Repository for the `rooms` table.

use chrono::Utc;
use poker_core::config::RoomConfig;

use crate::ids::new_entity_id;
use crate::models::room::{CreateRoom, Room};
use crate::DbPool;

/// Rooms live for 24 hours after creation unless cleaned up earlier.
pub const ROOM_TTL_HOURS: i64 = 24;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, name, pointing_method, custom_values, config, \
                       creator_participant_id, current_round_id, \
                       consecutive_consensus_rounds, created_at, last_activity, expires_at";

/// Provides operations on rooms.
pub struct RoomRepo;

impl RoomRepo {
    /// Create a room together with its first round, atomically.
    ///
    /// The new round starts at number 1 in the `voting` state and becomes
    /// the room's current round. `expires_at` defaults to creation time
    /// plus [`ROOM_TTL_HOURS`].
    pub async fn create(pool: &DbPool, input: &CreateRoom) -> Result<Room, sqlx::Error> {
        let now = Utc::now();
        let room_id = new_entity_id();
        let round_id = new_entity_id();

        let custom_values =
            serde_json::to_string(&input.custom_values).unwrap_or_else(|_| "[]".to_string());
        let config = serde_json::to_string(&input.config).unwrap_or_default();

        let mut tx = pool.begin().await?;

        sqlx::query(
            "INSERT INTO rooms (id, name, pointing_method, custom_values, config, \
             consecutive_consensus_rounds, created_at, last_activity, expires_at)
             VALUES (?, ?, ?, ?, ?, 0, ?, ?, ?)",
        )
        .bind(&room_id)
        .bind(&input.name)
        .bind(&input.pointing_method)
        .bind(&custom_values)
        .bind(&config)
        .bind(now)
        .bind(now)
        .bind(now + chrono::Duration::hours(ROOM_TTL_HOURS))
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO rounds (id, room_id, round_number, state, total_votes, consensus, created_at)
             VALUES (?, ?, 1, 'voting', 0, FALSE, ?)",
        )
        .bind(&round_id)
        .bind(&room_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE rooms SET current_round_id = ? WHERE id = ?")
            .bind(&round_id)
            .bind(&room_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Self::find(pool, &room_id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    /// Find a room by id.
    pub async fn find(pool: &DbPool, id: &str) -> Result<Option<Room>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM rooms WHERE id = ?");
        sqlx::query_as::<_, Room>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Rename a room, bumping `last_activity`. Returns `true` if the row
    /// was updated.
    pub async fn update_name(pool: &DbPool, id: &str, name: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE rooms SET name = ?, last_activity = ? WHERE id = ?")
            .bind(name)
            .bind(Utc::now())
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Replace a room's config, bumping `last_activity`.
    pub async fn update_config(
        pool: &DbPool,
        id: &str,
        config: &RoomConfig,
    ) -> Result<bool, sqlx::Error> {
        let json = serde_json::to_string(config).unwrap_or_default();
        let result = sqlx::query("UPDATE rooms SET config = ?, last_activity = ? WHERE id = ?")
            .bind(json)
            .bind(Utc::now())
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Bump a room's `last_activity` timestamp.
    pub async fn touch_activity(pool: &DbPool, id: &str) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE rooms SET last_activity = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Check whether a participant is the room's creator.
    pub async fn is_creator(
        pool: &DbPool,
        room_id: &str,
        participant_id: &str,
    ) -> Result<bool, sqlx::Error> {
        let row: Option<(Option<String>,)> =
            sqlx::query_as("SELECT creator_participant_id FROM rooms WHERE id = ?")
                .bind(room_id)
                .fetch_optional(pool)
                .await?;
        Ok(row
            .and_then(|(creator,)| creator)
            .is_some_and(|creator| creator == participant_id))
    }

    /// Delete every room whose `expires_at` has passed; participants,
    /// rounds, and votes cascade. Returns the number of rooms deleted.
    pub async fn delete_expired(pool: &DbPool) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM rooms WHERE expires_at < ?")
            .bind(Utc::now())
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
