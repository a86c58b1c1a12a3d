//! Repository for the `participants` table.

use chrono::Utc;

use crate::ids::new_entity_id;
use crate::models::participant::{CreateParticipant, Participant};
use crate::DbPool;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, room_id, name, role, connected, session_token, joined_at, last_seen";

/// Provides operations on participants.
pub struct ParticipantRepo;

impl ParticipantRepo {
    /// Insert a new participant.
    ///
    /// If the room has no creator yet, the new participant becomes the
    /// creator in the same transaction. The participant starts connected;
    /// the WebSocket attach follows immediately after the join.
    pub async fn create(
        pool: &DbPool,
        input: &CreateParticipant,
    ) -> Result<Participant, sqlx::Error> {
        let now = Utc::now();
        let id = new_entity_id();

        let mut tx = pool.begin().await?;

        sqlx::query(
            "INSERT INTO participants (id, room_id, name, role, connected, session_token, \
             joined_at, last_seen)
             VALUES (?, ?, ?, ?, TRUE, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&input.room_id)
        .bind(&input.name)
        .bind(input.role)
        .bind(&input.session_token)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE rooms SET creator_participant_id = ?, last_activity = ?
             WHERE id = ? AND (creator_participant_id IS NULL OR creator_participant_id = '')",
        )
        .bind(&id)
        .bind(now)
        .bind(&input.room_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE rooms SET last_activity = ? WHERE id = ?")
            .bind(now)
            .bind(&input.room_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Self::find(pool, &id).await?.ok_or(sqlx::Error::RowNotFound)
    }

    /// Find a participant by id.
    pub async fn find(pool: &DbPool, id: &str) -> Result<Option<Participant>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM participants WHERE id = ?");
        sqlx::query_as::<_, Participant>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a participant by room and session token.
    pub async fn find_by_session(
        pool: &DbPool,
        room_id: &str,
        session_token: &str,
    ) -> Result<Option<Participant>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM participants WHERE room_id = ? AND session_token = ?"
        );
        sqlx::query_as::<_, Participant>(&query)
            .bind(room_id)
            .bind(session_token)
            .fetch_optional(pool)
            .await
    }

    /// List all participants of a room, oldest first.
    pub async fn list_for_room(
        pool: &DbPool,
        room_id: &str,
    ) -> Result<Vec<Participant>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM participants WHERE room_id = ? ORDER BY joined_at, id");
        sqlx::query_as::<_, Participant>(&query)
            .bind(room_id)
            .fetch_all(pool)
            .await
    }

    /// Rename a participant. Returns `true` if the row was updated.
    pub async fn update_name(pool: &DbPool, id: &str, name: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE participants SET name = ? WHERE id = ?")
            .bind(name)
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Flip the transport-derived connected flag, bumping `last_seen`.
    pub async fn set_connected(
        pool: &DbPool,
        id: &str,
        connected: bool,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE participants SET connected = ?, last_seen = ? WHERE id = ?")
            .bind(connected)
            .bind(Utc::now())
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
