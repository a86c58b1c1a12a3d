//! Repository for the `votes` table.

use chrono::Utc;

use crate::ids::new_entity_id;
use crate::models::vote::Vote;
use crate::DbPool;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, room_id, participant_id, round_id, value, voted_at";

/// Provides operations on votes.
pub struct VoteRepo;

impl VoteRepo {
    /// Record a participant's vote in the room's current round.
    ///
    /// Upserts on `(participant_id, round_id)` so resubmission overwrites
    /// the previous value. Returns `false` when the room has no current
    /// round (nothing is written).
    pub async fn upsert_current(
        pool: &DbPool,
        room_id: &str,
        participant_id: &str,
        value: &str,
    ) -> Result<bool, sqlx::Error> {
        let now = Utc::now();
        let mut tx = pool.begin().await?;

        let round_id: Option<(Option<String>,)> =
            sqlx::query_as("SELECT current_round_id FROM rooms WHERE id = ?")
                .bind(room_id)
                .fetch_optional(&mut *tx)
                .await?;

        let Some((Some(round_id),)) = round_id else {
            return Ok(false);
        };

        sqlx::query(
            "INSERT INTO votes (id, room_id, participant_id, round_id, value, voted_at)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT (participant_id, round_id)
             DO UPDATE SET value = excluded.value, voted_at = excluded.voted_at",
        )
        .bind(new_entity_id())
        .bind(room_id)
        .bind(participant_id)
        .bind(&round_id)
        .bind(value)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE rooms SET last_activity = ? WHERE id = ?")
            .bind(now)
            .bind(room_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }

    /// List all votes in the room's current round, oldest first.
    pub async fn list_current_for_room(
        pool: &DbPool,
        room_id: &str,
    ) -> Result<Vec<Vote>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM votes
             WHERE round_id = (SELECT current_round_id FROM rooms WHERE id = ?)
             ORDER BY voted_at, id"
        );
        sqlx::query_as::<_, Vote>(&query)
            .bind(room_id)
            .fetch_all(pool)
            .await
    }

    /// True iff the room has at least one voter and every voter has a vote
    /// in the current round. Spectators never count.
    pub async fn have_all_voters_voted(pool: &DbPool, room_id: &str) -> Result<bool, sqlx::Error> {
        let (voters, voted): (i64, i64) = sqlx::query_as(
            "SELECT
               (SELECT COUNT(*) FROM participants
                 WHERE room_id = ?1 AND role = 'voter'),
               (SELECT COUNT(DISTINCT v.participant_id) FROM votes v
                 JOIN participants p ON p.id = v.participant_id
                WHERE v.round_id = (SELECT current_round_id FROM rooms WHERE id = ?1)
                  AND p.role = 'voter')",
        )
        .bind(room_id)
        .fetch_one(pool)
        .await?;

        Ok(voters > 0 && voted >= voters)
    }
}
