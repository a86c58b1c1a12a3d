//! Repository for the `rounds` table and the round state machine.
//!
//! At most one non-completed round exists per room at any time, and that
//! round is the one `rooms.current_round_id` points at. State transitions
//! use guarded updates so a caller racing a concurrent transition loses
//! cleanly with `RowNotFound` instead of corrupting the lifecycle.

use chrono::Utc;
use poker_core::votes::parse_numeric_value;

use crate::ids::new_entity_id;
use crate::models::round::Round;
use crate::DbPool;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, room_id, round_number, state, average_score, total_votes, \
                       consensus, created_at, completed_at";

/// Provides operations on rounds.
pub struct RoundRepo;

impl RoundRepo {
    /// Fetch the room's current round.
    pub async fn current_for_room(
        pool: &DbPool,
        room_id: &str,
    ) -> Result<Option<Round>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM rounds
             WHERE id = (SELECT current_round_id FROM rooms WHERE id = ?)"
        );
        sqlx::query_as::<_, Round>(&query)
            .bind(room_id)
            .fetch_optional(pool)
            .await
    }

    /// Transition the current round from `voting` to `revealed`.
    ///
    /// Not idempotent: returns `false` when the round is not in `voting`
    /// (callers check state first), `true` on the actual transition.
    pub async fn reveal_current(pool: &DbPool, room_id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE rounds SET state = 'revealed'
             WHERE id = (SELECT current_round_id FROM rooms WHERE id = ?)
               AND state = 'voting'",
        )
        .bind(room_id)
        .execute(pool)
        .await?;

        if result.rows_affected() > 0 {
            sqlx::query("UPDATE rooms SET last_activity = ? WHERE id = ?")
                .bind(Utc::now())
                .bind(room_id)
                .execute(pool)
                .await?;
            return Ok(true);
        }
        Ok(false)
    }

    /// Clear the current round: delete its votes and return its state to
    /// `voting`, from either `voting` or `revealed`. Does not create a new
    /// round. Returns `false` when the room has no current round.
    pub async fn reset_current(pool: &DbPool, room_id: &str) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let round_id: Option<(Option<String>,)> =
            sqlx::query_as("SELECT current_round_id FROM rooms WHERE id = ?")
                .bind(room_id)
                .fetch_optional(&mut *tx)
                .await?;

        let Some((Some(round_id),)) = round_id else {
            return Ok(false);
        };

        sqlx::query("DELETE FROM votes WHERE round_id = ?")
            .bind(&round_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("UPDATE rounds SET state = 'voting' WHERE id = ?")
            .bind(&round_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("UPDATE rooms SET last_activity = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(room_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }

    /// Complete the current round and open the next one, atomically.
    ///
    /// The current round must be `revealed`. Its statistics are computed
    /// from the round's votes: `average_score` is the mean of numerically
    /// parseable values (left unset when none parse), `total_votes` the
    /// vote count, `consensus` true iff at least one vote exists and all
    /// carry the same value. A new round with `round_number + 1` is created
    /// in `voting` and becomes current, and the room's consensus streak is
    /// incremented or zeroed.
    ///
    /// Returns the new round, or `RowNotFound` when the room is missing or
    /// the current round is not `revealed`.
    pub async fn complete_and_advance(pool: &DbPool, room_id: &str) -> Result<Round, sqlx::Error> {
        let now = Utc::now();
        let mut tx = pool.begin().await?;

        let room: Option<(Option<String>, i64)> = sqlx::query_as(
            "SELECT current_round_id, consecutive_consensus_rounds FROM rooms WHERE id = ?",
        )
        .bind(room_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((Some(current_round_id), streak)) = room else {
            return Err(sqlx::Error::RowNotFound);
        };

        let current: Round = {
            let query = format!("SELECT {COLUMNS} FROM rounds WHERE id = ?");
            sqlx::query_as(&query)
                .bind(&current_round_id)
                .fetch_one(&mut *tx)
                .await?
        };

        let values: Vec<(String,)> = sqlx::query_as("SELECT value FROM votes WHERE round_id = ?")
            .bind(&current_round_id)
            .fetch_all(&mut *tx)
            .await?;

        let total_votes = values.len() as i64;
        let consensus =
            !values.is_empty() && values.iter().all(|(v,)| *v == values[0].0);

        let numeric: Vec<f64> = values
            .iter()
            .filter_map(|(v,)| parse_numeric_value(v))
            .collect();
        let average_score = (!numeric.is_empty())
            .then(|| numeric.iter().sum::<f64>() / numeric.len() as f64);

        let completed = sqlx::query(
            "UPDATE rounds SET state = 'completed', average_score = ?, total_votes = ?, \
             consensus = ?, completed_at = ?
             WHERE id = ? AND state = 'revealed'",
        )
        .bind(average_score)
        .bind(total_votes)
        .bind(consensus)
        .bind(now)
        .bind(&current_round_id)
        .execute(&mut *tx)
        .await?;

        if completed.rows_affected() == 0 {
            return Err(sqlx::Error::RowNotFound);
        }

        let new_round_id = new_entity_id();
        sqlx::query(
            "INSERT INTO rounds (id, room_id, round_number, state, total_votes, consensus, created_at)
             VALUES (?, ?, ?, 'voting', 0, FALSE, ?)",
        )
        .bind(&new_round_id)
        .bind(room_id)
        .bind(current.round_number + 1)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let new_streak = if consensus { streak + 1 } else { 0 };
        sqlx::query(
            "UPDATE rooms SET current_round_id = ?, consecutive_consensus_rounds = ?, \
             last_activity = ? WHERE id = ?",
        )
        .bind(&new_round_id)
        .bind(new_streak)
        .bind(now)
        .bind(room_id)
        .execute(&mut *tx)
        .await?;

        let new_round: Round = {
            let query = format!("SELECT {COLUMNS} FROM rounds WHERE id = ?");
            sqlx::query_as(&query)
                .bind(&new_round_id)
                .fetch_one(&mut *tx)
                .await?
        };

        tx.commit().await?;
        Ok(new_round)
    }
}
