//! Vote model.

use poker_core::types::Timestamp;
use sqlx::FromRow;

/// One vote per `(participant, round)`; resubmission overwrites.
#[derive(Debug, Clone, FromRow)]
pub struct Vote {
    pub id: String,
    pub room_id: String,
    pub participant_id: String,
    pub round_id: String,
    pub value: String,
    pub voted_at: Timestamp,
}
