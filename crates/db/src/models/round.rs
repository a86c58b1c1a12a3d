//! Round model.

use poker_core::types::Timestamp;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Round lifecycle. Transitions are `voting -> revealed -> completed`;
/// reset moves `revealed` back to `voting` without advancing the number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum RoundState {
    Voting,
    Revealed,
    Completed,
}

impl RoundState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Voting => "voting",
            Self::Revealed => "revealed",
            Self::Completed => "completed",
        }
    }
}

/// One voting cycle within a room. `average_score`, `total_votes`, and
/// `consensus` are written on completion.
#[derive(Debug, Clone, FromRow)]
pub struct Round {
    pub id: String,
    pub room_id: String,
    pub round_number: i64,
    pub state: RoundState,
    pub average_score: Option<f64>,
    pub total_votes: i64,
    pub consensus: bool,
    pub created_at: Timestamp,
    pub completed_at: Option<Timestamp>,
}

impl Round {
    pub fn can_accept_votes(&self) -> bool {
        self.state == RoundState::Voting
    }

    pub fn can_reveal(&self) -> bool {
        self.state == RoundState::Voting
    }

    pub fn can_complete(&self) -> bool {
        self.state == RoundState::Revealed
    }
}
