//! Participant model and DTOs.

use poker_core::types::Timestamp;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Participant role. Only voters count toward auto-reveal and consensus;
/// spectators are displayed but never counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum ParticipantRole {
    Voter,
    Spectator,
}

/// A participant row. `connected` is transport-derived and flips with
/// socket attach/detach.
#[derive(Debug, Clone, FromRow)]
pub struct Participant {
    pub id: String,
    pub room_id: String,
    pub name: String,
    pub role: ParticipantRole,
    pub connected: bool,
    pub session_token: String,
    pub joined_at: Timestamp,
    pub last_seen: Timestamp,
}

impl Participant {
    pub fn is_voter(&self) -> bool {
        self.role == ParticipantRole::Voter
    }
}

/// DTO for creating a new participant.
#[derive(Debug, Clone)]
pub struct CreateParticipant {
    pub room_id: String,
    pub name: String,
    pub role: ParticipantRole,
    pub session_token: String,
}
