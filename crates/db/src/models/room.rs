//! Room model and DTOs.

use poker_core::config::RoomConfig;
use poker_core::types::Timestamp;
use sqlx::FromRow;

/// A room row. `custom_values` and `config` are stored as JSON text and
/// decoded on demand through the accessor methods.
#[derive(Debug, Clone, FromRow)]
pub struct Room {
    pub id: String,
    pub name: String,
    pub pointing_method: String,
    pub custom_values: Option<String>,
    pub config: Option<String>,
    /// Set when the first participant joins; immutable afterwards.
    pub creator_participant_id: Option<String>,
    pub current_round_id: Option<String>,
    pub consecutive_consensus_rounds: i64,
    pub created_at: Timestamp,
    pub last_activity: Timestamp,
    pub expires_at: Timestamp,
}

impl Room {
    /// Decode the room's custom value set; empty when absent or corrupt.
    pub fn custom_value_set(&self) -> Vec<String> {
        self.custom_values
            .as_deref()
            .and_then(|json| serde_json::from_str(json).ok())
            .unwrap_or_default()
    }

    /// Decode the room's config, falling back to permissive defaults.
    pub fn room_config(&self) -> RoomConfig {
        RoomConfig::parse(self.config.as_deref())
    }

    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.expires_at < now
    }

    pub fn is_creator(&self, participant_id: &str) -> bool {
        self.creator_participant_id.as_deref() == Some(participant_id)
    }
}

/// DTO for creating a new room.
#[derive(Debug, Clone)]
pub struct CreateRoom {
    pub name: String,
    pub pointing_method: String,
    pub custom_values: Vec<String>,
    pub config: RoomConfig,
}
