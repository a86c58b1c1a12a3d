//! Per-action permission decisions derived from room config and creator
//! identity.
//!
//! The room creator always holds `can_reveal`, `can_reset`,
//! `can_new_round`, and `can_update_config`; everyone else is governed by
//! the room's `allow_all_*` flags. Config parsing falls back to the
//! permissive defaults on corrupt data (see [`RoomConfig::parse`]) so a
//! bad blob can never lock a room.

use poker_core::config::RoomConfig;
use poker_db::models::room::Room;
use poker_db::repositories::RoomRepo;
use poker_db::DbPool;
use serde::Serialize;

/// Precomputed permissions for one participant, shipped to clients in the
/// initial `room_state` snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionSet {
    pub can_reset: bool,
    pub can_new_round: bool,
    pub can_reveal: bool,
    pub can_change_vote_after_reveal: bool,
}

/// Evaluate the permission matrix for a participant.
pub fn permissions_for(config: &RoomConfig, is_creator: bool) -> PermissionSet {
    let p = &config.permissions;
    PermissionSet {
        can_reset: is_creator || p.allow_all_reset,
        can_new_round: is_creator || p.allow_all_new_round,
        can_reveal: is_creator || p.allow_all_reveal,
        can_change_vote_after_reveal: p.allow_change_vote_after_reveal,
    }
}

/// Permission checks backed by the persistence gateway.
pub struct AclService;

impl AclService {
    async fn room(pool: &DbPool, room_id: &str) -> Result<Room, sqlx::Error> {
        RoomRepo::find(pool, room_id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    /// May this participant reveal the current round?
    pub async fn can_reveal(
        pool: &DbPool,
        room_id: &str,
        participant_id: &str,
    ) -> Result<bool, sqlx::Error> {
        let room = Self::room(pool, room_id).await?;
        Ok(room.is_creator(participant_id) || room.room_config().permissions.allow_all_reveal)
    }

    /// May this participant reset the current round?
    pub async fn can_reset(
        pool: &DbPool,
        room_id: &str,
        participant_id: &str,
    ) -> Result<bool, sqlx::Error> {
        let room = Self::room(pool, room_id).await?;
        Ok(room.is_creator(participant_id) || room.room_config().permissions.allow_all_reset)
    }

    /// May this participant complete the round and start the next one?
    pub async fn can_new_round(
        pool: &DbPool,
        room_id: &str,
        participant_id: &str,
    ) -> Result<bool, sqlx::Error> {
        let room = Self::room(pool, room_id).await?;
        Ok(room.is_creator(participant_id) || room.room_config().permissions.allow_all_new_round)
    }

    /// Participant-agnostic: may votes change after reveal in this room?
    pub async fn can_change_vote_after_reveal(
        pool: &DbPool,
        room_id: &str,
    ) -> Result<bool, sqlx::Error> {
        let room = Self::room(pool, room_id).await?;
        Ok(room.room_config().permissions.allow_change_vote_after_reveal)
    }

    /// Only the creator may replace the room config.
    pub async fn can_update_config(
        pool: &DbPool,
        room_id: &str,
        participant_id: &str,
    ) -> Result<bool, sqlx::Error> {
        let room = Self::room(pool, room_id).await?;
        Ok(room.is_creator(participant_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn restrictive_config() -> RoomConfig {
        let mut config = RoomConfig::default();
        config.permissions.allow_all_reveal = false;
        config.permissions.allow_all_reset = false;
        config.permissions.allow_all_new_round = false;
        config
    }

    #[test]
    fn creator_always_allowed() {
        let perms = permissions_for(&restrictive_config(), true);
        assert!(perms.can_reveal);
        assert!(perms.can_reset);
        assert!(perms.can_new_round);
    }

    #[test]
    fn others_follow_flags() {
        let perms = permissions_for(&restrictive_config(), false);
        assert!(!perms.can_reveal);
        assert!(!perms.can_reset);
        assert!(!perms.can_new_round);

        let perms = permissions_for(&RoomConfig::default(), false);
        assert!(perms.can_reveal);
        assert!(perms.can_reset);
        assert!(perms.can_new_round);
    }

    #[test]
    fn change_vote_after_reveal_ignores_creator() {
        let mut config = RoomConfig::default();
        config.permissions.allow_change_vote_after_reveal = true;
        assert!(permissions_for(&config, false).can_change_vote_after_reveal);
        assert!(permissions_for(&config, true).can_change_vote_after_reveal);

        config.permissions.allow_change_vote_after_reveal = false;
        assert!(!permissions_for(&config, true).can_change_vote_after_reveal);
    }
}
