//! Room configuration: per-room permission flags.

use serde::{Deserialize, Serialize};

/// Per-room settings, stored as JSON on the room record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomConfig {
    #[serde(default)]
    pub permissions: RoomPermissions,
}

/// Who may perform which room action. Fields default to the permissive
/// configuration so a partially-populated stored blob never locks a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomPermissions {
    /// Any participant may start a new round (creator always can).
    #[serde(default = "default_true")]
    pub allow_all_new_round: bool,

    /// Any participant may reset the current round (creator always can).
    #[serde(default = "default_true")]
    pub allow_all_reset: bool,

    /// Any participant may reveal votes (creator always can).
    #[serde(default = "default_true")]
    pub allow_all_reveal: bool,

    /// Voters may change their vote after reveal.
    #[serde(default)]
    pub allow_change_vote_after_reveal: bool,

    /// Reveal automatically once every voter has voted.
    #[serde(default)]
    pub auto_reveal: bool,
}

fn default_true() -> bool {
    true
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            permissions: RoomPermissions::default(),
        }
    }
}

impl Default for RoomPermissions {
    fn default() -> Self {
        Self {
            allow_all_new_round: true,
            allow_all_reset: true,
            allow_all_reveal: true,
            allow_change_vote_after_reveal: false,
            auto_reveal: false,
        }
    }
}

impl RoomConfig {
    /// Parse a stored config blob.
    ///
    /// Absent or unparseable config falls back to the permissive defaults.
    /// Denying on corrupt data would lock every participant out of the
    /// room, so the fallback is deliberate and load-bearing.
    pub fn parse(stored: Option<&str>) -> Self {
        match stored {
            None | Some("") => Self::default(),
            Some(json) => serde_json::from_str(json).unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_permissive() {
        let config = RoomConfig::default();
        assert!(config.permissions.allow_all_new_round);
        assert!(config.permissions.allow_all_reset);
        assert!(config.permissions.allow_all_reveal);
        assert!(!config.permissions.allow_change_vote_after_reveal);
        assert!(!config.permissions.auto_reveal);
    }

    #[test]
    fn parse_missing_returns_defaults() {
        assert_eq!(RoomConfig::parse(None), RoomConfig::default());
        assert_eq!(RoomConfig::parse(Some("")), RoomConfig::default());
    }

    #[test]
    fn parse_garbage_returns_defaults() {
        assert_eq!(RoomConfig::parse(Some("not json")), RoomConfig::default());
        assert_eq!(RoomConfig::parse(Some("[1,2]")), RoomConfig::default());
    }

    #[test]
    fn parse_partial_fills_defaults() {
        let config =
            RoomConfig::parse(Some(r#"{"permissions":{"allow_all_reveal":false}}"#));
        assert!(!config.permissions.allow_all_reveal);
        assert!(config.permissions.allow_all_reset);
        assert!(!config.permissions.auto_reveal);
    }

    #[test]
    fn round_trips_through_json() {
        let mut config = RoomConfig::default();
        config.permissions.auto_reveal = true;
        config.permissions.allow_all_reveal = false;

        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(RoomConfig::parse(Some(&json)), config);
    }
}
