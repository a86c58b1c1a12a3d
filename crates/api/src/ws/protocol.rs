//! JSON wire protocol for WebSocket frames.
//!
//! Both directions share the envelope `{type, roomId?, payload?}`. Inbound
//! frames are decoded leniently: frames without a `type` (htmx header-only
//! keep-alives) and frames with an unknown `type` are ignored rather than
//! treated as errors; only malformed JSON or a payload that fails its
//! per-type shape check count as decode failures, and those are dropped by
//! the caller without disconnecting.

use poker_core::config::RoomConfig;
use poker_core::error::CoreError;
use poker_core::stats::VoteStats;
use serde::{Deserialize, Serialize};

use crate::acl::PermissionSet;

// ---------------------------------------------------------------------------
// Inbound
// ---------------------------------------------------------------------------

/// Raw inbound envelope, before per-type payload validation.
#[derive(Debug, Deserialize)]
pub struct Envelope {
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default, rename = "roomId")]
    pub room_id: Option<String>,
    #[serde(default)]
    pub payload: serde_json::Value,
}

/// A validated client action.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    Vote { value: String },
    Reveal,
    Reset,
    NextRound,
    UpdateName { name: String },
    UpdateRoomName { name: String },
    UpdateConfig { config: RoomConfig },
}

impl ClientMessage {
    /// Short action name for logging.
    pub fn action(&self) -> &'static str {
        match self {
            Self::Vote { .. } => "vote",
            Self::Reveal => "reveal",
            Self::Reset => "reset",
            Self::NextRound => "next_round",
            Self::UpdateName { .. } => "update_name",
            Self::UpdateRoomName { .. } => "update_room_name",
            Self::UpdateConfig { .. } => "update_config",
        }
    }
}

#[derive(Debug, Deserialize)]
struct ValuePayload {
    value: String,
}

#[derive(Debug, Deserialize)]
struct NamePayload {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ConfigPayload {
    config: RoomConfig,
}

/// Decode one inbound text frame.
///
/// Returns `Ok(None)` for frames that are tolerated but carry no action
/// (empty or unknown `type`), `Err` for malformed JSON or a payload that
/// fails its shape check.
pub fn decode_client_message(text: &str) -> Result<Option<ClientMessage>, CoreError> {
    let envelope: Envelope = serde_json::from_str(text)
        .map_err(|e| CoreError::Validation(format!("malformed envelope: {e}")))?;

    // htmx sends header-only frames with no type; tolerate them.
    if envelope.kind.is_empty() {
        return Ok(None);
    }

    let message = match envelope.kind.as_str() {
        "vote" => {
            let payload: ValuePayload = decode_payload(envelope.payload)?;
            ClientMessage::Vote {
                value: payload.value,
            }
        }
        "reveal" => ClientMessage::Reveal,
        "reset" => ClientMessage::Reset,
        "next_round" => ClientMessage::NextRound,
        "update_name" => {
            let payload: NamePayload = decode_payload(envelope.payload)?;
            ClientMessage::UpdateName { name: payload.name }
        }
        "update_room_name" => {
            let payload: NamePayload = decode_payload(envelope.payload)?;
            ClientMessage::UpdateRoomName { name: payload.name }
        }
        "update_config" => {
            let payload: ConfigPayload = decode_payload(envelope.payload)?;
            ClientMessage::UpdateConfig {
                config: payload.config,
            }
        }
        // Unknown types are rejected silently.
        _ => return Ok(None),
    };

    Ok(Some(message))
}

fn decode_payload<T: serde::de::DeserializeOwned>(
    payload: serde_json::Value,
) -> Result<T, CoreError> {
    serde_json::from_value(payload)
        .map_err(|e| CoreError::Validation(format!("invalid payload: {e}")))
}

// ---------------------------------------------------------------------------
// Outbound
// ---------------------------------------------------------------------------

/// Participant as shown to clients.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantView {
    pub id: String,
    pub name: String,
    pub role: poker_db::models::participant::ParticipantRole,
    pub connected: bool,
    pub joined_at: poker_core::types::Timestamp,
}

impl From<&poker_db::models::participant::Participant> for ParticipantView {
    fn from(p: &poker_db::models::participant::Participant) -> Self {
        Self {
            id: p.id.clone(),
            name: p.name.clone(),
            role: p.role,
            connected: p.connected,
            joined_at: p.joined_at,
        }
    }
}

/// One revealed vote.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteView {
    pub participant_id: String,
    pub participant_name: String,
    pub value: String,
}

/// Full state snapshot sent to a connection right after registration.
/// Subsequent updates are incremental via the other events.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomStatePayload {
    pub participants: Vec<ParticipantView>,
    pub room_state: String,
    pub round_number: Option<i64>,
    pub vote_count: usize,
    pub is_creator: bool,
    pub current_participant_id: Option<String>,
    /// ISO-8601 formatted expiry timestamp.
    pub expires_at: String,
    pub permissions: PermissionSet,
}

/// Server-to-client event, serialized as the `{type, payload}` envelope.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "payload")]
pub enum ServerEvent {
    #[serde(rename = "room_state")]
    RoomState(RoomStatePayload),

    #[serde(rename = "participant_joined")]
    ParticipantJoined { participant: ParticipantView },

    #[serde(rename = "participant_left", rename_all = "camelCase")]
    ParticipantLeft { participant_id: String },

    #[serde(rename = "vote_cast", rename_all = "camelCase")]
    VoteCast {
        participant_id: String,
        has_voted: bool,
    },

    #[serde(rename = "vote_updated", rename_all = "camelCase")]
    VoteUpdated {
        participant_id: String,
        participant_name: String,
        value: String,
    },

    #[serde(rename = "votes_revealed")]
    VotesRevealed {
        votes: Vec<VoteView>,
        stats: Option<VoteStats>,
    },

    #[serde(rename = "room_reset")]
    RoomReset {},

    #[serde(rename = "round_completed", rename_all = "camelCase")]
    RoundCompleted { new_round_number: i64 },

    #[serde(rename = "name_updated", rename_all = "camelCase")]
    NameUpdated {
        participant_id: String,
        name: String,
    },

    #[serde(rename = "room_name_updated")]
    RoomNameUpdated { name: String },

    #[serde(rename = "config_updated")]
    ConfigUpdated { config: RoomConfig },

    #[serde(rename = "auto_reveal_countdown")]
    AutoRevealCountdown { duration: u64 },

    #[serde(rename = "room_expired")]
    RoomExpired { message: String },

    #[serde(rename = "error")]
    Error { message: String },
}

impl ServerEvent {
    /// Serialize to the wire representation.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
