//! Room HTTP surface: creation, room view, join, and the participant
//! grid data consumed by the page renderer.

use axum::extract::{Path, State};
use axum::response::{IntoResponse, Redirect};
use axum::{Form, Json};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use poker_core::error::CoreError;
use poker_core::stats::{calculate_stats, VoteStats};
use poker_core::validation::{validate_entity_id, validate_participant_name, validate_room_name};
use poker_core::{config::RoomConfig, votes};
use poker_db::models::participant::{CreateParticipant, ParticipantRole};
use poker_db::models::room::{CreateRoom, Room};
use poker_db::models::round::RoundState;
use poker_db::repositories::{ParticipantRepo, RoomRepo, RoundRepo, VoteRepo};

use crate::acl::permissions_for;
use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;
use crate::ws::actions;
use crate::ws::protocol::ParticipantView;

/// Session cookie carrying the participant's opaque token.
pub const PARTICIPANT_COOKIE: &str = "pp_participant_id";

/// Session cookie lifetime.
const COOKIE_MAX_AGE_DAYS: i64 = 7;

// ---------------------------------------------------------------------------
// POST /room
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct CreateRoomForm {
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "pointingMethod")]
    pub pointing_method: String,
    #[serde(default, rename = "customValues")]
    pub custom_values: String,
    // Checkbox fields arrive as "on" when ticked and are absent otherwise.
    #[serde(default)]
    pub allow_all_reveal: Option<String>,
    #[serde(default)]
    pub allow_all_reset: Option<String>,
    #[serde(default)]
    pub allow_all_new_round: Option<String>,
    #[serde(default)]
    pub allow_change_vote_after_reveal: Option<String>,
    #[serde(default)]
    pub auto_reveal: Option<String>,
}

fn checked(field: &Option<String>) -> bool {
    field.as_deref() == Some("on")
}

/// Create a room and redirect to its page.
pub async fn create_room(
    State(state): State<AppState>,
    Form(form): Form<CreateRoomForm>,
) -> AppResult<impl IntoResponse> {
    let name = validate_room_name(&form.name)?;

    let requested_method = if form.pointing_method.is_empty() {
        votes::METHOD_CUSTOM
    } else {
        form.pointing_method.as_str()
    };

    let (pointing_method, custom_values) = match requested_method {
        votes::METHOD_FIBONACCI => (votes::METHOD_FIBONACCI, votes::fibonacci_values()),
        votes::METHOD_CUSTOM => {
            if form.custom_values.is_empty() {
                return Err(AppError::Core(CoreError::Validation(
                    "Custom values are required when using custom pointing method".to_string(),
                )));
            }
            (votes::METHOD_CUSTOM, votes::parse_custom_values(&form.custom_values)?)
        }
        // Template ids (modified-fibonacci, t-shirt) resolve to a custom
        // value set; unknown ids are rejected by the lookup.
        template => (votes::METHOD_CUSTOM, votes::template_values(template)?),
    };
    let pointing_method = pointing_method.to_string();

    let mut config = RoomConfig::default();
    config.permissions.allow_all_reveal = checked(&form.allow_all_reveal);
    config.permissions.allow_all_reset = checked(&form.allow_all_reset);
    config.permissions.allow_all_new_round = checked(&form.allow_all_new_round);
    config.permissions.allow_change_vote_after_reveal =
        checked(&form.allow_change_vote_after_reveal);
    config.permissions.auto_reveal = checked(&form.auto_reveal);

    let room = RoomRepo::create(
        &state.pool,
        &CreateRoom {
            name,
            pointing_method,
            custom_values,
            config,
        },
    )
    .await?;

    tracing::info!(room_id = %room.id, "Room created");
    Ok(Redirect::to(&format!("/room/{}", room.id)))
}

// ---------------------------------------------------------------------------
// GET /templates
// ---------------------------------------------------------------------------

/// Built-in vote-value templates for the create-room form.
pub async fn templates() -> Json<DataResponse<Vec<votes::TemplateInfo>>> {
    Json(DataResponse {
        data: votes::available_templates(),
    })
}

// ---------------------------------------------------------------------------
// GET /room/{id}
// ---------------------------------------------------------------------------

/// Room detail as consumed by the page renderer.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomView {
    pub id: String,
    pub name: String,
    pub pointing_method: String,
    pub custom_values: Vec<String>,
    pub config: RoomConfig,
    pub state: String,
    pub round_number: Option<i64>,
    pub consecutive_consensus_rounds: i64,
    pub expires_at: String,
    pub participants: Vec<ParticipantView>,
    pub vote_count: usize,
}

pub async fn room_view(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<DataResponse<RoomView>>> {
    validate_entity_id(&id).map_err(|_| AppError::BadRequest("Invalid room ID".to_string()))?;
    let room = find_room(&state, &id).await?;

    let participants = ParticipantRepo::list_for_room(&state.pool, &room.id).await?;
    let round = RoundRepo::current_for_room(&state.pool, &room.id).await?;
    let vote_count = VoteRepo::list_current_for_room(&state.pool, &room.id)
        .await?
        .len();

    Ok(Json(DataResponse {
        data: RoomView {
            id: room.id.clone(),
            name: room.name.clone(),
            pointing_method: room.pointing_method.clone(),
            custom_values: room.custom_value_set(),
            config: room.room_config(),
            state: round
                .as_ref()
                .map_or(RoundState::Voting, |r| r.state)
                .as_str()
                .to_string(),
            round_number: round.map(|r| r.round_number),
            consecutive_consensus_rounds: room.consecutive_consensus_rounds,
            expires_at: room
                .expires_at
                .to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            participants: participants.iter().map(Into::into).collect(),
            vote_count,
        },
    }))
}

// ---------------------------------------------------------------------------
// POST /room/{id}/join
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct JoinRoomForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub role: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinedView {
    pub participant: ParticipantView,
    pub is_creator: bool,
}

/// Join a room, issuing the session cookie and announcing the new
/// participant to everyone connected.
pub async fn join_room(
    State(state): State<AppState>,
    Path(id): Path<String>,
    jar: CookieJar,
    Form(form): Form<JoinRoomForm>,
) -> AppResult<impl IntoResponse> {
    validate_entity_id(&id).map_err(|_| AppError::BadRequest("Invalid room ID".to_string()))?;
    let name = validate_participant_name(&form.name)?;
    let room = find_room(&state, &id).await?;

    let role = if form.role == "spectator" {
        ParticipantRole::Spectator
    } else {
        ParticipantRole::Voter
    };

    let session_token = Uuid::new_v4().to_string();
    let participant = ParticipantRepo::create(
        &state.pool,
        &CreateParticipant {
            room_id: room.id.clone(),
            name,
            role,
            session_token: session_token.clone(),
        },
    )
    .await?;

    // A new voter invalidates any pending auto-reveal countdown.
    if role == ParticipantRole::Voter {
        state.auto_reveal.cancel(&room.id);
    }

    let cookie = Cookie::build((PARTICIPANT_COOKIE, session_token))
        .path("/")
        .max_age(time::Duration::days(COOKIE_MAX_AGE_DAYS))
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(!state.config.dev_mode)
        .build();

    actions::broadcast_participant_joined(&state, &participant).await;
    tracing::info!(room_id = %room.id, participant_id = %participant.id, "Participant joined");

    let room = RoomRepo::find(&state.pool, &room.id)
        .await?
        .ok_or(sqlx::Error::RowNotFound)
        .map_err(AppError::Database)?;

    Ok((
        jar.add(cookie),
        Json(DataResponse {
            data: JoinedView {
                is_creator: room.is_creator(&participant.id),
                participant: ParticipantView::from(&participant),
            },
        }),
    ))
}

// ---------------------------------------------------------------------------
// GET /room/{id}/participants
// ---------------------------------------------------------------------------

/// One grid cell: a participant plus their voting status. The vote value
/// itself only appears once the round is revealed.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridEntry {
    #[serde(flatten)]
    pub participant: ParticipantView,
    pub has_voted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantGrid {
    pub participants: Vec<GridEntry>,
    pub room_state: String,
    pub round_number: Option<i64>,
    pub consecutive_consensus_rounds: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<VoteStats>,
    pub permissions: crate::acl::PermissionSet,
}

/// Data behind the participant grid + statistics fragment, refreshed by
/// the page after each WebSocket event.
pub async fn participants_fragment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    jar: CookieJar,
) -> AppResult<Json<DataResponse<ParticipantGrid>>> {
    validate_entity_id(&id).map_err(|_| AppError::BadRequest("Invalid room ID".to_string()))?;
    let room = find_room(&state, &id).await?;

    let participants = ParticipantRepo::list_for_room(&state.pool, &room.id).await?;
    let round = RoundRepo::current_for_room(&state.pool, &room.id).await?;
    let votes = VoteRepo::list_current_for_room(&state.pool, &room.id).await?;

    let state_str = round
        .as_ref()
        .map_or(RoundState::Voting, |r| r.state)
        .as_str()
        .to_string();
    let revealed = round.as_ref().is_some_and(|r| r.state == RoundState::Revealed);

    let vote_of = |participant_id: &str| {
        votes
            .iter()
            .find(|v| v.participant_id == participant_id)
            .map(|v| v.value.clone())
    };

    let entries: Vec<GridEntry> = participants
        .iter()
        .map(|p| {
            let vote = vote_of(&p.id);
            GridEntry {
                participant: p.into(),
                has_voted: vote.is_some(),
                value: if revealed { vote } else { None },
            }
        })
        .collect();

    let stats = revealed
        .then(|| calculate_stats(votes.iter().map(|v| v.value.as_str())))
        .flatten();

    // Permissions for the requesting participant, resolved from the cookie.
    let is_creator = match jar.get(PARTICIPANT_COOKIE) {
        Some(cookie) => {
            ParticipantRepo::find_by_session(&state.pool, &room.id, cookie.value())
                .await?
                .map(|p| room.is_creator(&p.id))
                .unwrap_or(false)
        }
        None => false,
    };
    let permissions = permissions_for(&room.room_config(), is_creator);

    Ok(Json(DataResponse {
        data: ParticipantGrid {
            participants: entries,
            room_state: state_str,
            round_number: round.map(|r| r.round_number),
            consecutive_consensus_rounds: room.consecutive_consensus_rounds,
            stats,
            permissions,
        },
    }))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn find_room(state: &AppState, id: &str) -> Result<Room, AppError> {
    RoomRepo::find(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Room",
            id: id.to_string(),
        }))
}
