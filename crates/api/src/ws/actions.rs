//! Room action handlers dispatched from the read pump.
//!
//! Every handler follows the same discipline: authorize via the ACL,
//! check the round-state precondition, mutate through the persistence
//! gateway, then broadcast the resulting event. Internal failures are
//! logged with room/participant/action context and the message dropped;
//! the connection is never torn down from here.

use chrono::{SecondsFormat, Utc};

use poker_core::validation::{validate_participant_name, validate_room_name};
use poker_core::{stats, votes};
use poker_db::models::participant::Participant;
use poker_db::models::room::Room;
use poker_db::models::round::RoundState;
use poker_db::repositories::{ParticipantRepo, RoomRepo, RoundRepo, VoteRepo};

use crate::acl::{permissions_for, AclService};
use crate::state::AppState;
use crate::ws::connection::Connection;
use crate::ws::limits::{AUTO_REVEAL_DELAY, AUTO_REVEAL_DELAY_MS};
use crate::ws::protocol::{ClientMessage, RoomStatePayload, ServerEvent, VoteView};

/// Route a decoded client message to its handler.
///
/// Name updates are non-destructive and bypass the expiry gate; every
/// other action on an expired room triggers a room-wide `room_expired`
/// broadcast and is ignored.
pub async fn dispatch(state: &AppState, conn: &Connection, message: ClientMessage) {
    let room_id = conn.room_id();
    let participant_id = conn.participant_id();
    let action = message.action();

    match message {
        ClientMessage::UpdateName { name } => {
            handle_update_name(state, room_id, participant_id, &name).await;
            return;
        }
        ClientMessage::UpdateRoomName { name } => {
            handle_update_room_name(state, room_id, participant_id, &name).await;
            return;
        }
        other => {
            let room = match RoomRepo::find(&state.pool, room_id).await {
                Ok(Some(room)) => room,
                Ok(None) => {
                    tracing::debug!(room_id, action, "Action dropped: room not found");
                    return;
                }
                Err(e) => {
                    tracing::error!(room_id, action, error = %e, "Failed to load room");
                    return;
                }
            };

            if room.is_expired(Utc::now()) {
                tracing::info!(room_id, action, "Action rejected: room has expired");
                state
                    .hub
                    .broadcast(
                        room_id,
                        &ServerEvent::RoomExpired {
                            message: "This room has expired. Please create a new room."
                                .to_string(),
                        },
                    )
                    .await;
                return;
            }

            match other {
                ClientMessage::Vote { value } => {
                    handle_vote(state, &room, participant_id, &value).await
                }
                ClientMessage::Reveal => handle_reveal(state, room_id, participant_id).await,
                ClientMessage::Reset => handle_reset(state, room_id, participant_id).await,
                ClientMessage::NextRound => {
                    handle_next_round(state, room_id, participant_id).await
                }
                ClientMessage::UpdateConfig { config } => {
                    handle_update_config(state, room_id, participant_id, config).await
                }
                ClientMessage::UpdateName { .. } | ClientMessage::UpdateRoomName { .. } => {
                    unreachable!("name updates handled above")
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// vote
// ---------------------------------------------------------------------------

async fn handle_vote(state: &AppState, room: &Room, participant_id: Option<&str>, value: &str) {
    let room_id = room.id.as_str();
    let Some(participant_id) = participant_id else {
        tracing::debug!(room_id, "Vote rejected: no participant session");
        return;
    };

    if let Err(e) =
        votes::validate_vote_value(value, &room.pointing_method, &room.custom_value_set())
    {
        tracing::debug!(room_id, participant_id, error = %e, "Vote rejected: invalid value");
        return;
    }

    let round = match RoundRepo::current_for_room(&state.pool, room_id).await {
        Ok(Some(round)) => round,
        Ok(None) => {
            tracing::warn!(room_id, "Vote rejected: room has no current round");
            return;
        }
        Err(e) => {
            tracing::error!(room_id, participant_id, error = %e, "Failed to load current round");
            return;
        }
    };

    if !round.can_accept_votes() {
        // Outside the voting phase only a revealed round may take votes,
        // and only when the room opts in.
        if round.state != RoundState::Revealed {
            tracing::debug!(room_id, "Vote rejected: round already completed");
            return;
        }
        match AclService::can_change_vote_after_reveal(&state.pool, room_id).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::debug!(
                    room_id,
                    participant_id,
                    "Vote rejected: changing votes after reveal is not allowed"
                );
                return;
            }
            Err(e) => {
                tracing::error!(room_id, error = %e, "Failed to check change-vote permission");
                return;
            }
        }
    }

    let participant = match ParticipantRepo::find(&state.pool, participant_id).await {
        Ok(Some(p)) => p,
        Ok(None) => {
            tracing::debug!(room_id, participant_id, "Vote rejected: participant not found");
            return;
        }
        Err(e) => {
            tracing::error!(room_id, participant_id, error = %e, "Failed to load participant");
            return;
        }
    };

    if !participant.is_voter() {
        tracing::debug!(room_id, participant_id, "Vote rejected: participant is a spectator");
        return;
    }

    match VoteRepo::upsert_current(&state.pool, room_id, participant_id, value).await {
        Ok(true) => {}
        Ok(false) => {
            tracing::warn!(room_id, participant_id, "Vote dropped: no current round");
            return;
        }
        Err(e) => {
            tracing::error!(room_id, participant_id, error = %e, "Failed to save vote");
            return;
        }
    }

    if round.state == RoundState::Revealed {
        // The value is already public; broadcast it.
        state
            .hub
            .broadcast(
                room_id,
                &ServerEvent::VoteUpdated {
                    participant_id: participant_id.to_string(),
                    participant_name: participant.name.clone(),
                    value: value.to_string(),
                },
            )
            .await;
    } else {
        // Concealed phase: only the fact that a vote landed is disclosed.
        state
            .hub
            .broadcast(
                room_id,
                &ServerEvent::VoteCast {
                    participant_id: participant_id.to_string(),
                    has_voted: true,
                },
            )
            .await;

        maybe_start_auto_reveal(state, room).await;
    }
}

/// After a concealed vote: arm the auto-reveal countdown when the room
/// opts in and every voter has now voted.
async fn maybe_start_auto_reveal(state: &AppState, room: &Room) {
    if !room.room_config().permissions.auto_reveal {
        return;
    }
    let room_id = room.id.as_str();

    let all_voted = match VoteRepo::have_all_voters_voted(&state.pool, room_id).await {
        Ok(all_voted) => all_voted,
        Err(e) => {
            tracing::error!(room_id, error = %e, "Failed to evaluate auto-reveal predicate");
            return;
        }
    };

    if !all_voted {
        // The predicate no longer holds; disarm any pending countdown.
        state.auto_reveal.cancel(room_id);
        return;
    }

    let reveal_state = state.clone();
    let reveal_room_id = room.id.clone();
    let armed = state.auto_reveal.schedule(room_id, AUTO_REVEAL_DELAY, async move {
        auto_reveal_fire(reveal_state, reveal_room_id).await;
    });

    if armed {
        state
            .hub
            .broadcast(
                room_id,
                &ServerEvent::AutoRevealCountdown {
                    duration: AUTO_REVEAL_DELAY_MS,
                },
            )
            .await;
    }
}

/// Countdown elapsed: re-check the predicate, then run the reveal path as
/// if the creator had invoked it.
async fn auto_reveal_fire(state: AppState, room_id: String) {
    match VoteRepo::have_all_voters_voted(&state.pool, &room_id).await {
        Ok(true) => {}
        Ok(false) => {
            tracing::debug!(room_id, "Auto-reveal abandoned: voter set changed");
            return;
        }
        Err(e) => {
            tracing::error!(room_id, error = %e, "Auto-reveal predicate check failed");
            return;
        }
    }
    reveal_room(&state, &room_id).await;
}

// ---------------------------------------------------------------------------
// reveal
// ---------------------------------------------------------------------------

async fn handle_reveal(state: &AppState, room_id: &str, participant_id: Option<&str>) {
    match AclService::can_reveal(&state.pool, room_id, participant_id.unwrap_or("")).await {
        Ok(true) => {}
        Ok(false) => {
            tracing::debug!(room_id, participant_id, "Reveal rejected: not authorized");
            return;
        }
        Err(e) => {
            tracing::error!(room_id, error = %e, "Reveal ACL check failed");
            return;
        }
    }

    // A manual reveal supersedes any pending countdown.
    state.auto_reveal.cancel(room_id);
    reveal_room(state, room_id).await;
}

/// Transition the current round to `revealed` and broadcast the votes with
/// their statistics. Shared by the manual and auto-reveal paths.
pub async fn reveal_room(state: &AppState, room_id: &str) {
    match RoundRepo::current_for_room(&state.pool, room_id).await {
        Ok(Some(round)) if round.can_reveal() => {}
        Ok(_) => {
            tracing::debug!(room_id, "Reveal rejected: round not in voting state");
            return;
        }
        Err(e) => {
            tracing::error!(room_id, error = %e, "Failed to load current round");
            return;
        }
    }

    // The guarded update still decides races; a concurrent transition
    // since the check above simply yields no transition here.
    match RoundRepo::reveal_current(&state.pool, room_id).await {
        Ok(true) => {}
        Ok(false) => {
            tracing::debug!(room_id, "Reveal lost to a concurrent transition");
            return;
        }
        Err(e) => {
            tracing::error!(room_id, error = %e, "Failed to reveal round");
            return;
        }
    }

    let votes = match VoteRepo::list_current_for_room(&state.pool, room_id).await {
        Ok(votes) => votes,
        Err(e) => {
            tracing::error!(room_id, error = %e, "Failed to list votes after reveal");
            return;
        }
    };
    let participants = match ParticipantRepo::list_for_room(&state.pool, room_id).await {
        Ok(participants) => participants,
        Err(e) => {
            tracing::error!(room_id, error = %e, "Failed to list participants after reveal");
            return;
        }
    };

    let name_of = |id: &str| {
        participants
            .iter()
            .find(|p| p.id == id)
            .map(|p| p.name.clone())
            .unwrap_or_default()
    };

    let vote_views: Vec<VoteView> = votes
        .iter()
        .map(|v| VoteView {
            participant_id: v.participant_id.clone(),
            participant_name: name_of(&v.participant_id),
            value: v.value.clone(),
        })
        .collect();

    let stats = stats::calculate_stats(votes.iter().map(|v| v.value.as_str()));

    state
        .hub
        .broadcast(
            room_id,
            &ServerEvent::VotesRevealed {
                votes: vote_views,
                stats,
            },
        )
        .await;
}

// ---------------------------------------------------------------------------
// reset
// ---------------------------------------------------------------------------

async fn handle_reset(state: &AppState, room_id: &str, participant_id: Option<&str>) {
    match AclService::can_reset(&state.pool, room_id, participant_id.unwrap_or("")).await {
        Ok(true) => {}
        Ok(false) => {
            tracing::debug!(room_id, participant_id, "Reset rejected: not authorized");
            return;
        }
        Err(e) => {
            tracing::error!(room_id, error = %e, "Reset ACL check failed");
            return;
        }
    }

    state.auto_reveal.cancel(room_id);

    match RoundRepo::reset_current(&state.pool, room_id).await {
        Ok(true) => {}
        Ok(false) => {
            tracing::warn!(room_id, "Reset dropped: no current round");
            return;
        }
        Err(e) => {
            tracing::error!(room_id, error = %e, "Failed to reset round");
            return;
        }
    }

    state.hub.broadcast(room_id, &ServerEvent::RoomReset {}).await;
}

// ---------------------------------------------------------------------------
// next_round
// ---------------------------------------------------------------------------

async fn handle_next_round(state: &AppState, room_id: &str, participant_id: Option<&str>) {
    match AclService::can_new_round(&state.pool, room_id, participant_id.unwrap_or("")).await {
        Ok(true) => {}
        Ok(false) => {
            tracing::debug!(room_id, participant_id, "Next round rejected: not authorized");
            return;
        }
        Err(e) => {
            tracing::error!(room_id, error = %e, "Next round ACL check failed");
            return;
        }
    }

    match RoundRepo::current_for_room(&state.pool, room_id).await {
        Ok(Some(round)) if round.can_complete() => {}
        Ok(_) => {
            tracing::debug!(room_id, "Next round rejected: round not in revealed state");
            return;
        }
        Err(e) => {
            tracing::error!(room_id, error = %e, "Failed to load current round");
            return;
        }
    }

    state.auto_reveal.cancel(room_id);

    let new_round = match RoundRepo::complete_and_advance(&state.pool, room_id).await {
        Ok(round) => round,
        Err(e) => {
            tracing::error!(room_id, error = %e, "Failed to complete round");
            return;
        }
    };

    state
        .hub
        .broadcast(
            room_id,
            &ServerEvent::RoundCompleted {
                new_round_number: new_round.round_number,
            },
        )
        .await;
}

// ---------------------------------------------------------------------------
// update_name / update_room_name
// ---------------------------------------------------------------------------

async fn handle_update_name(
    state: &AppState,
    room_id: &str,
    participant_id: Option<&str>,
    name: &str,
) {
    let Some(participant_id) = participant_id else {
        tracing::debug!(room_id, "Name update rejected: no participant session");
        return;
    };

    let name = match validate_participant_name(name) {
        Ok(name) => name,
        Err(e) => {
            tracing::debug!(room_id, participant_id, error = %e, "Invalid participant name");
            return;
        }
    };

    match ParticipantRepo::update_name(&state.pool, participant_id, &name).await {
        Ok(true) => {}
        Ok(false) => {
            tracing::debug!(room_id, participant_id, "Name update dropped: participant not found");
            return;
        }
        Err(e) => {
            tracing::error!(room_id, participant_id, error = %e, "Failed to update name");
            return;
        }
    }

    state
        .hub
        .broadcast(
            room_id,
            &ServerEvent::NameUpdated {
                participant_id: participant_id.to_string(),
                name,
            },
        )
        .await;
}

async fn handle_update_room_name(
    state: &AppState,
    room_id: &str,
    participant_id: Option<&str>,
    name: &str,
) {
    let is_creator = match RoomRepo::is_creator(
        &state.pool,
        room_id,
        participant_id.unwrap_or(""),
    )
    .await
    {
        Ok(is_creator) => is_creator,
        Err(e) => {
            tracing::error!(room_id, error = %e, "Creator check failed");
            return;
        }
    };
    if !is_creator {
        tracing::debug!(room_id, participant_id, "Room rename rejected: not the creator");
        return;
    }

    let name = match validate_room_name(name) {
        Ok(name) => name,
        Err(e) => {
            tracing::debug!(room_id, error = %e, "Invalid room name");
            return;
        }
    };

    match RoomRepo::update_name(&state.pool, room_id, &name).await {
        Ok(true) => {}
        Ok(false) => {
            tracing::debug!(room_id, "Room rename dropped: room not found");
            return;
        }
        Err(e) => {
            tracing::error!(room_id, error = %e, "Failed to update room name");
            return;
        }
    }

    state
        .hub
        .broadcast(room_id, &ServerEvent::RoomNameUpdated { name })
        .await;
}

// ---------------------------------------------------------------------------
// update_config
// ---------------------------------------------------------------------------

async fn handle_update_config(
    state: &AppState,
    room_id: &str,
    participant_id: Option<&str>,
    config: poker_core::config::RoomConfig,
) {
    match AclService::can_update_config(&state.pool, room_id, participant_id.unwrap_or("")).await {
        Ok(true) => {}
        Ok(false) => {
            tracing::debug!(room_id, participant_id, "Config update rejected: not the creator");
            return;
        }
        Err(e) => {
            tracing::error!(room_id, error = %e, "Config ACL check failed");
            return;
        }
    }

    if let Err(e) = RoomRepo::update_config(&state.pool, room_id, &config).await {
        tracing::error!(room_id, error = %e, "Failed to update room config");
        return;
    }

    // Turning auto-reveal off mid-countdown disarms it.
    if !config.permissions.auto_reveal {
        state.auto_reveal.cancel(room_id);
    }

    // Clients recompute their local permissions from (config, is_creator).
    state
        .hub
        .broadcast(room_id, &ServerEvent::ConfigUpdated { config })
        .await;
}

// ---------------------------------------------------------------------------
// room_state snapshot
// ---------------------------------------------------------------------------

/// Assemble the full `room_state` snapshot for a newly attached connection.
pub async fn build_room_state(
    state: &AppState,
    room_id: &str,
    participant_id: Option<&str>,
) -> Result<ServerEvent, sqlx::Error> {
    let room = RoomRepo::find(&state.pool, room_id)
        .await?
        .ok_or(sqlx::Error::RowNotFound)?;

    let participants = ParticipantRepo::list_for_room(&state.pool, room_id).await?;
    let round = RoundRepo::current_for_room(&state.pool, room_id).await?;
    let vote_count = VoteRepo::list_current_for_room(&state.pool, room_id)
        .await?
        .len();

    let is_creator = participant_id.is_some_and(|id| room.is_creator(id));
    let permissions = permissions_for(&room.room_config(), is_creator);

    Ok(ServerEvent::RoomState(RoomStatePayload {
        participants: participants.iter().map(Into::into).collect(),
        room_state: round
            .as_ref()
            .map_or(RoundState::Voting, |r| r.state)
            .as_str()
            .to_string(),
        round_number: round.map(|r| r.round_number),
        vote_count,
        is_creator,
        current_participant_id: participant_id.map(str::to_string),
        expires_at: room.expires_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        permissions,
    }))
}

/// Broadcast a participant's (re)appearance to the whole room.
pub async fn broadcast_participant_joined(state: &AppState, participant: &Participant) {
    state
        .hub
        .broadcast(
            &participant.room_id,
            &ServerEvent::ParticipantJoined {
                participant: participant.into(),
            },
        )
        .await;
}
