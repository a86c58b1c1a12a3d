//! Per-connection lifecycle: upgrade, registration, read/write pumps.
//!
//! Each connection runs two cooperating tasks. The write pump owns the
//! socket sink and drains the outbound buffer, interleaving heartbeat
//! pings; the read pump owns the stream, enforces the inactivity deadline
//! and the per-connection rate limit, and dispatches decoded actions.
//! Closing the connection cancels both.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::ws::{close_code, CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum_extra::extract::CookieJar;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use poker_core::error::CoreError;
use poker_core::validation::validate_entity_id;
use poker_db::models::participant::Participant;
use poker_db::repositories::{ParticipantRepo, RoomRepo};

use crate::error::{AppError, AppResult};
use crate::routes::rooms::PARTICIPANT_COOKIE;
use crate::state::AppState;
use crate::ws::actions;
use crate::ws::connection::Connection;
use crate::ws::hub::{CapacityError, Hub};
use crate::ws::limits::{PING_INTERVAL, READ_TIMEOUT, SEND_BUFFER_SIZE, WRITE_TIMEOUT};
use crate::ws::origin::OriginValidator;
use crate::ws::protocol::{decode_client_message, ServerEvent};
use crate::ws::rate_limit::RateLimiter;

/// GET /ws/{roomId}
///
/// Upgrade to WebSocket after validating the room id, the upgrade origin,
/// and hub capacity. Capacity refusals happen before the upgrade so the
/// client sees an HTTP 429/503 rather than a dropped socket.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(room_id): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
) -> AppResult<impl IntoResponse> {
    validate_entity_id(&room_id)
        .map_err(|_| AppError::BadRequest("Invalid room ID".to_string()))?;

    let room = RoomRepo::find(&state.pool, &room_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Room",
            id: room_id.clone(),
        }))?;

    let origins = OriginValidator::new(state.config.ws_allowed_origins.clone());
    if !origins.check(&headers) {
        return Err(AppError::BadRequest("Origin not allowed".to_string()));
    }

    state.hub.can_accept(&room_id).await.map_err(|e| match e {
        CapacityError::RoomFull => AppError::RoomFull,
        CapacityError::ServerAtCapacity => AppError::ServerAtCapacity,
    })?;

    // Resolve the participant from the session cookie; connections without
    // a session are anonymous observers.
    let participant = match jar.get(PARTICIPANT_COOKIE) {
        Some(cookie) => {
            ParticipantRepo::find_by_session(&state.pool, &room_id, cookie.value()).await?
        }
        None => None,
    };

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, room.id, participant)))
}

/// Manage one connection after upgrade until either pump exits.
async fn handle_socket(
    socket: WebSocket,
    state: AppState,
    room_id: String,
    participant: Option<Participant>,
) {
    let participant_id = participant.as_ref().map(|p| p.id.clone());
    let (tx, rx) = mpsc::channel(SEND_BUFFER_SIZE);
    let conn = Arc::new(Connection::new(
        state.hub.next_connection_id(),
        room_id.clone(),
        participant_id.clone(),
        tx,
    ));

    state.hub.register(Arc::clone(&conn)).await;

    if let Some(participant) = &participant {
        // Best effort; a failed flag update must not kill the attach.
        if let Err(e) = ParticipantRepo::set_connected(&state.pool, &participant.id, true).await {
            tracing::warn!(room_id, participant_id = %participant.id, error = %e,
                "Failed to mark participant connected");
        }
        match ParticipantRepo::find(&state.pool, &participant.id).await {
            Ok(Some(fresh)) => actions::broadcast_participant_joined(&state, &fresh).await,
            Ok(None) => {}
            Err(e) => tracing::warn!(room_id, error = %e, "Failed to reload participant"),
        }
    }

    // Snapshot for the new client only; everyone else already has state.
    match actions::build_room_state(&state, &room_id, participant_id.as_deref()).await {
        Ok(event) => state.hub.send_to(&conn, &event),
        Err(e) => {
            tracing::error!(room_id, error = %e, "Failed to build initial room state")
        }
    }

    let (sink, stream) = socket.split();
    let write_task = tokio::spawn(write_pump(
        Arc::clone(&conn),
        sink,
        rx,
        Arc::clone(&state.hub),
    ));

    read_pump(&state, &conn, stream).await;

    state.hub.unregister(&conn).await;

    if let Some(id) = &participant_id {
        let _ = ParticipantRepo::set_connected(&state.pool, id, false).await;
        state
            .hub
            .broadcast(
                &room_id,
                &ServerEvent::ParticipantLeft {
                    participant_id: id.clone(),
                },
            )
            .await;
    }

    // Unregister closed the connection, which cancels the write pump.
    let _ = write_task.await;
    tracing::info!(room_id, participant_id, "WebSocket disconnected");
}

/// Drain the outbound buffer into the socket, pinging every
/// [`PING_INTERVAL`]. Any write error or timeout ends the pump.
async fn write_pump(
    conn: Arc<Connection>,
    mut sink: SplitSink<WebSocket, Message>,
    mut rx: mpsc::Receiver<Message>,
    hub: Arc<Hub>,
) {
    let mut heartbeat = tokio::time::interval(PING_INTERVAL);
    // The first tick completes immediately; consume it.
    heartbeat.tick().await;

    loop {
        tokio::select! {
            _ = conn.cancel_token().cancelled() => break,

            maybe = rx.recv() => {
                let Some(message) = maybe else { break };
                // A frame that raced the close flag is silently dropped.
                if conn.is_closed() {
                    break;
                }
                match tokio::time::timeout(WRITE_TIMEOUT, sink.send(message)).await {
                    Ok(Ok(())) => hub.metrics().increment_messages_sent(),
                    Ok(Err(e)) => {
                        hub.metrics().increment_broadcast_errors();
                        tracing::debug!(room_id = %conn.room_id(), error = %e, "Write error");
                        break;
                    }
                    Err(_) => {
                        hub.metrics().increment_broadcast_errors();
                        tracing::debug!(room_id = %conn.room_id(), "Write timed out");
                        break;
                    }
                }
            }

            _ = heartbeat.tick() => {
                let ping = sink.send(Message::Ping(Bytes::new()));
                match tokio::time::timeout(WRITE_TIMEOUT, ping).await {
                    Ok(Ok(())) => {}
                    _ => {
                        tracing::debug!(room_id = %conn.room_id(), "Ping failed");
                        break;
                    }
                }
            }
        }
    }

    conn.close();
    let _ = sink
        .send(Message::Close(Some(CloseFrame {
            code: close_code::NORMAL,
            reason: "".into(),
        })))
        .await;
}

/// Read frames until the transport errors, the peer closes, or nothing
/// arrives for [`READ_TIMEOUT`]. Rate-limited messages are answered with
/// an `error` frame and dropped without disconnecting.
async fn read_pump(state: &AppState, conn: &Arc<Connection>, mut stream: SplitStream<WebSocket>) {
    let mut limiter = RateLimiter::new();

    loop {
        let frame = tokio::select! {
            _ = conn.cancel_token().cancelled() => break,
            frame = tokio::time::timeout(READ_TIMEOUT, stream.next()) => frame,
        };

        let result = match frame {
            Err(_) => {
                // Inactivity deadline passed with no traffic, not even pongs.
                state.hub.metrics().increment_connection_errors();
                tracing::debug!(room_id = %conn.room_id(), "Read timed out");
                break;
            }
            Ok(None) => break,
            Ok(Some(result)) => result,
        };

        match result {
            Ok(Message::Close(_)) => break,
            Ok(Message::Text(text)) => {
                if !limiter.allow() {
                    state.hub.metrics().increment_rate_limit_violations();
                    tracing::warn!(
                        room_id = %conn.room_id(),
                        participant_id = conn.participant_id().unwrap_or(""),
                        "Rate limit exceeded"
                    );
                    state.hub.send_to(
                        conn,
                        &ServerEvent::Error {
                            message: "Rate limit exceeded. Please slow down.".to_string(),
                        },
                    );
                    continue;
                }

                state.hub.metrics().increment_messages_received();

                match decode_client_message(&text) {
                    Ok(Some(message)) => actions::dispatch(state, conn, message).await,
                    Ok(None) => {
                        // Header-only or unknown type; tolerated.
                    }
                    Err(e) => {
                        tracing::debug!(
                            room_id = %conn.room_id(),
                            error = %e,
                            "Dropped undecodable frame"
                        );
                    }
                }
            }
            Ok(Message::Ping(_) | Message::Pong(_)) => {
                tracing::trace!(room_id = %conn.room_id(), "Heartbeat frame");
            }
            Ok(Message::Binary(_)) => {
                tracing::debug!(room_id = %conn.room_id(), "Ignoring binary frame");
            }
            Err(e) => {
                state.hub.metrics().increment_connection_errors();
                tracing::debug!(room_id = %conn.room_id(), error = %e, "Receive error");
                break;
            }
        }
    }
}
