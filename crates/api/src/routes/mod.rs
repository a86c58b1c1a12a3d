//! HTTP route tree.

pub mod metrics;
pub mod rooms;

use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;
use crate::ws;

/// Build the application route tree.
///
/// ```text
/// GET  /templates                 built-in vote-value templates
/// POST /room                      create room (form), 303 to /room/{id}
/// GET  /room/{id}                 room view
/// POST /room/{id}/join            join room, issues session cookie
/// GET  /room/{id}/participants    participant grid + statistics data
/// GET  /ws/{room_id}              WebSocket upgrade (capacity-checked)
/// GET  /metrics                   hub counter snapshot
/// GET  /health                    health status (503 when critical)
/// ```
pub fn app_routes() -> Router<AppState> {
    Router::new()
        .route("/templates", get(rooms::templates))
        .route("/room", post(rooms::create_room))
        .route("/room/{id}", get(rooms::room_view))
        .route("/room/{id}/join", post(rooms::join_room))
        .route("/room/{id}/participants", get(rooms::participants_fragment))
        .route("/ws/{room_id}", get(ws::session::ws_handler))
        .route("/metrics", get(metrics::metrics))
        .route("/health", get(metrics::health))
}
