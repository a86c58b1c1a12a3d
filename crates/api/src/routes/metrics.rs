//! Metrics and health endpoints, backed by the hub's counters.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{extract::State, Json};
use serde_json::json;

use crate::state::AppState;
use crate::ws::metrics::HEALTH_CRITICAL;

/// GET /metrics
///
/// Full counter snapshot.
pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.hub.metrics().snapshot())
}

/// GET /health
///
/// Condensed health view; answers 503 when the hub is critical so load
/// balancers stop routing new rooms here.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let snapshot = state.hub.metrics().snapshot();

    let status = if snapshot.health_status == HEALTH_CRITICAL {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };

    let body = json!({
        "status": snapshot.health_status,
        "active_connections": snapshot.active_connections,
        "active_rooms": snapshot.active_rooms,
        "uptime_seconds": snapshot.uptime_seconds,
    });

    (status, Json(body))
}
