use std::sync::Arc;

use crate::config::ServerConfig;
use crate::ws::auto_reveal::AutoRevealScheduler;
use crate::ws::hub::Hub;

/// Shared application state available to all Axum handlers via
/// `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already
/// `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: poker_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// WebSocket connection hub.
    pub hub: Arc<Hub>,
    /// Pending auto-reveal countdowns, one slot per room.
    pub auto_reveal: Arc<AutoRevealScheduler>,
}
