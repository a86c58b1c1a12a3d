//! Periodic removal of expired rooms.
//!
//! Rooms carry a 24-hour expiry; this task deletes every room past its
//! `expires_at` (participants, rounds, and votes cascade with it). Runs on
//! a fixed interval using `tokio::time::interval`.

use std::time::Duration;

use poker_db::repositories::RoomRepo;
use poker_db::DbPool;
use tokio_util::sync::CancellationToken;

/// How often the cleanup job runs.
const CLEANUP_INTERVAL: Duration = Duration::from_secs(3600);

/// Run the expired-room cleanup loop until `cancel` is triggered.
pub async fn run(pool: DbPool, cancel: CancellationToken) {
    tracing::info!(
        interval_secs = CLEANUP_INTERVAL.as_secs(),
        "Room cleanup job started"
    );

    let mut interval = tokio::time::interval(CLEANUP_INTERVAL);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Room cleanup job stopping");
                break;
            }
            _ = interval.tick() => {
                match RoomRepo::delete_expired(&pool).await {
                    Ok(deleted) => {
                        if deleted > 0 {
                            tracing::info!(deleted, "Room cleanup: purged expired rooms");
                        } else {
                            tracing::debug!("Room cleanup: nothing to purge");
                        }
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Room cleanup failed");
                    }
                }
            }
        }
    }
}
