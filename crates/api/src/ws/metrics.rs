//! Atomic counters tracking WebSocket server load and errors.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Instant;

use serde::Serialize;

use crate::ws::limits::{MAX_ROOMS_PER_INSTANCE, MAX_TOTAL_CONNECTIONS};

/// Health states derived from the current counters.
pub const HEALTH_HEALTHY: &str = "healthy";
pub const HEALTH_WARNING: &str = "warning";
pub const HEALTH_CRITICAL: &str = "critical";

/// Tracks hub load and error counts. All counters are atomic; a
/// consistent-enough view is available via [`Metrics::snapshot`].
pub struct Metrics {
    active_connections: AtomicI64,
    total_connections: AtomicI64,
    active_rooms: AtomicI64,
    messages_received: AtomicI64,
    messages_sent: AtomicI64,
    connection_errors: AtomicI64,
    broadcast_errors: AtomicI64,
    rate_limit_violations: AtomicI64,
    started_at: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            active_connections: AtomicI64::new(0),
            total_connections: AtomicI64::new(0),
            active_rooms: AtomicI64::new(0),
            messages_received: AtomicI64::new(0),
            messages_sent: AtomicI64::new(0),
            connection_errors: AtomicI64::new(0),
            broadcast_errors: AtomicI64::new(0),
            rate_limit_violations: AtomicI64::new(0),
            started_at: Instant::now(),
        }
    }

    // -- Connection tracking --

    pub fn increment_connections(&self) {
        self.active_connections.fetch_add(1, Ordering::Relaxed);
        self.total_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn decrement_connections(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn increment_rooms(&self) {
        self.active_rooms.fetch_add(1, Ordering::Relaxed);
    }

    pub fn decrement_rooms(&self) {
        self.active_rooms.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn active_connections(&self) -> i64 {
        self.active_connections.load(Ordering::Relaxed)
    }

    pub fn active_rooms(&self) -> i64 {
        self.active_rooms.load(Ordering::Relaxed)
    }

    // -- Message tracking --

    pub fn increment_messages_received(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_messages_sent(&self) {
        self.messages_sent.fetch_add(1, Ordering::Relaxed);
    }

    // -- Error tracking --

    pub fn increment_connection_errors(&self) {
        self.connection_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_broadcast_errors(&self) {
        self.broadcast_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_rate_limit_violations(&self) {
        self.rate_limit_violations.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time view of all counters plus derived health.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let active_connections = self.active_connections.load(Ordering::Relaxed);
        let active_rooms = self.active_rooms.load(Ordering::Relaxed);
        let connection_errors = self.connection_errors.load(Ordering::Relaxed);
        let broadcast_errors = self.broadcast_errors.load(Ordering::Relaxed);

        MetricsSnapshot {
            active_connections,
            total_connections: self.total_connections.load(Ordering::Relaxed),
            active_rooms,
            messages_received: self.messages_received.load(Ordering::Relaxed),
            messages_sent: self.messages_sent.load(Ordering::Relaxed),
            connection_errors,
            broadcast_errors,
            rate_limit_violations: self.rate_limit_violations.load(Ordering::Relaxed),
            uptime_seconds: self.started_at.elapsed().as_secs(),
            health_status: health_status(
                active_connections,
                active_rooms,
                connection_errors + broadcast_errors,
            ),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Derive overall health from load and error counts: `critical` above 90%
/// of the connection or room limits, `warning` above 80% or once more than
/// 100 errors have accumulated.
fn health_status(active_connections: i64, active_rooms: i64, errors: i64) -> &'static str {
    let conn_limit = MAX_TOTAL_CONNECTIONS as i64;
    let room_limit = MAX_ROOMS_PER_INSTANCE as i64;

    if active_connections > conn_limit * 9 / 10 || active_rooms > room_limit * 9 / 10 {
        return HEALTH_CRITICAL;
    }
    if active_connections > conn_limit * 8 / 10 || active_rooms > room_limit * 8 / 10 || errors > 100
    {
        return HEALTH_WARNING;
    }
    HEALTH_HEALTHY
}

/// Serialized form of [`Metrics`], returned by `/metrics`.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub active_connections: i64,
    pub total_connections: i64,
    pub active_rooms: i64,
    pub messages_received: i64,
    pub messages_sent: i64,
    pub connection_errors: i64,
    pub broadcast_errors: i64,
    pub rate_limit_violations: i64,
    pub uptime_seconds: u64,
    pub health_status: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_metrics_are_healthy() {
        let snapshot = Metrics::new().snapshot();
        assert_eq!(snapshot.active_connections, 0);
        assert_eq!(snapshot.health_status, HEALTH_HEALTHY);
    }

    #[test]
    fn connection_counters_track_register_unregister() {
        let metrics = Metrics::new();
        metrics.increment_connections();
        metrics.increment_connections();
        metrics.decrement_connections();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.active_connections, 1);
        assert_eq!(snapshot.total_connections, 2);
    }

    #[test]
    fn health_thresholds() {
        assert_eq!(health_status(0, 0, 0), HEALTH_HEALTHY);
        assert_eq!(health_status(8001, 0, 0), HEALTH_WARNING);
        assert_eq!(health_status(0, 801, 0), HEALTH_WARNING);
        assert_eq!(health_status(0, 0, 101), HEALTH_WARNING);
        assert_eq!(health_status(9001, 0, 0), HEALTH_CRITICAL);
        assert_eq!(health_status(0, 901, 0), HEALTH_CRITICAL);
    }
}
