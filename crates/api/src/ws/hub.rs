//! Connection hub: room-scoped fan-out of events to live connections.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::extract::ws::Message;
use tokio::sync::RwLock;

use crate::ws::connection::{Connection, SendResult};
use crate::ws::limits::{MAX_CONNECTIONS_PER_ROOM, MAX_ROOMS_PER_INSTANCE, MAX_TOTAL_CONNECTIONS};
use crate::ws::metrics::Metrics;
use crate::ws::protocol::ServerEvent;

/// Why a connection attempt was refused before upgrade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapacityError {
    RoomFull,
    ServerAtCapacity,
}

/// Tracks every live connection grouped by room and fans out broadcasts.
///
/// The room map is guarded by a `tokio::sync::RwLock`; global counters are
/// atomic. Broadcast never blocks on a slow consumer: each enqueue is
/// non-blocking, and a full send buffer marks that connection for close
/// while delivery to the rest of the room continues.
pub struct Hub {
    rooms: RwLock<HashMap<String, HashMap<u64, Arc<Connection>>>>,
    next_conn_id: AtomicU64,
    metrics: Metrics,
}

impl Hub {
    pub fn new() -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            next_conn_id: AtomicU64::new(1),
            metrics: Metrics::new(),
        }
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Allocate an id for a new connection.
    pub fn next_connection_id(&self) -> u64 {
        self.next_conn_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Check capacity for a prospective connection to `room_id`.
    ///
    /// Called before the transport upgrade so a refusal can still be an
    /// HTTP-level error.
    pub async fn can_accept(&self, room_id: &str) -> Result<(), CapacityError> {
        if self.metrics.active_connections() >= MAX_TOTAL_CONNECTIONS as i64 {
            return Err(CapacityError::ServerAtCapacity);
        }

        let rooms = self.rooms.read().await;
        match rooms.get(room_id) {
            Some(connections) => {
                if connections.len() >= MAX_CONNECTIONS_PER_ROOM {
                    return Err(CapacityError::RoomFull);
                }
            }
            None => {
                if rooms.len() >= MAX_ROOMS_PER_INSTANCE {
                    return Err(CapacityError::ServerAtCapacity);
                }
            }
        }
        Ok(())
    }

    /// Add a connection to its room's set, creating the set on first use.
    pub async fn register(&self, conn: Arc<Connection>) {
        let mut rooms = self.rooms.write().await;
        let room = rooms.entry(conn.room_id().to_string()).or_insert_with(|| {
            self.metrics.increment_rooms();
            HashMap::new()
        });
        room.insert(conn.id(), Arc::clone(&conn));
        self.metrics.increment_connections();

        tracing::info!(
            room_id = %conn.room_id(),
            participant_id = conn.participant_id().unwrap_or(""),
            room_connections = room.len(),
            "WebSocket registered"
        );
    }

    /// Remove a connection, dropping the room entry when it empties.
    /// The connection itself is closed as part of unregistration.
    pub async fn unregister(&self, conn: &Connection) {
        let mut rooms = self.rooms.write().await;
        if let Some(room) = rooms.get_mut(conn.room_id()) {
            if room.remove(&conn.id()).is_some() {
                conn.close();
                self.metrics.decrement_connections();
                if room.is_empty() {
                    rooms.remove(conn.room_id());
                    self.metrics.decrement_rooms();
                }
            }
        }
    }

    /// Fan an event out to every connection in a room.
    ///
    /// The event is serialized once. Connections whose send buffer is full
    /// are slow clients: they are closed (they will re-sync from the
    /// `room_state` snapshot on reconnect) and the broadcast continues.
    pub async fn broadcast(&self, room_id: &str, event: &ServerEvent) {
        let data = match event.to_json() {
            Ok(data) => data,
            Err(e) => {
                self.metrics.increment_broadcast_errors();
                tracing::error!(room_id, error = %e, "Failed to serialize broadcast");
                return;
            }
        };

        let connections: Vec<Arc<Connection>> = {
            let rooms = self.rooms.read().await;
            match rooms.get(room_id) {
                Some(room) => room.values().cloned().collect(),
                None => {
                    tracing::debug!(room_id, "Broadcast to room with no connections");
                    return;
                }
            }
        };

        tracing::debug!(
            room_id,
            connections = connections.len(),
            "Broadcasting to room"
        );

        for conn in connections {
            self.deliver(&conn, Message::Text(data.clone().into()));
        }
    }

    /// Send an event to a single connection (e.g. the initial room-state
    /// snapshot to a new client).
    pub fn send_to(&self, conn: &Connection, event: &ServerEvent) {
        match event.to_json() {
            Ok(data) => self.deliver(conn, Message::Text(data.into())),
            Err(e) => {
                self.metrics.increment_broadcast_errors();
                tracing::error!(
                    room_id = %conn.room_id(),
                    error = %e,
                    "Failed to serialize message"
                );
            }
        }
    }

    /// Non-blocking enqueue with the slow-client policy applied.
    fn deliver(&self, conn: &Connection, message: Message) {
        match conn.try_send(message) {
            SendResult::Enqueued => {}
            SendResult::BufferFull => {
                tracing::warn!(
                    room_id = %conn.room_id(),
                    participant_id = conn.participant_id().unwrap_or(""),
                    "Send buffer full, closing slow client"
                );
                self.metrics.increment_broadcast_errors();
                conn.close();
            }
            SendResult::Closed => {
                // Raced a close; the write pump drops the frame.
            }
        }
    }

    /// Number of live connections in one room.
    pub async fn room_connection_count(&self, room_id: &str) -> usize {
        self.rooms
            .read()
            .await
            .get(room_id)
            .map_or(0, HashMap::len)
    }

    /// Number of rooms with at least one live connection.
    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }
}

impl Default for Hub {
    fn default() -> Self {
        Self::new()
    }
}
