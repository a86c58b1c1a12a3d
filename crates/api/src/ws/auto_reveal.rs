//! Cancellable per-room auto-reveal countdowns.
//!
//! When the last voter votes in an auto-reveal room, a countdown is
//! broadcast and a delayed task is scheduled here. The server enforces the
//! delay: the reveal runs exactly once when the countdown elapses, unless
//! something invalidates it first (a roster change, a reset, a manual
//! reveal, a config change) and cancels the slot.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

type PendingMap = Arc<Mutex<HashMap<String, CancellationToken>>>;

/// One pending countdown slot per room. A second trigger while a slot is
/// occupied does not re-arm the countdown.
pub struct AutoRevealScheduler {
    pending: PendingMap,
}

impl AutoRevealScheduler {
    pub fn new() -> Self {
        Self {
            pending: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Arm a countdown for `room_id`, running `on_fire` after `delay`.
    ///
    /// Returns `false` without scheduling when a countdown is already
    /// pending for the room.
    pub fn schedule<F>(&self, room_id: &str, delay: Duration, on_fire: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let token = {
            let mut pending = self.pending.lock().expect("scheduler lock");
            if pending.contains_key(room_id) {
                return false;
            }
            let token = CancellationToken::new();
            pending.insert(room_id.to_string(), token.clone());
            token
        };

        let pending = Arc::clone(&self.pending);
        let room_id = room_id.to_string();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    pending.lock().expect("scheduler lock").remove(&room_id);
                    if !token.is_cancelled() {
                        on_fire.await;
                    }
                }
            }
        });
        true
    }

    /// Cancel a pending countdown, if any.
    pub fn cancel(&self, room_id: &str) {
        if let Some(token) = self.pending.lock().expect("scheduler lock").remove(room_id) {
            token.cancel();
            tracing::debug!(room_id, "Auto-reveal countdown cancelled");
        }
    }

    pub fn is_pending(&self, room_id: &str) -> bool {
        self.pending
            .lock()
            .expect("scheduler lock")
            .contains_key(room_id)
    }
}

impl Default for AutoRevealScheduler {
    fn default() -> Self {
        Self::new()
    }
}
