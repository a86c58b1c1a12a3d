//! Per-connection handle shared between the hub and the session pumps.

use std::sync::atomic::{AtomicBool, Ordering};

use axum::extract::ws::Message;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Outcome of a non-blocking enqueue onto a connection's send buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendResult {
    /// The frame was queued for the write pump.
    Enqueued,
    /// The send buffer is full; the client is too slow.
    BufferFull,
    /// The connection is closed (or closing); nothing was queued.
    Closed,
}

/// One live transport to one participant.
///
/// The hub holds the handle for fan-out; the read and write pumps share
/// the cancellation token. `close` is idempotent and races safely against
/// `try_send`: a send after close is rejected, never blocked on.
pub struct Connection {
    id: u64,
    room_id: String,
    participant_id: Option<String>,
    sender: mpsc::Sender<Message>,
    cancel: CancellationToken,
    closed: AtomicBool,
}

impl Connection {
    pub fn new(
        id: u64,
        room_id: String,
        participant_id: Option<String>,
        sender: mpsc::Sender<Message>,
    ) -> Self {
        Self {
            id,
            room_id,
            participant_id,
            sender,
            cancel: CancellationToken::new(),
            closed: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    pub fn participant_id(&self) -> Option<&str> {
        self.participant_id.as_deref()
    }

    /// Attempt a non-blocking enqueue to the outbound buffer.
    pub fn try_send(&self, message: Message) -> SendResult {
        if self.is_closed() {
            return SendResult::Closed;
        }
        match self.sender.try_send(message) {
            Ok(()) => SendResult::Enqueued,
            Err(mpsc::error::TrySendError::Full(_)) => SendResult::BufferFull,
            Err(mpsc::error::TrySendError::Closed(_)) => SendResult::Closed,
        }
    }

    /// Mark the connection closed and cancel both pumps. Idempotent.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.cancel.cancel();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Token cancelled when the connection closes; both pumps select on it.
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn send_after_close_is_rejected() {
        let (tx, _rx) = mpsc::channel(4);
        let conn = Connection::new(1, "room".into(), None, tx);

        assert_eq!(conn.try_send(Message::Text("a".into())), SendResult::Enqueued);
        conn.close();
        assert_eq!(conn.try_send(Message::Text("b".into())), SendResult::Closed);
    }

    #[test]
    fn full_buffer_reported() {
        let (tx, _rx) = mpsc::channel(1);
        let conn = Connection::new(1, "room".into(), None, tx);

        assert_eq!(conn.try_send(Message::Text("a".into())), SendResult::Enqueued);
        assert_eq!(
            conn.try_send(Message::Text("b".into())),
            SendResult::BufferFull
        );
    }

    #[test]
    fn close_is_idempotent_and_cancels() {
        let (tx, _rx) = mpsc::channel(1);
        let conn = Connection::new(1, "room".into(), None, tx);

        assert!(!conn.cancel_token().is_cancelled());
        conn.close();
        conn.close();
        assert!(conn.is_closed());
        assert!(conn.cancel_token().is_cancelled());
    }
}
