//! Per-connection inbound message rate limiting.

use std::time::Instant;

use crate::ws::limits::{MAX_MESSAGES_PER_WINDOW, RATE_LIMIT_WINDOW};

/// Fixed-window message counter, owned by a single read pump so no
/// synchronization is needed. Each connection gets an independent window.
pub struct RateLimiter {
    count: u32,
    window_start: Instant,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self {
            count: 0,
            window_start: Instant::now(),
        }
    }

    /// Count one message; returns `false` once more than
    /// [`MAX_MESSAGES_PER_WINDOW`] messages land in the current window.
    pub fn allow(&mut self) -> bool {
        let now = Instant::now();
        if now.duration_since(self.window_start) > RATE_LIMIT_WINDOW {
            self.count = 0;
            self.window_start = now;
        }
        self.count += 1;
        self.count <= MAX_MESSAGES_PER_WINDOW
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_up_to_limit_then_rejects() {
        let mut limiter = RateLimiter::new();
        for n in 1..=MAX_MESSAGES_PER_WINDOW {
            assert!(limiter.allow(), "message #{n} should be allowed");
        }
        // Messages 11..=20 in the same window are all rejected.
        for n in 1..=MAX_MESSAGES_PER_WINDOW {
            assert!(!limiter.allow(), "over-limit message #{n} should be rejected");
        }
    }

    #[test]
    fn window_resets_after_elapse() {
        let mut limiter = RateLimiter::new();
        for _ in 0..=MAX_MESSAGES_PER_WINDOW {
            limiter.allow();
        }
        assert!(!limiter.allow());

        // Rewind the window start instead of sleeping.
        limiter.window_start = Instant::now() - (RATE_LIMIT_WINDOW * 2);
        assert!(limiter.allow());
    }
}
