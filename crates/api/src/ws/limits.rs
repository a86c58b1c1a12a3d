//! WebSocket connection limits and timing constants.

use std::time::Duration;

// Connection limits.
pub const MAX_CONNECTIONS_PER_ROOM: usize = 50;
pub const MAX_ROOMS_PER_INSTANCE: usize = 1000;
pub const MAX_TOTAL_CONNECTIONS: usize = 10_000;

// Rate limiting.
pub const MAX_MESSAGES_PER_WINDOW: u32 = 10;
pub const RATE_LIMIT_WINDOW: Duration = Duration::from_secs(1);

// Timeouts.
pub const WRITE_TIMEOUT: Duration = Duration::from_secs(10);
pub const PING_INTERVAL: Duration = Duration::from_secs(30);
/// 3x ping interval for network delay tolerance.
pub const READ_TIMEOUT: Duration = Duration::from_secs(90);

// Channel buffers.
pub const SEND_BUFFER_SIZE: usize = 256;

/// Delay between the countdown broadcast and the server-side reveal.
pub const AUTO_REVEAL_DELAY: Duration = Duration::from_millis(1500);
/// Countdown duration advertised to clients, in milliseconds.
pub const AUTO_REVEAL_DELAY_MS: u64 = 1500;
