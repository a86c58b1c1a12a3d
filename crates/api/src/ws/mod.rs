//! WebSocket infrastructure: connection hub, per-connection session
//! pumps, wire protocol, metrics, and the auto-reveal scheduler.

pub mod actions;
pub mod auto_reveal;
pub mod connection;
pub mod hub;
pub mod limits;
pub mod metrics;
pub mod origin;
pub mod protocol;
pub mod rate_limit;
pub mod session;

pub use connection::Connection;
pub use hub::Hub;
pub use metrics::Metrics;
