//! WebSocket transport
//!
//! One background task per connection owns the socket and reconnects with a
//! fixed delay. Quiet connections are pinged once, then treated as stalled.
//! Consumers see data frames plus connection lifecycle events.

mod client;
mod types;

pub use client::WsClient;
pub use types::{WsConfig, WsError, WsMessage};
