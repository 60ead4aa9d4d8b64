//! Transport settings, events and errors

use std::time::Duration;
use thiserror::Error;

/// Connection settings for one endpoint
#[derive(Debug, Clone)]
pub struct WsConfig {
    /// `ws://` or `wss://` endpoint
    pub url: String,
    /// Maximum reconnection attempts before giving up (0 = infinite)
    pub max_reconnect_attempts: u32,
    /// Fixed delay between reconnection attempts
    pub reconnect_delay: Duration,
    /// Silence after which a ping is sent; a second silent period is a stall
    pub read_timeout: Duration,
    /// Application-level ping text sent on read timeout instead of a ping frame
    pub idle_ping: Option<String>,
    /// Outbound queue capacity
    pub send_buffer: usize,
}

impl Default for WsConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_reconnect_attempts: 0,
            reconnect_delay: Duration::from_secs(5),
            read_timeout: Duration::from_secs(60),
            idle_ping: None,
            send_buffer: 256,
        }
    }
}

impl WsConfig {
    /// Defaults for `url`
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn max_reconnects(mut self, n: u32) -> Self {
        self.max_reconnect_attempts = n;
        self
    }

    /// Set the delay between reconnection attempts
    pub fn reconnect_delay(mut self, d: Duration) -> Self {
        self.reconnect_delay = d;
        self
    }

    pub fn read_timeout(mut self, d: Duration) -> Self {
        self.read_timeout = d;
        self
    }

    /// Send this text instead of a ping frame when the connection goes quiet
    pub fn idle_ping(mut self, text: impl Into<String>) -> Self {
        self.idle_ping = Some(text.into());
        self
    }
}

/// Events delivered to the consumer
#[derive(Debug, Clone)]
pub enum WsMessage {
    Text(String),
    Binary(Vec<u8>),
    /// Connection established
    Connected,
    /// Connection closed for good
    Disconnected,
    /// Reconnecting after failure
    Reconnecting { attempt: u32 },
}

/// Why a connection ended
#[derive(Debug, Clone, Error)]
pub enum WsError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Connection closed by server")]
    ClosedByServer,

    #[error("No message within {0:?}")]
    Stalled(Duration),

    #[error("Maximum reconnection attempts exceeded")]
    MaxReconnectsExceeded,

    #[error("Send failed: {0}")]
    SendFailed(String),
}
