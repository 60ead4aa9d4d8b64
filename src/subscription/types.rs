//! Subscription manager types

use crate::config::SniperConfig;
use chrono::{DateTime, Utc};
use std::fmt;
use std::time::Duration;

/// Runtime settings for the subscription manager
#[derive(Debug, Clone)]
pub struct SubscriptionConfig {
    /// Live subscriptions per venue
    pub max_subscriptions: usize,
    /// Minimum gap between subscribe requests on one venue
    pub subscribe_gap: Duration,
    pub reconnect_delay: Duration,
    pub read_timeout: Duration,
    /// Levels per side used for the imbalance
    pub imbalance_depth: usize,
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self {
            max_subscriptions: 10,
            subscribe_gap: Duration::from_millis(500),
            reconnect_delay: Duration::from_secs(5),
            read_timeout: Duration::from_secs(60),
            imbalance_depth: 20,
        }
    }
}

impl From<&SniperConfig> for SubscriptionConfig {
    fn from(config: &SniperConfig) -> Self {
        Self {
            max_subscriptions: config.max_subscriptions.max(1),
            subscribe_gap: Duration::from_millis(config.subscribe_gap_ms),
            reconnect_delay: Duration::from_secs(config.reconnect_delay_secs),
            read_timeout: Duration::from_secs(config.read_timeout_secs.max(1)),
            imbalance_depth: config.imbalance_depth.max(1),
        }
    }
}

/// Connection lifecycle of one venue stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    /// Socket open, no data yet
    Connected,
    /// Socket open and data flowing
    Receiving,
    /// Waiting to retry after a failure
    Reconnecting,
}

impl ConnectionState {
    /// Whether outbound messages reach the venue right now
    pub fn is_open(&self) -> bool {
        matches!(
            self,
            ConnectionState::Connected | ConnectionState::Receiving
        )
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Receiving => "receiving",
            ConnectionState::Reconnecting => "reconnecting",
        };
        f.write_str(s)
    }
}

/// One desired order book subscription
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    /// Lowercase symbol ("btcusdt")
    pub symbol: String,
    pub subscribed_at: DateTime<Utc>,
    /// When the last depth message for the symbol was applied
    pub last_activity: Option<DateTime<Utc>>,
}

impl Subscription {
    pub fn new(symbol: impl Into<String>, subscribed_at: DateTime<Utc>) -> Self {
        Self {
            symbol: symbol.into(),
            subscribed_at,
            last_activity: None,
        }
    }
}

/// Outcome of a subscribe request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Activation {
    /// The symbol was already subscribed
    AlreadyActive,
    /// Newly subscribed, possibly after evicting the oldest subscription
    Added { evicted: Option<String> },
    /// No stream adapter for the venue
    Unsupported,
}
