//! Streaming venue adapters
//!
//! One small adapter per venue translating between symbols and that
//! venue's order book stream: where to connect, what to send to
//! subscribe/unsubscribe, how to keep the socket alive, and how to read a
//! depth message. Everything else about the wire protocol is ignored.

mod binance;
mod mexc;

pub use binance::{BinanceStream, BINANCE_FUTURES_WS_URL};
pub use mexc::{MexcStream, MEXC_CONTRACT_WS_URL};

use crate::config::SniperConfig;
use crate::instrument::Venue;
use crate::orderbook::{OrderBookSnapshot, PriceLevel};
use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// A parsed depth message for one symbol
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookUpdate {
    /// Lowercase symbol without separators ("btcusdt")
    pub symbol: String,
    pub snapshot: OrderBookSnapshot,
}

/// Application-level keepalive required by a venue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keepalive {
    pub interval: Duration,
    pub message: String,
}

/// Per-venue order book stream protocol
pub trait StreamVenue: Send + Sync {
    fn venue(&self) -> Venue;

    fn ws_url(&self) -> &str;

    /// Subscribe request for a lowercase symbol
    fn subscribe_message(&self, symbol: &str) -> String;

    /// Unsubscribe request for a lowercase symbol
    fn unsubscribe_message(&self, symbol: &str) -> String;

    /// Parse a depth message; anything else yields `None`
    fn parse_message(&self, text: &str) -> Option<BookUpdate>;

    /// Keepalive the venue expects while connected, if any
    fn keepalive(&self) -> Option<Keepalive> {
        None
    }
}

/// Build the adapters for every configured streaming venue
pub fn build_stream_venues(config: &SniperConfig) -> anyhow::Result<Vec<Arc<dyn StreamVenue>>> {
    config
        .venues
        .iter()
        .map(|venue| -> anyhow::Result<Arc<dyn StreamVenue>> {
            match venue {
                Venue::Binance => Ok(Arc::new(match &config.binance_ws_url {
                    Some(url) => BinanceStream::with_url(url),
                    None => BinanceStream::new(),
                })),
                Venue::Mexc => {
                    let stream = match &config.mexc_ws_url {
                        Some(url) => MexcStream::with_url(url),
                        None => MexcStream::new(),
                    };
                    let ping_interval = Duration::from_secs(config.mexc_ping_interval_secs.max(1));
                    Ok(Arc::new(stream.with_ping_interval(ping_interval)))
                }
                other => anyhow::bail!("No order book stream available for venue {}", other),
            }
        })
        .collect()
}

/// Parse a list of levels given as `[price, qty, ...]` arrays or as objects
/// with `p`/`v` (or `price`/`quantity`) fields; prices and sizes may be
/// strings or numbers. Unreadable levels are skipped.
pub(crate) fn parse_levels(value: Option<&Value>) -> Vec<PriceLevel> {
    let Some(Value::Array(levels)) = value else {
        return Vec::new();
    };

    levels
        .iter()
        .filter_map(|level| {
            let (price, size) = match level {
                Value::Array(fields) => (fields.first()?, fields.get(1)?),
                Value::Object(fields) => (
                    fields.get("p").or_else(|| fields.get("price"))?,
                    fields
                        .get("v")
                        .or_else(|| fields.get("q"))
                        .or_else(|| fields.get("quantity"))?,
                ),
                _ => return None,
            };
            Some(PriceLevel {
                price: decimal_from_json(price)?,
                size: decimal_from_json(size)?,
            })
        })
        .collect()
}

/// Read a decimal from a JSON string or number
pub(crate) fn decimal_from_json(value: &Value) -> Option<Decimal> {
    match value {
        Value::String(s) => Decimal::from_str(s).ok(),
        Value::Number(n) => {
            let repr = n.to_string();
            Decimal::from_str(&repr)
                .ok()
                .or_else(|| Decimal::from_scientific(&repr).ok())
        }
        _ => None,
    }
}
