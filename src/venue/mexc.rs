//! MEXC contract depth stream

use super::{parse_levels, BookUpdate, Keepalive, StreamVenue};
use crate::instrument::Venue;
use crate::orderbook::OrderBookSnapshot;
use chrono::{TimeZone, Utc};
use serde_json::{json, Value};
use std::time::Duration;

/// MEXC contract WebSocket endpoint
pub const MEXC_CONTRACT_WS_URL: &str = "wss://contract.mexc.com/edge";

/// MEXC drops connections without a ping every 30s
const PING_INTERVAL_MEXC: Duration = Duration::from_secs(20);

/// MEXC contract adapter
pub struct MexcStream {
    url: String,
    ping_interval: Duration,
}

impl MexcStream {
    pub fn new() -> Self {
        Self::with_url(MEXC_CONTRACT_WS_URL)
    }

    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ping_interval: PING_INTERVAL_MEXC,
        }
    }

    /// Override how often the keepalive ping goes out
    pub fn with_ping_interval(mut self, interval: Duration) -> Self {
        self.ping_interval = interval;
        self
    }

    /// "btcusdt" -> "BTC_USDT"
    pub fn contract_symbol(symbol: &str) -> String {
        let upper = symbol.to_uppercase().replace('_', "");
        match upper.strip_suffix("USDT") {
            Some(base) if !base.is_empty() => format!("{}_USDT", base),
            _ => upper,
        }
    }

    fn request(method: &str, symbol: &str) -> String {
        json!({
            "method": method,
            "param": { "symbol": Self::contract_symbol(symbol) },
        })
        .to_string()
    }
}

impl Default for MexcStream {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamVenue for MexcStream {
    fn venue(&self) -> Venue {
        Venue::Mexc
    }

    fn ws_url(&self) -> &str {
        &self.url
    }

    fn subscribe_message(&self, symbol: &str) -> String {
        Self::request("sub.depth", symbol)
    }

    fn unsubscribe_message(&self, symbol: &str) -> String {
        Self::request("unsub.depth", symbol)
    }

    /// `{"channel":"push.depth","symbol":"BTC_USDT","data":{"bids":[[p,q,n]],"asks":[..]}}`
    fn parse_message(&self, text: &str) -> Option<BookUpdate> {
        let message: Value = serde_json::from_str(text).ok()?;
        if message.get("channel")?.as_str()? != "push.depth" {
            return None;
        }

        let symbol = message
            .get("symbol")?
            .as_str()?
            .replace('_', "")
            .to_lowercase();
        let data = message.get("data")?;

        let timestamp = message
            .get("ts")
            .and_then(Value::as_i64)
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
            .unwrap_or_else(Utc::now);

        Some(BookUpdate {
            symbol,
            snapshot: OrderBookSnapshot::new(
                parse_levels(data.get("bids")),
                parse_levels(data.get("asks")),
                timestamp,
            ),
        })
    }

    fn keepalive(&self) -> Option<Keepalive> {
        Some(Keepalive {
            interval: self.ping_interval,
            message: json!({ "method": "ping" }).to_string(),
        })
    }
}
