//! Binance USDT-M futures partial depth stream

use super::{parse_levels, BookUpdate, StreamVenue};
use crate::instrument::Venue;
use crate::orderbook::OrderBookSnapshot;
use chrono::{TimeZone, Utc};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};

/// Binance futures combined stream endpoint
pub const BINANCE_FUTURES_WS_URL: &str = "wss://fstream.binance.com/stream";

/// Partial book depth channel suffix
const DEPTH_CHANNEL: &str = "depth20@100ms";

/// Binance combined-stream adapter
pub struct BinanceStream {
    url: String,
    request_id: AtomicU64,
}

impl BinanceStream {
    pub fn new() -> Self {
        Self::with_url(BINANCE_FUTURES_WS_URL)
    }

    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            request_id: AtomicU64::new(1),
        }
    }

    fn stream_name(symbol: &str) -> String {
        format!("{}@{}", symbol.to_lowercase(), DEPTH_CHANNEL)
    }

    fn request(&self, method: &str, symbol: &str) -> String {
        let id = self.request_id.fetch_add(1, Ordering::Relaxed);
        json!({
            "method": method,
            "params": [Self::stream_name(symbol)],
            "id": id,
        })
        .to_string()
    }
}

impl Default for BinanceStream {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamVenue for BinanceStream {
    fn venue(&self) -> Venue {
        Venue::Binance
    }

    fn ws_url(&self) -> &str {
        &self.url
    }

    fn subscribe_message(&self, symbol: &str) -> String {
        self.request("SUBSCRIBE", symbol)
    }

    fn unsubscribe_message(&self, symbol: &str) -> String {
        self.request("UNSUBSCRIBE", symbol)
    }

    /// `{"stream":"btcusdt@depth20@100ms","data":{"b":[..],"a":[..]}}`;
    /// spot-style `bids`/`asks` names are accepted as well
    fn parse_message(&self, text: &str) -> Option<BookUpdate> {
        let message: Value = serde_json::from_str(text).ok()?;
        let stream = message.get("stream")?.as_str()?;
        let (symbol, channel) = stream.split_once('@')?;
        if !channel.starts_with("depth") {
            return None;
        }

        let data = message.get("data")?;
        let bids = parse_levels(data.get("b").or_else(|| data.get("bids")));
        let asks = parse_levels(data.get("a").or_else(|| data.get("asks")));

        let timestamp = data
            .get("E")
            .and_then(Value::as_i64)
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
            .unwrap_or_else(Utc::now);

        Some(BookUpdate {
            symbol: symbol.to_lowercase(),
            snapshot: OrderBookSnapshot::new(bids, asks, timestamp),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_subscribe_message() {
        let stream = BinanceStream::new();
        let msg: Value = serde_json::from_str(&stream.subscribe_message("BTCUSDT")).unwrap();
        assert_eq!(msg["method"], "SUBSCRIBE");
        assert_eq!(msg["params"][0], "btcusdt@depth20@100ms");

        let msg: Value = serde_json::from_str(&stream.unsubscribe_message("btcusdt")).unwrap();
        assert_eq!(msg["method"], "UNSUBSCRIBE");
        assert_eq!(msg["id"], 2);
    }

    #[test]
    fn test_parse_futures_depth() {
        let stream = BinanceStream::new();
        let text = r#"{"stream":"pepeusdt@depth20@100ms","data":{"e":"depthUpdate","E":1700000000000,"s":"PEPEUSDT","b":[["0.0000101","5000"],["0.0000102","1000"]],"a":[["0.0000103","2000"]]}}"#;

        let update = stream.parse_message(text).unwrap();
        assert_eq!(update.symbol, "pepeusdt");
        assert_eq!(update.snapshot.best_bid(), Some(dec!(0.0000102)));
        assert_eq!(update.snapshot.best_ask(), Some(dec!(0.0000103)));
        assert_eq!(update.snapshot.timestamp.timestamp_millis(), 1700000000000);
        assert_eq!(update.snapshot.imbalance(20), dec!(75));
    }

    #[test]
    fn test_parse_spot_style_names() {
        let stream = BinanceStream::new();
        let text = r#"{"stream":"btcusdt@depth20","data":{"lastUpdateId":1,"bids":[["100","1"]],"asks":[["101","1"]]}}"#;
        let update = stream.parse_message(text).unwrap();
        assert_eq!(update.snapshot.imbalance(20), dec!(50));
    }

    #[test]
    fn test_ignores_other_messages() {
        let stream = BinanceStream::new();
        assert!(stream.parse_message(r#"{"result":null,"id":1}"#).is_none());
        assert!(stream
            .parse_message(r#"{"stream":"btcusdt@aggTrade","data":{"p":"1"}}"#)
            .is_none());
        assert!(stream.parse_message("not json").is_none());
        assert!(stream.keepalive().is_none());
    }
}
