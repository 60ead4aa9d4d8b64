//! Binance USDT-M futures 24h tickers

use super::{get_body, MarketDataSource, MoveDirection, Ticker};
use crate::error::SourceError;
use crate::instrument::Venue;
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;

/// Binance futures REST base URL
pub const BINANCE_FUTURES_API_URL: &str = "https://fapi.binance.com";

/// One element of `GET /fapi/v1/ticker/24hr`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BinanceTicker24h {
    symbol: String,
    last_price: String,
    price_change_percent: String,
    quote_volume: String,
    #[serde(default)]
    close_time: Option<i64>,
}

/// Binance futures top movers
pub struct BinanceFuturesSource {
    base_url: String,
    client: Client,
}

impl BinanceFuturesSource {
    /// Create a new source; `base_url` overrides the public API
    pub fn new(client: Client, base_url: Option<&str>) -> Self {
        Self {
            base_url: base_url
                .unwrap_or(BINANCE_FUTURES_API_URL)
                .trim_end_matches('/')
                .to_string(),
            client,
        }
    }

    /// Normalise the raw ticker list; unusable entries are skipped
    fn parse_tickers(body: &str) -> Result<Vec<Ticker>, SourceError> {
        let raw: Vec<serde_json::Value> = serde_json::from_str(body)
            .map_err(|e| SourceError::Malformed(e.to_string()))?;

        Ok(raw
            .into_iter()
            .filter_map(|value| {
                let ticker: BinanceTicker24h = match serde_json::from_value(value) {
                    Ok(t) => t,
                    Err(e) => {
                        tracing::trace!(error = %e, "Skipping unreadable Binance ticker");
                        return None;
                    }
                };
                Self::normalise(ticker)
            })
            .collect())
    }

    fn normalise(ticker: BinanceTicker24h) -> Option<Ticker> {
        if !ticker.symbol.ends_with("USDT") {
            return None;
        }

        let price = Decimal::from_str(&ticker.last_price).ok()?;
        let change_24h = Decimal::from_str(&ticker.price_change_percent).ok()?;
        let volume_24h = Decimal::from_str(&ticker.quote_volume).ok()?;
        let timestamp = ticker
            .close_time
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
            .unwrap_or_else(Utc::now);

        Some(Ticker {
            trade_url: Venue::Binance.trade_url(&ticker.symbol),
            symbol: ticker.symbol,
            venue: Venue::Binance,
            price,
            change_24h: change_24h.round_dp(2),
            volume_24h,
            timestamp,
        })
    }
}

#[async_trait]
impl MarketDataSource for BinanceFuturesSource {
    fn venue(&self) -> Venue {
        Venue::Binance
    }

    async fn fetch_top_movers(
        &self,
        direction: MoveDirection,
        limit: usize,
    ) -> Result<Vec<Ticker>, SourceError> {
        let url = format!("{}/fapi/v1/ticker/24hr", self.base_url);
        tracing::debug!(url = %url, %direction, "Fetching Binance tickers");

        let body = get_body(&self.client, &url).await?;
        let tickers = Self::parse_tickers(&body)?;
        Ok(direction.rank(tickers, limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const BODY: &str = r#"[
        {"symbol":"BTCUSDT","priceChange":"100","priceChangePercent":"1.234","weightedAvgPrice":"1","lastPrice":"42000.10","lastQty":"1","openPrice":"1","highPrice":"1","lowPrice":"1","volume":"1","quoteVolume":"900000000.5","openTime":1,"closeTime":1700000000000,"firstId":1,"lastId":2,"count":3},
        {"symbol":"PEPEUSDT","priceChangePercent":"41.5","lastPrice":"0.0000123","quoteVolume":"5000000","closeTime":1700000000000},
        {"symbol":"ETHBUSD","priceChangePercent":"2","lastPrice":"2000","quoteVolume":"1"},
        {"symbol":"BADUSDT","priceChangePercent":"n/a","lastPrice":"1","quoteVolume":"1"},
        {"symbol":"DOGEUSDT","priceChangePercent":"-8.1","lastPrice":"0.07","quoteVolume":"3000000"},
        {"unexpected":true}
    ]"#;

    #[test]
    fn test_parse_skips_bad_entries() {
        let tickers = BinanceFuturesSource::parse_tickers(BODY).unwrap();
        let symbols: Vec<_> = tickers.iter().map(|t| t.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["BTCUSDT", "PEPEUSDT", "DOGEUSDT"]);

        let btc = &tickers[0];
        assert_eq!(btc.price, dec!(42000.10));
        assert_eq!(btc.change_24h, dec!(1.23));
        assert_eq!(btc.volume_24h, dec!(900000000.5));
        assert_eq!(btc.timestamp.timestamp_millis(), 1700000000000);
        assert_eq!(btc.trade_url, "https://www.binance.com/en/futures/BTCUSDT");
    }

    #[test]
    fn test_parse_rejects_non_array() {
        let result = BinanceFuturesSource::parse_tickers(r#"{"code":-1003,"msg":"banned"}"#);
        assert!(matches!(result, Err(SourceError::Malformed(_))));
    }

    #[test]
    fn test_ranked_movers() {
        let tickers = BinanceFuturesSource::parse_tickers(BODY).unwrap();
        let gainers = MoveDirection::Gainers.rank(tickers.clone(), 1);
        assert_eq!(gainers[0].symbol, "PEPEUSDT");

        let losers = MoveDirection::Losers.rank(tickers, 5);
        assert_eq!(losers.len(), 1);
        assert_eq!(losers[0].symbol, "DOGEUSDT");
    }

    #[test]
    fn test_base_url_override() {
        let source = BinanceFuturesSource::new(Client::new(), Some("http://127.0.0.1:9000/"));
        assert_eq!(source.base_url, "http://127.0.0.1:9000");
        assert_eq!(source.venue(), Venue::Binance);
    }
}
