//! MEXC contract 24h tickers

use super::{get_body, MarketDataSource, MoveDirection, Ticker};
use crate::error::SourceError;
use crate::instrument::Venue;
use crate::venue::decimal_from_json;
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;

/// MEXC contract REST base URL
pub const MEXC_CONTRACT_API_URL: &str = "https://contract.mexc.com";

#[derive(Debug, Deserialize)]
struct MexcResponse {
    success: bool,
    #[serde(default)]
    code: i64,
    #[serde(default)]
    data: Vec<Value>,
}

/// MEXC perpetual contract top movers
pub struct MexcFuturesSource {
    base_url: String,
    client: Client,
}

impl MexcFuturesSource {
    /// Create a new source; `base_url` overrides the public API
    pub fn new(client: Client, base_url: Option<&str>) -> Self {
        Self {
            base_url: base_url
                .unwrap_or(MEXC_CONTRACT_API_URL)
                .trim_end_matches('/')
                .to_string(),
            client,
        }
    }

    fn parse_tickers(body: &str) -> Result<Vec<Ticker>, SourceError> {
        let response: MexcResponse = serde_json::from_str(body)
            .map_err(|e| SourceError::Malformed(e.to_string()))?;
        if !response.success {
            let reason = format!("MEXC error code {}", response.code);
            return Err(SourceError::Malformed(reason));
        }

        Ok(response.data.iter().filter_map(Self::normalise).collect())
    }

    /// `{"symbol":"BTC_USDT","lastPrice":..,"riseFallRate":0.0123,"amount24":..,"timestamp":..}`
    fn normalise(value: &Value) -> Option<Ticker> {
        let contract = value.get("symbol")?.as_str()?;
        let base = contract.strip_suffix("_USDT")?;
        let symbol = format!("{}USDT", base);

        let price = decimal_from_json(value.get("lastPrice")?)?;
        // Fraction, not percent
        let rate = decimal_from_json(value.get("riseFallRate")?)?;
        let volume_24h = value
            .get("amount24")
            .and_then(decimal_from_json)
            .unwrap_or(Decimal::ZERO);
        let timestamp = value
            .get("timestamp")
            .and_then(Value::as_i64)
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
            .unwrap_or_else(Utc::now);

        Some(Ticker {
            trade_url: Venue::Mexc.trade_url(&symbol),
            symbol,
            venue: Venue::Mexc,
            price,
            change_24h: (rate * Decimal::ONE_HUNDRED).round_dp(2),
            volume_24h,
            timestamp,
        })
    }
}

#[async_trait]
impl MarketDataSource for MexcFuturesSource {
    fn venue(&self) -> Venue {
        Venue::Mexc
    }

    async fn fetch_top_movers(
        &self,
        direction: MoveDirection,
        limit: usize,
    ) -> Result<Vec<Ticker>, SourceError> {
        let url = format!("{}/api/v1/contract/ticker", self.base_url);
        tracing::debug!(url = %url, %direction, "Fetching MEXC tickers");

        let body = get_body(&self.client, &url).await?;
        let tickers = Self::parse_tickers(&body)?;
        Ok(direction.rank(tickers, limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const BODY: &str = r#"{"success":true,"code":0,"data":[
        {"contractId":1,"symbol":"BTC_USDT","lastPrice":42000.5,"riseFallRate":0.0123,"amount24":850000000,"volume24":2000,"timestamp":1700000000000},
        {"symbol":"WIF_USDT","lastPrice":2.51,"riseFallRate":0.4152,"amount24":1200000,"timestamp":1700000000000},
        {"symbol":"BTC_USD","lastPrice":42000,"riseFallRate":0.01},
        {"symbol":"ODD_USDT","lastPrice":"x","riseFallRate":0.2},
        {"symbol":"SHIB_USDT","lastPrice":0.000009,"riseFallRate":-0.071}
    ]}"#;

    #[test]
    fn test_parse_and_normalise() {
        let tickers = MexcFuturesSource::parse_tickers(BODY).unwrap();
        let symbols: Vec<_> = tickers.iter().map(|t| t.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["BTCUSDT", "WIFUSDT", "SHIBUSDT"]);

        let wif = &tickers[1];
        assert_eq!(wif.change_24h, dec!(41.52));
        assert_eq!(wif.price, dec!(2.51));
        assert_eq!(wif.volume_24h, dec!(1200000));
        assert_eq!(wif.trade_url, "https://futures.mexc.com/exchange/WIF_USDT");

        assert_eq!(tickers[2].volume_24h, Decimal::ZERO);
        assert_eq!(tickers[2].change_24h, dec!(-7.1));
    }

    #[test]
    fn test_parse_error_response() {
        let result = MexcFuturesSource::parse_tickers(r#"{"success":false,"code":510}"#);
        assert!(matches!(result, Err(SourceError::Malformed(msg)) if msg.contains("510")));

        assert!(MexcFuturesSource::parse_tickers("<html>").is_err());
    }
}
