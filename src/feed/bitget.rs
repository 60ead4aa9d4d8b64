//! Bitget USDT-M futures 24h tickers

use super::{get_body, MarketDataSource, MoveDirection, Ticker};
use crate::error::SourceError;
use crate::instrument::Venue;
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use std::str::FromStr;

/// Bitget REST base URL
pub const BITGET_API_URL: &str = "https://api.bitget.com";

/// Success code of the v2 API
const BITGET_OK: &str = "00000";

#[derive(Debug, Deserialize)]
struct BitgetResponse {
    code: String,
    #[serde(default)]
    msg: String,
    #[serde(default)]
    data: Vec<Value>,
}

/// One element of `data`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BitgetTicker {
    symbol: String,
    last_pr: String,
    /// Fraction, not percent
    change24h: String,
    #[serde(default)]
    quote_volume: Option<String>,
    #[serde(default)]
    ts: Option<String>,
}

/// Bitget USDT-M perpetual top movers
pub struct BitgetFuturesSource {
    base_url: String,
    client: Client,
}

impl BitgetFuturesSource {
    /// Create a new source; `base_url` overrides the public API
    pub fn new(client: Client, base_url: Option<&str>) -> Self {
        Self {
            base_url: base_url
                .unwrap_or(BITGET_API_URL)
                .trim_end_matches('/')
                .to_string(),
            client,
        }
    }

    fn parse_tickers(body: &str) -> Result<Vec<Ticker>, SourceError> {
        let response: BitgetResponse = serde_json::from_str(body)
            .map_err(|e| SourceError::Malformed(e.to_string()))?;
        if response.code != BITGET_OK {
            let reason = format!("Bitget error {}: {}", response.code, response.msg);
            return Err(SourceError::Malformed(reason));
        }

        Ok(response
            .data
            .into_iter()
            .filter_map(|value| {
                let ticker: BitgetTicker = serde_json::from_value(value).ok()?;
                Self::normalise(ticker)
            })
            .collect())
    }

    fn normalise(ticker: BitgetTicker) -> Option<Ticker> {
        if !ticker.symbol.ends_with("USDT") {
            return None;
        }

        let price = Decimal::from_str(&ticker.last_pr).ok()?;
        let rate = Decimal::from_str(&ticker.change24h).ok()?;
        let volume_24h = ticker
            .quote_volume
            .and_then(|v| Decimal::from_str(&v).ok())
            .unwrap_or(Decimal::ZERO);
        let timestamp = ticker
            .ts
            .and_then(|ts| ts.parse::<i64>().ok())
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
            .unwrap_or_else(Utc::now);

        Some(Ticker {
            trade_url: Venue::Bitget.trade_url(&ticker.symbol),
            symbol: ticker.symbol,
            venue: Venue::Bitget,
            price,
            change_24h: (rate * Decimal::ONE_HUNDRED).round_dp(2),
            volume_24h,
            timestamp,
        })
    }
}

#[async_trait]
impl MarketDataSource for BitgetFuturesSource {
    fn venue(&self) -> Venue {
        Venue::Bitget
    }

    async fn fetch_top_movers(
        &self,
        direction: MoveDirection,
        limit: usize,
    ) -> Result<Vec<Ticker>, SourceError> {
        let url = format!(
            "{}/api/v2/mix/market/tickers?productType=USDT-FUTURES",
            self.base_url
        );
        tracing::debug!(url = %url, %direction, "Fetching Bitget tickers");

        let body = get_body(&self.client, &url).await?;
        let tickers = Self::parse_tickers(&body)?;
        Ok(direction.rank(tickers, limit))
    }
}
