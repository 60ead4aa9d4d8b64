//! Bybit USDT perpetual (linear) 24h tickers

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

/// Bybit REST base URL; regional hosts can be set through config
pub const BYBIT_API_URL: &str = "https://api.bybit.com";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BybitResponse {
    ret_code: i64,
    #[serde(default)]
    ret_msg: String,
    #[serde(default)]
    result: Option<BybitResult>,
    #[serde(default)]
    time: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct BybitResult {
    #[serde(default)]
    list: Vec<Value>,
}

/// One element of `result.list`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BybitTicker {
    symbol: String,
    last_price: String,
    /// Fraction, not percent
    price24h_pcnt: String,
    #[serde(default)]
    turnover24h: Option<String>,
}

/// Bybit linear perpetual top movers
pub struct BybitLinearSource {
    base_url: String,
    client: Client,
}

impl BybitLinearSource {
    /// Create a new source; `base_url` overrides the public API
    pub fn new(client: Client, base_url: Option<&str>) -> Self {
        Self {
            base_url: base_url
                .unwrap_or(BYBIT_API_URL)
                .trim_end_matches('/')
                .to_string(),
            client,
        }
    }

    fn parse_tickers(body: &str) -> Result<Vec<Ticker>, SourceError> {
        let response: BybitResponse = serde_json::from_str(body)
            .map_err(|e| SourceError::Malformed(e.to_string()))?;
        if response.ret_code != 0 {
            let reason = format!("Bybit error {}: {}", response.ret_code, response.ret_msg);
            return Err(SourceError::Malformed(reason));
        }

        let timestamp = response
            .time
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
            .unwrap_or_else(Utc::now);
        let list = response.result.map(|r| r.list).unwrap_or_default();

        Ok(list
            .into_iter()
            .filter_map(|value| {
                let ticker: BybitTicker = match serde_json::from_value(value) {
                    Ok(t) => t,
                    Err(e) => {
                        tracing::trace!(error = %e, "Skipping unreadable Bybit ticker");
                        return None;
                    }
                };
                Self::normalise(ticker, timestamp)
            })
            .collect())
    }

    fn normalise(ticker: BybitTicker, timestamp: chrono::DateTime<Utc>) -> Option<Ticker> {
        if !ticker.symbol.ends_with("USDT") {
            return None;
        }

        let price = Decimal::from_str(&ticker.last_price).ok()?;
        let rate = Decimal::from_str(&ticker.price24h_pcnt).ok()?;
        let volume_24h = ticker
            .turnover24h
            .and_then(|v| Decimal::from_str(&v).ok())
            .unwrap_or(Decimal::ZERO);

        Some(Ticker {
            trade_url: Venue::Bybit.trade_url(&ticker.symbol),
            symbol: ticker.symbol,
            venue: Venue::Bybit,
            price,
            change_24h: (rate * Decimal::ONE_HUNDRED).round_dp(2),
            volume_24h,
            timestamp,
        })
    }
}

#[async_trait]
impl MarketDataSource for BybitLinearSource {
    fn venue(&self) -> Venue {
        Venue::Bybit
    }

    async fn fetch_top_movers(
        &self,
        direction: MoveDirection,
        limit: usize,
    ) -> Result<Vec<Ticker>, SourceError> {
        let url = format!("{}/v5/market/tickers?category=linear", self.base_url);
        tracing::debug!(url = %url, %direction, "Fetching Bybit tickers");

        let body = get_body(&self.client, &url).await?;
        let tickers = Self::parse_tickers(&body)?;
        Ok(direction.rank(tickers, limit))
    }
}
