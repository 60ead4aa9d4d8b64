//! Gate.io USDT-settled futures 24h tickers

use super::{get_body, MarketDataSource, MoveDirection, Ticker};
use crate::error::SourceError;
use crate::instrument::Venue;
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use std::str::FromStr;

/// Gate.io REST base URL
pub const GATEIO_API_URL: &str = "https://api.gateio.ws";

/// One element of `GET /api/v4/futures/usdt/tickers`
#[derive(Debug, Deserialize)]
struct GateioTicker {
    /// "BTC_USDT"
    contract: String,
    last: String,
    /// Already a percent
    change_percentage: String,
    #[serde(default)]
    volume_24h_quote: Option<String>,
}

/// Gate.io USDT perpetual top movers
pub struct GateioFuturesSource {
    base_url: String,
    client: Client,
}

impl GateioFuturesSource {
    /// Create a new source; `base_url` overrides the public API
    pub fn new(client: Client, base_url: Option<&str>) -> Self {
        Self {
            base_url: base_url
                .unwrap_or(GATEIO_API_URL)
                .trim_end_matches('/')
                .to_string(),
            client,
        }
    }

    fn parse_tickers(body: &str) -> Result<Vec<Ticker>, SourceError> {
        let raw: Vec<Value> = serde_json::from_str(body)
            .map_err(|e| SourceError::Malformed(e.to_string()))?;

        // The endpoint carries no timestamp
        let now = Utc::now();
        Ok(raw
            .into_iter()
            .filter_map(|value| serde_json::from_value::<GateioTicker>(value).ok())
            .filter_map(|ticker| Self::normalise(ticker, now))
            .collect())
    }

    fn normalise(ticker: GateioTicker, now: chrono::DateTime<Utc>) -> Option<Ticker> {
        let base = ticker.contract.strip_suffix("_USDT")?;
        let symbol = format!("{}USDT", base);

        let price = Decimal::from_str(&ticker.last).ok()?;
        let change_24h = Decimal::from_str(&ticker.change_percentage).ok()?;
        let volume_24h = ticker
            .volume_24h_quote
            .and_then(|v| Decimal::from_str(&v).ok())
            .unwrap_or(Decimal::ZERO);

        Some(Ticker {
            trade_url: Venue::Gateio.trade_url(&symbol),
            symbol,
            venue: Venue::Gateio,
            price,
            change_24h: change_24h.round_dp(2),
            volume_24h,
            timestamp: now,
        })
    }
}

#[async_trait]
impl MarketDataSource for GateioFuturesSource {
    fn venue(&self) -> Venue {
        Venue::Gateio
    }

    async fn fetch_top_movers(
        &self,
        direction: MoveDirection,
        limit: usize,
    ) -> Result<Vec<Ticker>, SourceError> {
        let url = format!("{}/api/v4/futures/usdt/tickers", self.base_url);
        tracing::debug!(url = %url, %direction, "Fetching Gate.io tickers");

        let body = get_body(&self.client, &url).await?;
        let tickers = Self::parse_tickers(&body)?;
        Ok(direction.rank(tickers, limit))
    }
}
