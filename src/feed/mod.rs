//! Market data module
//!
//! Top gainers/losers per venue from REST ticker endpoints

mod binance;
mod bitget;
mod bybit;
mod gateio;
mod mexc;
mod types;

pub use binance::{BinanceFuturesSource, BINANCE_FUTURES_API_URL};
pub use bitget::{BitgetFuturesSource, BITGET_API_URL};
pub use bybit::{BybitLinearSource, BYBIT_API_URL};
pub use gateio::{GateioFuturesSource, GATEIO_API_URL};
pub use mexc::{MexcFuturesSource, MEXC_CONTRACT_API_URL};
pub use types::{MoveDirection, Ticker};

use crate::config::SourcesConfig;
use crate::error::SourceError;
use crate::instrument::Venue;
use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

/// Trait for market data source implementations
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    fn venue(&self) -> Venue;

    /// Strongest movers in one direction, at most `limit`
    async fn fetch_top_movers(
        &self,
        direction: MoveDirection,
        limit: usize,
    ) -> Result<Vec<Ticker>, SourceError>;
}

/// Retry settings for one fetch
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, at least one
    pub attempts: u32,
    /// Delay before the second attempt; doubles afterwards
    pub initial_delay: Duration,
    /// Bound on each attempt and on a venue's whole fetch
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 2,
            initial_delay: Duration::from_secs(2),
            timeout: Duration::from_secs(30),
        }
    }
}

impl From<&SourcesConfig> for RetryPolicy {
    fn from(config: &SourcesConfig) -> Self {
        Self {
            attempts: config.fetch_retries.max(1),
            initial_delay: Duration::from_secs(config.retry_delay_secs),
            timeout: Duration::from_secs(config.fetch_timeout_secs),
        }
    }
}

/// Fetch with a per-attempt timeout, retrying with a doubling delay
pub async fn fetch_with_retry(
    source: &dyn MarketDataSource,
    direction: MoveDirection,
    limit: usize,
    policy: &RetryPolicy,
) -> Result<Vec<Ticker>, SourceError> {
    let mut delay = policy.initial_delay;
    let mut attempt = 1;

    loop {
        let fetch = source.fetch_top_movers(direction, limit);
        let result = match tokio::time::timeout(policy.timeout, fetch).await {
            Ok(result) => result,
            Err(_) => Err(SourceError::Timeout(policy.timeout)),
        };

        match result {
            Ok(tickers) => return Ok(tickers),
            Err(e) if attempt >= policy.attempts => return Err(e),
            Err(e) => {
                tracing::warn!(
                    venue = %source.venue(),
                    %direction,
                    attempt,
                    error = %e,
                    retry_in = ?delay,
                    "Fetch failed, retrying"
                );
                tokio::time::sleep(delay).await;
                delay *= 2;
                attempt += 1;
            }
        }
    }
}

/// Gainers and losers for one venue, one entry per instrument.
///
/// The whole fetch, retries included, finishes within `policy.timeout`.
pub async fn fetch_movers(
    source: &dyn MarketDataSource,
    limit: usize,
    policy: &RetryPolicy,
) -> Result<Vec<Ticker>, SourceError> {
    let both = async {
        tokio::join!(
            fetch_with_retry(source, MoveDirection::Gainers, limit, policy),
            fetch_with_retry(source, MoveDirection::Losers, limit, policy),
        )
    };
    let (gainers, losers) = tokio::time::timeout(policy.timeout, both)
        .await
        .map_err(|_| SourceError::Timeout(policy.timeout))?;

    let mut tickers = match (gainers, losers) {
        (Ok(mut g), Ok(l)) => {
            g.extend(l);
            g
        }
        (Ok(only), Err(e)) | (Err(e), Ok(only)) => {
            tracing::warn!(
                venue = %source.venue(),
                error = %e,
                "One direction failed, using the other"
            );
            only
        }
        (Err(e), Err(_)) => return Err(e),
    };

    tickers.sort_by(types::by_key);
    tickers.dedup_by(|a, b| types::by_key(a, b).is_eq());
    Ok(tickers)
}

/// GET `url` and return the body of a successful response
pub(crate) async fn get_body(client: &Client, url: &str) -> Result<String, SourceError> {
    let response = client.get(url).send().await?;
    if !response.status().is_success() {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        return Err(SourceError::Status { status, body });
    }
    Ok(response.text().await?)
}

/// Build the configured market data sources
pub fn build_sources(config: &SourcesConfig) -> anyhow::Result<Vec<Arc<dyn MarketDataSource>>> {
    let client = Client::builder()
        .timeout(Duration::from_secs(config.fetch_timeout_secs.max(1)))
        .build()?;

    let sources = config
        .venues
        .iter()
        .map(|venue| -> Arc<dyn MarketDataSource> {
            let client = client.clone();
            let base_url = config.base_url(*venue);
            match venue {
                Venue::Binance => Arc::new(BinanceFuturesSource::new(client, base_url)),
                Venue::Bybit => Arc::new(BybitLinearSource::new(client, base_url)),
                Venue::Mexc => Arc::new(MexcFuturesSource::new(client, base_url)),
                Venue::Bitget => Arc::new(BitgetFuturesSource::new(client, base_url)),
                Venue::Gateio => Arc::new(GateioFuturesSource::new(client, base_url)),
            }
        })
        .collect();

    Ok(sources)
}
