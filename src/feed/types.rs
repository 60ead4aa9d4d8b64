//! Market data types

use crate::instrument::{InstrumentKey, Venue};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Uniform 24h ticker for one USDT perpetual
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticker {
    /// Trading symbol (e.g., "BTCUSDT")
    pub symbol: String,
    pub venue: Venue,
    /// Last traded price
    pub price: Decimal,
    /// 24h change in percent
    pub change_24h: Decimal,
    /// 24h quote volume
    pub volume_24h: Decimal,
    pub timestamp: DateTime<Utc>,
    pub trade_url: String,
}

impl Ticker {
    pub fn key(&self) -> InstrumentKey {
        InstrumentKey::new(&self.symbol, self.venue)
    }
}

/// Which end of the 24h change ranking to fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoveDirection {
    Gainers,
    Losers,
}

impl MoveDirection {
    pub const BOTH: [MoveDirection; 2] = [MoveDirection::Gainers, MoveDirection::Losers];

    pub fn as_str(&self) -> &'static str {
        match self {
            MoveDirection::Gainers => "gainers",
            MoveDirection::Losers => "losers",
        }
    }

    /// Keep the tickers moving in this direction, strongest first, at most `limit`
    pub fn rank(&self, mut tickers: Vec<Ticker>, limit: usize) -> Vec<Ticker> {
        tickers.retain(|t| match self {
            MoveDirection::Gainers => t.change_24h > Decimal::ZERO,
            MoveDirection::Losers => t.change_24h < Decimal::ZERO,
        });
        tickers.sort_by(|a, b| {
            let by_change = match self {
                MoveDirection::Gainers => b.change_24h.cmp(&a.change_24h),
                MoveDirection::Losers => a.change_24h.cmp(&b.change_24h),
            };
            by_change.then_with(|| a.symbol.cmp(&b.symbol))
        });
        tickers.truncate(limit);
        tickers
    }
}

impl std::fmt::Display for MoveDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order tickers by instrument, used to deduplicate gainers and losers
pub(crate) fn by_key(a: &Ticker, b: &Ticker) -> Ordering {
    a.venue.cmp(&b.venue).then_with(|| a.symbol.cmp(&b.symbol))
}
