//! Order book snapshot

use super::PriceLevel;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;

/// Neutral imbalance reported when there is no usable depth
pub const NEUTRAL_IMBALANCE: Decimal = Decimal::from_parts(50, 0, 0, false, 0);

/// Latest known depth for one streamed instrument; replaced on every update
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBookSnapshot {
    /// Bid levels, sorted best (highest) to worst
    pub bids: Vec<PriceLevel>,
    /// Ask levels, sorted best (lowest) to worst
    pub asks: Vec<PriceLevel>,
    pub timestamp: DateTime<Utc>,
}

impl OrderBookSnapshot {
    /// Build a snapshot, sorting both sides best-first and dropping empty levels
    pub fn new(
        mut bids: Vec<PriceLevel>,
        mut asks: Vec<PriceLevel>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        bids.retain(|l| l.size > Decimal::ZERO);
        asks.retain(|l| l.size > Decimal::ZERO);
        bids.sort_by_key(|l| Reverse(l.price));
        asks.sort_by_key(|l| l.price);
        Self {
            bids,
            asks,
            timestamp,
        }
    }

    /// Get best bid price
    pub fn best_bid(&self) -> Option<Decimal> {
        self.bids.first().map(|l| l.price)
    }

    /// Get best ask price
    pub fn best_ask(&self) -> Option<Decimal> {
        self.asks.first().map(|l| l.price)
    }

    /// Get mid price
    pub fn mid_price(&self) -> Option<Decimal> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some((bid + ask) / Decimal::TWO),
            _ => None,
        }
    }

    /// Bid share of resting size over the top `depth` levels per side, 0-100.
    ///
    /// Returns 50 when both sides are empty.
    pub fn imbalance(&self, depth: usize) -> Decimal {
        let bid_volume: Decimal = self.bids.iter().take(depth).map(|l| l.size).sum();
        let ask_volume: Decimal = self.asks.iter().take(depth).map(|l| l.size).sum();
        let total = bid_volume + ask_volume;

        if total.is_zero() {
            return NEUTRAL_IMBALANCE;
        }
        bid_volume / total * Decimal::ONE_HUNDRED
    }
}
