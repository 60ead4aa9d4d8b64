//! Order book module
//!
//! Latest depth snapshots for streamed instruments and the imbalance
//! derived from them

mod book;
mod cache;

pub use book::{OrderBookSnapshot, NEUTRAL_IMBALANCE};
pub use cache::OrderBookCache;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One side's quantity at a price
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceLevel {
    pub price: Decimal,
    /// Base-asset quantity resting at `price`
    pub size: Decimal,
}
