//! History sample types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A price observation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricePoint {
    pub price: Decimal,
    pub timestamp: DateTime<Utc>,
}

/// A volume observation (24h quote volume as reported by the venue)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumePoint {
    pub volume: Decimal,
    pub timestamp: DateTime<Utc>,
}

/// Percentage change between two consecutive price observations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MomentumSample {
    /// Change in percent (1.5 = +1.5%)
    pub change_pct: Decimal,
    /// Timestamp of the later of the two observations
    pub timestamp: DateTime<Utc>,
}

/// Point-in-time copy of one instrument's windows, oldest first
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistorySnapshot {
    pub prices: Vec<PricePoint>,
    pub volumes: Vec<VolumePoint>,
    pub momentum: Vec<MomentumSample>,
}

impl HistorySnapshot {
    /// Last known price sample at or before `target`.
    ///
    /// Scans oldest to newest and stops at the first sample newer than the
    /// target. With sparse polling the returned sample can be noticeably
    /// older than `target`; callers get an approximation of "price N
    /// minutes ago", not an exact window boundary.
    pub fn price_at(&self, target: DateTime<Utc>) -> Option<Decimal> {
        last_price_at(&self.prices, target)
    }

    /// Volume samples recorded before the most recent one
    pub fn prior_volumes(&self) -> &[VolumePoint] {
        match self.volumes.len() {
            0 => &[],
            n => &self.volumes[..n - 1],
        }
    }
}

/// Oldest-to-newest scan shared by the store and its snapshots
pub(super) fn last_price_at<'a>(
    points: impl IntoIterator<Item = &'a PricePoint>,
    target: DateTime<Utc>,
) -> Option<Decimal> {
    let mut found = None;
    for point in points {
        if point.timestamp <= target {
            found = Some(point.price);
        } else if found.is_some() {
            break;
        }
    }
    found
}
