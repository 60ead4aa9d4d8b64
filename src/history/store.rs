//! Sliding-window history store
//!
//! Owns all price/volume/momentum samples keyed by instrument. Windows are
//! created lazily on first observation and dropped once `cleanup` leaves
//! them empty. Memory is bounded only by calling `cleanup` every cycle.

use super::types::{last_price_at, HistorySnapshot, MomentumSample, PricePoint, VolumePoint};
use crate::config::HistoryConfig;
use crate::instrument::InstrumentKey;
use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use std::collections::{HashMap, VecDeque};

/// Window sizing for the history store
#[derive(Debug, Clone)]
pub struct WindowConfig {
    /// Lookback the detectors care about (default: 5 minutes)
    pub lookback: Duration,
    /// Extra retention on top of the lookback (default: 10 minutes)
    pub cleanup_buffer: Duration,
    /// Maximum retained momentum samples per instrument
    pub momentum_capacity: usize,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            lookback: Duration::minutes(5),
            cleanup_buffer: Duration::minutes(10),
            momentum_capacity: 10,
        }
    }
}

impl From<&HistoryConfig> for WindowConfig {
    fn from(config: &HistoryConfig) -> Self {
        Self {
            lookback: Duration::seconds(config.lookback_secs as i64),
            cleanup_buffer: Duration::seconds(config.cleanup_buffer_secs as i64),
            momentum_capacity: config.momentum_capacity.max(1),
        }
    }
}

impl WindowConfig {
    /// Total retention: samples older than this are purged
    pub fn retention(&self) -> Duration {
        self.lookback + self.cleanup_buffer
    }
}

/// Result of one cleanup pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupStats {
    pub samples_removed: usize,
    pub keys_removed: usize,
}

#[derive(Debug, Default)]
struct InstrumentWindows {
    prices: VecDeque<PricePoint>,
    volumes: VecDeque<VolumePoint>,
    momentum: VecDeque<MomentumSample>,
}

impl InstrumentWindows {
    fn purge_before(&mut self, cutoff: DateTime<Utc>) -> usize {
        let before = self.prices.len() + self.volumes.len() + self.momentum.len();
        while self.prices.front().is_some_and(|p| p.timestamp <= cutoff) {
            self.prices.pop_front();
        }
        while self.volumes.front().is_some_and(|v| v.timestamp <= cutoff) {
            self.volumes.pop_front();
        }
        while self.momentum.front().is_some_and(|m| m.timestamp <= cutoff) {
            self.momentum.pop_front();
        }
        before - (self.prices.len() + self.volumes.len() + self.momentum.len())
    }

    fn is_empty(&self) -> bool {
        self.prices.is_empty() && self.volumes.is_empty()
    }
}

/// Per-instrument sliding windows behind a single lock
pub struct HistoryStore {
    config: WindowConfig,
    windows: RwLock<HashMap<InstrumentKey, InstrumentWindows>>,
}

impl HistoryStore {
    /// Create a new history store
    pub fn new(config: WindowConfig) -> Self {
        Self {
            config,
            windows: RwLock::new(HashMap::new()),
        }
    }

    /// Create a store with default windows
    pub fn with_defaults() -> Self {
        Self::new(WindowConfig::default())
    }

    pub fn config(&self) -> &WindowConfig {
        &self.config
    }

    /// Append a price and volume sample, deriving one momentum sample from
    /// the preceding price when that price is positive
    pub fn record(&self, key: &InstrumentKey, price: Decimal, volume: Decimal, now: DateTime<Utc>) {
        let mut windows = self.windows.write();
        let entry = windows.entry(key.clone()).or_default();

        if let Some(prev) = entry.prices.back() {
            if prev.price > Decimal::ZERO {
                let change_pct = (price - prev.price) / prev.price * Decimal::ONE_HUNDRED;
                entry.momentum.push_back(MomentumSample {
                    change_pct,
                    timestamp: now,
                });
                while entry.momentum.len() > self.config.momentum_capacity {
                    entry.momentum.pop_front();
                }
            }
        }

        entry.prices.push_back(PricePoint {
            price,
            timestamp: now,
        });
        entry.volumes.push_back(VolumePoint {
            volume,
            timestamp: now,
        });
    }

    /// Last known price at or before `target`, if any
    pub fn price_at(&self, key: &InstrumentKey, target: DateTime<Utc>) -> Option<Decimal> {
        let windows = self.windows.read();
        let entry = windows.get(key)?;
        last_price_at(&entry.prices, target)
    }

    /// Copy of one instrument's windows
    pub fn snapshot(&self, key: &InstrumentKey) -> Option<HistorySnapshot> {
        let windows = self.windows.read();
        windows.get(key).map(|entry| HistorySnapshot {
            prices: entry.prices.iter().copied().collect(),
            volumes: entry.volumes.iter().copied().collect(),
            momentum: entry.momentum.iter().copied().collect(),
        })
    }

    /// Drop samples older than lookback + buffer and forget empty instruments
    pub fn cleanup(&self, now: DateTime<Utc>) -> CleanupStats {
        let cutoff = now - self.config.retention();
        let mut stats = CleanupStats::default();

        let mut windows = self.windows.write();
        windows.retain(|_, entry| {
            stats.samples_removed += entry.purge_before(cutoff);
            if entry.is_empty() {
                stats.keys_removed += 1;
                false
            } else {
                true
            }
        });

        if stats.keys_removed > 0 {
            tracing::debug!(
                samples_removed = stats.samples_removed,
                keys_removed = stats.keys_removed,
                remaining = windows.len(),
                "History cleanup"
            );
        }

        stats
    }

    /// Number of instruments with live windows
    pub fn len(&self) -> usize {
        self.windows.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.read().is_empty()
    }

    pub fn contains(&self, key: &InstrumentKey) -> bool {
        self.windows.read().contains_key(key)
    }

    /// Oldest retained sample timestamp across all instruments
    pub fn oldest_sample(&self) -> Option<DateTime<Utc>> {
        let windows = self.windows.read();
        windows
            .values()
            .flat_map(|entry| {
                let price = entry.prices.front().map(|p| p.timestamp);
                let volume = entry.volumes.front().map(|v| v.timestamp);
                let momentum = entry.momentum.front().map(|m| m.timestamp);
                [price, volume, momentum]
            })
            .flatten()
            .min()
    }
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::with_defaults()
    }
}
