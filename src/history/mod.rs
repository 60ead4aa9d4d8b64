//! Price/volume history module
//!
//! Per-instrument sliding windows of price, volume and momentum samples,
//! purged on every poll cycle.

mod store;
mod types;

pub use store::{CleanupStats, HistoryStore, WindowConfig};
pub use types::{HistorySnapshot, MomentumSample, PricePoint, VolumePoint};
