//! Alert deduplication module
//!
//! Per-instrument, per-class cooldowns. The local map is a fast path; the
//! store's alert history is the authoritative check so a restart does not
//! re-send everything.

mod tracker;

pub use tracker::DedupTracker;
