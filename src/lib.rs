//! pumpwatch: pump and dump detector for crypto perpetual futures
//!
//! This library provides the core components for:
//! - Top gainers/losers polling from Binance and MEXC futures
//! - Per-instrument price, volume and momentum history windows
//! - Weighted anomaly scoring (volume, momentum, volatility, daily trend)
//! - Per-class alert cooldowns backed by the alert store
//! - Live order book streams for high-scoring instruments
//! - Alert fan-out to recipients with per-recipient filters
//! - Structured logging and Prometheus metrics

pub mod alert;
pub mod cli;
pub mod config;
pub mod dedup;
pub mod error;
pub mod feed;
pub mod history;
pub mod instrument;
pub mod orderbook;
pub mod poller;
pub mod scoring;
pub mod store;
pub mod subscription;
pub mod telemetry;
pub mod venue;
pub mod ws;
