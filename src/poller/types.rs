//! Poll loop types

use crate::config::Config;
use crate::feed::RetryPolicy;
use rust_decimal::Decimal;
use std::time::Duration;

/// Runtime settings for the poll loop
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Sleep between cycles
    pub interval: Duration,
    /// Sleep after a cycle in which every source failed
    pub error_backoff: Duration,
    /// Window for the pump/dump checks
    pub pump_window: chrono::Duration,
    pub pump_threshold_pct: Decimal,
    /// Positive magnitude of the short-window fall
    pub dump_threshold_pct: Decimal,
    pub daily_spike_min_pct: Decimal,
    pub daily_spike_max_pct: Decimal,
    /// Movers fetched per direction per venue
    pub movers_limit: usize,
    pub retry: RetryPolicy,
    /// Score that hands an instrument to the live order book streams
    pub activation_score: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            error_backoff: Duration::from_secs(10),
            pump_window: chrono::Duration::minutes(5),
            pump_threshold_pct: Decimal::new(5, 0),
            dump_threshold_pct: Decimal::new(5, 0),
            daily_spike_min_pct: Decimal::new(30, 0),
            daily_spike_max_pct: Decimal::new(70, 0),
            movers_limit: 50,
            retry: RetryPolicy::default(),
            activation_score: 50,
        }
    }
}

impl From<&Config> for PollConfig {
    fn from(config: &Config) -> Self {
        let monitor = &config.monitor;
        Self {
            interval: Duration::from_secs(monitor.interval_secs),
            error_backoff: Duration::from_secs(monitor.error_backoff_secs),
            pump_window: chrono::Duration::seconds(monitor.pump_window_secs as i64),
            pump_threshold_pct: monitor.pump_threshold_pct,
            dump_threshold_pct: monitor.dump_threshold_pct,
            daily_spike_min_pct: monitor.daily_spike_min_pct,
            daily_spike_max_pct: monitor.daily_spike_max_pct,
            movers_limit: config.sources.movers_limit,
            retry: RetryPolicy::from(&config.sources),
            activation_score: config.sniper.activation_score,
        }
    }
}

/// What one detection cycle did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub sources_ok: usize,
    pub sources_failed: usize,
    /// Tickers processed across all sources
    pub tickers: usize,
    /// Alerts that passed dedup and went to the dispatcher
    pub alerts: usize,
    /// Recipient deliveries across those alerts
    pub deliveries: usize,
    /// New live order book subscriptions
    pub activations: usize,
    /// Shutdown arrived while fetching
    pub cancelled: bool,
}

impl CycleReport {
    /// Every configured source failed
    pub fn all_sources_failed(&self) -> bool {
        self.sources_ok == 0 && self.sources_failed > 0
    }
}
