//! Configuration types for pumpwatch

use crate::alert::AlertClass;
use crate::instrument::Venue;
use crate::telemetry::LogFormat;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Environment variable that overrides `notifier.bot_token`
pub const BOT_TOKEN_ENV: &str = "TELEGRAM_BOT_TOKEN";

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub sources: SourcesConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub dedup: DedupConfig,
    #[serde(default)]
    pub sniper: SniperConfig,
    #[serde(default)]
    pub notifier: NotifierConfig,
    #[serde(default)]
    pub recipients: Vec<RecipientConfig>,
    pub telemetry: TelemetryConfig,
}

/// Poll loop and threshold-alert configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Seconds between detection cycles
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Short window for the pump/dump checks (seconds)
    #[serde(default = "default_pump_window_secs")]
    pub pump_window_secs: u64,

    /// Minimum rise within the short window, in percent
    #[serde(default = "default_pump_threshold_pct")]
    pub pump_threshold_pct: Decimal,

    /// Minimum fall within the short window, in percent (positive number)
    #[serde(default = "default_pump_threshold_pct")]
    pub dump_threshold_pct: Decimal,

    /// Lower bound of the daily spike band, in percent
    #[serde(default = "default_daily_spike_min_pct")]
    pub daily_spike_min_pct: Decimal,

    /// Upper bound of the daily spike band, in percent
    #[serde(default = "default_daily_spike_max_pct")]
    pub daily_spike_max_pct: Decimal,

    /// Wait used instead of the interval when every source failed
    #[serde(default = "default_error_backoff_secs")]
    pub error_backoff_secs: u64,
}

fn default_interval_secs() -> u64 {
    60
}
fn default_pump_window_secs() -> u64 {
    300 // 5 minutes
}
fn default_pump_threshold_pct() -> Decimal {
    Decimal::new(5, 0) // 5%
}
fn default_daily_spike_min_pct() -> Decimal {
    Decimal::new(30, 0)
}
fn default_daily_spike_max_pct() -> Decimal {
    Decimal::new(70, 0)
}
fn default_error_backoff_secs() -> u64 {
    10
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval_secs: 60,
            pump_window_secs: 300,
            pump_threshold_pct: Decimal::new(5, 0),
            dump_threshold_pct: Decimal::new(5, 0),
            daily_spike_min_pct: Decimal::new(30, 0),
            daily_spike_max_pct: Decimal::new(70, 0),
            error_backoff_secs: 10,
        }
    }
}

/// Market data source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    /// Venues polled for top movers
    pub venues: Vec<Venue>,
    /// Gainers and losers fetched per direction
    pub movers_limit: usize,
    /// Timeout for a single fetch attempt
    pub fetch_timeout_secs: u64,
    /// Attempts per fetch before the venue is skipped for the cycle
    pub fetch_retries: u32,
    /// Delay before the first retry; doubles on each further retry
    pub retry_delay_secs: u64,
    /// Override for the Binance futures REST base URL
    pub binance_base_url: Option<String>,
    /// Override for the Bybit REST base URL (e.g. a regional host)
    pub bybit_base_url: Option<String>,
    /// Override for the MEXC contract REST base URL
    pub mexc_base_url: Option<String>,
    /// Override for the Bitget REST base URL
    pub bitget_base_url: Option<String>,
    /// Override for the Gate.io REST base URL
    pub gateio_base_url: Option<String>,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            venues: Venue::ALL.to_vec(),
            movers_limit: 50,
            fetch_timeout_secs: 30,
            fetch_retries: 2,
            retry_delay_secs: 2,
            binance_base_url: None,
            bybit_base_url: None,
            mexc_base_url: None,
            bitget_base_url: None,
            gateio_base_url: None,
        }
    }
}

impl SourcesConfig {
    /// Configured REST base URL override for a venue
    pub fn base_url(&self, venue: Venue) -> Option<&str> {
        let url = match venue {
            Venue::Binance => &self.binance_base_url,
            Venue::Bybit => &self.bybit_base_url,
            Venue::Mexc => &self.mexc_base_url,
            Venue::Bitget => &self.bitget_base_url,
            Venue::Gateio => &self.gateio_base_url,
        };
        url.as_deref()
    }
}

/// History window configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub lookback_secs: u64,
    pub cleanup_buffer_secs: u64,
    pub momentum_capacity: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            lookback_secs: 300,
            cleanup_buffer_secs: 600,
            momentum_capacity: 10,
        }
    }
}

/// Anomaly score weights and bands
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub volume_weight: u32,
    pub momentum_weight: u32,
    pub volatility_weight: u32,
    pub daily_trend_weight: u32,
    /// Minimum score for an early-pump alert
    pub alert_floor: u32,
    /// Minimum score for HIGH confidence
    pub high_confidence: u32,
    /// Lookback for the short-window volatility factor (seconds)
    pub volatility_window_secs: u64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            volume_weight: 30,
            momentum_weight: 25,
            volatility_weight: 25,
            daily_trend_weight: 20,
            alert_floor: 50,
            high_confidence: 70,
            volatility_window_secs: 300,
        }
    }
}

impl ScoringConfig {
    pub fn total_weight(&self) -> u32 {
        self.volume_weight + self.momentum_weight + self.volatility_weight + self.daily_trend_weight
    }
}

/// Alert cooldown configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupConfig {
    /// Cooldown for score-based early pump alerts
    pub early_pump_cooldown_secs: u64,
    /// Cooldown for the threshold-based classes
    pub threshold_cooldown_secs: u64,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            early_pump_cooldown_secs: 30 * 60,
            threshold_cooldown_secs: 60 * 60,
        }
    }
}

/// Live order book ("sniper") configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SniperConfig {
    pub enabled: bool,
    /// Venues with a streaming order book adapter
    pub venues: Vec<Venue>,
    /// Maximum live subscriptions per venue
    pub max_subscriptions: usize,
    /// Minimum gap between subscribe requests on one venue
    pub subscribe_gap_ms: u64,
    /// Fixed delay between reconnect attempts
    pub reconnect_delay_secs: u64,
    /// Silence after which the connection pings or reconnects
    pub read_timeout_secs: u64,
    /// Book levels per side used for the imbalance
    pub imbalance_depth: usize,
    /// Score at which an instrument gets a live order book
    pub activation_score: u32,
    /// Override for the Binance futures stream URL
    pub binance_ws_url: Option<String>,
    /// Override for the MEXC contract stream URL
    pub mexc_ws_url: Option<String>,
    /// MEXC closes sockets that stay silent for 30s
    pub mexc_ping_interval_secs: u64,
}

impl Default for SniperConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            venues: vec![Venue::Binance, Venue::Mexc],
            max_subscriptions: 10,
            subscribe_gap_ms: 500,
            reconnect_delay_secs: 5,
            read_timeout_secs: 60,
            imbalance_depth: 20,
            activation_score: 50,
            binance_ws_url: None,
            mexc_ws_url: None,
            mexc_ping_interval_secs: 20,
        }
    }
}

/// Notification channel selection
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum NotifierKind {
    /// Write alerts to the log only
    #[default]
    Log,
    /// Telegram Bot API
    Telegram,
}

/// Notification channel configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifierConfig {
    pub kind: NotifierKind,
    pub bot_token: Option<String>,
    /// Override for the Bot API base URL
    pub api_url: Option<String>,
    /// Delay between consecutive sends
    pub send_delay_ms: u64,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            kind: NotifierKind::Log,
            bot_token: None,
            api_url: None,
            send_delay_ms: 50,
        }
    }
}

/// Seed recipient for the bundled in-memory store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipientConfig {
    pub id: i64,
    /// Venues this recipient wants alerts from (all when absent)
    #[serde(default)]
    pub alert_venues: Option<Vec<Venue>>,
    #[serde(default)]
    pub disabled_classes: Vec<AlertClass>,
    #[serde(default)]
    pub banned: bool,
}

/// Telemetry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    pub log_level: String,
    #[serde(default)]
    pub log_format: LogFormat,
    pub metrics_port: Option<u16>,
}

impl Config {
    /// Load configuration from a TOML file, apply environment overrides and
    /// validate it
    pub fn load(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Pull secrets from the environment when present
    pub fn apply_env_overrides(&mut self) {
        if let Ok(token) = std::env::var(BOT_TOKEN_ENV) {
            if !token.trim().is_empty() {
                self.notifier.bot_token = Some(token);
            }
        }
    }

    /// Reject configurations the service cannot run with
    pub fn validate(&self) -> anyhow::Result<()> {
        let monitor = &self.monitor;
        if monitor.interval_secs == 0 {
            anyhow::bail!("monitor.interval_secs must be greater than zero");
        }
        if monitor.pump_threshold_pct <= Decimal::ZERO
            || monitor.dump_threshold_pct <= Decimal::ZERO
        {
            anyhow::bail!("monitor pump/dump thresholds must be positive");
        }
        if monitor.daily_spike_min_pct <= Decimal::ZERO
            || monitor.daily_spike_min_pct > monitor.daily_spike_max_pct
        {
            anyhow::bail!(
                "monitor daily spike band [{}, {}] is invalid",
                monitor.daily_spike_min_pct,
                monitor.daily_spike_max_pct
            );
        }

        if self.sources.venues.is_empty() {
            anyhow::bail!("sources.venues must list at least one venue");
        }
        if self.sources.movers_limit == 0 || self.sources.fetch_retries == 0 {
            anyhow::bail!("sources.movers_limit and sources.fetch_retries must be positive");
        }

        let scoring = &self.scoring;
        if scoring.total_weight() > 100 {
            anyhow::bail!(
                "scoring weights sum to {}, must not exceed 100",
                scoring.total_weight()
            );
        }
        if scoring.alert_floor > scoring.high_confidence || scoring.high_confidence > 100 {
            anyhow::bail!("scoring requires alert_floor <= high_confidence <= 100");
        }

        if self.sniper.enabled && self.sniper.max_subscriptions == 0 {
            anyhow::bail!("sniper.max_subscriptions must be positive");
        }

        if self.notifier.kind == NotifierKind::Telegram
            && self.notifier.bot_token.as_deref().is_none_or(str::is_empty)
        {
            anyhow::bail!(
                "notifier.bot_token (or {}) is required for the telegram notifier",
                BOT_TOKEN_ENV
            );
        }

        if self.telemetry.log_level.trim().is_empty() {
            anyhow::bail!("telemetry.log_level must not be empty");
        }

        Ok(())
    }
}
