//! Alert types

use crate::instrument::InstrumentKey;
use crate::scoring::ScoreResult;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Kind of anomaly an alert reports; cooldowns are tracked per class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AlertClass {
    /// Score-based early pump detection
    #[serde(rename = "early_pump")]
    EarlyPump,
    /// 24h change inside the configured positive band
    #[serde(rename = "daily_spike")]
    DailySpike,
    /// 24h change inside the mirrored negative band
    #[serde(rename = "daily_dump")]
    DailyDump,
    /// Rise over the short window
    #[serde(rename = "pump_5m")]
    Pump5m,
    /// Fall over the short window
    #[serde(rename = "dump_5m")]
    Dump5m,
}

impl AlertClass {
    pub const ALL: [AlertClass; 5] = [
        AlertClass::EarlyPump,
        AlertClass::DailySpike,
        AlertClass::DailyDump,
        AlertClass::Pump5m,
        AlertClass::Dump5m,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AlertClass::EarlyPump => "early_pump",
            AlertClass::DailySpike => "daily_spike",
            AlertClass::DailyDump => "daily_dump",
            AlertClass::Pump5m => "pump_5m",
            AlertClass::Dump5m => "dump_5m",
        }
    }

    /// True for the fixed-threshold classes (everything but the score path)
    pub fn is_threshold(&self) -> bool {
        !matches!(self, AlertClass::EarlyPump)
    }

    fn headline(&self) -> &'static str {
        match self {
            AlertClass::EarlyPump => "EARLY PUMP",
            AlertClass::DailySpike => "DAILY SPIKE",
            AlertClass::DailyDump => "DAILY DUMP",
            AlertClass::Pump5m => "PUMP",
            AlertClass::Dump5m => "DUMP",
        }
    }
}

impl fmt::Display for AlertClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A candidate alert for one instrument
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: Uuid,
    pub key: InstrumentKey,
    pub class: AlertClass,
    pub price: Decimal,
    /// The change that triggered the alert: short-window change for the
    /// pump/dump classes, 24h change otherwise
    pub change_pct: Decimal,
    pub change_24h: Decimal,
    pub volume_24h: Decimal,
    /// Present for early-pump alerts
    pub score: Option<ScoreResult>,
    /// Order book bid share (0-100) when a live book was cached
    pub buy_pressure: Option<Decimal>,
    pub trade_url: String,
    pub created_at: DateTime<Utc>,
}

impl Alert {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        key: InstrumentKey,
        class: AlertClass,
        price: Decimal,
        change_pct: Decimal,
        change_24h: Decimal,
        volume_24h: Decimal,
        trade_url: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            key,
            class,
            price,
            change_pct,
            change_24h,
            volume_24h,
            score: None,
            buy_pressure: None,
            trade_url: trade_url.into(),
            created_at,
        }
    }

    pub fn with_score(mut self, score: ScoreResult) -> Self {
        self.score = Some(score);
        self
    }

    pub fn with_buy_pressure(mut self, buy_pressure: Option<Decimal>) -> Self {
        self.buy_pressure = buy_pressure;
        self
    }

    /// Plain-text rendering used by the notifiers
    pub fn render(&self) -> String {
        let mut text = format!(
            "{} {} ({})\nPrice: {}\nChange: {:+}%\n24h: {:+}%\nVolume 24h: {}",
            self.class.headline(),
            self.key.symbol(),
            self.key.venue(),
            self.price.normalize(),
            self.change_pct.round_dp(2),
            self.change_24h.round_dp(2),
            self.volume_24h.round_dp(0),
        );

        if let Some(score) = &self.score {
            text.push_str(&format!(
                "\nScore: {}/100 ({:?})",
                score.score, score.confidence
            ));
            for factor in score.contributing() {
                text.push_str(&format!("\n  {:?}: +{}", factor.factor, factor.points));
            }
        }
        if let Some(pressure) = self.buy_pressure {
            text.push_str(&format!("\nBuy pressure: {}%", pressure.round_dp(1)));
        }

        text.push('\n');
        text.push_str(&self.trade_url);
        text
    }
}
