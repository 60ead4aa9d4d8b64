//! Score result types

use crate::instrument::InstrumentKey;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Confidence label attached to a score
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

/// Individual scoring signals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactorKind {
    /// Current volume against the mean of prior samples
    VolumeSpike,
    /// Shape of the last few tick-to-tick price changes
    Momentum,
    /// Price change over the short lookback window
    Volatility,
    /// Reported 24h change
    DailyTrend,
}

/// Points one factor contributed, with the value that earned them
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactorContribution {
    pub factor: FactorKind,
    pub points: u32,
    /// Ratio or percentage the factor was judged on; None if it lacked data
    pub observed: Option<Decimal>,
}

/// Composite anomaly score for one instrument at one tick
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub key: InstrumentKey,
    /// 0..=100
    pub score: u32,
    pub confidence: Confidence,
    pub factors: Vec<FactorContribution>,
}

impl ScoreResult {
    /// Points earned by one factor
    pub fn points_for(&self, factor: FactorKind) -> u32 {
        self.factors
            .iter()
            .find(|f| f.factor == factor)
            .map_or(0, |f| f.points)
    }

    /// Factors that contributed any points
    pub fn contributing(&self) -> impl Iterator<Item = &FactorContribution> {
        self.factors.iter().filter(|f| f.points > 0)
    }
}
