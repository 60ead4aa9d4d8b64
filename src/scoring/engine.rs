//! Multi-factor pump scoring
//!
//! Each factor awards all, part, or none of its weight. Factors are summed
//! without de-duplicating overlapping evidence: a sharp rise usually lights
//! up momentum and volatility together, and that is intended.

use super::types::{Confidence, FactorContribution, FactorKind, ScoreResult};
use crate::config::ScoringConfig;
use crate::history::HistorySnapshot;
use crate::instrument::InstrumentKey;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Prior volume samples needed before the volume factor can fire
const MIN_PRIOR_VOLUMES: usize = 3;
/// Momentum samples needed before the momentum factor can fire
const MIN_MOMENTUM_SAMPLES: usize = 3;

/// Stateless scorer; the same inputs always yield the same result
#[derive(Debug, Clone)]
pub struct ScoringEngine {
    config: ScoringConfig,
    volatility_window: Duration,
}

impl ScoringEngine {
    /// Create a new scoring engine
    pub fn new(config: ScoringConfig) -> Self {
        let volatility_window = Duration::seconds(config.volatility_window_secs as i64);
        Self {
            config,
            volatility_window,
        }
    }

    /// Create an engine with default weights (30/25/25/20)
    pub fn with_defaults() -> Self {
        Self::new(ScoringConfig::default())
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Score one instrument.
    ///
    /// `history` must already include the current observation as its most
    /// recent sample; the volume factor compares against the samples before it.
    pub fn score(
        &self,
        key: &InstrumentKey,
        current_price: Decimal,
        current_volume: Decimal,
        change_24h: Decimal,
        now: DateTime<Utc>,
        history: &HistorySnapshot,
    ) -> ScoreResult {
        let factors = vec![
            self.volume_factor(current_volume, history),
            self.momentum_factor(history),
            self.volatility_factor(current_price, now, history),
            self.daily_trend_factor(change_24h),
        ];

        let score = factors.iter().map(|f| f.points).sum::<u32>().min(100);

        ScoreResult {
            key: key.clone(),
            score,
            confidence: self.confidence(score),
            factors,
        }
    }

    /// Confidence label for a score
    pub fn confidence(&self, score: u32) -> Confidence {
        if score >= self.config.high_confidence {
            Confidence::High
        } else if score >= self.config.alert_floor {
            Confidence::Medium
        } else {
            Confidence::Low
        }
    }

    /// Whether a score clears the early-pump alert floor
    pub fn is_alertable(&self, result: &ScoreResult) -> bool {
        result.score >= self.config.alert_floor
    }

    fn volume_factor(
        &self,
        current_volume: Decimal,
        history: &HistorySnapshot,
    ) -> FactorContribution {
        let weight = self.config.volume_weight;
        let prior = history.prior_volumes();

        let ratio = if prior.len() < MIN_PRIOR_VOLUMES {
            None
        } else {
            let total: Decimal = prior.iter().map(|v| v.volume).sum();
            let mean = total / Decimal::from(prior.len());
            (mean > Decimal::ZERO).then(|| current_volume / mean)
        };

        let points = match ratio {
            Some(r) if r >= dec!(6) => weight,
            Some(r) if r >= dec!(3) => share(weight, 70),
            Some(r) if r >= dec!(2) => share(weight, 30),
            _ => 0,
        };

        FactorContribution {
            factor: FactorKind::VolumeSpike,
            points,
            observed: ratio,
        }
    }

    fn momentum_factor(&self, history: &HistorySnapshot) -> FactorContribution {
        let weight = self.config.momentum_weight;
        let samples = &history.momentum;

        if samples.len() < MIN_MOMENTUM_SAMPLES {
            return FactorContribution {
                factor: FactorKind::Momentum,
                points: 0,
                observed: None,
            };
        }

        let n = samples.len();
        let (a, b, c) = (
            samples[n - 3].change_pct,
            samples[n - 2].change_pct,
            samples[n - 1].change_pct,
        );

        let points = if a > Decimal::ZERO && b > Decimal::ZERO && c > Decimal::ZERO {
            if a < b && b < c {
                weight
            } else {
                share(weight, 70)
            }
        } else if b > Decimal::ZERO && c > Decimal::ZERO {
            share(weight, 40)
        } else {
            0
        };

        FactorContribution {
            factor: FactorKind::Momentum,
            points,
            observed: Some(c),
        }
    }

    fn volatility_factor(
        &self,
        current_price: Decimal,
        now: DateTime<Utc>,
        history: &HistorySnapshot,
    ) -> FactorContribution {
        let weight = self.config.volatility_weight;

        let change = history
            .price_at(now - self.volatility_window)
            .filter(|old| *old > Decimal::ZERO)
            .map(|old| (current_price - old) / old * Decimal::ONE_HUNDRED);

        let points = match change {
            Some(pct) if pct >= dec!(3) => weight,
            Some(pct) if pct >= dec!(1.5) => share(weight, 50),
            _ => 0,
        };

        FactorContribution {
            factor: FactorKind::Volatility,
            points,
            observed: change,
        }
    }

    fn daily_trend_factor(&self, change_24h: Decimal) -> FactorContribution {
        let weight = self.config.daily_trend_weight;

        let points = if change_24h >= dec!(10) {
            weight
        } else if change_24h >= dec!(5) {
            share(weight, 50)
        } else {
            0
        };

        FactorContribution {
            factor: FactorKind::DailyTrend,
            points,
            observed: Some(change_24h),
        }
    }
}

impl Default for ScoringEngine {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Integer share of a weight, truncated (25 * 70% = 17)
fn share(weight: u32, percent: u32) -> u32 {
    weight * percent / 100
}
