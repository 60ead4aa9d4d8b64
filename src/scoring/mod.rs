//! Anomaly scoring module
//!
//! Combines four independently weighted signals (volume spike, momentum,
//! short-window volatility, daily trend) into a 0-100 pump score.

mod engine;
mod types;

pub use engine::ScoringEngine;
pub use types::{Confidence, FactorContribution, FactorKind, ScoreResult};
