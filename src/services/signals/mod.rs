//! Trading signals service module.
//!
//! Provides indicator derivation, pattern detection, multi-timeframe
//! confluence, weighted scoring and the trade quality gate.

pub mod calculator;
pub mod confluence;
pub mod engine;
pub mod gate;
pub mod indicators;
pub mod patterns;
pub mod scorer;

pub use calculator::{IndicatorCalculator, IndicatorParams};
pub use confluence::{ConfluenceAnalyzer, ConfluenceOutcome};
pub use engine::{EngineStatus, SignalEngine};
pub use gate::{GateConfig, TierRule, TradeQualityGate, VolatilityRegime};
pub use scorer::{ScoreWeights, SignalScorer};
