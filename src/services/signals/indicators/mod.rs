//! Technical indicator implementations.
//!
//! Every indicator produces a full, index-aligned series over its input so
//! the calculator can assemble one row per bar. Warm-up positions are `None`.

pub mod atr;
pub mod bollinger;
pub mod ema;
pub mod macd;
pub mod rsi;
pub mod sma;
pub mod stochastic;
pub mod volume;

pub use atr::Atr;
pub use bollinger::BollingerBands;
pub use ema::Ema;
pub use macd::{Macd, MacdSeries};
pub use rsi::Rsi;
pub use sma::{rolling_max, rolling_mean, rolling_min, Sma};
pub use stochastic::{Stochastic, StochasticSeries};
pub use volume::VolumeRatio;

use crate::types::Bar;

/// Trait for series indicators.
pub trait Indicator {
    type Output;

    /// Compute the aligned series.
    fn compute(&self, bars: &[Bar]) -> Self::Output;
}

/// Map non-finite values to `None`.
pub fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}
