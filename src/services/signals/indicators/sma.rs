//! Simple Moving Average (SMA) and rolling window helpers.

use super::{finite, Indicator};
use crate::types::Bar;

/// SMA of closing prices.
pub struct Sma {
    period: usize,
}

impl Sma {
    pub fn new(period: usize) -> Self {
        Self { period }
    }
}

impl Indicator for Sma {
    type Output = Vec<Option<f64>>;

    fn compute(&self, bars: &[Bar]) -> Vec<Option<f64>> {
        let closes: Vec<Option<f64>> = bars.iter().map(|b| Some(b.close)).collect();
        rolling_mean(&closes, self.period)
    }
}

/// Rolling mean over `period` values. A window containing any `None`
/// yields `None`.
pub fn rolling_mean(values: &[Option<f64>], period: usize) -> Vec<Option<f64>> {
    rolling(values, period, |window| {
        Some(window.iter().sum::<f64>() / window.len() as f64)
    })
}

/// Rolling maximum over `period` values.
pub fn rolling_max(values: &[Option<f64>], period: usize) -> Vec<Option<f64>> {
    rolling(values, period, |window| {
        Some(window.iter().copied().fold(f64::NEG_INFINITY, f64::max))
    })
}

/// Rolling minimum over `period` values.
pub fn rolling_min(values: &[Option<f64>], period: usize) -> Vec<Option<f64>> {
    rolling(values, period, |window| {
        Some(window.iter().copied().fold(f64::INFINITY, f64::min))
    })
}

fn rolling<F>(values: &[Option<f64>], period: usize, reduce: F) -> Vec<Option<f64>>
where
    F: Fn(&[f64]) -> Option<f64>,
{
    let mut out = vec![None; values.len()];
    if period == 0 {
        return out;
    }

    let mut window = Vec::with_capacity(period);
    for i in (period.saturating_sub(1))..values.len() {
        window.clear();
        let start = i + 1 - period;
        for v in &values[start..=i] {
            match v {
                Some(x) => window.push(*x),
                None => break,
            }
        }
        if window.len() == period {
            out[i] = reduce(&window).and_then(finite);
        }
    }
    out
}
