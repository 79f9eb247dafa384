//! Exponential Moving Average (EMA) indicator.

use super::Indicator;
use crate::types::Bar;

/// EMA of closing prices.
///
/// Seeded with the first value and smoothed recursively, so every bar has a
/// value. Long periods over short series are dominated by the seed, which
/// is what the trend-alignment stack expects.
pub struct Ema {
    period: usize,
}

impl Ema {
    pub fn new(period: usize) -> Self {
        Self { period }
    }

    /// EMA over an arbitrary value series.
    pub fn over(values: &[f64], period: usize) -> Vec<f64> {
        let mut out = Vec::with_capacity(values.len());
        if period == 0 {
            return out;
        }

        let multiplier = 2.0 / (period as f64 + 1.0);
        let mut ema = match values.first() {
            Some(v) => *v,
            None => return out,
        };

        for value in values {
            ema = (value - ema) * multiplier + ema;
            out.push(ema);
        }
        out
    }
}

impl Indicator for Ema {
    type Output = Vec<f64>;

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        Self::over(&closes, self.period)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ema_constant_series() {
        let out = Ema::over(&[5.0; 10], 4);
        assert!(out.iter().all(|v| (*v - 5.0).abs() < 1e-12));
    }

    #[test]
    fn test_ema_tracks_rising_series_with_lag() {
        let values: Vec<f64> = (0..30).map(|i| i as f64).collect();
        let fast = Ema::over(&values, 5);
        let slow = Ema::over(&values, 20);
        let last = values.len() - 1;
        assert!(fast[last] < values[last]);
        assert!(fast[last] > slow[last]);
    }

    #[test]
    fn test_ema_empty_input() {
        assert!(Ema::over(&[], 10).is_empty());
    }
}
