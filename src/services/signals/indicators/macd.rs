//! MACD (Moving Average Convergence Divergence) indicator.

use super::{Ema, Indicator};
use crate::types::Bar;

/// MACD indicator.
///
/// Shows the relationship between two EMAs of price:
/// - MACD Line: 12-period EMA - 26-period EMA
/// - Signal Line: 9-period EMA of MACD Line
/// - Histogram: MACD Line - Signal Line
pub struct Macd {
    fast_period: usize,
    slow_period: usize,
    signal_period: usize,
}

impl Default for Macd {
    fn default() -> Self {
        Self {
            fast_period: 12,
            slow_period: 26,
            signal_period: 9,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MacdSeries {
    pub macd: Vec<Option<f64>>,
    pub signal: Vec<Option<f64>>,
    pub hist: Vec<Option<f64>>,
}

impl Indicator for Macd {
    type Output = MacdSeries;

    fn compute(&self, bars: &[Bar]) -> MacdSeries {
        let len = bars.len();
        if len < self.slow_period {
            return MacdSeries {
                macd: vec![None; len],
                signal: vec![None; len],
                hist: vec![None; len],
            };
        }

        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let fast = Ema::over(&closes, self.fast_period);
        let slow = Ema::over(&closes, self.slow_period);
        let line: Vec<f64> = fast.iter().zip(&slow).map(|(f, s)| f - s).collect();
        let signal = Ema::over(&line, self.signal_period);

        // Values inside the slow warm-up are seed noise, so they are masked.
        let warm = self.slow_period - 1;
        let mask = |i: usize, v: f64| (i >= warm && v.is_finite()).then_some(v);

        MacdSeries {
            macd: line.iter().enumerate().map(|(i, v)| mask(i, *v)).collect(),
            signal: signal.iter().enumerate().map(|(i, v)| mask(i, *v)).collect(),
            hist: line
                .iter()
                .zip(&signal)
                .enumerate()
                .map(|(i, (m, s))| mask(i, m - s))
                .collect(),
        }
    }
}
