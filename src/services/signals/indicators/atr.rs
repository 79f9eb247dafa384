//! Average True Range (ATR) indicator.

use super::{finite, Indicator};
use crate::types::Bar;

/// Average True Range indicator.
///
/// Measures volatility by averaging the true range over a period.
/// True Range = max(high - low, |high - prev_close|, |low - prev_close|)
pub struct Atr {
    period: usize,
}

impl Default for Atr {
    fn default() -> Self {
        Self { period: 14 }
    }
}

impl Atr {
    pub fn new(period: usize) -> Self {
        Self { period }
    }

    fn true_ranges(bars: &[Bar]) -> Vec<f64> {
        bars.iter()
            .enumerate()
            .map(|(i, bar)| {
                if i == 0 {
                    return bar.high - bar.low;
                }
                let prev_close = bars[i - 1].close;
                (bar.high - bar.low)
                    .max((bar.high - prev_close).abs())
                    .max((bar.low - prev_close).abs())
            })
            .collect()
    }
}

impl Indicator for Atr {
    type Output = Vec<Option<f64>>;

    fn compute(&self, bars: &[Bar]) -> Vec<Option<f64>> {
        let mut out = vec![None; bars.len()];
        if self.period == 0 || bars.len() < self.period {
            return out;
        }

        let tr = Self::true_ranges(bars);
        let period = self.period as f64;

        // Seeded with a simple mean, then Wilder-smoothed.
        let mut atr = tr.iter().take(self.period).sum::<f64>() / period;
        out[self.period - 1] = finite(atr);

        for i in self.period..tr.len() {
            atr = (atr * (period - 1.0) + tr[i]) / period;
            out[i] = finite(atr);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_uptrend_candles(count: usize) -> Vec<Bar> {
        (0..count)
            .map(|i| {
                let base = 100.0 + i as f64 * 1.5;
                Bar {
                    time: 1000000 + i as i64 * 60000,
                    open: base,
                    high: base + 2.0,
                    low: base - 1.0,
                    close: base + 1.0,
                    volume: 1000.0,
                }
            })
            .collect()
    }

    #[test]
    fn test_atr_insufficient_data() {
        let out = Atr::default().compute(&create_uptrend_candles(5));
        assert!(out.iter().all(Option::is_none));
    }

    #[test]
    fn test_atr_constant_range() {
        // Every bar spans 3.0 and gaps never exceed it.
        let out = Atr::default().compute(&create_uptrend_candles(30));
        assert!(out[12].is_none());
        let v = out[29].unwrap();
        assert!((v - 3.0).abs() < 1e-9, "expected 3.0, got {}", v);
    }

    #[test]
    fn test_atr_positive() {
        let out = Atr::new(5).compute(&create_uptrend_candles(10));
        assert!(out.iter().flatten().all(|v| *v > 0.0));
    }
}
