//! Stochastic Oscillator indicator.

use super::{rolling_mean, Indicator};
use crate::types::Bar;

/// Stochastic Oscillator.
///
/// Compares closing price to price range over a period:
/// %K = (Current Close - Lowest Low) / (Highest High - Lowest Low) * 100
/// %D = SMA of %K
pub struct Stochastic {
    k_period: usize,
    d_period: usize,
}

impl Default for Stochastic {
    fn default() -> Self {
        Self {
            k_period: 14,
            d_period: 3,
        }
    }
}

/// %K and %D series.
#[derive(Debug, Clone, Default)]
pub struct StochasticSeries {
    pub k: Vec<Option<f64>>,
    pub d: Vec<Option<f64>>,
}

impl Indicator for Stochastic {
    type Output = StochasticSeries;

    fn compute(&self, bars: &[Bar]) -> StochasticSeries {
        let mut k = vec![None; bars.len()];
        if self.k_period == 0 || bars.len() < self.k_period {
            return StochasticSeries {
                d: k.clone(),
                k,
            };
        }

        for i in (self.k_period - 1)..bars.len() {
            let window = &bars[(i + 1 - self.k_period)..=i];

            let lowest_low = window.iter().map(|c| c.low).fold(f64::INFINITY, f64::min);
            let highest_high = window
                .iter()
                .map(|c| c.high)
                .fold(f64::NEG_INFINITY, f64::max);

            k[i] = Some(if highest_high != lowest_low {
                ((bars[i].close - lowest_low) / (highest_high - lowest_low)) * 100.0
            } else {
                50.0
            });
        }

        let d = rolling_mean(&k, self.d_period);
        StochasticSeries { k, d }
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
    fn test_stochastic_insufficient_data() {
        let out = Stochastic::default().compute(&create_uptrend_candles(10));
        assert!(out.k.iter().all(Option::is_none));
        assert!(out.d.iter().all(Option::is_none));
    }

    #[test]
    fn test_stochastic_warmup_alignment() {
        let out = Stochastic::default().compute(&create_uptrend_candles(30));
        assert!(out.k[12].is_none());
        assert!(out.k[13].is_some());
        assert!(out.d[14].is_none());
        assert!(out.d[15].is_some());
    }

    #[test]
    fn test_stochastic_uptrend_high_k() {
        let out = Stochastic::default().compute(&create_uptrend_candles(30));
        let k = out.k.last().unwrap().unwrap();
        assert!(k > 50.0, "Stochastic %K in uptrend should be > 50, got {}", k);
        assert!(k <= 100.0);
    }
}
