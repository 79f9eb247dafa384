//! Bollinger Bands width.

use super::{finite, Indicator, Sma};
use crate::types::Bar;

/// Bollinger Bands.
///
/// - Middle Band: 20-period SMA
/// - Upper Band: Middle + (2 * Standard Deviation)
/// - Lower Band: Middle - (2 * Standard Deviation)
///
/// The output series is the normalised band width `(upper - lower) / middle`,
/// which is what the squeeze and range detectors consume.
pub struct BollingerBands {
    period: usize,
    std_dev: f64,
}

impl Default for BollingerBands {
    fn default() -> Self {
        Self {
            period: 20,
            std_dev: 2.0,
        }
    }
}

impl Indicator for BollingerBands {
    type Output = Vec<Option<f64>>;

    fn compute(&self, bars: &[Bar]) -> Vec<Option<f64>> {
        let mut out = vec![None; bars.len()];
        if self.period == 0 || bars.len() < self.period {
            return out;
        }

        let middles = Sma::new(self.period).compute(bars);
        for i in (self.period - 1)..bars.len() {
            let window = &bars[(i + 1 - self.period)..=i];
            let Some(middle) = middles[i].filter(|m| *m != 0.0) else {
                continue;
            };
            let variance = window
                .iter()
                .map(|c| (c.close - middle).powi(2))
                .sum::<f64>()
                / self.period as f64;
            let band = self.std_dev * variance.sqrt();
            out[i] = finite((2.0 * band) / middle);
        }
        out
    }
}
