//! Relative volume.

use super::{finite, rolling_mean, Indicator};
use crate::types::Bar;

/// Ratio of each bar's volume to the trailing mean volume (current bar
/// included). A zero mean yields `None`.
pub struct VolumeRatio {
    period: usize,
}

impl Default for VolumeRatio {
    fn default() -> Self {
        Self { period: 20 }
    }
}

impl Indicator for VolumeRatio {
    type Output = Vec<Option<f64>>;

    fn compute(&self, bars: &[Bar]) -> Vec<Option<f64>> {
        let volumes: Vec<Option<f64>> = bars.iter().map(|b| Some(b.volume)).collect();
        rolling_mean(&volumes, self.period)
            .into_iter()
            .zip(bars)
            .map(|(mean, bar)| match mean {
                Some(m) if m > 0.0 => finite(bar.volume / m),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_candles(volumes: &[f64]) -> Vec<Bar> {
        volumes
            .iter()
            .enumerate()
            .map(|(i, &volume)| Bar {
                time: 1000000 + i as i64 * 60000,
                open: 100.0,
                high: 101.0,
                low: 99.0,
                close: 100.5,
                volume,
            })
            .collect()
    }

    #[test]
    fn test_volume_ratio_steady() {
        let out = VolumeRatio::default().compute(&create_candles(&[1000.0; 25]));
        assert!(out[18].is_none());
        assert_eq!(out[24], Some(1.0));
    }

    #[test]
    fn test_volume_ratio_spike() {
        let mut volumes = vec![1000.0; 25];
        volumes[24] = 5000.0;
        let v = VolumeRatio::default().compute(&create_candles(&volumes))[24].unwrap();
        // 5000 / ((19 * 1000 + 5000) / 20)
        assert!((v - 5000.0 / 1200.0).abs() < 1e-9);
    }

    #[test]
    fn test_volume_ratio_zero_volume() {
        let out = VolumeRatio::default().compute(&create_candles(&[0.0; 25]));
        assert!(out.iter().all(Option::is_none));
    }
}
