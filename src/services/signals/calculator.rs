//! Indicator panel derivation.

use crate::services::signals::indicators::{
    finite, rolling_max, rolling_mean, rolling_min, Atr, BollingerBands, Ema, Indicator, Macd,
    Rsi, Stochastic, VolumeRatio,
};
use crate::services::signals::patterns;
use crate::types::{Bar, BarSeries, IndicatorPanel, IndicatorRow, Timeframe};
use tracing::{debug, warn};

/// Thresholds for the structure and regime flags.
#[derive(Debug, Clone)]
pub struct IndicatorParams {
    /// Bars required before anything is derived.
    pub min_bars: usize,
    /// Window for the ATR/width means and support/resistance.
    pub rolling_window: usize,
    pub volatility_spike_ratio: f64,
    pub sideways_width_ratio: f64,
    pub sideways_atr_ratio: f64,
    /// Percent move over one hour that counts as a big move.
    pub big_move_pct: f64,
    pub big_move_volume_ratio: f64,
    /// Distance from the 50 EMA, in ATRs, for a strong trend.
    pub strong_trend_atr_distance: f64,
    pub smart_money_volume_ratio: f64,
    pub smart_money_body_ratio: f64,
    pub accumulation_volume_ratio: f64,
}

impl Default for IndicatorParams {
    fn default() -> Self {
        Self {
            min_bars: 50,
            rolling_window: 20,
            volatility_spike_ratio: 1.5,
            sideways_width_ratio: 0.7,
            sideways_atr_ratio: 0.8,
            big_move_pct: 0.5,
            big_move_volume_ratio: 1.8,
            strong_trend_atr_distance: 1.0,
            smart_money_volume_ratio: 1.5,
            smart_money_body_ratio: 0.6,
            accumulation_volume_ratio: 1.2,
        }
    }
}

/// Turns a bar series into an [`IndicatorPanel`].
#[derive(Debug, Clone, Default)]
pub struct IndicatorCalculator {
    params: IndicatorParams,
}

impl IndicatorCalculator {
    pub fn new(params: IndicatorParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &IndicatorParams {
        &self.params
    }

    /// Derive the panel, inferring the bar interval from the series.
    /// Series shorter than `min_bars` come back with no derived rows.
    pub fn compute(&self, series: &BarSeries) -> IndicatorPanel {
        self.derive(series, bars_per_hour(series.bar_minutes()))
    }

    /// Derive the panel for a series of known timeframe.
    pub fn compute_for(&self, series: &BarSeries, timeframe: Timeframe) -> IndicatorPanel {
        self.derive(series, bars_per_hour(Some(timeframe.minutes())))
    }

    fn derive(&self, series: &BarSeries, hour_lag: usize) -> IndicatorPanel {
        if series.len() < self.params.min_bars {
            debug!(
                "Skipping indicators: {} bars, need {}",
                series.len(),
                self.params.min_bars
            );
            return IndicatorPanel::raw(series.clone());
        }

        let bars = series.bars();
        let p = &self.params;
        let window = p.rolling_window;

        let rsi = Rsi::default().compute(bars);
        let stoch = Stochastic::default().compute(bars);
        let macd = Macd::default().compute(bars);
        let ema_8 = Ema::new(8).compute(bars);
        let ema_21 = Ema::new(21).compute(bars);
        let ema_50 = Ema::new(50).compute(bars);
        let ema_200 = Ema::new(200).compute(bars);
        let atr = Atr::default().compute(bars);
        let atr_mean = rolling_mean(&atr, window);
        let bb_width = BollingerBands::default().compute(bars);
        let bb_width_mean = rolling_mean(&bb_width, window);
        let vol_ratio = VolumeRatio::default().compute(bars);

        let highs: Vec<Option<f64>> = bars.iter().map(|b| Some(b.high)).collect();
        let lows: Vec<Option<f64>> = bars.iter().map(|b| Some(b.low)).collect();
        let resistance = rolling_max(&highs, window);
        let support = rolling_min(&lows, window);

        let flags = patterns::scan(bars);

        let mut dropped = 0usize;
        let mut checked = |v: f64| {
            let out = finite(v);
            if out.is_none() {
                dropped += 1;
            }
            out
        };

        let mut rows = Vec::with_capacity(bars.len());
        for (i, bar) in bars.iter().enumerate() {
            let mut row = IndicatorRow {
                rsi: rsi[i],
                stoch_k: stoch.k[i],
                stoch_d: stoch.d[i],
                macd: macd.macd[i],
                macd_signal: macd.signal[i],
                macd_hist: macd.hist[i],
                ema_8: checked(ema_8[i]),
                ema_21: checked(ema_21[i]),
                ema_50: checked(ema_50[i]),
                ema_200: checked(ema_200[i]),
                atr: atr[i],
                atr_mean: atr_mean[i],
                bb_width: bb_width[i],
                bb_width_mean: bb_width_mean[i],
                vol_ratio: vol_ratio[i],
                body_size: bar.body(),
                upper_shadow: bar.upper_shadow(),
                lower_shadow: bar.lower_shadow(),
                total_range: bar.range(),
                support: support[i],
                resistance: resistance[i],
                ..Default::default()
            };

            row.trend_alignment = trend_alignment(&row);

            if i > 0 {
                row.higher_high = bar.high > bars[i - 1].high;
                row.lower_low = bar.low < bars[i - 1].low;
            }

            self.regime_flags(&mut row);
            self.flow_flags(bar, &mut row);

            let pct = (i >= hour_lag)
                .then(|| percent_change(bars[i - hour_lag].close, bar.close))
                .flatten();
            self.big_move_flags(pct, &mut row);

            flags[i].apply(&mut row);
            rows.push(row);
        }

        if dropped > 0 {
            warn!("Sanitized {} non-finite indicator values", dropped);
        }

        IndicatorPanel {
            bars: series.clone(),
            rows,
        }
    }

    fn regime_flags(&self, row: &mut IndicatorRow) {
        let p = &self.params;

        if let (Some(atr), Some(mean)) = (row.atr, row.atr_mean) {
            row.volatility_spike = atr > p.volatility_spike_ratio * mean;

            if let (Some(width), Some(width_mean)) = (row.bb_width, row.bb_width_mean) {
                row.sideways_market = width < p.sideways_width_ratio * width_mean
                    && atr < p.sideways_atr_ratio * mean;
            }
        }
    }

    fn flow_flags(&self, bar: &Bar, row: &mut IndicatorRow) {
        let p = &self.params;

        if row.trend_alignment != 0 {
            if let (Some(atr), Some(ema_50)) = (row.atr, row.ema_50) {
                row.strong_trend =
                    atr > 0.0 && (bar.close - ema_50).abs() / atr > p.strong_trend_atr_distance;
            }
        }

        let range = bar.range();
        let Some(vol_ratio) = row.vol_ratio else {
            return;
        };
        if range <= 0.0 {
            return;
        }

        row.smart_money = vol_ratio > p.smart_money_volume_ratio
            && bar.body() > p.smart_money_body_ratio * range;

        let close_position = (bar.close - bar.low) / range;
        row.accumulation =
            bar.is_bullish() && close_position >= 0.75 && vol_ratio > p.accumulation_volume_ratio;
        row.distribution =
            bar.is_bearish() && close_position <= 0.25 && vol_ratio > p.accumulation_volume_ratio;
    }

    fn big_move_flags(&self, pct: Option<f64>, row: &mut IndicatorRow) {
        let p = &self.params;
        let Some(pct) = pct else {
            return;
        };
        let surge = row.volatility_spike
            && row.vol_ratio.map_or(false, |v| v > p.big_move_volume_ratio);
        row.big_move_up = surge && pct > p.big_move_pct;
        row.big_move_down = surge && pct < -p.big_move_pct;
    }
}

/// +1 when 8 > 21 > 50 > 200, -1 when 8 < 21 < 50 < 200, else 0.
pub fn trend_alignment(row: &IndicatorRow) -> i8 {
    match (row.ema_8, row.ema_21, row.ema_50, row.ema_200) {
        (Some(a), Some(b), Some(c), Some(d)) => {
            if a > b && b > c && c > d {
                1
            } else if a < b && b < c && c < d {
                -1
            } else {
                0
            }
        }
        _ => 0,
    }
}

/// Number of bars spanning one hour, at least one.
fn bars_per_hour(bar_minutes: Option<i64>) -> usize {
    match bar_minutes {
        Some(m) if m < 60 => (60 / m).max(1) as usize,
        _ => 1,
    }
}

fn percent_change(from: f64, to: f64) -> Option<f64> {
    if from == 0.0 {
        return None;
    }
    finite((to - from) / from * 100.0)
}
