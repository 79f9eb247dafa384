use serde::{Deserialize, Serialize};

use super::{Bar, BarSeries};

/// Derived features for one bar.
///
/// Numeric fields are `None` while an indicator is still warming up.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndicatorRow {
    // Momentum
    pub rsi: Option<f64>,
    pub stoch_k: Option<f64>,
    pub stoch_d: Option<f64>,
    pub macd: Option<f64>,
    pub macd_signal: Option<f64>,
    pub macd_hist: Option<f64>,

    // Trend
    pub ema_8: Option<f64>,
    pub ema_21: Option<f64>,
    pub ema_50: Option<f64>,
    pub ema_200: Option<f64>,
    /// +1 bullish stack, -1 bearish stack, 0 otherwise.
    pub trend_alignment: i8,

    // Volatility
    pub atr: Option<f64>,
    /// 20-period rolling mean of ATR.
    pub atr_mean: Option<f64>,
    pub bb_width: Option<f64>,
    pub bb_width_mean: Option<f64>,

    // Volume
    pub vol_ratio: Option<f64>,

    // Price action
    pub body_size: f64,
    pub upper_shadow: f64,
    pub lower_shadow: f64,
    pub total_range: f64,

    // Structure
    pub higher_high: bool,
    pub lower_low: bool,
    pub support: Option<f64>,
    pub resistance: Option<f64>,
    pub volatility_spike: bool,
    pub big_move_up: bool,
    pub big_move_down: bool,
    pub sideways_market: bool,
    pub strong_trend: bool,
    pub smart_money: bool,
    pub accumulation: bool,
    pub distribution: bool,

    // Patterns
    pub bullish_ob: bool,
    pub bearish_ob: bool,
    pub fvg_up: bool,
    pub fvg_down: bool,
    pub trap_buy: bool,
    pub trap_sell: bool,
}

/// Bars plus their derived features, index-aligned.
///
/// `rows` is empty when the series was too short to derive anything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndicatorPanel {
    pub bars: BarSeries,
    pub rows: Vec<IndicatorRow>,
}

impl IndicatorPanel {
    /// Panel with no derived fields.
    pub fn raw(bars: BarSeries) -> Self {
        Self {
            bars,
            rows: Vec::new(),
        }
    }

    pub fn is_derived(&self) -> bool {
        !self.rows.is_empty() && self.rows.len() == self.bars.len()
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn latest(&self) -> Option<(&Bar, &IndicatorRow)> {
        self.at_offset(0)
    }

    pub fn previous(&self) -> Option<(&Bar, &IndicatorRow)> {
        self.at_offset(1)
    }

    /// Bar and row `offset` positions back from the end.
    pub fn at_offset(&self, offset: usize) -> Option<(&Bar, &IndicatorRow)> {
        if !self.is_derived() || offset >= self.rows.len() {
            return None;
        }
        let idx = self.rows.len() - 1 - offset;
        Some((&self.bars.bars()[idx], &self.rows[idx]))
    }
}
