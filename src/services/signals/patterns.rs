//! Candle pattern detection.
//!
//! Per-bar zone flags (order blocks, fair value gaps, traps) are scanned over
//! 3-bar windows and merged into the indicator panel by the calculator.
//! Breakout detectors look at the latest bar against the channel formed by
//! the bars before it. Everything here reports "no pattern" when the input
//! is too short.

use crate::types::{Bar, Direction, IndicatorPanel, IndicatorRow};

/// Bars in the breakout channel.
pub const BREAKOUT_LOOKBACK: usize = 20;
/// Close must clear the channel by this fraction.
pub const BREAKOUT_MARGIN: f64 = 0.002;
/// Minimum body share of the range for a breakout bar.
pub const BREAKOUT_BODY_RATIO: f64 = 0.6;

const RANGE_TRAP_WINDOW: usize = 6;
const RANGE_TRAP_WIDTH_RATIO: f64 = 0.75;
const RANGE_TRAP_VOLUME_RATIO: f64 = 1.5;
const REPEAT_TRAP_LOOKBACK: usize = 10;

/// Zone flags for one bar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PatternFlags {
    pub bullish_ob: bool,
    pub bearish_ob: bool,
    pub fvg_up: bool,
    pub fvg_down: bool,
    pub trap_buy: bool,
    pub trap_sell: bool,
}

impl PatternFlags {
    /// Copy flags into a panel row.
    pub fn apply(&self, row: &mut IndicatorRow) {
        row.bullish_ob = self.bullish_ob;
        row.bearish_ob = self.bearish_ob;
        row.fvg_up = self.fvg_up;
        row.fvg_down = self.fvg_down;
        row.trap_buy = self.trap_buy;
        row.trap_sell = self.trap_sell;
    }

    pub fn any_trap(&self) -> bool {
        self.trap_buy || self.trap_sell
    }
}

/// Flag every bar. The first two bars never carry a pattern.
pub fn scan(bars: &[Bar]) -> Vec<PatternFlags> {
    let mut out = vec![PatternFlags::default(); bars.len()];
    for i in 2..bars.len() {
        out[i] = flags_at(&bars[i - 2], &bars[i - 1], &bars[i]);
    }
    out
}

fn flags_at(first: &Bar, second: &Bar, current: &Bar) -> PatternFlags {
    PatternFlags {
        // Reversal candle whose predecessor's wick was taken out.
        bullish_ob: first.is_bearish() && second.is_bullish() && first.low < second.low,
        bearish_ob: first.is_bullish() && second.is_bearish() && first.high > second.high,
        // Void between the first and second bar that the current bar leaves open.
        fvg_up: second.low > first.high && current.is_bullish() && current.low > first.high,
        fvg_down: second.high < first.low && current.is_bearish() && current.high < first.low,
        trap_buy: second.is_bullish() && current.is_bearish() && current.close < second.open,
        trap_sell: second.is_bearish() && current.is_bullish() && current.close > second.open,
    }
}

/// Highest high and lowest low of the channel preceding the last bar.
fn prior_channel(bars: &[Bar]) -> Option<(f64, f64)> {
    if bars.len() < BREAKOUT_LOOKBACK + 1 {
        return None;
    }
    let end = bars.len() - 1;
    let window = &bars[end - BREAKOUT_LOOKBACK..end];
    let resistance = window.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max);
    let support = window.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);
    Some((support, resistance))
}

/// Latest bar closed beyond the prior channel with a dominant body.
pub fn detect_breakout(bars: &[Bar]) -> Option<Direction> {
    let (support, resistance) = prior_channel(bars)?;
    let last = bars.last()?;

    let range = last.range();
    if range <= 0.0 || last.body() <= BREAKOUT_BODY_RATIO * range {
        return None;
    }

    if last.close > resistance * (1.0 + BREAKOUT_MARGIN) {
        Some(Direction::Buy)
    } else if last.close < support * (1.0 - BREAKOUT_MARGIN) {
        Some(Direction::Sell)
    } else {
        None
    }
}

/// Latest bar pierced the channel with its wick only and fell back below
/// the previous close. Returns the direction of the failed move.
pub fn detect_false_breakout(bars: &[Bar]) -> Option<Direction> {
    let (support, resistance) = prior_channel(bars)?;
    let last = bars.last()?;
    let prev = &bars[bars.len() - 2];

    if last.high > resistance && last.close <= resistance && last.close < prev.close {
        Some(Direction::Buy)
    } else if last.low < support && last.close >= support && last.close > prev.close {
        Some(Direction::Sell)
    } else {
        None
    }
}

/// Breakout quality, 0 to 4.
pub fn breakout_strength(bar: &Bar, row: &IndicatorRow) -> i32 {
    let mut strength = 0;
    if row.vol_ratio.map_or(false, |v| v > 1.5) {
        strength += 1;
    }
    if bar.range() > 0.0 && bar.body() > 0.5 * bar.range() {
        strength += 1;
    }
    if row.volatility_spike {
        strength += 1;
    }
    if row.strong_trend {
        strength += 1;
    }
    strength
}

/// Squeeze that keeps absorbing volume: recent band width well under its
/// rolling mean while relative volume stays high.
pub fn detect_range_volume_trap(panel: &IndicatorPanel) -> bool {
    if !panel.is_derived() || panel.rows.len() < RANGE_TRAP_WINDOW {
        return false;
    }
    let recent = &panel.rows[panel.rows.len() - RANGE_TRAP_WINDOW..];

    let widths: Option<Vec<f64>> = recent.iter().map(|r| r.bb_width).collect();
    let volumes: Option<Vec<f64>> = recent.iter().map(|r| r.vol_ratio).collect();
    let width_mean = recent.last().and_then(|r| r.bb_width_mean);

    match (widths, volumes, width_mean) {
        (Some(w), Some(v), Some(mean)) => {
            let avg_width = w.iter().sum::<f64>() / w.len() as f64;
            let avg_volume = v.iter().sum::<f64>() / v.len() as f64;
            avg_width < RANGE_TRAP_WIDTH_RATIO * mean && avg_volume > RANGE_TRAP_VOLUME_RATIO
        }
        _ => false,
    }
}

/// Two consecutive candles in `direction` within the last 10 bars where the
/// second engulfs the first and closes beyond it.
pub fn detect_repeat_trap(bars: &[Bar], direction: Direction) -> bool {
    let start = bars.len().saturating_sub(REPEAT_TRAP_LOOKBACK);
    bars[start..].windows(2).any(|pair| {
        let (a, b) = (&pair[0], &pair[1]);
        match direction {
            Direction::Buy => {
                a.is_bullish() && b.is_bullish() && b.open <= a.open && b.close > a.close
            }
            Direction::Sell => {
                a.is_bearish() && b.is_bearish() && b.open >= a.open && b.close < a.close
            }
        }
    })
}
