//! Weighted signal scoring.
//!
//! Direction comes from the trend alignment alone. Every other component
//! adds or subtracts points for that direction and is recorded as a
//! [`Factor`]. Missing indicator values contribute nothing.

use crate::services::signals::patterns;
use crate::types::{Bar, Direction, Factor, IndicatorPanel, IndicatorRow, ScoreOutcome};
use tracing::debug;

/// Point values for each scoring component.
#[derive(Debug, Clone)]
pub struct ScoreWeights {
    pub trend: i32,
    pub rsi_extreme: i32,
    pub rsi_zone: i32,
    pub macd: i32,
    pub stochastic: i32,
    pub smart_money: i32,
    pub accumulation: i32,
    pub volume_surge: i32,
    pub dominant_body: i32,
    pub rejection_wick: i32,
    pub level_touch: i32,
    pub structure: i32,
    pub big_move: i32,
    pub strong_trend: i32,
    pub order_block: i32,
    pub fvg: i32,
    pub opposing_trap: i32,
    pub false_breakout: i32,
    pub context: i32,
    pub sideways: i32,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            trend: 3,
            rsi_extreme: 2,
            rsi_zone: 1,
            macd: 1,
            stochastic: 1,
            smart_money: 2,
            accumulation: 1,
            volume_surge: 1,
            dominant_body: 1,
            rejection_wick: 1,
            level_touch: 1,
            structure: 1,
            big_move: 2,
            strong_trend: 1,
            order_block: 2,
            fvg: 1,
            opposing_trap: -2,
            false_breakout: -3,
            context: 1,
            sideways: -2,
        }
    }
}

/// Volume ratio above which a bar counts as a surge.
pub const VOLUME_SURGE_RATIO: f64 = 2.0;
/// Running score needed before the big-move context bonus applies.
const CONTEXT_MIN_SCORE: i32 = 6;
/// Tolerance for touching support or resistance.
const LEVEL_TOLERANCE: f64 = 0.002;

#[derive(Debug, Clone, Default)]
pub struct SignalScorer {
    weights: ScoreWeights,
}

/// Running total plus the factors that produced it.
struct Tally {
    score: i32,
    factors: Vec<Factor>,
}

impl Tally {
    fn add(&mut self, name: &str, points: i32) {
        if points == 0 {
            return;
        }
        self.score += points;
        self.factors.push(Factor::new(name, points));
    }

    fn add_if(&mut self, condition: bool, name: &str, points: i32) {
        if condition {
            self.add(name, points);
        }
    }
}

impl SignalScorer {
    pub fn new(weights: ScoreWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &ScoreWeights {
        &self.weights
    }

    /// Score the latest bar of `panel`. `volatility_offset` is the regime
    /// adjustment computed by the gate.
    pub fn score(&self, panel: &IndicatorPanel, volatility_offset: i32) -> ScoreOutcome {
        let (Some((bar, row)), Some((_, prev))) = (panel.latest(), panel.previous()) else {
            debug!("Scoring skipped: panel has no derived rows");
            return ScoreOutcome::none();
        };

        let Some(direction) = Direction::from_alignment(row.trend_alignment) else {
            return ScoreOutcome::none();
        };

        let w = &self.weights;
        let mut tally = Tally {
            score: 0,
            factors: Vec::new(),
        };

        tally.add("Trend alignment", w.trend);
        self.momentum(direction, row, prev, &mut tally);
        self.flow(direction, row, &mut tally);
        self.price_action(direction, bar, row, prev, &mut tally);
        self.structure(direction, row, &mut tally);
        self.zones(direction, row, &mut tally);
        self.breakouts(direction, panel, bar, row, &mut tally);

        tally.add("Volatility regime", volatility_offset);

        let big_move = row.big_move_up || row.big_move_down;
        tally.add_if(
            big_move && tally.score >= CONTEXT_MIN_SCORE,
            "Active big move",
            w.context,
        );
        tally.add_if(row.sideways_market, "Sideways market", w.sideways);

        ScoreOutcome {
            score: tally.score,
            direction: Some(direction),
            factors: tally.factors,
        }
    }

    fn momentum(
        &self,
        direction: Direction,
        row: &IndicatorRow,
        prev: &IndicatorRow,
        tally: &mut Tally,
    ) {
        let w = &self.weights;

        if let Some(rsi) = row.rsi {
            match direction {
                Direction::Buy if rsi < 30.0 => tally.add("RSI oversold", w.rsi_extreme),
                Direction::Buy if rsi < 45.0 => tally.add("RSI pullback", w.rsi_zone),
                Direction::Sell if rsi > 70.0 => tally.add("RSI overbought", w.rsi_extreme),
                Direction::Sell if rsi > 55.0 => tally.add("RSI rally", w.rsi_zone),
                _ => {}
            }
        }

        if let (Some(hist), Some(prev_hist), Some(macd), Some(signal)) =
            (row.macd_hist, prev.macd_hist, row.macd, row.macd_signal)
        {
            let confirms = match direction {
                Direction::Buy => hist > prev_hist && macd > signal,
                Direction::Sell => hist < prev_hist && macd < signal,
            };
            tally.add_if(confirms, "MACD acceleration", w.macd);
        }

        if let (Some(k), Some(d)) = (row.stoch_k, row.stoch_d) {
            let confirms = match direction {
                Direction::Buy => k < 20.0 && k > d,
                Direction::Sell => k > 80.0 && k < d,
            };
            tally.add_if(confirms, "Stochastic cross", w.stochastic);
        }
    }

    fn flow(&self, direction: Direction, row: &IndicatorRow, tally: &mut Tally) {
        let w = &self.weights;

        tally.add_if(row.smart_money, "Smart money", w.smart_money);
        match direction {
            Direction::Buy => tally.add_if(row.accumulation, "Accumulation", w.accumulation),
            Direction::Sell => tally.add_if(row.distribution, "Distribution", w.accumulation),
        }
        tally.add_if(
            row.vol_ratio.map_or(false, |v| v > VOLUME_SURGE_RATIO),
            "Volume surge",
            w.volume_surge,
        );
    }

    fn price_action(
        &self,
        direction: Direction,
        bar: &Bar,
        row: &IndicatorRow,
        prev: &IndicatorRow,
        tally: &mut Tally,
    ) {
        let w = &self.weights;
        if row.total_range <= 0.0 {
            return;
        }

        let with_direction = match direction {
            Direction::Buy => bar.is_bullish(),
            Direction::Sell => bar.is_bearish(),
        };
        tally.add_if(
            with_direction && row.body_size > 0.6 * row.total_range,
            "Dominant body",
            w.dominant_body,
        );

        let (wick, wick_name) = match direction {
            Direction::Buy => (row.lower_shadow, "Bullish rejection wick"),
            Direction::Sell => (row.upper_shadow, "Bearish rejection wick"),
        };
        tally.add_if(wick > 2.0 * row.body_size, wick_name, w.rejection_wick);

        // Levels from the prior bar so the current bar cannot define its own touch.
        match direction {
            Direction::Buy => {
                if let Some(support) = prev.support {
                    tally.add_if(
                        bar.low <= support * (1.0 + LEVEL_TOLERANCE),
                        "Support bounce",
                        w.level_touch,
                    );
                }
            }
            Direction::Sell => {
                if let Some(resistance) = prev.resistance {
                    tally.add_if(
                        bar.high >= resistance * (1.0 - LEVEL_TOLERANCE),
                        "Resistance rejection",
                        w.level_touch,
                    );
                }
            }
        }
    }

    fn structure(&self, direction: Direction, row: &IndicatorRow, tally: &mut Tally) {
        let w = &self.weights;
        match direction {
            Direction::Buy => {
                tally.add_if(row.higher_high, "Higher high", w.structure);
                tally.add_if(row.big_move_up, "Big move up", w.big_move);
            }
            Direction::Sell => {
                tally.add_if(row.lower_low, "Lower low", w.structure);
                tally.add_if(row.big_move_down, "Big move down", w.big_move);
            }
        }
        tally.add_if(row.strong_trend, "Strong trend", w.strong_trend);
    }

    fn zones(&self, direction: Direction, row: &IndicatorRow, tally: &mut Tally) {
        let w = &self.weights;
        match direction {
            Direction::Buy => {
                tally.add_if(row.bullish_ob, "Bullish order block", w.order_block);
                tally.add_if(row.fvg_up, "FVG up", w.fvg);
                tally.add_if(row.trap_buy, "Buy trap", w.opposing_trap);
            }
            Direction::Sell => {
                tally.add_if(row.bearish_ob, "Bearish order block", w.order_block);
                tally.add_if(row.fvg_down, "FVG down", w.fvg);
                tally.add_if(row.trap_sell, "Sell trap", w.opposing_trap);
            }
        }
    }

    fn breakouts(
        &self,
        direction: Direction,
        panel: &IndicatorPanel,
        bar: &Bar,
        row: &IndicatorRow,
        tally: &mut Tally,
    ) {
        let bars = panel.bars.bars();

        if patterns::detect_breakout(bars) == Some(direction) {
            tally.add("Breakout", patterns::breakout_strength(bar, row));
        }
        if patterns::detect_false_breakout(bars) == Some(direction) {
            tally.add("False breakout", self.weights.false_breakout);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BarSeries;

    /// Quiet two-bar panel: small alternating candles, nothing but the trend set.
    fn create_panel(alignment: i8) -> IndicatorPanel {
        let bars = BarSeries::new(vec![
            Bar {
                time: 1000000,
                open: 100.0,
                high: 100.6,
                low: 99.8,
                close: 100.4,
                volume: 1000.0,
            },
            Bar {
                time: 1060000,
                open: 100.4,
                high: 100.7,
                low: 100.35,
                close: 100.6,
                volume: 1000.0,
            },
        ]);
        let rows = bars
            .bars()
            .iter()
            .map(|b| IndicatorRow {
                trend_alignment: alignment,
                body_size: b.body(),
                upper_shadow: b.upper_shadow(),
                lower_shadow: b.lower_shadow(),
                total_range: b.range(),
                ..Default::default()
            })
            .collect();
        IndicatorPanel { bars, rows }
    }

    fn last_row(panel: &mut IndicatorPanel) -> &mut IndicatorRow {
        let n = panel.rows.len();
        &mut panel.rows[n - 1]
    }

    #[test]
    fn test_neutral_alignment_short_circuits() {
        let mut panel = create_panel(0);
        last_row(&mut panel).smart_money = true;
        let outcome = SignalScorer::default().score(&panel, 1);
        assert_eq!(outcome, ScoreOutcome::none());
    }

    #[test]
    fn test_underived_panel_scores_nothing() {
        let panel = IndicatorPanel::raw(BarSeries::empty());
        assert_eq!(SignalScorer::default().score(&panel, 0), ScoreOutcome::none());
    }

    #[test]
    fn test_trend_only() {
        let outcome = SignalScorer::default().score(&create_panel(1), 0);
        assert_eq!(outcome.direction, Some(Direction::Buy));
        assert_eq!(outcome.score, 3);
        assert_eq!(outcome.factors, vec![Factor::new("Trend alignment", 3)]);
    }

    #[test]
    fn test_rsi_zones_by_direction() {
        let scorer = SignalScorer::default();

        let mut buy = create_panel(1);
        last_row(&mut buy).rsi = Some(28.0);
        assert_eq!(scorer.score(&buy, 0).score, 5);
        last_row(&mut buy).rsi = Some(40.0);
        assert_eq!(scorer.score(&buy, 0).score, 4);
        last_row(&mut buy).rsi = Some(75.0);
        assert_eq!(scorer.score(&buy, 0).score, 3);

        let mut sell = create_panel(-1);
        last_row(&mut sell).rsi = Some(75.0);
        let outcome = scorer.score(&sell, 0);
        assert_eq!(outcome.direction, Some(Direction::Sell));
        assert_eq!(outcome.score, 5);
    }

    #[test]
    fn test_macd_needs_acceleration() {
        let mut panel = create_panel(1);
        panel.rows[0].macd_hist = Some(0.1);
        let row = last_row(&mut panel);
        row.macd = Some(0.5);
        row.macd_signal = Some(0.3);
        row.macd_hist = Some(0.2);
        assert_eq!(SignalScorer::default().score(&panel, 0).score, 4);

        last_row(&mut panel).macd_hist = Some(0.05);
        assert_eq!(SignalScorer::default().score(&panel, 0).score, 3);
    }

    #[test]
    fn test_sideways_subtracts_two() {
        let mut panel = create_panel(1);
        {
            let row = last_row(&mut panel);
            row.rsi = Some(28.0);
            row.smart_money = true;
        }
        let base = SignalScorer::default().score(&panel, 0).score;
        last_row(&mut panel).sideways_market = true;
        let penalized = SignalScorer::default().score(&panel, 0);
        assert_eq!(penalized.score, base - 2);
        assert_eq!(
            penalized.factors.last(),
            Some(&Factor::new("Sideways market", -2))
        );
    }

    #[test]
    fn test_opposing_trap_penalty() {
        let mut panel = create_panel(1);
        last_row(&mut panel).trap_buy = true;
        assert_eq!(SignalScorer::default().score(&panel, 0).score, 1);

        // A sell trap does not oppose a buy.
        let mut panel = create_panel(1);
        last_row(&mut panel).trap_sell = true;
        assert_eq!(SignalScorer::default().score(&panel, 0).score, 3);
    }

    #[test]
    fn test_context_bonus_needs_running_score() {
        let mut panel = create_panel(1);
        last_row(&mut panel).big_move_up = true;
        // 3 trend + 2 big move stays below the context threshold.
        assert_eq!(SignalScorer::default().score(&panel, 0).score, 5);

        last_row(&mut panel).strong_trend = true;
        let outcome = SignalScorer::default().score(&panel, 0);
        assert_eq!(outcome.score, 7);
        assert!(outcome.factors.contains(&Factor::new("Active big move", 1)));
    }

    #[test]
    fn test_volatility_offset_recorded() {
        let outcome = SignalScorer::default().score(&create_panel(1), -1);
        assert_eq!(outcome.score, 2);
        assert!(outcome
            .factors
            .contains(&Factor::new("Volatility regime", -1)));
    }

    #[test]
    fn test_each_positive_condition_never_lowers_score() {
        let scorer = SignalScorer::default();
        let base = scorer.score(&create_panel(1), 0).score;

        let toggles: Vec<fn(&mut IndicatorRow)> = vec![
            |r| r.rsi = Some(28.0),
            |r| r.stoch_k = Some(15.0),
            |r| r.smart_money = true,
            |r| r.accumulation = true,
            |r| r.vol_ratio = Some(2.5),
            |r| r.higher_high = true,
            |r| r.big_move_up = true,
            |r| r.strong_trend = true,
            |r| r.bullish_ob = true,
            |r| r.fvg_up = true,
        ];
        for toggle in toggles {
            let mut panel = create_panel(1);
            toggle(last_row(&mut panel));
            assert!(scorer.score(&panel, 0).score >= base);
        }
    }
}
