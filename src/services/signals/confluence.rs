//! Multi-timeframe confluence.
//!
//! Each timeframe is checked on its own bars for agreement with a proposed
//! direction. Longer timeframes weigh more, ranked among the timeframes
//! with enough history.

use crate::services::signals::indicators::{Ema, Rsi};
use crate::types::{BarSeries, Direction, Timeframe};
use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

/// Bars a timeframe needs to take part.
pub const MIN_TIMEFRAME_BARS: usize = 15;
/// Usable timeframes required for a meaningful score.
pub const MIN_USABLE_TIMEFRAMES: usize = 2;

const EMA_CROSS_WEIGHT: f64 = 0.4;
const PRICE_VS_FAST_WEIGHT: f64 = 0.3;
const RSI_BAND_WEIGHT: f64 = 0.3;
const RSI_BAND: (f64, f64) = (25.0, 75.0);
const FULL_AGREEMENT: f64 = 0.7;
const PARTIAL_AGREEMENT: f64 = 0.4;

/// Per-timeframe breakdown.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeframeVote {
    pub timeframe: Timeframe,
    pub weight: f64,
    pub agreement: f64,
    pub awarded: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfluenceOutcome {
    pub score: f64,
    /// Timeframes with enough bars to be scored.
    pub usable: usize,
    /// Timeframes that earned any weight, shortest first.
    pub confirming: Vec<Timeframe>,
    pub votes: Vec<TimeframeVote>,
}

impl ConfluenceOutcome {
    pub fn is_usable(&self) -> bool {
        self.usable >= MIN_USABLE_TIMEFRAMES
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConfluenceAnalyzer;

impl ConfluenceAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Score agreement with `direction` across the supplied timeframes.
    ///
    /// Only timeframes with at least [`MIN_TIMEFRAME_BARS`] bars take part.
    /// Their weights run from 1 for the shortest to 5 for the longest, so a
    /// short series never shifts anyone's weight. Fewer than two usable
    /// timeframes produce a zero score and no confirmations.
    pub fn analyze(
        &self,
        timeframes: &HashMap<Timeframe, BarSeries>,
        direction: Direction,
    ) -> ConfluenceOutcome {
        let mut usable: Vec<(Timeframe, &BarSeries)> = Vec::with_capacity(timeframes.len());
        for (tf, series) in timeframes {
            if series.len() < MIN_TIMEFRAME_BARS {
                debug!("{} skipped for confluence: {} bars", tf, series.len());
                continue;
            }
            usable.push((*tf, series));
        }
        usable.sort_by_key(|(tf, _)| *tf);

        let count = usable.len();
        let mut outcome = ConfluenceOutcome {
            usable: count,
            ..Default::default()
        };

        for (rank, (tf, series)) in usable.into_iter().enumerate() {
            let weight = rank_weight(rank, count);
            let agreement = agreement(series, direction);
            let awarded = if agreement >= FULL_AGREEMENT {
                weight
            } else if agreement >= PARTIAL_AGREEMENT {
                weight / 2.0
            } else {
                0.0
            };

            if awarded > 0.0 {
                outcome.confirming.push(tf);
            }
            outcome.score += awarded;
            outcome.votes.push(TimeframeVote {
                timeframe: tf,
                weight,
                agreement,
                awarded,
            });
        }

        if !outcome.is_usable() {
            debug!(
                "Confluence unavailable: {} usable timeframes",
                outcome.usable
            );
            return ConfluenceOutcome {
                usable: outcome.usable,
                ..Default::default()
            };
        }

        outcome
    }
}

/// 1 for the shortest, 5 for the longest, spread evenly between.
fn rank_weight(rank: usize, count: usize) -> f64 {
    if count <= 1 {
        return 1.0;
    }
    1.0 + (4.0 * rank as f64 / (count - 1) as f64).round()
}

/// EMA pair and RSI period sized to the available history.
fn adaptive_periods(len: usize) -> (usize, usize, usize) {
    let fast = (len / 4).clamp(3, 9);
    let slow = (len / 2).clamp(fast + 1, 21);
    let rsi = 14.min(len.saturating_sub(1)).max(1);
    (fast, slow, rsi)
}

/// Share of checks (0.0 to 1.0) agreeing with `direction`.
fn agreement(series: &BarSeries, direction: Direction) -> f64 {
    let closes = series.closes();
    let (fast_period, slow_period, rsi_period) = adaptive_periods(closes.len());

    let fast = Ema::over(&closes, fast_period);
    let slow = Ema::over(&closes, slow_period);
    let rsi = Rsi::over(&closes, rsi_period);

    let (Some(price), Some(fast), Some(slow)) = (closes.last(), fast.last(), slow.last()) else {
        return 0.0;
    };

    let mut score = 0.0;
    let (cross, above) = match direction {
        Direction::Buy => (fast > slow, price > fast),
        Direction::Sell => (fast < slow, price < fast),
    };
    if cross {
        score += EMA_CROSS_WEIGHT;
    }
    if above {
        score += PRICE_VS_FAST_WEIGHT;
    }
    if let Some(Some(value)) = rsi.last() {
        if *value >= RSI_BAND.0 && *value <= RSI_BAND.1 {
            score += RSI_BAND_WEIGHT;
        }
    }
    score
}
