//! Evaluation entry point: calculator, scorer and gate wired together.

use crate::services::signals::calculator::{IndicatorCalculator, IndicatorParams};
use crate::services::signals::gate::{CooldownEntry, GateConfig, TradeQualityGate};
use crate::services::signals::scorer::{ScoreWeights, SignalScorer};
use crate::types::{BarSeries, Evaluation, IndicatorPanel, Rejection, Timeframe};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

/// Snapshot of the engine's persistent state.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineStatus {
    pub primary_timeframe: Timeframe,
    pub signals_today: u32,
    pub active_cooldowns: Vec<CooldownEntry>,
}

pub struct SignalEngine {
    calculator: IndicatorCalculator,
    scorer: SignalScorer,
    gate: TradeQualityGate,
    primary: Timeframe,
}

impl SignalEngine {
    pub fn new(
        primary: Timeframe,
        params: IndicatorParams,
        weights: ScoreWeights,
        gate: GateConfig,
    ) -> Self {
        Self {
            calculator: IndicatorCalculator::new(params),
            scorer: SignalScorer::new(weights),
            gate: TradeQualityGate::new(gate),
            primary,
        }
    }

    /// Engine with default indicator parameters and weights.
    pub fn with_gate(primary: Timeframe, gate: GateConfig) -> Self {
        Self::new(primary, IndicatorParams::default(), ScoreWeights::default(), gate)
    }

    pub fn primary(&self) -> Timeframe {
        self.primary
    }

    pub fn calculator(&self) -> &IndicatorCalculator {
        &self.calculator
    }

    pub fn gate(&self) -> &TradeQualityGate {
        &self.gate
    }

    /// Daily boundary check, once per cycle.
    pub fn rollover(&mut self, now: DateTime<Utc>) -> bool {
        self.gate.rollover(now)
    }

    pub fn status(&self, now: DateTime<Utc>) -> EngineStatus {
        EngineStatus {
            primary_timeframe: self.primary,
            signals_today: self.gate.signals_today(),
            active_cooldowns: self.gate.active_cooldowns(now),
        }
    }

    /// Evaluate one instrument from its per-timeframe bars. The primary
    /// timeframe drives scoring; every supplied timeframe feeds confluence.
    pub fn evaluate(
        &mut self,
        instrument: &str,
        timeframes: &HashMap<Timeframe, BarSeries>,
        now: DateTime<Utc>,
    ) -> Evaluation {
        let Some(series) = timeframes.get(&self.primary) else {
            debug!("{}: no {} bars supplied", instrument, self.primary);
            return Evaluation::rejected(instrument, Rejection::InsufficientData);
        };

        let panel = self.calculator.compute_for(series, self.primary);
        if !panel.is_derived() {
            return Evaluation::rejected(instrument, Rejection::InsufficientData);
        }

        self.evaluate_panel(instrument, &panel, timeframes, now)
    }

    /// Score and gate an already derived panel.
    pub fn evaluate_panel(
        &mut self,
        instrument: &str,
        panel: &IndicatorPanel,
        timeframes: &HashMap<Timeframe, BarSeries>,
        now: DateTime<Utc>,
    ) -> Evaluation {
        let regime = self.gate.regime(panel);
        let outcome = self.scorer.score(panel, regime.offset);
        debug!(
            "{}: score {} {:?} ({} factors)",
            instrument,
            outcome.score,
            outcome.direction,
            outcome.factors.len()
        );
        self.gate
            .evaluate(instrument, panel, &outcome, regime, timeframes, now)
    }
}
