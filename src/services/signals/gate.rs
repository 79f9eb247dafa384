//! Trade quality gate.
//!
//! Runs the sequential acceptance checks for a scored candidate and owns the
//! only state that survives between cycles: per-instrument cooldowns and the
//! daily acceptance counter.

use crate::services::signals::confluence::ConfluenceAnalyzer;
use crate::services::signals::patterns;
use crate::services::signals::scorer::VOLUME_SURGE_RATIO;
use crate::types::{
    BarSeries, CandidateSignal, Confidence, Direction, Evaluation, IndicatorPanel, Rejection,
    RiskTier, ScoreOutcome, Timeframe,
};
use chrono::{DateTime, Duration, NaiveDate, Timelike, Utc};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info};

/// Score band mapped to target and stop distances in ATRs.
#[derive(Debug, Clone, PartialEq)]
pub struct TierRule {
    pub tier: RiskTier,
    pub min_score: i32,
    pub target_atr: f64,
    pub stop_atr: f64,
}

impl TierRule {
    pub fn new(tier: RiskTier, min_score: i32, target_atr: f64, stop_atr: f64) -> Self {
        Self {
            tier,
            min_score,
            target_atr,
            stop_atr,
        }
    }
}

pub fn default_tiers() -> Vec<TierRule> {
    vec![
        TierRule::new(RiskTier::Premium, 10, 4.0, 0.8),
        TierRule::new(RiskTier::High, 8, 3.0, 0.8),
        TierRule::new(RiskTier::Medium, i32::MIN, 2.5, 0.8),
    ]
}

#[derive(Debug, Clone)]
pub struct GateConfig {
    /// Active window in UTC hours, both ends inclusive.
    pub session_start_hour: u32,
    pub session_end_hour: u32,
    pub cooldown: Duration,
    /// Base score threshold before the volatility offset.
    pub min_score: i32,
    /// Checked top to bottom; the first band the score reaches wins.
    pub tiers: Vec<TierRule>,
    pub high_volatility_ratio: f64,
    pub low_volatility_ratio: f64,
    pub min_rr_nominal: f64,
    pub min_rr_high_volatility: f64,
    pub min_rr_low_volatility: f64,
    pub min_confluence: f64,
    pub confluence_per_timeframe: f64,
    /// TP2..TP4 as multiples of the TP1 distance.
    pub take_profit_steps: [f64; 4],
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            session_start_hour: 6,
            session_end_hour: 20,
            cooldown: Duration::hours(2),
            min_score: 7,
            tiers: default_tiers(),
            high_volatility_ratio: 1.5,
            low_volatility_ratio: 0.8,
            min_rr_nominal: 2.0,
            min_rr_high_volatility: 1.8,
            min_rr_low_volatility: 2.2,
            min_confluence: 3.0,
            confluence_per_timeframe: 1.5,
            take_profit_steps: [1.0, 1.5, 2.0, 2.5],
        }
    }
}

/// Score offset and minimum risk:reward for the current ATR regime.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolatilityRegime {
    pub offset: i32,
    pub min_risk_reward: f64,
}

/// Last acceptance time per instrument.
#[derive(Debug, Clone, Default)]
pub struct CooldownState {
    last_acceptance: HashMap<String, DateTime<Utc>>,
}

impl CooldownState {
    pub fn record(&mut self, instrument: &str, at: DateTime<Utc>) {
        self.last_acceptance.insert(instrument.to_string(), at);
    }

    /// Time left before `instrument` may be accepted again.
    pub fn remaining(
        &self,
        instrument: &str,
        now: DateTime<Utc>,
        window: Duration,
    ) -> Option<Duration> {
        let last = self.last_acceptance.get(instrument)?;
        let left = *last + window - now;
        (left > Duration::zero()).then_some(left)
    }

    pub fn clear(&mut self) {
        self.last_acceptance.clear();
    }

    pub fn active(&self, now: DateTime<Utc>, window: Duration) -> Vec<CooldownEntry> {
        let mut entries: Vec<CooldownEntry> = self
            .last_acceptance
            .keys()
            .filter_map(|instrument| {
                self.remaining(instrument, now, window)
                    .map(|left| CooldownEntry {
                        instrument: instrument.clone(),
                        remaining_secs: left.num_seconds(),
                    })
            })
            .collect();
        entries.sort_by(|a, b| a.instrument.cmp(&b.instrument));
        entries
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CooldownEntry {
    pub instrument: String,
    pub remaining_secs: i64,
}

/// Accepted signals for the current UTC day.
#[derive(Debug, Clone, Default)]
pub struct DailyCounter {
    day: Option<NaiveDate>,
    accepted: u32,
}

impl DailyCounter {
    pub fn accepted(&self) -> u32 {
        self.accepted
    }

    fn increment(&mut self, now: DateTime<Utc>) {
        self.day.get_or_insert(now.date_naive());
        self.accepted += 1;
    }
}

pub struct TradeQualityGate {
    config: GateConfig,
    confluence: ConfluenceAnalyzer,
    cooldowns: CooldownState,
    daily: DailyCounter,
}

impl TradeQualityGate {
    pub fn new(config: GateConfig) -> Self {
        Self {
            config,
            confluence: ConfluenceAnalyzer::new(),
            cooldowns: CooldownState::default(),
            daily: DailyCounter::default(),
        }
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    pub fn signals_today(&self) -> u32 {
        self.daily.accepted()
    }

    pub fn active_cooldowns(&self, now: DateTime<Utc>) -> Vec<CooldownEntry> {
        self.cooldowns.active(now, self.config.cooldown)
    }

    /// Reset cooldowns and the daily counter when `now` falls on a new UTC
    /// date. Returns whether a reset happened.
    pub fn rollover(&mut self, now: DateTime<Utc>) -> bool {
        let today = now.date_naive();
        match self.daily.day {
            Some(day) if day != today => {
                info!(
                    "Daily rollover {} -> {}: {} signals, clearing cooldowns",
                    day, today, self.daily.accepted
                );
                self.cooldowns.clear();
                self.daily = DailyCounter {
                    day: Some(today),
                    accepted: 0,
                };
                true
            }
            Some(_) => false,
            None => {
                self.daily.day = Some(today);
                false
            }
        }
    }

    /// Regime from the latest ATR against its rolling mean. Missing values
    /// count as nominal.
    pub fn regime(&self, panel: &IndicatorPanel) -> VolatilityRegime {
        let c = &self.config;
        let nominal = VolatilityRegime {
            offset: 0,
            min_risk_reward: c.min_rr_nominal,
        };

        let Some((_, row)) = panel.latest() else {
            return nominal;
        };
        match (row.atr, row.atr_mean) {
            (Some(atr), Some(mean)) if atr > c.high_volatility_ratio * mean => VolatilityRegime {
                offset: 1,
                min_risk_reward: c.min_rr_high_volatility,
            },
            (Some(atr), Some(mean)) if atr < c.low_volatility_ratio * mean => VolatilityRegime {
                offset: -1,
                min_risk_reward: c.min_rr_low_volatility,
            },
            _ => nominal,
        }
    }

    /// Run every check in order. On acceptance the cooldown and daily
    /// counter are updated; rejections leave all state untouched.
    pub fn evaluate(
        &mut self,
        instrument: &str,
        panel: &IndicatorPanel,
        outcome: &ScoreOutcome,
        regime: VolatilityRegime,
        timeframes: &HashMap<Timeframe, BarSeries>,
        now: DateTime<Utc>,
    ) -> Evaluation {
        match self.check(instrument, panel, outcome, regime, timeframes, now) {
            Ok(signal) => {
                self.cooldowns.record(instrument, now);
                self.daily.increment(now);
                info!(
                    "{} {} accepted: score {}, rr {:.2}, confluence {:.1}",
                    instrument,
                    signal.direction.label(),
                    signal.score,
                    signal.risk_reward,
                    signal.confluence
                );
                Evaluation::accepted(signal)
            }
            Err(rejection) => {
                debug!("{} rejected: {}", instrument, rejection);
                Evaluation::rejected(instrument, rejection)
            }
        }
    }

    fn check(
        &self,
        instrument: &str,
        panel: &IndicatorPanel,
        outcome: &ScoreOutcome,
        regime: VolatilityRegime,
        timeframes: &HashMap<Timeframe, BarSeries>,
        now: DateTime<Utc>,
    ) -> Result<CandidateSignal, Rejection> {
        let c = &self.config;

        if !self.in_session(now) {
            return Err(Rejection::OutsideSession);
        }

        if let Some(left) = self.cooldowns.remaining(instrument, now, c.cooldown) {
            return Err(Rejection::Cooldown {
                remaining_secs: left.num_seconds(),
            });
        }

        if let Some(direction) = outcome.direction {
            if patterns::detect_repeat_trap(panel.bars.bars(), direction) {
                return Err(Rejection::RepeatTrap);
            }
        }

        let required = c.min_score + regime.offset;
        let Some(direction) = outcome.direction else {
            return Err(Rejection::NoDirection);
        };
        if outcome.score < required {
            return Err(Rejection::ScoreBelowThreshold {
                score: outcome.score,
                required,
            });
        }

        let confluence = self.confluence.analyze(timeframes, direction);
        if !confluence.is_usable() {
            return Err(Rejection::InsufficientTimeframes {
                usable: confluence.usable,
            });
        }
        let required = c
            .min_confluence
            .max(c.confluence_per_timeframe * confluence.usable as f64);
        if confluence.score < required {
            return Err(Rejection::ConfluenceBelowThreshold {
                score: confluence.score,
                required,
            });
        }

        let (bar, row) = panel.latest().ok_or(Rejection::InsufficientData)?;
        let atr = row
            .atr
            .filter(|a| *a > 0.0)
            .ok_or(Rejection::InsufficientData)?;

        let tier = self.tier_for(outcome.score);
        let entry = bar.close;
        let stop_distance = atr * tier.stop_atr;
        let target_distance = atr * tier.target_atr;
        if stop_distance <= 0.0 {
            return Err(Rejection::InsufficientData);
        }

        let risk_reward = target_distance / stop_distance;
        if risk_reward < regime.min_risk_reward {
            return Err(Rejection::RiskRewardBelowMinimum {
                rr: risk_reward,
                required: regime.min_risk_reward,
            });
        }

        let sign = direction.sign();
        let take_profits = c
            .take_profit_steps
            .map(|step| entry + sign * target_distance * step);

        Ok(CandidateSignal {
            id: CandidateSignal::new_id(),
            instrument: instrument.to_string(),
            direction,
            score: outcome.score,
            factors: outcome.factors.clone(),
            entry,
            stop_loss: entry - sign * stop_distance,
            take_profits,
            risk_reward,
            risk_tier: tier.tier,
            confidence: Confidence::from_score(outcome.score),
            atr,
            confluence: confluence.score,
            confirming_timeframes: confluence.confirming,
            volume_surge: row.vol_ratio.map_or(false, |v| v > VOLUME_SURGE_RATIO),
            trap_zone: patterns::detect_range_volume_trap(panel) || row.trap_buy || row.trap_sell,
            timestamp: now.timestamp_millis(),
        })
    }

    fn in_session(&self, now: DateTime<Utc>) -> bool {
        let hour = now.hour();
        let (start, end) = (self.config.session_start_hour, self.config.session_end_hour);
        if start <= end {
            hour >= start && hour <= end
        } else {
            hour >= start || hour <= end
        }
    }

    fn tier_for(&self, score: i32) -> TierRule {
        self.config
            .tiers
            .iter()
            .find(|t| score >= t.min_score)
            .or_else(|| self.config.tiers.last())
            .cloned()
            .unwrap_or_else(|| TierRule::new(RiskTier::Medium, i32::MIN, 2.5, 0.8))
    }
}
