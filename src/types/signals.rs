use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Timeframe;

/// Trade direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Buy,
    Sell,
}

impl Direction {
    /// Direction matching a trend-alignment sign.
    pub fn from_alignment(alignment: i8) -> Option<Self> {
        match alignment {
            1 => Some(Direction::Buy),
            -1 => Some(Direction::Sell),
            _ => None,
        }
    }

    /// +1.0 for buys, -1.0 for sells.
    pub fn sign(&self) -> f64 {
        match self {
            Direction::Buy => 1.0,
            Direction::Sell => -1.0,
        }
    }

    pub fn opposite(&self) -> Self {
        match self {
            Direction::Buy => Direction::Sell,
            Direction::Sell => Direction::Buy,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Direction::Buy => "BUY",
            Direction::Sell => "SELL",
        }
    }
}

/// Risk tier derived from score bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskTier {
    Premium,
    High,
    Medium,
}

impl RiskTier {
    pub fn name(&self) -> &'static str {
        match self {
            RiskTier::Premium => "Premium",
            RiskTier::High => "High",
            RiskTier::Medium => "Medium",
        }
    }
}

/// Confidence label shown on alerts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    UltraHigh,
    High,
    Medium,
    Low,
}

impl Confidence {
    pub fn from_score(score: i32) -> Self {
        match score {
            s if s >= 16 => Confidence::UltraHigh,
            s if s >= 12 => Confidence::High,
            s if s >= 8 => Confidence::Medium,
            _ => Confidence::Low,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Confidence::UltraHigh => "ULTRA HIGH",
            Confidence::High => "HIGH",
            Confidence::Medium => "MEDIUM",
            Confidence::Low => "LOW",
        }
    }
}

/// A named contribution to the signal score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Factor {
    pub name: String,
    pub points: i32,
}

impl Factor {
    pub fn new(name: &str, points: i32) -> Self {
        Self {
            name: name.to_string(),
            points,
        }
    }
}

impl std::fmt::Display for Factor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({:+})", self.name, self.points)
    }
}

/// Signal scorer result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreOutcome {
    pub score: i32,
    pub direction: Option<Direction>,
    pub factors: Vec<Factor>,
}

impl ScoreOutcome {
    /// The `(0, None, [])` result.
    pub fn none() -> Self {
        Self::default()
    }
}

/// Accepted trade proposal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateSignal {
    pub id: String,
    pub instrument: String,
    pub direction: Direction,
    pub score: i32,
    pub factors: Vec<Factor>,
    pub entry: f64,
    pub stop_loss: f64,
    /// TP1..TP4, each further from entry than the previous.
    pub take_profits: [f64; 4],
    pub risk_reward: f64,
    pub risk_tier: RiskTier,
    pub confidence: Confidence,
    pub atr: f64,
    pub confluence: f64,
    pub confirming_timeframes: Vec<Timeframe>,
    pub volume_surge: bool,
    pub trap_zone: bool,
    /// Acceptance time (unix ms).
    pub timestamp: i64,
}

impl CandidateSignal {
    pub fn new_id() -> String {
        Uuid::new_v4().to_string()
    }
}

/// Why an evaluation produced no signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Rejection {
    InsufficientData,
    OutsideSession,
    Cooldown { remaining_secs: i64 },
    RepeatTrap,
    NoDirection,
    ScoreBelowThreshold { score: i32, required: i32 },
    InsufficientTimeframes { usable: usize },
    ConfluenceBelowThreshold { score: f64, required: f64 },
    RiskRewardBelowMinimum { rr: f64, required: f64 },
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rejection::InsufficientData => write!(f, "insufficient data"),
            Rejection::OutsideSession => write!(f, "outside trading session"),
            Rejection::Cooldown { remaining_secs } => {
                write!(f, "cooldown active ({}s remaining)", remaining_secs)
            }
            Rejection::RepeatTrap => write!(f, "repeat trap pattern in recent bars"),
            Rejection::NoDirection => write!(f, "no trend direction"),
            Rejection::ScoreBelowThreshold { score, required } => {
                write!(f, "score {} below required {}", score, required)
            }
            Rejection::InsufficientTimeframes { usable } => {
                write!(f, "only {} usable timeframes", usable)
            }
            Rejection::ConfluenceBelowThreshold { score, required } => {
                write!(f, "confluence {:.1} below required {:.1}", score, required)
            }
            Rejection::RiskRewardBelowMinimum { rr, required } => {
                write!(f, "risk:reward {:.2} below minimum {:.2}", rr, required)
            }
        }
    }
}

/// Outcome of one evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Evaluation {
    pub instrument: String,
    pub accepted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signal: Option<CandidateSignal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection: Option<Rejection>,
}

impl Evaluation {
    pub fn accepted(signal: CandidateSignal) -> Self {
        Self {
            instrument: signal.instrument.clone(),
            accepted: true,
            signal: Some(signal),
            rejection: None,
        }
    }

    pub fn rejected(instrument: &str, rejection: Rejection) -> Self {
        Self {
            instrument: instrument.to_string(),
            accepted: false,
            signal: None,
            rejection: Some(rejection),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_from_alignment() {
        assert_eq!(Direction::from_alignment(1), Some(Direction::Buy));
        assert_eq!(Direction::from_alignment(-1), Some(Direction::Sell));
        assert_eq!(Direction::from_alignment(0), None);
    }

    #[test]
    fn test_confidence_bands() {
        assert_eq!(Confidence::from_score(16), Confidence::UltraHigh);
        assert_eq!(Confidence::from_score(12), Confidence::High);
        assert_eq!(Confidence::from_score(9), Confidence::Medium);
        assert_eq!(Confidence::from_score(7), Confidence::Low);
    }

    #[test]
    fn test_direction_serializes_uppercase() {
        let json = serde_json::to_string(&Direction::Buy).unwrap();
        assert_eq!(json, "\"BUY\"");
    }

    #[test]
    fn test_rejection_serializes_with_reason_tag() {
        let json = serde_json::to_value(Rejection::Cooldown { remaining_secs: 60 }).unwrap();
        assert_eq!(json["reason"], "cooldown");
        assert_eq!(json["remaining_secs"], 60);
    }

    #[test]
    fn test_factor_display() {
        assert_eq!(Factor::new("Sideways market", -2).to_string(), "Sideways market (-2)");
    }
}
