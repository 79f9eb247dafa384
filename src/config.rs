use crate::services::signals::GateConfig;
use crate::types::Timeframe;
use chrono::Duration;
use std::env;

/// Telegram delivery credentials. Both values come from the environment.
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    /// Bot token issued by BotFather.
    pub bot_token: String,
    /// Destination chat ID.
    pub chat_id: String,
}

/// Longest accepted cooldown: one week.
pub const MAX_COOLDOWN_MINUTES: i64 = 10_080;

/// Gate settings exposed to the environment.
#[derive(Debug, Clone)]
pub struct GateSettings {
    /// First UTC hour of the trading session (inclusive).
    pub session_start_hour: u32,
    /// Last UTC hour of the trading session (inclusive).
    pub session_end_hour: u32,
    /// Minutes an instrument stays locked after an accepted signal.
    pub cooldown_minutes: i64,
    /// Base score threshold.
    pub min_score: i32,
}

impl Default for GateSettings {
    fn default() -> Self {
        Self {
            session_start_hour: 6,
            session_end_hour: 20,
            cooldown_minutes: 120,
            min_score: 7,
        }
    }
}

impl GateSettings {
    /// Full gate configuration with these settings applied.
    pub fn to_gate_config(&self) -> GateConfig {
        GateConfig {
            session_start_hour: self.session_start_hour,
            session_end_hour: self.session_end_hour,
            cooldown: Duration::minutes(self.cooldown_minutes.clamp(0, MAX_COOLDOWN_MINUTES)),
            min_score: self.min_score,
            ..Default::default()
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host address.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Instruments evaluated each cycle, in order.
    pub instruments: Vec<String>,
    /// Timeframes fetched per instrument. Always contains the primary.
    pub timeframes: Vec<Timeframe>,
    /// Timeframe that drives scoring.
    pub primary_timeframe: Timeframe,
    /// Seconds between evaluation cycles.
    pub cycle_interval_secs: u64,
    /// Delay between provider calls.
    pub request_delay_ms: u64,
    /// Alpha Vantage API key.
    pub alpha_vantage_api_key: Option<String>,
    /// Telegram delivery, when both token and chat ID are set.
    pub telegram: Option<TelegramConfig>,
    pub gate: GateSettings,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port: u16 = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(5000);

        let instruments = env::var("INSTRUMENTS")
            .ok()
            .map(|s| parse_list(&s))
            .filter(|list| !list.is_empty())
            .unwrap_or_else(|| vec!["XAUUSD".to_string()]);

        let primary_timeframe = env::var("PRIMARY_TIMEFRAME")
            .ok()
            .and_then(|s| Timeframe::from_str(&s))
            .unwrap_or(Timeframe::M15);

        let timeframes = env::var("TIMEFRAMES")
            .ok()
            .map(|s| parse_timeframes(&s))
            .filter(|list| !list.is_empty())
            .unwrap_or_else(default_timeframes);

        let telegram = match (env::var("TELEGRAM_BOT_TOKEN"), env::var("TELEGRAM_CHAT_ID")) {
            (Ok(bot_token), Ok(chat_id)) if !bot_token.is_empty() && !chat_id.is_empty() => {
                Some(TelegramConfig { bot_token, chat_id })
            }
            _ => None,
        };

        Self {
            host,
            port,
            instruments,
            timeframes: with_primary(timeframes, primary_timeframe),
            primary_timeframe,
            cycle_interval_secs: env::var("CYCLE_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(300),
            request_delay_ms: env::var("REQUEST_DELAY_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(1500),
            alpha_vantage_api_key: env::var("ALPHA_VANTAGE_API_KEY")
                .ok()
                .filter(|k| !k.is_empty()),
            telegram,
            gate: GateSettings {
                session_start_hour: env::var("SESSION_START_HOUR")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .filter(|h| *h < 24)
                    .unwrap_or(6),
                session_end_hour: env::var("SESSION_END_HOUR")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .filter(|h| *h < 24)
                    .unwrap_or(20),
                cooldown_minutes: env::var("COOLDOWN_MINUTES")
                    .ok()
                    .and_then(|v| parse_cooldown_minutes(&v))
                    .unwrap_or(120),
                min_score: env::var("MIN_SCORE")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(7),
            },
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

fn default_timeframes() -> Vec<Timeframe> {
    vec![
        Timeframe::M5,
        Timeframe::M15,
        Timeframe::M30,
        Timeframe::H1,
        Timeframe::H4,
    ]
}

/// Split a comma separated list, trimming and upper-casing entries.
pub fn parse_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(|item| item.trim().to_uppercase())
        .filter(|item| !item.is_empty())
        .collect()
}

/// Parse timeframe labels, skipping unknown ones. Result is sorted and unique.
pub fn parse_timeframes(s: &str) -> Vec<Timeframe> {
    let mut out: Vec<Timeframe> = s.split(',').filter_map(Timeframe::from_str).collect();
    out.sort();
    out.dedup();
    out
}

/// Cooldown in minutes, rejected when negative or longer than a week.
pub fn parse_cooldown_minutes(s: &str) -> Option<i64> {
    s.trim()
        .parse()
        .ok()
        .filter(|m| (0..=MAX_COOLDOWN_MINUTES).contains(m))
}

fn with_primary(mut timeframes: Vec<Timeframe>, primary: Timeframe) -> Vec<Timeframe> {
    if !timeframes.contains(&primary) {
        timeframes.push(primary);
        timeframes.sort();
    }
    timeframes
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // GateSettings Tests
    // =========================================================================

    #[test]
    fn test_gate_settings_default() {
        let settings = GateSettings::default();
        assert_eq!(settings.session_start_hour, 6);
        assert_eq!(settings.session_end_hour, 20);
        assert_eq!(settings.cooldown_minutes, 120);
        assert_eq!(settings.min_score, 7);
    }

    #[test]
    fn test_gate_settings_to_gate_config() {
        let settings = GateSettings {
            session_start_hour: 7,
            session_end_hour: 16,
            cooldown_minutes: 30,
            min_score: 9,
        };
        let gate = settings.to_gate_config();
        assert_eq!(gate.session_start_hour, 7);
        assert_eq!(gate.session_end_hour, 16);
        assert_eq!(gate.cooldown, Duration::minutes(30));
        assert_eq!(gate.min_score, 9);
        assert_eq!(gate.min_rr_nominal, 2.0);
    }

    // =========================================================================
    // Parsing Tests
    // =========================================================================

    #[test]
    fn test_parse_list() {
        assert_eq!(parse_list(" xauusd, EURUSD ,,"), vec!["XAUUSD", "EURUSD"]);
        assert!(parse_list("").is_empty());
    }

    #[test]
    fn test_parse_timeframes() {
        assert_eq!(
            parse_timeframes("4h,15min,bogus,60min,15min"),
            vec![Timeframe::M15, Timeframe::H1, Timeframe::H4]
        );
    }

    #[test]
    fn test_parse_cooldown_minutes() {
        assert_eq!(parse_cooldown_minutes("45"), Some(45));
        assert_eq!(parse_cooldown_minutes(" 0 "), Some(0));
        assert_eq!(parse_cooldown_minutes("10080"), Some(MAX_COOLDOWN_MINUTES));
        assert_eq!(parse_cooldown_minutes("10081"), None);
        assert_eq!(parse_cooldown_minutes("-5"), None);
        assert_eq!(parse_cooldown_minutes("9223372036854775807"), None);
        assert_eq!(parse_cooldown_minutes("soon"), None);
    }

    #[test]
    fn test_gate_config_clamps_cooldown() {
        let settings = GateSettings {
            cooldown_minutes: i64::MAX,
            ..Default::default()
        };
        let gate = settings.to_gate_config();
        assert_eq!(gate.cooldown, Duration::minutes(MAX_COOLDOWN_MINUTES));
    }

    #[test]
    fn test_with_primary_added() {
        let tfs = with_primary(vec![Timeframe::H1, Timeframe::H4], Timeframe::M15);
        assert_eq!(tfs, vec![Timeframe::M15, Timeframe::H1, Timeframe::H4]);

        let unchanged = with_primary(default_timeframes(), Timeframe::M15);
        assert_eq!(unchanged.len(), 5);
    }

    // =========================================================================
    // Config Tests
    // =========================================================================

    #[test]
    fn test_config_creation() {
        let config = Config {
            host: "127.0.0.1".to_string(),
            port: 8080,
            instruments: vec!["XAUUSD".to_string()],
            timeframes: default_timeframes(),
            primary_timeframe: Timeframe::M15,
            cycle_interval_secs: 60,
            request_delay_ms: 0,
            alpha_vantage_api_key: Some("key".to_string()),
            telegram: Some(TelegramConfig {
                bot_token: "token".to_string(),
                chat_id: "chat".to_string(),
            }),
            gate: GateSettings::default(),
        };

        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8080);
        assert!(config.timeframes.contains(&config.primary_timeframe));
        assert!(config.telegram.is_some());
    }
}
