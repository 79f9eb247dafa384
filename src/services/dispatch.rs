//! Alert delivery.
//!
//! Dispatchers sit after the gate. A failed delivery is logged by the caller
//! and has no effect on cooldowns or counters.

use crate::config::TelegramConfig;
use crate::error::{AppError, Result};
use crate::types::CandidateSignal;
use chrono::{TimeZone, Utc};
use reqwest::Client;
use serde_json::json;
use std::future::Future;
use std::pin::Pin;
use tracing::{debug, info};

const TELEGRAM_API_URL: &str = "https://api.telegram.org";

/// Delivers alerts somewhere a human will see them.
pub trait AlertDispatcher: Send + Sync {
    fn name(&self) -> &str;

    /// Deliver an already formatted message.
    fn send_text<'a>(
        &'a self,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

    /// Deliver an accepted signal as a [`render_alert`] summary.
    fn dispatch<'a>(
        &'a self,
        signal: &'a CandidateSignal,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            let text = render_alert(signal);
            self.send_text(&text).await?;
            debug!("Alert {} delivered via {}", signal.id, self.name());
            Ok(())
        })
    }
}

/// Plain-text alert summary.
pub fn render_alert(signal: &CandidateSignal) -> String {
    let time = Utc
        .timestamp_millis_opt(signal.timestamp)
        .single()
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| signal.timestamp.to_string());

    let timeframes = if signal.confirming_timeframes.is_empty() {
        "none".to_string()
    } else {
        signal
            .confirming_timeframes
            .iter()
            .map(|tf| tf.label())
            .collect::<Vec<_>>()
            .join(", ")
    };

    let mut out = format!(
        "SNIPER ALERT: {} {}\n\
         Entry: {:.5}\n\
         Stop Loss: {:.5}\n\
         TP1: {:.5}\n\
         TP2: {:.5}\n\
         TP3: {:.5}\n\
         TP4: {:.5}\n\
         Risk:Reward: {:.2} ({} tier)\n\
         Score: {}/20 ({})\n\
         Confluence: {:.1} [{}]\n\
         Trap Zone: {}\n\
         Volume Surge: {}\n\
         ATR: {:.5}\n\
         Time: {}\n",
        signal.direction.label(),
        signal.instrument,
        signal.entry,
        signal.stop_loss,
        signal.take_profits[0],
        signal.take_profits[1],
        signal.take_profits[2],
        signal.take_profits[3],
        signal.risk_reward,
        signal.risk_tier.name(),
        signal.score,
        signal.confidence.label(),
        signal.confluence,
        timeframes,
        if signal.trap_zone { "YES" } else { "NO" },
        if signal.volume_surge { "YES" } else { "NO" },
        signal.atr,
        time,
    );

    if !signal.factors.is_empty() {
        out.push_str("Factors:\n");
        for factor in &signal.factors {
            out.push_str(&format!("  - {}\n", factor));
        }
    }
    out
}

/// Posts alerts through the Telegram Bot API.
pub struct TelegramDispatcher {
    client: Client,
    config: TelegramConfig,
}

impl TelegramDispatcher {
    pub fn new(config: TelegramConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn send_url(&self) -> String {
        format!("{}/bot{}/sendMessage", TELEGRAM_API_URL, self.config.bot_token)
    }
}

impl AlertDispatcher for TelegramDispatcher {
    fn name(&self) -> &str {
        "telegram"
    }

    fn send_text<'a>(
        &'a self,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            let payload = json!({
                "chat_id": self.config.chat_id,
                "text": text,
            });

            let response = self
                .client
                .post(self.send_url())
                .json(&payload)
                .send()
                .await?;

            if !response.status().is_success() {
                return Err(AppError::ExternalApi(format!(
                    "Telegram returned {}",
                    response.status()
                )));
            }

            info!("Message delivered to Telegram ({} chars)", text.len());
            Ok(())
        })
    }
}

/// Writes alerts to the log. Used when no delivery channel is configured.
#[derive(Debug, Default)]
pub struct LogDispatcher;

impl AlertDispatcher for LogDispatcher {
    fn name(&self) -> &str {
        "log"
    }

    fn send_text<'a>(
        &'a self,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            info!("\n{}", text);
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Confidence, Direction, Factor, RiskTier, Timeframe};

    fn create_signal() -> CandidateSignal {
        CandidateSignal {
            id: CandidateSignal::new_id(),
            instrument: "XAUUSD".to_string(),
            direction: Direction::Buy,
            score: 12,
            factors: vec![Factor::new("Trend alignment", 3), Factor::new("Smart money", 2)],
            entry: 2050.0,
            stop_loss: 2048.4,
            take_profits: [2058.0, 2062.0, 2066.0, 2070.0],
            risk_reward: 5.0,
            risk_tier: RiskTier::Premium,
            confidence: Confidence::from_score(12),
            atr: 2.0,
            confluence: 12.0,
            confirming_timeframes: vec![Timeframe::M30, Timeframe::H1],
            volume_surge: true,
            trap_zone: false,
            timestamp: 1_700_000_000_000,
        }
    }

    #[test]
    fn test_render_alert_contents() {
        let text = render_alert(&create_signal());
        assert!(text.starts_with("SNIPER ALERT: BUY XAUUSD"));
        assert!(text.contains("TP4: 2070.00000"));
        assert!(text.contains("Score: 12/20 (HIGH)"));
        assert!(text.contains("[30min, 1h]"));
        assert!(text.contains("Volume Surge: YES"));
        assert!(text.contains("Trap Zone: NO"));
        assert!(text.contains("2023-11-14 22:13:20 UTC"));
        assert!(text.contains("  - Smart money (+2)"));
    }

    #[test]
    fn test_telegram_url_uses_injected_token() {
        let dispatcher = TelegramDispatcher::new(TelegramConfig {
            bot_token: "abc:123".to_string(),
            chat_id: "42".to_string(),
        });
        assert_eq!(
            dispatcher.send_url(),
            "https://api.telegram.org/botabc:123/sendMessage"
        );
        assert_eq!(dispatcher.name(), "telegram");
    }

    #[derive(Default)]
    struct RecordingDispatcher {
        sent: std::sync::Mutex<Vec<String>>,
    }

    impl AlertDispatcher for RecordingDispatcher {
        fn name(&self) -> &str {
            "recording"
        }

        fn send_text<'a>(
            &'a self,
            text: &'a str,
        ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
            self.sent.lock().unwrap().push(text.to_string());
            Box::pin(async { Ok(()) })
        }
    }

    #[test]
    fn test_dispatch_sends_rendered_alert() {
        let signal = create_signal();
        let dispatcher = RecordingDispatcher::default();
        tokio_test::block_on(dispatcher.dispatch(&signal)).unwrap();
        assert_eq!(*dispatcher.sent.lock().unwrap(), vec![render_alert(&signal)]);
    }

    #[test]
    fn test_log_dispatcher_always_succeeds() {
        let signal = create_signal();
        let result = tokio_test::block_on(LogDispatcher.dispatch(&signal));
        assert!(result.is_ok());
    }
}
