//! Alert relay endpoints.
//!
//! Charting platforms post their own alerts here; they are formatted and
//! forwarded through the same dispatcher the runner uses.

use axum::{
    body::Bytes,
    extract::State,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::api::ApiResponse;
use crate::error::{AppError, Result};
use crate::types::{Confidence, Direction};
use crate::AppState;

/// Externally generated alert. Numeric fields may arrive as numbers or as
/// strings, so they are kept as raw JSON values and only rendered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookAlert {
    pub action: String,
    #[serde(default)]
    pub ticker: Option<String>,
    #[serde(default)]
    pub price: Option<Value>,
    #[serde(default)]
    pub sl: Option<Value>,
    #[serde(default)]
    pub tp1: Option<Value>,
    #[serde(default)]
    pub tp2: Option<Value>,
    #[serde(default)]
    pub tp3: Option<Value>,
    #[serde(default)]
    pub tp4: Option<Value>,
    #[serde(default)]
    pub atr: Option<Value>,
    #[serde(default)]
    pub score: Option<Value>,
    #[serde(default)]
    pub confluence: Option<Value>,
    #[serde(default)]
    pub volume_surge: Option<Value>,
    #[serde(default)]
    pub trap_zone: Option<Value>,
}

impl WebhookAlert {
    /// Canned alert used to check the delivery channel end to end.
    pub fn sample() -> Self {
        let text = |s: &str| Some(Value::String(s.to_string()));
        Self {
            action: "BUY".to_string(),
            ticker: Some("XAUUSD".to_string()),
            price: text("2368.25"),
            sl: text("2365.00"),
            tp1: text("2370.00"),
            tp2: text("2373.00"),
            tp3: text("2376.00"),
            tp4: text("2379.00"),
            atr: text("0.0025"),
            score: text("16"),
            confluence: text("8"),
            volume_surge: text("true"),
            trap_zone: text("false"),
        }
    }

    /// Parse a request body. Anything that is not a JSON object with a
    /// string `action` is a bad request.
    pub fn from_body(body: &[u8]) -> Result<Self> {
        let alert: Self = serde_json::from_slice(body)?;
        alert.direction()?;
        Ok(alert)
    }

    /// `action` as a direction, case-insensitive.
    pub fn direction(&self) -> Result<Direction> {
        match self.action.trim().to_uppercase().as_str() {
            "BUY" => Ok(Direction::Buy),
            "SELL" => Ok(Direction::Sell),
            other => Err(AppError::BadRequest(format!(
                "action must be BUY or SELL, got '{}'",
                other
            ))),
        }
    }

    /// Confidence band for an integer score, if one was supplied.
    pub fn confidence(&self) -> Option<Confidence> {
        let score = match self.score.as_ref()? {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }?;
        i32::try_from(score).ok().map(Confidence::from_score)
    }
}

/// Render a raw field, "N/A" when absent.
fn field(value: &Option<Value>) -> String {
    match value {
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => "N/A".to_string(),
    }
}

fn flag(value: &Option<Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s.trim().eq_ignore_ascii_case("true"),
        _ => false,
    }
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "YES"
    } else {
        "NO"
    }
}

/// Plain-text message for a relayed alert, laid out like the engine's own.
pub fn render_webhook_alert(alert: &WebhookAlert, direction: Direction) -> String {
    let confidence = alert.confidence().map_or("UNKNOWN", |c| c.label());

    format!(
        "SNIPER ALERT: {} {}\n\
         Entry: {}\n\
         Stop Loss: {}\n\
         TP1: {}\n\
         TP2: {}\n\
         TP3: {}\n\
         TP4: {}\n\
         Score: {}/20 ({})\n\
         Confluence: {}\n\
         Trap Zone: {}\n\
         Volume Surge: {}\n\
         ATR: {}\n\
         Time: {}\n",
        direction.label(),
        alert.ticker.as_deref().map_or("UNKNOWN", str::trim),
        field(&alert.price),
        field(&alert.sl),
        field(&alert.tp1),
        field(&alert.tp2),
        field(&alert.tp3),
        field(&alert.tp4),
        field(&alert.score),
        confidence,
        field(&alert.confluence),
        yes_no(flag(&alert.trap_zone)),
        yes_no(flag(&alert.volume_surge)),
        field(&alert.atr),
        Utc::now().format("%Y-%m-%d %H:%M:%S UTC"),
    )
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertReceipt {
    pub dispatcher: String,
    pub alert: WebhookAlert,
}

/// Create the alerts router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/webhook", post(receive_webhook))
        .route("/test", get(send_test_alert))
}

/// Format and forward an incoming alert. The body is parsed by hand so
/// every malformed payload maps to 400.
async fn receive_webhook(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<ApiResponse<AlertReceipt>>> {
    let alert = WebhookAlert::from_body(&body).map_err(|e| {
        warn!("Rejected webhook payload: {}", e);
        e
    })?;
    relay(&state, alert).await
}

/// Push the canned alert through the configured dispatcher.
async fn send_test_alert(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<AlertReceipt>>> {
    relay(&state, WebhookAlert::sample()).await
}

async fn relay(state: &AppState, alert: WebhookAlert) -> Result<Json<ApiResponse<AlertReceipt>>> {
    let direction = alert.direction()?;
    let text = render_webhook_alert(&alert, direction);
    let dispatcher = &state.dispatcher;

    dispatcher.send_text(&text).await.map_err(|e| {
        warn!("Alert delivery via {} failed: {}", dispatcher.name(), e);
        AppError::Internal(format!("failed to deliver alert via {}: {}", dispatcher.name(), e))
    })?;
    info!(
        "Relayed {} alert for {} via {}",
        direction.label(),
        alert.ticker.as_deref().unwrap_or("UNKNOWN"),
        dispatcher.name()
    );

    Ok(Json(ApiResponse::new(AlertReceipt {
        dispatcher: dispatcher.name().to_string(),
        alert,
    })))
}
