//! Signal API endpoints.

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::api::ApiResponse;
use crate::error::{AppError, Result};
use crate::services::signals::EngineStatus;
use crate::types::{BarSeries, Evaluation, RawBar, Timeframe};
use crate::AppState;

/// Body of an evaluation request. Timeframes are keyed by label ("15min", "1h", ...).
#[derive(Debug, Deserialize)]
pub struct EvaluateRequest {
    pub instrument: String,
    #[serde(default)]
    pub timeframes: HashMap<String, Vec<RawBar>>,
}

impl EvaluateRequest {
    /// Validate labels and bars.
    fn into_series(self) -> Result<(String, HashMap<Timeframe, BarSeries>)> {
        let instrument = self.instrument.trim().to_uppercase();
        if instrument.is_empty() {
            return Err(AppError::BadRequest("instrument is required".to_string()));
        }

        let mut timeframes = HashMap::with_capacity(self.timeframes.len());
        for (label, bars) in self.timeframes {
            let timeframe = Timeframe::from_str(&label)
                .ok_or_else(|| AppError::BadRequest(format!("unknown timeframe: {}", label)))?;
            timeframes.insert(timeframe, BarSeries::from_raw(&bars));
        }
        Ok((instrument, timeframes))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub instruments: Vec<String>,
    pub timeframes: Vec<Timeframe>,
    #[serde(flatten)]
    pub engine: EngineStatus,
}

/// Create the signals router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/status", get(get_status))
        .route("/evaluate", post(evaluate))
}

/// Configured universe plus the engine's cooldown and counter state.
async fn get_status(State(state): State<AppState>) -> Json<ApiResponse<StatusResponse>> {
    let engine = state.engine.lock().await.status(Utc::now());

    Json(ApiResponse::new(StatusResponse {
        instruments: state.config.instruments.clone(),
        timeframes: state.config.timeframes.clone(),
        engine,
    }))
}

/// Run one evaluation against the shared engine. Accepted signals start a
/// cooldown exactly as they do in the background cycle.
async fn evaluate(
    State(state): State<AppState>,
    Json(request): Json<EvaluateRequest>,
) -> Result<Json<ApiResponse<Evaluation>>> {
    let (instrument, timeframes) = request.into_series()?;
    let now = Utc::now();

    let evaluation = {
        let mut engine = state.engine.lock().await;
        engine.rollover(now);
        engine.evaluate(&instrument, &timeframes, now)
    };

    Ok(Json(ApiResponse::new(evaluation)))
}
