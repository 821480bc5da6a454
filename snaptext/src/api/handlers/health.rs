use axum::extract::State;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::api::response::ApiResponse;
use crate::api::state::AppState;

/// Health payload. Always returned with HTTP 200.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct HealthData {
    /// Always `"healthy"` while the process is serving requests.
    pub status: String,
    pub version: String,
    /// `"production"` with a working engine, `"demo"` when degraded.
    pub mode: String,
    pub ocr_available: bool,
    /// Engine identifier, same as `ocr.engine`.
    pub engine: String,
    pub ocr: OcrStatus,
    #[schema(value_type = String)]
    pub started_at: DateTime<Utc>,
    pub uptime_secs: i64,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct OcrStatus {
    pub engine: String,
    pub model: String,
    pub preprocessing: bool,
    pub timeout_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// `GET /api/health`
#[utoipa::path(
    get,
    path = "/api/health",
    tag = "health",
    responses(
        (status = 200, description = "Service health status", body = HealthData),
    )
)]
pub async fn health_check(State(state): State<AppState>) -> ApiResponse<HealthData> {
    let available = state.recognizer.is_available();

    let ocr = OcrStatus {
        engine: state.recognizer.engine().to_string(),
        model: state.config.ocr.model.clone(),
        preprocessing: state.config.ocr.preprocess,
        timeout_secs: state.config.ocr.timeout_secs,
        reason: state.recognizer.unavailable_reason().map(str::to_string),
    };

    let now = Utc::now();

    ApiResponse::success(HealthData {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        mode: if available { "production" } else { "demo" }.to_string(),
        ocr_available: available,
        engine: ocr.engine.clone(),
        ocr,
        started_at: state.started_at,
        uptime_secs: (now - state.started_at).num_seconds(),
    })
}
