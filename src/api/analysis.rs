//! Seven-stations analysis endpoints

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

use crate::api::error::{ApiError, ApiResult};
use crate::api::AppState;
use crate::core::{PipelineRunResult, StationResult, STATION_FAILED_TEXT};
use crate::persistence::cache_key;

pub const TEXT_REQUIRED: &str = "النص مطلوب للتحليل";
pub const TEXT_TOO_SHORT: &str = "النص قصير جداً. يجب أن يكون النص على الأقل 50 حرفاً";
pub const TEXT_TOO_LONG: &str = "النص طويل جداً. الحد الأقصى 100,000 حرف";
pub const ANALYSIS_FAILED: &str = "فشل التحليل";

/// Accepted input length in characters
pub const MIN_TEXT_CHARS: usize = 50;
pub const MAX_TEXT_CHARS: usize = 100_000;

const SUMMARY_CHARS: usize = 200;

#[derive(Debug, Deserialize)]
pub struct AnalysisRequest {
    #[serde(default)]
    pub text: Option<String>,

    #[serde(default)]
    pub metadata: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StationView {
    pub id: u8,
    pub name: String,
    pub summary: String,
    /// The station's answer as the model wrote it, without escaping
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResponse {
    pub success: bool,
    pub run_id: Uuid,
    /// Assembled report in its escaped form, readable back with `split_report`
    pub report: String,
    pub stations: Vec<StationView>,
    pub confidence: f64,
    pub execution_time: u64,
    pub stations_count: usize,
    pub cached: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisFailure {
    pub success: bool,
    pub run_id: Uuid,
    pub error: String,
    pub stations: Vec<StationView>,
    pub execution_time: u64,
}

#[derive(Debug, Serialize)]
pub struct ServiceInfo {
    pub service: &'static str,
    pub status: &'static str,
    pub version: &'static str,
    pub features: Vec<&'static str>,
}

/// Validate the submitted text, counting characters rather than bytes
pub fn validate_text(text: Option<&str>) -> ApiResult<&str> {
    let text = match text {
        Some(t) if !t.trim().is_empty() => t,
        _ => return Err(ApiError::BadRequest(TEXT_REQUIRED.to_string())),
    };

    let chars = text.chars().count();
    if chars < MIN_TEXT_CHARS {
        return Err(ApiError::BadRequest(TEXT_TOO_SHORT.to_string()));
    }
    if chars > MAX_TEXT_CHARS {
        return Err(ApiError::BadRequest(TEXT_TOO_LONG.to_string()));
    }
    Ok(text)
}

/// First 200 characters followed by an ellipsis
fn summarize(text: &str) -> String {
    let head: String = text.chars().take(SUMMARY_CHARS).collect();
    format!("{}...", head)
}

fn completed_view(result: &StationResult) -> StationView {
    StationView {
        id: result.station_id,
        name: result.station_name.clone(),
        summary: summarize(&result.text_output),
        full_text: Some(result.text_output.clone()),
        confidence: Some(result.confidence),
        status: if result.success { "completed" } else { "error" },
    }
}

fn failed_view(result: &StationResult) -> StationView {
    let summary = if result.text_output.is_empty() {
        STATION_FAILED_TEXT.to_string()
    } else {
        result.text_output.clone()
    };
    StationView {
        id: result.station_id,
        name: result.station_name.clone(),
        summary,
        full_text: None,
        confidence: None,
        status: if result.success { "completed" } else { "error" },
    }
}

fn render(run: &PipelineRunResult, execution_time: u64, cached: bool) -> Response {
    if run.success {
        Json(AnalysisResponse {
            success: true,
            run_id: run.run_id,
            report: run.full_report.clone(),
            stations: run.outputs.iter().map(completed_view).collect(),
            confidence: run.confidence,
            execution_time,
            stations_count: run.outputs.len(),
            cached,
        })
        .into_response()
    } else {
        let body = AnalysisFailure {
            success: false,
            run_id: run.run_id,
            error: run
                .error
                .clone()
                .unwrap_or_else(|| ANALYSIS_FAILED.to_string()),
            stations: run.outputs.iter().map(failed_view).collect(),
            execution_time,
        };
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}

/// POST /api/analysis/seven-stations
pub async fn run_analysis(
    State(state): State<AppState>,
    payload: Result<Json<AnalysisRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let started = Instant::now();
    let Json(request) = payload.map_err(|rejection| {
        warn!("Rejected analysis request: {}", rejection.body_text());
        ApiError::BadRequest(TEXT_REQUIRED.to_string())
    })?;

    let text = validate_text(request.text.as_deref())?;
    let metadata = request.metadata.filter(|m| !m.trim().is_empty());
    let key = cache_key(text, metadata.as_deref());

    if let Some(run) = state.store.find_cached(&key, state.cache_ttl).await? {
        info!("Serving run {} from cache", run.run_id);
        return Ok(render(&run, started.elapsed().as_millis() as u64, true));
    }

    let run = state
        .orchestrator
        .execute(text, metadata, state.shutdown.child_token())
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    if let Err(e) = state.store.save_run(&key, &run).await {
        warn!("Failed to store run {}: {:#}", run.run_id, e);
    }

    Ok(render(&run, started.elapsed().as_millis() as u64, false))
}

/// GET /api/analysis/seven-stations
pub async fn service_info() -> Json<ServiceInfo> {
    Json(ServiceInfo {
        service: "Seven Stations Analysis",
        status: "active",
        version: env!("CARGO_PKG_VERSION"),
        features: vec![
            "Text-only protocol (no JSON)",
            "Sequential pipeline (1→7)",
            "Structured interfaces",
            "Arabic text analysis",
        ],
    })
}

/// Build analysis routes
pub fn analysis_routes() -> Router<AppState> {
    Router::new().route(
        "/api/analysis/seven-stations",
        get(service_info).post(run_analysis),
    )
}
