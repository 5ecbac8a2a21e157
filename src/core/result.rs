//! Station and run results

use crate::core::state::RunStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Text recorded for a station whose model call failed
pub const STATION_FAILED_TEXT: &str = "فشل في إكمال هذه المحطة";

/// Outcome of one station. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationResult {
    pub station_id: u8,
    pub station_name: String,

    /// Raw model text, or [`STATION_FAILED_TEXT`] on failure
    pub text_output: String,

    pub success: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    /// Milliseconds since the Unix epoch when the result was created
    pub timestamp_ms: i64,

    /// Model that produced `text_output`, if any did
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    #[serde(default)]
    pub used_fallback: bool,

    /// 0.0 for failures
    pub confidence: f64,
}

impl StationResult {
    pub fn succeeded(
        station_id: u8,
        station_name: &str,
        text_output: String,
        model: &str,
        used_fallback: bool,
        confidence: f64,
    ) -> Self {
        Self {
            station_id,
            station_name: station_name.to_string(),
            text_output,
            success: true,
            error_message: None,
            timestamp_ms: Utc::now().timestamp_millis(),
            model: Some(model.to_string()),
            used_fallback,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    pub fn failed(station_id: u8, station_name: &str, error: impl Into<String>) -> Self {
        Self {
            station_id,
            station_name: station_name.to_string(),
            text_output: STATION_FAILED_TEXT.to_string(),
            success: false,
            error_message: Some(error.into()),
            timestamp_ms: Utc::now().timestamp_millis(),
            model: None,
            used_fallback: false,
            confidence: 0.0,
        }
    }
}

/// How per-station failures map onto the run's `success` flag
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuccessPolicy {
    /// Success only when every attempted station succeeded
    #[default]
    Strict,
    /// Success when at least one station succeeded
    Lenient,
}

impl SuccessPolicy {
    pub fn evaluate(&self, outputs: &[StationResult]) -> bool {
        if outputs.is_empty() {
            return false;
        }
        match self {
            SuccessPolicy::Strict => outputs.iter().all(|o| o.success),
            SuccessPolicy::Lenient => outputs.iter().any(|o| o.success),
        }
    }
}

/// Terminal artifact of one pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineRunResult {
    pub run_id: Uuid,
    pub success: bool,
    pub status: RunStatus,

    /// Station results in ascending id order
    pub outputs: Vec<StationResult>,

    pub full_report: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Mean station confidence
    pub confidence: f64,

    pub started_at: DateTime<Utc>,
    pub execution_time_ms: u64,
}

impl PipelineRunResult {
    pub fn stations_count(&self) -> usize {
        self.outputs.len()
    }

    pub fn failed_stations(&self) -> impl Iterator<Item = &StationResult> {
        self.outputs.iter().filter(|o| !o.success)
    }
}

/// Mean confidence over all attempted stations (failures count as zero)
pub fn mean_confidence(outputs: &[StationResult]) -> f64 {
    if outputs.is_empty() {
        return 0.0;
    }
    outputs.iter().map(|o| o.confidence).sum::<f64>() / outputs.len() as f64
}
