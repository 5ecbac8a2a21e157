//! Pipeline context - per-run state passed between stations

use crate::core::result::StationResult;
use crate::core::station::{truncate_chars, StationDefinition};
use crate::protocol::{combine_sections, Level, Section};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Execution context for one pipeline run
///
/// Owned by exactly one run. Results are appended in station order and
/// never modified afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineContext {
    /// The text under analysis
    pub original_text: String,

    /// Optional user notes about the text
    pub metadata: Option<String>,

    /// Results of the stations run so far
    pub station_outputs: Vec<StationResult>,

    /// Index of the station about to run (0-based)
    pub current_stage_index: usize,
}

impl PipelineContext {
    /// Create a new context for a run
    pub fn new(original_text: impl Into<String>, metadata: Option<String>) -> Self {
        Self {
            original_text: original_text.into(),
            metadata: metadata.filter(|m| !m.trim().is_empty()),
            station_outputs: Vec::new(),
            current_stage_index: 0,
        }
    }

    /// Append the result of the current station and advance
    pub fn record(&mut self, result: StationResult) {
        debug_assert!(
            self.station_outputs
                .last()
                .map_or(true, |last| last.station_id < result.station_id),
            "station results must be appended in ascending order"
        );
        self.station_outputs.push(result);
        self.current_stage_index += 1;
    }

    /// Result of a station, if it ran
    pub fn get_station_output(&self, station_id: u8) -> Option<&StationResult> {
        self.station_outputs
            .iter()
            .find(|o| o.station_id == station_id)
    }

    /// Successful prior outputs as protocol subsections, one per station
    pub fn format_previous_outputs(&self) -> String {
        let sections: Vec<String> = self
            .station_outputs
            .iter()
            .filter(|o| o.success)
            .map(|o| {
                Section::new(&o.station_name, Level::Sub)
                    .text(o.text_output.trim())
                    .encode()
            })
            .collect();
        combine_sections(&sections)
    }

    /// Get all variables available for rendering a station's prompt
    pub fn get_rendering_variables(&self, station: &StationDefinition) -> HashMap<String, String> {
        let mut vars = HashMap::new();

        vars.insert(
            "text".to_string(),
            truncate_chars(&self.original_text, station.text_char_limit).to_string(),
        );

        let previous = self.format_previous_outputs();
        vars.insert(
            "previous".to_string(),
            truncate_chars(&previous, station.previous_char_limit).to_string(),
        );

        vars.insert(
            "metadata".to_string(),
            self.metadata.clone().unwrap_or_default(),
        );
        vars.insert("station_name".to_string(), station.name.clone());

        vars
    }
}
