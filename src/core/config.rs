//! Station configuration from YAML

use crate::core::station::{placeholders, StationDefaults, StationDefinition, KNOWN_PLACEHOLDERS};
use crate::gateway::ModelId;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Number of stations a valid pipeline defines
pub const STATION_COUNT: usize = 7;

const BUILTIN_STATIONS: &str = include_str!("../../config/stations.yaml");

/// Top-level pipeline configuration loaded from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StationsConfig {
    /// Pipeline name
    pub name: String,

    /// Pipeline version (optional)
    #[serde(default)]
    pub version: Option<String>,

    /// System instruction sent with every station call
    #[serde(default)]
    pub system_instruction: Option<String>,

    /// Values used where a station leaves a field unset
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Station definitions, in execution order
    pub stations: Vec<StationConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DefaultsConfig {
    #[serde(default)]
    pub temperature: Option<f32>,

    #[serde(default)]
    pub timeout_secs: Option<u64>,

    #[serde(default)]
    pub fallback_model: Option<ModelId>,
}

/// Station configuration as defined in YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StationConfig {
    /// Position in the pipeline
    pub id: u8,

    /// Display name
    pub name: String,

    /// The prompt template for this station
    pub prompt: String,

    /// Section titles the answer should contain
    #[serde(default)]
    pub expected_output: Vec<String>,

    pub model: ModelId,

    /// Fallback model (overrides the default)
    #[serde(default)]
    pub fallback_model: Option<ModelId>,

    /// Sampling temperature (overrides the default)
    #[serde(default)]
    pub temperature: Option<f32>,

    /// Timeout for this station (overrides the default)
    #[serde(default)]
    pub timeout_secs: Option<u64>,

    #[serde(default)]
    pub text_char_limit: Option<usize>,

    #[serde(default)]
    pub previous_char_limit: Option<usize>,
}

impl StationsConfig {
    /// The pipeline shipped with the binary
    pub fn builtin() -> Result<Self> {
        Self::from_yaml(BUILTIN_STATIONS).context("Built-in station configuration is invalid")
    }

    /// Load station configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read station config: {}", path.display()))?;
        Self::from_yaml(&content)
    }

    /// Parse station configuration from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: StationsConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the station configuration
    pub fn validate(&self) -> Result<()> {
        if self.stations.len() != STATION_COUNT {
            anyhow::bail!(
                "Expected {} stations, found {}",
                STATION_COUNT,
                self.stations.len()
            );
        }

        // Ids must be exactly 1..=7 in ascending order
        let mut seen_ids = HashSet::new();
        for (index, station) in self.stations.iter().enumerate() {
            if !seen_ids.insert(station.id) {
                anyhow::bail!("Duplicate station ID: {}", station.id);
            }
            let expected = (index + 1) as u8;
            if station.id != expected {
                anyhow::bail!(
                    "Station at position {} has ID {}, expected {}",
                    index + 1,
                    station.id,
                    expected
                );
            }
        }

        for station in &self.stations {
            if station.name.trim().is_empty() {
                anyhow::bail!("Station {} has an empty name", station.id);
            }
            if station.prompt.trim().is_empty() {
                anyhow::bail!("Station {} has an empty prompt", station.id);
            }

            let used = placeholders(&station.prompt);
            for name in &used {
                if !KNOWN_PLACEHOLDERS.contains(&name.as_str()) {
                    anyhow::bail!(
                        "Station {} references unknown placeholder '{{{{ {} }}}}'",
                        station.id,
                        name
                    );
                }
            }
            if used.iter().any(|p| p == "text") && station.text_char_limit == Some(0) {
                anyhow::bail!(
                    "Station {} uses {{{{ text }}}} but its text_char_limit is 0",
                    station.id
                );
            }

            if let Some(temperature) = station.temperature.or(self.defaults.temperature) {
                if !(0.0..=2.0).contains(&temperature) {
                    anyhow::bail!(
                        "Station {} temperature {} is outside 0.0..=2.0",
                        station.id,
                        temperature
                    );
                }
            }
        }

        Ok(())
    }

    /// Convert config to station domain models, in execution order
    pub fn to_definitions(&self) -> Vec<StationDefinition> {
        let base = StationDefaults::default();
        let defaults = StationDefaults {
            temperature: self.defaults.temperature.unwrap_or(base.temperature),
            timeout_secs: self.defaults.timeout_secs.unwrap_or(base.timeout_secs),
            fallback_model: self.defaults.fallback_model,
            ..base
        };

        self.stations
            .iter()
            .map(|station| station.to_definition(&defaults))
            .collect()
    }
}

impl StationConfig {
    fn to_definition(&self, defaults: &StationDefaults) -> StationDefinition {
        StationDefinition {
            id: self.id,
            name: self.name.clone(),
            prompt_template: self.prompt.clone(),
            expected_output_shape: self.expected_output.clone(),
            model: self.model,
            fallback_model: self.fallback_model.or(defaults.fallback_model),
            temperature: self.temperature.unwrap_or(defaults.temperature),
            text_char_limit: self.text_char_limit.unwrap_or(defaults.text_char_limit),
            previous_char_limit: self
                .previous_char_limit
                .unwrap_or(defaults.previous_char_limit),
            timeout_secs: self.timeout_secs.unwrap_or(defaults.timeout_secs),
        }
    }
}
