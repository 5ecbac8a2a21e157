//! Station executor - runs one station through the model gateway

use crate::{
    core::{confidence, PipelineContext, StationDefinition, StationResult},
    gateway::{ModelCallRequest, ModelGateway, TextGenerator},
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

/// Executes a single station
pub struct StationExecutor<G> {
    gateway: Arc<ModelGateway<G>>,
    system_instruction: Option<String>,
}

impl<G: TextGenerator> StationExecutor<G> {
    pub fn new(gateway: Arc<ModelGateway<G>>) -> Self {
        Self {
            gateway,
            system_instruction: None,
        }
    }

    /// Instruction sent as the system prompt of every call
    pub fn with_system_instruction(mut self, instruction: Option<String>) -> Self {
        self.system_instruction = instruction.filter(|s| !s.trim().is_empty());
        self
    }

    pub fn gateway(&self) -> &Arc<ModelGateway<G>> {
        &self.gateway
    }

    /// Build the model request for a station in the given context
    pub fn build_request(
        &self,
        station: &StationDefinition,
        context: &PipelineContext,
    ) -> ModelCallRequest {
        let variables = context.get_rendering_variables(station);
        let prompt = station.build_effective_prompt(&variables, context.metadata.as_deref());

        let request = ModelCallRequest::new(station.model, prompt)
            .with_temperature(station.temperature)
            .with_max_tokens(self.gateway.max_output_tokens())
            .with_timeout(Duration::from_secs(station.timeout_secs));

        match &self.system_instruction {
            Some(instruction) => request.with_system_instruction(instruction.clone()),
            None => request,
        }
    }

    /// Run a station and return its result. Never fails: gateway errors and
    /// timeouts become a failed result carrying the placeholder text.
    pub async fn run_station(
        &self,
        station: &StationDefinition,
        context: &PipelineContext,
    ) -> StationResult {
        info!("Executing station {}: {}", station.id, station.name);

        let request = self.build_request(station, context);
        debug!(
            "Effective prompt for station {} ({} chars): {}",
            station.id,
            request.prompt.chars().count(),
            request.prompt
        );

        // The station timeout applies to each model call, not to the throttle wait
        let outcome = self
            .gateway
            .generate_with_fallback(request, station.fallback_model)
            .await;

        match outcome {
            Ok((text, model)) => {
                let used_fallback = model != station.model;
                let score = confidence::score(station, &text);
                info!(
                    "Station {} completed with {} ({} chars, confidence {:.2})",
                    station.id,
                    model,
                    text.chars().count(),
                    score
                );
                StationResult::succeeded(
                    station.id,
                    &station.name,
                    text,
                    model.as_str(),
                    used_fallback,
                    score,
                )
            }
            Err(e) => {
                error!("Station {} failed: {}", station.id, e);
                StationResult::failed(station.id, &station.name, e.to_string())
            }
        }
    }
}
