//! Pipeline orchestrator - runs the seven stations in order

use crate::{
    core::{
        mean_confidence, PipelineContext, PipelineRunResult, RunState, RunStatus,
        StationDefinition, StationsConfig, SuccessPolicy,
    },
    execution::{report, StationExecutor},
    gateway::{ModelGateway, TextGenerator},
};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Errors that prevent a run from starting
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Input text is empty")]
    EmptyInput,

    #[error("No stations configured")]
    NoStations,
}

/// Events that can occur during a pipeline run
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    RunStarted {
        run_id: Uuid,
        total_stations: usize,
    },
    StationStarted {
        run_id: Uuid,
        station_id: u8,
        name: String,
    },
    StationFallback {
        run_id: Uuid,
        station_id: u8,
        model: String,
    },
    StationCompleted {
        run_id: Uuid,
        station_id: u8,
        name: String,
        confidence: f64,
    },
    StationFailed {
        run_id: Uuid,
        station_id: u8,
        name: String,
        error: String,
    },
    RunFinished {
        run_id: Uuid,
        status: RunStatus,
        success: bool,
    },
}

/// Type for event handlers
pub type EventHandler = Arc<dyn Fn(PipelineEvent) + Send + Sync>;

/// Runs the station sequence for one text at a time. Cheap to share: one
/// orchestrator serves any number of concurrent runs, each with its own
/// context.
pub struct PipelineOrchestrator<G> {
    stations: Vec<StationDefinition>,
    executor: Arc<StationExecutor<G>>,
    policy: SuccessPolicy,
    event_handlers: Arc<Mutex<Vec<EventHandler>>>,
}

impl<G: TextGenerator + 'static> PipelineOrchestrator<G> {
    pub fn new(gateway: Arc<ModelGateway<G>>, config: &StationsConfig) -> Self {
        let executor = StationExecutor::new(gateway)
            .with_system_instruction(config.system_instruction.clone());
        Self {
            stations: config.to_definitions(),
            executor: Arc::new(executor),
            policy: SuccessPolicy::default(),
            event_handlers: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_policy(mut self, policy: SuccessPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn stations(&self) -> &[StationDefinition] {
        &self.stations
    }

    pub fn policy(&self) -> SuccessPolicy {
        self.policy
    }

    /// Add an event handler
    pub async fn add_event_handler<F>(&self, handler: F)
    where
        F: Fn(PipelineEvent) + Send + Sync + 'static,
    {
        self.event_handlers.lock().await.push(Arc::new(handler));
    }

    /// Emit an event to all handlers
    async fn emit_event(&self, event: PipelineEvent) {
        let handlers = self.event_handlers.lock().await;
        for handler in handlers.iter() {
            handler(event.clone());
        }
    }

    /// Run every station over `original_text`.
    ///
    /// Stations run strictly in order and a failed station never stops the
    /// run. `cancel` is checked between stations only; a cancelled run
    /// returns the results gathered so far.
    pub async fn execute(
        &self,
        original_text: &str,
        metadata: Option<String>,
        cancel: CancellationToken,
    ) -> Result<PipelineRunResult, PipelineError> {
        if original_text.trim().is_empty() {
            return Err(PipelineError::EmptyInput);
        }
        if self.stations.is_empty() {
            return Err(PipelineError::NoStations);
        }

        let started = Instant::now();
        let mut state = RunState::new();
        state.start(self.stations.len());
        let run_id = state.run_id;
        let started_at = state.started_at.unwrap_or_else(chrono::Utc::now);

        info!(
            "Starting run {} ({} chars, {} stations)",
            run_id,
            original_text.chars().count(),
            self.stations.len()
        );
        self.emit_event(PipelineEvent::RunStarted {
            run_id,
            total_stations: self.stations.len(),
        })
        .await;

        let mut context = PipelineContext::new(original_text, metadata);

        for station in &self.stations {
            if cancel.is_cancelled() {
                warn!("Run {} cancelled before station {}", run_id, station.id);
                state.finish(RunStatus::Cancelled);
                break;
            }

            state.enter(station.id);
            self.emit_event(PipelineEvent::StationStarted {
                run_id,
                station_id: station.id,
                name: station.name.clone(),
            })
            .await;

            let result = self.executor.run_station(station, &context).await;
            state.record(result.success);

            if result.success {
                if result.used_fallback {
                    self.emit_event(PipelineEvent::StationFallback {
                        run_id,
                        station_id: station.id,
                        model: result.model.clone().unwrap_or_default(),
                    })
                    .await;
                }
                self.emit_event(PipelineEvent::StationCompleted {
                    run_id,
                    station_id: station.id,
                    name: station.name.clone(),
                    confidence: result.confidence,
                })
                .await;
            } else {
                self.emit_event(PipelineEvent::StationFailed {
                    run_id,
                    station_id: station.id,
                    name: station.name.clone(),
                    error: result.error_message.clone().unwrap_or_default(),
                })
                .await;
            }

            context.record(result);
        }

        let outputs = context.station_outputs;
        let cancelled = state.status == RunStatus::Cancelled;
        let success = !cancelled && self.policy.evaluate(&outputs);

        if !cancelled {
            state.finish(if success {
                RunStatus::Completed
            } else {
                RunStatus::Failed
            });
        }

        let error = if cancelled {
            Some("تم إلغاء التحليل".to_string())
        } else if success {
            None
        } else {
            Some(failure_summary(&outputs))
        };

        let full_report = report::assemble(&outputs);
        let run = PipelineRunResult {
            run_id,
            success,
            status: state.status,
            confidence: mean_confidence(&outputs),
            outputs,
            full_report,
            error,
            started_at,
            execution_time_ms: started.elapsed().as_millis() as u64,
        };

        if run.success {
            info!(
                "Run {} completed in {}ms (confidence {:.2})",
                run_id, run.execution_time_ms, run.confidence
            );
        } else {
            error!(
                "Run {} finished as {:?}: {}",
                run_id,
                run.status,
                run.error.as_deref().unwrap_or_default()
            );
        }

        self.emit_event(PipelineEvent::RunFinished {
            run_id,
            status: run.status,
            success: run.success,
        })
        .await;

        Ok(run)
    }
}

fn failure_summary(outputs: &[crate::core::StationResult]) -> String {
    let failed: Vec<String> = outputs
        .iter()
        .filter(|o| !o.success)
        .map(|o| {
            format!(
                "{} ({})",
                o.station_name,
                o.error_message.as_deref().unwrap_or("unknown error")
            )
        })
        .collect();
    format!("فشل التحليل في المحطات: {}", failed.join("، "))
}
