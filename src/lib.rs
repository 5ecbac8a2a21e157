//! seven-stations - sequential seven-station analysis of dramatic text

pub mod api;
pub mod cli;
pub mod core;
pub mod execution;
pub mod gateway;
pub mod persistence;
pub mod protocol;

// Re-export commonly used types
pub use core::{
    PipelineContext, PipelineRunResult, RunStatus, StationDefinition, StationResult,
    StationsConfig, SuccessPolicy,
};
pub use execution::{PipelineError, PipelineEvent, PipelineOrchestrator, StationExecutor};
pub use gateway::{
    GatewayConfig, GatewayError, GeminiClient, ModelCallRequest, ModelGateway, ModelId,
    SharedGenerator, TextGenerator,
};
pub use persistence::{InMemoryRunStore, RunStore};
