//! Pipeline execution: station executor, orchestrator and report assembly

pub mod engine;
pub mod executor;
pub mod report;

pub use engine::{EventHandler, PipelineError, PipelineEvent, PipelineOrchestrator};
pub use executor::StationExecutor;
pub use report::{assemble, split_report, ReportSegment, REPORT_TITLE};
