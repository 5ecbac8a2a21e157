//! Run state models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Pipeline run state machine:
/// `Idle → Running(stage) → Completed | Failed | Cancelled`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "stage", rename_all = "lowercase")]
pub enum RunStatus {
    /// Run has not started
    Idle,
    /// Station with this id is executing
    Running(u8),
    /// Run finished and the success policy held
    Completed,
    /// Run finished and the success policy did not hold
    Failed,
    /// Run stopped at a stage boundary on request
    Cancelled,
}

impl RunStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunStatus::Completed | RunStatus::Failed | RunStatus::Cancelled
        )
    }
}

/// Progress bookkeeping for one run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunState {
    /// Unique run ID
    pub run_id: Uuid,

    /// Current status
    pub status: RunStatus,

    /// When execution started
    pub started_at: Option<DateTime<Utc>>,

    /// When execution finished
    pub completed_at: Option<DateTime<Utc>>,

    /// Number of stations in the pipeline
    pub total_stations: usize,

    /// Stations that produced text
    pub succeeded_stations: usize,

    /// Stations that failed
    pub failed_stations: usize,
}

impl RunState {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            status: RunStatus::Idle,
            started_at: None,
            completed_at: None,
            total_stations: 0,
            succeeded_stations: 0,
            failed_stations: 0,
        }
    }

    /// Mark run as started
    pub fn start(&mut self, total_stations: usize) {
        self.started_at = Some(Utc::now());
        self.total_stations = total_stations;
    }

    /// Enter a station
    pub fn enter(&mut self, station_id: u8) {
        self.status = RunStatus::Running(station_id);
    }

    /// Count a finished station
    pub fn record(&mut self, success: bool) {
        if success {
            self.succeeded_stations += 1;
        } else {
            self.failed_stations += 1;
        }
    }

    /// Move to a terminal status
    pub fn finish(&mut self, status: RunStatus) {
        debug_assert!(status.is_terminal());
        self.status = status;
        self.completed_at = Some(Utc::now());
    }

    /// Calculate progress (0.0 to 1.0)
    pub fn progress(&self) -> f64 {
        if self.total_stations == 0 {
            return 0.0;
        }
        (self.succeeded_stations + self.failed_stations) as f64 / self.total_stations as f64
    }
}

impl Default for RunState {
    fn default() -> Self {
        Self::new()
    }
}
