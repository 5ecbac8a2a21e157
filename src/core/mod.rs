//! Core domain models for the analysis pipeline
//!
//! This module defines the station definitions, the per-run context and
//! the results a run produces.

pub mod confidence;
pub mod config;
pub mod context;
pub mod result;
pub mod state;
pub mod station;

pub use config::{StationsConfig, STATION_COUNT};
pub use context::*;
pub use result::*;
pub use state::*;
pub use station::*;
