//! HTTP surface of the analysis service

pub mod analysis;
pub mod error;
pub mod health;

pub use error::{ApiError, ApiResult};

use crate::execution::PipelineOrchestrator;
use crate::gateway::SharedGenerator;
use crate::persistence::{RunStore, DEFAULT_CACHE_TTL_SECS};
use axum::Router;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

/// Longest a single analysis request may take
pub const REQUEST_TIMEOUT_SECS: u64 = 300;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<PipelineOrchestrator<SharedGenerator>>,
    pub store: Arc<dyn RunStore>,
    /// How long a successful run is served from the store
    pub cache_ttl: chrono::Duration,
    pub startup_time: DateTime<Utc>,
    /// Cancelled on shutdown; in-flight runs stop at the next station boundary
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(
        orchestrator: Arc<PipelineOrchestrator<SharedGenerator>>,
        store: Arc<dyn RunStore>,
    ) -> Self {
        Self {
            orchestrator,
            store,
            cache_ttl: chrono::Duration::seconds(DEFAULT_CACHE_TTL_SECS),
            startup_time: Utc::now(),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_cache_ttl(mut self, ttl: chrono::Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(analysis::analysis_routes())
        .merge(health::health_routes())
        .layer(TimeoutLayer::new(Duration::from_secs(REQUEST_TIMEOUT_SECS)))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
