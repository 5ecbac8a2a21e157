//! Persistence layer for run history and the result cache

#[cfg(feature = "sqlite")]
pub mod store;

#[cfg(feature = "sqlite")]
pub use store::SqliteRunStore;

use crate::core::{PipelineRunResult, RunStatus};
use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, VecDeque};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

/// How long a successful run is served from the cache (one hour)
pub const DEFAULT_CACHE_TTL_SECS: i64 = 3600;

/// Summary of a stored run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    /// Unique run ID
    pub run_id: Uuid,

    /// Run status
    pub status: RunStatus,

    pub success: bool,

    /// When the run started
    pub started_at: DateTime<Utc>,

    pub execution_time_ms: u64,

    /// Mean station confidence
    pub confidence: f64,

    /// Stations that produced text
    pub succeeded_stations: usize,

    /// Stations attempted
    pub total_stations: usize,
}

impl RunSummary {
    pub fn from_run(run: &PipelineRunResult) -> Self {
        Self {
            run_id: run.run_id,
            status: run.status,
            success: run.success,
            started_at: run.started_at,
            execution_time_ms: run.execution_time_ms,
            confidence: run.confidence,
            succeeded_stations: run.outputs.iter().filter(|o| o.success).count(),
            total_stations: run.outputs.len(),
        }
    }
}

/// Cache key for an input: SHA-256 over the text and the optional metadata
pub fn cache_key(text: &str, metadata: Option<&str>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    if let Some(metadata) = metadata.filter(|m| !m.trim().is_empty()) {
        hasher.update([0u8]);
        hasher.update(metadata.as_bytes());
    }
    format!("{:x}", hasher.finalize())
}

/// Whether a stored run may still be served for a new request
pub fn is_fresh(run: &PipelineRunResult, ttl: Duration, now: DateTime<Utc>) -> bool {
    run.success && now - run.started_at < ttl
}

/// Trait for persistence backends
#[async_trait::async_trait]
pub trait RunStore: Send + Sync {
    /// Save a finished run under its input's cache key
    async fn save_run(&self, cache_key: &str, run: &PipelineRunResult) -> Result<()>;

    /// Load a run by ID
    async fn load_run(&self, run_id: Uuid) -> Result<Option<PipelineRunResult>>;

    /// Most recent successful run for the key that is younger than `ttl`
    async fn find_cached(&self, cache_key: &str, ttl: Duration)
        -> Result<Option<PipelineRunResult>>;

    /// Newest runs first
    async fn list_runs(&self, limit: usize) -> Result<Vec<RunSummary>>;
}

/// Runs an [`InMemoryRunStore`] keeps before dropping the oldest
pub const DEFAULT_MAX_RUNS: usize = 1000;

/// In-memory persistence (for testing or ephemeral use).
///
/// Holds at most `max_runs` runs; saving beyond that evicts the oldest.
pub struct InMemoryRunStore {
    entries: RwLock<Entries>,
    max_runs: usize,
}

#[derive(Default)]
struct Entries {
    runs: HashMap<Uuid, PipelineRunResult>,
    by_key: HashMap<String, Vec<Uuid>>,
    // Insertion order, oldest first
    order: VecDeque<(Uuid, String)>,
}

impl Entries {
    fn evict_oldest(&mut self) {
        let Some((run_id, key)) = self.order.pop_front() else {
            return;
        };
        self.runs.remove(&run_id);
        debug!("Evicted run {} from the in-memory store", run_id);
        if let Some(ids) = self.by_key.get_mut(&key) {
            ids.retain(|id| *id != run_id);
            if ids.is_empty() {
                self.by_key.remove(&key);
            }
        }
    }
}

impl InMemoryRunStore {
    pub fn new() -> Self {
        Self::with_max_runs(DEFAULT_MAX_RUNS)
    }

    pub fn with_max_runs(max_runs: usize) -> Self {
        Self {
            entries: RwLock::new(Entries::default()),
            max_runs: max_runs.max(1),
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.runs.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for InMemoryRunStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl RunStore for InMemoryRunStore {
    async fn save_run(&self, cache_key: &str, run: &PipelineRunResult) -> Result<()> {
        let mut entries = self.entries.write().await;
        if entries.runs.insert(run.run_id, run.clone()).is_none() {
            entries
                .by_key
                .entry(cache_key.to_string())
                .or_default()
                .push(run.run_id);
            entries.order.push_back((run.run_id, cache_key.to_string()));
        }

        while entries.runs.len() > self.max_runs {
            entries.evict_oldest();
        }

        Ok(())

    }
    async fn load_run(&self, run_id: Uuid) -> Result<Option<PipelineRunResult>> {
        let entries = self.entries.read().await;
        Ok(entries.runs.get(&run_id).cloned())
    }

    async fn find_cached(
        &self,
        cache_key: &str,
        ttl: Duration,
    ) -> Result<Option<PipelineRunResult>> {
        let entries = self.entries.read().await;
        let now = Utc::now();

        let cached = entries.by_key.get(cache_key).and_then(|ids| {
            ids.iter()
                .rev()
                .filter_map(|id| entries.runs.get(id))
                .find(|run| is_fresh(run, ttl, now))
                .cloned()
        });
        Ok(cached)
    }

    async fn list_runs(&self, limit: usize) -> Result<Vec<RunSummary>> {
        let entries = self.entries.read().await;
        let mut summaries: Vec<RunSummary> = entries.runs.values().map(RunSummary::from_run).collect();
        summaries.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        summaries.truncate(limit);
        Ok(summaries)
    }
}
