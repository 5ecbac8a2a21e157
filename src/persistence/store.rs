//! SQLite-based run store

use crate::core::{PipelineRunResult, RunStatus};
use crate::persistence::{RunStore, RunSummary};
use anyhow::{Context, Result};
use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use uuid::Uuid;

/// SQLite run store
pub struct SqliteRunStore {
    pool: SqlitePool,
}

impl SqliteRunStore {
    /// Create a new SQLite store
    pub async fn new(db_path: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path))
            .context("Invalid database path")?
            .create_if_missing(true);

        // Every connection to ":memory:" opens its own database
        let max_connections = if db_path == ":memory:" { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .context("Failed to connect to database")?;

        let store = Self { pool };
        store.init().await?;

        Ok(store)
    }

    /// Create store with default path
    pub async fn with_default_path() -> Result<Self> {
        let data_dir = dirs::data_local_dir().unwrap_or_else(|| std::path::PathBuf::from("."));
        let db_dir = data_dir.join("seven-stations");
        std::fs::create_dir_all(&db_dir)
            .with_context(|| format!("Failed to create {}", db_dir.display()))?;

        let db_path = db_dir.join("runs.db");
        Self::new(&db_path.to_string_lossy()).await
    }

    /// Initialize database schema
    async fn init(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS runs (
                id TEXT PRIMARY KEY,
                cache_key TEXT NOT NULL,
                status TEXT NOT NULL,
                success INTEGER NOT NULL,
                started_at TEXT NOT NULL,
                execution_time_ms INTEGER NOT NULL DEFAULT 0,
                confidence REAL NOT NULL DEFAULT 0.0,
                succeeded_stations INTEGER NOT NULL DEFAULT 0,
                total_stations INTEGER NOT NULL DEFAULT 0,
                payload TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX IF NOT EXISTS idx_cache_key ON runs(cache_key);
            CREATE INDEX IF NOT EXISTS idx_started_at ON runs(started_at);
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to initialize schema")?;

        Ok(())
    }

    /// Convert DateTime<Utc> to NaiveDateTime for SQLite
    fn to_naive(dt: DateTime<Utc>) -> NaiveDateTime {
        dt.naive_utc()
    }

    /// Convert NaiveDateTime to DateTime<Utc>
    fn from_naive(dt: NaiveDateTime) -> DateTime<Utc> {
        DateTime::from_naive_utc_and_offset(dt, Utc)
    }

    fn status_name(status: RunStatus) -> &'static str {
        match status {
            RunStatus::Idle => "idle",
            RunStatus::Running(_) => "running",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
            RunStatus::Cancelled => "cancelled",
        }
    }

    fn parse_status(name: &str) -> RunStatus {
        match name {
            "completed" => RunStatus::Completed,
            "failed" => RunStatus::Failed,
            "cancelled" => RunStatus::Cancelled,
            _ => RunStatus::Idle,
        }
    }

    fn decode_payload(row: &SqliteRow) -> Result<PipelineRunResult> {
        let payload: String = row.get("payload");
        serde_json::from_str(&payload).context("Corrupt run payload")
    }

    fn decode_summary(row: &SqliteRow) -> Result<RunSummary> {
        Ok(RunSummary {
            run_id: Uuid::parse_str(&row.get::<String, _>("id"))?,
            status: Self::parse_status(&row.get::<String, _>("status")),
            success: row.get::<i64, _>("success") != 0,
            started_at: Self::from_naive(row.get("started_at")),
            execution_time_ms: row.get::<i64, _>("execution_time_ms") as u64,
            confidence: row.get("confidence"),
            succeeded_stations: row.get::<i64, _>("succeeded_stations") as usize,
            total_stations: row.get::<i64, _>("total_stations") as usize,
        })
    }
}

#[async_trait::async_trait]
impl RunStore for SqliteRunStore {
    async fn save_run(&self, cache_key: &str, run: &PipelineRunResult) -> Result<()> {
        let summary = RunSummary::from_run(run);
        let payload = serde_json::to_string(run).context("Failed to serialize run")?;

        sqlx::query(
            r#"
            INSERT OR REPLACE INTO runs
            (id, cache_key, status, success, started_at, execution_time_ms, confidence,
             succeeded_stations, total_stations, payload)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(run.run_id.to_string())
        .bind(cache_key)
        .bind(Self::status_name(run.status))
        .bind(run.success as i64)
        .bind(Self::to_naive(run.started_at))
        .bind(run.execution_time_ms as i64)
        .bind(run.confidence)
        .bind(summary.succeeded_stations as i64)
        .bind(summary.total_stations as i64)
        .bind(payload)
        .execute(&self.pool)
        .await
        .context("Failed to save run")?;

        Ok(())
    }

    async fn load_run(&self, run_id: Uuid) -> Result<Option<PipelineRunResult>> {
        let row = sqlx::query("SELECT payload FROM runs WHERE id = ?1")
            .bind(run_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .context("Failed to load run")?;

        row.as_ref().map(Self::decode_payload).transpose()
    }

    async fn find_cached(
        &self,
        cache_key: &str,
        ttl: Duration,
    ) -> Result<Option<PipelineRunResult>> {
        let cutoff = Utc::now() - ttl;
        let row = sqlx::query(
            r#"
            SELECT payload
            FROM runs
            WHERE cache_key = ?1 AND success = 1 AND started_at > ?2
            ORDER BY started_at DESC
            LIMIT 1
            "#,
        )
        .bind(cache_key)
        .bind(Self::to_naive(cutoff))
        .fetch_optional(&self.pool)
        .await
        .context("Failed to query result cache")?;

        row.as_ref().map(Self::decode_payload).transpose()
    }

    async fn list_runs(&self, limit: usize) -> Result<Vec<RunSummary>> {
        let rows = sqlx::query(
            r#"
            SELECT id, status, success, started_at, execution_time_ms, confidence,
                   succeeded_stations, total_stations
            FROM runs
            ORDER BY started_at DESC
            LIMIT ?1
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list runs")?;

        rows.iter().map(Self::decode_summary).collect()
    }
}
