//! SQLite-based persistence store

use crate::core::{EventKind, RunPhase};
use crate::persistence::{PersistenceBackend, RunSummary};
use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use uuid::Uuid;

const SELECT_COLUMNS: &str = "id, workflow_name, event_kind, branch, phase, started_at, \
                              completed_at, executed_steps, total_steps, failure";

/// SQLite run store
pub struct SqliteRunStore {
    pool: SqlitePool,
}

impl SqliteRunStore {
    /// Create a new SQLite store, creating the database file if needed
    pub async fn new(db_path: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path))
            .context("Invalid database path")?
            .create_if_missing(true);

        // A single connection keeps ":memory:" databases coherent
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
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
        let db_dir = data_dir.join("workflow-runner");
        std::fs::create_dir_all(&db_dir)
            .with_context(|| format!("Failed to create {}", db_dir.display()))?;

        let db_path = db_dir.join("runs.db");
        let db_path = db_path
            .to_str()
            .context("Database path is not valid UTF-8")?;
        Self::new(db_path).await
    }

    /// Initialize database schema
    async fn init(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS runs (
                id TEXT PRIMARY KEY,
                workflow_name TEXT NOT NULL,
                event_kind TEXT NOT NULL,
                branch TEXT,
                phase TEXT NOT NULL,
                started_at TEXT NOT NULL,
                completed_at TEXT,
                executed_steps INTEGER NOT NULL DEFAULT 0,
                total_steps INTEGER NOT NULL DEFAULT 0,
                failure TEXT,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX IF NOT EXISTS idx_workflow_name ON runs(workflow_name);
            CREATE INDEX IF NOT EXISTS idx_started_at ON runs(started_at);
            "#,
        )
        .execute(&self.pool)
        .await?;

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

    fn event_kind_from_str(s: &str) -> Result<EventKind> {
        match s {
            "push" => Ok(EventKind::Push),
            "pull_request" => Ok(EventKind::PullRequest),
            "manual" => Ok(EventKind::Manual),
            other => anyhow::bail!("Unknown event kind in history: {}", other),
        }
    }

    fn summary_from_row(row: &SqliteRow) -> Result<RunSummary> {
        let phase: String = row.get("phase");
        Ok(RunSummary {
            run_id: Uuid::parse_str(&row.get::<String, _>("id"))?,
            workflow_name: row.get("workflow_name"),
            event_kind: Self::event_kind_from_str(&row.get::<String, _>("event_kind"))?,
            branch: row.get("branch"),
            phase: RunPhase::parse(&phase)
                .with_context(|| format!("Unknown run phase in history: {}", phase))?,
            started_at: Self::from_naive(row.get("started_at")),
            completed_at: row
                .get::<Option<NaiveDateTime>, _>("completed_at")
                .map(Self::from_naive),
            executed_steps: row.get::<i64, _>("executed_steps") as usize,
            total_steps: row.get::<i64, _>("total_steps") as usize,
            failure: row.get("failure"),
        })
    }
}

#[async_trait::async_trait]
impl PersistenceBackend for SqliteRunStore {
    async fn save_run(&self, run: &RunSummary) -> Result<()> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO runs
            (id, workflow_name, event_kind, branch, phase, started_at, completed_at,
             executed_steps, total_steps, failure)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(run.run_id.to_string())
        .bind(&run.workflow_name)
        .bind(run.event_kind.as_str())
        .bind(&run.branch)
        .bind(run.phase.as_str())
        .bind(Self::to_naive(run.started_at))
        .bind(run.completed_at.map(Self::to_naive))
        .bind(run.executed_steps as i64)
        .bind(run.total_steps as i64)
        .bind(&run.failure)
        .execute(&self.pool)
        .await
        .context("Failed to save run")?;

        Ok(())
    }

    async fn load_run(&self, run_id: Uuid) -> Result<Option<RunSummary>> {
        let row = sqlx::query(&format!("SELECT {} FROM runs WHERE id = ?1", SELECT_COLUMNS))
            .bind(run_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .context("Failed to load run")?;

        row.as_ref().map(Self::summary_from_row).transpose()
    }

    async fn list_runs(&self, workflow_name: &str) -> Result<Vec<RunSummary>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM runs WHERE workflow_name = ?1 ORDER BY started_at DESC",
            SELECT_COLUMNS
        ))
        .bind(workflow_name)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list runs")?;

        rows.iter().map(Self::summary_from_row).collect()
    }

    async fn list_workflows(&self) -> Result<Vec<String>> {
        let rows = sqlx::query(
            r#"
            SELECT DISTINCT workflow_name
            FROM runs
            ORDER BY workflow_name ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list workflows")?;

        Ok(rows.iter().map(|row| row.get("workflow_name")).collect())
    }
}
