//! Persistence layer for workflow run history

#[cfg(feature = "sqlite")]
pub mod store;

#[cfg(feature = "sqlite")]
pub use store::SqliteRunStore;

use crate::core::{EventKind, PipelineVerdict, RunPhase};
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Summary of a workflow run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    /// Unique run ID
    pub run_id: Uuid,

    pub workflow_name: String,

    pub event_kind: EventKind,

    pub branch: Option<String>,

    /// Terminal phase of the run
    pub phase: RunPhase,

    pub started_at: DateTime<Utc>,

    pub completed_at: Option<DateTime<Utc>>,

    /// Number of steps that ran (including a failing one)
    pub executed_steps: usize,

    pub total_steps: usize,

    /// Human-readable failure reason, if the run failed
    pub failure: Option<String>,
}

impl RunSummary {
    /// Progress (0.0 to 1.0)
    pub fn progress(&self) -> f64 {
        if self.total_steps == 0 {
            return 0.0;
        }
        self.executed_steps as f64 / self.total_steps as f64
    }
}

/// Trait for persistence backends
#[async_trait::async_trait]
pub trait PersistenceBackend: Send + Sync {
    /// Save a run
    async fn save_run(&self, run: &RunSummary) -> Result<()>;

    /// Load a run by ID
    async fn load_run(&self, run_id: Uuid) -> Result<Option<RunSummary>>;

    /// List runs of a workflow, most recent first
    async fn list_runs(&self, workflow_name: &str) -> Result<Vec<RunSummary>>;

    /// List all workflow names
    async fn list_workflows(&self) -> Result<Vec<String>>;
}

/// In-memory persistence (for testing or ephemeral use)
pub struct InMemoryPersistence {
    runs: RwLock<HashMap<Uuid, RunSummary>>,
    by_workflow: RwLock<HashMap<String, Vec<Uuid>>>,
}

impl InMemoryPersistence {
    pub fn new() -> Self {
        Self {
            runs: RwLock::new(HashMap::new()),
            by_workflow: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryPersistence {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl PersistenceBackend for InMemoryPersistence {
    async fn save_run(&self, run: &RunSummary) -> Result<()> {
        let mut runs = self.runs.write().await;
        let is_new = runs.insert(run.run_id, run.clone()).is_none();

        if is_new {
            let mut by_workflow = self.by_workflow.write().await;
            by_workflow
                .entry(run.workflow_name.clone())
                .or_default()
                .push(run.run_id);
        }

        Ok(())
    }

    async fn load_run(&self, run_id: Uuid) -> Result<Option<RunSummary>> {
        let runs = self.runs.read().await;
        Ok(runs.get(&run_id).cloned())
    }

    async fn list_runs(&self, workflow_name: &str) -> Result<Vec<RunSummary>> {
        let runs = self.runs.read().await;
        let by_workflow = self.by_workflow.read().await;

        let mut result: Vec<RunSummary> = by_workflow
            .get(workflow_name)
            .map(|ids| ids.iter().filter_map(|id| runs.get(id).cloned()).collect())
            .unwrap_or_default();
        result.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        Ok(result)
    }

    async fn list_workflows(&self) -> Result<Vec<String>> {
        let by_workflow = self.by_workflow.read().await;
        let mut names: Vec<String> = by_workflow.keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}

/// Create a summary from a verdict
pub fn create_summary(verdict: &PipelineVerdict) -> RunSummary {
    RunSummary {
        run_id: verdict.run_id,
        workflow_name: verdict.workflow_name.clone(),
        event_kind: verdict.event.kind,
        branch: verdict.event.target_branch.clone(),
        phase: verdict.phase,
        started_at: verdict.started_at.unwrap_or_else(Utc::now),
        completed_at: verdict.completed_at,
        executed_steps: verdict.results.len(),
        total_steps: verdict.total_steps,
        failure: verdict.failure.as_ref().map(ToString::to_string),
    }
}
