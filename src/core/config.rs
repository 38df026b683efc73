//! Workflow configuration from YAML

use crate::core::WorkflowDefinition;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tracing::warn;

/// Top-level workflow configuration loaded from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Workflow name
    #[serde(default = "default_workflow_name")]
    pub name: String,

    /// Optional description
    #[serde(default)]
    pub description: Option<String>,

    /// Events that start a run
    #[serde(default)]
    pub triggers: TriggersConfig,

    /// The single job this workflow runs
    pub job: JobConfig,
}

fn default_workflow_name() -> String {
    "workflow".to_string()
}

/// Trigger declarations
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TriggersConfig {
    /// Run on push to one of these branches
    #[serde(default)]
    pub push: Option<BranchFilterConfig>,

    /// Run on pull requests targeting one of these branches
    #[serde(default)]
    pub pull_request: Option<BranchFilterConfig>,

    /// Allow manual dispatch
    #[serde(default)]
    pub manual: bool,
}

impl TriggersConfig {
    pub fn is_empty(&self) -> bool {
        self.push.is_none() && self.pull_request.is_none() && !self.manual
    }
}

/// Branch filter for push / pull_request triggers
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BranchFilterConfig {
    #[serde(default)]
    pub branches: Vec<String>,
}

/// Job configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    /// Pinned language runtime version, e.g. "3.10"
    pub runtime_version: String,

    /// Command that proves the runtime is available (provisioning probe)
    #[serde(default)]
    pub runtime_check: Option<String>,

    /// Directory the steps run in
    #[serde(default)]
    pub working_directory: Option<String>,

    /// Default timeout for steps (in seconds)
    #[serde(default)]
    pub timeout_secs: Option<u64>,

    /// Environment variables for every step
    #[serde(default)]
    pub env: HashMap<String, String>,

    /// Ordered steps
    #[serde(default)]
    pub steps: Vec<StepConfig>,
}

/// Step configuration as defined in YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepConfig {
    /// Human-readable step name
    pub name: String,

    /// Shell command to run
    pub command: String,

    /// Environment variables for this step (override job env)
    #[serde(default)]
    pub env: HashMap<String, String>,

    /// Timeout for this step (overrides job default)
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl WorkflowConfig {
    /// Load workflow configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read workflow file {}", path.display()))?;
        Self::from_yaml(&content)
            .with_context(|| format!("Invalid workflow file {}", path.display()))
    }

    /// Parse workflow configuration from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: WorkflowConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the workflow configuration
    pub fn validate(&self) -> Result<()> {
        if self.triggers.is_empty() {
            anyhow::bail!("Workflow '{}' declares no triggers", self.name);
        }

        for (kind, filter) in [
            ("push", &self.triggers.push),
            ("pull_request", &self.triggers.pull_request),
        ] {
            if let Some(filter) = filter {
                if filter.branches.is_empty() {
                    warn!("{} trigger has no branches and will never match", kind);
                }
                if filter.branches.iter().any(|b| b.trim().is_empty()) {
                    anyhow::bail!("{} trigger contains an empty branch name", kind);
                }
            }
        }

        if self.job.runtime_version.trim().is_empty() {
            anyhow::bail!("Job runtime_version must not be empty");
        }

        if self.job.steps.is_empty() {
            anyhow::bail!("Job must declare at least one step");
        }

        let mut seen_names = HashSet::new();
        for (index, step) in self.job.steps.iter().enumerate() {
            if step.name.trim().is_empty() {
                anyhow::bail!("Step {} has an empty name", index + 1);
            }
            if !seen_names.insert(&step.name) {
                anyhow::bail!("Duplicate step name: {}", step.name);
            }
            if step.command.trim().is_empty() {
                anyhow::bail!("Step '{}' has an empty command", step.name);
            }
        }

        Ok(())
    }

    /// Convert config to a WorkflowDefinition domain model
    pub fn to_workflow(&self) -> WorkflowDefinition {
        WorkflowDefinition::from_config(self)
    }
}
