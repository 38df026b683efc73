//! Workflow domain model

use crate::core::{
    config::{BranchFilterConfig, WorkflowConfig},
    event::Event,
    step::{render_template, Step, StepDefaults},
};
use std::collections::HashMap;
use std::path::PathBuf;

/// Branch-filtered trigger (push or pull_request)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BranchTrigger {
    pub branches: Vec<String>,
}

impl BranchTrigger {
    pub fn new<I, S>(branches: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            branches: branches.into_iter().map(Into::into).collect(),
        }
    }

    /// Exact-match the branch against the filter
    pub fn matches(&self, branch: Option<&str>) -> bool {
        match branch {
            Some(branch) => self.branches.iter().any(|b| b == branch),
            None => false,
        }
    }
}

impl From<&BranchFilterConfig> for BranchTrigger {
    fn from(config: &BranchFilterConfig) -> Self {
        Self {
            branches: config.branches.clone(),
        }
    }
}

/// The set of declared triggers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Triggers {
    pub push: Option<BranchTrigger>,
    pub pull_request: Option<BranchTrigger>,
    pub manual: bool,
}

/// The single job of a workflow
#[derive(Debug, Clone)]
pub struct JobSpec {
    /// Pinned runtime version identifier
    pub runtime_version: String,

    /// Optional provisioning probe command
    pub runtime_check: Option<String>,

    /// Directory steps run in
    pub working_directory: PathBuf,

    /// Environment shared by every step
    pub env: HashMap<String, String>,

    /// Steps in declared order
    pub steps: Vec<Step>,
}

impl JobSpec {
    pub fn new(runtime_version: impl Into<String>, steps: Vec<Step>) -> Self {
        Self {
            runtime_version: runtime_version.into(),
            runtime_check: None,
            working_directory: PathBuf::from("."),
            env: HashMap::new(),
            steps,
        }
    }
}

/// An immutable workflow definition, loaded once per run
#[derive(Debug, Clone)]
pub struct WorkflowDefinition {
    pub name: String,
    pub triggers: Triggers,
    pub job: JobSpec,
}

impl WorkflowDefinition {
    /// Create a workflow from configuration
    pub fn from_config(config: &WorkflowConfig) -> Self {
        let defaults = StepDefaults {
            timeout_secs: config.job.timeout_secs,
        };

        let steps = config
            .job
            .steps
            .iter()
            .enumerate()
            .map(|(index, step_config)| Step::from_config(index, step_config, &defaults))
            .collect();

        WorkflowDefinition {
            name: config.name.clone(),
            triggers: Triggers {
                push: config.triggers.push.as_ref().map(BranchTrigger::from),
                pull_request: config.triggers.pull_request.as_ref().map(BranchTrigger::from),
                manual: config.triggers.manual,
            },
            job: JobSpec {
                runtime_version: config.job.runtime_version.clone(),
                runtime_check: config.job.runtime_check.clone(),
                working_directory: PathBuf::from(
                    config.job.working_directory.as_deref().unwrap_or("."),
                ),
                env: config.job.env.clone(),
                steps,
            },
        }
    }

    pub fn step_count(&self) -> usize {
        self.job.steps.len()
    }

    /// Variables available to command templates for a given event
    ///
    /// Job `env` values may themselves reference the built-in variables
    /// (`runtime_version`, `event.kind`, `event.branch`, `workflow.name`);
    /// they are resolved against those once, here. Built-ins win on a name clash.
    pub fn template_variables(&self, event: &Event) -> HashMap<String, String> {
        let mut builtins = HashMap::new();
        builtins.insert("runtime_version".to_string(), self.job.runtime_version.clone());
        builtins.insert("event.kind".to_string(), event.kind.to_string());
        builtins.insert("event.branch".to_string(), event.branch().to_string());
        builtins.insert("workflow.name".to_string(), self.name.clone());

        let mut vars: HashMap<String, String> = self
            .job
            .env
            .iter()
            .map(|(key, value)| (key.clone(), render_template(value, &builtins)))
            .collect();
        vars.extend(builtins);
        vars
    }
}
