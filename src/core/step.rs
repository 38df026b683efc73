//! Step domain model

use crate::core::config::StepConfig;
use regex::{Captures, Regex};
use std::collections::HashMap;
use std::sync::LazyLock;

/// A single step of the job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    /// Zero-based position in the declared step list
    pub index: usize,

    /// Human-readable step name
    pub name: String,

    /// Shell command template, executed as an opaque instruction
    pub command_template: String,

    /// Extra environment variables for this step only
    pub env: HashMap<String, String>,

    /// Timeout in seconds (None = no limit)
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default)]
pub struct StepDefaults {
    pub timeout_secs: Option<u64>,
}

impl Step {
    /// Create a step from a step config
    pub fn from_config(index: usize, config: &StepConfig, defaults: &StepDefaults) -> Self {
        Step {
            index,
            name: config.name.clone(),
            command_template: config.command.clone(),
            env: config.env.clone(),
            timeout_secs: config.timeout_secs.or(defaults.timeout_secs),
        }
    }

    /// Create a step directly, mostly useful in tests
    pub fn new(index: usize, name: impl Into<String>, command: impl Into<String>) -> Self {
        Step {
            index,
            name: name.into(),
            command_template: command.into(),
            env: HashMap::new(),
            timeout_secs: None,
        }
    }

    /// One-based position, as shown to operators
    pub fn number(&self) -> usize {
        self.index + 1
    }

    /// Render the command with variable substitution
    pub fn render_command(&self, variables: &HashMap<String, String>) -> String {
        render_template(&self.command_template, variables)
    }
}

static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*([\w.]+)\s*\}\}").expect("placeholder pattern is valid"));

/// Replace `{{ name }}` placeholders; unknown placeholders are left intact
///
/// Substitution is a single left-to-right pass: inserted values are never
/// scanned again.
pub fn render_template(template: &str, variables: &HashMap<String, String>) -> String {
    PLACEHOLDER_RE
        .replace_all(template, |caps: &Captures| match variables.get(&caps[1]) {
            Some(value) => value.clone(),
            None => caps[0].to_string(),
        })
        .into_owned()
}
