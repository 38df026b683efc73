//! Command execution capability
//!
//! The step runner never spawns processes itself. It hands each rendered
//! command to a [`CommandExecutor`], so tests can substitute a deterministic
//! implementation for the real shell.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Error types for command execution
#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("Failed to spawn command: {0}")]
    Spawn(String),

    #[error("Timeout after {0} seconds")]
    Timeout(u64),
}

/// A command ready to run in a provisioned environment
#[derive(Debug, Clone)]
pub struct CommandRequest {
    /// Fully rendered shell command
    pub command: String,

    /// Environment variables added to the inherited environment
    pub env: HashMap<String, String>,

    /// Directory to run in
    pub working_directory: PathBuf,

    /// Timeout in seconds (None = no limit)
    pub timeout_secs: Option<u64>,
}

impl CommandRequest {
    pub fn new(command: impl Into<String>, working_directory: impl AsRef<Path>) -> Self {
        Self {
            command: command.into(),
            env: HashMap::new(),
            working_directory: working_directory.as_ref().to_path_buf(),
            timeout_secs: None,
        }
    }
}

/// What a finished command reported
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Trait for command execution - allows for different implementations
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Run a command to completion and report its exit code and output
    async fn run(&self, request: &CommandRequest) -> Result<CommandOutput, ExecutorError>;
}

/// Runs commands through a POSIX shell (`sh -c <command>`)
#[derive(Debug, Clone)]
pub struct ShellExecutor {
    /// Shell executable
    shell: String,
}

impl Default for ShellExecutor {
    fn default() -> Self {
        Self::new("sh")
    }
}

impl ShellExecutor {
    pub fn new(shell: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
        }
    }
}

#[async_trait]
impl CommandExecutor for ShellExecutor {
    async fn run(&self, request: &CommandRequest) -> Result<CommandOutput, ExecutorError> {
        debug!(
            "Spawning {} -c in {}: {}",
            self.shell,
            request.working_directory.display(),
            request.command
        );

        let mut command = Command::new(&self.shell);
        command
            .arg("-c")
            .arg(&request.command)
            .current_dir(&request.working_directory)
            .envs(&request.env)
            .kill_on_drop(true);
        let child = command.output();

        let result = match request.timeout_secs {
            Some(secs) => timeout(Duration::from_secs(secs), child)
                .await
                .map_err(|_| ExecutorError::Timeout(secs))?,
            None => child.await,
        };

        let output = result.map_err(|e| ExecutorError::Spawn(e.to_string()))?;

        // Killed by a signal: no exit code
        let exit_code = output.status.code().unwrap_or(-1);
        if exit_code != 0 {
            warn!("Command exited with code {}: {}", exit_code, request.command);
        }

        Ok(CommandOutput {
            exit_code,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
