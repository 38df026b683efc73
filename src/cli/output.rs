//! CLI output formatting

use crate::{
    core::{PipelineVerdict, RunPhase, RunResult},
    execution::ExecutionEvent,
    persistence::RunSummary,
};
use console::Emoji;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static SPINNER: Emoji<'_, '_> = Emoji("⏳ ", "~ ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "! ");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "> ");
pub static SKIP: Emoji<'_, '_> = Emoji("⏭️  ", "- ");

/// Create a spinner shown while a step runs
pub fn create_spinner(message: String) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(template) =
        ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")
    {
        spinner.set_style(template);
    }
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

/// Format a run phase for display
pub fn format_phase(phase: RunPhase) -> String {
    let label = phase.as_str().to_uppercase();
    match phase {
        RunPhase::Idle | RunPhase::Skipped => style(label).dim().to_string(),
        RunPhase::Evaluating | RunPhase::Provisioning | RunPhase::Running => {
            style(label).yellow().to_string()
        }
        RunPhase::Succeeded => style(label).green().to_string(),
        RunPhase::Failed => style(label).red().to_string(),
    }
}

fn phase_icon(phase: RunPhase) -> Emoji<'static, 'static> {
    match phase {
        RunPhase::Succeeded => CHECK,
        RunPhase::Failed => CROSS,
        RunPhase::Skipped => SKIP,
        _ => SPINNER,
    }
}

fn short_id(id: &uuid::Uuid) -> String {
    id.to_string()[..8].to_string()
}

/// Format a history entry for display
pub fn format_run_summary(summary: &RunSummary) -> String {
    let branch = summary
        .branch
        .as_deref()
        .map(|b| format!(" ({})", b))
        .unwrap_or_default();

    format!(
        "{}{} - {} - {}{} - {} ({}/{}) - {}",
        phase_icon(summary.phase),
        style(short_id(&summary.run_id)).dim(),
        style(&summary.workflow_name).bold(),
        summary.event_kind,
        branch,
        format_phase(summary.phase),
        summary.executed_steps,
        summary.total_steps,
        style(summary.started_at.format("%Y-%m-%d %H:%M:%S")).dim()
    )
}

/// Format a single step result
pub fn format_step_result(result: &RunResult) -> String {
    let label = format!("[{}] {}", result.step_index + 1, result.step_name);
    let elapsed = style(format!("({} ms)", result.duration_ms())).dim();

    if result.succeeded {
        return format!("{}{} {}", CHECK, style(label).green(), elapsed);
    }

    match &result.error {
        Some(error) => format!("{}{}: {} {}", CROSS, style(label).red(), style(error).dim(), elapsed),
        None => format!(
            "{}{} exited with code {} {}",
            CROSS,
            style(label).red(),
            style(result.exit_code).red(),
            elapsed
        ),
    }
}

/// Format an execution event for display
///
/// Returns `None` for events the terminal view does not print.
pub fn format_execution_event(event: &ExecutionEvent) -> Option<String> {
    let line = match event {
        ExecutionEvent::RunStarted {
            run_id,
            workflow_name,
            event,
        } => format!(
            "{}Starting {} for {} ({})",
            ROCKET,
            style(workflow_name).bold(),
            style(event).cyan(),
            style(short_id(run_id)).dim()
        ),
        ExecutionEvent::RunSkipped { event, .. } => format!(
            "{}Event {} does not match any trigger",
            SKIP,
            style(event).cyan()
        ),
        ExecutionEvent::ProvisioningStarted { runtime_version } => format!(
            "{}Provisioning runtime {}",
            INFO,
            style(runtime_version).cyan()
        ),
        ExecutionEvent::ProvisioningFailed { error } => {
            format!("{}Provisioning failed: {}", CROSS, style(error).red())
        }
        ExecutionEvent::EnvironmentReady {
            working_directory, ..
        } => format!(
            "{}Environment ready in {}",
            INFO,
            style(working_directory).dim()
        ),
        ExecutionEvent::StepStarted { .. } => return None,
        ExecutionEvent::StepFinished { result } => format_step_result(result),
        ExecutionEvent::RunCompleted { run_id, phase } => format!(
            "{}Run {} {}",
            INFO,
            style(short_id(run_id)).dim(),
            format_phase(*phase)
        ),
    };
    Some(line)
}

/// Format the final verdict line
pub fn format_verdict(verdict: &PipelineVerdict) -> String {
    let name = style(&verdict.workflow_name).bold();
    match verdict.phase {
        RunPhase::Succeeded => format!(
            "{}{} completed {} ({}/{} steps)",
            CHECK,
            name,
            style("successfully").green(),
            verdict.results.len(),
            verdict.total_steps
        ),
        RunPhase::Skipped => format!("{}{} {}", SKIP, name, style("skipped").dim()),
        _ => {
            let reason = verdict
                .failure
                .as_ref()
                .map(|f| format!(": {}", f))
                .unwrap_or_default();
            format!("{}{} {}{}", CROSS, name, style("failed").red(), reason)
        }
    }
}

/// Format step output with truncation
pub fn format_output(output: &str, max_lines: usize) -> String {
    let lines: Vec<&str> = output.lines().collect();

    if lines.len() <= max_lines {
        output.to_string()
    } else {
        let truncated = lines[..max_lines].join("\n");
        format!(
            "{}\n{}... ({} more lines)",
            truncated,
            style("[truncated]").dim(),
            lines.len() - max_lines
        )
    }
}

/// Format a duration as `1h 2m 3s`
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
