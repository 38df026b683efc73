mod cli;
mod core;
mod execution;
mod persistence;

use anyhow::{Context, Result};
use cli::commands::{HistoryCommand, RunCommand, ValidateCommand};
use cli::output::*;
use cli::{Cli, Command};
use execution::{ExecutionEngine, ExecutionEvent, LocalProvisioner, ShellExecutor};
use indicatif::ProgressBar;
use persistence::{create_summary, InMemoryPersistence, PersistenceBackend, RunSummary};
use std::sync::{Arc, Mutex};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::from_args();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set logging subscriber")?;

    // Execute command
    match &cli.command {
        Command::Run(cmd) => run_workflow(cmd, cli.stream).await?,
        Command::Validate(cmd) => validate_workflow(cmd)?,
        Command::History(cmd) => show_history(cmd).await?,
    }

    Ok(())
}

#[cfg(feature = "sqlite")]
async fn history_store() -> Result<Arc<dyn PersistenceBackend>> {
    Ok(Arc::new(persistence::SqliteRunStore::with_default_path().await?))
}

#[cfg(not(feature = "sqlite"))]
async fn history_store() -> Result<Arc<dyn PersistenceBackend>> {
    tracing::warn!("Built without the sqlite feature; run history is not kept");
    Ok(Arc::new(InMemoryPersistence::new()))
}

async fn run_workflow(cmd: &RunCommand, stream: bool) -> Result<()> {
    // Load workflow config
    let config = core::config::WorkflowConfig::from_file(&cmd.file)
        .context("Failed to load workflow config")?;
    let workflow = config.to_workflow();
    let event = cmd.to_event();

    println!(
        "{}Loaded workflow: {} ({} steps)",
        INFO,
        style(&workflow.name).bold(),
        style(workflow.step_count()).cyan()
    );

    // Set up persistence
    let store: Arc<dyn PersistenceBackend> = if cmd.no_history {
        Arc::new(InMemoryPersistence::new())
    } else {
        history_store().await?
    };

    let mut engine = ExecutionEngine::new(
        ShellExecutor::default(),
        LocalProvisioner::new(ShellExecutor::default()),
    );

    // Console output; a spinner covers each running step unless streaming
    let spinner: Arc<Mutex<Option<ProgressBar>>> = Arc::new(Mutex::new(None));
    let active = spinner.clone();
    engine.add_event_handler(move |event| {
        match &event {
            ExecutionEvent::StepStarted {
                step_index,
                step_name,
                total_steps,
            } => {
                let label = format!("[{}/{}] {}", step_index + 1, total_steps, step_name);
                if stream {
                    println!("{}{}", SPINNER, style(label).cyan());
                } else if let Ok(mut slot) = active.lock() {
                    *slot = Some(create_spinner(label));
                }
                return;
            }
            ExecutionEvent::StepFinished { .. } => {
                if let Ok(mut slot) = active.lock() {
                    if let Some(bar) = slot.take() {
                        bar.finish_and_clear();
                    }
                }
            }
            _ => {}
        }

        if let Some(line) = format_execution_event(&event) {
            println!("{}", line);
        }

        if let ExecutionEvent::StepFinished { result } = &event {
            if stream {
                if !result.stdout.is_empty() {
                    print!("{}", result.stdout);
                }
                if !result.stderr.is_empty() {
                    eprint!("{}", result.stderr);
                }
            } else if !result.succeeded && !result.stderr.is_empty() {
                println!("{}", style(format_output(result.stderr.trim_end(), 10)).dim());
            }
        }
    });

    // Execute workflow; Ctrl-C drops the run, which kills the running step
    println!();
    let outcome = tokio::select! {
        verdict = engine.execute(&event, &workflow) => Some(verdict?),
        _ = tokio::signal::ctrl_c() => None,
    };

    let Some(verdict) = outcome else {
        if let Ok(mut slot) = spinner.lock() {
            if let Some(bar) = slot.take() {
                bar.finish_and_clear();
            }
        }
        println!(
            "\n{}{} {}",
            CROSS,
            style(&workflow.name).bold(),
            style("terminated").red()
        );
        std::process::exit(1);
    };

    // Save to history
    if !cmd.no_history {
        let summary = create_summary(&verdict);
        store.save_run(&summary).await?;
        println!(
            "\n{}Run saved to history (ID: {})",
            INFO,
            style(&summary.run_id.to_string()[..8]).dim()
        );
    }

    println!("\n{}", format_verdict(&verdict));

    let code = verdict.exit_code();
    if code != 0 {
        std::process::exit(code);
    }

    Ok(())
}

fn validate_workflow(cmd: &ValidateCommand) -> Result<()> {
    println!("{}Validating workflow...", INFO);

    match core::config::WorkflowConfig::from_file(&cmd.file) {
        Ok(config) => {
            let triggers: Vec<&str> = [
                config.triggers.push.as_ref().map(|_| "push"),
                config.triggers.pull_request.as_ref().map(|_| "pull_request"),
                config.triggers.manual.then_some("manual"),
            ]
            .into_iter()
            .flatten()
            .collect();

            println!("{}Workflow configuration is valid!", CHECK);
            println!("  Name: {}", style(&config.name).bold());
            println!("  Triggers: {}", style(triggers.join(", ")).cyan());
            println!("  Runtime: {}", style(&config.job.runtime_version).cyan());
            println!("  Steps: {}", style(config.job.steps.len()).cyan());

            if cmd.json {
                let json = serde_json::to_string_pretty(&config)?;
                println!("\n{}", json);
            }
            Ok(())
        }
        Err(e) => {
            println!("{}Validation failed:", CROSS);
            println!("  {}", style(format!("{:#}", e)).red());
            std::process::exit(1);
        }
    }
}

async fn show_history(cmd: &HistoryCommand) -> Result<()> {
    let store = history_store().await?;

    // If a specific run ID is requested
    if let Some(run_id) = &cmd.run_id {
        let run_id = uuid::Uuid::parse_str(run_id).context("Invalid run ID format")?;

        match store.load_run(run_id).await? {
            Some(summary) => print_run_details(&summary, cmd.json)?,
            None => println!("{}Run not found", WARN),
        }
        return Ok(());
    }

    let mut runs = match &cmd.workflow {
        Some(workflow_name) => store.list_runs(workflow_name).await?,
        None => {
            let mut all_runs = Vec::new();
            for workflow_name in store.list_workflows().await? {
                all_runs.extend(store.list_runs(&workflow_name).await?);
            }
            all_runs.sort_by(|a, b| b.started_at.cmp(&a.started_at));
            all_runs
        }
    };
    runs.truncate(cmd.limit);

    if cmd.json {
        let data = serde_json::json!({ "runs": runs });
        println!("{}", serde_json::to_string_pretty(&data)?);
        return Ok(());
    }

    if runs.is_empty() {
        println!("{}No runs found", INFO);
        return Ok(());
    }

    println!("{}Run history (showing latest {}):", INFO, runs.len());
    for summary in &runs {
        println!("  {}", format_run_summary(summary));
    }

    Ok(())
}

fn print_run_details(summary: &RunSummary, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(summary)?);
        return Ok(());
    }

    println!("{}Run Details", INFO);
    println!("  ID: {}", style(summary.run_id).cyan());
    println!("  Workflow: {}", style(&summary.workflow_name).bold());
    println!(
        "  Event: {}{}",
        summary.event_kind,
        summary
            .branch
            .as_deref()
            .map(|b| format!(" ({})", b))
            .unwrap_or_default()
    );
    println!("  Phase: {}", format_phase(summary.phase));
    println!("  Started: {}", style(summary.started_at.to_rfc3339()).dim());
    if let Some(completed) = summary.completed_at {
        println!("  Completed: {}", style(completed.to_rfc3339()).dim());
        if let Ok(duration) = completed.signed_duration_since(summary.started_at).to_std() {
            println!("  Duration: {}", style(format_duration(duration)).dim());
        }
    }
    println!(
        "  Progress: {} ({}/{})",
        style(format!("{:.0}%", summary.progress() * 100.0)).cyan(),
        summary.executed_steps,
        summary.total_steps
    );
    if let Some(failure) = &summary.failure {
        println!("  Failure: {}", style(failure).red());
    }

    Ok(())
}
