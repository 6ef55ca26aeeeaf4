//! Command handlers and the plumbing they share.

pub mod check;
pub mod completions;
pub mod create;
pub mod delete;
pub mod update;
pub mod watch;

use std::path::Path;
use std::time::Duration;

use tracing::info;

use cirrus_adapters::{ConfigLoader, InMemoryProvisioner};
use cirrus_core::{
    application::{Action, DeployService, RunReport, StackOutcome},
    domain::{StackName, StackSet},
    error::CirrusError,
};

use crate::{
    cli::{GlobalArgs, RunArgs},
    config::AppConfig,
    error::{CliError, CliResult},
    output::{EventPrinter, OutputManager},
};

/// Load and validate the stack-set document.
pub(crate) fn load_stack_set(path: &Path) -> CliResult<StackSet> {
    let set = ConfigLoader::new(path)
        .load()
        .map_err(|e| CliError::Core(CirrusError::from(e)))?;
    info!(set = %set.name, stacks = set.stacks().len(), "Stack set loaded");
    Ok(set)
}

/// Wire a deploy service: simulated backend, event printing, polling.
pub(crate) fn build_service(
    config: &AppConfig,
    output: &OutputManager,
    set: &StackSet,
) -> DeployService {
    let provisioner = InMemoryProvisioner::new().with_settle_ticks(config.run.settle_ticks);
    let highlight = output.supports_color() && set.highlight_output;
    DeployService::new(Box::new(provisioner))
        .with_observer(Box::new(EventPrinter::new(output.is_quiet(), highlight)))
        .with_poll_interval(Duration::from_secs(config.run.poll_interval_secs))
}

/// Shared driver for the graph-wide actions (`create`, `update`, `check`).
pub(crate) fn run_graph_action(
    action: Action,
    args: RunArgs,
    _global: GlobalArgs,
    config: AppConfig,
    output: OutputManager,
) -> CliResult<()> {
    let set = load_stack_set(&args.file)?;
    let service = build_service(&config, &output, &set);
    let only = args.stack.as_deref().map(StackName::from);

    output.header(&format!(
        "{} stack set '{}' ({} stacks)",
        action_heading(action),
        set.name,
        set.enabled().count()
    ))?;

    let report = service.run(&set, action, only.as_ref())?;
    print_report(&output, &report)?;
    into_result(report)
}

fn action_heading(action: Action) -> &'static str {
    match action {
        Action::Create => "Creating",
        Action::Update => "Updating",
        Action::Delete => "Deleting",
        Action::Check => "Checking",
    }
}

/// One line per stack, styled by how it ended.
pub(crate) fn print_report(output: &OutputManager, report: &RunReport) -> CliResult<()> {
    for (name, outcome) in report.outcomes() {
        match outcome {
            StackOutcome::Succeeded => output.success(&format!("{name}: {outcome}"))?,
            StackOutcome::Failed(_) => output.error(&format!("{name}: {outcome}"))?,
            StackOutcome::Skipped => output.warning(&format!("{name}: {outcome}"))?,
            _ => output.print(&format!("  {name}: {outcome}"))?,
        }
    }
    Ok(())
}

/// Fold a finished report into the command result: any failed or skipped
/// stack turns the run into an error with exit code 1.
pub(crate) fn into_result(report: RunReport) -> CliResult<()> {
    if report.succeeded() {
        return Ok(());
    }
    Err(CliError::RunFailed {
        action: report.action.to_string(),
        failed: report
            .failed()
            .map(|(name, reason)| (name.to_string(), reason.to_string()))
            .collect(),
        skipped: report.skipped().map(ToString::to_string).collect(),
    })
}
