//! Implementation of the `cirrus delete` command.
//!
//! Deletion is interactive by default: each stack is confirmed before it
//! goes, in reverse dependency order. Declining a stack keeps everything
//! it depends on as well, since those may still be referenced.

use cirrus_core::{
    application::Action,
    domain::{DependencyGraph, StackName},
    error::CirrusError,
};

use crate::{
    cli::{DeleteArgs, GlobalArgs},
    config::AppConfig,
    error::{CliError, CliResult},
    output::OutputManager,
};

pub fn execute(
    args: DeleteArgs,
    _global: GlobalArgs,
    config: AppConfig,
    output: OutputManager,
) -> CliResult<()> {
    let set = super::load_stack_set(&args.run.file)?;
    let service = super::build_service(&config, &output, &set);

    if let Some(name) = args.run.stack.as_deref() {
        let target = StackName::from(name);
        if !args.yes && !confirm(&format!("Delete stack '{target}'?"))? {
            return Err(CliError::Cancelled);
        }
        let report = service.run(&set, Action::Delete, Some(&target))?;
        super::print_report(&output, &report)?;
        return super::into_result(report);
    }

    output.header(&format!(
        "Deleting stack set '{}' ({} stacks)",
        set.name,
        set.enabled().count()
    ))?;

    if args.yes {
        let report = service.run(&set, Action::Delete, None)?;
        super::print_report(&output, &report)?;
        return super::into_result(report);
    }

    // Per-stack confirmation. Walk the reversed execution order ourselves so
    // a "no" can stop before anything the kept stack depends on is touched.
    let graph = DependencyGraph::build(&set).map_err(CirrusError::from)?;
    let order = graph.execution_order().map_err(CirrusError::from)?;
    for target in order.reversed() {
        if !confirm(&format!("Delete stack '{target}'?"))? {
            output.warning(&format!(
                "Keeping '{target}' and everything it depends on"
            ))?;
            return Err(CliError::Cancelled);
        }
        let report = service.run(&set, Action::Delete, Some(&target))?;
        super::print_report(&output, &report)?;
        if !report.succeeded() {
            return super::into_result(report);
        }
    }
    Ok(())
}

#[cfg(feature = "interactive")]
fn confirm(prompt: &str) -> CliResult<bool> {
    dialoguer::Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()
        .map_err(|e| CliError::IoError {
            message: "confirmation prompt failed".to_string(),
            source: std::io::Error::other(e),
        })
}

#[cfg(not(feature = "interactive"))]
fn confirm(_prompt: &str) -> CliResult<bool> {
    Err(CliError::FeatureNotAvailable {
        feature: "interactive",
    })
}
