//! Implementation of the `cirrus watch` command.
//!
//! Streams backend events for one stack until its status changes from
//! what it was when the watch began, then reports the new status.

use cirrus_core::domain::StackName;

use crate::{
    cli::{GlobalArgs, WatchArgs},
    config::AppConfig,
    error::CliResult,
    output::OutputManager,
};

pub fn execute(
    args: WatchArgs,
    _global: GlobalArgs,
    config: AppConfig,
    output: OutputManager,
) -> CliResult<()> {
    let set = super::load_stack_set(&args.file)?;
    let service = super::build_service(&config, &output, &set);
    let target = StackName::from(args.stack.as_str());

    output.header(&format!("Watching stack '{target}'"))?;
    let status = service.watch(&set, &target)?;
    output.status_line(target.as_str(), status.as_str())?;
    Ok(())
}
