//! Implementation of the `cirrus create` command.

use cirrus_core::application::Action;

use crate::{
    cli::{GlobalArgs, RunArgs},
    config::AppConfig,
    error::CliResult,
    output::OutputManager,
};

pub fn execute(
    args: RunArgs,
    global: GlobalArgs,
    config: AppConfig,
    output: OutputManager,
) -> CliResult<()> {
    super::run_graph_action(Action::Create, args, global, config, output)
}
