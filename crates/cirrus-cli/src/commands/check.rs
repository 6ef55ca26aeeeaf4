//! Implementation of the `cirrus check` command.
//!
//! Read-only: reports each stack's remote existence and which of its
//! parameters can already be resolved. Never contacts the backend with
//! a mutating call.

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
    super::run_graph_action(Action::Check, args, global, config, output)
}
