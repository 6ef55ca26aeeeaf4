//! Implementation of the `cirrus completions` command.

use std::io;

use clap::CommandFactory;
use clap_complete::{generate, Shell as CompletionShell};

use crate::{
    cli::{Cli, CompletionsArgs, Shell},
    error::CliResult,
};

pub fn execute(args: CompletionsArgs) -> CliResult<()> {
    let shell = match args.shell {
        Shell::Bash => CompletionShell::Bash,
        Shell::Zsh => CompletionShell::Zsh,
        Shell::Fish => CompletionShell::Fish,
        Shell::PowerShell => CompletionShell::PowerShell,
        Shell::Elvish => CompletionShell::Elvish,
    };
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "cirrus", &mut io::stdout());
    Ok(())
}
