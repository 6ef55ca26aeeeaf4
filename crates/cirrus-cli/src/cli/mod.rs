//! CLI argument definitions using the clap derive API.
//!
//! This module is the *only* place that knows about argument names, aliases,
//! help text, and value enums.  No business logic lives here.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

pub mod global;
pub use global::GlobalArgs;

// ── Top-level CLI ─────────────────────────────────────────────────────────────

/// Main CLI entry-point.
#[derive(Debug, Parser)]
#[command(
    name    = "cirrus",
    bin_name = "cirrus",
    version  = env!("CARGO_PKG_VERSION"),
    author   = env!("CARGO_PKG_AUTHORS"),
    about    = "\u{2601} Multi-stack infrastructure orchestration",
    long_about = "Cirrus drives ordered create/update/delete runs over a set \
                  of dependent infrastructure stacks described in one YAML \
                  document, resolving cross-stack references along the way.",
    after_help = "EXAMPLES:\n\
        \x20 cirrus create -f stacks.yaml\n\
        \x20 cirrus update -f stacks.yaml --stack app\n\
        \x20 cirrus delete -f stacks.yaml --yes\n\
        \x20 cirrus check  -f stacks.yaml\n\
        \x20 cirrus watch  -f stacks.yaml --stack vpc",
    arg_required_else_help = true,
    subcommand_required    = true,
)]
pub struct Cli {
    /// Flags available on every subcommand.
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

// ── Subcommands ───────────────────────────────────────────────────────────────

/// All available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Create every stack in dependency order.
    #[command(
        about = "Create stacks in dependency order",
        after_help = "EXAMPLES:\n\
            \x20 cirrus create -f stacks.yaml\n\
            \x20 cirrus create -f stacks.yaml --stack vpc"
    )]
    Create(RunArgs),

    /// Update every stack in dependency order.
    #[command(
        about = "Update stacks in dependency order",
        after_help = "EXAMPLES:\n\
            \x20 cirrus update -f stacks.yaml\n\
            \x20 cirrus update -f stacks.yaml --stack app"
    )]
    Update(RunArgs),

    /// Delete stacks in reverse dependency order.
    #[command(
        about = "Delete stacks in reverse dependency order",
        after_help = "EXAMPLES:\n\
            \x20 cirrus delete -f stacks.yaml          # asks per stack\n\
            \x20 cirrus delete -f stacks.yaml --yes\n\
            \x20 cirrus delete -f stacks.yaml --stack app --yes"
    )]
    Delete(DeleteArgs),

    /// Report each stack's remote state without changing anything.
    #[command(
        about = "Report stack state (read-only)",
        after_help = "EXAMPLES:\n\
            \x20 cirrus check -f stacks.yaml\n\
            \x20 cirrus check -f stacks.yaml --stack db"
    )]
    Check(RunArgs),

    /// Stream one stack's backend events until its status changes.
    #[command(
        about = "Watch a single stack's event stream",
        after_help = "EXAMPLES:\n\
            \x20 cirrus watch -f stacks.yaml --stack vpc"
    )]
    Watch(WatchArgs),

    /// Generate shell completion scripts.
    #[command(
        about = "Generate shell completions",
        after_help = "EXAMPLES:\n\
            \x20 cirrus completions bash > ~/.local/share/bash-completion/completions/cirrus\n\
            \x20 cirrus completions zsh  > ~/.zfunc/_cirrus\n\
            \x20 cirrus completions fish > ~/.config/fish/completions/cirrus.fish"
    )]
    Completions(CompletionsArgs),
}

// ── shared run arguments ──────────────────────────────────────────────────────

/// Arguments shared by the graph-wide actions (`create`, `update`, `check`).
#[derive(Debug, Args)]
pub struct RunArgs {
    /// Stack-set configuration document.
    #[arg(
        short = 'f',
        long = "file",
        value_name = "FILE",
        help = "Stack-set configuration file"
    )]
    pub file: PathBuf,

    /// Restrict processing to a single stack (its place in the execution
    /// order is still honoured).
    #[arg(
        short = 's',
        long = "stack",
        value_name = "NAME",
        help = "Only process the named stack"
    )]
    pub stack: Option<String>,
}

/// Arguments for `cirrus delete`.
#[derive(Debug, Args)]
pub struct DeleteArgs {
    #[command(flatten)]
    pub run: RunArgs,

    /// Skip the per-stack confirmation prompts.
    #[arg(short = 'y', long = "yes", help = "Delete without asking per stack")]
    pub yes: bool,
}

/// Arguments for `cirrus watch`.
#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Stack-set configuration document.
    #[arg(
        short = 'f',
        long = "file",
        value_name = "FILE",
        help = "Stack-set configuration file"
    )]
    pub file: PathBuf,

    /// The stack to watch.
    #[arg(
        short = 's',
        long = "stack",
        value_name = "NAME",
        help = "Stack to watch"
    )]
    pub stack: String,
}

// ── completions ───────────────────────────────────────────────────────────────

/// Arguments for `cirrus completions`.
#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Target shell.
    #[arg(value_enum, help = "Shell to generate completions for")]
    pub shell: Shell,
}

/// Supported shells for completion generation.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

// ── tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn parse_create_command() {
        let cli = Cli::parse_from(["cirrus", "create", "-f", "stacks.yaml"]);
        match cli.command {
            Commands::Create(args) => {
                assert_eq!(args.file.to_str(), Some("stacks.yaml"));
                assert!(args.stack.is_none());
            }
            other => panic!("expected Create, got {other:?}"),
        }
    }

    #[test]
    fn stack_filter_is_optional_on_runs() {
        let cli = Cli::parse_from(["cirrus", "update", "-f", "s.yaml", "--stack", "app"]);
        match cli.command {
            Commands::Update(args) => assert_eq!(args.stack.as_deref(), Some("app")),
            other => panic!("expected Update, got {other:?}"),
        }
    }

    #[test]
    fn watch_requires_a_stack() {
        assert!(Cli::try_parse_from(["cirrus", "watch", "-f", "s.yaml"]).is_err());
        assert!(Cli::try_parse_from(["cirrus", "watch", "-f", "s.yaml", "-s", "vpc"]).is_ok());
    }

    #[test]
    fn delete_accepts_yes_flag() {
        let cli = Cli::parse_from(["cirrus", "delete", "-f", "s.yaml", "--yes"]);
        match cli.command {
            Commands::Delete(args) => assert!(args.yes),
            other => panic!("expected Delete, got {other:?}"),
        }
    }

    #[test]
    fn quiet_and_verbose_conflict() {
        // clap should reject --quiet --verbose together
        let result = Cli::try_parse_from(["cirrus", "--quiet", "--verbose", "check", "-f", "s"]);
        assert!(result.is_err());
    }
}
