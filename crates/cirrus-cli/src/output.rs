//! Output management and formatting.
//!
//! Everything user-facing goes through [`OutputManager`]; backend events
//! observed during a wait or a watch go through [`EventPrinter`], which
//! colours each line by its status the same way the status map does.

use std::io;

use console::Term;
use owo_colors::OwoColorize;

use cirrus_core::application::ports::{EventObserver, StackEvent};

use crate::cli::global::GlobalArgs;
use crate::config::AppConfig;

/// Manages CLI output based on configuration.
pub struct OutputManager {
    quiet: bool,
    no_color: bool,
    term: Term,
}

impl OutputManager {
    /// Build an `OutputManager` from parsed CLI flags and loaded config.
    pub fn new(args: &GlobalArgs, config: &AppConfig) -> Self {
        Self {
            quiet: args.quiet,
            no_color: args.no_color || config.output.no_color,
            term: Term::stdout(),
        }
    }

    // ── Public write methods ───────────────────────────────────────────────

    /// Generic message; suppressed in quiet mode.
    pub fn print(&self, msg: &str) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        self.term.write_line(msg)
    }

    /// Success indicator: `✓ <msg>`.
    pub fn success(&self, msg: &str) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        let line = if self.no_color {
            format!("\u{2713} {msg}") // ✓
        } else {
            format!("{} {}", "\u{2713}".green().bold(), msg.green())
        };
        self.term.write_line(&line)
    }

    /// Error indicator: `✗ <msg>`.  *Not* suppressed in quiet mode — errors
    /// must always be visible.
    pub fn error(&self, msg: &str) -> io::Result<()> {
        let line = if self.no_color {
            format!("\u{2717} {msg}") // ✗
        } else {
            format!("{} {}", "\u{2717}".red().bold(), msg.red())
        };
        self.term.write_line(&line)
    }

    /// Warning indicator: `⚠ <msg>`.
    pub fn warning(&self, msg: &str) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        let line = if self.no_color {
            format!("\u{26a0} {msg}") // ⚠
        } else {
            format!("{} {}", "\u{26a0}".yellow().bold(), msg.yellow())
        };
        self.term.write_line(&line)
    }

    /// Bold cyan header line.
    pub fn header(&self, text: &str) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        let line = if self.no_color {
            text.to_owned()
        } else {
            text.cyan().bold().to_string()
        };
        self.term.write_line(&line)
    }

    /// One `<stack>: <status>` line, coloured by the status map.
    pub fn status_line(&self, stack: &str, status: &str) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        let line = format!("  {stack}: {}", style_status(status, self.no_color));
        self.term.write_line(&line)
    }

    // ── Accessors ─────────────────────────────────────────────────────────

    /// `true` if ANSI colours are enabled.
    pub fn supports_color(&self) -> bool {
        !self.no_color
    }

    /// `true` if quiet mode suppresses most output.
    pub fn is_quiet(&self) -> bool {
        self.quiet
    }
}

/// Colour a backend status string: green for settled success, red for
/// failures and rollbacks, yellow for anything still moving.
pub fn style_status(status: &str, no_color: bool) -> String {
    if no_color {
        return status.to_owned();
    }
    if status.contains("FAILED") || status.contains("ROLLBACK") {
        status.red().to_string()
    } else if status.ends_with("IN_PROGRESS") {
        status.yellow().to_string()
    } else if status.ends_with("COMPLETE") {
        status.green().to_string()
    } else {
        status.to_owned()
    }
}

// ── Event printing ────────────────────────────────────────────────────────────

/// Prints backend events as the orchestrator observes them.
///
/// Plugged into `DeployService` as its event observer; honours both
/// `--no-color` and the stack set's `highlight-output` switch.
pub struct EventPrinter {
    quiet: bool,
    highlight: bool,
    term: Term,
}

impl EventPrinter {
    pub fn new(quiet: bool, highlight: bool) -> Self {
        Self {
            quiet,
            highlight,
            term: Term::stdout(),
        }
    }
}

impl EventObserver for EventPrinter {
    fn on_event(&self, event: &StackEvent) {
        if self.quiet {
            return;
        }
        let status = style_status(&event.resource_status, !self.highlight);
        let reason = event
            .reason
            .as_deref()
            .map(|r| format!("  ({r})"))
            .unwrap_or_default();
        let line = format!(
            "  {}  {}  {} [{}]  {}{}",
            event.timestamp.format("%H:%M:%S"),
            event.stack_name,
            event.logical_id,
            event.resource_type,
            status,
            reason,
        );
        let _ = self.term.write_line(&line);
    }
}

// ── tests ─────────────────────────────────────────────────────────────────────
