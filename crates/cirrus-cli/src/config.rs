//! Application configuration.
//!
//! [`AppConfig`] is loaded once at startup and passed down by value.  The
//! CLI layer owns config; the core crate never sees it.  This is the
//! tool's own configuration (polling, output), not the stack-set
//! document — that one is loaded per command via `cirrus-adapters`.
//!
//! # Resolution order (highest priority first)
//!
//! 1. CLI flags (handled at the call-site, not here)
//! 2. Environment variables (`CIRRUS__RUN__POLL_INTERVAL_SECS`, ...)
//! 3. Config file (`--config`, or the default location)
//! 4. Built-in defaults (always present)

use std::path::PathBuf;

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Run behaviour.
    #[serde(default)]
    pub run: RunConfig,
    /// Output settings.
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunConfig {
    /// Seconds between describe polls while waiting on an operation.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    /// Describe calls the simulated backend stays in progress for.
    #[serde(default)]
    pub settle_ticks: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputConfig {
    /// Disable colours even on a TTY (same effect as --no-color).
    #[serde(default)]
    pub no_color: bool,
}

fn default_poll_interval() -> u64 {
    1
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            settle_ticks: 0,
        }
    }
}

impl AppConfig {
    /// Load configuration: defaults, then the config file (explicit path
    /// must exist, default path may be absent), then `CIRRUS__` env vars.
    pub fn load(config_file: Option<&PathBuf>) -> anyhow::Result<Self> {
        let mut builder = config::Config::builder();

        match config_file {
            Some(path) => {
                builder = builder.add_source(config::File::from(path.clone()));
            }
            None => {
                builder =
                    builder.add_source(config::File::from(Self::config_path()).required(false));
            }
        }

        builder = builder.add_source(
            config::Environment::with_prefix("CIRRUS")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Path to the default configuration file.
    ///
    /// Uses `directories::ProjectDirs` for cross-platform correctness,
    /// falling back to `.cirrus.toml` in the current directory.
    pub fn config_path() -> PathBuf {
        directories::ProjectDirs::from("com", "cirrus", "cirrus")
            .map(|d| d.config_dir().join("config.toml"))
            .unwrap_or_else(|| PathBuf::from(".cirrus.toml"))
    }
}
