//! Command-line interface definitions.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{AppSettings, Backend};

/// Periodically reloaded runtime configuration fetched from object storage.
#[derive(Parser, Debug)]
#[command(name = "runtime-config", version, about, long_about = None)]
pub struct Cli {
    /// Path to the settings file. Defaults apply when omitted.
    #[arg(short, long, env = "RUNTIME_CONFIG_SETTINGS", global = true)]
    pub config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(flatten)]
    pub overrides: SettingsOverrides,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Returns the log level based on verbosity flags.
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the manager and keep reloading the runtime config file.
    Run(RunArgs),

    /// Fetch and decode the runtime config file once, then print it.
    Check,
}

/// Arguments for the run subcommand.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Do not serve the Prometheus metrics endpoint.
    #[arg(long, default_value = "false")]
    pub no_metrics: bool,
}

/// Flags taking precedence over the settings file.
#[derive(Args, Debug, Default)]
pub struct SettingsOverrides {
    /// File with the configuration that can be updated at runtime.
    #[arg(long, env = "RUNTIME_CONFIG_FILE", global = true)]
    pub file: Option<String>,

    /// How often to check the runtime config file, in seconds.
    #[arg(long, env = "RUNTIME_CONFIG_RELOAD_PERIOD", global = true)]
    pub reload_period: Option<u64>,

    /// Storage backend the runtime config file is read from.
    #[arg(long, value_enum, global = true)]
    pub backend: Option<Backend>,

    /// Directory object paths are resolved against for the filesystem backend.
    #[arg(long, global = true)]
    pub filesystem_dir: Option<PathBuf>,

    /// Port for the Prometheus metrics endpoint.
    #[arg(long, global = true)]
    pub metrics_port: Option<u16>,
}

impl SettingsOverrides {
    /// Applies every flag that was given to `settings`.
    pub fn apply(&self, settings: &mut AppSettings) {
        let runtime_config = &mut settings.runtime_config;

        if let Some(file) = &self.file {
            runtime_config.file = file.clone();
        }
        if let Some(period) = self.reload_period {
            runtime_config.period_seconds = period;
        }
        if let Some(backend) = self.backend {
            runtime_config.storage.backend = backend;
        }
        if let Some(dir) = &self.filesystem_dir {
            runtime_config.storage.filesystem.dir = dir.clone();
        }
        if let Some(port) = self.metrics_port {
            settings.metrics.port = port;
        }
    }
}
