//! CLI argument definitions for the `logalert` binary.
//!
//! Uses `clap` v4 derive macros to parse command-line arguments.

use std::path::PathBuf;

use clap::Parser;

/// Default configuration path when none is given.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/logalert/logalert.toml";

/// Log file watcher that mails matching lines to the configured recipients.
#[derive(Parser, Debug)]
#[command(name = "logalert")]
#[command(version, about, long_about = None)]
pub struct DaemonCli {
    /// Path to the configuration file (`.toml`, or legacy `.json`).
    #[arg(short, long, conflicts_with = "config_path")]
    pub config: Option<PathBuf>,

    /// Configuration file given as a positional argument.
    #[arg(value_name = "CONFIG")]
    pub config_path: Option<PathBuf>,

    /// Override log level (trace, debug, info, warn, error).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Override log format (json, pretty).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_format: Option<String>,

    /// Validate configuration file and exit without scanning.
    #[arg(long)]
    pub validate: bool,

    /// Run a single cycle and retention sweep, then exit.
    #[arg(long)]
    pub once: bool,
}

impl DaemonCli {
    /// Configuration path from `--config`, the positional argument, or the default.
    pub fn config_file(&self) -> PathBuf {
        self.config
            .clone()
            .or_else(|| self.config_path.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
    }
}
