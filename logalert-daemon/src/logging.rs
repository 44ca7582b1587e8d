//! Tracing setup for the `logalert` binary.
//!
//! The effective filter and output format come from three places, highest
//! precedence first:
//!
//! 1. `--log-level` / `--log-format` on the command line
//! 2. `RUST_LOG` (filter only)
//! 3. `general.log_level` / `general.log_format` in the config file
//!
//! The config file is never rewritten with command-line values, so a reload
//! always sees exactly what is on disk.

use std::str::FromStr;

use anyhow::{Context, Result, bail};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use logalert_core::config::GeneralConfig;

/// Output format of the log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per line.
    Json,
    /// Multi-line human-readable output.
    Pretty,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            other => bail!("unknown log format '{other}', expected 'json' or 'pretty'"),
        }
    }
}

/// Resolved logging settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    /// `EnvFilter` directives, e.g. `info` or `logalert_watcher=debug`.
    pub filter: String,
    /// Line format.
    pub format: LogFormat,
}

impl LogSettings {
    /// Resolve settings from the command line, `RUST_LOG` and the config file.
    ///
    /// # Errors
    ///
    /// Fails on an unknown level or format, or on a `RUST_LOG` that is not a
    /// valid filter.
    pub fn from_sources(
        config: &GeneralConfig,
        level_override: Option<&str>,
        format_override: Option<&str>,
    ) -> Result<Self> {
        let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
        Self::resolve(config, level_override, format_override, rust_log.as_deref())
    }

    fn resolve(
        config: &GeneralConfig,
        level_override: Option<&str>,
        format_override: Option<&str>,
        rust_log: Option<&str>,
    ) -> Result<Self> {
        let filter = match (level_override, rust_log.map(str::trim)) {
            (Some(level), _) => {
                let level = LevelFilter::from_str(level.trim())
                    .map_err(|_| anyhow::anyhow!("unknown log level '{level}'"))?;
                level.to_string().to_ascii_lowercase()
            }
            (None, Some(directives)) if !directives.is_empty() => {
                EnvFilter::try_new(directives)
                    .with_context(|| format!("invalid {} '{directives}'", EnvFilter::DEFAULT_ENV))?;
                directives.to_owned()
            }
            _ => config.log_level.clone(),
        };

        let format = format_override
            .unwrap_or(config.log_format.as_str())
            .parse::<LogFormat>()?;

        Ok(Self { filter, format })
    }
}

/// Install the global subscriber. Call once, before the first log line.
///
/// # Errors
///
/// Fails if the filter does not parse or a subscriber is already set.
pub fn init_tracing(settings: &LogSettings) -> Result<()> {
    let filter = EnvFilter::try_new(&settings.filter)
        .with_context(|| format!("invalid log filter '{}'", settings.filter))?;

    let (json, pretty) = match settings.format {
        LogFormat::Json => (Some(fmt::layer().json()), None),
        LogFormat::Pretty => (None, Some(fmt::layer().pretty())),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(json)
        .with(pretty)
        .try_init()
        .context("failed to initialize tracing subscriber")
}
