//! Cycle scheduling -- scan, sweep, sleep, reload.
//!
//! The [`Orchestrator`] drives the daemon's single sequential control flow:
//!
//! 1. Run one cycle over every configured target ([`CycleRunner`])
//! 2. Remove stale offset records ([`RetentionSweeper`])
//! 3. Sleep `schedule.minutes_to_sleep` minutes, or stop on shutdown
//! 4. Reload the configuration file and repeat
//!
//! Shutdown is only observed between cycles. A cycle in progress, including
//! its retry backoff, always runs to completion.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Instant, SystemTime};

use anyhow::Result;
use tokio_util::sync::CancellationToken;

use logalert_core::config::LogAlertConfig;
use logalert_core::error::LogAlertError;
use logalert_core::metrics as m;
use logalert_watcher::{
    CycleRunner, MailSender, RetentionSweeper, SmtpMailSender, SweepReport, TargetReport,
};

/// Builds the mail sender for a (re)loaded configuration.
type SenderFactory<M> = Box<dyn Fn(&LogAlertConfig) -> Arc<M> + Send + Sync>;

/// Result of one cycle plus the retention sweep that follows it.
#[derive(Debug, Clone)]
pub struct CycleSummary {
    /// Per-target reports, in configuration order.
    pub reports: Vec<TargetReport>,
    /// Sweep result, `None` if the sweep itself failed.
    pub sweep: Option<SweepReport>,
}

/// The main daemon loop.
pub struct Orchestrator<M: MailSender> {
    /// File to reload before every cycle after the first. `None` disables reload.
    config_path: Option<PathBuf>,
    /// Configuration used for the next cycle.
    config: LogAlertConfig,
    /// Sender factory, called once per cycle with the current configuration.
    make_sender: SenderFactory<M>,
    /// Cancelled on SIGINT/SIGTERM.
    shutdown: CancellationToken,
}

impl Orchestrator<SmtpMailSender> {
    /// Orchestrator that delivers over SMTP and reloads `config_path` each cycle.
    pub fn new(config_path: PathBuf, config: LogAlertConfig) -> Self {
        Self::with_sender_factory(Some(config_path), config, |config| {
            Arc::new(SmtpMailSender::from_config(&config.smtp))
        })
    }
}

impl<M: MailSender> Orchestrator<M> {
    /// Orchestrator with a custom sender factory.
    pub fn with_sender_factory(
        config_path: Option<PathBuf>,
        config: LogAlertConfig,
        make_sender: impl Fn(&LogAlertConfig) -> Arc<M> + Send + Sync + 'static,
    ) -> Self {
        Self {
            config_path,
            config,
            make_sender: Box::new(make_sender),
            shutdown: CancellationToken::new(),
        }
    }

    /// Token that stops the loop at the next cycle boundary when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Get a reference to the current configuration.
    pub fn config(&self) -> &LogAlertConfig {
        &self.config
    }

    /// Run one cycle over all targets, then the retention sweep.
    ///
    /// # Errors
    ///
    /// Returns a [`LogAlertError::Target`] if a target has conflicting terms,
    /// an improper date placeholder, or a location that names no file.
    /// Operational failures are logged and reported in the summary instead.
    pub async fn run_once(&self) -> Result<CycleSummary> {
        let started = Instant::now();
        let runner = CycleRunner::from_config(&self.config, (self.make_sender)(&self.config));

        tracing::info!(targets = self.config.targets.len(), "starting cycle");
        let reports = runner
            .run_cycle(&self.config.targets)
            .await
            .map_err(|e| anyhow::Error::new(LogAlertError::from(e)).context("cycle aborted"))?;

        let sweeper = RetentionSweeper::new(runner.offsets(), self.config.retention.max_age());
        let sweep = match sweeper.sweep(SystemTime::now()).await {
            Ok(report) => Some(report),
            Err(e) => {
                tracing::error!(error = %e, "retention sweep failed");
                None
            }
        };

        let elapsed = started.elapsed();
        metrics::counter!(m::CYCLES_TOTAL).increment(1);
        metrics::histogram!(m::CYCLE_DURATION_SECONDS).record(elapsed.as_secs_f64());

        tracing::info!(
            targets = reports.len(),
            swept = sweep.as_ref().map_or(0, |s| s.removed.len()),
            elapsed_ms = elapsed.as_millis() as u64,
            "cycle finished"
        );

        Ok(CycleSummary { reports, sweep })
    }

    /// Run cycles until the shutdown token is cancelled.
    ///
    /// # Errors
    ///
    /// Returns an error on a fatal target error or when the configuration
    /// cannot be reloaded.
    pub async fn run(&mut self) -> Result<()> {
        loop {
            self.run_once().await?;

            let interval = self.config.schedule.interval();
            tracing::info!(
                sleep_secs = interval.as_secs(),
                "sleeping until next cycle"
            );

            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    tracing::info!("shutdown requested, stopping");
                    return Ok(());
                }
                _ = tokio::time::sleep(interval) => {}
            }

            self.reload().await?;
        }
    }

    async fn reload(&mut self) -> Result<()> {
        let Some(path) = &self.config_path else {
            return Ok(());
        };

        let config = LogAlertConfig::load(path)
            .await
            .map_err(|e| anyhow::anyhow!("failed to reload config {}: {}", path.display(), e))?;

        tracing::debug!(targets = config.targets.len(), "configuration reloaded");
        self.config = config;
        Ok(())
    }
}

/// Cancel `token` when SIGINT or SIGTERM arrives.
///
/// # Errors
///
/// Returns an error if signal handlers cannot be installed.
pub async fn cancel_on_signal(token: CancellationToken) -> Result<()> {
    let signal = wait_for_shutdown_signal().await?;
    tracing::info!(signal = signal, "shutdown signal received");
    token.cancel();
    Ok(())
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() -> Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("failed to install SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("failed to install SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("failed to install Ctrl-C handler: {}", e))?;
    Ok("Ctrl-C")
}
