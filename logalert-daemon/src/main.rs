use anyhow::Result;
use clap::Parser;

use logalert_core::config::LogAlertConfig;
use logalert_daemon::cli::DaemonCli;
use logalert_daemon::orchestrator::{self, Orchestrator};
use logalert_daemon::logging::{self, LogSettings};
use logalert_daemon::metrics_server;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = DaemonCli::parse();
    let config_path = cli.config_file();

    let config = LogAlertConfig::load(&config_path)
        .await
        .map_err(|e| anyhow::anyhow!("failed to load config {}: {}", config_path.display(), e))?;

    config
        .validate()
        .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;
    let log_settings = LogSettings::from_sources(
        &config.general,
        cli.log_level.as_deref(),
        cli.log_format.as_deref(),
    )?;

    if cli.validate {
        println!(
            "configuration is valid: {} ({} targets)",
            config_path.display(),
            config.targets.len()
        );
        return Ok(());
    }

    logging::init_tracing(&log_settings)?;
    tracing::info!(config = %config_path.display(), "logalert starting");

    if config.metrics.enabled {
        let addr = metrics_server::install_metrics_recorder(&config.metrics)?;
        tracing::debug!(listen_addr = %addr, "metrics recorder installed");
    }

    let mut daemon = Orchestrator::new(config_path, config);

    if cli.once {
        daemon.run_once().await?;
        tracing::info!("single cycle finished, exiting");
        return Ok(());
    }

    let token = daemon.shutdown_token();
    tokio::spawn(async move {
        if let Err(e) = orchestrator::cancel_on_signal(token).await {
            tracing::error!(error = %e, "signal handling unavailable");
        }
    });

    if let Err(e) = daemon.run().await {
        tracing::error!(error = format!("{e:#}"), "logalert stopped on fatal error");
        return Err(e);
    }

    tracing::info!("logalert shut down");
    Ok(())
}
