//! Prometheus scrape endpoint for cycle and delivery counters.
//!
//! The `[metrics]` section decides whether the endpoint exists at all and
//! where it binds. Everything under `logalert_*` is served from
//! `http://<listen_addr>:<port>/metrics`.

use std::net::{IpAddr, SocketAddr};

use anyhow::{Context, Result};
use logalert_core::config::MetricsConfig;
use logalert_core::metrics as m;
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};

/// Histogram buckets for one full cycle, in seconds.
///
/// A cycle that exhausts its retries waits `max_retries * backoff`, so the
/// upper buckets cover tens of minutes.
const CYCLE_DURATION_BUCKETS: &[f64] = &[0.05, 0.25, 1.0, 5.0, 30.0, 120.0, 600.0, 1800.0];

/// Socket address the scrape endpoint binds to.
///
/// `listen_addr` must be a bare IP literal. IPv6 addresses are accepted
/// without brackets.
pub fn listen_addr(config: &MetricsConfig) -> Result<SocketAddr> {
    let ip: IpAddr = config
        .listen_addr
        .trim()
        .parse()
        .with_context(|| format!("invalid metrics listen_addr '{}'", config.listen_addr))?;
    Ok(SocketAddr::new(ip, config.port))
}

/// Install the process-wide recorder and start serving `/metrics`.
///
/// Returns the bound address. Call at most once per process.
///
/// # Errors
///
/// Fails when `listen_addr` is not an IP literal, the port cannot be bound,
/// or a recorder is already installed.
pub fn install_metrics_recorder(config: &MetricsConfig) -> Result<SocketAddr> {
    let addr = listen_addr(config)?;

    if addr.ip().is_unspecified() {
        tracing::warn!(
            listen_addr = %addr,
            "metrics endpoint is reachable from every interface"
        );
    }

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .set_buckets_for_metric(
            Matcher::Full(m::CYCLE_DURATION_SECONDS.to_owned()),
            CYCLE_DURATION_BUCKETS,
        )
        .context("invalid cycle duration buckets")?
        .install()
        .with_context(|| format!("failed to serve metrics on {addr}"))?;

    m::describe_all();
    tracing::info!(listen_addr = %addr, "serving metrics");

    Ok(addr)
}
