// Tracing and metrics initialization.
use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::config::{LoggingConfig, MetricsConfig};

pub fn init_tracing(logging: &LoggingConfig) {
    // Prefer RUST_LOG from env, otherwise use the configured level.
    let filter = std::env::var("RUST_LOG")
        .ok()
        .and_then(|_| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new(&logging.level));

    let registry = tracing_subscriber::registry().with(filter);
    let _ = if logging.json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer()).try_init()
    };
}

/// Install the Prometheus recorder and its HTTP listener.
///
/// Returns `false` when no listen address is configured. Must be called from
/// within a Tokio runtime.
pub fn init_metrics(metrics: &MetricsConfig) -> anyhow::Result<bool> {
    let Some(listen) = metrics.listen.as_deref() else {
        return Ok(false);
    };
    let addr: SocketAddr = listen.parse()?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;

    tracing::info!(%addr, "Prometheus metrics listener started");
    Ok(true)
}
