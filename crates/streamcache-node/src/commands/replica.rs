use std::time::Duration;

use anyhow::Result;
use tokio::time::interval;
use tracing::info;

use crate::cli::RunArgs;
use crate::config::AppConfig;

/// Run a replica until Ctrl-C or SIGTERM, logging stats periodically.
pub async fn run(config: &AppConfig, args: &RunArgs) -> Result<()> {
    let cache = super::start_cache(config, config.cache.clone()).await?;
    info!(
        stream = %config.redis.stream,
        start_from = %config.cache.start_from,
        "Replica running"
    );

    let mut ticker = interval(Duration::from_secs(args.stats_interval.max(1)));
    // First tick completes immediately
    ticker.tick().await;

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = ticker.tick() => {
                let stats = cache.stats();
                info!(
                    position = %cache.position(),
                    entries = stats.entries,
                    applied = stats.applied,
                    skipped = stats.skipped,
                    read_errors = stats.read_errors,
                    hits = stats.hits,
                    misses = stats.misses,
                    "Replica stats"
                );
            }
        }
    }

    cache.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = terminate.recv() => {}
                }
            }
            Err(_) => {
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
    info!("shutdown signal received");
}
