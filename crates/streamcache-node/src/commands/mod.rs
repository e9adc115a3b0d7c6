pub mod orders;
pub mod replica;

use std::sync::Arc;

use anyhow::{Context, Result};
use streamcache::{CacheConfig, InMemorySystemOfRecord, OrderCache, StartFrom};
use streamcache_log::RedisStreamLog;

use crate::config::AppConfig;

/// Connect to the configured stream and start a cache on it.
///
/// The node has no database of its own, so misses fall back to an empty
/// in-memory system of record.
pub async fn start_cache(config: &AppConfig, cache: CacheConfig) -> Result<OrderCache> {
    let log = RedisStreamLog::connect(&config.redis)
        .await
        .with_context(|| format!("cannot connect to change log at {}", config.redis.url))?;

    OrderCache::start(
        Arc::new(log),
        Arc::new(InMemorySystemOfRecord::new()),
        cache,
    )
    .await
    .context("cannot resolve the subscriber start position")
}

/// Cache settings for one-shot publishing commands: there is nothing to
/// replay, so the subscriber starts at the tail.
pub fn publish_only(cache: &CacheConfig) -> CacheConfig {
    CacheConfig {
        start_from: StartFrom::Latest,
        ..cache.clone()
    }
}
