use serde::{Deserialize, Serialize};
use streamcache::CacheConfig;
use streamcache_log::RedisStreamConfig;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub redis: RedisStreamConfig,
    pub cache: CacheConfig,
    pub logging: LoggingConfig,
    pub metrics: MetricsConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), String> {
        // Redis validations
        if self.redis.url.trim().is_empty() {
            return Err("redis.url must not be empty".into());
        }
        if !self.redis.url.starts_with("redis://") && !self.redis.url.starts_with("rediss://") {
            return Err("redis.url must start with redis:// or rediss://".into());
        }
        if self.redis.stream.trim().is_empty() {
            return Err("redis.stream must not be empty".into());
        }
        if self.redis.pool_size == 0 {
            return Err("redis.pool_size must be > 0".into());
        }
        if self.redis.timeout_ms == 0 || self.redis.block_ms == 0 {
            return Err("redis timeouts must be > 0".into());
        }
        if self.redis.max_len == Some(0) {
            return Err("redis.max_len must be > 0 when set".into());
        }
        // Cache validations
        if self.cache.read_retry_initial_ms == 0 {
            return Err("cache.read_retry_initial_ms must be > 0".into());
        }
        if self.cache.read_retry_initial_ms > self.cache.read_retry_max_ms {
            return Err("cache.read_retry_initial_ms must be <= cache.read_retry_max_ms".into());
        }
        if self.cache.publish_retry.max_attempts == 0 {
            return Err("cache.publish_retry.max_attempts must be > 0".into());
        }
        // Logging validation
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(format!("logging.level must be one of {valid_levels:?}"));
        }
        // Metrics validation
        if let Some(listen) = &self.metrics.listen {
            if listen.parse::<std::net::SocketAddr>().is_err() {
                return Err(format!("metrics.listen is not a socket address: {listen}"));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
        }
    }
}

/// Prometheus exporter settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct MetricsConfig {
    /// Address for the `/metrics` listener, e.g. `0.0.0.0:9000`. Disabled if unset.
    pub listen: Option<String>,
}

pub mod loader {
    use super::AppConfig;
    use config::{Config, Environment, File};
    use std::path::PathBuf;

    /// Load configuration from an optional TOML file plus environment
    /// overrides, then validate it.
    ///
    /// A missing file is not an error: defaults and the environment apply.
    pub fn load_config(path: Option<&str>) -> Result<AppConfig, String> {
        let mut builder = Config::builder();
        let pathbuf = PathBuf::from(path.unwrap_or("streamcache.toml"));
        if pathbuf.exists() {
            builder = builder.add_source(File::from(pathbuf));
        }
        // Environment variable overrides, e.g., STREAMCACHE__REDIS__STREAM=orders
        builder = builder.add_source(
            Environment::with_prefix("STREAMCACHE")
                .try_parsing(true)
                .separator("__"),
        );
        let cfg = builder
            .build()
            .map_err(|e| format!("config build error: {e}"))?;
        let merged: AppConfig = cfg
            .try_deserialize()
            .map_err(|e| format!("config deserialize error: {e}"))?;
        merged.validate()?;
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use streamcache::StartFrom;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.redis.stream, "orders");
        assert_eq!(config.cache.start_from, StartFrom::Beginning);
        assert!(config.metrics.listen.is_none());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = AppConfig::default();
        config.redis.url = "http://localhost".into();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.cache.read_retry_initial_ms = 10_000;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.logging.level = "loud".into();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.metrics.listen = Some("not-an-address".into());
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.redis.max_len = Some(0);
        assert!(config.validate().is_err());
    }
}
