//! Cache configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use streamcache_log::StartFrom;

/// Configuration for an [`OrderCache`](crate::OrderCache).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Where the subscriber starts reading on a fresh start.
    /// Default: `beginning` (full replay)
    pub start_from: StartFrom,

    /// Retry policy for publishing mutations.
    pub publish_retry: PublishRetryPolicy,

    /// First delay after a failed log read (in milliseconds).
    /// Default: 100
    pub read_retry_initial_ms: u64,

    /// Upper bound for the doubling read retry delay (in milliseconds).
    /// Default: 5000
    pub read_retry_max_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            start_from: StartFrom::default(),
            publish_retry: PublishRetryPolicy::default(),
            read_retry_initial_ms: 100,
            read_retry_max_ms: 5000,
        }
    }
}

impl CacheConfig {
    pub fn read_retry_initial(&self) -> Duration {
        Duration::from_millis(self.read_retry_initial_ms)
    }

    pub fn read_retry_max(&self) -> Duration {
        Duration::from_millis(self.read_retry_max_ms.max(self.read_retry_initial_ms))
    }
}

/// How many times a mutation is offered to the change log before the caller
/// sees `LogUnavailable`.
///
/// The default makes a single attempt: a failed append is reported to the
/// caller as is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PublishRetryPolicy {
    /// Total attempts including the first. Values below 1 are treated as 1.
    pub max_attempts: u32,

    /// Fixed delay between attempts (in milliseconds).
    pub backoff_ms: u64,
}

impl Default for PublishRetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            backoff_ms: 50,
        }
    }
}

impl PublishRetryPolicy {
    /// Single attempt, no retry.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn attempts(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts,
            backoff_ms: u64::try_from(backoff.as_millis()).unwrap_or(u64::MAX),
        }
    }

    pub fn effective_attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CacheConfig::default();
        assert_eq!(config.start_from, StartFrom::Beginning);
        assert_eq!(config.publish_retry.effective_attempts(), 1);
        assert_eq!(config.read_retry_initial(), Duration::from_millis(100));
        assert_eq!(config.read_retry_max(), Duration::from_secs(5));
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: CacheConfig = serde_json::from_str(
            r#"{"start_from": "latest", "publish_retry": {"max_attempts": 3}}"#,
        )
        .unwrap();
        assert_eq!(config.start_from, StartFrom::Latest);
        assert_eq!(config.publish_retry.max_attempts, 3);
        assert_eq!(config.publish_retry.backoff_ms, 50);
        assert_eq!(config.read_retry_max_ms, 5000);
    }

    #[test]
    fn test_zero_attempts_still_tries_once() {
        let policy = PublishRetryPolicy {
            max_attempts: 0,
            backoff_ms: 0,
        };
        assert_eq!(policy.effective_attempts(), 1);
    }

    #[test]
    fn test_attempts_saturates_oversized_backoff() {
        let policy = PublishRetryPolicy::attempts(3, Duration::MAX);
        assert_eq!(policy.backoff_ms, u64::MAX);

        let policy = PublishRetryPolicy::attempts(3, Duration::from_millis(250));
        assert_eq!(policy.backoff(), Duration::from_millis(250));
    }
}
