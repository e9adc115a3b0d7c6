//! Publisher: turns a mutation into an entry on the change log.

use streamcache_core::{CacheError, Mutation, Result};
use streamcache_log::{Cursor, DynChangeLog};
use tracing::{debug, warn};

use crate::config::PublishRetryPolicy;
use crate::metrics;

/// Encodes mutations and appends them to the change log.
///
/// Never touches the local store: a mutation becomes visible locally only
/// once the subscriber reads it back from the log.
#[derive(Clone)]
pub struct Publisher {
    log: DynChangeLog,
    retry: PublishRetryPolicy,
}

impl Publisher {
    pub fn new(log: DynChangeLog, retry: PublishRetryPolicy) -> Self {
        Self { log, retry }
    }

    /// Append one mutation and return its log position.
    ///
    /// Fails with `LogUnavailable` once every attempt allowed by the retry
    /// policy was refused. A failed publish means the mutation did not happen
    /// as far as any replica is concerned.
    pub async fn publish(&self, mutation: &Mutation) -> Result<Cursor> {
        let record = mutation.encode()?;
        let attempts = self.retry.effective_attempts();
        let mut last_error = None;

        for attempt in 1..=attempts {
            match self.log.append(record.clone()).await {
                Ok(position) => {
                    debug!(
                        kind = %mutation.kind(),
                        order_id = %mutation.order_id(),
                        position = %position,
                        "Published mutation"
                    );
                    return Ok(position);
                }
                Err(e) => {
                    metrics::record_publish_failure();
                    warn!(
                        kind = %mutation.kind(),
                        order_id = %mutation.order_id(),
                        attempt,
                        max_attempts = attempts,
                        error = %e,
                        "Failed to publish mutation"
                    );
                    last_error = Some(e);
                    if attempt < attempts {
                        tokio::time::sleep(self.retry.backoff()).await;
                    }
                }
            }
        }

        Err(last_error
            .map(CacheError::from)
            .unwrap_or_else(|| CacheError::log_unavailable("no publish attempt made")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use streamcache_core::{Order, OrderId, RawRecord};
    use streamcache_log::{ChangeLog, InMemoryChangeLog, LogEntry, LogError};

    /// Refuses the first `failures` appends, then delegates.
    struct FlakyLog {
        inner: InMemoryChangeLog,
        failures: AtomicU32,
    }

    #[async_trait]
    impl ChangeLog for FlakyLog {
        async fn append(&self, record: RawRecord) -> std::result::Result<Cursor, LogError> {
            let left = self.failures.load(Ordering::SeqCst);
            if left > 0 {
                self.failures.store(left - 1, Ordering::SeqCst);
                return Err(LogError::unavailable("flaky"));
            }
            self.inner.append(record).await
        }

        async fn read_next(&self, after: &Cursor) -> std::result::Result<LogEntry, LogError> {
            self.inner.read_next(after).await
        }

        async fn tail(&self) -> std::result::Result<Cursor, LogError> {
            self.inner.tail().await
        }
    }

    fn save() -> Mutation {
        Mutation::Save(Order::new(OrderId::new("a"), "widget", 10, false))
    }

    #[tokio::test]
    async fn test_publish_appends_encoded_record() {
        let log = InMemoryChangeLog::new();
        let publisher = Publisher::new(Arc::new(log.clone()), PublishRetryPolicy::none());

        let position = publisher.publish(&save()).await.unwrap();
        assert_eq!(position, Cursor::new(1, 0));

        let entry = log.read_next(&Cursor::ZERO).await.unwrap();
        assert_eq!(Mutation::decode(&entry.record).unwrap(), save());
    }

    #[tokio::test]
    async fn test_publish_failure_is_log_unavailable() {
        let log = InMemoryChangeLog::new();
        log.set_available(false);
        let publisher = Publisher::new(Arc::new(log.clone()), PublishRetryPolicy::none());

        let err = publisher.publish(&save()).await.unwrap_err();
        assert!(err.is_log_unavailable());
        log.set_available(true);
        assert!(log.is_empty());
    }

    #[tokio::test]
    async fn test_retry_policy_is_honoured() {
        let inner = InMemoryChangeLog::new();
        let flaky = Arc::new(FlakyLog {
            inner: inner.clone(),
            failures: AtomicU32::new(2),
        });

        let single = Publisher::new(flaky.clone(), PublishRetryPolicy::none());
        assert!(single.publish(&save()).await.is_err());

        let retrying = Publisher::new(
            flaky.clone(),
            PublishRetryPolicy::attempts(3, Duration::from_millis(1)),
        );
        assert!(retrying.publish(&save()).await.is_ok());
        assert_eq!(inner.len(), 1);
    }
}
