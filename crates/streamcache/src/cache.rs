//! Cache façade.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use streamcache_core::{CacheError, Mutation, NewOrder, Order, OrderId, Result};
use streamcache_log::{Cursor, DynChangeLog};
use tracing::{debug, info};

use crate::backend::DynSystemOfRecord;
use crate::config::CacheConfig;
use crate::metrics;
use crate::publisher::Publisher;
use crate::store::{LocalStore, Lookup};
use crate::subscriber::{Subscriber, SubscriberHandle};

/// Cache statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Orders currently held in the local store.
    pub entries: usize,
    /// Log records applied by the subscriber.
    pub applied: u64,
    /// Log records skipped as undecodable.
    pub skipped: u64,
    /// Failed change log reads.
    pub read_errors: u64,
    /// `get` calls answered from the local store.
    pub hits: u64,
    /// `get` calls that went to the system of record.
    pub misses: u64,
    /// Misses that populated the local store.
    pub fills: u64,
}

/// Replicated write-through order cache.
///
/// Writes are published to the shared change log and reach the local store
/// only when this instance's subscriber reads them back, so every replica
/// applies writes in the same order. Reads are served from the local store
/// and fall back to the system of record on a miss.
///
/// A `save` followed immediately by a `get` on the same instance may miss
/// until the record round-trips through the log. Use
/// [`sync_to`](Self::sync_to) with the returned position, or
/// [`catch_up`](Self::catch_up), when read-your-writes is needed.
///
/// # Example
///
/// ```ignore
/// let cache = OrderCache::start(log, system_of_record, CacheConfig::default()).await?;
/// let id = cache.save(NewOrder::new("widget", 10, false)).await?;
/// cache.catch_up(Duration::from_secs(1)).await?;
/// let order = cache.get(&id).await?;
/// ```
pub struct OrderCache {
    store: Arc<LocalStore>,
    publisher: Publisher,
    log: DynChangeLog,
    system_of_record: DynSystemOfRecord,
    subscriber: SubscriberHandle,
    hits: AtomicU64,
    misses: AtomicU64,
    fills: AtomicU64,
}

impl OrderCache {
    /// Build the cache and spawn its subscriber.
    ///
    /// The start position is resolved against the log before this returns,
    /// so every record appended afterwards, including this instance's own
    /// writes, is applied. Fails with `LogUnavailable` if the log cannot
    /// answer. The subscriber stops when the cache is shut down or dropped.
    pub async fn start(
        log: DynChangeLog,
        system_of_record: DynSystemOfRecord,
        config: CacheConfig,
    ) -> Result<Self> {
        let store = Arc::new(LocalStore::new());
        let subscriber = Subscriber::new(log.clone(), store.clone(), &config)
            .start()
            .await?;
        let publisher = Publisher::new(log.clone(), config.publish_retry);

        info!(
            start_from = %config.start_from,
            position = %subscriber.position(),
            publish_attempts = config.publish_retry.effective_attempts(),
            "Order cache started"
        );

        Ok(Self {
            store,
            publisher,
            log,
            system_of_record,
            subscriber,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            fills: AtomicU64::new(0),
        })
    }

    /// Assign a fresh id and publish a `save`. Returns the id.
    ///
    /// Does not wait for the subscriber to apply the record.
    pub async fn save(&self, order: NewOrder) -> Result<OrderId> {
        let (id, _) = self.save_at(order).await?;
        Ok(id)
    }

    /// Like [`save`](Self::save), also returning the log position of the
    /// record for use with [`sync_to`](Self::sync_to).
    pub async fn save_at(&self, order: NewOrder) -> Result<(OrderId, Cursor)> {
        let id = OrderId::generate();
        let position = self
            .publisher
            .publish(&Mutation::Save(order.with_id(id.clone())))
            .await?;
        Ok((id, position))
    }

    /// Look up an order, falling back to the system of record on a miss.
    ///
    /// A fetched order is filled into the local store directly, never through
    /// the log. The fill is skipped if the subscriber wrote the same id while
    /// the system of record was being queried.
    pub async fn get(&self, id: &OrderId) -> Result<Order> {
        let ticket = match self.store.lookup(id) {
            Lookup::Hit(order) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                metrics::record_cache_hit();
                return Ok(order);
            }
            Lookup::Miss(ticket) => ticket,
        };

        self.misses.fetch_add(1, Ordering::Relaxed);
        metrics::record_cache_miss();
        debug!(order_id = %id, "Local store miss, fetching from system of record");

        let Some(order) = self.system_of_record.fetch(id).await? else {
            return Err(CacheError::not_found(id.as_str()));
        };

        let (order, stored) = ticket.fill(order);
        if stored {
            self.fills.fetch_add(1, Ordering::Relaxed);
            metrics::set_local_entries(self.store.len());
        } else {
            debug!(order_id = %id, "Change log wrote the order during the fetch, not filling");
        }
        Ok(order)
    }

    /// Publish an `update` carrying the full order.
    pub async fn update(&self, order: Order) -> Result<Cursor> {
        self.publisher.publish(&Mutation::Update(order)).await
    }

    /// Publish a `delete`.
    pub async fn delete(&self, id: &OrderId) -> Result<Cursor> {
        self.publisher.publish(&Mutation::Delete(id.clone())).await
    }

    /// Wait until the subscriber has processed the log up to `position`.
    ///
    /// Returns `false` if that did not happen within `timeout`.
    pub async fn sync_to(&self, position: &Cursor, timeout: Duration) -> bool {
        self.subscriber.wait_for(*position, timeout).await
    }

    /// Wait until the subscriber has processed everything currently in the
    /// log.
    pub async fn catch_up(&self, timeout: Duration) -> Result<bool> {
        let tail = self.log.tail().await?;
        Ok(self.sync_to(&tail, timeout).await)
    }

    /// Position of the last record the subscriber processed.
    pub fn position(&self) -> Cursor {
        self.subscriber.position()
    }

    pub fn stats(&self) -> CacheStats {
        let subscriber = self.subscriber.stats();
        CacheStats {
            entries: self.store.len(),
            applied: subscriber.applied(),
            skipped: subscriber.skipped(),
            read_errors: subscriber.read_errors(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            fills: self.fills.load(Ordering::Relaxed),
        }
    }

    /// Every order currently in the local store, sorted by id.
    pub fn snapshot(&self) -> Vec<Order> {
        self.store.snapshot()
    }

    pub fn is_running(&self) -> bool {
        self.subscriber.is_running()
    }

    /// Stop the subscriber and wait for it to exit.
    pub async fn shutdown(&self) {
        self.subscriber.shutdown().await;
        info!(position = %self.position(), "Order cache stopped");
    }
}
