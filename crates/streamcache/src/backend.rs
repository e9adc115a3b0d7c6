//! System of Record capability.
//!
//! The durable store holding the authoritative orders. The cache only reads
//! from it (`fetch` on a miss); `persist` and `remove` are part of the
//! capability so callers can keep the backend next to the cache, but the
//! cache never writes back on its own initiative.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use streamcache_core::{CacheError, Order, OrderId};

/// Errors reported by a system of record.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    #[error("Backend error: {0}")]
    Internal(String),
}

impl BackendError {
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound(id.into())
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}

impl From<BackendError> for CacheError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::NotFound(id) => CacheError::not_found(id),
            other => CacheError::backend(other.to_string()),
        }
    }
}

/// The persistence layer behind the cache.
#[async_trait]
pub trait SystemOfRecord: Send + Sync {
    /// Load an order. `Ok(None)` means the backend has no such order.
    async fn fetch(&self, id: &OrderId) -> Result<Option<Order>, BackendError>;

    /// Insert or replace an order.
    async fn persist(&self, order: &Order) -> Result<(), BackendError>;

    /// Delete an order. Returns `false` if it did not exist.
    async fn remove(&self, id: &OrderId) -> Result<bool, BackendError>;
}

/// Type alias for a shared system of record trait object.
pub type DynSystemOfRecord = Arc<dyn SystemOfRecord>;

/// In-memory system of record.
///
/// Counts `fetch` calls and can be switched off to simulate an outage.
#[derive(Debug, Default)]
pub struct InMemorySystemOfRecord {
    orders: DashMap<OrderId, Order>,
    fetches: AtomicU64,
    unavailable: AtomicBool,
}

impl InMemorySystemOfRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a backend pre-populated with the given orders.
    pub fn with_orders(orders: impl IntoIterator<Item = Order>) -> Self {
        let backend = Self::new();
        for order in orders {
            backend.orders.insert(order.id.clone(), order);
        }
        backend
    }

    /// Number of `fetch` calls served so far, including failed ones.
    pub fn fetch_count(&self) -> u64 {
        self.fetches.load(Ordering::Relaxed)
    }

    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    fn ensure_available(&self) -> Result<(), BackendError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(BackendError::unavailable("in-memory system of record is down"));
        }
        Ok(())
    }
}

#[async_trait]
impl SystemOfRecord for InMemorySystemOfRecord {
    async fn fetch(&self, id: &OrderId) -> Result<Option<Order>, BackendError> {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        self.ensure_available()?;
        Ok(self.orders.get(id).map(|entry| entry.value().clone()))
    }

    async fn persist(&self, order: &Order) -> Result<(), BackendError> {
        self.ensure_available()?;
        self.orders.insert(order.id.clone(), order.clone());
        Ok(())
    }

    async fn remove(&self, id: &OrderId) -> Result<bool, BackendError> {
        self.ensure_available()?;
        Ok(self.orders.remove(id).is_some())
    }
}
