//! # streamcache
//!
//! A write-through order cache replicated through a shared change log.
//!
//! Each [`OrderCache`] keeps a [`LocalStore`] that is written only by its own
//! [`Subscriber`], which tails the change log and applies every record in log
//! order. Writes never touch the local store directly: they are published to
//! the log and come back through the subscriber, so all replicas reading the
//! same log converge to the same state. Reads fall back to a
//! [`SystemOfRecord`] on a miss.
//!
//! ```text
//!  save/update/delete ─► Publisher ─► ChangeLog ─► Subscriber ─► LocalStore
//!  get ─► LocalStore ──(miss)──► SystemOfRecord ──(fill)──► LocalStore
//! ```

pub mod backend;
pub mod cache;
pub mod config;
pub mod metrics;
pub mod publisher;
pub mod store;
pub mod subscriber;

pub use backend::{BackendError, DynSystemOfRecord, InMemorySystemOfRecord, SystemOfRecord};
pub use cache::{CacheStats, OrderCache};
pub use config::{CacheConfig, PublishRetryPolicy};
pub use publisher::Publisher;
pub use store::{FillTicket, LocalStore, Lookup};
pub use subscriber::{Subscriber, SubscriberHandle, SubscriberStats};

pub use streamcache_core::{
    CacheError, Mutation, MutationKind, NewOrder, Order, OrderId, RawRecord, Result,
};
pub use streamcache_log::{ChangeLog, Cursor, DynChangeLog, InMemoryChangeLog, StartFrom};
