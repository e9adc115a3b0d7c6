//! # streamcache-core
//!
//! Shared types for the stream-replicated order cache.
//!
//! - [`Order`] is the cached entity. Identity is its [`OrderId`] alone.
//! - [`RawRecord`] is what the change log stores: a method name and an opaque
//!   payload.
//! - [`Mutation`] is the closed set of changes a record can describe. Records
//!   are decoded into it exactly once, at the subscriber boundary.
//! - [`CacheError`] is the error taxonomy surfaced by the cache.

pub mod error;
pub mod mutation;
pub mod order;

pub use error::{CacheError, ErrorCategory, Result};
pub use mutation::{Mutation, MutationKind, RawRecord};
pub use order::{NewOrder, Order, OrderId};
