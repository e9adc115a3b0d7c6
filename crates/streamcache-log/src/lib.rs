//! # streamcache-log
//!
//! The change log every cache replica publishes to and tails.
//!
//! The cache depends on the log for ordering and durability but does not
//! implement either: this crate defines the contract ([`ChangeLog`]) and ships
//! two implementations.
//!
//! - [`InMemoryChangeLog`] - process-local, shared by cloning. Used in tests and
//!   for single-process setups.
//! - [`RedisStreamLog`] - a Redis stream (`XADD` / `XREAD BLOCK`), shared by
//!   every process pointed at the same stream key.
//!
//! ## Positions
//!
//! A [`Cursor`] names the last entry a reader consumed. `read_next(cursor)`
//! returns the first entry strictly after it, so a reader advances by handing
//! back the position of the entry it just processed.
//!
//! ```ignore
//! let log = InMemoryChangeLog::new();
//! let mut cursor = log.resolve(StartFrom::Beginning).await?;
//! loop {
//!     let entry = log.read_next(&cursor).await?;
//!     handle(entry.record);
//!     cursor = entry.position;
//! }
//! ```

mod cursor;
mod error;
pub mod memory;
pub mod stream;
mod traits;

pub use cursor::{Cursor, ParseCursorError, StartFrom};
pub use error::LogError;
pub use memory::InMemoryChangeLog;
pub use stream::{RedisStreamConfig, RedisStreamLog};
pub use traits::{ChangeLog, LogEntry};

/// Type alias for a shared change log trait object.
pub type DynChangeLog = std::sync::Arc<dyn ChangeLog>;
