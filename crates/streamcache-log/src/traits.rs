use async_trait::async_trait;
use streamcache_core::RawRecord;

use crate::cursor::{Cursor, StartFrom};
use crate::error::LogError;

/// One entry read from the change log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// Position of this entry; pass it back to `read_next` to get the one after.
    pub position: Cursor,
    pub record: RawRecord,
}

/// An ordered, durable, append-only sequence of mutation records shared by
/// every cache replica.
///
/// Implementations must deliver entries to every reader in append order and
/// must never reorder or coalesce them.
#[async_trait]
pub trait ChangeLog: Send + Sync {
    /// Append a record and return its position once the log acknowledged it.
    async fn append(&self, record: RawRecord) -> Result<Cursor, LogError>;

    /// Return the first entry strictly after `after`, waiting as long as it
    /// takes for one to be appended.
    ///
    /// There is no timeout. The returned future is cancel-safe: dropping it
    /// before completion consumes nothing.
    async fn read_next(&self, after: &Cursor) -> Result<LogEntry, LogError>;

    /// Position of the newest entry, or [`Cursor::ZERO`] for an empty log.
    async fn tail(&self) -> Result<Cursor, LogError>;

    /// Turn a start policy into a concrete cursor.
    ///
    /// `Latest` resolves to the current tail so that entries appended after
    /// this call are never skipped.
    async fn resolve(&self, start: StartFrom) -> Result<Cursor, LogError> {
        match start {
            StartFrom::Beginning => Ok(Cursor::ZERO),
            StartFrom::Latest => self.tail().await,
        }
    }
}
