//! Process-local change log.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use streamcache_core::RawRecord;
use tokio::sync::Notify;
use tracing::debug;

use crate::cursor::Cursor;
use crate::error::LogError;
use crate::traits::{ChangeLog, LogEntry};

/// In-memory change log.
///
/// Clones share the same underlying log, so several caches built from clones
/// of one `InMemoryChangeLog` behave like replicas tailing one stream. The
/// n-th appended entry (1-based) has position `n-0`.
///
/// [`set_available`](Self::set_available) simulates an outage: while the log
/// is unavailable every operation fails with [`LogError::Unavailable`] and
/// blocked readers are woken up to observe the failure.
#[derive(Clone, Default)]
pub struct InMemoryChangeLog {
    inner: Arc<Inner>,
}

struct Inner {
    records: RwLock<Vec<RawRecord>>,
    available: AtomicBool,
    changed: Notify,
}

impl Default for Inner {
    fn default() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
            available: AtomicBool::new(true),
            changed: Notify::new(),
        }
    }
}

impl InMemoryChangeLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries appended so far.
    pub fn len(&self) -> usize {
        self.inner.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bring the log up or down.
    pub fn set_available(&self, available: bool) {
        self.inner.available.store(available, Ordering::SeqCst);
        debug!(available, "In-memory change log availability changed");
        self.inner.changed.notify_waiters();
    }

    pub fn is_available(&self) -> bool {
        self.inner.available.load(Ordering::SeqCst)
    }

    fn ensure_available(&self) -> Result<(), LogError> {
        if self.is_available() {
            Ok(())
        } else {
            Err(LogError::unavailable("in-memory change log is down"))
        }
    }

    fn entry_after(&self, after: &Cursor) -> Option<LogEntry> {
        let records = self.inner.records.read();
        // Entry n sits at index n - 1 and is after `after` iff n > after.major.
        let index = usize::try_from(after.major).ok()?;
        records.get(index).map(|record| LogEntry {
            position: Cursor::new(after.major + 1, 0),
            record: record.clone(),
        })
    }
}

#[async_trait]
impl ChangeLog for InMemoryChangeLog {
    async fn append(&self, record: RawRecord) -> Result<Cursor, LogError> {
        self.ensure_available()?;
        let position = {
            let mut records = self.inner.records.write();
            records.push(record);
            Cursor::new(records.len() as u64, 0)
        };
        self.inner.changed.notify_waiters();
        Ok(position)
    }

    async fn read_next(&self, after: &Cursor) -> Result<LogEntry, LogError> {
        loop {
            // Register for wake-ups before checking so an append between the
            // check and the await is not missed.
            let changed = self.inner.changed.notified();
            tokio::pin!(changed);
            changed.as_mut().enable();

            self.ensure_available()?;
            if let Some(entry) = self.entry_after(after) {
                return Ok(entry);
            }
            changed.await;
        }
    }

    async fn tail(&self) -> Result<Cursor, LogError> {
        self.ensure_available()?;
        Ok(Cursor::new(self.len() as u64, 0))
    }
}
