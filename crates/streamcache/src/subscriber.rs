//! Subscriber: the background task that tails the change log and applies
//! every record to the local store.
//!
//! There is exactly one subscriber per cache instance. It owns the only
//! cursor, processes entries strictly in log order, and handles each entry
//! (decode, apply, advance) without yielding in between, so shutdown is only
//! ever observed between records.
//!
//! The start position is resolved before the task is spawned, so a record
//! appended once [`Subscriber::start`] has returned is never skipped.
//!
//! Undecodable records are logged, counted and skipped. Read failures are
//! retried with exponential backoff until the log comes back or the
//! subscriber is shut down.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use streamcache_core::{CacheError, Mutation, Result};
use streamcache_log::{Cursor, DynChangeLog, LogEntry, StartFrom};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::CacheConfig;
use crate::metrics;
use crate::store::LocalStore;

/// Counters kept by the subscriber.
#[derive(Debug, Default)]
pub struct SubscriberStats {
    applied: AtomicU64,
    skipped: AtomicU64,
    read_errors: AtomicU64,
}

impl SubscriberStats {
    /// Records decoded and applied to the local store.
    pub fn applied(&self) -> u64 {
        self.applied.load(Ordering::Relaxed)
    }

    /// Records skipped because they could not be decoded.
    pub fn skipped(&self) -> u64 {
        self.skipped.load(Ordering::Relaxed)
    }

    /// Failed reads against the log.
    pub fn read_errors(&self) -> u64 {
        self.read_errors.load(Ordering::Relaxed)
    }
}

/// Doubling delay between failed reads, capped at `max`.
#[derive(Debug)]
struct Backoff {
    initial: Duration,
    max: Duration,
    next: Duration,
}

impl Backoff {
    fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max,
            next: initial,
        }
    }

    fn next_delay(&mut self) -> Duration {
        let delay = self.next;
        self.next = (self.next * 2).min(self.max);
        delay
    }

    fn reset(&mut self) {
        self.next = self.initial;
    }
}

/// The log-tailing task.
pub struct Subscriber {
    log: DynChangeLog,
    store: Arc<LocalStore>,
    start_from: StartFrom,
    retry_initial: Duration,
    retry_max: Duration,
    stats: Arc<SubscriberStats>,
    progress: watch::Sender<Cursor>,
}

impl Subscriber {
    pub fn new(log: DynChangeLog, store: Arc<LocalStore>, config: &CacheConfig) -> Self {
        let (progress, _) = watch::channel(Cursor::ZERO);
        Self {
            log,
            store,
            start_from: config.start_from,
            retry_initial: config.read_retry_initial(),
            retry_max: config.read_retry_max(),
            stats: Arc::new(SubscriberStats::default()),
            progress,
        }
    }

    /// Resolve the start policy against the log and spawn the background
    /// task. Fails with `LogUnavailable` if the log cannot answer.
    pub async fn start(self) -> Result<SubscriberHandle> {
        let cursor = self.log.resolve(self.start_from).await?;
        Ok(self.spawn_at(cursor))
    }

    /// Spawn the background task reading after `cursor`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn_at(self, cursor: Cursor) -> SubscriberHandle {
        self.progress.send_replace(cursor);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let progress = self.progress.subscribe();
        let stats = self.stats.clone();
        let task = tokio::spawn(self.run(cursor, shutdown_rx));

        SubscriberHandle {
            shutdown: shutdown_tx,
            progress,
            stats,
            task: Mutex::new(Some(task)),
        }
    }

    async fn run(self, mut cursor: Cursor, mut shutdown: watch::Receiver<bool>) {
        info!(start_from = %self.start_from, cursor = %cursor, "Subscriber started");

        let mut backoff = Backoff::new(self.retry_initial, self.retry_max);

        loop {
            let read = tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                read = self.log.read_next(&cursor) => read,
            };

            match read {
                Ok(entry) => {
                    backoff.reset();
                    cursor = self.process(entry);
                }
                Err(e) => {
                    self.stats.read_errors.fetch_add(1, Ordering::Relaxed);
                    metrics::record_read_error();
                    let delay = backoff.next_delay();
                    warn!(
                        error = %e,
                        cursor = %cursor,
                        retry_in_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        "Change log read failed"
                    );
                    if !wait_or_shutdown(&mut shutdown, delay).await {
                        break;
                    }
                }
            }
        }

        info!(cursor = %cursor, "Subscriber shutting down");
    }

    /// Decode, apply and advance past one entry. Returns the new cursor.
    fn process(&self, entry: LogEntry) -> Cursor {
        match Mutation::decode(&entry.record) {
            Ok(mutation) => {
                self.store.apply(&mutation);
                self.stats.applied.fetch_add(1, Ordering::Relaxed);
                metrics::record_applied(mutation.kind());
                metrics::set_local_entries(self.store.len());
                debug!(
                    position = %entry.position,
                    kind = %mutation.kind(),
                    order_id = %mutation.order_id(),
                    "Applied mutation"
                );
            }
            Err(e) => {
                self.stats.skipped.fetch_add(1, Ordering::Relaxed);
                metrics::record_skipped(skip_reason(&e));
                warn!(
                    position = %entry.position,
                    method = %entry.record.method,
                    error = %e,
                    "Skipping undecodable change log record"
                );
            }
        }

        self.progress.send_replace(entry.position);
        entry.position
    }
}

fn skip_reason(err: &CacheError) -> &'static str {
    match err {
        CacheError::UnknownMutationKind(_) => "unknown_kind",
        _ => "decode",
    }
}

/// Sleep for `delay` unless shutdown is requested first.
/// Returns `false` on shutdown.
async fn wait_or_shutdown(shutdown: &mut watch::Receiver<bool>, delay: Duration) -> bool {
    tokio::select! {
        biased;
        _ = shutdown.changed() => false,
        _ = tokio::time::sleep(delay) => true,
    }
}

/// Handle to a running subscriber.
///
/// Dropping the handle stops the task.
pub struct SubscriberHandle {
    shutdown: watch::Sender<bool>,
    progress: watch::Receiver<Cursor>,
    stats: Arc<SubscriberStats>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl SubscriberHandle {
    /// Position of the last record processed (applied or skipped).
    pub fn position(&self) -> Cursor {
        *self.progress.borrow()
    }

    pub fn stats(&self) -> &SubscriberStats {
        &self.stats
    }

    /// Receiver notified every time the subscriber moves past a record.
    /// Closed once the subscriber task has exited.
    pub fn watch_progress(&self) -> watch::Receiver<Cursor> {
        self.progress.clone()
    }

    /// Wait until the subscriber has processed every entry up to and
    /// including `target`. Returns `false` on timeout or if the subscriber
    /// has stopped.
    pub async fn wait_for(&self, target: Cursor, timeout: Duration) -> bool {
        let mut progress = self.progress.clone();
        let reached = tokio::time::timeout(timeout, async move {
            let reached = progress.wait_for(|position| *position >= target).await.is_ok();
            reached
        })
        .await;
        matches!(reached, Ok(true))
    }

    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    /// Signal the task to stop and wait for it to exit.
    pub async fn shutdown(&self) {
        self.shutdown.send_replace(true);
        let task = self.task.lock().take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                warn!(error = %e, "Subscriber task ended abnormally");
            }
        }
    }
}

impl Drop for SubscriberHandle {
    fn drop(&mut self) {
        self.shutdown.send_replace(true);
    }
}
