//! Cache metrics.
//!
//! Recorded through the `metrics` facade. Nothing is collected unless the
//! embedding binary installs a recorder (see `streamcache-node`).

use metrics::{counter, gauge};
use streamcache_core::MutationKind;

/// Metric names as constants for consistency.
pub mod names {
    // Subscriber metrics
    pub const RECORDS_APPLIED_TOTAL: &str = "streamcache_records_applied_total";
    pub const RECORDS_SKIPPED_TOTAL: &str = "streamcache_records_skipped_total";
    pub const LOG_READ_ERRORS_TOTAL: &str = "streamcache_log_read_errors_total";

    // Publisher metrics
    pub const PUBLISH_FAILURES_TOTAL: &str = "streamcache_publish_failures_total";

    // Cache metrics
    pub const CACHE_HITS_TOTAL: &str = "streamcache_cache_hits_total";
    pub const CACHE_MISSES_TOTAL: &str = "streamcache_cache_misses_total";
    pub const LOCAL_ENTRIES: &str = "streamcache_local_entries";
}

/// Record a mutation applied to the local store.
pub fn record_applied(kind: MutationKind) {
    counter!(names::RECORDS_APPLIED_TOTAL, "kind" => kind.as_str()).increment(1);
}

/// Record a log entry that was skipped because it could not be decoded.
pub fn record_skipped(reason: &'static str) {
    counter!(names::RECORDS_SKIPPED_TOTAL, "reason" => reason).increment(1);
}

pub fn record_read_error() {
    counter!(names::LOG_READ_ERRORS_TOTAL).increment(1);
}

pub fn record_publish_failure() {
    counter!(names::PUBLISH_FAILURES_TOTAL).increment(1);
}

pub fn record_cache_hit() {
    counter!(names::CACHE_HITS_TOTAL).increment(1);
}

pub fn record_cache_miss() {
    counter!(names::CACHE_MISSES_TOTAL).increment(1);
}

/// Update the local store size gauge.
pub fn set_local_entries(count: usize) {
    gauge!(names::LOCAL_ENTRIES).set(count as f64);
}
