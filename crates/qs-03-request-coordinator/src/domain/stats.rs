//! Coordinator statistics.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct CoordinatorStats {
    /// Resolved from a live cache entry
    pub cache_hits: AtomicU64,
    /// Attached to an existing in-flight request
    pub joins: AtomicU64,
    /// New fetches started
    pub fetches: AtomicU64,
    /// Fetches that failed
    pub failures: AtomicU64,
    /// In-flight requests superseded
    pub superseded: AtomicU64,
    /// Late results of superseded requests thrown away
    pub stale_discarded: AtomicU64,
    /// Cache entries removed for age
    pub expired: AtomicU64,
}

/// Point-in-time copy of [`CoordinatorStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub cache_hits: u64,
    pub joins: u64,
    pub fetches: u64,
    pub failures: u64,
    pub superseded: u64,
    pub stale_discarded: u64,
    pub expired: u64,
}

impl CoordinatorStats {
    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            joins: self.joins.load(Ordering::Relaxed),
            fetches: self.fetches.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            superseded: self.superseded.load(Ordering::Relaxed),
            stale_discarded: self.stale_discarded.load(Ordering::Relaxed),
            expired: self.expired.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}
