//! Resolver statistics.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters shared by every `resolve` call on one service.
#[derive(Debug, Default)]
pub struct ResolverStats {
    /// `resolve` calls that got past input validation.
    pub batches: AtomicU64,
    /// Lookups dispatched to a registry.
    pub lookups: AtomicU64,
    /// Lookups answered from the cache.
    pub cache_hits: AtomicU64,
    /// Rate-limit retries.
    pub retries: AtomicU64,
    /// Packages resolved.
    pub resolved: AtomicU64,
    /// Packages recorded as failures, timeouts included.
    pub failures: AtomicU64,
    /// Packages recorded as conflicts.
    pub conflicts: AtomicU64,
    /// Packages that hit the overall timeout.
    pub timeouts: AtomicU64,
}

impl ResolverStats {
    /// Create zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Point-in-time copy of the counters.
    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            batches: self.batches.load(Ordering::Relaxed),
            lookups: self.lookups.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            resolved: self.resolved.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            conflicts: self.conflicts.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Plain copy of [`ResolverStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    /// `resolve` calls.
    pub batches: u64,
    /// Lookups dispatched.
    pub lookups: u64,
    /// Cache hits.
    pub cache_hits: u64,
    /// Rate-limit retries.
    pub retries: u64,
    /// Packages resolved.
    pub resolved: u64,
    /// Packages failed.
    pub failures: u64,
    /// Packages conflicted.
    pub conflicts: u64,
    /// Packages timed out.
    pub timeouts: u64,
}

impl StatsSnapshot {
    /// Share of package lookups answered from the cache (0-100).
    #[must_use]
    pub fn cache_hit_rate(&self) -> f64 {
        let total = self.cache_hits + self.lookups;
        if total == 0 {
            0.0
        } else {
            (self.cache_hits as f64 / total as f64) * 100.0
        }
    }
}
