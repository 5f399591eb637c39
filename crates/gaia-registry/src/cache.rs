//! Time-bounded cache of registry lookups.
//!
//! Entries are keyed by `(ecosystem, normalised name)` and expire lazily on
//! read. Writes are unconditional overwrites: two lookups racing on the same
//! key store the same remote truth, so the last write wins.

use crate::lookup::RegistryLookupResult;
use dashmap::DashMap;
use gaia_config::GaiaConfig;
use gaia_core::Ecosystem;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::debug;

/// Default TTL for Maven lookups. Published Maven versions are immutable.
pub const DEFAULT_MAVEN_TTL: Duration = Duration::from_secs(3600);

/// Default TTL for every other ecosystem.
pub const DEFAULT_TTL: Duration = Duration::from_secs(900);

/// Cache statistics.
#[derive(Debug, Default)]
pub struct CacheStats {
    /// Lookups served from the cache.
    pub hits: AtomicU64,
    /// Lookups not in the cache, or expired.
    pub misses: AtomicU64,
    /// Entries written.
    pub puts: AtomicU64,
    /// Entries removed explicitly.
    pub invalidations: AtomicU64,
    /// Entries dropped because their TTL elapsed.
    pub expirations: AtomicU64,
}

impl CacheStats {
    /// Create new stats.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get hit rate as a percentage.
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        if total == 0 {
            0.0
        } else {
            (hits as f64 / total as f64) * 100.0
        }
    }
}

#[derive(Debug)]
struct CacheEntry {
    result: Arc<RegistryLookupResult>,
    cached_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    fn is_expired(&self) -> bool {
        self.cached_at.elapsed() > self.ttl
    }
}

type CacheKey = (Ecosystem, String);

/// Registry response cache.
///
/// Constructed explicitly and shared through `Arc`; a fresh cache per test keeps
/// tests isolated.
pub struct ResponseCache {
    entries: DashMap<CacheKey, CacheEntry>,
    ttls: HashMap<Ecosystem, Duration>,
    stats: CacheStats,
}

impl std::fmt::Debug for ResponseCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseCache")
            .field("entries", &self.entries.len())
            .field("ttls", &self.ttls)
            .finish_non_exhaustive()
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseCache {
    /// Create a cache with the default per-ecosystem TTLs.
    #[must_use]
    pub fn new() -> Self {
        let ttls = Ecosystem::ALL
            .into_iter()
            .map(|ecosystem| {
                let ttl = match ecosystem {
                    Ecosystem::Maven => DEFAULT_MAVEN_TTL,
                    _ => DEFAULT_TTL,
                };
                (ecosystem, ttl)
            })
            .collect();
        Self {
            entries: DashMap::new(),
            ttls,
            stats: CacheStats::new(),
        }
    }

    /// Create a cache using one TTL for every ecosystem.
    #[must_use]
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttls: Ecosystem::ALL.into_iter().map(|e| (e, ttl)).collect(),
            ..Self::new()
        }
    }

    /// Create a cache with the TTLs from configuration.
    #[must_use]
    pub fn from_config(config: &GaiaConfig) -> Self {
        Self {
            ttls: Ecosystem::ALL
                .into_iter()
                .map(|e| (e, config.cache_ttl(e)))
                .collect(),
            ..Self::new()
        }
    }

    /// Override the TTL of one ecosystem.
    #[must_use]
    pub fn with_ecosystem_ttl(mut self, ecosystem: Ecosystem, ttl: Duration) -> Self {
        self.ttls.insert(ecosystem, ttl);
        self
    }

    /// TTL applied to new entries of `ecosystem`.
    #[must_use]
    pub fn ttl_for(&self, ecosystem: Ecosystem) -> Duration {
        self.ttls.get(&ecosystem).copied().unwrap_or(DEFAULT_TTL)
    }

    fn key(ecosystem: Ecosystem, name: &str) -> CacheKey {
        (ecosystem, ecosystem.normalize_name(name))
    }

    /// Get a cached lookup that is still within its TTL.
    ///
    /// An expired entry is removed and reported as a miss.
    pub fn get(&self, ecosystem: Ecosystem, name: &str) -> Option<Arc<RegistryLookupResult>> {
        let key = Self::key(ecosystem, name);

        if let Some(entry) = self.entries.get(&key) {
            if !entry.is_expired() {
                self.stats.hits.fetch_add(1, Ordering::Relaxed);
                debug!(ecosystem = %ecosystem, package = %key.1, "response cache hit");
                return Some(Arc::clone(&entry.result));
            }
            // Release the shard lock before removing
            drop(entry);
            if self.entries.remove_if(&key, |_, e| e.is_expired()).is_some() {
                self.stats.expirations.fetch_add(1, Ordering::Relaxed);
                debug!(ecosystem = %ecosystem, package = %key.1, "response cache entry expired");
            }
        }

        self.stats.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Store a lookup, replacing any previous entry for the key.
    pub fn put(
        &self,
        ecosystem: Ecosystem,
        name: &str,
        result: impl Into<Arc<RegistryLookupResult>>,
    ) -> Arc<RegistryLookupResult> {
        let result = result.into();
        let ttl = self.ttl_for(ecosystem);
        let key = Self::key(ecosystem, name);
        debug!(
            ecosystem = %ecosystem,
            package = %key.1,
            versions = result.available_versions.len(),
            ttl_secs = ttl.as_secs(),
            "cached registry response"
        );
        self.entries.insert(
            key,
            CacheEntry {
                result: Arc::clone(&result),
                cached_at: Instant::now(),
                ttl,
            },
        );
        self.stats.puts.fetch_add(1, Ordering::Relaxed);
        result
    }

    /// Remove one entry. Returns whether it was present.
    pub fn invalidate(&self, ecosystem: Ecosystem, name: &str) -> bool {
        let key = Self::key(ecosystem, name);
        let removed = self.entries.remove(&key).is_some();
        if removed {
            self.stats.invalidations.fetch_add(1, Ordering::Relaxed);
            debug!(ecosystem = %ecosystem, package = %key.1, "cache invalidated");
        }
        removed
    }

    /// Remove every entry.
    pub fn clear(&self) {
        self.entries.clear();
        debug!("cache cleared");
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired());
        let purged = before.saturating_sub(self.entries.len());
        if purged > 0 {
            self.stats
                .expirations
                .fetch_add(purged as u64, Ordering::Relaxed);
            debug!(purged, "purged expired cache entries");
        }
        purged
    }

    /// Number of stored entries, expired ones included until read or purged.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get cache statistics.
    #[must_use]
    pub const fn stats(&self) -> &CacheStats {
        &self.stats
    }
}
