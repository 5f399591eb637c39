//! Resolver configuration.

use gaia_config::GaiaConfig;
use gaia_core::Ecosystem;
use std::collections::BTreeMap;
use std::time::Duration;

/// Concurrency cap used for an ecosystem with no explicit entry.
const FALLBACK_CONCURRENCY: usize = 8;

/// Resolver configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverConfig {
    /// Budget for one `resolve` call; lookups still pending afterwards fail
    /// with `ResolutionTimeout`.
    pub timeout: Duration,
    /// Optional guard around a single registry lookup, retries excluded.
    /// Expiry is a network failure. Unset, a lookup that never answers runs
    /// into the overall timeout.
    pub lookup_timeout: Option<Duration>,
    /// Maximum lookups in flight per ecosystem.
    pub concurrency: BTreeMap<Ecosystem, usize>,
    /// Retries after a rate-limited lookup.
    pub rate_limit_retries: usize,
    /// Delay before the first rate-limit retry.
    pub rate_limit_backoff: Duration,
    /// Upper bound for any retry delay.
    pub max_backoff: Duration,
    /// Let a registry's `Retry-After` hint lengthen the delay.
    pub honor_retry_after: bool,
    /// Answer from the cache only and never touch the network.
    pub cache_only: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            lookup_timeout: None,
            concurrency: BTreeMap::from([
                (Ecosystem::Maven, 8),
                (Ecosystem::Npm, 16),
                (Ecosystem::PyPi, 8),
                (Ecosystem::NuGet, 8),
            ]),
            rate_limit_retries: 1,
            rate_limit_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(5),
            honor_retry_after: true,
            cache_only: false,
        }
    }
}

impl From<&GaiaConfig> for ResolverConfig {
    fn from(config: &GaiaConfig) -> Self {
        let settings = &config.resolver;
        Self {
            timeout: settings.timeout(),
            lookup_timeout: settings.lookup_timeout(),
            concurrency: Ecosystem::ALL
                .into_iter()
                .map(|eco| (eco, config.registries.endpoint(eco).max_concurrent))
                .collect(),
            rate_limit_retries: settings.rate_limit_retries as usize,
            rate_limit_backoff: settings.rate_limit_backoff(),
            max_backoff: settings.max_backoff(),
            honor_retry_after: settings.honor_retry_after,
            cache_only: settings.cache_only,
        }
    }
}

impl ResolverConfig {
    /// Build from loaded configuration.
    #[must_use]
    pub fn from_config(config: &GaiaConfig) -> Self {
        Self::from(config)
    }

    /// Set the overall timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the per-lookup timeout guard.
    #[must_use]
    pub const fn with_lookup_timeout(mut self, timeout: Duration) -> Self {
        self.lookup_timeout = Some(timeout);
        self
    }

    /// Set the rate-limit retry count and first delay.
    #[must_use]
    pub const fn with_rate_limit_retry(mut self, retries: usize, backoff: Duration) -> Self {
        self.rate_limit_retries = retries;
        self.rate_limit_backoff = backoff;
        self
    }

    /// Set the concurrency cap for one ecosystem.
    #[must_use]
    pub fn with_concurrency(mut self, ecosystem: Ecosystem, limit: usize) -> Self {
        self.concurrency.insert(ecosystem, limit);
        self
    }

    /// Serve from the cache only.
    #[must_use]
    pub const fn with_cache_only(mut self, cache_only: bool) -> Self {
        self.cache_only = cache_only;
        self
    }

    /// Concurrency cap for an ecosystem, never zero.
    #[must_use]
    pub fn concurrency_for(&self, ecosystem: Ecosystem) -> usize {
        self.concurrency
            .get(&ecosystem)
            .copied()
            .unwrap_or(FALLBACK_CONCURRENCY)
            .max(1)
    }

    /// Delay before a rate-limit retry, given the backoff schedule's delay and
    /// the registry's hint.
    #[must_use]
    pub fn retry_delay(&self, scheduled: Duration, retry_after: Option<Duration>) -> Duration {
        let delay = match retry_after {
            Some(hint) if self.honor_retry_after => scheduled.max(hint),
            _ => scheduled,
        };
        delay.min(self.max_backoff)
    }
}
