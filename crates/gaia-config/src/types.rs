//! Configuration types.
//!
//! [`GaiaConfig`] is the fully resolved configuration with every field set.
//! [`ConfigFile`] mirrors the on-disk JSON where every field is optional, so a
//! file only overrides what it names.

use gaia_core::Ecosystem;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Default user agent sent to registries.
pub const DEFAULT_USER_AGENT: &str = concat!("gaia/", env!("CARGO_PKG_VERSION"));

/// HTTP client settings shared by all registry clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct HttpSettings {
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Connection timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Requests per second allowed per registry host.
    pub rate_limit_per_host: u32,
    /// User agent string.
    pub user_agent: String,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            connect_timeout_secs: 5,
            rate_limit_per_host: 20,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl HttpSettings {
    /// Per-request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Connection timeout.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// Resolution orchestration settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ResolverSettings {
    /// Overall budget for one `resolve` call, in seconds.
    pub timeout_secs: u64,
    /// Optional guard around a single registry lookup, in seconds. Unset, a
    /// lookup is bounded by the HTTP request timeout and the overall budget.
    pub lookup_timeout_secs: Option<u64>,
    /// Retries after a rate-limited response.
    pub rate_limit_retries: u32,
    /// Delay before the first rate-limit retry, in milliseconds.
    pub rate_limit_backoff_ms: u64,
    /// Upper bound for any rate-limit delay, in milliseconds.
    pub max_backoff_ms: u64,
    /// Whether a registry `Retry-After` hint may lengthen the delay.
    pub honor_retry_after: bool,
    /// Resolve from the cache only; misses fail without touching the network.
    pub cache_only: bool,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            lookup_timeout_secs: None,
            rate_limit_retries: 1,
            rate_limit_backoff_ms: 500,
            max_backoff_ms: 5_000,
            honor_retry_after: true,
            cache_only: false,
        }
    }
}

impl ResolverSettings {
    /// Overall resolution timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Single lookup timeout, when one is configured.
    #[must_use]
    pub fn lookup_timeout(&self) -> Option<Duration> {
        self.lookup_timeout_secs.map(Duration::from_secs)
    }

    /// Initial rate-limit backoff.
    #[must_use]
    pub const fn rate_limit_backoff(&self) -> Duration {
        Duration::from_millis(self.rate_limit_backoff_ms)
    }

    /// Maximum rate-limit backoff.
    #[must_use]
    pub const fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }
}

/// Registry response cache settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CacheSettings {
    /// One TTL for every ecosystem, in seconds. Overrides per-registry TTLs.
    pub ttl_secs: Option<u64>,
}

/// One registry endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RegistryEndpoint {
    /// Base URL.
    pub url: String,
    /// Maximum lookups in flight against this registry.
    pub max_concurrent: usize,
    /// How long lookups stay cached, in seconds.
    pub cache_ttl_secs: u64,
    /// Bearer token sent with every request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Whether a client is registered for this ecosystem.
    pub enabled: bool,
}

impl RegistryEndpoint {
    fn new(url: &str, max_concurrent: usize, cache_ttl_secs: u64) -> Self {
        Self {
            url: url.to_string(),
            max_concurrent,
            cache_ttl_secs,
            token: None,
            enabled: true,
        }
    }

    /// Cache TTL.
    #[must_use]
    pub const fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

/// Endpoints for every supported ecosystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrySettings {
    /// Maven Central search.
    pub maven: RegistryEndpoint,
    /// npm registry.
    pub npm: RegistryEndpoint,
    /// PyPI JSON API.
    pub pypi: RegistryEndpoint,
    /// NuGet flat container.
    pub nuget: RegistryEndpoint,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            maven: RegistryEndpoint::new("https://search.maven.org", 8, 3600),
            npm: RegistryEndpoint::new("https://registry.npmjs.org", 16, 900),
            pypi: RegistryEndpoint::new("https://pypi.org", 8, 900),
            nuget: RegistryEndpoint::new("https://api.nuget.org", 8, 900),
        }
    }
}

impl RegistrySettings {
    /// Endpoint for an ecosystem.
    #[must_use]
    pub const fn endpoint(&self, ecosystem: Ecosystem) -> &RegistryEndpoint {
        match ecosystem {
            Ecosystem::Maven => &self.maven,
            Ecosystem::Npm => &self.npm,
            Ecosystem::PyPi => &self.pypi,
            Ecosystem::NuGet => &self.nuget,
        }
    }

    /// Mutable endpoint for an ecosystem.
    pub fn endpoint_mut(&mut self, ecosystem: Ecosystem) -> &mut RegistryEndpoint {
        match ecosystem {
            Ecosystem::Maven => &mut self.maven,
            Ecosystem::Npm => &mut self.npm,
            Ecosystem::PyPi => &mut self.pypi,
            Ecosystem::NuGet => &mut self.nuget,
        }
    }
}

/// Fully resolved configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GaiaConfig {
    /// HTTP client settings.
    pub http: HttpSettings,
    /// Resolution settings.
    pub resolver: ResolverSettings,
    /// Cache settings.
    pub cache: CacheSettings,
    /// Registry endpoints.
    pub registries: RegistrySettings,
}

impl GaiaConfig {
    /// Effective cache TTL for an ecosystem.
    #[must_use]
    pub fn cache_ttl(&self, ecosystem: Ecosystem) -> Duration {
        self.cache.ttl_secs.map_or_else(
            || self.registries.endpoint(ecosystem).cache_ttl(),
            Duration::from_secs,
        )
    }

    /// Apply the fields set in a config file.
    pub fn apply_file(&mut self, file: &ConfigFile) {
        if let Some(http) = &file.http {
            set(&mut self.http.timeout_secs, http.timeout_secs);
            set(&mut self.http.connect_timeout_secs, http.connect_timeout_secs);
            set(&mut self.http.rate_limit_per_host, http.rate_limit_per_host);
            set(&mut self.http.user_agent, http.user_agent.clone());
        }

        if let Some(resolver) = &file.resolver {
            set(&mut self.resolver.timeout_secs, resolver.timeout_secs);
            if resolver.lookup_timeout_secs.is_some() {
                self.resolver.lookup_timeout_secs = resolver.lookup_timeout_secs;
            }
            set(
                &mut self.resolver.rate_limit_retries,
                resolver.rate_limit_retries,
            );
            set(
                &mut self.resolver.rate_limit_backoff_ms,
                resolver.rate_limit_backoff_ms,
            );
            set(&mut self.resolver.max_backoff_ms, resolver.max_backoff_ms);
            set(
                &mut self.resolver.honor_retry_after,
                resolver.honor_retry_after,
            );
            set(&mut self.resolver.cache_only, resolver.cache_only);
        }

        if let Some(cache) = &file.cache {
            if cache.ttl_secs.is_some() {
                self.cache.ttl_secs = cache.ttl_secs;
            }
        }

        for (ecosystem, registry) in &file.registries {
            let endpoint = self.registries.endpoint_mut(*ecosystem);
            set(&mut endpoint.url, registry.url.clone());
            set(&mut endpoint.max_concurrent, registry.max_concurrent);
            set(&mut endpoint.cache_ttl_secs, registry.cache_ttl_secs);
            set(&mut endpoint.enabled, registry.enabled);
            if registry.token.is_some() {
                endpoint.token = registry.token.clone();
            }
        }
    }
}

fn set<T>(target: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *target = value;
    }
}

/// On-disk configuration; every field optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ConfigFile {
    /// HTTP overrides.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http: Option<HttpFile>,
    /// Resolver overrides.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolver: Option<ResolverFile>,
    /// Cache overrides.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache: Option<CacheSettings>,
    /// Per-registry overrides keyed by ecosystem tag.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub registries: BTreeMap<Ecosystem, RegistryFile>,
}

/// HTTP section of a config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct HttpFile {
    /// See [`HttpSettings::timeout_secs`].
    pub timeout_secs: Option<u64>,
    /// See [`HttpSettings::connect_timeout_secs`].
    pub connect_timeout_secs: Option<u64>,
    /// See [`HttpSettings::rate_limit_per_host`].
    pub rate_limit_per_host: Option<u32>,
    /// See [`HttpSettings::user_agent`].
    pub user_agent: Option<String>,
}

/// Resolver section of a config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ResolverFile {
    /// See [`ResolverSettings::timeout_secs`].
    pub timeout_secs: Option<u64>,
    /// See [`ResolverSettings::lookup_timeout_secs`].
    pub lookup_timeout_secs: Option<u64>,
    /// See [`ResolverSettings::rate_limit_retries`].
    pub rate_limit_retries: Option<u32>,
    /// See [`ResolverSettings::rate_limit_backoff_ms`].
    pub rate_limit_backoff_ms: Option<u64>,
    /// See [`ResolverSettings::max_backoff_ms`].
    pub max_backoff_ms: Option<u64>,
    /// See [`ResolverSettings::honor_retry_after`].
    pub honor_retry_after: Option<bool>,
    /// See [`ResolverSettings::cache_only`].
    pub cache_only: Option<bool>,
}

/// Registry section of a config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct RegistryFile {
    /// See [`RegistryEndpoint::url`].
    pub url: Option<String>,
    /// See [`RegistryEndpoint::max_concurrent`].
    pub max_concurrent: Option<usize>,
    /// See [`RegistryEndpoint::cache_ttl_secs`].
    pub cache_ttl_secs: Option<u64>,
    /// See [`RegistryEndpoint::token`].
    pub token: Option<String>,
    /// See [`RegistryEndpoint::enabled`].
    pub enabled: Option<bool>,
}
