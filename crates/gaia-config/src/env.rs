//! Environment variable configuration support.

use crate::error::{ConfigError, Result};
use crate::types::GaiaConfig;
use gaia_core::Ecosystem;
use std::path::PathBuf;
use std::str::FromStr;

/// Environment variables Gaia reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GaiaEnvVar {
    /// `GAIA_HOME` - global configuration directory.
    Home,
    /// `GAIA_HTTP_TIMEOUT` - per-request timeout in seconds.
    HttpTimeout,
    /// `GAIA_RESOLVE_TIMEOUT` - overall resolution timeout in seconds.
    ResolveTimeout,
    /// `GAIA_MAX_CONCURRENT` - in-flight lookup cap applied to every registry.
    MaxConcurrent,
    /// `GAIA_RATE_LIMIT_BACKOFF_MS` - delay before a rate-limit retry.
    RateLimitBackoffMs,
    /// `GAIA_CACHE_TTL` - cache TTL in seconds for every ecosystem.
    CacheTtl,
    /// `GAIA_OFFLINE_CACHE_ONLY` - resolve from the cache only.
    CacheOnly,
    /// `GAIA_MAVEN_URL` - Maven search base URL.
    MavenUrl,
    /// `GAIA_NPM_URL` - npm registry base URL.
    NpmUrl,
    /// `GAIA_PYPI_URL` - PyPI base URL.
    PypiUrl,
    /// `GAIA_NUGET_URL` - NuGet base URL.
    NugetUrl,
    /// `GAIA_NPM_TOKEN` - npm bearer token.
    NpmToken,
}

impl GaiaEnvVar {
    /// Every variable, in documentation order.
    pub const ALL: [Self; 12] = [
        Self::Home,
        Self::HttpTimeout,
        Self::ResolveTimeout,
        Self::MaxConcurrent,
        Self::RateLimitBackoffMs,
        Self::CacheTtl,
        Self::CacheOnly,
        Self::MavenUrl,
        Self::NpmUrl,
        Self::PypiUrl,
        Self::NugetUrl,
        Self::NpmToken,
    ];

    /// Get the environment variable name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Home => "GAIA_HOME",
            Self::HttpTimeout => "GAIA_HTTP_TIMEOUT",
            Self::ResolveTimeout => "GAIA_RESOLVE_TIMEOUT",
            Self::MaxConcurrent => "GAIA_MAX_CONCURRENT",
            Self::RateLimitBackoffMs => "GAIA_RATE_LIMIT_BACKOFF_MS",
            Self::CacheTtl => "GAIA_CACHE_TTL",
            Self::CacheOnly => "GAIA_OFFLINE_CACHE_ONLY",
            Self::MavenUrl => "GAIA_MAVEN_URL",
            Self::NpmUrl => "GAIA_NPM_URL",
            Self::PypiUrl => "GAIA_PYPI_URL",
            Self::NugetUrl => "GAIA_NUGET_URL",
            Self::NpmToken => "GAIA_NPM_TOKEN",
        }
    }

    /// Registry URL variable for an ecosystem.
    #[must_use]
    pub const fn url_for(ecosystem: Ecosystem) -> Self {
        match ecosystem {
            Ecosystem::Maven => Self::MavenUrl,
            Ecosystem::Npm => Self::NpmUrl,
            Ecosystem::PyPi => Self::PypiUrl,
            Ecosystem::NuGet => Self::NugetUrl,
        }
    }
}

/// Values read from the environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvConfig {
    /// `GAIA_HOME` directory.
    pub home: Option<PathBuf>,
    /// Per-request timeout in seconds.
    pub http_timeout: Option<u64>,
    /// Overall resolution timeout in seconds.
    pub resolve_timeout: Option<u64>,
    /// In-flight cap for every registry.
    pub max_concurrent: Option<usize>,
    /// Rate-limit backoff in milliseconds.
    pub rate_limit_backoff_ms: Option<u64>,
    /// Cache TTL in seconds.
    pub cache_ttl: Option<u64>,
    /// Resolve from cache only.
    pub cache_only: Option<bool>,
    /// Registry URL overrides.
    pub registry_urls: Vec<(Ecosystem, String)>,
    /// npm bearer token.
    pub npm_token: Option<String>,
}

impl EnvConfig {
    /// Read configuration from the process environment.
    ///
    /// # Errors
    /// Returns error if a numeric or boolean variable cannot be parsed.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read configuration through a lookup function.
    ///
    /// Empty values are treated as unset.
    ///
    /// # Errors
    /// Returns error if a numeric or boolean variable cannot be parsed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |var: GaiaEnvVar| lookup(var.as_str()).filter(|v| !v.trim().is_empty());

        let registry_urls = Ecosystem::ALL
            .into_iter()
            .filter_map(|ecosystem| get(GaiaEnvVar::url_for(ecosystem)).map(|url| (ecosystem, url)))
            .collect();

        Ok(Self {
            home: get(GaiaEnvVar::Home).map(PathBuf::from),
            http_timeout: parse_number(GaiaEnvVar::HttpTimeout, get(GaiaEnvVar::HttpTimeout))?,
            resolve_timeout: parse_number(
                GaiaEnvVar::ResolveTimeout,
                get(GaiaEnvVar::ResolveTimeout),
            )?,
            max_concurrent: parse_number(
                GaiaEnvVar::MaxConcurrent,
                get(GaiaEnvVar::MaxConcurrent),
            )?,
            rate_limit_backoff_ms: parse_number(
                GaiaEnvVar::RateLimitBackoffMs,
                get(GaiaEnvVar::RateLimitBackoffMs),
            )?,
            cache_ttl: parse_number(GaiaEnvVar::CacheTtl, get(GaiaEnvVar::CacheTtl))?,
            cache_only: parse_bool(GaiaEnvVar::CacheOnly, get(GaiaEnvVar::CacheOnly))?,
            registry_urls,
            npm_token: get(GaiaEnvVar::NpmToken),
        })
    }

    /// Apply environment overrides to a resolved configuration.
    pub fn apply_to(&self, config: &mut GaiaConfig) {
        if let Some(timeout) = self.http_timeout {
            config.http.timeout_secs = timeout;
        }
        if let Some(timeout) = self.resolve_timeout {
            config.resolver.timeout_secs = timeout;
        }
        if let Some(max) = self.max_concurrent {
            for ecosystem in Ecosystem::ALL {
                config.registries.endpoint_mut(ecosystem).max_concurrent = max;
            }
        }
        if let Some(backoff) = self.rate_limit_backoff_ms {
            config.resolver.rate_limit_backoff_ms = backoff;
        }
        if let Some(ttl) = self.cache_ttl {
            config.cache.ttl_secs = Some(ttl);
        }
        if let Some(cache_only) = self.cache_only {
            config.resolver.cache_only = cache_only;
        }
        for (ecosystem, url) in &self.registry_urls {
            config.registries.endpoint_mut(*ecosystem).url.clone_from(url);
        }
        if let Some(token) = &self.npm_token {
            config.registries.npm.token = Some(token.clone());
        }
    }
}

fn parse_number<T: FromStr>(var: GaiaEnvVar, value: Option<String>) -> Result<Option<T>> {
    value
        .map(|v| {
            v.trim()
                .parse()
                .map_err(|_| ConfigError::env(var.as_str(), format!("expected an integer, got '{v}'")))
        })
        .transpose()
}

/// 1/true/yes/on and 0/false/no/off.
fn parse_bool(var: GaiaEnvVar, value: Option<String>) -> Result<Option<bool>> {
    value
        .map(|v| match v.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::env(
                var.as_str(),
                format!("expected a boolean, got '{v}'"),
            )),
        })
        .transpose()
}
