//! HTTP client with connection pooling and per-host rate limiting.
//!
//! Requests are never retried here; the resolver owns the retry policy.

use crate::error::{RegistryError, Result};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use gaia_config::{DEFAULT_USER_AGENT, HttpSettings};
use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
};
use reqwest::{Client, StatusCode, header};
use serde::de::DeserializeOwned;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use url::Url;

/// HTTP client configuration.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Request timeout.
    pub timeout: Duration,
    /// Connection timeout.
    pub connect_timeout: Duration,
    /// Requests per second per host.
    pub rate_limit_per_host: u32,
    /// Idle connections kept per host.
    pub max_idle_per_host: usize,
    /// User agent string.
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(5),
            rate_limit_per_host: 20,
            max_idle_per_host: 16,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl From<&HttpSettings> for HttpClientConfig {
    fn from(settings: &HttpSettings) -> Self {
        Self {
            timeout: settings.timeout(),
            connect_timeout: settings.connect_timeout(),
            rate_limit_per_host: settings.rate_limit_per_host,
            user_agent: settings.user_agent.clone(),
            ..Self::default()
        }
    }
}

/// HTTP client statistics.
#[derive(Debug, Default)]
pub struct HttpClientStats {
    /// Total requests made.
    pub requests: AtomicU64,
    /// Successful requests (2xx).
    pub successes: AtomicU64,
    /// Client errors (4xx other than 429).
    pub client_errors: AtomicU64,
    /// Server errors (5xx).
    pub server_errors: AtomicU64,
    /// Rate limit hits.
    pub rate_limited: AtomicU64,
    /// Requests that timed out.
    pub timeouts: AtomicU64,
    /// Total bytes received.
    pub bytes_received: AtomicU64,
    /// Total time spent on requests.
    total_request_time_ms: AtomicU64,
}

impl HttpClientStats {
    /// Create new stats tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get average request time in milliseconds.
    #[must_use]
    pub fn avg_request_time_ms(&self) -> f64 {
        let total = self.total_request_time_ms.load(Ordering::Relaxed);
        let count = self.requests.load(Ordering::Relaxed);
        if count == 0 {
            0.0
        } else {
            total as f64 / count as f64
        }
    }

    /// Get success rate as a percentage.
    #[must_use]
    pub fn success_rate(&self) -> f64 {
        let total = self.requests.load(Ordering::Relaxed);
        let success = self.successes.load(Ordering::Relaxed);
        if total == 0 {
            100.0
        } else {
            (success as f64 / total as f64) * 100.0
        }
    }

    fn record_request(&self, duration: Duration) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        self.total_request_time_ms
            .fetch_add(duration.as_millis() as u64, Ordering::Relaxed);
    }
}

/// HTTP response body and status.
#[derive(Debug)]
pub struct HttpResponse {
    /// Response body bytes.
    pub body: Bytes,
    /// HTTP status code.
    pub status: StatusCode,
}

type HostRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// HTTP client shared by every registry client.
#[derive(Debug)]
pub struct HttpClient {
    /// Underlying reqwest client.
    client: Client,
    /// Configuration.
    config: HttpClientConfig,
    /// Per-host rate limiters.
    rate_limiters: DashMap<String, Arc<HostRateLimiter>>,
    /// Statistics.
    stats: Arc<HttpClientStats>,
}

impl HttpClient {
    /// Create a new HTTP client with default configuration.
    ///
    /// # Errors
    /// Returns error if client cannot be created.
    pub fn new() -> Result<Self> {
        Self::with_config(HttpClientConfig::default())
    }

    /// Create a new HTTP client with custom configuration.
    ///
    /// # Errors
    /// Returns error if client cannot be created.
    pub fn with_config(config: HttpClientConfig) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(header::USER_AGENT, header_value(&config.user_agent)?);
        headers.insert(header::ACCEPT, header_value("application/json")?);
        headers.insert(header::ACCEPT_ENCODING, header_value("gzip, br, deflate")?);

        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(config.max_idle_per_host)
            .pool_idle_timeout(Duration::from_secs(90))
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .default_headers(headers)
            .build()
            .map_err(|e| RegistryError::InvalidConfig {
                message: format!("failed to create HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            config,
            rate_limiters: DashMap::new(),
            stats: Arc::new(HttpClientStats::new()),
        })
    }

    /// Get the rate limiter for a host, creating one if needed.
    fn rate_limiter(&self, host: &str) -> Arc<HostRateLimiter> {
        self.rate_limiters
            .entry(host.to_string())
            .or_insert_with(|| {
                let quota = Quota::per_second(
                    NonZeroU32::new(self.config.rate_limit_per_host).unwrap_or(NonZeroU32::MIN),
                );
                Arc::new(RateLimiter::direct(quota))
            })
            .clone()
    }

    /// Perform one GET request.
    ///
    /// `headers` are added to the client defaults and override them.
    ///
    /// # Errors
    /// 404 and other 4xx answers map to [`RegistryError::Network`] with the
    /// status set, 429 to [`RegistryError::RateLimited`], transport timeouts to
    /// [`RegistryError::Timeout`].
    pub async fn get(&self, url: &Url, headers: &header::HeaderMap) -> Result<HttpResponse> {
        let host = url.host_str().ok_or_else(|| RegistryError::InvalidUrl {
            url: url.to_string(),
            message: "no host in URL".into(),
        })?;

        self.rate_limiter(host).until_ready().await;

        let url_str = url.to_string();
        let start = Instant::now();
        let result = self
            .client
            .get(url.clone())
            .headers(headers.clone())
            .send()
            .await;
        self.stats.record_request(start.elapsed());

        let response = result.map_err(|e| self.transport_error(&url_str, &e))?;
        let status = response.status();

        if !status.is_success() {
            return Err(self.status_error(&url_str, status, response.headers()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| self.transport_error(&url_str, &e))?;

        self.stats.successes.fetch_add(1, Ordering::Relaxed);
        self.stats
            .bytes_received
            .fetch_add(body.len() as u64, Ordering::Relaxed);
        debug!(
            url = %url_str,
            status = status.as_u16(),
            bytes = body.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "registry response"
        );

        Ok(HttpResponse { body, status })
    }

    /// Perform a GET request and decode the JSON body.
    ///
    /// # Errors
    /// Returns the errors of [`get`](Self::get), or
    /// [`RegistryError::InvalidResponse`] when the body does not decode.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &Url,
        headers: &header::HeaderMap,
    ) -> Result<T> {
        let response = self.get(url, headers).await?;
        sonic_rs::from_slice(&response.body).map_err(|e| RegistryError::InvalidResponse {
            url: url.to_string(),
            message: e.to_string(),
        })
    }

    fn status_error(
        &self,
        url: &str,
        status: StatusCode,
        headers: &header::HeaderMap,
    ) -> RegistryError {
        if status == StatusCode::TOO_MANY_REQUESTS {
            self.stats.rate_limited.fetch_add(1, Ordering::Relaxed);
            let retry_after = headers
                .get(header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(parse_retry_after);
            warn!(url = %url, retry_after = ?retry_after, "registry rate limit hit");
            return RegistryError::RateLimited {
                url: url.to_string(),
                retry_after,
            };
        }

        let message = if status.is_server_error() {
            self.stats.server_errors.fetch_add(1, Ordering::Relaxed);
            format!("server error: {status}")
        } else if status == StatusCode::NOT_FOUND {
            self.stats.client_errors.fetch_add(1, Ordering::Relaxed);
            "not found".to_string()
        } else {
            self.stats.client_errors.fetch_add(1, Ordering::Relaxed);
            format!("unexpected status: {status}")
        };

        RegistryError::Network {
            url: url.to_string(),
            message,
            status: Some(status.as_u16()),
        }
    }

    fn transport_error(&self, url: &str, err: &reqwest::Error) -> RegistryError {
        if err.is_timeout() {
            self.stats.timeouts.fetch_add(1, Ordering::Relaxed);
            RegistryError::Timeout {
                url: url.to_string(),
                timeout_secs: self.config.timeout.as_secs(),
            }
        } else if err.is_connect() {
            RegistryError::Network {
                url: url.to_string(),
                message: format!("connection failed: {err}"),
                status: None,
            }
        } else {
            RegistryError::Network {
                url: url.to_string(),
                message: err.to_string(),
                status: None,
            }
        }
    }

    /// Get client statistics.
    #[must_use]
    pub fn stats(&self) -> &HttpClientStats {
        &self.stats
    }

    /// Get the configuration.
    #[must_use]
    pub const fn config(&self) -> &HttpClientConfig {
        &self.config
    }
}

/// Base URL and per-client headers of one registry.
#[derive(Debug, Clone)]
pub(crate) struct Endpoint {
    base: Url,
    headers: header::HeaderMap,
}

impl Endpoint {
    /// Parse `base`, making sure relative joins append to its path.
    pub(crate) fn new(base: &str) -> Result<Self> {
        let mut url = Url::parse(base.trim()).map_err(|e| RegistryError::InvalidUrl {
            url: base.to_string(),
            message: e.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(RegistryError::InvalidUrl {
                url: base.to_string(),
                message: "scheme must be http or https".into(),
            });
        }
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        Ok(Self {
            base: url,
            headers: header::HeaderMap::new(),
        })
    }

    /// Override the `Accept` header.
    pub(crate) fn accept(mut self, accept: &str) -> Result<Self> {
        self.headers.insert(header::ACCEPT, header_value(accept)?);
        Ok(self)
    }

    /// Send a bearer token with every request.
    pub(crate) fn bearer(mut self, token: Option<&str>) -> Result<Self> {
        if let Some(token) = token.filter(|t| !t.trim().is_empty()) {
            let mut value = header_value(&format!("Bearer {}", token.trim()))?;
            value.set_sensitive(true);
            self.headers.insert(header::AUTHORIZATION, value);
        }
        Ok(self)
    }

    /// Join a relative path onto the base URL.
    pub(crate) fn join(&self, path: &str) -> Result<Url> {
        self.base.join(path).map_err(|e| RegistryError::InvalidUrl {
            url: format!("{}{path}", self.base),
            message: e.to_string(),
        })
    }

    pub(crate) const fn headers(&self) -> &header::HeaderMap {
        &self.headers
    }
}

fn header_value(value: &str) -> Result<header::HeaderValue> {
    value.parse().map_err(|_| RegistryError::InvalidConfig {
        message: format!("invalid header value '{value}'"),
    })
}

/// Parse a `Retry-After` value: delta-seconds or an HTTP date.
fn parse_retry_after(value: &str) -> Option<Duration> {
    let value = value.trim();
    if let Ok(secs) = value.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }
    let at = DateTime::parse_from_rfc2822(value).ok()?;
    let wait = at.with_timezone(&Utc) - Utc::now();
    Some(wait.to_std().unwrap_or(Duration::ZERO))
}
