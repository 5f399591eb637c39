//! In-memory registry clients.
//!
//! [`FakeRegistry`] answers from a table of per-package [`Behavior`]s and
//! counts every call, so tests can assert how often the network would have
//! been hit.

use gaia_core::Ecosystem;
use gaia_registry::{LookupFuture, RegistryClient, RegistryError, RegistryLookupResult};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// How a fake answers lookups for one package.
#[derive(Debug, Clone)]
pub enum Behavior {
    /// Return these versions.
    Versions(Vec<String>),
    /// Fail with `NotFound`.
    NotFound,
    /// Fail with a transport error.
    NetworkError,
    /// Fail with `RateLimited` for the first `times` calls, then succeed.
    RateLimited {
        /// Number of throttled calls before success.
        times: usize,
        /// `Retry-After` hint to report.
        retry_after: Option<Duration>,
        /// Versions returned once the limit lifts.
        then: Vec<String>,
    },
    /// Never complete.
    Hang,
    /// Panic inside the lookup.
    Panic,
}

/// Scriptable in-memory registry.
#[derive(Debug)]
pub struct FakeRegistry {
    ecosystem: Ecosystem,
    behaviors: HashMap<String, Behavior>,
    latency: Option<Duration>,
    calls: Mutex<HashMap<String, usize>>,
    total_calls: AtomicUsize,
}

impl FakeRegistry {
    /// Create a fake with no packages; unknown names are `NotFound`.
    #[must_use]
    pub fn new(ecosystem: Ecosystem) -> Self {
        Self {
            ecosystem,
            behaviors: HashMap::new(),
            latency: None,
            calls: Mutex::new(HashMap::new()),
            total_calls: AtomicUsize::new(0),
        }
    }

    /// Serve `versions` for `name`.
    #[must_use]
    pub fn with_versions(self, name: &str, versions: &[&str]) -> Self {
        self.with_behavior(
            name,
            Behavior::Versions(versions.iter().map(|v| (*v).to_string()).collect()),
        )
    }

    /// Script the behaviour for `name`.
    #[must_use]
    pub fn with_behavior(mut self, name: &str, behavior: Behavior) -> Self {
        self.behaviors
            .insert(self.ecosystem.normalize_name(name), behavior);
        self
    }

    /// Delay every answer.
    #[must_use]
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Lookups made for `name`.
    #[must_use]
    pub fn calls(&self, name: &str) -> usize {
        self.calls
            .lock()
            .get(&self.ecosystem.normalize_name(name))
            .copied()
            .unwrap_or(0)
    }

    /// Lookups made for any package.
    #[must_use]
    pub fn total_calls(&self) -> usize {
        self.total_calls.load(Ordering::SeqCst)
    }

    fn record_call(&self, key: &str) -> usize {
        self.total_calls.fetch_add(1, Ordering::SeqCst);
        let mut calls = self.calls.lock();
        let count = calls.entry(key.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    fn url(&self, name: &str) -> String {
        format!("fake://{}/{name}", self.ecosystem)
    }
}

impl RegistryClient for FakeRegistry {
    fn ecosystem(&self) -> Ecosystem {
        self.ecosystem
    }

    fn lookup_versions(&self, name: String) -> LookupFuture<'_> {
        Box::pin(async move {
            let key = self.ecosystem.normalize_name(&name);
            let attempt = self.record_call(&key);

            if let Some(latency) = self.latency {
                tokio::time::sleep(latency).await;
            }

            match self.behaviors.get(&key) {
                Some(Behavior::Versions(versions)) => Ok(RegistryLookupResult::new(
                    self.ecosystem,
                    name,
                    versions.iter().cloned(),
                )),
                Some(Behavior::RateLimited {
                    times,
                    retry_after,
                    then,
                }) => {
                    if attempt <= *times {
                        Err(RegistryError::RateLimited {
                            url: self.url(&name),
                            retry_after: *retry_after,
                        })
                    } else {
                        Ok(RegistryLookupResult::new(
                            self.ecosystem,
                            name,
                            then.iter().cloned(),
                        ))
                    }
                }
                Some(Behavior::NetworkError) => Err(RegistryError::Network {
                    url: self.url(&name),
                    message: "connection refused".into(),
                    status: None,
                }),
                Some(Behavior::Hang) => std::future::pending().await,
                Some(Behavior::Panic) => panic!("fake registry panicked on {name}"),
                Some(Behavior::NotFound) | None => Err(RegistryError::NotFound {
                    ecosystem: self.ecosystem,
                    name,
                }),
            }
        })
    }
}
