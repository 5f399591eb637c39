//! The registry capability and its lookup result.

use crate::error::Result;
use chrono::{DateTime, Utc};
use gaia_core::{Ecosystem, Version};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use tracing::debug;

/// Future returned by [`RegistryClient::lookup_versions`].
pub type LookupFuture<'a> = Pin<Box<dyn Future<Output = Result<RegistryLookupResult>> + Send + 'a>>;

/// Lists the versions a registry publishes for a package.
///
/// Implementations perform one request per call, apply their own timeout and
/// never retry.
pub trait RegistryClient: Send + Sync + fmt::Debug {
    /// Ecosystem this client serves.
    fn ecosystem(&self) -> Ecosystem;

    /// Fetch the available versions of `name`.
    ///
    /// Fails with `NotFound` when the package does not exist, `Network` or
    /// `Timeout` when the registry is unreachable, and `RateLimited` when
    /// throttled.
    fn lookup_versions(&self, name: String) -> LookupFuture<'_>;
}

/// Versions published for one package, as returned by a registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryLookupResult {
    /// Package name as queried.
    pub name: String,
    /// Version strings, newest first. Unparseable versions come last.
    pub available_versions: Vec<String>,
    /// Version the registry tags as latest, when it publishes one.
    pub latest_tag: Option<String>,
    /// When the lookup completed.
    pub fetched_at: DateTime<Utc>,
    /// Ecosystem that answered.
    pub source: Ecosystem,
}

impl RegistryLookupResult {
    /// Create a result, sorting and deduplicating the versions.
    #[must_use]
    pub fn new(
        source: Ecosystem,
        name: impl Into<String>,
        versions: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            name: name.into(),
            available_versions: sort_versions_descending(versions),
            latest_tag: None,
            fetched_at: Utc::now(),
            source,
        }
    }

    /// Record the registry's latest tag.
    #[must_use]
    pub fn with_latest_tag(mut self, tag: Option<String>) -> Self {
        self.latest_tag = tag;
        self
    }

    /// Newest listed version.
    #[must_use]
    pub fn newest(&self) -> Option<&str> {
        self.available_versions.first().map(String::as_str)
    }

    /// Number of listed versions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.available_versions.len()
    }

    /// Check if the registry listed no versions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.available_versions.is_empty()
    }
}

/// Sort version strings newest first.
///
/// Blank and duplicate strings are dropped. Strings that do not parse as a
/// version keep their relative order after every parseable one.
#[must_use]
pub fn sort_versions_descending(versions: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut parsed = Vec::new();
    let mut unparsed = Vec::new();

    for raw in versions {
        let version = raw.trim();
        if version.is_empty() || !seen.insert(version.to_string()) {
            continue;
        }
        match Version::parse(version) {
            Ok(parsed_version) => parsed.push((parsed_version, version.to_string())),
            Err(_) => {
                debug!(version = %version, "unparseable version listed last");
                unparsed.push(version.to_string());
            }
        }
    }

    // Stable, so equal versions ("1.0" and "1.0.0") keep registry order.
    parsed.sort_by(|a, b| b.0.cmp(&a.0));
    parsed
        .into_iter()
        .map(|(_, version)| version)
        .chain(unparsed)
        .collect()
}
