//! npm registry client.

use crate::client::{Endpoint, HttpClient};
use crate::error::Result;
use crate::lookup::{LookupFuture, RegistryClient, RegistryLookupResult};
use gaia_core::Ecosystem;
use serde::Deserialize;
use serde::de::IgnoredAny;
use std::collections::HashMap;
use std::sync::Arc;
use url::Url;

/// Default npm registry URL.
pub const NPM_REGISTRY_URL: &str = "https://registry.npmjs.org";

/// Abbreviated metadata: only what installers need, much smaller documents.
const ABBREVIATED_METADATA: &str = "application/vnd.npm.install-v1+json";

#[derive(Debug, Deserialize)]
struct Packument {
    #[serde(rename = "dist-tags", default)]
    dist_tags: HashMap<String, String>,
    #[serde(default)]
    versions: HashMap<String, IgnoredAny>,
}

/// Client for the npm registry.
#[derive(Debug)]
pub struct NpmRegistryClient {
    http: Arc<HttpClient>,
    endpoint: Endpoint,
}

impl NpmRegistryClient {
    /// Create a client for the registry at `base_url`.
    ///
    /// # Errors
    /// Returns error if the URL is invalid.
    pub fn new(http: Arc<HttpClient>, base_url: &str) -> Result<Self> {
        Ok(Self {
            http,
            endpoint: Endpoint::new(base_url)?.accept(ABBREVIATED_METADATA)?,
        })
    }

    /// Send a bearer token with every request.
    ///
    /// # Errors
    /// Returns error if the token is not a valid header value.
    pub fn with_token(mut self, token: Option<&str>) -> Result<Self> {
        self.endpoint = self.endpoint.bearer(token)?;
        Ok(self)
    }

    /// Packument URL. Scoped names keep `@` and encode the slash.
    ///
    /// # Errors
    /// Returns error if the URL cannot be built.
    pub fn package_url(&self, name: &str) -> Result<Url> {
        self.endpoint.join(&name.trim().replace('/', "%2F"))
    }

    async fn fetch(&self, name: String) -> Result<RegistryLookupResult> {
        let url = self.package_url(&name)?;
        let mut packument: Packument = self
            .http
            .get_json(&url, self.endpoint.headers())
            .await
            .map_err(|e| e.for_package(Ecosystem::Npm, &name))?;

        let latest = packument.dist_tags.remove("latest");
        let versions = packument.versions.into_keys();
        Ok(RegistryLookupResult::new(Ecosystem::Npm, name, versions).with_latest_tag(latest))
    }
}

impl RegistryClient for NpmRegistryClient {
    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::Npm
    }

    fn lookup_versions(&self, name: String) -> LookupFuture<'_> {
        Box::pin(self.fetch(name))
    }
}
