//! NuGet v3 flat-container client.

use crate::client::{Endpoint, HttpClient};
use crate::error::Result;
use crate::lookup::{LookupFuture, RegistryClient, RegistryLookupResult};
use gaia_core::Ecosystem;
use serde::Deserialize;
use std::sync::Arc;
use url::Url;

/// Default NuGet URL.
pub const NUGET_URL: &str = "https://api.nuget.org";

#[derive(Debug, Deserialize)]
struct VersionIndex {
    #[serde(default)]
    versions: Vec<String>,
}

/// Client for the NuGet flat container.
#[derive(Debug)]
pub struct NugetClient {
    http: Arc<HttpClient>,
    endpoint: Endpoint,
}

impl NugetClient {
    /// Create a client for the service at `base_url`.
    ///
    /// # Errors
    /// Returns error if the URL is invalid.
    pub fn new(http: Arc<HttpClient>, base_url: &str) -> Result<Self> {
        Ok(Self {
            http,
            endpoint: Endpoint::new(base_url)?,
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

    /// Version index URL; package ids are lowercased.
    ///
    /// # Errors
    /// Returns error if the URL cannot be built.
    pub fn index_url(&self, name: &str) -> Result<Url> {
        self.endpoint.join(&format!(
            "v3-flatcontainer/{}/index.json",
            name.trim().to_lowercase()
        ))
    }

    async fn fetch(&self, name: String) -> Result<RegistryLookupResult> {
        let url = self.index_url(&name)?;
        let index: VersionIndex = self
            .http
            .get_json(&url, self.endpoint.headers())
            .await
            .map_err(|e| e.for_package(Ecosystem::NuGet, &name))?;
        Ok(RegistryLookupResult::new(
            Ecosystem::NuGet,
            name,
            index.versions,
        ))
    }
}

impl RegistryClient for NugetClient {
    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::NuGet
    }

    fn lookup_versions(&self, name: String) -> LookupFuture<'_> {
        Box::pin(self.fetch(name))
    }
}
