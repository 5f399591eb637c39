//! PyPI JSON API client.

use crate::client::{Endpoint, HttpClient};
use crate::error::Result;
use crate::lookup::{LookupFuture, RegistryClient, RegistryLookupResult};
use gaia_core::Ecosystem;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::trace;
use url::Url;

/// Default PyPI URL.
pub const PYPI_URL: &str = "https://pypi.org";

#[derive(Debug, Deserialize)]
struct ProjectResponse {
    #[serde(default)]
    info: Option<ProjectInfo>,
    #[serde(default)]
    releases: HashMap<String, Vec<ReleaseFile>>,
}

#[derive(Debug, Deserialize)]
struct ProjectInfo {
    version: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReleaseFile {
    #[serde(default)]
    yanked: bool,
}

/// Client for the PyPI JSON API.
#[derive(Debug)]
pub struct PypiClient {
    http: Arc<HttpClient>,
    endpoint: Endpoint,
}

impl PypiClient {
    /// Create a client for the index at `base_url`.
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

    /// Project metadata URL.
    ///
    /// # Errors
    /// Returns error if the URL cannot be built.
    pub fn project_url(&self, name: &str) -> Result<Url> {
        self.endpoint.join(&format!(
            "pypi/{}/json",
            Ecosystem::PyPi.normalize_name(name)
        ))
    }

    async fn fetch(&self, name: String) -> Result<RegistryLookupResult> {
        let url = self.project_url(&name)?;
        let project: ProjectResponse = self
            .http
            .get_json(&url, self.endpoint.headers())
            .await
            .map_err(|e| e.for_package(Ecosystem::PyPi, &name))?;

        // A release whose every file is yanked is gone; one without files is kept.
        let versions = project
            .releases
            .into_iter()
            .filter(|(version, files)| {
                let yanked = !files.is_empty() && files.iter().all(|f| f.yanked);
                if yanked {
                    trace!(package = %name, version = %version, "skipping yanked release");
                }
                !yanked
            })
            .map(|(version, _)| version)
            .collect::<Vec<_>>();

        let latest = project.info.and_then(|info| info.version);
        Ok(RegistryLookupResult::new(Ecosystem::PyPi, name, versions).with_latest_tag(latest))
    }
}

impl RegistryClient for PypiClient {
    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::PyPi
    }

    fn lookup_versions(&self, name: String) -> LookupFuture<'_> {
        Box::pin(self.fetch(name))
    }
}
