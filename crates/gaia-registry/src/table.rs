//! Ecosystem to client lookup table.

use crate::client::{HttpClient, HttpClientConfig};
use crate::error::Result;
use crate::lookup::RegistryClient;
use crate::maven::MavenCentralClient;
use crate::npm::NpmRegistryClient;
use crate::nuget::NugetClient;
use crate::pypi::PypiClient;
use gaia_config::GaiaConfig;
use gaia_core::Ecosystem;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Registry clients by ecosystem.
#[derive(Debug, Clone, Default)]
pub struct RegistryTable {
    clients: BTreeMap<Ecosystem, Arc<dyn RegistryClient>>,
}

impl RegistryTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a client for every enabled registry in `config`.
    ///
    /// All clients share one [`HttpClient`].
    ///
    /// # Errors
    /// Returns error if the HTTP client or a registry URL is invalid.
    pub fn from_config(config: &GaiaConfig) -> Result<Self> {
        let http = Arc::new(HttpClient::with_config(HttpClientConfig::from(
            &config.http,
        ))?);
        let mut table = Self::new();

        for ecosystem in Ecosystem::ALL {
            let endpoint = config.registries.endpoint(ecosystem);
            if !endpoint.enabled {
                debug!(ecosystem = %ecosystem, "registry disabled");
                continue;
            }
            let http = Arc::clone(&http);
            let token = endpoint.token.as_deref();
            let client: Arc<dyn RegistryClient> = match ecosystem {
                Ecosystem::Maven => {
                    Arc::new(MavenCentralClient::new(http, &endpoint.url)?.with_token(token)?)
                }
                Ecosystem::Npm => {
                    Arc::new(NpmRegistryClient::new(http, &endpoint.url)?.with_token(token)?)
                }
                Ecosystem::PyPi => Arc::new(PypiClient::new(http, &endpoint.url)?.with_token(token)?),
                Ecosystem::NuGet => Arc::new(NugetClient::new(http, &endpoint.url)?.with_token(token)?),
            };
            table.insert(client);
        }

        Ok(table)
    }

    /// Register a client, replacing any client for the same ecosystem.
    #[must_use]
    pub fn with_client(mut self, client: Arc<dyn RegistryClient>) -> Self {
        self.insert(client);
        self
    }

    /// Register a client in place. Returns the client it replaced.
    pub fn insert(&mut self, client: Arc<dyn RegistryClient>) -> Option<Arc<dyn RegistryClient>> {
        self.clients.insert(client.ecosystem(), client)
    }

    /// Client for `ecosystem`, if one is registered.
    #[must_use]
    pub fn client(&self, ecosystem: Ecosystem) -> Option<Arc<dyn RegistryClient>> {
        self.clients.get(&ecosystem).cloned()
    }

    /// Check if a client is registered for `ecosystem`.
    #[must_use]
    pub fn supports(&self, ecosystem: Ecosystem) -> bool {
        self.clients.contains_key(&ecosystem)
    }

    /// Registered ecosystems, in declaration order.
    pub fn ecosystems(&self) -> impl Iterator<Item = Ecosystem> + '_ {
        self.clients.keys().copied()
    }

    /// Number of registered clients.
    #[must_use]
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    /// Check if no client is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_from_default_config() {
        let table = RegistryTable::from_config(&GaiaConfig::default()).unwrap();
        assert_eq!(table.len(), 4);
        assert_eq!(table.ecosystems().collect::<Vec<_>>(), Ecosystem::ALL.to_vec());
        assert_eq!(
            table.client(Ecosystem::PyPi).map(|c| c.ecosystem()),
            Some(Ecosystem::PyPi)
        );
    }

    #[test]
    fn test_disabled_registry_is_absent() {
        let mut config = GaiaConfig::default();
        config.registries.nuget.enabled = false;
        let table = RegistryTable::from_config(&config).unwrap();
        assert!(!table.supports(Ecosystem::NuGet));
        assert!(table.client(Ecosystem::NuGet).is_none());
        assert!(table.supports(Ecosystem::Maven));
    }

    #[test]
    fn test_invalid_url_fails() {
        let mut config = GaiaConfig::default();
        config.registries.npm.url = "registry.npmjs.org".into();
        assert!(RegistryTable::from_config(&config).is_err());
    }

    #[test]
    fn test_with_client_replaces() {
        let http = Arc::new(HttpClient::new().unwrap());
        let first = Arc::new(NpmRegistryClient::new(Arc::clone(&http), "https://a.example").unwrap());
        let second = Arc::new(NpmRegistryClient::new(http, "https://b.example").unwrap());

        let mut table = RegistryTable::new().with_client(first);
        assert!(table.insert(second).is_some());
        assert_eq!(table.len(), 1);
        assert!(!table.is_empty());
    }
}
