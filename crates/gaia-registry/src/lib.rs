//! Package registry access for Gaia.
//!
//! Every ecosystem is reached through the [`RegistryClient`] capability: one
//! asynchronous `lookup_versions` call returning the versions a registry
//! publishes for a package. Concrete clients share one [`HttpClient`] (per-host
//! rate limiting, timeouts, status mapping) and never retry; retry policy
//! belongs to the caller.
//!
//! # Example
//!
//! ```no_run
//! use gaia_config::GaiaConfig;
//! use gaia_core::Ecosystem;
//! use gaia_registry::{RegistryTable, ResponseCache};
//!
//! # async fn example() -> gaia_registry::Result<()> {
//! let config = GaiaConfig::default();
//! let table = RegistryTable::from_config(&config)?;
//! let cache = ResponseCache::from_config(&config);
//!
//! if let Some(npm) = table.client(Ecosystem::Npm) {
//!     let result = npm.lookup_versions("express".to_string()).await?;
//!     cache.put(Ecosystem::Npm, "express", result);
//! }
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod client;
pub mod error;
mod lookup;
pub mod maven;
pub mod npm;
pub mod nuget;
pub mod pypi;
mod table;

pub use cache::{CacheStats, DEFAULT_MAVEN_TTL, DEFAULT_TTL, ResponseCache};
pub use client::{HttpClient, HttpClientConfig, HttpClientStats, HttpResponse};
pub use error::{RegistryError, Result};
pub use lookup::{LookupFuture, RegistryClient, RegistryLookupResult, sort_versions_descending};
pub use maven::MavenCentralClient;
pub use npm::NpmRegistryClient;
pub use nuget::NugetClient;
pub use pypi::PypiClient;
pub use table::RegistryTable;
