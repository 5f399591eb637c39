//! Concurrent dependency resolution for Gaia.
//!
//! [`DependencyResolverService`] takes a batch of
//! [`DependencyRequest`](gaia_core::DependencyRequest)s across ecosystems,
//! deduplicates them by package, looks up the versions each registry
//! publishes (consulting the [`ResponseCache`](gaia_registry::ResponseCache)
//! first) and selects the best match for every package.
//!
//! Failures are data. Every deduplicated request ends up in exactly one of
//! the report's `resolved`, `failures` or `conflicts` buckets; only an
//! unsupported ecosystem or an internal fault aborts a call.
//!
//! # Example
//!
//! ```no_run
//! use gaia_config::GaiaConfig;
//! use gaia_core::{DependencyRequest, Ecosystem, Scope};
//! use gaia_resolver::DependencyResolverService;
//!
//! # async fn example() -> gaia_resolver::Result<()> {
//! let resolver = DependencyResolverService::from_config(&GaiaConfig::default())?;
//! let report = resolver
//!     .resolve(&[
//!         DependencyRequest::npm("express", "^4.18.0"),
//!         DependencyRequest::maven("org.springframework.boot:spring-boot-starter", "3.2.0"),
//!     ])
//!     .await?;
//!
//! for (name, version) in report.by_scope(Scope::Compile) {
//!     println!("{name} = {version}");
//! }
//! if let Some(failure) = report.failure_for(Ecosystem::Npm, "express") {
//!     eprintln!("{}: {}", failure.reason.code(), failure.reason);
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
mod plan;
pub mod report;
mod service;
pub mod stats;

pub use config::ResolverConfig;
pub use error::{ResolveError, Result};
pub use report::{
    DependencyConflict, FailureReason, ResolutionFailure, ResolutionReport, ResolvedDependency,
};
pub use service::DependencyResolverService;
pub use stats::{ResolverStats, StatsSnapshot};
