//! Testing utilities for Gaia.
//!
//! # Modules
//!
//! - [`fakes`]: In-memory [`RegistryClient`](gaia_registry::RegistryClient) doubles
//! - [`fixtures`]: Registry payloads and request batches
//! - [`mock_server`]: Wiremock-backed registries speaking the real wire formats
//! - [`proptest_strategies`]: Proptest strategies for Gaia types
//!
//! # Example
//!
//! ```rust,no_run
//! use gaia_test_utils::prelude::*;
//!
//! #[tokio::test]
//! async fn resolves_from_mock_registry() {
//!     init_test_tracing();
//!     let npm = MockNpmRegistry::start().await;
//!     npm.register_package("express", &["4.18.2", "4.17.0"]).await;
//!     // Point an NpmRegistryClient at npm.url()
//! }
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod fakes;
pub mod fixtures;
pub mod mock_server;
pub mod proptest_strategies;

use std::sync::Once;
use tracing_subscriber::EnvFilter;

/// Install a test-friendly tracing subscriber once per process.
///
/// Honours `RUST_LOG` and defaults to `warn`. Output goes through the test
/// writer so it is captured per test.
pub fn init_test_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

/// Re-export commonly used testing utilities.
pub mod prelude {
    pub use crate::fakes::{Behavior, FakeRegistry};
    pub use crate::fixtures::Fixtures;
    pub use crate::init_test_tracing;
    pub use crate::mock_server::{MockMavenCentral, MockNpmRegistry, MockNuget, MockPypi};

    pub use proptest::prelude::*;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_tracing_is_idempotent() {
        init_test_tracing();
        init_test_tracing();
        tracing::warn!("still alive");
    }
}
