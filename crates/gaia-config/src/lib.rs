//! Layered configuration for Gaia.
//!
//! Settings are merged from, lowest to highest priority:
//!
//! 1. Built-in defaults
//! 2. The global file (`$GAIA_HOME/config.json` or the platform config dir)
//! 3. The project file (`./gaia.json`)
//! 4. `GAIA_*` environment variables
//!
//! The merged result is validated before it is returned.

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod env;
pub mod error;
pub mod loader;
pub mod types;
pub mod validate;

pub use env::{EnvConfig, GaiaEnvVar};
pub use error::{ConfigError, Result};
pub use loader::{ConfigLoader, ConfigSource};
pub use types::{
    CacheSettings, ConfigFile, DEFAULT_USER_AGENT, GaiaConfig, HttpSettings, RegistryEndpoint,
    RegistrySettings, ResolverSettings,
};
pub use validate::validate;
