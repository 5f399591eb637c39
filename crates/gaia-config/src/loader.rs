//! Configuration loader with hierarchical merging.

use crate::env::EnvConfig;
use crate::error::{ConfigError, Result};
use crate::types::{ConfigFile, GaiaConfig};
use crate::validate::validate;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Project configuration file name.
pub const PROJECT_CONFIG_FILE: &str = "gaia.json";

/// Global configuration file name.
pub const GLOBAL_CONFIG_FILE: &str = "config.json";

/// Configuration source in hierarchy order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConfigSource {
    /// Built-in defaults.
    Defaults = 0,
    /// User global configuration.
    Global = 1,
    /// Project-local configuration.
    Project = 2,
    /// Environment variables.
    Environment = 3,
}

impl ConfigSource {
    /// Get description for display.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Defaults => "built-in defaults",
            Self::Global => "global configuration",
            Self::Project => "project configuration",
            Self::Environment => "environment variables",
        }
    }
}

/// Configuration loader.
#[derive(Debug)]
pub struct ConfigLoader {
    /// Project directory.
    project_dir: PathBuf,
    /// Environment values, read once at construction.
    env_config: EnvConfig,
}

impl ConfigLoader {
    /// Create a loader reading the process environment.
    ///
    /// # Errors
    /// Returns error if an environment variable is malformed.
    pub fn new(project_dir: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self::with_env(project_dir, EnvConfig::from_env()?))
    }

    /// Create a loader with explicit environment values.
    #[must_use]
    pub fn with_env(project_dir: impl Into<PathBuf>, env_config: EnvConfig) -> Self {
        Self {
            project_dir: project_dir.into(),
            env_config,
        }
    }

    /// Get the global configuration path.
    ///
    /// `None` when neither `GAIA_HOME` nor a platform config directory exists.
    #[must_use]
    pub fn global_config_path(&self) -> Option<PathBuf> {
        self.env_config
            .home
            .clone()
            .or_else(|| {
                directories::ProjectDirs::from("dev", "gaia", "gaia")
                    .map(|dirs| dirs.config_dir().to_path_buf())
            })
            .map(|dir| dir.join(GLOBAL_CONFIG_FILE))
    }

    /// Get the project configuration path.
    #[must_use]
    pub fn project_config_path(&self) -> PathBuf {
        self.project_dir.join(PROJECT_CONFIG_FILE)
    }

    /// Load a configuration file; a missing file is `Ok(None)`.
    fn load_config_file(path: &Path) -> Result<Option<ConfigFile>> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(ConfigError::io(path, &e)),
        };
        sonic_rs::from_str(&content)
            .map(Some)
            .map_err(|e| ConfigError::json(path, &e))
    }

    /// Build resolved configuration by merging all sources.
    ///
    /// # Errors
    /// Returns error if a file is unreadable or malformed, or if the merged
    /// configuration fails validation.
    pub fn resolve(&self) -> Result<GaiaConfig> {
        self.resolve_with_sources().map(|(config, _)| config)
    }

    /// Like [`resolve`](Self::resolve), also reporting which layers applied.
    ///
    /// # Errors
    /// See [`resolve`](Self::resolve).
    pub fn resolve_with_sources(&self) -> Result<(GaiaConfig, Vec<ConfigSource>)> {
        let mut config = GaiaConfig::default();
        let mut sources = vec![ConfigSource::Defaults];

        // Layer 1: Global config
        if let Some(path) = self.global_config_path() {
            if let Some(global) = Self::load_config_file(&path)? {
                debug!(path = %path.display(), "applying global configuration");
                config.apply_file(&global);
                sources.push(ConfigSource::Global);
            }
        }

        // Layer 2: Project config
        let path = self.project_config_path();
        if let Some(project) = Self::load_config_file(&path)? {
            debug!(path = %path.display(), "applying project configuration");
            config.apply_file(&project);
            sources.push(ConfigSource::Project);
        }

        // Layer 3: Environment variables
        if self.env_config != EnvConfig::default() {
            self.env_config.apply_to(&mut config);
            sources.push(ConfigSource::Environment);
        }

        validate(&config)?;
        Ok((config, sources))
    }

    /// Get environment configuration.
    #[must_use]
    pub const fn env(&self) -> &EnvConfig {
        &self.env_config
    }

    /// Get project directory.
    #[must_use]
    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }
}
