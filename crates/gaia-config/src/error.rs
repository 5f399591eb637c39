//! Error types for configuration management.

// False positive warnings from thiserror macro expansion
#![allow(unused_assignments)]

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Configuration error type with rich diagnostics.
#[derive(Error, Debug, Diagnostic)]
pub enum ConfigError {
    /// Invalid JSON syntax.
    #[error("invalid JSON in {path}: {message}")]
    #[diagnostic(
        code(config::invalid_json),
        help("check JSON syntax at line {line}, column {column}")
    )]
    InvalidJson {
        /// File path.
        path: PathBuf,
        /// Error message.
        message: String,
        /// Line number (1-indexed).
        line: usize,
        /// Column number (1-indexed).
        column: usize,
    },

    /// Invalid field value.
    #[error("invalid value for '{field}': {message}")]
    #[diagnostic(code(config::invalid_value), help("{hint}"))]
    InvalidValue {
        /// Field name.
        field: String,
        /// Error message.
        message: String,
        /// Help hint.
        hint: String,
    },

    /// Value out of range.
    #[error("value for '{field}' out of range: {value} (must be {min}..{max})")]
    #[diagnostic(code(config::out_of_range))]
    OutOfRange {
        /// Field name.
        field: String,
        /// Provided value.
        value: String,
        /// Minimum value.
        min: String,
        /// Maximum value.
        max: String,
    },

    /// Invalid URL.
    #[error("invalid URL for '{field}': {url}")]
    #[diagnostic(
        code(config::invalid_url),
        help("provide a valid URL starting with http:// or https://")
    )]
    InvalidUrl {
        /// Field name.
        field: String,
        /// Invalid URL.
        url: String,
    },

    /// IO error.
    #[error("IO error at {path}: {message}")]
    #[diagnostic(code(config::io_error))]
    Io {
        /// File path.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// Permission denied.
    #[error("permission denied: {path}")]
    #[diagnostic(code(config::permission_denied), help("check file permissions"))]
    PermissionDenied {
        /// File path.
        path: PathBuf,
    },

    /// Environment variable error.
    #[error("invalid environment variable {var}: {message}")]
    #[diagnostic(code(config::env_error))]
    EnvError {
        /// Variable name.
        var: String,
        /// Error message.
        message: String,
    },

    /// Validation error with multiple issues.
    #[error("configuration validation failed with {count} error(s)")]
    #[diagnostic(code(config::validation_failed))]
    ValidationFailed {
        /// Number of errors.
        count: usize,
        /// Individual errors.
        errors: Vec<String>,
    },
}

impl ConfigError {
    /// Create an IO error with context.
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, err: &std::io::Error) -> Self {
        let path = path.into();
        if err.kind() == std::io::ErrorKind::PermissionDenied {
            return Self::PermissionDenied { path };
        }
        Self::Io {
            path,
            message: err.to_string(),
        }
    }

    /// Create a JSON parse error with location.
    #[must_use]
    pub fn json(path: impl Into<PathBuf>, err: &sonic_rs::Error) -> Self {
        Self::InvalidJson {
            path: path.into(),
            message: err.to_string(),
            line: err.line(),
            column: err.column(),
        }
    }

    /// Create an invalid value error.
    #[must_use]
    pub fn invalid_value(
        field: impl Into<String>,
        message: impl Into<String>,
        hint: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            field: field.into(),
            message: message.into(),
            hint: hint.into(),
        }
    }

    /// Create an out of range error.
    #[must_use]
    pub fn out_of_range<T: std::fmt::Display>(
        field: impl Into<String>,
        value: T,
        min: T,
        max: T,
    ) -> Self {
        Self::OutOfRange {
            field: field.into(),
            value: value.to_string(),
            min: min.to_string(),
            max: max.to_string(),
        }
    }

    /// Create an environment variable error.
    #[must_use]
    pub fn env(var: impl Into<String>, message: impl Into<String>) -> Self {
        Self::EnvError {
            var: var.into(),
            message: message.into(),
        }
    }

    /// Check if error is a permission error.
    #[must_use]
    pub const fn is_permission_denied(&self) -> bool {
        matches!(self, Self::PermissionDenied { .. })
    }
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;
    use miette::Diagnostic;

    #[test]
    fn test_io_permission_denied() {
        let err = std::io::Error::from(std::io::ErrorKind::PermissionDenied);
        assert!(ConfigError::io("/etc/gaia/config.json", &err).is_permission_denied());

        let err = std::io::Error::other("disk on fire");
        assert!(matches!(
            ConfigError::io("/tmp/gaia.json", &err),
            ConfigError::Io { .. }
        ));
    }

    #[test]
    fn test_out_of_range_message() {
        let err = ConfigError::out_of_range("resolver.timeout-secs", 0, 1, 3600);
        assert_eq!(
            err.to_string(),
            "value for 'resolver.timeout-secs' out of range: 0 (must be 1..3600)"
        );
    }

    #[test]
    fn test_diagnostic_codes() {
        let err = ConfigError::env("GAIA_HTTP_TIMEOUT", "expected an integer");
        let code = err.code().map(|c| c.to_string());
        assert_eq!(code.as_deref(), Some("config::env_error"));
    }
}
