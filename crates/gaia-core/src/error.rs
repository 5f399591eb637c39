//! Error types for Gaia operations.
//!
//! Each error has:
//! - A unique error code (e.g., E0401) for easy reference and searching
//! - A clear error message explaining what went wrong
//! - Suggestions for how to fix the issue

use std::fmt;
use thiserror::Error;

/// Error codes for Gaia errors.
///
/// Codes are shared by hard errors and by the per-dependency failures the
/// resolver records, so a reported failure can be searched the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Package errors (E01xx)
    /// Package not found in the registry
    E0101,
    /// No available version satisfies the constraint
    E0102,

    // Resolution errors (E02xx)
    /// Conflicting version requirements
    E0201,
    /// Resolution timed out
    E0202,

    // Network errors (E03xx)
    /// Network request failed
    E0301,
    /// Rate limited by registry
    E0302,
    /// Registry returned an undecodable response
    E0303,

    // Input errors (E04xx)
    /// Invalid version constraint
    E0401,
    /// Invalid version string
    E0402,
    /// Unsupported ecosystem
    E0403,

    // Internal errors (E05xx)
    /// Internal fault
    E0501,
}

impl ErrorCode {
    /// Get the string representation of the error code.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::E0101 => "E0101",
            Self::E0102 => "E0102",
            Self::E0201 => "E0201",
            Self::E0202 => "E0202",
            Self::E0301 => "E0301",
            Self::E0302 => "E0302",
            Self::E0303 => "E0303",
            Self::E0401 => "E0401",
            Self::E0402 => "E0402",
            Self::E0403 => "E0403",
            Self::E0501 => "E0501",
        }
    }

    /// Get a short title for the error code.
    #[must_use]
    pub const fn title(&self) -> &'static str {
        match self {
            Self::E0101 => "Package not found",
            Self::E0102 => "No matching version",
            Self::E0201 => "Conflicting constraints",
            Self::E0202 => "Resolution timeout",
            Self::E0301 => "Network error",
            Self::E0302 => "Rate limited",
            Self::E0303 => "Invalid registry response",
            Self::E0401 => "Invalid version constraint",
            Self::E0402 => "Invalid version",
            Self::E0403 => "Unsupported ecosystem",
            Self::E0501 => "Internal error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Main error type for the core crate.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Malformed version constraint.
    #[error("[{code}] invalid version constraint '{expression}': {reason}")]
    InvalidConstraint {
        /// Error code.
        code: ErrorCode,
        /// The expression as written.
        expression: String,
        /// What is wrong with it.
        reason: String,
        /// Suggestions for fixing.
        suggestions: Vec<String>,
    },

    /// Malformed version string.
    #[error("[{code}] invalid version '{version}': {reason}")]
    InvalidVersion {
        /// Error code.
        code: ErrorCode,
        /// The version as written.
        version: String,
        /// What is wrong with it.
        reason: String,
    },

    /// Ecosystem tag that no registry handles.
    #[error("[{code}] unsupported ecosystem '{tag}'")]
    UnsupportedEcosystem {
        /// Error code.
        code: ErrorCode,
        /// The tag as written.
        tag: String,
        /// Suggestions for fixing.
        suggestions: Vec<String>,
    },
}

impl Error {
    /// Get the error code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidConstraint { code, .. }
            | Self::InvalidVersion { code, .. }
            | Self::UnsupportedEcosystem { code, .. } => *code,
        }
    }

    /// Get suggestions for fixing this error.
    #[must_use]
    pub fn suggestions(&self) -> &[String] {
        match self {
            Self::InvalidConstraint { suggestions, .. }
            | Self::UnsupportedEcosystem { suggestions, .. } => suggestions,
            Self::InvalidVersion { .. } => &[],
        }
    }

    /// Create an invalid constraint error with suggestions.
    #[must_use]
    pub fn invalid_constraint(expression: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConstraint {
            code: ErrorCode::E0401,
            expression: expression.into(),
            reason: reason.into(),
            suggestions: vec![
                "Use an exact version (1.2.3), a caret (^1.2.3) or tilde (~1.2.3) range".to_string(),
                "Comparators (>=1.0 <2.0) and Maven intervals ([1.0,2.0)) are also accepted"
                    .to_string(),
                "Use 'latest' to select the newest release".to_string(),
            ],
        }
    }

    /// Create an invalid version error.
    #[must_use]
    pub fn invalid_version(version: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidVersion {
            code: ErrorCode::E0402,
            version: version.into(),
            reason: reason.into(),
        }
    }

    /// Create an unsupported ecosystem error.
    #[must_use]
    pub fn unsupported_ecosystem(tag: impl Into<String>) -> Self {
        Self::UnsupportedEcosystem {
            code: ErrorCode::E0403,
            tag: tag.into(),
            suggestions: vec![
                "Supported ecosystems: maven (alias gradle), npm, pypi, nuget".to_string(),
            ],
        }
    }

    /// Check if this error was caused by caller input rather than the environment.
    #[must_use]
    pub const fn is_input_error(&self) -> bool {
        matches!(
            self.code(),
            ErrorCode::E0401 | ErrorCode::E0402 | ErrorCode::E0403
        )
    }
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, Error>;
