//! Errors that abort a whole `resolve` call.
//!
//! Per-dependency problems are never errors; they are recorded in the
//! [`ResolutionReport`](crate::ResolutionReport).

use gaia_core::{Ecosystem, ErrorCode};
use gaia_registry::RegistryError;
use thiserror::Error;

/// Resolver error type.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// A request names an ecosystem with no registered registry client.
    #[error("[{code}] unsupported ecosystem '{ecosystem}' requested for '{package}'", code = ErrorCode::E0403)]
    UnsupportedEcosystem {
        /// The ecosystem as requested.
        ecosystem: Ecosystem,
        /// First package that requested it.
        package: String,
    },

    /// The registry table could not be built.
    #[error("failed to set up registry clients: {source}")]
    Registry {
        /// Underlying registry error.
        #[from]
        source: RegistryError,
    },

    /// An unrecoverable fault inside the resolver.
    #[error("[{code}] internal resolver fault: {message}", code = ErrorCode::E0501)]
    Internal {
        /// What went wrong.
        message: String,
    },
}

impl ResolveError {
    /// Get the error code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::UnsupportedEcosystem { .. } => ErrorCode::E0403,
            Self::Registry { source } => source.code(),
            Self::Internal { .. } => ErrorCode::E0501,
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

/// Result type alias for resolver operations.
pub type Result<T, E = ResolveError> = std::result::Result<T, E>;
