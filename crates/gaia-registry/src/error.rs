//! Registry error types.

use gaia_core::{Ecosystem, ErrorCode};
use std::time::Duration;
use thiserror::Error;

/// Error returned by a registry lookup.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// The registry has no package by this name.
    #[error("package '{name}' not found in the {ecosystem} registry")]
    NotFound {
        /// Ecosystem that was queried.
        ecosystem: Ecosystem,
        /// Package name.
        name: String,
    },

    /// The request failed or the registry answered with an error status.
    #[error("network error for {url}: {message}")]
    Network {
        /// Request URL.
        url: String,
        /// Error message.
        message: String,
        /// HTTP status, when a response was received.
        status: Option<u16>,
    },

    /// The request exceeded the client timeout.
    #[error("request to {url} timed out after {timeout_secs}s")]
    Timeout {
        /// Request URL.
        url: String,
        /// Configured timeout.
        timeout_secs: u64,
    },

    /// The registry throttled the request.
    #[error("rate limited by {url}")]
    RateLimited {
        /// Request URL.
        url: String,
        /// Delay requested through `Retry-After`.
        retry_after: Option<Duration>,
    },

    /// The response body could not be decoded.
    #[error("invalid response from {url}: {message}")]
    InvalidResponse {
        /// Request URL.
        url: String,
        /// Decoder message.
        message: String,
    },

    /// A registry URL could not be built.
    #[error("invalid URL '{url}': {message}")]
    InvalidUrl {
        /// The offending URL.
        url: String,
        /// What is wrong with it.
        message: String,
    },

    /// The client could not be configured.
    #[error("invalid registry client configuration: {message}")]
    InvalidConfig {
        /// Error message.
        message: String,
    },
}

impl RegistryError {
    /// Check if the registry throttled the request.
    #[must_use]
    pub const fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }

    /// Check if the package does not exist.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if a later attempt could succeed.
    ///
    /// Throttling, timeouts, transport failures and 5xx responses are
    /// transient; 4xx responses and undecodable bodies are not.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited { .. } | Self::Timeout { .. } => true,
            Self::Network { status, .. } => match status {
                Some(code) => *code >= 500,
                None => true,
            },
            _ => false,
        }
    }

    /// The `Retry-After` hint carried by a rate-limit error.
    #[must_use]
    pub const fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// Attach package identity, turning a 404 response into [`Self::NotFound`].
    #[must_use]
    pub fn for_package(self, ecosystem: Ecosystem, name: &str) -> Self {
        match self {
            Self::Network {
                status: Some(404), ..
            } => Self::NotFound {
                ecosystem,
                name: name.to_string(),
            },
            other => other,
        }
    }

    /// Error code shared with resolution failures.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::NotFound { .. } => ErrorCode::E0101,
            Self::Network { .. } | Self::Timeout { .. } => ErrorCode::E0301,
            Self::RateLimited { .. } => ErrorCode::E0302,
            Self::InvalidResponse { .. } => ErrorCode::E0303,
            Self::InvalidUrl { .. } | Self::InvalidConfig { .. } => ErrorCode::E0501,
        }
    }
}

/// Result type for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;
