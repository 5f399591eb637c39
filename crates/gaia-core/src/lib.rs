//! Core types for Gaia dependency resolution.
//!
//! This crate provides the foundational, I/O-free pieces shared by the
//! registry clients and the resolver:
//! - Ecosystems, scopes and dependency requests
//! - Tolerant version parsing and ordering across ecosystems
//! - Version constraint parsing, matching and best-version selection
//! - Error types with stable error codes

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

mod constraint;
pub mod error;
mod package;
mod version;

pub use constraint::{ConstraintKind, VersionConstraint};
pub use error::{Error, ErrorCode, Result};
pub use package::{DependencyRequest, Ecosystem, PackageKey, Scope};
pub use version::{PreReleaseId, Version};

// Re-export so downstream crates share one `Ranges` type.
pub use version_ranges::Ranges;
