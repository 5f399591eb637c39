//! Resolution report types.
//!
//! Every deduplicated request lands in exactly one bucket of a
//! [`ResolutionReport`]: `resolved`, `failures` or `conflicts`.

use gaia_core::{Ecosystem, ErrorCode, PackageKey, Scope};
use gaia_registry::RegistryError;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// A package mapped to one concrete version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedDependency {
    /// Ecosystem the version came from.
    pub ecosystem: Ecosystem,
    /// Package name as first declared.
    pub name: String,
    /// Selected version, exactly as the registry lists it.
    pub resolved_version: String,
    /// Constraint the version was selected against.
    pub requested_constraint: String,
    /// Widest scope among the requests for this package.
    pub scope: Scope,
    /// Other compatible constraints declared for the same package.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub superseded_constraints: Vec<String>,
}

impl ResolvedDependency {
    /// Deduplication key.
    #[must_use]
    pub fn key(&self) -> PackageKey {
        PackageKey::new(self.ecosystem, &self.name)
    }
}

/// Why a package could not be resolved.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureReason {
    /// A declared constraint is malformed.
    #[error("invalid constraint '{expression}': {reason}")]
    InvalidConstraint {
        /// The expression as written.
        expression: String,
        /// What is wrong with it.
        reason: String,
    },

    /// The registry has no such package.
    #[error("package not found")]
    NotFound,

    /// The registry could not be reached or answered badly.
    #[error("network error: {message}")]
    Network {
        /// Error message.
        message: String,
    },

    /// The registry kept throttling after the allowed retries.
    #[error("rate limited: {message}")]
    RateLimited {
        /// Error message.
        message: String,
    },

    /// The registry answered but no version satisfies the constraint.
    #[error("no version matching '{constraint}' among {available} available")]
    NoMatchingVersion {
        /// Constraint that was applied.
        constraint: String,
        /// Number of versions the registry listed.
        available: usize,
    },

    /// The lookup was still pending when the overall timeout elapsed.
    #[error("resolution timed out after {timeout_ms}ms")]
    ResolutionTimeout {
        /// The overall budget.
        timeout_ms: u64,
    },
}

impl FailureReason {
    /// Get the error code for this failure.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidConstraint { .. } => ErrorCode::E0401,
            Self::NotFound => ErrorCode::E0101,
            Self::Network { .. } => ErrorCode::E0301,
            Self::RateLimited { .. } => ErrorCode::E0302,
            Self::NoMatchingVersion { .. } => ErrorCode::E0102,
            Self::ResolutionTimeout { .. } => ErrorCode::E0202,
        }
    }

    /// Check if this failure came from the overall timeout.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::ResolutionTimeout { .. })
    }
}

impl From<&RegistryError> for FailureReason {
    fn from(err: &RegistryError) -> Self {
        match err {
            RegistryError::NotFound { .. } => Self::NotFound,
            RegistryError::RateLimited { .. } => Self::RateLimited {
                message: err.to_string(),
            },
            RegistryError::Network { .. }
            | RegistryError::Timeout { .. }
            | RegistryError::InvalidResponse { .. }
            | RegistryError::InvalidUrl { .. }
            | RegistryError::InvalidConfig { .. } => Self::Network {
                message: err.to_string(),
            },
        }
    }
}

/// A package that could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionFailure {
    /// Package key.
    pub key: PackageKey,
    /// What went wrong.
    pub reason: FailureReason,
}

/// A package whose declared constraints cannot be satisfied together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyConflict {
    /// Package key.
    pub key: PackageKey,
    /// The distinct constraints, in declaration order.
    pub constraints: Vec<String>,
}

/// Outcome of one or more `resolve` calls.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ReportData")]
pub struct ResolutionReport {
    resolved: Vec<ResolvedDependency>,
    failures: Vec<ResolutionFailure>,
    conflicts: Vec<DependencyConflict>,
    #[serde(skip)]
    index: HashMap<PackageKey, usize>,
}

/// Serialized form; the key index is rebuilt on load.
#[derive(Deserialize)]
struct ReportData {
    #[serde(default)]
    resolved: Vec<ResolvedDependency>,
    #[serde(default)]
    failures: Vec<ResolutionFailure>,
    #[serde(default)]
    conflicts: Vec<DependencyConflict>,
}

impl From<ReportData> for ResolutionReport {
    fn from(data: ReportData) -> Self {
        let mut report = Self {
            failures: data.failures,
            conflicts: data.conflicts,
            ..Self::default()
        };
        for dependency in data.resolved {
            report.push_resolved(dependency);
        }
        report
    }
}

impl ResolutionReport {
    /// Create an empty report.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a resolved dependency. An entry with the same key is replaced
    /// in place, keeping its position.
    pub(crate) fn push_resolved(&mut self, dependency: ResolvedDependency) {
        let key = dependency.key();
        if let Some(existing) = self
            .index
            .get(&key)
            .and_then(|&slot| self.resolved.get_mut(slot))
        {
            *existing = dependency;
            return;
        }
        self.index.insert(key, self.resolved.len());
        self.resolved.push(dependency);
    }

    pub(crate) fn push_failure(&mut self, key: PackageKey, reason: FailureReason) {
        self.failures.push(ResolutionFailure { key, reason });
    }

    pub(crate) fn push_conflict(&mut self, key: PackageKey, constraints: Vec<String>) {
        self.conflicts.push(DependencyConflict { key, constraints });
    }

    /// Combine with a later report.
    ///
    /// Resolved entries are unioned by key and `later` wins on collision.
    /// Failures and conflicts are concatenated.
    #[must_use]
    pub fn merge(mut self, later: Self) -> Self {
        for dependency in later.resolved {
            self.push_resolved(dependency);
        }
        self.failures.extend(later.failures);
        self.conflicts.extend(later.conflicts);
        self
    }

    /// Resolved dependencies in deduplicated-request order.
    #[must_use]
    pub fn resolved(&self) -> &[ResolvedDependency] {
        &self.resolved
    }

    /// Packages that could not be resolved.
    #[must_use]
    pub fn failures(&self) -> &[ResolutionFailure] {
        &self.failures
    }

    /// Packages with incompatible constraints.
    #[must_use]
    pub fn conflicts(&self) -> &[DependencyConflict] {
        &self.conflicts
    }

    /// Look up a resolved dependency. The name is normalised for the ecosystem.
    #[must_use]
    pub fn get(&self, ecosystem: Ecosystem, name: &str) -> Option<&ResolvedDependency> {
        self.index
            .get(&PackageKey::new(ecosystem, name))
            .and_then(|&slot| self.resolved.get(slot))
    }

    /// Resolved version of a package.
    #[must_use]
    pub fn version_of(&self, ecosystem: Ecosystem, name: &str) -> Option<&str> {
        self.get(ecosystem, name)
            .map(|dependency| dependency.resolved_version.as_str())
    }

    /// Most recent failure recorded for a package.
    #[must_use]
    pub fn failure_for(&self, ecosystem: Ecosystem, name: &str) -> Option<&ResolutionFailure> {
        let key = PackageKey::new(ecosystem, name);
        self.failures.iter().rev().find(|failure| failure.key == key)
    }

    /// Most recent conflict recorded for a package.
    #[must_use]
    pub fn conflict_for(&self, ecosystem: Ecosystem, name: &str) -> Option<&DependencyConflict> {
        let key = PackageKey::new(ecosystem, name);
        self.conflicts.iter().rev().find(|conflict| conflict.key == key)
    }

    /// True when nothing failed and nothing conflicted.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty() && self.conflicts.is_empty()
    }

    /// `(name, version)` pairs for one scope, in report order.
    pub fn by_scope(&self, scope: Scope) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.resolved
            .iter()
            .filter(move |dependency| dependency.scope == scope)
            .map(|dependency| (dependency.name.as_str(), dependency.resolved_version.as_str()))
    }

    /// Number of resolved dependencies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.resolved.len()
    }

    /// True when the report holds no entries at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resolved.is_empty() && self.failures.is_empty() && self.conflicts.is_empty()
    }

    /// Distinct package keys across all three buckets.
    #[must_use]
    pub fn unique_keys(&self) -> usize {
        self.resolved
            .iter()
            .map(ResolvedDependency::key)
            .chain(self.failures.iter().map(|failure| failure.key.clone()))
            .chain(self.conflicts.iter().map(|conflict| conflict.key.clone()))
            .collect::<HashSet<_>>()
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    fn resolved(ecosystem: Ecosystem, name: &str, version: &str) -> ResolvedDependency {
        ResolvedDependency {
            ecosystem,
            name: name.to_string(),
            resolved_version: version.to_string(),
            requested_constraint: "latest".to_string(),
            scope: Scope::Compile,
            superseded_constraints: Vec::new(),
        }
    }

    // ========== Accessors ==========

    #[test]
    fn test_get_normalises_name() {
        let mut report = ResolutionReport::new();
        report.push_resolved(resolved(Ecosystem::PyPi, "Flask_SQLAlchemy", "3.1.1"));

        assert_eq!(report.version_of(Ecosystem::PyPi, "flask-sqlalchemy"), Some("3.1.1"));
        assert!(report.get(Ecosystem::Npm, "flask-sqlalchemy").is_none());
    }

    #[test]
    fn test_by_scope() {
        let mut report = ResolutionReport::new();
        report.push_resolved(resolved(Ecosystem::Npm, "express", "4.18.2"));
        let mut jest = resolved(Ecosystem::Npm, "jest", "29.7.0");
        jest.scope = Scope::Test;
        report.push_resolved(jest);

        let compile: Vec<_> = report.by_scope(Scope::Compile).collect();
        assert_eq!(compile, vec![("express", "4.18.2")]);
        let test: Vec<_> = report.by_scope(Scope::Test).collect();
        assert_eq!(test, vec![("jest", "29.7.0")]);
    }

    #[test]
    fn test_unique_keys_and_completeness() {
        let mut report = ResolutionReport::new();
        assert!(report.is_empty());
        assert!(report.is_complete());

        report.push_resolved(resolved(Ecosystem::Npm, "express", "4.18.2"));
        report.push_failure(PackageKey::new(Ecosystem::Npm, "ghost"), FailureReason::NotFound);
        report.push_conflict(
            PackageKey::new(Ecosystem::Maven, "lib-x"),
            vec!["1.0.0".into(), "^2.0.0".into()],
        );

        assert_eq!(report.len(), 1);
        assert_eq!(report.unique_keys(), 3);
        assert!(!report.is_complete());
        assert_eq!(
            report.failure_for(Ecosystem::Npm, "GHOST").map(|f| &f.reason),
            Some(&FailureReason::NotFound)
        );
        assert!(report.conflict_for(Ecosystem::Maven, "lib-x").is_some());
    }

    // ========== Merge ==========

    #[test]
    fn test_merge_later_wins_in_place() {
        let mut first = ResolutionReport::new();
        first.push_resolved(resolved(Ecosystem::Npm, "express", "4.17.0"));
        first.push_resolved(resolved(Ecosystem::Npm, "lodash", "4.17.21"));
        first.push_failure(PackageKey::new(Ecosystem::Npm, "ghost"), FailureReason::NotFound);

        let mut later = ResolutionReport::new();
        later.push_resolved(resolved(Ecosystem::Npm, "express", "4.18.2"));
        later.push_resolved(resolved(Ecosystem::Npm, "jest", "29.7.0"));
        later.push_failure(PackageKey::new(Ecosystem::Npm, "ghost"), FailureReason::NotFound);

        let merged = first.merge(later);
        let names: Vec<_> = merged.resolved().iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["express", "lodash", "jest"]);
        assert_eq!(merged.version_of(Ecosystem::Npm, "express"), Some("4.18.2"));
        assert_eq!(merged.failures().len(), 2);
    }

    #[test]
    fn test_merge_with_empty_is_identity() {
        let mut report = ResolutionReport::new();
        report.push_resolved(resolved(Ecosystem::Maven, "junit:junit", "4.13.2"));
        let merged = report.clone().merge(ResolutionReport::new());
        assert_eq!(merged, report);
    }

    // ========== Failure reasons ==========

    #[test_case(FailureReason::NotFound, ErrorCode::E0101 ; "not found")]
    #[test_case(FailureReason::Network { message: "x".into() }, ErrorCode::E0301 ; "network")]
    #[test_case(FailureReason::RateLimited { message: "x".into() }, ErrorCode::E0302 ; "rate limited")]
    #[test_case(FailureReason::ResolutionTimeout { timeout_ms: 1 }, ErrorCode::E0202 ; "timeout")]
    #[test_case(
        FailureReason::NoMatchingVersion { constraint: "^9".into(), available: 3 },
        ErrorCode::E0102 ; "no match"
    )]
    fn test_failure_codes(reason: FailureReason, code: ErrorCode) {
        assert_eq!(reason.code(), code);
    }

    #[test]
    fn test_registry_errors_map_to_reasons() {
        let timeout = RegistryError::Timeout {
            url: "https://registry.npmjs.org/express".into(),
            timeout_secs: 10,
        };
        assert!(matches!(FailureReason::from(&timeout), FailureReason::Network { .. }));

        let decode = RegistryError::InvalidResponse {
            url: "https://pypi.org/pypi/flask/json".into(),
            message: "expected object".into(),
        };
        assert!(matches!(FailureReason::from(&decode), FailureReason::Network { .. }));

        let throttled = RegistryError::RateLimited {
            url: "https://search.maven.org".into(),
            retry_after: None,
        };
        assert!(matches!(
            FailureReason::from(&throttled),
            FailureReason::RateLimited { .. }
        ));

        let missing = RegistryError::NotFound {
            ecosystem: Ecosystem::NuGet,
            name: "nope".into(),
        };
        assert_eq!(FailureReason::from(&missing), FailureReason::NotFound);
    }

    // ========== Serialization ==========

    #[test]
    fn test_serde_rebuilds_index() {
        let mut report = ResolutionReport::new();
        report.push_resolved(resolved(Ecosystem::Npm, "express", "4.18.2"));
        report.push_failure(
            PackageKey::new(Ecosystem::Npm, "ghost"),
            FailureReason::NoMatchingVersion {
                constraint: "^9.0.0".into(),
                available: 2,
            },
        );

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["resolved"][0]["resolved_version"], "4.18.2");
        assert_eq!(json["failures"][0]["reason"]["kind"], "no_matching_version");
        assert!(json.get("index").is_none());

        let restored: ResolutionReport = serde_json::from_value(json).unwrap();
        assert_eq!(restored.version_of(Ecosystem::Npm, "express"), Some("4.18.2"));
        assert_eq!(restored, report);
    }
}
