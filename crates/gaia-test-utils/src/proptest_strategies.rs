//! Proptest strategies for Gaia types.

use gaia_core::{DependencyRequest, Ecosystem, Scope};
use proptest::prelude::*;

/// Strategy for lowercase package names.
pub fn package_name_strategy() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9-]{1,20}"
}

/// Strategy for release versions.
pub fn semver_strategy() -> impl Strategy<Value = String> {
    (0u64..20, 0u64..30, 0u64..50)
        .prop_map(|(major, minor, patch)| format!("{major}.{minor}.{patch}"))
}

/// Strategy for versions that may carry a pre-release qualifier.
pub fn version_strategy() -> impl Strategy<Value = String> {
    let prerelease = prop_oneof![
        Just("alpha".to_string()),
        Just("beta".to_string()),
        (1u32..10).prop_map(|n| format!("rc.{n}")),
        (1u32..20).prop_map(|n| format!("beta.{n}")),
    ];

    prop_oneof![
        4 => semver_strategy(),
        1 => (semver_strategy(), prerelease).prop_map(|(v, pre)| format!("{v}-{pre}")),
    ]
}

/// Strategy for well-formed constraint expressions.
pub fn constraint_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        semver_strategy(),
        semver_strategy().prop_map(|v| format!("^{v}")),
        semver_strategy().prop_map(|v| format!("~{v}")),
        semver_strategy().prop_map(|v| format!(">={v}")),
        (0u64..20).prop_map(|major| format!("{major}.x")),
        Just("latest".to_string()),
    ]
}

/// Strategy for a non-empty version listing.
pub fn version_list_strategy() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(version_strategy(), 1..15)
}

/// Strategy for ecosystems.
pub fn ecosystem_strategy() -> impl Strategy<Value = Ecosystem> {
    prop::sample::select(Ecosystem::ALL.to_vec())
}

/// Strategy for scopes.
pub fn scope_strategy() -> impl Strategy<Value = Scope> {
    prop::sample::select(vec![Scope::Compile, Scope::Runtime, Scope::Provided, Scope::Test])
}

/// Strategy for one request with a well-formed constraint.
pub fn request_strategy() -> impl Strategy<Value = DependencyRequest> {
    (
        ecosystem_strategy(),
        package_name_strategy(),
        constraint_strategy(),
        scope_strategy(),
    )
        .prop_map(|(ecosystem, name, constraint, scope)| {
            DependencyRequest::new(ecosystem, name, constraint).with_scope(scope)
        })
}

/// Strategy for request batches drawing names from a small pool, so that
/// duplicates and conflicts are common.
pub fn request_batch_strategy() -> impl Strategy<Value = Vec<DependencyRequest>> {
    let pooled = (
        prop::sample::select(vec![Ecosystem::Npm, Ecosystem::Maven]),
        prop::sample::select(vec!["alpha", "beta", "gamma", "delta", "epsilon"]),
        constraint_strategy(),
    )
        .prop_map(|(ecosystem, name, constraint)| {
            DependencyRequest::new(ecosystem, name, constraint)
        });
    prop::collection::vec(pooled, 0..24)
}
