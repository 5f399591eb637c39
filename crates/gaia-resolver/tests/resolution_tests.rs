//! Resolution behaviour against in-memory registries.
//!
//! These tests drive `DependencyResolverService` end to end through scripted
//! `FakeRegistry` clients, so call counts and timing are exact.

use gaia_core::{DependencyRequest, Ecosystem, ErrorCode, PackageKey, Scope};
use gaia_registry::ResponseCache;
use gaia_resolver::{
    DependencyResolverService, FailureReason, ResolutionReport, ResolveError, ResolverConfig,
};
use gaia_test_utils::prelude::*;
use gaia_test_utils::proptest_strategies::request_batch_strategy;
use rstest::rstest;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

/// Resolver over the given fakes with a fresh cache.
fn resolver(fakes: &[Arc<FakeRegistry>]) -> DependencyResolverService {
    resolver_with(fakes, ResolverConfig::default())
}

fn resolver_with(fakes: &[Arc<FakeRegistry>], config: ResolverConfig) -> DependencyResolverService {
    init_test_tracing();
    DependencyResolverService::new(Fixtures::table(fakes), Arc::new(ResponseCache::new()), config)
}

/// `(name, version)` pairs in report order.
fn resolved_pairs(report: &ResolutionReport) -> Vec<(String, String)> {
    report
        .resolved()
        .iter()
        .map(|d| (d.name.clone(), d.resolved_version.clone()))
        .collect()
}

fn reason<'a>(report: &'a ResolutionReport, ecosystem: Ecosystem, name: &str) -> &'a FailureReason {
    &report
        .failure_for(ecosystem, name)
        .unwrap_or_else(|| panic!("no failure recorded for {name}"))
        .reason
}

// ========== End-to-End Tests ==========

mod end_to_end {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_three_package_batch() {
        let (npm, maven) = Fixtures::e2e_registries();
        let resolver = resolver(&[npm, maven]);

        let report = resolver.resolve(&Fixtures::e2e_requests()).await.unwrap();

        assert_eq!(
            resolved_pairs(&report),
            vec![
                ("express".to_string(), "4.18.2".to_string()),
                ("lodash".to_string(), "4.17.21".to_string()),
                ("spring-boot-starter".to_string(), "3.2.0".to_string()),
            ]
        );
        assert!(report.failures().is_empty());
        assert!(report.conflicts().is_empty());
        assert!(report.is_complete());
    }

    #[tokio::test]
    async fn test_resolved_entries_carry_request_details() {
        let (npm, maven) = Fixtures::e2e_registries();
        let resolver = resolver(&[npm, maven]);

        let report = resolver.resolve(&Fixtures::e2e_requests()).await.unwrap();

        let express = report.get(Ecosystem::Npm, "express").unwrap();
        assert_eq!(express.requested_constraint, "^4.18.0");
        assert_eq!(express.scope, Scope::Compile);
        assert!(express.superseded_constraints.is_empty());

        let starter = report.get(Ecosystem::Maven, "spring-boot-starter").unwrap();
        assert_eq!(starter.ecosystem, Ecosystem::Maven);
        assert_eq!(starter.requested_constraint, "3.2.0");
    }

    #[tokio::test]
    async fn test_report_order_follows_requests_not_completion() {
        // The first request is the slowest to answer
        let slow = Arc::new(
            FakeRegistry::new(Ecosystem::Maven)
                .with_versions("org.slf4j:slf4j-api", &["2.0.9"])
                .with_latency(Duration::from_millis(50)),
        );
        let fast = Arc::new(
            FakeRegistry::new(Ecosystem::Npm)
                .with_versions("react", &["18.2.0"])
                .with_versions("vite", &["5.0.0"]),
        );
        let resolver = resolver(&[slow, fast]);

        let report = resolver
            .resolve(&[
                DependencyRequest::maven("org.slf4j:slf4j-api", "latest"),
                DependencyRequest::npm("react", "^18.0.0"),
                DependencyRequest::npm("vite", "^5.0.0").with_scope(Scope::Test),
            ])
            .await
            .unwrap();

        let names: Vec<_> = report.resolved().iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["org.slf4j:slf4j-api", "react", "vite"]);
        let test_deps: Vec<_> = report.by_scope(Scope::Test).collect();
        assert_eq!(test_deps, vec![("vite", "5.0.0")]);
    }

    #[tokio::test]
    async fn test_maven_classifier_versions_resolve() {
        let maven = Arc::new(FakeRegistry::new(Ecosystem::Maven).with_versions(
            "com.google.guava:guava",
            &["33.0.0-rc1-jre", "32.1.3-android", "32.1.3-jre", "32.1.2-jre", "31.1-jre"],
        ));
        let resolver = resolver(&[maven]);

        let report = resolver
            .resolve(&[DependencyRequest::maven("com.google.guava:guava", "[32.0,33.0)")])
            .await
            .unwrap();

        assert_eq!(
            report.version_of(Ecosystem::Maven, "com.google.guava:guava"),
            Some("32.1.3-jre")
        );
        assert!(report.is_complete());
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let resolver = resolver(&[]);
        let report = resolver.resolve(&[]).await.unwrap();
        assert!(report.is_empty());
        assert!(report.is_complete());
    }
}

// ========== Deduplication & Conflict Tests ==========

mod conflicts {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_incompatible_constraints_conflict() {
        let maven =
            Arc::new(FakeRegistry::new(Ecosystem::Maven).with_versions("lib-x", &["2.1.0", "1.0.0"]));
        let resolver = resolver(&[Arc::clone(&maven)]);

        let report = resolver
            .resolve(&[
                DependencyRequest::maven("lib-x", "1.0.0"),
                DependencyRequest::maven("lib-x", "^2.0.0"),
            ])
            .await
            .unwrap();

        let conflict = report.conflict_for(Ecosystem::Maven, "lib-x").unwrap();
        assert_eq!(conflict.key, PackageKey::new(Ecosystem::Maven, "lib-x"));
        assert_eq!(conflict.constraints, vec!["1.0.0", "^2.0.0"]);
        assert!(report.get(Ecosystem::Maven, "lib-x").is_none());
        assert!(report.failures().is_empty());
        assert_eq!(report.unique_keys(), 1);
        assert_eq!(maven.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_compatible_constraints_resolve_to_narrower() {
        let npm = Arc::new(
            FakeRegistry::new(Ecosystem::Npm).with_versions("express", &["4.19.2", "4.18.3", "4.17.0"]),
        );
        let resolver = resolver(&[npm]);

        let report = resolver
            .resolve(&[
                DependencyRequest::npm("express", "^4.17.0").with_scope(Scope::Test),
                DependencyRequest::npm("express", "~4.18.0"),
            ])
            .await
            .unwrap();

        let express = report.get(Ecosystem::Npm, "express").unwrap();
        assert_eq!(express.resolved_version, "4.18.3");
        assert_eq!(express.requested_constraint, "~4.18.0");
        assert_eq!(express.superseded_constraints, vec!["^4.17.0"]);
        assert_eq!(express.scope, Scope::Compile);
        assert!(report.conflicts().is_empty());
    }

    #[tokio::test]
    async fn test_no_common_published_version_is_conflict() {
        let npm = Arc::new(FakeRegistry::new(Ecosystem::Npm).with_versions("lib", &["2.0.0", "1.2.0"]));
        let resolver = resolver(&[npm]);

        let report = resolver
            .resolve(&[
                DependencyRequest::npm("lib", "^1.0.0"),
                DependencyRequest::npm("lib", ">=1.5.0"),
            ])
            .await
            .unwrap();

        assert_eq!(
            report.conflict_for(Ecosystem::Npm, "lib").unwrap().constraints,
            vec!["^1.0.0", ">=1.5.0"]
        );
        assert!(report.failure_for(Ecosystem::Npm, "lib").is_none());
    }

    #[tokio::test]
    async fn test_identical_duplicates_are_not_conflicts() {
        let (npm, maven) = Fixtures::e2e_registries();
        let resolver = resolver(&[Arc::clone(&npm), maven]);

        let mut requests = Fixtures::e2e_requests();
        requests.extend(Fixtures::e2e_requests());
        let report = resolver.resolve(&requests).await.unwrap();

        assert_eq!(report.len(), 3);
        assert!(report.is_complete());
        assert_eq!(npm.calls("express"), 1);
    }
}

// ========== Failure Tests ==========

mod failures {
    use super::*;
    use pretty_assertions::assert_eq;

    #[rstest]
    #[case::not_found(Behavior::NotFound, ErrorCode::E0101)]
    #[case::network(Behavior::NetworkError, ErrorCode::E0301)]
    #[tokio::test]
    async fn test_registry_failures_are_recorded(#[case] behavior: Behavior, #[case] code: ErrorCode) {
        let npm = Arc::new(
            FakeRegistry::new(Ecosystem::Npm)
                .with_versions("express", &["4.18.2"])
                .with_behavior("broken", behavior),
        );
        let resolver = resolver(&[Arc::clone(&npm)]);

        let report = resolver
            .resolve(&[
                DependencyRequest::npm("broken", "^1.0.0"),
                DependencyRequest::npm("express", "^4.18.0"),
            ])
            .await
            .unwrap();

        assert_eq!(reason(&report, Ecosystem::Npm, "broken").code(), code);
        assert_eq!(report.version_of(Ecosystem::Npm, "express"), Some("4.18.2"));
        // No retry for anything but rate limiting
        assert_eq!(npm.calls("broken"), 1);
    }

    #[tokio::test]
    async fn test_no_matching_version() {
        let (npm, maven) = Fixtures::e2e_registries();
        let resolver = resolver(&[npm, maven]);

        let report = resolver
            .resolve(&[DependencyRequest::npm("express", "^5.0.0")])
            .await
            .unwrap();

        assert_eq!(
            reason(&report, Ecosystem::Npm, "express"),
            &FailureReason::NoMatchingVersion {
                constraint: "^5.0.0".into(),
                available: 2,
            }
        );
    }

    #[tokio::test]
    async fn test_invalid_constraint_fails_only_its_request() {
        let (npm, maven) = Fixtures::e2e_registries();
        let resolver = resolver(&[Arc::clone(&npm), maven]);

        let report = resolver
            .resolve(&[
                DependencyRequest::npm("express", ">=abc"),
                DependencyRequest::npm("lodash", "^4.17.0"),
            ])
            .await
            .unwrap();

        assert!(matches!(
            reason(&report, Ecosystem::Npm, "express"),
            FailureReason::InvalidConstraint { expression, .. } if expression == ">=abc"
        ));
        assert_eq!(report.version_of(Ecosystem::Npm, "lodash"), Some("4.17.21"));
        assert_eq!(npm.calls("express"), 0);
    }

    #[tokio::test]
    async fn test_unsupported_ecosystem_fails_fast() {
        let (npm, _) = Fixtures::e2e_registries();
        let resolver = resolver(&[Arc::clone(&npm)]);

        let err = resolver
            .resolve(&[
                DependencyRequest::npm("express", "^4.18.0"),
                DependencyRequest::pypi("flask", ">=3.0"),
            ])
            .await
            .unwrap_err();

        assert_eq!(
            err,
            ResolveError::UnsupportedEcosystem {
                ecosystem: Ecosystem::PyPi,
                package: "flask".into(),
            }
        );
        assert_eq!(err.code(), ErrorCode::E0403);
        assert_eq!(npm.total_calls(), 0);
        assert!(resolver.cache().is_empty());
    }
}

// ========== Rate Limit Tests ==========

mod rate_limits {
    use super::*;
    use pretty_assertions::assert_eq;

    fn throttled(times: usize) -> Arc<FakeRegistry> {
        Arc::new(FakeRegistry::new(Ecosystem::Maven).with_behavior(
            "com.example:busy",
            Behavior::RateLimited {
                times,
                retry_after: None,
                then: vec!["1.4.0".into(), "1.3.0".into()],
            },
        ))
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_retry_recovers() {
        let maven = throttled(1);
        let resolver = resolver(&[Arc::clone(&maven)]);

        let started = tokio::time::Instant::now();
        let report = resolver
            .resolve(&[DependencyRequest::maven("com.example:busy", "[1.0,2.0)")])
            .await
            .unwrap();

        assert_eq!(report.version_of(Ecosystem::Maven, "com.example:busy"), Some("1.4.0"));
        assert_eq!(maven.calls("com.example:busy"), 2);
        assert!(started.elapsed() >= resolver.config().rate_limit_backoff);
        assert_eq!(resolver.stats().snapshot().retries, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_persistent_throttling_is_recorded() {
        let maven = throttled(5);
        let resolver = resolver(&[Arc::clone(&maven)]);

        let report = resolver
            .resolve(&[DependencyRequest::maven("com.example:busy", "latest")])
            .await
            .unwrap();

        assert!(matches!(
            reason(&report, Ecosystem::Maven, "com.example:busy"),
            FailureReason::RateLimited { .. }
        ));
        assert_eq!(maven.calls("com.example:busy"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_is_configurable() {
        let maven = throttled(2);
        let config =
            ResolverConfig::default().with_rate_limit_retry(2, Duration::from_millis(100));
        let resolver = resolver_with(&[Arc::clone(&maven)], config);

        let report = resolver
            .resolve(&[DependencyRequest::maven("com.example:busy", "latest")])
            .await
            .unwrap();

        assert_eq!(report.version_of(Ecosystem::Maven, "com.example:busy"), Some("1.4.0"));
        assert_eq!(maven.calls("com.example:busy"), 3);
    }

    #[tokio::test]
    async fn test_retries_disabled() {
        let maven = throttled(1);
        let config = ResolverConfig::default().with_rate_limit_retry(0, Duration::ZERO);
        let resolver = resolver_with(&[Arc::clone(&maven)], config);

        let report = resolver
            .resolve(&[DependencyRequest::maven("com.example:busy", "latest")])
            .await
            .unwrap();

        assert!(!report.is_complete());
        assert_eq!(maven.calls("com.example:busy"), 1);
    }
}

// ========== Cache Tests ==========

mod caching {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_cache_hit_avoids_network() {
        let (npm, maven) = Fixtures::e2e_registries();
        let resolver = resolver(&[Arc::clone(&npm), Arc::clone(&maven)]);

        resolver.resolve(&Fixtures::e2e_requests()).await.unwrap();
        resolver.resolve(&Fixtures::e2e_requests()).await.unwrap();

        assert_eq!(npm.calls("express"), 1);
        assert_eq!(npm.calls("lodash"), 1);
        assert_eq!(maven.calls("spring-boot-starter"), 1);

        let stats = resolver.stats().snapshot();
        assert_eq!(stats.lookups, 3);
        assert_eq!(stats.cache_hits, 3);
    }

    #[tokio::test]
    async fn test_idempotent_with_warm_cache() {
        let (npm, maven) = Fixtures::e2e_registries();
        let resolver = resolver(&[npm, maven]);

        let cold = resolver.resolve(&Fixtures::e2e_requests()).await.unwrap();
        let warm = resolver.resolve(&Fixtures::e2e_requests()).await.unwrap();

        assert_eq!(cold.resolved(), warm.resolved());
        assert_eq!(cold, warm);
    }

    #[tokio::test]
    async fn test_injected_cache_is_shared() {
        let (npm, maven) = Fixtures::e2e_registries();
        let table = Fixtures::table(&[Arc::clone(&npm), maven]);
        let cache = Arc::new(ResponseCache::new());

        let first = DependencyResolverService::new(table.clone(), Arc::clone(&cache), ResolverConfig::default());
        let second = DependencyResolverService::new(table, Arc::clone(&cache), ResolverConfig::default());

        first.resolve(&Fixtures::e2e_requests()).await.unwrap();
        let report = second.resolve(&Fixtures::e2e_requests()).await.unwrap();

        assert!(report.is_complete());
        assert_eq!(npm.total_calls(), 2);
        assert_eq!(cache.len(), 3);
    }

    #[tokio::test]
    async fn test_clear_cache_refetches() {
        let (npm, maven) = Fixtures::e2e_registries();
        let resolver = resolver(&[Arc::clone(&npm), maven]);

        resolver.resolve(&Fixtures::e2e_requests()).await.unwrap();
        resolver.clear_cache();
        resolver.resolve(&Fixtures::e2e_requests()).await.unwrap();

        assert_eq!(npm.calls("express"), 2);
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let npm = Arc::new(FakeRegistry::new(Ecosystem::Npm));
        let resolver = resolver(&[Arc::clone(&npm)]);

        resolver.resolve(&[DependencyRequest::npm("ghost", "latest")]).await.unwrap();
        resolver.resolve(&[DependencyRequest::npm("ghost", "latest")]).await.unwrap();

        assert_eq!(npm.calls("ghost"), 2);
        assert!(resolver.cache().is_empty());
    }
}

// ========== Timeout & Concurrency Tests ==========

mod timeouts {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test(start_paused = true)]
    async fn test_hanging_registry_is_contained() {
        let npm = Arc::new(
            FakeRegistry::new(Ecosystem::Npm)
                .with_versions("express", &["4.18.2"])
                .with_behavior("stuck", Behavior::Hang),
        );
        let (_, maven) = Fixtures::e2e_registries();
        let config = ResolverConfig::default().with_timeout(Duration::from_secs(2));
        let resolver = resolver_with(&[npm, maven], config);

        let started = tokio::time::Instant::now();
        let report = resolver
            .resolve(&[
                DependencyRequest::npm("express", "^4.18.0"),
                DependencyRequest::npm("stuck", "^1.0.0"),
                DependencyRequest::maven("spring-boot-starter", "3.2.0"),
            ])
            .await
            .unwrap();

        assert!(started.elapsed() < Duration::from_secs(3));
        assert_eq!(report.version_of(Ecosystem::Npm, "express"), Some("4.18.2"));
        assert_eq!(
            report.version_of(Ecosystem::Maven, "spring-boot-starter"),
            Some("3.2.0")
        );
        assert_eq!(
            reason(&report, Ecosystem::Npm, "stuck"),
            &FailureReason::ResolutionTimeout { timeout_ms: 2_000 }
        );
        assert_eq!(resolver.stats().snapshot().timeouts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_lookups_run_concurrently() {
        let names: Vec<String> = (0..10).map(|i| format!("pkg-{i}")).collect();
        let npm = names
            .iter()
            .fold(FakeRegistry::new(Ecosystem::Npm), |fake, name| {
                fake.with_versions(name, &["1.0.0"])
            })
            .with_latency(Duration::from_secs(1));
        let resolver = resolver(&[Arc::new(npm)]);

        let requests: Vec<_> = names
            .iter()
            .map(|name| DependencyRequest::npm(name.as_str(), "^1.0.0"))
            .collect();
        let started = tokio::time::Instant::now();
        let report = resolver.resolve(&requests).await.unwrap();

        assert_eq!(report.len(), 10);
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrency_is_bounded_per_ecosystem() {
        let npm = ["a", "b", "c", "d"]
            .iter()
            .fold(FakeRegistry::new(Ecosystem::Npm), |fake, name| {
                fake.with_versions(name, &["1.0.0"])
            })
            .with_latency(Duration::from_secs(1));
        let config = ResolverConfig::default().with_concurrency(Ecosystem::Npm, 2);
        let resolver = resolver_with(&[Arc::new(npm)], config);

        let requests: Vec<_> = ["a", "b", "c", "d"]
            .iter()
            .map(|name| DependencyRequest::npm(*name, "latest"))
            .collect();
        let started = tokio::time::Instant::now();
        let report = resolver.resolve(&requests).await.unwrap();

        assert_eq!(report.len(), 4);
        assert!(started.elapsed() >= Duration::from_secs(2));
    }
}

// ========== Merge Tests ==========

mod merging {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_merge_successive_batches() {
        let npm = Arc::new(
            FakeRegistry::new(Ecosystem::Npm)
                .with_versions("express", &["5.0.0", "4.18.2"])
                .with_versions("jest", &["29.7.0"]),
        );
        let resolver = resolver(&[npm]);

        let runtime = resolver
            .resolve(&[
                DependencyRequest::npm("express", "^4.18.0"),
                DependencyRequest::npm("ghost", "latest"),
            ])
            .await
            .unwrap();
        let dev = resolver
            .resolve(&[
                DependencyRequest::npm("jest", "^29.0.0").with_scope(Scope::Test),
                DependencyRequest::npm("express", "^5.0.0"),
            ])
            .await
            .unwrap();

        let merged = runtime.merge(dev);
        assert_eq!(
            resolved_pairs(&merged),
            vec![
                ("express".to_string(), "5.0.0".to_string()),
                ("jest".to_string(), "29.7.0".to_string()),
            ]
        );
        assert_eq!(merged.failures().len(), 1);
    }
}

// ========== Property Tests ==========

mod properties {
    use super::*;

    fn pooled_registries() -> Vec<Arc<FakeRegistry>> {
        let versions = ["0.2.3", "1.0.0", "1.2.3", "1.9.5", "2.0.0", "4.17.21", "10.1.0"];
        let pool = ["alpha", "beta", "gamma", "delta"];
        [Ecosystem::Npm, Ecosystem::Maven]
            .into_iter()
            .map(|eco| {
                let fake = pool
                    .iter()
                    .fold(FakeRegistry::new(eco), |fake, name| fake.with_versions(name, &versions));
                Arc::new(fake)
            })
            .collect()
    }

    fn run(resolver: &DependencyResolverService, requests: &[DependencyRequest]) -> ResolutionReport {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
            .block_on(resolver.resolve(requests))
            .unwrap()
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn every_request_lands_in_exactly_one_bucket(requests in request_batch_strategy()) {
            let resolver = resolver(&pooled_registries());
            let report = run(&resolver, &requests);

            let unique: HashSet<PackageKey> = requests.iter().map(DependencyRequest::key).collect();
            prop_assert_eq!(
                report.len() + report.failures().len() + report.conflicts().len(),
                unique.len()
            );
            prop_assert_eq!(report.unique_keys(), unique.len());
        }

        #[test]
        fn warm_cache_resolution_is_identical(requests in request_batch_strategy()) {
            let resolver = resolver(&pooled_registries());
            let cold = run(&resolver, &requests);
            let warm = run(&resolver, &requests);
            prop_assert_eq!(cold.resolved(), warm.resolved());
        }
    }
}
