//! Concurrent resolution of dependency batches.
//!
//! One task is spawned per distinct package that misses the cache. Tasks are
//! bounded per ecosystem by a semaphore and share a cancellation token that
//! fires when the overall timeout elapses. The report is composed in
//! deduplicated-request order once every task has settled.

use crate::config::ResolverConfig;
use crate::error::{ResolveError, Result};
use crate::plan::{Plan, PlannedAction, PlannedEntry};
use crate::report::{FailureReason, ResolutionReport, ResolvedDependency};
use crate::stats::ResolverStats;
use backon::{ExponentialBuilder, Retryable};
use gaia_config::GaiaConfig;
use gaia_core::{DependencyRequest, Ecosystem, PackageKey};
use gaia_registry::{
    RegistryClient, RegistryError, RegistryLookupResult, RegistryTable, ResponseCache,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

type LookupOutcome = std::result::Result<Arc<RegistryLookupResult>, FailureReason>;

/// Resolves batches of dependency requests against package registries.
pub struct DependencyResolverService {
    registries: RegistryTable,
    cache: Arc<ResponseCache>,
    config: Arc<ResolverConfig>,
    limits: BTreeMap<Ecosystem, Arc<Semaphore>>,
    stats: Arc<ResolverStats>,
}

impl std::fmt::Debug for DependencyResolverService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DependencyResolverService")
            .field("registries", &self.registries)
            .field("cached", &self.cache.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl DependencyResolverService {
    /// Create a service over the given registries and cache.
    #[must_use]
    pub fn new(registries: RegistryTable, cache: Arc<ResponseCache>, config: ResolverConfig) -> Self {
        let limits = Ecosystem::ALL
            .into_iter()
            .map(|eco| (eco, Arc::new(Semaphore::new(config.concurrency_for(eco)))))
            .collect();
        Self {
            registries,
            cache,
            config: Arc::new(config),
            limits,
            stats: Arc::new(ResolverStats::new()),
        }
    }

    /// Build the default registry clients, cache and settings from loaded
    /// configuration.
    pub fn from_config(config: &GaiaConfig) -> Result<Self> {
        let registries = RegistryTable::from_config(config)?;
        let cache = Arc::new(ResponseCache::from_config(config));
        Ok(Self::new(registries, cache, ResolverConfig::from(config)))
    }

    /// Resolve a batch of requests.
    ///
    /// Per-package problems are recorded in the report. The call itself fails
    /// only when a request names an ecosystem with no registered client, or
    /// when a lookup task panics.
    pub async fn resolve(&self, requests: &[DependencyRequest]) -> Result<ResolutionReport> {
        self.ensure_supported(requests)?;

        let started = Instant::now();
        let plan = Plan::build(requests);
        ResolverStats::bump(&self.stats.batches);
        info!(
            requests = requests.len(),
            unique = plan.len(),
            "resolving dependencies"
        );

        let mut outcomes: Vec<Option<LookupOutcome>> = (0..plan.len()).map(|_| None).collect();
        let cancel = CancellationToken::new();
        let mut tasks = JoinSet::new();

        for (slot, entry) in plan.entries().iter().enumerate() {
            if !matches!(entry.action, PlannedAction::Lookup(_)) {
                continue;
            }
            let PackageKey { ecosystem, name } = &entry.key;

            if let Some(cached) = self.cache.get(*ecosystem, name) {
                ResolverStats::bump(&self.stats.cache_hits);
                debug!(ecosystem = %ecosystem, package = %name, "using cached versions");
                outcomes[slot] = Some(Ok(cached));
                continue;
            }

            if self.config.cache_only {
                outcomes[slot] = Some(Err(FailureReason::Network {
                    message: "not cached and network lookups are disabled".into(),
                }));
                continue;
            }

            let client = self.registries.client(*ecosystem).ok_or_else(|| {
                ResolveError::internal(format!("no registry client for {ecosystem}"))
            })?;
            let lookup = Lookup {
                client,
                name: name.clone(),
                limit: self.limit(*ecosystem)?,
                cache: Arc::clone(&self.cache),
                config: Arc::clone(&self.config),
                stats: Arc::clone(&self.stats),
                cancel: cancel.child_token(),
            };

            ResolverStats::bump(&self.stats.lookups);
            debug!(ecosystem = %ecosystem, package = %name, "dispatching lookup");
            tasks.spawn(async move { (slot, lookup.run().await) });
        }

        let deadline = tokio::time::Instant::now() + self.config.timeout;
        loop {
            match tokio::time::timeout_at(deadline, tasks.join_next()).await {
                Ok(Some(Ok((slot, outcome)))) => outcomes[slot] = Some(outcome),
                Ok(Some(Err(err))) => {
                    cancel.cancel();
                    return Err(ResolveError::internal(format!("lookup task failed: {err}")));
                }
                Ok(None) => break,
                Err(_) => {
                    warn!(
                        pending = tasks.len(),
                        timeout_ms = self.timeout_ms(),
                        "resolution timed out, cancelling pending lookups"
                    );
                    cancel.cancel();
                    while let Some(joined) = tasks.join_next().await {
                        if let Ok((slot, outcome)) = joined {
                            outcomes[slot] = Some(outcome);
                        }
                    }
                    break;
                }
            }
        }

        let report = self.compose(plan, outcomes);
        info!(
            resolved = report.len(),
            failures = report.failures().len(),
            conflicts = report.conflicts().len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "resolution complete"
        );
        Ok(report)
    }

    /// Resolve the newest release of one package.
    ///
    /// Returns `None` when the package could not be resolved; use
    /// [`resolve`](Self::resolve) for the reason.
    pub async fn latest_version(&self, ecosystem: Ecosystem, name: &str) -> Result<Option<String>> {
        let report = self
            .resolve(&[DependencyRequest::new(ecosystem, name, "latest")])
            .await?;
        Ok(report.version_of(ecosystem, name).map(str::to_string))
    }

    /// Drop every cached registry response.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// The injected response cache.
    #[must_use]
    pub const fn cache(&self) -> &Arc<ResponseCache> {
        &self.cache
    }

    /// The registry clients in use.
    #[must_use]
    pub const fn registries(&self) -> &RegistryTable {
        &self.registries
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Counters across every call on this service.
    #[must_use]
    pub fn stats(&self) -> &ResolverStats {
        &self.stats
    }

    fn ensure_supported(&self, requests: &[DependencyRequest]) -> Result<()> {
        match requests
            .iter()
            .find(|request| !self.registries.supports(request.ecosystem))
        {
            Some(request) => Err(ResolveError::UnsupportedEcosystem {
                ecosystem: request.ecosystem,
                package: request.name.clone(),
            }),
            None => Ok(()),
        }
    }

    fn limit(&self, ecosystem: Ecosystem) -> Result<Arc<Semaphore>> {
        self.limits
            .get(&ecosystem)
            .map(Arc::clone)
            .ok_or_else(|| ResolveError::internal(format!("no concurrency limit for {ecosystem}")))
    }

    fn timeout_ms(&self) -> u64 {
        self.config.timeout.as_millis() as u64
    }

    fn compose(&self, plan: Plan, outcomes: Vec<Option<LookupOutcome>>) -> ResolutionReport {
        let mut report = ResolutionReport::new();

        for (entry, outcome) in plan.into_entries().into_iter().zip(outcomes) {
            let PlannedEntry {
                key,
                name,
                scope,
                action,
            } = entry;

            match action {
                PlannedAction::Invalid { expression, reason } => {
                    self.record_failure(
                        &mut report,
                        key,
                        FailureReason::InvalidConstraint { expression, reason },
                    );
                }
                PlannedAction::Conflict { constraints } => {
                    self.record_conflict(&mut report, key, constraints);
                }
                PlannedAction::Lookup(constraint) => match outcome {
                    None => {
                        ResolverStats::bump(&self.stats.timeouts);
                        self.record_failure(
                            &mut report,
                            key,
                            FailureReason::ResolutionTimeout {
                                timeout_ms: self.timeout_ms(),
                            },
                        );
                    }
                    Some(Err(reason)) => {
                        if reason.is_timeout() {
                            ResolverStats::bump(&self.stats.timeouts);
                        }
                        self.record_failure(&mut report, key, reason);
                    }
                    Some(Ok(found)) => match constraint.select_best(&found.available_versions) {
                        Some(version) => {
                            ResolverStats::bump(&self.stats.resolved);
                            debug!(package = %key, version, "resolved");
                            report.push_resolved(ResolvedDependency {
                                ecosystem: key.ecosystem,
                                name,
                                resolved_version: version.to_string(),
                                requested_constraint: constraint.requested().to_string(),
                                scope,
                                superseded_constraints: constraint.superseded().to_vec(),
                            });
                        }
                        None if constraint.is_combined() => {
                            self.record_conflict(
                                &mut report,
                                key,
                                constraint.expressions().to_vec(),
                            );
                        }
                        None => {
                            self.record_failure(
                                &mut report,
                                key,
                                FailureReason::NoMatchingVersion {
                                    constraint: constraint.requested().to_string(),
                                    available: found.available_versions.len(),
                                },
                            );
                        }
                    },
                },
            }
        }

        report
    }

    fn record_failure(&self, report: &mut ResolutionReport, key: PackageKey, reason: FailureReason) {
        ResolverStats::bump(&self.stats.failures);
        warn!(package = %key, code = %reason.code(), reason = %reason, "dependency not resolved");
        report.push_failure(key, reason);
    }

    fn record_conflict(&self, report: &mut ResolutionReport, key: PackageKey, constraints: Vec<String>) {
        ResolverStats::bump(&self.stats.conflicts);
        warn!(package = %key, constraints = ?constraints, "conflicting version constraints");
        report.push_conflict(key, constraints);
    }
}

/// One registry lookup running on its own task.
struct Lookup {
    client: Arc<dyn RegistryClient>,
    name: String,
    limit: Arc<Semaphore>,
    cache: Arc<ResponseCache>,
    config: Arc<ResolverConfig>,
    stats: Arc<ResolverStats>,
    cancel: CancellationToken,
}

impl Lookup {
    async fn run(self) -> LookupOutcome {
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(FailureReason::ResolutionTimeout {
                timeout_ms: self.config.timeout.as_millis() as u64,
            }),
            outcome = self.fetch() => outcome,
        }
    }

    async fn fetch(&self) -> LookupOutcome {
        let ecosystem = self.client.ecosystem();
        let _permit = self.limit.acquire().await.map_err(|_| FailureReason::Network {
            message: "lookup limiter closed".into(),
        })?;

        let backoff = ExponentialBuilder::default()
            .with_min_delay(self.config.rate_limit_backoff)
            .with_max_delay(self.config.max_backoff)
            .with_max_times(self.config.rate_limit_retries);

        let result = (|| self.attempt())
            .retry(backoff)
            .when(RegistryError::is_rate_limited)
            .adjust(|err, scheduled| {
                scheduled.map(|delay| self.config.retry_delay(delay, err.retry_after()))
            })
            .notify(|err, delay| {
                ResolverStats::bump(&self.stats.retries);
                warn!(
                    ecosystem = %ecosystem,
                    package = %self.name,
                    error = %err,
                    retry_in = ?delay,
                    "registry rate limited, retrying"
                );
            })
            .await;

        match result {
            Ok(found) => Ok(self.cache.put(ecosystem, &self.name, found)),
            Err(err) => Err(FailureReason::from(&err)),
        }
    }

    async fn attempt(&self) -> std::result::Result<RegistryLookupResult, RegistryError> {
        let lookup = self.client.lookup_versions(self.name.clone());
        let Some(guard) = self.config.lookup_timeout else {
            return lookup.await;
        };
        tokio::time::timeout(guard, lookup).await.unwrap_or_else(|_| {
            Err(RegistryError::Timeout {
                url: format!("{}:{}", self.client.ecosystem(), self.name),
                timeout_secs: guard.as_secs(),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gaia_test_utils::prelude::*;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn service(fakes: &[Arc<FakeRegistry>], config: ResolverConfig) -> DependencyResolverService {
        DependencyResolverService::new(Fixtures::table(fakes), Arc::new(ResponseCache::new()), config)
    }

    // ========== Dispatch ==========

    #[tokio::test]
    async fn test_duplicates_share_one_lookup() {
        let npm = Arc::new(FakeRegistry::new(Ecosystem::Npm).with_versions("express", &["4.18.2"]));
        let resolver = service(&[Arc::clone(&npm)], ResolverConfig::default());

        let report = resolver
            .resolve(&[
                DependencyRequest::npm("express", "^4.18.0"),
                DependencyRequest::npm("Express", "^4.18.0"),
            ])
            .await
            .unwrap();

        assert_eq!(report.len(), 1);
        assert_eq!(npm.calls("express"), 1);
        assert_eq!(resolver.stats().snapshot().lookups, 1);
    }

    #[tokio::test]
    async fn test_conflicts_and_invalid_constraints_skip_lookup() {
        let maven = Arc::new(FakeRegistry::new(Ecosystem::Maven).with_versions("lib-x", &["2.1.0"]));
        let resolver = service(&[Arc::clone(&maven)], ResolverConfig::default());

        let report = resolver
            .resolve(&[
                DependencyRequest::maven("lib-x", "1.0.0"),
                DependencyRequest::maven("lib-x", "^2.0.0"),
                DependencyRequest::maven("lib-y", "[1.0,"),
            ])
            .await
            .unwrap();

        assert_eq!(maven.total_calls(), 0);
        assert!(report.conflict_for(Ecosystem::Maven, "lib-x").is_some());
        assert!(matches!(
            report.failure_for(Ecosystem::Maven, "lib-y").map(|f| &f.reason),
            Some(FailureReason::InvalidConstraint { .. })
        ));
    }

    #[tokio::test]
    async fn test_cache_only_never_dispatches() {
        let npm = Arc::new(FakeRegistry::new(Ecosystem::Npm).with_versions("express", &["4.18.2"]));
        let resolver = service(
            &[Arc::clone(&npm)],
            ResolverConfig::default().with_cache_only(true),
        );

        let report = resolver
            .resolve(&[DependencyRequest::npm("express", "^4.18.0")])
            .await
            .unwrap();

        assert_eq!(npm.total_calls(), 0);
        assert!(matches!(
            report.failure_for(Ecosystem::Npm, "express").map(|f| &f.reason),
            Some(FailureReason::Network { .. })
        ));
    }

    #[tokio::test]
    async fn test_panicking_lookup_is_internal_error() {
        let npm = Arc::new(FakeRegistry::new(Ecosystem::Npm).with_behavior("boom", Behavior::Panic));
        let resolver = service(&[npm], ResolverConfig::default());

        let err = resolver
            .resolve(&[DependencyRequest::npm("boom", "latest")])
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::Internal { .. }));
    }

    // ========== Retry policy ==========

    #[tokio::test(start_paused = true)]
    async fn test_retry_after_hint_is_capped() {
        let npm = Arc::new(FakeRegistry::new(Ecosystem::Npm).with_behavior(
            "busy",
            Behavior::RateLimited {
                times: 1,
                retry_after: Some(Duration::from_secs(600)),
                then: vec!["1.0.0".into()],
            },
        ));
        let resolver = service(&[Arc::clone(&npm)], ResolverConfig::default());

        let started = tokio::time::Instant::now();
        let report = resolver
            .resolve(&[DependencyRequest::npm("busy", "^1.0.0")])
            .await
            .unwrap();

        assert_eq!(report.version_of(Ecosystem::Npm, "busy"), Some("1.0.0"));
        assert!(started.elapsed() <= resolver.config().max_backoff + Duration::from_millis(10));
        assert_eq!(resolver.stats().snapshot().retries, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_lookup_guard_maps_to_network() {
        let npm = Arc::new(FakeRegistry::new(Ecosystem::Npm).with_behavior("stuck", Behavior::Hang));
        let config = ResolverConfig::default()
            .with_lookup_timeout(Duration::from_secs(2))
            .with_timeout(Duration::from_secs(30));
        let resolver = service(&[npm], config);

        let report = resolver
            .resolve(&[DependencyRequest::npm("stuck", "latest")])
            .await
            .unwrap();

        assert!(matches!(
            report.failure_for(Ecosystem::Npm, "stuck").map(|f| &f.reason),
            Some(FailureReason::Network { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_lookup_hits_overall_deadline_by_default() {
        let npm = Arc::new(
            FakeRegistry::new(Ecosystem::Npm)
                .with_behavior("stuck", Behavior::Hang)
                .with_versions("express", &["4.18.2"]),
        );
        let resolver = service(&[npm], ResolverConfig::default());

        let started = tokio::time::Instant::now();
        let report = resolver
            .resolve(&[
                DependencyRequest::npm("stuck", "latest"),
                DependencyRequest::npm("express", "^4.0.0"),
            ])
            .await
            .unwrap();

        assert_eq!(
            report.failure_for(Ecosystem::Npm, "stuck").map(|f| &f.reason),
            Some(&FailureReason::ResolutionTimeout { timeout_ms: 30_000 })
        );
        assert_eq!(report.version_of(Ecosystem::Npm, "express"), Some("4.18.2"));
        assert!(started.elapsed() < Duration::from_secs(31));
        assert_eq!(resolver.stats().snapshot().timeouts, 1);
    }

    #[tokio::test]
    async fn test_latest_version() {
        let pypi = Arc::new(
            FakeRegistry::new(Ecosystem::PyPi).with_versions("flask", &["3.0.0", "3.1.0rc1", "2.3.3"]),
        );
        let resolver = service(&[pypi], ResolverConfig::default());

        assert_eq!(
            resolver.latest_version(Ecosystem::PyPi, "Flask").await.unwrap(),
            Some("3.0.0".to_string())
        );
        assert_eq!(resolver.latest_version(Ecosystem::PyPi, "nope").await.unwrap(), None);
    }

    #[test]
    fn test_debug_output() {
        let resolver = service(&[], ResolverConfig::default());
        let debug = format!("{resolver:?}");
        assert!(debug.contains("DependencyResolverService"));
        assert!(debug.contains("cached: 0"));
    }
}
