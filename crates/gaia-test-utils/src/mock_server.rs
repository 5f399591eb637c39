//! Wiremock registries speaking each ecosystem's wire format.

use crate::fixtures::Fixtures;
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Count the requests a server has received.
async fn request_count(server: &MockServer) -> usize {
    server.received_requests().await.unwrap_or_default().len()
}

fn rate_limited(retry_after_secs: u64) -> ResponseTemplate {
    ResponseTemplate::new(429)
        .insert_header("Retry-After", retry_after_secs.to_string().as_str())
        .set_body_json(serde_json::json!({ "error": "rate limit exceeded" }))
}

// ========== npm ==========

/// Mock npm registry.
#[derive(Debug)]
pub struct MockNpmRegistry {
    server: MockServer,
}

impl MockNpmRegistry {
    /// Start a new mock registry.
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Base URL of the mock server.
    #[must_use]
    pub fn url(&self) -> String {
        self.server.uri()
    }

    fn package_path(name: &str) -> String {
        format!("/{}", name.replace('/', "%2F"))
    }

    /// Serve a packument; the first version is tagged latest.
    pub async fn register_package(&self, name: &str, versions: &[&str]) {
        Mock::given(method("GET"))
            .and(path(Self::package_path(name)))
            .respond_with(ResponseTemplate::new(200).set_body_json(Fixtures::npm_packument(
                name,
                versions,
                versions.first().copied(),
            )))
            .mount(&self.server)
            .await;
    }

    /// Serve a packument and expect exactly `times` requests for it.
    ///
    /// The expectation is verified when the registry is dropped.
    pub async fn register_package_expecting(&self, name: &str, versions: &[&str], times: u64) {
        Mock::given(method("GET"))
            .and(path(Self::package_path(name)))
            .respond_with(ResponseTemplate::new(200).set_body_json(Fixtures::npm_packument(
                name,
                versions,
                versions.first().copied(),
            )))
            .expect(times)
            .mount(&self.server)
            .await;
    }

    /// Answer 404 for `name`.
    pub async fn register_not_found(&self, name: &str) {
        Mock::given(method("GET"))
            .and(path(Self::package_path(name)))
            .respond_with(
                ResponseTemplate::new(404)
                    .set_body_json(serde_json::json!({ "error": "Not found" })),
            )
            .mount(&self.server)
            .await;
    }

    /// Answer 429 for every request for `name`.
    pub async fn register_rate_limit(&self, name: &str, retry_after_secs: u64) {
        Mock::given(method("GET"))
            .and(path(Self::package_path(name)))
            .respond_with(rate_limited(retry_after_secs))
            .mount(&self.server)
            .await;
    }

    /// Answer 429 once for `name`, then serve the packument.
    pub async fn register_rate_limit_once(&self, name: &str, versions: &[&str]) {
        Mock::given(method("GET"))
            .and(path(Self::package_path(name)))
            .respond_with(rate_limited(0))
            .up_to_n_times(1)
            .mount(&self.server)
            .await;
        self.register_package(name, versions).await;
    }

    /// Serve a packument after `delay`.
    pub async fn register_slow(&self, name: &str, versions: &[&str], delay: Duration) {
        Mock::given(method("GET"))
            .and(path(Self::package_path(name)))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(Fixtures::npm_packument(name, versions, None))
                    .set_delay(delay),
            )
            .mount(&self.server)
            .await;
    }

    /// Answer with a server error for `name`.
    pub async fn register_error(&self, name: &str, status: u16) {
        Mock::given(method("GET"))
            .and(path(Self::package_path(name)))
            .respond_with(ResponseTemplate::new(status))
            .mount(&self.server)
            .await;
    }

    /// Get received requests count.
    pub async fn received_requests(&self) -> usize {
        request_count(&self.server).await
    }
}

// ========== Maven Central ==========

/// Mock Maven Central search API.
#[derive(Debug)]
pub struct MockMavenCentral {
    server: MockServer,
}

impl MockMavenCentral {
    /// Start a new mock search API.
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Base URL of the mock server.
    #[must_use]
    pub fn url(&self) -> String {
        self.server.uri()
    }

    /// Serve versions for `groupId:artifactId`, or a bare artifact id.
    pub async fn register_artifact(&self, coordinate: &str, versions: &[&str]) {
        let (query, group, artifact) = match coordinate.split_once(':') {
            Some((group, artifact)) => (
                format!("g:\"{group}\" AND a:\"{artifact}\""),
                group,
                artifact,
            ),
            None => (format!("a:\"{coordinate}\""), "", coordinate),
        };
        Mock::given(method("GET"))
            .and(path("/solrsearch/select"))
            .and(query_param("q", query.as_str()))
            .and(query_param("core", "gav"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(Fixtures::maven_search(group, artifact, versions)),
            )
            .mount(&self.server)
            .await;
    }

    /// Get received requests count.
    pub async fn received_requests(&self) -> usize {
        request_count(&self.server).await
    }
}

// ========== PyPI ==========

/// Mock PyPI JSON API.
#[derive(Debug)]
pub struct MockPypi {
    server: MockServer,
}

impl MockPypi {
    /// Start a new mock index.
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Base URL of the mock server.
    #[must_use]
    pub fn url(&self) -> String {
        self.server.uri()
    }

    /// Serve a project. `name` must already be PEP 503 normalised.
    pub async fn register_project(&self, name: &str, versions: &[&str], yanked: &[&str]) {
        Mock::given(method("GET"))
            .and(path(format!("/pypi/{name}/json")))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(Fixtures::pypi_project(name, versions, yanked)),
            )
            .mount(&self.server)
            .await;
    }

    /// Get received requests count.
    pub async fn received_requests(&self) -> usize {
        request_count(&self.server).await
    }
}

// ========== NuGet ==========

/// Mock NuGet flat container.
#[derive(Debug)]
pub struct MockNuget {
    server: MockServer,
}

impl MockNuget {
    /// Start a new mock service.
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Base URL of the mock server.
    #[must_use]
    pub fn url(&self) -> String {
        self.server.uri()
    }

    /// Serve a version index.
    pub async fn register_package(&self, id: &str, versions: &[&str]) {
        Mock::given(method("GET"))
            .and(path(format!(
                "/v3-flatcontainer/{}/index.json",
                id.to_lowercase()
            )))
            .respond_with(ResponseTemplate::new(200).set_body_json(Fixtures::nuget_index(versions)))
            .mount(&self.server)
            .await;
    }

    /// Get received requests count.
    pub async fn received_requests(&self) -> usize {
        request_count(&self.server).await
    }
}
