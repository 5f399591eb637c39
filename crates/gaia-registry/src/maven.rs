//! Maven Central search client.
//!
//! Versions are listed through the Solr search API in GAV mode, which returns
//! one document per published version.

use crate::client::{Endpoint, HttpClient};
use crate::error::{RegistryError, Result};
use crate::lookup::{LookupFuture, RegistryClient, RegistryLookupResult};
use gaia_core::Ecosystem;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

/// Default Maven Central search URL.
pub const MAVEN_CENTRAL_URL: &str = "https://search.maven.org";

/// Rows requested per search.
pub const DEFAULT_ROWS: u32 = 200;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    response: SearchBody,
}

#[derive(Debug, Deserialize)]
struct SearchBody {
    #[serde(rename = "numFound", default)]
    num_found: u64,
    #[serde(default)]
    docs: Vec<SearchDoc>,
}

#[derive(Debug, Deserialize)]
struct SearchDoc {
    #[serde(default)]
    g: Option<String>,
    v: String,
}

/// Client for Maven Central (`groupId:artifactId` coordinates).
#[derive(Debug)]
pub struct MavenCentralClient {
    http: Arc<HttpClient>,
    endpoint: Endpoint,
    rows: u32,
}

impl MavenCentralClient {
    /// Create a client for the search API at `base_url`.
    ///
    /// # Errors
    /// Returns error if the URL is invalid.
    pub fn new(http: Arc<HttpClient>, base_url: &str) -> Result<Self> {
        Ok(Self {
            http,
            endpoint: Endpoint::new(base_url)?,
            rows: DEFAULT_ROWS,
        })
    }

    /// Maximum number of versions requested per lookup.
    #[must_use]
    pub const fn with_rows(mut self, rows: u32) -> Self {
        self.rows = rows;
        self
    }

    /// Send a bearer token with every request.
    ///
    /// # Errors
    /// Returns error if the token is not a valid header value.
    pub fn with_token(mut self, token: Option<&str>) -> Result<Self> {
        self.endpoint = self.endpoint.bearer(token)?;
        Ok(self)
    }

    /// Build the search URL for `groupId:artifactId` or a bare artifact id.
    ///
    /// # Errors
    /// Returns error if the URL cannot be built.
    pub fn search_url(&self, name: &str) -> Result<Url> {
        let mut url = self.endpoint.join("solrsearch/select")?;
        url.query_pairs_mut()
            .append_pair("q", &search_query(name))
            .append_pair("core", "gav")
            .append_pair("rows", &self.rows.to_string())
            .append_pair("wt", "json");
        Ok(url)
    }

    async fn fetch(&self, name: String) -> Result<RegistryLookupResult> {
        let url = self.search_url(&name)?;
        let search: SearchResponse = self
            .http
            .get_json(&url, self.endpoint.headers())
            .await
            .map_err(|e| e.for_package(Ecosystem::Maven, &name))?;

        if search.response.num_found == 0 {
            return Err(RegistryError::NotFound {
                ecosystem: Ecosystem::Maven,
                name,
            });
        }

        debug!(
            package = %name,
            found = search.response.num_found,
            listed = search.response.docs.len(),
            "maven search completed"
        );
        let docs = search.response.docs;
        let docs = match most_published_group(&docs) {
            Some(group) if docs.iter().any(|doc| doc.g.as_deref() != Some(group)) => {
                let groups: BTreeSet<&str> = docs.iter().filter_map(|doc| doc.g.as_deref()).collect();
                warn!(
                    package = %name,
                    groups = ?groups,
                    chosen = group,
                    "artifact id is published under several groups, use groupId:artifactId"
                );
                let group = group.to_string();
                docs.into_iter()
                    .filter(|doc| doc.g.as_deref() == Some(group.as_str()))
                    .collect()
            }
            _ => docs,
        };
        let versions = docs.into_iter().map(|doc| doc.v);
        Ok(RegistryLookupResult::new(Ecosystem::Maven, name, versions))
    }
}

impl RegistryClient for MavenCentralClient {
    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::Maven
    }

    fn lookup_versions(&self, name: String) -> LookupFuture<'_> {
        Box::pin(self.fetch(name))
    }
}

/// The group with the most listed versions; the first seen wins a tie.
fn most_published_group(docs: &[SearchDoc]) -> Option<&str> {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for group in docs.iter().filter_map(|doc| doc.g.as_deref()) {
        match counts.iter_mut().find(|(seen, _)| *seen == group) {
            Some((_, count)) => *count += 1,
            None => counts.push((group, 1)),
        }
    }
    counts
        .into_iter()
        .rev()
        .max_by_key(|&(_, count)| count)
        .map(|(group, _)| group)
}

/// Solr query for a coordinate. A trailing `:version` is ignored.
fn search_query(name: &str) -> String {
    let mut parts = name.trim().splitn(3, ':');
    match (parts.next(), parts.next()) {
        (Some(group), Some(artifact)) => format!("g:\"{group}\" AND a:\"{artifact}\""),
        _ => format!("a:\"{}\"", name.trim()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use test_case::test_case;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> MavenCentralClient {
        MavenCentralClient::new(Arc::new(HttpClient::new().unwrap()), &server.uri()).unwrap()
    }

    fn docs(versions: &[&str]) -> serde_json::Value {
        json!({
            "response": {
                "numFound": versions.len(),
                "docs": versions.iter().map(|v| json!({ "g": "g", "a": "a", "v": v })).collect::<Vec<_>>()
            }
        })
    }

    #[test_case("org.springframework.boot:spring-boot-starter", "g:\"org.springframework.boot\" AND a:\"spring-boot-starter\"" ; "coordinate")]
    #[test_case("junit:junit:4.13.2", "g:\"junit\" AND a:\"junit\"" ; "coordinate with version")]
    #[test_case("spring-boot-starter", "a:\"spring-boot-starter\"" ; "bare artifact")]
    fn test_search_query(name: &str, expected: &str) {
        assert_eq!(search_query(name), expected);
    }

    #[test]
    fn test_search_url() {
        let client = MavenCentralClient::new(
            Arc::new(HttpClient::new().unwrap()),
            MAVEN_CENTRAL_URL,
        )
        .unwrap()
        .with_rows(50);
        let url = client.search_url("junit:junit").unwrap();
        assert_eq!(url.path(), "/solrsearch/select");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("core".into(), "gav".into())));
        assert!(pairs.contains(&("rows".into(), "50".into())));
        assert!(pairs.contains(&("wt".into(), "json".into())));
    }

    #[tokio::test]
    async fn test_lookup_versions() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/solrsearch/select"))
            .and(query_param(
                "q",
                "g:\"org.springframework.boot\" AND a:\"spring-boot-starter\"",
            ))
            .and(query_param("core", "gav"))
            .respond_with(ResponseTemplate::new(200).set_body_json(docs(&[
                "3.1.0", "3.2.0", "3.2.0", "3.0.0-RC1",
            ])))
            .mount(&server)
            .await;

        let result = client(&server)
            .lookup_versions("org.springframework.boot:spring-boot-starter".into())
            .await
            .unwrap();
        assert_eq!(result.source, Ecosystem::Maven);
        assert_eq!(result.available_versions, vec!["3.2.0", "3.1.0", "3.0.0-RC1"]);
    }

    #[tokio::test]
    async fn test_bare_artifact_keeps_most_published_group() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/solrsearch/select"))
            .and(query_param("q", "a:\"commons-io\""))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "response": {
                    "numFound": 4,
                    "docs": [
                        { "g": "commons-io", "a": "commons-io", "v": "2.15.1" },
                        { "g": "org.example.fork", "a": "commons-io", "v": "9.0.0" },
                        { "g": "commons-io", "a": "commons-io", "v": "2.14.0" },
                        { "g": "commons-io", "a": "commons-io", "v": "2.13.0" }
                    ]
                }
            })))
            .mount(&server)
            .await;

        let result = client(&server)
            .lookup_versions("commons-io".into())
            .await
            .unwrap();
        assert_eq!(result.available_versions, vec!["2.15.1", "2.14.0", "2.13.0"]);
    }

    #[test]
    fn test_most_published_group_tie_keeps_first() {
        let doc = |g: &str| SearchDoc {
            g: Some(g.to_string()),
            v: "1.0".to_string(),
        };
        assert_eq!(most_published_group(&[doc("b"), doc("a")]), Some("b"));
        assert_eq!(most_published_group(&[doc("b"), doc("a"), doc("a")]), Some("a"));
        assert_eq!(most_published_group(&[]), None);
    }

    #[tokio::test]
    async fn test_zero_hits_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/solrsearch/select"))
            .respond_with(ResponseTemplate::new(200).set_body_json(docs(&[])))
            .mount(&server)
            .await;

        let err = client(&server)
            .lookup_versions("com.example:nothing".into())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "unexpected": true })))
            .mount(&server)
            .await;

        let err = client(&server)
            .lookup_versions("junit:junit".into())
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::InvalidResponse { .. }));
    }
}
