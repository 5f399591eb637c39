//! Registry payloads and request batches shared by tests.

use crate::fakes::FakeRegistry;
use gaia_core::{DependencyRequest, Ecosystem, Scope};
use gaia_registry::RegistryTable;
use serde_json::{Map, Value, json};
use std::sync::Arc;

/// Collection of pre-built test fixtures.
#[derive(Debug)]
pub struct Fixtures;

impl Fixtures {
    // ========== Wire payloads ==========

    /// npm packument with the given versions. `latest` fills `dist-tags`.
    #[must_use]
    pub fn npm_packument(name: &str, versions: &[&str], latest: Option<&str>) -> Value {
        let version_map: Map<String, Value> = versions
            .iter()
            .map(|v| {
                (
                    (*v).to_string(),
                    json!({
                        "name": name,
                        "version": v,
                        "dist": { "tarball": format!("https://registry.npmjs.org/{name}/-/{name}-{v}.tgz") }
                    }),
                )
            })
            .collect();
        let mut dist_tags = Map::new();
        if let Some(latest) = latest {
            dist_tags.insert("latest".to_string(), json!(latest));
        }
        json!({
            "name": name,
            "dist-tags": dist_tags,
            "versions": version_map
        })
    }

    /// Maven Central GAV search response.
    #[must_use]
    pub fn maven_search(group: &str, artifact: &str, versions: &[&str]) -> Value {
        let docs: Vec<Value> = versions
            .iter()
            .map(|v| {
                json!({
                    "id": format!("{group}:{artifact}:{v}"),
                    "g": group,
                    "a": artifact,
                    "v": v,
                    "p": "jar"
                })
            })
            .collect();
        json!({
            "responseHeader": { "status": 0 },
            "response": { "numFound": docs.len(), "start": 0, "docs": docs }
        })
    }

    /// PyPI project document. Each release carries one wheel; `yanked`
    /// lists releases whose files are all yanked.
    #[must_use]
    pub fn pypi_project(name: &str, versions: &[&str], yanked: &[&str]) -> Value {
        let releases: Map<String, Value> = versions
            .iter()
            .chain(yanked)
            .map(|v| {
                let is_yanked = yanked.contains(v);
                (
                    (*v).to_string(),
                    json!([{ "filename": format!("{name}-{v}-py3-none-any.whl"), "yanked": is_yanked }]),
                )
            })
            .collect();
        json!({
            "info": { "name": name, "version": versions.first().copied() },
            "releases": releases
        })
    }

    /// NuGet flat-container version index.
    #[must_use]
    pub fn nuget_index(versions: &[&str]) -> Value {
        json!({ "versions": versions })
    }

    // ========== Request batches ==========

    /// The three-package batch: two npm packages and one Maven starter.
    #[must_use]
    pub fn e2e_requests() -> Vec<DependencyRequest> {
        vec![
            DependencyRequest::npm("express", "^4.18.0"),
            DependencyRequest::npm("lodash", "^4.17.0"),
            DependencyRequest::maven("spring-boot-starter", "3.2.0"),
        ]
    }

    /// Fake registries answering [`e2e_requests`](Self::e2e_requests).
    #[must_use]
    pub fn e2e_registries() -> (Arc<FakeRegistry>, Arc<FakeRegistry>) {
        let npm = FakeRegistry::new(Ecosystem::Npm)
            .with_versions("express", &["4.18.2", "4.17.0"])
            .with_versions("lodash", &["4.17.21"]);
        let maven = FakeRegistry::new(Ecosystem::Maven)
            .with_versions("spring-boot-starter", &["3.2.0", "3.1.0"]);
        (Arc::new(npm), Arc::new(maven))
    }

    /// Registry table over the given fakes.
    #[must_use]
    pub fn table(fakes: &[Arc<FakeRegistry>]) -> RegistryTable {
        fakes.iter().fold(RegistryTable::new(), |table, fake| {
            table.with_client(Arc::clone(fake) as Arc<dyn gaia_registry::RegistryClient>)
        })
    }

    /// A Spring Boot web service's direct dependencies.
    #[must_use]
    pub fn spring_service_requests() -> Vec<DependencyRequest> {
        vec![
            DependencyRequest::maven("org.springframework.boot:spring-boot-starter-web", "3.2.0"),
            DependencyRequest::maven(
                "org.springframework.boot:spring-boot-starter-data-jpa",
                "[3.1,3.3)",
            ),
            DependencyRequest::maven("org.postgresql:postgresql", "latest").with_scope(Scope::Runtime),
            DependencyRequest::maven("org.springframework.boot:spring-boot-starter-test", "3.2.0")
                .with_scope(Scope::Test),
        ]
    }

    /// A Flask API's requirements.
    #[must_use]
    pub fn flask_requests() -> Vec<DependencyRequest> {
        vec![
            DependencyRequest::pypi("Flask", ">=3.0,<4"),
            DependencyRequest::pypi("Flask_SQLAlchemy", "~=3.1"),
            DependencyRequest::pypi("pytest", "latest").with_scope(Scope::Test),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_npm_packument_shape() {
        let doc = Fixtures::npm_packument("express", &["4.18.2"], Some("4.18.2"));
        assert_eq!(doc["dist-tags"]["latest"], "4.18.2");
        assert!(doc["versions"]["4.18.2"].is_object());
    }

    #[test]
    fn test_maven_search_counts() {
        let doc = Fixtures::maven_search("g", "a", &["1.0", "2.0"]);
        assert_eq!(doc["response"]["numFound"], 2);
        assert_eq!(doc["response"]["docs"][1]["v"], "2.0");
    }

    #[test]
    fn test_pypi_project_yanked() {
        let doc = Fixtures::pypi_project("flask", &["3.0.0"], &["2.0.0"]);
        assert_eq!(doc["releases"]["2.0.0"][0]["yanked"], true);
        assert_eq!(doc["info"]["version"], "3.0.0");
    }

    #[test]
    fn test_e2e_table() {
        let (npm, maven) = Fixtures::e2e_registries();
        let table = Fixtures::table(&[npm, maven]);
        assert_eq!(table.len(), 2);
        assert_eq!(Fixtures::e2e_requests().len(), 3);
    }
}
