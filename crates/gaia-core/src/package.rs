//! Ecosystems, scopes and dependency requests.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A package-hosting system with its own naming and versioning conventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ecosystem {
    /// Maven Central (also used for Gradle builds).
    Maven,
    /// The npm registry.
    Npm,
    /// The Python Package Index.
    PyPi,
    /// NuGet Gallery.
    NuGet,
}

impl Ecosystem {
    /// All ecosystems, in declaration order.
    pub const ALL: [Self; 4] = [Self::Maven, Self::Npm, Self::PyPi, Self::NuGet];

    /// Canonical lowercase tag.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Maven => "maven",
            Self::Npm => "npm",
            Self::PyPi => "pypi",
            Self::NuGet => "nuget",
        }
    }

    /// Normalise a package name into the registry's canonical key.
    ///
    /// # Examples
    ///
    /// ```
    /// use gaia_core::Ecosystem;
    ///
    /// assert_eq!(Ecosystem::PyPi.normalize_name("Flask_SQLAlchemy"), "flask-sqlalchemy");
    /// assert_eq!(Ecosystem::Npm.normalize_name(" Express "), "express");
    /// assert_eq!(
    ///     Ecosystem::Maven.normalize_name("org.springframework.boot:spring-boot-starter"),
    ///     "org.springframework.boot:spring-boot-starter"
    /// );
    /// ```
    #[must_use]
    pub fn normalize_name(&self, name: &str) -> String {
        let name = name.trim();
        match self {
            // Group and artifact ids are case-sensitive on Maven Central.
            Self::Maven => name.to_string(),
            Self::Npm | Self::NuGet => name.to_lowercase(),
            // PEP 503: runs of '-', '_' and '.' collapse to a single '-'.
            Self::PyPi => {
                let mut normalized = String::with_capacity(name.len());
                let mut in_separator = false;
                for c in name.chars() {
                    if matches!(c, '-' | '_' | '.') {
                        if !in_separator {
                            normalized.push('-');
                        }
                        in_separator = true;
                    } else {
                        normalized.extend(c.to_lowercase());
                        in_separator = false;
                    }
                }
                normalized
            }
        }
    }
}

impl fmt::Display for Ecosystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Ecosystem {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "maven" | "gradle" => Ok(Self::Maven),
            "npm" => Ok(Self::Npm),
            "pypi" | "pip" => Ok(Self::PyPi),
            "nuget" => Ok(Self::NuGet),
            _ => Err(Error::unsupported_ecosystem(s)),
        }
    }
}

/// Where a dependency is needed.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// Needed only by tests.
    Test,
    /// Supplied by the runtime container.
    Provided,
    /// Needed at runtime but not to compile.
    Runtime,
    /// Needed to compile and at runtime.
    #[default]
    Compile,
}

impl Scope {
    /// Lowercase name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Test => "test",
            Self::Provided => "provided",
            Self::Runtime => "runtime",
            Self::Compile => "compile",
        }
    }

    /// The wider of two scopes. The order is `compile > runtime > provided > test`.
    #[must_use]
    pub fn widest(self, other: Self) -> Self {
        self.max(other)
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scope {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "compile" | "implementation" | "api" => Ok(Self::Compile),
            "runtime" | "runtimeonly" => Ok(Self::Runtime),
            "provided" | "compileonly" => Ok(Self::Provided),
            "test" | "dev" | "testimplementation" => Ok(Self::Test),
            other => Err(format!("unknown scope '{other}'")),
        }
    }
}

/// Identity of a package within a resolution run.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PackageKey {
    /// Ecosystem the package lives in.
    pub ecosystem: Ecosystem,
    /// Normalised package name.
    pub name: String,
}

impl PackageKey {
    /// Create a key, normalising the name for the ecosystem.
    #[must_use]
    pub fn new(ecosystem: Ecosystem, name: &str) -> Self {
        Self {
            ecosystem,
            name: ecosystem.normalize_name(name),
        }
    }
}

impl fmt::Display for PackageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.ecosystem, self.name)
    }
}

/// A request to resolve one declared dependency.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DependencyRequest {
    /// Ecosystem to resolve against.
    pub ecosystem: Ecosystem,
    /// Package name as declared.
    pub name: String,
    /// Constraint expression as declared.
    pub version_constraint: String,
    /// Where the dependency is needed.
    #[serde(default)]
    pub scope: Scope,
}

impl DependencyRequest {
    /// Create a compile-scope request.
    #[must_use]
    pub fn new(
        ecosystem: Ecosystem,
        name: impl Into<String>,
        version_constraint: impl Into<String>,
    ) -> Self {
        Self {
            ecosystem,
            name: name.into(),
            version_constraint: version_constraint.into(),
            scope: Scope::Compile,
        }
    }

    /// Shorthand for an npm request.
    #[must_use]
    pub fn npm(name: impl Into<String>, version_constraint: impl Into<String>) -> Self {
        Self::new(Ecosystem::Npm, name, version_constraint)
    }

    /// Shorthand for a Maven request.
    #[must_use]
    pub fn maven(name: impl Into<String>, version_constraint: impl Into<String>) -> Self {
        Self::new(Ecosystem::Maven, name, version_constraint)
    }

    /// Shorthand for a PyPI request.
    #[must_use]
    pub fn pypi(name: impl Into<String>, version_constraint: impl Into<String>) -> Self {
        Self::new(Ecosystem::PyPi, name, version_constraint)
    }

    /// Shorthand for a NuGet request.
    #[must_use]
    pub fn nuget(name: impl Into<String>, version_constraint: impl Into<String>) -> Self {
        Self::new(Ecosystem::NuGet, name, version_constraint)
    }

    /// Set the scope.
    #[must_use]
    pub const fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    /// The deduplication key for this request.
    #[must_use]
    pub fn key(&self) -> PackageKey {
        PackageKey::new(self.ecosystem, &self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test_case("maven", Ecosystem::Maven ; "maven")]
    #[test_case("Gradle", Ecosystem::Maven ; "gradle alias")]
    #[test_case("NPM", Ecosystem::Npm ; "uppercase npm")]
    #[test_case("pypi", Ecosystem::PyPi ; "pypi")]
    #[test_case("pip", Ecosystem::PyPi ; "pip alias")]
    #[test_case(" nuget ", Ecosystem::NuGet ; "padded nuget")]
    fn test_ecosystem_from_str(tag: &str, expected: Ecosystem) {
        assert_eq!(tag.parse::<Ecosystem>().unwrap(), expected);
    }

    #[test]
    fn test_unknown_ecosystem_is_unsupported() {
        let err = "cargo".parse::<Ecosystem>().unwrap_err();
        assert!(matches!(err, Error::UnsupportedEcosystem { ref tag, .. } if tag == "cargo"));
    }

    #[test_case(Ecosystem::PyPi, "Django", "django" ; "pypi lowercase")]
    #[test_case(Ecosystem::PyPi, "zope.interface", "zope-interface" ; "pypi dot")]
    #[test_case(Ecosystem::PyPi, "a__b-.c", "a-b-c" ; "pypi separator run")]
    #[test_case(Ecosystem::Npm, "@Types/Node", "@types/node" ; "npm scoped")]
    #[test_case(Ecosystem::NuGet, "Newtonsoft.Json", "newtonsoft.json" ; "nuget lowercase")]
    #[test_case(Ecosystem::Maven, " com.Foo:Bar ", "com.Foo:Bar" ; "maven case kept")]
    fn test_normalize_name(ecosystem: Ecosystem, name: &str, expected: &str) {
        assert_eq!(ecosystem.normalize_name(name), expected);
    }

    #[test]
    fn test_scope_widest() {
        assert_eq!(Scope::Test.widest(Scope::Compile), Scope::Compile);
        assert_eq!(Scope::Provided.widest(Scope::Runtime), Scope::Runtime);
        assert_eq!(Scope::Test.widest(Scope::Provided), Scope::Provided);
        assert_eq!(Scope::default(), Scope::Compile);
    }

    #[test_case("dev", Scope::Test ; "npm dev")]
    #[test_case("testImplementation", Scope::Test ; "gradle test")]
    #[test_case("compileOnly", Scope::Provided ; "gradle compile only")]
    #[test_case("runtime", Scope::Runtime ; "runtime")]
    fn test_scope_from_str(input: &str, expected: Scope) {
        assert_eq!(input.parse::<Scope>().unwrap(), expected);
    }

    #[test]
    fn test_request_key_normalizes() {
        let a = DependencyRequest::pypi("Flask_Login", "^0.6");
        let b = DependencyRequest::pypi("flask-login", "0.6.3").with_scope(Scope::Test);
        assert_eq!(a.key(), b.key());
        assert_eq!(a.key().to_string(), "pypi:flask-login");
    }

    #[test]
    fn test_request_deserializes_with_default_scope() {
        let json = r#"{"ecosystem":"npm","name":"express","version_constraint":"^4.18.0"}"#;
        let request: DependencyRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request, DependencyRequest::npm("express", "^4.18.0"));
    }
}
