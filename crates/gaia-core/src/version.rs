//! Tolerant version parsing and ordering.
//!
//! Registries do not agree on a version grammar. npm publishes strict
//! semantic versions, Maven artifacts carry qualifiers such as
//! `2.5.RELEASE` or `1.0-SNAPSHOT`, and PyPI uses PEP 440 forms such as
//! `1.0rc1`. [`Version`] accepts all of them:
//!
//! - A release part: one or more dot-separated numeric components.
//!   Missing trailing components compare as zero, so `1.0 == 1.0.0`.
//! - An optional qualifier, split into identifiers at `.`, `-`, `_` and
//!   letter/digit boundaries.
//! - Optional build metadata after `+`, which is ignored.
//!
//! A qualifier that starts with a number or names a pre-release marker
//! (`alpha`, `beta`, `rc`, `SNAPSHOT`, `dev`, ...) is a pre-release and
//! sorts below the bare release. Any other qualifier is release-level:
//! platform classifiers such as guava's `32.1.3-jre`, service packs and
//! PEP 440 post-releases sort just above the bare release, as Maven orders
//! unknown qualifiers. The Maven release aliases `RELEASE`, `FINAL` and
//! `GA` are treated as no qualifier at all.

use crate::error::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use smallvec::SmallVec;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::sync::Arc;

/// Qualifiers that denote a final release rather than a pre-release.
const RELEASE_ALIASES: &[&str] = &["release", "final", "ga"];

/// Identifiers that mark a qualifier as a pre-release.
const PRERELEASE_MARKERS: &[&str] = &[
    "alpha", "a", "beta", "b", "milestone", "m", "rc", "cr", "c", "pre", "preview", "snapshot",
    "dev", "canary", "next", "nightly", "experimental", "insiders", "ea", "unstable",
];

/// Pre-release identifier component.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PreReleaseId {
    /// Numeric identifier (compared numerically).
    Numeric(u64),
    /// Alphanumeric identifier, stored lowercase.
    Alpha(Arc<str>),
}

impl PartialOrd for PreReleaseId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PreReleaseId {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Numeric(a), Self::Numeric(b)) => a.cmp(b),
            (Self::Alpha(a), Self::Alpha(b)) => a.cmp(b),
            // Numeric identifiers have lower precedence than alphanumeric ones
            (Self::Numeric(_), Self::Alpha(_)) => Ordering::Less,
            (Self::Alpha(_), Self::Numeric(_)) => Ordering::Greater,
        }
    }
}

impl fmt::Display for PreReleaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(n) => write!(f, "{n}"),
            Self::Alpha(s) => write!(f, "{s}"),
        }
    }
}

/// A parsed package version.
#[derive(Clone)]
pub struct Version {
    release: SmallVec<[u64; 4]>,
    pre_release: SmallVec<[PreReleaseId; 2]>,
    suffix: SmallVec<[PreReleaseId; 2]>,
    original: Arc<str>,
}

impl Version {
    /// Create a release version from major, minor and patch.
    #[must_use]
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self::from_parts(&[major, minor, patch], SmallVec::new())
    }

    fn from_parts(release: &[u64], pre_release: SmallVec<[PreReleaseId; 2]>) -> Self {
        let mut text = release
            .iter()
            .map(u64::to_string)
            .collect::<Vec<_>>()
            .join(".");
        if !pre_release.is_empty() {
            text.push('-');
            text.push_str(
                &pre_release
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("."),
            );
        }
        Self {
            release: SmallVec::from_slice(release),
            pre_release,
            suffix: SmallVec::new(),
            original: Arc::from(text),
        }
    }

    /// Parse a version string.
    ///
    /// # Examples
    ///
    /// ```
    /// use gaia_core::Version;
    ///
    /// let v = Version::parse("5.3.1.RELEASE").unwrap();
    /// assert!(!v.is_prerelease());
    /// assert!(Version::parse("1.0rc1").unwrap() < Version::parse("1.0").unwrap());
    ///
    /// let jre = Version::parse("32.1.3-jre").unwrap();
    /// assert!(!jre.is_prerelease());
    /// assert!(jre > Version::parse("32.1.3").unwrap());
    /// ```
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        let body = trimmed
            .strip_prefix(['v', 'V'])
            .filter(|rest| rest.starts_with(|c: char| c.is_ascii_digit()))
            .unwrap_or(trimmed);
        let body = body.split_once('+').map_or(body, |(head, _)| head);

        if body.is_empty() {
            return Err(Error::invalid_version(input, "empty version"));
        }

        let mut release = SmallVec::<[u64; 4]>::new();
        let mut rest = body;
        loop {
            let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
            if digits == 0 {
                break;
            }
            let component = rest[..digits]
                .parse::<u64>()
                .map_err(|_| Error::invalid_version(input, "numeric component is too large"))?;
            release.push(component);
            rest = &rest[digits..];

            match rest.strip_prefix('.') {
                Some(next) if next.starts_with(|c: char| c.is_ascii_digit()) => rest = next,
                _ => break,
            }
        }

        if release.is_empty() {
            return Err(Error::invalid_version(
                input,
                "must start with a numeric component",
            ));
        }

        let qualifier = Self::parse_qualifier(input, rest)?;
        let (pre_release, suffix) = if is_prerelease_qualifier(&qualifier) {
            (qualifier, SmallVec::new())
        } else {
            (SmallVec::new(), qualifier)
        };

        Ok(Self {
            release,
            pre_release,
            suffix,
            original: Arc::from(trimmed),
        })
    }

    fn parse_qualifier(input: &str, rest: &str) -> Result<SmallVec<[PreReleaseId; 2]>> {
        if rest.is_empty() {
            return Ok(SmallVec::new());
        }

        let qualifier = match rest.as_bytes()[0] {
            b'.' | b'-' | b'_' => &rest[1..],
            c if c.is_ascii_alphabetic() => rest,
            _ => return Err(Error::invalid_version(input, "unexpected character")),
        };

        if qualifier.is_empty() {
            return Err(Error::invalid_version(input, "empty qualifier"));
        }

        let mut ids = SmallVec::new();
        for segment in qualifier.split(['.', '-', '_']) {
            if segment.is_empty() {
                return Err(Error::invalid_version(input, "empty qualifier segment"));
            }
            if !segment.bytes().all(|b| b.is_ascii_alphanumeric()) {
                return Err(Error::invalid_version(
                    input,
                    "qualifier may only contain letters and digits",
                ));
            }
            split_alnum_runs(segment, &mut ids);
        }

        if let [PreReleaseId::Alpha(alias)] = ids.as_slice() {
            if RELEASE_ALIASES.contains(&alias.as_ref()) {
                ids.clear();
            }
        }

        Ok(ids)
    }

    /// Numeric release components as written.
    #[must_use]
    pub fn release(&self) -> &[u64] {
        &self.release
    }

    /// Pre-release identifiers, empty for a release.
    #[must_use]
    pub fn pre_release(&self) -> &[PreReleaseId] {
        &self.pre_release
    }

    /// Release-level qualifier identifiers, such as `jre` in `32.1.3-jre`.
    #[must_use]
    pub fn suffix(&self) -> &[PreReleaseId] {
        &self.suffix
    }

    /// Release component at `index`, zero when absent.
    #[must_use]
    pub fn component(&self, index: usize) -> u64 {
        self.release.get(index).copied().unwrap_or(0)
    }

    /// Major component.
    #[must_use]
    pub fn major(&self) -> u64 {
        self.component(0)
    }

    /// Minor component.
    #[must_use]
    pub fn minor(&self) -> u64 {
        self.component(1)
    }

    /// Patch component.
    #[must_use]
    pub fn patch(&self) -> u64 {
        self.component(2)
    }

    /// Check if this is a pre-release version.
    #[must_use]
    pub fn is_prerelease(&self) -> bool {
        !self.pre_release.is_empty()
    }

    /// The version string as originally written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.original
    }

    /// The lowest version with the given release components.
    ///
    /// Sorts below every pre-release of that release, so it works as an
    /// exclusive upper bound that also excludes those pre-releases.
    #[must_use]
    pub fn floor_of(release: &[u64]) -> Self {
        let mut pre = SmallVec::new();
        pre.push(PreReleaseId::Numeric(0));
        Self::from_parts(release, pre)
    }

    /// Increment the component at `index`, truncating everything after it.
    ///
    /// Returns the floor of the bumped release, e.g. bumping index 0 of
    /// `1.4.2` gives `2.0.0-0`.
    #[must_use]
    pub fn bump_at(&self, index: usize) -> Self {
        let mut release: SmallVec<[u64; 4]> = (0..=index).map(|i| self.component(i)).collect();
        release[index] = release[index].saturating_add(1);
        while release.len() < 3 {
            release.push(0);
        }
        Self::floor_of(&release)
    }

    /// The release with every qualifier stripped.
    #[must_use]
    pub fn to_release(&self) -> Self {
        Self::from_parts(&self.release, SmallVec::new())
    }
}

fn is_prerelease_qualifier(ids: &[PreReleaseId]) -> bool {
    match ids.first() {
        None => false,
        Some(PreReleaseId::Numeric(_)) => true,
        Some(PreReleaseId::Alpha(_)) => ids.iter().any(|id| {
            matches!(id, PreReleaseId::Alpha(word) if PRERELEASE_MARKERS.contains(&word.as_ref()))
        }),
    }
}

fn split_alnum_runs(segment: &str, ids: &mut SmallVec<[PreReleaseId; 2]>) {
    let bytes = segment.as_bytes();
    let mut start = 0;
    for i in 1..=bytes.len() {
        let boundary =
            i == bytes.len() || bytes[i].is_ascii_digit() != bytes[i - 1].is_ascii_digit();
        if boundary {
            let run = &segment[start..i];
            let id = run.parse::<u64>().map_or_else(
                |_| PreReleaseId::Alpha(Arc::from(run.to_ascii_lowercase())),
                PreReleaseId::Numeric,
            );
            ids.push(id);
            start = i;
        }
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl Hash for Version {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Trailing zeros are insignificant for equality, so they must be for hashing too.
        let significant = self
            .release
            .iter()
            .rposition(|&c| c != 0)
            .map_or(0, |last| last + 1);
        self.release[..significant].hash(state);
        self.pre_release.hash(state);
        self.suffix.hash(state);
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.release.len().max(other.release.len());
        for i in 0..len {
            match self.component(i).cmp(&other.component(i)) {
                Ordering::Equal => {}
                ord => return ord,
            }
        }

        // pre-release < bare release < release-level qualifier
        self.qualifier_rank()
            .cmp(&other.qualifier_rank())
            .then_with(|| self.pre_release.cmp(&other.pre_release))
            .then_with(|| self.suffix.cmp(&other.suffix))
    }
}

impl Version {
    fn qualifier_rank(&self) -> u8 {
        if !self.pre_release.is_empty() {
            0
        } else if self.suffix.is_empty() {
            1
        } else {
            2
        }
    }
}

impl fmt::Debug for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Version")
            .field("release", &self.release)
            .field("pre_release", &self.pre_release)
            .field("suffix", &self.suffix)
            .field("original", &self.original)
            .finish()
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.original)
    }
}

impl FromStr for Version {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.original)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}
