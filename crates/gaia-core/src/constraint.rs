//! Version constraint parsing and evaluation.
//!
//! Constraints supported:
//! - Exact: `1.2.3`, `=1.2.3`, `==1.2.3`, `[1.2.3]`
//! - Caret: `^1.2.3` (>=1.2.3 <2.0.0, narrower below 1.0)
//! - Tilde: `~1.2.3` (>=1.2.3 <1.3.0), PEP 440 `~=1.4.2` (>=1.4.2 <1.5)
//! - Lower bound: `>=1.0`
//! - Wildcard: `1.x`, `1.2.*`
//! - Comparator sets: `>=1.0 <2.0`, `>1.0, !=1.5`
//! - Hyphen range: `1.0.0 - 2.0.0`
//! - OR: `^1.0 || ^2.0`
//! - Maven intervals: `[1.0,2.0)`, `(,1.0]`, `[1.5,)`, `[1.0,1.2),[1.5,)`
//! - Latest: `latest`, `LATEST`, `RELEASE`, `*` or an empty string
//!
//! Every constraint lowers to a [`Ranges<Version>`] so two constraints can be
//! intersected and compared for narrowness without any registry data.

use crate::error::{Error, Result};
use crate::version::Version;
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;
use version_ranges::Ranges;

/// Keywords that select the newest release.
const LATEST_KEYWORDS: &[&str] = &["latest", "release", "*", "x"];

/// Comparison operators, longest first so `>=` wins over `>`.
const OPERATORS: &[&str] = &[">=", "<=", "~=", "==", "!=", ">", "<", "=", "^", "~"];

/// The shape of a parsed constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstraintKind {
    /// Exactly one version.
    Exact(Version),
    /// Compatible within the leftmost non-zero component.
    Caret(Version),
    /// Compatible within the same minor.
    Tilde(Version),
    /// The version or anything newer.
    GreaterEq(Version),
    /// Any version sharing the given prefix.
    Wildcard(Version),
    /// Comparator sets, unions, hyphen ranges and Maven intervals.
    Range,
    /// The newest available release.
    Latest,
}

/// A parsed version constraint.
#[derive(Clone)]
pub struct VersionConstraint {
    kind: ConstraintKind,
    ranges: Ranges<Version>,
    /// Whether pre-release candidates may match. True only when the
    /// expression itself names a pre-release.
    allows_prerelease: bool,
    original: Arc<str>,
}

impl VersionConstraint {
    /// A constraint selecting the newest release.
    #[must_use]
    pub fn latest() -> Self {
        Self {
            kind: ConstraintKind::Latest,
            ranges: Ranges::full(),
            allows_prerelease: false,
            original: Arc::from("latest"),
        }
    }

    /// A constraint matching exactly one version.
    #[must_use]
    pub fn exact(version: Version) -> Self {
        Self {
            allows_prerelease: version.is_prerelease(),
            original: Arc::from(version.to_string()),
            ranges: Ranges::singleton(version.clone()),
            kind: ConstraintKind::Exact(version),
        }
    }

    /// Parse a constraint expression.
    ///
    /// # Examples
    ///
    /// ```
    /// use gaia_core::VersionConstraint;
    ///
    /// let c = VersionConstraint::parse("^1.2.3").unwrap();
    /// assert!(c.matches("1.9.0"));
    /// assert!(!c.matches("2.0.0"));
    /// assert_eq!(c.select_best(["2.0.0", "1.9.5", "1.2.3"]), Some("1.9.5"));
    /// ```
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() || LATEST_KEYWORDS.contains(&trimmed.to_ascii_lowercase().as_str())
        {
            let mut latest = Self::latest();
            latest.original = Arc::from(trimmed);
            return Ok(latest);
        }

        let mut parser = Parser::new(trimmed);
        let (kind, ranges) = if trimmed.starts_with(['[', '(']) {
            parser.maven_intervals()?
        } else if trimmed.contains("||") {
            parser.disjunction()?
        } else {
            parser.conjunction(trimmed)?
        };

        Ok(Self {
            kind,
            ranges,
            allows_prerelease: parser.saw_prerelease,
            original: Arc::from(trimmed),
        })
    }

    /// The shape of this constraint.
    #[must_use]
    pub const fn kind(&self) -> &ConstraintKind {
        &self.kind
    }

    /// The set of versions this constraint admits, ignoring pre-release policy.
    #[must_use]
    pub const fn ranges(&self) -> &Ranges<Version> {
        &self.ranges
    }

    /// The expression as written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.original
    }

    /// Check if this is the `Latest` constraint.
    #[must_use]
    pub const fn is_latest(&self) -> bool {
        matches!(self.kind, ConstraintKind::Latest)
    }

    /// Check if pre-release candidates may match.
    #[must_use]
    pub const fn allows_prerelease(&self) -> bool {
        self.allows_prerelease
    }

    /// Check a candidate version string.
    ///
    /// A candidate that does not parse never matches.
    #[must_use]
    pub fn matches(&self, candidate: &str) -> bool {
        match Version::parse(candidate) {
            Ok(version) => self.matches_version(&version),
            Err(e) => {
                debug!(candidate, constraint = %self, error = %e, "skipping malformed candidate");
                false
            }
        }
    }

    /// Check a parsed candidate version.
    #[must_use]
    pub fn matches_version(&self, version: &Version) -> bool {
        if version.is_prerelease() && !self.allows_prerelease {
            return false;
        }
        self.ranges.contains(version)
    }

    /// Rank a candidate: its parsed version when it matches, `None` otherwise.
    ///
    /// Higher ranks are better; the best candidate is the maximum rank.
    #[must_use]
    pub fn rank(&self, candidate: &str) -> Option<Version> {
        Version::parse(candidate)
            .ok()
            .filter(|version| self.matches_version(version))
    }

    /// Select the highest candidate satisfying this constraint.
    ///
    /// Input order is not assumed. Among equal versions (`1.0` and `1.0.0`)
    /// the first encountered wins. `Latest` falls back to the highest
    /// pre-release only when no release is present.
    pub fn select_best<'a, I>(&self, candidates: I) -> Option<&'a str>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut best: Option<(Version, &'a str)> = None;
        let mut best_prerelease: Option<(Version, &'a str)> = None;

        for raw in candidates {
            let version = match Version::parse(raw) {
                Ok(version) => version,
                Err(e) => {
                    debug!(candidate = raw, error = %e, "skipping malformed candidate");
                    continue;
                }
            };

            let slot = if self.matches_version(&version) {
                &mut best
            } else if self.is_latest() && version.is_prerelease() {
                &mut best_prerelease
            } else {
                continue;
            };

            if slot.as_ref().is_none_or(|(current, _)| version > *current) {
                *slot = Some((version, raw));
            }
        }

        best.or(best_prerelease).map(|(_, raw)| raw)
    }

    /// Check whether no single version can satisfy both constraints.
    #[must_use]
    pub fn is_disjoint(&self, other: &Self) -> bool {
        self.ranges.intersection(&other.ranges) == Ranges::empty()
    }

    /// Check whether every version admitted here is also admitted by `other`.
    #[must_use]
    pub fn is_subset_of(&self, other: &Self) -> bool {
        self.ranges.intersection(&other.ranges) == self.ranges
    }

    /// Check whether the constraint can match any version at all.
    #[must_use]
    pub fn is_satisfiable(&self) -> bool {
        self.ranges != Ranges::empty()
    }
}

/// Stateful parser tracking whether any operand was a pre-release.
struct Parser<'a> {
    input: &'a str,
    saw_prerelease: bool,
}

impl<'a> Parser<'a> {
    const fn new(input: &'a str) -> Self {
        Self {
            input,
            saw_prerelease: false,
        }
    }

    fn error(&self, reason: impl Into<String>) -> Error {
        Error::invalid_constraint(self.input, reason)
    }

    fn version(&mut self, text: &str, context: &str) -> Result<Version> {
        let text = text.trim();
        if text.is_empty() {
            return Err(self.error(format!("expected a version after '{context}'")));
        }
        let version = Version::parse(text)
            .map_err(|_| self.error(format!("'{text}' is not a valid version after '{context}'")))?;
        if version.is_prerelease() {
            self.saw_prerelease = true;
        }
        Ok(version)
    }

    /// `a || b || c`
    fn disjunction(&mut self) -> Result<(ConstraintKind, Ranges<Version>)> {
        let input = self.input;
        let mut ranges = Ranges::empty();
        for part in input.split("||") {
            let part = part.trim();
            if part.is_empty() {
                return Err(self.error("empty alternative in '||'"));
            }
            let (_, alternative) = self.conjunction(part)?;
            ranges = ranges.union(&alternative);
        }
        Ok((ConstraintKind::Range, ranges))
    }

    /// Comparators joined by whitespace or commas, or a hyphen range.
    fn conjunction(&mut self, input: &str) -> Result<(ConstraintKind, Ranges<Version>)> {
        let owned = split_comparators(input);
        let tokens: Vec<&str> = owned.iter().map(String::as_str).collect();

        if let [lower, "-", upper] = tokens.as_slice() {
            return self.hyphen_range(lower, upper);
        }

        match tokens.as_slice() {
            [] => Err(self.error("empty constraint")),
            [single] => self.comparator(single),
            many => {
                let mut ranges = Ranges::full();
                for token in many {
                    let (_, parsed) = self.comparator(token)?;
                    ranges = ranges.intersection(&parsed);
                }
                Ok((ConstraintKind::Range, ranges))
            }
        }
    }

    /// `1.2.3 - 2.3.4`, inclusive; a partial upper bound covers its whole prefix.
    fn hyphen_range(&mut self, lower: &str, upper: &str) -> Result<(ConstraintKind, Ranges<Version>)> {
        let lower = self.version(lower, "-")?;
        let upper = self.version(upper, "-")?;
        let upper_range = if upper.release().len() < 3 && !upper.is_prerelease() {
            Ranges::strictly_lower_than(upper.bump_at(upper.release().len() - 1))
        } else {
            Ranges::lower_than(upper)
        };
        Ok((
            ConstraintKind::Range,
            Ranges::higher_than(lower).intersection(&upper_range),
        ))
    }

    fn comparator(&mut self, token: &str) -> Result<(ConstraintKind, Ranges<Version>)> {
        if LATEST_KEYWORDS.contains(&token.to_ascii_lowercase().as_str()) {
            return Ok((ConstraintKind::Latest, Ranges::full()));
        }

        let (op, operand) = OPERATORS
            .iter()
            .find_map(|op| token.strip_prefix(op).map(|rest| (*op, rest.trim())))
            .unwrap_or(("", token));

        if let Some(prefix) = wildcard_prefix(operand) {
            return match op {
                "" | "=" | "==" => self.wildcard(prefix),
                _ => Err(self.error(format!("wildcard cannot follow '{op}'"))),
            };
        }

        let context = if op.is_empty() { "constraint" } else { op };
        let version = self.version(operand, context)?;

        let parsed = match op {
            "" | "=" | "==" => (
                ConstraintKind::Exact(version.clone()),
                Ranges::singleton(version),
            ),
            ">=" => (
                ConstraintKind::GreaterEq(version.clone()),
                Ranges::higher_than(version),
            ),
            ">" => (ConstraintKind::Range, Ranges::strictly_higher_than(version)),
            "<=" => (ConstraintKind::Range, Ranges::lower_than(version)),
            "<" => (ConstraintKind::Range, Ranges::strictly_lower_than(version)),
            "!=" => (ConstraintKind::Range, Ranges::singleton(version).complement()),
            "^" => {
                let upper = version.bump_at(caret_index(&version));
                (
                    ConstraintKind::Caret(version.clone()),
                    Ranges::between(version, upper),
                )
            }
            "~" => {
                let index = usize::from(version.release().len() > 1);
                let upper = version.bump_at(index);
                (
                    ConstraintKind::Tilde(version.clone()),
                    Ranges::between(version, upper),
                )
            }
            "~=" => {
                let written = version.release().len();
                if written < 2 {
                    return Err(self.error("'~=' needs at least two release components"));
                }
                let upper = version.bump_at(written - 2);
                (
                    ConstraintKind::Tilde(version.clone()),
                    Ranges::between(version, upper),
                )
            }
            _ => return Err(self.error(format!("unknown operator '{op}'"))),
        };
        Ok(parsed)
    }

    fn wildcard(&mut self, prefix: &str) -> Result<(ConstraintKind, Ranges<Version>)> {
        let components = prefix
            .split('.')
            .map(|part| part.parse::<u64>())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|_| self.error(format!("'{prefix}' is not a numeric wildcard prefix")))?;

        let mut padded = components.clone();
        while padded.len() < 3 {
            padded.push(0);
        }
        let lower = Version::floor_of(&padded);
        let upper = lower.bump_at(components.len() - 1);
        Ok((
            ConstraintKind::Wildcard(lower.to_release()),
            Ranges::between(lower, upper),
        ))
    }

    /// One or more Maven intervals separated by commas.
    fn maven_intervals(&mut self) -> Result<(ConstraintKind, Ranges<Version>)> {
        let mut rest = self.input;
        let mut ranges = Ranges::empty();
        let mut intervals = 0usize;
        let mut kind = ConstraintKind::Range;

        while !rest.is_empty() {
            let open = rest.as_bytes()[0];
            if open != b'[' && open != b'(' {
                return Err(self.error("expected '[' or '(' to open an interval"));
            }
            let close_at = rest
                .find([']', ')'])
                .ok_or_else(|| self.error("unterminated interval"))?;
            let close = rest.as_bytes()[close_at];
            let body = &rest[1..close_at];

            let interval = match body.split_once(',') {
                None => {
                    if open != b'[' || close != b']' {
                        return Err(self.error("a single-version interval must use '[v]'"));
                    }
                    let version = self.version(body, "[")?;
                    kind = ConstraintKind::Exact(version.clone());
                    Ranges::singleton(version)
                }
                Some((low, high)) => {
                    let lower = if low.trim().is_empty() {
                        Ranges::full()
                    } else {
                        let v = self.version(low, "[")?;
                        if open == b'[' {
                            Ranges::higher_than(v)
                        } else {
                            Ranges::strictly_higher_than(v)
                        }
                    };
                    let upper = if high.trim().is_empty() {
                        Ranges::full()
                    } else {
                        let v = self.version(high, ",")?;
                        if close == b']' {
                            Ranges::lower_than(v)
                        } else {
                            Ranges::strictly_lower_than(v)
                        }
                    };
                    lower.intersection(&upper)
                }
            };

            ranges = ranges.union(&interval);
            intervals += 1;

            rest = rest[close_at + 1..].trim_start();
            if let Some(next) = rest.strip_prefix(',') {
                rest = next.trim_start();
                if rest.is_empty() {
                    return Err(self.error("trailing ',' after interval"));
                }
            } else if !rest.is_empty() {
                return Err(self.error("intervals must be separated by ','"));
            }
        }

        if intervals > 1 {
            kind = ConstraintKind::Range;
        }
        Ok((kind, ranges))
    }
}

/// Index of the component a caret range may not change.
///
/// `^1.2.3` locks the major, `^0.2.3` the minor and `^0.0.3` the patch.
/// Components that were not written are free: `^0.0` allows `<0.1.0`.
fn caret_index(version: &Version) -> usize {
    let written = version.release().len();
    if version.major() > 0 || written == 1 {
        0
    } else if version.minor() > 0 || written == 2 {
        1
    } else {
        2
    }
}

/// Strip a trailing `.*`, `.x` or `.X`, returning the numeric prefix.
fn wildcard_prefix(operand: &str) -> Option<&str> {
    [".*", ".x", ".X"]
        .iter()
        .find_map(|suffix| operand.strip_suffix(suffix))
        .filter(|prefix| !prefix.is_empty())
}

/// Split a comparator set into tokens, re-attaching detached operators
/// (`>= 1.0` becomes `>=1.0`).
fn split_comparators(input: &str) -> Vec<String> {
    let raw: Vec<&str> = input
        .split([',', ' ', '\t'])
        .filter(|s| !s.is_empty())
        .collect();

    let mut merged = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        let part = raw[i];
        if OPERATORS.contains(&part) && i + 1 < raw.len() {
            merged.push(format!("{part}{}", raw[i + 1]));
            i += 2;
            continue;
        }
        merged.push(part.to_string());
        i += 1;
    }
    merged
}

impl fmt::Debug for VersionConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VersionConstraint")
            .field("original", &self.original)
            .field("kind", &self.kind)
            .field("allows_prerelease", &self.allows_prerelease)
            .finish()
    }
}

impl fmt::Display for VersionConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.original)
    }
}

impl PartialEq for VersionConstraint {
    fn eq(&self, other: &Self) -> bool {
        self.ranges == other.ranges && self.allows_prerelease == other.allows_prerelease
    }
}

impl Eq for VersionConstraint {}

impl FromStr for VersionConstraint {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for VersionConstraint {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.original)
    }
}
