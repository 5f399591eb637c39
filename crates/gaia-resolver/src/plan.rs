//! Request planning.
//!
//! Requests are grouped by [`PackageKey`] in first-seen order. Each group's
//! constraints are parsed and intersected before any network traffic, so a
//! key that is malformed or unsatisfiable never costs a lookup.

use gaia_core::{DependencyRequest, Error, PackageKey, Ranges, Scope, Version, VersionConstraint};
use std::collections::HashMap;

/// Deduplicated work for one `resolve` call.
#[derive(Debug)]
pub(crate) struct Plan {
    entries: Vec<PlannedEntry>,
}

/// One unique package.
#[derive(Debug)]
pub(crate) struct PlannedEntry {
    /// Deduplication key.
    pub key: PackageKey,
    /// Name as first declared.
    pub name: String,
    /// Widest scope among the requests.
    pub scope: Scope,
    /// What to do with it.
    pub action: PlannedAction,
}

#[derive(Debug)]
pub(crate) enum PlannedAction {
    /// Fetch versions and select against the constraint.
    Lookup(EffectiveConstraint),
    /// A constraint failed to parse.
    Invalid { expression: String, reason: String },
    /// The constraints cannot be satisfied together.
    Conflict { constraints: Vec<String> },
}

/// Requests sharing a key, before their constraints are examined.
struct Group {
    key: PackageKey,
    name: String,
    scope: Scope,
    expressions: Vec<String>,
}

impl Plan {
    pub(crate) fn build(requests: &[DependencyRequest]) -> Self {
        let mut index: HashMap<PackageKey, usize> = HashMap::new();
        let mut groups: Vec<Group> = Vec::new();

        for request in requests {
            let key = request.key();
            let expression = request.version_constraint.trim().to_string();

            if let Some(group) = index.get(&key).and_then(|&slot| groups.get_mut(slot)) {
                group.scope = group.scope.widest(request.scope);
                if !group.expressions.contains(&expression) {
                    group.expressions.push(expression);
                }
                continue;
            }

            index.insert(key.clone(), groups.len());
            groups.push(Group {
                key,
                name: request.name.trim().to_string(),
                scope: request.scope,
                expressions: vec![expression],
            });
        }

        Self {
            entries: groups.into_iter().map(Group::plan).collect(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn entries(&self) -> &[PlannedEntry] {
        &self.entries
    }

    pub(crate) fn into_entries(self) -> Vec<PlannedEntry> {
        self.entries
    }
}

impl Group {
    fn plan(self) -> PlannedEntry {
        let parsed: Result<Vec<_>, Error> = self
            .expressions
            .iter()
            .map(|expression| VersionConstraint::parse(expression))
            .collect();

        let action = match parsed {
            Ok(constraints) => intersect(self.expressions, constraints),
            Err(Error::InvalidConstraint {
                expression, reason, ..
            }) => PlannedAction::Invalid { expression, reason },
            Err(other) => PlannedAction::Invalid {
                expression: self.expressions.join(", "),
                reason: other.to_string(),
            },
        };

        PlannedEntry {
            key: self.key,
            name: self.name,
            scope: self.scope,
            action,
        }
    }
}

fn intersect(expressions: Vec<String>, constraints: Vec<VersionConstraint>) -> PlannedAction {
    if constraints.len() > 1 {
        let combined = constraints
            .iter()
            .fold(Ranges::full(), |acc, c| acc.intersection(c.ranges()));
        if combined == Ranges::empty() {
            return PlannedAction::Conflict {
                constraints: expressions,
            };
        }
    }

    let narrowest = constraints
        .iter()
        .position(|c| constraints.iter().all(|other| c.is_subset_of(other)));

    let (requested, superseded) = match narrowest {
        Some(slot) => {
            let requested = expressions[slot].clone();
            let superseded = expressions
                .iter()
                .enumerate()
                .filter(|&(i, _)| i != slot)
                .map(|(_, e)| e.clone())
                .collect();
            (requested, superseded)
        }
        // Overlapping but neither contains the other
        None => (expressions.join(", "), expressions.clone()),
    };

    PlannedAction::Lookup(EffectiveConstraint {
        constraints,
        expressions,
        requested,
        superseded,
    })
}

/// The conjunction of every constraint declared for one key.
#[derive(Debug)]
pub(crate) struct EffectiveConstraint {
    constraints: Vec<VersionConstraint>,
    expressions: Vec<String>,
    requested: String,
    superseded: Vec<String>,
}

impl EffectiveConstraint {
    /// Expression reported as the requested constraint.
    pub(crate) fn requested(&self) -> &str {
        &self.requested
    }

    /// Differing expressions folded into this one.
    pub(crate) fn superseded(&self) -> &[String] {
        &self.superseded
    }

    /// Every distinct expression, in declaration order.
    pub(crate) fn expressions(&self) -> &[String] {
        &self.expressions
    }

    /// Whether more than one distinct constraint was declared.
    pub(crate) fn is_combined(&self) -> bool {
        self.constraints.len() > 1
    }

    /// Highest candidate satisfying every constraint.
    ///
    /// A single constraint keeps its own selection rules, including the
    /// pre-release fallback of `Latest`.
    pub(crate) fn select_best<'a>(&self, candidates: &'a [String]) -> Option<&'a str> {
        if let [single] = self.constraints.as_slice() {
            return single.select_best(candidates.iter().map(String::as_str));
        }

        let mut best: Option<(Version, &'a str)> = None;
        for raw in candidates {
            let Ok(version) = Version::parse(raw) else {
                continue;
            };
            if !self.constraints.iter().all(|c| c.matches_version(&version)) {
                continue;
            }
            if best.as_ref().is_none_or(|(current, _)| version > *current) {
                best = Some((version, raw.as_str()));
            }
        }
        best.map(|(_, raw)| raw)
    }
}
