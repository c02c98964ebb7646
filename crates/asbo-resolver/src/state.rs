//! Resolution working state: per-package candidate sets that only narrow.
//!
//! Backtracking clones the state once per explored combination, so the
//! representation is built for cheap structural copies: each package's
//! candidate set lives behind an `Arc`, cloning the state bumps reference
//! counts, and narrowing copies-on-write only the package it touches.
//! Candidate sets are kept sorted descending so the first combination tried
//! is the per-package-newest one.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use asbo_core::dependency::Dependency;
use asbo_core::version::PinnedVersion;

/// The candidates still viable for one package name, plus every dependency
/// whose constraint has been applied to them.
#[derive(Debug, Clone)]
pub struct PackageState {
    /// Viable versions, sorted descending. Only ever shrinks.
    pub candidates: Vec<PinnedVersion>,
    /// Dependencies that constrained this package, in application order.
    /// The first entry is the dependency that introduced the package.
    pub requirers: Vec<Arc<Dependency>>,
}

/// Mapping from package name to its narrowing candidate set.
#[derive(Debug, Clone, Default)]
pub struct ResolutionState {
    packages: HashMap<String, Arc<PackageState>>,
    /// Package names in discovery order, for deterministic enumeration.
    order: Vec<String>,
    /// (package, version) pairs whose manifest has been expanded.
    expanded: BTreeSet<(String, String)>,
}

impl ResolutionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, package: &str) -> bool {
        self.packages.contains_key(package)
    }

    pub fn get(&self, package: &str) -> Option<&PackageState> {
        self.packages.get(package).map(Arc::as_ref)
    }

    pub fn candidates(&self, package: &str) -> &[PinnedVersion] {
        self.get(package).map(|s| s.candidates.as_slice()).unwrap_or(&[])
    }

    pub fn requirers(&self, package: &str) -> &[Arc<Dependency>] {
        self.get(package).map(|s| s.requirers.as_slice()).unwrap_or(&[])
    }

    /// Package names in discovery order.
    pub fn packages_in_order(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// First sighting of a package: record its initial candidate set.
    pub fn seed(&mut self, package: &str, mut candidates: Vec<PinnedVersion>) {
        debug_assert!(!self.contains(package));
        candidates.sort_by(|a, b| b.cmp(a));
        candidates.dedup();
        self.packages.insert(
            package.to_string(),
            Arc::new(PackageState {
                candidates,
                requirers: Vec::new(),
            }),
        );
        self.order.push(package.to_string());
    }

    /// Apply one dependency's constraint to its package's candidate set,
    /// recording the requirer. Returns the number of candidates remaining.
    pub fn narrow(&mut self, dep: &Arc<Dependency>) -> usize {
        let entry = self
            .packages
            .get(&dep.package)
            .expect("narrow is only applied to seeded packages");
        let mut updated = (**entry).clone();
        updated
            .candidates
            .retain(|pin| dep.constraint.satisfied_by(pin));
        updated.requirers.push(dep.clone());
        let remaining = updated.candidates.len();
        self.packages.insert(dep.package.clone(), Arc::new(updated));
        remaining
    }

    /// Pin a package to a single candidate (it must currently be viable).
    pub fn pin(&mut self, package: &str, version: &PinnedVersion) {
        let entry = self
            .packages
            .get(package)
            .expect("pin is only applied to seeded packages");
        debug_assert!(entry.candidates.contains(version));
        let mut updated = (**entry).clone();
        updated.candidates.retain(|pin| pin == version);
        self.packages.insert(package.to_string(), Arc::new(updated));
    }

    /// Remove one candidate that turned out to be unusable. Returns the
    /// number of candidates remaining.
    pub fn remove_candidate(&mut self, package: &str, version: &PinnedVersion) -> usize {
        let entry = self
            .packages
            .get(package)
            .expect("remove_candidate is only applied to seeded packages");
        let mut updated = (**entry).clone();
        updated.candidates.retain(|pin| pin != version);
        let remaining = updated.candidates.len();
        self.packages.insert(package.to_string(), Arc::new(updated));
        remaining
    }

    pub fn mark_expanded(&mut self, package: &str, version: &PinnedVersion) {
        self.expanded
            .insert((package.to_string(), version.to_string()));
    }

    fn is_expanded(&self, package: &str, version: &PinnedVersion) -> bool {
        self.expanded
            .contains(&(package.to_string(), version.to_string()))
    }

    /// Packages pinned to a single candidate whose manifest has not been
    /// expanded yet, in discovery order.
    pub fn pinned_unexpanded(&self) -> Vec<(String, PinnedVersion)> {
        self.order
            .iter()
            .filter_map(|package| {
                let state = self.packages.get(package)?;
                match state.candidates.as_slice() {
                    [version] if !self.is_expanded(package, version) => {
                        Some((package.clone(), version.clone()))
                    }
                    _ => None,
                }
            })
            .collect()
    }

    /// Packages with more than one viable candidate, in discovery order.
    pub fn ambiguous(&self) -> Vec<String> {
        self.order
            .iter()
            .filter(|package| {
                self.packages
                    .get(*package)
                    .map(|s| s.candidates.len() > 1)
                    .unwrap_or(false)
            })
            .cloned()
            .collect()
    }
}
