//! Core resolution algorithm: lazy graph discovery with combinatorial
//! candidate search and backtracking.
//!
//! Candidate sets are seeded on first sight of a package (an exact pin, a
//! backend listing for open constraints, or the source sentinel), narrowed
//! by every constraint in the frontier, and expanded by fetching the chosen
//! candidates' manifests to discover transitive dependencies. When more than
//! one candidate survives for some package, the Cartesian product of the
//! ambiguous sets is enumerated in discovery order over a cloned state per
//! combination; the first feasible combination wins. Manifests are fetched
//! at most once per (package, version) per run.

use std::collections::HashMap;
use std::sync::Arc;

use semver::Version;

use asbo_core::dependency::{Dependency, ResolvedDependency};
use asbo_core::manifest::Manifest;
use asbo_core::version::{is_valid_version, PinnedVersion, VersionConstraint};
use asbo_repo::backend::BackendProvider;

use crate::conflict::{ConflictError, Requirement};
use crate::state::ResolutionState;

/// The output of resolution: exactly one concrete version per package name
/// across the whole transitive closure, in discovery order.
#[derive(Debug, Clone)]
pub struct Resolution {
    resolved: Vec<Arc<ResolvedDependency>>,
}

impl Resolution {
    pub fn iter(&self) -> impl Iterator<Item = &Arc<ResolvedDependency>> {
        self.resolved.iter()
    }

    pub fn get(&self, package: &str) -> Option<&Arc<ResolvedDependency>> {
        self.resolved.iter().find(|d| d.package == package)
    }

    pub fn len(&self) -> usize {
        self.resolved.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolved.is_empty()
    }
}

/// Result of a memoized manifest lookup.
#[derive(Clone)]
enum ManifestLookup {
    Fetched(Arc<Manifest>),
    /// The package ships no manifest: a leaf with no dependencies.
    Absent,
    /// The backend failed or returned garbage; the candidate is unusable.
    Unavailable,
}

pub struct Resolver<'a> {
    backends: &'a dyn BackendProvider,
    manifests: HashMap<(String, String), ManifestLookup>,
}

impl<'a> Resolver<'a> {
    pub fn new(backends: &'a dyn BackendProvider) -> Self {
        Self {
            backends,
            manifests: HashMap::new(),
        }
    }

    /// Resolve a root frontier of dependencies to one concrete version per
    /// package name, or fail with a [`ConflictError`] naming the package
    /// whose constraints cannot jointly be met.
    pub fn resolve(&mut self, roots: &[Arc<Dependency>]) -> Result<Resolution, ConflictError> {
        self.solve(ResolutionState::new(), roots.to_vec(), 0)
    }

    fn solve(
        &mut self,
        mut state: ResolutionState,
        mut frontier: Vec<Arc<Dependency>>,
        depth: usize,
    ) -> Result<Resolution, ConflictError> {
        // Narrow by every frontier constraint, then expand every pinned
        // candidate's manifest into a new frontier, until neither step has
        // work left. Expansion is deterministic; no branching happens here.
        loop {
            for dep in std::mem::take(&mut frontier) {
                self.apply(&mut state, dep)?;
            }

            let pending = state.pinned_unexpanded();
            if pending.is_empty() {
                break;
            }
            for (package, version) in pending {
                state.mark_expanded(&package, &version);

                // Source pins have no backend to ask; their transitive
                // dependencies surface from the local tree after caching.
                let PinnedVersion::Release(ref release) = version else {
                    continue;
                };

                match self.manifest_for(&package, release) {
                    ManifestLookup::Fetched(manifest) => {
                        let intro = state.requirers(&package)[0].clone();
                        let chosen = Arc::new(intro.pinned(&version));
                        match manifest.dependencies(&intro.target, &intro.profile) {
                            Ok(children) => {
                                for child in children {
                                    frontier.push(Arc::new(child.with_dep_of(chosen.clone())));
                                }
                            }
                            Err(e) => {
                                tracing::warn!(
                                    "Manifest of {package}-{version} declares invalid \
                                     dependencies: {e}"
                                );
                                self.drop_candidate(&mut state, &package, &version)?;
                            }
                        }
                    }
                    ManifestLookup::Absent => {
                        tracing::debug!("{package}-{version} has no manifest; treating as a leaf");
                    }
                    ManifestLookup::Unavailable => {
                        self.drop_candidate(&mut state, &package, &version)?;
                    }
                }
            }
        }

        let ambiguous = state.ambiguous();
        if ambiguous.is_empty() {
            // Every package is pinned and expanded: solved.
            return Ok(finish(&state));
        }

        tracing::debug!(
            "Exploring combinations over {} ambiguous package(s) at depth {depth}",
            ambiguous.len()
        );
        let sets: Vec<(String, Vec<PinnedVersion>)> = ambiguous
            .into_iter()
            .map(|package| {
                let candidates = state.candidates(&package).to_vec();
                (package, candidates)
            })
            .collect();

        let mut indices = vec![0usize; sets.len()];
        let mut last_conflict: Option<ConflictError> = None;
        'combinations: loop {
            let mut branch = state.clone();
            for (i, (package, candidates)) in sets.iter().enumerate() {
                branch.pin(package, &candidates[indices[i]]);
            }

            match self.solve(branch, Vec::new(), depth + 1) {
                Ok(resolution) => return Ok(resolution),
                Err(conflict) => {
                    tracing::debug!("Combination failed: {}", conflict.package);
                    last_conflict = Some(conflict);
                }
            }

            // Advance the combination odometer; the latest-discovered
            // package cycles fastest.
            let mut pos = sets.len() - 1;
            loop {
                indices[pos] += 1;
                if indices[pos] < sets[pos].1.len() {
                    continue 'combinations;
                }
                indices[pos] = 0;
                if pos == 0 {
                    break 'combinations;
                }
                pos -= 1;
            }
        }

        Err(last_conflict.expect("at least one combination was explored"))
    }

    /// Seed the package's candidate set if this is its first sighting, then
    /// narrow by the dependency's constraint.
    fn apply(
        &mut self,
        state: &mut ResolutionState,
        dep: Arc<Dependency>,
    ) -> Result<(), ConflictError> {
        if !state.contains(&dep.package) {
            let candidates = self.seed_candidates(&dep);
            state.seed(&dep.package, candidates);
        }
        tracing::debug!("Applying constraint {dep}");
        let remaining = state.narrow(&dep);
        if remaining == 0 {
            return Err(conflict_for(state, &dep.package, None));
        }
        Ok(())
    }

    fn seed_candidates(&mut self, dep: &Dependency) -> Vec<PinnedVersion> {
        match &dep.constraint {
            VersionConstraint::Source => vec![PinnedVersion::Source],
            VersionConstraint::Exact(version) => vec![PinnedVersion::Release(version.clone())],
            _open => {
                let listed = self
                    .backends
                    .backend_for(&dep.package)
                    .and_then(|backend| backend.list_versions(&dep.package));
                match listed {
                    Ok(listed) => {
                        let mut candidates = Vec::with_capacity(listed.len());
                        for raw in listed {
                            if !is_valid_version(&raw) {
                                tracing::warn!(
                                    "Ignoring invalid version '{raw}' listed for {}",
                                    dep.package
                                );
                                continue;
                            }
                            if let Ok(version) = Version::parse(raw.trim()) {
                                candidates.push(PinnedVersion::Release(version));
                            }
                        }
                        candidates
                    }
                    Err(e) => {
                        tracing::warn!("Failed to list versions for {}: {e}", dep.package);
                        Vec::new()
                    }
                }
            }
        }
    }

    /// Fetch and parse a manifest, memoized per (package, version) per run.
    fn manifest_for(&mut self, package: &str, version: &Version) -> ManifestLookup {
        let key = (package.to_string(), version.to_string());
        if let Some(cached) = self.manifests.get(&key) {
            return cached.clone();
        }

        let lookup = match self
            .backends
            .backend_for(package)
            .and_then(|backend| backend.fetch_manifest(package, version))
        {
            Ok(Some(bytes)) => match std::str::from_utf8(&bytes) {
                Ok(text) => match Manifest::parse_toml(text) {
                    Ok(manifest) => ManifestLookup::Fetched(Arc::new(manifest)),
                    Err(e) => {
                        tracing::warn!("Malformed manifest for {package}-{version}: {e}");
                        ManifestLookup::Unavailable
                    }
                },
                Err(_) => {
                    tracing::warn!("Manifest for {package}-{version} is not valid UTF-8");
                    ManifestLookup::Unavailable
                }
            },
            Ok(None) => ManifestLookup::Absent,
            Err(e) => {
                tracing::warn!("Manifest for {package}-{version} is unavailable: {e}");
                ManifestLookup::Unavailable
            }
        };

        self.manifests.insert(key, lookup.clone());
        lookup
    }

    /// A candidate proved unusable (unfetchable or malformed): remove it and
    /// fail the branch if nothing remains.
    fn drop_candidate(
        &self,
        state: &mut ResolutionState,
        package: &str,
        version: &PinnedVersion,
    ) -> Result<(), ConflictError> {
        tracing::debug!("Dropping unusable candidate {package}-{version}");
        let remaining = state.remove_candidate(package, version);
        if remaining == 0 {
            return Err(conflict_for(
                state,
                package,
                Some(format!("no usable candidate remains for {package}")),
            ));
        }
        Ok(())
    }
}

fn conflict_for(state: &ResolutionState, package: &str, detail: Option<String>) -> ConflictError {
    let requirements = state
        .requirers(package)
        .iter()
        .map(|dep| Requirement::from_dependency(dep))
        .collect();
    let mut conflict = ConflictError::new(package, requirements);
    if let Some(detail) = detail {
        conflict = conflict.with_detail(detail);
    }
    conflict
}

/// Convert a solved state into the flat resolution output.
fn finish(state: &ResolutionState) -> Resolution {
    let resolved = state
        .packages_in_order()
        .map(|package| {
            let candidates = state.candidates(package);
            debug_assert_eq!(candidates.len(), 1);
            let intro = &state.requirers(package)[0];
            Arc::new(ResolvedDependency {
                package: package.to_string(),
                version: candidates[0].clone(),
                profile: intro.profile.clone(),
                target: intro.target.clone(),
                dep_of: intro.dep_of.clone(),
            })
        })
        .collect();
    Resolution { resolved }
}
