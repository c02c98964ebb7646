//! On-disk package cache with a deterministic layout.
//!
//! Every cached package lives at `cache_root/<package>-<version>/` and
//! contains its manifest, headers under `inc/`, binaries under
//! `bin/<arch>-<abi>-<profile>/`, and libraries under `lib/`. The layout is
//! a compatibility surface: external tooling inspects it directly. Paths are
//! computed, never stored; re-caching a version replaces the directory
//! wholesale.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use semver::Version;

use asbo_core::dependency::{Dependency, ResolvedDependency};
use asbo_core::manifest::{Manifest, MANIFEST_FILE};
use asbo_core::version::{PinnedVersion, VersionConstraint};
use asbo_util::errors::AsboError;

use crate::archive;
use crate::backend::BackendProvider;

/// The workspace package cache.
#[derive(Debug, Clone)]
pub struct PackageCache {
    root: PathBuf,
}

/// A package present in the cache.
#[derive(Debug, Clone)]
pub struct CachedPackage {
    pub dependency: Arc<ResolvedDependency>,
    pub root: PathBuf,
    /// Whether this call downloaded and extracted the package.
    pub freshly_downloaded: bool,
}

impl PackageCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Cache directory of a (package, version) pair.
    pub fn package_dir(&self, package: &str, version: &PinnedVersion) -> PathBuf {
        self.root.join(format!("{package}-{version}"))
    }

    /// Cache directory of a resolved dependency.
    pub fn dependency_dir(&self, dep: &ResolvedDependency) -> PathBuf {
        self.package_dir(&dep.package, &dep.version)
    }

    /// Path of the manifest embedded in a cached package.
    pub fn manifest_path(&self, dep: &ResolvedDependency) -> PathBuf {
        self.dependency_dir(dep).join(MANIFEST_FILE)
    }

    /// Header directory of a cached package.
    pub fn headers_dir(&self, dep: &ResolvedDependency) -> PathBuf {
        self.dependency_dir(dep).join("inc")
    }

    /// Unqualified binaries root of a cached package.
    pub fn binaries_dir(&self, dep: &ResolvedDependency) -> PathBuf {
        self.dependency_dir(dep).join("bin")
    }

    /// Arch/ABI/profile-qualified binaries directory of a cached package.
    pub fn artifacts_dir(&self, dep: &ResolvedDependency) -> PathBuf {
        self.binaries_dir(dep)
            .join(format!("{}-{}", dep.target, dep.profile))
    }

    /// Library directory of a cached package.
    pub fn lib_dir(&self, dep: &ResolvedDependency) -> PathBuf {
        self.dependency_dir(dep).join("lib")
    }

    /// Whether the dependency is already present in the cache.
    pub fn is_cached(&self, dep: &ResolvedDependency) -> bool {
        self.dependency_dir(dep).is_dir()
    }

    /// Make sure a dependency is present in the cache, downloading and
    /// extracting it if necessary.
    ///
    /// Source dependencies are never fetched: if absent, the caller must
    /// build them locally first.
    pub fn ensure_cached(
        &self,
        dep: &Arc<ResolvedDependency>,
        backends: &dyn BackendProvider,
    ) -> Result<CachedPackage, AsboError> {
        if self.is_cached(dep) {
            tracing::debug!("Dependency {dep} is already cached");
            return Ok(CachedPackage {
                dependency: dep.clone(),
                root: self.dependency_dir(dep),
                freshly_downloaded: false,
            });
        }

        let version = match &dep.version {
            PinnedVersion::Source => {
                return Err(AsboError::MissingSource {
                    package: dep.package.clone(),
                });
            }
            PinnedVersion::Release(v) => v,
        };

        tracing::info!("Downloading {dep}");
        let backend = backends.backend_for(&dep.package)?;
        let archive_path = backend.fetch_package(&dep.package, version)?;
        if let Ok(digest) = asbo_util::hash::sha256_file(&archive_path) {
            tracing::debug!("Archive for {dep}: sha256 {digest}");
        }

        let dest = self.dependency_dir(dep);
        if dest.exists() {
            fs::remove_dir_all(&dest)?;
        }
        fs::create_dir_all(&dest)?;
        tracing::info!("Extracting {dep}");
        archive::extract(&archive_path, &dest)?;

        Ok(CachedPackage {
            dependency: dep.clone(),
            root: dest,
            freshly_downloaded: true,
        })
    }

    /// Release versions of `package` currently present in the cache.
    pub fn cached_versions(&self, package: &str) -> Vec<Version> {
        let prefix = format!("{package}-");
        let mut versions = Vec::new();
        if let Ok(entries) = fs::read_dir(&self.root) {
            for entry in entries.flatten() {
                if !entry.path().is_dir() {
                    continue;
                }
                let name = entry.file_name();
                let Some(rest) = name.to_string_lossy().strip_prefix(&prefix).map(String::from)
                else {
                    continue;
                };
                if let Ok(version) = Version::parse(&rest) {
                    versions.push(version);
                }
            }
        }
        versions.sort();
        versions.reverse();
        versions
    }

    /// Flatten a dependency into itself plus its recursively expanded
    /// dependencies, depth-first, by walking the manifests embedded in
    /// cached packages.
    ///
    /// A cached package without a manifest is treated as a leaf with a
    /// warning, never an error.
    pub fn recursive_dependencies(
        &self,
        dep: &Arc<ResolvedDependency>,
    ) -> Vec<Arc<ResolvedDependency>> {
        let mut visited = HashSet::new();
        self.recursive_dependencies_inner(dep, &mut visited)
    }

    fn recursive_dependencies_inner(
        &self,
        dep: &Arc<ResolvedDependency>,
        visited: &mut HashSet<(String, String)>,
    ) -> Vec<Arc<ResolvedDependency>> {
        let mut result = vec![dep.clone()];
        if !visited.insert((dep.package.clone(), dep.version.to_string())) {
            return result;
        }

        let manifest_path = self.manifest_path(dep);
        if !manifest_path.is_file() {
            tracing::warn!("Unable to find manifest for {dep}");
            return result;
        }
        let manifest = match Manifest::from_path(&manifest_path) {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!("Ignoring unreadable manifest for {dep}: {e}");
                return result;
            }
        };

        let children = match manifest.dependencies(&dep.target, &dep.profile) {
            Ok(children) => children,
            Err(e) => {
                tracing::warn!("Ignoring malformed dependencies of {dep}: {e}");
                return result;
            }
        };

        let requirement = Arc::new(dep.as_requirement());
        for child in children {
            let Some(version) = self.pin_cached(&child) else {
                tracing::warn!(
                    "No cached version satisfies {child} (required by {dep}); treating as a leaf"
                );
                continue;
            };
            let resolved = Arc::new(ResolvedDependency {
                package: child.package.clone(),
                version,
                profile: child.profile.clone(),
                target: child.target.clone(),
                dep_of: Some(requirement.clone()),
            });
            result.extend(self.recursive_dependencies_inner(&resolved, visited));
        }
        result
    }

    /// Pin a cached manifest's dependency line to a concrete version: exact
    /// and source constraints pin directly, open constraints resolve against
    /// what is currently in the cache (newest satisfying version).
    fn pin_cached(&self, dep: &Dependency) -> Option<PinnedVersion> {
        match &dep.constraint {
            VersionConstraint::Source => Some(PinnedVersion::Source),
            VersionConstraint::Exact(v) => Some(PinnedVersion::Release(v.clone())),
            constraint => self
                .cached_versions(&dep.package)
                .into_iter()
                .find(|v| constraint.satisfies(v))
                .map(PinnedVersion::Release),
        }
    }

    /// Verify that a flattened dependency list assigns one version per
    /// package name.
    ///
    /// This re-checks the resolver's output invariant after recursive
    /// expansion, in case cached manifests disagree with the resolver's
    /// view (e.g. a stale cache).
    pub fn check_no_conflicts(&self, deps: &[Arc<ResolvedDependency>]) -> Result<(), AsboError> {
        let mut by_package: BTreeMap<&str, Vec<&Arc<ResolvedDependency>>> = BTreeMap::new();
        for dep in deps {
            by_package.entry(dep.package.as_str()).or_default().push(dep);
        }

        for (package, group) in by_package {
            let mut versions: Vec<String> = group.iter().map(|d| d.version.to_string()).collect();
            versions.sort();
            versions.dedup();
            if versions.len() > 1 {
                let mut lines = Vec::new();
                for dep in &group {
                    let chain = dep.requirer_chain();
                    if chain.is_empty() {
                        lines.push(format!("{} (required by the project)", dep.version));
                    } else {
                        lines.push(format!(
                            "{} (required by {})",
                            dep.version,
                            chain.join(", which is required by ")
                        ));
                    }
                }
                return Err(AsboError::Resolution {
                    message: format!(
                        "cached dependencies pin {package} to multiple versions:\n  {}",
                        lines.join("\n  ")
                    ),
                });
            }
        }
        Ok(())
    }

    /// Delete the entire cache. Returns the number of bytes freed.
    pub fn clobber(&self) -> Result<u64, AsboError> {
        if !self.root.is_dir() {
            return Ok(0);
        }
        let freed = asbo_util::fs::dir_size(&self.root);
        tracing::info!("Clobbering cache dir {}", self.root.display());
        fs::remove_dir_all(&self.root)?;
        Ok(freed)
    }

    /// Number of cached package directories.
    pub fn entry_count(&self) -> usize {
        fs::read_dir(&self.root)
            .map(|entries| entries.flatten().filter(|e| e.path().is_dir()).count())
            .unwrap_or(0)
    }

    /// Total size of the cache in bytes.
    pub fn size(&self) -> u64 {
        asbo_util::fs::dir_size(&self.root)
    }
}
