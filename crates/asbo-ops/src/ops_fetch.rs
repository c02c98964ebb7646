//! Operation: resolve and download all dependencies.

use std::path::Path;
use std::sync::Arc;

use asbo_core::dependency::{ResolvedDependency, Target};
use asbo_core::manifest::{Manifest, MANIFEST_FILE};
use asbo_core::workspace::WorkspaceConfig;
use asbo_repo::backend::BackendSet;
use asbo_repo::cache::PackageCache;
use asbo_resolver::resolver::Resolver;
use asbo_util::progress::{spinner, status};

/// Counters from a fetch run.
pub struct FetchSummary {
    pub resolved: usize,
    pub downloaded: u32,
    pub up_to_date: u32,
}

/// Resolve the project's dependencies and make sure every resolved package
/// is present in the cache, then re-verify the flattened set for version
/// conflicts against the cached manifests.
pub fn fetch(project_dir: &Path, target: &Target, profile: &str) -> miette::Result<FetchSummary> {
    let manifest = Manifest::from_path(&project_dir.join(MANIFEST_FILE))?;
    let workspace = WorkspaceConfig::discover(project_dir)?;
    let backends = BackendSet::from_config(&workspace)?;
    let cache = PackageCache::new(workspace.cache_root());

    tracing::info!("Resolving dependencies for {}", manifest.name());
    let deps = manifest.dependencies(target, profile)?;
    if deps.is_empty() {
        tracing::debug!("No dependencies declared");
    }

    let sp = spinner("Resolving dependencies...");
    let mut resolver = Resolver::new(&backends);
    let result = resolver.resolve(&deps);
    sp.finish_and_clear();
    let resolution = result.map_err(|conflict| conflict.into_error())?;

    let mut downloaded = 0u32;
    let mut up_to_date = 0u32;
    for dep in resolution.iter() {
        tracing::debug!("Processing dependency {dep}");
        let cached = cache.ensure_cached(dep, &backends)?;
        if cached.freshly_downloaded {
            downloaded += 1;
        } else {
            up_to_date += 1;
        }
    }

    // Cached manifests may disagree with the resolver's view (stale cache);
    // re-verify the invariant over the recursively expanded set.
    let mut flattened: Vec<Arc<ResolvedDependency>> = Vec::new();
    for dep in resolution.iter() {
        flattened.extend(cache.recursive_dependencies(dep));
    }
    cache.check_no_conflicts(&flattened)?;

    status(
        "Fetched",
        &format!(
            "{} dependencies, {downloaded} downloaded, {up_to_date} up-to-date",
            resolution.len()
        ),
    );

    Ok(FetchSummary {
        resolved: resolution.len(),
        downloaded,
        up_to_date,
    })
}
