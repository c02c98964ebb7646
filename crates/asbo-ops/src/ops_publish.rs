//! Operation: package and publish the current project.

use std::path::Path;

use semver::Version;

use asbo_core::manifest::{Manifest, MANIFEST_FILE};
use asbo_core::workspace::WorkspaceConfig;
use asbo_repo::backend::BackendSet;
use asbo_repo::cache::PackageCache;
use asbo_util::progress::status;

use crate::packager::Packager;

/// Package the project and push it to the repository serving it.
///
/// A publish conflict (the version already exists and `overwrite` is false)
/// propagates to the caller untouched.
pub fn publish(project_dir: &Path, version: &Version, overwrite: bool) -> miette::Result<()> {
    let manifest = Manifest::from_path(&project_dir.join(MANIFEST_FILE))?;
    let workspace = WorkspaceConfig::discover(project_dir)?;
    let backends = BackendSet::from_config(&workspace)?;
    let cache = PackageCache::new(workspace.cache_root());

    let packager = Packager::new(&manifest, project_dir, &cache);
    packager.publish(version, &backends, overwrite)?;
    status("Published", &format!("{}-{version}", manifest.name()));
    Ok(())
}
