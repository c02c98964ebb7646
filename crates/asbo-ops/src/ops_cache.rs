//! Operation: cache the current project and maintain the workspace cache.

use std::path::Path;

use asbo_core::manifest::{Manifest, MANIFEST_FILE};
use asbo_core::version::PinnedVersion;
use asbo_core::workspace::WorkspaceConfig;
use asbo_repo::cache::PackageCache;
use asbo_util::progress::status;

use crate::packager::Packager;

/// Stage the current project into the cache under the given version.
pub fn cache_project(project_dir: &Path, version: &PinnedVersion) -> miette::Result<()> {
    let manifest = Manifest::from_path(&project_dir.join(MANIFEST_FILE))?;
    let workspace = WorkspaceConfig::discover(project_dir)?;
    let cache = PackageCache::new(workspace.cache_root());

    let packager = Packager::new(&manifest, project_dir, &cache);
    let dest = packager.cache_project(version)?;
    status(
        "Cached",
        &format!("{}-{version} at {}", manifest.name(), dest.display()),
    );
    Ok(())
}

/// Print cache statistics.
pub fn stats(project_dir: &Path) -> miette::Result<()> {
    let workspace = WorkspaceConfig::discover(project_dir)?;
    let cache = PackageCache::new(workspace.cache_root());

    println!("Package cache: {}", cache.root().display());
    println!("  Packages: {}", cache.entry_count());
    println!("  Size:     {}", format_size(cache.size()));
    Ok(())
}

/// Delete the whole cache.
pub fn clobber(project_dir: &Path) -> miette::Result<()> {
    let workspace = WorkspaceConfig::discover(project_dir)?;
    let cache = PackageCache::new(workspace.cache_root());

    tracing::info!("Clobbering cache dir. This could take a while...");
    let freed = cache.clobber()?;
    status("Removed", &format!("cache ({} freed)", format_size(freed)));
    Ok(())
}

fn format_size(bytes: u64) -> String {
    if bytes >= 1024 * 1024 * 1024 {
        format!("{:.1} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    } else if bytes >= 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else if bytes >= 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{bytes} B")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_size_units() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.0 MB");
    }
}
