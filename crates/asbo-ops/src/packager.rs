//! Packaging: staging a source tree per the manifest's publish rules,
//! encoding it into an archive, caching the current project, and publishing
//! through a repository backend.

use std::fs;
use std::path::{Path, PathBuf};

use globset::Glob;
use semver::Version;

use asbo_core::manifest::{Manifest, MANIFEST_FILE};
use asbo_core::version::PinnedVersion;
use asbo_repo::archive;
use asbo_repo::backend::BackendProvider;
use asbo_repo::cache::PackageCache;
use asbo_util::errors::AsboError;

pub struct Packager<'a> {
    manifest: &'a Manifest,
    project_dir: &'a Path,
    cache: &'a PackageCache,
}

impl<'a> Packager<'a> {
    pub fn new(manifest: &'a Manifest, project_dir: &'a Path, cache: &'a PackageCache) -> Self {
        Self {
            manifest,
            project_dir,
            cache,
        }
    }

    /// Copy the manifest and everything selected by the publish rules from
    /// the project tree into `dest`.
    ///
    /// Rules apply in declaration order; a later rule may overwrite files
    /// placed by an earlier one.
    pub fn stage(&self, dest: &Path) -> Result<(), AsboError> {
        fs::create_dir_all(dest)?;
        fs::copy(
            self.project_dir.join(MANIFEST_FILE),
            dest.join(MANIFEST_FILE),
        )?;

        // Snapshot the file list up front: dest may live under the same
        // workspace and must not be re-walked while being filled.
        let mut files = Vec::new();
        collect_relative_files(self.project_dir, self.project_dir, &mut files)?;
        files.sort();

        for rule in self.manifest.publish_rules() {
            tracing::debug!("Processing rule {} => {}", rule.pattern, rule.dest);
            let matcher = Glob::new(&rule.pattern)
                .map_err(|e| AsboError::Manifest {
                    message: format!("Invalid publish pattern '{}': {e}", rule.pattern),
                })?
                .compile_matcher();
            let prefix = glob_prefix(&rule.pattern);

            for rel in &files {
                if !matcher.is_match(rel) {
                    continue;
                }
                let tail = rel.strip_prefix(prefix).unwrap_or(rel.as_str());
                let target = dest.join(&rule.dest).join(tail);
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::copy(self.project_dir.join(rel), &target)?;
            }
        }
        Ok(())
    }

    /// Stage the project into a scratch directory and encode it as an
    /// archive at `output`.
    pub fn package(&self, output: &Path) -> Result<(), AsboError> {
        let staging = tempfile::tempdir()?;
        self.stage(staging.path())?;
        tracing::debug!("Creating archive {}", output.display());
        archive::create(staging.path(), output)
    }

    /// Stage the current project straight into its cache directory,
    /// replacing any prior cache entry for that version.
    pub fn cache_project(&self, version: &PinnedVersion) -> Result<PathBuf, AsboError> {
        let dest = self.cache.package_dir(self.manifest.name(), version);
        tracing::info!("Caching {} to {}", self.manifest.name(), dest.display());
        if dest.is_dir() && !version.is_source() {
            tracing::warn!("Overwriting previously-cached copy of version {version}");
        }
        if dest.exists() {
            fs::remove_dir_all(&dest)?;
        }
        self.stage(&dest)?;
        Ok(dest)
    }

    /// Package the project and push it through the backend serving it.
    ///
    /// A [`AsboError::PublishConflict`] from the backend propagates to the
    /// caller untouched.
    pub fn publish(
        &self,
        version: &Version,
        backends: &dyn BackendProvider,
        overwrite: bool,
    ) -> Result<(), AsboError> {
        let scratch = tempfile::tempdir()?;
        let zip = scratch
            .path()
            .join(format!("{}-{version}.zip", self.manifest.name()));
        self.package(&zip)?;

        let backend = backends.backend_for(self.manifest.name())?;
        backend.publish(
            self.manifest.name(),
            version,
            &zip,
            &self.project_dir.join(MANIFEST_FILE),
            overwrite,
        )
    }
}

/// The literal directory part of a glob pattern, up to the first
/// metacharacter, trimmed back to a whole path component.
fn glob_prefix(pattern: &str) -> &str {
    let meta = pattern
        .find(['*', '?', '[', '{'])
        .unwrap_or(pattern.len());
    match pattern[..meta].rfind('/') {
        Some(idx) => &pattern[..=idx],
        None => "",
    }
}

fn collect_relative_files(
    root: &Path,
    dir: &Path,
    out: &mut Vec<String>,
) -> Result<(), AsboError> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            collect_relative_files(root, &path, out)?;
        } else if let Ok(rel) = path.strip_prefix(root) {
            out.push(rel.to_string_lossy().replace('\\', "/"));
        }
    }
    Ok(())
}
