//! Local-filesystem repository driver.
//!
//! Archives live under the workspace at a templated path, e.g.
//! `repo/{package}-{version}.zip`, with the manifest published as a sidecar
//! file next to the archive. Listing walks the template's base directory and
//! runs the template in reverse to mine version strings out of file names.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use semver::Version;

use asbo_core::manifest::MANIFEST_FILE;
use asbo_core::template::PathTemplate;
use asbo_core::workspace::SourceEntry;
use asbo_util::errors::AsboError;

use crate::archive;
use crate::backend::{RepositoryBackend, MANIFEST_SIDECAR_EXTENSION, PACKAGE_EXTENSION};

pub struct FileRepository {
    workspace_root: PathBuf,
    template: PathTemplate,
}

impl FileRepository {
    pub fn from_source(source: &SourceEntry, workspace_root: &Path) -> Result<Self, AsboError> {
        let path = source.path.as_ref().ok_or_else(|| AsboError::Config {
            message: "file sources require a 'path' template".to_string(),
        })?;
        Ok(Self {
            workspace_root: workspace_root.to_path_buf(),
            template: PathTemplate::new(path.clone()),
        })
    }

    fn archive_path(&self, package: &str, version: &str) -> PathBuf {
        self.workspace_root
            .join(self.template.expand(package, version) + PACKAGE_EXTENSION)
    }

    fn sidecar_path(&self, package: &str, version: &str) -> PathBuf {
        self.workspace_root
            .join(self.template.expand(package, version) + MANIFEST_SIDECAR_EXTENSION)
    }

    /// Directory where the listing walk starts: the literal part of the
    /// template, trimmed back to a whole path component.
    fn listing_root(&self) -> PathBuf {
        let prefix = self.template.literal_prefix();
        let dir = match prefix.rfind('/') {
            Some(idx) => &prefix[..idx],
            None => "",
        };
        self.workspace_root.join(dir)
    }

    fn walk(&self, dir: &Path, package: &str, versions: &mut Vec<String>) -> io::Result<()> {
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.is_dir() {
                self.walk(&path, package, versions)?;
            } else if let Ok(rel) = path.strip_prefix(&self.workspace_root) {
                let rel = rel.to_string_lossy().replace('\\', "/");
                if let Some(stem) = rel.strip_suffix(PACKAGE_EXTENSION) {
                    if let Some(version) = self.template.capture_version(package, stem) {
                        versions.push(version);
                    }
                }
            }
        }
        Ok(())
    }
}

impl RepositoryBackend for FileRepository {
    fn list_versions(&self, package: &str) -> Result<Vec<String>, AsboError> {
        let root = self.listing_root();
        if !root.is_dir() {
            tracing::debug!("Listing root {} does not exist", root.display());
            return Ok(Vec::new());
        }
        let mut versions = Vec::new();
        self.walk(&root, package, &mut versions)?;
        tracing::debug!(
            "Found {} archive(s) for {package} under {}",
            versions.len(),
            root.display()
        );
        Ok(versions)
    }

    fn fetch_manifest(
        &self,
        package: &str,
        version: &Version,
    ) -> Result<Option<Vec<u8>>, AsboError> {
        let sidecar = self.sidecar_path(package, &version.to_string());
        if sidecar.is_file() {
            return Ok(Some(fs::read(&sidecar)?));
        }
        let archive_path = self.archive_path(package, &version.to_string());
        if archive_path.is_file() {
            return Ok(archive::read_entry(&archive_path, MANIFEST_FILE).ok());
        }
        Ok(None)
    }

    fn fetch_package(&self, package: &str, version: &Version) -> Result<PathBuf, AsboError> {
        let path = self.archive_path(package, &version.to_string());
        if path.is_file() {
            Ok(path)
        } else {
            Err(not_found(package, version))
        }
    }

    fn publish(
        &self,
        package: &str,
        version: &Version,
        archive: &Path,
        manifest: &Path,
        overwrite: bool,
    ) -> Result<(), AsboError> {
        let target = self.archive_path(package, &version.to_string());
        if target.is_file() && !overwrite {
            return Err(AsboError::PublishConflict {
                package: package.to_string(),
                version: version.to_string(),
            });
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        tracing::debug!("Publishing {package}-{version} to {}", target.display());
        fs::copy(archive, &target)?;
        fs::copy(manifest, self.sidecar_path(package, &version.to_string()))?;
        tracing::info!("Published {package}-{version} to {}", target.display());
        Ok(())
    }
}

fn not_found(package: &str, version: &Version) -> AsboError {
    AsboError::Io(io::Error::new(
        io::ErrorKind::NotFound,
        format!("no archive for {package}-{version} in file repository"),
    ))
}
