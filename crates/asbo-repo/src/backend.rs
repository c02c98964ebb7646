//! The repository backend contract and driver dispatch.
//!
//! Backends are selected per package name from the workspace configuration.
//! Dispatch over the closed driver set happens once, when the [`BackendSet`]
//! is constructed; resolution and caching only ever see the trait.

use std::path::{Path, PathBuf};

use semver::Version;

use asbo_core::workspace::{Driver, SourceEntry, WorkspaceConfig};
use asbo_util::errors::AsboError;

use crate::file::FileRepository;
use crate::ftp::FtpRepository;
use crate::teamcity::TeamCityRepository;

/// File extension of package archives.
pub const PACKAGE_EXTENSION: &str = ".zip";

/// Suffix of the manifest sidecar published next to an archive.
pub const MANIFEST_SIDECAR_EXTENSION: &str = ".asbo.toml";

/// A remote (or local) package repository.
///
/// All operations are blocking; failures surface as `Io`/`Network`/`Auth`
/// errors. During resolution any such failure for one candidate means "this
/// candidate is unavailable" and exploration continues; outside resolution
/// the error is surfaced directly.
pub trait RepositoryBackend {
    /// List the version strings this repository knows for `package`.
    ///
    /// Best-effort: entries are returned as listed; callers drop strings
    /// that are not valid semantic versions.
    fn list_versions(&self, package: &str) -> Result<Vec<String>, AsboError>;

    /// Fetch the manifest of a specific package version without downloading
    /// the whole archive.
    ///
    /// `Ok(None)` means the package exists but ships no manifest — it is a
    /// leaf with no dependencies of its own.
    fn fetch_manifest(
        &self,
        package: &str,
        version: &Version,
    ) -> Result<Option<Vec<u8>>, AsboError>;

    /// Download the package archive, returning a local path to it.
    fn fetch_package(&self, package: &str, version: &Version) -> Result<PathBuf, AsboError>;

    /// Publish an archive and its manifest at (package, version).
    ///
    /// Fails with [`AsboError::PublishConflict`] when the package already
    /// exists at that exact version and `overwrite` is false.
    fn publish(
        &self,
        package: &str,
        version: &Version,
        archive: &Path,
        manifest: &Path,
        overwrite: bool,
    ) -> Result<(), AsboError>;
}

/// Provides the backend serving a given package name.
pub trait BackendProvider {
    fn backend_for(&self, package: &str) -> Result<&dyn RepositoryBackend, AsboError>;
}

/// All backends of a workspace, constructed up front from its configuration.
///
/// Construction is where the driver identifier is dispatched; an unknown
/// driver never reaches this point because [`Driver`] is a closed enum.
pub struct BackendSet {
    entries: Vec<(globset::GlobMatcher, Box<dyn RepositoryBackend>)>,
}

impl BackendSet {
    pub fn from_config(config: &WorkspaceConfig) -> Result<Self, AsboError> {
        let mut entries = Vec::with_capacity(config.sources.len());
        for source in &config.sources {
            let matcher = globset::Glob::new(&source.packages)
                .map_err(|e| AsboError::Config {
                    message: format!("Invalid package glob '{}': {e}", source.packages),
                })?
                .compile_matcher();
            let backend = build_backend(source, config.root())?;
            entries.push((matcher, backend));
        }
        Ok(Self { entries })
    }
}

impl BackendProvider for BackendSet {
    fn backend_for(&self, package: &str) -> Result<&dyn RepositoryBackend, AsboError> {
        self.entries
            .iter()
            .find(|(matcher, _)| matcher.is_match(package))
            .map(|(_, backend)| backend.as_ref())
            .ok_or_else(|| AsboError::Config {
                message: format!("No source configured for package '{package}'"),
            })
    }
}

fn build_backend(
    source: &SourceEntry,
    workspace_root: &Path,
) -> Result<Box<dyn RepositoryBackend>, AsboError> {
    match source.driver {
        Driver::File => Ok(Box::new(FileRepository::from_source(
            source,
            workspace_root,
        )?)),
        Driver::Ftp => Ok(Box::new(FtpRepository::from_source(source)?)),
        Driver::Teamcity => Ok(Box::new(TeamCityRepository::from_source(source)?)),
    }
}
