use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use globset::Glob;

use asbo_util::errors::AsboError;

/// File name of the workspace source configuration.
pub const SOURCES_FILE: &str = "sources.toml";

/// Workspace configuration loaded from `sources.toml` at the workspace root.
///
/// The workspace root is the first ancestor of the project directory that
/// contains the file; every package source and the cache directory are
/// declared here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    /// Cache directory, relative to the workspace root.
    #[serde(default = "default_cache_dir", rename = "cache-dir")]
    pub cache_dir: String,

    /// Ordered package sources; the first whose glob matches wins.
    #[serde(default, rename = "source")]
    pub sources: Vec<SourceEntry>,

    #[serde(skip)]
    root: PathBuf,
}

/// One `[[source]]` entry mapping a set of package names to a repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceEntry {
    /// Glob over package names this source serves.
    #[serde(default = "default_packages")]
    pub packages: String,

    pub driver: Driver,

    /// Path template for the `file` driver, relative to the workspace root.
    #[serde(default)]
    pub path: Option<String>,

    /// URL for the `ftp` and `teamcity` drivers.
    #[serde(default)]
    pub url: Option<String>,

    /// Build type template for the `teamcity` driver.
    #[serde(default, rename = "build-type")]
    pub build_type: Option<String>,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,
}

/// The closed set of repository drivers.
///
/// An unknown driver string fails deserialization, which makes it a fatal
/// configuration error at startup rather than a resolver error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Driver {
    File,
    Ftp,
    Teamcity,
}

fn default_cache_dir() -> String {
    ".asbo/cache".to_string()
}

fn default_packages() -> String {
    "*".to_string()
}

impl WorkspaceConfig {
    /// Locate and load the workspace configuration by walking up from `start`.
    pub fn discover(start: &Path) -> miette::Result<Self> {
        let root = asbo_util::fs::find_ancestor_with(start, SOURCES_FILE).ok_or_else(|| {
            AsboError::Config {
                message: format!(
                    "No {SOURCES_FILE} found in {} or any parent directory",
                    start.display()
                ),
            }
        })?;
        Self::from_path(&root.join(SOURCES_FILE))
    }

    /// Load the workspace configuration from an explicit path.
    pub fn from_path(path: &Path) -> miette::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| AsboError::Config {
            message: format!("Failed to read {}: {e}", path.display()),
        })?;
        let mut config: WorkspaceConfig = toml::from_str(&content).map_err(|e| {
            AsboError::Config {
                message: format!("Failed to parse {}: {e}", path.display()),
            }
        })?;
        config.root = path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .to_path_buf();
        Ok(config)
    }

    /// Build a config in memory, rooted at `root`. Used by tests and by
    /// callers that assemble configuration programmatically.
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    /// The workspace root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path of the package cache root.
    pub fn cache_root(&self) -> PathBuf {
        self.root.join(&self.cache_dir)
    }

    /// The first source entry whose package glob matches `package`.
    pub fn source_for(&self, package: &str) -> Result<&SourceEntry, AsboError> {
        for entry in &self.sources {
            let matcher = Glob::new(&entry.packages)
                .map_err(|e| AsboError::Config {
                    message: format!("Invalid package glob '{}': {e}", entry.packages),
                })?
                .compile_matcher();
            if matcher.is_match(package) {
                return Ok(entry);
            }
        }
        Err(AsboError::Config {
            message: format!("No source configured for package '{package}'"),
        })
    }
}
