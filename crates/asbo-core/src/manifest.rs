use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use asbo_util::errors::AsboError;

use crate::dependency::{Dependency, Target};

/// File name of the per-project manifest.
pub const MANIFEST_FILE: &str = "asbo.toml";

/// Publish rules applied when a manifest declares none.
pub const DEFAULT_PUBLISH_RULES: &[(&str, &str)] =
    &[("inc/**", "inc"), ("bin/**", "bin"), ("lib/**", "lib")];

/// The parsed representation of an `asbo.toml` file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub package: PackageMetadata,

    /// Dependency lines: package name to `[profile:]constraint`.
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,

    /// Ordered publish rules; later rules may overwrite earlier ones.
    #[serde(default, rename = "publish")]
    pub publish: Vec<PublishRule>,
}

/// Package identity from the `[package]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageMetadata {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// One `[[publish]]` entry: a source glob and its destination directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishRule {
    pub pattern: String,
    pub dest: String,
}

impl Manifest {
    /// Load and parse an `asbo.toml` file from the given path.
    pub fn from_path(path: &Path) -> miette::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| AsboError::Manifest {
            message: format!("Failed to read {}: {e}", path.display()),
        })?;
        Self::parse_toml(&content)
    }

    /// Parse an `asbo.toml` from a string.
    pub fn parse_toml(content: &str) -> miette::Result<Self> {
        toml::from_str(content).map_err(|e| {
            AsboError::Manifest {
                message: format!("Failed to parse asbo.toml: {e}"),
            }
            .into()
        })
    }

    pub fn name(&self) -> &str {
        &self.package.name
    }

    /// Materialize the declared dependencies for a build target.
    ///
    /// Entries without an explicit profile default to `default_profile`
    /// (the requiring project's own build profile). Entries are produced in
    /// manifest key order, so discovery order is reproducible across runs.
    pub fn dependencies(
        &self,
        target: &Target,
        default_profile: &str,
    ) -> Result<Vec<Arc<Dependency>>, AsboError> {
        self.dependencies
            .iter()
            .map(|(name, spec)| {
                Dependency::parse_spec(name, spec, default_profile, target).map(Arc::new)
            })
            .collect()
    }

    /// The publish rules to apply, falling back to the standard
    /// `inc`/`bin`/`lib` mapping when the manifest declares none.
    pub fn publish_rules(&self) -> Vec<PublishRule> {
        if self.publish.is_empty() {
            DEFAULT_PUBLISH_RULES
                .iter()
                .map(|(pattern, dest)| PublishRule {
                    pattern: (*pattern).to_string(),
                    dest: (*dest).to_string(),
                })
                .collect()
        } else {
            self.publish.clone()
        }
    }
}
