//! Dependency value types.
//!
//! A [`Dependency`] is a requirement taken from one manifest line; a
//! [`ResolvedDependency`] is the same identity pinned to a concrete version
//! by the resolver. Both are immutable and freely shared behind `Arc` once
//! created. The `dep_of` back-reference points at the dependency of the
//! package that introduced this one, forming the chain rendered in
//! "required by A, which is required by B" diagnostics.

use std::fmt;
use std::sync::Arc;

use asbo_util::errors::AsboError;

use crate::version::{PinnedVersion, VersionConstraint};

/// An architecture/ABI pair identifying a binary artifact flavour.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Target {
    pub arch: String,
    pub abi: String,
}

impl Target {
    pub fn new(arch: impl Into<String>, abi: impl Into<String>) -> Self {
        Self {
            arch: arch.into(),
            abi: abi.into(),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.arch, self.abi)
    }
}

/// A single declared dependency: package name, version constraint, build
/// profile, and target.
#[derive(Debug, Clone)]
pub struct Dependency {
    pub package: String,
    pub constraint: VersionConstraint,
    pub profile: String,
    pub target: Target,
    /// The dependency of the package that introduced this one; `None` for
    /// root-level dependencies.
    pub dep_of: Option<Arc<Dependency>>,
}

impl Dependency {
    pub fn new(
        package: impl Into<String>,
        constraint: VersionConstraint,
        profile: impl Into<String>,
        target: Target,
        dep_of: Option<Arc<Dependency>>,
    ) -> Self {
        Self {
            package: package.into(),
            constraint,
            profile: profile.into(),
            target,
            dep_of,
        }
    }

    /// Parse one manifest dependency entry.
    ///
    /// The value follows the `[profile:]constraint` grammar; the package name
    /// is the manifest key. An omitted profile defaults to the requiring
    /// project's own build profile.
    pub fn parse_spec(
        name: &str,
        value: &str,
        default_profile: &str,
        target: &Target,
    ) -> Result<Self, AsboError> {
        let (profile, constraint_text) = match value.split_once(':') {
            Some((profile, rest)) => (profile.trim(), rest.trim()),
            None => (default_profile, value.trim()),
        };
        if profile.is_empty() {
            return Err(AsboError::Parse {
                message: format!("empty build profile in dependency '{name} = \"{value}\"'"),
            });
        }
        let constraint = VersionConstraint::parse(constraint_text)?;
        Ok(Self::new(name, constraint, profile, target.clone(), None))
    }

    /// The same dependency re-tagged with a requirer.
    pub fn with_dep_of(&self, dep_of: Arc<Dependency>) -> Self {
        Self {
            dep_of: Some(dep_of),
            ..self.clone()
        }
    }

    /// The chosen candidate as a dependency: the constraint collapsed to the
    /// given pin. Used to tag transitively discovered dependencies.
    pub fn pinned(&self, version: &PinnedVersion) -> Self {
        let constraint = match version {
            PinnedVersion::Source => VersionConstraint::Source,
            PinnedVersion::Release(v) => VersionConstraint::Exact(v.clone()),
        };
        Self {
            constraint,
            ..self.clone()
        }
    }

    pub fn is_source(&self) -> bool {
        self.constraint.is_source()
    }

    /// Package names along the requirer chain, nearest first.
    pub fn requirer_chain(&self) -> Vec<String> {
        let mut chain = Vec::new();
        let mut current = self.dep_of.as_ref();
        while let Some(dep) = current {
            chain.push(dep.package.clone());
            current = dep.dep_of.as_ref();
        }
        chain
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.package, self.constraint)
    }
}

/// A dependency pinned to a concrete version by resolution (or by a cached
/// manifest walk). The version is never the `latest` sentinel; `source` pins
/// survive so callers can refuse to fetch them.
#[derive(Debug, Clone)]
pub struct ResolvedDependency {
    pub package: String,
    pub version: PinnedVersion,
    pub profile: String,
    pub target: Target,
    /// The dependency of the package that introduced this one; `None` for
    /// root-level dependencies.
    pub dep_of: Option<Arc<Dependency>>,
}

impl ResolvedDependency {
    pub fn is_source(&self) -> bool {
        self.version.is_source()
    }

    /// This pin restated as a requirement, for tagging its own dependencies.
    pub fn as_requirement(&self) -> Dependency {
        let constraint = match &self.version {
            PinnedVersion::Source => VersionConstraint::Source,
            PinnedVersion::Release(v) => VersionConstraint::Exact(v.clone()),
        };
        Dependency::new(
            self.package.clone(),
            constraint,
            self.profile.clone(),
            self.target.clone(),
            self.dep_of.clone(),
        )
    }

    /// Package names along the requirer chain, nearest first.
    pub fn requirer_chain(&self) -> Vec<String> {
        let mut chain = Vec::new();
        let mut current = self.dep_of.as_ref();
        while let Some(dep) = current {
            chain.push(dep.package.clone());
            current = dep.dep_of.as_ref();
        }
        chain
    }
}

impl fmt::Display for ResolvedDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.package, self.version)
    }
}
