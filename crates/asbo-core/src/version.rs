//! Semantic version constraints and resolved version pins.
//!
//! Concrete versions are `semver::Version` values: the crate's total order
//! (numeric major/minor/patch comparison, pre-releases sorting below the
//! corresponding release) is exactly the ordering ASBO needs. What this
//! module adds is the constraint language used in manifests:
//!
//! - an exact pin (`1.2.0` or `= 1.2.0`)
//! - an operator constraint (`>= 1.2.0`, `> 1.2.0`, `<= 1.2.0`, `< 1.2.0`)
//! - the pessimistic operator (`~> 1.2.0`: same major, at least the given
//!   version)
//! - the sentinels `source` (satisfied only by a local source tree) and
//!   `latest` (any version; the newest available wins)

use std::cmp::Ordering;
use std::fmt;

use semver::Version;

use asbo_util::errors::AsboError;

/// Literal manifest token for a source dependency.
pub const SOURCE_TOKEN: &str = "source";

/// Literal manifest token for a newest-available constraint.
pub const LATEST_TOKEN: &str = "latest";

/// Comparison operator of a non-exact version constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintOp {
    Ge,
    Gt,
    Le,
    Lt,
    /// `~>`: same major version, at least the given version.
    Compatible,
}

impl ConstraintOp {
    fn as_str(self) -> &'static str {
        match self {
            ConstraintOp::Ge => ">=",
            ConstraintOp::Gt => ">",
            ConstraintOp::Le => "<=",
            ConstraintOp::Lt => "<",
            ConstraintOp::Compatible => "~>",
        }
    }
}

/// A parsed version constraint from a manifest dependency line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionConstraint {
    /// Exactly this version.
    Exact(Version),
    /// Operator applied to a version.
    Op(ConstraintOp, Version),
    /// Any version; the resolver picks the newest available.
    Latest,
    /// Must be satisfied by a local, unbuilt source tree. Never fetched.
    Source,
}

impl VersionConstraint {
    /// Parse a constraint string.
    ///
    /// Fails when the operator is unrecognized or the version portion is not
    /// a valid semantic version, unless the whole text is one of the literal
    /// sentinel tokens.
    pub fn parse(text: &str) -> Result<Self, AsboError> {
        let s = text.trim();
        if s == SOURCE_TOKEN {
            return Ok(VersionConstraint::Source);
        }
        if s == LATEST_TOKEN {
            return Ok(VersionConstraint::Latest);
        }

        for (prefix, op) in [
            (">=", Some(ConstraintOp::Ge)),
            ("<=", Some(ConstraintOp::Le)),
            ("~>", Some(ConstraintOp::Compatible)),
            (">", Some(ConstraintOp::Gt)),
            ("<", Some(ConstraintOp::Lt)),
            ("=", None),
        ] {
            if let Some(rest) = s.strip_prefix(prefix) {
                let version = parse_version(rest.trim(), s)?;
                return Ok(match op {
                    Some(op) => VersionConstraint::Op(op, version),
                    None => VersionConstraint::Exact(version),
                });
            }
        }

        // No operator: a bare version is an exact pin.
        Ok(VersionConstraint::Exact(parse_version(s, s)?))
    }

    /// True for any non-exact, non-source constraint. Satisfying an open
    /// constraint requires enumerating the versions a backend knows about.
    pub fn is_open(&self) -> bool {
        matches!(self, VersionConstraint::Op(..) | VersionConstraint::Latest)
    }

    /// True if this constraint requires a local source tree.
    pub fn is_source(&self) -> bool {
        matches!(self, VersionConstraint::Source)
    }

    /// The pinned version, if this constraint is exact.
    pub fn exact_version(&self) -> Option<&Version> {
        match self {
            VersionConstraint::Exact(v) => Some(v),
            _ => None,
        }
    }

    /// Whether a concrete release version satisfies this constraint.
    ///
    /// A `source` constraint is never satisfied by a release version.
    pub fn satisfies(&self, version: &Version) -> bool {
        match self {
            VersionConstraint::Exact(c) => version == c,
            VersionConstraint::Op(ConstraintOp::Ge, c) => version >= c,
            VersionConstraint::Op(ConstraintOp::Gt, c) => version > c,
            VersionConstraint::Op(ConstraintOp::Le, c) => version <= c,
            VersionConstraint::Op(ConstraintOp::Lt, c) => version < c,
            VersionConstraint::Op(ConstraintOp::Compatible, c) => {
                version.major == c.major && version >= c
            }
            VersionConstraint::Latest => true,
            VersionConstraint::Source => false,
        }
    }

    /// Whether a resolved pin satisfies this constraint.
    ///
    /// Source pins satisfy only source constraints, and vice versa.
    pub fn satisfied_by(&self, pin: &PinnedVersion) -> bool {
        match pin {
            PinnedVersion::Source => self.is_source(),
            PinnedVersion::Release(v) => self.satisfies(v),
        }
    }
}

impl fmt::Display for VersionConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionConstraint::Exact(v) => write!(f, "{v}"),
            VersionConstraint::Op(op, v) => write!(f, "{} {v}", op.as_str()),
            VersionConstraint::Latest => f.write_str(LATEST_TOKEN),
            VersionConstraint::Source => f.write_str(SOURCE_TOKEN),
        }
    }
}

fn parse_version(text: &str, whole: &str) -> Result<Version, AsboError> {
    Version::parse(text).map_err(|e| AsboError::Parse {
        message: format!("invalid version constraint '{whole}': {e}"),
    })
}

/// Whether `text` parses as a valid semantic version.
///
/// Used to discard malformed version strings returned by a repository
/// backend's listing (logged by the caller, never fatal).
pub fn is_valid_version(text: &str) -> bool {
    Version::parse(text.trim()).is_ok()
}

/// A concrete resolved version: either a release or a local source tree.
///
/// The resolver never emits a `latest` pin — that sentinel is eliminated
/// during resolution. `Source` survives so the cache layer can refuse to
/// fetch what must be built locally.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PinnedVersion {
    Source,
    Release(Version),
}

impl PinnedVersion {
    /// Parse a pin from a CLI/manifest string: `source` or a semantic version.
    pub fn parse(text: &str) -> Result<Self, AsboError> {
        let s = text.trim();
        if s == SOURCE_TOKEN {
            return Ok(PinnedVersion::Source);
        }
        Version::parse(s)
            .map(PinnedVersion::Release)
            .map_err(|e| AsboError::Parse {
                message: format!("invalid version '{s}': {e}"),
            })
    }

    pub fn is_source(&self) -> bool {
        matches!(self, PinnedVersion::Source)
    }

    /// The release version, if this is not a source pin.
    pub fn release(&self) -> Option<&Version> {
        match self {
            PinnedVersion::Source => None,
            PinnedVersion::Release(v) => Some(v),
        }
    }
}

impl Ord for PinnedVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (PinnedVersion::Source, PinnedVersion::Source) => Ordering::Equal,
            (PinnedVersion::Source, PinnedVersion::Release(_)) => Ordering::Less,
            (PinnedVersion::Release(_), PinnedVersion::Source) => Ordering::Greater,
            (PinnedVersion::Release(a), PinnedVersion::Release(b)) => a.cmp(b),
        }
    }
}

impl PartialOrd for PinnedVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for PinnedVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PinnedVersion::Source => f.write_str(SOURCE_TOKEN),
            PinnedVersion::Release(v) => write!(f, "{v}"),
        }
    }
}
