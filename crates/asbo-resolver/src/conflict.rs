//! Structured resolution conflict reporting.

use std::fmt;

use asbo_core::dependency::Dependency;
use asbo_util::errors::AsboError;

/// An unsatisfiable resolution state: no version of `package` meets every
/// constraint contributed by its requirers.
///
/// A backtracking ancestor may still recover by trying another combination;
/// only when every combination fails does this surface to the caller.
#[derive(Debug, Clone)]
pub struct ConflictError {
    pub package: String,
    pub requirements: Vec<Requirement>,
    pub detail: Option<String>,
}

/// One constraint on the conflicting package, with its requirer chain.
#[derive(Debug, Clone)]
pub struct Requirement {
    pub constraint: String,
    /// Package names from the direct requirer up to the root; empty for a
    /// dependency declared by the project manifest itself.
    pub chain: Vec<String>,
}

impl Requirement {
    pub fn from_dependency(dep: &Dependency) -> Self {
        Self {
            constraint: dep.constraint.to_string(),
            chain: dep.requirer_chain(),
        }
    }
}

impl ConflictError {
    pub fn new(package: impl Into<String>, requirements: Vec<Requirement>) -> Self {
        Self {
            package: package.into(),
            requirements,
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Convert into the unified error type for surfacing to callers.
    pub fn into_error(self) -> AsboError {
        AsboError::Resolution {
            message: self.to_string(),
        }
    }
}

impl fmt::Display for ConflictError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "no version of {} satisfies every constraint:",
            self.package
        )?;
        for req in &self.requirements {
            write!(f, "\n  {}", req.constraint)?;
            if req.chain.is_empty() {
                write!(f, " (required by the project)")?;
            } else {
                write!(
                    f,
                    " (required by {})",
                    req.chain.join(", which is required by ")
                )?;
            }
        }
        if let Some(ref detail) = self.detail {
            write!(f, "\n  {detail}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ConflictError {}

impl From<ConflictError> for AsboError {
    fn from(conflict: ConflictError) -> Self {
        conflict.into_error()
    }
}
