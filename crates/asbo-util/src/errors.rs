use miette::Diagnostic;
use thiserror::Error;

/// Unified error type for all ASBO operations.
#[derive(Debug, Error, Diagnostic)]
pub enum AsboError {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed version or constraint string. Never retried.
    #[error("Parse error: {message}")]
    Parse { message: String },

    /// Invalid or malformed manifest (asbo.toml).
    #[error("Manifest error: {message}")]
    #[diagnostic(help("Check your asbo.toml for syntax errors"))]
    Manifest { message: String },

    /// Workspace configuration problem (sources.toml).
    #[error("Configuration error: {message}")]
    #[diagnostic(help("Check the sources.toml at your workspace root"))]
    Config { message: String },

    /// Dependency resolution failed: no consistent version assignment exists.
    #[error("Dependency resolution failed: {message}")]
    Resolution { message: String },

    /// A source dependency is not present in the cache.
    #[error("Source dependency {package} is not built")]
    #[diagnostic(help(
        "{package} is declared as a source dependency; build and cache it locally first"
    ))]
    MissingSource { package: String },

    /// Network request or download failed.
    #[error("Network error: {message}")]
    Network { message: String },

    /// Repository authentication failed.
    #[error("Authentication error: {message}")]
    Auth { message: String },

    /// A package already exists at the target (name, version).
    #[error("Package {package}-{version} already exists in the repository")]
    #[diagnostic(help("Pass --overwrite to replace the published package"))]
    PublishConflict { package: String, version: String },

    /// Archive encoding or extraction failed.
    #[error("Archive error: {message}")]
    Archive { message: String },
}

/// Convenience alias for `miette::Result<T>`.
pub type AsboResult<T> = miette::Result<T>;
