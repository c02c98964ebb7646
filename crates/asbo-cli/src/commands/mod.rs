//! Command dispatch and handler modules.

mod cache;
mod fetch;
mod publish;
mod tree;

use std::path::PathBuf;

use miette::Result;

use asbo_core::dependency::Target;
use asbo_core::manifest::MANIFEST_FILE;
use asbo_util::errors::AsboError;

use crate::cli::{Cli, Command};

/// Route a parsed CLI invocation to the appropriate command handler.
pub fn dispatch(cli: Cli) -> Result<()> {
    let target = Target::new(&cli.arch, &cli.abi);
    match cli.command {
        Command::Fetch => fetch::exec(&target, &cli.profile),
        Command::Tree => tree::exec(&target, &cli.profile),
        Command::Publish { version, overwrite } => publish::exec(&version, overwrite),
        Command::Cache { action } => cache::exec(action),
    }
}

/// The current directory, which must contain an `asbo.toml`.
fn project_dir() -> Result<PathBuf> {
    let dir = std::env::current_dir().map_err(AsboError::Io)?;
    if !dir.join(MANIFEST_FILE).is_file() {
        return Err(AsboError::Manifest {
            message: format!("No {MANIFEST_FILE} found in current directory"),
        }
        .into());
    }
    Ok(dir)
}
