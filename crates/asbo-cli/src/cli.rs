//! CLI argument definitions for ASBO.
//!
//! Uses `clap` derive macros to define the full command surface. Each command
//! corresponds to a handler in the [`super::commands`] module.

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "asbo",
    version,
    about = "Dependency management and packaging for natively-built components",
    long_about = "ASBO resolves versioned binary dependencies across architectures, ABIs, \
                  and build profiles, caches them locally, and packages and publishes \
                  built artifacts to configured repositories."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Target architecture
    #[arg(long, global = true, default_value = std::env::consts::ARCH)]
    pub arch: String,

    /// Target ABI
    #[arg(long, global = true, default_value = "gnu")]
    pub abi: String,

    /// Build profile
    #[arg(long, global = true, default_value = "release")]
    pub profile: String,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Resolve and download all dependencies into the cache
    Fetch,

    /// Display the resolved dependency tree
    Tree,

    /// Package the project and publish it to its repository
    Publish {
        /// Version to publish as
        #[arg(long)]
        version: String,
        /// Replace the package if it is already published at this version
        #[arg(long)]
        overwrite: bool,
    },

    /// Manage the workspace package cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum CacheAction {
    /// Stage the current project into the cache
    Project {
        /// Version to cache as (a semantic version or `source`)
        #[arg(long, default_value = "source")]
        version: String,
    },

    /// Print cache statistics
    Stats,

    /// Delete the entire cache
    Clobber,
}

pub fn parse() -> Cli {
    Cli::parse()
}
