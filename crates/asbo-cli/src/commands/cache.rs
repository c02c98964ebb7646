//! Handler for `asbo cache`.

use miette::Result;

use asbo_core::version::PinnedVersion;

use crate::cli::CacheAction;

pub fn exec(action: CacheAction) -> Result<()> {
    match action {
        CacheAction::Project { version } => {
            let project_dir = super::project_dir()?;
            let version = PinnedVersion::parse(&version)?;
            asbo_ops::ops_cache::cache_project(&project_dir, &version)
        }
        CacheAction::Stats => {
            let dir = std::env::current_dir().map_err(asbo_util::errors::AsboError::Io)?;
            asbo_ops::ops_cache::stats(&dir)
        }
        CacheAction::Clobber => {
            let dir = std::env::current_dir().map_err(asbo_util::errors::AsboError::Io)?;
            asbo_ops::ops_cache::clobber(&dir)
        }
    }
}
