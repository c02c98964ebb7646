//! Handler for `asbo publish`.

use miette::Result;
use semver::Version;

use asbo_util::errors::AsboError;

pub fn exec(version: &str, overwrite: bool) -> Result<()> {
    let project_dir = super::project_dir()?;
    let version = Version::parse(version).map_err(|e| AsboError::Parse {
        message: format!("invalid publish version '{version}': {e}"),
    })?;
    asbo_ops::ops_publish::publish(&project_dir, &version, overwrite)
}
