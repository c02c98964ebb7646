//! Handler for `asbo fetch`.

use miette::Result;

use asbo_core::dependency::Target;

pub fn exec(target: &Target, profile: &str) -> Result<()> {
    let project_dir = super::project_dir()?;
    asbo_ops::ops_fetch::fetch(&project_dir, target, profile)?;
    Ok(())
}
