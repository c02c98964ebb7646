//! Operation: display the resolved dependency tree.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use asbo_core::dependency::{ResolvedDependency, Target};
use asbo_core::manifest::{Manifest, MANIFEST_FILE};
use asbo_core::workspace::WorkspaceConfig;
use asbo_repo::backend::BackendSet;
use asbo_resolver::resolver::Resolver;

/// Resolve the project and print its dependency tree from requirer links.
pub fn tree(project_dir: &Path, target: &Target, profile: &str) -> miette::Result<()> {
    let manifest = Manifest::from_path(&project_dir.join(MANIFEST_FILE))?;
    let workspace = WorkspaceConfig::discover(project_dir)?;
    let backends = BackendSet::from_config(&workspace)?;

    let deps = manifest.dependencies(target, profile)?;
    let mut resolver = Resolver::new(&backends);
    let resolution = resolver
        .resolve(&deps)
        .map_err(|conflict| conflict.into_error())?;

    // Group each resolved package under the package that introduced it.
    let mut children: BTreeMap<Option<String>, Vec<&Arc<ResolvedDependency>>> = BTreeMap::new();
    for dep in resolution.iter() {
        let parent = dep.dep_of.as_ref().map(|d| d.package.clone());
        children.entry(parent).or_default().push(dep);
    }

    println!("{}", manifest.name());
    print_children(&children, None, 1);
    Ok(())
}

fn print_children(
    children: &BTreeMap<Option<String>, Vec<&Arc<ResolvedDependency>>>,
    parent: Option<&str>,
    depth: usize,
) {
    let Some(level) = children.get(&parent.map(String::from)) else {
        return;
    };
    for dep in level {
        println!("{}{dep}", "  ".repeat(depth));
        print_children(children, Some(dep.package.as_str()), depth + 1);
    }
}
