//! Resolver behavior against a scripted in-memory backend.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use semver::Version;

use asbo_core::dependency::{Dependency, Target};
use asbo_core::version::PinnedVersion;
use asbo_repo::backend::{BackendProvider, RepositoryBackend};
use asbo_resolver::resolver::{Resolution, Resolver};
use asbo_util::errors::AsboError;

/// Scripted repository: versions per package, manifests per (package,
/// version), and counters for fetch calls.
#[derive(Default)]
struct ScriptedRepo {
    versions: HashMap<String, Vec<String>>,
    manifests: HashMap<(String, String), String>,
    manifest_fetches: RefCell<usize>,
}

impl ScriptedRepo {
    fn with_versions(mut self, package: &str, versions: &[&str]) -> Self {
        self.versions.insert(
            package.to_string(),
            versions.iter().map(|s| s.to_string()).collect(),
        );
        self
    }

    fn with_manifest(mut self, package: &str, version: &str, manifest: &str) -> Self {
        self.manifests.insert(
            (package.to_string(), version.to_string()),
            manifest.to_string(),
        );
        self
    }
}

impl RepositoryBackend for ScriptedRepo {
    fn list_versions(&self, package: &str) -> Result<Vec<String>, AsboError> {
        Ok(self.versions.get(package).cloned().unwrap_or_default())
    }

    fn fetch_manifest(
        &self,
        package: &str,
        version: &Version,
    ) -> Result<Option<Vec<u8>>, AsboError> {
        *self.manifest_fetches.borrow_mut() += 1;
        Ok(self
            .manifests
            .get(&(package.to_string(), version.to_string()))
            .map(|m| m.clone().into_bytes()))
    }

    fn fetch_package(&self, _package: &str, _version: &Version) -> Result<PathBuf, AsboError> {
        Err(AsboError::Network {
            message: "scripted repository has no archives".to_string(),
        })
    }

    fn publish(
        &self,
        _package: &str,
        _version: &Version,
        _archive: &Path,
        _manifest: &Path,
        _overwrite: bool,
    ) -> Result<(), AsboError> {
        unimplemented!("not used by resolver tests")
    }
}

impl BackendProvider for ScriptedRepo {
    fn backend_for(&self, _package: &str) -> Result<&dyn RepositoryBackend, AsboError> {
        Ok(self)
    }
}

fn dep(package: &str, constraint: &str) -> Arc<Dependency> {
    Arc::new(
        Dependency::parse_spec(package, constraint, "release", &Target::new("x86_64", "gnu"))
            .unwrap(),
    )
}

fn versions(resolution: &Resolution) -> Vec<(String, String)> {
    resolution
        .iter()
        .map(|d| (d.package.clone(), d.version.to_string()))
        .collect()
}

#[test]
fn disjoint_branches_resolve_to_their_union() {
    let repo = ScriptedRepo::default()
        .with_versions("liba", &["1.0.0", "1.1.0"])
        .with_versions("libb", &["2.0.0"]);

    let resolution = Resolver::new(&repo)
        .resolve(&[dep("liba", ">= 1.0.0"), dep("libb", ">= 1.0.0")])
        .unwrap();

    assert_eq!(
        versions(&resolution),
        [
            ("liba".to_string(), "1.1.0".to_string()),
            ("libb".to_string(), "2.0.0".to_string()),
        ]
    );
}

#[test]
fn exact_pin_disagreement_is_a_conflict() {
    let repo = ScriptedRepo::default()
        .with_manifest(
            "liba",
            "1.0.0",
            "[package]\nname = \"liba\"\n\n[dependencies]\nshared = \"2.0.0\"\n",
        )
        .with_manifest(
            "libb",
            "1.0.0",
            "[package]\nname = \"libb\"\n\n[dependencies]\nshared = \"3.0.0\"\n",
        );

    let err = Resolver::new(&repo)
        .resolve(&[dep("liba", "1.0.0"), dep("libb", "1.0.0")])
        .unwrap_err();

    assert_eq!(err.package, "shared");
    let text = err.to_string();
    assert!(text.contains("no version of shared"));
    assert!(text.contains("required by liba"));
    assert!(text.contains("required by libb"));
}

#[test]
fn overlapping_open_constraints_pick_newest_in_intersection() {
    // The canonical example: foo lists 1.0.0, 1.2.0, 2.0.0; one branch
    // requires >= 1.0.0, the other < 2.0.0. The answer must be 1.2.0.
    let repo = ScriptedRepo::default()
        .with_versions("foo", &["1.0.0", "1.2.0", "2.0.0"])
        .with_manifest(
            "liba",
            "1.0.0",
            "[package]\nname = \"liba\"\n\n[dependencies]\nfoo = \">= 1.0.0\"\n",
        )
        .with_manifest(
            "libb",
            "1.0.0",
            "[package]\nname = \"libb\"\n\n[dependencies]\nfoo = \"< 2.0.0\"\n",
        );

    let resolution = Resolver::new(&repo)
        .resolve(&[dep("liba", "1.0.0"), dep("libb", "1.0.0")])
        .unwrap();

    assert_eq!(
        resolution.get("foo").unwrap().version,
        PinnedVersion::Release(Version::new(1, 2, 0))
    );
}

#[test]
fn transitive_dependencies_are_discovered() {
    let repo = ScriptedRepo::default()
        .with_versions("mid", &["1.5.0"])
        .with_versions("leaf", &["0.3.0", "0.4.0"])
        .with_manifest(
            "top",
            "1.0.0",
            "[package]\nname = \"top\"\n\n[dependencies]\nmid = \">= 1.0.0\"\n",
        )
        .with_manifest(
            "mid",
            "1.5.0",
            "[package]\nname = \"mid\"\n\n[dependencies]\nleaf = \"~> 0.3.0\"\n",
        );

    let resolution = Resolver::new(&repo).resolve(&[dep("top", "1.0.0")]).unwrap();

    assert_eq!(resolution.len(), 3);
    assert_eq!(
        resolution.get("leaf").unwrap().version,
        PinnedVersion::Release(Version::new(0, 4, 0))
    );
    // The chain reads leaf <- mid <- top.
    assert_eq!(resolution.get("leaf").unwrap().requirer_chain(), ["mid", "top"]);
}

#[test]
fn backtracking_falls_back_to_an_older_candidate() {
    // foo-2.0.0 needs bar-2.0.0, but the project pins bar-1.0.0. The
    // resolver must discard foo-2.0.0 and succeed with foo-1.0.0.
    let repo = ScriptedRepo::default()
        .with_versions("foo", &["1.0.0", "2.0.0"])
        .with_manifest(
            "foo",
            "2.0.0",
            "[package]\nname = \"foo\"\n\n[dependencies]\nbar = \"2.0.0\"\n",
        )
        .with_manifest(
            "foo",
            "1.0.0",
            "[package]\nname = \"foo\"\n\n[dependencies]\nbar = \"1.0.0\"\n",
        );

    let resolution = Resolver::new(&repo)
        .resolve(&[dep("bar", "1.0.0"), dep("foo", "latest")])
        .unwrap();

    assert_eq!(
        resolution.get("foo").unwrap().version,
        PinnedVersion::Release(Version::new(1, 0, 0))
    );
    assert_eq!(
        resolution.get("bar").unwrap().version,
        PinnedVersion::Release(Version::new(1, 0, 0))
    );
}

#[test]
fn latest_picks_the_newest_available() {
    let repo = ScriptedRepo::default().with_versions("foo", &["0.9.0", "1.0.0", "0.1.0"]);

    let resolution = Resolver::new(&repo).resolve(&[dep("foo", "latest")]).unwrap();
    assert_eq!(
        resolution.get("foo").unwrap().version,
        PinnedVersion::Release(Version::new(1, 0, 0))
    );
}

#[test]
fn invalid_listed_versions_are_skipped_not_fatal() {
    let repo = ScriptedRepo::default()
        .with_versions("foo", &["nightly", "1.0.0", "garbage-3", "1.2"]);

    let resolution = Resolver::new(&repo)
        .resolve(&[dep("foo", ">= 0.1.0")])
        .unwrap();
    assert_eq!(
        resolution.get("foo").unwrap().version,
        PinnedVersion::Release(Version::new(1, 0, 0))
    );
}

#[test]
fn empty_listing_for_open_constraint_is_a_conflict() {
    let repo = ScriptedRepo::default();
    let err = Resolver::new(&repo)
        .resolve(&[dep("ghost", ">= 1.0.0")])
        .unwrap_err();
    assert_eq!(err.package, "ghost");
}

#[test]
fn source_dependencies_stay_source() {
    let repo = ScriptedRepo::default();
    let resolution = Resolver::new(&repo)
        .resolve(&[dep("liblocal", "source")])
        .unwrap();
    assert_eq!(
        resolution.get("liblocal").unwrap().version,
        PinnedVersion::Source
    );
}

#[test]
fn source_and_release_constraints_conflict() {
    let repo = ScriptedRepo::default().with_manifest(
        "liba",
        "1.0.0",
        "[package]\nname = \"liba\"\n\n[dependencies]\nliblocal = \"1.0.0\"\n",
    );

    let err = Resolver::new(&repo)
        .resolve(&[dep("liblocal", "source"), dep("liba", "1.0.0")])
        .unwrap_err();
    assert_eq!(err.package, "liblocal");
}

#[test]
fn manifest_fetches_are_memoized_per_run() {
    // Both branches force expansion of the same shared-1.0.0 manifest; the
    // backend must only be asked once.
    let repo = ScriptedRepo::default()
        .with_manifest(
            "liba",
            "1.0.0",
            "[package]\nname = \"liba\"\n\n[dependencies]\nshared = \"1.0.0\"\n",
        )
        .with_manifest(
            "libb",
            "1.0.0",
            "[package]\nname = \"libb\"\n\n[dependencies]\nshared = \"1.0.0\"\n",
        )
        .with_manifest("shared", "1.0.0", "[package]\nname = \"shared\"\n");

    let resolution = Resolver::new(&repo)
        .resolve(&[dep("liba", "1.0.0"), dep("libb", "1.0.0")])
        .unwrap();
    assert_eq!(resolution.len(), 3);

    let fetches = *repo.manifest_fetches.borrow();
    assert_eq!(fetches, 3); // liba, libb, shared — exactly once each
}

#[test]
fn resolution_order_is_deterministic() {
    let repo = ScriptedRepo::default()
        .with_versions("liba", &["1.0.0"])
        .with_versions("libb", &["1.0.0"])
        .with_versions("libc", &["1.0.0"]);

    let roots = [
        dep("libc", ">= 0.1.0"),
        dep("liba", ">= 0.1.0"),
        dep("libb", ">= 0.1.0"),
    ];

    let first = Resolver::new(&repo).resolve(&roots).unwrap();
    let second = Resolver::new(&repo).resolve(&roots).unwrap();
    assert_eq!(versions(&first), versions(&second));

    let order: Vec<String> = first.iter().map(|d| d.package.clone()).collect();
    assert_eq!(order, ["libc", "liba", "libb"]);
}

#[test]
fn no_partial_result_on_failure() {
    // Even though liba alone would resolve, the conflicting sibling makes
    // the whole attempt fail; there is no partially resolved output.
    let repo = ScriptedRepo::default()
        .with_versions("liba", &["1.0.0"])
        .with_manifest(
            "libb",
            "1.0.0",
            "[package]\nname = \"libb\"\n\n[dependencies]\nliba = \"9.9.9\"\n",
        );

    let result = Resolver::new(&repo).resolve(&[dep("liba", ">= 1.0.0"), dep("libb", "1.0.0")]);
    assert!(result.is_err());
}
