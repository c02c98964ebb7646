use std::sync::Arc;

use asbo_core::dependency::{Dependency, Target};
use asbo_core::version::{PinnedVersion, VersionConstraint};

fn target() -> Target {
    Target::new("x86_64", "gnu")
}

#[test]
fn parse_spec_without_profile() {
    let dep = Dependency::parse_spec("libfoo", ">= 1.2.0", "release", &target()).unwrap();
    assert_eq!(dep.package, "libfoo");
    assert_eq!(dep.profile, "release");
    assert_eq!(
        dep.constraint,
        VersionConstraint::parse(">= 1.2.0").unwrap()
    );
    assert!(dep.dep_of.is_none());
}

#[test]
fn parse_spec_with_profile() {
    let dep = Dependency::parse_spec("libbar", "debug:~> 0.4.1", "release", &target()).unwrap();
    assert_eq!(dep.profile, "debug");
    assert_eq!(
        dep.constraint,
        VersionConstraint::parse("~> 0.4.1").unwrap()
    );
}

#[test]
fn parse_spec_source_sentinel() {
    let dep = Dependency::parse_spec("liblocal", "source", "release", &target()).unwrap();
    assert!(dep.is_source());
}

#[test]
fn parse_spec_rejects_empty_profile() {
    assert!(Dependency::parse_spec("libfoo", ":1.0.0", "release", &target()).is_err());
}

#[test]
fn parse_spec_rejects_bad_constraint() {
    assert!(Dependency::parse_spec("libfoo", "debug:^1.0.0", "release", &target()).is_err());
}

#[test]
fn requirer_chain_walks_to_root() {
    let root = Arc::new(
        Dependency::parse_spec("app-core", "1.0.0", "release", &target()).unwrap(),
    );
    let mid = Arc::new(
        Dependency::parse_spec("libmid", "1.1.0", "release", &target())
            .unwrap()
            .with_dep_of(root),
    );
    let leaf = Dependency::parse_spec("libleaf", ">= 0.1.0", "release", &target())
        .unwrap()
        .with_dep_of(mid);

    assert_eq!(leaf.requirer_chain(), ["libmid", "app-core"]);
}

#[test]
fn pinned_collapses_constraint() {
    let dep = Dependency::parse_spec("libfoo", ">= 1.0.0", "release", &target()).unwrap();
    let pin = PinnedVersion::parse("1.4.0").unwrap();
    let pinned = dep.pinned(&pin);
    assert_eq!(
        pinned.constraint,
        VersionConstraint::parse("1.4.0").unwrap()
    );
}

#[test]
fn display_forms() {
    let dep = Dependency::parse_spec("libfoo", ">= 1.2.0", "release", &target()).unwrap();
    assert_eq!(dep.to_string(), "libfoo (>= 1.2.0)");
    assert_eq!(target().to_string(), "x86_64-gnu");
}
