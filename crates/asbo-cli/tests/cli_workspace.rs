use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn asbo_cmd() -> Command {
    Command::cargo_bin("asbo").unwrap()
}

const SOURCES: &str = r#"
cache-dir = ".asbo/cache"

[[source]]
packages = "*"
driver = "file"
path = "repo/{package}-{version}"
"#;

/// Lay out a workspace: sources.toml at the root, one project directory,
/// and a file repository seeded with the given packages.
fn workspace(tmp: &Path, project_manifest: &str, packages: &[(&str, &str, &str)]) {
    fs::write(tmp.join("sources.toml"), SOURCES).unwrap();

    let project = tmp.join("project");
    fs::create_dir_all(&project).unwrap();
    fs::write(project.join("asbo.toml"), project_manifest).unwrap();

    for (package, version, manifest) in packages {
        let staging = tmp.join(format!("seed-{package}-{version}"));
        fs::create_dir_all(staging.join("inc")).unwrap();
        fs::write(staging.join("asbo.toml"), manifest).unwrap();
        fs::write(staging.join("inc/api.h"), "// header\n").unwrap();

        let repo = tmp.join("repo");
        fs::create_dir_all(&repo).unwrap();
        asbo_repo::archive::create(&staging, &repo.join(format!("{package}-{version}.zip")))
            .unwrap();
    }
}

#[test]
fn fetch_downloads_and_is_idempotent() {
    let tmp = TempDir::new().unwrap();
    workspace(
        tmp.path(),
        "[package]\nname = \"app\"\n\n[dependencies]\nlibfoo = \">= 1.0.0\"\n",
        &[
            ("libfoo", "1.0.0", "[package]\nname = \"libfoo\"\n"),
            ("libfoo", "1.2.0", "[package]\nname = \"libfoo\"\n"),
        ],
    );
    let project = tmp.path().join("project");

    asbo_cmd()
        .current_dir(&project)
        .args(["fetch"])
        .assert()
        .success()
        .stderr(predicate::str::contains("1 downloaded"));

    // The newest satisfying version landed in the cache.
    assert!(tmp.path().join(".asbo/cache/libfoo-1.2.0/asbo.toml").is_file());
    assert!(!tmp.path().join(".asbo/cache/libfoo-1.0.0").exists());

    asbo_cmd()
        .current_dir(&project)
        .args(["fetch"])
        .assert()
        .success()
        .stderr(predicate::str::contains("1 up-to-date"));
}

#[test]
fn fetch_fails_cleanly_on_conflicts() {
    let tmp = TempDir::new().unwrap();
    workspace(
        tmp.path(),
        "[package]\nname = \"app\"\n\n[dependencies]\nliba = \"1.0.0\"\nlibb = \"1.0.0\"\n",
        &[
            (
                "liba",
                "1.0.0",
                "[package]\nname = \"liba\"\n\n[dependencies]\nshared = \"1.0.0\"\n",
            ),
            (
                "libb",
                "1.0.0",
                "[package]\nname = \"libb\"\n\n[dependencies]\nshared = \"2.0.0\"\n",
            ),
        ],
    );

    asbo_cmd()
        .current_dir(tmp.path().join("project"))
        .args(["fetch"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("shared"));
}

#[test]
fn fetch_outside_a_project_fails() {
    let tmp = TempDir::new().unwrap();
    asbo_cmd()
        .current_dir(tmp.path())
        .args(["fetch"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("asbo.toml"));
}

#[test]
fn tree_prints_the_resolved_graph() {
    let tmp = TempDir::new().unwrap();
    workspace(
        tmp.path(),
        "[package]\nname = \"app\"\n\n[dependencies]\nlibfoo = \">= 1.0.0\"\n",
        &[(
            "libfoo",
            "1.0.0",
            "[package]\nname = \"libfoo\"\n\n[dependencies]\nlibbar = \"0.2.0\"\n",
        ), (
            "libbar",
            "0.2.0",
            "[package]\nname = \"libbar\"\n",
        )],
    );

    asbo_cmd()
        .current_dir(tmp.path().join("project"))
        .args(["tree"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("app")
                .and(predicate::str::contains("libfoo-1.0.0"))
                .and(predicate::str::contains("libbar-0.2.0")),
        );
}

#[test]
fn publish_conflicts_without_overwrite() {
    let tmp = TempDir::new().unwrap();
    workspace(tmp.path(), "[package]\nname = \"app\"\n", &[]);
    let project = tmp.path().join("project");
    fs::create_dir_all(project.join("inc")).unwrap();
    fs::write(project.join("inc/app.h"), "// app\n").unwrap();

    asbo_cmd()
        .current_dir(&project)
        .args(["publish", "--version", "0.1.0"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Published"));
    assert!(tmp.path().join("repo/app-0.1.0.zip").is_file());

    asbo_cmd()
        .current_dir(&project)
        .args(["publish", "--version", "0.1.0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("exists"));

    asbo_cmd()
        .current_dir(&project)
        .args(["publish", "--version", "0.1.0", "--overwrite"])
        .assert()
        .success();
}

#[test]
fn cache_project_defaults_to_source_version() {
    let tmp = TempDir::new().unwrap();
    workspace(tmp.path(), "[package]\nname = \"app\"\n", &[]);
    let project = tmp.path().join("project");
    fs::create_dir_all(project.join("inc")).unwrap();
    fs::write(project.join("inc/app.h"), "// app\n").unwrap();

    asbo_cmd()
        .current_dir(&project)
        .args(["cache", "project"])
        .assert()
        .success();

    assert!(tmp.path().join(".asbo/cache/app-source/inc/app.h").is_file());
    assert!(tmp.path().join(".asbo/cache/app-source/asbo.toml").is_file());
}

#[test]
fn cache_clobber_removes_the_cache() {
    let tmp = TempDir::new().unwrap();
    workspace(tmp.path(), "[package]\nname = \"app\"\n", &[]);
    let project = tmp.path().join("project");

    asbo_cmd()
        .current_dir(&project)
        .args(["cache", "project"])
        .assert()
        .success();
    assert!(tmp.path().join(".asbo/cache").exists());

    asbo_cmd()
        .current_dir(&project)
        .args(["cache", "clobber"])
        .assert()
        .success();
    assert!(!tmp.path().join(".asbo/cache").exists());
}
