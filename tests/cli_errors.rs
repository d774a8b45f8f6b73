mod fixtures;

use predicates::prelude::*;

use fixtures::{bt, BareTestProject};

#[test]
fn not_a_repo_exits_3() {
    let dir = tempfile::tempdir().expect("temp dir");

    bt()
        .args(["list", "--repo", &dir.path().display().to_string()])
        .assert()
        .failure()
        .code(3)
        .stderr(predicate::str::contains("not a git repository"));
}

#[test]
fn list_single_worktree_project_shows_main() {
    let project = BareTestProject::new();

    let output = bt()
        .args(["list", "--repo", &project.path().display().to_string()])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let stdout = String::from_utf8(output).expect("invalid utf8");
    assert!(stdout.contains("main"));
}

#[test]
fn list_json_returns_array() {
    let project = BareTestProject::new();

    let output = bt()
        .args(["list", "--repo", &project.path().display().to_string(), "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let json: serde_json::Value = serde_json::from_slice(&output).expect("invalid json");
    assert_eq!(json["ok"], true);
    assert!(json["worktrees"].as_array().is_some());
    assert!(!json["worktrees"].as_array().expect("array").is_empty());
}

#[test]
fn status_on_clean_project() {
    let project = BareTestProject::new();

    bt()
        .args(["status", "--repo", &project.path().display().to_string()])
        .assert()
        .success();
}

#[test]
fn status_json_output() {
    let project = BareTestProject::new();

    let output = bt()
        .args(["status", "--repo", &project.path().display().to_string(), "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let json: serde_json::Value = serde_json::from_slice(&output).expect("invalid json");
    assert_eq!(json["ok"], true);
    assert!(json["entries"].as_array().is_some());
}

#[test]
fn path_convention_hierarchical_layout() {
    let project = BareTestProject::new();

    let output = bt()
        .args([
            "add",
            "feature/nested",
            "-b",
            "--repo",
            &project.path().display().to_string(),
            "--print-cd-path",
        ])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let path = String::from_utf8(output).expect("invalid utf8");
    let path = path.trim();

    // Must mirror the branch name as a directory hierarchy.
    assert!(path.ends_with("feature/nested"));
    assert!(std::path::Path::new(path).is_dir());
}

#[test]
fn remove_nonexistent_branch_fails() {
    let project = BareTestProject::new();

    bt()
        .args(["remove", "ghost-branch", "--repo", &project.path().display().to_string()])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("no worktree for branch"));
}

#[test]
fn no_subcommand_shows_help() {
    bt().assert().failure().stderr(predicate::str::contains("Usage"));
}
