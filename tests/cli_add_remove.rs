mod fixtures;

use predicates::prelude::*;

use fixtures::{bt, BareTestProject};

#[test]
fn add_creates_worktree_and_branch() {
    let project = BareTestProject::new();

    let output = bt()
        .args(["add", "feature/login", "-b", "--repo", &project.path().display().to_string()])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let stdout = String::from_utf8(output).expect("invalid utf8");
    assert!(stdout.contains("feature/login"));

    assert!(project.worktree("feature").join("login").is_dir());
}

#[test]
fn add_json_returns_structured_response() {
    let project = BareTestProject::new();

    let output = bt()
        .args([
            "add",
            "feature/json-test",
            "-b",
            "--repo",
            &project.path().display().to_string(),
            "--json",
        ])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let json: serde_json::Value = serde_json::from_slice(&output).expect("invalid json");
    assert_eq!(json["ok"], true);
    assert!(json["cd_path"].as_str().is_some());
    assert!(json["worktree_path"].as_str().is_some());
    assert!(json["repo_root"].as_str().is_some());
    assert_eq!(json["branch"], "feature/json-test");
}

#[test]
fn add_print_cd_path_returns_bare_path() {
    let project = BareTestProject::new();

    let output = bt()
        .args([
            "add",
            "feature/cd-test",
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
    assert!(path.starts_with('/'));
    assert!(path.ends_with("feature/cd-test"));
    assert!(!path.starts_with('{'));
}

#[test]
fn add_fails_when_branch_exists() {
    let project = BareTestProject::new();
    let repo = project.path().display().to_string();

    bt().args(["add", "dupe-branch", "-b", "--repo", &repo]).assert().success();

    bt()
        .args(["add", "dupe-branch", "-b", "--repo", &repo])
        .assert()
        .failure()
        .code(5)
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn add_with_base_revision() {
    let project = BareTestProject::new();

    bt()
        .args([
            "add",
            "from-head",
            "-b",
            "--base",
            "HEAD",
            "--repo",
            &project.path().display().to_string(),
        ])
        .assert()
        .success();
}

#[test]
fn add_with_invalid_base_fails() {
    let project = BareTestProject::new();

    bt()
        .args([
            "add",
            "bad-base",
            "-b",
            "--base",
            "nonexistent-ref-xyz",
            "--repo",
            &project.path().display().to_string(),
        ])
        .assert()
        .failure();
}

#[test]
fn add_rejects_prefix_conflicting_branch() {
    let project = BareTestProject::new();
    let repo = project.path().display().to_string();

    bt().args(["add", "feat", "-b", "--repo", &repo]).assert().success();

    bt()
        .args(["add", "feat/child", "-b", "--repo", &repo])
        .assert()
        .failure()
        .code(5)
        .stderr(predicate::str::contains("conflicts with existing ref"));
}

#[test]
fn remove_deletes_worktree_and_branch() {
    let project = BareTestProject::new();
    let repo = project.path().display().to_string();

    bt().args(["add", "to-remove", "-b", "--repo", &repo]).assert().success();

    bt()
        .args(["remove", "to-remove", "--with-branch", "--repo", &repo])
        .assert()
        .success();

    assert!(!project.worktree("to-remove").exists());
}

#[test]
fn remove_refuses_main_worktree() {
    let project = BareTestProject::new();

    bt()
        .args(["remove", "main", "--repo", &project.path().display().to_string()])
        .assert()
        .failure()
        .code(4);
}

#[test]
fn remove_json_includes_removed_path() {
    let project = BareTestProject::new();
    let repo = project.path().display().to_string();

    bt().args(["add", "json-rm", "-b", "--repo", &repo]).assert().success();

    let output = bt()
        .args(["remove", "json-rm", "--repo", &repo, "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let json: serde_json::Value = serde_json::from_slice(&output).expect("invalid json");
    assert_eq!(json["ok"], true);
    assert!(json["removed_path"].as_str().is_some());
    assert!(json["repo_root"].as_str().is_some());
}
