mod fixtures;

use predicates::prelude::*;

use fixtures::{bt, BareTestProject};

fn add_worktree(repo_path: &str, branch: &str) -> String {
    let output = bt()
        .args(["add", branch, "-b", "--repo", repo_path, "--print-cd-path"])
        .output()
        .expect("failed to run bt add");
    assert!(output.status.success());
    String::from_utf8(output.stdout).expect("invalid utf8").trim().to_string()
}

#[test]
fn go_resolves_existing_worktree() {
    let project = BareTestProject::new();
    let repo = project.path().display().to_string();
    add_worktree(&repo, "go-target");

    let output = bt()
        .args(["go", "go-target", "--repo", &repo])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let stdout = String::from_utf8(output).expect("invalid utf8");
    assert!(stdout.trim().ends_with("go-target"));
}

#[test]
fn go_always_prints_bare_path() {
    let project = BareTestProject::new();
    let repo = project.path().display().to_string();
    add_worktree(&repo, "cd-go");

    let output = bt()
        .args(["go", "cd-go", "--repo", &repo])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let path = String::from_utf8(output).expect("invalid utf8");
    let path = path.trim();
    assert!(path.starts_with('/'));
    assert!(path.ends_with("cd-go"));
    assert!(!path.starts_with('{'));
}

#[test]
fn cd_is_an_alias_for_go() {
    let project = BareTestProject::new();
    let repo = project.path().display().to_string();
    add_worktree(&repo, "cd-alias");

    let via_go = bt()
        .args(["go", "cd-alias", "--repo", &repo])
        .output()
        .expect("go failed")
        .stdout;
    let via_cd = bt()
        .args(["cd", "cd-alias", "--repo", &repo])
        .output()
        .expect("cd failed")
        .stdout;
    assert_eq!(via_go, via_cd);
}

#[test]
fn go_fails_for_nonexistent_branch() {
    let project = BareTestProject::new();
    let repo = project.path().display().to_string();

    bt()
        .args(["go", "nonexistent-branch", "--repo", &repo])
        .assert()
        .failure();
}

#[test]
fn go_no_token_non_tty_errors_with_multiple_worktrees() {
    let project = BareTestProject::new();
    let repo = project.path().display().to_string();

    for branch in ["picker-a", "picker-b"] {
        add_worktree(&repo, branch);
    }

    bt()
        .args(["go", "--repo", &repo])
        .assert()
        .failure()
        .stderr(predicate::str::contains("interactive mode requires a terminal"));
}

#[test]
fn go_no_token_auto_selects_single_worktree() {
    let project = BareTestProject::new();
    let repo = project.path().display().to_string();
    add_worktree(&repo, "only-one");

    let output = bt()
        .args(["go", "--repo", &repo])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let stdout = String::from_utf8(output).expect("invalid utf8");
    assert!(stdout.trim().ends_with("only-one"));
}

#[test]
fn go_with_explicit_token_ignores_interactive_flag() {
    let project = BareTestProject::new();
    let repo = project.path().display().to_string();
    add_worktree(&repo, "explicit-token");
    add_worktree(&repo, "other-token");

    bt()
        .args(["go", "explicit-token", "-i", "--repo", &repo])
        .assert()
        .success()
        .stdout(predicate::str::contains("explicit-token"));
}

#[test]
fn go_no_worktrees_to_select_errors() {
    let project = BareTestProject::new();
    let repo = project.path().display().to_string();

    bt()
        .args(["go", "--repo", &repo])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no worktrees to switch to"));
}
