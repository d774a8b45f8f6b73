mod fixtures;

use predicates::prelude::*;
use tempfile::TempDir;

use fixtures::bt;

#[test]
fn init_creates_bare_repo_and_default_worktree() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().canonicalize().unwrap();

    bt()
        .args(["init", &path.display().to_string(), "--initial-branch", "main"])
        .assert()
        .success();

    assert!(path.join(".git").is_dir());
    assert!(path.join("main").is_dir());
    assert!(path.join("main").join(".git").is_file());
}

#[test]
fn init_defaults_branch_to_main_when_unspecified() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().canonicalize().unwrap();

    bt().args(["init", &path.display().to_string()]).assert().success();

    assert!(path.join("main").is_dir());
}

#[test]
fn init_json_reports_repo_root_and_worktree_path() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().canonicalize().unwrap();

    bt()
        .args(["init", &path.display().to_string(), "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"ok\": true"))
        .stdout(predicate::str::contains("\"repo_root\""));
}

#[test]
fn init_adopts_existing_files_into_the_initial_worktree() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().canonicalize().unwrap();
    std::fs::write(path.join("existing.txt"), "hi").unwrap();

    bt()
        .args(["init", &path.display().to_string(), "--initial-branch", "main"])
        .assert()
        .success();

    assert!(path.join("main").join("existing.txt").is_file());
    assert!(!path.join("existing.txt").exists());
}

#[test]
fn shell_init_bash_prints_wrapper_function() {
    bt()
        .args(["shell-init", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("bt()"));
}

#[test]
fn shell_init_zsh_prints_compdef() {
    bt()
        .args(["shell-init", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("compdef"));
}

#[test]
fn shell_init_fish_prints_complete_directive() {
    bt()
        .args(["shell-init", "fish"])
        .assert()
        .success()
        .stdout(predicate::str::contains("complete -c bt"));
}
