#![allow(dead_code)]

use std::path::PathBuf;
use std::process::Command;

use assert_cmd::Command as AssertCommand;
use tempfile::TempDir;

/// Environment variables that can leak from parent git processes (e.g. hooks)
/// and interfere with subprocess calls in tests.
const GIT_ENV_OVERRIDES: &[&str] = &[
    "GIT_DIR",
    "GIT_WORK_TREE",
    "GIT_INDEX_FILE",
    "GIT_OBJECT_DIRECTORY",
    "GIT_ALTERNATE_OBJECT_DIRECTORIES",
    "GIT_PREFIX",
];

pub fn bt() -> AssertCommand {
    AssertCommand::new(assert_cmd::cargo_bin!("bt"))
}

/// Run a git command in the given directory (test helper).
pub fn run_git(args: &[&str], cwd: &std::path::Path) {
    let mut cmd = Command::new("git");
    cmd.args(args).current_dir(cwd);
    for var in GIT_ENV_OVERRIDES {
        cmd.env_remove(var);
    }
    let output = cmd.output().expect("failed to run git");
    assert!(
        output.status.success(),
        "git {} failed: {}",
        args.join(" "),
        String::from_utf8_lossy(&output.stderr)
    );
}

pub fn commit_file(cwd: &std::path::Path, filename: &str, content: &str, message: &str) {
    std::fs::write(cwd.join(filename), content).expect("write failed");
    run_git(&["add", "."], cwd);
    run_git(&["commit", "-m", message], cwd);
}

/// A plain (non-bare) temporary git repository, for `repo migrate` tests.
pub struct TestRepo {
    pub dir: TempDir,
}

impl TestRepo {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        let path = dir.path();

        run_git(&["init", "-b", "main"], path);
        run_git(&["config", "user.email", "test@test.com"], path);
        run_git(&["config", "user.name", "Test"], path);

        std::fs::write(path.join("README.md"), "# test repo\n").expect("write README");
        run_git(&["add", "."], path);
        run_git(&["commit", "-m", "initial commit"], path);

        Self { dir }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.path().canonicalize().expect("canonicalize temp dir")
    }
}

/// A Baretree project created through `bt init`: a bare repo at
/// `<root>/.git` with the initial branch materialised at `<root>/<branch>/`.
pub struct BareTestProject {
    pub dir: TempDir,
}

impl BareTestProject {
    pub fn new() -> Self {
        Self::with_branch("main")
    }

    pub fn with_branch(initial_branch: &str) -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        let path = dir.path().canonicalize().expect("canonicalize temp dir");

        bt()
            .args(["init", &path.display().to_string(), "--initial-branch", initial_branch])
            .assert()
            .success();

        let worktree = path.join(initial_branch);
        run_git(&["config", "user.email", "test@test.com"], &worktree);
        run_git(&["config", "user.name", "Test"], &worktree);

        Self { dir }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.path().canonicalize().expect("canonicalize temp dir")
    }

    pub fn worktree(&self, branch: &str) -> PathBuf {
        self.path().join(branch)
    }

    pub fn git_dir(&self) -> PathBuf {
        self.path().join(".git")
    }
}

/// A cloned repository with a bare "origin" remote, for remote-tracking
/// `add` resolution tests.
pub struct ClonedTestRepo {
    pub _origin: TempDir,
    pub clone: TempDir,
}

impl ClonedTestRepo {
    pub fn new() -> Self {
        let seed = TempDir::new().expect("failed to create seed dir");
        let seed_path = seed.path();
        run_git(&["init", "-b", "main"], seed_path);
        run_git(&["config", "user.email", "test@test.com"], seed_path);
        run_git(&["config", "user.name", "Test"], seed_path);
        std::fs::write(seed_path.join("README.md"), "# test\n").expect("write failed");
        run_git(&["add", "."], seed_path);
        run_git(&["commit", "-m", "initial commit"], seed_path);

        let bare = TempDir::new().expect("failed to create bare dir");
        run_git(
            &["clone", "--bare", &seed_path.display().to_string(), &bare.path().display().to_string()],
            seed_path,
        );
        drop(seed);

        let clone = TempDir::new().expect("failed to create clone dir");
        run_git(
            &["clone", &bare.path().display().to_string(), &clone.path().display().to_string()],
            bare.path(),
        );
        run_git(&["config", "user.email", "test@test.com"], clone.path());
        run_git(&["config", "user.name", "Test"], clone.path());

        Self { _origin: bare, clone }
    }

    pub fn path(&self) -> PathBuf {
        self.clone.path().canonicalize().expect("canonicalize clone dir")
    }

    pub fn origin_path(&self) -> PathBuf {
        self._origin.path().canonicalize().expect("canonicalize origin dir")
    }
}
