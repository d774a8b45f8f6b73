//! Git Driver (spec.md §4.2, component C2).
//!
//! The only module that spawns a `git` subprocess; every failure is
//! classified here so no other layer reclassifies a raw exit code or
//! stderr string.

use std::path::{Path, PathBuf};
use std::process::Command as Cmd;

use crate::domain::{Branch, BranchName, Worktree, WorktreeState};
use crate::error::{BtError, Result};

/// Environment variables that can leak from parent git processes (e.g. hooks)
/// and interfere with our subprocess calls.
const GIT_ENV_OVERRIDES: &[&str] = &[
    "GIT_DIR",
    "GIT_WORK_TREE",
    "GIT_INDEX_FILE",
    "GIT_OBJECT_DIRECTORY",
    "GIT_ALTERNATE_OBJECT_DIRECTORIES",
    "GIT_PREFIX",
];

/// Options for [`worktree_add`].
#[derive(Debug, Default, Clone)]
pub struct WorktreeAddOpts<'a> {
    /// Create a new branch (`-b`) rather than checking out an existing one.
    pub create_branch: bool,
    /// Check out in detached-HEAD state rather than on a branch.
    pub detach: bool,
    /// Skip populating the working tree (used by the Layout Transform to
    /// attach a pre-existing directory without touching its files).
    pub no_checkout: bool,
    pub force: bool,
    pub base: Option<&'a str>,
}

/// Run a git command with an explicit `--git-dir` (and optional
/// `--work-tree`), returning stdout on success.
///
/// Clears inherited `GIT_*` environment variables that could redirect
/// operations to the wrong repository (common when invoked from git hooks).
fn run(git_dir: &Path, work_tree: Option<&Path>, args: &[&str]) -> Result<String> {
    let mut cmd = Cmd::new("git");
    cmd.arg("--git-dir").arg(git_dir);
    if let Some(wt) = work_tree {
        cmd.arg("--work-tree").arg(wt);
    }
    cmd.args(args);
    cmd.env("GIT_TERMINAL_PROMPT", "0");
    for var in GIT_ENV_OVERRIDES {
        cmd.env_remove(var);
    }

    log::debug!("git --git-dir {} {}", git_dir.display(), args.join(" "));

    let output = cmd
        .output()
        .map_err(|e| BtError::git(format!("failed to run git: {e}")))?;

    log::debug!("git exit: {:?}", output.status.code());

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(classify_git_error(stderr.trim()));
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Run a plain `git` invocation rooted at `cwd`, used only before an
/// explicit `--git-dir` is known (e.g. discovering the repo root itself).
fn run_in(cwd: &Path, args: &[&str]) -> Result<String> {
    let mut cmd = Cmd::new("git");
    cmd.args(args).current_dir(cwd);
    cmd.env("GIT_TERMINAL_PROMPT", "0");
    for var in GIT_ENV_OVERRIDES {
        cmd.env_remove(var);
    }
    log::debug!("git (in {}) {}", cwd.display(), args.join(" "));
    let output = cmd
        .output()
        .map_err(|e| BtError::git(format!("failed to run git: {e}")))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(classify_git_error(stderr.trim()));
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

fn run_success(git_dir: &Path, args: &[&str]) -> bool {
    let mut cmd = Cmd::new("git");
    cmd.arg("--git-dir").arg(git_dir).args(args);
    for var in GIT_ENV_OVERRIDES {
        cmd.env_remove(var);
    }
    cmd.output().map(|o| o.status.success()).unwrap_or(false)
}

/// Inspect git stderr to map known error patterns to the correct exit code;
/// the table stays intentionally small, everything else falls to `Git`.
fn classify_git_error(msg: &str) -> BtError {
    let lower = msg.to_lowercase();

    if lower.contains("not a git repository") {
        return BtError::not_a_repo(msg);
    }
    if lower.contains("could not resolve host")
        || lower.contains("could not read from remote repository")
        || lower.contains("connection timed out")
        || lower.contains("unable to access")
    {
        return BtError::remote_unreachable(msg);
    }
    if lower.contains("unmerged")
        || lower.contains("modified")
        || lower.contains("dirty")
        || lower.contains("already exists")
        || lower.contains("already checked out")
        || lower.contains("is not fully merged")
    {
        return BtError::conflict(msg);
    }
    if lower.contains("did not match any file") || lower.contains("unknown revision") {
        return BtError::usage(msg);
    }
    BtError::git(msg)
}

pub fn init_bare(dir: &Path, initial_branch: &str) -> Result<()> {
    std::fs::create_dir_all(dir)?;
    run_in(dir, &["init", "--bare", "-b", initial_branch, "."])?;
    Ok(())
}

pub fn clone(url: &str, dir: &Path, bare: bool) -> Result<()> {
    let mut args = vec!["clone"];
    if bare {
        args.push("--bare");
    }
    args.push(url);
    let dir_str = dir.display().to_string();
    args.push(&dir_str);
    let parent = dir.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent)?;
    run_in(parent, &args)?;
    Ok(())
}

/// Clone `source_git_dir` into `dest` as a normal, standalone repository,
/// sharing the object store (`--shared`) instead of duplicating it, without
/// populating the working tree. Used by [`crate::transform::unbare`] — `dest`
/// must not already exist, since `git clone` refuses a non-empty target.
pub fn clone_shared_no_checkout(source_git_dir: &Path, dest: &Path) -> Result<()> {
    let parent = dest.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent)?;
    let source_str = source_git_dir.display().to_string();
    let dest_str = dest.display().to_string();
    run_in(
        parent,
        &["clone", "--shared", "--no-checkout", &source_str, &dest_str],
    )?;
    Ok(())
}

/// Check out `branch` into `work_tree`, populating the working tree.
pub fn checkout(git_dir: &Path, work_tree: &Path, branch: &str) -> Result<()> {
    run(git_dir, Some(work_tree), &["checkout", branch])?;
    Ok(())
}

/// Repack the object store, dropping now-unreachable objects — used after
/// `unbare` to stop sharing the source repository's object store.
pub fn repack(git_dir: &Path) -> Result<()> {
    run(git_dir, None, &["repack", "-a", "-d"])?;
    Ok(())
}

pub fn worktree_add(
    git_dir: &Path,
    path: &Path,
    branch: &BranchName,
    opts: &WorktreeAddOpts,
) -> Result<()> {
    let path_str = path.display().to_string();
    let mut args: Vec<&str> = vec!["worktree", "add"];
    if opts.force {
        args.push("--force");
    }
    if opts.no_checkout {
        args.push("--no-checkout");
    }
    if opts.create_branch {
        args.push("-b");
        args.push(branch.as_str());
    }
    if opts.detach {
        args.push("--detach");
    }
    args.push(&path_str);
    if let Some(base) = opts.base {
        args.push(base);
    } else if !opts.create_branch && !opts.detach {
        args.push(branch.as_str());
    }
    run(git_dir, None, &args)?;
    Ok(())
}

pub fn worktree_remove(git_dir: &Path, path: &Path, force: bool) -> Result<()> {
    let path_str = path.display().to_string();
    let mut args = vec!["worktree", "remove"];
    if force {
        args.push("--force");
    }
    args.push(&path_str);
    run(git_dir, None, &args)?;
    Ok(())
}

pub fn worktree_move(git_dir: &Path, old: &Path, new: &Path) -> Result<()> {
    let old_str = old.display().to_string();
    let new_str = new.display().to_string();
    run(git_dir, None, &["worktree", "move", &old_str, &new_str])?;
    Ok(())
}

pub fn worktree_repair(git_dir: &Path, paths: &[PathBuf]) -> Result<()> {
    let mut args = vec!["worktree".to_string(), "repair".to_string()];
    args.extend(paths.iter().map(|p| p.display().to_string()));
    let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
    run(git_dir, None, &arg_refs)?;
    Ok(())
}

pub fn worktree_prune(git_dir: &Path) {
    let _ = run(git_dir, None, &["worktree", "prune"]);
}

/// A raw worktree entry parsed from porcelain lines.
struct RawEntry {
    path: PathBuf,
    commit: String,
    branch: Option<String>,
    is_bare: bool,
    is_detached: bool,
}

fn apply_porcelain_line(
    line: &str,
    path: &mut Option<PathBuf>,
    commit: &mut String,
    branch: &mut Option<String>,
    is_bare: &mut bool,
    is_detached: &mut bool,
) {
    if let Some(p) = line.strip_prefix("worktree ") {
        *path = Some(PathBuf::from(p));
    } else if let Some(h) = line.strip_prefix("HEAD ") {
        *commit = h.to_string();
    } else if let Some(b) = line.strip_prefix("branch ") {
        *branch = Some(b.strip_prefix("refs/heads/").unwrap_or(b).to_string());
    } else if line == "bare" {
        *is_bare = true;
    } else if line == "detached" {
        *is_detached = true;
    }
}

/// Parse a single porcelain block (lines between blank separators).
fn parse_porcelain_block(block: &str) -> Option<RawEntry> {
    let mut path: Option<PathBuf> = None;
    let mut commit = String::new();
    let mut branch = None;
    let mut is_bare = false;
    let mut is_detached = false;

    for line in block.lines() {
        apply_porcelain_line(
            line,
            &mut path,
            &mut commit,
            &mut branch,
            &mut is_bare,
            &mut is_detached,
        );
    }

    path.map(|p| RawEntry {
        path: p,
        commit,
        branch,
        is_bare,
        is_detached,
    })
}

/// The per-worktree admin directory Git records for a given working-tree
/// path, found by reading the worktree's `.git` file (spec.md GLOSSARY).
fn admin_dir_for(worktree_path: &Path) -> Option<PathBuf> {
    let dotgit = worktree_path.join(".git");
    let contents = std::fs::read_to_string(&dotgit).ok()?;
    let pointer = contents.trim().strip_prefix("gitdir: ")?;
    Some(PathBuf::from(pointer))
}

/// List all worktrees via `git worktree list --porcelain`.
///
/// The first entry in `git worktree list` is always the main worktree (per
/// Git's own invariant), so `is_main` is index-derived rather than
/// path-compared — this survives symlink/canonicalization mismatches.
pub fn worktree_list(git_dir: &Path) -> Result<Vec<Worktree>> {
    worktree_prune(git_dir);
    let raw = run(git_dir, None, &["worktree", "list", "--porcelain"])?;
    let blocks: Vec<&str> = raw.split("\n\n").collect();

    let worktrees = blocks
        .iter()
        .filter_map(|block| parse_porcelain_block(block))
        .filter(|entry| !entry.is_bare)
        .enumerate()
        .map(|(idx, entry)| Worktree {
            branch: entry.branch.map(BranchName::new),
            admin_dir: admin_dir_for(&entry.path),
            path: entry.path,
            head_commit: entry.commit.chars().take(12).collect(),
            state: WorktreeState::Consistent,
            is_main: idx == 0,
            is_detached: entry.is_detached,
        })
        .collect();

    Ok(worktrees)
}

pub fn branch_list(git_dir: &Path, include_remote: bool) -> Result<Vec<Branch>> {
    let fmt = "%(refname:short)\t%(upstream:short)\t%(objectname)";
    let mut args = vec!["for-each-ref", "--format", fmt, "refs/heads"];
    if include_remote {
        args.push("refs/remotes");
    }
    let out = run(git_dir, None, &args)?;
    Ok(out
        .lines()
        .filter_map(|line| {
            let mut parts = line.splitn(3, '\t');
            let name = parts.next()?;
            let upstream = parts.next().filter(|s| !s.is_empty()).map(String::from);
            let commit = parts.next().unwrap_or_default().to_string();
            Some(Branch {
                name: BranchName::new(name),
                upstream,
                last_commit_id: commit,
            })
        })
        .collect())
}

pub fn branch_rename(git_dir: &Path, old: &BranchName, new: &BranchName) -> Result<()> {
    run(git_dir, None, &["branch", "-m", old.as_str(), new.as_str()])?;
    Ok(())
}

/// Delete a local branch.
pub fn branch_delete(git_dir: &Path, branch: &BranchName, force: bool) -> Result<()> {
    let flag = if force { "-D" } else { "-d" };
    run(git_dir, None, &["branch", flag, branch.as_str()])?;
    Ok(())
}

/// Check if a local branch exists.
pub fn ref_exists(git_dir: &Path, name: &str) -> bool {
    run_success(git_dir, &["rev-parse", "--verify", &format!("refs/heads/{name}")])
}

pub fn remote_branch_exists(git_dir: &Path, remote: &str, branch: &str) -> bool {
    run_success(
        git_dir,
        &["rev-parse", "--verify", &format!("refs/remotes/{remote}/{branch}")],
    )
}

pub fn fetch(git_dir: &Path, remote: Option<&str>) -> Result<()> {
    let mut args = vec!["fetch"];
    if let Some(r) = remote {
        args.push(r);
    }
    run(git_dir, None, &args)?;
    Ok(())
}

pub fn status_porcelain(worktree: &Path) -> Result<Vec<u8>> {
    let git_dir = worktree.join(".git");
    let out = run(
        &git_dir,
        Some(worktree),
        &["status", "--porcelain=v1", "-z", "--ignored"],
    )?;
    Ok(out.into_bytes())
}

pub fn ahead_behind(git_dir: &Path, upstream: &str, branch: &str) -> Result<(u32, u32)> {
    let range = format!("{upstream}...{branch}");
    let out = run(git_dir, None, &["rev-list", "--left-right", "--count", &range])?;
    let mut parts = out.split_whitespace();
    let behind: u32 = parts.next().and_then(|s| s.parse().ok()).unwrap_or(0);
    let ahead: u32 = parts.next().and_then(|s| s.parse().ok()).unwrap_or(0);
    Ok((ahead, behind))
}

pub struct SubmoduleEntry {
    pub path: PathBuf,
}

pub fn submodule_list(worktree: &Path) -> Result<Vec<SubmoduleEntry>> {
    let git_dir = worktree.join(".git");
    let out = run(&git_dir, Some(worktree), &["submodule", "status", "--recursive"])
        .unwrap_or_default();
    Ok(out
        .lines()
        .filter_map(|line| {
            let path = line.split_whitespace().nth(1)?;
            Some(SubmoduleEntry {
                path: PathBuf::from(path),
            })
        })
        .collect())
}

/// Resolve a revision to confirm it exists.
pub fn rev_exists(git_dir: &Path, rev: &str) -> bool {
    run_success(git_dir, &["rev-parse", "--verify", rev])
}

pub fn rev_parse(git_dir: &Path, spec: &str) -> Result<String> {
    run(git_dir, None, &["rev-parse", "--verify", spec])
}

/// Check whether `branch` is an ancestor of `mainline`.
pub fn is_ancestor(git_dir: &Path, branch: &str, mainline: &str) -> bool {
    run_success(git_dir, &["merge-base", "--is-ancestor", branch, mainline])
}

/// Auto-detect the default branch (spec.md §4.8.2 step 1).
///
/// Resolution order:
/// 1. `refs/remotes/origin/HEAD` → resolve symbolic ref
/// 2. Local branch named `main`
/// 3. Local branch named `master`
/// 4. The main worktree's current branch
pub fn resolve_default_branch(git_dir: &Path) -> Result<String> {
    if let Ok(symref) = run(
        git_dir,
        None,
        &["symbolic-ref", "--short", "refs/remotes/origin/HEAD"],
    ) {
        return Ok(symref.strip_prefix("origin/").unwrap_or(&symref).to_string());
    }
    if ref_exists(git_dir, "main") {
        return Ok("main".to_string());
    }
    if ref_exists(git_dir, "master") {
        return Ok("master".to_string());
    }
    let worktrees = worktree_list(git_dir)?;
    worktrees
        .iter()
        .find(|w| w.is_main)
        .and_then(|w| w.branch.as_ref())
        .map(|b| b.as_str().to_string())
        .ok_or_else(|| BtError::git("could not determine default branch; pass one explicitly"))
}

pub fn push(git_dir: &Path, work_tree: &Path, branch: &str) -> Result<()> {
    run(git_dir, Some(work_tree), &["push", "origin", branch])?;
    Ok(())
}

/// Scope for a git-config read/write.
#[derive(Debug, Clone, Copy)]
pub enum ConfigScope {
    /// The project's bare repo (`baretree.*` keys).
    Project,
    /// The user-level config (`--global`).
    Global,
}

pub fn config_get(git_dir: &Path, scope: ConfigScope, key: &str) -> Option<String> {
    config_get_all(git_dir, scope, key).into_iter().next()
}

pub fn config_get_all(git_dir: &Path, scope: ConfigScope, key: &str) -> Vec<String> {
    let output = match scope {
        ConfigScope::Project => {
            let mut cmd = Cmd::new("git");
            cmd.arg("--git-dir").arg(git_dir).args(["config", "--get-all", key]);
            for var in GIT_ENV_OVERRIDES {
                cmd.env_remove(var);
            }
            cmd.output()
        }
        ConfigScope::Global => {
            let mut cmd = Cmd::new("git");
            cmd.args(["config", "--global", "--get-all", key]);
            cmd.output()
        }
    };
    output
        .ok()
        .filter(|o| o.status.success())
        .map(|o| {
            String::from_utf8_lossy(&o.stdout)
                .lines()
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}

pub fn config_set(git_dir: &Path, scope: ConfigScope, key: &str, value: &str) -> Result<()> {
    match scope {
        ConfigScope::Project => {
            run(git_dir, None, &["config", key, value])?;
        }
        ConfigScope::Global => {
            run_global(&["config", "--global", key, value])?;
        }
    }
    Ok(())
}

pub fn config_add(git_dir: &Path, scope: ConfigScope, key: &str, value: &str) -> Result<()> {
    match scope {
        ConfigScope::Project => {
            run(git_dir, None, &["config", "--add", key, value])?;
        }
        ConfigScope::Global => {
            run_global(&["config", "--global", "--add", key, value])?;
        }
    }
    Ok(())
}

pub fn config_unset(git_dir: &Path, scope: ConfigScope, key: &str) -> Result<()> {
    match scope {
        ConfigScope::Project => {
            let _ = run(git_dir, None, &["config", "--unset-all", key]);
        }
        ConfigScope::Global => {
            let _ = run_global(&["config", "--global", "--unset-all", key]);
        }
    }
    Ok(())
}

fn run_global(args: &[&str]) -> Result<String> {
    let mut cmd = Cmd::new("git");
    cmd.args(args);
    let output = cmd
        .output()
        .map_err(|e| BtError::git(format!("failed to run git: {e}")))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(classify_git_error(stderr.trim()));
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Resolve the containing Git repository from an arbitrary starting
/// directory, distinguishing Regular from Baretree (bare) layouts for the
/// Layout Model (spec.md §4.4). Returns `(root_path, is_bare)`.
pub fn discover_repo(start: &Path) -> Result<(PathBuf, bool)> {
    // `--git-common-dir` resolves to the *main* worktree's git dir even when
    // `start` sits inside a linked worktree, unlike `--show-toplevel` (which
    // would return the linked worktree's own root). Querying bare-ness
    // against that common dir directly also sidesteps
    // `--is-bare-repository` reporting `false` from inside any worktree
    // (linked or main) of a bare repo, since that flag reflects the
    // worktree's working-tree context rather than the shared repository.
    let common = run_in(start, &["rev-parse", "--git-common-dir"]).map_err(|_| {
        BtError::not_a_repo(format!("not a git repository: {}", start.display()))
    })?;
    let common_path = start.join(&common);
    let common_canonical = common_path.canonicalize().unwrap_or(common_path);

    let is_bare = run_in(&common_canonical, &["rev-parse", "--is-bare-repository"])
        .map(|s| s == "true")
        .unwrap_or(false);

    let root = common_canonical
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| common_canonical.clone());

    Ok((root, is_bare))
}

pub fn remote_get_url(git_dir: &Path, remote: &str) -> Option<String> {
    run(git_dir, None, &["remote", "get-url", remote]).ok()
}

pub fn remote_add(git_dir: &Path, remote: &str, url: &str) -> Result<()> {
    run(git_dir, None, &["remote", "add", remote, url])?;
    Ok(())
}

pub fn symbolic_ref_set(git_dir: &Path, name: &str, target: &str) -> Result<()> {
    run(git_dir, None, &["symbolic-ref", name, target])?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_porcelain_basic() {
        let raw = "\
worktree /home/user/project
HEAD abc1234567890
branch refs/heads/main

worktree /home/user/project/feat/x
HEAD def4567890abc
branch refs/heads/feat/x

";
        let blocks: Vec<&str> = raw.split("\n\n").collect();
        let entries: Vec<_> = blocks.iter().filter_map(|b| parse_porcelain_block(b)).collect();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].branch.as_deref(), Some("main"));
        assert_eq!(entries[1].branch.as_deref(), Some("feat/x"));
        assert!(!entries[0].is_bare);
    }

    #[test]
    fn parse_porcelain_bare_skipped() {
        let raw = "worktree /repo\nHEAD abc1234\nbare\n\n";
        let blocks: Vec<&str> = raw.split("\n\n").collect();
        let entries: Vec<_> = blocks
            .iter()
            .filter_map(|b| parse_porcelain_block(b))
            .filter(|e| !e.is_bare)
            .collect();
        assert!(entries.is_empty());
    }

    #[test]
    fn parse_porcelain_no_trailing_newline() {
        let raw = "worktree /repo\nHEAD abc1234\nbranch refs/heads/main";
        let entries: Vec<_> = raw.split("\n\n").filter_map(|b| parse_porcelain_block(b)).collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn classify_not_a_repo() {
        let err = classify_git_error("fatal: not a git repository (or any of the parent directories)");
        assert_eq!(err.code, crate::error::ExitCode::NotARepo);
    }

    #[test]
    fn classify_already_exists_is_conflict() {
        let err = classify_git_error("fatal: 'feature/x' already exists");
        assert_eq!(err.code, crate::error::ExitCode::Conflict);
    }

    #[test]
    fn classify_already_checked_out_is_conflict() {
        let err = classify_git_error("fatal: 'feature/x' is already checked out at '/repo/feat'");
        assert_eq!(err.code, crate::error::ExitCode::Conflict);
    }

    #[test]
    fn classify_remote_unreachable() {
        let err = classify_git_error(
            "fatal: unable to access 'https://example.com/x.git/': Could not resolve host",
        );
        assert_eq!(err.code, crate::error::ExitCode::Remote);
    }

    #[test]
    fn classify_unknown_falls_to_git() {
        let err = classify_git_error("fatal: something unexpected");
        assert_eq!(err.code, crate::error::ExitCode::Git);
    }
}
