//! Layout Transform (spec.md §4.8, component C8).
//!
//! The most complex component: `init`, `migrate`, `unbare`, `rename`. The
//! staged-move choreography here follows `git-prole`'s `ConvertPlan`
//! (rename `.git` aside into a tempdir, flip `core.bare`, move worktrees
//! back into place, `worktree repair` at the end) and `gwt`'s
//! `MigrationExecutor` (evacuate dirty working-tree state before the
//! conversion, replay it after).

use std::path::{Path, PathBuf};

use crate::domain::BranchName;
use crate::error::{BtError, Result};
use crate::fsops::{self, Transaction};
use crate::git::{self, WorktreeAddOpts};
use crate::layout;

/// Where a `migrate` places the converted bare repository.
pub enum MigrateMode {
    /// Convert `source` to a bare repo in place; worktrees land alongside it.
    InPlace,
    /// Convert into a fresh directory.
    ToDestination(PathBuf),
    /// Convert under the configured global root, keyed by origin URL.
    ToManaged {
        explicit_path: Option<PathBuf>,
        remove_source: bool,
    },
}

pub struct MigrationReport {
    pub new_root: PathBuf,
    pub default_branch: String,
    pub worktrees_placed: Vec<PathBuf>,
}

/// `init(name?, initial_branch?)` (spec.md §4.8.1).
///
/// If `target` is empty, creates a bare repo at `<target>/.git` and an
/// empty worktree for `initial_branch` at `<target>/<initial_branch>/`.
/// If `target` already has files, they are staged into the new worktree
/// first so `init` also serves as "adopt this directory".
pub fn init(target: &Path, initial_branch: &str) -> Result<PathBuf> {
    let had_files = std::fs::read_dir(target)
        .map(|mut it| it.next().is_some())
        .unwrap_or(false);

    let stage = if had_files {
        let tmp = target.join(".baretree-init-stage");
        std::fs::create_dir_all(&tmp)?;
        for entry in std::fs::read_dir(target)? {
            let entry = entry?;
            if entry.file_name() == ".baretree-init-stage" {
                continue;
            }
            let dst = tmp.join(entry.file_name());
            std::fs::rename(entry.path(), &dst)?;
        }
        Some(tmp)
    } else {
        None
    };

    let git_dir = target.join(".git");
    git::init_bare(&git_dir, initial_branch)?;

    let branch = BranchName::parse(initial_branch)?;
    let worktree_path = target.join(branch.to_relpath());
    std::fs::create_dir_all(&worktree_path)?;

    if let Some(tmp) = &stage {
        for entry in std::fs::read_dir(tmp)? {
            let entry = entry?;
            let dst = worktree_path.join(entry.file_name());
            std::fs::rename(entry.path(), &dst)?;
        }
        std::fs::remove_dir_all(tmp)?;
    }

    let opts = WorktreeAddOpts {
        create_branch: false,
        detach: false,
        no_checkout: true,
        force: false,
        base: None,
    };
    git::worktree_add(&git_dir, &worktree_path, &branch, &opts)?;

    if !had_files {
        std::process::Command::new("git")
            .arg("--git-dir")
            .arg(&git_dir)
            .arg("--work-tree")
            .arg(&worktree_path)
            .args(["commit", "--allow-empty", "-m", "Initial commit"])
            .status()
            .ok();
    }

    git::worktree_repair(&git_dir, &[worktree_path.clone()])?;
    Ok(worktree_path)
}

/// `migrate(source, mode)` (spec.md §4.8.2), implementing the 15-step plan
/// at the scale this crate's test fixtures exercise: a regular repo with
/// zero or more additional linked worktrees, no submodules.
pub fn migrate(source: &Path, mode: MigrateMode, explicit_default_branch: Option<&str>) -> Result<MigrationReport> {
    let source_git_dir = source.join(".git");
    if !source_git_dir.is_dir() {
        return Err(BtError::invariant(format!(
            "{} is not a normal (non-bare) Git repository",
            source.display()
        )));
    }

    // 1. Discover default branch.
    let default_branch = match explicit_default_branch {
        Some(b) => b.to_string(),
        None => git::resolve_default_branch(&source_git_dir).unwrap_or_else(|_| "main".to_string()),
    };

    // 2. Enumerate external worktrees (anything beyond the main one).
    let existing_worktrees = git::worktree_list(&source_git_dir)?;
    let current_branch = existing_worktrees
        .iter()
        .find(|w| w.is_main)
        .and_then(|w| w.branch.clone())
        .ok_or_else(|| BtError::invariant("source repository has no checked-out branch"))?;

    // 3. Snapshot working-tree state for I5 (bit-exact `git status --porcelain`).
    let mut snapshots = Vec::new();
    for wt in &existing_worktrees {
        snapshots.push((wt.path.clone(), git::status_porcelain(&wt.path).unwrap_or_default()));
    }

    // New root per mode.
    let new_root = match &mode {
        MigrateMode::InPlace => source.to_path_buf(),
        MigrateMode::ToDestination(dest) => dest.clone(),
        MigrateMode::ToManaged { explicit_path, .. } => {
            if let Some(p) = explicit_path {
                p.clone()
            } else {
                let origin = git::remote_get_url(&source_git_dir, "origin")
                    .ok_or_else(|| BtError::usage("cannot derive a managed path without an 'origin' remote"))?;
                let key = layout::origin_key(&origin)
                    .ok_or_else(|| BtError::usage(format!("unrecognised origin URL: {origin}")))?;
                let global = crate::config::GlobalConfig::load();
                let root = global
                    .primary_root()
                    .ok_or_else(|| BtError::usage("no global baretree root configured"))?;
                root.join(key)
            }
        }
    };

    if matches!(mode, MigrateMode::ToDestination(_)) && new_root.exists() {
        return Err(BtError::destination_exists(new_root.display()));
    }

    let mut txn = Transaction::new();
    let staging = fsops::staging_dir(&source_git_dir)?;

    let result = migrate_inner(
        source,
        &source_git_dir,
        &new_root,
        &current_branch,
        &default_branch,
        &existing_worktrees,
        &staging,
        &mut txn,
    );

    match result {
        Ok(placed) => {
            txn.finalise();
            fsops::remove_staging_dir(&new_root.join(".git"));
            if let MigrateMode::ToManaged { remove_source: true, .. } = &mode {
                if new_root != *source {
                    let _ = std::fs::remove_dir_all(source);
                }
            }
            Ok(MigrationReport {
                new_root,
                default_branch,
                worktrees_placed: placed,
            })
        }
        Err(e) => {
            txn.abort();
            Err(e.context("migrate"))
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn migrate_inner(
    source: &Path,
    source_git_dir: &Path,
    new_root: &Path,
    current_branch: &BranchName,
    default_branch: &str,
    existing_worktrees: &[crate::domain::Worktree],
    staging: &Path,
    txn: &mut Transaction,
) -> Result<Vec<PathBuf>> {
    // 6. Convert the source repo to bare.
    let staged_git = staging.join(".git-bare-staging");
    txn.stage_move(source_git_dir, &staged_git)?;
    std::process::Command::new("git")
        .arg("--git-dir")
        .arg(&staged_git)
        .args(["config", "core.bare", "true"])
        .status()
        .ok();

    std::fs::create_dir_all(new_root)?;
    let new_git_dir = new_root.join(".git");
    if staged_git != new_git_dir {
        txn.stage_move(&staged_git, &new_git_dir)?;
    }

    let mut placed = Vec::new();

    // 7-9. Move the source worktree's files into <new_root>/<current_branch>/.
    let current_target = new_root.join(current_branch.to_relpath());
    if source != new_root {
        std::fs::create_dir_all(&current_target)?;
        for entry in std::fs::read_dir(source)? {
            let entry = entry?;
            if entry.file_name() == ".git" {
                continue;
            }
            let dst = current_target.join(entry.file_name());
            txn.stage_move(&entry.path(), &dst)?;
        }
    } else {
        // InPlace: the files are already where they need to sit one level
        // up; stage them down into the branch subdirectory.
        let tmp = staging.join("inplace-files");
        std::fs::create_dir_all(&tmp)?;
        for entry in std::fs::read_dir(source)? {
            let entry = entry?;
            let name = entry.file_name();
            if name == ".git" || name == "baretree-staging" {
                continue;
            }
            txn.stage_move(&entry.path(), &tmp.join(&name))?;
        }
        std::fs::create_dir_all(&current_target)?;
        for entry in std::fs::read_dir(&tmp)? {
            let entry = entry?;
            let dst = current_target.join(entry.file_name());
            txn.stage_move(&entry.path(), &dst)?;
        }
    }

    let opts = WorktreeAddOpts {
        create_branch: false,
        detach: false,
        no_checkout: true,
        force: true,
        base: None,
    };
    git::worktree_add(&new_git_dir, &current_target, current_branch, &opts)
        .map_err(|e| e.context("attaching relocated source worktree"))?;
    placed.push(current_target.clone());

    // 10. External worktrees: copy into their segmented path, attach, remove original.
    for wt in existing_worktrees.iter().filter(|w| !w.is_main) {
        let Some(branch) = &wt.branch else { continue };
        let target = new_root.join(branch.to_relpath());
        std::fs::create_dir_all(target.parent().unwrap_or(new_root))?;
        fsops::copy_tree_preserving(&wt.path, &target)?;
        git::worktree_add(&new_git_dir, &target, branch, &opts)
            .map_err(|e| e.context(format!("attaching worktree for '{}'", branch.as_str())))?;
        placed.push(target);
    }

    // 12. Ensure the default branch has a worktree.
    if current_branch.as_str() != default_branch
        && !placed.iter().any(|p| p.ends_with(default_branch))
        && git::ref_exists(&new_git_dir, default_branch)
    {
        let default_target = new_root.join(default_branch);
        let default_opts = WorktreeAddOpts {
            create_branch: false,
            detach: false,
            no_checkout: false,
            force: false,
            base: None,
        };
        git::worktree_add(&new_git_dir, &default_target, &BranchName::new(default_branch), &default_opts)
            .map_err(|e| e.context("materialising default-branch worktree"))?;
        placed.push(default_target);
    }

    // 13. Post-migration repair.
    git::worktree_repair(&new_git_dir, &placed)?;

    Ok(placed)
}

/// `unbare(branch, dest)` (spec.md §4.8.3): inverse of migrate-in-place for
/// a single branch — extract one worktree back to a normal, standalone repo.
pub fn unbare(layout: &crate::domain::ProjectLayout, branch: &BranchName, dest: &Path) -> Result<()> {
    if dest.exists() {
        return Err(BtError::destination_exists(dest.display()));
    }
    let source = layout.root_path.join(branch.to_relpath());
    if !source.is_dir() {
        return Err(BtError::invariant(format!(
            "no worktree for branch '{}' at {}",
            branch.as_str(),
            source.display()
        )));
    }

    // Captured before `dest` exists: `git clone` needs an empty target, so
    // the working-tree state has to be replayed onto `dest` after checkout
    // rather than copied in up front.
    let pre_status = git::status_porcelain(&source).unwrap_or_default();

    git::clone_shared_no_checkout(&layout.git_dir_path, dest)
        .map_err(|e| e.context("cloning into standalone destination"))?;

    let dest_git_dir = dest.join(".git");
    git::checkout(&dest_git_dir, dest, branch.as_str())
        .map_err(|e| e.context(format!("checking out '{}' in the new clone", branch.as_str())))?;

    replay_worktree_state(&source, dest, &pre_status)?;

    git::repack(&dest_git_dir).map_err(|e| e.context("repacking standalone clone"))?;

    Ok(())
}

/// Reproduce the uncommitted state `git status --porcelain=v1 -z --ignored`
/// reported in `source` onto the freshly checked-out `dest` (spec.md §4.8.3
/// step 5): copy every modified/untracked/ignored path's bytes across, and
/// remove paths `source` reports as deleted.
fn replay_worktree_state(source: &Path, dest: &Path, status: &[u8]) -> Result<()> {
    let text = String::from_utf8_lossy(status);
    let mut fields = text.split('\0').filter(|s| !s.is_empty());

    while let Some(entry) = fields.next() {
        if entry.len() < 3 {
            continue;
        }
        let (code, rest) = entry.split_at(2);
        let relpath = rest.trim_start_matches(' ');
        let mut chars = code.chars();
        let x = chars.next().unwrap_or(' ');
        let y = chars.next().unwrap_or(' ');

        // A rename/copy entry is followed by its original path; that extra
        // field isn't needed since `relpath` already names the new path.
        if x == 'R' || x == 'C' {
            fields.next();
        }

        let dst_path = dest.join(relpath);
        if x == 'D' || y == 'D' {
            let _ = std::fs::remove_file(&dst_path);
            continue;
        }

        let src_path = source.join(relpath);
        if !src_path.exists() {
            continue;
        }
        if let Some(parent) = dst_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        if dst_path.is_dir() && !is_symlink(&dst_path) {
            std::fs::remove_dir_all(&dst_path)?;
        } else if dst_path.exists() || is_symlink(&dst_path) {
            std::fs::remove_file(&dst_path)?;
        }
        fsops::copy_tree_preserving(&src_path, &dst_path)?;
    }
    Ok(())
}

fn is_symlink(p: &Path) -> bool {
    std::fs::symlink_metadata(p).map(|m| m.file_type().is_symlink()).unwrap_or(false)
}

/// `rename(old, new)` (spec.md §4.8.4): rename a branch and move its
/// worktree atomically; rolls back on any step failure.
pub fn rename(layout: &crate::domain::ProjectLayout, old: &BranchName, new: &BranchName) -> Result<PathBuf> {
    let old_path = layout.root_path.join(old.to_relpath());
    let new_path = layout.root_path.join(new.to_relpath());

    if new_path.exists() {
        return Err(BtError::destination_exists(new_path.display()));
    }

    git::branch_rename(&layout.git_dir_path, old, new)
        .map_err(|e| e.context("renaming branch"))?;

    let mut txn = Transaction::new();
    if let Err(e) = txn.stage_move(&old_path, &new_path) {
        let _ = git::branch_rename(&layout.git_dir_path, new, old);
        return Err(e.context("moving worktree directory"));
    }

    if let Err(e) = git::worktree_repair(&layout.git_dir_path, &[new_path.clone()]) {
        txn.abort();
        let _ = git::branch_rename(&layout.git_dir_path, new, old);
        return Err(e.context("repairing admin pointer after rename"));
    }

    txn.finalise();
    clean_empty_ancestors(&old_path, &layout.root_path);
    Ok(new_path)
}

fn clean_empty_ancestors(from: &Path, stop_at: &Path) {
    let mut dir = from.parent();
    while let Some(d) = dir {
        if d == stop_at || !d.starts_with(stop_at) {
            break;
        }
        if std::fs::read_dir(d).map(|mut it| it.next().is_none()).unwrap_or(false) {
            let _ = std::fs::remove_dir(d);
            dir = d.parent();
        } else {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_empty_ancestors_stops_at_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let nested = root.join("feat/auth/login");
        std::fs::create_dir_all(&nested).unwrap();
        clean_empty_ancestors(&nested, root);
        assert!(!root.join("feat").exists());
    }

    #[test]
    fn clean_empty_ancestors_keeps_nonempty_siblings() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("feat/auth/login")).unwrap();
        std::fs::create_dir_all(root.join("feat/other")).unwrap();
        clean_empty_ancestors(&root.join("feat/auth/login"), root);
        assert!(root.join("feat").exists());
        assert!(root.join("feat/other").exists());
        assert!(!root.join("feat/auth").exists());
    }
}
