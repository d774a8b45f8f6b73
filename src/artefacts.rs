//! Shared Artefacts (spec.md §4.9, component C9).
//!
//! Two independent mechanisms keep per-worktree helper files in sync:
//! PostCreateAction runs on every new worktree (spec.md §4.7 step 4);
//! SyncToRootEntry keeps root-level symlinks pointed at the default-branch
//! worktree.

use std::os::unix::fs as unix_fs;
use std::path::{Path, PathBuf};

use crate::config::ProjectConfig;
use crate::domain::{PostCreateAction, PostCreateActionKind, ProjectLayout, SyncToRootEntry};
use crate::error::{BtError, Result};
use crate::index;

/// Apply every configured PostCreateAction to a freshly materialised
/// worktree. A non-zero Command exit is a warning, never a failure
/// (spec.md §4.9, §7 propagation policy) — everything else propagates.
pub fn apply_post_create(layout: &ProjectLayout, new_worktree: &Path) -> Result<()> {
    let cfg = ProjectConfig::new(&layout.git_dir_path);
    let default_worktree = default_branch_worktree(layout)?;

    for action in cfg.post_create_actions() {
        if let Err(e) = apply_one(layout, &default_worktree, new_worktree, &action) {
            if action.kind == PostCreateActionKind::Command {
                log::warn!("post-create command failed: {e}");
                continue;
            }
            return Err(e);
        }
    }
    Ok(())
}

fn apply_one(
    layout: &ProjectLayout,
    default_worktree: &Path,
    new_worktree: &Path,
    action: &PostCreateAction,
) -> Result<()> {
    match action.kind {
        PostCreateActionKind::Command => run_command(new_worktree, &action.target_or_cmd),
        PostCreateActionKind::Copy => {
            let src = default_worktree.join(&action.target_or_cmd);
            let dst = new_worktree.join(&action.target_or_cmd);
            if let Some(parent) = dst.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::copy(&src, &dst)?;
            Ok(())
        }
        PostCreateActionKind::Symlink if action.managed => {
            apply_managed_symlink(layout, default_worktree, new_worktree, &action.target_or_cmd)
        }
        PostCreateActionKind::Symlink => {
            let src = default_worktree.join(&action.target_or_cmd);
            let dst = new_worktree.join(&action.target_or_cmd);
            make_relative_symlink(&src, &dst)
        }
    }
}

/// The managed variant moves the artefact into `<root>/.shared/<relpath>`
/// once, then every worktree (including the default branch's) becomes a
/// symlink to the shared copy.
fn apply_managed_symlink(
    layout: &ProjectLayout,
    default_worktree: &Path,
    new_worktree: &Path,
    relpath: &str,
) -> Result<()> {
    let shared = layout.shared_dir().join(relpath);
    if !shared.exists() {
        let source = default_worktree.join(relpath);
        if source.exists() && !is_symlink(&source) {
            if let Some(parent) = shared.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::rename(&source, &shared)?;
            make_relative_symlink(&shared, &source)?;
        }
    }
    let dst = new_worktree.join(relpath);
    make_relative_symlink(&shared, &dst)
}

fn is_symlink(p: &Path) -> bool {
    std::fs::symlink_metadata(p).map(|m| m.file_type().is_symlink()).unwrap_or(false)
}

fn make_relative_symlink(target: &Path, link: &Path) -> Result<()> {
    if let Some(parent) = link.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let rel = relative_to(link.parent().unwrap_or(Path::new(".")), target);
    if link.exists() || is_symlink(link) {
        std::fs::remove_file(link)?;
    }
    unix_fs::symlink(&rel, link)?;
    Ok(())
}

fn relative_to(from: &Path, to: &Path) -> PathBuf {
    let from_abs = from.canonicalize().unwrap_or_else(|_| from.to_path_buf());
    let to_abs = to.canonicalize().unwrap_or_else(|_| to.to_path_buf());
    let from_comps: Vec<_> = from_abs.components().collect();
    let to_comps: Vec<_> = to_abs.components().collect();
    let common = from_comps
        .iter()
        .zip(to_comps.iter())
        .take_while(|(a, b)| a == b)
        .count();
    let mut rel = PathBuf::new();
    for _ in common..from_comps.len() {
        rel.push("..");
    }
    for comp in &to_comps[common..] {
        rel.push(comp);
    }
    rel
}

fn run_command(cwd: &Path, command: &str) -> Result<()> {
    let status = std::process::Command::new("sh")
        .arg("-c")
        .arg(command)
        .current_dir(cwd)
        .status()
        .map_err(|e| BtError::git(format!("failed to spawn post-create command: {e}")))?;
    if !status.success() {
        return Err(BtError::git(format!(
            "post-create command exited with status {:?}",
            status.code()
        )));
    }
    Ok(())
}

/// Scan every existing worktree for a non-symlink file already at
/// `relpath` (spec.md §4.9 conflict pre-check), run before a new Symlink
/// or Copy PostCreateAction is persisted.
pub fn check_conflicts(layout: &ProjectLayout, relpath: &str) -> Result<Vec<PathBuf>> {
    let worktrees = index::build(layout)?;
    let conflicts = worktrees
        .iter()
        .map(|w| w.path.join(relpath))
        .filter(|p| p.exists() && !is_symlink(p))
        .collect::<Vec<_>>();
    Ok(conflicts)
}

fn default_branch_worktree(layout: &ProjectLayout) -> Result<PathBuf> {
    let default = layout
        .default_branch
        .as_deref()
        .ok_or_else(|| BtError::invariant("project has no known default branch"))?;
    Ok(layout.root_path.join(default))
}

/// Re-run the configured PostCreateActions against every existing
/// worktree (spec.md §4.9 `apply`) — idempotent for Symlink/Copy when the
/// target already matches, reports a conflict otherwise.
pub fn reapply_all(layout: &ProjectLayout) -> Result<()> {
    let cfg = ProjectConfig::new(&layout.git_dir_path);
    let default_worktree = default_branch_worktree(layout)?;
    let worktrees = index::build(layout)?;
    for action in cfg.post_create_actions() {
        for wt in &worktrees {
            if wt.path == default_worktree && action.kind != PostCreateActionKind::Command {
                continue;
            }
            apply_one(layout, &default_worktree, &wt.path, &action)?;
        }
    }
    Ok(())
}

/// Re-target every SyncToRootEntry symlink at the (possibly just-changed)
/// default-branch worktree (spec.md §4.9).
pub fn resync_to_root(layout: &ProjectLayout) -> Result<()> {
    let cfg = ProjectConfig::new(&layout.git_dir_path);
    let default_worktree = default_branch_worktree(layout)?;
    for entry in cfg.sync_to_root_entries() {
        apply_sync_entry(layout, &default_worktree, &entry)?;
    }
    Ok(())
}

fn apply_sync_entry(
    layout: &ProjectLayout,
    default_worktree: &Path,
    entry: &SyncToRootEntry,
) -> Result<()> {
    let target = default_worktree.join(&entry.source_relpath);
    let link = layout.root_path.join(&entry.target_relpath);
    make_relative_symlink(&target, &link)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn relative_to_computes_up_and_over() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a/b");
        let b = dir.path().join("a/c/d.txt");
        std::fs::create_dir_all(&a).unwrap();
        std::fs::create_dir_all(b.parent().unwrap()).unwrap();
        std::fs::write(&b, b"x").unwrap();
        let rel = relative_to(&a, &b);
        assert_eq!(rel, PathBuf::from("../c/d.txt"));
    }
}
