//! Worktree Index (spec.md §4.5, component C5).
//!
//! Cross-references the Git Driver's worktree list against what Git's
//! per-worktree admin pointer and the on-disk hierarchical path agree the
//! branch should be, producing the three-way consistency verdict of
//! spec.md I1.

use std::path::Path;

use crate::domain::{BranchName, ProjectLayout, Worktree, WorktreeState};
use crate::error::Result;
use crate::git;
use crate::pathcodec;

/// Build the full index for a project: every worktree Git knows about,
/// annotated with its [`WorktreeState`] verdict.
pub fn build(layout: &ProjectLayout) -> Result<Vec<Worktree>> {
    let mut worktrees = git::worktree_list(&layout.git_dir_path)?;
    let local_branches: Vec<String> = git::branch_list(&layout.git_dir_path, false)
        .map(|branches| branches.into_iter().map(|b| b.name.as_str().to_string()).collect())
        .unwrap_or_default();
    for wt in &mut worktrees {
        wt.state = classify(layout, wt, &local_branches);
    }
    Ok(worktrees)
}

/// Verdict matrix (spec.md §4.5): compare the branch Git's admin pointer
/// names against the branch the on-disk relative path would decode to.
///
/// `local_branches` disambiguates the two ways that comparison can fail:
/// if the path decodes to a branch name that no longer exists, that branch
/// was renamed out from under this worktree (`BranchRenamed`); otherwise
/// the directory itself was relocated to a path that doesn't match its
/// branch's hierarchical convention (`PathMoved`).
fn classify(layout: &ProjectLayout, wt: &Worktree, local_branches: &[String]) -> WorktreeState {
    if wt.is_main {
        return WorktreeState::Consistent;
    }
    if wt.admin_dir.is_none() {
        return WorktreeState::AdminMissing;
    }
    let Some(branch) = &wt.branch else {
        return WorktreeState::Consistent; // detached worktrees have no hierarchy to check
    };

    let relpath = match wt.path.strip_prefix(&layout.root_path) {
        Ok(p) => p,
        Err(_) => return WorktreeState::PathMoved,
    };

    let expected_relpath = branch.to_relpath();
    if relpath == expected_relpath {
        return WorktreeState::Consistent;
    }

    match pathcodec::relpath_to_branch(relpath) {
        Ok(decoded) if decoded == branch.as_str() => WorktreeState::Consistent,
        Ok(decoded) if !local_branches.iter().any(|b| *b == decoded) => WorktreeState::BranchRenamed,
        Ok(_) => WorktreeState::PathMoved,
        Err(_) => WorktreeState::OrphanAdmin,
    }
}

/// Look up a worktree by branch name.
pub fn find<'a>(worktrees: &'a [Worktree], branch: &BranchName) -> Option<&'a Worktree> {
    worktrees.iter().find(|w| w.branch.as_ref() == Some(branch))
}

/// Look up a worktree by on-disk path.
pub fn find_by_path<'a>(worktrees: &'a [Worktree], path: &Path) -> Option<&'a Worktree> {
    worktrees.iter().find(|w| w.path == path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::LayoutKind;
    use std::path::PathBuf;

    fn layout(root: &str) -> ProjectLayout {
        ProjectLayout {
            root_path: PathBuf::from(root),
            kind: LayoutKind::Baretree,
            git_dir_path: PathBuf::from(root).join(".git"),
            default_branch: Some("main".to_string()),
            origin_url: None,
            managed_root: None,
        }
    }

    fn worktree(path: &str, branch: &str) -> Worktree {
        Worktree {
            branch: Some(BranchName::new(branch)),
            admin_dir: Some(PathBuf::from("/repo/.git/worktrees/x")),
            path: PathBuf::from(path),
            head_commit: "abc123".to_string(),
            state: WorktreeState::Consistent,
            is_main: false,
            is_detached: false,
        }
    }

    #[test]
    fn consistent_when_path_mirrors_branch() {
        let l = layout("/repo");
        let wt = worktree("/repo/feat/auth", "feat/auth");
        assert_eq!(classify(&l, &wt, &[]), WorktreeState::Consistent);
    }

    #[test]
    fn path_moved_when_relocated_to_another_live_branchs_name() {
        // `git worktree move` to a directory that happens to decode to a
        // *different*, still-existing branch: the worktree's own branch
        // ("feat/auth") is untouched, only its directory is wrong.
        let l = layout("/repo");
        let wt = worktree("/repo/somewhere/else", "feat/auth");
        let local_branches = ["feat/auth".to_string(), "somewhere/else".to_string()];
        assert_eq!(classify(&l, &wt, &local_branches), WorktreeState::PathMoved);
    }

    #[test]
    fn branch_renamed_when_old_path_branch_no_longer_exists() {
        // `git branch -m old new` run directly: the worktree's HEAD now
        // reports "new" but the directory is still named after "old", and
        // "old" no longer exists as a ref anywhere.
        let l = layout("/repo");
        let wt = worktree("/repo/old", "new");
        let local_branches = ["new".to_string()];
        assert_eq!(classify(&l, &wt, &local_branches), WorktreeState::BranchRenamed);
    }

    #[test]
    fn admin_missing_when_no_pointer() {
        let l = layout("/repo");
        let mut wt = worktree("/repo/feat/auth", "feat/auth");
        wt.admin_dir = None;
        assert_eq!(classify(&l, &wt, &[]), WorktreeState::AdminMissing);
    }

    #[test]
    fn detached_worktree_is_consistent() {
        let l = layout("/repo");
        let mut wt = worktree("/repo/anywhere", "ignored");
        wt.branch = None;
        wt.is_detached = true;
        assert_eq!(classify(&l, &wt, &[]), WorktreeState::Consistent);
    }

    #[test]
    fn find_by_path_matches_exact_worktree() {
        let wts = vec![worktree("/repo/feat/auth", "feat/auth"), worktree("/repo/main", "main")];
        let found = find_by_path(&wts, Path::new("/repo/main")).unwrap();
        assert_eq!(found.branch.as_ref().unwrap().as_str(), "main");
        assert!(find_by_path(&wts, Path::new("/repo/nope")).is_none());
    }
}
