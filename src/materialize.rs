//! Materialisation — Add (spec.md §4.7, component C7).

use std::path::PathBuf;

use crate::artefacts;
use crate::domain::{BranchName, ProjectLayout};
use crate::error::{BtError, Result};
use crate::git::{self, WorktreeAddOpts};
use crate::index;
use crate::pathcodec;

/// Options accompanying an `add` spec token (spec.md §6 `add` flags).
#[derive(Debug, Default)]
pub struct AddOpts {
    pub new_branch: bool,
    pub base: Option<String>,
    pub detach: bool,
    pub force: bool,
    pub fetch: FetchPolicy,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum FetchPolicy {
    #[default]
    Auto,
    Always,
    Never,
}

/// How `spec` resolved to a concrete branch, for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionKind {
    NewBranch,
    LocalBranch,
    RemoteTracking,
    FetchedTracking,
}

pub struct AddResult {
    pub branch: BranchName,
    pub path: PathBuf,
    pub resolution: ResolutionKind,
}

/// Resolve `spec` to a branch per the ordered rules of spec.md §4.7, then
/// materialise a worktree for it.
pub fn add(layout: &ProjectLayout, spec: &str, opts: &AddOpts) -> Result<AddResult> {
    let git_dir = &layout.git_dir_path;
    let resolution_plan = resolve(git_dir, spec, opts)?;
    let branch = resolution_plan.branch.clone();
    let resolution = resolution_plan.kind;
    let git_opts = WorktreeAddOpts {
        create_branch: resolution_plan.create_branch,
        detach: resolution_plan.detach,
        no_checkout: false,
        force: opts.force,
        base: resolution_plan.base.as_deref(),
    };

    preflight(layout, &branch, opts)?;

    let relpath = branch.to_relpath();
    let target = layout.root_path.join(&relpath);
    if target.exists() {
        if !opts.force || !is_empty_dir(&target) {
            return Err(BtError::destination_exists(target.display()));
        }
    }
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)?;
    }

    git::worktree_add(git_dir, &target, &branch, &git_opts)
        .map_err(|e| e.context(format!("materialising worktree for '{}'", branch.as_str())))?;

    if let Err(e) = artefacts::apply_post_create(layout, &target) {
        log::warn!("post-create artefacts failed for {}: {e}", target.display());
    }

    let worktrees = index::build(layout)?;
    if let Some(wt) = index::find(&worktrees, &branch) {
        if wt.state != crate::domain::WorktreeState::Consistent {
            git::worktree_remove(git_dir, &target, true)?;
            return Err(BtError::invariant(format!(
                "worktree for '{}' was inconsistent immediately after creation; rolled back",
                branch.as_str()
            )));
        }
    }

    Ok(AddResult {
        branch,
        path: target,
        resolution,
    })
}

fn is_empty_dir(p: &std::path::Path) -> bool {
    std::fs::read_dir(p).map(|mut it| it.next().is_none()).unwrap_or(false)
}

/// The outcome of branch-name resolution (spec.md §4.7), before any
/// filesystem or Git Driver side effect has happened.
struct ResolutionPlan {
    branch: BranchName,
    kind: ResolutionKind,
    create_branch: bool,
    detach: bool,
    base: Option<String>,
}

fn resolve(git_dir: &std::path::Path, spec: &str, opts: &AddOpts) -> Result<ResolutionPlan> {
    // 1. Explicit new branch.
    if opts.new_branch {
        return Ok(ResolutionPlan {
            branch: BranchName::parse(spec)?,
            kind: ResolutionKind::NewBranch,
            create_branch: true,
            detach: false,
            base: opts.base.clone(),
        });
    }

    // 2. Exact local branch.
    if git::ref_exists(git_dir, spec) {
        return Ok(ResolutionPlan {
            branch: BranchName::parse(spec)?,
            kind: ResolutionKind::LocalBranch,
            create_branch: false,
            detach: opts.detach,
            base: None,
        });
    }

    // 3. `remote/branch` tracking.
    if let Some((remote, branch_name)) = spec.split_once('/') {
        if git::remote_branch_exists(git_dir, remote, branch_name) {
            return Ok(ResolutionPlan {
                branch: BranchName::parse(branch_name)?,
                kind: ResolutionKind::RemoteTracking,
                create_branch: true,
                detach: false,
                base: Some(spec.to_string()),
            });
        }
    }

    // 4. Auto-fetch, then treat `spec` as a branch name on `origin`.
    if opts.fetch != FetchPolicy::Never {
        git::fetch(git_dir, None)?;
        if git::remote_branch_exists(git_dir, "origin", spec) {
            return Ok(ResolutionPlan {
                branch: BranchName::parse(spec)?,
                kind: ResolutionKind::FetchedTracking,
                create_branch: true,
                detach: false,
                base: Some(format!("origin/{spec}")),
            });
        }
    }

    Err(BtError::usage(format!(
        "branch not found: '{spec}' (create it with `bt add -b {spec}`)"
    )))
}

fn preflight(layout: &ProjectLayout, branch: &BranchName, opts: &AddOpts) -> Result<()> {
    let git_dir = &layout.git_dir_path;
    let existing = git::branch_list(git_dir, false)?;
    let existing_names: Vec<&str> = existing.iter().map(|b| b.name.as_str()).collect();
    if let Some(conflict) = pathcodec::detect_prefix_conflict(existing_names, branch.as_str())? {
        return Err(BtError::ref_conflict(&conflict, branch.as_str()));
    }

    if let Some(default_branch) = &layout.default_branch {
        if let Some(base) = &opts.base {
            if base == default_branch {
                if let Some(upstream) = existing
                    .iter()
                    .find(|b| b.name.as_str() == default_branch)
                    .and_then(|b| b.upstream.clone())
                {
                    let (_, behind) = git::ahead_behind(git_dir, &upstream, default_branch)?;
                    if behind > 0 && !opts.force {
                        return Err(BtError::conflict(format!(
                            "default branch '{default_branch}' is {behind} commit(s) behind '{upstream}'; \
                             refusing to branch from stale history (use --force to proceed anyway)"
                        )));
                    }
                }
            }
        }
    }

    Ok(())
}
