//! Output envelopes (spec.md §6 "each with its contract").

use serde::Serialize;

use crate::domain::{Worktree, WorktreeState};
use crate::error::{BtError, Result};

/// JSON envelope for single-operation responses (add, remove, rename, repo
/// init/clone, config default-branch, ...).
#[derive(Debug, Serialize)]
pub struct JsonResponse {
    pub ok: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repo_root: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub worktree_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cd_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub removed_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
}

impl JsonResponse {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            ok: true,
            message: message.into(),
            repo_root: None,
            worktree_path: None,
            cd_path: None,
            removed_path: None,
            branch: None,
        }
    }

    pub fn with_repo_root(mut self, root: impl Into<String>) -> Self {
        self.repo_root = Some(root.into());
        self
    }

    pub fn with_worktree_path(mut self, path: impl Into<String>) -> Self {
        self.worktree_path = Some(path.into());
        self
    }

    pub fn with_cd_path(mut self, path: impl Into<String>) -> Self {
        self.cd_path = Some(path.into());
        self
    }

    pub fn with_removed_path(mut self, path: impl Into<String>) -> Self {
        self.removed_path = Some(path.into());
        self
    }

    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = Some(branch.into());
        self
    }
}

/// JSON envelope for `list`.
#[derive(Debug, Serialize)]
pub struct JsonListResponse {
    pub ok: bool,
    pub worktrees: Vec<JsonWorktreeEntry>,
}

#[derive(Debug, Serialize)]
pub struct JsonWorktreeEntry {
    pub path: String,
    pub branch: Option<String>,
    pub commit: String,
    pub is_main: bool,
    pub is_detached: bool,
    pub state: &'static str,
}

fn state_label(state: WorktreeState) -> &'static str {
    match state {
        WorktreeState::Consistent => "consistent",
        WorktreeState::BranchRenamed => "branch-renamed",
        WorktreeState::PathMoved => "path-moved",
        WorktreeState::AdminMissing => "admin-missing",
        WorktreeState::OrphanAdmin => "orphan-admin",
    }
}

impl From<&Worktree> for JsonWorktreeEntry {
    fn from(wt: &Worktree) -> Self {
        Self {
            path: wt.path.display().to_string(),
            branch: wt.branch.as_ref().map(|b| b.as_str().to_string()),
            commit: wt.head_commit.clone(),
            is_main: wt.is_main,
            is_detached: wt.is_detached,
            state: state_label(wt.state),
        }
    }
}

impl JsonListResponse {
    pub fn from_worktrees(worktrees: &[Worktree]) -> Self {
        Self {
            ok: true,
            worktrees: worktrees.iter().map(JsonWorktreeEntry::from).collect(),
        }
    }
}

/// JSON envelope for `status`.
#[derive(Debug, Serialize)]
pub struct JsonStatusResponse {
    pub ok: bool,
    pub entries: Vec<JsonStatusEntry>,
}

#[derive(Debug, Serialize)]
pub struct JsonStatusEntry {
    pub branch: Option<String>,
    pub path: String,
    pub state: &'static str,
    pub ahead: u32,
    pub behind: u32,
}

/// JSON envelope for `repair --dry-run` / `repair`.
#[derive(Debug, Serialize)]
pub struct JsonRepairResponse {
    pub ok: bool,
    pub dry_run: bool,
    pub actions: Vec<JsonRepairAction>,
}

#[derive(Debug, Serialize)]
pub struct JsonRepairAction {
    pub path: String,
    pub state: &'static str,
    pub description: String,
}

impl From<&crate::repair::RepairAction> for JsonRepairAction {
    fn from(a: &crate::repair::RepairAction) -> Self {
        Self {
            path: a.path.display().to_string(),
            state: state_label(a.state),
            description: a.description.clone(),
        }
    }
}

/// Serialize a value as pretty-printed JSON to stdout.
pub fn print_json(value: &impl Serialize) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value)
            .map_err(|e| BtError::invariant(format!("json error: {e}")))?
    );
    Ok(())
}
