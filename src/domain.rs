//! Core entities (spec.md §3).

use std::fmt;
use std::path::{Path, PathBuf};

use crate::pathcodec;

/// Which of the three layouts (spec.md §3, §4.4) a directory is in.
/// `Managed` is a label over `Baretree`, not a distinct on-disk shape
/// (spec.md §4.4), so it is not a variant here — see [`ProjectLayout::is_managed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutKind {
    Regular,
    Baretree,
    None,
}

/// The unique anchor for all operations on a project (spec.md §3).
#[derive(Debug, Clone)]
pub struct ProjectLayout {
    pub root_path: PathBuf,
    pub kind: LayoutKind,
    pub git_dir_path: PathBuf,
    pub default_branch: Option<String>,
    pub origin_url: Option<String>,
    /// Set when `root_path` lives under a configured global baretree root
    /// and its path segments match the origin URL's host/owner/repo
    /// (spec.md §4.4).
    pub managed_root: Option<PathBuf>,
}

impl ProjectLayout {
    pub fn is_managed(&self) -> bool {
        self.managed_root.is_some()
    }

    pub fn is_baretree(&self) -> bool {
        self.kind == LayoutKind::Baretree
    }

    /// The `<root>/.shared/` directory used by managed-mode PostCreateAction
    /// (spec.md §4.9).
    pub fn shared_dir(&self) -> PathBuf {
        self.root_path.join(".shared")
    }
}

impl AsRef<Path> for ProjectLayout {
    fn as_ref(&self) -> &Path {
        &self.root_path
    }
}

impl fmt::Display for ProjectLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.root_path.display())
    }
}

/// A hierarchical, validated branch name (spec.md §4.1, component C1).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BranchName(String);

impl BranchName {
    /// Construct without validating; used for names already known-good
    /// (round-tripped from Git or an on-disk path). Use
    /// [`BranchName::parse`] for user-supplied input.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Construct, validating the name against the segment rules in
    /// spec.md §4.1.
    pub fn parse(name: impl Into<String>) -> crate::error::Result<Self> {
        let name = name.into();
        pathcodec::segments(&name)?;
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn segments(&self) -> Vec<&str> {
        self.0.split('/').collect()
    }

    /// The hierarchical working-tree path this branch mirrors to under a
    /// Baretree/Managed project root (spec.md I2).
    pub fn to_relpath(&self) -> PathBuf {
        self.0.split('/').collect()
    }
}

impl fmt::Display for BranchName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A branch as known to the bare repo (spec.md §3).
#[derive(Debug, Clone)]
pub struct Branch {
    pub name: BranchName,
    pub upstream: Option<String>,
    pub last_commit_id: String,
}

/// Three-way consistency verdict for a worktree (spec.md §4.5 verdict matrix).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorktreeState {
    Consistent,
    BranchRenamed,
    PathMoved,
    AdminMissing,
    OrphanAdmin,
}

/// A worktree, cross-referencing the three legs of spec.md I1
/// (branch, admin pointer, on-disk path).
#[derive(Debug, Clone)]
pub struct Worktree {
    pub branch: Option<BranchName>,
    pub admin_dir: Option<PathBuf>,
    pub path: PathBuf,
    pub head_commit: String,
    pub state: WorktreeState,
    pub is_main: bool,
    pub is_detached: bool,
}

impl Worktree {
    pub fn branch_str(&self) -> &str {
        self.branch.as_ref().map(BranchName::as_str).unwrap_or("(detached)")
    }
}

/// A configured per-new-worktree action (spec.md §3, §4.9).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostCreateActionKind {
    Symlink,
    Copy,
    Command,
}

#[derive(Debug, Clone)]
pub struct PostCreateAction {
    pub kind: PostCreateActionKind,
    /// For Symlink/Copy: the relpath (within the default-branch worktree)
    /// to link/copy. For Command: the shell string to run.
    pub target_or_cmd: String,
    /// Managed variant (Symlink only): the source is moved into
    /// `<root>/.shared/<relpath>` and every worktree, including the
    /// default branch's, becomes a symlink to it.
    pub managed: bool,
}

impl PostCreateAction {
    /// Parse the `<relpath>:<kind>` / `command:<shell string>` encoding
    /// used by the `baretree.postcreate` git-config key (spec.md §6).
    pub fn parse(raw: &str) -> crate::error::Result<Self> {
        if let Some(cmd) = raw.strip_prefix("command:") {
            return Ok(Self {
                kind: PostCreateActionKind::Command,
                target_or_cmd: cmd.to_string(),
                managed: false,
            });
        }
        let (relpath, kind) = raw.rsplit_once(':').ok_or_else(|| {
            crate::error::BtError::usage(format!(
                "malformed post-create entry (expected '<relpath>:<kind>'): {raw}"
            ))
        })?;
        let (kind, managed) = match kind {
            "symlink" => (PostCreateActionKind::Symlink, false),
            "symlink-managed" => (PostCreateActionKind::Symlink, true),
            "copy" => (PostCreateActionKind::Copy, false),
            other => {
                return Err(crate::error::BtError::usage(format!(
                    "unknown post-create kind '{other}'"
                )))
            }
        };
        Ok(Self {
            kind,
            target_or_cmd: relpath.to_string(),
            managed,
        })
    }

    pub fn encode(&self) -> String {
        match self.kind {
            PostCreateActionKind::Command => format!("command:{}", self.target_or_cmd),
            PostCreateActionKind::Symlink if self.managed => {
                format!("{}:symlink-managed", self.target_or_cmd)
            }
            PostCreateActionKind::Symlink => format!("{}:symlink", self.target_or_cmd),
            PostCreateActionKind::Copy => format!("{}:copy", self.target_or_cmd),
        }
    }
}

/// A root-level symlink into the default-branch worktree (spec.md §3, §4.9).
#[derive(Debug, Clone)]
pub struct SyncToRootEntry {
    pub source_relpath: PathBuf,
    pub target_relpath: PathBuf,
}

impl SyncToRootEntry {
    /// Parse the `<source-relpath>[:<target-relpath>]` encoding used by
    /// the `baretree.synctoroot` git-config key.
    pub fn parse(raw: &str) -> Self {
        match raw.split_once(':') {
            Some((src, dst)) => Self {
                source_relpath: PathBuf::from(src),
                target_relpath: PathBuf::from(dst),
            },
            None => Self {
                source_relpath: PathBuf::from(raw),
                target_relpath: PathBuf::from(raw),
            },
        }
    }

    pub fn encode(&self) -> String {
        if self.source_relpath == self.target_relpath {
            self.source_relpath.display().to_string()
        } else {
            format!(
                "{}:{}",
                self.source_relpath.display(),
                self.target_relpath.display()
            )
        }
    }
}

/// A project entry tracked by the [`Registry`] (spec.md §3, §4.10): the
/// origin-derived key (`host/owner/repo`) under a managed root, paired with
/// the layout discovered there the last time it was scanned.
#[derive(Debug, Clone)]
pub struct RegistryEntry {
    /// e.g. `github.com/acme/widgets`, derived from the origin URL.
    pub key: String,
    pub path: PathBuf,
}

/// Known baretree projects under one or more global roots (spec.md §3, §4.10).
#[derive(Debug, Clone, Default)]
pub struct Registry {
    pub roots: Vec<PathBuf>,
    pub projects: Vec<RegistryEntry>,
}

impl Registry {
    pub fn find(&self, token: &str) -> Option<&RegistryEntry> {
        self.projects
            .iter()
            .find(|p| p.key == token || p.key.ends_with(&format!("/{token}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn branch_name_parse_rejects_invalid() {
        assert!(BranchName::parse("-bad").is_err());
        assert!(BranchName::parse("feat/auth").is_ok());
    }

    #[test]
    fn post_create_round_trips() {
        for raw in ["CLAUDE.md:symlink", "notes.txt:copy", "CLAUDE.md:symlink-managed"] {
            let a = PostCreateAction::parse(raw).unwrap();
            assert_eq!(a.encode(), raw);
        }
    }

    #[test]
    fn post_create_command_round_trips() {
        let a = PostCreateAction::parse("command:npm install").unwrap();
        assert_eq!(a.kind, PostCreateActionKind::Command);
        assert_eq!(a.encode(), "command:npm install");
    }

    #[test]
    fn sync_to_root_default_target_matches_source() {
        let e = SyncToRootEntry::parse("CLAUDE.md");
        assert_eq!(e.source_relpath, PathBuf::from("CLAUDE.md"));
        assert_eq!(e.target_relpath, PathBuf::from("CLAUDE.md"));
        assert_eq!(e.encode(), "CLAUDE.md");
    }

    #[test]
    fn sync_to_root_explicit_target_round_trips() {
        let e = SyncToRootEntry::parse("docs/a.md:a.md");
        assert_eq!(e.encode(), "docs/a.md:a.md");
    }
}
