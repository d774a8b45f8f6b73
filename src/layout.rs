//! Layout Model (spec.md §4.4, component C4).
//!
//! Determines whether a directory (or an ancestor of it) is a Regular
//! repo, a Baretree project, or nothing at all, and whether a Baretree
//! project is additionally "Managed" — living under a configured global
//! root, keyed by its origin URL.

use std::path::{Path, PathBuf};

use crate::config::{GlobalConfig, ProjectConfig};
use crate::domain::{LayoutKind, ProjectLayout};
use crate::error::Result;
use crate::git;

/// Discover the project layout an arbitrary starting directory belongs to
/// (spec.md §4.4): walk upward until Git itself reports a repository, then
/// classify it.
pub fn discover(start: &Path, global: &GlobalConfig) -> Result<ProjectLayout> {
    let (root_path, is_bare) = git::discover_repo(start)?;
    let git_dir_path = if is_bare { root_path.join(".git") } else { root_path.join(".git") };

    let kind = if is_bare {
        LayoutKind::Baretree
    } else {
        LayoutKind::Regular
    };

    // `baretree.defaultbranch` (set via `bt config default-branch`) always
    // wins over the git heuristic — otherwise every consumer of this field
    // would keep following origin/HEAD after the user overrides it.
    let default_branch = if is_bare {
        ProjectConfig::new(&git_dir_path)
            .default_branch()
            .or_else(|| git::resolve_default_branch(&git_dir_path).ok())
    } else {
        None
    };

    let origin_url = git::remote_get_url(&git_dir_path, "origin");

    let managed_root = if kind == LayoutKind::Baretree {
        detect_managed_root(&root_path, origin_url.as_deref(), global)
    } else {
        None
    };

    Ok(ProjectLayout {
        root_path,
        kind,
        git_dir_path,
        default_branch,
        origin_url,
        managed_root,
    })
}

/// A project is "Managed" when it lives under one of the configured global
/// roots at the path its origin URL derives (spec.md §4.4): this is a label
/// over the Baretree layout, not a distinct on-disk shape.
fn detect_managed_root(
    root_path: &Path,
    origin_url: Option<&str>,
    global: &GlobalConfig,
) -> Option<PathBuf> {
    let origin_url = origin_url?;
    let key = origin_key(origin_url)?;
    for root in global.roots() {
        let expected = root.join(&key);
        if paths_equal(&expected, root_path) {
            return Some(root);
        }
    }
    None
}

fn paths_equal(a: &Path, b: &Path) -> bool {
    let ca = a.canonicalize().unwrap_or_else(|_| a.to_path_buf());
    let cb = b.canonicalize().unwrap_or_else(|_| b.to_path_buf());
    ca == cb
}

/// Derive the `<host>/<owner>/<repo>` key a managed root would place a
/// project's origin at, from an SSH (`git@host:owner/repo.git`) or HTTPS
/// (`https://host/owner/repo.git`) remote URL.
pub fn origin_key(url: &str) -> Option<PathBuf> {
    let stripped = url.strip_suffix(".git").unwrap_or(url);

    if let Some(rest) = stripped.strip_prefix("git@") {
        let (host, path) = rest.split_once(':')?;
        return Some(PathBuf::from(host).join(path));
    }
    if let Some(rest) = stripped
        .strip_prefix("https://")
        .or_else(|| stripped.strip_prefix("http://"))
        .or_else(|| stripped.strip_prefix("ssh://git@"))
    {
        let mut parts = rest.splitn(2, '/');
        let host = parts.next()?;
        let path = parts.next()?;
        return Some(PathBuf::from(host).join(path));
    }
    None
}
