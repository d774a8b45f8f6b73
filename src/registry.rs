//! Repository Registry (spec.md §4.10, component C10).
//!
//! Discovers every Baretree project under the configured global root(s)
//! and resolves navigation tokens (`@` default branch, `-` previous) used
//! by `bt repo cd`/`bt go`.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::GlobalConfig;
use crate::domain::{Registry, RegistryEntry};
use crate::error::{BtError, Result};
use crate::git;
use crate::layout;

const MAX_SCAN_DEPTH: usize = 4;

/// Scan every configured global root for Baretree projects, three levels
/// deep (`host/owner/repo`), the shape [`layout::origin_key`] derives.
pub fn discover(global: &GlobalConfig) -> Registry {
    let roots = global.roots();
    let mut projects = Vec::new();
    for root in &roots {
        scan_root(root, root, 0, &mut projects);
    }
    Registry { roots, projects }
}

fn scan_root(root: &Path, dir: &Path, depth: usize, out: &mut Vec<RegistryEntry>) {
    if depth > MAX_SCAN_DEPTH {
        return;
    }
    if is_bare_repo_dir(dir) {
        if let Ok(key) = dir.strip_prefix(root) {
            out.push(RegistryEntry {
                key: key.display().to_string(),
                path: dir.to_path_buf(),
            });
        }
        return;
    }
    let Ok(entries) = fs::read_dir(dir) else { return };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            scan_root(root, &path, depth + 1, out);
        }
    }
}

fn is_bare_repo_dir(dir: &Path) -> bool {
    dir.join(".git").join("HEAD").is_file() && dir.join(".git").join("objects").is_dir()
}

/// Resolve a `bt repo cd`/`bt go` navigation token against the registry and
/// the current project's own worktree index: `@` → default-branch
/// worktree, `-` → previously visited worktree (read from a marker file
/// under the project's `.git`), an exact registry key, or a bare branch
/// name resolved against the current project.
pub fn resolve_token(
    registry: &Registry,
    current: Option<&crate::domain::ProjectLayout>,
    token: &str,
) -> Result<PathBuf> {
    if token == "@" {
        let layout = current.ok_or_else(|| BtError::usage("'@' requires a current project"))?;
        let branch = layout
            .default_branch
            .as_deref()
            .ok_or_else(|| BtError::invariant("project has no known default branch"))?;
        return Ok(layout.root_path.join(branch));
    }

    if token == "-" {
        let layout = current.ok_or_else(|| BtError::usage("'-' requires a current project"))?;
        return read_previous(&layout.git_dir_path);
    }

    if let Some(entry) = registry.find(token) {
        return Ok(entry.path.clone());
    }

    if let Some(layout) = current {
        if git::ref_exists(&layout.git_dir_path, token) {
            return Ok(layout.root_path.join(token));
        }
    }

    Err(BtError::usage(format!("no project or worktree matches '{token}'")))
}

const PREVIOUS_MARKER: &str = "baretree-previous";

pub fn record_visit(git_dir: &Path, path: &Path) -> Result<()> {
    fs::write(git_dir.join(PREVIOUS_MARKER), path.display().to_string())?;
    Ok(())
}

fn read_previous(git_dir: &Path) -> Result<PathBuf> {
    let raw = fs::read_to_string(git_dir.join(PREVIOUS_MARKER))
        .map_err(|_| BtError::usage("no previous worktree recorded yet"))?;
    Ok(PathBuf::from(raw.trim()))
}

pub fn origin_path_for(global: &GlobalConfig, origin_url: &str) -> Option<PathBuf> {
    let key = layout::origin_key(origin_url)?;
    global.primary_root().map(|root| root.join(key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn discover_finds_nested_bare_repo() {
        let dir = tempdir().unwrap();
        let bare = dir.path().join("github.com/acme/widgets/.git");
        fs::create_dir_all(bare.join("objects")).unwrap();
        fs::write(bare.join("HEAD"), "ref: refs/heads/main\n").unwrap();

        let mut out = Vec::new();
        scan_root(dir.path(), dir.path(), 0, &mut out);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].key, "github.com/acme/widgets");
    }

    #[test]
    fn registry_find_matches_suffix() {
        let reg = Registry {
            roots: vec![],
            projects: vec![RegistryEntry {
                key: "github.com/acme/widgets".to_string(),
                path: PathBuf::from("/roots/github.com/acme/widgets"),
            }],
        };
        assert!(reg.find("widgets").is_some());
        assert!(reg.find("acme/widgets").is_some());
        assert!(reg.find("nope").is_none());
    }
}
