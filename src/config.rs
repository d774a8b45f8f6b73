//! Configuration (SPEC_FULL.md §A.3, extending spec.md §6 "Persisted state").
//!
//! Typed accessors over the Git Driver's `config_*` primitives. Every
//! `baretree.*` key lives in the project's bare repo; the single
//! `baretree.root` key (one or more global roots) lives in the user's
//! global git config.

use std::env;
use std::path::{Path, PathBuf};

use crate::domain::{PostCreateAction, SyncToRootEntry};
use crate::error::Result;
use crate::git::{self, ConfigScope};

const KEY_DEFAULT_BRANCH: &str = "baretree.defaultbranch";
const KEY_POSTCREATE: &str = "baretree.postcreate";
const KEY_SYNCTOROOT: &str = "baretree.synctoroot";
const KEY_ROOT: &str = "baretree.root";
const ENV_ROOT: &str = "BARETREE_ROOT";

/// Reads/writes `baretree.*` keys in a single project's bare repo.
pub struct ProjectConfig<'a> {
    git_dir: &'a Path,
}

impl<'a> ProjectConfig<'a> {
    pub fn new(git_dir: &'a Path) -> Self {
        Self { git_dir }
    }

    pub fn default_branch(&self) -> Option<String> {
        git::config_get(self.git_dir, ConfigScope::Project, KEY_DEFAULT_BRANCH)
    }

    /// Set the stored default branch, or revert to `main` when `branch` is
    /// `None` (the Open Question in spec.md §9 is resolved this way — see
    /// DESIGN.md).
    pub fn set_default_branch(&self, branch: Option<&str>) -> Result<()> {
        match branch {
            Some(b) => git::config_set(self.git_dir, ConfigScope::Project, KEY_DEFAULT_BRANCH, b),
            None => {
                git::config_unset(self.git_dir, ConfigScope::Project, KEY_DEFAULT_BRANCH)?;
                git::config_set(self.git_dir, ConfigScope::Project, KEY_DEFAULT_BRANCH, "main")
            }
        }
    }

    pub fn post_create_actions(&self) -> Vec<PostCreateAction> {
        git::config_get_all(self.git_dir, ConfigScope::Project, KEY_POSTCREATE)
            .iter()
            .filter_map(|raw| PostCreateAction::parse(raw).ok())
            .collect()
    }

    pub fn add_post_create_action(&self, action: &PostCreateAction) -> Result<()> {
        git::config_add(self.git_dir, ConfigScope::Project, KEY_POSTCREATE, &action.encode())
    }

    pub fn clear_post_create_actions(&self) -> Result<()> {
        git::config_unset(self.git_dir, ConfigScope::Project, KEY_POSTCREATE)
    }

    pub fn sync_to_root_entries(&self) -> Vec<SyncToRootEntry> {
        git::config_get_all(self.git_dir, ConfigScope::Project, KEY_SYNCTOROOT)
            .iter()
            .map(|raw| SyncToRootEntry::parse(raw))
            .collect()
    }

    pub fn add_sync_to_root_entry(&self, entry: &SyncToRootEntry) -> Result<()> {
        git::config_add(self.git_dir, ConfigScope::Project, KEY_SYNCTOROOT, &entry.encode())
    }

    pub fn clear_sync_to_root_entries(&self) -> Result<()> {
        git::config_unset(self.git_dir, ConfigScope::Project, KEY_SYNCTOROOT)
    }

    /// Every `baretree.*` key as a flat `(key, values)` list, for `bt config
    /// export` (SPEC_FULL.md §B).
    pub fn export_raw(&self) -> Vec<(&'static str, Vec<String>)> {
        vec![
            (
                KEY_DEFAULT_BRANCH,
                self.default_branch().into_iter().collect(),
            ),
            (
                KEY_POSTCREATE,
                git::config_get_all(self.git_dir, ConfigScope::Project, KEY_POSTCREATE),
            ),
            (
                KEY_SYNCTOROOT,
                git::config_get_all(self.git_dir, ConfigScope::Project, KEY_SYNCTOROOT),
            ),
        ]
    }

    pub fn import_raw(&self, key: &str, values: &[String]) -> Result<()> {
        git::config_unset(self.git_dir, ConfigScope::Project, key)?;
        for v in values {
            git::config_add(self.git_dir, ConfigScope::Project, key, v)?;
        }
        Ok(())
    }
}

/// Reads/writes the user-level `baretree.root` key, overridable for the
/// duration of the process by `BARETREE_ROOT`.
pub struct GlobalConfig {
    env_override: Option<PathBuf>,
}

impl GlobalConfig {
    /// Load from the environment (`BARETREE_ROOT`) and the user's global
    /// git config, logging when the former shadows a stored value.
    pub fn load() -> Self {
        let env_override = env::var_os(ENV_ROOT).map(PathBuf::from);
        if env_override.is_some() {
            let stored = git::config_get_all(Path::new("/dev/null"), ConfigScope::Global, KEY_ROOT);
            if !stored.is_empty() {
                log::warn!(
                    "{ENV_ROOT} overrides {} configured global root(s)",
                    stored.len()
                );
            }
        }
        Self { env_override }
    }

    /// All configured global roots, in priority order: `BARETREE_ROOT`
    /// first if set, then every `git config --global --get-all
    /// baretree.root`.
    pub fn roots(&self) -> Vec<PathBuf> {
        let mut roots = Vec::new();
        if let Some(p) = &self.env_override {
            roots.push(p.clone());
        }
        roots.extend(
            git::config_get_all(Path::new("/dev/null"), ConfigScope::Global, KEY_ROOT)
                .into_iter()
                .map(PathBuf::from),
        );
        roots
    }

    pub fn primary_root(&self) -> Option<PathBuf> {
        self.roots().into_iter().next()
    }

    pub fn add_root(&self, path: &Path) -> Result<()> {
        git::config_add(
            Path::new("/dev/null"),
            ConfigScope::Global,
            KEY_ROOT,
            &path.display().to_string(),
        )
    }

    /// Replace every configured root with `path`, making it the sole
    /// (and therefore primary) one.
    pub fn set_root(&self, path: &Path) -> Result<()> {
        self.unset_roots()?;
        self.add_root(path)
    }

    pub fn unset_roots(&self) -> Result<()> {
        git::config_unset(Path::new("/dev/null"), ConfigScope::Global, KEY_ROOT)
    }
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self::load()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_config_prefers_env_override() {
        env::set_var(ENV_ROOT, "/tmp/fake-baretree-root");
        let cfg = GlobalConfig::load();
        assert_eq!(cfg.primary_root(), Some(PathBuf::from("/tmp/fake-baretree-root")));
        env::remove_var(ENV_ROOT);
    }
}
