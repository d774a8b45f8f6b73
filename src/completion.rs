//! Shell completion (spec.md §6 "Completion protocol").
//!
//! REDESIGN FLAGS (spec.md §9) replace dynamic command dispatch with a pure
//! function: `complete(cmd, args, cursor) -> {candidates, directive}`. The
//! `bt __complete` subcommand is a thin wrapper that prints the result.

use crate::domain::{BranchName, Registry};

/// Completion directive bitmask (spec.md §6): `0` falls back to default
/// file completion after the candidates, `4` suppresses it entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    Default = 0,
    NoFileComp = 4,
}

pub struct CompletionResult {
    pub candidates: Vec<String>,
    pub directive: Directive,
}

/// Compute completions for `cmd` given the already-typed `args` and the
/// partial token at `cursor` (the last element of `args`, by convention,
/// when the caller hasn't trimmed it — see `complete` in `main.rs`).
///
/// Pure: takes the worktree/branch/registry data the caller already loaded,
/// touches no filesystem or subprocess itself.
pub fn complete(
    cmd: &str,
    partial: &str,
    branches: &[BranchName],
    registry: &Registry,
) -> CompletionResult {
    let candidates = match cmd {
        "add" => branch_and_remote_candidates(partial, branches),
        "remove" | "rename" | "unbare" | "cd" | "go" => worktree_token_candidates(partial, branches),
        "repo" => registry_candidates(partial, registry),
        "shell-init" => vec!["bash".to_string(), "zsh".to_string(), "fish".to_string()],
        _ => Vec::new(),
    };

    let directive = if candidates.is_empty() {
        Directive::Default
    } else {
        Directive::NoFileComp
    };

    CompletionResult {
        candidates: candidates
            .into_iter()
            .filter(|c| c.starts_with(partial))
            .collect(),
        directive,
    }
}

fn branch_and_remote_candidates(_partial: &str, branches: &[BranchName]) -> Vec<String> {
    branches.iter().map(|b| b.as_str().to_string()).collect()
}

fn worktree_token_candidates(_partial: &str, branches: &[BranchName]) -> Vec<String> {
    let mut tokens: Vec<String> = branches.iter().map(|b| b.as_str().to_string()).collect();
    tokens.push("@".to_string());
    tokens.push("-".to_string());
    tokens
}

fn registry_candidates(_partial: &str, registry: &Registry) -> Vec<String> {
    registry.projects.iter().map(|p| p.key.clone()).collect()
}

/// Render a [`CompletionResult`] in the protocol's line format: one
/// candidate per line, followed by a colon-prefixed directive line.
pub fn render(result: &CompletionResult) -> String {
    let mut out = String::new();
    for c in &result.candidates {
        out.push_str(c);
        out.push('\n');
    }
    out.push(':');
    out.push_str(&(result.directive as u8).to_string());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RegistryEntry;
    use std::path::PathBuf;

    #[test]
    fn add_suggests_local_branches() {
        let branches = vec![BranchName::new("main"), BranchName::new("feat/x")];
        let reg = Registry::default();
        let result = complete("add", "fe", &branches, &reg);
        assert_eq!(result.candidates, vec!["feat/x".to_string()]);
        assert_eq!(result.directive, Directive::NoFileComp);
    }

    #[test]
    fn cd_includes_special_tokens() {
        let branches = vec![BranchName::new("main")];
        let reg = Registry::default();
        let result = complete("cd", "", &branches, &reg);
        assert!(result.candidates.contains(&"@".to_string()));
        assert!(result.candidates.contains(&"-".to_string()));
    }

    #[test]
    fn unknown_command_yields_default_directive() {
        let result = complete("bogus", "", &[], &Registry::default());
        assert!(result.candidates.is_empty());
        assert_eq!(result.directive, Directive::Default);
    }

    #[test]
    fn repo_suggests_registry_keys() {
        let reg = Registry {
            roots: vec![],
            projects: vec![RegistryEntry {
                key: "github.com/acme/widgets".to_string(),
                path: PathBuf::from("/x"),
            }],
        };
        let result = complete("repo", "github", &[], &reg);
        assert_eq!(result.candidates, vec!["github.com/acme/widgets".to_string()]);
    }

    #[test]
    fn render_formats_directive_line() {
        let result = CompletionResult {
            candidates: vec!["main".to_string()],
            directive: Directive::NoFileComp,
        };
        assert_eq!(render(&result), "main\n:4");
    }
}
