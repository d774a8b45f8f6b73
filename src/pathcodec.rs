//! Path & Name Codec (spec.md §4.1, component C1).
//!
//! Canonicalises branch names to/from the relative directory path that
//! mirrors them in a Baretree/Managed layout, and detects the
//! segment-prefix conflicts Git itself would refuse at the ref level.

use std::path::{Path, PathBuf};

use crate::error::{BtError, Result};

/// Split a branch name into its `/`-separated segments, validating each
/// one against the subset of `git check-ref-format` rules that matter for
/// a worktree directory name: non-empty, no leading `-`, no `..`, no
/// trailing `.lock`, no ASCII control characters, none of `~^:?*[\`, and
/// no `//` (a doubled separator, which `split('/')` would otherwise turn
/// into a spurious empty segment).
pub fn segments(name: &str) -> Result<Vec<&str>> {
    if name.is_empty() {
        return Err(BtError::usage("branch name must not be empty"));
    }
    if name.contains("//") {
        return Err(BtError::usage(format!(
            "branch name '{name}' contains a doubled path separator"
        )));
    }
    let parts: Vec<&str> = name.split('/').collect();
    for seg in &parts {
        validate_segment(seg, name)?;
    }
    Ok(parts)
}

fn validate_segment(seg: &str, full_name: &str) -> Result<()> {
    if seg.is_empty() {
        return Err(BtError::usage(format!(
            "branch name '{full_name}' has an empty path segment"
        )));
    }
    if seg.starts_with('-') {
        return Err(BtError::usage(format!(
            "branch segment '{seg}' in '{full_name}' must not start with '-'"
        )));
    }
    if seg == "." || seg == ".." || seg.contains("..") {
        return Err(BtError::usage(format!(
            "branch segment '{seg}' in '{full_name}' must not contain '..'"
        )));
    }
    if seg.ends_with(".lock") {
        return Err(BtError::usage(format!(
            "branch segment '{seg}' in '{full_name}' must not end with '.lock'"
        )));
    }
    if seg.chars().any(|c| c.is_ascii_control()) {
        return Err(BtError::usage(format!(
            "branch segment '{seg}' in '{full_name}' contains an ASCII control character"
        )));
    }
    const FORBIDDEN: &[char] = &['~', '^', ':', '?', '*', '[', '\\'];
    if let Some(c) = seg.chars().find(|c| FORBIDDEN.contains(c)) {
        return Err(BtError::usage(format!(
            "branch segment '{seg}' in '{full_name}' contains forbidden character '{c}'"
        )));
    }
    Ok(())
}

/// Convert a branch name to the relative working-tree path that mirrors it
/// under a Baretree/Managed project root (spec.md I2).
pub fn branch_to_relpath(name: &str) -> Result<PathBuf> {
    let segs = segments(name)?;
    Ok(segs.into_iter().collect())
}

/// Recover the branch name a relative working-tree path was derived from.
pub fn relpath_to_branch(path: &Path) -> Result<String> {
    let parts: Vec<&str> = path
        .components()
        .map(|c| {
            c.as_os_str()
                .to_str()
                .ok_or_else(|| BtError::usage("worktree path contains non-UTF-8 segment"))
        })
        .collect::<Result<_>>()?;
    if parts.is_empty() {
        return Err(BtError::usage("empty worktree path has no branch name"));
    }
    Ok(parts.join("/"))
}

/// Two branch names conflict (spec.md I3) iff one is a proper
/// segment-prefix of the other. Returns the offending existing name
/// (first match) so the caller can report both names.
pub fn detect_prefix_conflict<'a>(
    existing_names: impl IntoIterator<Item = &'a str>,
    new_name: &str,
) -> Result<Option<String>> {
    let new_segs = segments(new_name)?;
    for existing in existing_names {
        if existing == new_name {
            continue;
        }
        let existing_segs = match segments(existing) {
            Ok(s) => s,
            Err(_) => continue, // a pre-existing malformed ref can't be a prefix partner
        };
        if is_proper_segment_prefix(&existing_segs, &new_segs)
            || is_proper_segment_prefix(&new_segs, &existing_segs)
        {
            return Ok(Some(existing.to_string()));
        }
    }
    Ok(None)
}

fn is_proper_segment_prefix(a: &[&str], b: &[&str]) -> bool {
    a.len() < b.len() && a.iter().zip(b.iter()).all(|(x, y)| x == y)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_branch_round_trips() {
        let p = branch_to_relpath("main").unwrap();
        assert_eq!(p, PathBuf::from("main"));
        assert_eq!(relpath_to_branch(&p).unwrap(), "main");
    }

    #[test]
    fn hierarchical_branch_round_trips() {
        let p = branch_to_relpath("feat/auth/login").unwrap();
        assert_eq!(p, PathBuf::from("feat/auth/login"));
        assert_eq!(relpath_to_branch(&p).unwrap(), "feat/auth/login");
    }

    #[test]
    fn rejects_leading_dash() {
        assert!(branch_to_relpath("-evil").is_err());
    }

    #[test]
    fn rejects_dotdot() {
        assert!(branch_to_relpath("feat/../etc").is_err());
    }

    #[test]
    fn rejects_lock_suffix() {
        assert!(branch_to_relpath("feat.lock").is_err());
    }

    #[test]
    fn rejects_doubled_separator() {
        assert!(branch_to_relpath("feat//x").is_err());
    }

    #[test]
    fn prefix_conflict_detected_either_direction() {
        assert_eq!(
            detect_prefix_conflict(["feat"], "feat/child").unwrap(),
            Some("feat".to_string())
        );
        assert_eq!(
            detect_prefix_conflict(["feat/child"], "feat").unwrap(),
            Some("feat/child".to_string())
        );
    }

    #[test]
    fn no_conflict_for_siblings() {
        assert_eq!(
            detect_prefix_conflict(["feat/a"], "feat/b").unwrap(),
            None
        );
    }

    #[test]
    fn no_conflict_for_identical_name() {
        assert_eq!(detect_prefix_conflict(["feat/a"], "feat/a").unwrap(), None);
    }

    #[test]
    fn no_conflict_for_unrelated_prefix_string() {
        // "feature" is not a *segment* prefix of "feat/x".
        assert_eq!(
            detect_prefix_conflict(["feature"], "feat/x").unwrap(),
            None
        );
    }
}
