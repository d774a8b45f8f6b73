//! Filesystem Transactor (spec.md §4.3, component C3).
//!
//! Stages a sequence of filesystem moves so a multi-step Layout Transform
//! (C8) can be rolled back if any step fails partway through, following the
//! stage-to-tempdir-then-commit shape used by `git-prole`'s `ConvertPlan`
//! and `gwt`'s `MigrationExecutor`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{BtError, Result};

/// One completed move, kept so [`Transaction::abort`] can reverse it.
struct Move {
    from: PathBuf,
    to: PathBuf,
}

/// A staged, rollback-capable sequence of filesystem moves.
///
/// Every [`Transaction::stage_move`] call performs the move immediately
/// (Git's own worktree metadata refers to absolute paths, so a dry-run
/// journal without touching disk can't keep `git worktree repair` in sync)
/// but records the reverse move. Call [`Transaction::finalise`] once every
/// step has succeeded, or let the transaction drop to abort automatically.
pub struct Transaction {
    done: Vec<Move>,
    finalised: bool,
}

impl Transaction {
    pub fn new() -> Self {
        Self {
            done: Vec::new(),
            finalised: false,
        }
    }

    /// Move `from` to `to`, creating `to`'s parent directory if needed.
    /// Falls back to copy+remove when `from` and `to` are on different
    /// filesystems (rename(2) returns `EXDEV`).
    pub fn stage_move(&mut self, from: &Path, to: &Path) -> Result<()> {
        log::debug!("fsops: move {} -> {}", from.display(), to.display());
        if let Some(parent) = to.parent() {
            fs::create_dir_all(parent)?;
        }
        match fs::rename(from, to) {
            Ok(()) => {}
            Err(e) if e.raw_os_error() == Some(libc_exdev()) => {
                copy_tree_preserving(from, to)?;
                remove_tree(from)?;
            }
            Err(e) => {
                return Err(BtError::from(e).context(format!(
                    "moving {} to {}",
                    from.display(),
                    to.display()
                )))
            }
        }
        self.done.push(Move {
            from: from.to_path_buf(),
            to: to.to_path_buf(),
        });
        Ok(())
    }

    /// Commit the transaction: no further rollback will happen.
    pub fn finalise(mut self) {
        self.finalised = true;
    }

    /// Reverse every staged move in reverse order. Best-effort: a failure
    /// partway through rollback is logged, not propagated, since the
    /// caller is already handling a prior error.
    pub fn abort(mut self) {
        self.run_abort();
        self.finalised = true; // prevent Drop from running it twice
    }

    fn run_abort(&mut self) {
        while let Some(mv) = self.done.pop() {
            log::warn!("fsops: rolling back {} -> {}", mv.to.display(), mv.from.display());
            if let Some(parent) = mv.from.parent() {
                let _ = fs::create_dir_all(parent);
            }
            if fs::rename(&mv.to, &mv.from).is_err() {
                let _ = copy_tree_preserving(&mv.to, &mv.from);
                let _ = remove_tree(&mv.to);
            }
        }
    }
}

impl Default for Transaction {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        if !self.finalised {
            self.run_abort();
        }
    }
}

#[cfg(unix)]
fn libc_exdev() -> i32 {
    18 // EXDEV on Linux/macOS
}

#[cfg(not(unix))]
fn libc_exdev() -> i32 {
    17
}

/// Recursively copy a directory tree, preserving symlinks (re-created
/// rather than followed) and file permissions — used both as the
/// cross-device move fallback and by the Layout Transform when attaching a
/// pre-existing directory to a freshly created worktree admin entry.
pub fn copy_tree_preserving(src: &Path, dst: &Path) -> Result<()> {
    let meta = fs::symlink_metadata(src)?;
    if meta.file_type().is_symlink() {
        let target = fs::read_link(src)?;
        #[cfg(unix)]
        std::os::unix::fs::symlink(&target, dst)?;
        #[cfg(not(unix))]
        fs::copy(src, dst)?;
        return Ok(());
    }
    if meta.is_dir() {
        fs::create_dir_all(dst)?;
        for entry in fs::read_dir(src)? {
            let entry = entry?;
            let child_dst = dst.join(entry.file_name());
            copy_tree_preserving(&entry.path(), &child_dst)?;
        }
        #[cfg(unix)]
        fs::set_permissions(dst, meta.permissions())?;
        return Ok(());
    }
    fs::copy(src, dst)?;
    #[cfg(unix)]
    fs::set_permissions(dst, meta.permissions())?;
    Ok(())
}

fn remove_tree(path: &Path) -> io::Result<()> {
    let meta = fs::symlink_metadata(path)?;
    if meta.file_type().is_symlink() || meta.is_file() {
        fs::remove_file(path)
    } else {
        fs::remove_dir_all(path)
    }
}

/// A scratch directory under the project's `.git` used to stage moves
/// during a Layout Transform, so a crash mid-transform leaves recoverable
/// state rather than orphaned files outside the repository.
pub fn staging_dir(git_dir: &Path) -> Result<PathBuf> {
    let dir = git_dir.join("baretree-staging");
    fs::create_dir_all(&dir)?;
    Ok(dir)
}

pub fn remove_staging_dir(git_dir: &Path) {
    let dir = git_dir.join("baretree-staging");
    let _ = fs::remove_dir_all(dir);
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn stage_move_then_finalise() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("a");
        let dst = dir.path().join("b/c");
        fs::write(&src, b"hi").unwrap();

        let mut txn = Transaction::new();
        txn.stage_move(&src, &dst).unwrap();
        txn.finalise();

        assert!(!src.exists());
        assert_eq!(fs::read_to_string(&dst).unwrap(), "hi");
    }

    #[test]
    fn abort_reverses_moves() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("a");
        let dst = dir.path().join("b/c");
        fs::write(&src, b"hi").unwrap();

        let mut txn = Transaction::new();
        txn.stage_move(&src, &dst).unwrap();
        txn.abort();

        assert!(src.exists());
        assert!(!dst.exists());
    }

    #[test]
    fn drop_without_finalise_rolls_back() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("a");
        let dst = dir.path().join("b");
        fs::write(&src, b"hi").unwrap();

        {
            let mut txn = Transaction::new();
            txn.stage_move(&src, &dst).unwrap();
        }

        assert!(src.exists());
        assert!(!dst.exists());
    }

    #[test]
    fn copy_tree_preserves_symlink() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("target.txt");
        fs::write(&target, b"hi").unwrap();
        let link = dir.path().join("link");
        #[cfg(unix)]
        std::os::unix::fs::symlink(&target, &link).unwrap();

        #[cfg(unix)]
        {
            let dst = dir.path().join("link-copy");
            copy_tree_preserving(&link, &dst).unwrap();
            assert!(fs::symlink_metadata(&dst).unwrap().file_type().is_symlink());
        }
    }
}
