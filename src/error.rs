use std::fmt;
use std::process;

/// Stable exit codes, extended from the teacher's five-code table to cover
/// every error kind named in the CLI contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// 0 — success
    Success = 0,
    /// 1 — usage / argument error
    Usage = 1,
    /// 2 — git invocation error, or any unclassified subprocess failure
    Git = 2,
    /// 3 — not a baretree/git repository, or repo resolution failure
    NotARepo = 3,
    /// 4 — invariant violation (e.g. rename attempted on an inconsistent worktree)
    Invariant = 4,
    /// 5 — state conflict (dirty worktree, existing path, ref conflict, already checked out)
    Conflict = 5,
    /// 6 — remote unreachable (fatal for clone/fetch, non-fatal elsewhere)
    Remote = 6,
    /// 7 — a multi-step transform failed partway; rollback was attempted
    Partial = 7,
}

impl From<ExitCode> for process::ExitCode {
    fn from(code: ExitCode) -> Self {
        process::ExitCode::from(code as u8)
    }
}

/// Application-level error with a stable exit code and an optional
/// breadcrumb trail of the operations that were in progress when it
/// surfaced (pushed outermost-last, printed outermost-first).
#[derive(Debug)]
pub struct BtError {
    pub code: ExitCode,
    pub message: String,
    context: Vec<String>,
}

impl BtError {
    fn new(code: ExitCode, msg: impl Into<String>) -> Self {
        Self {
            code,
            message: msg.into(),
            context: Vec::new(),
        }
    }

    pub fn usage(msg: impl Into<String>) -> Self {
        Self::new(ExitCode::Usage, msg)
    }

    pub fn git(msg: impl Into<String>) -> Self {
        Self::new(ExitCode::Git, msg)
    }

    pub fn not_a_repo(msg: impl Into<String>) -> Self {
        Self::new(ExitCode::NotARepo, msg)
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::new(ExitCode::Invariant, msg)
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::new(ExitCode::Conflict, msg)
    }

    pub fn remote_unreachable(msg: impl Into<String>) -> Self {
        Self::new(ExitCode::Remote, msg)
    }

    pub fn destination_exists(path: impl fmt::Display) -> Self {
        Self::new(ExitCode::Conflict, format!("destination already exists: {path}"))
    }

    pub fn ref_conflict(existing: &str, attempted: &str) -> Self {
        Self::new(
            ExitCode::Conflict,
            format!(
                "'{attempted}' conflicts with existing ref '{existing}' \
                 (hierarchical names may not be a prefix of one another)"
            ),
        )
    }

    pub fn ref_not_found(name: &str) -> Self {
        Self::new(
            ExitCode::Usage,
            format!("ref not found: '{name}' (create it with `bt add -b {name}`)"),
        )
    }

    pub fn partial_failure(stage: &str, cause: impl fmt::Display) -> Self {
        Self::new(
            ExitCode::Partial,
            format!("failed during '{stage}', rolled back: {cause}"),
        )
    }

    /// Push a breadcrumb describing the operation that was attempted.
    pub fn context(mut self, ctx: impl Into<String>) -> Self {
        self.context.push(ctx.into());
        self
    }
}

impl fmt::Display for BtError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        for ctx in self.context.iter().rev() {
            write!(f, "\n  while {ctx}")?;
        }
        Ok(())
    }
}

impl std::error::Error for BtError {}

impl From<std::io::Error> for BtError {
    fn from(e: std::io::Error) -> Self {
        BtError::git(format!("I/O error: {e}"))
    }
}

pub type Result<T> = std::result::Result<T, BtError>;

pub trait ResultExt<T> {
    fn context(self, ctx: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.context(ctx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_prints_outermost_first() {
        let e = BtError::usage("bad thing")
            .context("resolving branch")
            .context("running add");
        let s = e.to_string();
        assert!(s.starts_with("bad thing"));
        assert!(s.contains("while running add"));
        assert!(s.contains("while resolving branch"));
    }

    #[test]
    fn ref_conflict_names_both() {
        let e = BtError::ref_conflict("feat", "feat/child");
        assert!(e.message.contains("feat"));
        assert!(e.message.contains("feat/child"));
        assert_eq!(e.code, ExitCode::Conflict);
    }
}
