//! CLI surface (spec.md §6).

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "bt", version, about = "One working directory per branch, hierarchically laid out around a bare Git repository")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a bare project at the current (or given) directory.
    Init {
        path: Option<PathBuf>,
        #[arg(long)]
        initial_branch: Option<String>,
        #[arg(long)]
        json: bool,
    },

    /// Materialise a worktree for a branch.
    Add {
        spec: String,
        #[arg(short = 'b', long = "new")]
        new_branch: bool,
        #[arg(long)]
        base: Option<String>,
        #[arg(long)]
        detach: bool,
        #[arg(long)]
        force: bool,
        #[arg(long, conflicts_with = "no_fetch")]
        fetch: bool,
        #[arg(long)]
        no_fetch: bool,
        #[arg(long)]
        repo: Option<PathBuf>,
        #[arg(long)]
        json: bool,
        #[arg(long, conflicts_with = "json")]
        print_cd_path: bool,
    },

    /// Remove a worktree, optionally deleting its branch.
    Remove {
        name: Option<String>,
        #[arg(long)]
        force: bool,
        #[arg(long)]
        with_branch: bool,
        #[arg(long)]
        repo: Option<PathBuf>,
        #[arg(long)]
        json: bool,
    },

    /// Rename a branch and move its worktree in place.
    Rename {
        old: String,
        new: String,
        #[arg(long)]
        repo: Option<PathBuf>,
        #[arg(long)]
        json: bool,
    },

    /// Reconcile Worktree Index inconsistencies.
    Repair {
        name: Option<String>,
        #[arg(long)]
        dry_run: bool,
        #[arg(long)]
        all: bool,
        #[arg(long, num_args = 0..)]
        fix_paths: Vec<PathBuf>,
        /// Which leg of a branch/directory mismatch to treat as
        /// authoritative: `branch` (default) moves the worktree to match
        /// the branch, `dir` renames the branch to match the directory.
        #[arg(long, value_parser = ["branch", "dir"])]
        source: Option<String>,
        #[arg(long)]
        repo: Option<PathBuf>,
        #[arg(long)]
        json: bool,
    },

    /// Enumerate worktrees.
    List {
        #[arg(long)]
        repo: Option<PathBuf>,
        #[arg(long)]
        json: bool,
        #[arg(long)]
        paths: bool,
    },

    /// Read-only consistency + ahead/behind report.
    Status {
        #[arg(long)]
        repo: Option<PathBuf>,
        #[arg(long)]
        json: bool,
    },

    /// Switch to an existing worktree (prints its path for shell wrappers).
    Cd {
        token: Option<String>,
        #[arg(short, long)]
        interactive: bool,
        #[arg(long)]
        repo: Option<PathBuf>,
    },

    /// Alias for `cd`, kept for muscle memory.
    Go {
        token: Option<String>,
        #[arg(short, long)]
        interactive: bool,
        #[arg(long)]
        repo: Option<PathBuf>,
    },

    /// Extract one worktree back to a standalone, non-bare repo.
    Unbare {
        branch: String,
        dest: PathBuf,
        #[arg(long)]
        repo: Option<PathBuf>,
        #[arg(long)]
        json: bool,
    },

    /// Repository-level operations.
    Repo {
        #[command(subcommand)]
        command: RepoCommand,
    },

    /// Per-project configuration.
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Manage PostCreateAction entries.
    PostCreate {
        #[command(subcommand)]
        command: ArtefactCommand,
    },

    /// Manage SyncToRootEntry entries.
    SyncToRoot {
        #[command(subcommand)]
        command: ArtefactCommand,
    },

    /// Print shell bindings to stdout.
    ShellInit { shell: Shell },

    /// Dynamic completion backend (spec.md §6 completion protocol).
    #[command(name = "__complete")]
    Complete { subcommand: String, partial: Option<String> },
}

#[derive(Subcommand, Debug)]
pub enum RepoCommand {
    Init {
        path: Option<PathBuf>,
        #[arg(long)]
        initial_branch: Option<String>,
    },
    Clone {
        url: String,
        path: Option<PathBuf>,
    },
    Migrate {
        source: Option<PathBuf>,
        #[arg(long)]
        destination: Option<PathBuf>,
        #[arg(long)]
        managed: bool,
        #[arg(long)]
        remove_source: bool,
        #[arg(long)]
        default_branch: Option<String>,
    },
    List {
        #[arg(long)]
        json: bool,
    },
    Cd {
        token: String,
    },
    Get {
        token: String,
        #[arg(long)]
        json: bool,
    },
    Root,
    Config {
        #[command(subcommand)]
        command: RepoConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum RepoConfigCommand {
    /// Manage the global baretree root(s) (spec.md §6 `repo config root`).
    Root {
        path: Option<PathBuf>,
        #[arg(long)]
        unset: bool,
        #[arg(long)]
        add: Option<PathBuf>,
        #[arg(long)]
        all: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    DefaultBranch {
        name: Option<String>,
        #[arg(long)]
        unset: bool,
    },
    Export {
        #[arg(long)]
        repo: Option<PathBuf>,
    },
    Import {
        file: PathBuf,
        #[arg(long)]
        repo: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
pub enum ArtefactCommand {
    Add {
        spec: String,
        #[arg(long)]
        repo: Option<PathBuf>,
    },
    Remove {
        spec: String,
        #[arg(long)]
        repo: Option<PathBuf>,
    },
    List {
        #[arg(long)]
        repo: Option<PathBuf>,
        #[arg(long)]
        json: bool,
    },
    Apply {
        #[arg(long)]
        repo: Option<PathBuf>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
}
