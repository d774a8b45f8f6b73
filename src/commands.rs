//! Command dispatcher — wires the CLI surface (spec.md §6) to the
//! per-component modules built around the Git Driver.

use std::io::IsTerminal;
use std::path::PathBuf;

use crate::artefacts;
use crate::cli::{ArtefactCommand, Cli, Command, ConfigCommand, RepoCommand, RepoConfigCommand, Shell};
use crate::completion;
use crate::config::{GlobalConfig, ProjectConfig};
use crate::domain::{BranchName, PostCreateAction, ProjectLayout, SyncToRootEntry, WorktreeState};
use crate::error::{BtError, Result, ResultExt};
use crate::git::{self, WorktreeAddOpts};
use crate::index;
use crate::layout;
use crate::materialize::{self, AddOpts, FetchPolicy};
use crate::output::{
    print_json, JsonListResponse, JsonRepairAction, JsonRepairResponse, JsonResponse,
    JsonStatusEntry, JsonStatusResponse,
};
use crate::registry;
use crate::repair::{self, RepairScope, SourcePolicy};
use crate::transform::{self, MigrateMode};

pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Init {
            path,
            initial_branch,
            json,
        } => cmd_init(path, initial_branch, json),
        Command::Add {
            spec,
            new_branch,
            base,
            detach,
            force,
            fetch,
            no_fetch,
            repo,
            json,
            print_cd_path,
        } => cmd_add(spec, new_branch, base, detach, force, fetch, no_fetch, repo, json, print_cd_path),
        Command::Remove {
            name,
            force,
            with_branch,
            repo,
            json,
        } => cmd_remove(name, force, with_branch, repo, json),
        Command::Rename { old, new, repo, json } => cmd_rename(old, new, repo, json),
        Command::Repair {
            name,
            dry_run,
            all,
            fix_paths,
            source,
            repo,
            json,
        } => cmd_repair(name, dry_run, all, fix_paths, source, repo, json),
        Command::List { repo, json, paths } => cmd_list(repo, json, paths),
        Command::Status { repo, json } => cmd_status(repo, json),
        Command::Cd {
            token,
            interactive,
            repo,
        } => cmd_cd(token, interactive, repo),
        Command::Go {
            token,
            interactive,
            repo,
        } => cmd_cd(token, interactive, repo),
        Command::Unbare {
            branch,
            dest,
            repo,
            json,
        } => cmd_unbare(branch, dest, repo, json),
        Command::Repo { command } => cmd_repo(command),
        Command::Config { command } => cmd_config(command),
        Command::PostCreate { command } => cmd_post_create(command),
        Command::SyncToRoot { command } => cmd_sync_to_root(command),
        Command::ShellInit { shell } => cmd_shell_init(shell),
        Command::Complete { subcommand, partial } => cmd_complete(subcommand, partial),
    }
}

// ── Shared helpers ─────────────────────────────────────────────────────

fn cwd() -> Result<PathBuf> {
    std::env::current_dir().map_err(|e| BtError::not_a_repo(format!("cannot determine cwd: {e}")))
}

fn resolve_layout(repo: Option<PathBuf>) -> Result<ProjectLayout> {
    let start = match repo {
        Some(p) => p,
        None => cwd()?,
    };
    let global = GlobalConfig::load();
    layout::discover(&start, &global).context("resolving repository layout")
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

// ── init ────────────────────────────────────────────────────────────────

fn cmd_init(path: Option<PathBuf>, initial_branch: Option<String>, json: bool) -> Result<()> {
    let target = path.unwrap_or(cwd()?);
    std::fs::create_dir_all(&target)?;
    let branch = initial_branch.unwrap_or_else(|| "main".to_string());
    let worktree_path = transform::init(&target, &branch)?;

    if json {
        let resp = JsonResponse::success(format!("initialised baretree project at '{}'", target.display()))
            .with_repo_root(target.display().to_string())
            .with_worktree_path(worktree_path.display().to_string())
            .with_branch(branch);
        print_json(&resp)?;
    } else {
        println!("Initialised baretree project at {}", target.display());
        println!("  {} -> {}", branch, worktree_path.display());
    }
    Ok(())
}

// ── add ─────────────────────────────────────────────────────────────────

#[allow(clippy::too_many_arguments)]
fn cmd_add(
    spec: String,
    new_branch: bool,
    base: Option<String>,
    detach: bool,
    force: bool,
    fetch: bool,
    no_fetch: bool,
    repo: Option<PathBuf>,
    json: bool,
    print_cd_path: bool,
) -> Result<()> {
    let layout = resolve_layout(repo)?;
    let fetch_policy = if no_fetch {
        FetchPolicy::Never
    } else if fetch {
        FetchPolicy::Always
    } else {
        FetchPolicy::Auto
    };
    let opts = AddOpts {
        new_branch,
        base,
        detach,
        force,
        fetch: fetch_policy,
    };
    let result = materialize::add(&layout, &spec, &opts)?;
    let path_str = result.path.display().to_string();

    if print_cd_path {
        println!("{path_str}");
    } else if json {
        let resp = JsonResponse::success(format!("created worktree for branch '{}'", result.branch))
            .with_repo_root(layout.root_path.display().to_string())
            .with_worktree_path(&path_str)
            .with_cd_path(&path_str)
            .with_branch(result.branch.as_str());
        print_json(&resp)?;
    } else {
        println!("Created worktree for branch '{}' at {path_str}", result.branch);
    }
    Ok(())
}

// ── remove ──────────────────────────────────────────────────────────────

fn cmd_remove(
    name: Option<String>,
    force: bool,
    with_branch: bool,
    repo: Option<PathBuf>,
    json: bool,
) -> Result<()> {
    let layout = resolve_layout(repo)?;
    let worktrees = index::build(&layout)?;

    let target = match name {
        Some(n) => index::find(&worktrees, &BranchName::new(&n))
            .ok_or_else(|| BtError::usage(format!("no worktree for branch '{n}'")))?
            .clone(),
        None => resolve_interactive_removal(&worktrees)?,
    };

    if target.is_main {
        return Err(BtError::invariant(
            "refusing to remove the main worktree".to_string(),
        ));
    }

    git::worktree_remove(&layout.git_dir_path, &target.path, force)
        .context("removing worktree")?;

    let mut warning = None;
    if with_branch {
        if let Some(branch) = &target.branch {
            if let Err(e) = git::branch_delete(&layout.git_dir_path, branch, force) {
                warning = Some(e.to_string());
            }
        }
    }

    let branch_str = target.branch.as_ref().map(BranchName::as_str).unwrap_or("(detached)");
    let path_str = target.path.display().to_string();

    if json {
        let resp = JsonResponse::success(format!("removed worktree for branch '{branch_str}'"))
            .with_repo_root(layout.root_path.display().to_string())
            .with_removed_path(&path_str)
            .with_branch(branch_str);
        print_json(&resp)?;
    } else {
        println!("Removed worktree for branch '{branch_str}' ({path_str})");
    }
    if let Some(w) = warning {
        eprintln!("warning: {w}");
    }
    Ok(())
}

fn resolve_interactive_removal(worktrees: &[crate::domain::Worktree]) -> Result<crate::domain::Worktree> {
    let candidates: Vec<_> = worktrees.iter().filter(|w| !w.is_main).collect();
    if candidates.is_empty() {
        return Err(BtError::usage("no worktrees to remove (create one with `bt add`)"));
    }
    if candidates.len() == 1 {
        return Ok(candidates[0].clone());
    }
    if !std::io::stdin().is_terminal() {
        return Err(BtError::usage(
            "no branch specified; interactive mode requires a terminal",
        ));
    }
    pick_worktree(&candidates, "Remove worktree")
}

#[cfg(feature = "interactive")]
fn pick_worktree(candidates: &[&crate::domain::Worktree], prompt: &str) -> Result<crate::domain::Worktree> {
    use dialoguer::theme::ColorfulTheme;
    use dialoguer::FuzzySelect;

    let items: Vec<String> = candidates
        .iter()
        .map(|wt| format!("{:<30} {}", wt.branch_str(), wt.path.display()))
        .collect();

    let selection = FuzzySelect::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .items(&items)
        .default(0)
        .interact_opt()
        .map_err(|e| BtError::usage(format!("picker failed: {e}")))?;

    match selection {
        Some(idx) => Ok(candidates[idx].clone()),
        None => std::process::exit(130),
    }
}

#[cfg(not(feature = "interactive"))]
fn pick_worktree(_candidates: &[&crate::domain::Worktree], _prompt: &str) -> Result<crate::domain::Worktree> {
    Err(BtError::usage(
        "interactive mode not available (compiled without 'interactive' feature)",
    ))
}

// ── rename ──────────────────────────────────────────────────────────────

fn cmd_rename(old: String, new: String, repo: Option<PathBuf>, json: bool) -> Result<()> {
    let layout = resolve_layout(repo)?;
    let old_branch = BranchName::parse(old)?;
    let new_branch = BranchName::parse(new)?;
    let new_path = transform::rename(&layout, &old_branch, &new_branch)?;

    if json {
        let resp = JsonResponse::success(format!(
            "renamed branch '{old_branch}' to '{new_branch}'"
        ))
        .with_repo_root(layout.root_path.display().to_string())
        .with_worktree_path(new_path.display().to_string())
        .with_branch(new_branch.as_str());
        print_json(&resp)?;
    } else {
        println!("Renamed '{old_branch}' to '{new_branch}' ({})", new_path.display());
    }
    Ok(())
}

// ── repair ──────────────────────────────────────────────────────────────

fn cmd_repair(
    name: Option<String>,
    dry_run: bool,
    all: bool,
    fix_paths: Vec<PathBuf>,
    source: Option<String>,
    repo: Option<PathBuf>,
    json: bool,
) -> Result<()> {
    let layout = resolve_layout(repo)?;
    let source = source.map(|s| SourcePolicy::parse(&s)).transpose()?.unwrap_or_default();

    let paths = if !fix_paths.is_empty() {
        Some(fix_paths)
    } else if let Some(n) = name {
        let branch = BranchName::parse(n)?;
        Some(vec![layout.root_path.join(branch.to_relpath())])
    } else {
        None
    };

    let actions = match paths {
        Some(paths) => repair::fix_paths(&layout, paths, source, dry_run)?,
        None => {
            let _ = all; // `--all` is already the implicit default scope.
            repair::repair(&layout, RepairScope::All, source, dry_run)?
        }
    };

    if json {
        let json_actions: Vec<JsonRepairAction> = actions.iter().map(JsonRepairAction::from).collect();
        print_json(&JsonRepairResponse {
            ok: true,
            dry_run,
            actions: json_actions,
        })?;
    } else if actions.is_empty() {
        println!("Nothing to repair.");
    } else {
        for a in &actions {
            println!("{} [{}] {}", a.path.display(), state_label(a.state), a.description);
        }
    }
    Ok(())
}

// ── list ────────────────────────────────────────────────────────────────

fn cmd_list(repo: Option<PathBuf>, json: bool, paths_only: bool) -> Result<()> {
    let layout = resolve_layout(repo)?;
    let worktrees = index::build(&layout)?;
    let current_path = cwd()
        .ok()
        .and_then(|c| c.canonicalize().ok())
        .and_then(|c| index::find_by_path(&worktrees, &c))
        .map(|wt| wt.path.clone());

    if json {
        print_json(&JsonListResponse::from_worktrees(&worktrees))?;
    } else if paths_only {
        for wt in &worktrees {
            println!("{}", wt.path.display());
        }
    } else if worktrees.is_empty() {
        println!("No worktrees found.");
    } else {
        for wt in &worktrees {
            let main_tag = if wt.is_main { " [main]" } else { "" };
            let current_tag = if current_path.as_deref() == Some(wt.path.as_path()) { " *" } else { "" };
            println!(
                "{:<50} {:<24} {} {}{}{}",
                wt.path.display(),
                wt.branch_str(),
                wt.head_commit,
                state_label(wt.state),
                main_tag,
                current_tag
            );
        }
    }
    Ok(())
}

// ── status ──────────────────────────────────────────────────────────────

fn cmd_status(repo: Option<PathBuf>, json: bool) -> Result<()> {
    let layout = resolve_layout(repo)?;
    let worktrees = index::build(&layout)?;
    let branches = git::branch_list(&layout.git_dir_path, false)?;

    let mut entries = Vec::new();
    for wt in &worktrees {
        let (ahead, behind) = match &wt.branch {
            Some(b) => {
                let upstream = branches
                    .iter()
                    .find(|br| &br.name == b)
                    .and_then(|br| br.upstream.clone());
                match upstream {
                    Some(u) => git::ahead_behind(&layout.git_dir_path, &u, b.as_str()).unwrap_or((0, 0)),
                    None => (0, 0),
                }
            }
            None => (0, 0),
        };
        entries.push((wt, ahead, behind));
    }

    if json {
        let json_entries: Vec<JsonStatusEntry> = entries
            .iter()
            .map(|(wt, ahead, behind)| JsonStatusEntry {
                branch: wt.branch.as_ref().map(|b| b.as_str().to_string()),
                path: wt.path.display().to_string(),
                state: state_label(wt.state),
                ahead: *ahead,
                behind: *behind,
            })
            .collect();
        print_json(&JsonStatusResponse {
            ok: true,
            entries: json_entries,
        })?;
    } else if entries.is_empty() {
        println!("No worktrees found.");
    } else {
        for (wt, ahead, behind) in &entries {
            println!(
                "{:<30} {:<50} {:<14} +{}/-{}",
                wt.branch_str(),
                wt.path.display(),
                state_label(wt.state),
                ahead,
                behind
            );
        }
    }
    Ok(())
}

// ── cd / go ─────────────────────────────────────────────────────────────

fn cmd_cd(token: Option<String>, interactive: bool, repo: Option<PathBuf>) -> Result<()> {
    let layout = resolve_layout(repo).ok();

    let path = match (&token, &layout) {
        (Some(t), _) => resolve_cd_token(t, layout.as_ref())?,
        (None, Some(l)) => resolve_cd_interactive(l, interactive)?,
        (None, None) => {
            return Err(BtError::usage(
                "no token given and no project found in the current directory",
            ))
        }
    };

    if let Some(l) = &layout {
        let _ = registry::record_visit(&l.git_dir_path, &path);
    }

    println!("{}", path.display());
    Ok(())
}

fn resolve_cd_token(token: &str, layout: Option<&ProjectLayout>) -> Result<PathBuf> {
    let global = GlobalConfig::load();
    let reg = registry::discover(&global);
    registry::resolve_token(&reg, layout, token)
}

fn resolve_cd_interactive(layout: &ProjectLayout, interactive: bool) -> Result<PathBuf> {
    let worktrees = index::build(layout)?;
    let candidates: Vec<_> = worktrees.iter().filter(|w| !w.is_main).collect();
    if candidates.is_empty() {
        return Err(BtError::usage("no worktrees to switch to (create one with `bt add`)"));
    }
    if !interactive && candidates.len() == 1 {
        return Ok(candidates[0].path.clone());
    }
    if !std::io::stdin().is_terminal() {
        return Err(BtError::usage(
            "no token specified; interactive mode requires a terminal",
        ));
    }
    pick_worktree(&candidates, "Switch to worktree").map(|w| w.path)
}

// ── unbare ──────────────────────────────────────────────────────────────

fn cmd_unbare(branch: String, dest: PathBuf, repo: Option<PathBuf>, json: bool) -> Result<()> {
    let layout = resolve_layout(repo)?;
    let branch = BranchName::parse(branch)?;
    transform::unbare(&layout, &branch, &dest)?;

    if json {
        let resp = JsonResponse::success(format!("extracted '{branch}' to a standalone repo"))
            .with_worktree_path(dest.display().to_string())
            .with_branch(branch.as_str());
        print_json(&resp)?;
    } else {
        println!("Extracted '{branch}' to {}", dest.display());
    }
    Ok(())
}

// ── repo ────────────────────────────────────────────────────────────────

fn cmd_repo(command: RepoCommand) -> Result<()> {
    match command {
        RepoCommand::Init { path, initial_branch } => cmd_init(path, initial_branch, false),
        RepoCommand::Clone { url, path } => cmd_repo_clone(url, path),
        RepoCommand::Migrate {
            source,
            destination,
            managed,
            remove_source,
            default_branch,
        } => cmd_repo_migrate(source, destination, managed, remove_source, default_branch),
        RepoCommand::List { json } => cmd_repo_list(json),
        RepoCommand::Cd { token } => cmd_repo_cd(token),
        RepoCommand::Get { token, json } => cmd_repo_get(token, json),
        RepoCommand::Root => cmd_repo_root(),
        RepoCommand::Config { command } => cmd_repo_config(command),
    }
}

fn cmd_repo_config(command: RepoConfigCommand) -> Result<()> {
    match command {
        RepoConfigCommand::Root { path, unset, add, all } => cmd_repo_config_root(path, unset, add, all),
    }
}

fn cmd_repo_config_root(path: Option<PathBuf>, unset: bool, add: Option<PathBuf>, all: bool) -> Result<()> {
    let global = GlobalConfig::load();

    if unset {
        global.unset_roots()?;
        println!("Global baretree root(s) cleared.");
        return Ok(());
    }
    if let Some(p) = add {
        global.add_root(&p)?;
        println!("Added global baretree root: {}", p.display());
        return Ok(());
    }
    if let Some(p) = path {
        global.set_root(&p)?;
        println!("Global baretree root set to: {}", p.display());
        return Ok(());
    }

    let roots = global.roots();
    if roots.is_empty() {
        return Err(BtError::usage("no global baretree root configured"));
    }
    if all {
        for r in &roots {
            println!("{}", r.display());
        }
    } else if let Some(primary) = roots.first() {
        println!("{}", primary.display());
    }
    Ok(())
}

fn default_clone_dest(url: &str) -> PathBuf {
    let stripped = url.strip_suffix(".git").unwrap_or(url);
    let name = stripped.rsplit('/').next().unwrap_or(stripped);
    PathBuf::from(name)
}

fn cmd_repo_clone(url: String, path: Option<PathBuf>) -> Result<()> {
    // With no explicit destination, a configured global root places the
    // clone at its managed, origin-derived path rather than a bare
    // `./<repo-name>` in the current directory.
    let dest = match path {
        Some(p) => p,
        None => {
            let global = GlobalConfig::load();
            registry::origin_path_for(&global, &url).unwrap_or_else(|| default_clone_dest(&url))
        }
    };
    if dest.exists() {
        return Err(BtError::destination_exists(dest.display()));
    }
    std::fs::create_dir_all(&dest)?;
    let git_dir = dest.join(".git");
    git::clone(&url, &git_dir, true).context("cloning bare repository")?;

    let default_branch = git::resolve_default_branch(&git_dir)?;
    let branch = BranchName::parse(&default_branch)?;
    let worktree_path = dest.join(branch.to_relpath());
    let opts = WorktreeAddOpts {
        create_branch: false,
        detach: false,
        no_checkout: false,
        force: false,
        base: None,
    };
    git::worktree_add(&git_dir, &worktree_path, &branch, &opts)
        .context("attaching default-branch worktree")?;
    git::worktree_repair(&git_dir, &[worktree_path.clone()])?;

    println!("Cloned '{url}' into {}", dest.display());
    println!("  {default_branch} -> {}", worktree_path.display());
    Ok(())
}

fn cmd_repo_migrate(
    source: Option<PathBuf>,
    destination: Option<PathBuf>,
    managed: bool,
    remove_source: bool,
    default_branch: Option<String>,
) -> Result<()> {
    let source = source.unwrap_or(cwd()?);
    let mode = if managed {
        MigrateMode::ToManaged {
            explicit_path: destination,
            remove_source,
        }
    } else if let Some(dest) = destination {
        MigrateMode::ToDestination(dest)
    } else {
        MigrateMode::InPlace
    };

    let report = transform::migrate(&source, mode, default_branch.as_deref())?;

    println!("Migrated to {}", report.new_root.display());
    println!("  default branch: {}", report.default_branch);
    for p in &report.worktrees_placed {
        println!("  worktree: {}", p.display());
    }
    Ok(())
}

fn cmd_repo_list(json: bool) -> Result<()> {
    let global = GlobalConfig::load();
    let reg = registry::discover(&global);

    if json {
        #[derive(serde::Serialize)]
        struct Entry {
            key: String,
            path: String,
        }
        let entries: Vec<Entry> = reg
            .projects
            .iter()
            .map(|p| Entry {
                key: p.key.clone(),
                path: p.path.display().to_string(),
            })
            .collect();
        print_json(&entries)?;
    } else if reg.projects.is_empty() {
        println!("No projects registered under the configured root(s).");
    } else {
        for p in &reg.projects {
            println!("{:<40} {}", p.key, p.path.display());
        }
    }
    Ok(())
}

fn cmd_repo_cd(token: String) -> Result<()> {
    let global = GlobalConfig::load();
    let reg = registry::discover(&global);
    let current = resolve_layout(None).ok();
    let path = registry::resolve_token(&reg, current.as_ref(), &token)?;
    println!("{}", path.display());
    Ok(())
}

fn cmd_repo_get(token: String, json: bool) -> Result<()> {
    let global = GlobalConfig::load();
    let reg = registry::discover(&global);
    let entry = reg
        .find(&token)
        .ok_or_else(|| BtError::usage(format!("no registered project matches '{token}'")))?;

    if json {
        let resp = JsonResponse::success(format!("found project '{}'", entry.key))
            .with_repo_root(entry.path.display().to_string());
        print_json(&resp)?;
    } else {
        println!("{}", entry.path.display());
    }
    Ok(())
}

fn cmd_repo_root() -> Result<()> {
    let global = GlobalConfig::load();
    let roots = global.roots();
    if roots.is_empty() {
        return Err(BtError::usage("no global baretree root configured"));
    }
    for r in roots {
        println!("{}", r.display());
    }
    Ok(())
}

// ── config ──────────────────────────────────────────────────────────────

fn cmd_config(command: ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::DefaultBranch { name, unset } => cmd_config_default_branch(name, unset),
        ConfigCommand::Export { repo } => cmd_config_export(repo),
        ConfigCommand::Import { file, repo } => cmd_config_import(file, repo),
    }
}

fn cmd_config_default_branch(name: Option<String>, unset: bool) -> Result<()> {
    let mut layout = resolve_layout(None)?;
    let cfg = ProjectConfig::new(&layout.git_dir_path);

    if unset {
        cfg.set_default_branch(None)?;
        // `set_default_branch(None)` reverts to "main" (see DESIGN.md), so
        // the in-memory layout has to follow or resync_to_root below would
        // still retarget at the branch that was just unset.
        layout.default_branch = Some("main".to_string());
        artefacts::resync_to_root(&layout).ok();
        println!("Default branch reset to 'main'.");
        return Ok(());
    }

    match name {
        Some(n) => {
            cfg.set_default_branch(Some(&n))?;
            layout.default_branch = Some(n.clone());
            if let Err(e) = artefacts::resync_to_root(&layout) {
                log::warn!("sync-to-root retarget failed after default-branch change: {e}");
            }
            println!("Default branch set to '{n}'.");
        }
        None => {
            let current = cfg.default_branch().or_else(|| layout.default_branch.clone());
            println!("{}", current.unwrap_or_else(|| "main".to_string()));
        }
    }
    Ok(())
}

fn cmd_config_export(repo: Option<PathBuf>) -> Result<()> {
    let layout = resolve_layout(repo)?;
    let cfg = ProjectConfig::new(&layout.git_dir_path);
    let raw = cfg.export_raw();

    let obj: serde_json::Map<String, serde_json::Value> = raw
        .into_iter()
        .map(|(k, v)| (k.to_string(), serde_json::Value::from(v)))
        .collect();
    print_json(&obj)
}

fn cmd_config_import(file: PathBuf, repo: Option<PathBuf>) -> Result<()> {
    let layout = resolve_layout(repo)?;
    let cfg = ProjectConfig::new(&layout.git_dir_path);
    let contents = std::fs::read_to_string(&file)?;
    let obj: serde_json::Map<String, serde_json::Value> = serde_json::from_str(&contents)
        .map_err(|e| BtError::usage(format!("malformed config file: {e}")))?;

    for (key, value) in obj {
        let values: Vec<String> = match value {
            serde_json::Value::Array(items) => items
                .into_iter()
                .filter_map(|v| v.as_str().map(String::from))
                .collect(),
            serde_json::Value::String(s) => vec![s],
            _ => continue,
        };
        cfg.import_raw(&key, &values)?;
    }
    println!("Imported configuration from {}.", file.display());
    Ok(())
}

// ── post-create ─────────────────────────────────────────────────────────

fn cmd_post_create(command: ArtefactCommand) -> Result<()> {
    match command {
        ArtefactCommand::Add { spec, repo } => cmd_post_create_add(spec, repo),
        ArtefactCommand::Remove { spec, repo } => cmd_post_create_remove(spec, repo),
        ArtefactCommand::List { repo, json } => cmd_post_create_list(repo, json),
        ArtefactCommand::Apply { repo } => cmd_post_create_apply(repo),
    }
}

fn cmd_post_create_add(spec: String, repo: Option<PathBuf>) -> Result<()> {
    let layout = resolve_layout(repo)?;
    let action = PostCreateAction::parse(&spec)?;

    if action.kind != crate::domain::PostCreateActionKind::Command {
        let conflicts = artefacts::check_conflicts(&layout, &action.target_or_cmd)?;
        if !conflicts.is_empty() && !action.managed {
            return Err(BtError::conflict(format!(
                "'{}' already exists as a regular file in {} worktree(s)",
                action.target_or_cmd,
                conflicts.len()
            )));
        }
    }

    let cfg = ProjectConfig::new(&layout.git_dir_path);
    cfg.add_post_create_action(&action)?;
    println!("Added post-create action: {}", action.encode());
    Ok(())
}

fn cmd_post_create_remove(spec: String, repo: Option<PathBuf>) -> Result<()> {
    let layout = resolve_layout(repo)?;
    let cfg = ProjectConfig::new(&layout.git_dir_path);
    let target = PostCreateAction::parse(&spec)?.encode();

    let remaining: Vec<PostCreateAction> = cfg
        .post_create_actions()
        .into_iter()
        .filter(|a| a.encode() != target)
        .collect();

    cfg.clear_post_create_actions()?;
    for a in &remaining {
        cfg.add_post_create_action(a)?;
    }
    println!("Removed post-create action: {spec}");
    Ok(())
}

fn cmd_post_create_list(repo: Option<PathBuf>, json: bool) -> Result<()> {
    let layout = resolve_layout(repo)?;
    let cfg = ProjectConfig::new(&layout.git_dir_path);
    let actions: Vec<String> = cfg.post_create_actions().iter().map(|a| a.encode()).collect();

    if json {
        print_json(&actions)?;
    } else if actions.is_empty() {
        println!("No post-create actions configured.");
    } else {
        for a in &actions {
            println!("{a}");
        }
    }
    Ok(())
}

fn cmd_post_create_apply(repo: Option<PathBuf>) -> Result<()> {
    let layout = resolve_layout(repo)?;
    artefacts::reapply_all(&layout)?;
    println!("Applied post-create actions to every worktree.");
    Ok(())
}

// ── sync-to-root ─────────────────────────────────────────────────────────

fn cmd_sync_to_root(command: ArtefactCommand) -> Result<()> {
    match command {
        ArtefactCommand::Add { spec, repo } => cmd_sync_to_root_add(spec, repo),
        ArtefactCommand::Remove { spec, repo } => cmd_sync_to_root_remove(spec, repo),
        ArtefactCommand::List { repo, json } => cmd_sync_to_root_list(repo, json),
        ArtefactCommand::Apply { repo } => cmd_sync_to_root_apply(repo),
    }
}

fn cmd_sync_to_root_add(spec: String, repo: Option<PathBuf>) -> Result<()> {
    let layout = resolve_layout(repo)?;
    let entry = SyncToRootEntry::parse(&spec);
    let cfg = ProjectConfig::new(&layout.git_dir_path);
    cfg.add_sync_to_root_entry(&entry)?;
    artefacts::resync_to_root(&layout)?;
    println!("Added sync-to-root entry: {}", entry.encode());
    Ok(())
}

fn cmd_sync_to_root_remove(spec: String, repo: Option<PathBuf>) -> Result<()> {
    let layout = resolve_layout(repo)?;
    let cfg = ProjectConfig::new(&layout.git_dir_path);
    let target = SyncToRootEntry::parse(&spec).encode();

    let remaining: Vec<SyncToRootEntry> = cfg
        .sync_to_root_entries()
        .into_iter()
        .filter(|e| e.encode() != target)
        .collect();

    cfg.clear_sync_to_root_entries()?;
    for e in &remaining {
        cfg.add_sync_to_root_entry(e)?;
    }
    println!("Removed sync-to-root entry: {spec}");
    Ok(())
}

fn cmd_sync_to_root_list(repo: Option<PathBuf>, json: bool) -> Result<()> {
    let layout = resolve_layout(repo)?;
    let cfg = ProjectConfig::new(&layout.git_dir_path);
    let entries: Vec<String> = cfg.sync_to_root_entries().iter().map(|e| e.encode()).collect();

    if json {
        print_json(&entries)?;
    } else if entries.is_empty() {
        println!("No sync-to-root entries configured.");
    } else {
        for e in &entries {
            println!("{e}");
        }
    }
    Ok(())
}

fn cmd_sync_to_root_apply(repo: Option<PathBuf>) -> Result<()> {
    let layout = resolve_layout(repo)?;
    artefacts::resync_to_root(&layout)?;
    println!("Synced root-level symlinks to the default-branch worktree.");
    Ok(())
}

// ── shell-init / completion ──────────────────────────────────────────────

fn cmd_shell_init(shell: Shell) -> Result<()> {
    let script = match shell {
        Shell::Bash => include_str!("../bindings/bash/bt.bash"),
        Shell::Zsh => include_str!("../bindings/zsh/bt.zsh"),
        Shell::Fish => include_str!("../bindings/fish/bt.fish"),
    };
    print!("{script}");
    Ok(())
}

fn cmd_complete(subcommand: String, partial: Option<String>) -> Result<()> {
    let layout = resolve_layout(None).ok();
    let branches = match &layout {
        Some(l) => git::branch_list(&l.git_dir_path, false)
            .unwrap_or_default()
            .into_iter()
            .map(|b| b.name)
            .collect(),
        None => Vec::new(),
    };
    let global = GlobalConfig::load();
    let reg = registry::discover(&global);

    let result = completion::complete(&subcommand, partial.as_deref().unwrap_or(""), &branches, &reg);
    print!("{}", completion::render(&result));
    Ok(())
}
