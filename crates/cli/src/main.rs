//! gitmerge command-line tool.
//!
//! Lists branches, reports what changed between two branches, prints
//! conflict-marker diffs of changed files, and downloads the target-side
//! content of changed files into a local directory.

mod style;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use dialoguer::Confirm;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use gitmerge_core::config::DEFAULT_CONFIG_FILE;
use gitmerge_core::conflict::{alignment_by_name, ConflictBlock};
use gitmerge_core::materialize::overlaps_repository;
use gitmerge_core::{AppConfig, BranchScope, ChangeFilter, ChangeSummary, RepositoryError, Session};

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// Compare git branches and render conflict-marker diffs.
#[derive(Parser, Debug)]
#[command(name = "gitmerge", version, about = "Compare git branches and render conflict-marker diffs")]
struct Cli {
    /// Path to the TOML configuration file (default: ./gitmerge.toml, then
    /// the user config directory).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Repository path, overriding `repository.path`.
    #[arg(short, long, global = true)]
    repo: Option<PathBuf>,

    /// Log level, overriding `logging.log_level`.
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List branches.
    Branches {
        /// Which branches to list: local, remote or all.
        #[arg(long, value_parser = parse_scope)]
        scope: Option<BranchScope>,

        #[arg(long)]
        json: bool,
    },

    /// Show files that differ between a branch and the base branch.
    Changes {
        /// Target branch (default: the checked-out branch).
        target: Option<String>,

        /// Base branch (default: `compare.base_branch`).
        #[arg(short, long)]
        base: Option<String>,

        /// Include deleted files.
        #[arg(long)]
        all: bool,

        #[arg(long)]
        json: bool,
    },

    /// Print one changed file as conflict-marker text.
    Diff {
        /// Target branch ("ours").
        target: String,

        /// Repository-relative file path.
        file: String,

        /// Base branch ("theirs").
        #[arg(short, long)]
        base: Option<String>,
    },

    /// Write every added or modified file into a directory.
    Download {
        /// Target branch.
        target: String,

        #[arg(short, long)]
        base: Option<String>,

        /// Destination directory (default: `output.dest_dir`). It is cleared first.
        #[arg(short, long)]
        dest: Option<PathBuf>,

        /// Do not ask before clearing a non-empty destination.
        #[arg(short, long)]
        yes: bool,
    },

    /// Compare a local directory against a branch.
    DiffDir {
        /// Branch to compare against ("theirs").
        branch: String,

        /// Local directory ("ours").
        dir: PathBuf,

        #[arg(long)]
        json: bool,
    },

    /// List every file on a branch.
    Files {
        branch: String,
    },

    /// Generate a default configuration file.
    Init {
        /// Output path for the generated config file.
        #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
        output: PathBuf,
    },

    /// Validate the configuration file.
    Validate,
}

fn parse_scope(s: &str) -> Result<BranchScope, String> {
    match s.to_ascii_lowercase().as_str() {
        "local" => Ok(BranchScope::Local),
        "remote" => Ok(BranchScope::Remote),
        "all" => Ok(BranchScope::All),
        other => Err(format!("unknown scope '{}': use local, remote or all", other)),
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    if let Commands::Init { output } = &cli.command {
        init_logging(cli.log_level.as_deref(), "warn");
        return cmd_init(output);
    }

    let mut config = load_config(cli.config.as_deref())?;
    if let Some(repo) = cli.repo {
        config.repository.path = repo;
    }
    init_logging(cli.log_level.as_deref(), &config.logging.log_level);
    if let Some(level) = cli.log_level {
        config.logging.log_level = level;
    }

    if let Commands::Validate = cli.command {
        return cmd_validate(&config);
    }
    config.validate().context("invalid configuration")?;

    let session = open_session(&config)?;
    let base_or_default = |base: Option<String>| base.unwrap_or_else(|| config.compare.base_branch.clone());

    match cli.command {
        Commands::Branches { scope, json } => {
            cmd_branches(&session, scope.unwrap_or(config.compare.branch_scope), json)
        }
        Commands::Changes {
            target,
            base,
            all,
            json,
        } => {
            let target = match target {
                Some(t) => t,
                None => session
                    .current_branch()?
                    .context("HEAD is not on a branch; name the target branch explicitly")?,
            };
            cmd_changes(&session, &target, &base_or_default(base), all, json)
        }
        Commands::Diff { target, file, base } => {
            cmd_diff(&session, &target, &base_or_default(base), &file)
        }
        Commands::Download {
            target,
            base,
            dest,
            yes,
        } => {
            let dest = dest.unwrap_or_else(|| config.output.dest_dir.clone());
            cmd_download(&session, &target, &base_or_default(base), &dest, yes)
        }
        Commands::DiffDir { branch, dir, json } => cmd_diff_dir(&session, &branch, &dir, json),
        Commands::Files { branch } => cmd_files(&session, &branch),
        Commands::Init { .. } | Commands::Validate => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// Setup helpers
// ---------------------------------------------------------------------------

/// `--log-level` wins, then `RUST_LOG`, then the configured level.
fn init_logging(explicit: Option<&str>, configured: &str) {
    let filter = match explicit {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(configured)),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();
}

/// Explicit path, then `./gitmerge.toml`, then the user config directory,
/// then built-in defaults.
fn load_config(explicit: Option<&Path>) -> Result<AppConfig> {
    let path = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => config_candidates().into_iter().find(|p| p.exists()),
    };
    let Some(path) = path else {
        return Ok(AppConfig::default());
    };

    let mut config = AppConfig::load_from_file(&path)
        .with_context(|| format!("failed to load configuration file {}", path.display()))?;
    config
        .resolve_env_vars()
        .context("failed to resolve environment variables")?;
    Ok(config)
}

fn config_candidates() -> Vec<PathBuf> {
    let mut candidates = vec![PathBuf::from(DEFAULT_CONFIG_FILE)];
    if let Some(dir) = dirs::config_dir() {
        candidates.push(dir.join("gitmerge").join(DEFAULT_CONFIG_FILE));
    }
    candidates
}

fn open_session(config: &AppConfig) -> Result<Session> {
    let mut session = Session::new();
    let alignment = alignment_by_name(&config.compare.alignment)
        .with_context(|| format!("unknown alignment '{}'", config.compare.alignment))?;
    session.set_alignment(alignment);

    let path = &config.repository.path;
    debug!(path = %path.display(), alignment = %config.compare.alignment, "opening repository");
    match session.bind(path) {
        Ok(()) => Ok(session),
        Err(RepositoryError::PathNotFound(_)) | Err(RepositoryError::NotAGitRepo(_))
            if config.repository.remote_url.is_some() =>
        {
            let url = config.repository.remote_url.as_deref().unwrap_or_default();
            let spinner = ProgressBar::new_spinner();
            if let Ok(style) = ProgressStyle::with_template("{spinner:.blue} {msg}") {
                spinner.set_style(style);
            }
            spinner.set_message(format!("Cloning {} ...", url));
            spinner.enable_steady_tick(Duration::from_millis(100));

            let result = session.bind_remote(url, path, config.repository.token.as_deref());
            spinner.finish_and_clear();
            result.with_context(|| format!("failed to clone {}", url))?;
            println!("{}", style::success(&format!("Cloned {} into {}", url, path.display())));
            Ok(session)
        }
        Err(e) => Err(e).context("failed to open repository"),
    }
}

// ---------------------------------------------------------------------------
// Subcommand implementations
// ---------------------------------------------------------------------------

fn cmd_branches(session: &Session, scope: BranchScope, json: bool) -> Result<()> {
    let branches = session
        .list_branches(scope)
        .context("failed to list branches")?;
    if json {
        println!("{}", serde_json::to_string_pretty(&branches)?);
        return Ok(());
    }

    let current = session.current_branch().ok().flatten();
    if branches.is_empty() {
        println!("{}", style::dim(&format!("No {} branches found.", scope)));
        return Ok(());
    }
    for name in &branches {
        let is_current = current.as_deref() == Some(name.as_str());
        println!("{} {}", style::current_marker(is_current), name);
    }
    Ok(())
}

fn cmd_changes(session: &Session, target: &str, base: &str, all: bool, json: bool) -> Result<()> {
    let filter = if all {
        ChangeFilter::All
    } else {
        ChangeFilter::AddedOrModified
    };
    let changes = session
        .compare_branches(target, base, filter)
        .with_context(|| format!("failed to compare '{}' with '{}'", target, base))?;
    let summary = ChangeSummary::from_changes(&changes);

    if json {
        let doc = serde_json::json!({
            "target": target,
            "base": base,
            "changes": changes,
            "summary": summary,
        });
        println!("{}", serde_json::to_string_pretty(&doc)?);
        return Ok(());
    }

    println!();
    println!("{}", style::header(&format!("{} compared with {}", target, base)));
    println!();

    if changes.is_empty() {
        println!("{}", style::success("No differences"));
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Action", "Path"]);
    for change in &changes {
        table.add_row(vec![
            Cell::new(change.action).fg(style::action_color(change.action)),
            Cell::new(&change.path),
        ]);
    }
    println!("{}", table);
    println!();
    println!(
        "{} file(s): {} added, {} modified, {} deleted",
        summary.total(),
        summary.added,
        summary.modified,
        summary.deleted
    );
    Ok(())
}

fn cmd_diff(session: &Session, target: &str, base: &str, file: &str) -> Result<()> {
    let text = session
        .diff_file(target, base, file)
        .with_context(|| format!("failed to diff '{}'", file))?;
    print!("{}", text);
    if !text.is_empty() && !text.ends_with('\n') {
        println!();
    }
    let blocks = ConflictBlock::scan(&text).len();
    eprintln!("{}", style::dim(&format!("{} conflict block(s)", blocks)));
    Ok(())
}

fn cmd_download(session: &Session, target: &str, base: &str, dest: &Path, yes: bool) -> Result<()> {
    if let Some(repo) = session.repo_path() {
        if overlaps_repository(dest, &repo) {
            anyhow::bail!(
                "refusing to clear {}: it is the repository or contains it",
                dest.display()
            );
        }
    }
    if is_non_empty_dir(dest) {
        println!(
            "{}",
            style::warn(&format!("{} will be cleared before writing.", dest.display()))
        );
        if !yes && console::Term::stdout().is_term() {
            let proceed = Confirm::new()
                .with_prompt("Continue?")
                .default(false)
                .interact()
                .context("failed to read confirmation")?;
            if !proceed {
                println!("{}", style::warn("Download cancelled. Nothing was changed."));
                return Ok(());
            }
        }
    }

    match session.download_changed_files(target, base, dest) {
        Ok(written) => {
            for path in &written {
                println!("  {}", path.display());
            }
            println!(
                "{}",
                style::success(&format!("{} file(s) written to {}", written.len(), dest.display()))
            );
            Ok(())
        }
        Err(e) => {
            for path in &e.written {
                println!("  {}", path.display());
            }
            Err(e).context("download incomplete")
        }
    }
}

fn cmd_diff_dir(session: &Session, branch: &str, dir: &Path, json: bool) -> Result<()> {
    let diffs = session
        .diff_directory(branch, dir)
        .with_context(|| format!("failed to compare {} with '{}'", dir.display(), branch))?;
    if json {
        println!("{}", serde_json::to_string_pretty(&diffs)?);
        return Ok(());
    }
    if diffs.is_empty() {
        println!("{}", style::success("No differences"));
        return Ok(());
    }
    for (path, text) in &diffs {
        println!("{}", style::header(&format!("=== {} ===", path)));
        println!("{}", text);
    }
    println!(
        "{}",
        style::dim(&format!("{} file(s) differ from {}", diffs.len(), branch))
    );
    Ok(())
}

fn cmd_files(session: &Session, branch: &str) -> Result<()> {
    let files = session
        .list_files(branch)
        .with_context(|| format!("failed to list files on '{}'", branch))?;
    for file in &files {
        println!("{}", file);
    }
    Ok(())
}

fn cmd_init(output: &Path) -> Result<()> {
    if output.exists() {
        let overwrite = Confirm::new()
            .with_prompt(format!("{} already exists. Overwrite?", output.display()))
            .default(false)
            .interact()
            .context("failed to read confirmation")?;
        if !overwrite {
            println!(
                "{}",
                style::warn("Init cancelled. Existing file was not modified.")
            );
            return Ok(());
        }
    }

    let body = AppConfig::default().to_toml()?;
    let contents = format!(
        "# gitmerge configuration\n\
         # repository.remote_url and repository.token_env are optional; set them\n\
         # to clone when repository.path holds no repository.\n\n{}",
        body
    );
    std::fs::write(output, contents).context("failed to write config file")?;

    println!("{}", style::success(&format!("Default configuration written to {}", output.display())));
    println!();
    println!("Next steps:");
    println!("  1. Point repository.path at your repository");
    println!("  2. Validate with: gitmerge validate --config {}", output.display());
    Ok(())
}

fn cmd_validate(config: &AppConfig) -> Result<()> {
    println!("  [OK] TOML structure is valid");
    println!("  [OK] Environment variable references processed");

    match config.validate() {
        Ok(()) => println!("  [OK] All fields are valid"),
        Err(e) => {
            println!("  [FAIL] Validation error: {}", e);
            anyhow::bail!("configuration validation failed");
        }
    }

    println!();
    println!("Configuration summary:");
    println!("  Repository    : {}", config.repository.path.display());
    println!(
        "  Remote URL    : {}",
        config.repository.remote_url.as_deref().unwrap_or("not set")
    );
    if config.repository.token_env.is_some() {
        println!(
            "  Clone token   : {}",
            if config.repository.token.is_some() {
                "set"
            } else {
                "NOT SET"
            }
        );
    }
    println!("  Base branch   : {}", config.compare.base_branch);
    println!("  Branch scope  : {}", config.compare.branch_scope);
    println!("  Alignment     : {}", config.compare.alignment);
    println!("  Output dir    : {}", config.output.dest_dir.display());
    println!("  Log level     : {}", config.logging.log_level);
    println!();
    println!("Configuration is valid.");
    Ok(())
}

// ---------------------------------------------------------------------------
// Utilities
// ---------------------------------------------------------------------------

fn is_non_empty_dir(path: &Path) -> bool {
    std::fs::read_dir(path)
        .map(|mut entries| entries.next().is_some())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_changes_defaults() {
        let cli = Cli::try_parse_from(["gitmerge", "changes"]).unwrap();
        match cli.command {
            Commands::Changes { target, base, all, json } => {
                assert!(target.is_none() && base.is_none());
                assert!(!all && !json);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_scope() {
        assert_eq!(parse_scope("Remote"), Ok(BranchScope::Remote));
        assert!(parse_scope("upstream").is_err());
    }

    #[test]
    fn test_global_repo_flag_after_subcommand() {
        let cli = Cli::try_parse_from(["gitmerge", "diff", "feature", "src/lib.rs", "-r", "/tmp/x"])
            .unwrap();
        assert_eq!(cli.repo, Some(PathBuf::from("/tmp/x")));
    }

    #[test]
    fn test_download_refuses_repository_as_destination() {
        let dir = tempfile::tempdir().unwrap();
        let repo_dir = dir.path().join("repo");
        git2::Repository::init(&repo_dir).unwrap();
        let mut session = Session::new();
        session.bind(&repo_dir).unwrap();

        assert!(cmd_download(&session, "feature", "main", &repo_dir.join("."), true).is_err());
        assert!(cmd_download(&session, "feature", "main", dir.path(), true).is_err());
        assert!(repo_dir.join(".git").is_dir());
    }
}
