//! repofleet - manage branches across many git repositories at once
//!
//! ## Commands
//!
//! - `scan`: List repositories under the root with their branches
//! - `apply`: Preview which repositories have a given branch
//! - `switch`: Assign target branches and check them out everywhere
//! - `pull`: Run `git pull` in every repository

mod last_root;
mod render;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use repofleet_core::{
    validate_root, BatchEngine, BatchSummary, FleetConfig, LogSettings, OperationKind, Registry,
};
use tracing::{info, warn};

use crate::last_root::LastRootStore;
use crate::render::{OutputFormat, Renderer};

#[derive(Parser)]
#[command(name = "repofleet")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Branch manager for a directory of git repositories", long_about = None)]
struct Cli {
    /// Directory to scan (default: the last root used)
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Deepest directory level below the root that is searched
    #[arg(long, global = true)]
    max_depth: Option<usize>,

    /// Maximum number of concurrent git processes
    #[arg(long, global = true)]
    concurrency: Option<usize>,

    /// git executable to run
    #[arg(long = "git", global = true)]
    git_program: Option<String>,

    /// Only switch repositories whose target is a known branch
    #[arg(long, global = true)]
    strict_targets: bool,

    /// Output format for results
    #[arg(long, value_enum, default_value = "text", global = true)]
    format: OutputFormat,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Discover repositories and show their branches
    Scan {
        /// Also list every known branch per repository
        #[arg(long)]
        branches: bool,
    },

    /// Show which repositories have BRANCH without switching
    Apply { branch: String },

    /// Check out target branches across all repositories
    Switch {
        /// Target this branch in every repository that has it
        #[arg(long)]
        all: Option<String>,

        /// Per-repository target, as PATH=BRANCH (repeatable)
        #[arg(long = "set", value_parser = parse_assignment)]
        set: Vec<(PathBuf, String)>,
    },

    /// Run `git pull` in every repository
    Pull,
}

fn parse_assignment(raw: &str) -> std::result::Result<(PathBuf, String), String> {
    let (path, branch) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected PATH=BRANCH, got '{raw}'"))?;
    if path.is_empty() {
        return Err(format!("missing repository path in '{raw}'"));
    }
    Ok((PathBuf::from(path), branch.to_string()))
}

/// Absolute registry key for a `--set` path.
fn resolve_repo_path(root: &Path, path: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    };
    joined.canonicalize().unwrap_or(joined)
}

fn build_config(cli: &Cli) -> Result<FleetConfig> {
    let mut config = FleetConfig::from_env().context("Invalid REPOFLEET_* environment")?;
    if let Some(depth) = cli.max_depth {
        config = config.with_max_depth(depth);
    }
    if let Some(limit) = cli.concurrency {
        config = config.with_concurrency(limit);
    }
    if let Some(program) = &cli.git_program {
        config = config.with_git_program(program.clone());
    }
    if cli.strict_targets {
        config = config.with_strict_targets(true);
    }
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn resolve_root(cli: &Cli, store: &LastRootStore) -> Result<PathBuf> {
    let root = match (&cli.root, store.load()) {
        (Some(root), _) => root.clone(),
        (None, Some(remembered)) => {
            info!(root = %remembered.display(), "using last root");
            remembered
        }
        (None, None) => bail!("No root directory given and none remembered; pass --root <DIR>"),
    };
    Ok(validate_root(&root)?)
}

/// Turn a batch with failed repositories into a non-zero exit.
fn check_summary(summary: &BatchSummary) -> Result<()> {
    if summary.failed > 0 {
        bail!(
            "{} failed in {} of {} repositories",
            summary.kind,
            summary.failed,
            summary.total()
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    repofleet_core::init_tracing(LogSettings {
        json: cli.log_json,
        verbose: cli.verbose,
    });

    let config = build_config(&cli)?;
    let store = LastRootStore::from_env();
    let root = resolve_root(&cli, &store)?;
    let engine = BatchEngine::from_config(&config);

    let token = engine.pool().cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, no further repositories will be started");
            token.cancel();
        }
    });

    let mut registry = Registry::new();
    let found = engine
        .scan(&mut registry, &root, config.max_depth)
        .await
        .with_context(|| format!("Failed to scan {}", root.display()))?;
    store.save(&root);

    let out = Renderer::new(cli.format, root.clone());
    match cli.command {
        Commands::Scan { branches } => {
            out.repositories(&registry, branches);
            out.found(found);
            Ok(())
        }
        Commands::Apply { branch } => {
            let summary = engine.apply_target_to_all(&mut registry, &branch);
            out.apply(&summary);
            Ok(())
        }
        Commands::Switch { all, set } => {
            cmd_switch(&engine, &mut registry, &root, &out, all.as_deref(), &set).await
        }
        Commands::Pull => {
            let outcomes = engine
                .pull_all_repos_with(&registry, |o| out.outcome(o))
                .await;
            let summary = BatchSummary::from_outcomes(OperationKind::Pull, &outcomes);
            out.summary(&summary);
            check_summary(&summary)
        }
    }
}

async fn cmd_switch(
    engine: &BatchEngine,
    registry: &mut Registry,
    root: &Path,
    out: &Renderer,
    all: Option<&str>,
    overrides: &[(PathBuf, String)],
) -> Result<()> {
    if let Some(branch) = all {
        let summary = engine.apply_target_to_all(registry, branch);
        out.apply(&summary);
    }
    for (path, branch) in overrides {
        let key = resolve_repo_path(root, path);
        registry
            .set_target(&key, branch.clone())
            .with_context(|| format!("Cannot target '{branch}' in {}", path.display()))?;
    }

    let outcomes = engine
        .switch_all_to_target_with(registry, |o| out.outcome(o))
        .await;
    out.repositories(registry, false);
    let summary = BatchSummary::from_outcomes(OperationKind::Checkout, &outcomes);
    out.summary(&summary);
    check_summary(&summary)
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
    fn test_parse_assignment() {
        assert_eq!(
            parse_assignment("services/api=release/1.2").unwrap(),
            (PathBuf::from("services/api"), "release/1.2".to_string())
        );
        assert_eq!(
            parse_assignment("api=").unwrap(),
            (PathBuf::from("api"), String::new())
        );
        assert!(parse_assignment("api").is_err());
        assert!(parse_assignment("=dev").is_err());
    }

    #[test]
    fn test_switch_arguments() {
        let cli = Cli::try_parse_from([
            "repofleet",
            "--root",
            "/w",
            "switch",
            "--all",
            "dev",
            "--set",
            "api=main",
            "--set",
            "web=feature/x",
        ])
        .unwrap();
        match cli.command {
            Commands::Switch { all, set } => {
                assert_eq!(all.as_deref(), Some("dev"));
                assert_eq!(set.len(), 2);
                assert_eq!(set[1].1, "feature/x");
            }
            _ => panic!("expected switch"),
        }
    }

    #[test]
    fn test_flag_overrides_reach_config() {
        let cli = Cli::try_parse_from([
            "repofleet",
            "scan",
            "--max-depth",
            "5",
            "--concurrency",
            "8",
            "--git",
            "/usr/bin/git",
            "--strict-targets",
        ])
        .unwrap();
        let config = build_config(&cli).unwrap();
        assert_eq!(config.max_depth, 5);
        assert_eq!(config.concurrency, 8);
        assert_eq!(config.git_program, "/usr/bin/git");
        assert!(config.strict_targets);
    }

    #[test]
    fn test_failed_repositories_fail_the_command() {
        let mut summary = BatchSummary {
            kind: OperationKind::Pull,
            succeeded: 2,
            failed: 0,
            skipped: 1,
        };
        assert!(check_summary(&summary).is_ok());
        summary.failed = 1;
        let err = check_summary(&summary).unwrap_err();
        assert_eq!(err.to_string(), "pull failed in 1 of 4 repositories");
    }

    #[test]
    fn test_relative_override_resolves_under_root() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().canonicalize().unwrap();
        std::fs::create_dir_all(root.join("api")).unwrap();
        assert_eq!(resolve_repo_path(&root, Path::new("api")), root.join("api"));
        assert_eq!(
            resolve_repo_path(&root, Path::new("/not/there")),
            PathBuf::from("/not/there")
        );
    }

    #[test]
    fn test_explicit_root_must_exist() {
        let tmp = tempfile::tempdir().unwrap();
        let store = LastRootStore::at(tmp.path().join("last_root"));
        let cli =
            Cli::try_parse_from(["repofleet", "--root", "/definitely/missing", "scan"]).unwrap();
        assert!(resolve_root(&cli, &store).is_err());

        let cli = Cli::try_parse_from(["repofleet", "scan"]).unwrap();
        assert!(resolve_root(&cli, &store).is_err());

        store.save(tmp.path());
        assert_eq!(
            resolve_root(&cli, &store).unwrap(),
            tmp.path().canonicalize().unwrap()
        );
    }
}
