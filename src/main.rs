//! staghorn CLI
//!
//! Entry point for the `staghorn` command-line tool.

use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process;

use chrono::{Local, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;
use staghorn::pipeline::{self, Scope, SyncRequest, Workspace};
use staghorn::{Freshness, Paths, PipelineError};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "staghorn")]
#[command(about = "Compose layered CLAUDE.md files", version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge the layers and write the managed CLAUDE.md
    Sync {
        /// Write <project>/CLAUDE.md including the project layer
        #[arg(long)]
        project: bool,

        /// Project root (default: current directory)
        #[arg(long)]
        project_dir: Option<PathBuf>,

        /// Omit the banner and provenance markers
        #[arg(long)]
        no_annotate: bool,

        /// Overwrite an output file that staghorn does not manage
        #[arg(long)]
        force: bool,

        /// Refresh the team snapshot even if it is fresh
        #[arg(long)]
        refresh: bool,

        /// Print the merged document instead of writing it
        #[arg(long)]
        dry_run: bool,
    },

    /// Show layers, sections and languages for the merged output
    Info {
        /// Describe the project output instead of the global one
        #[arg(long)]
        project: bool,

        /// Project root (default: current directory)
        #[arg(long)]
        project_dir: Option<PathBuf>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Write edits in an annotated CLAUDE.md back to the personal and project layers
    Apply {
        /// Edited file ("-" for stdin)
        file: PathBuf,

        /// Project root (default: current directory)
        #[arg(long)]
        project_dir: Option<PathBuf>,

        /// Report what would be written without writing
        #[arg(long)]
        dry_run: bool,
    },

    /// Show detected, enabled, disabled and active languages
    Languages {
        /// Project root (default: current directory)
        #[arg(long)]
        project_dir: Option<PathBuf>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Team snapshot commands
    Cache {
        #[command(subcommand)]
        action: CacheCommands,
    },

    /// Print the effective configuration and where it came from
    Config {
        /// Project root (default: current directory)
        #[arg(long)]
        project_dir: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum CacheCommands {
    /// Show the team snapshot and its freshness
    Status {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Delete the team snapshot
    Clear,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Sync {
            project,
            project_dir,
            no_annotate,
            force,
            refresh,
            dry_run,
        } => run_sync(project, project_dir, no_annotate, force, refresh, dry_run),
        Commands::Info {
            project,
            project_dir,
            json,
        } => run_info(project, project_dir, json),
        Commands::Apply {
            file,
            project_dir,
            dry_run,
        } => run_apply(file, project_dir, dry_run),
        Commands::Languages { project_dir, json } => run_languages(project_dir, json),
        Commands::Cache { action } => match action {
            CacheCommands::Status { json } => run_cache_status(json),
            CacheCommands::Clear => run_cache_clear(),
        },
        Commands::Config { project_dir } => run_config(project_dir),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        if let Some(hint) = e.hint() {
            eprintln!("{}", hint);
        }
        process::exit(e.exit_code());
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "staghorn=warn",
        1 => "staghorn=info",
        _ => "staghorn=debug",
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with(fmt::layer().with_writer(io::stderr).with_target(false))
        .init();
}

fn load_workspace(
    project_dir: Option<PathBuf>,
    overrides: Option<serde_json::Value>,
) -> Result<Workspace, CliError> {
    let paths = Paths::from_env()?;
    let root = match project_dir {
        Some(dir) => dir,
        None => std::env::current_dir().map_err(|e| CliError::Io("current directory".into(), e))?,
    };
    Ok(Workspace::load(paths, root, overrides)?)
}

fn scope(project: bool) -> Scope {
    if project {
        Scope::Project
    } else {
        Scope::Global
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{}", json);
    Ok(())
}

fn run_sync(
    project: bool,
    project_dir: Option<PathBuf>,
    no_annotate: bool,
    force: bool,
    refresh: bool,
    dry_run: bool,
) -> Result<(), CliError> {
    let overrides = no_annotate.then(|| serde_json::json!({ "output": { "annotate": false } }));
    let workspace = load_workspace(project_dir, overrides)?;

    let request = SyncRequest {
        scope: scope(project),
        force,
        refresh,
        dry_run,
        today: Local::now().date_naive(),
    };
    let report = pipeline::sync(&workspace, &request)?;

    if dry_run {
        println!("{}", report.text);
        eprintln!(
            "(dry run) {} would be {}",
            report.output.display(),
            if report.outcome == staghorn::WriteOutcome::Unchanged {
                "unchanged"
            } else {
                "written"
            }
        );
        return Ok(());
    }

    println!("{}: {}", report.output.display(), report.outcome.describe());
    println!("  Layers: {}", report.layers.join(", "));
    println!("  Sections: {}", report.sections);
    if !report.languages.is_empty() {
        println!("  Languages: {}", report.languages.join(", "));
    }
    Ok(())
}

fn run_info(project: bool, project_dir: Option<PathBuf>, json: bool) -> Result<(), CliError> {
    let workspace = load_workspace(project_dir, None)?;
    let report = pipeline::info(&workspace, scope(project), Local::now().date_naive())?;

    if json {
        print_json(&report)
    } else {
        println!("{}", report.to_human());
        Ok(())
    }
}

fn run_apply(file: PathBuf, project_dir: Option<PathBuf>, dry_run: bool) -> Result<(), CliError> {
    let text = if file.as_os_str() == "-" {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .map_err(|e| CliError::Io("stdin".into(), e))?;
        buf
    } else {
        fs::read_to_string(&file).map_err(|e| CliError::Io(file.display().to_string(), e))?
    };

    let workspace = load_workspace(project_dir, None)?;
    let report = pipeline::apply(&workspace, &text, dry_run)?;

    for applied in &report.files {
        let label = match &applied.language {
            Some(lang) => format!("{}:{}", applied.source, lang),
            None => applied.source.clone(),
        };
        println!("  {:<16} {} ({})", label, applied.path.display(), applied.outcome.describe());
    }
    for skipped in &report.skipped {
        println!("  {:<16} skipped: {}", skipped.source, skipped.reason);
    }
    Ok(())
}

fn run_languages(project_dir: Option<PathBuf>, json: bool) -> Result<(), CliError> {
    let workspace = load_workspace(project_dir, None)?;
    let selection = workspace.languages(Scope::Project)?;

    if json {
        return print_json(&selection);
    }
    println!("Detected: {}", join_or_none(&selection.detected));
    println!("Enabled:  {}", join_or_none(&selection.enabled));
    println!("Disabled: {}", join_or_none(&selection.disabled));
    println!("Active:   {}", join_or_none(&selection.active));
    Ok(())
}

#[derive(Serialize)]
struct CacheStatus {
    dir: PathBuf,
    source: Option<String>,
    fetched_at: Option<String>,
    files: Vec<String>,
    freshness: Freshness,
}

fn run_cache_status(json: bool) -> Result<(), CliError> {
    let workspace = load_workspace(None, None)?;
    let cache = workspace.team_cache();
    let meta = cache.meta().map_err(PipelineError::from)?;
    let freshness = cache
        .freshness(workspace.settings.cache.ttl_seconds, Utc::now())
        .map_err(PipelineError::from)?;

    let status = CacheStatus {
        dir: cache.dir().to_path_buf(),
        source: meta.as_ref().map(|m| m.source.clone()),
        fetched_at: meta.as_ref().map(|m| m.fetched_at.to_rfc3339()),
        files: meta.map(|m| m.files).unwrap_or_default(),
        freshness,
    };

    if json {
        return print_json(&status);
    }
    println!("Team snapshot: {}", status.dir.display());
    match &status.source {
        Some(source) => {
            println!("  Source: {}", source);
            if let Some(at) = &status.fetched_at {
                println!("  Fetched: {}", at);
            }
            println!("  Files: {}", status.files.len());
            let state = match status.freshness {
                Freshness::Fresh { .. } => "fresh",
                Freshness::Stale { .. } => "stale",
                Freshness::Missing => "missing",
            };
            println!("  State: {}", state);
        }
        None => println!("  No snapshot. Run `staghorn sync` to create one."),
    }
    Ok(())
}

fn run_cache_clear() -> Result<(), CliError> {
    let workspace = load_workspace(None, None)?;
    let cache = workspace.team_cache();
    if cache.clear().map_err(PipelineError::from)? {
        println!("Removed {}", cache.dir().display());
    } else {
        println!("No team snapshot to remove.");
    }
    Ok(())
}

fn run_config(project_dir: Option<PathBuf>) -> Result<(), CliError> {
    let workspace = load_workspace(project_dir, None)?;
    println!("{}", workspace.config.to_json()?);
    Ok(())
}

fn join_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "none".to_string()
    } else {
        items.join(", ")
    }
}

/// Errors surfaced by CLI handlers
#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error(transparent)]
    Paths(#[from] staghorn::PathsError),

    #[error("Failed to read {0}: {1}")]
    Io(String, io::Error),

    #[error("Error serializing output: {0}")]
    Json(#[from] serde_json::Error),
}

impl CliError {
    fn exit_code(&self) -> i32 {
        match self {
            CliError::Pipeline(e) => e.exit_code(),
            _ => 1,
        }
    }

    fn hint(&self) -> Option<&'static str> {
        match self {
            CliError::Pipeline(e) => e.hint(),
            _ => None,
        }
    }
}
