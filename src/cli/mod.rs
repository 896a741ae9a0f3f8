//! Command-line interface.
//!
//! Commands:
//! - Graph: build, stats, cycles
//! - Query: includes, includers, includers-of, contexts
//! - Live: watch
//!
//! Every command prints pretty JSON on stdout. Logs go to stderr.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::{WorkspaceConfig, DEFAULT_CONFIG_FILE};
use crate::graph::{include_cycles, scan_stats};
use crate::query::IncludersResponse;
use crate::resolver::normalize_path;
use crate::watcher::{classify_batch, ChangeWatcher};
use crate::workspace::Workspace;

#[derive(Parser)]
#[command(name = "incscope")]
#[command(about = "Include dependency graph for C/C++ workspaces")]
pub struct Cli {
    /// Workspace manifest
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    // ─── Graph Commands ─────────────────────────────────────────────
    /// Build the graph and print statistics
    #[command(alias = "stats")]
    Build,

    /// Print include cycles
    Cycles,

    // ─── Query Commands ─────────────────────────────────────────────
    /// Direct includes of a file, per build unit
    Includes {
        /// Source file path
        file: PathBuf,
    },

    /// Every file that includes a path, directly or transitively
    Includers {
        /// Included file path
        path: PathBuf,
    },

    /// Every file that includes a file with the given name
    IncludersOf {
        /// File name, e.g. Logger.h
        name: String,

        /// Also require the resolved file's name to match
        #[arg(long)]
        strict: bool,
    },

    /// Implementation files that give a header a compilation context
    Contexts {
        /// Header path
        header: PathBuf,
    },

    // ─── Live ───────────────────────────────────────────────────────
    /// Keep the graph updated from file changes, printing each batch
    Watch,
}

/// Install the stderr subscriber. `RUST_LOG` wins over the manifest's filter.
pub fn init_logging(config_filter: Option<&str>) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config_filter.unwrap_or("warn")));
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();
}

/// Parse-free entry point used by the binary.
pub fn run(cli: Cli) -> Result<()> {
    let config = WorkspaceConfig::load(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    init_logging(config.log_filter.as_deref());

    let mut workspace = Workspace::new(config);
    info!("{}", scan_stats(workspace.config()));
    workspace.rebuild();

    if cli.command == Commands::Watch {
        return watch(&mut workspace);
    }
    let output = execute(&workspace, &cli.command)?;
    print_json(&output)
}

/// Run one query command against a built workspace.
pub fn execute(workspace: &Workspace, command: &Commands) -> Result<Value> {
    let queries = workspace.queries();
    let state = workspace.state();
    let root = &workspace.config().root;

    let value = match command {
        Commands::Build => serde_json::to_value(workspace.graph().stats())?,
        Commands::Cycles => {
            let cycles = include_cycles(workspace.graph());
            json!({ "count": cycles.len(), "cycles": cycles })
        }
        Commands::Includes { file } => {
            let path = absolute_in(root, file);
            json!({
                "file": path,
                "state": state,
                "representations": queries.direct_includes_report(&path),
            })
        }
        Commands::Includers { path } => {
            let path = absolute_in(root, path);
            let result = queries.transitive_includers_of_path(&path);
            serde_json::to_value(IncludersResponse::new(path.display().to_string(), state, result))?
        }
        Commands::IncludersOf { name, strict } => {
            let result = queries.transitive_includers_of_name(name, *strict);
            serde_json::to_value(IncludersResponse::new(name.clone(), state, result))?
        }
        Commands::Contexts { header } => {
            let path = absolute_in(root, header);
            let contexts = queries.compilation_contexts(&path);
            json!({
                "header": path,
                "state": state,
                "count": contexts.as_ref().map(Vec::len),
                "contexts": contexts.unwrap_or_default(),
            })
        }
        Commands::Watch => anyhow::bail!("watch is not a query command"),
    };
    Ok(value)
}

fn watch(workspace: &mut Workspace) -> Result<()> {
    let watcher = ChangeWatcher::start(workspace.config())?;
    print_json(&serde_json::to_value(workspace.graph().stats())?)?;

    let idle = Duration::from_secs(1);
    while let Some(paths) = watcher.next_batch_timeout(idle) {
        if paths.is_empty() {
            continue;
        }
        let changes = classify_batch(paths, workspace.graph());
        let summary = workspace.apply_changes(changes.clone());
        print_json(&json!({ "changes": changes, "summary": summary }))?;
    }
    info!("watcher stopped");
    Ok(())
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Command-line paths are relative to the workspace root.
fn absolute_in(root: &Path, path: &Path) -> PathBuf {
    normalize_path(&root.join(path))
}
