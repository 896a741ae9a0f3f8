//! # incscope
//!
//! Include dependency graph for C/C++ workspaces.
//!
//! incscope records, for every source file of every build unit, the raw
//! `#include` directives it contains and what each one resolves to on disk,
//! and keeps reverse indexes so "who includes this header, transitively?" is
//! answered without re-reading the workspace.
//!
//! ## Key Features
//!
//! - **Per-unit resolution**: the same header owned by two build units is two
//!   graph nodes, each resolved with its unit's search directories
//! - **Incremental**: files are added, replaced and removed one at a time
//! - **Case-insensitive**: paths, include text and unit ids compare folded
//! - **Live**: a debounced file watcher feeds change batches to the graph
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use incscope::Workspace;
//! use std::path::Path;
//!
//! let mut workspace = Workspace::load(Path::new("incscope.toml")).unwrap();
//! workspace.rebuild();
//!
//! // Everything that ends up including Logger.h
//! let includers = workspace
//!     .queries()
//!     .transitive_includers_of_name("Logger.h", false)
//!     .unwrap_or_default();
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod graph;
pub mod parser;
pub mod query;
pub mod resolver;
pub mod watcher;
pub mod workspace;

// Re-exports for convenience
pub use config::{UnitConfig, WorkspaceConfig};
pub use error::{IncScopeError, Result};

// Graph re-exports
pub use graph::{
    build_graph, include_cycles, DependencyGraph, GraphStats, IncludeCycle, IncludeEntry,
    ResolvedIncludeEntry, SourceFile,
};
pub use query::{BuildState, IncluderQuery};
pub use resolver::{SearchDirectoryProvider, StaticSearchDirectories};
pub use watcher::{ChangeWatcher, FileChange};
pub use workspace::{ChangeSummary, Workspace};
