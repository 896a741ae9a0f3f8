//! incscope CLI - include dependency graph for C/C++ workspaces.
//!
//! Usage:
//!   incscope build                      # Build graph, print statistics
//!   incscope includes <file>            # Direct includes per build unit
//!   incscope includers <path>           # Transitive includers of a file
//!   incscope includers-of <name>        # Transitive includers by file name
//!   incscope contexts <header>          # Implementation files including a header
//!   incscope cycles                     # Include cycles
//!   incscope watch                      # Follow file changes

use anyhow::Result;
use clap::Parser;
use incscope::cli::{run, Cli};

fn main() -> Result<()> {
    run(Cli::parse())
}
