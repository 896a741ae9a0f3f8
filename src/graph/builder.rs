//! Graph builder — enumerates build-unit sources and populates the graph.
//!
//! Walks each unit's roots respecting .gitignore, extracts includes from every
//! source in parallel, then feeds the results into the graph one file at a time.

use ignore::WalkBuilder;
use rayon::prelude::*;
use std::collections::BTreeSet;
use std::path::PathBuf;
use tracing::{debug, info, warn};

use super::engine::DependencyGraph;
use super::types::{IncludeEntry, SourceFile};
use crate::config::{UnitConfig, WorkspaceConfig};
use crate::parser::{read_includes, SourceKind};

/// Build a fresh graph for every unit of `config`.
pub fn build_graph(config: &WorkspaceConfig) -> DependencyGraph {
    let mut graph = DependencyGraph::new(config.search_directories());
    populate(&mut graph, config);
    graph
}

/// Add every source of every unit to `graph`. Returns the number of files added.
pub fn populate(graph: &mut DependencyGraph, config: &WorkspaceConfig) -> usize {
    let files = enumerate_sources(config);
    let extracted = extract_all(files);

    let mut added = 0;
    for (file, includes) in extracted {
        if graph.add_source_file(file, includes) {
            added += 1;
        }
    }
    info!(files = added, units = config.units.len(), "include graph populated");
    added
}

/// Re-extract one file from disk and replace its entry in the graph.
pub fn rebuild_file(graph: &mut DependencyGraph, file: SourceFile) {
    let includes = extract_one(&file);
    graph.update_source_file(file, includes);
}

/// Every source file of every unit, one `SourceFile` per (path, unit).
pub fn enumerate_sources(config: &WorkspaceConfig) -> Vec<SourceFile> {
    config
        .units
        .iter()
        .flat_map(|unit| enumerate_unit(config, unit))
        .collect()
}

/// Sources of one unit: files under its roots with a configured extension,
/// plus its explicit files. Sorted and de-duplicated.
pub fn enumerate_unit(config: &WorkspaceConfig, unit: &UnitConfig) -> Vec<SourceFile> {
    let mut paths: BTreeSet<PathBuf> = BTreeSet::new();

    for root in &unit.roots {
        if !root.is_dir() {
            warn!(unit = %unit.name, root = %root.display(), "unit root is not a directory");
            continue;
        }
        let walker = WalkBuilder::new(root)
            .hidden(true)
            .git_ignore(true)
            .git_global(true)
            .git_exclude(true)
            .build();
        paths.extend(
            walker
                .filter_map(|entry| entry.ok())
                .filter(|entry| entry.file_type().is_some_and(|ft| ft.is_file()))
                .filter(|entry| config.is_source_path(entry.path()))
                .map(|entry| entry.into_path()),
        );
    }

    for file in &unit.files {
        if file.is_file() {
            paths.insert(file.clone());
        } else {
            warn!(unit = %unit.name, file = %file.display(), "explicit unit file not found");
        }
    }

    debug!(unit = %unit.name, files = paths.len(), "enumerated unit sources");
    paths
        .into_iter()
        .map(|path| SourceFile::new(path, unit.name.clone()))
        .collect()
}

/// Extract includes for all files in parallel, preserving input order.
pub fn extract_all(files: Vec<SourceFile>) -> Vec<(SourceFile, Vec<IncludeEntry>)> {
    files
        .into_par_iter()
        .map(|file| {
            let includes = extract_one(&file);
            (file, includes)
        })
        .collect()
}

/// Extract includes of one file. Unreadable or unparsable files yield an
/// empty list so the file still gets a representation in the graph.
pub fn extract_one(file: &SourceFile) -> Vec<IncludeEntry> {
    match read_includes(file.path()) {
        Ok(includes) => includes,
        Err(e) => {
            warn!(file = %file, error = %e, "include extraction failed");
            Vec::new()
        }
    }
}

/// Get statistics about what would be indexed, without building a graph.
pub fn scan_stats(config: &WorkspaceConfig) -> ScanStats {
    let mut stats = ScanStats::default();
    for file in enumerate_sources(config) {
        stats.total_files += 1;
        match SourceKind::from_path(file.path()) {
            Some(SourceKind::Implementation) => stats.implementation_files += 1,
            Some(SourceKind::Header) => stats.header_files += 1,
            None => stats.other_files += 1,
        }
    }
    stats.units = config.units.len();
    stats
}

#[derive(Debug, Clone, Default)]
pub struct ScanStats {
    pub units: usize,
    pub total_files: usize,
    pub implementation_files: usize,
    pub header_files: usize,
    pub other_files: usize,
}

impl std::fmt::Display for ScanStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Found {} source files in {} units (implementation: {}, header: {}, other: {})",
            self.total_files, self.units, self.implementation_files, self.header_files, self.other_files
        )
    }
}
