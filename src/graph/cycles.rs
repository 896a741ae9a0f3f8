//! Include cycle detection.
//!
//! Projects the resolved include relation onto physical paths and reports
//! every strongly connected component that forms a cycle.

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::debug;

use super::engine::DependencyGraph;
use super::types::fold_path;

/// One include cycle: the physical files taking part, sorted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IncludeCycle {
    pub files: Vec<PathBuf>,
}

/// Find include cycles across all build units.
///
/// Paths are compared case-insensitively; a file including itself counts as a
/// cycle of one.
pub fn include_cycles(graph: &DependencyGraph) -> Vec<IncludeCycle> {
    let mut paths: DiGraph<PathBuf, ()> = DiGraph::new();
    let mut index: HashMap<String, NodeIndex> = HashMap::new();

    let mut node_for = |paths: &mut DiGraph<PathBuf, ()>, path: &std::path::Path| {
        *index
            .entry(fold_path(path))
            .or_insert_with(|| paths.add_node(path.to_path_buf()))
    };

    for (file, entries) in graph.resolved_entries() {
        let from = node_for(&mut paths, file.path());
        for target in entries.iter().filter_map(|e| e.resolved_path()) {
            let to = node_for(&mut paths, target);
            if paths.find_edge(from, to).is_none() {
                paths.add_edge(from, to, ());
            }
        }
    }

    let mut cycles: Vec<IncludeCycle> = tarjan_scc(&paths)
        .into_iter()
        .filter(|scc| scc.len() > 1 || paths.contains_edge(scc[0], scc[0]))
        .map(|scc| {
            let mut files: Vec<PathBuf> = scc.into_iter().map(|idx| paths[idx].clone()).collect();
            files.sort();
            IncludeCycle { files }
        })
        .collect();
    cycles.sort_by(|a, b| a.files.cmp(&b.files));

    debug!(cycles = cycles.len(), nodes = paths.node_count(), "include cycle scan");
    cycles
}
