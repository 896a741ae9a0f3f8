//! Workspace session: configuration, include graph and build state together.
//!
//! All mutation goes through `&mut Workspace` on one thread. Queries borrow the
//! graph through `queries()`, which carries the current build state so callers
//! get `None` while a rebuild or change batch is in progress.

use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info};

use crate::config::WorkspaceConfig;
use crate::error::Result;
use crate::graph::{populate, rebuild_file, DependencyGraph, GraphStats, SourceFile};
use crate::query::{BuildState, IncluderQuery};
use crate::watcher::FileChange;

/// What a change batch did to the graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChangeSummary {
    /// Representations added for paths not seen before.
    pub added: usize,
    /// Representations re-extracted from disk.
    pub updated: usize,
    /// Representations removed.
    pub removed: usize,
    /// Other files re-resolved because a target appeared or disappeared.
    pub reresolved: usize,
}

pub struct Workspace {
    config: WorkspaceConfig,
    graph: DependencyGraph,
    state: BuildState,
}

impl Workspace {
    /// Create an empty, not-yet-built workspace.
    pub fn new(config: WorkspaceConfig) -> Self {
        let graph = DependencyGraph::new(config.search_directories());
        Self {
            config,
            graph,
            state: BuildState::Empty,
        }
    }

    /// Load the manifest at `path`. The graph is not built yet.
    pub fn load(path: &Path) -> Result<Self> {
        Ok(Self::new(WorkspaceConfig::load(path)?))
    }

    pub fn config(&self) -> &WorkspaceConfig {
        &self.config
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    pub fn state(&self) -> BuildState {
        self.state
    }

    pub fn queries(&self) -> IncluderQuery<'_> {
        IncluderQuery::new(&self.graph, self.state)
    }

    /// Mark the graph as being modified; queries answer `None` until `end_batch`.
    pub fn begin_batch(&mut self) {
        self.state = BuildState::Building;
    }

    pub fn end_batch(&mut self) {
        self.state = BuildState::Ready;
    }

    /// Discard the graph and build it again from disk.
    pub fn rebuild(&mut self) -> GraphStats {
        self.begin_batch();
        self.graph.clear();
        self.graph.set_search_directories(self.config.search_directories());
        populate(&mut self.graph, &self.config);
        self.end_batch();

        let stats = self.graph.stats();
        info!(
            files = stats.source_files,
            resolved = stats.resolved_includes,
            unresolved = stats.unresolved_includes,
            "workspace built"
        );
        stats
    }

    /// Apply a batch of file changes.
    pub fn apply_changes(&mut self, changes: Vec<FileChange>) -> ChangeSummary {
        let mut summary = ChangeSummary::default();
        if changes.is_empty() {
            return summary;
        }

        self.begin_batch();
        for change in changes {
            debug!(change = ?change, "applying change");
            match change {
                FileChange::Removed(path) => self.remove_path(&path, &mut summary),
                FileChange::Created(path) => {
                    self.update_path(&path, &mut summary);
                    self.reresolve_name(&path, &mut summary);
                }
                FileChange::Changed(path) => self.update_path(&path, &mut summary),
            }
        }
        self.end_batch();

        info!(
            added = summary.added,
            updated = summary.updated,
            removed = summary.removed,
            reresolved = summary.reresolved,
            "change batch applied"
        );
        summary
    }

    /// Replace the configuration.
    ///
    /// If the set of sources may differ (units, roots, explicit files or
    /// extensions changed) the graph is rebuilt. Otherwise only the units whose
    /// search directories changed are re-resolved from their recorded raw
    /// includes. Returns the number of files re-resolved or rebuilt.
    pub fn set_config(&mut self, config: WorkspaceConfig) -> usize {
        let old_dirs = self.config.search_directories();
        let new_dirs = config.search_directories();
        let layout_changed = !same_source_layout(&self.config, &config);
        self.config = config;

        if layout_changed {
            info!("source layout changed, rebuilding");
            return self.rebuild().source_files;
        }

        let changed = old_dirs.changed_units(&new_dirs);
        self.graph.set_search_directories(new_dirs);
        if changed.is_empty() {
            return 0;
        }

        let was = self.state;
        self.state = BuildState::Building;
        let refreshed: usize = changed.iter().map(|unit| self.graph.refresh_unit(unit)).sum();
        self.state = was;
        info!(units = changed.len(), files = refreshed, "search directories changed");
        refreshed
    }

    // ─── Change handling ────────────────────────────────────────

    fn remove_path(&mut self, path: &Path, summary: &mut ChangeSummary) {
        let reps: Vec<SourceFile> = self
            .graph
            .representations(path)
            .map(|r| r.to_vec())
            .unwrap_or_default();
        for rep in &reps {
            if self.graph.remove_source_file(rep) {
                summary.removed += 1;
            }
        }

        let dependents: Vec<SourceFile> = self
            .graph
            .files_by_resolved_path(path)
            .into_iter()
            .cloned()
            .collect();
        summary.reresolved += self.graph.refresh_files(dependents);
    }

    fn update_path(&mut self, path: &Path, summary: &mut ChangeSummary) {
        let owners: Vec<String> = self
            .config
            .units_owning(path)
            .iter()
            .map(|u| u.name.clone())
            .collect();

        // Representations in units that no longer own the path.
        let stale: Vec<SourceFile> = self
            .graph
            .representations(path)
            .map(|reps| {
                reps.iter()
                    .filter(|rep| !owners.iter().any(|o| rep.in_unit(o)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        for rep in &stale {
            if self.graph.remove_source_file(rep) {
                summary.removed += 1;
            }
        }

        for unit in owners {
            let file = SourceFile::new(path, unit);
            if self.graph.contains(&file) {
                summary.updated += 1;
            } else {
                summary.added += 1;
            }
            rebuild_file(&mut self.graph, file);
        }
    }

    /// A new file may satisfy includes that were unresolved, or shadow a
    /// resolution found later in the search order. Re-resolve every file with
    /// an include of the same file name.
    fn reresolve_name(&mut self, path: &Path, summary: &mut ChangeSummary) {
        let Some(wanted) = path.file_name().map(|n| n.to_string_lossy().to_lowercase()) else {
            return;
        };
        let created: HashSet<SourceFile> = self
            .graph
            .representations(path)
            .map(|reps| reps.iter().cloned().collect())
            .unwrap_or_default();

        let mut candidates: Vec<SourceFile> = self
            .graph
            .resolved_entries()
            .filter(|(file, entries)| {
                !created.contains(*file)
                    && entries.iter().any(|e| e.include().name_matches(&wanted))
            })
            .map(|(file, _)| file.clone())
            .collect();
        candidates.sort();
        summary.reresolved += self.graph.refresh_files(candidates);
    }
}

fn same_source_layout(a: &WorkspaceConfig, b: &WorkspaceConfig) -> bool {
    a.extensions == b.extensions
        && a.units.len() == b.units.len()
        && a.units.iter().zip(&b.units).all(|(x, y)| {
            x.name.eq_ignore_ascii_case(&y.name) && x.roots == y.roots && x.files == y.files
        })
}
