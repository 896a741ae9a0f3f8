//! File-change notifications.
//!
//! Watches every unit root and search directory recursively with a debounced
//! `notify` watcher and hands batches of changed source paths to the thread
//! that owns the graph. The graph is never touched from the watcher thread.

use notify_debouncer_mini::notify::{RecommendedWatcher, RecursiveMode};
use notify_debouncer_mini::{new_debouncer, DebounceEventResult, Debouncer};
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::WorkspaceConfig;
use crate::error::Result;
use crate::graph::DependencyGraph;

/// One change to a source file on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "path", rename_all = "snake_case")]
pub enum FileChange {
    Created(PathBuf),
    Changed(PathBuf),
    Removed(PathBuf),
}

impl FileChange {
    pub fn path(&self) -> &Path {
        match self {
            FileChange::Created(p) | FileChange::Changed(p) | FileChange::Removed(p) => p,
        }
    }

    /// Classify a path reported by the watcher against the current graph:
    /// gone from disk is `Removed`, already represented is `Changed`,
    /// anything else is `Created`.
    pub fn classify(path: PathBuf, graph: &DependencyGraph) -> Self {
        if !path.exists() {
            FileChange::Removed(path)
        } else if graph.representations(&path).is_some() {
            FileChange::Changed(path)
        } else {
            FileChange::Created(path)
        }
    }
}

/// A running watcher. Dropping it stops watching.
pub struct ChangeWatcher {
    // Keep the debouncer alive
    _debouncer: Debouncer<RecommendedWatcher>,
    rx: Receiver<DebounceEventResult>,
    config: WorkspaceConfig,
}

impl ChangeWatcher {
    /// Start watching every root of `config`.
    pub fn start(config: &WorkspaceConfig) -> Result<Self> {
        let (tx, rx) = mpsc::channel();
        let mut debouncer = new_debouncer(Duration::from_millis(config.debounce_ms), tx)?;

        let roots = config.watch_roots();
        for root in &roots {
            if !root.is_dir() {
                warn!(root = %root.display(), "skipping missing watch root");
                continue;
            }
            debouncer.watcher().watch(root, RecursiveMode::Recursive)?;
        }
        info!(roots = roots.len(), debounce_ms = config.debounce_ms, "watching for changes");

        Ok(Self {
            _debouncer: debouncer,
            rx,
            config: config.clone(),
        })
    }

    /// Wait up to `timeout` for the next batch of changed source paths.
    /// An empty batch means nothing relevant arrived in time; `None` means the
    /// watcher has shut down.
    pub fn next_batch_timeout(&self, timeout: Duration) -> Option<Vec<PathBuf>> {
        match self.rx.recv_timeout(timeout) {
            Ok(result) => Some(self.source_paths(result).unwrap_or_default()),
            Err(RecvTimeoutError::Timeout) => Some(Vec::new()),
            Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    fn source_paths(&self, result: DebounceEventResult) -> Option<Vec<PathBuf>> {
        match result {
            Ok(events) => {
                let paths = filter_source_paths(&self.config, events.into_iter().map(|e| e.path));
                debug!(paths = paths.len(), "debounced change batch");
                (!paths.is_empty()).then_some(paths)
            }
            Err(e) => {
                warn!(error = %e, "file watcher error");
                None
            }
        }
    }
}

/// Keep source-extension paths only, de-duplicated and sorted.
pub fn filter_source_paths(
    config: &WorkspaceConfig,
    paths: impl IntoIterator<Item = PathBuf>,
) -> Vec<PathBuf> {
    paths
        .into_iter()
        .filter(|p| config.is_source_path(p))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Classify a batch of paths against `graph`.
pub fn classify_batch(paths: Vec<PathBuf>, graph: &DependencyGraph) -> Vec<FileChange> {
    paths
        .into_iter()
        .map(|p| FileChange::classify(p, graph))
        .collect()
}
