//! The include dependency graph.
//!
//! Holds the forward map (file -> raw and resolved includes) and the reverse
//! indexes built from it. Every mutation goes through `add_source_file` or
//! `remove_source_file`, which keep all indexes in step: a file appears in a
//! reverse bucket only while it is a key of the forward map, and a bucket that
//! becomes empty is dropped.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::path::Path;
use tracing::{debug, info};

use super::types::*;
use crate::resolver::{resolve_include, SearchDirectoryProvider, StaticSearchDirectories};

/// Raw includes of one file and their resolutions, index-aligned.
#[derive(Debug, Clone, Default)]
struct FileIncludes {
    raw: Vec<IncludeEntry>,
    resolved: Vec<ResolvedIncludeEntry>,
}

/// Bidirectional include index for one analyzed workspace snapshot.
pub struct DependencyGraph {
    /// File -> its includes, raw and resolved.
    includes: HashMap<SourceFile, FileIncludes>,
    /// Raw include -> files containing it.
    by_raw: HashMap<IncludeEntry, HashSet<SourceFile>>,
    /// Resolved include -> files containing it.
    by_resolved_entry: HashMap<ResolvedIncludeEntry, HashSet<SourceFile>>,
    /// Folded destination path -> files including it.
    by_resolved_path: HashMap<String, HashSet<SourceFile>>,
    /// Folded physical path -> one representation per build unit.
    representations: HashMap<String, Vec<SourceFile>>,
    search_dirs: Box<dyn SearchDirectoryProvider>,
}

impl DependencyGraph {
    /// Create an empty graph resolving includes with `search_dirs`.
    pub fn new(search_dirs: impl SearchDirectoryProvider + 'static) -> Self {
        Self {
            includes: HashMap::new(),
            by_raw: HashMap::new(),
            by_resolved_entry: HashMap::new(),
            by_resolved_path: HashMap::new(),
            representations: HashMap::new(),
            search_dirs: Box::new(search_dirs),
        }
    }

    /// Swap the search-directory provider. Already recorded resolutions are
    /// kept; call `refresh_unit` for the units whose directories changed.
    pub fn set_search_directories(&mut self, search_dirs: impl SearchDirectoryProvider + 'static) {
        self.search_dirs = Box::new(search_dirs);
    }

    // ─── Mutations ──────────────────────────────────────────────

    /// Record `file` with its raw includes, resolving each one.
    ///
    /// Returns `false` without touching the graph if `file` is already present;
    /// use `update_source_file` to replace its includes.
    pub fn add_source_file(&mut self, file: SourceFile, raw_includes: Vec<IncludeEntry>) -> bool {
        if self.includes.contains_key(&file) {
            debug!(file = %file, "source file already present, add ignored");
            return false;
        }

        let search_dirs = self.search_dirs.search_directories(file.build_unit());
        let resolved: Vec<ResolvedIncludeEntry> = raw_includes
            .iter()
            .map(|entry| {
                let path = resolve_include(entry.raw(), file.path(), &search_dirs);
                ResolvedIncludeEntry::new(entry.clone(), path)
            })
            .collect();

        for entry in &raw_includes {
            self.by_raw
                .entry(entry.clone())
                .or_default()
                .insert(file.clone());
        }
        for entry in &resolved {
            self.by_resolved_entry
                .entry(entry.clone())
                .or_default()
                .insert(file.clone());
            if let Some(key) = entry.path_key() {
                self.by_resolved_path
                    .entry(key.to_string())
                    .or_default()
                    .insert(file.clone());
            }
        }

        let reps = self
            .representations
            .entry(file.path_key().to_string())
            .or_default();
        if reps.iter().any(|r| r == &file) {
            debug!(file = %file, "representation already recorded");
        } else {
            reps.push(file.clone());
        }

        debug!(
            file = %file,
            includes = raw_includes.len(),
            resolved = resolved.iter().filter(|r| r.is_resolved()).count(),
            "added source file"
        );
        self.includes.insert(
            file,
            FileIncludes {
                raw: raw_includes,
                resolved,
            },
        );
        true
    }

    /// Replace the includes of `file`: a remove followed by an add.
    pub fn update_source_file(&mut self, file: SourceFile, raw_includes: Vec<IncludeEntry>) {
        self.remove_source_file(&file);
        self.add_source_file(file, raw_includes);
    }

    /// Drop `file` and every index entry it contributed.
    ///
    /// Returns `false` if `file` was not present.
    pub fn remove_source_file(&mut self, file: &SourceFile) -> bool {
        let Some(recorded) = self.includes.remove(file) else {
            debug!(file = %file, "source file not present, remove ignored");
            return false;
        };

        for entry in &recorded.raw {
            detach(&mut self.by_raw, entry, file);
        }
        for entry in &recorded.resolved {
            detach(&mut self.by_resolved_entry, entry, file);
            if let Some(key) = entry.path_key() {
                detach(&mut self.by_resolved_path, key, file);
            }
        }

        if let Some(reps) = self.representations.get_mut(file.path_key()) {
            reps.retain(|r| r != file);
            if reps.is_empty() {
                self.representations.remove(file.path_key());
            }
        }

        debug!(file = %file, "removed source file");
        true
    }

    /// Drop everything. The search-directory provider is kept.
    pub fn clear(&mut self) {
        info!(files = self.includes.len(), "clearing include graph");
        self.includes.clear();
        self.by_raw.clear();
        self.by_resolved_entry.clear();
        self.by_resolved_path.clear();
        self.representations.clear();
    }

    /// Re-resolve every file of `build_unit` from its recorded raw includes.
    /// Returns the number of files updated.
    pub fn refresh_unit(&mut self, build_unit: &str) -> usize {
        let files = self.files_in_unit(build_unit);
        self.refresh_files(files)
    }

    /// Re-resolve the given files from their recorded raw includes.
    /// Files not in the graph are skipped.
    pub fn refresh_files(&mut self, files: Vec<SourceFile>) -> usize {
        let mut refreshed = 0;
        for file in files {
            let Some(raw) = self.includes.get(&file).map(|inc| inc.raw.clone()) else {
                continue;
            };
            self.update_source_file(file, raw);
            refreshed += 1;
        }
        refreshed
    }

    // ─── Lookups ────────────────────────────────────────────────

    pub fn contains(&self, file: &SourceFile) -> bool {
        self.includes.contains_key(file)
    }

    /// Number of source files (representations) in the graph.
    pub fn len(&self) -> usize {
        self.includes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.includes.is_empty()
    }

    /// Raw includes of `file` in source order; empty if unknown.
    pub fn raw_includes(&self, file: &SourceFile) -> &[IncludeEntry] {
        self.includes
            .get(file)
            .map(|inc| inc.raw.as_slice())
            .unwrap_or(&[])
    }

    /// Resolutions of `file`'s raw includes, index-aligned with `raw_includes`.
    pub fn resolved_includes(&self, file: &SourceFile) -> &[ResolvedIncludeEntry] {
        self.includes
            .get(file)
            .map(|inc| inc.resolved.as_slice())
            .unwrap_or(&[])
    }

    pub fn files_by_raw_include(&self, entry: &IncludeEntry) -> Vec<&SourceFile> {
        bucket(&self.by_raw, entry)
    }

    pub fn files_by_resolved_entry(&self, entry: &ResolvedIncludeEntry) -> Vec<&SourceFile> {
        bucket(&self.by_resolved_entry, entry)
    }

    /// Files with an include that resolved to `path` (case-insensitive).
    pub fn files_by_resolved_path(&self, path: &Path) -> Vec<&SourceFile> {
        bucket(&self.by_resolved_path, fold_path(path).as_str())
    }

    /// Every build-unit representation of the physical file at `path`.
    pub fn representations(&self, path: &Path) -> Option<&[SourceFile]> {
        self.representations
            .get(&fold_path(path))
            .map(|reps| reps.as_slice())
    }

    /// All source files, in no particular order.
    pub fn source_files(&self) -> impl Iterator<Item = &SourceFile> {
        self.includes.keys()
    }

    /// Every file paired with its resolved includes.
    pub fn resolved_entries(&self) -> impl Iterator<Item = (&SourceFile, &[ResolvedIncludeEntry])> {
        self.includes
            .iter()
            .map(|(file, inc)| (file, inc.resolved.as_slice()))
    }

    /// Files of one build unit, sorted.
    pub fn files_in_unit(&self, build_unit: &str) -> Vec<SourceFile> {
        let mut files: Vec<SourceFile> = self
            .includes
            .keys()
            .filter(|f| f.in_unit(build_unit))
            .cloned()
            .collect();
        files.sort();
        files
    }

    /// Files holding an unresolved include whose file name is `name`, sorted.
    pub fn files_with_unresolved_name(&self, name: &str) -> Vec<SourceFile> {
        let mut files: Vec<SourceFile> = self
            .resolved_entries()
            .filter(|(_, entries)| {
                entries
                    .iter()
                    .any(|e| !e.is_resolved() && e.include().name_matches(name))
            })
            .map(|(file, _)| file.clone())
            .collect();
        files.sort();
        files
    }

    // ─── Stats ──────────────────────────────────────────────────

    pub fn stats(&self) -> GraphStats {
        let mut stats = GraphStats {
            source_files: self.includes.len(),
            physical_files: self.representations.len(),
            distinct_targets: self.by_resolved_path.len(),
            ..GraphStats::default()
        };
        let mut units = HashSet::new();
        for (file, inc) in &self.includes {
            units.insert(file.build_unit().to_lowercase());
            stats.raw_includes += inc.raw.len();
            for entry in &inc.resolved {
                if entry.is_resolved() {
                    stats.resolved_includes += 1;
                } else {
                    stats.unresolved_includes += 1;
                }
            }
        }
        stats.build_units = units.len();
        stats
    }
}

impl Default for DependencyGraph {
    fn default() -> Self {
        Self::new(StaticSearchDirectories::default())
    }
}

/// Remove `file` from the bucket at `key`, dropping the bucket if it empties.
fn detach<K, Q>(index: &mut HashMap<K, HashSet<SourceFile>>, key: &Q, file: &SourceFile)
where
    K: Hash + Eq + std::borrow::Borrow<Q>,
    Q: Hash + Eq + ?Sized,
{
    if let Some(files) = index.get_mut(key) {
        files.remove(file);
        if files.is_empty() {
            index.remove(key);
        }
    }
}

fn bucket<'a, K, Q>(index: &'a HashMap<K, HashSet<SourceFile>>, key: &Q) -> Vec<&'a SourceFile>
where
    K: Hash + Eq + std::borrow::Borrow<Q>,
    Q: Hash + Eq + ?Sized,
{
    index
        .get(key)
        .map(|files| files.iter().collect())
        .unwrap_or_default()
}
