//! Transitive include queries.
//!
//! Answers "which files include X, directly or through other headers" by
//! walking the graph upward from a seed set. Queries are only answered while
//! the graph is `Ready`; otherwise they return `None`, which callers must keep
//! apart from `Some` of an empty set ("ready, nobody includes it").

use serde::Serialize;
use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::graph::types::{file_name_of, SourceFile};
use crate::graph::DependencyGraph;
use crate::parser::SourceKind;

/// Lifecycle of the graph as seen by queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildState {
    /// No graph has been built yet.
    #[default]
    Empty,
    /// A full or partial rebuild is in progress.
    Building,
    /// Queries are answered.
    Ready,
}

/// Read-only query view over a graph in a given build state.
#[derive(Clone, Copy)]
pub struct IncluderQuery<'g> {
    graph: &'g DependencyGraph,
    state: BuildState,
}

impl<'g> IncluderQuery<'g> {
    pub fn new(graph: &'g DependencyGraph, state: BuildState) -> Self {
        Self { graph, state }
    }

    pub fn state(&self) -> BuildState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == BuildState::Ready
    }

    /// Every file that includes `target`, directly or transitively.
    pub fn transitive_includers_of_path(&self, target: &Path) -> Option<HashSet<SourceFile>> {
        if !self.is_ready() {
            return None;
        }
        let seeds: Vec<SourceFile> = self
            .graph
            .files_by_resolved_path(target)
            .into_iter()
            .cloned()
            .collect();
        Some(self.expand_upward(seeds))
    }

    /// Every file that includes a file named `name`, directly or transitively.
    ///
    /// Matching is on the include's file-name component, so unrelated headers
    /// sharing a name all contribute. With `strict`, the resolved file's name
    /// must match as well (filters out includes that resolved to a differently
    /// named file). Unresolved includes never match: there is no target to
    /// start from.
    pub fn transitive_includers_of_name(
        &self,
        name: &str,
        strict: bool,
    ) -> Option<HashSet<SourceFile>> {
        if !self.is_ready() {
            return None;
        }
        let wanted = file_name_of(name).to_lowercase();

        let mut targets: Vec<PathBuf> = Vec::new();
        for (_, entries) in self.graph.resolved_entries() {
            for entry in entries {
                let Some(resolved) = entry.resolved_path() else {
                    continue;
                };
                if !entry.include().name_matches(&wanted) {
                    continue;
                }
                if strict && !resolved_name_matches(resolved, &wanted) {
                    continue;
                }
                targets.push(resolved.to_path_buf());
            }
        }

        let mut seeds: Vec<SourceFile> = Vec::new();
        let mut seen_targets: HashSet<String> = HashSet::new();
        for target in &targets {
            if seen_targets.insert(target.to_string_lossy().to_lowercase()) {
                seeds.extend(self.graph.files_by_resolved_path(target).into_iter().cloned());
            }
        }
        debug!(name = %name, strict, targets = seen_targets.len(), seeds = seeds.len(), "name query seeded");
        Some(self.expand_upward(seeds))
    }

    /// Implementation files among the transitive includers of `header`, sorted.
    ///
    /// These are the translation units that can give the header a compilation
    /// context. An implementation file passed directly is its own context.
    pub fn compilation_contexts(&self, header: &Path) -> Option<Vec<SourceFile>> {
        if !self.is_ready() {
            return None;
        }
        let mut contexts: Vec<SourceFile> = if SourceKind::is_implementation(header) {
            self.graph
                .representations(header)
                .map(|reps| reps.to_vec())
                .unwrap_or_default()
        } else {
            self.transitive_includers_of_path(header)?
                .into_iter()
                .filter(|f| SourceKind::is_implementation(f.path()))
                .collect()
        };
        contexts.sort();
        Some(contexts)
    }

    /// Raw and resolved includes of every representation of `path`.
    pub fn direct_includes_report(&self, path: &Path) -> Option<Vec<IncludesReport>> {
        if !self.is_ready() {
            return None;
        }
        let mut reps: Vec<&SourceFile> = self
            .graph
            .representations(path)
            .map(|r| r.iter().collect())
            .unwrap_or_default();
        reps.sort();
        Some(
            reps.into_iter()
                .map(|file| IncludesReport {
                    file: file.clone(),
                    includes: self
                        .graph
                        .resolved_includes(file)
                        .iter()
                        .map(|entry| IncludeLine {
                            raw: entry.include().raw().to_string(),
                            name: entry.include().normalized_name().to_string(),
                            resolved: entry.resolved_path().map(Path::to_path_buf),
                        })
                        .collect(),
                })
                .collect(),
        )
    }

    /// Breadth-first walk from `seeds` up the "is included by" relation.
    /// Membership in the result gates re-enqueueing, so cycles terminate.
    fn expand_upward(&self, seeds: Vec<SourceFile>) -> HashSet<SourceFile> {
        let mut result: HashSet<SourceFile> = HashSet::new();
        let mut queue: VecDeque<SourceFile> = VecDeque::new();
        for seed in seeds {
            if result.insert(seed.clone()) {
                queue.push_back(seed);
            }
        }

        while let Some(current) = queue.pop_front() {
            for includer in self.graph.files_by_resolved_path(current.path()) {
                if !result.contains(includer) {
                    result.insert(includer.clone());
                    queue.push_back(includer.clone());
                }
            }
        }
        result
    }
}

fn resolved_name_matches(resolved: &Path, wanted: &str) -> bool {
    resolved
        .file_name()
        .is_some_and(|n| n.to_string_lossy().to_lowercase() == wanted)
}

// ─── Report types ───────────────────────────────────────────────────────────

/// One include line of a file, for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IncludeLine {
    pub raw: String,
    pub name: String,
    pub resolved: Option<PathBuf>,
}

/// The includes of one representation of a file.
#[derive(Debug, Clone, Serialize)]
pub struct IncludesReport {
    pub file: SourceFile,
    pub includes: Vec<IncludeLine>,
}

/// Result of a transitive includer query, for display.
#[derive(Debug, Clone, Serialize)]
pub struct IncludersResponse {
    pub target: String,
    pub state: BuildState,
    /// `None` when the graph was not ready.
    pub count: Option<usize>,
    pub includers: Vec<SourceFile>,
}

impl IncludersResponse {
    pub fn new(target: impl Into<String>, state: BuildState, result: Option<HashSet<SourceFile>>) -> Self {
        let count = result.as_ref().map(HashSet::len);
        let mut includers: Vec<SourceFile> = result.unwrap_or_default().into_iter().collect();
        includers.sort();
        Self {
            target: target.into(),
            state,
            count,
            includers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::types::IncludeEntry;
    use crate::resolver::StaticSearchDirectories;
    use std::fs;
    use tempfile::TempDir;

    struct Fixture {
        _tmp: TempDir,
        root: PathBuf,
        graph: DependencyGraph,
    }

    impl Fixture {
        fn new(files: &[&str]) -> Self {
            let tmp = TempDir::new().unwrap();
            let root = tmp.path().to_path_buf();
            for f in files {
                let path = root.join(f);
                fs::create_dir_all(path.parent().unwrap()).unwrap();
                fs::write(path, "").unwrap();
            }
            Self {
                _tmp: tmp,
                root,
                graph: DependencyGraph::default(),
            }
        }

        fn sf(&self, rel: &str) -> SourceFile {
            SourceFile::new(self.root.join(rel), "App")
        }

        fn add(&mut self, rel: &str, raw: &[&str]) -> SourceFile {
            let file = self.sf(rel);
            let includes = raw.iter().map(|r| IncludeEntry::new(*r)).collect();
            self.graph.add_source_file(file.clone(), includes);
            file
        }

        fn ready(&self) -> IncluderQuery<'_> {
            IncluderQuery::new(&self.graph, BuildState::Ready)
        }
    }

    fn set(files: &[&SourceFile]) -> HashSet<SourceFile> {
        files.iter().map(|f| (*f).clone()).collect()
    }

    #[test]
    fn test_chain_closure_and_break() {
        let mut fx = Fixture::new(&["a.cpp", "b.h", "c.h"]);
        let a = fx.add("a.cpp", &["b.h"]);
        let b = fx.add("b.h", &["c.h"]);
        fx.add("c.h", &[]);
        let c = fx.root.join("c.h");

        let result = fx.ready().transitive_includers_of_path(&c).unwrap();
        assert_eq!(result, set(&[&a, &b]));

        fx.graph.remove_source_file(&b);
        let result = fx.ready().transitive_includers_of_path(&c).unwrap();
        assert!(result.is_empty(), "A no longer reaches C once B is gone");
        assert_eq!(fx.graph.raw_includes(&a).len(), 1);
    }

    #[test]
    fn test_cycle_terminates() {
        let mut fx = Fixture::new(&["a.h", "b.h"]);
        let a = fx.add("a.h", &["b.h"]);
        let b = fx.add("b.h", &["a.h"]);

        let from_a = fx.ready().transitive_includers_of_path(&fx.root.join("a.h")).unwrap();
        let from_b = fx.ready().transitive_includers_of_path(&fx.root.join("b.h")).unwrap();
        assert_eq!(from_a, set(&[&a, &b]));
        assert_eq!(from_b, set(&[&a, &b]));
    }

    #[test]
    fn test_path_query_case_insensitive() {
        let mut fx = Fixture::new(&["a.cpp", "Inc.h"]);
        let a = fx.add("a.cpp", &["Inc.h"]);
        let upper = PathBuf::from(fx.root.to_string_lossy().to_uppercase()).join("INC.H");
        let result = fx.ready().transitive_includers_of_path(&upper).unwrap();
        assert_eq!(result, set(&[&a]));
    }

    #[test]
    fn test_not_ready_is_distinct_from_empty() {
        let mut fx = Fixture::new(&["a.cpp", "b.h"]);
        fx.add("a.cpp", &["b.h"]);
        let nobody = fx.root.join("nobody.h");

        for state in [BuildState::Empty, BuildState::Building] {
            let query = IncluderQuery::new(&fx.graph, state);
            assert!(query.transitive_includers_of_path(&fx.root.join("b.h")).is_none());
            assert!(query.transitive_includers_of_name("b.h", false).is_none());
            assert!(query.compilation_contexts(&fx.root.join("b.h")).is_none());
            assert!(query.direct_includes_report(&fx.root.join("a.cpp")).is_none());
        }

        let ready = fx.ready().transitive_includers_of_path(&nobody);
        assert_eq!(ready, Some(HashSet::new()));
    }

    #[test]
    fn test_name_query_seeds_from_includers() {
        let mut fx = Fixture::new(&["main.cpp", "sub/Logger.h", "mid.h"]);
        let main = fx.add("main.cpp", &["mid.h"]);
        let mid = fx.add("mid.h", &["sub/Logger.h"]);
        fx.add("sub/Logger.h", &[]);

        let result = fx.ready().transitive_includers_of_name("logger.h", false).unwrap();
        assert_eq!(result, set(&[&main, &mid]));

        // A path-qualified name is reduced to its file name.
        let result = fx.ready().transitive_includers_of_name("x/Logger.h", false).unwrap();
        assert_eq!(result, set(&[&main, &mid]));

        assert!(fx.ready().transitive_includers_of_name("other.h", false).unwrap().is_empty());
    }

    #[test]
    fn test_name_query_ignores_unresolved() {
        let mut fx = Fixture::new(&["a.cpp"]);
        fx.add("a.cpp", &["ghost.h"]);
        assert!(fx.ready().transitive_includers_of_name("ghost.h", false).unwrap().is_empty());
    }

    #[test]
    fn test_name_query_loose_vs_strict() {
        let mut fx = Fixture::new(&["a.cpp", "b.cpp", "one/util.h", "two/util.h"]);
        let a = fx.add("a.cpp", &["one/util.h"]);
        let b = fx.add("b.cpp", &["two/util.h"]);

        let loose = fx.ready().transitive_includers_of_name("util.h", false).unwrap();
        assert_eq!(loose, set(&[&a, &b]), "unrelated headers sharing a name both match");

        let strict = fx.ready().transitive_includers_of_name("util.h", true).unwrap();
        assert_eq!(strict, set(&[&a, &b]));
    }

    #[test]
    fn test_strict_name_drops_differently_named_target() {
        // `real.h/.` names `.` but normalizes to real.h on disk.
        let mut fx = Fixture::new(&["a.cpp", "real.h"]);
        let a = fx.add("a.cpp", &["real.h/."]);
        assert!(fx.graph.resolved_includes(&a)[0].points_to(&fx.root.join("real.h")));

        let loose = fx.ready().transitive_includers_of_name(".", false).unwrap();
        assert_eq!(loose, set(&[&a]));

        let strict = fx.ready().transitive_includers_of_name(".", true).unwrap();
        assert!(strict.is_empty(), "resolved file name real.h does not match");
    }

    #[test]
    fn test_strict_name_requires_resolved_name() {
        // Resolved through a search directory; strict compares the resolved
        // file name case-insensitively.
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        fs::create_dir_all(root.join("inc")).unwrap();
        fs::write(root.join("a.cpp"), "").unwrap();
        fs::write(root.join("inc/real.h"), "").unwrap();

        let mut graph = DependencyGraph::new(
            StaticSearchDirectories::new().with("App", vec![root.join("inc")]),
        );
        let a = SourceFile::new(root.join("a.cpp"), "App");
        graph.add_source_file(a.clone(), vec![IncludeEntry::new("real.h")]);

        let query = IncluderQuery::new(&graph, BuildState::Ready);
        assert_eq!(query.transitive_includers_of_name("REAL.H", true).unwrap().len(), 1);
        assert!(resolved_name_matches(&root.join("inc/real.h"), "real.h"));
        assert!(!resolved_name_matches(&root.join("inc/other.h"), "real.h"));
    }

    #[test]
    fn test_multi_representation_queries() {
        let mut fx = Fixture::new(&["ext/shared.h", "app.cpp", "test.cpp"]);
        let app = fx.add("app.cpp", &["ext/shared.h"]);
        let in_tests = SourceFile::new(fx.root.join("test.cpp"), "Tests");
        fx.graph
            .add_source_file(in_tests.clone(), vec![IncludeEntry::new("ext/shared.h")]);
        fx.add("ext/shared.h", &[]);
        fx.graph
            .add_source_file(SourceFile::new(fx.root.join("ext/shared.h"), "Tests"), vec![]);

        let shared = fx.root.join("ext/shared.h");
        assert_eq!(fx.graph.representations(&shared).unwrap().len(), 2);
        let result = fx.ready().transitive_includers_of_path(&shared).unwrap();
        assert_eq!(result, set(&[&app, &in_tests]));

        fx.graph.remove_source_file(&SourceFile::new(&shared, "Tests"));
        assert_eq!(fx.graph.representations(&shared).unwrap().len(), 1);
        let result = fx.ready().transitive_includers_of_path(&shared).unwrap();
        assert_eq!(result, set(&[&app, &in_tests]));
    }

    #[test]
    fn test_compilation_contexts() {
        let mut fx = Fixture::new(&["a.cpp", "b.cpp", "mid.h", "leaf.h", "lonely.h"]);
        let a = fx.add("a.cpp", &["mid.h"]);
        let b = fx.add("b.cpp", &["leaf.h"]);
        fx.add("mid.h", &["leaf.h"]);
        fx.add("leaf.h", &[]);
        fx.add("lonely.h", &[]);

        let contexts = fx.ready().compilation_contexts(&fx.root.join("leaf.h")).unwrap();
        let mut expected = vec![a.clone(), b];
        expected.sort();
        assert_eq!(contexts, expected);

        assert!(fx.ready().compilation_contexts(&fx.root.join("lonely.h")).unwrap().is_empty());
        assert_eq!(fx.ready().compilation_contexts(&fx.root.join("a.cpp")).unwrap(), vec![a]);
    }

    #[test]
    fn test_direct_includes_report() {
        let mut fx = Fixture::new(&["a.cpp", "b.h"]);
        let a = fx.add("a.cpp", &["b.h", "missing.h"]);

        let report = fx.ready().direct_includes_report(&fx.root.join("a.cpp")).unwrap();
        assert_eq!(report.len(), 1);
        assert_eq!(report[0].file, a);
        assert_eq!(
            report[0].includes,
            vec![
                IncludeLine {
                    raw: "b.h".to_string(),
                    name: "b.h".to_string(),
                    resolved: Some(fx.root.join("b.h")),
                },
                IncludeLine {
                    raw: "missing.h".to_string(),
                    name: "missing.h".to_string(),
                    resolved: None,
                },
            ]
        );
        assert!(fx.ready().direct_includes_report(&fx.root.join("nope.cpp")).unwrap().is_empty());
    }

    #[test]
    fn test_includers_response() {
        let not_ready = IncludersResponse::new("x.h", BuildState::Building, None);
        assert_eq!(not_ready.count, None);
        assert!(not_ready.includers.is_empty());

        let empty = IncludersResponse::new("x.h", BuildState::Ready, Some(HashSet::new()));
        assert_eq!(empty.count, Some(0));

        let json = serde_json::to_value(&not_ready).unwrap();
        assert_eq!(json["state"], "building");
        assert!(json["count"].is_null());
    }
}
