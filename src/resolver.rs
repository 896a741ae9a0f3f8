//! Include path resolution.
//!
//! A raw include is resolved in two fixed phases, first match wins:
//! 1. relative to the directory of the including file;
//! 2. against each search directory of the owning build unit, in order.
//!
//! An include that matches nothing is unresolved, which is a normal outcome
//! (missing headers, system headers outside the workspace).

use std::collections::HashMap;
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Supplies the ordered include search directories of a build unit.
pub trait SearchDirectoryProvider {
    fn search_directories(&self, build_unit: &str) -> Vec<PathBuf>;
}

/// A fixed table of search directories keyed by build-unit id (case-insensitive).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticSearchDirectories {
    dirs: HashMap<String, Vec<PathBuf>>,
}

impl StaticSearchDirectories {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, build_unit: &str, dirs: Vec<PathBuf>) {
        self.dirs.insert(build_unit.to_lowercase(), dirs);
    }

    pub fn with(mut self, build_unit: &str, dirs: Vec<PathBuf>) -> Self {
        self.insert(build_unit, dirs);
        self
    }

    /// Build units whose directory list differs between `self` and `other`.
    pub fn changed_units(&self, other: &StaticSearchDirectories) -> Vec<String> {
        let mut changed: Vec<String> = self
            .dirs
            .keys()
            .chain(other.dirs.keys())
            .filter(|unit| self.dirs.get(*unit) != other.dirs.get(*unit))
            .cloned()
            .collect();
        changed.sort();
        changed.dedup();
        changed
    }
}

impl SearchDirectoryProvider for StaticSearchDirectories {
    fn search_directories(&self, build_unit: &str) -> Vec<PathBuf> {
        self.dirs
            .get(&build_unit.to_lowercase())
            .cloned()
            .unwrap_or_default()
    }
}

/// Resolve `raw_include` as written in `including_file`.
///
/// Returns the normalized absolute path of the first candidate that exists,
/// or `None`. Filesystem errors while probing a candidate count as "does not
/// exist" and never abort resolution.
pub fn resolve_include(
    raw_include: &str,
    including_file: &Path,
    search_dirs: &[PathBuf],
) -> Option<PathBuf> {
    let relative = to_native_separators(raw_include);

    if let Some(dir) = including_file.parent() {
        let candidate = normalize_path(&dir.join(&relative));
        if is_existing_file(&candidate) {
            return Some(candidate);
        }
    }

    search_dirs
        .iter()
        .map(|dir| normalize_path(&dir.join(&relative)))
        .find(|candidate| is_existing_file(candidate))
}

/// Lexically normalize a path: drop `.` components and fold `..` into the
/// preceding component. Does not touch the filesystem or follow symlinks.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                // `..` above the root stays at the root
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            other => out.push(other),
        }
    }
    out.iter().map(|c| c.as_os_str()).collect()
}

fn is_existing_file(candidate: &Path) -> bool {
    match fs::metadata(candidate) {
        Ok(meta) => meta.is_file(),
        Err(_) => false,
    }
}

fn to_native_separators(raw: &str) -> PathBuf {
    if cfg!(windows) {
        PathBuf::from(raw)
    } else {
        PathBuf::from(raw.replace('\\', "/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(
            normalize_path(Path::new("/a/b/../c/./d.h")),
            PathBuf::from("/a/c/d.h")
        );
        assert_eq!(normalize_path(Path::new("/../a.h")), PathBuf::from("/a.h"));
        assert_eq!(normalize_path(Path::new("../x/a.h")), PathBuf::from("../x/a.h"));
        assert_eq!(normalize_path(Path::new("a/../../b")), PathBuf::from("../b"));
    }

    #[test]
    fn test_resolve_relative_to_including_file() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        touch(&root.join("App/main.cpp"));
        touch(&root.join("Shared/Logger.h"));

        let resolved = resolve_include("../Shared/Logger.h", &root.join("App/main.cpp"), &[]);
        assert_eq!(resolved, Some(normalize_path(&root.join("Shared/Logger.h"))));
    }

    #[test]
    fn test_local_directory_wins_over_search_dirs() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        touch(&root.join("src/A.cpp"));
        touch(&root.join("src/B.h"));
        touch(&root.join("inc/B.h"));

        let resolved = resolve_include("B.h", &root.join("src/A.cpp"), &[root.join("inc")]);
        assert_eq!(resolved, Some(root.join("src/B.h")));
    }

    #[test]
    fn test_search_dirs_in_order() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        touch(&root.join("src/A.cpp"));
        touch(&root.join("second/util.h"));
        touch(&root.join("third/util.h"));

        let dirs = vec![root.join("first"), root.join("second"), root.join("third")];
        let resolved = resolve_include("util.h", &root.join("src/A.cpp"), &dirs);
        assert_eq!(resolved, Some(root.join("second/util.h")));
    }

    #[test]
    fn test_unresolved_is_none() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        touch(&root.join("src/A.cpp"));

        let resolved = resolve_include("missing.h", &root.join("src/A.cpp"), &[root.join("inc")]);
        assert!(resolved.is_none());
    }

    #[test]
    fn test_directory_is_not_a_match() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        touch(&root.join("src/A.cpp"));
        fs::create_dir_all(root.join("src/vector")).unwrap();

        assert!(resolve_include("vector", &root.join("src/A.cpp"), &[]).is_none());
    }

    #[test]
    fn test_backslash_include() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        touch(&root.join("App/main.cpp"));
        touch(&root.join("Shared/Logger.h"));

        let resolved = resolve_include(r"..\Shared\Logger.h", &root.join("App/main.cpp"), &[]);
        assert_eq!(resolved, Some(root.join("Shared").join("Logger.h")));
    }

    #[test]
    fn test_static_search_directories() {
        let dirs = StaticSearchDirectories::new().with("App", vec![PathBuf::from("/inc")]);
        assert_eq!(dirs.search_directories("app"), vec![PathBuf::from("/inc")]);
        assert!(dirs.search_directories("Other").is_empty());

        let other = StaticSearchDirectories::new()
            .with("App", vec![PathBuf::from("/inc2")])
            .with("Core", vec![]);
        assert_eq!(dirs.changed_units(&other), vec!["app", "core"]);
        assert!(dirs.changed_units(&dirs.clone()).is_empty());
    }
}
