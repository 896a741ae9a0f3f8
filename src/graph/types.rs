//! Core value types for the include graph.
//!
//! All identities compare case-insensitively: include text, file paths and
//! build-unit ids are folded to lowercase for equality and hashing while the
//! original spelling is kept for display.

use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

/// Fold a path to its case-insensitive lookup key.
pub(crate) fn fold_path(path: &Path) -> String {
    path.to_string_lossy().to_lowercase()
}

/// The file-name component of an include or path string, accepting either separator.
pub(crate) fn file_name_of(text: &str) -> &str {
    text.rsplit(['/', '\\']).next().unwrap_or(text)
}

// ─── IncludeEntry ───────────────────────────────────────────────────────────

/// One `#include` directive as written, without its delimiters.
#[derive(Debug, Clone, Serialize)]
pub struct IncludeEntry {
    /// Exact directive text, e.g. `../Shared/Logger.h`.
    raw: String,
    /// File-name component of `raw`, e.g. `Logger.h`.
    name: String,
    #[serde(skip)]
    key: String,
}

impl IncludeEntry {
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let name = file_name_of(&raw).to_string();
        let key = raw.to_lowercase();
        Self { raw, name, key }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn normalized_name(&self) -> &str {
        &self.name
    }

    /// Case-insensitive comparison of the file-name component.
    pub fn name_matches(&self, name: &str) -> bool {
        self.name.to_lowercase() == name.to_lowercase()
    }
}

impl PartialEq for IncludeEntry {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for IncludeEntry {}

impl Hash for IncludeEntry {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl fmt::Display for IncludeEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

// ─── ResolvedIncludeEntry ───────────────────────────────────────────────────

/// An include paired with the file it resolved to, if any.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedIncludeEntry {
    include: IncludeEntry,
    resolved_path: Option<PathBuf>,
    #[serde(skip)]
    path_key: Option<String>,
}

impl ResolvedIncludeEntry {
    pub fn new(include: IncludeEntry, resolved_path: Option<PathBuf>) -> Self {
        let path_key = resolved_path.as_deref().map(fold_path);
        Self {
            include,
            resolved_path,
            path_key,
        }
    }

    pub fn include(&self) -> &IncludeEntry {
        &self.include
    }

    pub fn resolved_path(&self) -> Option<&Path> {
        self.resolved_path.as_deref()
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved_path.is_some()
    }

    /// Folded resolved path, used as the key of the by-path index.
    pub(crate) fn path_key(&self) -> Option<&str> {
        self.path_key.as_deref()
    }

    /// True if this entry resolved to `path` (case-insensitive).
    pub fn points_to(&self, path: &Path) -> bool {
        self.path_key.as_deref() == Some(fold_path(path).as_str())
    }
}

impl PartialEq for ResolvedIncludeEntry {
    fn eq(&self, other: &Self) -> bool {
        self.include == other.include && self.path_key == other.path_key
    }
}

impl Eq for ResolvedIncludeEntry {}

impl Hash for ResolvedIncludeEntry {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.include.hash(state);
        self.path_key.hash(state);
    }
}

// ─── SourceFile ─────────────────────────────────────────────────────────────

/// A file as it participates in one build unit.
///
/// The same physical path owned by two build units gives two distinct
/// `SourceFile`s, since each unit may resolve the file's includes against
/// different search directories.
#[derive(Debug, Clone, Serialize)]
pub struct SourceFile {
    path: PathBuf,
    unit: String,
    #[serde(skip)]
    key: (String, String),
}

impl SourceFile {
    /// # Panics
    ///
    /// Panics if `path` or `unit` is empty. Both are caller bugs, not data
    /// conditions.
    pub fn new(path: impl Into<PathBuf>, unit: impl Into<String>) -> Self {
        let path = path.into();
        let unit = unit.into();
        assert!(
            !path.as_os_str().is_empty(),
            "source file identity requires a path"
        );
        assert!(!unit.is_empty(), "source file identity requires a build unit");
        let key = (fold_path(&path), unit.to_lowercase());
        Self { path, unit, key }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn build_unit(&self) -> &str {
        &self.unit
    }

    /// Folded path, shared by every representation of the same physical file.
    pub(crate) fn path_key(&self) -> &str {
        &self.key.0
    }

    pub fn in_unit(&self, unit: &str) -> bool {
        self.key.1 == unit.to_lowercase()
    }
}

impl PartialEq for SourceFile {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for SourceFile {}

impl Hash for SourceFile {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl PartialOrd for SourceFile {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SourceFile {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key.cmp(&other.key)
    }
}

impl fmt::Display for SourceFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.path.display(), self.unit)
    }
}

/// Statistics about the graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GraphStats {
    pub source_files: usize,
    pub physical_files: usize,
    pub build_units: usize,
    pub raw_includes: usize,
    pub resolved_includes: usize,
    pub unresolved_includes: usize,
    pub distinct_targets: usize,
}
