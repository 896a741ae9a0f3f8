//! Workspace configuration.
//!
//! A workspace is described by a TOML manifest (default `incscope.toml`)
//! listing its build units. Relative paths in the manifest are taken relative
//! to the manifest's directory.
//!
//! ```toml
//! log_filter = "info"
//! debounce_ms = 300
//!
//! [[unit]]
//! name = "App"
//! roots = ["App"]
//! include_dirs = ["App/include"]
//! references = ["Core"]
//!
//! [[unit]]
//! name = "Core"
//! roots = ["Core"]
//! public_include_dirs = ["Core/api"]
//! ```

use serde::Deserialize;
use std::collections::{HashSet, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{IncScopeError, Result};
use crate::resolver::{normalize_path, StaticSearchDirectories};

pub const DEFAULT_CONFIG_FILE: &str = "incscope.toml";

const DEFAULT_DEBOUNCE_MS: u64 = 300;

const DEFAULT_EXTENSIONS: &[&str] = &[
    "c", "cc", "cpp", "cxx", "c++", "h", "hh", "hpp", "hxx", "h++", "inl", "ipp", "tpp",
];

/// Top-level workspace manifest.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WorkspaceConfig {
    /// Directory the manifest lives in; every path below is absolute under it.
    #[serde(skip)]
    pub root: PathBuf,
    /// Tracing filter used when `RUST_LOG` is not set.
    #[serde(default)]
    pub log_filter: Option<String>,
    /// Debounce window for file-change notifications.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    /// File extensions enumerated as sources (without the dot).
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    #[serde(default, rename = "unit")]
    pub units: Vec<UnitConfig>,
}

/// One build unit.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UnitConfig {
    pub name: String,
    /// Directories scanned for sources.
    #[serde(default)]
    pub roots: Vec<PathBuf>,
    /// Files owned by the unit outside its roots (shared headers).
    #[serde(default)]
    pub files: Vec<PathBuf>,
    /// Search directories used by this unit only.
    #[serde(default)]
    pub include_dirs: Vec<PathBuf>,
    /// Search directories inherited by units referencing this one.
    #[serde(default)]
    pub public_include_dirs: Vec<PathBuf>,
    /// Names of referenced units.
    #[serde(default)]
    pub references: Vec<String>,
}

fn default_debounce_ms() -> u64 {
    DEFAULT_DEBOUNCE_MS
}

fn default_extensions() -> Vec<String> {
    DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect()
}

impl WorkspaceConfig {
    /// Load and validate a manifest from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| IncScopeError::io(e, path))?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_toml_str(&text, base)
    }

    /// Parse a manifest whose relative paths are relative to `base_dir`.
    pub fn from_toml_str(text: &str, base_dir: &Path) -> Result<Self> {
        let mut config: WorkspaceConfig = toml::from_str(text)?;
        config.root = absolute(base_dir)?;
        config.absolutize();
        config.validate()?;
        Ok(config)
    }

    fn absolutize(&mut self) {
        let root = self.root.clone();
        let fix = |paths: &mut Vec<PathBuf>| {
            for p in paths.iter_mut() {
                *p = normalize_path(&root.join(&*p));
            }
        };
        for unit in &mut self.units {
            fix(&mut unit.roots);
            fix(&mut unit.files);
            fix(&mut unit.include_dirs);
            fix(&mut unit.public_include_dirs);
        }
        for ext in &mut self.extensions {
            *ext = ext.trim_start_matches('.').to_lowercase();
        }
    }

    /// Unit names must be unique and non-empty, references must name a unit.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for unit in &self.units {
            if unit.name.trim().is_empty() {
                return Err(IncScopeError::Config("build unit with empty name".to_string()));
            }
            if !seen.insert(unit.name.to_lowercase()) {
                return Err(IncScopeError::Config(format!(
                    "duplicate build unit '{}'",
                    unit.name
                )));
            }
        }
        for unit in &self.units {
            for reference in &unit.references {
                if self.unit(reference).is_none() {
                    return Err(IncScopeError::UnknownUnit(format!(
                        "{} (referenced by {})",
                        reference, unit.name
                    )));
                }
            }
        }
        Ok(())
    }

    /// Look up a unit by name (case-insensitive).
    pub fn unit(&self, name: &str) -> Option<&UnitConfig> {
        let name = name.to_lowercase();
        self.units.iter().find(|u| u.name.to_lowercase() == name)
    }

    /// Ordered search directories of `name`: its own `include_dirs`, then the
    /// `public_include_dirs` of the units it references, breadth-first through
    /// the reference chain. Duplicates keep their first position.
    pub fn search_directories_for(&self, name: &str) -> Vec<PathBuf> {
        let Some(unit) = self.unit(name) else {
            return Vec::new();
        };

        let mut dirs: Vec<PathBuf> = Vec::new();
        let push = |dir: &PathBuf, dirs: &mut Vec<PathBuf>| {
            if !dirs.contains(dir) {
                dirs.push(dir.clone());
            }
        };
        for dir in &unit.include_dirs {
            push(dir, &mut dirs);
        }

        let mut visited: HashSet<String> = HashSet::from([unit.name.to_lowercase()]);
        let mut queue: VecDeque<&str> = unit.references.iter().map(String::as_str).collect();
        while let Some(next) = queue.pop_front() {
            if !visited.insert(next.to_lowercase()) {
                continue;
            }
            if let Some(referenced) = self.unit(next) {
                for dir in &referenced.public_include_dirs {
                    push(dir, &mut dirs);
                }
                queue.extend(referenced.references.iter().map(String::as_str));
            }
        }
        dirs
    }

    /// Search-directory table for every unit.
    pub fn search_directories(&self) -> StaticSearchDirectories {
        let mut table = StaticSearchDirectories::new();
        for unit in &self.units {
            table.insert(&unit.name, self.search_directories_for(&unit.name));
        }
        table
    }

    /// True if `path` has one of the configured source extensions.
    pub fn is_source_path(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
    }

    /// Units owning `path`: listed explicitly, or a source under one of their roots.
    pub fn units_owning(&self, path: &Path) -> Vec<&UnitConfig> {
        let path = normalize_path(path);
        let folded = path.to_string_lossy().to_lowercase();
        let is_source = self.is_source_path(&path);
        self.units
            .iter()
            .filter(|unit| {
                unit.files
                    .iter()
                    .any(|f| f.to_string_lossy().to_lowercase() == folded)
                    || (is_source && unit.roots.iter().any(|root| path.starts_with(root)))
            })
            .collect()
    }

    /// Directories to watch for changes: every unit root, the parent
    /// directory of every explicit file, and every search directory. Headers
    /// appearing in or leaving a search directory change resolutions even when
    /// no unit owns them.
    pub fn watch_roots(&self) -> Vec<PathBuf> {
        let mut roots: Vec<PathBuf> = self
            .units
            .iter()
            .flat_map(|u| {
                u.roots
                    .iter()
                    .cloned()
                    .chain(u.files.iter().filter_map(|f| f.parent().map(Path::to_path_buf)))
                    .chain(u.include_dirs.iter().cloned())
                    .chain(u.public_include_dirs.iter().cloned())
            })
            .collect();
        roots.sort();
        roots.dedup();
        // Nested roots are covered by their ancestor's recursive watch.
        let all = roots.clone();
        roots.retain(|r| !all.iter().any(|other| other != r && r.starts_with(other)));
        roots
    }
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            log_filter: None,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            extensions: default_extensions(),
            units: Vec::new(),
        }
    }
}

fn absolute(dir: &Path) -> Result<PathBuf> {
    if dir.is_absolute() {
        return Ok(normalize_path(dir));
    }
    let cwd = std::env::current_dir().map_err(|e| IncScopeError::io(e, dir))?;
    Ok(normalize_path(&cwd.join(dir)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"
log_filter = "debug"

[[unit]]
name = "App"
roots = ["App"]
files = ["External/shared.h"]
include_dirs = ["App/include", "Common"]
references = ["Core"]

[[unit]]
name = "Core"
roots = ["Core"]
public_include_dirs = ["Core/api", "Common"]
references = ["Base"]

[[unit]]
name = "Base"
roots = ["Base", "Core/base"]
public_include_dirs = ["Base/api"]
references = ["App"]
"#;

    fn config() -> WorkspaceConfig {
        WorkspaceConfig::from_toml_str(MANIFEST, Path::new("/ws")).unwrap()
    }

    #[test]
    fn test_parse_and_absolutize() {
        let config = config();
        assert_eq!(config.root, PathBuf::from("/ws"));
        assert_eq!(config.log_filter.as_deref(), Some("debug"));
        assert_eq!(config.debounce_ms, 300);
        assert!(config.extensions.contains(&"hpp".to_string()));
        assert_eq!(config.units.len(), 3);

        let app = config.unit("app").unwrap();
        assert_eq!(app.roots, vec![PathBuf::from("/ws/App")]);
        assert_eq!(app.files, vec![PathBuf::from("/ws/External/shared.h")]);
    }

    #[test]
    fn test_search_directories_inherit_through_references() {
        let config = config();
        assert_eq!(
            config.search_directories_for("App"),
            vec![
                PathBuf::from("/ws/App/include"),
                PathBuf::from("/ws/Common"),
                PathBuf::from("/ws/Core/api"),
                PathBuf::from("/ws/Base/api"),
            ]
        );
        // Reference cycle back to App terminates and App exports nothing.
        assert_eq!(
            config.search_directories_for("Base"),
            vec![PathBuf::from("/ws/Core/api"), PathBuf::from("/ws/Common")]
        );
        assert!(config.search_directories_for("Nope").is_empty());
    }

    #[test]
    fn test_units_owning() {
        let config = config();
        let names = |p: &str| -> Vec<String> {
            config
                .units_owning(Path::new(p))
                .iter()
                .map(|u| u.name.clone())
                .collect()
        };
        assert_eq!(names("/ws/App/src/main.cpp"), vec!["App"]);
        assert_eq!(names("/ws/External/Shared.h"), vec!["App"]);
        assert_eq!(names("/ws/Core/base/x.h"), vec!["Core", "Base"]);
        assert!(names("/ws/App/readme.txt").is_empty());
        assert!(names("/elsewhere/a.cpp").is_empty());
    }

    #[test]
    fn test_watch_roots_collapse_nested() {
        let roots = config().watch_roots();
        assert_eq!(
            roots,
            vec![
                PathBuf::from("/ws/App"),
                PathBuf::from("/ws/Base"),
                PathBuf::from("/ws/Common"),
                PathBuf::from("/ws/Core"),
                PathBuf::from("/ws/External"),
            ]
        );
    }

    #[test]
    fn test_watch_roots_cover_search_dirs_outside_roots() {
        let text = r#"
[[unit]]
name = "App"
roots = ["App"]
include_dirs = ["ThirdParty/include"]
references = ["Lib"]

[[unit]]
name = "Lib"
roots = ["Lib/src"]
public_include_dirs = ["Lib/api"]
"#;
        let config = WorkspaceConfig::from_toml_str(text, Path::new("/ws")).unwrap();
        let roots = config.watch_roots();
        for dir in config.search_directories_for("App") {
            assert!(
                roots.iter().any(|root| dir.starts_with(root)),
                "search dir {} is not watched",
                dir.display()
            );
        }
        assert_eq!(
            roots,
            vec![
                PathBuf::from("/ws/App"),
                PathBuf::from("/ws/Lib/api"),
                PathBuf::from("/ws/Lib/src"),
                PathBuf::from("/ws/ThirdParty/include"),
            ]
        );
    }

    #[test]
    fn test_duplicate_unit_rejected() {
        let text = "[[unit]]\nname = \"A\"\n[[unit]]\nname = \"a\"\n";
        let err = WorkspaceConfig::from_toml_str(text, Path::new("/ws")).unwrap_err();
        assert!(matches!(err, IncScopeError::Config(_)));
    }

    #[test]
    fn test_unknown_reference_rejected() {
        let text = "[[unit]]\nname = \"A\"\nreferences = [\"Ghost\"]\n";
        let err = WorkspaceConfig::from_toml_str(text, Path::new("/ws")).unwrap_err();
        assert!(matches!(err, IncScopeError::UnknownUnit(_)));
    }

    #[test]
    fn test_malformed_toml() {
        let err = WorkspaceConfig::from_toml_str("[[unit]\nname=", Path::new("/ws")).unwrap_err();
        assert!(matches!(err, IncScopeError::Config(_)));
    }

    #[test]
    fn test_is_source_path() {
        let config = WorkspaceConfig::default();
        assert!(config.is_source_path(Path::new("a/B.CPP")));
        assert!(config.is_source_path(Path::new("x.inl")));
        assert!(!config.is_source_path(Path::new("Makefile")));
        assert!(!config.is_source_path(Path::new("notes.md")));
    }
}
