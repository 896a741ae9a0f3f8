//! Include extraction from C/C++ sources.
//!
//! Parses files with tree-sitter and returns the raw `#include` targets in
//! source order. Nothing is resolved here.

pub mod includes;
pub mod language;

pub use includes::extract_includes;
pub use language::SourceKind;

use std::fs;
use std::path::Path;

use crate::error::{IncScopeError, Result};
use crate::graph::types::IncludeEntry;

/// Read `path` from disk and extract its includes.
pub fn read_includes(path: &Path) -> Result<Vec<IncludeEntry>> {
    let bytes = fs::read(path).map_err(|e| IncScopeError::io(e, path))?;
    let source = String::from_utf8_lossy(&bytes);
    extract_includes(path, &source)
}
