//! `#include` extraction via AST traversal.
//!
//! Every `preproc_include` node is collected in source order, including those
//! nested in `#if`/`#ifdef` blocks: no conditional is evaluated. Macro
//! includes (`#include CONFIG_HEADER`) have no literal target and are skipped.

use std::path::Path;
use tree_sitter::{Node, Parser};

use super::language::SourceKind;
use crate::error::{IncScopeError, Result};
use crate::graph::types::IncludeEntry;

/// Extract the raw includes of a C/C++ source file.
pub fn extract_includes(path: &Path, source: &str) -> Result<Vec<IncludeEntry>> {
    let kind = SourceKind::from_path(path)
        .ok_or_else(|| IncScopeError::UnsupportedLanguage(path.display().to_string()))?;

    let mut parser = Parser::new();
    parser
        .set_language(&kind.tree_sitter_language())
        .map_err(|e| IncScopeError::Parse(format!("{}: {}", path.display(), e)))?;

    let tree = parser
        .parse(source, None)
        .ok_or_else(|| IncScopeError::Parse(format!("{}: parser returned no tree", path.display())))?;

    let mut includes = Vec::new();
    collect_includes(&tree.root_node(), source.as_bytes(), &mut includes);
    Ok(includes)
}

/// Recursively walk the AST collecting include targets.
fn collect_includes(node: &Node, source: &[u8], out: &mut Vec<IncludeEntry>) {
    if node.kind() == "preproc_include" {
        if let Some(raw) = include_target(node, source) {
            out.push(IncludeEntry::new(raw));
        }
        return;
    }

    let count = node.child_count();
    for i in 0..count {
        if let Some(child) = node.child(i) {
            collect_includes(&child, source, out);
        }
    }
}

/// The target of an include directive with its delimiters stripped.
fn include_target(node: &Node, source: &[u8]) -> Option<String> {
    let path = node.child_by_field_name("path")?;
    let text = path.utf8_text(source).ok()?.trim();
    let inner = match path.kind() {
        "string_literal" => text.strip_prefix('"')?.strip_suffix('"')?,
        "system_lib_string" => text.strip_prefix('<')?.strip_suffix('>')?,
        _ => return None,
    };
    let inner = inner.trim();
    if inner.is_empty() {
        None
    } else {
        Some(inner.to_string())
    }
}
