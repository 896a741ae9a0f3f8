//! Source kind detection and tree-sitter grammar loading.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tree_sitter::Language;

/// Whether a C-family file is compiled on its own or only included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// A translation unit (`.c`, `.cpp`, ...).
    Implementation,
    /// A header or inline file (`.h`, `.hpp`, `.inl`, ...).
    Header,
}

impl SourceKind {
    /// Detect the kind from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "c" | "cc" | "cpp" | "cxx" | "c++" | "m" | "mm" => Some(SourceKind::Implementation),
            "h" | "hh" | "hpp" | "hxx" | "h++" | "inl" | "ipp" | "tpp" => Some(SourceKind::Header),
            _ => None,
        }
    }

    pub fn is_implementation(path: &Path) -> bool {
        Self::from_path(path) == Some(SourceKind::Implementation)
    }

    /// Grammar used to parse the file. C parses with the C++ grammar; the
    /// include directives are identical.
    pub fn tree_sitter_language(&self) -> Language {
        tree_sitter_cpp::LANGUAGE.into()
    }

    pub fn name(&self) -> &'static str {
        match self {
            SourceKind::Implementation => "implementation",
            SourceKind::Header => "header",
        }
    }
}
