//! Error types for incscope.
//!
//! Only the outer surfaces fail: reading configuration and sources, parsing,
//! and watching. Graph lookups and mutations never return errors.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IncScopeError {
    #[error("I/O error: {source} (path: {path})")]
    Io {
        source: std::io::Error,
        path: PathBuf,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Unknown build unit: {0}")]
    UnknownUnit(String),

    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("File watcher error: {0}")]
    Watch(#[from] notify::Error),
}

pub type Result<T> = std::result::Result<T, IncScopeError>;

impl IncScopeError {
    /// Wrap an I/O error together with the path that caused it.
    pub fn io(source: std::io::Error, path: impl Into<PathBuf>) -> Self {
        IncScopeError::Io {
            source,
            path: path.into(),
        }
    }
}

impl From<toml::de::Error> for IncScopeError {
    fn from(e: toml::de::Error) -> Self {
        IncScopeError::Config(e.to_string())
    }
}
