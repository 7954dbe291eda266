//! Library error types.

use std::path::PathBuf;
use thiserror::Error;

/// Failure inside a single detector. The runner records it as an
/// `AnalysisError` and moves on to the next detector.
#[derive(Debug, Error)]
pub enum DetectorError {
    #[error("invalid guard pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("{0}")]
    Internal(String),
}

/// Failure that prevents a file from being analyzed at all.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("failed to load Rust grammar: {0}")]
    Grammar(#[from] tree_sitter::LanguageError),

    #[error("parser produced no tree for the source")]
    Parse,

    #[error("could not read '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("path does not exist: '{0}'")]
    MissingPath(PathBuf),
}
