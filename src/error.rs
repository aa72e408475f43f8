//! Error types shared across the analysis pipeline.
//!
//! Setup problems (bad root, bad glob, bad thresholds) abort a run before any
//! file is parsed. Everything that goes wrong with a single file is carried as
//! a [`Diagnostic`] instead, so one broken file never fails the whole run.

use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

/// Errors that can occur while setting up or running an analysis.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Root directory does not exist or is not a directory: {}", .0.display())]
    InvalidRoot(PathBuf),

    #[error("Invalid glob pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("Failed to read file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    ConfigParse(#[from] serde_json::Error),

    #[error("Failed to parse file: {path}")]
    Parse { path: String },

    #[error("Parsing timed out after {timeout_ms}ms: {path}")]
    ParseTimeout { path: String, timeout_ms: u64 },

    #[error("File is too large ({size} bytes, limit {limit}): {path}")]
    FileTooLarge { path: String, size: u64, limit: u64 },

    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    #[error("Tree-sitter language initialization failed")]
    LanguageInit,
}

/// Result type for analysis operations.
pub type AnalysisResult<T> = Result<T, AnalysisError>;

/// Category of a per-item problem recorded during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DiagnosticKind {
    /// The file could not be read or parsed and was left out of the program.
    ParseFailure,
    /// An analysis step panicked; only that file or algorithm is affected.
    InternalInvariantViolation,
    /// A file declares the same top-level name more than once.
    DuplicateDeclaration,
}

impl std::fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ParseFailure => write!(f, "parse failure"),
            Self::InternalInvariantViolation => write!(f, "internal error"),
            Self::DuplicateDeclaration => write!(f, "duplicate declaration"),
        }
    }
}

/// A problem attached to one file (or to one graph algorithm) that did not
/// stop the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
    pub kind: DiagnosticKind,
    pub message: String,
}

impl Diagnostic {
    pub fn parse_failure(file: &Path, error: &AnalysisError) -> Self {
        Self {
            file: Some(file.to_path_buf()),
            kind: DiagnosticKind::ParseFailure,
            message: error.to_string(),
        }
    }

    pub fn internal(file: Option<&Path>, message: impl Into<String>) -> Self {
        Self {
            file: file.map(Path::to_path_buf),
            kind: DiagnosticKind::InternalInvariantViolation,
            message: message.into(),
        }
    }

    pub fn duplicate_declaration(file: &Path, name: &str, lines: &[usize]) -> Self {
        let lines: Vec<String> = lines.iter().map(|l| l.to_string()).collect();
        Self {
            file: Some(file.to_path_buf()),
            kind: DiagnosticKind::DuplicateDeclaration,
            message: format!(
                "'{}' is declared {} times (lines {}); usage is not attributed to any single declaration",
                name,
                lines.len(),
                lines.join(", ")
            ),
        }
    }
}
