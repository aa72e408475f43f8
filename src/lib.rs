//! codelens - whole-program static analysis for JavaScript and TypeScript
//!
//! This crate parses a source tree with tree-sitter and answers three kinds
//! of questions about it: which declarations and imports are never used,
//! how complex or how internally related each file's code is, and how files
//! depend on one another through their imports (cycles, paths, neighbors).
//!
//! The entry point is [`session::AnalysisSession`], which owns one parsed
//! [`program::Program`] and everything derived from it.

pub mod analysis;
pub mod config;
pub mod error;
pub mod export;
pub mod graph;
pub mod program;
pub mod session;

pub use config::AnalysisConfig;
pub use error::{AnalysisError, AnalysisResult, Diagnostic, DiagnosticKind};
pub use session::{AnalysisReport, AnalysisSession};
