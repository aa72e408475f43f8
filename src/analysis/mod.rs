//! Whole-program analyses over a parsed [`Program`](crate::program::Program).
//!
//! Every detector here is read-only: it takes the program (and, where it
//! needs cross-file information, the [`UsageIndex`]) and returns plain
//! records. The [`AnalysisSession`](crate::session::AnalysisSession) runs
//! them and assembles the report.
//!
//! # Detectors
//!
//! - Unused imports, functions and components
//! - Dead code (unused classes and constants)
//! - Cyclomatic complexity warnings
//! - Mixed-logic files (disconnected entity clusters)
//! - Split entities (same-prefix families scattered across files)
//!
//! # Example
//!
//! ```rust
//! use codelens::analysis::{detect_unused_imports, UsageIndex};
//! use codelens::program::Program;
//!
//! let program = Program::from_sources(
//!     "/app",
//!     vec![("/app/a.ts", "import { used, unused } from './m';\nused();")],
//! );
//! let file = program.files().next().unwrap();
//! let unused = detect_unused_imports(file);
//! assert_eq!(unused.len(), 1);
//! assert_eq!(unused[0].name, "unused");
//!
//! let index = UsageIndex::build(&program);
//! assert!(index.files_for("used").is_some());
//! ```

pub mod clusters;
pub mod complexity;
pub mod entities;
pub mod split;
pub mod unused;
pub mod usage;

pub use clusters::{detect_mixed_logic, suggested_file_name, LogicCluster, MixedLogicFile};
pub use complexity::calculate_complexity;
pub use entities::{extract_entities, Entity, EntityKind};
pub use split::{capitalized_prefix, detect_split_entities, SplitEntity};
pub use unused::{
    detect_complexity_warnings, detect_dead_code, detect_duplicate_declarations,
    detect_unused_components, detect_unused_functions, detect_unused_imports, ComplexityWarning,
    DeadCode, UnusedComponent, UnusedFunction, UnusedImport,
};
pub use usage::UsageIndex;
