//! File-level dependency graph.
//!
//! [`FileGraph`] holds one node per program file and one edge per resolved
//! import relationship. It is built once per session and only queried
//! afterwards, so queries can run concurrently.
//!
//! # Example
//!
//! ```rust
//! use std::path::Path;
//! use codelens::graph::FileGraph;
//! use codelens::program::Program;
//!
//! let program = Program::from_sources(
//!     "/app",
//!     vec![
//!         ("/app/main.ts", "import { run } from './run';\nrun();"),
//!         ("/app/run.ts", "import { log } from './log';\nexport function run() { log(); }"),
//!         ("/app/log.ts", "export function log() {}"),
//!     ],
//! );
//! let graph = FileGraph::build(&program);
//!
//! assert_eq!(graph.node_count(), 3);
//! assert!(!graph.has_cycles());
//! assert_eq!(graph.dependency_depth(Path::new("/app/main.ts")), 3);
//! ```

mod algorithms;
mod file_graph;

pub use algorithms::{CycleInfo, CycleSeverity, RelatedFile};
pub use file_graph::{EdgeRecord, FileGraph, FileNode, GraphSnapshot, ImportEdge, NodeKind};
