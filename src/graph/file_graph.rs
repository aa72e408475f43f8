//! File-level import graph.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use serde::Serialize;
use tracing::debug;

use crate::analysis::EntityKind;
use crate::program::{display_relative, ExportKind, Program, SourceFile};

/// Coarse classification of a file by what it declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeKind {
    /// Declares at least one UI component
    ComponentModule,
    /// Declares functions but no components
    FunctionModule,
    #[default]
    Module,
}

impl NodeKind {
    /// Classifies a parsed file; components take precedence over functions.
    pub fn of(file: &SourceFile) -> Self {
        if file.entities_of(EntityKind::Component).next().is_some() {
            Self::ComponentModule
        } else if file.entities_of(EntityKind::Function).next().is_some() {
            Self::FunctionModule
        } else {
            Self::Module
        }
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ComponentModule => write!(f, "component-module"),
            Self::FunctionModule => write!(f, "function-module"),
            Self::Module => write!(f, "module"),
        }
    }
}

/// A file in the import graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileNode {
    /// Absolute, normalized file path; snapshots key nodes by the relative form
    #[serde(skip)]
    pub path: PathBuf,
    pub kind: NodeKind,
    /// Exported names, in source order
    pub exports: Vec<String>,
    /// Module specifiers the file imports, in source order
    pub imports: Vec<String>,
}

impl FileNode {
    pub fn new(path: impl Into<PathBuf>, kind: NodeKind) -> Self {
        Self {
            path: path.into(),
            kind,
            exports: Vec::new(),
            imports: Vec::new(),
        }
    }

    fn from_source(file: &SourceFile) -> Self {
        let mut imports: Vec<String> = Vec::new();
        for import in &file.imports {
            if !imports.contains(&import.source) {
                imports.push(import.source.clone());
            }
        }
        Self {
            path: file.path.clone(),
            kind: NodeKind::of(file),
            exports: file
                .exports
                .iter()
                .filter(|e| e.kind != ExportKind::Reexport || e.name != "*")
                .map(|e| e.name.clone())
                .collect(),
            imports,
        }
    }
}

/// Names one file pulls from another.
///
/// All imports and re-exports between the same pair of files are merged
/// into one edge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportEdge {
    /// `default`, `*` or the imported export names, deduplicated
    pub symbols: Vec<String>,
}

impl ImportEdge {
    pub fn new(symbols: Vec<String>) -> Self {
        let mut edge = Self::default();
        edge.merge(symbols);
        edge
    }

    fn merge(&mut self, symbols: impl IntoIterator<Item = String>) {
        for symbol in symbols {
            if !self.symbols.contains(&symbol) {
                self.symbols.push(symbol);
            }
        }
    }
}

/// Serializable view of an edge, with root-relative endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EdgeRecord {
    pub from: String,
    pub to: String,
    pub symbols: Vec<String>,
}

/// Serializable view of the whole graph.
///
/// Node keys and edge endpoints are root-relative paths with `/`
/// separators; both are sorted, so equal graphs give equal snapshots.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GraphSnapshot {
    pub nodes: BTreeMap<String, FileNode>,
    pub edges: Vec<EdgeRecord>,
}

/// Directed graph of program files; an edge points from the importing file
/// to the file it imports.
///
/// Only specifiers that resolve to a program file produce edges. Package
/// imports and unresolved paths are dropped silently.
///
/// # Example
///
/// ```rust
/// use codelens::graph::FileGraph;
/// use codelens::program::Program;
///
/// let program = Program::from_sources(
///     "/app",
///     vec![
///         ("/app/a.ts", "import { b } from './b';\nimport React from 'react';"),
///         ("/app/b.ts", "export const b = 1;"),
///     ],
/// );
/// let graph = FileGraph::build(&program);
///
/// assert_eq!(graph.node_count(), 2);
/// assert_eq!(graph.edge_count(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct FileGraph {
    pub(super) graph: DiGraph<FileNode, ImportEdge>,
    /// Maps file paths to their node indices for O(1) lookup
    pub(super) node_indices: HashMap<PathBuf, NodeIndex>,
    pub(super) root: PathBuf,
}

impl FileGraph {
    /// Creates an empty graph for files under `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_capacity(root, 0, 0)
    }

    /// Creates an empty graph with pre-allocated capacity.
    pub fn with_capacity(root: impl Into<PathBuf>, nodes: usize, edges: usize) -> Self {
        Self {
            graph: DiGraph::with_capacity(nodes, edges),
            node_indices: HashMap::with_capacity(nodes),
            root: root.into(),
        }
    }

    /// Builds the import graph of a program.
    ///
    /// Nodes are added in path order, so node indices follow path order.
    /// ES6 imports, `require` calls, dynamic `import()` and re-exports all
    /// produce edges.
    pub fn build(program: &Program) -> Self {
        let mut graph = Self::with_capacity(program.root(), program.len(), program.len() * 4);
        for file in program.files() {
            graph.add_file(FileNode::from_source(file));
        }

        for file in program.files() {
            // target -> symbols, ordered by target for stable edge order
            let mut targets: BTreeMap<&Path, Vec<String>> = BTreeMap::new();
            for import in &file.imports {
                if let Some(target) = program.resolve_import(&file.path, &import.source) {
                    targets
                        .entry(target)
                        .or_default()
                        .extend(import.symbol_names());
                }
            }
            for export in &file.exports {
                let Some(source) = export.source.as_deref() else {
                    continue;
                };
                if let Some(target) = program.resolve_import(&file.path, source) {
                    targets.entry(target).or_default().push(export.name.clone());
                }
            }

            for (target, symbols) in targets {
                graph.add_edge(&file.path, target, symbols);
            }
        }

        debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "built file graph"
        );
        graph
    }

    /// Adds a file node, returning the existing index if the path is known.
    pub fn add_file(&mut self, node: FileNode) -> NodeIndex {
        if let Some(&idx) = self.node_indices.get(&node.path) {
            return idx;
        }
        let path = node.path.clone();
        let idx = self.graph.add_node(node);
        self.node_indices.insert(path, idx);
        idx
    }

    /// Adds an edge `from -> to`, merging symbols into an existing edge.
    ///
    /// Returns false if either file is not in the graph.
    pub fn add_edge(&mut self, from: &Path, to: &Path, symbols: Vec<String>) -> bool {
        let (Some(&a), Some(&b)) = (self.node_indices.get(from), self.node_indices.get(to)) else {
            return false;
        };
        match self.graph.find_edge(a, b) {
            Some(edge) => {
                if let Some(weight) = self.graph.edge_weight_mut(edge) {
                    weight.merge(symbols);
                }
            }
            None => {
                self.graph.add_edge(a, b, ImportEdge::new(symbols));
            }
        }
        true
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn node(&self, path: &Path) -> Option<&FileNode> {
        self.node_indices
            .get(path)
            .and_then(|&idx| self.graph.node_weight(idx))
    }

    /// The edge `from -> to`, if the first file imports the second.
    pub fn edge(&self, from: &Path, to: &Path) -> Option<&ImportEdge> {
        let a = *self.node_indices.get(from)?;
        let b = *self.node_indices.get(to)?;
        self.graph
            .find_edge(a, b)
            .and_then(|e| self.graph.edge_weight(e))
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.node_indices.contains_key(path)
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// All nodes in index (path) order.
    pub fn nodes(&self) -> impl Iterator<Item = &FileNode> {
        self.graph.node_weights()
    }

    /// Root-relative display form of a path.
    pub fn display_path(&self, path: &Path) -> String {
        display_relative(&self.root, path)
    }

    /// Serializable snapshot with sorted nodes and edges.
    pub fn snapshot(&self) -> GraphSnapshot {
        let nodes = self
            .graph
            .node_weights()
            .map(|node| (self.display_path(&node.path), node.clone()))
            .collect();

        let mut edges: Vec<EdgeRecord> = self
            .graph
            .edge_references()
            .map(|edge| EdgeRecord {
                from: self.display_path(&self.graph[edge.source()].path),
                to: self.display_path(&self.graph[edge.target()].path),
                symbols: edge.weight().symbols.clone(),
            })
            .collect();
        edges.sort_by(|a, b| (&a.from, &a.to).cmp(&(&b.from, &b.to)));

        GraphSnapshot { nodes, edges }
    }

    pub(super) fn index_of(&self, path: &Path) -> Option<NodeIndex> {
        self.node_indices.get(path).copied()
    }

    pub(super) fn path_of(&self, idx: NodeIndex) -> &Path {
        &self.graph[idx].path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn program(sources: Vec<(&str, &str)>) -> Program {
        Program::from_sources("/app", sources)
    }

    #[test]
    fn test_create_empty_graph() {
        let graph = FileGraph::new("/app");
        assert!(graph.is_empty());
        assert_eq!(graph.edge_count(), 0);
        assert_eq!(graph.snapshot(), GraphSnapshot::default());
    }

    #[test]
    fn test_build_resolves_local_imports_only() {
        let program = program(vec![
            (
                "/app/src/main.ts",
                "import { helper } from './util';\nimport lodash from 'lodash';\nimport { gone } from './missing';",
            ),
            ("/app/src/util.ts", "export function helper() {}"),
        ]);
        let graph = FileGraph::build(&program);

        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 1);
        let edge = graph
            .edge(Path::new("/app/src/main.ts"), Path::new("/app/src/util.ts"))
            .unwrap();
        assert_eq!(edge.symbols, vec!["helper"]);
    }

    #[test]
    fn test_imports_to_same_target_merge() {
        let program = program(vec![
            (
                "/app/a.js",
                "import def, { x } from './b';\nconst b = require('./b');\nimport('./b');\nexport { y } from './b';",
            ),
            ("/app/b.js", "export const x = 1;\nexport const y = 2;\nexport default x;"),
        ]);
        let graph = FileGraph::build(&program);

        assert_eq!(graph.edge_count(), 1);
        let edge = graph
            .edge(Path::new("/app/a.js"), Path::new("/app/b.js"))
            .unwrap();
        assert_eq!(edge.symbols, vec!["default", "x", "*", "y"]);
    }

    #[test]
    fn test_node_kinds() {
        let program = program(vec![
            ("/app/Button.jsx", "export const Button = () => <button />;"),
            ("/app/math.js", "export function add(a, b) { return a + b; }"),
            ("/app/consts.js", "export const PI = 3.14;"),
        ]);
        let graph = FileGraph::build(&program);

        let kind = |p: &str| graph.node(Path::new(p)).unwrap().kind;
        assert_eq!(kind("/app/Button.jsx"), NodeKind::ComponentModule);
        assert_eq!(kind("/app/math.js"), NodeKind::FunctionModule);
        assert_eq!(kind("/app/consts.js"), NodeKind::Module);
        assert_eq!(NodeKind::ComponentModule.to_string(), "component-module");
    }

    #[test]
    fn test_snapshot_is_sorted_and_relative() {
        let program = program(vec![
            ("/app/src/z.ts", "import { a } from './a';"),
            ("/app/src/b.ts", "import { a } from './a';"),
            ("/app/src/a.ts", "export const a = 1;"),
        ]);
        let snapshot = FileGraph::build(&program).snapshot();

        let keys: Vec<&str> = snapshot.nodes.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["src/a.ts", "src/b.ts", "src/z.ts"]);
        let edges: Vec<(&str, &str)> = snapshot
            .edges
            .iter()
            .map(|e| (e.from.as_str(), e.to.as_str()))
            .collect();
        assert_eq!(edges, vec![("src/b.ts", "src/a.ts"), ("src/z.ts", "src/a.ts")]);
        assert_eq!(snapshot.nodes["src/a.ts"].exports, vec!["a"]);
    }

    #[test]
    fn test_add_edge_requires_known_nodes() {
        let mut graph = FileGraph::new("/app");
        graph.add_file(FileNode::new("/app/a.ts", NodeKind::Module));
        assert!(!graph.add_edge(Path::new("/app/a.ts"), Path::new("/app/b.ts"), vec![]));

        graph.add_file(FileNode::new("/app/b.ts", NodeKind::Module));
        assert!(graph.add_edge(Path::new("/app/a.ts"), Path::new("/app/b.ts"), vec![]));
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn test_add_file_is_idempotent() {
        let mut graph = FileGraph::new("/app");
        let first = graph.add_file(FileNode::new("/app/a.ts", NodeKind::Module));
        let second = graph.add_file(FileNode::new("/app/a.ts", NodeKind::FunctionModule));
        assert_eq!(first, second);
        assert_eq!(graph.node_count(), 1);
    }
}
