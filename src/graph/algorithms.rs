//! Read-only queries over a built [`FileGraph`].
//!
//! Every traversal here is iterative with an explicit stack or queue, so
//! deep import chains cannot overflow the call stack. Neighbors are always
//! visited in node-index (path) order, which keeps results deterministic.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};

use petgraph::algo::{is_cyclic_directed, tarjan_scc};
use petgraph::graph::NodeIndex;
use petgraph::Direction;
use serde::Serialize;

use super::file_graph::FileGraph;

/// How urgent a cycle is, by the number of files it spans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum CycleSeverity {
    /// Two files or fewer: a direct mutual import
    High,
    /// Three or four files
    Medium,
    Low,
}

impl CycleSeverity {
    pub fn for_length(len: usize) -> Self {
        match len {
            0..=2 => Self::High,
            3..=4 => Self::Medium,
            _ => Self::Low,
        }
    }
}

impl std::fmt::Display for CycleSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::High => write!(f, "high"),
            Self::Medium => write!(f, "medium"),
            Self::Low => write!(f, "low"),
        }
    }
}

/// Information about a detected circular import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleInfo {
    /// Root-relative file paths in the cycle (the last imports the first)
    pub nodes: Vec<String>,
    pub severity: CycleSeverity,
}

impl CycleInfo {
    fn new(nodes: Vec<String>) -> Self {
        let severity = CycleSeverity::for_length(nodes.len());
        Self { nodes, severity }
    }

    /// Returns a formatted string representation of the cycle path.
    ///
    /// For example: "a.ts -> b.ts -> a.ts"
    pub fn cycle_path(&self) -> String {
        match self.nodes.first() {
            Some(first) => format!("{} -> {}", self.nodes.join(" -> "), first),
            None => String::new(),
        }
    }

    /// Returns the number of files in the cycle.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// A file that shares direct imports with another file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelatedFile {
    pub path: PathBuf,
    /// Import targets both files share, in path order
    pub shared: Vec<PathBuf>,
}

impl RelatedFile {
    pub fn shared_count(&self) -> usize {
        self.shared.len()
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

impl FileGraph {
    /// Returns true if any import chain loops back on itself.
    pub fn has_cycles(&self) -> bool {
        is_cyclic_directed(&self.graph)
    }

    /// Finds cycles with a colored depth-first search.
    ///
    /// Each back-edge (an edge onto a file still on the DFS stack) yields
    /// one cycle: the stack segment from that file to the current one.
    /// Start nodes and neighbors are taken in path order.
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
    ///         ("/app/a.ts", "import { b } from './b';\nexport const a = 1;"),
    ///         ("/app/b.ts", "import { a } from './a';\nexport const b = 2;"),
    ///     ],
    /// );
    /// let cycles = FileGraph::build(&program).detect_cycles();
    /// assert_eq!(cycles.len(), 1);
    /// assert_eq!(cycles[0].cycle_path(), "a.ts -> b.ts -> a.ts");
    /// ```
    pub fn detect_cycles(&self) -> Vec<CycleInfo> {
        let mut colors = vec![Color::White; self.graph.node_count()];
        let mut cycles = Vec::new();

        for start in self.graph.node_indices() {
            if colors[start.index()] != Color::White {
                continue;
            }

            // (node, sorted successors, next successor position)
            let mut stack: Vec<(NodeIndex, Vec<NodeIndex>, usize)> = Vec::new();
            colors[start.index()] = Color::Gray;
            stack.push((start, self.sorted_neighbors(start, Direction::Outgoing), 0));

            while let Some((node, successors, pos)) = stack.last_mut() {
                let Some(&next) = successors.get(*pos) else {
                    colors[node.index()] = Color::Black;
                    stack.pop();
                    continue;
                };
                *pos += 1;

                match colors[next.index()] {
                    Color::White => {
                        colors[next.index()] = Color::Gray;
                        let successors = self.sorted_neighbors(next, Direction::Outgoing);
                        stack.push((next, successors, 0));
                    }
                    Color::Gray => {
                        let from = stack
                            .iter()
                            .position(|(n, _, _)| *n == next)
                            .unwrap_or(0);
                        let nodes = stack[from..]
                            .iter()
                            .map(|(n, _, _)| self.display_path(self.path_of(*n)))
                            .collect();
                        cycles.push(CycleInfo::new(nodes));
                    }
                    Color::Black => {}
                }
            }
        }

        cycles
    }

    /// Files that belong to a strongly connected component with a loop.
    pub fn nodes_in_cycles(&self) -> BTreeSet<PathBuf> {
        let mut members = BTreeSet::new();
        for scc in tarjan_scc(&self.graph) {
            let looping = scc.len() > 1 || self.graph.contains_edge(scc[0], scc[0]);
            if looping {
                members.extend(scc.iter().map(|&idx| self.path_of(idx).to_path_buf()));
            }
        }
        members
    }

    /// Files `file` imports, directly or transitively.
    ///
    /// `max_depth` bounds the walk (`Some(1)` gives direct imports only).
    /// The start file is never included. Unknown files have no dependencies.
    pub fn dependencies_of(&self, file: &Path, max_depth: Option<usize>) -> Vec<PathBuf> {
        self.reachable(file, max_depth, Direction::Outgoing)
    }

    /// Files that import `file`, directly or transitively.
    pub fn dependents_of(&self, file: &Path, max_depth: Option<usize>) -> Vec<PathBuf> {
        self.reachable(file, max_depth, Direction::Incoming)
    }

    /// Shortest import chain from `from` to `to`, by edge count.
    ///
    /// Returns `None` when `to` is unreachable or either file is unknown.
    ///
    /// # Example
    ///
    /// ```rust
    /// use std::path::Path;
    /// use codelens::graph::FileGraph;
    /// use codelens::program::Program;
    ///
    /// let program = Program::from_sources(
    ///     "/app",
    ///     vec![
    ///         ("/app/a.ts", "import './b';"),
    ///         ("/app/b.ts", "import './c';"),
    ///         ("/app/c.ts", ""),
    ///     ],
    /// );
    /// let graph = FileGraph::build(&program);
    /// let path = graph.find_path(Path::new("/app/a.ts"), Path::new("/app/c.ts")).unwrap();
    /// assert_eq!(path.len(), 3);
    /// assert!(graph.find_path(Path::new("/app/c.ts"), Path::new("/app/a.ts")).is_none());
    /// ```
    pub fn find_path(&self, from: &Path, to: &Path) -> Option<Vec<PathBuf>> {
        let start = self.index_of(from)?;
        let goal = self.index_of(to)?;

        let mut previous: HashMap<NodeIndex, NodeIndex> = HashMap::new();
        let mut seen: HashSet<NodeIndex> = HashSet::from([start]);
        let mut queue = VecDeque::from([start]);

        while let Some(node) = queue.pop_front() {
            if node == goal {
                let mut chain = vec![node];
                let mut current = node;
                while let Some(&prev) = previous.get(&current) {
                    chain.push(prev);
                    current = prev;
                }
                chain.reverse();
                return Some(chain.into_iter().map(|n| self.path_of(n).to_path_buf()).collect());
            }
            for next in self.sorted_neighbors(node, Direction::Outgoing) {
                if seen.insert(next) {
                    previous.insert(next, node);
                    queue.push_back(next);
                }
            }
        }

        None
    }

    /// Length of the longest import chain starting at `file`, counted in files.
    ///
    /// A file with no imports has depth 1. Revisiting a file already on the
    /// current chain contributes 0, so cycles terminate the chain. Unknown
    /// files have depth 0.
    pub fn dependency_depth(&self, file: &Path) -> usize {
        match self.index_of(file) {
            Some(idx) => self.depth_from(idx, &mut HashMap::new()),
            None => 0,
        }
    }

    /// The file with the longest import chain, first in path order on ties.
    pub fn deepest_chain(&self) -> Option<(PathBuf, usize)> {
        let mut memo = HashMap::new();
        let mut best: Option<(NodeIndex, usize)> = None;
        for idx in self.graph.node_indices() {
            let depth = self.depth_from(idx, &mut memo);
            if best.map_or(true, |(_, d)| depth > d) {
                best = Some((idx, depth));
            }
        }
        best.map(|(idx, depth)| (self.path_of(idx).to_path_buf(), depth))
    }

    /// Files that share at least `min_shared` direct import targets with `file`.
    ///
    /// Sorted by shared count (descending), then by path.
    pub fn related_files(&self, file: &Path, min_shared: usize) -> Vec<RelatedFile> {
        let Some(idx) = self.index_of(file) else {
            return Vec::new();
        };
        let targets: BTreeSet<NodeIndex> =
            self.graph.neighbors_directed(idx, Direction::Outgoing).collect();

        let mut related: Vec<RelatedFile> = self
            .graph
            .node_indices()
            .filter(|&other| other != idx)
            .filter_map(|other| {
                let shared: Vec<PathBuf> = self
                    .sorted_neighbors(other, Direction::Outgoing)
                    .into_iter()
                    .filter(|t| targets.contains(t))
                    .map(|t| self.path_of(t).to_path_buf())
                    .collect();
                (shared.len() >= min_shared.max(1)).then(|| RelatedFile {
                    path: self.path_of(other).to_path_buf(),
                    shared,
                })
            })
            .collect();

        related.sort_by(|a, b| {
            b.shared_count()
                .cmp(&a.shared_count())
                .then_with(|| a.path.cmp(&b.path))
        });
        related
    }

    /// Files with no incoming or outgoing edges.
    pub fn orphans(&self) -> Vec<PathBuf> {
        self.graph
            .node_indices()
            .filter(|&idx| self.graph.neighbors_undirected(idx).next().is_none())
            .map(|idx| self.path_of(idx).to_path_buf())
            .collect()
    }

    /// The `limit` most-imported files with their importer counts.
    ///
    /// Files nobody imports are left out. Ties break by path.
    pub fn most_depended_on(&self, limit: usize) -> Vec<(PathBuf, usize)> {
        let mut counts: Vec<(NodeIndex, usize)> = self
            .graph
            .node_indices()
            .map(|idx| (idx, self.graph.neighbors_directed(idx, Direction::Incoming).count()))
            .filter(|&(_, count)| count > 0)
            .collect();
        // Indices follow path order, so a stable sort keeps path order on ties.
        counts.sort_by(|a, b| b.1.cmp(&a.1));
        counts
            .into_iter()
            .take(limit)
            .map(|(idx, count)| (self.path_of(idx).to_path_buf(), count))
            .collect()
    }

    fn sorted_neighbors(&self, idx: NodeIndex, direction: Direction) -> Vec<NodeIndex> {
        let mut neighbors: Vec<NodeIndex> = self.graph.neighbors_directed(idx, direction).collect();
        neighbors.sort_unstable();
        neighbors.dedup();
        neighbors
    }

    fn reachable(&self, file: &Path, max_depth: Option<usize>, direction: Direction) -> Vec<PathBuf> {
        let Some(start) = self.index_of(file) else {
            return Vec::new();
        };
        let limit = max_depth.unwrap_or(usize::MAX);

        let mut visited: HashSet<NodeIndex> = HashSet::from([start]);
        let mut found = Vec::new();
        let mut stack = vec![(start, 0usize)];

        while let Some((node, depth)) = stack.pop() {
            if depth >= limit {
                continue;
            }
            // Reverse so the smallest index is popped first.
            for next in self.sorted_neighbors(node, direction).into_iter().rev() {
                if visited.insert(next) {
                    found.push(self.path_of(next).to_path_buf());
                    stack.push((next, depth + 1));
                }
            }
        }

        found
    }

    /// Longest chain from `start`, iterative.
    ///
    /// `memo` only holds depths of subtrees that never hit the current
    /// chain; those depths do not depend on how the node was reached.
    fn depth_from(&self, start: NodeIndex, memo: &mut HashMap<NodeIndex, usize>) -> usize {
        if let Some(&depth) = memo.get(&start) {
            return depth;
        }

        struct Frame {
            node: NodeIndex,
            children: Vec<NodeIndex>,
            pos: usize,
            best: usize,
            cut: bool,
        }

        let mut on_path: HashSet<NodeIndex> = HashSet::from([start]);
        let mut stack = vec![Frame {
            node: start,
            children: self.sorted_neighbors(start, Direction::Outgoing),
            pos: 0,
            best: 0,
            cut: false,
        }];

        loop {
            let Some(frame) = stack.last_mut() else {
                return 0;
            };

            if let Some(&child) = frame.children.get(frame.pos) {
                frame.pos += 1;
                if on_path.contains(&child) {
                    frame.cut = true;
                } else if let Some(&depth) = memo.get(&child) {
                    frame.best = frame.best.max(depth);
                } else {
                    on_path.insert(child);
                    stack.push(Frame {
                        node: child,
                        children: self.sorted_neighbors(child, Direction::Outgoing),
                        pos: 0,
                        best: 0,
                        cut: false,
                    });
                }
                continue;
            }

            let depth = 1 + frame.best;
            let (node, cut) = (frame.node, frame.cut);
            stack.pop();
            on_path.remove(&node);
            if !cut {
                memo.insert(node, depth);
            }

            match stack.last_mut() {
                Some(parent) => {
                    parent.best = parent.best.max(depth);
                    parent.cut |= cut;
                }
                None => return depth,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{FileNode, NodeKind};

    /// Graph over `/app/<name>.ts` files with the given edges.
    fn graph_of(names: &[&str], edges: &[(&str, &str)]) -> FileGraph {
        let mut graph = FileGraph::new("/app");
        for name in names {
            graph.add_file(FileNode::new(format!("/app/{}.ts", name), NodeKind::Module));
        }
        for (from, to) in edges {
            graph.add_edge(&file(from), &file(to), vec![]);
        }
        graph
    }

    fn file(name: &str) -> PathBuf {
        PathBuf::from(format!("/app/{}.ts", name))
    }

    fn files(names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(|n| file(n)).collect()
    }

    #[test]
    fn test_mutual_import_is_a_cycle() {
        let graph = graph_of(&["a", "b"], &[("a", "b"), ("b", "a")]);

        assert!(graph.has_cycles());
        let cycles = graph.detect_cycles();
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].nodes, vec!["a.ts", "b.ts"]);
        assert_eq!(cycles[0].severity, CycleSeverity::High);
        let expected: BTreeSet<PathBuf> = files(&["a", "b"]).into_iter().collect();
        assert_eq!(graph.nodes_in_cycles(), expected);
    }

    #[test]
    fn test_dag_has_no_cycles() {
        let graph = graph_of(
            &["a", "b", "c", "d"],
            &[("a", "b"), ("a", "c"), ("b", "d"), ("c", "d")],
        );
        assert!(!graph.has_cycles());
        assert!(graph.detect_cycles().is_empty());
        assert!(graph.nodes_in_cycles().is_empty());
    }

    #[test]
    fn test_self_import_is_a_cycle() {
        let graph = graph_of(&["a"], &[("a", "a")]);
        let cycles = graph.detect_cycles();
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].cycle_path(), "a.ts -> a.ts");
        assert!(graph.nodes_in_cycles().contains(&file("a")));
    }

    #[test]
    fn test_long_cycle_severity() {
        let graph = graph_of(
            &["a", "b", "c", "d", "e"],
            &[("a", "b"), ("b", "c"), ("c", "d"), ("d", "e"), ("e", "a")],
        );
        let cycles = graph.detect_cycles();
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].len(), 5);
        assert_eq!(cycles[0].severity, CycleSeverity::Low);
        assert_eq!(CycleSeverity::for_length(3), CycleSeverity::Medium);
        assert_eq!(CycleSeverity::for_length(4), CycleSeverity::Medium);
    }

    #[test]
    fn test_find_path_on_chain() {
        let graph = graph_of(
            &["a", "b", "c", "d"],
            &[("a", "b"), ("b", "c"), ("c", "d")],
        );
        assert_eq!(
            graph.find_path(&file("a"), &file("d")),
            Some(files(&["a", "b", "c", "d"]))
        );
        assert_eq!(graph.find_path(&file("d"), &file("a")), None);
        assert_eq!(graph.find_path(&file("b"), &file("b")), Some(files(&["b"])));
        assert_eq!(graph.find_path(&file("a"), &file("nope")), None);
    }

    #[test]
    fn test_find_path_prefers_shortest() {
        let graph = graph_of(
            &["a", "b", "c", "d"],
            &[("a", "b"), ("b", "c"), ("c", "d"), ("a", "d")],
        );
        assert_eq!(graph.find_path(&file("a"), &file("d")), Some(files(&["a", "d"])));
    }

    #[test]
    fn test_dependencies_and_dependents() {
        let graph = graph_of(
            &["a", "b", "c", "d"],
            &[("a", "b"), ("b", "c"), ("c", "d")],
        );

        assert_eq!(graph.dependencies_of(&file("a"), None), files(&["b", "c", "d"]));
        assert_eq!(graph.dependencies_of(&file("a"), Some(1)), files(&["b"]));
        assert_eq!(graph.dependencies_of(&file("a"), Some(2)), files(&["b", "c"]));
        assert_eq!(graph.dependents_of(&file("d"), None), files(&["c", "b", "a"]));
        assert!(graph.dependents_of(&file("a"), None).is_empty());
        assert!(graph.dependencies_of(&file("missing"), None).is_empty());
    }

    #[test]
    fn test_traversal_terminates_on_cycles() {
        let graph = graph_of(&["a", "b", "c"], &[("a", "b"), ("b", "c"), ("c", "a")]);
        assert_eq!(graph.dependencies_of(&file("a"), None), files(&["b", "c"]));
    }

    #[test]
    fn test_dependency_depth() {
        let graph = graph_of(
            &["a", "b", "c", "d", "e"],
            &[("a", "b"), ("b", "c"), ("a", "d"), ("e", "e")],
        );
        assert_eq!(graph.dependency_depth(&file("a")), 3);
        assert_eq!(graph.dependency_depth(&file("c")), 1);
        assert_eq!(graph.dependency_depth(&file("e")), 1);
        assert_eq!(graph.dependency_depth(&file("missing")), 0);
        assert_eq!(graph.deepest_chain(), Some((file("a"), 3)));
    }

    #[test]
    fn test_depth_with_cycle_is_finite() {
        let graph = graph_of(&["a", "b", "c"], &[("a", "b"), ("b", "c"), ("c", "a")]);
        assert_eq!(graph.dependency_depth(&file("a")), 3);
        assert_eq!(graph.dependency_depth(&file("b")), 3);
        assert_eq!(graph.deepest_chain(), Some((file("a"), 3)));
    }

    #[test]
    fn test_related_files() {
        let graph = graph_of(
            &["a", "b", "c", "x", "y", "z"],
            &[
                ("a", "x"),
                ("a", "y"),
                ("a", "z"),
                ("b", "x"),
                ("b", "y"),
                ("c", "x"),
                ("z", "x"),
                ("z", "y"),
                ("z", "z"),
            ],
        );

        let related = graph.related_files(&file("a"), 2);
        let paths: Vec<PathBuf> = related.iter().map(|r| r.path.clone()).collect();
        assert_eq!(paths, files(&["z", "b"]));
        assert_eq!(related[0].shared_count(), 3);
        assert_eq!(related[1].shared, files(&["x", "y"]));

        assert_eq!(graph.related_files(&file("a"), 1).len(), 3);
    }

    #[test]
    fn test_orphans_and_hubs() {
        let graph = graph_of(
            &["a", "b", "c", "lonely"],
            &[("a", "c"), ("b", "c"), ("a", "b")],
        );
        assert_eq!(graph.orphans(), files(&["lonely"]));
        assert_eq!(
            graph.most_depended_on(10),
            vec![(file("c"), 2), (file("b"), 1)]
        );
        assert_eq!(graph.most_depended_on(1), vec![(file("c"), 2)]);
    }
}
