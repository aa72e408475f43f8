//! Mixed-logic detection.
//!
//! A file mixes logic when its top-level entities fall into two or more
//! groups that share no imports and never reference each other. Each group
//! is a candidate for its own file.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use heck::ToKebabCase;
use serde::Serialize;

use super::entities::Entity;
use crate::program::SourceFile;

/// One connected group of entities inside a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogicCluster {
    /// Entity names in source order
    pub entities: Vec<String>,
    /// Union of the entities' import dependencies
    pub dependencies: BTreeSet<String>,
    /// Where this group could live on its own
    pub suggested_file: PathBuf,
}

/// A file whose entities form more than one disconnected cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MixedLogicFile {
    pub file: PathBuf,
    pub entity_count: usize,
    pub clusters: Vec<LogicCluster>,
}

/// Disjoint-set forest over entity indices.
struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            // Keep the smaller index as root so groups stay in source order.
            let (root, child) = if ra < rb { (ra, rb) } else { (rb, ra) };
            self.parent[child] = root;
        }
    }
}

/// Two entities are related when they share an import or one mentions the other.
fn related(a: &Entity, b: &Entity) -> bool {
    !a.dependencies.is_disjoint(&b.dependencies)
        || a.references.contains(&b.name)
        || b.references.contains(&a.name)
}

/// Partitions a file's entities into connected clusters.
///
/// Returns `None` when the file has fewer than `threshold` entities or when
/// all entities are connected.
pub fn detect_mixed_logic(file: &SourceFile, threshold: usize) -> Option<MixedLogicFile> {
    let entities = &file.entities;
    if entities.len() < threshold {
        return None;
    }

    let mut sets = UnionFind::new(entities.len());
    for i in 0..entities.len() {
        for j in (i + 1)..entities.len() {
            if related(&entities[i], &entities[j]) {
                sets.union(i, j);
            }
        }
    }

    // Group members by root; roots are first-member indices, so iterating
    // in index order yields clusters ordered by their first entity.
    let mut groups: Vec<(usize, Vec<usize>)> = Vec::new();
    for i in 0..entities.len() {
        let root = sets.find(i);
        match groups.iter_mut().find(|(r, _)| *r == root) {
            Some((_, members)) => members.push(i),
            None => groups.push((root, vec![i])),
        }
    }

    if groups.len() < 2 {
        return None;
    }

    let clusters = groups
        .into_iter()
        .map(|(_, members)| {
            let first = &entities[members[0]];
            LogicCluster {
                entities: members.iter().map(|&i| entities[i].name.clone()).collect(),
                dependencies: members
                    .iter()
                    .flat_map(|&i| entities[i].dependencies.iter().cloned())
                    .collect(),
                suggested_file: suggested_file_name(&file.path, &first.name),
            }
        })
        .collect();

    Some(MixedLogicFile {
        file: file.path.clone(),
        entity_count: entities.len(),
        clusters,
    })
}

/// `src/user.ts` + `UserProfile` -> `src/user-profile.ts`.
pub fn suggested_file_name(source: &Path, entity_name: &str) -> PathBuf {
    let extension = source
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("ts");
    let stem = entity_name.to_kebab_case();
    let file_name = format!("{}.{}", stem, extension);
    match source.parent() {
        Some(dir) => dir.join(file_name),
        None => PathBuf::from(file_name),
    }
}
