//! Split-entity detection.
//!
//! Finds families of entities that share a leading capitalized word
//! (`UserService`, `UserCard`, `UserStore`) but are scattered over several
//! files. Such a family is usually one concept that wants one home.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::PathBuf;

use serde::Serialize;

use crate::program::Program;

/// A same-prefix family of entities spread across files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitEntity {
    pub prefix: String,
    /// Entity names in first-seen order
    pub entities: Vec<String>,
    pub files: BTreeSet<PathBuf>,
}

/// Leading capitalized word of a name: `User` from `UserService`.
///
/// Returns `None` for names that do not start with an uppercase letter.
pub fn capitalized_prefix(name: &str) -> Option<&str> {
    let mut chars = name.char_indices();
    let (_, first) = chars.next()?;
    if !first.is_uppercase() {
        return None;
    }
    let end = chars
        .find(|(_, c)| !(c.is_lowercase() || c.is_ascii_digit()))
        .map(|(i, _)| i)
        .unwrap_or(name.len());
    Some(&name[..end])
}

/// Groups same-prefix entities that span at least two files.
///
/// A family needs two or more distinct non-bare names (a name equal to the
/// prefix itself does not count). Prefixes are considered in program order
/// and each is reported at most once.
pub fn detect_split_entities(program: &Program) -> Vec<SplitEntity> {
    // name -> files, plus first-seen order of names
    let mut files_by_name: HashMap<&str, BTreeSet<PathBuf>> = HashMap::new();
    let mut order: Vec<&str> = Vec::new();
    for file in program.files() {
        for entity in &file.entities {
            let files = files_by_name.entry(entity.name.as_str()).or_default();
            if files.is_empty() {
                order.push(entity.name.as_str());
            }
            files.insert(file.path.clone());
        }
    }

    let mut seen_prefixes: HashSet<&str> = HashSet::new();
    let mut split = Vec::new();

    for name in &order {
        let Some(prefix) = capitalized_prefix(name) else {
            continue;
        };
        if !seen_prefixes.insert(prefix) {
            continue;
        }

        let family: Vec<&str> = order
            .iter()
            .copied()
            .filter(|other| *other != prefix && capitalized_prefix(other) == Some(prefix))
            .collect();
        if family.len() < 2 {
            continue;
        }

        let files: BTreeSet<PathBuf> = family
            .iter()
            .flat_map(|n| files_by_name[n].iter().cloned())
            .collect();
        if files.len() < 2 {
            continue;
        }

        split.push(SplitEntity {
            prefix: prefix.to_string(),
            entities: family.iter().map(|n| n.to_string()).collect(),
            files,
        });
    }

    split
}
