//! Per-file unused-code detection.
//!
//! All detectors here are pure functions of one [`SourceFile`] plus the
//! shared [`UsageIndex`], so files can be analyzed in any order and in
//! parallel.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::PathBuf;

use serde::Serialize;

use super::entities::{Entity, EntityKind};
use super::usage::UsageIndex;
use crate::error::Diagnostic;
use crate::program::syntax::{is_identifier_kind, node_text, walk_preorder, WalkControl};
use crate::program::{ImportKind, SourceFile};

/// An import binding that is never referenced in its file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnusedImport {
    pub file: PathBuf,
    /// Local binding name
    pub name: String,
    /// Name in the source module (`default` / `*` for default and namespace imports)
    pub imported_name: String,
    /// Line of the import statement (1-indexed)
    pub line: usize,
    /// Module specifier the binding comes from
    pub module: String,
}

/// A top-level function that nothing references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnusedFunction {
    pub file: PathBuf,
    pub name: String,
    pub line: usize,
    pub exported: bool,
    pub complexity: usize,
}

/// A top-level UI component that nothing renders or references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnusedComponent {
    pub file: PathBuf,
    pub name: String,
    pub line: usize,
    pub exported: bool,
    pub complexity: usize,
}

/// An unreferenced top-level class or constant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeadCode {
    pub file: PathBuf,
    pub name: String,
    pub kind: EntityKind,
    pub line: usize,
    pub exported: bool,
}

/// A function whose complexity exceeds the configured threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplexityWarning {
    pub file: PathBuf,
    pub name: String,
    pub kind: EntityKind,
    pub line: usize,
    pub complexity: usize,
    pub threshold: usize,
}

/// Finds import bindings that are never referenced outside import clauses.
///
/// Default, named and namespace bindings are tracked individually, so
/// `import React, { useState } from 'react'` can report either one.
pub fn detect_unused_imports(file: &SourceFile) -> Vec<UnusedImport> {
    let used = tokens_outside_imports(file);
    let mut unused = Vec::new();

    for import in file.imports.iter().filter(|i| i.kind == ImportKind::ES6) {
        for spec in &import.specifiers {
            let Some(local) = spec.local_name() else {
                continue;
            };
            if !used.contains(local) {
                unused.push(UnusedImport {
                    file: file.path.clone(),
                    name: local.to_string(),
                    imported_name: spec.exported_name().unwrap_or("*").to_string(),
                    line: import.line,
                    module: import.source.clone(),
                });
            }
        }
    }

    unused
}

/// Finds top-level functions (not components) that nothing references.
pub fn detect_unused_functions(file: &SourceFile, index: &UsageIndex) -> Vec<UnusedFunction> {
    unused_entities(file, index, &[EntityKind::Function])
        .map(|e| UnusedFunction {
            file: file.path.clone(),
            name: e.name.clone(),
            line: e.start_line,
            exported: e.exported,
            complexity: e.complexity,
        })
        .collect()
}

/// Finds top-level components that nothing references.
pub fn detect_unused_components(file: &SourceFile, index: &UsageIndex) -> Vec<UnusedComponent> {
    unused_entities(file, index, &[EntityKind::Component])
        .map(|e| UnusedComponent {
            file: file.path.clone(),
            name: e.name.clone(),
            line: e.start_line,
            exported: e.exported,
            complexity: e.complexity,
        })
        .collect()
}

/// Finds top-level classes and constants that nothing references.
pub fn detect_dead_code(file: &SourceFile, index: &UsageIndex) -> Vec<DeadCode> {
    unused_entities(file, index, &[EntityKind::Class, EntityKind::Constant])
        .map(|e| DeadCode {
            file: file.path.clone(),
            name: e.name.clone(),
            kind: e.kind,
            line: e.start_line,
            exported: e.exported,
        })
        .collect()
}

/// Functions and components above `threshold`.
pub fn detect_complexity_warnings(file: &SourceFile, threshold: usize) -> Vec<ComplexityWarning> {
    file.entities
        .iter()
        .filter(|e| e.is_function_like() && e.complexity > threshold)
        .map(|e| ComplexityWarning {
            file: file.path.clone(),
            name: e.name.clone(),
            kind: e.kind,
            line: e.start_line,
            complexity: e.complexity,
            threshold,
        })
        .collect()
}

/// Reports every top-level name declared more than once in the file.
///
/// Such files are not guessed at: each duplicate's name token counts as a
/// use of the others, so none of them is reported unused.
pub fn detect_duplicate_declarations(file: &SourceFile) -> Vec<Diagnostic> {
    let mut lines_by_name: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for entity in &file.entities {
        lines_by_name
            .entry(entity.name.as_str())
            .or_default()
            .push(entity.start_line);
    }
    lines_by_name
        .into_iter()
        .filter(|(_, lines)| lines.len() > 1)
        .map(|(name, lines)| Diagnostic::duplicate_declaration(&file.path, name, &lines))
        .collect()
}

/// Entities of the given kinds that are used neither in another file nor in
/// their own file outside their own declaration.
fn unused_entities<'f>(
    file: &'f SourceFile,
    index: &'f UsageIndex,
    kinds: &'f [EntityKind],
) -> impl Iterator<Item = &'f Entity> {
    let names: HashSet<&str> = file
        .entities
        .iter()
        .filter(|e| kinds.contains(&e.kind))
        .map(|e| e.name.as_str())
        .collect();
    let positions = token_positions(file, &names);

    file.entities.iter().filter(move |entity| {
        if !kinds.contains(&entity.kind) || index.occurs_outside(&entity.name, &file.path) {
            return false;
        }
        let used_locally = positions
            .get(entity.name.as_str())
            .is_some_and(|starts| starts.iter().any(|&b| !entity.contains_byte(b)));
        !used_locally
    })
}

/// Identifier tokens outside `import` statements.
fn tokens_outside_imports(file: &SourceFile) -> HashSet<&str> {
    let source = file.source.as_str();
    let mut used = HashSet::new();
    walk_preorder(file.root(), |node| {
        if node.kind() == "import_statement" {
            return WalkControl::SkipChildren;
        }
        if is_identifier_kind(node.kind()) {
            if let Some(text) = node_text(&node, source) {
                used.insert(text);
            }
        }
        WalkControl::Continue
    });
    used
}

/// Start bytes of every token whose text is one of `names`.
fn token_positions<'f>(
    file: &'f SourceFile,
    names: &HashSet<&str>,
) -> HashMap<&'f str, Vec<usize>> {
    let source = file.source.as_str();
    let mut positions: HashMap<&str, Vec<usize>> = HashMap::new();
    if names.is_empty() {
        return positions;
    }
    walk_preorder(file.root(), |node| {
        if is_identifier_kind(node.kind()) {
            if let Some(text) = node_text(&node, source) {
                if names.contains(text) {
                    positions.entry(text).or_default().push(node.start_byte());
                }
            }
        }
        WalkControl::Continue
    });
    positions
}
