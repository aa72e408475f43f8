//! Top-level entity extraction.
//!
//! An entity is one named top-level declaration: a function, a UI component,
//! a class or a `const`. Each entity remembers which import bindings its
//! body touches; the mixed-logic clusterer groups entities by that set.

use std::collections::{BTreeSet, HashSet};
use std::ops::Range;

use serde::Serialize;
use tree_sitter::Node;

use super::complexity::calculate_complexity;
use crate::program::syntax::{
    contains_kind, end_line, for_each_identifier, has_token, is_closure_initializer, node_text,
    start_line, unwrap_expression, JSX_KINDS,
};

/// The kind of a top-level declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EntityKind {
    Function,
    Component,
    Class,
    Constant,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Function => write!(f, "function"),
            Self::Component => write!(f, "component"),
            Self::Class => write!(f, "class"),
            Self::Constant => write!(f, "constant"),
        }
    }
}

/// A named top-level declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    pub name: String,
    pub kind: EntityKind,
    /// First line of the declaration, including any `export` keyword (1-indexed)
    pub start_line: usize,
    pub end_line: usize,
    pub exported: bool,
    pub is_default_export: bool,
    pub complexity: usize,
    /// Import bindings referenced inside the declaration.
    pub dependencies: BTreeSet<String>,
    /// Every identifier token inside the declaration.
    #[serde(skip)]
    pub references: BTreeSet<String>,
    /// Byte range of the declaration node; tokens inside it do not count as uses.
    #[serde(skip)]
    pub span: Range<usize>,
}

impl Entity {
    /// Returns true if the token starting at `byte` lies inside this declaration.
    pub fn contains_byte(&self, byte: usize) -> bool {
        self.span.contains(&byte)
    }

    pub fn is_function_like(&self) -> bool {
        matches!(self.kind, EntityKind::Function | EntityKind::Component)
    }
}

/// Extracts one [`Entity`] per top-level function, component, class and
/// `const` declaration, in source order.
///
/// `import_bindings` are the file's import-clause names; an entity's
/// dependency set is its identifier tokens intersected with them.
pub fn extract_entities(
    root: Node<'_>,
    source: &str,
    import_bindings: &HashSet<&str>,
) -> Vec<Entity> {
    let mut extractor = Extractor {
        source,
        bindings: import_bindings,
        entities: Vec::new(),
    };
    let mut cursor = root.walk();

    for statement in root.named_children(&mut cursor) {
        if statement.kind() != "export_statement" {
            extractor.declaration(statement, statement, Export::None);
            continue;
        }
        let export = if has_token(&statement, "default") {
            Export::Default
        } else {
            Export::Named
        };
        if let Some(decl) = statement.child_by_field_name("declaration") {
            extractor.declaration(statement, decl, export);
        } else if let Some(value) = statement.child_by_field_name("value") {
            extractor.default_value(statement, value);
        }
    }

    extractor.entities
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Export {
    None,
    Named,
    Default,
}

struct Extractor<'a> {
    source: &'a str,
    bindings: &'a HashSet<&'a str>,
    entities: Vec<Entity>,
}

impl<'a> Extractor<'a> {
    fn declaration(&mut self, outer: Node<'_>, decl: Node<'_>, export: Export) {
        match decl.kind() {
            "function_declaration" | "generator_function_declaration" => {
                if let Some(name) = self.name_of(decl) {
                    let kind = function_kind(name, decl);
                    self.push(name, kind, outer, outer, decl, export);
                }
            }
            "class_declaration" | "abstract_class_declaration" => {
                if let Some(name) = self.name_of(decl) {
                    self.push(name, EntityKind::Class, outer, outer, decl, export);
                }
            }
            "lexical_declaration" | "variable_declaration" => {
                let is_const = decl.child(0).is_some_and(|c| c.kind() == "const");
                let mut cursor = decl.walk();
                for declarator in decl.named_children(&mut cursor) {
                    if declarator.kind() != "variable_declarator" {
                        continue;
                    }
                    // Destructuring patterns declare several names; skip them.
                    let Some(name_node) = declarator
                        .child_by_field_name("name")
                        .filter(|n| n.kind() == "identifier")
                    else {
                        continue;
                    };
                    let Some(name) = node_text(&name_node, self.source) else {
                        continue;
                    };
                    let value = declarator.child_by_field_name("value");
                    let kind = match value {
                        Some(v) if is_closure_initializer(v) => function_kind(name, v),
                        _ if is_const => EntityKind::Constant,
                        _ => continue,
                    };
                    let body = value.unwrap_or(declarator);
                    self.push(name, kind, outer, declarator, body, export);
                }
            }
            _ => {}
        }
    }

    /// `export default function Name() {}` parsed as an expression.
    fn default_value(&mut self, outer: Node<'_>, value: Node<'_>) {
        let value = unwrap_expression(value);
        let Some(name) = self.name_of(value) else {
            return;
        };
        let kind = match value.kind() {
            "class" => EntityKind::Class,
            "function_expression" | "function" | "generator_function" => {
                function_kind(name, value)
            }
            _ => return,
        };
        self.push(name, kind, outer, outer, value, Export::Default);
    }

    fn name_of(&self, node: Node<'_>) -> Option<&'a str> {
        node.child_by_field_name("name")
            .and_then(|n| node_text(&n, self.source))
    }

    fn push(
        &mut self,
        name: &str,
        kind: EntityKind,
        outer: Node<'_>,
        span_node: Node<'_>,
        body: Node<'_>,
        export: Export,
    ) {
        let mut references = BTreeSet::new();
        for_each_identifier(span_node, self.source, |token, _| {
            references.insert(token.to_string());
        });
        let dependencies = references
            .iter()
            .filter(|r| self.bindings.contains(r.as_str()))
            .cloned()
            .collect();

        self.entities.push(Entity {
            name: name.to_string(),
            kind,
            start_line: start_line(&outer),
            end_line: end_line(&span_node).max(start_line(&outer)),
            exported: export != Export::None,
            is_default_export: export == Export::Default,
            complexity: calculate_complexity(body),
            dependencies,
            references,
            span: span_node.start_byte()..span_node.end_byte(),
        });
    }
}

/// A function is a component when its name starts uppercase and its body
/// renders JSX. This is a syntax heuristic, not a type check.
fn function_kind(name: &str, body: Node<'_>) -> EntityKind {
    let capitalized = name.chars().next().is_some_and(char::is_uppercase);
    if capitalized && contains_kind(body, JSX_KINDS) {
        EntityKind::Component
    } else {
        EntityKind::Function
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::SourceParser;
    use std::path::Path;

    fn entities_of(path: &str, source: &str) -> Vec<Entity> {
        let mut parser = SourceParser::new(0).unwrap();
        parser
            .parse(Path::new(path), source.to_string())
            .unwrap()
            .entities
    }

    #[test]
    fn test_extracts_all_kinds() {
        let source = r#"
import { api } from './api';
import React from 'react';

export function load() { return api.get(); }
const Header = () => <h1>Title</h1>;
export default class Store {}
const LIMIT = 10;
let counter = 0;
var handler = function () {};
"#;
        let entities = entities_of("/app/a.jsx", source);
        let summary: Vec<(&str, EntityKind, bool)> = entities
            .iter()
            .map(|e| (e.name.as_str(), e.kind, e.exported))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("load", EntityKind::Function, true),
                ("Header", EntityKind::Component, false),
                ("Store", EntityKind::Class, true),
                ("LIMIT", EntityKind::Constant, false),
                ("handler", EntityKind::Function, false),
            ]
        );
        assert!(entities[2].is_default_export);
        assert_eq!(entities[0].start_line, 5);
    }

    #[test]
    fn test_dependencies_are_import_bindings_only() {
        let source = r#"
import { format, parse } from './dates';
const local = 1;
export function render(value) { return format(value) + local; }
"#;
        let entities = entities_of("/app/a.js", source);
        let render = entities.iter().find(|e| e.name == "render").unwrap();
        assert_eq!(
            render.dependencies.iter().map(String::as_str).collect::<Vec<_>>(),
            vec!["format"]
        );
        assert!(render.references.contains("local"));
    }

    #[test]
    fn test_lowercase_jsx_function_is_not_component() {
        let entities = entities_of("/app/a.jsx", "function renderRow() { return <tr />; }");
        assert_eq!(entities[0].kind, EntityKind::Function);
    }

    #[test]
    fn test_wrapped_component() {
        let source = "import { memo } from 'react';\nexport const Card = memo(() => <div />);";
        let entities = entities_of("/app/a.jsx", source);
        assert_eq!(entities[0].kind, EntityKind::Component);
        assert!(entities[0].dependencies.contains("memo"));
    }

    #[test]
    fn test_destructuring_is_skipped() {
        let entities = entities_of("/app/a.js", "const { a, b } = obj;\nconst [c] = list;");
        assert!(entities.is_empty());
    }

    #[test]
    fn test_entity_complexity() {
        let entities = entities_of(
            "/app/a.js",
            "function pick(a, b) { if (a && b) { return a; } return b; }",
        );
        assert_eq!(entities[0].complexity, 3);
    }
}
