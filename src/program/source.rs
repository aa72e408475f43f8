//! Parsed source files: imports, exports and top-level entities.
//!
//! Each file is parsed once with tree-sitter. The tree is kept on the
//! [`SourceFile`] so the analyzers can walk it again; imports, exports and
//! entities are extracted up front because every analyzer needs them.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tree_sitter::{Language, Node, Parser, Tree};

use super::syntax::{has_token, node_text, start_line, string_value};
use crate::analysis::entities::{extract_entities, Entity, EntityKind};
use crate::error::{AnalysisError, AnalysisResult};

/// File extensions the parser understands.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["ts", "tsx", "js", "jsx", "mjs", "cjs", "mts", "cts"];

/// The kind of import statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ImportKind {
    /// ES6 import statement: `import ... from 'module'`
    ES6,
    /// CommonJS require: `const x = require('module')`
    CommonJS,
    /// Dynamic import: `import('module')`
    DynamicImport,
}

/// An individual import specifier within an import statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ImportSpecifier {
    /// Default import: `import foo from 'module'`
    Default(String),
    /// Named import: `import { foo } from 'module'` or `import { foo as bar } from 'module'`
    Named { imported: String, local: String },
    /// Namespace import: `import * as foo from 'module'`
    Namespace(String),
    /// Side-effect import: `import 'module'` (no specifiers)
    SideEffect,
    /// Entire module (CommonJS style): `const mod = require('module')`
    Entire(String),
}

impl ImportSpecifier {
    /// Returns the exported name that is being imported (the original name in the source module).
    pub fn exported_name(&self) -> Option<&str> {
        match self {
            ImportSpecifier::Default(_) => Some("default"),
            ImportSpecifier::Named { imported, .. } => Some(imported),
            ImportSpecifier::Namespace(_) => None,
            ImportSpecifier::SideEffect => None,
            ImportSpecifier::Entire(_) => None,
        }
    }

    /// Returns the local name (the name used in the importing file).
    pub fn local_name(&self) -> Option<&str> {
        match self {
            ImportSpecifier::Default(name) => Some(name),
            ImportSpecifier::Named { local, .. } => Some(local),
            ImportSpecifier::Namespace(name) => Some(name),
            ImportSpecifier::SideEffect => None,
            ImportSpecifier::Entire(name) => Some(name),
        }
    }
}

/// Represents a single import in a source file.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Import {
    /// The module specifier (e.g., "react", "./utils", "@scope/package")
    pub source: String,
    /// The specifiers being imported
    pub specifiers: Vec<ImportSpecifier>,
    /// The kind of import
    pub kind: ImportKind,
    /// Line number in the source file (1-indexed)
    pub line: usize,
}

impl Import {
    /// Names this import binds in the importing file.
    pub fn local_names(&self) -> impl Iterator<Item = &str> {
        self.specifiers.iter().filter_map(ImportSpecifier::local_name)
    }

    /// Names requested from the target module, for graph edge labels.
    pub fn symbol_names(&self) -> Vec<String> {
        self.specifiers
            .iter()
            .filter_map(|s| match s {
                ImportSpecifier::Default(_) => Some("default".to_string()),
                ImportSpecifier::Named { imported, .. } => Some(imported.clone()),
                ImportSpecifier::Namespace(_) | ImportSpecifier::Entire(_) => Some("*".to_string()),
                ImportSpecifier::SideEffect => None,
            })
            .collect()
    }
}

/// What an export statement exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ExportKind {
    Function,
    Class,
    Variable,
    Type,
    Interface,
    Enum,
    /// `export default <expression>` or `export { local }`
    Value,
    /// `export { x } from './y'`, `export * from './y'`
    Reexport,
}

/// A single exported name.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Export {
    /// Exported name (`default` for anonymous default exports, `*` for star re-exports)
    pub name: String,
    pub kind: ExportKind,
    pub is_default: bool,
    /// Line number in the source file (1-indexed)
    pub line: usize,
    /// Module specifier for re-exports
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// Language type for file analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SourceLanguage {
    JavaScript,
    TypeScript,
    Tsx,
    Jsx,
}

impl SourceLanguage {
    /// Determine language from file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "js" | "mjs" | "cjs" => Some(SourceLanguage::JavaScript),
            "jsx" => Some(SourceLanguage::Jsx),
            "ts" | "mts" | "cts" => Some(SourceLanguage::TypeScript),
            "tsx" => Some(SourceLanguage::Tsx),
            _ => None,
        }
    }

    /// Determine language from a file path.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    /// Get tree-sitter language for this source language.
    pub fn tree_sitter_language(&self) -> Language {
        match self {
            SourceLanguage::JavaScript | SourceLanguage::Jsx => {
                tree_sitter_javascript::LANGUAGE.into()
            }
            SourceLanguage::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            SourceLanguage::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
        }
    }
}

/// One successfully parsed file of the program.
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Normalized absolute path; the file's identity.
    pub path: PathBuf,
    pub language: SourceLanguage,
    pub source: String,
    tree: Tree,
    pub imports: Vec<Import>,
    pub exports: Vec<Export>,
    pub entities: Vec<Entity>,
}

impl SourceFile {
    /// Root node of the file's syntax tree.
    pub fn root(&self) -> Node<'_> {
        self.tree.root_node()
    }

    /// Local names bound by ES6 import clauses.
    pub fn import_bindings(&self) -> HashSet<&str> {
        self.imports
            .iter()
            .filter(|i| i.kind == ImportKind::ES6)
            .flat_map(Import::local_names)
            .collect()
    }

    /// Name of the declaration behind `export default`, if it has one.
    pub fn default_export_name(&self) -> Option<&str> {
        self.exports
            .iter()
            .find(|e| e.is_default && e.name != "default")
            .map(|e| e.name.as_str())
    }

    /// Entities of the given kind, in source order.
    pub fn entities_of(&self, kind: EntityKind) -> impl Iterator<Item = &Entity> {
        self.entities.iter().filter(move |e| e.kind == kind)
    }
}

/// Parses source text into [`SourceFile`]s.
///
/// Holds one tree-sitter parser per grammar. A parser is not `Sync`, so
/// parallel callers create one `SourceParser` per worker.
pub struct SourceParser {
    js_parser: Parser,
    ts_parser: Parser,
    tsx_parser: Parser,
    timeout_ms: u64,
}

impl SourceParser {
    /// Create a new parser. `timeout_ms == 0` disables the per-file time limit.
    pub fn new(timeout_ms: u64) -> AnalysisResult<Self> {
        Ok(Self {
            js_parser: Self::parser_for(SourceLanguage::JavaScript, timeout_ms)?,
            ts_parser: Self::parser_for(SourceLanguage::TypeScript, timeout_ms)?,
            tsx_parser: Self::parser_for(SourceLanguage::Tsx, timeout_ms)?,
            timeout_ms,
        })
    }

    fn parser_for(language: SourceLanguage, timeout_ms: u64) -> AnalysisResult<Parser> {
        let mut parser = Parser::new();
        parser
            .set_language(&language.tree_sitter_language())
            .map_err(|_| AnalysisError::LanguageInit)?;
        parser.set_timeout_micros(timeout_ms.saturating_mul(1_000));
        Ok(parser)
    }

    /// Parse source code directly.
    ///
    /// A tree that contains syntax errors is rejected: the analyzers would
    /// otherwise reason about half-recovered declarations.
    pub fn parse(&mut self, path: &Path, source: String) -> AnalysisResult<SourceFile> {
        let language = SourceLanguage::from_path(path)
            .ok_or_else(|| AnalysisError::UnsupportedFileType(path.display().to_string()))?;

        let parser = match language {
            SourceLanguage::JavaScript | SourceLanguage::Jsx => &mut self.js_parser,
            SourceLanguage::TypeScript => &mut self.ts_parser,
            SourceLanguage::Tsx => &mut self.tsx_parser,
        };

        let tree = match parser.parse(&source, None) {
            Some(tree) => tree,
            None => {
                // A timed-out parse leaves state behind; clear it for the next file.
                parser.reset();
                return Err(AnalysisError::ParseTimeout {
                    path: path.display().to_string(),
                    timeout_ms: self.timeout_ms,
                });
            }
        };

        if tree.root_node().has_error() {
            return Err(AnalysisError::Parse {
                path: path.display().to_string(),
            });
        }

        let root = tree.root_node();
        let imports = extract_imports(root, &source);
        let exports = extract_exports(root, &source);

        let mut file = SourceFile {
            path: path.to_path_buf(),
            language,
            imports,
            exports,
            entities: Vec::new(),
            tree,
            source,
        };
        let entities = extract_entities(file.root(), &file.source, &file.import_bindings());
        file.entities = entities;
        Ok(file)
    }
}

/// Extract imports from a parsed tree.
fn extract_imports(root: Node<'_>, source: &str) -> Vec<Import> {
    let mut imports = Vec::new();
    let mut cursor = root.walk();
    let mut descend = true;

    loop {
        if descend {
            let node = cursor.node();
            match node.kind() {
                "import_statement" => {
                    if let Some(import) = parse_es6_import(&node, source) {
                        imports.push(import);
                    }
                }
                "call_expression" => {
                    if let Some(import) = parse_require_or_dynamic_import(&node, source) {
                        imports.push(import);
                    }
                }
                _ => {}
            }
            if node.kind() != "import_statement" && cursor.goto_first_child() {
                continue;
            }
        }
        if cursor.goto_next_sibling() {
            descend = true;
            continue;
        }
        if !cursor.goto_parent() {
            break;
        }
        descend = false;
    }

    imports
}

/// Parse an ES6 import statement.
fn parse_es6_import(node: &Node<'_>, source: &str) -> Option<Import> {
    let mut source_module = String::new();
    let mut specifiers = Vec::new();
    let line = start_line(node);

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "string" => {
                source_module = string_value(&child, source)?;
            }
            "import_clause" => {
                parse_import_clause(&child, source, &mut specifiers);
            }
            _ => {}
        }
    }

    if source_module.is_empty() {
        return None;
    }

    if specifiers.is_empty() {
        specifiers.push(ImportSpecifier::SideEffect);
    }

    Some(Import {
        source: source_module,
        specifiers,
        kind: ImportKind::ES6,
        line,
    })
}

/// Parse the import clause (everything between 'import' and 'from').
fn parse_import_clause(node: &Node<'_>, source: &str, specifiers: &mut Vec<ImportSpecifier>) {
    let mut cursor = node.walk();

    for child in node.children(&mut cursor) {
        match child.kind() {
            "identifier" => {
                if let Some(name) = node_text(&child, source) {
                    specifiers.push(ImportSpecifier::Default(name.to_string()));
                }
            }
            "namespace_import" => {
                let mut inner = child.walk();
                let name = child
                    .children(&mut inner)
                    .find(|c| c.kind() == "identifier")
                    .and_then(|c| node_text(&c, source));
                if let Some(name) = name {
                    specifiers.push(ImportSpecifier::Namespace(name.to_string()));
                }
            }
            "named_imports" => {
                let mut inner = child.walk();
                for spec in child.children(&mut inner) {
                    if spec.kind() == "import_specifier" {
                        if let Some(spec) = parse_import_specifier(&spec, source) {
                            specifiers.push(spec);
                        }
                    }
                }
            }
            _ => {}
        }
    }
}

/// Parse a single import specifier: foo or foo as bar
fn parse_import_specifier(node: &Node<'_>, source: &str) -> Option<ImportSpecifier> {
    let imported = node
        .child_by_field_name("name")
        .and_then(|n| node_text(&n, source))?
        .to_string();
    let local = node
        .child_by_field_name("alias")
        .and_then(|n| node_text(&n, source))
        .map(str::to_string)
        .unwrap_or_else(|| imported.clone());

    Some(ImportSpecifier::Named { imported, local })
}

/// Parse require() calls or dynamic import().
fn parse_require_or_dynamic_import(node: &Node<'_>, source: &str) -> Option<Import> {
    let line = start_line(node);

    let func_node = node.child_by_field_name("function")?;
    let func_name = node_text(&func_node, source)?;

    let (kind, is_require) = match func_name {
        "require" => (ImportKind::CommonJS, true),
        "import" => (ImportKind::DynamicImport, false),
        _ => return None,
    };

    let args_node = node.child_by_field_name("arguments")?;
    let mut args_cursor = args_node.walk();
    let first_string = args_node
        .children(&mut args_cursor)
        .find(|c| c.kind() == "string")?;
    let source_module = string_value(&first_string, source)?;

    let specifiers = if is_require {
        find_require_variable_name(node, source)
            .map(|name| vec![ImportSpecifier::Entire(name)])
            .unwrap_or_else(|| vec![ImportSpecifier::SideEffect])
    } else {
        vec![ImportSpecifier::SideEffect]
    };

    Some(Import {
        source: source_module,
        specifiers,
        kind,
        line,
    })
}

/// Find the variable name in `const x = require('...')`.
fn find_require_variable_name(call_node: &Node<'_>, source: &str) -> Option<String> {
    let parent = call_node.parent()?;
    if parent.kind() != "variable_declarator" {
        return None;
    }
    let name_node = parent.child_by_field_name("name")?;
    match name_node.kind() {
        "identifier" => node_text(&name_node, source).map(str::to_string),
        _ => None,
    }
}

/// Extract top-level exports.
fn extract_exports(root: Node<'_>, source: &str) -> Vec<Export> {
    let mut exports = Vec::new();
    let mut cursor = root.walk();

    for statement in root.named_children(&mut cursor) {
        if statement.kind() != "export_statement" {
            continue;
        }
        let line = start_line(&statement);
        let is_default = has_token(&statement, "default");
        let reexport_source = statement
            .child_by_field_name("source")
            .and_then(|s| string_value(&s, source));

        if let Some(decl) = statement.child_by_field_name("declaration") {
            for (name, kind) in declaration_names(&decl, source) {
                exports.push(Export {
                    name,
                    kind,
                    is_default,
                    line,
                    source: None,
                });
            }
            continue;
        }

        if let Some(value) = statement.child_by_field_name("value") {
            // Named class/function expressions behave like declarations here.
            let (name, kind) = match value.kind() {
                "identifier" => (node_text(&value, source), ExportKind::Value),
                "class" => (
                    value.child_by_field_name("name").and_then(|n| node_text(&n, source)),
                    ExportKind::Class,
                ),
                "function_expression" | "function" | "generator_function" => (
                    value.child_by_field_name("name").and_then(|n| node_text(&n, source)),
                    ExportKind::Function,
                ),
                _ => (None, ExportKind::Value),
            };
            exports.push(Export {
                name: name.unwrap_or("default").to_string(),
                kind,
                is_default: true,
                line,
                source: None,
            });
            continue;
        }

        let kind = if reexport_source.is_some() {
            ExportKind::Reexport
        } else {
            ExportKind::Value
        };

        let mut inner = statement.walk();
        let mut named_any = false;
        for child in statement.children(&mut inner) {
            match child.kind() {
                "export_clause" => {
                    let mut spec_cursor = child.walk();
                    for spec in child.named_children(&mut spec_cursor) {
                        if spec.kind() != "export_specifier" {
                            continue;
                        }
                        let name = spec
                            .child_by_field_name("alias")
                            .or_else(|| spec.child_by_field_name("name"))
                            .and_then(|n| node_text(&n, source));
                        if let Some(name) = name {
                            named_any = true;
                            exports.push(Export {
                                name: name.to_string(),
                                kind,
                                is_default: name == "default",
                                line,
                                source: reexport_source.clone(),
                            });
                        }
                    }
                }
                "namespace_export" => {
                    let mut ns_cursor = child.walk();
                    let name = child
                        .named_children(&mut ns_cursor)
                        .find(|c| c.kind() == "identifier")
                        .and_then(|c| node_text(&c, source));
                    if let Some(name) = name {
                        named_any = true;
                        exports.push(Export {
                            name: name.to_string(),
                            kind,
                            is_default: false,
                            line,
                            source: reexport_source.clone(),
                        });
                    }
                }
                _ => {}
            }
        }

        if !named_any && reexport_source.is_some() && has_token(&statement, "*") {
            exports.push(Export {
                name: "*".to_string(),
                kind: ExportKind::Reexport,
                is_default: false,
                line,
                source: reexport_source,
            });
        }
    }

    exports
}

/// Names declared by an exported declaration.
fn declaration_names(decl: &Node<'_>, source: &str) -> Vec<(String, ExportKind)> {
    let kind = match decl.kind() {
        "function_declaration" | "generator_function_declaration" | "function_signature" => {
            ExportKind::Function
        }
        "class_declaration" | "abstract_class_declaration" => ExportKind::Class,
        "type_alias_declaration" => ExportKind::Type,
        "interface_declaration" => ExportKind::Interface,
        "enum_declaration" => ExportKind::Enum,
        "lexical_declaration" | "variable_declaration" => {
            let mut cursor = decl.walk();
            return decl
                .named_children(&mut cursor)
                .filter(|c| c.kind() == "variable_declarator")
                .filter_map(|c| c.child_by_field_name("name"))
                .filter(|n| n.kind() == "identifier")
                .filter_map(|n| node_text(&n, source))
                .map(|name| (name.to_string(), ExportKind::Variable))
                .collect();
        }
        _ => return Vec::new(),
    };

    decl.child_by_field_name("name")
        .and_then(|n| node_text(&n, source))
        .map(|name| vec![(name.to_string(), kind)])
        .unwrap_or_default()
}
