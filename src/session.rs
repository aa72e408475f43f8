//! One analysis run.
//!
//! An [`AnalysisSession`] owns the parsed [`Program`] together with the
//! [`UsageIndex`] and [`FileGraph`] derived from it. The three are built
//! together and only handed out by shared reference, so an index can never
//! be paired with a graph from a different parse.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::analysis::{
    detect_complexity_warnings, detect_dead_code, detect_duplicate_declarations,
    detect_mixed_logic, detect_split_entities, detect_unused_components, detect_unused_functions,
    detect_unused_imports, ComplexityWarning, DeadCode, MixedLogicFile, SplitEntity,
    UnusedComponent, UnusedFunction, UnusedImport, UsageIndex,
};
use crate::config::AnalysisConfig;
use crate::error::{AnalysisResult, Diagnostic};
use crate::graph::{CycleInfo, FileGraph, GraphSnapshot, RelatedFile};
use crate::program::{Program, SourceFile};

/// Counts of each finding category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub files_analyzed: usize,
    pub unused_imports: usize,
    pub unused_functions: usize,
    pub unused_components: usize,
    pub dead_code: usize,
    pub complexity_warnings: usize,
    pub mixed_logic_files: usize,
    pub split_entities: usize,
    pub dependency_cycles: usize,
    pub diagnostics: usize,
}

/// Everything one run found, in deterministic (path, then source) order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub root: String,
    pub generated_at: DateTime<Utc>,
    pub summary: Summary,
    pub unused_imports: Vec<UnusedImport>,
    pub unused_functions: Vec<UnusedFunction>,
    pub unused_components: Vec<UnusedComponent>,
    pub dead_code: Vec<DeadCode>,
    pub complexity_warnings: Vec<ComplexityWarning>,
    pub mixed_logic_files: Vec<MixedLogicFile>,
    pub split_entities: Vec<SplitEntity>,
    pub dependency_cycles: Vec<CycleInfo>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Findings for a single file.
#[derive(Default)]
struct FileFindings {
    unused_imports: Vec<UnusedImport>,
    unused_functions: Vec<UnusedFunction>,
    unused_components: Vec<UnusedComponent>,
    dead_code: Vec<DeadCode>,
    complexity_warnings: Vec<ComplexityWarning>,
    mixed_logic: Option<MixedLogicFile>,
    diagnostics: Vec<Diagnostic>,
}

/// A program snapshot plus everything derived from it.
///
/// # Example
///
/// ```rust
/// use codelens::config::AnalysisConfig;
/// use codelens::program::Program;
/// use codelens::session::AnalysisSession;
///
/// let program = Program::from_sources(
///     "/app",
///     vec![
///         ("/app/hooks.ts", "export function useState() {}\nexport function useEffect() {}"),
///         ("/app/main.ts", "import { useState, useEffect } from './hooks';\nuseState();"),
///     ],
/// );
/// let session = AnalysisSession::from_program(AnalysisConfig::new("/app"), program);
/// let report = session.analyze();
///
/// assert_eq!(report.unused_imports.len(), 1);
/// assert_eq!(report.unused_imports[0].name, "useEffect");
/// ```
#[derive(Debug)]
pub struct AnalysisSession {
    config: AnalysisConfig,
    program: Program,
    usage: UsageIndex,
    graph: FileGraph,
}

impl AnalysisSession {
    /// Validates `config`, parses the program and builds the index and graph.
    pub fn open(config: AnalysisConfig) -> AnalysisResult<Self> {
        let program = Program::load(&config)?;
        Ok(Self::from_program(config, program))
    }

    /// Builds a session over an already parsed program.
    pub fn from_program(config: AnalysisConfig, program: Program) -> Self {
        let (usage, graph) = rayon::join(
            || UsageIndex::build(&program),
            || FileGraph::build(&program),
        );
        info!(
            files = program.len(),
            names = usage.len(),
            edges = graph.edge_count(),
            "analysis session ready"
        );
        Self {
            config,
            program,
            usage,
            graph,
        }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn usage(&self) -> &UsageIndex {
        &self.usage
    }

    pub fn graph(&self) -> &FileGraph {
        &self.graph
    }

    /// Root-relative display form of a path.
    pub fn display_path(&self, path: &Path) -> String {
        self.program.display_path(path)
    }

    /// Runs every detector and assembles the report.
    ///
    /// Per-file work runs on the rayon pool; results are collected in
    /// file order. A detector that panics on a file costs only that file's
    /// findings and leaves a diagnostic behind.
    pub fn analyze(&self) -> AnalysisReport {
        let files: Vec<&SourceFile> = self.program.files().collect();
        let per_file: Vec<FileFindings> = files
            .par_iter()
            .map(|file| {
                guarded(Some(file.path.as_path()), "file analysis", || self.analyze_file(file))
                    .unwrap_or_else(|diagnostic| FileFindings {
                        diagnostics: vec![diagnostic],
                        ..FileFindings::default()
                    })
            })
            .collect();

        let mut diagnostics: Vec<Diagnostic> = self.program.diagnostics().to_vec();
        let split_entities = guarded(None, "split-entity detection", || {
            detect_split_entities(&self.program)
        })
        .unwrap_or_else(|d| {
            diagnostics.push(d);
            Vec::new()
        });
        let dependency_cycles = self.cycles().unwrap_or_else(|d| {
            diagnostics.push(d);
            Vec::new()
        });

        let mut report = AnalysisReport {
            root: self.program.root().display().to_string(),
            generated_at: Utc::now(),
            summary: Summary::default(),
            unused_imports: Vec::new(),
            unused_functions: Vec::new(),
            unused_components: Vec::new(),
            dead_code: Vec::new(),
            complexity_warnings: Vec::new(),
            mixed_logic_files: Vec::new(),
            split_entities,
            dependency_cycles,
            diagnostics: Vec::new(),
        };

        for findings in per_file {
            report.unused_imports.extend(findings.unused_imports);
            report.unused_functions.extend(findings.unused_functions);
            report.unused_components.extend(findings.unused_components);
            report.dead_code.extend(findings.dead_code);
            report.complexity_warnings.extend(findings.complexity_warnings);
            report.mixed_logic_files.extend(findings.mixed_logic);
            diagnostics.extend(findings.diagnostics);
        }
        report.diagnostics = diagnostics;
        report.summary = Summary {
            files_analyzed: self.program.len(),
            unused_imports: report.unused_imports.len(),
            unused_functions: report.unused_functions.len(),
            unused_components: report.unused_components.len(),
            dead_code: report.dead_code.len(),
            complexity_warnings: report.complexity_warnings.len(),
            mixed_logic_files: report.mixed_logic_files.len(),
            split_entities: report.split_entities.len(),
            dependency_cycles: report.dependency_cycles.len(),
            diagnostics: report.diagnostics.len(),
        };

        info!(
            unused_imports = report.summary.unused_imports,
            unused_functions = report.summary.unused_functions,
            cycles = report.summary.dependency_cycles,
            diagnostics = report.summary.diagnostics,
            "analysis complete"
        );
        report
    }

    /// Import cycles, or a diagnostic if cycle detection failed.
    pub fn cycles(&self) -> Result<Vec<CycleInfo>, Diagnostic> {
        guarded(None, "cycle detection", || self.graph.detect_cycles())
    }

    /// Shortest import chain from `from` to `to`; `Ok(None)` when unreachable.
    pub fn find_path(
        &self,
        from: &Path,
        to: &Path,
    ) -> Result<Option<Vec<PathBuf>>, Diagnostic> {
        guarded(Some(from), "path search", || self.graph.find_path(from, to))
    }

    /// Files sharing at least `min_shared` direct import targets with `file`.
    pub fn related_files(
        &self,
        file: &Path,
        min_shared: usize,
    ) -> Result<Vec<RelatedFile>, Diagnostic> {
        guarded(Some(file), "related-file search", || {
            self.graph.related_files(file, min_shared)
        })
    }

    /// Serializable snapshot of the import graph.
    pub fn snapshot(&self) -> GraphSnapshot {
        self.graph.snapshot()
    }

    fn analyze_file(&self, file: &SourceFile) -> FileFindings {
        debug!(file = %file.path.display(), "analyzing file");
        FileFindings {
            unused_imports: detect_unused_imports(file),
            unused_functions: detect_unused_functions(file, &self.usage),
            unused_components: detect_unused_components(file, &self.usage),
            dead_code: detect_dead_code(file, &self.usage),
            complexity_warnings: detect_complexity_warnings(file, self.config.complexity_threshold),
            mixed_logic: detect_mixed_logic(file, self.config.mixed_logic_threshold),
            diagnostics: detect_duplicate_declarations(file),
        }
    }
}

/// Runs `work`, turning a panic into an internal-error diagnostic.
pub fn guarded<T>(
    file: Option<&Path>,
    what: &str,
    work: impl FnOnce() -> T,
) -> Result<T, Diagnostic> {
    panic::catch_unwind(AssertUnwindSafe(work)).map_err(|payload| {
        let message = format!("{} failed: {}", what, panic_message(payload.as_ref()));
        match file {
            Some(path) => warn!(file = %path.display(), "{}", message),
            None => warn!("{}", message),
        }
        Diagnostic::internal(file, message)
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DiagnosticKind;
    use std::fs;

    fn session(sources: Vec<(&str, &str)>) -> AnalysisSession {
        let program = Program::from_sources("/app", sources);
        AnalysisSession::from_program(AnalysisConfig::new("/app"), program)
    }

    fn fixture() -> Vec<(&'static str, &'static str)> {
        vec![
            (
                "/app/src/hooks.js",
                "export function useState() {}\nexport function useEffect() {}\nexport function useMemo() {}",
            ),
            (
                "/app/src/App.jsx",
                "import { Header } from './Header';\nimport { useState, useEffect } from './hooks';\n\nexport function App() {\n  const [v] = useState();\n  return <Header value={v} />;\n}",
            ),
            (
                "/app/src/Header.jsx",
                "import { App } from './App';\nexport const Header = () => <h1>{App.name}</h1>;\nexport const Footer = () => <footer />;",
            ),
            ("/app/src/broken.js", "export const = ;"),
        ]
    }

    #[test]
    fn test_end_to_end_report() {
        let report = session(fixture()).analyze();

        assert_eq!(report.summary.files_analyzed, 3);
        assert_eq!(report.unused_imports.len(), 1);
        let unused = &report.unused_imports[0];
        assert_eq!(unused.name, "useEffect");
        assert_eq!(unused.line, 2);
        assert_eq!(unused.module, "./hooks");

        let functions: Vec<&str> = report
            .unused_functions
            .iter()
            .map(|f| f.name.as_str())
            .collect();
        assert_eq!(functions, vec!["useMemo"]);
        let components: Vec<&str> = report
            .unused_components
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(components, vec!["Footer"]);

        assert_eq!(report.dependency_cycles.len(), 1);
        assert_eq!(
            report.dependency_cycles[0].nodes,
            vec!["src/App.jsx", "src/Header.jsx"]
        );
        assert_eq!(report.diagnostics.len(), 1);
        assert_eq!(report.diagnostics[0].kind, DiagnosticKind::ParseFailure);
    }

    #[test]
    fn test_analysis_is_idempotent_modulo_timestamp() {
        let first = session(fixture());
        let second = session(fixture());

        let mut a = first.analyze();
        let b = second.analyze();
        a.generated_at = b.generated_at;
        assert_eq!(a, b);
        assert_eq!(first.snapshot(), second.snapshot());
    }

    #[test]
    fn test_duplicate_declarations_become_diagnostics() {
        let report = session(vec![(
            "/app/a.js",
            "var handler = function () {};\nvar handler = function () {};",
        )])
        .analyze();
        assert!(report
            .diagnostics
            .iter()
            .any(|d| d.kind == DiagnosticKind::DuplicateDeclaration));
    }

    #[test]
    fn test_graph_queries_through_session() {
        let session = session(vec![
            ("/app/a.ts", "import { b } from './b';\nimport { c } from './c';\nexport const a = b + c;"),
            ("/app/b.ts", "import { c } from './c';\nexport const b = c;"),
            ("/app/c.ts", "export const c = 1;"),
            ("/app/d.ts", "import { b } from './b';\nimport { c } from './c';\nexport const d = b + c;"),
        ]);

        let chain = session
            .find_path(Path::new("/app/a.ts"), Path::new("/app/c.ts"))
            .unwrap();
        assert_eq!(chain, Some(vec![PathBuf::from("/app/a.ts"), PathBuf::from("/app/c.ts")]));
        assert_eq!(
            session
                .find_path(Path::new("/app/c.ts"), Path::new("/app/a.ts"))
                .unwrap(),
            None
        );

        let related = session.related_files(Path::new("/app/a.ts"), 2).unwrap();
        assert_eq!(related.len(), 1);
        assert_eq!(related[0].path, PathBuf::from("/app/d.ts"));
    }

    #[test]
    fn test_guarded_converts_panics() {
        let ok = guarded(None, "work", || 7);
        assert_eq!(ok, Ok(7));

        let failed: Result<(), Diagnostic> =
            guarded(Some(Path::new("/app/a.ts")), "work", || panic!("boom"));
        let diagnostic = failed.unwrap_err();
        assert_eq!(diagnostic.kind, DiagnosticKind::InternalInvariantViolation);
        assert_eq!(diagnostic.message, "work failed: boom");
        assert_eq!(diagnostic.file.as_deref(), Some(Path::new("/app/a.ts")));
    }

    #[test]
    fn test_open_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::create_dir_all(dir.path().join("node_modules/lib")).unwrap();
        fs::write(
            dir.path().join("src/main.ts"),
            "import { unused } from './util';\nexport const main = 1;",
        )
        .unwrap();
        fs::write(dir.path().join("src/util.ts"), "export const unused = 2;").unwrap();
        fs::write(dir.path().join("node_modules/lib/index.js"), "export const x = 1;").unwrap();

        let session = AnalysisSession::open(AnalysisConfig::new(dir.path())).unwrap();
        assert_eq!(session.program().len(), 2);
        assert_eq!(session.graph().edge_count(), 1);

        let report = session.analyze();
        assert_eq!(report.unused_imports.len(), 1);
        assert_eq!(report.unused_imports[0].name, "unused");
    }
}
