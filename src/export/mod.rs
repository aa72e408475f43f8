//! Export functionality for analysis results.
//!
//! This module provides exporters for a finished run: a JSON document and
//! a fixed-section text report for the findings, plus Mermaid, GraphML and
//! DOT renderings of the import graph. Every exporter is a pure function of
//! [`ExportData`]; the only run-dependent text is the embedded timestamp.

pub mod dot;
pub mod graphml;
pub mod json;
pub mod mermaid;
pub mod text;

use std::collections::BTreeSet;
use std::io::{self, Write};

use chrono::SecondsFormat;

use crate::graph::{CycleInfo, GraphSnapshot};
use crate::session::{AnalysisReport, AnalysisSession};

/// Export format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    /// JSON document with findings, graph and cycles
    Json,
    /// Human-readable report
    #[default]
    Text,
    /// Mermaid flowchart of the import graph
    Mermaid,
    /// GraphML (XML) import graph
    GraphMl,
    /// Graphviz DOT import graph
    Dot,
}

impl std::str::FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "text" | "txt" => Ok(ExportFormat::Text),
            "mermaid" | "mmd" => Ok(ExportFormat::Mermaid),
            "graphml" | "xml" => Ok(ExportFormat::GraphMl),
            "dot" | "graphviz" => Ok(ExportFormat::Dot),
            _ => Err(format!(
                "Unknown export format: '{}'. Valid formats: json, text, mermaid, graphml, dot",
                s
            )),
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportFormat::Json => write!(f, "json"),
            ExportFormat::Text => write!(f, "text"),
            ExportFormat::Mermaid => write!(f, "mermaid"),
            ExportFormat::GraphMl => write!(f, "graphml"),
            ExportFormat::Dot => write!(f, "dot"),
        }
    }
}

/// Data container for export operations.
///
/// Holds the report and the graph snapshot of one session.
#[derive(Debug, Clone)]
pub struct ExportData {
    pub report: AnalysisReport,
    pub graph: GraphSnapshot,
}

impl ExportData {
    pub fn new(report: AnalysisReport, graph: GraphSnapshot) -> Self {
        Self { report, graph }
    }

    /// Runs the session's analysis and takes its graph snapshot.
    pub fn from_session(session: &AnalysisSession) -> Self {
        Self::new(session.analyze(), session.snapshot())
    }

    /// Generation time as RFC 3339 with second precision.
    pub fn generated_at(&self) -> String {
        self.report
            .generated_at
            .to_rfc3339_opts(SecondsFormat::Secs, true)
    }

    pub fn cycles(&self) -> &[CycleInfo] {
        &self.report.dependency_cycles
    }

    /// Root-relative paths of files that take part in a detected cycle.
    pub fn cyclic_files(&self) -> BTreeSet<&str> {
        self.cycles()
            .iter()
            .flat_map(|c| c.nodes.iter().map(String::as_str))
            .collect()
    }
}

/// Trait for exporters.
pub trait Exporter {
    /// Export the data to the given writer.
    fn export<W: Write>(&self, data: &ExportData, writer: &mut W) -> io::Result<()>;
}

/// Export data in the specified format.
pub fn export<W: Write>(
    format: ExportFormat,
    data: &ExportData,
    writer: &mut W,
) -> io::Result<()> {
    match format {
        ExportFormat::Json => json::JsonExporter.export(data, writer),
        ExportFormat::Text => text::TextExporter.export(data, writer),
        ExportFormat::Mermaid => mermaid::MermaidExporter.export(data, writer),
        ExportFormat::GraphMl => graphml::GraphMlExporter.export(data, writer),
        ExportFormat::Dot => dot::DotExporter.export(data, writer),
    }
}

/// Export data to a string.
pub fn export_to_string(format: ExportFormat, data: &ExportData) -> io::Result<String> {
    let mut buffer = Vec::new();
    export(format, data, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

/// A small program with one import cycle, an unused import and a parse failure.
#[cfg(test)]
pub(crate) fn sample_data() -> ExportData {
    use crate::config::AnalysisConfig;
    use crate::program::Program;

    let program = Program::from_sources(
        "/app",
        vec![
            (
                "/app/src/a.ts",
                "import { b, unused } from './b';\nexport function a() { return b(); }",
            ),
            (
                "/app/src/b.ts",
                "import { a } from './a';\nexport function b() { return a(); }\nexport const unused = 1;",
            ),
            ("/app/src/View.tsx", "import { a } from './a';\nexport const View = () => <p>{a()}</p>;"),
            ("/app/src/broken.ts", "export const = ;"),
        ],
    );
    ExportData::from_session(&AnalysisSession::from_program(
        AnalysisConfig::new("/app"),
        program,
    ))
}
