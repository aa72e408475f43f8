//! JSON export implementation.
//!
//! Writes one pretty-printed document: `{generatedAt, root, analysis, graph, cycles}`.

use super::{ExportData, Exporter};
use crate::graph::{CycleSeverity, GraphSnapshot};
use crate::session::AnalysisReport;
use serde::Serialize;
use std::io::{self, Write};

/// JSON exporter implementation.
pub struct JsonExporter;

/// Serializable cycle info for JSON output.
#[derive(Serialize)]
struct JsonCycle<'a> {
    files: &'a [String],
    path: String,
    severity: CycleSeverity,
}

/// Root JSON export structure.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonExport<'a> {
    generated_at: String,
    root: &'a str,
    analysis: &'a AnalysisReport,
    graph: &'a GraphSnapshot,
    cycles: Vec<JsonCycle<'a>>,
}

impl Exporter for JsonExporter {
    fn export<W: Write>(&self, data: &ExportData, writer: &mut W) -> io::Result<()> {
        let cycles = data
            .cycles()
            .iter()
            .map(|c| JsonCycle {
                files: &c.nodes,
                path: c.cycle_path(),
                severity: c.severity,
            })
            .collect();

        let export = JsonExport {
            generated_at: data.generated_at(),
            root: &data.report.root,
            analysis: &data.report,
            graph: &data.graph,
            cycles,
        };

        let json = serde_json::to_string_pretty(&export)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        writeln!(writer, "{}", json)
    }
}
