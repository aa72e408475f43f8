//! Graphviz DOT export.

use super::{ExportData, Exporter};
use crate::graph::NodeKind;
use std::io::{self, Write};

/// DOT `digraph` exporter.
pub struct DotExporter;

fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

impl Exporter for DotExporter {
    fn export<W: Write>(&self, data: &ExportData, writer: &mut W) -> io::Result<()> {
        let cyclic = data.cyclic_files();

        writeln!(writer, "// Generated: {}", data.generated_at())?;
        writeln!(writer, "digraph imports {{")?;
        writeln!(writer, "  rankdir=LR;")?;
        writeln!(writer, "  node [shape=box, fontname=\"Helvetica\"];")?;

        for (path, node) in &data.graph.nodes {
            let fill = match node.kind {
                NodeKind::ComponentModule => "#e3f2fd",
                NodeKind::FunctionModule => "#e8f5e9",
                NodeKind::Module => "#f5f5f5",
            };
            let color = if cyclic.contains(path.as_str()) {
                "#e53935"
            } else {
                "#616161"
            };
            writeln!(
                writer,
                "  {} [kind={}, style=filled, fillcolor={}, color={}];",
                quote(path),
                quote(&node.kind.to_string()),
                quote(fill),
                quote(color)
            )?;
        }

        for edge in &data.graph.edges {
            if edge.symbols.is_empty() {
                writeln!(writer, "  {} -> {};", quote(&edge.from), quote(&edge.to))?;
            } else {
                writeln!(
                    writer,
                    "  {} -> {} [label={}];",
                    quote(&edge.from),
                    quote(&edge.to),
                    quote(&edge.symbols.join(", "))
                )?;
            }
        }

        writeln!(writer, "}}")
    }
}
