//! Mermaid flowchart export.

use super::{ExportData, Exporter};
use crate::graph::NodeKind;
use std::collections::HashMap;
use std::io::{self, Write};

/// Mermaid `graph LR` exporter.
pub struct MermaidExporter;

fn escape_label(label: &str) -> String {
    label.replace('"', "#quot;")
}

impl Exporter for MermaidExporter {
    fn export<W: Write>(&self, data: &ExportData, writer: &mut W) -> io::Result<()> {
        let cyclic = data.cyclic_files();

        writeln!(writer, "%% Generated: {}", data.generated_at())?;
        writeln!(writer, "graph LR")?;

        // Node ids follow the sorted node order.
        let mut ids: HashMap<&str, String> = HashMap::new();
        for (i, (path, node)) in data.graph.nodes.iter().enumerate() {
            let id = format!("n{}", i);
            writeln!(writer, "  {}[\"{}\"]", id, escape_label(path))?;
            let class = if cyclic.contains(path.as_str()) {
                "cyclic"
            } else {
                match node.kind {
                    NodeKind::ComponentModule => "component",
                    NodeKind::FunctionModule => "function",
                    NodeKind::Module => "module",
                }
            };
            writeln!(writer, "  class {} {}", id, class)?;
            ids.insert(path.as_str(), id);
        }

        for edge in &data.graph.edges {
            let (Some(from), Some(to)) = (ids.get(edge.from.as_str()), ids.get(edge.to.as_str()))
            else {
                continue;
            };
            if edge.symbols.is_empty() {
                writeln!(writer, "  {} --> {}", from, to)?;
            } else {
                writeln!(
                    writer,
                    "  {} -->|\"{}\"| {}",
                    from,
                    escape_label(&edge.symbols.join(", ")),
                    to
                )?;
            }
        }

        writeln!(writer, "  classDef component fill:#e3f2fd,stroke:#1e88e5")?;
        writeln!(writer, "  classDef function fill:#e8f5e9,stroke:#43a047")?;
        writeln!(writer, "  classDef module fill:#f5f5f5,stroke:#9e9e9e")?;
        writeln!(writer, "  classDef cyclic fill:#ffebee,stroke:#e53935")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::sample_data;

    fn render() -> String {
        let mut output = Vec::new();
        MermaidExporter.export(&sample_data(), &mut output).unwrap();
        String::from_utf8(output).unwrap()
    }

    #[test]
    fn test_mermaid_header_and_nodes() {
        let text = render();
        let mut lines = text.lines();
        assert!(lines.next().unwrap().starts_with("%% Generated: "));
        assert_eq!(lines.next(), Some("graph LR"));
        assert!(text.contains("  n0[\"src/View.tsx\"]\n  class n0 component"));
        assert!(text.contains("  class n1 cyclic"));
    }

    #[test]
    fn test_mermaid_edges_carry_symbols() {
        let text = render();
        assert!(text.contains("  n0 -->|\"a\"| n1"));
        assert!(text.contains("  n1 -->|\"b, unused\"| n2"));
        assert!(text.contains("  n2 -->|\"a\"| n1"));
    }

    #[test]
    fn test_escape_label() {
        assert_eq!(escape_label("a\"b"), "a#quot;b");
    }
}
