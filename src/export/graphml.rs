//! GraphML export.

use super::{ExportData, Exporter};
use std::io::{self, Write};

/// GraphML (XML) exporter.
pub struct GraphMlExporter;

fn escape_xml(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

impl Exporter for GraphMlExporter {
    fn export<W: Write>(&self, data: &ExportData, writer: &mut W) -> io::Result<()> {
        let cyclic = data.cyclic_files();

        writeln!(writer, r#"<?xml version="1.0" encoding="UTF-8"?>"#)?;
        writeln!(writer, "<!-- Generated: {} -->", data.generated_at())?;
        writeln!(
            writer,
            r#"<graphml xmlns="http://graphml.graphdrawing.org/xmlns">"#
        )?;
        writeln!(
            writer,
            r#"  <key id="kind" for="node" attr.name="kind" attr.type="string"/>"#
        )?;
        writeln!(
            writer,
            r#"  <key id="exports" for="node" attr.name="exports" attr.type="string"/>"#
        )?;
        writeln!(
            writer,
            r#"  <key id="inCycle" for="node" attr.name="inCycle" attr.type="boolean"/>"#
        )?;
        writeln!(
            writer,
            r#"  <key id="symbols" for="edge" attr.name="symbols" attr.type="string"/>"#
        )?;
        writeln!(writer, r#"  <graph id="imports" edgedefault="directed">"#)?;

        for (path, node) in &data.graph.nodes {
            writeln!(writer, r#"    <node id="{}">"#, escape_xml(path))?;
            writeln!(writer, r#"      <data key="kind">{}</data>"#, node.kind)?;
            writeln!(
                writer,
                r#"      <data key="exports">{}</data>"#,
                escape_xml(&node.exports.join(", "))
            )?;
            writeln!(
                writer,
                r#"      <data key="inCycle">{}</data>"#,
                cyclic.contains(path.as_str())
            )?;
            writeln!(writer, "    </node>")?;
        }

        for (i, edge) in data.graph.edges.iter().enumerate() {
            writeln!(
                writer,
                r#"    <edge id="e{}" source="{}" target="{}">"#,
                i,
                escape_xml(&edge.from),
                escape_xml(&edge.to)
            )?;
            writeln!(
                writer,
                r#"      <data key="symbols">{}</data>"#,
                escape_xml(&edge.symbols.join(", "))
            )?;
            writeln!(writer, "    </edge>")?;
        }

        writeln!(writer, "  </graph>")?;
        writeln!(writer, "</graphml>")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::sample_data;

    fn render() -> String {
        let mut output = Vec::new();
        GraphMlExporter.export(&sample_data(), &mut output).unwrap();
        String::from_utf8(output).unwrap()
    }

    #[test]
    fn test_graphml_document() {
        let text = render();
        assert!(text.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
        assert!(text.contains("<!-- Generated: "));
        assert!(text.trim_end().ends_with("</graphml>"));
        assert_eq!(text.matches("<node id=").count(), 3);
        assert_eq!(text.matches("<edge id=").count(), 3);
    }

    #[test]
    fn test_graphml_attributes() {
        let text = render();
        assert!(text.contains(
            "    <node id=\"src/a.ts\">\n      <data key=\"kind\">function-module</data>\n      <data key=\"exports\">a</data>\n      <data key=\"inCycle\">true</data>"
        ));
        assert!(text.contains(r#"<edge id="e0" source="src/View.tsx" target="src/a.ts">"#));
    }

    #[test]
    fn test_escape_xml() {
        assert_eq!(escape_xml(r#"<a & "b">"#), "&lt;a &amp; &quot;b&quot;&gt;");
    }
}
