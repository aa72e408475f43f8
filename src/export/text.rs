//! Plain-text report.
//!
//! Fixed sections in a fixed order, each with a count in its header and
//! `  none` when empty, followed by a `Generated:` line.

use super::{ExportData, Exporter};
use std::io::{self, Write};
use std::path::Path;

/// Text report exporter.
pub struct TextExporter;

fn heading<W: Write>(writer: &mut W, title: &str, count: usize) -> io::Result<()> {
    let title = format!("{} ({})", title, count);
    writeln!(writer, "{}", title)?;
    writeln!(writer, "{}", "-".repeat(title.len()))
}

fn none_if_empty<W: Write>(writer: &mut W, empty: bool) -> io::Result<()> {
    if empty {
        writeln!(writer, "  none")?;
    }
    Ok(())
}

impl Exporter for TextExporter {
    fn export<W: Write>(&self, data: &ExportData, writer: &mut W) -> io::Result<()> {
        let report = &data.report;
        let root = Path::new(&report.root);
        let rel = |path: &Path| crate::program::display_relative(root, path);

        writeln!(writer, "CODE ANALYSIS REPORT")?;
        writeln!(writer, "{}", "=".repeat(20))?;
        writeln!(writer, "Root: {}", report.root)?;
        writeln!(writer)?;

        let summary = &report.summary;
        writeln!(writer, "SUMMARY")?;
        writeln!(writer, "-------")?;
        let rows = [
            ("Files analyzed", summary.files_analyzed),
            ("Unused imports", summary.unused_imports),
            ("Unused functions", summary.unused_functions),
            ("Unused components", summary.unused_components),
            ("Dead code", summary.dead_code),
            ("Complexity warnings", summary.complexity_warnings),
            ("Mixed logic files", summary.mixed_logic_files),
            ("Split entities", summary.split_entities),
            ("Dependency cycles", summary.dependency_cycles),
            ("Diagnostics", summary.diagnostics),
        ];
        for (label, count) in rows {
            writeln!(writer, "  {:<22}{}", format!("{}:", label), count)?;
        }
        writeln!(writer)?;

        heading(writer, "UNUSED IMPORTS", report.unused_imports.len())?;
        for item in &report.unused_imports {
            let binding = if item.imported_name == item.name {
                item.name.clone()
            } else {
                format!("{} as {}", item.imported_name, item.name)
            };
            writeln!(
                writer,
                "  {}:{}  {} from '{}'",
                rel(&item.file),
                item.line,
                binding,
                item.module
            )?;
        }
        none_if_empty(writer, report.unused_imports.is_empty())?;
        writeln!(writer)?;

        heading(writer, "UNUSED FUNCTIONS", report.unused_functions.len())?;
        for item in &report.unused_functions {
            writeln!(
                writer,
                "  {}:{}  {}{} (complexity {})",
                rel(&item.file),
                item.line,
                item.name,
                if item.exported { " [exported]" } else { "" },
                item.complexity
            )?;
        }
        none_if_empty(writer, report.unused_functions.is_empty())?;
        writeln!(writer)?;

        heading(writer, "UNUSED COMPONENTS", report.unused_components.len())?;
        for item in &report.unused_components {
            writeln!(
                writer,
                "  {}:{}  {}{}",
                rel(&item.file),
                item.line,
                item.name,
                if item.exported { " [exported]" } else { "" }
            )?;
        }
        none_if_empty(writer, report.unused_components.is_empty())?;
        writeln!(writer)?;

        heading(writer, "DEAD CODE", report.dead_code.len())?;
        for item in &report.dead_code {
            writeln!(
                writer,
                "  {}:{}  {} {}",
                rel(&item.file),
                item.line,
                item.kind,
                item.name
            )?;
        }
        none_if_empty(writer, report.dead_code.is_empty())?;
        writeln!(writer)?;

        heading(writer, "COMPLEXITY WARNINGS", report.complexity_warnings.len())?;
        for item in &report.complexity_warnings {
            writeln!(
                writer,
                "  {}:{}  {} {} has complexity {} (threshold {})",
                rel(&item.file),
                item.line,
                item.kind,
                item.name,
                item.complexity,
                item.threshold
            )?;
        }
        none_if_empty(writer, report.complexity_warnings.is_empty())?;
        writeln!(writer)?;

        heading(writer, "MIXED LOGIC FILES", report.mixed_logic_files.len())?;
        for item in &report.mixed_logic_files {
            writeln!(
                writer,
                "  {}  {} entities in {} clusters",
                rel(&item.file),
                item.entity_count,
                item.clusters.len()
            )?;
            for cluster in &item.clusters {
                writeln!(
                    writer,
                    "    -> {}: {}",
                    rel(&cluster.suggested_file),
                    cluster.entities.join(", ")
                )?;
            }
        }
        none_if_empty(writer, report.mixed_logic_files.is_empty())?;
        writeln!(writer)?;

        heading(writer, "SPLIT ENTITIES", report.split_entities.len())?;
        for item in &report.split_entities {
            let files: Vec<String> = item.files.iter().map(|f| rel(f)).collect();
            writeln!(
                writer,
                "  {}*  {} across {}",
                item.prefix,
                item.entities.join(", "),
                files.join(", ")
            )?;
        }
        none_if_empty(writer, report.split_entities.is_empty())?;
        writeln!(writer)?;

        heading(writer, "DEPENDENCY CYCLES", data.cycles().len())?;
        for cycle in data.cycles() {
            writeln!(writer, "  [{}] {}", cycle.severity, cycle.cycle_path())?;
        }
        none_if_empty(writer, data.cycles().is_empty())?;
        writeln!(writer)?;

        heading(writer, "DIAGNOSTICS", report.diagnostics.len())?;
        for diagnostic in &report.diagnostics {
            match &diagnostic.file {
                Some(file) => writeln!(
                    writer,
                    "  {}  {}: {}",
                    rel(file),
                    diagnostic.kind,
                    diagnostic.message
                )?,
                None => writeln!(writer, "  {}: {}", diagnostic.kind, diagnostic.message)?,
            }
        }
        none_if_empty(writer, report.diagnostics.is_empty())?;
        writeln!(writer)?;

        writeln!(writer, "Generated: {}", data.generated_at())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::sample_data;

    fn render() -> String {
        let mut output = Vec::new();
        TextExporter.export(&sample_data(), &mut output).unwrap();
        String::from_utf8(output).unwrap()
    }

    #[test]
    fn test_sections_in_order() {
        let text = render();
        let sections = [
            "CODE ANALYSIS REPORT",
            "SUMMARY",
            "UNUSED IMPORTS (1)",
            "UNUSED FUNCTIONS (0)",
            "UNUSED COMPONENTS (1)",
            "DEAD CODE (0)",
            "COMPLEXITY WARNINGS (0)",
            "MIXED LOGIC FILES (0)",
            "SPLIT ENTITIES (0)",
            "DEPENDENCY CYCLES (1)",
            "DIAGNOSTICS (1)",
            "Generated: ",
        ];
        let mut last = 0;
        for section in sections {
            let at = text[last..]
                .find(section)
                .unwrap_or_else(|| panic!("missing or out of order: {}", section));
            last += at + section.len();
        }
    }

    #[test]
    fn test_entries_use_relative_paths() {
        let text = render();
        assert!(text.contains("  src/a.ts:1  unused from './b'"));
        assert!(text.contains("  src/View.tsx:2  View [exported]"));
        assert!(text.contains("  [high] src/a.ts -> src/b.ts -> src/a.ts"));
        assert!(text.contains("  src/broken.ts  parse failure: "));
        assert!(text.contains("  none"));
    }

    #[test]
    fn test_aliased_imports_show_exported_name_first() {
        use crate::config::AnalysisConfig;
        use crate::program::Program;
        use crate::session::AnalysisSession;

        let program = Program::from_sources(
            "/app",
            vec![
                ("/app/hooks.js", "export default function React() {}\nexport function useEffect() {}"),
                (
                    "/app/main.js",
                    "import React, { useEffect as effect } from './hooks';\nimport * as all from './hooks';\nexport const main = 1;",
                ),
            ],
        );
        let data = ExportData::from_session(&AnalysisSession::from_program(
            AnalysisConfig::new("/app"),
            program,
        ));
        let mut output = Vec::new();
        TextExporter.export(&data, &mut output).unwrap();
        let text = String::from_utf8(output).unwrap();

        assert!(text.contains("  main.js:1  default as React from './hooks'"));
        assert!(text.contains("  main.js:1  useEffect as effect from './hooks'"));
        assert!(text.contains("  main.js:2  * as all from './hooks'"));
    }

    #[test]
    fn test_summary_counts() {
        let text = render();
        assert!(text.contains("  Files analyzed:       3"));
        assert!(text.contains("  Dependency cycles:    1"));
    }

    #[test]
    fn test_ends_with_timestamp() {
        let text = render();
        let last = text.lines().last().unwrap();
        assert!(last.starts_with("Generated: "));
    }
}
