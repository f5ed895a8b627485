//! Human-readable table output formatting.

use is_terminal::IsTerminal;
use owo_colors::OwoColorize;
use std::fmt::Write;
use t2t_lineage_core::{Diagnostics, LineageEdge, RowType, SourceType};
use tabled::settings::Style;
use tabled::{Table, Tabled};

#[derive(Tabled)]
struct EdgeRow {
    #[tabled(rename = "OBJECT")]
    object_name: String,
    #[tabled(rename = "TYPE")]
    row_type: String,
    #[tabled(rename = "DEST")]
    dest: String,
    #[tabled(rename = "SOURCE")]
    source: String,
    #[tabled(rename = "DM")]
    dm_match: String,
    #[tabled(rename = "TRACE")]
    trace_path: String,
}

impl From<&LineageEdge> for EdgeRow {
    fn from(edge: &LineageEdge) -> Self {
        let dest = match (&edge.dest_table, &edge.dest_field) {
            (Some(t), Some(f)) => format!("{t}.{f}"),
            _ => format!("[{}]", edge.join_owning_scope.as_deref().unwrap_or("-")),
        };
        let source = match edge.source_type {
            SourceType::Physical => format!(
                "{}.{}",
                edge.source_table.as_deref().unwrap_or("?"),
                edge.source_field.as_deref().unwrap_or("?")
            ),
            SourceType::Constant => edge.constant_value.clone().unwrap_or_default(),
            SourceType::Unresolved => "UNRESOLVED".to_string(),
        };
        EdgeRow {
            object_name: edge.object_name.clone(),
            row_type: match edge.row_type {
                RowType::Mapping => "MAPPING".to_string(),
                RowType::Join => edge
                    .join_kind
                    .clone()
                    .map(|k| format!("JOIN/{k}"))
                    .unwrap_or_else(|| "JOIN".to_string()),
            },
            dest,
            source,
            dm_match: if edge.dm_match { "Y".to_string() } else { "N".to_string() },
            trace_path: edge.trace_path.clone(),
        }
    }
}

/// Format resolved edges and diagnostics as a human-readable table, with
/// optional ANSI colors when stdout is a terminal.
pub fn format_table(edges: &[LineageEdge], diagnostics: &Diagnostics, quiet: bool) -> String {
    let colored = std::io::stdout().is_terminal();
    let mut out = String::new();

    write_header(&mut out, colored);
    write_edges(&mut out, edges);

    if !quiet {
        write_warnings(&mut out, diagnostics, colored);
    }

    out
}

fn write_header(out: &mut String, colored: bool) {
    let title = "T2T Lineage";
    let line = "=".repeat(40);
    if colored {
        writeln!(out, "{}", title.bold()).unwrap();
        writeln!(out, "{}", line.dimmed()).unwrap();
    } else {
        writeln!(out, "{title}").unwrap();
        writeln!(out, "{line}").unwrap();
    }
}

fn write_edges(out: &mut String, edges: &[LineageEdge]) {
    if edges.is_empty() {
        writeln!(out, "(no edges)").unwrap();
        return;
    }
    let rows: Vec<EdgeRow> = edges.iter().map(EdgeRow::from).collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    writeln!(out, "{table}").unwrap();
}

fn write_warnings(out: &mut String, diagnostics: &Diagnostics, colored: bool) {
    if diagnostics.warnings.is_empty() {
        return;
    }
    writeln!(out).unwrap();
    let header = format!("{} warning(s):", diagnostics.warnings.len());
    if colored {
        writeln!(out, "{}", header.yellow()).unwrap();
    } else {
        writeln!(out, "{header}").unwrap();
    }
    for warning in &diagnostics.warnings {
        writeln!(out, "  [{}] {}", warning.code, warning.message).unwrap();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use t2t_lineage_core::Warning;

    fn physical_edge() -> LineageEdge {
        LineageEdge {
            object_name: "OBJ".to_string(),
            row_type: RowType::Mapping,
            dest_table: Some("DST".to_string()),
            dest_field: Some("X".to_string()),
            source_type: SourceType::Physical,
            source_table: Some("T_A".to_string()),
            source_field: Some("X".to_string()),
            constant_value: None,
            expression_text: "A.X".to_string(),
            full_expression: "a.x".to_string(),
            dm_match: true,
            trace_path: "a.x".to_string(),
            source_alias: Some("A".to_string()),
            original_ref: "A.X".to_string(),
            join_seq: None,
            join_kind: None,
            join_side: None,
            join_owning_scope: None,
        }
    }

    #[test]
    fn table_contains_resolved_source() {
        let out = format_table(&[physical_edge()], &Diagnostics::new(), true);
        assert!(out.contains("T_A.X"));
        assert!(out.contains("DST.X"));
    }

    #[test]
    fn empty_edges_are_reported() {
        let out = format_table(&[], &Diagnostics::new(), true);
        assert!(out.contains("no edges"));
    }

    #[test]
    fn warnings_render_unless_quiet() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.push_warning(Warning::high_unresolved_rate("OBJ", 3, 10));
        let out = format_table(&[physical_edge()], &diagnostics, false);
        assert!(out.contains("HIGH_UNRESOLVED_RATE"));
        let quiet_out = format_table(&[physical_edge()], &diagnostics, true);
        assert!(!quiet_out.contains("HIGH_UNRESOLVED_RATE"));
    }
}
