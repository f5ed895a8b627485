//! JSON output formatting.

use serde::Serialize;
use t2t_lineage_core::{Diagnostics, LineageEdge};

#[derive(Serialize)]
struct Report<'a> {
    edges: &'a [LineageEdge],
    diagnostics: &'a Diagnostics,
}

/// Format the resolved edges and diagnostics as JSON.
///
/// If `compact` is true, outputs minified JSON without whitespace.
pub fn format_json(edges: &[LineageEdge], diagnostics: &Diagnostics, compact: bool) -> String {
    let report = Report { edges, diagnostics };
    if compact {
        serde_json::to_string(&report).expect("serialization cannot fail")
    } else {
        serde_json::to_string_pretty(&report).expect("serialization cannot fail")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use t2t_lineage_core::RowType;

    fn edge() -> LineageEdge {
        LineageEdge {
            object_name: "OBJ".to_string(),
            row_type: RowType::Mapping,
            dest_table: Some("DST".to_string()),
            dest_field: Some("X".to_string()),
            source_type: t2t_lineage_core::SourceType::Physical,
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
    fn pretty_output_has_newlines() {
        let json = format_json(&[edge()], &Diagnostics::new(), false);
        assert!(json.contains('\n'));
        assert!(json.contains("edges"));
    }

    #[test]
    fn compact_output_has_no_leading_newline() {
        let json = format_json(&[edge()], &Diagnostics::new(), true);
        assert!(!json.starts_with("{\n"));
    }
}
