//! Mapping Driver (§4.7): turns declared mapping rows into `LineageEdge`s
//! by driving each row's source expression through the resolver, appends
//! join edges from the join resolver, and accumulates per-object
//! [`Diagnostics`].

use crate::joins::resolve_joins;
use crate::resolver::{resolve_expression, ResolverCtx};
use crate::scope_builder::ScopeArena;
use crate::types::{ColumnRef, DataModel, Diagnostics, LineageEdge, MappingRow, ResolvedColumn, RowType, SourceType};

/// Runs the Mapping Driver over every row, then appends join edges.
///
/// `root` is the scope tree's root id; mapping-row expressions and direct
/// source references are resolved starting from it, matching the scope
/// the mapping contract's declared columns describe the top-level SELECT
/// against.
#[cfg_attr(feature = "tracing", tracing::instrument(skip_all, fields(rows = rows.len())))]
pub(crate) fn drive(
    rows: &[MappingRow],
    arena: &ScopeArena,
    root: usize,
    data_model: Option<&DataModel>,
    max_depth: usize,
) -> (Vec<LineageEdge>, Diagnostics) {
    let ctx = ResolverCtx::new(arena, data_model).with_max_depth(max_depth);
    let mut edges = Vec::new();
    let mut diagnostics = Diagnostics::new();

    for row in rows {
        let row_edges = drive_row(&ctx, root, data_model, row);
        for edge in &row_edges {
            diagnostics.record_edge(edge);
        }
        edges.extend(row_edges);
    }

    for resolved in resolve_joins(arena, data_model, max_depth) {
        let edge = join_edge(resolved);
        diagnostics.record_edge(&edge);
        edges.push(edge);
    }

    diagnostics.finalize_high_unresolved_warnings();
    (edges, diagnostics)
}

fn drive_row(
    ctx: &ResolverCtx<'_>,
    root: usize,
    data_model: Option<&DataModel>,
    row: &MappingRow,
) -> Vec<LineageEdge> {
    if row.is_direct_mapping() {
        return drive_direct_mapping(ctx, root, data_model, row);
    }
    drive_expression_mapping(ctx, root, row)
}

/// Direct mapping (§4.7): try the declared `source_table.source_field`
/// through the scope tree first — it may turn out to be a real alias in
/// the query. Only when every result comes back `Unresolved` do we trust
/// the mapping row's own declaration and emit a single `DIRECT_MAPPING`
/// edge.
fn drive_direct_mapping(
    ctx: &ResolverCtx<'_>,
    root: usize,
    data_model: Option<&DataModel>,
    row: &MappingRow,
) -> Vec<LineageEdge> {
    let source_table = row.source_table.clone().unwrap_or_default();
    let source_field = row.source_field.clone().unwrap_or_default();
    let cref = ColumnRef::qualified(source_table.clone(), source_field.clone());

    let results = ctx.resolve(&cref, root);
    if !results.is_empty() && results.iter().any(|r| !r.is_unresolved()) {
        return results
            .into_iter()
            .map(|resolved| mapping_edge(row, cref.display(), resolved))
            .collect();
    }

    let dm_match = data_model.is_some_and(|dm| dm.matches(&source_table, &source_field));
    let fallback = ResolvedColumn::Physical {
        table: source_table,
        column: source_field,
        dm_match,
        trace_path: "DIRECT_MAPPING".to_string(),
        source_alias: None,
        original_ref: cref.display(),
    };
    vec![mapping_edge(row, cref.display(), fallback)]
}

/// Expression mapping (§4.7): the row's own `expression_text`, falling
/// back to `source_field` then `destination_field` when no expression was
/// declared, driven through the resolver's fallback ladder.
fn drive_expression_mapping(ctx: &ResolverCtx<'_>, root: usize, row: &MappingRow) -> Vec<LineageEdge> {
    let expression_text = row
        .expression_text
        .clone()
        .or_else(|| row.source_field.clone())
        .unwrap_or_else(|| row.destination_field.clone());

    resolve_expression(ctx, &expression_text, root)
        .into_iter()
        .map(|resolved| mapping_edge(row, expression_text.clone(), resolved))
        .collect()
}

fn mapping_edge(row: &MappingRow, full_expression: String, resolved: ResolvedColumn) -> LineageEdge {
    let (source_type, source_table, source_field, constant_value, dm_match, trace_path, source_alias, original_ref) =
        split_resolved(resolved);

    LineageEdge {
        object_name: row.object_name.clone(),
        row_type: RowType::Mapping,
        dest_table: Some(row.destination_table.clone()),
        dest_field: Some(row.destination_field.clone()),
        source_type,
        source_table,
        source_field,
        constant_value,
        expression_text: original_ref,
        full_expression,
        dm_match,
        trace_path,
        source_alias,
        original_ref: row
            .source_table
            .as_deref()
            .zip(row.source_field.as_deref())
            .map(|(t, f)| format!("{t}.{f}"))
            .unwrap_or_default(),
        join_seq: None,
        join_kind: None,
        join_side: None,
        join_owning_scope: None,
    }
}

fn join_edge(resolved: crate::types::JoinKeyResolved) -> LineageEdge {
    let crate::types::JoinKeyResolved {
        seq,
        kind,
        owning_scope,
        side,
        condition_text,
        resolved,
        ..
    } = resolved;

    let (source_type, source_table, source_field, constant_value, dm_match, trace_path, source_alias, original_ref) =
        split_resolved(resolved);

    LineageEdge {
        object_name: owning_scope.clone(),
        row_type: RowType::Join,
        dest_table: None,
        dest_field: None,
        source_type,
        source_table,
        source_field,
        constant_value,
        expression_text: original_ref,
        full_expression: condition_text,
        dm_match,
        trace_path,
        source_alias,
        original_ref: String::new(),
        join_seq: Some(seq),
        join_kind: Some(kind.as_str().to_string()),
        join_side: Some(side),
        join_owning_scope: Some(owning_scope),
    }
}

#[allow(clippy::type_complexity)]
fn split_resolved(
    resolved: ResolvedColumn,
) -> (
    SourceType,
    Option<String>,
    Option<String>,
    Option<String>,
    bool,
    String,
    Option<String>,
    String,
) {
    match resolved {
        ResolvedColumn::Physical {
            table,
            column,
            dm_match,
            trace_path,
            source_alias,
            original_ref,
        } => (
            SourceType::Physical,
            Some(table),
            Some(column),
            None,
            dm_match,
            trace_path,
            source_alias,
            original_ref,
        ),
        ResolvedColumn::Constant {
            literal_text,
            trace_path,
        } => (
            SourceType::Constant,
            None,
            None,
            Some(literal_text.clone()),
            false,
            trace_path,
            None,
            literal_text,
        ),
        ResolvedColumn::Unresolved {
            trace_path,
            failing_ref,
            ..
        } => (
            SourceType::Unresolved,
            None,
            None,
            None,
            false,
            trace_path,
            None,
            failing_ref,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_select;
    use crate::scope_builder::build_scope_tree;

    fn row(
        object_name: &str,
        dest_table: &str,
        dest_field: &str,
        expression: Option<&str>,
        source_table: Option<&str>,
        source_field: Option<&str>,
    ) -> MappingRow {
        MappingRow {
            object_name: object_name.to_string(),
            destination_table: dest_table.to_string(),
            destination_field: dest_field.to_string(),
            expression_text: expression.map(str::to_string),
            source_table: source_table.map(str::to_string),
            source_field: source_field.map(str::to_string),
            constant_value: None,
        }
    }

    #[test]
    fn s1_direct_mapping_bypassed_expression() {
        let stmt = parse_select("SELECT x FROM t").unwrap();
        let (arena, root) = build_scope_tree(&stmt, None);
        let mut dm = DataModel::new();
        dm.insert_table("SRC_LOANS", vec!["AMT"]);
        let rows = vec![row(
            "OBJ",
            "STG_LOANS",
            "N_AMT",
            None,
            Some("SRC_LOANS"),
            Some("AMT"),
        )];
        let (edges, _) = drive(&rows, &arena, root, Some(&dm), 50);
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].trace_path, "DIRECT_MAPPING");
        assert_eq!(edges[0].source_table.as_deref(), Some("SRC_LOANS"));
        assert!(edges[0].dm_match);
    }

    #[test]
    fn s2_aliased_qualified_ref() {
        let stmt = parse_select("SELECT a.x FROM t_a a").unwrap();
        let (arena, root) = build_scope_tree(&stmt, None);
        let rows = vec![row("OBJ", "DST", "X", Some("a.X"), None, None)];
        let (edges, _) = drive(&rows, &arena, root, None, 50);
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].source_table.as_deref(), Some("T_A"));
        assert_eq!(edges[0].source_alias.as_deref(), Some("A"));
        assert_eq!(edges[0].original_ref, "A.X");
    }

    #[test]
    fn s4_union_positional_merge_produces_two_edges() {
        let stmt = parse_select("SELECT x AS v FROM t_a UNION ALL SELECT y AS v FROM t_b").unwrap();
        let (arena, root) = build_scope_tree(&stmt, None);
        let rows = vec![row("OBJ", "DST", "V", Some("v"), None, None)];
        let (edges, _) = drive(&rows, &arena, root, None, 50);
        assert_eq!(edges.len(), 2);
        let tables: Vec<_> = edges.iter().filter_map(|e| e.source_table.clone()).collect();
        assert!(tables.contains(&"T_A".to_string()));
        assert!(tables.contains(&"T_B".to_string()));
    }

    #[test]
    fn s6_high_unresolved_rate_warns() {
        let stmt = parse_select("SELECT x FROM t").unwrap();
        let (arena, root) = build_scope_tree(&stmt, None);
        let mut rows: Vec<MappingRow> = (0..7)
            .map(|i| row("OBJ", "DST", &format!("F{i}"), Some("x"), None, None))
            .collect();
        rows.extend((0..3).map(|i| row("OBJ", "DST", &format!("BAD{i}"), Some("z.col"), None, None)));
        let (edges, diagnostics) = drive(&rows, &arena, root, None, 50);
        assert_eq!(edges.iter().filter(|e| e.row_type == RowType::Mapping).count(), 10);
        assert_eq!(diagnostics.warnings.len(), 1);
        assert!(diagnostics.warnings[0].message.contains("30.0%"));
    }

    #[test]
    fn joins_are_appended_after_mapping_edges() {
        let stmt =
            parse_select("SELECT a.x FROM t1 a JOIN t2 b ON a.id = b.id").unwrap();
        let (arena, root) = build_scope_tree(&stmt, None);
        let rows = vec![row("OBJ", "DST", "X", Some("a.x"), None, None)];
        let (edges, _) = drive(&rows, &arena, root, None, 50);
        assert_eq!(edges[0].row_type, RowType::Mapping);
        assert!(edges.iter().skip(1).all(|e| e.row_type == RowType::Join));
        assert!(edges.len() >= 3);
    }
}
