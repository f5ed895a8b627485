use t2t_lineage_core::{resolve_mapping, DataModel, MappingRow, RowType, SourceType};

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
fn s1_direct_mapping_trusts_declared_source_when_scope_has_no_such_alias() {
    let sql = "SELECT x FROM stg_loans";
    let mut dm = DataModel::new();
    dm.insert_table("SRC_LOANS", vec!["AMT"]);
    let rows = vec![row(
        "LOAD_LOANS",
        "STG_LOANS",
        "N_AMT",
        None,
        Some("SRC_LOANS"),
        Some("AMT"),
    )];
    let (edges, diagnostics) = resolve_mapping(sql, &rows, Some(&dm), None).unwrap();
    assert_eq!(edges.len(), 1);
    assert_eq!(edges[0].trace_path, "DIRECT_MAPPING");
    assert!(edges[0].dm_match);
    assert!(diagnostics.warnings.is_empty());
}

#[test]
fn s2_aliased_qualified_reference_resolves_through_its_alias() {
    let sql = "SELECT a.amt FROM src_loans a";
    let rows = vec![row("LOAD_LOANS", "STG_LOANS", "N_AMT", Some("a.amt"), None, None)];
    let (edges, _) = resolve_mapping(sql, &rows, None, None).unwrap();
    assert_eq!(edges.len(), 1);
    assert_eq!(edges[0].source_table.as_deref(), Some("SRC_LOANS"));
    assert_eq!(edges[0].source_alias.as_deref(), Some("A"));
}

#[test]
fn s3_case_expression_fans_out_into_every_branch_leaf() {
    let sql = "SELECT CASE WHEN a.flag = 'Y' THEN b.amt ELSE c.amt END AS n_amt \
               FROM t_a a JOIN t_b b ON a.id = b.id JOIN t_c c ON a.id = c.id";
    let rows = vec![row(
        "LOAD",
        "STG",
        "N_AMT",
        Some("CASE WHEN a.flag = 'Y' THEN b.amt ELSE c.amt END"),
        None,
        None,
    )];
    let (edges, _) = resolve_mapping(sql, &rows, None, None).unwrap();
    let mapping: Vec<_> = edges.iter().filter(|e| e.row_type == RowType::Mapping).collect();
    assert_eq!(mapping.len(), 3, "one edge per CASE branch leaf");
    let tables: Vec<_> = mapping.iter().filter_map(|e| e.source_table.clone()).collect();
    assert!(tables.contains(&"T_A".to_string()));
    assert!(tables.contains(&"T_B".to_string()));
    assert!(tables.contains(&"T_C".to_string()));
}

#[test]
fn s4_union_branches_merge_positionally_under_one_alias() {
    let sql = "SELECT amt AS n_amt FROM t_a UNION ALL SELECT amt AS n_amt FROM t_b";
    let rows = vec![row("LOAD", "STG", "N_AMT", Some("n_amt"), None, None)];
    let (edges, _) = resolve_mapping(sql, &rows, None, None).unwrap();
    let mapping: Vec<_> = edges.iter().filter(|e| e.row_type == RowType::Mapping).collect();
    assert_eq!(mapping.len(), 2, "one edge per UNION arm");
    let tables: Vec<_> = mapping.iter().filter_map(|e| e.source_table.clone()).collect();
    assert!(tables.contains(&"T_A".to_string()));
    assert!(tables.contains(&"T_B".to_string()));
}

#[test]
fn s5_cte_chain_traces_through_every_link_to_the_physical_table() {
    let sql = "WITH c1 AS (SELECT id, amt FROM src_loans), \
                    c2 AS (SELECT id, amt FROM c1) \
               SELECT c2.amt FROM c2";
    let rows = vec![row("LOAD", "STG", "N_AMT", Some("c2.amt"), None, None)];
    let (edges, _) = resolve_mapping(sql, &rows, None, None).unwrap();
    assert_eq!(edges.len(), 1);
    assert_eq!(edges[0].source_table.as_deref(), Some("SRC_LOANS"));
}

#[test]
fn s6_object_crossing_twenty_percent_unresolved_gets_a_warning() {
    let sql = "SELECT x FROM t_a";
    let mut rows: Vec<MappingRow> = (0..8)
        .map(|i| row("LOAD", "STG", &format!("F{i}"), Some("x"), None, None))
        .collect();
    rows.extend((0..2).map(|i| row("LOAD", "STG", &format!("BAD{i}"), Some("no_such.col"), None, None)));
    let (edges, diagnostics) = resolve_mapping(sql, &rows, None, None).unwrap();
    assert_eq!(edges.iter().filter(|e| e.row_type == RowType::Mapping).count(), 10);
    assert_eq!(diagnostics.warnings.len(), 1);
    assert!(diagnostics.warnings[0].message.contains("LOAD"));
}

#[test]
fn data_model_mismatch_is_reported_without_blocking_resolution() {
    let sql = "SELECT a.amt FROM src_loans a";
    let mut dm = DataModel::new();
    dm.insert_table("SRC_LOANS", vec!["ID"]);
    let rows = vec![row("LOAD", "STG", "N_AMT", Some("a.amt"), None, None)];
    let (edges, _) = resolve_mapping(sql, &rows, Some(&dm), None).unwrap();
    assert_eq!(edges[0].source_type, SourceType::Physical);
    assert!(!edges[0].dm_match, "AMT isn't in the data model's SRC_LOANS columns");
}

#[test]
fn unresolvable_qualified_reference_is_reported_not_panicked() {
    let sql = "SELECT x FROM t_a";
    let rows = vec![row("LOAD", "STG", "N_AMT", Some("missing_alias.col"), None, None)];
    let (edges, _) = resolve_mapping(sql, &rows, None, None).unwrap();
    assert_eq!(edges.len(), 1);
    assert_eq!(edges[0].source_type, SourceType::Unresolved);
}

#[test]
fn empty_sql_is_rejected_as_an_input_error() {
    assert!(resolve_mapping("   ", &[], None, None).is_err());
}

#[test]
fn non_select_statement_is_rejected() {
    let err = resolve_mapping("INSERT INTO t_a VALUES (1)", &[], None, None).unwrap_err();
    assert!(matches!(err, t2t_lineage_core::AnalyzeError::NotASelect { .. }));
}
