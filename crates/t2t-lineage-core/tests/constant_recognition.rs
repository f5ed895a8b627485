//! Parametrized coverage of the §4.3 constant-recognition patterns, driven
//! through the public `resolve_mapping` entry point (the resolver's own
//! constant classifier is a private implementation detail).

use rstest::rstest;

use t2t_lineage_core::{resolve_mapping, MappingRow, SourceType};

fn row(expression: &str) -> MappingRow {
    MappingRow {
        object_name: "OBJ".to_string(),
        destination_table: "STG".to_string(),
        destination_field: "X".to_string(),
        expression_text: Some(expression.to_string()),
        source_table: None,
        source_field: None,
        constant_value: None,
    }
}

#[rstest]
#[case("NULL")]
#[case("SYSDATE")]
#[case("SYSTIMESTAMP")]
#[case("CURRENT_DATE")]
#[case("CURRENT_TIMESTAMP")]
#[case("ROWNUM")]
#[case("ROWID")]
#[case("LEVEL")]
#[case("USER")]
#[case("SYS_GUID()")]
#[case("USERENV('SESSIONID')")]
#[case("SYS_CONTEXT('USERENV', 'SESSION_USER')")]
#[case("'ACTIVE'")]
#[case("N'ACTIVE'")]
#[case("'O''BRIEN'")]
#[case("-42")]
#[case("3.14")]
#[case("DATE '2024-01-01'")]
#[case("TIMESTAMP '2024-01-01 00:00:00'")]
#[case("INTERVAL '1' DAY")]
#[case(":LOAD_DATE")]
#[case(":1")]
#[case("&RUN_ID")]
fn recognized_constant_expressions_classify_as_constant(#[case] expression: &str) {
    let sql = "SELECT x FROM t_src";
    let rows = vec![row(expression)];
    let (edges, _) = resolve_mapping(sql, &rows, None, None).unwrap();
    assert_eq!(edges.len(), 1, "expected one edge for `{expression}`");
    assert_eq!(
        edges[0].source_type,
        SourceType::Constant,
        "expected `{expression}` to classify as Constant, got {:?}",
        edges[0].source_type
    );
    assert_eq!(edges[0].constant_value.as_deref(), Some(expression.to_uppercase()).as_deref());
}

#[rstest]
#[case("a.amt", SourceType::Physical)]
#[case("t_src.amt", SourceType::Physical)]
#[case("amt", SourceType::Physical)]
#[case("missing_col", SourceType::Unresolved)]
fn ordinary_references_do_not_classify_as_constant(
    #[case] expression: &str,
    #[case] expected: SourceType,
) {
    let sql = "SELECT amt FROM t_src a";
    let rows = vec![row(expression)];
    let (edges, _) = resolve_mapping(sql, &rows, None, None).unwrap();
    assert_eq!(edges.len(), 1, "expected one edge for `{expression}`");
    assert_eq!(
        edges[0].source_type, expected,
        "expected `{expression}` to classify as {:?}, got {:?}",
        expected, edges[0].source_type
    );
}
