//! SQL Parser front-end wrapper (ambient, SPEC_FULL §4.0).
//!
//! No Rust `sqlparser` dialect targets Oracle specifically, so this module
//! parses with [`GenericDialect`] — the closest available stand-in, chosen
//! the same way the teacher crate falls back between dialects (see its
//! `parser/mod.rs`). Dialect selection and `ParserError` → `AnalyzeError`
//! conversion are the only responsibilities here; everything downstream
//! consumes `sqlparser::ast` directly.

use sqlparser::ast::{SetExpr, Statement};
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;

use crate::error::AnalyzeError;

/// Parses a single normalized SQL statement, rejecting anything whose
/// top-level shape is not a SELECT/WITH/set-operation per the SQL contract
/// (spec §6).
pub fn parse_select(sql: &str) -> Result<Statement, AnalyzeError> {
    if sql.trim().is_empty() {
        return Err(AnalyzeError::EmptyInput);
    }

    let dialect = GenericDialect {};
    let mut statements =
        Parser::parse_sql(&dialect, sql).map_err(|e| AnalyzeError::Parse(e.into()))?;

    if statements.is_empty() {
        return Err(AnalyzeError::EmptyInput);
    }
    if statements.len() > 1 {
        statements.truncate(1);
    }
    let statement = statements.remove(0);

    match &statement {
        Statement::Query(query) => {
            if is_queryable(&query.body) {
                Ok(statement)
            } else {
                Err(AnalyzeError::NotASelect {
                    found: describe_set_expr(&query.body),
                })
            }
        }
        other => Err(AnalyzeError::NotASelect {
            found: describe_statement(other),
        }),
    }
}

fn is_queryable(body: &SetExpr) -> bool {
    matches!(
        body,
        SetExpr::Select(_) | SetExpr::Query(_) | SetExpr::SetOperation { .. } | SetExpr::Values(_)
    )
}

fn describe_set_expr(body: &SetExpr) -> String {
    match body {
        SetExpr::Select(_) => "SELECT".to_string(),
        SetExpr::Query(_) => "nested query".to_string(),
        SetExpr::SetOperation { .. } => "set operation".to_string(),
        SetExpr::Values(_) => "VALUES".to_string(),
        SetExpr::Insert(_) => "INSERT".to_string(),
        #[allow(unreachable_patterns)]
        _ => "unsupported statement shape".to_string(),
    }
}

fn describe_statement(statement: &Statement) -> String {
    format!("{statement}")
        .split_whitespace()
        .next()
        .unwrap_or("UNKNOWN")
        .to_string()
}
