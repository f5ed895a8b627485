//! Error types for SQL parsing and lineage analysis.
//!
//! # Error Handling Strategy
//!
//! This crate uses two complementary error handling patterns:
//!
//! - [`AnalyzeError`]: fatal errors that prevent lineage extraction for a
//!   file (bad input, unparsable SQL). Returned as `Result<T, AnalyzeError>`
//!   and mean the whole file is skipped.
//!
//! - [`crate::types::ResolvedColumn::Unresolved`] and
//!   [`crate::types::LineageEdge`] with `source_type = Unresolved`: non-fatal
//!   resolution failures, carried in-band as data. The resolver never
//!   panics and never returns `Result` — see [`crate::resolver::resolve`].
//!
//! This separation keeps the core resilient: a single bad reference inside
//! an otherwise-good query does not abort the whole file.

use std::fmt;

/// Fatal error encountered while preparing or parsing a SQL statement.
#[derive(Debug, Clone, thiserror::Error)]
#[non_exhaustive]
pub enum AnalyzeError {
    /// The SQL text was empty or contained only whitespace/comments.
    #[error("empty SQL input")]
    EmptyInput,

    /// The top-level statement was not a SELECT/WITH/UNION expression.
    #[error("statement is not a SELECT, WITH, or set operation: {found}")]
    NotASelect {
        /// A short description of what was parsed instead.
        found: String,
    },

    /// The underlying parser rejected the (normalized) SQL text.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// A mapping row was missing a column required by the mapping contract.
    #[error("mapping row {row} is missing required column '{field}'")]
    MappingColumn {
        /// 0-based row index in the mapping source.
        row: usize,
        /// Name of the missing column.
        field: &'static str,
    },
}

/// Error produced by the SQL parsing front-end.
///
/// Mirrors the structured error the teacher crate derives from `sqlparser`:
/// message, an optional line/column position, and a coarse kind used for
/// diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    /// Human-readable error message from the parser.
    pub message: String,
    /// Byte/line-column position, when the parser reported one.
    pub position: Option<Position>,
    /// Coarse classification of the failure, used to produce hints.
    pub kind: ParseErrorKind,
}

/// Line/column position of a parse error (1-indexed, as reported by `sqlparser`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

/// Coarse category of parse failure, used to generate the diagnostic hints
/// spec.md §7 calls for (CASE/END balance, parenthesis balance, unterminated
/// strings).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParseErrorKind {
    #[default]
    SyntaxError,
    UnexpectedEof,
    MissingClause,
    UnsupportedFeature,
}

impl ParseError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            position: None,
            kind: ParseErrorKind::SyntaxError,
        }
    }

    /// Derives a short diagnostic hint from the normalized SQL text, per
    /// spec.md §7: unbalanced CASE/END, unbalanced parentheses, or an
    /// unterminated string literal.
    pub fn diagnostic_hint(normalized_sql: &str) -> Option<String> {
        let upper = normalized_sql.to_uppercase();
        let case_count = upper.matches("CASE").count();
        let end_count = upper.matches("END").count();
        if case_count > end_count {
            return Some(format!(
                "possible unbalanced CASE/END ({case_count} CASE vs {end_count} END)"
            ));
        }

        let mut depth: i64 = 0;
        for ch in normalized_sql.chars() {
            match ch {
                '(' => depth += 1,
                ')' => depth -= 1,
                _ => {}
            }
        }
        if depth != 0 {
            return Some(format!("unbalanced parentheses (depth {depth})"));
        }

        if normalized_sql.matches('\'').count() % 2 != 0 {
            return Some("possible unterminated string literal".to_string());
        }

        None
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "parse error")?;
        if let Some(pos) = self.position {
            write!(f, " at line {}, column {}", pos.line, pos.column)?;
        }
        write!(f, ": {}", self.message)
    }
}

impl std::error::Error for ParseError {}

impl From<sqlparser::parser::ParserError> for ParseError {
    fn from(err: sqlparser::parser::ParserError) -> Self {
        let message = err.to_string();
        let position = parse_position_from_message(&message);
        let kind = infer_kind_from_message(&message);
        Self {
            message,
            position,
            kind,
        }
    }
}

fn parse_position_from_message(message: &str) -> Option<Position> {
    // sqlparser formats positions as "... at Line: X, Column: Y".
    let idx = message.find("Line:")?;
    let rest = &message[idx + "Line:".len()..];
    let (line_str, rest) = rest.split_once(',')?;
    let column_idx = rest.find("Column:")?;
    let column_str = &rest[column_idx + "Column:".len()..];
    let line: usize = line_str.trim().parse().ok()?;
    let column: usize = column_str
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect::<String>()
        .parse()
        .ok()?;
    Some(Position { line, column })
}

fn infer_kind_from_message(message: &str) -> ParseErrorKind {
    let lower = message.to_lowercase();
    if lower.contains("unexpected end") || lower.contains("eof") {
        ParseErrorKind::UnexpectedEof
    } else if lower.contains("expected") {
        ParseErrorKind::MissingClause
    } else if lower.contains("not supported") || lower.contains("unsupported") {
        ParseErrorKind::UnsupportedFeature
    } else {
        ParseErrorKind::SyntaxError
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_line_column_from_message() {
        let msg = "Expected SELECT, found 'INSERT' at Line: 1, Column: 5";
        assert_eq!(
            parse_position_from_message(msg),
            Some(Position { line: 1, column: 5 })
        );
    }

    #[test]
    fn missing_position_is_none() {
        assert_eq!(parse_position_from_message("Unexpected token"), None);
    }

    #[test]
    fn hint_detects_unbalanced_case() {
        let hint = ParseError::diagnostic_hint("SELECT CASE WHEN a = 1 THEN 2 FROM t").unwrap();
        assert!(hint.contains("CASE/END"));
    }

    #[test]
    fn hint_detects_unbalanced_parens() {
        let hint = ParseError::diagnostic_hint("SELECT (a + b FROM t").unwrap();
        assert!(hint.contains("parentheses"));
    }

    #[test]
    fn hint_detects_unterminated_string() {
        let hint = ParseError::diagnostic_hint("SELECT 'abc FROM t").unwrap();
        assert!(hint.contains("string"));
    }

    #[test]
    fn clean_sql_has_no_hint() {
        assert_eq!(
            ParseError::diagnostic_hint("SELECT a FROM t WHERE b = 'ok'"),
            None
        );
    }

    #[test]
    fn display_includes_position() {
        let err = ParseError {
            message: "bad token".to_string(),
            position: Some(Position { line: 3, column: 7 }),
            kind: ParseErrorKind::SyntaxError,
        };
        assert_eq!(err.to_string(), "parse error at line 3, column 7: bad token");
    }
}
