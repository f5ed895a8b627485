//! Constant recognition (§4.3): the enumerated pattern set that decides
//! whether a piece of expression text denotes a constant rather than a
//! column reference, plus the keyword/function lists the Column-Ref
//! Extractor (§4.2) filters against.

use std::sync::OnceLock;

use regex::Regex;

/// Synthetic marker the Scope Builder injects for UNPIVOT value/for
/// columns; treated as a constant because its value is not a direct
/// column copy.
pub const UNPIVOT_VALUE_PREFIX: &str = "UNPIVOT_VALUE(";
pub const UNPIVOT_FOR_PREFIX: &str = "UNPIVOT_FOR(";

const BARE_CONSTANTS: &[&str] = &[
    "NULL",
    "SYSDATE",
    "SYSTIMESTAMP",
    "CURRENT_DATE",
    "CURRENT_TIMESTAMP",
    "ROWNUM",
    "ROWID",
    "LEVEL",
    "USER",
];

fn constant_regexes() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS
        .get_or_init(|| {
            vec![
                // SYS_GUID(), USERENV(...), SYS_CONTEXT(...) — zero-or-more-arg calls.
                Regex::new(r"(?i)^SYS_GUID\s*\(\s*\)$").unwrap(),
                Regex::new(r"(?i)^USERENV\s*\(.*\)$").unwrap(),
                Regex::new(r"(?i)^SYS_CONTEXT\s*\(.*\)$").unwrap(),
                // Oracle string / national-string literal, '' escape aware.
                Regex::new(r"(?is)^N?'(?:[^']|'')*'$").unwrap(),
                // Signed numeric literal (integer or decimal).
                Regex::new(r"^[+-]?\d+(\.\d+)?$").unwrap(),
                // DATE/TIMESTAMP/INTERVAL literals.
                Regex::new(r"(?is)^DATE\s*'(?:[^']|'')*'$").unwrap(),
                Regex::new(r"(?is)^TIMESTAMP\s*'(?:[^']|'')*'$").unwrap(),
                Regex::new(r"(?is)^INTERVAL\s*'(?:[^']|'')*'.*$").unwrap(),
                // Bind parameter sigils: :NAME, :1, &NAME.
                Regex::new(r"^[:&][A-Za-z_][A-Za-z0-9_]*$").unwrap(),
                Regex::new(r"^:\d+$").unwrap(),
                // Synthetic UNPIVOT markers.
                Regex::new(r"(?i)^UNPIVOT_VALUE\(.*\)$").unwrap(),
                Regex::new(r"(?i)^UNPIVOT_FOR\(.*\)$").unwrap(),
            ]
        })
        .as_slice()
}

/// `true` iff `text` (already trimmed) matches one of §4.3's enumerated
/// constant patterns.
pub fn is_constant(text: &str) -> bool {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return false;
    }
    if BARE_CONSTANTS
        .iter()
        .any(|c| c.eq_ignore_ascii_case(trimmed))
    {
        return true;
    }
    constant_regexes().iter().any(|re| re.is_match(trimmed))
}

/// SQL keywords the Column-Ref Extractor discards as non-reference tokens.
pub const SQL_KEYWORDS: &[&str] = &[
    "SELECT", "FROM", "WHERE", "AND", "OR", "NOT", "AS", "ON", "JOIN", "INNER", "LEFT", "RIGHT",
    "FULL", "OUTER", "CROSS", "UNION", "ALL", "MINUS", "INTERSECT", "GROUP", "BY", "HAVING",
    "ORDER", "ASC", "DESC", "NULLS", "FIRST", "LAST", "DISTINCT", "CASE", "WHEN", "THEN", "ELSE",
    "END", "IN", "EXISTS", "BETWEEN", "LIKE", "ESCAPE", "IS", "NULL", "WITH", "CONNECT", "START",
    "PRIOR", "OVER", "PARTITION", "ROWS", "RANGE", "PRECEDING", "FOLLOWING", "UNBOUNDED",
    "CURRENT", "ROW", "INTO", "VALUES", "SET", "UPDATE", "INSERT", "DELETE", "MERGE", "USING",
    "PIVOT", "UNPIVOT", "FOR", "LATERAL", "TABLE", "ANY", "SOME", "COLUMN", "DUAL",
];

/// Curated function-name list (aggregate, string, numeric, conversion,
/// date, analytic, and Oracle-specific) the extractor discards so a
/// function call like `NVL(a, b)` does not surface `NVL` as a reference.
pub const SQL_FUNCTIONS: &[&str] = &[
    // Aggregate
    "SUM", "AVG", "MIN", "MAX", "COUNT", "STDDEV", "VARIANCE", "LISTAGG", "MEDIAN",
    // String
    "SUBSTR", "SUBSTRING", "TRIM", "LTRIM", "RTRIM", "UPPER", "LOWER", "INITCAP", "REPLACE",
    "TRANSLATE", "CONCAT", "LENGTH", "LENGTHB", "INSTR", "LPAD", "RPAD", "REGEXP_SUBSTR",
    "REGEXP_REPLACE", "REGEXP_INSTR", "REGEXP_COUNT", "REGEXP_LIKE", "CHR", "ASCII",
    // Numeric
    "ROUND", "TRUNC", "CEIL", "FLOOR", "ABS", "MOD", "POWER", "SQRT", "SIGN", "EXP", "LN", "LOG",
    "GREATEST", "LEAST",
    // Conversion / null handling
    "TO_CHAR", "TO_NUMBER", "TO_DATE", "TO_TIMESTAMP", "CAST", "CONVERT", "NVL", "NVL2",
    "COALESCE", "DECODE", "NULLIF",
    // Date
    "ADD_MONTHS", "MONTHS_BETWEEN", "LAST_DAY", "NEXT_DAY", "EXTRACT", "NEW_TIME",
    "TZ_OFFSET", "SYSDATE", "SYSTIMESTAMP",
    // Analytic / window
    "ROW_NUMBER", "RANK", "DENSE_RANK", "NTILE", "LAG", "LEAD", "FIRST_VALUE", "LAST_VALUE",
    "RATIO_TO_REPORT", "PERCENT_RANK", "CUME_DIST",
    // Oracle-specific
    "SYS_GUID", "USERENV", "SYS_CONTEXT", "DBMS_RANDOM", "EMPTY_BLOB", "EMPTY_CLOB", "SYS_OP_C2C",
    "UNPIVOT_VALUE", "UNPIVOT_FOR",
];

pub fn is_keyword(token: &str) -> bool {
    SQL_KEYWORDS.iter().any(|k| k.eq_ignore_ascii_case(token))
}

pub fn is_function_name(token: &str) -> bool {
    SQL_FUNCTIONS.iter().any(|f| f.eq_ignore_ascii_case(token))
}
