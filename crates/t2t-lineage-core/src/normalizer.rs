//! SQL Normalizer (§4.1): strips comments, substitutes parameter
//! placeholders, and fixes a fixed set of vendor quirks — all while leaving
//! every string literal untouched.

use std::sync::OnceLock;

use regex::Regex;

/// Normalizes raw SQL text into text safe to hand to the parser.
///
/// Ordering matters: placeholder substitution runs first (so a stray `$`
/// or `[` never gets misread once comments are gone), then comment
/// stripping, then whitespace collapsing last.
pub fn normalize(sql: &str) -> String {
    let sql = substitute_placeholders(sql);
    let sql = strip_comments(&sql);
    let sql = fix_vendor_quirks(&sql);
    collapse_whitespace(&sql)
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum State {
    Normal,
    InString,
    LineComment,
    BlockComment,
}

/// Single-pass state machine: normal / in-string (respecting the Oracle
/// doubled-quote `''` escape) / line comment / block comment.
///
/// A naive regex-based strip is forbidden here: it would corrupt string
/// literals like `'----NOT FOUND'` by mistaking the dashes for a line
/// comment opener.
pub fn strip_comments(sql: &str) -> String {
    let chars: Vec<char> = sql.chars().collect();
    let mut out = String::with_capacity(sql.len());
    let mut state = State::Normal;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();

        match state {
            State::Normal => match (c, next) {
                ('\'', _) => {
                    state = State::InString;
                    out.push(c);
                    i += 1;
                }
                ('-', Some('-')) => {
                    state = State::LineComment;
                    i += 2;
                }
                ('/', Some('*')) => {
                    state = State::BlockComment;
                    i += 2;
                }
                _ => {
                    out.push(c);
                    i += 1;
                }
            },
            State::InString => {
                if c == '\'' {
                    if next == Some('\'') {
                        // Oracle-escaped quote: '' inside a string is a
                        // literal quote, not the string terminator.
                        out.push('\'');
                        out.push('\'');
                        i += 2;
                        continue;
                    }
                    state = State::Normal;
                }
                out.push(c);
                i += 1;
            }
            State::LineComment => {
                if c == '\n' {
                    state = State::Normal;
                    out.push(c);
                }
                i += 1;
            }
            State::BlockComment => {
                if c == '*' && next == Some('/') {
                    state = State::Normal;
                    i += 2;
                } else {
                    i += 1;
                }
            }
        }
    }

    out
}

fn placeholder_regexes() -> (&'static Regex, &'static Regex, &'static Regex, &'static Regex) {
    static BRACKET: OnceLock<Regex> = OnceLock::new();
    static DOLLAR_DATE: OnceLock<Regex> = OnceLock::new();
    static DOLLAR: OnceLock<Regex> = OnceLock::new();
    static QUOTED_DOLLAR: OnceLock<Regex> = OnceLock::new();

    (
        BRACKET.get_or_init(|| Regex::new(r"\[([A-Za-z_][A-Za-z0-9_]*)\]").unwrap()),
        DOLLAR_DATE.get_or_init(|| {
            Regex::new(r"\$([A-Za-z_][A-Za-z0-9_]*DATE[A-Za-z0-9_]*)").unwrap()
        }),
        DOLLAR.get_or_init(|| Regex::new(r"\$([A-Za-z_][A-Za-z0-9_]*)").unwrap()),
        QUOTED_DOLLAR.get_or_init(|| Regex::new(r"'\$([A-Za-z_][A-Za-z0-9_]*)'").unwrap()),
    )
}

/// Replaces `[IDENT]`, `$IDENT`, and `'$IDENT'` placeholder tokens with
/// inert Oracle literals, protecting existing string literals first so the
/// substitution never touches text the user already quoted.
fn substitute_placeholders(sql: &str) -> String {
    let (bracket_re, dollar_date_re, dollar_re, quoted_dollar_re) = placeholder_regexes();
    let (protected, literals) = protect_string_literals(sql);

    // Already-quoted '$IDENT' collapses to 'PLACEHOLDER_IDENT' — run before
    // the bare $IDENT rule so it isn't double-substituted and re-quoted.
    let protected = quoted_dollar_re
        .replace_all(&protected, |caps: &regex::Captures| {
            format!("'PLACEHOLDER_{}'", &caps[1].to_uppercase())
        })
        .into_owned();

    let protected = bracket_re
        .replace_all(&protected, |caps: &regex::Captures| {
            format!("'PLACEHOLDER_{}'", &caps[1].to_uppercase())
        })
        .into_owned();

    let protected = dollar_date_re
        .replace_all(&protected, |caps: &regex::Captures| {
            format!("DATE '2000-01-01' /* {} */", &caps[1].to_uppercase())
        })
        .into_owned();

    let protected = dollar_re
        .replace_all(&protected, |caps: &regex::Captures| {
            format!("'PLACEHOLDER_{}'", &caps[1].to_uppercase())
        })
        .into_owned();

    restore_string_literals(&protected, &literals)
}

const LITERAL_SENTINEL_PREFIX: &str = "\u{0}LIT";

/// Replaces every `'...'` string literal (respecting `''` escapes) with a
/// sentinel token, returning the rewritten text plus the literals in order
/// so callers can run substitutions without risking a match inside a
/// literal, then restore them verbatim.
pub(crate) fn protect_string_literals(sql: &str) -> (String, Vec<String>) {
    let mut out = String::with_capacity(sql.len());
    let mut literals = Vec::new();
    let chars: Vec<char> = sql.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        if chars[i] == '\'' {
            let start = i;
            i += 1;
            while i < chars.len() {
                if chars[i] == '\'' {
                    if chars.get(i + 1) == Some(&'\'') {
                        i += 2;
                        continue;
                    }
                    i += 1;
                    break;
                }
                i += 1;
            }
            let literal: String = chars[start..i].iter().collect();
            literals.push(literal);
            out.push_str(LITERAL_SENTINEL_PREFIX);
            out.push_str(&(literals.len() - 1).to_string());
            out.push('\u{0}');
        } else {
            out.push(chars[i]);
            i += 1;
        }
    }

    (out, literals)
}

pub(crate) fn restore_string_literals(sql: &str, literals: &[String]) -> String {
    let mut out = String::with_capacity(sql.len());
    let mut rest = sql;
    while let Some(idx) = rest.find(LITERAL_SENTINEL_PREFIX) {
        out.push_str(&rest[..idx]);
        let after = &rest[idx + LITERAL_SENTINEL_PREFIX.len()..];
        let end = after.find('\u{0}').expect("sentinel always closed");
        let n: usize = after[..end].parse().expect("sentinel index is numeric");
        out.push_str(&literals[n]);
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    out
}

fn fix_vendor_quirks(sql: &str) -> String {
    static TILDE_CONCAT: OnceLock<Regex> = OnceLock::new();
    static SELF_ALIAS: OnceLock<Regex> = OnceLock::new();

    let tilde_re = TILDE_CONCAT.get_or_init(|| Regex::new(r"\|\|\s*~\s*\|\|").unwrap());
    let self_alias_re =
        SELF_ALIAS.get_or_init(|| Regex::new(r"(?i)\b([A-Za-z_][A-Za-z0-9_\$#]*)\s+AS\s+\1\b").unwrap());

    // `\'` is not a real Oracle escape — a backslash has no special meaning,
    // so the quote that follows it would otherwise terminate the string
    // early. Fix it to the real `''` escape before the literal-protecting
    // scanner below runs, since that scanner assumes `''` is already the
    // only escape in play.
    let sql = sql.replace("\\'", "''");

    let (protected, literals) = protect_string_literals(&sql);
    let protected = tilde_re.replace_all(&protected, "|| '~' ||").into_owned();
    let protected = self_alias_re.replace_all(&protected, "$1").into_owned();
    restore_string_literals(&protected, &literals)
}

fn collapse_whitespace(sql: &str) -> String {
    const ANSI_ESCAPE: char = '\u{1b}';
    const UNICODE_SPACES: [char; 5] = ['\u{00A0}', '\u{2007}', '\u{202F}', '\u{2060}', '\u{FEFF}'];

    let (protected, literals) = protect_string_literals(sql);

    let mut stripped = String::with_capacity(protected.len());
    let mut chars = protected.chars().peekable();
    while let Some(c) = chars.next() {
        if c == ANSI_ESCAPE {
            // Skip a CSI sequence: ESC '[' ... final byte in 0x40..=0x7E.
            if chars.peek() == Some(&'[') {
                chars.next();
                for next in chars.by_ref() {
                    if ('\u{40}'..='\u{7E}').contains(&next) {
                        break;
                    }
                }
            }
            continue;
        }
        if UNICODE_SPACES.contains(&c) {
            stripped.push(' ');
        } else {
            stripped.push(c);
        }
    }

    let collapsed: String = stripped
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");

    restore_string_literals(&collapsed, &literals)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_comment_is_stripped() {
        let out = strip_comments("SELECT a -- trailing comment\nFROM t");
        assert_eq!(out, "SELECT a \nFROM t");
    }

    #[test]
    fn block_comment_is_stripped() {
        let out = strip_comments("SELECT /* noisy */ a FROM t");
        assert_eq!(out, "SELECT  a FROM t");
    }

    #[test]
    fn dashes_inside_string_literal_survive() {
        let out = strip_comments("SELECT '----NOT FOUND' FROM t");
        assert_eq!(out, "SELECT '----NOT FOUND' FROM t");
    }

    #[test]
    fn block_comment_markers_inside_string_survive() {
        let out = strip_comments("SELECT '/* not a comment */' FROM t");
        assert_eq!(out, "SELECT '/* not a comment */' FROM t");
    }

    #[test]
    fn doubled_quote_escape_is_preserved() {
        let out = strip_comments("SELECT 'it''s -- fine' FROM t");
        assert_eq!(out, "SELECT 'it''s -- fine' FROM t");
    }

    #[test]
    fn bracket_placeholder_is_substituted() {
        let out = substitute_placeholders("SELECT [RUN_ID] FROM t");
        assert_eq!(out, "SELECT 'PLACEHOLDER_RUN_ID' FROM t");
    }

    #[test]
    fn dollar_placeholder_is_substituted() {
        let out = substitute_placeholders("SELECT $RUNID FROM t");
        assert_eq!(out, "SELECT 'PLACEHOLDER_RUNID' FROM t");
    }

    #[test]
    fn dollar_date_placeholder_becomes_date_literal() {
        let out = substitute_placeholders("SELECT * FROM t WHERE d BETWEEN $STARTDATE AND $ENDDATE");
        assert!(out.contains("DATE '2000-01-01'"));
        assert!(!out.contains("$STARTDATE"));
    }

    #[test]
    fn already_quoted_dollar_placeholder_does_not_double_quote() {
        let out = substitute_placeholders("SELECT '$RUNID' FROM t");
        assert_eq!(out, "SELECT 'PLACEHOLDER_RUNID' FROM t");
    }

    #[test]
    fn placeholder_inside_literal_is_untouched() {
        let out = substitute_placeholders("SELECT 'keep [THIS] literal' FROM t");
        assert_eq!(out, "SELECT 'keep [THIS] literal' FROM t");
    }

    #[test]
    fn tilde_concat_quirk_is_fixed() {
        let out = fix_vendor_quirks("SELECT a || ~ || b FROM t");
        assert_eq!(out, "SELECT a || '~' || b FROM t");
    }

    #[test]
    fn self_alias_collapses() {
        let out = fix_vendor_quirks("SELECT x AS x FROM t");
        assert_eq!(out, "SELECT x FROM t");
    }

    #[test]
    fn backslash_escape_becomes_oracle_doubled_quote() {
        let out = fix_vendor_quirks("SELECT 'it\\'s' FROM t");
        assert_eq!(out, "SELECT 'it''s' FROM t");
    }

    #[test]
    fn whitespace_is_collapsed_but_literal_whitespace_survives() {
        let out = collapse_whitespace("SELECT   a  FROM   t WHERE x = 'a   b'");
        assert_eq!(out, "SELECT a FROM t WHERE x = 'a   b'");
    }

    #[test]
    fn full_pipeline_preserves_dashes_and_substitutes_placeholder() {
        let out = normalize("SELECT [ID], '----SKIP' -- note\nFROM t");
        assert_eq!(out, "SELECT 'PLACEHOLDER_ID', '----SKIP' FROM t");
    }
}
