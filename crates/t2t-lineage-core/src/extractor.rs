//! Column-Ref Extractor (§4.2): pulls column-like tokens out of any
//! expression text, string-level, filtering SQL keywords, a curated
//! function list, literal placeholders, and §4.3 constant patterns.

use std::sync::OnceLock;

use regex::Regex;

use crate::constants::{is_constant, is_function_name, is_keyword};
use crate::normalizer::protect_string_literals;
use crate::types::ColumnRef;

fn token_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b([A-Za-z_][A-Za-z0-9_$#]*)(?:\s*\.\s*([A-Za-z_][A-Za-z0-9_$#]*))?\b")
            .unwrap()
    })
}

/// Extracts an ordered, de-duplicated list of candidate column references
/// from an expression's raw text.
///
/// String literals are protected first (see [`crate::normalizer`]) so that
/// text inside `'...'` never contributes bogus tokens, and a token
/// immediately followed by `(` is treated as a function call and its name
/// is dropped along with its argument list scan continuing normally.
pub fn extract_refs(expression_text: &str) -> Vec<ColumnRef> {
    let (protected, _literals) = protect_string_literals(expression_text);
    let mut seen = std::collections::HashSet::new();
    let mut ordered = Vec::new();

    let bytes = protected.as_bytes();
    for caps in token_regex().captures_iter(&protected) {
        let whole = caps.get(0).unwrap();
        let first = caps.get(1).unwrap().as_str();
        let second = caps.get(2).map(|m| m.as_str());

        // A token directly followed by `(` (ignoring whitespace) is a
        // function call, not a column reference.
        let mut tail = whole.end();
        while bytes.get(tail).is_some_and(|b| b.is_ascii_whitespace()) {
            tail += 1;
        }
        if bytes.get(tail) == Some(&b'(') {
            continue;
        }

        let candidate = match second {
            Some(col) => ColumnRef::qualified(first.to_uppercase(), col.to_uppercase()),
            None => ColumnRef::bare(first.to_uppercase()),
        };

        if is_keyword(&candidate.column)
            || (candidate.alias.is_none() && is_function_name(&candidate.column))
            || candidate.column.starts_with("PLACEHOLDER_")
            || is_constant(&candidate.display())
            || candidate
                .alias
                .as_deref()
                .is_some_and(|a| is_keyword(a) || a.starts_with("PLACEHOLDER_"))
        {
            continue;
        }

        if seen.insert(candidate.clone()) {
            ordered.push(candidate);
        }
    }

    ordered
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_bare_and_qualified_refs() {
        let refs = extract_refs("a.x + y");
        assert_eq!(
            refs,
            vec![ColumnRef::qualified("A", "X"), ColumnRef::bare("Y")]
        );
    }

    #[test]
    fn drops_function_calls() {
        let refs = extract_refs("NVL(a.x, 0)");
        assert_eq!(refs, vec![ColumnRef::qualified("A", "X")]);
    }

    #[test]
    fn drops_keywords_and_constants() {
        let refs = extract_refs("CASE WHEN a.x = 'Y' THEN SYSDATE ELSE NULL END");
        assert_eq!(refs, vec![ColumnRef::qualified("A", "X")]);
    }

    #[test]
    fn deduplicates_preserving_first_occurrence_order() {
        let refs = extract_refs("a.x + b.y + a.x");
        assert_eq!(
            refs,
            vec![ColumnRef::qualified("A", "X"), ColumnRef::qualified("B", "Y")]
        );
    }

    #[test]
    fn ignores_content_inside_string_literals() {
        let refs = extract_refs("a.x || 'b.y literal text'");
        assert_eq!(refs, vec![ColumnRef::qualified("A", "X")]);
    }

    #[test]
    fn drops_placeholder_literals() {
        // Placeholder substitution runs before extraction in the pipeline,
        // but a defensively-named PLACEHOLDER_* token is still filtered.
        let refs = extract_refs("a.x = PLACEHOLDER_RUNID");
        assert_eq!(refs, vec![ColumnRef::qualified("A", "X")]);
    }
}
