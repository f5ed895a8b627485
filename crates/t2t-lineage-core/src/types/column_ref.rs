use serde::{Deserialize, Serialize};

/// A textual `ALIAS.COLUMN` or bare `COLUMN` reference, as written by the
/// user before resolution. `alias` absent means the reference was
/// unqualified.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ColumnRef {
    pub alias: Option<String>,
    pub column: String,
}

impl ColumnRef {
    pub fn qualified(alias: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            alias: Some(alias.into()),
            column: column.into(),
        }
    }

    pub fn bare(column: impl Into<String>) -> Self {
        Self {
            alias: None,
            column: column.into(),
        }
    }

    /// Parses a raw token like `A.B` or `B` into a `ColumnRef`, upper-casing
    /// and trimming both parts per spec's case-insensitivity invariant.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        match raw.rsplit_once('.') {
            Some((alias, column)) if !alias.is_empty() && !column.is_empty() => {
                Self::qualified(alias.trim().to_uppercase(), column.trim().to_uppercase())
            }
            _ => Self::bare(raw.to_uppercase()),
        }
    }

    /// Renders back to `ALIAS.COLUMN` or `COLUMN` form, for trace paths and
    /// `original_ref` fields.
    pub fn display(&self) -> String {
        match &self.alias {
            Some(alias) => format!("{alias}.{}", self.column),
            None => self.column.clone(),
        }
    }
}

impl std::fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display())
    }
}
