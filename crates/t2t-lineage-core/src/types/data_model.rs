use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

/// Authoritative catalog of physical tables and their columns.
///
/// All lookups are case-insensitive; the canonical internal form is
/// upper-case, matching the crate-wide identifier invariant.
#[derive(Debug, Clone, Default, Serialize, Deserialize, schemars::JsonSchema)]
pub struct DataModel {
    tables: HashMap<String, HashSet<String>>,
}

impl DataModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_tables<I, J, S>(tables: I) -> Self
    where
        I: IntoIterator<Item = (S, J)>,
        J: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut dm = Self::new();
        for (table, columns) in tables {
            dm.insert_table(table, columns);
        }
        dm
    }

    pub fn insert_table<J, S>(&mut self, table: S, columns: J)
    where
        J: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let entry = self
            .tables
            .entry(table.as_ref().to_uppercase())
            .or_default();
        for column in columns {
            entry.insert(column.as_ref().to_uppercase());
        }
    }

    /// `true` when the table is declared in the data model at all, used to
    /// decide between "expand to every column" and "insert a placeholder
    /// projection" during `SELECT *` expansion.
    pub fn has_table(&self, table: &str) -> bool {
        self.tables.contains_key(&table.to_uppercase())
    }

    pub fn columns_of(&self, table: &str) -> Option<&HashSet<String>> {
        self.tables.get(&table.to_uppercase())
    }

    /// `Y`/`N` data-model match for a resolved `(table, column)` pair.
    pub fn matches(&self, table: &str, column: &str) -> bool {
        self.tables
            .get(&table.to_uppercase())
            .is_some_and(|cols| cols.contains(&column.to_uppercase()))
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn match_is_case_insensitive() {
        let dm = DataModel::from_tables([("t_a", vec!["amt", "id"])]);
        assert!(dm.matches("T_A", "AMT"));
        assert!(dm.matches("t_a", "amt"));
        assert!(!dm.matches("t_a", "missing"));
    }

    #[test]
    fn has_table_distinguishes_absent_from_empty() {
        let mut dm = DataModel::new();
        dm.insert_table("T_A", Vec::<&str>::new());
        assert!(dm.has_table("t_a"));
        assert!(!dm.has_table("t_b"));
    }
}
