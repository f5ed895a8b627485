use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::types::edge::{LineageEdge, RowType, SourceType};

/// How a declared mapping row relates its destination to a source: a plain
/// `usage_type` from the mapping contract (§6), distinct from the per-edge
/// `SourceType` emitted once resolution has run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SourceKind {
    Physical,
    Constant,
    Unresolved,
    Derived,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UsageRole {
    Value,
    JoinKey,
    JoinFilter,
}

/// One declared target-column mapping, the Mapping Driver's unit of input.
///
/// Column-name variants from the mapping contract (`Target Table`,
/// `target_column`, `dest_field`, ...) are accepted case-insensitively by
/// routing CSV/loosely-typed input through [`MappingRow::from_row`] rather
/// than relying on `serde(alias = ...)`, which only matches exact casing.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub struct MappingRow {
    pub object_name: String,
    pub destination_table: String,
    pub destination_field: String,
    #[serde(default)]
    pub expression_text: Option<String>,
    #[serde(default)]
    pub source_table: Option<String>,
    #[serde(default)]
    pub source_field: Option<String>,
    #[serde(default)]
    pub constant_value: Option<String>,
}

const REQUIRED_FIELDS: &[(&str, &[&str])] = &[
    ("object_name", &["object_name", "object"]),
    (
        "destination_table",
        &["destination_table", "dest_table", "target table", "target_table"],
    ),
    (
        "destination_field",
        &["destination_field", "dest_field", "target field", "target_column", "target_field"],
    ),
];

impl MappingRow {
    /// Builds a `MappingRow` from a loosely-keyed row (e.g. a CSV record
    /// turned into a header→value map), matching column names
    /// case-insensitively per the mapping contract.
    pub fn from_row(row: &HashMap<String, String>, row_index: usize) -> Result<Self, (usize, &'static str)> {
        let lookup = |names: &[&str]| -> Option<String> {
            row.iter().find_map(|(k, v)| {
                let k_norm = k.trim().to_lowercase();
                let k_underscored = k_norm.replace(' ', "_");
                names
                    .iter()
                    .any(|n| n.eq_ignore_ascii_case(&k_norm) || n.eq_ignore_ascii_case(&k_underscored))
                    .then(|| v.clone())
            })
        };

        let mut required = HashMap::new();
        for (canonical, aliases) in REQUIRED_FIELDS {
            let value = lookup(aliases).ok_or((row_index, *canonical))?;
            required.insert(*canonical, value);
        }

        let optional = |aliases: &[&str]| lookup(aliases).filter(|v| !v.trim().is_empty());

        Ok(MappingRow {
            object_name: required.remove("object_name").unwrap(),
            destination_table: required.remove("destination_table").unwrap(),
            destination_field: required.remove("destination_field").unwrap(),
            expression_text: optional(&["expression_text", "expression", "derived_expression"]),
            source_table: optional(&["source_table"]),
            source_field: optional(&["source_field", "source_column"]),
            constant_value: optional(&["constant_value"]),
        })
    }

    /// Direct mapping per §4.7: no expression, both source table/column
    /// given, and the source table is not the literal keyword `EXPRESSION`.
    pub fn is_direct_mapping(&self) -> bool {
        self.expression_text.is_none()
            && self.source_table.as_deref().is_some_and(|t| !t.is_empty())
            && self.source_field.as_deref().is_some_and(|f| !f.is_empty())
            && !self
                .source_table
                .as_deref()
                .is_some_and(|t| t.eq_ignore_ascii_case("EXPRESSION"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Warning {
    pub severity: Severity,
    pub code: String,
    pub message: String,
    pub object_name: Option<String>,
}

impl Warning {
    pub fn high_unresolved_rate(object_name: &str, unresolved: usize, total: usize) -> Self {
        let rate = unresolved as f64 / total.max(1) as f64 * 100.0;
        Warning {
            severity: Severity::Warning,
            code: "HIGH_UNRESOLVED_RATE".to_string(),
            message: format!(
                "{object_name}: {unresolved}/{total} mapping rows unresolved ({rate:.1}% > 20%)"
            ),
            object_name: Some(object_name.to_string()),
        }
    }
}

/// Per-object counts accumulated by the Mapping Driver (§4.7 Statistics).
#[derive(Debug, Clone, Default, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ObjectStats {
    pub mapping_rows: usize,
    pub join_rows: usize,
    pub physical: usize,
    pub constant: usize,
    pub unresolved: usize,
    pub dm_match_y: usize,
    pub dm_match_n: usize,
    /// Mapping-row-only unresolved count, used for the >20% warning; does
    /// not include join edges.
    pub mapping_unresolved: usize,
}

impl ObjectStats {
    pub fn record(&mut self, edge: &LineageEdge) {
        match edge.row_type {
            RowType::Mapping => {
                self.mapping_rows += 1;
                if edge.is_unresolved() {
                    self.mapping_unresolved += 1;
                }
            }
            RowType::Join => self.join_rows += 1,
        }
        match edge.source_type {
            SourceType::Physical => self.physical += 1,
            SourceType::Constant => self.constant += 1,
            SourceType::Unresolved => self.unresolved += 1,
        }
        if edge.source_type == SourceType::Physical {
            if edge.dm_match {
                self.dm_match_y += 1;
            } else {
                self.dm_match_n += 1;
            }
        }
    }

    pub fn unresolved_rate(&self) -> f64 {
        if self.mapping_rows == 0 {
            0.0
        } else {
            self.mapping_unresolved as f64 / self.mapping_rows as f64
        }
    }
}

/// Non-fatal diagnostics accumulated alongside a run's `LineageEdge`s:
/// warnings plus per-object statistics.
#[derive(Debug, Clone, Default, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostics {
    pub warnings: Vec<Warning>,
    pub stats: HashMap<String, ObjectStats>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_edge(&mut self, edge: &LineageEdge) {
        self.stats
            .entry(edge.object_name.clone())
            .or_default()
            .record(edge);
    }

    pub fn push_warning(&mut self, warning: Warning) {
        self.warnings.push(warning);
    }

    /// Emits the high-unresolved-rate warning (spec §7/§8 S6) for every
    /// object whose mapping-row unresolved ratio exceeds 20%.
    pub fn finalize_high_unresolved_warnings(&mut self) {
        let mut new_warnings = Vec::new();
        for (object_name, stats) in &self.stats {
            if stats.mapping_rows > 0 && stats.unresolved_rate() > 0.20 {
                new_warnings.push(Warning::high_unresolved_rate(
                    object_name,
                    stats.mapping_unresolved,
                    stats.mapping_rows,
                ));
            }
        }
        new_warnings.sort_by(|a, b| a.object_name.cmp(&b.object_name));
        self.warnings.extend(new_warnings);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_row_matches_column_name_variants_case_insensitively() {
        let mut row = HashMap::new();
        row.insert("OBJECT_NAME".to_string(), "OBJ".to_string());
        row.insert("Target Table".to_string(), "T_A".to_string());
        row.insert("dest_field".to_string(), "X".to_string());
        let mapping = MappingRow::from_row(&row, 0).unwrap();
        assert_eq!(mapping.object_name, "OBJ");
        assert_eq!(mapping.destination_table, "T_A");
        assert_eq!(mapping.destination_field, "X");
    }

    #[test]
    fn from_row_builds_direct_mapping() {
        let mut row = HashMap::new();
        row.insert("object_name".to_string(), "OBJ".to_string());
        row.insert("destination_table".to_string(), "STG".to_string());
        row.insert("destination_field".to_string(), "N_AMT".to_string());
        row.insert("source_table".to_string(), "SRC".to_string());
        row.insert("source_field".to_string(), "AMT".to_string());
        let mapping = MappingRow::from_row(&row, 0).unwrap();
        assert!(mapping.is_direct_mapping());
    }

    #[test]
    fn missing_required_field_reports_row_and_field() {
        let row = HashMap::new();
        let err = MappingRow::from_row(&row, 3).unwrap_err();
        assert_eq!(err.0, 3);
    }

    #[test]
    fn expression_keyword_is_not_direct_mapping() {
        let mapping = MappingRow {
            object_name: "OBJ".into(),
            destination_table: "T".into(),
            destination_field: "C".into(),
            expression_text: None,
            source_table: Some("EXPRESSION".into()),
            source_field: Some("x".into()),
            constant_value: None,
        };
        assert!(!mapping.is_direct_mapping());
    }

    #[test]
    fn high_unresolved_warning_crosses_threshold() {
        let mut diag = Diagnostics::new();
        diag.stats.insert(
            "OBJ".to_string(),
            ObjectStats {
                mapping_rows: 10,
                mapping_unresolved: 3,
                ..Default::default()
            },
        );
        diag.finalize_high_unresolved_warnings();
        assert_eq!(diag.warnings.len(), 1);
        assert!(diag.warnings[0].message.contains("30.0%"));
    }

    #[test]
    fn no_warning_at_or_below_threshold() {
        let mut diag = Diagnostics::new();
        diag.stats.insert(
            "OBJ".to_string(),
            ObjectStats {
                mapping_rows: 10,
                mapping_unresolved: 2,
                ..Default::default()
            },
        );
        diag.finalize_high_unresolved_warnings();
        assert!(diag.warnings.is_empty());
    }
}
