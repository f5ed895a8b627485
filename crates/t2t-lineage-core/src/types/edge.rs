use serde::{Deserialize, Serialize};

/// Whether a [`LineageEdge`] represents a target-column mapping or a join
/// condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RowType {
    Mapping,
    Join,
}

/// Coarse classification of where an edge's value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SourceType {
    Physical,
    Constant,
    Unresolved,
}

/// Side of a join a resolved column participates as, per spec's join-edge
/// ordering guarantee (owning-scope path, then `join_seq`, then side, then
/// field role).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JoinSide {
    Left,
    Right,
    Filter,
}

/// One row of output: either a target-column mapping edge or a join edge.
///
/// Mapping edges carry a destination (`dest_table`/`dest_field`); join
/// edges do not and instead fill the join-specific fields.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LineageEdge {
    pub object_name: String,
    pub row_type: RowType,

    pub dest_table: Option<String>,
    pub dest_field: Option<String>,

    pub source_type: SourceType,
    pub source_table: Option<String>,
    pub source_field: Option<String>,
    pub constant_value: Option<String>,

    pub expression_text: String,
    pub full_expression: String,
    pub dm_match: bool,
    pub trace_path: String,
    pub source_alias: Option<String>,
    pub original_ref: String,

    /// Join sequence number within its owning scope, when `row_type = JOIN`.
    pub join_seq: Option<usize>,
    /// `INNER`/`LEFT`/`RIGHT`/`FULL`/`CROSS`, when `row_type = JOIN`.
    pub join_kind: Option<String>,
    /// `LEFT`/`RIGHT`/`FILTER`, when `row_type = JOIN`.
    pub join_side: Option<JoinSide>,
    /// Name of the scope that owns the join, when `row_type = JOIN`.
    pub join_owning_scope: Option<String>,
}

impl LineageEdge {
    pub fn is_unresolved(&self) -> bool {
        matches!(self.source_type, SourceType::Unresolved)
    }
}
