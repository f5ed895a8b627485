use serde::{Deserialize, Serialize};

use crate::collections::IndexedMap;
use crate::types::column_ref::ColumnRef;
use crate::types::edge::JoinSide;
use crate::types::resolved::ResolvedColumn;

/// An entry in a scope's `relations` table: an alias bound to either a
/// physical table name or a child scope, identified by its arena id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Relation {
    Table(String),
    Child(usize),
}

/// One item of a SELECT list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ProjectionDef {
    pub output_name: String,
    pub expression_text: String,
    pub source_refs: Vec<ColumnRef>,
    /// Set when this projection was created by expanding `alias.*`; used to
    /// disambiguate identity-name collisions during unqualified resolution.
    pub origin_alias: Option<String>,
}

impl ProjectionDef {
    pub fn new(output_name: impl Into<String>, expression_text: impl Into<String>) -> Self {
        Self {
            output_name: output_name.into(),
            expression_text: expression_text.into(),
            source_refs: Vec::new(),
            origin_alias: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub(crate) enum JoinKind {
    Inner,
    Left,
    Right,
    Full,
    Cross,
}

impl JoinKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JoinKind::Inner => "INNER",
            JoinKind::Left => "LEFT",
            JoinKind::Right => "RIGHT",
            JoinKind::Full => "FULL",
            JoinKind::Cross => "CROSS",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum JoinRole {
    Key,
    Filter,
}

/// A single equality extracted from a JOIN's ON-clause, with any
/// non-equality predicates from the same ON-clause attached as filters.
#[derive(Debug, Clone)]
pub(crate) struct JoinKey {
    /// 1-based sequence of the owning JOIN within its scope. Composite keys
    /// (multiple ANDed equalities in one ON-clause) share the same `seq`.
    pub seq: usize,
    pub kind: JoinKind,
    /// `None` when the ON-clause has no top-level equality between two
    /// simple columns (filter-only ON, or a CROSS JOIN).
    pub left_ref: Option<ColumnRef>,
    pub right_ref: Option<ColumnRef>,
    pub condition_text: String,
    /// Non-equality predicates from the same ON-clause (BETWEEN, IN, IS,
    /// LIKE, OR-wrapped variants of the above), each with its own extracted
    /// column references.
    pub filters: Vec<JoinFilter>,
}

impl JoinKey {
    /// A JOIN whose ON-clause has no top-level equality between two simple
    /// columns (e.g. a filter-only ON, or CROSS JOIN) still needs a
    /// `JoinKey` to carry its filters; `left_ref`/`right_ref` are `None` in
    /// that case rather than a key role being fabricated.
    pub fn key_only(
        seq: usize,
        kind: JoinKind,
        left_ref: Option<ColumnRef>,
        right_ref: Option<ColumnRef>,
        condition_text: impl Into<String>,
        filters: Vec<JoinFilter>,
    ) -> Self {
        Self {
            seq,
            kind,
            left_ref,
            right_ref,
            condition_text: condition_text.into(),
            filters,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct JoinFilter {
    pub text: String,
    pub refs: Vec<ColumnRef>,
}

/// A [`JoinKey`] after each referenced column has been resolved in the
/// join's owning scope. One entry per resolved column (left key side,
/// right key side, each filter reference) rather than per `JoinKey`, so
/// ordering and side/role can be expressed per spec's join-edge ordering
/// guarantee.
#[derive(Debug, Clone)]
pub(crate) struct JoinKeyResolved {
    pub seq: usize,
    pub kind: JoinKind,
    pub owning_scope: String,
    pub role: JoinRole,
    pub side: JoinSide,
    pub condition_text: String,
    pub resolved: ResolvedColumn,
}

/// A node of the scope tree.
///
/// Stored in a [`crate::scope_builder::ScopeArena`] rather than via owned
/// `Box` children, so that `parent` can be a plain back-reference (an
/// index) without fighting the borrow checker. `id` is the node's arena
/// index and doubles as the resolver's cycle-detection identity — two
/// scopes with the same `name` never collide because their `id`s differ.
#[derive(Debug, Clone)]
pub(crate) struct Scope {
    pub id: usize,
    pub name: String,
    pub parent: Option<usize>,
    pub relations: IndexedMap<Relation>,
    pub projections: IndexedMap<ProjectionDef>,
    pub ctes: IndexedMap<usize>,
    pub union_branches: Vec<usize>,
    pub joins: Vec<JoinKey>,
}

impl Scope {
    pub fn new(id: usize, name: impl Into<String>, parent: Option<usize>) -> Self {
        Self {
            id,
            name: name.into(),
            parent,
            relations: IndexedMap::new(),
            projections: IndexedMap::new(),
            ctes: IndexedMap::new(),
            union_branches: Vec::new(),
            joins: Vec::new(),
        }
    }

    pub fn is_union(&self) -> bool {
        !self.union_branches.is_empty()
    }
}
