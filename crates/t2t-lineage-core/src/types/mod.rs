//! Public and crate-internal data types for the lineage resolver.
//!
//! The split mirrors the teacher crate's `types/` module: wire-shaped types
//! that a caller serializes (derive `Serialize`/`Deserialize`/`JsonSchema`)
//! live alongside crate-private scope-graph types that never leave the
//! crate boundary.

mod column_ref;
mod data_model;
mod edge;
mod mapping;
mod resolved;
mod scope;

pub use column_ref::ColumnRef;
pub use data_model::DataModel;
pub use edge::{JoinSide, LineageEdge, RowType, SourceType};
pub use mapping::{Diagnostics, MappingRow, ObjectStats, Severity, SourceKind, UsageRole, Warning};
pub use resolved::{ResolvedColumn, UnresolvedReason};

pub(crate) use scope::{
    JoinFilter, JoinKey, JoinKeyResolved, JoinKind, JoinRole, ProjectionDef, Relation, Scope,
};
