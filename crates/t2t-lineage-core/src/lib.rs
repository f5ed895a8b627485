//! Column-level physical data-lineage resolver for Oracle T2T SQL
//! transformation scripts.
//!
//! Given a SQL SELECT/WITH/UNION statement, a catalog of declared target
//! mappings, and an optional physical data-model dictionary, [`resolve_mapping`]
//! produces the set of physical `(table, column)` pairs feeding every target
//! column, the joins wiring the query together, and a data-model validation
//! verdict for every resolved reference.
//!
//! The pipeline: [`normalizer`] strips comments/placeholders/vendor quirks,
//! [`parser`] hands the normalized text to `sqlparser`, [`scope_builder`]
//! turns the AST into a tree of [`types::DataModel`]-aware scopes, and
//! [`resolver`] (plus [`joins`]) recursively chases every reference back to
//! a physical column, a constant, or a diagnosed `Unresolved` outcome.
//! [`mapping_driver`] drives that machinery per declared mapping row.

mod collections;
mod constants;
mod error;
mod extractor;
mod joins;
mod mapping_driver;
mod normalizer;
mod parser;
mod resolver;
mod scope_builder;
mod types;

pub use error::{AnalyzeError, ParseError, ParseErrorKind, Position};
pub use types::{
    ColumnRef, DataModel, Diagnostics, JoinSide, LineageEdge, MappingRow, ObjectStats,
    ResolvedColumn, RowType, Severity, SourceKind, SourceType, UnresolvedReason, UsageRole,
    Warning,
};

pub use constants::{UNPIVOT_FOR_PREFIX, UNPIVOT_VALUE_PREFIX};
pub use normalizer::normalize;

const DEFAULT_MAX_DEPTH: usize = 50;

/// Runs the full pipeline over one SQL statement and its declared mapping
/// rows: normalize, parse, build the scope tree, then drive every mapping
/// row (plus join edges) through the resolver.
///
/// `max_depth` bounds recursion (§4.5/§9); pass `None` for the spec's
/// default of 50.
#[cfg_attr(
    feature = "tracing",
    tracing::instrument(skip(sql, mapping_rows, data_model), fields(rows = mapping_rows.len()))
)]
pub fn resolve_mapping(
    sql: &str,
    mapping_rows: &[MappingRow],
    data_model: Option<&DataModel>,
    max_depth: Option<usize>,
) -> Result<(Vec<LineageEdge>, Diagnostics), AnalyzeError> {
    let normalized = normalizer::normalize(sql);
    let statement = parser::parse_select(&normalized)?;
    let (arena, root) = scope_builder::build_scope_tree(&statement, data_model);
    Ok(mapping_driver::drive(
        mapping_rows,
        &arena,
        root,
        data_model,
        max_depth.unwrap_or(DEFAULT_MAX_DEPTH),
    ))
}
