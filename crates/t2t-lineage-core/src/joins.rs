//! Join-Key Resolver (§4.6, resolution half): walks every scope in the
//! arena and resolves that scope's captured [`JoinKey`]s against the
//! resolver, in their **owning scope** rather than the root — a join's
//! `ON` clause only ever references aliases visible in the scope that
//! declared it.
//!
//! Join capture itself (splitting an `ON` clause into equalities and
//! filters) happens in [`crate::scope_builder`]; this module only resolves
//! the already-captured [`JoinKey::left_ref`]/`right_ref`/`filters`.

use crate::resolver::ResolverCtx;
use crate::scope_builder::ScopeArena;
use crate::types::{ColumnRef, DataModel, JoinSide};
use crate::types::{JoinKeyResolved, JoinRole, Scope};

/// Resolves every join in every scope of `arena`, in scope-id order (which
/// is allocation order, i.e. depth-first as the scope builder walked the
/// AST) so output ordering is deterministic.
pub(crate) fn resolve_joins(
    arena: &ScopeArena,
    data_model: Option<&DataModel>,
    max_depth: usize,
) -> Vec<JoinKeyResolved> {
    let ctx = ResolverCtx::new(arena, data_model).with_max_depth(max_depth);
    let mut out = Vec::new();
    for scope_id in 0..arena.len() {
        let scope = arena.get(scope_id);
        for key in &scope.joins {
            resolve_one_join(&ctx, scope, key, data_model, &mut out);
        }
    }
    out
}

fn resolve_one_join(
    ctx: &ResolverCtx<'_>,
    scope: &Scope,
    key: &crate::types::JoinKey,
    data_model: Option<&DataModel>,
    out: &mut Vec<JoinKeyResolved>,
) {
    if let Some(left) = &key.left_ref {
        for resolved in ctx.resolve(left, scope.id) {
            out.push(JoinKeyResolved {
                seq: key.seq,
                kind: key.kind,
                owning_scope: scope.name.clone(),
                role: JoinRole::Key,
                side: JoinSide::Left,
                condition_text: key.condition_text.clone(),
                resolved,
            });
        }
    }
    if let Some(right) = &key.right_ref {
        for resolved in ctx.resolve(right, scope.id) {
            out.push(JoinKeyResolved {
                seq: key.seq,
                kind: key.kind,
                owning_scope: scope.name.clone(),
                role: JoinRole::Key,
                side: JoinSide::Right,
                condition_text: key.condition_text.clone(),
                resolved,
            });
        }
    }

    for filter in &key.filters {
        for cref in relevant_refs(&filter.refs, scope, data_model) {
            for resolved in ctx.resolve(cref, scope.id) {
                out.push(JoinKeyResolved {
                    seq: key.seq,
                    kind: key.kind,
                    owning_scope: scope.name.clone(),
                    role: JoinRole::Filter,
                    side: JoinSide::Filter,
                    condition_text: filter.text.clone(),
                    resolved,
                });
            }
        }
    }
}

/// Filters out references a filter predicate's own text cannot actually be
/// about in this scope: a qualified ref whose alias is neither a relation
/// of the owning scope nor a table the data model knows, per §4.6's
/// "uses the data-model table set and the owning scope's alias set to
/// decide." Bare refs are always kept — they're resolved the normal
/// unqualified way (own projections, relations, then parent scope).
fn relevant_refs<'r>(
    refs: &'r [ColumnRef],
    scope: &Scope,
    data_model: Option<&DataModel>,
) -> Vec<&'r ColumnRef> {
    refs.iter()
        .filter(|r| match &r.alias {
            None => true,
            Some(alias) => {
                scope.relations.contains_key(alias)
                    || data_model.is_some_and(|dm| dm.has_table(alias))
            }
        })
        .collect()
}
