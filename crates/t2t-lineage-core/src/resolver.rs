//! Resolver (§4.5): recursively walks the scope tree to turn a `ColumnRef`
//! (or a whole expression) into physical columns, constants, or a
//! diagnosed `Unresolved` outcome. Total — never panics for ordinary
//! input; the fallback ladder in [`resolve_expression`] catches the
//! unexpected case defensively so a caller never sees a Rust panic.

use std::collections::HashSet;
use std::panic::AssertUnwindSafe;

use crate::constants::is_constant;
use crate::extractor::extract_refs;
use crate::scope_builder::ScopeArena;
use crate::types::{ColumnRef, DataModel, ResolvedColumn, UnresolvedReason};
use crate::types::{ProjectionDef, Relation, Scope};

const DEFAULT_MAX_DEPTH: usize = 50;

/// Visited-set key for cycle detection: a scope's arena id (its identity,
/// not its textual name) paired with the normalized reference text.
type VisitKey = (usize, String);

pub(crate) struct ResolverCtx<'a> {
    arena: &'a ScopeArena,
    data_model: Option<&'a DataModel>,
    max_depth: usize,
}

impl<'a> ResolverCtx<'a> {
    pub(crate) fn new(arena: &'a ScopeArena, data_model: Option<&'a DataModel>) -> Self {
        Self {
            arena,
            data_model,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub(crate) fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub(crate) fn resolve(&self, cref: &ColumnRef, scope_id: usize) -> Vec<ResolvedColumn> {
        let mut visited = HashSet::new();
        let mut trace = Vec::new();
        self.resolve_inner(cref, scope_id, &mut visited, &mut trace)
    }

    fn trace_path(&self, trace: &[String]) -> String {
        trace.join("::")
    }

    fn scope(&self, id: usize) -> &Scope {
        self.arena.get(id)
    }

    fn resolve_inner(
        &self,
        cref: &ColumnRef,
        scope_id: usize,
        visited: &mut HashSet<VisitKey>,
        trace: &mut Vec<String>,
    ) -> Vec<ResolvedColumn> {
        let normalized = cref.display();

        // Step 1: constant fast-path.
        if is_constant(&normalized) {
            return vec![ResolvedColumn::Constant {
                literal_text: normalized,
                trace_path: self.trace_path(trace),
            }];
        }

        let key = (scope_id, normalized.clone());
        if visited.contains(&key) {
            return vec![ResolvedColumn::unresolved(
                UnresolvedReason::CycleDetected,
                self.trace_path(trace),
                normalized,
                format!("re-entered scope {scope_id} while resolving the same reference"),
            )];
        }
        if trace.len() > self.max_depth {
            return vec![ResolvedColumn::unresolved(
                UnresolvedReason::DepthGuard,
                self.trace_path(trace),
                normalized,
                format!("exceeded max_depth={}", self.max_depth),
            )];
        }

        visited.insert(key.clone());
        trace.push(self.scope(scope_id).name.clone());

        let result = match &cref.alias {
            Some(_) => self.resolve_qualified(cref, scope_id, visited, trace),
            None => self.resolve_unqualified(cref, scope_id, visited, trace),
        };

        trace.pop();
        visited.remove(&key);
        result
    }

    /// Finds the relation bound to `alias` by searching `scope_id` directly,
    /// then probing into its child scopes' own relations (so a star-expanded
    /// reference like `SLC.FIC_MIS_DATE` still resolves when `SLC` is only
    /// defined two levels deep). Returns the scope id where the alias was
    /// found alongside the relation it names.
    fn find_alias_target(&self, scope_id: usize, alias: &str) -> Option<(usize, Relation)> {
        let scope = self.scope(scope_id);
        if let Some(rel) = scope.relations.get(alias) {
            return Some((scope_id, rel.clone()));
        }
        if let Some(&cte_id) = scope.ctes.get(alias) {
            return Some((scope_id, Relation::Child(cte_id)));
        }
        for (_, rel) in scope.relations.iter() {
            if let Relation::Child(child_id) = rel {
                if let Some(found) = self.find_alias_in_subtree(*child_id, alias) {
                    return Some(found);
                }
            }
        }
        None
    }

    fn find_alias_in_subtree(&self, scope_id: usize, alias: &str) -> Option<(usize, Relation)> {
        let scope = self.scope(scope_id);
        if let Some(rel) = scope.relations.get(alias) {
            return Some((scope_id, rel.clone()));
        }
        for (_, rel) in scope.relations.iter() {
            if let Relation::Child(child_id) = rel {
                if let Some(found) = self.find_alias_in_subtree(*child_id, alias) {
                    return Some(found);
                }
            }
        }
        None
    }

    fn resolve_qualified(
        &self,
        cref: &ColumnRef,
        scope_id: usize,
        visited: &mut HashSet<VisitKey>,
        trace: &mut Vec<String>,
    ) -> Vec<ResolvedColumn> {
        let alias = cref.alias.as_deref().unwrap();
        let column = cref.column.clone();

        let mut current = Some(scope_id);
        while let Some(sid) = current {
            if let Some((owner, rel)) = self.find_alias_target(sid, alias) {
                return self.resolve_qualified_relation(cref, &rel, owner, &column, visited, trace);
            }
            current = self.scope(sid).parent;
        }

        vec![ResolvedColumn::unresolved(
            UnresolvedReason::AliasNotFound,
            self.trace_path(trace),
            cref.display(),
            format!("no relation bound to alias {alias}"),
        )]
    }

    fn resolve_qualified_relation(
        &self,
        cref: &ColumnRef,
        rel: &Relation,
        originating_scope: usize,
        column: &str,
        visited: &mut HashSet<VisitKey>,
        trace: &mut Vec<String>,
    ) -> Vec<ResolvedColumn> {
        match rel {
            Relation::Table(table) => vec![self.physical(table.clone(), column.to_string(), cref, trace)],
            Relation::Child(child_id) => {
                // Self-reference: the alias resolves back to the scope that
                // is doing the resolving. Fall back to an unqualified lookup
                // rather than recursing into ourselves.
                if *child_id == originating_scope {
                    let mut fresh_visited = HashSet::new();
                    return self.resolve_unqualified(
                        &ColumnRef::bare(column.to_string()),
                        originating_scope,
                        &mut fresh_visited,
                        trace,
                    );
                }

                let child = self.scope(*child_id);
                if child.is_union() {
                    return self.resolve_union(*child_id, column, trace);
                }
                if let Some(proj) = child.projections.get(column).cloned() {
                    let mut fresh_visited = HashSet::new();
                    return self.resolve_expression_in_scope(
                        &proj.expression_text,
                        *child_id,
                        &mut fresh_visited,
                        trace,
                    );
                }

                vec![ResolvedColumn::unresolved(
                    UnresolvedReason::MissingProjection,
                    self.trace_path(trace),
                    cref.display(),
                    format!(
                        "{column} not found among {:?}",
                        child.projections.keys().collect::<Vec<_>>()
                    ),
                )]
            }
        }
    }

    fn resolve_unqualified(
        &self,
        cref: &ColumnRef,
        scope_id: usize,
        visited: &mut HashSet<VisitKey>,
        trace: &mut Vec<String>,
    ) -> Vec<ResolvedColumn> {
        let column = cref.column.clone();
        let scope = self.scope(scope_id);

        if scope.is_union() {
            return self.resolve_union(scope_id, &column, trace);
        }

        if let Some(proj) = scope.projections.get(&column).cloned() {
            if self.is_identity_projection(&proj, &column, scope_id) {
                if let Some(origin) = &proj.origin_alias {
                    if let Some((_, Relation::Child(child_id))) =
                        self.find_alias_target(scope_id, origin)
                    {
                        if let Some(child_proj) =
                            self.scope(child_id).projections.get(&column).cloned()
                        {
                            let mut fresh_visited = HashSet::new();
                            return self.resolve_expression_in_scope(
                                &child_proj.expression_text,
                                child_id,
                                &mut fresh_visited,
                                trace,
                            );
                        }
                    }
                }
                for (_, rel) in scope.relations.iter() {
                    if let Relation::Child(child_id) = rel {
                        if let Some(child_proj) =
                            self.scope(*child_id).projections.get(&column).cloned()
                        {
                            let mut fresh_visited = HashSet::new();
                            return self.resolve_expression_in_scope(
                                &child_proj.expression_text,
                                *child_id,
                                &mut fresh_visited,
                                trace,
                            );
                        }
                    }
                }
            }
            return self.resolve_expression_in_scope(&proj.expression_text, scope_id, visited, trace);
        }

        let mut child_hits = Vec::new();
        let mut physical_hits: Vec<(String, String)> = Vec::new();
        for (alias, rel) in scope.relations.iter() {
            match rel {
                Relation::Child(child_id) => {
                    if self.scope(*child_id).projections.contains_key(&column) {
                        child_hits.push(*child_id);
                    }
                }
                Relation::Table(table) => {
                    if self.table_is_candidate(table, &column) {
                        physical_hits.push((alias.to_string(), table.clone()));
                    }
                }
            }
        }

        if !child_hits.is_empty() {
            let mut out = Vec::new();
            for child_id in child_hits {
                let proj = self.scope(child_id).projections.get(&column).unwrap().clone();
                let mut fresh_visited = HashSet::new();
                out.extend(self.resolve_expression_in_scope(
                    &proj.expression_text,
                    child_id,
                    &mut fresh_visited,
                    trace,
                ));
            }
            return out;
        }

        if !physical_hits.is_empty() {
            return physical_hits
                .into_iter()
                .map(|(alias, table)| {
                    let qualified = ColumnRef::qualified(alias, column.clone());
                    self.physical(table, column.clone(), &qualified, trace)
                })
                .collect();
        }

        if let Some(parent_id) = scope.parent {
            return self.resolve_inner(&ColumnRef::bare(column), parent_id, visited, trace);
        }

        vec![ResolvedColumn::unresolved(
            UnresolvedReason::ColumnNotFound,
            self.trace_path(trace),
            cref.display(),
            "no projection, relation, or parent scope produced this column".to_string(),
        )]
    }

    fn is_identity_projection(&self, proj: &ProjectionDef, column: &str, scope_id: usize) -> bool {
        let expr = proj.expression_text.trim();
        if expr.eq_ignore_ascii_case(column) {
            return true;
        }
        if let Some((alias, col)) = expr.rsplit_once('.') {
            if col.trim().eq_ignore_ascii_case(column) {
                let scope = self.scope(scope_id);
                return !scope.relations.contains_key(&alias.trim().to_uppercase());
            }
        }
        false
    }

    /// A physical table is a candidate source for a bare column when either
    /// there is no data model to check against, the table itself is not in
    /// the data model (we cannot rule it out), or the data model confirms
    /// the table actually has that column.
    fn table_is_candidate(&self, table: &str, column: &str) -> bool {
        match self.data_model {
            None => true,
            Some(dm) => !dm.has_table(table) || dm.matches(table, column),
        }
    }

    /// Resolution against a UNION scope (§4.5 step 3.1 / step 2.4): try each
    /// arm's projection by name, else fall back to the position `column`
    /// occupies in the first arm, else resolve `column` unqualified directly
    /// in that arm. Returns the union of every arm's results.
    fn resolve_union(&self, scope_id: usize, column: &str, trace: &mut Vec<String>) -> Vec<ResolvedColumn> {
        let scope = self.scope(scope_id);
        let branches = scope.union_branches.clone();
        let first_arm_index = branches.first().and_then(|&first| {
            self.scope(first)
                .projections
                .keys()
                .position(|k| k.eq_ignore_ascii_case(column))
        });

        let mut out = Vec::new();
        for branch_id in branches {
            let branch = self.scope(branch_id);
            if let Some(proj) = branch.projections.get(column).cloned() {
                let mut v = HashSet::new();
                let mut t = trace.clone();
                out.extend(self.resolve_expression_in_scope(&proj.expression_text, branch_id, &mut v, &mut t));
                continue;
            }
            if let Some(idx) = first_arm_index {
                if let Some(proj) = branch.projections.values().nth(idx).cloned() {
                    let mut v = HashSet::new();
                    let mut t = trace.clone();
                    out.extend(self.resolve_expression_in_scope(
                        &proj.expression_text,
                        branch_id,
                        &mut v,
                        &mut t,
                    ));
                    continue;
                }
            }
            let mut v = HashSet::new();
            let mut t = trace.clone();
            out.extend(self.resolve_unqualified(&ColumnRef::bare(column.to_string()), branch_id, &mut v, &mut t));
        }
        out
    }

    fn physical(&self, table: String, column: String, cref: &ColumnRef, trace: &[String]) -> ResolvedColumn {
        let dm_match = self.data_model.is_some_and(|dm| dm.matches(&table, &column));
        ResolvedColumn::Physical {
            table,
            column,
            dm_match,
            trace_path: self.trace_path(trace),
            source_alias: cref.alias.clone(),
            original_ref: cref.display(),
        }
    }

    /// Resolves a full expression's text (not a single reference): a
    /// whole-expression constant short-circuits, a single bare reference
    /// recurses through the normal cycle/depth machinery, and anything else
    /// is the concatenation of each extracted reference's resolution, in
    /// order (§4.5 "Expression resolution").
    fn resolve_expression_in_scope(
        &self,
        expression_text: &str,
        scope_id: usize,
        visited: &mut HashSet<VisitKey>,
        trace: &mut Vec<String>,
    ) -> Vec<ResolvedColumn> {
        let trimmed = expression_text.trim();
        if trimmed.is_empty() {
            return vec![ResolvedColumn::unresolved(
                UnresolvedReason::ParserLimitation,
                self.trace_path(trace),
                trimmed.to_string(),
                "empty expression text".to_string(),
            )];
        }
        if is_constant(trimmed) {
            return vec![ResolvedColumn::Constant {
                literal_text: trimmed.to_uppercase(),
                trace_path: self.trace_path(trace),
            }];
        }

        let refs = extract_refs(trimmed);
        if refs.is_empty() {
            return vec![ResolvedColumn::unresolved(
                UnresolvedReason::ParserLimitation,
                self.trace_path(trace),
                trimmed.to_string(),
                "no column references extracted from expression".to_string(),
            )];
        }

        if refs.len() == 1 && refs[0].display().eq_ignore_ascii_case(trimmed) {
            return self.resolve_inner(&refs[0], scope_id, visited, trace);
        }

        let mut out = Vec::new();
        for r in &refs {
            let mut local_visited = visited.clone();
            let mut local_trace = trace.clone();
            out.extend(self.resolve_inner(r, scope_id, &mut local_visited, &mut local_trace));
        }
        out
    }
}

/// Public fallback-ladder entry point (§4.5): full expression resolve
/// first; on an unexpected panic, retry reference-by-reference recording
/// each failure as `PartialFailure`; if that also yields nothing, a single
/// `Unresolved{CompleteFailure}` carrying the original text.
pub(crate) fn resolve_expression(
    ctx: &ResolverCtx<'_>,
    expression_text: &str,
    scope_id: usize,
) -> Vec<ResolvedColumn> {
    let mut visited = HashSet::new();
    let mut trace = Vec::new();
    let attempt = std::panic::catch_unwind(AssertUnwindSafe(|| {
        ctx.resolve_expression_in_scope(expression_text, scope_id, &mut visited, &mut trace)
    }));

    match attempt {
        Ok(results) => results,
        Err(_) => {
            let refs = extract_refs(expression_text);
            let mut out = Vec::new();
            let mut any_ok = false;
            for r in &refs {
                let retried = std::panic::catch_unwind(AssertUnwindSafe(|| ctx.resolve(r, scope_id)));
                match retried {
                    Ok(results) => {
                        any_ok = true;
                        out.extend(results);
                    }
                    Err(_) => out.push(ResolvedColumn::unresolved(
                        UnresolvedReason::PartialFailure,
                        String::new(),
                        r.display(),
                        "resolution failed unexpectedly for this reference".to_string(),
                    )),
                }
            }
            if any_ok {
                out
            } else {
                vec![ResolvedColumn::unresolved(
                    UnresolvedReason::CompleteFailure,
                    String::new(),
                    expression_text.to_string(),
                    "expression resolution failed entirely".to_string(),
                )]
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_select;
    use crate::scope_builder::build_scope_tree;

    fn setup(sql: &str, dm: Option<DataModel>) -> (ScopeArena, usize, Option<DataModel>) {
        let stmt = parse_select(sql).unwrap();
        let (arena, root) = build_scope_tree(&stmt, dm.as_ref());
        (arena, root, dm)
    }

    #[test]
    fn resolves_direct_physical_column() {
        let (arena, root, dm) = setup("SELECT a.x FROM t a", None);
        let ctx = ResolverCtx::new(&arena, dm.as_ref());
        let results = ctx.resolve(&ColumnRef::qualified("A", "X"), root);
        assert_eq!(results.len(), 1);
        assert!(matches!(&results[0], ResolvedColumn::Physical { table, column, .. } if table == "T" && column == "X"));
    }

    #[test]
    fn resolves_through_subquery_projection() {
        let (arena, root, dm) = setup("SELECT s.x FROM (SELECT a.x FROM t a) s", None);
        let ctx = ResolverCtx::new(&arena, dm.as_ref());
        let results = ctx.resolve(&ColumnRef::qualified("S", "X"), root);
        assert_eq!(results.len(), 1);
        assert!(matches!(&results[0], ResolvedColumn::Physical { table, .. } if table == "T"));
    }

    #[test]
    fn resolves_unqualified_through_cte() {
        let (arena, root, dm) = setup("WITH c AS (SELECT a.x FROM t a) SELECT x FROM c", None);
        let ctx = ResolverCtx::new(&arena, dm.as_ref());
        let results = ctx.resolve(&ColumnRef::bare("X"), root);
        assert_eq!(results.len(), 1);
        assert!(results[0].is_physical());
    }

    #[test]
    fn constant_expression_short_circuits() {
        let (arena, root, dm) = setup("SELECT SYSDATE AS d FROM t a", None);
        let ctx = ResolverCtx::new(&arena, dm.as_ref());
        let results = resolve_expression(&ctx, "SYSDATE", root);
        assert_eq!(results.len(), 1);
        assert!(matches!(&results[0], ResolvedColumn::Constant { .. }));
    }

    #[test]
    fn unknown_column_is_unresolved_with_reason() {
        let (arena, root, dm) = setup("SELECT a.x FROM t a", None);
        let ctx = ResolverCtx::new(&arena, dm.as_ref());
        let results = ctx.resolve(&ColumnRef::bare("NOPE"), root);
        assert_eq!(results.len(), 1);
        assert!(matches!(
            &results[0],
            ResolvedColumn::Unresolved { reason: UnresolvedReason::ColumnNotFound, .. }
        ));
    }

    #[test]
    fn self_join_cycle_is_guarded() {
        let (arena, root, dm) = setup(
            "WITH c AS (SELECT x FROM c) SELECT x FROM c",
            None,
        );
        let ctx = ResolverCtx::new(&arena, dm.as_ref());
        let results = ctx.resolve(&ColumnRef::bare("X"), root);
        assert_eq!(results.len(), 1);
        assert!(matches!(
            &results[0],
            ResolvedColumn::Unresolved { reason: UnresolvedReason::CycleDetected, .. }
        ));
    }

    #[test]
    fn dm_match_reflects_data_model() {
        let mut dm = DataModel::new();
        dm.insert_table("T", vec!["X"]);
        let (arena, root, dm) = setup("SELECT a.x FROM t a", Some(dm));
        let ctx = ResolverCtx::new(&arena, dm.as_ref());
        let results = ctx.resolve(&ColumnRef::qualified("A", "X"), root);
        assert!(matches!(&results[0], ResolvedColumn::Physical { dm_match: true, .. }));
    }

    #[test]
    fn union_resolves_each_arm() {
        let (arena, root, dm) = setup("SELECT a FROM t1 UNION ALL SELECT b FROM t2", None);
        let ctx = ResolverCtx::new(&arena, dm.as_ref());
        let results = ctx.resolve(&ColumnRef::bare("A"), root);
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.is_physical()));
    }
}
