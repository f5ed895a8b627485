//! Scope Builder (§4.4): walks the `sqlparser` AST and produces the Scope
//! Tree — a hierarchy of query scopes rooted at the top-level SELECT, each
//! owning its relations, projections, CTE table, UNION branches, and
//! direct joins.
//!
//! Scopes live in a flat arena ([`ScopeArena`]) rather than as owned
//! `Box<Scope>` children, so `parent` can be a plain index rather than a
//! borrow-checker-hostile back-reference. A scope's `id` (its arena index)
//! is also the resolver's cycle-detection identity.

use sqlparser::ast::{
    Expr, GroupByExpr, Join, JoinConstraint, JoinOperator, Query, Select, SelectItem, SetExpr,
    Statement, TableFactor, TableWithJoins, With,
};

use crate::constants::{UNPIVOT_FOR_PREFIX, UNPIVOT_VALUE_PREFIX};
use crate::extractor::extract_refs;
use crate::types::{ColumnRef, DataModel, JoinFilter, JoinKey, JoinKind, ProjectionDef, Relation, Scope};

/// Owns every [`Scope`] built for one statement. Indices never get reused
/// or removed, so an `id` stays a stable, unique identity for the lifetime
/// of the arena.
#[derive(Debug, Default)]
pub(crate) struct ScopeArena {
    nodes: Vec<Scope>,
}

impl ScopeArena {
    fn alloc(&mut self, name: impl Into<String>, parent: Option<usize>) -> usize {
        let id = self.nodes.len();
        self.nodes.push(Scope::new(id, name, parent));
        id
    }

    pub(crate) fn get(&self, id: usize) -> &Scope {
        &self.nodes[id]
    }

    pub(crate) fn get_mut(&mut self, id: usize) -> &mut Scope {
        &mut self.nodes[id]
    }

    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }
}

/// Builds the full scope tree for a parsed statement, returning the arena
/// and the root scope's id.
pub(crate) fn build_scope_tree(
    statement: &Statement,
    data_model: Option<&DataModel>,
) -> (ScopeArena, usize) {
    let mut builder = Builder {
        arena: ScopeArena::default(),
        data_model,
    };
    let query = match statement {
        Statement::Query(query) => query,
        _ => unreachable!("parser::parse_select guarantees a Query statement"),
    };
    let root = builder.build_query(query, None, "ROOT");
    (builder.arena, root)
}

struct Builder<'a> {
    arena: ScopeArena,
    data_model: Option<&'a DataModel>,
}

impl<'a> Builder<'a> {
    fn build_query(&mut self, query: &Query, parent: Option<usize>, name: &str) -> usize {
        let scope_id = self.arena.alloc(name.to_string(), parent);
        self.process_with(&query.with, scope_id, name);
        self.build_set_expr_into(&query.body, scope_id, name);
        scope_id
    }

    /// CTE two-pass registration (§4.4): pre-register every CTE name with a
    /// placeholder, then build each CTE's scope and replace the
    /// placeholder. CTEs registered here are visible to all descendants via
    /// the resolver's scope-chain walk.
    fn process_with(&mut self, with: &Option<With>, scope_id: usize, name: &str) {
        let Some(with) = with else { return };

        for cte in &with.cte_tables {
            let cte_name = cte.alias.name.value.to_uppercase();
            let placeholder = self
                .arena
                .alloc(format!("{name}::CTE::{cte_name}::placeholder"), Some(scope_id));
            self.arena.get_mut(scope_id).ctes.insert(cte_name, placeholder);
        }

        for cte in &with.cte_tables {
            let cte_name = cte.alias.name.value.to_uppercase();
            let built = self.build_query(&cte.query, Some(scope_id), &format!("{name}::CTE::{cte_name}"));
            self.arena.get_mut(scope_id).ctes.insert(cte_name, built);
        }
    }

    fn build_set_expr_into(&mut self, body: &SetExpr, scope_id: usize, name: &str) {
        match body {
            SetExpr::Select(select) => self.build_select_into(select, scope_id, name),
            SetExpr::Query(inner) => {
                self.process_with(&inner.with, scope_id, name);
                self.build_set_expr_into(&inner.body, scope_id, name);
            }
            SetExpr::SetOperation { .. } => self.build_union_into(body, scope_id, name),
            SetExpr::Values(_) | SetExpr::Insert(_) => {
                // Nothing to register: no FROM, no projections.
            }
        }
    }

    /// UNION handling (§4.4): build every arm as a child scope, then
    /// synthesize the union scope's own projections by walking the first
    /// arm in order. Actual reference resolution against a union scope is
    /// special-cased in the resolver (it inspects `union_branches`
    /// directly); these synthesized projections exist so `SELECT *` and
    /// outer scopes can see the union's output names.
    fn build_union_into(&mut self, body: &SetExpr, scope_id: usize, name: &str) {
        let mut arm_exprs = Vec::new();
        collect_union_arms(body, &mut arm_exprs);

        let mut arm_ids = Vec::new();
        for (i, arm) in arm_exprs.iter().enumerate() {
            let arm_id = self.arena.alloc(format!("{name}::UNION::{i}"), Some(scope_id));
            self.build_set_expr_into(arm, arm_id, &format!("{name}::UNION::{i}"));
            arm_ids.push(arm_id);
        }

        self.arena.get_mut(scope_id).union_branches = arm_ids.clone();

        // Relations: publish every arm's relations, first-arm precedence.
        for &arm_id in &arm_ids {
            let arm_relations: Vec<(String, Relation)> = self
                .arena
                .get(arm_id)
                .relations
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect();
            for (alias, rel) in arm_relations {
                if !self.arena.get(scope_id).relations.contains_key(&alias) {
                    self.arena.get_mut(scope_id).relations.insert(alias, rel);
                }
            }
        }

        // Projections: first-arm ordering and naming (spec invariant).
        if let Some(&first_arm) = arm_ids.first() {
            let first_arm_projections: Vec<ProjectionDef> = self
                .arena
                .get(first_arm)
                .projections
                .values()
                .cloned()
                .collect();
            for projection in first_arm_projections {
                self.arena
                    .get_mut(scope_id)
                    .projections
                    .insert(projection.output_name.clone(), projection);
            }
        }
    }

    fn build_select_into(&mut self, select: &Select, scope_id: usize, name: &str) {
        let mut join_seq = 0usize;

        for twj in &select.from {
            self.register_table_with_joins(twj, scope_id, name, &mut join_seq);
        }

        for item in &select.projection {
            self.register_select_item(item, scope_id);
        }

        if let Some(selection) = &select.selection {
            self.register_correlated_subqueries(selection, scope_id, name);
        }
        if let Some(having) = &select.having {
            self.register_correlated_subqueries(having, scope_id, name);
        }
        if let GroupByExpr::Expressions(exprs, _) = &select.group_by {
            for expr in exprs {
                self.register_correlated_subqueries(expr, scope_id, name);
            }
        }
    }

    fn register_table_with_joins(
        &mut self,
        twj: &TableWithJoins,
        scope_id: usize,
        name: &str,
        join_seq: &mut usize,
    ) {
        self.register_table_factor(&twj.relation, scope_id, name);
        for join in &twj.joins {
            self.register_table_factor(&join.relation, scope_id, name);
            *join_seq += 1;
            self.capture_join(join, scope_id, *join_seq);
        }
    }

    fn register_table_factor(&mut self, factor: &TableFactor, scope_id: usize, name: &str) {
        match factor {
            TableFactor::Table {
                name: table_name,
                alias,
                ..
            } => {
                let table_name = table_name.to_string().to_uppercase();
                let alias_str = alias
                    .as_ref()
                    .map(|a| a.name.value.to_uppercase())
                    .unwrap_or_else(|| last_identifier_part(&table_name));

                if let Some(cte_id) = self.find_visible_cte(scope_id, &table_name) {
                    self.arena
                        .get_mut(scope_id)
                        .relations
                        .insert(alias_str, Relation::Child(cte_id));
                } else {
                    self.arena
                        .get_mut(scope_id)
                        .relations
                        .insert(alias_str, Relation::Table(table_name));
                }
            }
            TableFactor::Derived {
                subquery, alias, ..
            } => {
                let child_name = alias
                    .as_ref()
                    .map(|a| format!("{name}::{}", a.name.value))
                    .unwrap_or_else(|| format!("{name}::ANON"));
                let child_id = self.build_query(subquery, Some(scope_id), &child_name);
                // An unaliased derived table keeps its pack-wide `__ANON__`
                // alias; a second unaliased one in the same scope collides
                // and overwrites the first, matching the resolver's
                // documented "last one wins" behavior for this edge case.
                let alias_str = alias
                    .as_ref()
                    .map(|a| a.name.value.to_uppercase())
                    .unwrap_or_else(|| "__ANON__".to_string());
                self.arena
                    .get_mut(scope_id)
                    .relations
                    .insert(alias_str, Relation::Child(child_id));
            }
            TableFactor::NestedJoin {
                table_with_joins, ..
            } => {
                // Hoist: register every table inside into the current
                // scope directly; aliases propagate up.
                self.register_table_factor(&table_with_joins.relation, scope_id, name);
                let mut seq = 0usize;
                for join in &table_with_joins.joins {
                    self.register_table_factor(&join.relation, scope_id, name);
                    seq += 1;
                    self.capture_join(join, scope_id, seq);
                }
            }
            TableFactor::Unpivot {
                table,
                value,
                columns,
                alias,
                ..
            } => {
                self.register_table_factor(table, scope_id, name);
                if let Some(alias) = alias {
                    // The unpivot's own alias, if given, also names the
                    // base table relation so qualified refs against it
                    // resolve the same way.
                    if let TableFactor::Table { name: tname, .. } = table.as_ref() {
                        self.arena.get_mut(scope_id).relations.insert(
                            alias.name.value.to_uppercase(),
                            Relation::Table(tname.to_string().to_uppercase()),
                        );
                    }
                }

                // `value` is a plain `Expr`; `columns` is `Vec<ExprWithAlias>`.
                let value_text = value.to_string();
                let value_name = sanitize_identifier(&value_text);
                self.arena.get_mut(scope_id).projections.insert(
                    value_name.clone(),
                    ProjectionDef::new(value_name, format!("{UNPIVOT_VALUE_PREFIX}{value_text})")),
                );

                for column in columns {
                    let raw = column.expr.to_string();
                    let for_name = column
                        .alias
                        .as_ref()
                        .map(|a| a.value.to_uppercase())
                        .unwrap_or_else(|| sanitize_identifier(&raw));
                    self.arena.get_mut(scope_id).projections.insert(
                        for_name.clone(),
                        ProjectionDef::new(for_name, format!("{UNPIVOT_FOR_PREFIX}{raw})")),
                    );
                }
            }
            // Table-valued functions, UNNEST, PIVOT, MATCH_RECOGNIZE, and
            // JSON_TABLE are outside the Oracle T2T surface this builder
            // targets; left unregistered rather than guessed at.
            TableFactor::TableFunction { .. }
            | TableFactor::Function { .. }
            | TableFactor::UNNEST { .. }
            | TableFactor::Pivot { .. }
            | TableFactor::MatchRecognize { .. }
            | TableFactor::JsonTable { .. } => {}
        }
    }

    fn capture_join(&mut self, join: &Join, scope_id: usize, seq: usize) {
        let (kind, constraint) = classify_join_operator(&join.join_operator);
        let Some(constraint) = constraint else {
            self.arena.get_mut(scope_id).joins.push(JoinKey::key_only(
                seq,
                kind,
                None,
                None,
                String::new(),
                Vec::new(),
            ));
            return;
        };

        let JoinConstraint::On(on_expr) = constraint else {
            self.arena.get_mut(scope_id).joins.push(JoinKey::key_only(
                seq,
                kind,
                None,
                None,
                constraint_text(constraint),
                Vec::new(),
            ));
            return;
        };

        let mut conjuncts = Vec::new();
        flatten_and(on_expr, &mut conjuncts);

        let mut keys = Vec::new();
        let mut filters = Vec::new();
        for conjunct in conjuncts {
            if let Some((left, right)) = simple_equality(conjunct) {
                keys.push((left, right, conjunct.to_string()));
            } else {
                let text = conjunct.to_string();
                let refs = extract_refs(&text);
                filters.push(JoinFilter { text, refs });
            }
        }

        if keys.is_empty() {
            self.arena.get_mut(scope_id).joins.push(JoinKey::key_only(
                seq,
                kind,
                None,
                None,
                on_expr.to_string(),
                filters,
            ));
        } else {
            for (left, right, text) in keys {
                self.arena.get_mut(scope_id).joins.push(JoinKey::key_only(
                    seq,
                    kind,
                    Some(left),
                    Some(right),
                    text,
                    filters.clone(),
                ));
            }
        }
    }

    fn register_select_item(&mut self, item: &SelectItem, scope_id: usize) {
        match item {
            SelectItem::Wildcard(_) => self.expand_star(scope_id, None),
            SelectItem::QualifiedWildcard(name, _) => {
                let qualifier = name.to_string().to_uppercase();
                self.expand_star(scope_id, Some(qualifier));
            }
            SelectItem::UnnamedExpr(expr) => {
                let text = expr.to_string();
                let refs = extract_refs(&text);
                let output_name = derive_output_name(expr, &text);
                self.insert_projection(scope_id, output_name, text, refs);
            }
            SelectItem::ExprWithAlias { expr, alias } => {
                let text = expr.to_string();
                let refs = extract_refs(&text);
                let output_name = alias.value.to_uppercase();
                self.insert_projection(scope_id, output_name, text, refs);
            }
        }
    }

    fn insert_projection(
        &mut self,
        scope_id: usize,
        output_name: String,
        expression_text: String,
        refs: Vec<ColumnRef>,
    ) {
        // §4.4: when the extracted references are exactly one qualified
        // reference, record its alias as origin_alias — identity-case
        // resolution (§4.5) relies on this.
        let origin_alias = match refs.as_slice() {
            [single] => single.alias.clone(),
            _ => None,
        };
        let mut projection = ProjectionDef::new(output_name.clone(), expression_text);
        projection.source_refs = refs;
        projection.origin_alias = origin_alias;
        self.arena
            .get_mut(scope_id)
            .projections
            .insert(output_name, projection);
    }

    /// `SELECT *` / `SELECT alias.*` expansion (§4.4).
    fn expand_star(&mut self, scope_id: usize, qualifier: Option<String>) {
        match qualifier {
            None => {
                let relations: Vec<(String, Relation)> = self
                    .arena
                    .get(scope_id)
                    .relations
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.clone()))
                    .collect();
                for (alias, rel) in relations {
                    self.expand_relation(scope_id, &alias, &rel);
                }
            }
            Some(qualifier) => {
                let rel = self.arena.get(scope_id).relations.get(&qualifier).cloned();
                if let Some(rel) = rel {
                    self.expand_relation(scope_id, &qualifier, &rel);
                }
            }
        }
    }

    fn expand_relation(&mut self, scope_id: usize, alias: &str, rel: &Relation) {
        match rel {
            Relation::Child(child_id) => {
                let projections: Vec<ProjectionDef> =
                    self.arena.get(*child_id).projections.values().cloned().collect();
                for mut projection in projections {
                    projection.origin_alias = Some(alias.to_string());
                    self.arena
                        .get_mut(scope_id)
                        .projections
                        .insert(projection.output_name.clone(), projection);
                }
            }
            Relation::Table(table_name) => {
                let columns = self.data_model.and_then(|dm| dm.columns_of(table_name).cloned());
                match columns {
                    Some(cols) if !cols.is_empty() => {
                        let mut names: Vec<&String> = cols.iter().collect();
                        names.sort();
                        for column in names {
                            let mut projection =
                                ProjectionDef::new(column.clone(), format!("{alias}.{column}"));
                            projection.source_refs = vec![ColumnRef::qualified(alias, column.clone())];
                            projection.origin_alias = Some(alias.to_string());
                            self.arena
                                .get_mut(scope_id)
                                .projections
                                .insert(column.clone(), projection);
                        }
                    }
                    _ => {
                        // Table not in the data model: emit one placeholder
                        // projection rather than silently producing nothing.
                        let placeholder_name = format!("{alias}_ALIAS");
                        let mut projection =
                            ProjectionDef::new(placeholder_name.clone(), format!("{alias}.*"));
                        projection.origin_alias = Some(alias.to_string());
                        self.arena
                            .get_mut(scope_id)
                            .projections
                            .insert(placeholder_name, projection);
                    }
                }
            }
        }
    }

    /// EXISTS/IN subqueries in WHERE/HAVING (§4.4): walk their FROM/JOINs
    /// and register encountered tables in the current scope if not already
    /// present, so correlated predicates resolve without false positives.
    fn register_correlated_subqueries(&mut self, expr: &Expr, scope_id: usize, name: &str) {
        let mut queries = Vec::new();
        walk_subqueries(expr, &mut |q| queries.push(q));
        for query in queries {
            self.register_correlated_query_tables(query, scope_id, name);
        }
    }

    fn register_correlated_query_tables(&mut self, query: &Query, scope_id: usize, name: &str) {
        if let SetExpr::Select(select) = query.body.as_ref() {
            for twj in &select.from {
                self.register_correlated_table_factor(&twj.relation, scope_id, name);
                for join in &twj.joins {
                    self.register_correlated_table_factor(&join.relation, scope_id, name);
                }
            }
        }
    }

    fn register_correlated_table_factor(&mut self, factor: &TableFactor, scope_id: usize, name: &str) {
        if let TableFactor::Table { name: table_name, alias, .. } = factor {
            let table_name_str = table_name.to_string().to_uppercase();
            let alias_str = alias
                .as_ref()
                .map(|a| a.name.value.to_uppercase())
                .unwrap_or_else(|| table_name_str.clone());
            if !self.arena.get(scope_id).relations.contains_key(&alias_str) {
                self.register_table_factor(factor, scope_id, name);
            }
        }
    }

    fn find_visible_cte(&self, scope_id: usize, table_name: &str) -> Option<usize> {
        let mut current = Some(scope_id);
        while let Some(id) = current {
            if let Some(&cte_id) = self.arena.get(id).ctes.get(table_name) {
                return Some(cte_id);
            }
            current = self.arena.get(id).parent;
        }
        None
    }
}

fn collect_union_arms<'e>(body: &'e SetExpr, out: &mut Vec<&'e SetExpr>) {
    match body {
        SetExpr::SetOperation { left, right, .. } => {
            collect_union_arms(left, out);
            collect_union_arms(right, out);
        }
        other => out.push(other),
    }
}

fn classify_join_operator(op: &JoinOperator) -> (JoinKind, Option<&JoinConstraint>) {
    match op {
        JoinOperator::Join(c) | JoinOperator::Inner(c) => (JoinKind::Inner, Some(c)),
        JoinOperator::Left(c) | JoinOperator::LeftOuter(c) => (JoinKind::Left, Some(c)),
        JoinOperator::Right(c) | JoinOperator::RightOuter(c) => (JoinKind::Right, Some(c)),
        JoinOperator::FullOuter(c) => (JoinKind::Full, Some(c)),
        JoinOperator::CrossJoin(_) => (JoinKind::Cross, None),
        JoinOperator::Semi(c) | JoinOperator::LeftSemi(c) => (JoinKind::Inner, Some(c)),
        JoinOperator::RightSemi(c) => (JoinKind::Inner, Some(c)),
        JoinOperator::Anti(c) | JoinOperator::LeftAnti(c) => (JoinKind::Left, Some(c)),
        JoinOperator::RightAnti(c) => (JoinKind::Right, Some(c)),
        JoinOperator::CrossApply | JoinOperator::OuterApply => (JoinKind::Cross, None),
        JoinOperator::AsOf { constraint, .. } => (JoinKind::Inner, Some(constraint)),
        JoinOperator::StraightJoin(c) => (JoinKind::Inner, Some(c)),
    }
}

fn constraint_text(constraint: &JoinConstraint) -> String {
    match constraint {
        JoinConstraint::On(expr) => expr.to_string(),
        JoinConstraint::Using(cols) => format!(
            "USING ({})",
            cols.iter().map(|c| c.to_string()).collect::<Vec<_>>().join(", ")
        ),
        JoinConstraint::Natural => "NATURAL".to_string(),
        JoinConstraint::None => String::new(),
    }
}

fn flatten_and<'e>(expr: &'e Expr, out: &mut Vec<&'e Expr>) {
    if let Expr::BinaryOp { left, op, right } = expr {
        if matches!(op, sqlparser::ast::BinaryOperator::And) {
            flatten_and(left, out);
            flatten_and(right, out);
            return;
        }
    }
    out.push(expr);
}

fn simple_equality(expr: &Expr) -> Option<(ColumnRef, ColumnRef)> {
    if let Expr::BinaryOp { left, op, right } = expr {
        if matches!(op, sqlparser::ast::BinaryOperator::Eq) {
            let left_ref = simple_column_ref(left)?;
            let right_ref = simple_column_ref(right)?;
            return Some((left_ref, right_ref));
        }
    }
    None
}

fn simple_column_ref(expr: &Expr) -> Option<ColumnRef> {
    match expr {
        Expr::Identifier(ident) => Some(ColumnRef::bare(ident.value.to_uppercase())),
        Expr::CompoundIdentifier(parts) if parts.len() == 2 => Some(ColumnRef::qualified(
            parts[0].value.to_uppercase(),
            parts[1].value.to_uppercase(),
        )),
        _ => None,
    }
}

fn derive_output_name(expr: &Expr, text: &str) -> String {
    match expr {
        Expr::Identifier(ident) => ident.value.to_uppercase(),
        Expr::CompoundIdentifier(parts) => parts
            .last()
            .map(|p| p.value.to_uppercase())
            .unwrap_or_else(|| sanitize_identifier(text)),
        _ => sanitize_identifier(text),
    }
}

fn sanitize_identifier(text: &str) -> String {
    let upper = text.trim().to_uppercase();
    let mut out = String::with_capacity(upper.len());
    for c in upper.chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            out.push(c);
        } else {
            out.push('_');
        }
    }
    if out.len() > 60 {
        out.truncate(60);
    }
    if out.is_empty() {
        "EXPR".to_string()
    } else {
        out
    }
}

fn last_identifier_part(qualified: &str) -> String {
    qualified.rsplit('.').next().unwrap_or(qualified).to_string()
}

/// Walks an expression tree looking for `EXISTS (...)` and `IN (...)`
/// subqueries, invoking `f` on each one found. Does not descend into a
/// nested subquery's own body beyond what's needed to find further nested
/// EXISTS/IN (a subquery's own FROM is handled by its own scope build).
fn walk_subqueries<'e>(expr: &'e Expr, f: &mut dyn FnMut(&'e Query)) {
    match expr {
        Expr::Exists { subquery, .. } => f(subquery),
        Expr::InSubquery { subquery, expr, .. } => {
            f(subquery);
            walk_subqueries(expr, f);
        }
        Expr::BinaryOp { left, right, .. } => {
            walk_subqueries(left, f);
            walk_subqueries(right, f);
        }
        Expr::UnaryOp { expr, .. } => walk_subqueries(expr, f),
        Expr::Nested(inner) => walk_subqueries(inner, f),
        Expr::IsNull(inner) | Expr::IsNotNull(inner) => walk_subqueries(inner, f),
        Expr::Between { expr, low, high, .. } => {
            walk_subqueries(expr, f);
            walk_subqueries(low, f);
            walk_subqueries(high, f);
        }
        Expr::InList { expr, list, .. } => {
            walk_subqueries(expr, f);
            for item in list {
                walk_subqueries(item, f);
            }
        }
        Expr::Case {
            operand,
            conditions,
            else_result,
            ..
        } => {
            if let Some(op) = operand {
                walk_subqueries(op, f);
            }
            for when in conditions {
                walk_subqueries(&when.condition, f);
                walk_subqueries(&when.result, f);
            }
            if let Some(else_result) = else_result {
                walk_subqueries(else_result, f);
            }
        }
        _ => {}
    }
}
