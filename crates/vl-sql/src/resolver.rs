//! Scope-aware column resolution over the sqlparser AST
//!
//! A query is evaluated into a [`DerivedRelation`]: its output columns, each
//! carrying the physical columns it reads. FROM-clause sources (tables, CTEs,
//! derived tables) form a [`Scope`]; subqueries inside expressions see their
//! enclosing scopes through `outer`.

use crate::lineage::{RawColumnRef, RelationSchemas};
use sqlparser::ast::{
    Expr, Function, GroupByExpr, Ident, JoinConstraint, JoinOperator, NamedWindowDefinition,
    NamedWindowExpr, ObjectName, Query, Select, SelectItem, SelectItemQualifiedWildcardKind,
    SetExpr, TableAlias, TableFactor, TableWithJoins, Visit, Visitor, WindowSpec, WindowType,
};
use std::collections::{HashMap, HashSet};
use std::ops::ControlFlow;
use std::rc::Rc;

/// CTEs visible at some point of a query, by lower-cased name
pub(crate) type Ctes = HashMap<String, Rc<DerivedRelation>>;

/// Output of a query: ordered columns with their upstream references
#[derive(Debug, Clone, Default)]
pub(crate) struct DerivedRelation {
    pub(crate) columns: Vec<DerivedColumn>,
    /// Relations selected with `*` whose columns are unknown
    opaque: Vec<TableRef>,
}

#[derive(Debug, Clone)]
pub(crate) struct DerivedColumn {
    /// `None` for unaliased computed expressions
    pub(crate) name: Option<String>,
    pub(crate) reads: Reads,
}

/// Columns an expression reads, plus the references no scope could resolve
#[derive(Debug, Clone, Default)]
pub(crate) struct Reads {
    pub(crate) sources: Vec<RawColumnRef>,
    /// Lower-cased reference text, e.g. `x.nope` or `nm`
    pub(crate) unresolved: Vec<String>,
}

impl Reads {
    fn of(sources: Vec<RawColumnRef>) -> Self {
        Self {
            sources,
            unresolved: Vec::new(),
        }
    }

    fn missing(reference: String) -> Self {
        Self {
            sources: Vec::new(),
            unresolved: vec![reference],
        }
    }

    fn extend(&mut self, other: Reads) {
        self.sources.extend(other.sources);
        self.unresolved.extend(other.unresolved);
    }

    fn dedup(&mut self) {
        dedup(&mut self.sources);
        let mut seen = HashSet::new();
        self.unresolved.retain(|r| seen.insert(r.clone()));
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct TableRef {
    schema: Option<String>,
    name: String,
}

impl TableRef {
    fn column(&self, column: &str) -> RawColumnRef {
        RawColumnRef::new(self.schema.clone(), self.name.clone(), column)
    }
}

/// Result of looking a column name up in one source
enum Lookup {
    /// The source is known to have the column
    Found(Reads),
    /// The source's columns are unknown; it may have the column
    Maybe(Reads),
    Missing,
}

impl DerivedRelation {
    fn lookup(&self, name: &str) -> Lookup {
        if let Some(column) = self
            .columns
            .iter()
            .find(|c| c.name.as_deref() == Some(name))
        {
            return Lookup::Found(column.reads.clone());
        }
        match self.opaque.first() {
            Some(table) => Lookup::Maybe(Reads::of(vec![table.column(name)])),
            None => Lookup::Missing,
        }
    }

    /// Apply a `name(col_a, col_b, ...)` alias column list positionally
    fn renamed(mut self, alias: Option<&TableAlias>) -> Self {
        if let Some(alias) = alias {
            for (column, def) in self.columns.iter_mut().zip(&alias.columns) {
                column.name = Some(normalize(&def.name));
            }
        }
        self
    }

    /// Merge the branches of a set operation: column i is fed by column i of both
    fn union(mut self, other: DerivedRelation) -> Self {
        for (column, branch) in self.columns.iter_mut().zip(other.columns) {
            column.reads.extend(branch.reads);
            column.reads.dedup();
        }
        for table in other.opaque {
            if !self.opaque.contains(&table) {
                self.opaque.push(table);
            }
        }
        self
    }
}

/// A relation in a FROM clause, addressed by `key` (alias or table name)
struct Source {
    key: String,
    kind: SourceKind,
}

enum SourceKind {
    Table {
        table: TableRef,
        columns: Option<Vec<String>>,
    },
    Derived(Rc<DerivedRelation>),
}

impl Source {
    fn lookup(&self, column: &str) -> Lookup {
        match &self.kind {
            SourceKind::Table {
                table,
                columns: Some(columns),
            } => {
                if columns.iter().any(|c| c == column) {
                    Lookup::Found(Reads::of(vec![table.column(column)]))
                } else {
                    Lookup::Missing
                }
            }
            SourceKind::Table {
                table,
                columns: None,
            } => Lookup::Maybe(Reads::of(vec![table.column(column)])),
            SourceKind::Derived(relation) => relation.lookup(column),
        }
    }

    /// Column of an explicitly qualified reference
    fn qualified_column(&self, column: &str) -> Reads {
        match (&self.kind, self.lookup(column)) {
            (_, Lookup::Found(reads) | Lookup::Maybe(reads)) => reads,
            // keep the reference so the catalog lookup reports it
            (SourceKind::Table { table, .. }, Lookup::Missing) => {
                Reads::of(vec![table.column(column)])
            }
            (SourceKind::Derived(_), Lookup::Missing) => {
                Reads::missing(format!("{}.{}", self.key, column))
            }
        }
    }

    fn matches(&self, schema: Option<&str>, table: &str) -> bool {
        match (schema, &self.kind) {
            (None, _) => self.key == table,
            (Some(schema), SourceKind::Table { table: t, .. }) => {
                t.name == table && t.schema.as_deref().map_or(true, |s| s == schema)
            }
            (Some(_), SourceKind::Derived(_)) => false,
        }
    }

    /// Append this source's columns to a `*` projection
    fn expand_into(&self, relation: &mut DerivedRelation) {
        match &self.kind {
            SourceKind::Table {
                table,
                columns: Some(columns),
            } => {
                relation
                    .columns
                    .extend(columns.iter().map(|c| DerivedColumn {
                        name: Some(c.clone()),
                        reads: Reads::of(vec![table.column(c)]),
                    }));
            }
            SourceKind::Table {
                table,
                columns: None,
            } => relation.opaque.push(table.clone()),
            SourceKind::Derived(derived) => {
                relation.columns.extend(derived.columns.iter().cloned());
                relation.opaque.extend(derived.opaque.iter().cloned());
            }
        }
    }
}

/// Name resolution scope of one SELECT
pub(crate) struct Scope<'a> {
    sources: Vec<Source>,
    windows: &'a [NamedWindowDefinition],
    outer: Option<&'a Scope<'a>>,
}

impl Scope<'_> {
    /// Resolve an unqualified column: a source known to have it wins, then the
    /// first source with unknown columns, then the enclosing scope.
    fn resolve_unqualified(&self, column: &str) -> Reads {
        let mut maybe = None;
        for source in &self.sources {
            match source.lookup(column) {
                Lookup::Found(reads) => return reads,
                Lookup::Maybe(reads) if maybe.is_none() => maybe = Some(reads),
                _ => {}
            }
        }
        if let Some(reads) = maybe {
            return reads;
        }
        match self.outer {
            Some(outer) => outer.resolve_unqualified(column),
            None => Reads::missing(column.to_string()),
        }
    }

    /// Resolve `[schema.]table.column`; `None` when no scope has the qualifier
    fn resolve_qualified(
        &self,
        schema: Option<&str>,
        table: &str,
        column: &str,
    ) -> Option<Reads> {
        if let Some(source) = self.find_source(schema, table) {
            return Some(source.qualified_column(column));
        }
        self.outer
            .and_then(|outer| outer.resolve_qualified(schema, table, column))
    }

    fn find_source(&self, schema: Option<&str>, table: &str) -> Option<&Source> {
        self.sources.iter().find(|s| s.matches(schema, table))
    }
}

/// Evaluates queries against optional catalog knowledge
pub(crate) struct Resolver<'s> {
    schemas: &'s RelationSchemas,
}

impl<'s> Resolver<'s> {
    pub(crate) fn new(schemas: &'s RelationSchemas) -> Self {
        Self { schemas }
    }

    /// Evaluate a query into its output columns
    pub(crate) fn query(
        &self,
        query: &Query,
        ctes: &Ctes,
        outer: Option<&Scope<'_>>,
    ) -> DerivedRelation {
        let ctes = self.with_ctes(query, ctes, outer);
        self.set_expr(&query.body, &ctes, outer)
    }

    /// Add the query's own CTEs to the visible set; each CTE sees the ones
    /// defined before it.
    fn with_ctes(&self, query: &Query, ctes: &Ctes, outer: Option<&Scope<'_>>) -> Ctes {
        let mut ctes = ctes.clone();
        if let Some(with) = &query.with {
            for cte in &with.cte_tables {
                let relation = self
                    .query(&cte.query, &ctes, outer)
                    .renamed(Some(&cte.alias));
                ctes.insert(normalize(&cte.alias.name), Rc::new(relation));
            }
        }
        ctes
    }

    fn set_expr(&self, body: &SetExpr, ctes: &Ctes, outer: Option<&Scope<'_>>) -> DerivedRelation {
        match body {
            SetExpr::Select(select) => self.select(select, ctes, outer),
            SetExpr::Query(query) => self.query(query, ctes, outer),
            SetExpr::SetOperation { left, right, .. } => {
                let left = self.set_expr(left, ctes, outer);
                let right = self.set_expr(right, ctes, outer);
                left.union(right)
            }
            _ => DerivedRelation::default(),
        }
    }

    fn select(&self, select: &Select, ctes: &Ctes, outer: Option<&Scope<'_>>) -> DerivedRelation {
        let scope = self.scope(select, ctes, outer);
        let mut relation = DerivedRelation::default();

        for item in &select.projection {
            match item {
                SelectItem::UnnamedExpr(expr) => relation.columns.push(DerivedColumn {
                    name: output_name(expr),
                    reads: self.expr_reads(expr, &scope, ctes),
                }),
                SelectItem::ExprWithAlias { expr, alias } => relation.columns.push(DerivedColumn {
                    name: Some(normalize(alias)),
                    reads: self.expr_reads(expr, &scope, ctes),
                }),
                SelectItem::Wildcard(_) => {
                    for source in &scope.sources {
                        source.expand_into(&mut relation);
                    }
                }
                SelectItem::QualifiedWildcard(SelectItemQualifiedWildcardKind::ObjectName(name), _) => {
                    let (schema, table) = split_object_name(name);
                    match scope.find_source(schema.as_deref(), &table) {
                        Some(source) => source.expand_into(&mut relation),
                        None => log::debug!("No relation named '{table}' for {table}.*"),
                    }
                }
                SelectItem::QualifiedWildcard(..) => {}
            }
        }

        relation
    }

    fn scope<'a>(
        &self,
        select: &'a Select,
        ctes: &Ctes,
        outer: Option<&'a Scope<'a>>,
    ) -> Scope<'a> {
        let mut sources = Vec::new();
        for table in &select.from {
            self.add_table_with_joins(table, ctes, outer, &mut sources);
        }
        Scope {
            sources,
            windows: &select.named_window,
            outer,
        }
    }

    fn add_table_with_joins(
        &self,
        table: &TableWithJoins,
        ctes: &Ctes,
        outer: Option<&Scope<'_>>,
        sources: &mut Vec<Source>,
    ) {
        self.add_factor(&table.relation, ctes, outer, sources);
        for join in &table.joins {
            self.add_factor(&join.relation, ctes, outer, sources);
        }
    }

    fn add_factor(
        &self,
        factor: &TableFactor,
        ctes: &Ctes,
        outer: Option<&Scope<'_>>,
        sources: &mut Vec<Source>,
    ) {
        match factor {
            TableFactor::Table { name, alias, .. } => {
                let (schema, table) = split_object_name(name);
                let key = alias
                    .as_ref()
                    .map(|a| normalize(&a.name))
                    .unwrap_or_else(|| table.clone());
                let kind = match ctes.get(&table) {
                    Some(cte) if schema.is_none() => {
                        let has_columns = alias.as_ref().is_some_and(|a| !a.columns.is_empty());
                        if has_columns {
                            SourceKind::Derived(Rc::new((**cte).clone().renamed(alias.as_ref())))
                        } else {
                            SourceKind::Derived(Rc::clone(cte))
                        }
                    }
                    _ => {
                        let columns = self
                            .schemas
                            .columns(schema.as_deref(), &table)
                            .map(<[String]>::to_vec);
                        SourceKind::Table {
                            table: TableRef {
                                schema,
                                name: table,
                            },
                            columns,
                        }
                    }
                };
                sources.push(Source { key, kind });
            }
            TableFactor::Derived {
                subquery, alias, ..
            } => {
                let relation = self.query(subquery, ctes, outer).renamed(alias.as_ref());
                let key = alias
                    .as_ref()
                    .map(|a| normalize(&a.name))
                    .unwrap_or_default();
                sources.push(Source {
                    key,
                    kind: SourceKind::Derived(Rc::new(relation)),
                });
            }
            TableFactor::NestedJoin {
                table_with_joins, ..
            } => self.add_table_with_joins(table_with_joins, ctes, outer, sources),
            other => log::debug!("Skipping unsupported table factor: {other}"),
        }
    }

    /// Columns an expression reads, de-duplicated in first-seen order
    fn expr_reads(&self, expr: &Expr, scope: &Scope<'_>, ctes: &Ctes) -> Reads {
        let mut collector = ColumnCollector {
            resolver: self,
            scope,
            ctes,
            depth: 0,
            reads: Reads::default(),
        };
        let _ = expr.visit(&mut collector);
        let mut reads = collector.reads;
        reads.dedup();
        reads
    }

    /// Every column a subquery reads (projection, join conditions, WHERE,
    /// GROUP BY, HAVING, QUALIFY), resolved inside-out.
    fn referenced_columns(
        &self,
        query: &Query,
        ctes: &Ctes,
        outer: Option<&Scope<'_>>,
    ) -> Reads {
        let ctes = self.with_ctes(query, ctes, outer);
        let mut reads = Reads::default();
        self.set_expr_references(&query.body, &ctes, outer, &mut reads);
        reads
    }

    fn set_expr_references(
        &self,
        body: &SetExpr,
        ctes: &Ctes,
        outer: Option<&Scope<'_>>,
        reads: &mut Reads,
    ) {
        match body {
            SetExpr::Select(select) => {
                let scope = self.scope(select, ctes, outer);
                for expr in select_expressions(select) {
                    reads.extend(self.expr_reads(expr, &scope, ctes));
                }
            }
            SetExpr::Query(query) => reads.extend(self.referenced_columns(query, ctes, outer)),
            SetExpr::SetOperation { left, right, .. } => {
                self.set_expr_references(left, ctes, outer, reads);
                self.set_expr_references(right, ctes, outer, reads);
            }
            _ => {}
        }
    }
}

/// Walks one expression, resolving column references against a scope.
/// Nested queries are handed to the resolver as a whole at depth 0.
struct ColumnCollector<'r, 's, 'a> {
    resolver: &'r Resolver<'s>,
    scope: &'r Scope<'a>,
    ctes: &'r Ctes,
    depth: usize,
    reads: Reads,
}

impl ColumnCollector<'_, '_, '_> {
    fn compound(&mut self, idents: &[Ident]) {
        let parts: Vec<String> = idents.iter().map(normalize).collect();
        let Some((column, qualifier)) = parts.split_last() else {
            return;
        };
        let (schema, table) = match qualifier {
            [] => {
                let reads = self.scope.resolve_unqualified(column);
                self.reads.extend(reads);
                return;
            }
            [table] => (None, table),
            [.., schema, table] => (Some(schema.as_str()), table),
        };
        match self.scope.resolve_qualified(schema, table, column) {
            Some(reads) => self.reads.extend(reads),
            None => self.reads.sources.push(RawColumnRef::new(
                schema.map(str::to_string),
                table.clone(),
                column.clone(),
            )),
        }
    }

    /// Follow `OVER w` through the SELECT's WINDOW clause
    fn named_window(&mut self, function: &Function) {
        let mut next = match &function.over {
            Some(WindowType::NamedWindow(name)) => Some(normalize(name)),
            Some(WindowType::WindowSpec(spec)) => spec.window_name.as_ref().map(normalize),
            None => None,
        };
        let windows: &[NamedWindowDefinition] = self.scope.windows;
        let mut hops = 0;
        while let Some(name) = next.take() {
            if hops > windows.len() {
                break;
            }
            hops += 1;
            let Some(NamedWindowDefinition(_, window)) =
                windows.iter().find(|w| normalize(&w.0) == name)
            else {
                break;
            };
            match window {
                NamedWindowExpr::NamedWindow(base) => next = Some(normalize(base)),
                NamedWindowExpr::WindowSpec(spec) => {
                    self.window_spec(spec);
                    next = spec.window_name.as_ref().map(normalize);
                }
            }
        }
    }

    fn window_spec(&mut self, spec: &WindowSpec) {
        for expr in &spec.partition_by {
            let _ = expr.visit(self);
        }
        for order in &spec.order_by {
            let _ = order.expr.visit(self);
        }
    }
}

impl Visitor for ColumnCollector<'_, '_, '_> {
    type Break = ();

    fn pre_visit_query(&mut self, query: &Query) -> ControlFlow<()> {
        if self.depth == 0 {
            let reads = self
                .resolver
                .referenced_columns(query, self.ctes, Some(self.scope));
            self.reads.extend(reads);
        }
        self.depth += 1;
        ControlFlow::Continue(())
    }

    fn post_visit_query(&mut self, _query: &Query) -> ControlFlow<()> {
        self.depth -= 1;
        ControlFlow::Continue(())
    }

    fn pre_visit_expr(&mut self, expr: &Expr) -> ControlFlow<()> {
        if self.depth > 0 {
            return ControlFlow::Continue(());
        }
        match expr {
            Expr::Identifier(ident) => {
                let reads = self.scope.resolve_unqualified(&normalize(ident));
                self.reads.extend(reads);
            }
            Expr::CompoundIdentifier(idents) => self.compound(idents),
            Expr::Function(function) => self.named_window(function),
            _ => {}
        }
        ControlFlow::Continue(())
    }
}

/// Expressions of a SELECT whose columns a subquery depends on
fn select_expressions(select: &Select) -> Vec<&Expr> {
    let mut exprs: Vec<&Expr> = select
        .projection
        .iter()
        .filter_map(|item| match item {
            SelectItem::UnnamedExpr(expr) | SelectItem::ExprWithAlias { expr, .. } => Some(expr),
            _ => None,
        })
        .collect();
    for table in &select.from {
        join_conditions(table, &mut exprs);
    }
    exprs.extend(&select.selection);
    if let GroupByExpr::Expressions(group_by, _) = &select.group_by {
        exprs.extend(group_by);
    }
    exprs.extend(&select.having);
    exprs.extend(&select.qualify);
    exprs
}

fn join_conditions<'q>(table: &'q TableWithJoins, exprs: &mut Vec<&'q Expr>) {
    if let TableFactor::NestedJoin {
        table_with_joins, ..
    } = &table.relation
    {
        join_conditions(table_with_joins, exprs);
    }
    for join in &table.joins {
        if let TableFactor::NestedJoin {
            table_with_joins, ..
        } = &join.relation
        {
            join_conditions(table_with_joins, exprs);
        }
        if let Some(expr) = join_on_expr(&join.join_operator) {
            exprs.push(expr);
        }
    }
}

fn join_on_expr(op: &JoinOperator) -> Option<&Expr> {
    let constraint = match op {
        JoinOperator::Join(c)
        | JoinOperator::Inner(c)
        | JoinOperator::Left(c)
        | JoinOperator::LeftOuter(c)
        | JoinOperator::Right(c)
        | JoinOperator::RightOuter(c)
        | JoinOperator::FullOuter(c) => Some(c),
        _ => None,
    };
    match constraint {
        Some(JoinConstraint::On(expr)) => Some(expr),
        _ => None,
    }
}

/// Output name of an unaliased projection item
fn output_name(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Identifier(ident) => Some(normalize(ident)),
        Expr::CompoundIdentifier(idents) => idents.last().map(normalize),
        _ => None,
    }
}

/// Split `[catalog.][schema.]table` into lower-cased `(schema, table)`
pub(crate) fn split_object_name(name: &ObjectName) -> (Option<String>, String) {
    let parts: Vec<String> = name
        .0
        .iter()
        .filter_map(|p| p.as_ident())
        .map(normalize)
        .collect();
    match parts.as_slice() {
        [.., schema, table] => (Some(schema.clone()), table.clone()),
        [table] => (None, table.clone()),
        [] => (None, String::new()),
    }
}

fn normalize(ident: &Ident) -> String {
    ident.value.to_lowercase()
}

fn dedup(refs: &mut Vec<RawColumnRef>) {
    let mut seen = HashSet::new();
    refs.retain(|r| seen.insert(r.clone()));
}
