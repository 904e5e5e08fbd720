//! Per-view column lineage
//!
//! [`ColumnLineageAnalyzer`] turns a view's defining SQL into, for every named
//! output column, the list of physical columns it is computed from. Names are
//! compared and reported in lower case; restoring catalog casing is the
//! caller's job.

use crate::error::{SqlError, SqlResult};
use crate::parser::SqlParser;
use crate::resolver::{split_object_name, Ctes, Resolver};
use serde::Serialize;
use sqlparser::ast::{visit_relations, Query, Statement, Visit, Visitor};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::ops::ControlFlow;

/// A column reference as written in the SQL, after alias/CTE resolution
///
/// `table` is the physical relation name (never an alias), `schema` is the
/// qualifier the SQL used for it, if any.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RawColumnRef {
    /// Schema qualifier on the table reference
    pub schema: Option<String>,
    /// Relation name
    pub table: String,
    /// Column name
    pub column: String,
}

impl RawColumnRef {
    /// Create a new raw reference
    pub fn new(schema: Option<String>, table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            schema,
            table: table.into(),
            column: column.into(),
        }
    }
}

impl fmt::Display for RawColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.schema {
            Some(schema) => write!(f, "{}.{}.{}", schema, self.table, self.column),
            None => write!(f, "{}.{}", self.table, self.column),
        }
    }
}

/// One output column and the raw references it depends on
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnSources {
    /// Output column name (lower case)
    pub output_column: String,
    /// De-duplicated upstream references, first occurrence order
    pub sources: Vec<RawColumnRef>,
    /// References that matched nothing in any visible scope, as written
    /// (lower case)
    pub unresolved: Vec<String>,
}

impl ColumnSources {
    /// Whether any upstream reference was discovered
    pub fn has_lineage(&self) -> bool {
        !self.sources.is_empty()
    }
}

/// A relation referenced in a FROM clause
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RelationName {
    /// Schema qualifier, if the SQL gave one
    pub schema: Option<String>,
    /// Relation name
    pub name: String,
}

impl RelationName {
    /// Create a relation name, lower-casing both parts
    pub fn new(schema: Option<&str>, name: &str) -> Self {
        Self {
            schema: schema.map(str::to_lowercase),
            name: name.to_lowercase(),
        }
    }
}

impl fmt::Display for RelationName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.schema {
            Some(schema) => write!(f, "{}.{}", schema, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Known column lists for relations, keyed the way the SQL names them
///
/// Used to expand `*` and to attribute unqualified columns when a FROM
/// clause has several relations. Relations missing from the map are treated
/// as having unknown columns.
#[derive(Debug, Clone, Default)]
pub struct RelationSchemas {
    relations: HashMap<RelationName, Vec<String>>,
}

impl RelationSchemas {
    /// Create an empty set of relation schemas
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the ordered columns of a relation
    pub fn insert<I, S>(&mut self, relation: RelationName, columns: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let columns = columns
            .into_iter()
            .map(|c| c.as_ref().to_lowercase())
            .collect();
        self.relations.insert(relation, columns);
    }

    /// Columns of a relation, if known
    pub fn columns(&self, schema: Option<&str>, name: &str) -> Option<&[String]> {
        self.relations
            .get(&RelationName::new(schema, name))
            .map(Vec::as_slice)
    }

    /// Number of relations with known columns
    pub fn len(&self) -> usize {
        self.relations.len()
    }

    /// Whether no relation has known columns
    pub fn is_empty(&self) -> bool {
        self.relations.is_empty()
    }
}

/// The query defining a view
#[derive(Debug, Clone)]
pub struct ViewQuery {
    query: Box<Query>,
}

impl ViewQuery {
    /// The underlying query AST
    pub fn query(&self) -> &Query {
        &self.query
    }
}

/// SQL analyzer capability used by the lineage builder
pub struct ColumnLineageAnalyzer {
    parser: SqlParser,
}

impl ColumnLineageAnalyzer {
    /// Create an analyzer parsing with the given parser
    pub fn new(parser: SqlParser) -> Self {
        Self { parser }
    }

    /// Create an analyzer from a dialect name
    pub fn from_dialect_name(name: &str) -> SqlResult<Self> {
        Ok(Self::new(SqlParser::from_dialect_name(name)?))
    }

    /// Name of the parsing dialect
    pub fn dialect_name(&self) -> &'static str {
        self.parser.dialect_name()
    }

    /// Parse a view definition
    ///
    /// Accepts either the bare query or the full `CREATE VIEW ... AS` DDL;
    /// only the first statement is considered.
    pub fn parse(&self, sql: &str) -> SqlResult<ViewQuery> {
        match self.parser.parse_single(sql)? {
            Statement::Query(query) => Ok(ViewQuery { query }),
            other => {
                let mut finder = FirstQuery(None);
                let _ = other.visit(&mut finder);
                match finder.0 {
                    Some(query) => Ok(ViewQuery {
                        query: Box::new(query),
                    }),
                    None => Err(SqlError::UnsupportedStatement(statement_keyword(&other))),
                }
            }
        }
    }

    /// Physical relations referenced anywhere in the query, CTE names excluded
    pub fn relations(&self, query: &ViewQuery) -> Vec<RelationName> {
        let mut ctes = CteNames::default();
        let _ = query.query().visit(&mut ctes);

        let mut relations: Vec<RelationName> = Vec::new();
        let _ = visit_relations(query.query(), |name| {
            let (schema, table) = split_object_name(name);
            let is_cte = schema.is_none() && ctes.0.contains(&table);
            let relation = RelationName { schema, name: table };
            if !is_cte && !relation.name.is_empty() && !relations.contains(&relation) {
                relations.push(relation);
            }
            ControlFlow::<()>::Continue(())
        });
        relations
    }

    /// Named output columns, in SELECT-list order
    pub fn named_selects(&self, query: &ViewQuery, schemas: &RelationSchemas) -> Vec<String> {
        self.resolve(query, schemas)
            .into_iter()
            .map(|c| c.output_column)
            .collect()
    }

    /// Upstream references of one output column, matched case-insensitively
    pub fn column_lineage(
        &self,
        query: &ViewQuery,
        column: &str,
        schemas: &RelationSchemas,
    ) -> Option<Vec<RawColumnRef>> {
        let column = column.to_lowercase();
        self.resolve(query, schemas)
            .into_iter()
            .find(|c| c.output_column == column)
            .map(|c| c.sources)
    }

    /// Upstream references of every named output column
    pub fn resolve(&self, query: &ViewQuery, schemas: &RelationSchemas) -> Vec<ColumnSources> {
        Resolver::new(schemas)
            .query(query.query(), &Ctes::new(), None)
            .columns
            .into_iter()
            .filter_map(|column| {
                column.name.map(|name| ColumnSources {
                    output_column: name,
                    sources: column.reads.sources,
                    unresolved: column.reads.unresolved,
                })
            })
            .collect()
    }
}

impl Default for ColumnLineageAnalyzer {
    fn default() -> Self {
        Self::new(SqlParser::default())
    }
}

/// Captures the outermost query of a statement
struct FirstQuery(Option<Query>);

impl Visitor for FirstQuery {
    type Break = ();

    fn pre_visit_query(&mut self, query: &Query) -> ControlFlow<()> {
        self.0 = Some(query.clone());
        ControlFlow::Break(())
    }
}

/// Collects every CTE name defined at any nesting level
#[derive(Default)]
struct CteNames(HashSet<String>);

impl Visitor for CteNames {
    type Break = ();

    fn pre_visit_query(&mut self, query: &Query) -> ControlFlow<()> {
        if let Some(with) = &query.with {
            for cte in &with.cte_tables {
                self.0.insert(cte.alias.name.value.to_lowercase());
            }
        }
        ControlFlow::Continue(())
    }
}

fn statement_keyword(statement: &Statement) -> String {
    statement
        .to_string()
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_uppercase()
}

#[cfg(test)]
#[path = "lineage_test.rs"]
mod tests;
