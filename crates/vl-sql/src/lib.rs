//! vl-sql - SQL parsing layer for viewlineage
//!
//! This crate wraps sqlparser-rs with dialect support and provides the
//! per-view column resolver: for every output column of a view's defining
//! query, the physical columns it is computed from.

pub mod dialect;
pub mod error;
pub mod lineage;
pub mod parser;
mod resolver;

pub use dialect::{DuckDbDialect, GenericDialect, PostgresDialect, SnowflakeDialect, SqlDialect};
pub use error::{SqlError, SqlResult};
pub use lineage::{
    ColumnLineageAnalyzer, ColumnSources, RawColumnRef, RelationName, RelationSchemas, ViewQuery,
};
pub use parser::SqlParser;
