//! vl-db - Catalog access layer for viewlineage
//!
//! This crate provides the `CatalogProvider` trait, a DuckDB implementation
//! reading the live catalog, a static (file or builder backed) catalog, and
//! `CatalogCache`, which memoizes every catalog call for one build run.

pub mod cache;
pub mod duckdb;
pub mod error;
pub mod static_catalog;
pub mod traits;

pub use cache::{CacheStats, CatalogCache, RelationIndex, TableSchema};
pub use self::duckdb::DuckDbCatalog;
pub use error::{DbError, DbResult};
pub use static_catalog::StaticCatalog;
pub use traits::{CatalogProvider, ColumnDescription};
