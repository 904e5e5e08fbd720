//! Catalog provider trait definition

use crate::error::DbResult;
use serde::{Deserialize, Serialize};

/// One column as described by the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescription {
    /// Column name, exact catalog casing
    pub name: String,
    /// Catalog data type name
    #[serde(default = "default_data_type")]
    pub data_type: String,
    /// Whether the column accepts NULL
    #[serde(default = "default_nullable")]
    pub nullable: bool,
    /// Default value expression
    #[serde(default)]
    pub default: Option<String>,
    /// Column comment
    #[serde(default)]
    pub comment: Option<String>,
}

impl ColumnDescription {
    /// A nullable column with an unknown type
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: default_data_type(),
            nullable: default_nullable(),
            default: None,
            comment: None,
        }
    }
}

fn default_data_type() -> String {
    "UNKNOWN".to_string()
}

fn default_nullable() -> bool {
    true
}

/// Read-only access to a database catalog
///
/// Identifiers are matched exactly as stored; case-insensitive resolution is
/// layered on top by `CatalogCache`. Calls are synchronous and may block on
/// a database round trip.
pub trait CatalogProvider: Send + Sync {
    /// Schemas of the current database
    fn schema_names(&self) -> DbResult<Vec<String>>;

    /// Base tables in a schema
    fn table_names(&self, schema: &str) -> DbResult<Vec<String>>;

    /// Views in a schema
    fn view_names(&self, schema: &str) -> DbResult<Vec<String>>;

    /// Defining SQL of a view; empty if the relation is not a view or has no
    /// stored definition
    fn view_definition(&self, view: &str, schema: &str) -> DbResult<String>;

    /// Columns of a table or view, in ordinal order
    fn columns(&self, table: &str, schema: &str) -> DbResult<Vec<ColumnDescription>>;

    /// Catalog type identifier for logging
    fn catalog_type(&self) -> &'static str;
}

impl<C: CatalogProvider + ?Sized> CatalogProvider for Box<C> {
    fn schema_names(&self) -> DbResult<Vec<String>> {
        (**self).schema_names()
    }

    fn table_names(&self, schema: &str) -> DbResult<Vec<String>> {
        (**self).table_names(schema)
    }

    fn view_names(&self, schema: &str) -> DbResult<Vec<String>> {
        (**self).view_names(schema)
    }

    fn view_definition(&self, view: &str, schema: &str) -> DbResult<String> {
        (**self).view_definition(view, schema)
    }

    fn columns(&self, table: &str, schema: &str) -> DbResult<Vec<ColumnDescription>> {
        (**self).columns(table, schema)
    }

    fn catalog_type(&self) -> &'static str {
        (**self).catalog_type()
    }
}
