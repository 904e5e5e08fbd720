//! Static catalog loaded from YAML or assembled in code
//!
//! ```yaml
//! schemas:
//!   - name: hotel
//!     tables:
//!       - name: room
//!         columns: [hno, type, price]
//!     views:
//!       - name: cheap_rooms
//!         sql: SELECT hno, type FROM hotel.room WHERE price < 100
//!         columns:
//!           - hno
//!           - name: type
//!             data_type: VARCHAR
//! ```
//!
//! Enumeration order is file (or insertion) order.

use crate::error::{DbError, DbResult};
use crate::traits::{CatalogProvider, ColumnDescription};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// In-memory catalog
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StaticCatalog {
    #[serde(default)]
    schemas: Vec<StaticSchema>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct StaticSchema {
    name: String,
    #[serde(default)]
    tables: Vec<StaticTable>,
    #[serde(default)]
    views: Vec<StaticView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct StaticTable {
    name: String,
    #[serde(default)]
    columns: Vec<ColumnSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct StaticView {
    name: String,
    #[serde(default)]
    sql: String,
    #[serde(default)]
    columns: Vec<ColumnSpec>,
}

/// A column given either by bare name or full description
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum ColumnSpec {
    Name(String),
    Full(ColumnDescription),
}

impl ColumnSpec {
    fn describe(&self) -> ColumnDescription {
        match self {
            ColumnSpec::Name(name) => ColumnDescription::named(name.as_str()),
            ColumnSpec::Full(description) => description.clone(),
        }
    }
}

fn specs(columns: &[&str]) -> Vec<ColumnSpec> {
    columns
        .iter()
        .map(|c| ColumnSpec::Name((*c).to_string()))
        .collect()
}

impl StaticCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a catalog from YAML text
    pub fn from_yaml_str(yaml: &str) -> DbResult<Self> {
        serde_yaml::from_str(yaml).map_err(|e| DbError::CatalogFile {
            path: "<string>".to_string(),
            message: e.to_string(),
        })
    }

    /// Load a catalog from a YAML file
    pub fn load(path: &Path) -> DbResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| DbError::CatalogFile {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let catalog: Self = serde_yaml::from_str(&content).map_err(|e| DbError::CatalogFile {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        log::debug!(
            "Loaded static catalog with {} schemas from {}",
            catalog.schemas.len(),
            path.display()
        );
        Ok(catalog)
    }

    /// Add an (empty) schema
    pub fn with_schema(mut self, schema: &str) -> Self {
        self.schema_mut(schema);
        self
    }

    /// Add a base table with the given columns
    pub fn with_table(mut self, schema: &str, name: &str, columns: &[&str]) -> Self {
        self.schema_mut(schema).tables.push(StaticTable {
            name: name.to_string(),
            columns: specs(columns),
        });
        self
    }

    /// Add a view with its definition and output columns
    pub fn with_view(mut self, schema: &str, name: &str, sql: &str, columns: &[&str]) -> Self {
        self.schema_mut(schema).views.push(StaticView {
            name: name.to_string(),
            sql: sql.to_string(),
            columns: specs(columns),
        });
        self
    }

    fn schema_mut(&mut self, schema: &str) -> &mut StaticSchema {
        let index = match self.schemas.iter().position(|s| s.name == schema) {
            Some(index) => index,
            None => {
                self.schemas.push(StaticSchema {
                    name: schema.to_string(),
                    tables: Vec::new(),
                    views: Vec::new(),
                });
                self.schemas.len() - 1
            }
        };
        &mut self.schemas[index]
    }

    fn schema(&self, schema: &str) -> Option<&StaticSchema> {
        self.schemas.iter().find(|s| s.name == schema)
    }
}

impl CatalogProvider for StaticCatalog {
    fn schema_names(&self) -> DbResult<Vec<String>> {
        Ok(self.schemas.iter().map(|s| s.name.clone()).collect())
    }

    fn table_names(&self, schema: &str) -> DbResult<Vec<String>> {
        Ok(self
            .schema(schema)
            .map(|s| s.tables.iter().map(|t| t.name.clone()).collect())
            .unwrap_or_default())
    }

    fn view_names(&self, schema: &str) -> DbResult<Vec<String>> {
        Ok(self
            .schema(schema)
            .map(|s| s.views.iter().map(|v| v.name.clone()).collect())
            .unwrap_or_default())
    }

    fn view_definition(&self, view: &str, schema: &str) -> DbResult<String> {
        Ok(self
            .schema(schema)
            .and_then(|s| s.views.iter().find(|v| v.name == view))
            .map(|v| v.sql.clone())
            .unwrap_or_default())
    }

    fn columns(&self, table: &str, schema: &str) -> DbResult<Vec<ColumnDescription>> {
        let Some(schema) = self.schema(schema) else {
            return Ok(Vec::new());
        };
        let columns = schema
            .tables
            .iter()
            .find(|t| t.name == table)
            .map(|t| &t.columns)
            .or_else(|| {
                schema
                    .views
                    .iter()
                    .find(|v| v.name == table)
                    .map(|v| &v.columns)
            });
        Ok(columns
            .map(|cols| cols.iter().map(ColumnSpec::describe).collect())
            .unwrap_or_default())
    }

    fn catalog_type(&self) -> &'static str {
        "static"
    }
}

#[cfg(test)]
#[path = "static_catalog_test.rs"]
mod tests;
