//! DuckDB catalog provider

use crate::error::{DbError, DbResult};
use crate::traits::{CatalogProvider, ColumnDescription};
use duckdb::{params, Connection};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Schemas DuckDB creates for its own metadata
const SYSTEM_SCHEMAS: [&str; 2] = ["information_schema", "pg_catalog"];

/// Catalog provider reading a DuckDB database's own catalog
pub struct DuckDbCatalog {
    conn: Mutex<Connection>,
}

impl DuckDbCatalog {
    /// Create a new in-memory DuckDB connection
    pub fn in_memory() -> DbResult<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| DbError::ConnectionError(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open a DuckDB database file
    pub fn from_path(path: &Path) -> DbResult<Self> {
        let conn = Connection::open(path)
            .map_err(|e| DbError::ConnectionError(format!("{}: {}", path.display(), e)))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create from path string (handles :memory: special case)
    pub fn new(path: &str) -> DbResult<Self> {
        if path == ":memory:" {
            Self::in_memory()
        } else {
            Self::from_path(Path::new(path))
        }
    }

    /// Execute one or more statements, e.g. to set up fixtures
    pub fn execute_batch(&self, sql: &str) -> DbResult<()> {
        self.lock()?
            .execute_batch(sql)
            .map_err(|e| DbError::ExecutionError(e.to_string()))
    }

    fn lock(&self) -> DbResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| DbError::MutexPoisoned(e.to_string()))
    }

    /// Run a query returning a single string column
    fn query_strings(&self, sql: &str, args: &[&str]) -> DbResult<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(duckdb::params_from_iter(args.iter().copied()), |row| {
            row.get::<_, String>(0)
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(DbError::from)
    }
}

impl CatalogProvider for DuckDbCatalog {
    fn schema_names(&self) -> DbResult<Vec<String>> {
        let schemas = self.query_strings(
            "SELECT schema_name FROM information_schema.schemata \
             WHERE catalog_name = current_database() \
             ORDER BY schema_name",
            &[],
        )?;
        Ok(schemas
            .into_iter()
            .filter(|s| !SYSTEM_SCHEMAS.contains(&s.as_str()))
            .collect())
    }

    fn table_names(&self, schema: &str) -> DbResult<Vec<String>> {
        self.query_strings(
            "SELECT table_name FROM information_schema.tables \
             WHERE table_catalog = current_database() \
               AND table_schema = ? AND table_type = 'BASE TABLE' \
             ORDER BY table_name",
            &[schema],
        )
    }

    fn view_names(&self, schema: &str) -> DbResult<Vec<String>> {
        self.query_strings(
            "SELECT view_name FROM duckdb_views() \
             WHERE NOT internal AND database_name = current_database() \
               AND schema_name = ? \
             ORDER BY view_name",
            &[schema],
        )
    }

    fn view_definition(&self, view: &str, schema: &str) -> DbResult<String> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT sql FROM duckdb_views() \
             WHERE NOT internal AND database_name = current_database() \
               AND schema_name = ? AND view_name = ?",
        )?;
        let mut rows = stmt.query_map(params![schema, view], |row| {
            row.get::<_, Option<String>>(0)
        })?;
        match rows.next() {
            Some(sql) => Ok(sql?.unwrap_or_default()),
            None => Ok(String::new()),
        }
    }

    fn columns(&self, table: &str, schema: &str) -> DbResult<Vec<ColumnDescription>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT column_name, data_type, is_nullable, column_default, comment \
             FROM duckdb_columns() \
             WHERE database_name = current_database() \
               AND schema_name = ? AND table_name = ? \
             ORDER BY column_index",
        )?;
        let rows = stmt.query_map(params![schema, table], |row| {
            Ok(ColumnDescription {
                name: row.get(0)?,
                data_type: row.get(1)?,
                nullable: row.get(2)?,
                default: row.get(3)?,
                comment: row.get(4)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(DbError::from)
    }

    fn catalog_type(&self) -> &'static str {
        "duckdb"
    }
}

#[cfg(test)]
#[path = "duckdb_test.rs"]
mod tests;
