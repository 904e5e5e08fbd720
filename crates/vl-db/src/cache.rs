//! Memoizing catalog cache
//!
//! One `CatalogCache` lives for one lineage build. Every provider call is
//! memoized by its argument tuple and handed out as a shared `Arc` snapshot.
//! Each memo table is guarded by a mutex that stays locked across the
//! provider call, so concurrent callers asking for the same key wait for the
//! single in-flight lookup instead of repeating it. Provider errors are
//! returned as-is and never cached.

use crate::error::{DbError, DbResult};
use crate::traits::{CatalogProvider, ColumnDescription};
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Columns of one relation keyed by lower-cased column name
pub type TableSchema = HashMap<String, ColumnDescription>;

/// Relations (tables and views) of one schema keyed by lower-cased name,
/// mapping to the exact catalog name
pub type RelationIndex = HashMap<String, String>;

type Memo<K, V> = Mutex<HashMap<K, Arc<V>>>;

/// Hit/miss counters of a cache
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered from memory
    pub hits: usize,
    /// Lookups that reached the provider (or a derived computation)
    pub misses: usize,
}

/// Memoizing wrapper around a [`CatalogProvider`]
pub struct CatalogCache<C> {
    provider: C,
    schema_names: Memo<(), Vec<String>>,
    table_names: Memo<String, Vec<String>>,
    view_names: Memo<String, Vec<String>>,
    view_definitions: Memo<(String, String), String>,
    columns: Memo<(String, String), Vec<ColumnDescription>>,
    table_schemas: Memo<(String, String), TableSchema>,
    relation_indexes: Memo<String, RelationIndex>,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl<C: CatalogProvider> CatalogCache<C> {
    /// Wrap a provider with an empty cache
    pub fn new(provider: C) -> Self {
        Self {
            provider,
            schema_names: Mutex::default(),
            table_names: Mutex::default(),
            view_names: Mutex::default(),
            view_definitions: Mutex::default(),
            columns: Mutex::default(),
            table_schemas: Mutex::default(),
            relation_indexes: Mutex::default(),
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
        }
    }

    /// The wrapped provider
    pub fn provider(&self) -> &C {
        &self.provider
    }

    /// Current hit/miss counters
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    /// Schemas of the current database
    pub fn schema_names(&self) -> DbResult<Arc<Vec<String>>> {
        self.memoize(
            &self.schema_names,
            (),
            || "schema_names()".to_string(),
            || self.provider.schema_names(),
        )
    }

    /// Base tables in a schema
    pub fn table_names(&self, schema: &str) -> DbResult<Arc<Vec<String>>> {
        self.memoize(
            &self.table_names,
            schema.to_string(),
            || format!("table_names({schema})"),
            || self.provider.table_names(schema),
        )
    }

    /// Views in a schema
    pub fn view_names(&self, schema: &str) -> DbResult<Arc<Vec<String>>> {
        self.memoize(
            &self.view_names,
            schema.to_string(),
            || format!("view_names({schema})"),
            || self.provider.view_names(schema),
        )
    }

    /// Defining SQL of a view, empty when unavailable
    pub fn view_definition(&self, view: &str, schema: &str) -> DbResult<Arc<String>> {
        self.memoize(
            &self.view_definitions,
            (view.to_string(), schema.to_string()),
            || format!("view_definition({schema}.{view})"),
            || self.provider.view_definition(view, schema),
        )
    }

    /// Columns of a relation in ordinal order
    pub fn columns(&self, table: &str, schema: &str) -> DbResult<Arc<Vec<ColumnDescription>>> {
        self.memoize(
            &self.columns,
            (table.to_string(), schema.to_string()),
            || format!("columns({schema}.{table})"),
            || self.provider.columns(table, schema),
        )
    }

    /// Columns of a relation keyed by lower-cased name, for case-insensitive
    /// lookup of the exact catalog casing
    pub fn table_schema(&self, table: &str, schema: &str) -> DbResult<Arc<TableSchema>> {
        self.memoize(
            &self.table_schemas,
            (table.to_string(), schema.to_string()),
            || format!("table_schema({schema}.{table})"),
            || {
                let columns = self.columns(table, schema)?;
                let mut by_name = TableSchema::with_capacity(columns.len());
                for column in columns.iter() {
                    by_name
                        .entry(column.name.to_lowercase())
                        .or_insert_with(|| column.clone());
                }
                Ok(by_name)
            },
        )
    }

    /// Tables and views of a schema keyed by lower-cased name; tables win
    /// when two relations differ only in case
    pub fn relation_index(&self, schema: &str) -> DbResult<Arc<RelationIndex>> {
        self.memoize(
            &self.relation_indexes,
            schema.to_string(),
            || format!("relation_index({schema})"),
            || {
                let tables = self.table_names(schema)?;
                let views = self.view_names(schema)?;
                let mut index = RelationIndex::with_capacity(tables.len() + views.len());
                for name in tables.iter().chain(views.iter()) {
                    index
                        .entry(name.to_lowercase())
                        .or_insert_with(|| name.clone());
                }
                Ok(index)
            },
        )
    }

    /// `label` describes the lookup for the miss log and is only built on a miss
    fn memoize<K, V, L, F>(&self, memo: &Memo<K, V>, key: K, label: L, load: F) -> DbResult<Arc<V>>
    where
        K: Eq + Hash,
        L: FnOnce() -> String,
        F: FnOnce() -> DbResult<V>,
    {
        let mut entries = memo
            .lock()
            .map_err(|e| DbError::MutexPoisoned(e.to_string()))?;
        if let Some(value) = entries.get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(Arc::clone(value));
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        log::debug!(
            "Catalog cache miss on {} catalog: {}",
            self.provider.catalog_type(),
            label()
        );
        let value = Arc::new(load()?);
        entries.insert(key, Arc::clone(&value));
        Ok(value)
    }
}

#[cfg(test)]
#[path = "cache_test.rs"]
mod tests;
