//! Identifier normalization against the catalog
//!
//! SQL text is case-insensitive and often leaves the schema implicit, while
//! lineage facts must carry byte-exact catalog identifiers. The normalizer
//! maps resolver output back onto catalog casing, refusing to guess when the
//! catalog has no match.

use crate::error::{LineageError, LineageResult};
use vl_core::{ColumnRef, Dataset, DownstreamColumnRef, UpstreamColumnRef, View};
use vl_db::{CatalogCache, CatalogProvider};
use vl_sql::{RawColumnRef, RelationName};

/// Restores catalog casing on datasets and columns
pub struct IdentifierNormalizer<'c, C> {
    cache: &'c CatalogCache<C>,
}

impl<'c, C: CatalogProvider> IdentifierNormalizer<'c, C> {
    /// Create a normalizer reading through the given cache
    pub fn new(cache: &'c CatalogCache<C>) -> Self {
        Self { cache }
    }

    /// Catalog name of a schema; an exact match wins over a case-insensitive one
    pub fn resolve_schema(&self, schema: &str) -> LineageResult<String> {
        let schemas = self.cache.schema_names()?;
        if let Some(exact) = schemas.iter().find(|s| s.as_str() == schema) {
            return Ok(exact.clone());
        }
        let lowered = schema.to_lowercase();
        schemas
            .iter()
            .find(|s| s.to_lowercase() == lowered)
            .cloned()
            .ok_or_else(|| LineageError::UnresolvedIdentifier {
                reference: schema.to_string(),
                reason: "schema not found in catalog".to_string(),
            })
    }

    /// Catalog identity of a relation referenced from a view
    ///
    /// The relation's own schema qualifier is used when present, otherwise the
    /// view's schema.
    pub fn resolve_relation(
        &self,
        schema: Option<&str>,
        name: &str,
        view: &View,
    ) -> LineageResult<Dataset> {
        let schema = match schema {
            Some(schema) => self.resolve_schema(schema)?,
            None => view.schema().to_string(),
        };
        let index = self.cache.relation_index(&schema)?;
        match index.get(&name.to_lowercase()) {
            Some(exact) => Ok(Dataset::new(schema, exact.clone())),
            None => Err(LineageError::UnresolvedIdentifier {
                reference: format!("{schema}.{name}"),
                reason: "relation not found in catalog".to_string(),
            }),
        }
    }

    /// Same as [`resolve_relation`](Self::resolve_relation) for a FROM-clause name
    pub fn resolve_relation_name(
        &self,
        relation: &RelationName,
        view: &View,
    ) -> LineageResult<Dataset> {
        self.resolve_relation(relation.schema.as_deref(), &relation.name, view)
    }

    /// Catalog-cased column reference for a raw upstream reference
    pub fn normalize_upstream(
        &self,
        raw: &RawColumnRef,
        view: &View,
    ) -> LineageResult<UpstreamColumnRef> {
        let dataset = self
            .resolve_relation(raw.schema.as_deref(), &raw.table, view)
            .map_err(|e| with_reference(e, raw.to_string()))?;
        self.column(dataset, &raw.column)
            .map_err(|e| with_reference(e, raw.to_string()))
    }

    /// Catalog-cased reference for an output column of the view itself
    pub fn normalize_downstream(
        &self,
        column: &str,
        view: &View,
    ) -> LineageResult<DownstreamColumnRef> {
        self.column(view.dataset.clone(), column)
    }

    fn column(&self, dataset: Dataset, column: &str) -> LineageResult<ColumnRef> {
        let table_schema = self.cache.table_schema(&dataset.name, &dataset.schema)?;
        match table_schema.get(&column.to_lowercase()) {
            Some(description) => Ok(ColumnRef::new(description.name.clone(), dataset)),
            None => Err(LineageError::UnresolvedIdentifier {
                reference: format!("{dataset}.{column}"),
                reason: "column not found in catalog".to_string(),
            }),
        }
    }
}

/// Report the reference as written in the SQL rather than the partial lookup
fn with_reference(err: LineageError, reference: String) -> LineageError {
    match err {
        LineageError::UnresolvedIdentifier { reason, .. } => {
            LineageError::UnresolvedIdentifier { reference, reason }
        }
        other => other,
    }
}

#[cfg(test)]
#[path = "normalize_test.rs"]
mod tests;
