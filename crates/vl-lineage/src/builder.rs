//! Lineage graph builder
//!
//! Walks the catalog schema by schema and view by view, runs the column
//! resolver on every view definition, and normalizes the resulting raw
//! references into catalog-exact [`ColumnEdge`]s.

use crate::error::{LineageError, LineageResult};
use crate::normalize::IdentifierNormalizer;
use vl_core::{
    BuildReport, ColumnEdge, Dataset, LineageGraph, UnparsableView, UnresolvedReference,
    UpstreamColumnRef, View, ViewLineage,
};
use vl_db::{CatalogCache, CatalogProvider};
use vl_sql::{ColumnLineageAnalyzer, RelationSchemas, ViewQuery};

/// Builds a [`LineageGraph`] from a cached catalog
pub struct LineageGraphBuilder<'c, C> {
    cache: &'c CatalogCache<C>,
    analyzer: ColumnLineageAnalyzer,
}

impl<'c, C: CatalogProvider> LineageGraphBuilder<'c, C> {
    /// Create a builder reading through `cache` and parsing with `analyzer`
    pub fn new(cache: &'c CatalogCache<C>, analyzer: ColumnLineageAnalyzer) -> Self {
        Self { cache, analyzer }
    }

    /// Build lineage for every view passing both filters
    ///
    /// Views are visited in catalog enumeration order. Unparsable views and
    /// unresolved references are skipped and recorded in the graph's report;
    /// a catalog failure aborts the whole build.
    pub fn build<S, V>(&self, schema_filter: S, view_filter: V) -> LineageResult<LineageGraph>
    where
        S: Fn(&str) -> bool,
        V: Fn(&str) -> bool,
    {
        let mut graph = LineageGraph::default();
        let schemas = self.cache.schema_names()?;
        graph.report.schemas_scanned = schemas.len();

        for schema in schemas.iter() {
            if !schema_filter(schema) {
                graph.report.report_dropped(schema.as_str());
                continue;
            }

            let views = self.cache.view_names(schema)?;
            graph.report.views_scanned += views.len();

            for name in views.iter() {
                let qualified = format!("{schema}.{name}");
                if !view_filter(name) {
                    graph.report.report_dropped(qualified);
                    continue;
                }

                let sql = self.cache.view_definition(name, schema)?;
                if sql.trim().is_empty() {
                    log::debug!("View {qualified} has no definition, skipping");
                    graph.report.empty_definitions.push(qualified);
                    continue;
                }

                let view = View::new(schema.as_str(), name.as_str(), sql.as_str());
                if let Some(lineage) = self.view_lineage(&view, &mut graph.report)? {
                    graph.views.push(lineage);
                }
            }
        }

        let stats = self.cache.stats();
        log::debug!(
            "Lineage built for {} views ({} edges), catalog cache {} hits / {} misses",
            graph.views.len(),
            graph.edge_count(),
            stats.hits,
            stats.misses
        );
        Ok(graph)
    }

    /// Column lineage of a single view
    ///
    /// Returns `Ok(None)` when the definition cannot be parsed.
    pub fn view_lineage(
        &self,
        view: &View,
        report: &mut BuildReport,
    ) -> LineageResult<Option<ViewLineage>> {
        let qualified = view.dataset.qualified_name();
        let query = match self.analyzer.parse(&view.sql) {
            Ok(query) => query,
            Err(e) => {
                log::warn!("Skipping view {qualified}: {e}");
                report.unparsable.push(UnparsableView {
                    view: qualified,
                    message: e.to_string(),
                });
                return Ok(None);
            }
        };

        let normalizer = IdentifierNormalizer::new(self.cache);
        let (schemas, relations) = self.relation_schemas(&query, view, &normalizer)?;

        let mut edges = Vec::new();
        for column in self.analyzer.resolve(&query, &schemas) {
            if !column.has_lineage() && column.unresolved.is_empty() {
                continue;
            }

            let downstream = match normalizer.normalize_downstream(&column.output_column, view) {
                Ok(downstream) => downstream,
                Err(LineageError::UnresolvedIdentifier { reference, reason }) => {
                    log::warn!("View {qualified}: output column {reference} {reason}");
                    report.unresolved.push(UnresolvedReference {
                        view: qualified.clone(),
                        column: column.output_column.clone(),
                        reference,
                    });
                    continue;
                }
                Err(e) => return Err(e),
            };

            for reference in &column.unresolved {
                log::warn!(
                    "View {qualified}: column {} reads {reference}, which no relation in scope provides",
                    downstream.name
                );
                report.unresolved.push(UnresolvedReference {
                    view: qualified.clone(),
                    column: downstream.name.clone(),
                    reference: reference.clone(),
                });
            }

            let mut upstreams: Vec<UpstreamColumnRef> = Vec::with_capacity(column.sources.len());
            for raw in &column.sources {
                match normalizer.normalize_upstream(raw, view) {
                    Ok(upstream) => {
                        if !upstreams.contains(&upstream) {
                            upstreams.push(upstream);
                        }
                    }
                    Err(LineageError::UnresolvedIdentifier { reference, reason }) => {
                        log::warn!(
                            "View {qualified}: dropping upstream {reference} of column {}: {reason}",
                            downstream.name
                        );
                        report.unresolved.push(UnresolvedReference {
                            view: qualified.clone(),
                            column: downstream.name.clone(),
                            reference,
                        });
                    }
                    Err(e) => return Err(e),
                }
            }

            if let Some(edge) = ColumnEdge::new(downstream, upstreams) {
                edges.push(edge);
            }
        }

        Ok(Some(ViewLineage::new(view.clone(), edges).with_relations(relations)))
    }

    /// Catalog columns of every relation the query reads, and the datasets
    /// those relations resolve to
    ///
    /// Relations missing from the catalog stay unknown to the resolver; their
    /// references surface later as unresolved identifiers.
    fn relation_schemas(
        &self,
        query: &ViewQuery,
        view: &View,
        normalizer: &IdentifierNormalizer<'c, C>,
    ) -> LineageResult<(RelationSchemas, Vec<Dataset>)> {
        let mut schemas = RelationSchemas::new();
        let mut datasets = Vec::new();
        for relation in self.analyzer.relations(query) {
            let dataset = match normalizer.resolve_relation_name(&relation, view) {
                Ok(dataset) => dataset,
                Err(LineageError::UnresolvedIdentifier { .. }) => {
                    log::debug!("Relation {relation} not in catalog, columns unknown");
                    continue;
                }
                Err(e) => return Err(e),
            };
            let columns = self.cache.columns(&dataset.name, &dataset.schema)?;
            if !columns.is_empty() {
                schemas.insert(relation, columns.iter().map(|c| c.name.as_str()));
            }
            datasets.push(dataset);
        }
        Ok((schemas, datasets))
    }
}

/// Build lineage for every view of a catalog passing both filters
pub fn build_lineage<C, S, V>(
    cache: &CatalogCache<C>,
    analyzer: ColumnLineageAnalyzer,
    schema_filter: S,
    view_filter: V,
) -> LineageResult<LineageGraph>
where
    C: CatalogProvider,
    S: Fn(&str) -> bool,
    V: Fn(&str) -> bool,
{
    LineageGraphBuilder::new(cache, analyzer).build(schema_filter, view_filter)
}

#[cfg(test)]
#[path = "builder_test.rs"]
mod tests;
