//! Lineage data model: datasets, views, column references, and edges
//!
//! Every identifier stored in these types is expected to carry the exact
//! casing recorded in the database catalog. Normalization happens before a
//! value is constructed (see the `vl-lineage` crate); the model itself never
//! changes case.

use crate::report::BuildReport;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// A uniquely identified relation (table or view)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Dataset {
    /// Owning schema
    pub schema: String,
    /// Relation name
    pub name: String,
}

impl Dataset {
    /// Create a new dataset identity
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
        }
    }

    /// `schema.name`
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.schema, self.name)
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.name)
    }
}

/// A view together with its defining query text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct View {
    /// Identity of the view
    #[serde(flatten)]
    pub dataset: Dataset,
    /// The view's defining SQL
    pub sql: String,
}

impl View {
    /// Create a new view
    pub fn new(schema: impl Into<String>, name: impl Into<String>, sql: impl Into<String>) -> Self {
        Self {
            dataset: Dataset::new(schema, name),
            sql: sql.into(),
        }
    }

    /// Schema the view lives in
    pub fn schema(&self) -> &str {
        &self.dataset.schema
    }

    /// View name
    pub fn name(&self) -> &str {
        &self.dataset.name
    }
}

/// One column in one dataset
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ColumnRef {
    /// Column name, catalog casing
    pub name: String,
    /// Dataset owning the column
    pub dataset: Dataset,
}

impl ColumnRef {
    /// Create a new column reference
    pub fn new(name: impl Into<String>, dataset: Dataset) -> Self {
        Self {
            name: name.into(),
            dataset,
        }
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.dataset, self.name)
    }
}

/// A column being defined by a view
pub type DownstreamColumnRef = ColumnRef;

/// A column feeding a downstream column
pub type UpstreamColumnRef = ColumnRef;

/// A downstream column and the upstream columns it is computed from
///
/// The upstream list is never empty: a column without discoverable lineage
/// has no edge at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnEdge {
    downstream: DownstreamColumnRef,
    upstreams: Vec<UpstreamColumnRef>,
}

impl ColumnEdge {
    /// Build an edge, returning `None` when `upstreams` is empty
    pub fn new(downstream: DownstreamColumnRef, upstreams: Vec<UpstreamColumnRef>) -> Option<Self> {
        if upstreams.is_empty() {
            return None;
        }
        Some(Self {
            downstream,
            upstreams,
        })
    }

    /// The column being defined
    pub fn downstream(&self) -> &DownstreamColumnRef {
        &self.downstream
    }

    /// Upstream columns, in discovery order
    pub fn upstreams(&self) -> &[UpstreamColumnRef] {
        &self.upstreams
    }
}

/// Column lineage of a single view
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewLineage {
    view: View,
    edges: Vec<ColumnEdge>,
    upstream_datasets: BTreeSet<Dataset>,
}

impl ViewLineage {
    /// Create the lineage of a view; the distinct upstream datasets are
    /// derived from the edges.
    pub fn new(view: View, edges: Vec<ColumnEdge>) -> Self {
        let upstream_datasets = edges
            .iter()
            .flat_map(|e| e.upstreams.iter().map(|u| u.dataset.clone()))
            .collect();
        Self {
            view,
            edges,
            upstream_datasets,
        }
    }

    /// Add datasets the view reads without feeding any column, such as
    /// relations used only in `COUNT(*)`, a join predicate or a filter
    pub fn with_relations(mut self, relations: impl IntoIterator<Item = Dataset>) -> Self {
        self.upstream_datasets.extend(relations);
        self
    }

    /// The analyzed view
    pub fn view(&self) -> &View {
        &self.view
    }

    /// Dataset identity of the view
    pub fn dataset(&self) -> &Dataset {
        &self.view.dataset
    }

    /// Edges in SELECT-list order
    pub fn edges(&self) -> &[ColumnEdge] {
        &self.edges
    }

    /// Distinct datasets the view reads, through an edge or otherwise
    pub fn upstream_datasets(&self) -> &BTreeSet<Dataset> {
        &self.upstream_datasets
    }

    /// Find the edge for a downstream column by exact name
    pub fn edge(&self, column: &str) -> Option<&ColumnEdge> {
        self.edges.iter().find(|e| e.downstream.name == column)
    }
}

/// Result of one lineage build over a catalog
#[derive(Debug, Clone, Default, Serialize)]
pub struct LineageGraph {
    /// Per-view lineage in catalog enumeration order
    pub views: Vec<ViewLineage>,
    /// What the build skipped and why
    pub report: BuildReport,
}

impl LineageGraph {
    /// Look up a view's lineage by schema and name
    pub fn view(&self, schema: &str, name: &str) -> Option<&ViewLineage> {
        self.views
            .iter()
            .find(|v| v.view.schema() == schema && v.view.name() == name)
    }

    /// Every distinct upstream dataset across the whole graph
    pub fn upstream_datasets(&self) -> BTreeSet<&Dataset> {
        self.views
            .iter()
            .flat_map(|v| v.upstream_datasets.iter())
            .collect()
    }

    /// Total number of column edges
    pub fn edge_count(&self) -> usize {
        self.views.iter().map(|v| v.edges.len()).sum()
    }
}

#[cfg(test)]
#[path = "model_test.rs"]
mod tests;
