//! Lineage fact emission
//!
//! Renders a [`ViewLineage`] into identity strings for a metadata catalog:
//! the view's dataset identity, the distinct upstream dataset identities, and
//! one fine-grained edge per downstream column. How identities are spelled is
//! up to the [`DatasetNamer`]; the emitter only guarantees that a dataset is
//! named the same way everywhere it appears.

use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use vl_core::{Config, Dataset, EmitConfig, LineageGraph, ViewLineage};

/// Builds global identity strings for datasets and their columns
pub trait DatasetNamer {
    /// Identity of a dataset
    fn dataset_identity(&self, dataset: &Dataset) -> String;

    /// Identity of a column within an already named dataset
    fn column_identity(&self, dataset_identity: &str, column: &str) -> String;
}

/// DataHub-style URNs
///
/// `urn:li:dataset:(urn:li:dataPlatform:<platform>,[<prefix>.]<schema>.<name>,<env>)`
/// for datasets and `urn:li:schemaField:(<dataset urn>,<column>)` for columns.
/// Identifiers are used verbatim; no case folding is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrnNamer {
    platform: String,
    env: String,
    prefix: Option<String>,
}

impl UrnNamer {
    /// Create a namer for a platform and environment
    pub fn new(platform: impl Into<String>, env: impl Into<String>) -> Self {
        Self {
            platform: platform.into(),
            env: env.into(),
            prefix: None,
        }
    }

    /// Prefix every dataset name with a database name or alias
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Namer described by the `emit` section of the configuration
    ///
    /// `database_alias` takes precedence over `database`.
    pub fn from_config(config: &EmitConfig) -> Self {
        let namer = Self::new(config.platform.as_str(), config.env.as_str());
        match config.database_alias.as_ref().or(config.database.as_ref()) {
            Some(prefix) => namer.with_prefix(prefix.as_str()),
            None => namer,
        }
    }
}

impl DatasetNamer for UrnNamer {
    fn dataset_identity(&self, dataset: &Dataset) -> String {
        let name = match &self.prefix {
            Some(prefix) => format!("{}.{}", prefix, dataset),
            None => dataset.qualified_name(),
        };
        format!(
            "urn:li:dataset:(urn:li:dataPlatform:{},{},{})",
            self.platform, name, self.env
        )
    }

    fn column_identity(&self, dataset_identity: &str, column: &str) -> String {
        format!("urn:li:schemaField:({},{})", dataset_identity, column)
    }
}

/// Which parts of the lineage to emit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmitOptions {
    /// Dataset-level upstreams
    pub include_view_lineage: bool,
    /// Column-level edges
    pub include_column_lineage: bool,
}

impl EmitOptions {
    /// Options taken from the configuration file
    pub fn from_config(config: &Config) -> Self {
        Self {
            include_view_lineage: config.include_view_lineage,
            include_column_lineage: config.include_column_lineage,
        }
    }
}

impl Default for EmitOptions {
    fn default() -> Self {
        Self {
            include_view_lineage: true,
            include_column_lineage: true,
        }
    }
}

/// One downstream column and the upstream columns feeding it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FineGrainedEdge {
    /// Always `FIELD_SET`
    pub upstream_type: &'static str,
    /// Upstream column identities, in discovery order
    pub upstreams: Vec<String>,
    /// Always `FIELD`
    pub downstream_type: &'static str,
    /// Downstream column identity
    pub downstream: String,
}

/// Everything emitted for one view
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineageFacts {
    /// Identity of the view
    pub downstream: String,
    /// Distinct upstream dataset identities, sorted
    pub upstreams: BTreeSet<String>,
    /// Column-level edges in SELECT-list order
    pub edges: Vec<FineGrainedEdge>,
}

impl LineageFacts {
    /// Nothing worth sending for this view
    pub fn is_empty(&self) -> bool {
        self.upstreams.is_empty() && self.edges.is_empty()
    }
}

/// Turns view lineage into [`LineageFacts`]
pub struct LineageFactEmitter<N> {
    namer: N,
    options: EmitOptions,
    identities: HashMap<Dataset, String>,
}

impl<N: DatasetNamer> LineageFactEmitter<N> {
    /// Create an emitter
    pub fn new(namer: N, options: EmitOptions) -> Self {
        Self {
            namer,
            options,
            identities: HashMap::new(),
        }
    }

    /// The namer in use
    pub fn namer(&self) -> &N {
        &self.namer
    }

    /// Facts for a single view
    pub fn emit(&mut self, lineage: &ViewLineage) -> LineageFacts {
        let downstream = self.identity(lineage.dataset());

        let upstreams = if self.options.include_view_lineage {
            lineage
                .upstream_datasets()
                .iter()
                .map(|dataset| self.identity(dataset))
                .collect()
        } else {
            BTreeSet::new()
        };

        let edges = if self.options.include_column_lineage {
            lineage
                .edges()
                .iter()
                .map(|edge| {
                    let upstreams = edge
                        .upstreams()
                        .iter()
                        .map(|column| {
                            let dataset = self.identity(&column.dataset);
                            self.namer.column_identity(&dataset, &column.name)
                        })
                        .collect();
                    FineGrainedEdge {
                        upstream_type: "FIELD_SET",
                        upstreams,
                        downstream_type: "FIELD",
                        downstream: self
                            .namer
                            .column_identity(&downstream, &edge.downstream().name),
                    }
                })
                .collect()
        } else {
            Vec::new()
        };

        LineageFacts {
            downstream,
            upstreams,
            edges,
        }
    }

    /// Facts for every view of a graph, skipping views with nothing to emit
    pub fn emit_graph(&mut self, graph: &LineageGraph) -> Vec<LineageFacts> {
        graph
            .views
            .iter()
            .map(|lineage| self.emit(lineage))
            .filter(|facts| !facts.is_empty())
            .collect()
    }

    fn identity(&mut self, dataset: &Dataset) -> String {
        if let Some(identity) = self.identities.get(dataset) {
            return identity.clone();
        }
        let identity = self.namer.dataset_identity(dataset);
        self.identities.insert(dataset.clone(), identity.clone());
        identity
    }
}

#[cfg(test)]
#[path = "emit_test.rs"]
mod tests;
