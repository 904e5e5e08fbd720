//! Lineage command implementation - column-level lineage across views

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;
use vl_core::{BuildReport, LineageGraph};
use vl_lineage::{build_lineage, EmitOptions, LineageFactEmitter, LineageFacts, UrnNamer};

use crate::cli::{GlobalArgs, LineageArgs, LineageOutput};
use crate::commands::common::{
    build_analyzer, load_config, open_catalog, print_report_verbose, print_table, with_cli_allow,
};

const DOCUMENT_VERSION: u32 = 1;

/// JSON document printed by `vl lineage`
#[derive(Debug, Serialize)]
pub(crate) struct LineageDocument<'a> {
    pub version: u32,
    pub run_id: String,
    pub generated_at: DateTime<Utc>,
    pub catalog_type: &'static str,
    pub dialect: &'static str,
    pub facts: Vec<LineageFacts>,
    pub report: &'a BuildReport,
}

impl<'a> LineageDocument<'a> {
    pub(crate) fn new(
        catalog_type: &'static str,
        dialect: &'static str,
        facts: Vec<LineageFacts>,
        report: &'a BuildReport,
    ) -> Self {
        Self {
            version: DOCUMENT_VERSION,
            run_id: Uuid::new_v4().to_string(),
            generated_at: Utc::now(),
            catalog_type,
            dialect,
            facts,
            report,
        }
    }
}

/// Execute the lineage command
pub(crate) fn execute(args: &LineageArgs, global: &GlobalArgs) -> Result<()> {
    let config = load_config(global)?;
    let cache = open_catalog(&config)?;
    let analyzer = build_analyzer(&config)?;
    let dialect = analyzer.dialect_name();

    let schema_pattern = with_cli_allow(&config.schema_pattern, &args.schema)?;
    let view_pattern = with_cli_allow(&config.view_pattern, &args.view)?;

    let graph = build_lineage(
        &cache,
        analyzer,
        |schema| schema_pattern.allowed(schema),
        |view| view_pattern.allowed(view),
    )
    .context("Failed to build lineage")?;

    if global.verbose {
        print_report_verbose(&graph.report);
    }

    match args.output {
        LineageOutput::Json => {
            let mut emitter = LineageFactEmitter::new(
                UrnNamer::from_config(&config.emit),
                EmitOptions::from_config(&config),
            );
            let facts = emitter.emit_graph(&graph);
            let document = LineageDocument::new(
                cache.provider().catalog_type(),
                dialect,
                facts,
                &graph.report,
            );
            let json =
                serde_json::to_string_pretty(&document).context("Failed to serialize lineage")?;
            println!("{}", json);
        }
        LineageOutput::Table => print_lineage_table(&graph),
    }

    Ok(())
}

/// One row per (downstream column, upstream column) pair
pub(crate) fn lineage_rows(graph: &LineageGraph) -> Vec<Vec<String>> {
    graph
        .views
        .iter()
        .flat_map(|lineage| {
            lineage.edges().iter().flat_map(move |edge| {
                edge.upstreams().iter().map(move |upstream| {
                    vec![
                        lineage.dataset().to_string(),
                        edge.downstream().name.clone(),
                        upstream.dataset.to_string(),
                        upstream.name.clone(),
                    ]
                })
            })
        })
        .collect()
}

/// Print lineage as a human-readable table
fn print_lineage_table(graph: &LineageGraph) {
    let rows = lineage_rows(graph);
    if rows.is_empty() {
        println!("No column lineage found.");
        return;
    }

    print_table(
        &["VIEW", "COLUMN", "UPSTREAM DATASET", "UPSTREAM COLUMN"],
        &rows,
    );
    println!(
        "\n{} view(s), {} column edge(s).",
        graph.views.len(),
        graph.edge_count()
    );
}

#[cfg(test)]
#[path = "lineage_test.rs"]
mod tests;
