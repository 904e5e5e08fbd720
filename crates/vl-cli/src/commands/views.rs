//! Views command implementation - list views and their definitions

use anyhow::{Context, Result};
use vl_core::AllowDenyPattern;
use vl_db::{CatalogCache, CatalogProvider, DbResult};

use crate::cli::{GlobalArgs, ViewsArgs};
use crate::commands::common::{load_config, open_catalog, print_table, with_cli_allow};

/// Execute the views command
pub(crate) fn execute(args: &ViewsArgs, global: &GlobalArgs) -> Result<()> {
    let config = load_config(global)?;
    let cache = open_catalog(&config)?;
    let schema_pattern = with_cli_allow(&config.schema_pattern, &args.schema)?;

    let rows = view_rows(&cache, &schema_pattern, &config.view_pattern)
        .context("Failed to read views from catalog")?;

    if rows.is_empty() {
        println!("No views found.");
        return Ok(());
    }

    print_table(&["VIEW", "DEFINITION", "COLUMNS"], &rows);
    println!("\n{} view(s) found.", rows.len());

    if global.verbose {
        let stats = cache.stats();
        eprintln!(
            "[verbose] {} catalog: {} lookups, {} cached",
            cache.provider().catalog_type(),
            stats.misses,
            stats.hits
        );
    }
    Ok(())
}

/// One row per view passing both patterns: `schema.view`, whether a
/// definition is stored, and the number of catalog columns.
pub(crate) fn view_rows<C: CatalogProvider>(
    cache: &CatalogCache<C>,
    schema_pattern: &AllowDenyPattern,
    view_pattern: &AllowDenyPattern,
) -> DbResult<Vec<Vec<String>>> {
    let mut rows = Vec::new();
    for schema in cache.schema_names()?.iter() {
        if !schema_pattern.allowed(schema) {
            continue;
        }
        for view in cache.view_names(schema)?.iter() {
            if !view_pattern.allowed(view) {
                continue;
            }
            let definition = cache.view_definition(view, schema)?;
            let columns = cache.columns(view, schema)?;
            rows.push(vec![
                format!("{schema}.{view}"),
                if definition.trim().is_empty() { "no" } else { "yes" }.to_string(),
                columns.len().to_string(),
            ]);
        }
    }
    Ok(rows)
}

#[cfg(test)]
#[path = "views_test.rs"]
mod tests;
