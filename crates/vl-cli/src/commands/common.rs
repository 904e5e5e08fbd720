//! Shared utilities for CLI commands

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use vl_core::{AllowDenyPattern, BuildReport, Config, CoreError, DbType};
use vl_db::{CatalogCache, CatalogProvider, DuckDbCatalog, StaticCatalog};
use vl_sql::ColumnLineageAnalyzer;

use crate::cli::GlobalArgs;

const IN_MEMORY: &str = ":memory:";

/// Catalog type shared by all commands
pub(crate) type Catalog = CatalogCache<Box<dyn CatalogProvider>>;

/// Load the configuration named on the command line, or the one in the
/// current directory.
///
/// Without `--config`, a missing file falls back to the defaults (an
/// in-memory DuckDB database). A relative database path is resolved against
/// the config file's directory; `--database` overrides it as given.
pub(crate) fn load_config(global: &GlobalArgs) -> Result<Config> {
    let (mut config, base_dir) = match &global.config {
        Some(path) => {
            let path = Path::new(path);
            let config = Config::load(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?;
            (config, path.parent().map(Path::to_path_buf))
        }
        None => match Config::load_from_dir(Path::new(".")) {
            Ok(config) => (config, None),
            Err(CoreError::ConfigNotFound { .. }) => {
                log::debug!("No viewlineage.yml found, using defaults");
                (Config::default(), None)
            }
            Err(e) => return Err(e).context("Failed to load config"),
        },
    };

    match &global.database {
        Some(database) => config.database.path = database.clone(),
        None => {
            if let Some(base_dir) = base_dir {
                config.database.path = resolve_database_path(&config.database.path, &base_dir);
            }
        }
    }

    Ok(config)
}

/// Resolve a database path relative to `base_dir`; `:memory:` and absolute
/// paths are returned unchanged.
pub(crate) fn resolve_database_path(path: &str, base_dir: &Path) -> String {
    if path == IN_MEMORY || Path::new(path).is_absolute() {
        return path.to_string();
    }
    let resolved: PathBuf = base_dir.join(path);
    resolved.display().to_string()
}

/// Open the configured catalog behind a fresh cache
pub(crate) fn open_catalog(config: &Config) -> Result<Catalog> {
    let path = &config.database.path;
    let provider: Box<dyn CatalogProvider> = match config.database.db_type {
        DbType::DuckDb => Box::new(
            DuckDbCatalog::new(path)
                .with_context(|| format!("Failed to open DuckDB database {path}"))?,
        ),
        DbType::Static => Box::new(
            StaticCatalog::load(Path::new(path))
                .with_context(|| format!("Failed to load static catalog {path}"))?,
        ),
    };
    log::debug!("Opened {} catalog at {}", provider.catalog_type(), path);
    Ok(CatalogCache::new(provider))
}

/// Column lineage analyzer for the configured dialect
pub(crate) fn build_analyzer(config: &Config) -> Result<ColumnLineageAnalyzer> {
    ColumnLineageAnalyzer::from_dialect_name(&config.dialect.to_string())
        .context("Invalid SQL dialect")
}

/// Apply command-line allow patterns over a configured pattern
pub(crate) fn with_cli_allow(pattern: &AllowDenyPattern, allow: &[String]) -> Result<AllowDenyPattern> {
    pattern
        .clone()
        .with_allow(allow.to_vec())
        .context("Invalid pattern on the command line")
}

/// Print everything the build skipped to stderr
pub(crate) fn print_report_verbose(report: &BuildReport) {
    eprintln!(
        "[verbose] Scanned {} schemas, {} views",
        report.schemas_scanned, report.views_scanned
    );
    for name in &report.dropped {
        eprintln!("[verbose] Filtered out '{}'", name);
    }
    for name in &report.empty_definitions {
        eprintln!("[verbose] Skipping '{}': no view definition", name);
    }
    for view in &report.unparsable {
        eprintln!(
            "[verbose] Skipping '{}': parse error: {}",
            view.view, view.message
        );
    }
    for unresolved in &report.unresolved {
        eprintln!(
            "[verbose] Unresolved reference '{}' in '{}' (column {})",
            unresolved.reference, unresolved.view, unresolved.column
        );
    }
}

/// Calculate column widths for a table given headers and row data.
///
/// For each column, returns the maximum width across the header and all
/// row values so that data aligns when printed with left-padding.
pub(crate) fn calculate_column_widths(headers: &[&str], rows: &[Vec<String>]) -> Vec<usize> {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (w, cell) in widths.iter_mut().zip(row.iter()) {
            *w = (*w).max(cell.len());
        }
    }
    widths
}

/// Render a left-aligned table: header row, dash separator, data rows.
/// Columns are separated by two spaces.
pub(crate) fn format_table(headers: &[&str], rows: &[Vec<String>]) -> Vec<String> {
    let widths = calculate_column_widths(headers, rows);

    let mut lines = Vec::with_capacity(rows.len() + 2);
    lines.push(render_row(headers.iter().copied(), &widths));
    let sep_parts: Vec<String> = widths.iter().map(|&w| "-".repeat(w)).collect();
    lines.push(sep_parts.join("  "));
    for row in rows {
        lines.push(render_row(row.iter().map(String::as_str), &widths));
    }
    lines
}

fn render_row<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    let parts: Vec<String> = cells
        .zip(widths)
        .map(|(cell, &w)| format!("{:<width$}", cell, width = w))
        .collect();
    parts.join("  ").trim_end().to_string()
}

/// Print a formatted table to stdout
pub(crate) fn print_table(headers: &[&str], rows: &[Vec<String>]) {
    for line in format_table(headers, rows) {
        println!("{}", line);
    }
}

#[cfg(test)]
#[path = "common_test.rs"]
mod tests;
