//! Configuration types and parsing for viewlineage.yml

use crate::error::{CoreError, CoreResult};
use crate::pattern::AllowDenyPattern;
use crate::serde_helpers::default_true;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Config file names looked up in a directory, in order
pub const CONFIG_FILE_NAMES: [&str; 2] = ["viewlineage.yml", "viewlineage.yaml"];

/// Main configuration from viewlineage.yml
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Catalog connection configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// SQL dialect used to parse view definitions
    #[serde(default)]
    pub dialect: Dialect,

    /// Schemas to scan, matched against the schema name
    #[serde(default)]
    pub schema_pattern: AllowDenyPattern,

    /// Views to scan, matched against the view name
    #[serde(default)]
    pub view_pattern: AllowDenyPattern,

    /// Emit dataset-level upstreams for each view
    #[serde(default = "default_true")]
    pub include_view_lineage: bool,

    /// Emit column-level edges for each view
    #[serde(default = "default_true")]
    pub include_column_lineage: bool,

    /// Identity settings for emitted lineage facts
    #[serde(default)]
    pub emit: EmitConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            dialect: Dialect::default(),
            schema_pattern: AllowDenyPattern::default(),
            view_pattern: AllowDenyPattern::default(),
            include_view_lineage: true,
            include_column_lineage: true,
            emit: EmitConfig::default(),
        }
    }
}

/// Catalog backend selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DbType {
    /// DuckDB database file (default)
    #[default]
    DuckDb,
    /// YAML file describing schemas, tables, and views
    Static,
}

impl std::fmt::Display for DbType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DbType::DuckDb => write!(f, "duckdb"),
            DbType::Static => write!(f, "static"),
        }
    }
}

/// Catalog connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Backend type
    #[serde(rename = "type", default)]
    pub db_type: DbType,

    /// DuckDB file path (or `:memory:`), or static catalog file path
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            db_type: DbType::default(),
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> String {
    ":memory:".to_string()
}

/// SQL dialect for parsing view definitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// DuckDB SQL (default)
    #[default]
    DuckDb,
    /// Snowflake SQL
    Snowflake,
    /// PostgreSQL
    Postgres,
    /// ANSI-ish generic SQL
    Generic,
    /// SAP HANA; parsed with the generic dialect
    Hana,
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Dialect::DuckDb => write!(f, "duckdb"),
            Dialect::Snowflake => write!(f, "snowflake"),
            Dialect::Postgres => write!(f, "postgres"),
            Dialect::Generic => write!(f, "generic"),
            Dialect::Hana => write!(f, "hana"),
        }
    }
}

/// Settings used to build dataset identities for emitted lineage facts
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EmitConfig {
    /// Platform name embedded in identities
    #[serde(default = "default_platform")]
    pub platform: String,

    /// Environment (e.g. PROD, DEV)
    #[serde(default = "default_env")]
    pub env: String,

    /// Prefix for dataset names; takes precedence over `database`
    #[serde(default)]
    pub database_alias: Option<String>,

    /// Logical database name used as a prefix when no alias is set
    #[serde(default)]
    pub database: Option<String>,
}

impl Default for EmitConfig {
    fn default() -> Self {
        Self {
            platform: default_platform(),
            env: default_env(),
            database_alias: None,
            database: None,
        }
    }
}

fn default_platform() -> String {
    "duckdb".to_string()
}

fn default_env() -> String {
    "PROD".to_string()
}

impl Config {
    /// Load configuration from a file path
    pub fn load(path: &Path) -> CoreResult<Self> {
        if !path.exists() {
            return Err(CoreError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| CoreError::IoWithPath {
            path: path.display().to_string(),
            source: e,
        })?;
        let config: Config = serde_yaml::from_str(&content)?;
        config.validate()?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a directory
    /// Looks for viewlineage.yml or viewlineage.yaml
    pub fn load_from_dir(dir: &Path) -> CoreResult<Self> {
        CONFIG_FILE_NAMES
            .iter()
            .map(|name| dir.join(name))
            .find(|p| p.exists())
            .map(|p| Self::load(&p))
            .unwrap_or_else(|| {
                Err(CoreError::ConfigNotFound {
                    path: dir.join(CONFIG_FILE_NAMES[0]).display().to_string(),
                })
            })
    }

    /// Validate the configuration
    fn validate(&self) -> CoreResult<()> {
        if self.database.path.trim().is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "database.path cannot be empty".to_string(),
            });
        }

        if self.database.db_type == DbType::Static && self.database.path == ":memory:" {
            return Err(CoreError::ConfigInvalid {
                message: "database.path must point to a catalog file when type is 'static'"
                    .to_string(),
            });
        }

        if self.emit.platform.trim().is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "emit.platform cannot be empty".to_string(),
            });
        }

        if !self.include_view_lineage && !self.include_column_lineage {
            log::warn!("Both include_view_lineage and include_column_lineage are disabled");
        }

        Ok(())
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
