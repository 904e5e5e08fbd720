//! vl-core - Core library for viewlineage
//!
//! This crate provides the lineage data model shared by every other crate,
//! configuration parsing for `viewlineage.yml`, and the allow/deny patterns
//! used to select schemas and views.

pub mod config;
pub mod error;
pub mod model;
pub mod pattern;
pub mod report;
pub(crate) mod serde_helpers;

pub use config::{Config, DatabaseConfig, DbType, Dialect, EmitConfig};
pub use error::{CoreError, CoreResult};
pub use model::{
    ColumnEdge, ColumnRef, Dataset, DownstreamColumnRef, LineageGraph, UpstreamColumnRef, View,
    ViewLineage,
};
pub use pattern::AllowDenyPattern;
pub use report::{BuildReport, UnparsableView, UnresolvedReference};
