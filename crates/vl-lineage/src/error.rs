//! Error types for vl-lineage

use thiserror::Error;
use vl_db::DbError;

/// Lineage build errors
#[derive(Error, Debug)]
pub enum LineageError {
    /// The catalog failed; aborts the whole build (L001)
    #[error("[L001] Catalog unavailable: {0}")]
    Catalog(#[from] DbError),

    /// A reference does not exist in the catalog (L002)
    #[error("[L002] Unresolved identifier '{reference}': {reason}")]
    UnresolvedIdentifier { reference: String, reason: String },
}

/// Result type alias for LineageError
pub type LineageResult<T> = Result<T, LineageError>;
