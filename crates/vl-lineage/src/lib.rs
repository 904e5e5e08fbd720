//! vl-lineage - View column lineage for viewlineage
//!
//! Turns view definitions read from a catalog into catalog-exact column
//! lineage: the per-view resolver output from `vl-sql` is normalized against
//! the cached catalog (`vl-db`) into the `vl-core` data model, then rendered
//! into lineage facts for a metadata catalog.

pub mod builder;
pub mod emit;
pub mod error;
pub mod normalize;

pub use builder::{build_lineage, LineageGraphBuilder};
pub use emit::{
    DatasetNamer, EmitOptions, FineGrainedEdge, LineageFactEmitter, LineageFacts, UrnNamer,
};
pub use error::{LineageError, LineageResult};
pub use normalize::IdentifierNormalizer;
