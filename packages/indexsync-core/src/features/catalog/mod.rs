//! Index catalogs
//!
//! - `IndexCatalog`: which generation of each index is current
//! - `InitializedIndexCatalog`: which generations are running
//! - `definition`: index definitions, runtime handles, `IndexGeneration`

pub mod definition;
pub mod index_catalog;
pub mod initialized_catalog;

pub use definition::{
    Index, IndexDefinition, IndexGeneration, InitializedIndex, TrackedIndex, ViewDefinition,
    DEFAULT_DEFINITION_VERSION,
};
pub use index_catalog::IndexCatalog;
pub use initialized_catalog::InitializedIndexCatalog;
