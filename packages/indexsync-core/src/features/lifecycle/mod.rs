//! Index lifecycle
//!
//! - `config_state`: the registries every lifecycle operation works on
//! - `index_actions`: add, stage and drop generations
//! - `initializer`: start a generation from a snapshot or from scratch
//! - `staged_swapper`: promote staged generations once they are ready

pub mod config_state;
pub mod index_actions;
pub mod initializer;
pub mod staged_swapper;

pub use config_state::{ConfigState, PhasingOutIndexes};
pub use index_actions::IndexActions;
pub use initializer::{GenerationInitializer, Initialization};
pub use staged_swapper::StagedSwapper;
