//! Shared module - Common types and utilities
//!
//! Types used by every feature: the error type, identifiers, operation
//! times, and teardown futures.

pub mod models;
pub mod utils;

// Re-exports for convenience
pub use models::*;
pub use utils::Teardown;
