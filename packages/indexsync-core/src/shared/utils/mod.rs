//! Utility modules shared across features
//!
//! - `teardown`: infallible cleanup futures

pub mod teardown;

pub use teardown::Teardown;
