//! Domain layer types and invariants.

pub mod color;
pub mod css;
pub mod error;
pub mod schema;
pub mod snapshot;
