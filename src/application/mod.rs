//! Application services layer.

pub mod error;
pub mod preview;
pub mod repos;
pub mod settings;
pub mod stylesheet;
