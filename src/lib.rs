//! Settings-driven admin stylesheet generation with fingerprint caching and live preview.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
