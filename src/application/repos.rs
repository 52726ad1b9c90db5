//! Persistence seam for the stored admin style options.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::snapshot::StoredOptions;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// Host-owned key-value storage of the admin style options.
///
/// Stores hold raw values keyed by wire name; decoding and validation happen
/// when a snapshot is built from them.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn load_options(&self) -> Result<StoredOptions, RepoError>;

    /// Replace every stored option with `options` atomically.
    async fn replace_options(&self, options: &StoredOptions) -> Result<(), RepoError>;

    /// Remove every stored option so that each key reads as its default.
    async fn clear_options(&self) -> Result<(), RepoError>;

    async fn health_check(&self) -> Result<(), RepoError>;
}
