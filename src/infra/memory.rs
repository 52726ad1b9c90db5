//! In-process settings store used when no database is configured.

use std::sync::RwLock;

use async_trait::async_trait;

use crate::application::repos::{RepoError, SettingsStore};
use crate::cache::{rw_read, rw_write};
use crate::domain::snapshot::StoredOptions;

const SOURCE: &str = "infra::memory";

#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    options: RwLock<StoredOptions>,
}

impl MemorySettingsStore {
    pub fn new(options: StoredOptions) -> Self {
        Self {
            options: RwLock::new(options),
        }
    }
}

#[async_trait]
impl SettingsStore for MemorySettingsStore {
    async fn load_options(&self) -> Result<StoredOptions, RepoError> {
        Ok(rw_read(&self.options, SOURCE, "load_options").clone())
    }

    async fn replace_options(&self, options: &StoredOptions) -> Result<(), RepoError> {
        *rw_write(&self.options, SOURCE, "replace_options") = options.clone();
        Ok(())
    }

    async fn clear_options(&self) -> Result<(), RepoError> {
        rw_write(&self.options, SOURCE, "clear_options").clear();
        Ok(())
    }

    async fn health_check(&self) -> Result<(), RepoError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn replace_then_clear() {
        let store = MemorySettingsStore::default();
        let mut options = StoredOptions::new();
        options.insert("menu_width".into(), json!(200));

        store.replace_options(&options).await.expect("replace");
        assert_eq!(store.load_options().await.expect("load"), options);

        store.clear_options().await.expect("clear");
        assert!(store.load_options().await.expect("load").is_empty());
    }
}
