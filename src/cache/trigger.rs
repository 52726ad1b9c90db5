//! Invalidation hooks for settings writes.

use std::sync::Arc;

use metrics::counter;
use tracing::{debug, info};

use super::METRIC_CACHE_INVALIDATE;
use super::store::GenerationCache;

/// Write that changed the stored settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    SettingsUpdated,
    SettingsReset,
    SettingsImported,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::SettingsUpdated => "settings_updated",
            EventKind::SettingsReset => "settings_reset",
            EventKind::SettingsImported => "settings_imported",
        }
    }
}

/// Flushes the generation cache after the stored settings change.
#[derive(Clone)]
pub struct CacheTrigger {
    cache: Arc<GenerationCache>,
}

impl CacheTrigger {
    pub fn new(cache: Arc<GenerationCache>) -> Self {
        Self { cache }
    }

    pub fn trigger(&self, kind: EventKind) {
        if !self.cache.config().enabled {
            debug!(event_kind = kind.as_str(), "Cache trigger skipped: cache disabled");
            return;
        }

        let removed = self.cache.invalidate_all();
        counter!(METRIC_CACHE_INVALIDATE, "event" => kind.as_str()).increment(1);
        info!(
            event_kind = kind.as_str(),
            removed, "Invalidated generated stylesheets"
        );
    }

    pub fn settings_updated(&self) {
        self.trigger(EventKind::SettingsUpdated);
    }

    pub fn settings_reset(&self) {
        self.trigger(EventKind::SettingsReset);
    }

    pub fn settings_imported(&self) {
        self.trigger(EventKind::SettingsImported);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::stylesheet::TemplateRenderer;
    use crate::cache::CacheConfig;
    use crate::domain::snapshot::SettingsSnapshot;

    #[tokio::test]
    async fn settings_writes_flush_the_cache() {
        let cache = Arc::new(GenerationCache::new(
            CacheConfig::default(),
            Arc::new(TemplateRenderer),
        ));
        let trigger = CacheTrigger::new(Arc::clone(&cache));

        cache
            .get_or_generate(&SettingsSnapshot::defaults())
            .await
            .expect("render");
        assert_eq!(cache.len(), 1);

        trigger.settings_updated();
        assert!(cache.is_empty());
    }
}
