//! Fingerprint-keyed store of generated stylesheets.

use std::sync::{Arc, RwLock};
use std::time::Instant;

use lru::LruCache;
use metrics::{counter, histogram};
use tracing::{debug, warn};

use crate::application::stylesheet::{GenerationError, StyleRenderer};
use crate::domain::css::CssDocument;
use crate::domain::snapshot::{Fingerprint, SettingsSnapshot};

use super::config::CacheConfig;
use super::lock::{rw_read, rw_write};
use super::{
    METRIC_CACHE_EVICT, METRIC_CACHE_EXPIRED, METRIC_CACHE_HIT, METRIC_CACHE_MISS,
    METRIC_GENERATE_MS,
};

const SOURCE: &str = "cache::store";

/// A stylesheet together with the fingerprint of the snapshot it came from.
#[derive(Debug, Clone)]
pub struct RenderedStylesheet {
    pub fingerprint: Fingerprint,
    pub css: CssDocument,
    /// True when the document came from the cache rather than a fresh render.
    pub cached: bool,
}

struct CacheEntry {
    css: CssDocument,
    stored_at: Instant,
}

pub struct GenerationCache {
    config: CacheConfig,
    renderer: Arc<dyn StyleRenderer>,
    entries: RwLock<LruCache<Fingerprint, CacheEntry>>,
    last_good: RwLock<Option<CssDocument>>,
}

impl GenerationCache {
    pub fn new(config: CacheConfig, renderer: Arc<dyn StyleRenderer>) -> Self {
        let capacity = config.max_entries_non_zero();
        Self {
            config,
            renderer,
            entries: RwLock::new(LruCache::new(capacity)),
            last_good: RwLock::new(None),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Return the stylesheet for `snapshot`, rendering it on a blocking
    /// worker when no fresh entry exists. Failed renders are never stored.
    pub async fn get_or_generate(
        &self,
        snapshot: &SettingsSnapshot,
    ) -> Result<RenderedStylesheet, GenerationError> {
        let fingerprint = snapshot.fingerprint();

        if self.config.enabled
            && let Some(css) = self.lookup(&fingerprint)
        {
            return Ok(RenderedStylesheet {
                fingerprint,
                css,
                cached: true,
            });
        }

        let css = self.render(snapshot).await?;
        if self.config.enabled {
            self.store(fingerprint.clone(), css.clone());
        }

        Ok(RenderedStylesheet {
            fingerprint,
            css,
            cached: false,
        })
    }

    async fn render(&self, snapshot: &SettingsSnapshot) -> Result<CssDocument, GenerationError> {
        let renderer = Arc::clone(&self.renderer);
        let snapshot = snapshot.clone();
        let started_at = Instant::now();

        let result = tokio::task::spawn_blocking(move || renderer.render(&snapshot))
            .await
            .map_err(|err| GenerationError::Aborted(err.to_string()))?;

        histogram!(METRIC_GENERATE_MS).record(started_at.elapsed().as_secs_f64() * 1000.0);
        if let Err(err) = &result {
            warn!(source = SOURCE, error = %err, "Stylesheet generation failed");
        }
        result
    }

    /// Remember `css` as the last good stylesheet for the stored settings.
    /// Preview renders are never recorded here.
    pub fn record_last_good(&self, css: &CssDocument) {
        *rw_write(&self.last_good, SOURCE, "record_last_good") = Some(css.clone());
    }

    /// Last stylesheet recorded for the stored settings. Survives invalidation.
    pub fn last_good(&self) -> Option<CssDocument> {
        rw_read(&self.last_good, SOURCE, "last_good").clone()
    }

    pub fn invalidate(&self, fingerprint: &Fingerprint) -> bool {
        rw_write(&self.entries, SOURCE, "invalidate")
            .pop(fingerprint)
            .is_some()
    }

    /// Drop every entry; returns how many were removed.
    pub fn invalidate_all(&self) -> usize {
        let mut entries = rw_write(&self.entries, SOURCE, "invalidate_all");
        let removed = entries.len();
        entries.clear();
        removed
    }

    pub fn len(&self) -> usize {
        rw_read(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lookup(&self, fingerprint: &Fingerprint) -> Option<CssDocument> {
        let mut entries = rw_write(&self.entries, SOURCE, "lookup");

        let (expired, css) = match entries.get(fingerprint) {
            Some(entry) => (self.is_expired(entry), entry.css.clone()),
            None => {
                counter!(METRIC_CACHE_MISS).increment(1);
                return None;
            }
        };

        if expired {
            entries.pop(fingerprint);
            counter!(METRIC_CACHE_EXPIRED).increment(1);
            counter!(METRIC_CACHE_MISS).increment(1);
            debug!(
                source = SOURCE,
                fingerprint = fingerprint.short(),
                "Dropped expired stylesheet"
            );
            return None;
        }

        counter!(METRIC_CACHE_HIT).increment(1);
        Some(css)
    }

    fn store(&self, fingerprint: Fingerprint, css: CssDocument) {
        let entry = CacheEntry {
            css,
            stored_at: Instant::now(),
        };
        let mut entries = rw_write(&self.entries, SOURCE, "store");
        if let Some((displaced, _)) = entries.push(fingerprint.clone(), entry)
            && displaced != fingerprint
        {
            counter!(METRIC_CACHE_EVICT).increment(1);
        }
    }

    fn is_expired(&self, entry: &CacheEntry) -> bool {
        self.config
            .ttl
            .is_some_and(|ttl| entry.stored_at.elapsed() >= ttl)
    }
}
