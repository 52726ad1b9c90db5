//! Generated stylesheet cache.
//!
//! Stylesheets are keyed by the fingerprint of the snapshot they were
//! rendered from, so a stale entry can only be served for a snapshot whose
//! content is identical. Writes to the stored settings still flush the cache
//! through [`CacheTrigger`] so memory does not fill with dead entries.
//!
//! ```toml
//! [cache]
//! enabled = true
//! ttl_seconds = 3600
//! max_entries = 64
//! ```

mod config;
mod lock;
mod store;
mod trigger;

pub use config::CacheConfig;
pub use store::{GenerationCache, RenderedStylesheet};
pub use trigger::{CacheTrigger, EventKind};

pub(crate) use lock::{rw_read, rw_write};

pub const METRIC_CACHE_HIT: &str = "styler_css_cache_hit_total";
pub const METRIC_CACHE_MISS: &str = "styler_css_cache_miss_total";
pub const METRIC_CACHE_EVICT: &str = "styler_css_cache_evict_total";
pub const METRIC_CACHE_EXPIRED: &str = "styler_css_cache_expired_total";
pub const METRIC_CACHE_INVALIDATE: &str = "styler_css_cache_invalidate_total";
pub const METRIC_GENERATE_MS: &str = "styler_css_generate_ms";
