//! Cache configuration.

use std::num::NonZeroUsize;
use std::time::Duration;

const DEFAULT_MAX_ENTRIES: usize = 64;
const DEFAULT_TTL_SECONDS: u64 = 3600;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    pub enabled: bool,
    /// `None` keeps entries until they are evicted or invalidated.
    pub ttl: Option<Duration>,
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl: Some(Duration::from_secs(DEFAULT_TTL_SECONDS)),
            max_entries: DEFAULT_MAX_ENTRIES,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            enabled: settings.enabled,
            ttl: (settings.ttl_seconds > 0).then(|| Duration::from_secs(settings.ttl_seconds)),
            max_entries: settings.max_entries,
        }
    }
}

impl CacheConfig {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Returns the entry limit as NonZeroUsize, clamping to 1 if zero.
    pub fn max_entries_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.max_entries).unwrap_or(NonZeroUsize::MIN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let config = CacheConfig::default();
        assert!(config.enabled);
        assert_eq!(config.ttl, Some(Duration::from_secs(3600)));
        assert_eq!(config.max_entries, 64);
    }

    #[test]
    fn zero_ttl_means_no_expiry() {
        let settings = crate::config::CacheSettings {
            enabled: true,
            ttl_seconds: 0,
            max_entries: 8,
        };
        let config = CacheConfig::from(&settings);
        assert_eq!(config.ttl, None);
        assert_eq!(config.max_entries, 8);
    }

    #[test]
    fn non_zero_clamps_to_min() {
        let config = CacheConfig {
            max_entries: 0,
            ..Default::default()
        };
        assert_eq!(config.max_entries_non_zero().get(), 1);
    }
}
