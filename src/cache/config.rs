//! Cache engine configuration.
//!
//! Derived from `[cache]` settings; dev mode switches the engine off.

use std::num::NonZeroUsize;

const DEFAULT_MEMORY_CAPACITY: usize = 512;

/// Runtime switches for [`super::TieredCache`].
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// When false every lookup runs the load function directly.
    pub enabled: bool,
    /// Maximum entries held by the memory tier before LRU eviction.
    pub memory_capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            memory_capacity: DEFAULT_MEMORY_CAPACITY,
        }
    }
}

impl From<&crate::config::Settings> for CacheConfig {
    fn from(settings: &crate::config::Settings) -> Self {
        Self {
            enabled: settings.cache_enabled(),
            memory_capacity: settings.cache.memory_capacity,
        }
    }
}

impl CacheConfig {
    /// Configuration used when caching is switched off (development).
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Returns the memory capacity as NonZeroUsize, clamping to 1 if zero.
    pub fn memory_capacity_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.memory_capacity).unwrap_or(NonZeroUsize::MIN)
    }
}
