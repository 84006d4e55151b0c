//! Configuration and builder for [`RequestCache`].

use std::sync::Arc;
use std::time::Duration;

use crate::cache::RequestCache;
use crate::cooldown::DEFAULT_COOLDOWN;
use crate::mirror::DEFAULT_MEMORY_CAPACITY;
use crate::store::Store;
use crate::stores::memory::HashMapStore;

/// Tunables of a [`RequestCache`].
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Minimum interval between dispatched fetches for one key.
    ///
    /// Default: 20 seconds.
    pub cooldown: Duration,

    /// Maximum number of entries kept in the in-memory mirror.
    ///
    /// Evicted entries are still read back from the durable store.
    pub memory_capacity: u64,

    /// Storage key prefix for cache entries. Default: `cache:`.
    pub cache_prefix: String,

    /// Storage key prefix for cooldown stamps. Default: `cooldown:`.
    ///
    /// Must not share a prefix with `cache_prefix`, or bulk clears of one will
    /// sweep the other.
    pub cooldown_prefix: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            cooldown: DEFAULT_COOLDOWN,
            memory_capacity: DEFAULT_MEMORY_CAPACITY,
            cache_prefix: "cache:".to_string(),
            cooldown_prefix: "cooldown:".to_string(),
        }
    }
}

/// Builder for [`RequestCache`].
///
/// # Example
///
/// ```ignore
/// use cooldown_cache::{RequestCache, RedisStore, RedisStoreConfig};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// let redis = Arc::new(RedisStore::new(RedisStoreConfig::default()).await?);
///
/// let cache = RequestCache::builder()
///     .store(redis)
///     .cooldown(Duration::from_secs(5))
///     .build();
/// ```
pub struct CacheBuilder {
    store: Option<Arc<dyn Store>>,
    config: CacheConfig,
}

impl CacheBuilder {
    /// Create a new CacheBuilder with default configuration.
    pub fn new() -> Self {
        CacheBuilder {
            store: None,
            config: CacheConfig::default(),
        }
    }

    /// Durable store for entries and cooldown stamps.
    ///
    /// Without one, a fresh [`HashMapStore`] is used.
    pub fn store(mut self, store: Arc<dyn Store>) -> Self {
        self.store = Some(store);
        self
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: CacheConfig) -> Self {
        self.config = config;
        self
    }

    /// Minimum interval between dispatched fetches for one key.
    ///
    /// Defaults to [`DEFAULT_COOLDOWN`](crate::DEFAULT_COOLDOWN).
    pub fn cooldown(mut self, cooldown: Duration) -> Self {
        self.config.cooldown = cooldown;
        self
    }

    /// Maximum number of entries kept in the memory mirror.
    pub fn memory_capacity(mut self, capacity: u64) -> Self {
        self.config.memory_capacity = capacity;
        self
    }

    /// Storage-key prefix for cache entries. Defaults to `cache:`.
    pub fn cache_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.cache_prefix = prefix.into();
        self
    }

    /// Storage-key prefix for cooldown stamps. Defaults to `cooldown:`.
    pub fn cooldown_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.cooldown_prefix = prefix.into();
        self
    }

    /// Build the cache.
    pub fn build(self) -> RequestCache {
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(HashMapStore::default()) as Arc<dyn Store>);
        RequestCache::with_config(store, self.config)
    }
}

impl Default for CacheBuilder {
    fn default() -> Self {
        Self::new()
    }
}
