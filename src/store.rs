use async_trait::async_trait;

use crate::error::CacheError;

/// A store is a common interface for storing, reading and deleting string values.
///
/// This is the persistence surface the cache writes its serialized entries and
/// cooldown stamps to. Any key-value medium with this shape works: a process-local
/// map, Redis, or a test stub.
///
/// Stores never expire data on their own. An expired entry must stay readable so
/// it can be served as a stale fallback.
#[async_trait]
pub trait Store: Send + Sync {
    /// A name for metrics/tracing.
    ///
    /// # Example
    /// - "hashmap"
    /// - "redis"
    fn name(&self) -> &'static str;

    /// Return the stored value.
    ///
    /// The response must be `None` for missing keys.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Sets the value for the given key, replacing any previous value.
    async fn set(&self, key: &str, value: String) -> Result<(), CacheError>;

    /// Removes the key(s) from the store. Missing keys are not an error.
    async fn remove(&self, keys: &[&str]) -> Result<(), CacheError>;

    /// List every stored key starting with `prefix`, including the prefix.
    async fn keys(&self, prefix: &str) -> Result<Vec<String>, CacheError>;
}
