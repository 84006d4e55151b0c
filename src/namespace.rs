use serde::{Serialize, de::DeserializeOwned};
use std::future::Future;
use std::marker::PhantomData;
use std::time::Duration;

use crate::cache::RequestCache;
use crate::utils::build_cache_key;

/// Typed view of a [`RequestCache`] under one key namespace.
///
/// Binds a value type, a key namespace and a default TTL, so call sites only
/// deal in ids. Key `"42"` in namespace `"media"` is cache key `"media:42"`.
/// Namespaces are views, not partitions: two handles with the same name share
/// entries, cooldowns and in-flight fetches.
pub struct Namespace<V> {
    namespace: String,
    ttl: Duration,
    cache: RequestCache,
    _marker: PhantomData<fn() -> V>,
}

impl<V> Clone for Namespace<V> {
    fn clone(&self) -> Self {
        Namespace {
            namespace: self.namespace.clone(),
            ttl: self.ttl,
            cache: self.cache.clone(),
            _marker: PhantomData,
        }
    }
}

impl<V> Namespace<V>
where
    V: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    /// Create a new Namespace over `cache`.
    ///
    /// # Arguments
    /// * `cache` - The cache holding the entries
    /// * `namespace` - Prefix joined to every id with `:`
    /// * `ttl` - Freshness used by `set` and `get_or_set`
    ///
    /// # Example
    /// ```ignore
    /// let media: Namespace<Vec<MediaFile>> =
    ///     Namespace::new(cache.clone(), "media", Duration::from_secs(300));
    /// ```
    pub fn new(cache: RequestCache, namespace: &str, ttl: Duration) -> Self {
        Namespace {
            namespace: namespace.to_string(),
            ttl,
            cache,
            _marker: PhantomData,
        }
    }

    /// The full cache key for `id`.
    pub fn key(&self, id: &str) -> String {
        build_cache_key(&self.namespace, id)
    }

    /// Return the cached value if it is still fresh.
    pub async fn get(&self, id: &str) -> Option<V> {
        self.cache.get(&self.key(id)).await
    }

    /// Return the cached value regardless of expiration.
    pub async fn get_stale(&self, id: &str) -> Option<V> {
        self.cache.get_stale(&self.key(id)).await
    }

    /// Set the value with the namespace's TTL.
    pub async fn set(&self, id: &str, value: V) {
        self.cache.set(&self.key(id), value, self.ttl).await
    }

    /// Set the value with a custom TTL.
    pub async fn set_with_ttl(&self, id: &str, value: V, ttl: Duration) {
        self.cache.set(&self.key(id), value, ttl).await
    }

    /// Remove everything the cache holds for `id`.
    pub async fn clear(&self, id: &str) {
        self.cache.clear(&self.key(id)).await
    }

    /// Get the cached value or load it.
    ///
    /// `fetch` receives the id, not the full cache key.
    ///
    /// # Example
    /// ```ignore
    /// let files = media.get_or_set("42", |id| async move {
    ///     api.list_files(&id).await
    /// }).await?;
    /// ```
    pub async fn get_or_set<E, F, Fut>(&self, id: &str, fetch: F) -> Result<V, E>
    where
        E: Clone + Send + Sync + 'static,
        F: FnOnce(String) -> Fut + Send + 'static,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        let owned_id = id.to_string();
        self.cache
            .get_or_set(&self.key(id), self.ttl, move || fetch(owned_id))
            .await
    }

    /// Reload the value even if a fresh one is cached.
    ///
    /// In-flight fetches are still joined and cooldowns still apply.
    pub async fn refresh<E, F, Fut>(&self, id: &str, fetch: F) -> Result<V, E>
    where
        E: Clone + Send + Sync + 'static,
        F: FnOnce(String) -> Fut + Send + 'static,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        let owned_id = id.to_string();
        self.cache
            .refresh(&self.key(id), self.ttl, move || fetch(owned_id))
            .await
    }
}
