//! Durable half of the cache: JSON records under a key prefix.
//!
//! Entries live under `cache:`, cooldown stamps under `cooldown:`; each prefix
//! gets its own `DurableStore` over the shared [`Store`]. Every storage failure
//! stops here. Reads that fail or hit corrupt data are
//! misses, writes and removes that fail are dropped, both with a log line.

use serde::{Serialize, de::DeserializeOwned};
use std::sync::Arc;

use crate::entry::Entry;
use crate::store::Store;
use crate::utils::prefixed_key;

pub(crate) struct DurableStore {
    store: Arc<dyn Store>,
    prefix: String,
}

impl DurableStore {
    pub(crate) fn new(store: Arc<dyn Store>, prefix: impl Into<String>) -> Self {
        DurableStore {
            store,
            prefix: prefix.into(),
        }
    }

    /// Read and deserialize the entry for `key`, regardless of expiration.
    pub(crate) async fn read<V>(&self, key: &str) -> Option<Entry<V>>
    where
        V: DeserializeOwned,
    {
        self.read_value(key).await
    }

    pub(crate) async fn write<V>(&self, key: &str, entry: &Entry<V>)
    where
        V: Serialize,
    {
        self.write_value(key, entry).await
    }

    /// Read any JSON record stored under `key`.
    pub(crate) async fn read_value<T>(&self, key: &str) -> Option<T>
    where
        T: DeserializeOwned,
    {
        let storage_key = prefixed_key(&self.prefix, key);

        let data = match self.store.get(&storage_key).await {
            Ok(data) => data?,
            Err(e) => {
                tracing::warn!(
                    "Durable read failed, treating as miss: tier={}, key={}, error={}",
                    self.store.name(),
                    storage_key,
                    e
                );
                return None;
            }
        };

        match serde_json::from_str::<T>(&data) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::debug!(
                    "Discarding unreadable durable record: key={}, error={}",
                    storage_key,
                    e
                );
                None
            }
        }
    }

    pub(crate) async fn write_value<T>(&self, key: &str, value: &T)
    where
        T: Serialize + ?Sized,
    {
        let storage_key = prefixed_key(&self.prefix, key);

        let data = match serde_json::to_string(value) {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!("Skipping durable write: key={}, error={}", storage_key, e);
                return;
            }
        };

        if let Err(e) = self.store.set(&storage_key, data).await {
            tracing::warn!(
                "Durable write failed: tier={}, key={}, error={}",
                self.store.name(),
                storage_key,
                e
            );
        }
    }

    pub(crate) async fn remove(&self, key: &str) {
        let storage_key = prefixed_key(&self.prefix, key);
        if let Err(e) = self.store.remove(&[storage_key.as_str()]).await {
            tracing::warn!(
                "Durable remove failed: tier={}, key={}, error={}",
                self.store.name(),
                storage_key,
                e
            );
        }
    }

    /// Remove every entry under this store's prefix. Returns the number of keys removed.
    pub(crate) async fn remove_all(&self) -> usize {
        let keys = match self.store.keys(&self.prefix).await {
            Ok(keys) => keys,
            Err(e) => {
                tracing::warn!(
                    "Durable key listing failed: tier={}, prefix={}, error={}",
                    self.store.name(),
                    self.prefix,
                    e
                );
                return 0;
            }
        };

        if keys.is_empty() {
            return 0;
        }

        let key_refs: Vec<&str> = keys.iter().map(String::as_str).collect();
        match self.store.remove(&key_refs).await {
            Ok(()) => keys.len(),
            Err(e) => {
                tracing::warn!(
                    "Durable bulk remove failed: tier={}, prefix={}, error={}",
                    self.store.name(),
                    self.prefix,
                    e
                );
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CacheError;
    use crate::stores::memory::{HashMapStore, HashMapStoreConfig};
    use async_trait::async_trait;

    /// Store whose every operation fails.
    struct BrokenStore;

    #[async_trait]
    impl Store for BrokenStore {
        fn name(&self) -> &'static str {
            "broken"
        }

        async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
            Err(CacheError::operation("broken", key, "unavailable"))
        }

        async fn set(&self, key: &str, _value: String) -> Result<(), CacheError> {
            Err(CacheError::operation("broken", key, "unavailable"))
        }

        async fn remove(&self, _keys: &[&str]) -> Result<(), CacheError> {
            Err(CacheError::operation("broken", "", "unavailable"))
        }

        async fn keys(&self, prefix: &str) -> Result<Vec<String>, CacheError> {
            Err(CacheError::operation("broken", prefix, "unavailable"))
        }
    }

    #[tokio::test]
    async fn test_write_read_remove() {
        let inner = Arc::new(HashMapStore::default());
        let durable = DurableStore::new(inner.clone(), "cache:");

        durable
            .write("media:42", &Entry::new(vec!["intro.mp4".to_string()], 1_000))
            .await;

        // Stored under the prefix as JSON
        let raw = inner.get("cache:media:42").await.unwrap().unwrap();
        assert_eq!(raw, r#"{"value":["intro.mp4"],"expiration":1000}"#);

        let entry: Entry<Vec<String>> = durable.read("media:42").await.unwrap();
        assert_eq!(entry.value, vec!["intro.mp4".to_string()]);
        assert_eq!(entry.expiration, 1_000);

        durable.remove("media:42").await;
        assert!(durable.read::<Vec<String>>("media:42").await.is_none());
    }

    #[tokio::test]
    async fn test_corrupt_data_is_a_miss() {
        let inner = Arc::new(HashMapStore::default());
        inner
            .set("cache:commands", "{not json".to_string())
            .await
            .unwrap();

        let durable = DurableStore::new(inner, "cache:");
        assert!(durable.read::<String>("commands").await.is_none());
    }

    #[tokio::test]
    async fn test_wrong_shape_is_a_miss() {
        let inner = Arc::new(HashMapStore::default());
        let durable = DurableStore::new(inner, "cache:");

        durable.write("count", &Entry::new("seven".to_string(), 1)).await;
        assert!(durable.read::<u32>("count").await.is_none());
    }

    #[tokio::test]
    async fn test_storage_errors_are_swallowed() {
        let durable = DurableStore::new(Arc::new(BrokenStore), "cache:");

        durable.write("k", &Entry::new(1u8, 1)).await;
        assert!(durable.read::<u8>("k").await.is_none());
        durable.remove("k").await;
        assert_eq!(durable.remove_all().await, 0);
    }

    #[tokio::test]
    async fn test_quota_exceeded_write_is_dropped() {
        let inner = Arc::new(HashMapStore::new(HashMapStoreConfig {
            quota_bytes: Some(8),
        }));
        let durable = DurableStore::new(inner.clone(), "cache:");

        durable.write("big", &Entry::new("x".repeat(64), 1)).await;
        assert!(inner.is_empty().await);
    }

    #[tokio::test]
    async fn test_remove_all_keeps_foreign_keys() {
        let inner = Arc::new(HashMapStore::default());
        inner.set("theme", "dark".to_string()).await.unwrap();
        inner.set("cooldown:a", "1".to_string()).await.unwrap();

        let durable = DurableStore::new(inner.clone(), "cache:");
        durable.write("a", &Entry::new(1u8, 1)).await;
        durable.write("b", &Entry::new(2u8, 1)).await;

        assert_eq!(durable.remove_all().await, 2);
        assert_eq!(inner.get("theme").await.unwrap().as_deref(), Some("dark"));
        assert!(inner.get("cooldown:a").await.unwrap().is_some());
        assert!(inner.get("cache:a").await.unwrap().is_none());
    }
}
