use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::error::CacheError;
use crate::store::Store;

/// Configuration for HashMapStore.
#[derive(Debug, Clone, Default)]
pub struct HashMapStoreConfig {
    /// Upper bound on the summed byte length of all stored keys and values.
    ///
    /// A `set` that would exceed the quota fails, the way browser storage rejects
    /// writes once full. `None` means unbounded.
    pub quota_bytes: Option<usize>,
}

/// Thread-safe in-process store using HashMap with RwLock.
///
/// Data lives as long as the store instance. This is the default store of a
/// `RequestCache` and the stub used in tests.
pub struct HashMapStore {
    state: RwLock<HashMap<String, String>>,
    quota_bytes: Option<usize>,
}

impl HashMapStore {
    /// Create a new HashMapStore with the given configuration.
    pub fn new(config: HashMapStoreConfig) -> Self {
        HashMapStore {
            state: RwLock::new(HashMap::new()),
            quota_bytes: config.quota_bytes,
        }
    }

    /// Number of stored keys.
    pub async fn len(&self) -> usize {
        self.state.read().await.len()
    }

    /// Whether the store holds no keys.
    pub async fn is_empty(&self) -> bool {
        self.state.read().await.is_empty()
    }

    fn used_bytes(state: &HashMap<String, String>) -> usize {
        state.iter().map(|(k, v)| k.len() + v.len()).sum()
    }
}

impl Default for HashMapStore {
    fn default() -> Self {
        Self::new(HashMapStoreConfig::default())
    }
}

#[async_trait]
impl Store for HashMapStore {
    fn name(&self) -> &'static str {
        "hashmap"
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let state = self.state.read().await;
        Ok(state.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<(), CacheError> {
        let mut state = self.state.write().await;

        if let Some(quota) = self.quota_bytes {
            let replaced = state.get(key).map(|v| key.len() + v.len()).unwrap_or(0);
            let used = Self::used_bytes(&state) - replaced;
            if used + key.len() + value.len() > quota {
                return Err(CacheError::operation(
                    "hashmap",
                    key,
                    format!("quota of {} bytes exceeded", quota),
                ));
            }
        }

        state.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, keys: &[&str]) -> Result<(), CacheError> {
        let mut state = self.state.write().await;

        for key in keys {
            state.remove(*key);
        }

        Ok(())
    }

    async fn keys(&self, prefix: &str) -> Result<Vec<String>, CacheError> {
        let state = self.state.read().await;
        Ok(state
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }
}
