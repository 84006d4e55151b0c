use futures::FutureExt;
use serde::{Serialize, de::DeserializeOwned};
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use crate::builder::{CacheBuilder, CacheConfig};
use crate::cooldown::CooldownTracker;
use crate::durable::DurableStore;
use crate::entry::Entry;
use crate::inflight::{FlightGuard, InFlight, SharedFetch};
use crate::mirror::MemoryMirror;
use crate::namespace::Namespace;
use crate::store::Store;
use crate::utils::{duration_ms, now_ms};

/// How a `get_or_set` call was answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupStatus {
    /// A cached value within its TTL.
    Fresh,
    /// An expired value, served because the key is cooling down.
    Stale,
    /// This call dispatched the fetch.
    Fetched,
    /// This call shared a fetch another caller had already dispatched.
    Joined,
}

enum Plan<V, E> {
    Join(SharedFetch<V, E>),
    Serve(V, LookupStatus),
    Dispatch(SharedFetch<V, E>),
}

struct Inner {
    mirror: MemoryMirror,
    durable: DurableStore,
    cooldowns: CooldownTracker,
    in_flight: Arc<InFlight>,
}

/// Read-through cache with in-flight deduplication and cooldown-based stale serving.
///
/// Entries are written to a durable [`Store`] as JSON under the `cache:` prefix and
/// mirrored in memory as typed values. `RequestCache` is cheap to clone; clones
/// share all state.
///
/// The cache never surfaces storage errors. A failing store behaves like an empty
/// one. Only the error of a caller's fetch is ever returned.
#[derive(Clone)]
pub struct RequestCache {
    inner: Arc<Inner>,
}

impl RequestCache {
    /// Create a cache over `store` with default configuration.
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self::with_config(store, CacheConfig::default())
    }

    /// Start building a cache.
    pub fn builder() -> CacheBuilder {
        CacheBuilder::new()
    }

    pub(crate) fn with_config(store: Arc<dyn Store>, config: CacheConfig) -> Self {
        RequestCache {
            inner: Arc::new(Inner {
                mirror: MemoryMirror::new(config.memory_capacity),
                durable: DurableStore::new(store.clone(), config.cache_prefix),
                cooldowns: CooldownTracker::new(store, config.cooldown_prefix, config.cooldown),
                in_flight: Arc::new(InFlight::default()),
            }),
        }
    }

    /// A typed handle whose keys are prefixed with `namespace` and which
    /// stores values for `ttl` unless told otherwise.
    pub fn namespace<V>(&self, namespace: &str, ttl: Duration) -> Namespace<V>
    where
        V: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
    {
        Namespace::new(self.clone(), namespace, ttl)
    }

    /// Return the cached value if it is still fresh.
    ///
    /// Returns `None` for misses and for expired entries.
    pub async fn get<V>(&self, key: &str) -> Option<V>
    where
        V: Clone + DeserializeOwned + Send + Sync + 'static,
    {
        self.fresh_entry(key).await.map(|entry| entry.value)
    }

    /// Return the cached value regardless of expiration.
    pub async fn get_stale<V>(&self, key: &str) -> Option<V>
    where
        V: Clone + DeserializeOwned + Send + Sync + 'static,
    {
        self.any_entry(key).await.map(|entry| entry.value)
    }

    /// Store `value` under `key`, fresh for `ttl`.
    ///
    /// Does not touch the key's cooldown.
    pub async fn set<V>(&self, key: &str, value: V, ttl: Duration)
    where
        V: Serialize + Send + Sync + 'static,
    {
        let entry = Entry::new(value, expires_at(ttl));
        self.store_entry(key, entry).await;
    }

    /// Fully reset `key`: memory, pending fetch, durable entry and cooldown.
    ///
    /// A fetch already running for the key still resolves for its callers, but its
    /// result is not stored.
    pub async fn clear(&self, key: &str) {
        // Forget the flight first: a flight only mirrors its value while it
        // still owns the slot.
        self.inner.in_flight.forget(key);
        self.inner.mirror.remove(key);
        self.inner.durable.remove(key).await;
        self.inner.cooldowns.clear(key).await;
    }

    /// Reset every key this cache owns.
    ///
    /// Only keys under the cache's own prefixes are removed from the store.
    pub async fn clear_all(&self) {
        self.inner.in_flight.forget_all();
        self.inner.mirror.clear();
        let entries = self.inner.durable.remove_all().await;
        let cooldowns = self.inner.cooldowns.clear_all().await;
        tracing::debug!(
            "Cleared cache: entries={}, cooldowns={}",
            entries,
            cooldowns
        );
    }

    /// Number of fetches currently registered as in flight.
    pub fn pending_fetches(&self) -> usize {
        self.inner.in_flight.len()
    }

    /// Get the cached value or load it with `fetch`.
    ///
    /// - A fresh value is returned without fetching
    /// - A fetch already in flight for `key` is joined, never duplicated
    /// - Within the cooldown of the last successful fetch, an expired value is
    ///   served instead of fetching again
    /// - Otherwise `fetch` runs; its value is stored for `ttl` and its error is
    ///   returned unchanged to every caller sharing it
    ///
    /// # Example
    /// ```ignore
    /// let files = cache
    ///     .get_or_set("media:42", Duration::from_secs(300), || api.list_files(42))
    ///     .await?;
    /// ```
    pub async fn get_or_set<V, E, F, Fut>(&self, key: &str, ttl: Duration, fetch: F) -> Result<V, E>
    where
        V: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
        E: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        self.get_or_set_with_status(key, ttl, fetch, false)
            .await
            .map(|(value, _)| value)
    }

    /// Like [`get_or_set`](Self::get_or_set), but skips the fresh-value check.
    ///
    /// A refresh still joins a fetch already in flight, and still serves the
    /// cached value while the key is cooling down.
    pub async fn refresh<V, E, F, Fut>(&self, key: &str, ttl: Duration, fetch: F) -> Result<V, E>
    where
        V: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
        E: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        self.get_or_set_with_status(key, ttl, fetch, true)
            .await
            .map(|(value, _)| value)
    }

    /// Read-through lookup that also reports how the value was obtained.
    pub async fn get_or_set_with_status<V, E, F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        fetch: F,
        force_refresh: bool,
    ) -> Result<(V, LookupStatus), E>
    where
        V: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
        E: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        let since = self.inner.in_flight.settled();

        if !force_refresh && let Some(entry) = self.fresh_entry::<V>(key).await {
            return Ok((entry.value, LookupStatus::Fresh));
        }

        // Storage reads happen before the register lock; the decision itself
        // must not await so no other caller can slip between check and insert.
        let stale = if self.inner.cooldowns.is_active(key).await {
            self.any_entry::<V>(key).await
        } else {
            None
        };

        // A flight may have settled while the reads above were pending. Its
        // value is in the mirror before its slot is released, so the mirror is
        // checked again under the lock.
        let plan = {
            let mut flights = self.inner.in_flight.lock();
            if let Some(shared) = flights.join::<V, E>(key) {
                Plan::Join(shared)
            } else if let Some(entry) = self.inner.mirror.settled_since::<V>(key, since) {
                Plan::Serve(entry.value, LookupStatus::Joined)
            } else if !force_refresh
                && let Some(entry) = self.inner.mirror.get::<V>(key)
                && entry.is_fresh(now_ms())
            {
                Plan::Serve(entry.value, LookupStatus::Fresh)
            } else if let Some(entry) = stale {
                Plan::Serve(entry.value, LookupStatus::Stale)
            } else {
                let id = flights.next_id();
                let shared = self.flight(key, ttl, id, fetch).boxed().shared();
                flights.register(key, id, shared.clone());
                Plan::Dispatch(shared)
            }
        };

        match plan {
            Plan::Join(shared) => {
                tracing::debug!("Joining in-flight fetch: key={}", key);
                shared.await.map(|value| (value, LookupStatus::Joined))
            }
            Plan::Serve(value, status) => {
                match status {
                    LookupStatus::Stale => {
                        tracing::debug!("Serving stale value during cooldown: key={}", key)
                    }
                    _ => tracing::debug!("Value stored during lookup, reusing it: key={}", key),
                }
                Ok((value, status))
            }
            Plan::Dispatch(shared) => {
                // Drive the fetch to completion even if every caller goes away.
                tokio::spawn(shared.clone());
                shared.await.map(|value| (value, LookupStatus::Fetched))
            }
        }
    }

    /// The body of one flight: fetch, then store and stamp on success.
    fn flight<V, E, F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        id: u64,
        fetch: F,
    ) -> impl Future<Output = Result<V, E>> + Send + use<V, E, F, Fut>
    where
        V: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
        E: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        let cache = Arc::downgrade(&self.inner);
        let guard = FlightGuard::new(Arc::downgrade(&self.inner.in_flight), key.to_string(), id);
        let key = key.to_string();

        async move {
            tracing::debug!("Dispatching fetch: key={}", key);

            // A poisoned `Shared` keeps its future alive while the registry holds a
            // clone, so the slot has to be released here before unwinding further.
            let outcome = AssertUnwindSafe(async move { fetch().await })
                .catch_unwind()
                .await;
            let result = match outcome {
                Ok(result) => result,
                Err(payload) => {
                    tracing::warn!("Fetch panicked: key={}", key);
                    drop(guard);
                    panic::resume_unwind(payload);
                }
            };

            // Failures are neither cached nor stamped.
            let value = result?;

            let Some(inner) = cache.upgrade() else {
                return Ok(value);
            };
            if !inner.in_flight.is_current(&key, id) {
                tracing::debug!("Fetch outlived a clear, not storing: key={}", key);
                return Ok(value);
            }

            // A clear can land during any of the awaits below. Ownership of the
            // slot is checked after each one and anything already written is
            // taken back once it is lost.
            let entry = Entry::new(value.clone(), expires_at(ttl));
            inner.durable.write(&key, &entry).await;

            if !inner.mirror_if_current(&key, id, entry) {
                tracing::debug!("Cleared during write, discarding: key={}", key);
                inner.durable.remove(&key).await;
                return Ok(value);
            }

            inner.cooldowns.stamp(&key).await;

            if !inner.in_flight.is_current(&key, id) {
                tracing::debug!("Cleared during cooldown stamp, discarding: key={}", key);
                inner.cooldowns.clear(&key).await;
                inner.durable.remove(&key).await;
            }

            Ok(value)
        }
    }

    async fn store_entry<V>(&self, key: &str, entry: Entry<V>)
    where
        V: Serialize + Send + Sync + 'static,
    {
        self.inner.durable.write(key, &entry).await;
        self.inner.mirror.insert(key, entry.value, entry.expiration);
    }

    /// Fresh entry from memory, else from the durable store (promoted into memory).
    async fn fresh_entry<V>(&self, key: &str) -> Option<Entry<V>>
    where
        V: Clone + DeserializeOwned + Send + Sync + 'static,
    {
        if let Some(entry) = self.inner.mirror.get::<V>(key)
            && entry.is_fresh(now_ms())
        {
            return Some(entry);
        }

        let entry = self.inner.durable.read::<V>(key).await?;
        if !entry.is_fresh(now_ms()) {
            return None;
        }

        self.inner
            .mirror
            .insert(key, entry.value.clone(), entry.expiration);
        Some(entry)
    }

    /// Any entry, fresh or not, from memory or the durable store.
    async fn any_entry<V>(&self, key: &str) -> Option<Entry<V>>
    where
        V: Clone + DeserializeOwned + Send + Sync + 'static,
    {
        if let Some(entry) = self.inner.mirror.get::<V>(key) {
            return Some(entry);
        }

        let entry = self.inner.durable.read::<V>(key).await?;
        self.inner
            .mirror
            .insert(key, entry.value.clone(), entry.expiration);
        Some(entry)
    }
}

impl Inner {
    /// Mirror a flight's entry, unless the flight no longer owns its slot.
    ///
    /// The ownership check, the settle sequence and the insert happen under one
    /// lock, so a concurrent `clear` either sees the entry or prevents it.
    fn mirror_if_current<V>(&self, key: &str, id: u64, entry: Entry<V>) -> bool
    where
        V: Send + Sync + 'static,
    {
        let flights = self.in_flight.lock();
        if !flights.owns(key, id) {
            return false;
        }
        let seq = flights.settle();
        self.mirror
            .insert_settled(key, entry.value, entry.expiration, seq);
        true
    }
}

fn expires_at(ttl: Duration) -> i64 {
    now_ms().saturating_add(duration_ms(ttl))
}
