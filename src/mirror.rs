use moka::sync::Cache;

use crate::entry::{Entry, MirrorEntry};

/// Default maximum number of entries held by the memory mirror.
pub const DEFAULT_MEMORY_CAPACITY: u64 = 10_000;

/// Process-lifetime copy of cache entries.
///
/// Saves the durable store's deserialization on repeat hits. Values are kept
/// typed and type-erased; a lookup with the wrong type is a miss. Expired
/// entries stay until cleared, replaced, or evicted for capacity.
pub(crate) struct MemoryMirror {
    entries: Cache<String, MirrorEntry>,
}

impl MemoryMirror {
    pub(crate) fn new(max_capacity: u64) -> Self {
        MemoryMirror {
            entries: Cache::builder().max_capacity(max_capacity).build(),
        }
    }

    /// Return the entry for `key`, regardless of expiration.
    pub(crate) fn get<V>(&self, key: &str) -> Option<Entry<V>>
    where
        V: Clone + Send + Sync + 'static,
    {
        let mirrored = self.entries.get(key)?;
        let entry = mirrored.into_typed::<V>();
        if entry.is_none() {
            tracing::debug!("Memory mirror type mismatch, treating as miss: key={}", key);
        }
        entry
    }

    pub(crate) fn insert<V>(&self, key: &str, value: V, expiration: i64)
    where
        V: Send + Sync + 'static,
    {
        self.entries
            .insert(key.to_string(), MirrorEntry::from_typed(value, expiration));
    }

    /// Insert an entry stored by a flight, tagged with its settle sequence.
    pub(crate) fn insert_settled<V>(&self, key: &str, value: V, expiration: i64, seq: u64)
    where
        V: Send + Sync + 'static,
    {
        self.entries.insert(
            key.to_string(),
            MirrorEntry::from_typed(value, expiration).with_settle(seq),
        );
    }

    /// The entry for `key` if a flight stored it at or after settle sequence `since`.
    pub(crate) fn settled_since<V>(&self, key: &str, since: u64) -> Option<Entry<V>>
    where
        V: Clone + Send + Sync + 'static,
    {
        let mirrored = self.entries.get(key)?;
        if !mirrored.settled_since(since) {
            return None;
        }
        mirrored.into_typed::<V>()
    }

    pub(crate) fn remove(&self, key: &str) {
        self.entries.invalidate(key);
    }

    pub(crate) fn clear(&self) {
        self.entries.invalidate_all();
    }
}
