use serde::{Deserialize, Serialize};
use std::any::Any;
use std::sync::Arc;

/// A cache entry containing a value and its expiration time.
///
/// This is the record persisted by the durable store, serialized as
/// `{"value": ..., "expiration": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry<V> {
    /// The cached value.
    pub value: V,

    /// Unix timestamp in milliseconds.
    /// Before this time the entry is fresh. After it the entry is stale, but it
    /// stays available as a fallback until it is cleared or overwritten.
    pub expiration: i64,
}

impl<V> Entry<V> {
    /// Create a new cache entry.
    pub fn new(value: V, expiration: i64) -> Self {
        Entry { value, expiration }
    }

    /// Check if the entry is still fresh.
    pub fn is_fresh(&self, now_ms: i64) -> bool {
        now_ms < self.expiration
    }

    /// Check if the entry has passed its expiration.
    pub fn is_expired(&self, now_ms: i64) -> bool {
        now_ms >= self.expiration
    }
}

/// Type-erased entry held by the memory mirror.
///
/// The value is kept as `Arc<dyn Any>` so repeat hits within the process are a
/// reference-count bump and a downcast, with no JSON round-trip.
#[derive(Clone)]
pub(crate) struct MirrorEntry {
    value: Arc<dyn Any + Send + Sync>,
    expiration: i64,
    /// Settle sequence of the flight that stored this entry, if any.
    settled: Option<u64>,
}

impl MirrorEntry {
    pub(crate) fn from_typed<V>(value: V, expiration: i64) -> Self
    where
        V: Send + Sync + 'static,
    {
        MirrorEntry {
            value: Arc::new(value),
            expiration,
            settled: None,
        }
    }

    pub(crate) fn with_settle(mut self, seq: u64) -> Self {
        self.settled = Some(seq);
        self
    }

    /// Whether a flight stored this entry at or after settle sequence `since`.
    pub(crate) fn settled_since(&self, since: u64) -> bool {
        self.settled.is_some_and(|seq| seq >= since)
    }

    /// Convert back to a typed `Entry<V>`.
    ///
    /// Returns `None` when the mirrored value was stored under a different type.
    pub(crate) fn into_typed<V>(self) -> Option<Entry<V>>
    where
        V: Clone + Send + Sync + 'static,
    {
        let typed = self.value.downcast::<V>().ok()?;
        Some(Entry {
            value: (*typed).clone(),
            expiration: self.expiration,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_freshness_boundary() {
        let entry = Entry::new("files".to_string(), 1_000);
        assert!(entry.is_fresh(999));
        assert!(!entry.is_expired(999));
        assert!(!entry.is_fresh(1_000));
        assert!(entry.is_expired(1_000));
    }

    #[test]
    fn test_serialized_shape() {
        let entry = Entry::new(vec![1, 2, 3], 42);
        let json = serde_json::to_string(&entry).unwrap();
        assert_eq!(json, r#"{"value":[1,2,3],"expiration":42}"#);
    }

    #[test]
    fn test_mirror_entry_downcast() {
        let mirrored = MirrorEntry::from_typed("clip".to_string(), 10);

        let typed: Entry<String> = mirrored.clone().into_typed().unwrap();
        assert_eq!(typed.value, "clip");
        assert_eq!(typed.expiration, 10);

        // Wrong type is a miss, not a panic
        assert!(mirrored.into_typed::<u64>().is_none());
    }

    #[test]
    fn test_mirror_entry_settle_sequence() {
        let plain = MirrorEntry::from_typed(1u8, 10);
        assert!(!plain.settled_since(0));

        let settled = MirrorEntry::from_typed(1u8, 10).with_settle(5);
        assert!(settled.settled_since(4));
        assert!(settled.settled_since(5));
        assert!(!settled.settled_since(6));
    }
}
