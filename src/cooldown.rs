//! Per-key fetch throttle.
//!
//! A stamp records when a fetch for a key last resolved and stored its value.
//! While the stamp is younger than the cooldown, the cache prefers serving what
//! it already has over dispatching another fetch. Freshness (TTL) plays no part.

use std::sync::Arc;
use std::time::Duration;

use crate::durable::DurableStore;
use crate::store::Store;
use crate::utils::{duration_ms, now_ms};

/// Default minimum interval between dispatched fetches for one key.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(20);

pub(crate) struct CooldownTracker {
    records: DurableStore,
    cooldown_ms: i64,
}

impl CooldownTracker {
    pub(crate) fn new(store: Arc<dyn Store>, prefix: impl Into<String>, cooldown: Duration) -> Self {
        CooldownTracker {
            records: DurableStore::new(store, prefix),
            cooldown_ms: duration_ms(cooldown),
        }
    }

    /// Record "now" as the last dispatch time for `key`.
    pub(crate) async fn stamp(&self, key: &str) {
        self.records.write_value(key, &now_ms()).await;
    }

    /// Last recorded dispatch time, if a readable stamp exists.
    pub(crate) async fn last_stamp(&self, key: &str) -> Option<i64> {
        self.records.read_value::<i64>(key).await
    }

    pub(crate) async fn is_active(&self, key: &str) -> bool {
        match self.last_stamp(key).await {
            Some(stamped_at) => now_ms().saturating_sub(stamped_at) < self.cooldown_ms,
            None => false,
        }
    }

    pub(crate) async fn clear(&self, key: &str) {
        self.records.remove(key).await;
    }

    pub(crate) async fn clear_all(&self) -> usize {
        self.records.remove_all().await
    }
}
