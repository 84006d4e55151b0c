//! Metrics middleware for cache stores.
//!
//! This module provides a `MetricsStore` wrapper that emits metrics for all
//! storage operations (reads, writes, removes) to a user-provided sink.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use cooldown_cache::{HashMapStore, RequestCache, Store};
//! use cooldown_cache::{CacheMetric, MetricsSink, MetricsStore};
//!
//! // Create metrics sink
//! let sink = Arc::new(MyMetricsSink::new());
//!
//! // Wrap store with metrics
//! let inner = Arc::new(HashMapStore::default());
//! let store: Arc<dyn Store> = Arc::new(MetricsStore::new(inner, sink.clone()));
//!
//! // Use in the cache - metrics emitted automatically
//! let cache = RequestCache::builder().store(store).build();
//! ```

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;

use crate::error::CacheError;
use crate::store::Store;

/// Metrics emitted by the MetricsStore wrapper.
#[derive(Debug, Clone)]
pub enum CacheMetric {
    /// Emitted on every read (get) operation.
    Read {
        /// The storage key that was read.
        key: String,
        /// Whether the key was found.
        hit: bool,
        /// Whether the underlying store returned an error.
        failed: bool,
        /// Latency of the operation in milliseconds.
        latency_ms: f64,
        /// Name of the wrapped store (from Store::name()).
        tier: String,
    },
    /// Emitted on every write (set) operation.
    Write {
        /// The storage key that was written.
        key: String,
        /// Size of the written value in bytes.
        bytes: usize,
        /// Whether the underlying store returned an error.
        failed: bool,
        /// Latency of the operation in milliseconds.
        latency_ms: f64,
        /// Name of the wrapped store (from Store::name()).
        tier: String,
    },
    /// Emitted on every remove operation.
    Remove {
        /// Number of keys in the remove batch.
        key_count: usize,
        /// First key in the batch (for debugging/identification).
        first_key: Option<String>,
        /// Latency of the operation in milliseconds.
        latency_ms: f64,
        /// Name of the wrapped store (from Store::name()).
        tier: String,
    },
}

/// Trait for receiving cache metrics.
///
/// Implement this trait to collect metrics from `MetricsStore`.
#[async_trait]
pub trait MetricsSink: Send + Sync {
    /// Emit a single metric.
    ///
    /// This is called synchronously in the hot path of storage operations.
    /// Implementations should be fast (e.g., buffer metrics in memory).
    fn emit(&self, metric: CacheMetric);

    /// Flush any buffered metrics.
    async fn flush(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// A store wrapper that emits metrics for all operations.
///
/// Key enumeration (`keys`) is passed through without a metric.
pub struct MetricsStore {
    inner: Arc<dyn Store>,
    sink: Arc<dyn MetricsSink>,
    tier_name: String,
}

impl MetricsStore {
    /// Create a new MetricsStore wrapping the given store.
    pub fn new(inner: Arc<dyn Store>, sink: Arc<dyn MetricsSink>) -> Self {
        let tier_name = inner.name().to_string();
        MetricsStore {
            inner,
            sink,
            tier_name,
        }
    }

    /// Get a reference to the metrics sink.
    pub fn sink(&self) -> &Arc<dyn MetricsSink> {
        &self.sink
    }

    fn elapsed_ms(start: Instant) -> f64 {
        start.elapsed().as_secs_f64() * 1000.0
    }
}

#[async_trait]
impl Store for MetricsStore {
    fn name(&self) -> &'static str {
        "metrics"
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let start = Instant::now();
        let result = self.inner.get(key).await;
        let latency_ms = Self::elapsed_ms(start);

        self.sink.emit(CacheMetric::Read {
            key: key.to_string(),
            hit: matches!(result, Ok(Some(_))),
            failed: result.is_err(),
            latency_ms,
            tier: self.tier_name.clone(),
        });

        result
    }

    async fn set(&self, key: &str, value: String) -> Result<(), CacheError> {
        let bytes = value.len();
        let start = Instant::now();
        let result = self.inner.set(key, value).await;
        let latency_ms = Self::elapsed_ms(start);

        self.sink.emit(CacheMetric::Write {
            key: key.to_string(),
            bytes,
            failed: result.is_err(),
            latency_ms,
            tier: self.tier_name.clone(),
        });

        result
    }

    async fn remove(&self, keys: &[&str]) -> Result<(), CacheError> {
        let start = Instant::now();
        let result = self.inner.remove(keys).await;
        let latency_ms = Self::elapsed_ms(start);

        self.sink.emit(CacheMetric::Remove {
            key_count: keys.len(),
            first_key: keys.first().map(|k| k.to_string()),
            latency_ms,
            tier: self.tier_name.clone(),
        });

        result
    }

    async fn keys(&self, prefix: &str) -> Result<Vec<String>, CacheError> {
        self.inner.keys(prefix).await
    }
}
