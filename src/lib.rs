//! cooldown-cache - A read-through request cache for Rust
//!
//! This library provides a caching layer for API responses with:
//! - Fresh reads from an in-memory mirror backed by a durable store
//! - Deduplication of concurrent fetches for the same key
//! - Cooldown-based throttling that serves stale data instead of refetching
//! - Storage failures that degrade to cache misses, never to caller errors
//!
//! # Example
//!
//! ```ignore
//! use cooldown_cache::{HashMapStore, RequestCache};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() {
//!     let cache = RequestCache::new(Arc::new(HashMapStore::default()));
//!
//!     // Concurrent callers for "media:42" share one request
//!     let files = cache
//!         .get_or_set("media:42", Duration::from_secs(300), || async {
//!             api.list_files(42).await
//!         })
//!         .await?;
//!
//!     // Typed handle for a family of keys
//!     let media = cache.namespace::<Vec<MediaFile>>("media", Duration::from_secs(300));
//!     let files = media.get_or_set("42", |id| async move { api.list_files(&id).await }).await?;
//! }
//! ```

mod builder;
mod cache;
mod cooldown;
mod durable;
mod entry;
mod error;
mod inflight;
mod mirror;
mod namespace;
mod store;
pub mod stores;
mod utils;

// Re-export public API
pub use builder::{CacheBuilder, CacheConfig};
pub use cache::{LookupStatus, RequestCache};
pub use cooldown::DEFAULT_COOLDOWN;
pub use entry::Entry;
pub use error::CacheError;
pub use mirror::DEFAULT_MEMORY_CAPACITY;
pub use namespace::Namespace;
pub use store::Store;
pub use stores::memory::{HashMapStore, HashMapStoreConfig};
pub use stores::metrics::{CacheMetric, MetricsSink, MetricsStore};
pub use stores::redis::{RedisStore, RedisStoreConfig};
