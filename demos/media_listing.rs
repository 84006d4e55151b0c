//! Example: caching a media-folder listing behind a slow API.
//!
//! Shows concurrent callers sharing one request, the cooldown serving an
//! expired listing instead of refetching, and storage metrics from a
//! `MetricsStore`.
//!
//! Run with `RUST_LOG=cooldown_cache=debug` to see the cache's decisions.

use async_trait::async_trait;
use cooldown_cache::{
    CacheMetric, HashMapStore, MetricsSink, MetricsStore, RequestCache, Store,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Clone, Debug, Serialize, Deserialize)]
struct MediaFile {
    id: u64,
    name: String,
    url: String,
}

#[derive(Clone, Debug)]
struct ApiError(String);

/// Stand-in for a remote media API.
#[derive(Clone, Default)]
struct MediaApi {
    requests: Arc<AtomicUsize>,
}

impl MediaApi {
    async fn list_files(&self, folder: &str) -> Result<Vec<MediaFile>, ApiError> {
        let n = self.requests.fetch_add(1, Ordering::SeqCst) + 1;
        info!("GET /folders/{}/files (request #{})", folder, n);
        tokio::time::sleep(Duration::from_millis(200)).await;

        if folder == "missing" {
            return Err(ApiError(format!("folder {} not found", folder)));
        }
        Ok((1..=3)
            .map(|id| MediaFile {
                id,
                name: format!("clip-{}.mp4", id),
                url: format!("https://media.example.com/{}/{}.mp4", folder, id),
            })
            .collect())
    }
}

/// Logs every storage operation.
struct LogSink;

#[async_trait]
impl MetricsSink for LogSink {
    fn emit(&self, metric: CacheMetric) {
        info!("storage metric: {:?}", metric);
    }

    async fn flush(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "media_listing=info,cooldown_cache=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let store: Arc<dyn Store> = Arc::new(MetricsStore::new(
        Arc::new(HashMapStore::default()),
        Arc::new(LogSink),
    ));
    let cache = RequestCache::builder()
        .store(store)
        .cooldown(Duration::from_secs(2))
        .build();
    let api = MediaApi::default();

    // Three widgets ask for the same folder at once
    let media = cache.namespace::<Vec<MediaFile>>("media", Duration::from_millis(500));
    let requests = (0..3).map(|_| {
        let media = media.clone();
        let api = api.clone();
        async move {
            media
                .get_or_set("42", move |id| async move { api.list_files(&id).await })
                .await
        }
    });
    let results = futures::future::join_all(requests).await;
    info!(
        "{} callers, {} files each, {} API request(s)",
        results.len(),
        results[0].as_ref().map(Vec::len).unwrap_or(0),
        api.requests.load(Ordering::SeqCst)
    );

    // Past the TTL but inside the cooldown: the expired listing is served
    tokio::time::sleep(Duration::from_millis(700)).await;
    let files = {
        let api = api.clone();
        media
            .get_or_set("42", move |id| async move { api.list_files(&id).await })
            .await
    };
    info!(
        "Within cooldown: {} files, {} API request(s)",
        files.map(|f| f.len()).unwrap_or(0),
        api.requests.load(Ordering::SeqCst)
    );

    // Cooldown over: the next lookup goes back to the API
    tokio::time::sleep(Duration::from_secs(2)).await;
    let files = {
        let api = api.clone();
        media
            .get_or_set("42", move |id| async move { api.list_files(&id).await })
            .await
    };
    info!(
        "After cooldown: {} files, {} API request(s)",
        files.map(|f| f.len()).unwrap_or(0),
        api.requests.load(Ordering::SeqCst)
    );

    // Errors reach the caller and are not cached
    let missing = {
        let api = api.clone();
        media
            .get_or_set("missing", move |id| async move { api.list_files(&id).await })
            .await
    };
    if let Err(ApiError(message)) = missing {
        info!("Lookup failed: {}", message);
    }

    cache.clear_all().await;
    Ok(())
}
