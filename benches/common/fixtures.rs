use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Test data structure for benchmarks
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MediaFile {
    pub id: u64,
    pub name: String,
    pub url: String,
    pub size: u64,
}

impl MediaFile {
    pub fn new(id: u64) -> Self {
        Self {
            id,
            name: format!("clip-{}.mp4", id),
            url: format!("https://media.example.com/clips/{}.mp4", id),
            size: 1_024 * (id % 4096),
        }
    }
}

/// Error returned by the fake API for unknown folders
#[derive(Clone, Debug, PartialEq)]
pub struct ApiError(pub String);

/// Simulated media API with configurable latency
#[derive(Clone)]
pub struct FakeMediaApi {
    folders: Arc<HashMap<String, Vec<MediaFile>>>,
    latency_ms: u64,
    request_count: Arc<AtomicUsize>,
}

impl FakeMediaApi {
    pub fn new(num_folders: usize, latency_ms: u64) -> Self {
        let mut folders = HashMap::new();
        for i in 0..num_folders {
            let files = (0..8).map(|n| MediaFile::new((i * 8 + n) as u64)).collect();
            folders.insert(format!("media:{}", i), files);
        }

        Self {
            folders: Arc::new(folders),
            latency_ms,
            request_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub async fn list_files(&self, key: &str) -> Result<Vec<MediaFile>, ApiError> {
        self.request_count.fetch_add(1, Ordering::Relaxed);

        // Simulate network latency
        tokio::time::sleep(Duration::from_millis(self.latency_ms)).await;

        self.folders
            .get(key)
            .cloned()
            .ok_or_else(|| ApiError(format!("unknown folder {}", key)))
    }

    #[allow(dead_code)]
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::Relaxed)
    }

    #[allow(dead_code)]
    pub fn reset_count(&self) {
        self.request_count.store(0, Ordering::Relaxed);
    }
}

/// Generate test keys for different workload patterns
pub struct KeyGenerator {
    num_keys: usize,
}

impl KeyGenerator {
    pub fn new(num_keys: usize) -> Self {
        Self { num_keys }
    }

    /// Generate sequential keys (for cold cache tests)
    pub fn sequential(&self) -> Vec<String> {
        (0..self.num_keys).map(|i| format!("media:{}", i)).collect()
    }

    /// Generate keys with Zipf distribution (realistic - few hot keys)
    pub fn zipf_random(&self, count: usize) -> Vec<String> {
        let mut rng = rand::thread_rng();
        let mut keys = Vec::with_capacity(count);

        for _ in 0..count {
            // Simplified Zipf: 80% of requests go to 20% of keys
            let key_id = if rng.gen_bool(0.8) {
                rng.gen_range(0..(self.num_keys / 5))
            } else {
                rng.gen_range((self.num_keys / 5)..self.num_keys)
            };
            keys.push(format!("media:{}", key_id));
        }

        keys
    }
}

#[cfg(test)]
mod tests {
    #[tokio::test]
    async fn test_fake_media_api() {
        use super::FakeMediaApi;

        let api = FakeMediaApi::new(10, 1);

        let files = api.list_files("media:0").await.unwrap();
        assert_eq!(files.len(), 8);
        assert!(api.list_files("media:99").await.is_err());

        assert_eq!(api.request_count(), 2);
    }

    #[test]
    fn test_key_generator() {
        use super::KeyGenerator;

        let key_gen = KeyGenerator::new(100);

        let seq = key_gen.sequential();
        assert_eq!(seq.len(), 100);
        assert_eq!(seq[0], "media:0");

        let zipf = key_gen.zipf_random(100);
        assert_eq!(zipf.len(), 100);
    }
}
