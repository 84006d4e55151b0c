//! Shared utilities for the cache library.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Build a composite cache key from namespace and key.
///
/// Format: `{namespace}:{key}`
pub fn build_cache_key(namespace: &str, key: &str) -> String {
    format!("{}:{}", namespace, key)
}

/// Build a storage key from a prefix and a cache key.
///
/// Format: `{prefix}{key}`, e.g. `cache:` + `media:42`.
pub fn prefixed_key(prefix: &str, key: &str) -> String {
    format!("{}{}", prefix, key)
}

/// Get the current time in milliseconds since UNIX epoch.
pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// Convert a duration into milliseconds, saturating at `i64::MAX`.
pub fn duration_ms(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}
