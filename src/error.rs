/// Error type for storage operations.
///
/// Produced by [`Store`](crate::Store) implementations. The cache itself recovers
/// from these at the storage boundary; they never reach `RequestCache` callers.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CacheError {
    /// A storage operation failed.
    #[error("[{tier}] storage error for key '{key}': {message}")]
    Operation {
        tier: String,
        key: String,
        message: String,
    },
    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl CacheError {
    /// Create a new operation error.
    pub fn operation(
        tier: impl Into<String>,
        key: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        CacheError::Operation {
            tier: tier.into(),
            key: key.into(),
            message: message.into(),
        }
    }
}
