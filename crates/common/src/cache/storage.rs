//! Host storage abstraction.

use async_trait::async_trait;

use super::CacheError;

/// Namespaced async key/value store supplied by the host environment.
///
/// The cache treats it as a black box honoring read-after-write consistency
/// within a single process. Implementations surface their own I/O failures
/// as [`CacheError::Storage`].
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Fetch the raw value stored under `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Store `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: String) -> Result<(), CacheError>;

    /// Remove the value stored under `key` (idempotent).
    async fn remove(&self, key: &str) -> Result<(), CacheError>;

    /// Enumerate every key currently stored, across all scopes.
    async fn keys(&self) -> Result<Vec<String>, CacheError>;
}
