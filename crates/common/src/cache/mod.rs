//! Tenant-scoped caching over a host-provided persistent store.
//!
//! The host environment supplies a flat asynchronous key/value store (in the
//! browser build that is `chrome.storage.local`); [`ScopedCache`] namespaces
//! it per tenant so the same logical org never splits across inconsistent
//! entries. Expiry is lazy: nothing sweeps in the background, and a read past
//! the expiry timestamp behaves as a miss and deletes the entry.
//!
//! Entries carry a `preserve` marker. [`ScopedCache::clear_all`] wipes every
//! non-preserved entry across all scopes; tokens and user settings are stored
//! preserved so routine invalidation never logs a tenant out.

mod scoped;
mod storage;

pub use scoped::{CacheEntry, CacheOptions, ScopedCache};
pub use storage::StorageBackend;

use thiserror::Error;

/// Error type for cache operations.
///
/// Storage I/O failures propagate to the caller untouched; this layer
/// performs no retries.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Underlying storage backend failed.
    #[error("storage backend error: {0}")]
    Storage(String),

    /// Entry (de)serialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
