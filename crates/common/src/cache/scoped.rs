//! Scoped cache with lazy expiry and preserve-aware bulk clearing.

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{CacheError, StorageBackend};
use crate::time::{Clock, SystemClock};

/// Persisted envelope around a cached value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// The cached value, stored as raw JSON.
    pub value: serde_json::Value,

    /// Absolute expiry in epoch milliseconds. Absent = never expires.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,

    /// Preserved entries survive [`ScopedCache::clear_all`].
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub preserve: bool,
}

/// Options controlling how an entry is stored.
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheOptions {
    /// Time-to-live. `None` stores an entry that never expires until
    /// explicitly cleared.
    pub ttl: Option<Duration>,

    /// Exempt the entry from [`ScopedCache::clear_all`].
    pub preserve: bool,
}

impl CacheOptions {
    /// Entry that never expires and survives bulk clears.
    #[must_use]
    pub fn preserved() -> Self {
        Self { ttl: None, preserve: true }
    }

    /// Entry expiring after `ttl`, removed by bulk invalidation.
    #[must_use]
    pub fn with_ttl(ttl: Duration) -> Self {
        Self { ttl: Some(ttl), preserve: false }
    }
}

/// Tenant-scoped view over the shared storage backend.
///
/// Two caches with different scopes never collide: keys are namespaced as
/// `{scope}_{key}` before they reach the backend.
#[derive(Clone)]
pub struct ScopedCache {
    scope: String,
    storage: Arc<dyn StorageBackend>,
    clock: Arc<dyn Clock>,
}

impl ScopedCache {
    /// Create a cache scoped to `scope` using the system clock.
    pub fn new(scope: impl Into<String>, storage: Arc<dyn StorageBackend>) -> Self {
        Self::with_clock(scope, storage, Arc::new(SystemClock))
    }

    /// Create a cache with an injected clock (used by tests).
    pub fn with_clock(
        scope: impl Into<String>,
        storage: Arc<dyn StorageBackend>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { scope: scope.into(), storage, clock }
    }

    fn scoped_key(&self, key: &str) -> String {
        format!("{}_{}", self.scope, key)
    }

    /// Read a value, treating absent, malformed, and expired entries as
    /// misses. An expired read deletes the entry before returning.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CacheError> {
        let scoped = self.scoped_key(key);
        let Some(raw) = self.storage.get(&scoped).await? else {
            return Ok(None);
        };
        let entry: CacheEntry = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(err) => {
                debug!(key = %scoped, %err, "ignoring malformed cache entry");
                return Ok(None);
            }
        };
        if let Some(expires_at) = entry.expires_at {
            if self.clock.now_millis() > expires_at {
                let expired_at = Utc
                    .timestamp_millis_opt(expires_at)
                    .single()
                    .map(|dt| dt.to_rfc3339())
                    .unwrap_or_else(|| expires_at.to_string());
                debug!(key = %scoped, %expired_at, "cache entry expired");
                self.storage.remove(&scoped).await?;
                return Ok(None);
            }
        }
        match serde_json::from_value(entry.value) {
            Ok(value) => Ok(Some(value)),
            Err(err) => {
                debug!(key = %scoped, %err, "cached value does not match requested shape");
                Ok(None)
            }
        }
    }

    /// Store a value. Without a ttl the entry lives until explicitly
    /// cleared.
    pub async fn set<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        options: CacheOptions,
    ) -> Result<(), CacheError> {
        let expires_at = options.ttl.map(|ttl| self.clock.now_millis() + ttl.as_millis() as i64);
        let entry = CacheEntry {
            value: serde_json::to_value(value)?,
            expires_at,
            preserve: options.preserve,
        };
        let scoped = self.scoped_key(key);
        debug!(key = %scoped, ?expires_at, preserve = options.preserve, "caching entry");
        self.storage.set(&scoped, serde_json::to_string(&entry)?).await
    }

    /// Remove a single entry.
    pub async fn clear(&self, key: &str) -> Result<(), CacheError> {
        let scoped = self.scoped_key(key);
        debug!(key = %scoped, "clearing cache entry");
        self.storage.remove(&scoped).await
    }

    /// Remove every non-preserved entry, across all scopes.
    ///
    /// Entries that fail to parse count as non-preserved and are removed.
    pub async fn clear_all(storage: &dyn StorageBackend) -> Result<(), CacheError> {
        for key in storage.keys().await? {
            let preserved = match storage.get(&key).await? {
                Some(raw) => serde_json::from_str::<CacheEntry>(&raw)
                    .map(|entry| entry.preserve)
                    .unwrap_or(false),
                None => false,
            };
            if preserved {
                continue;
            }
            debug!(key = %key, "bulk-clearing cache entry");
            storage.remove(&key).await?;
        }
        Ok(())
    }
}
