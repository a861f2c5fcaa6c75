//! Persisted settings and feature flags.
//!
//! Only the surface the auth flows consume lives here: the auto-login
//! feature flag. It persists under the global cache scope with the preserve
//! marker, so bulk cache invalidation never flips a user's choice. The host
//! product's full settings schema stays outside this core.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cache::{CacheError, CacheOptions, ScopedCache, StorageBackend};

/// Scope for settings shared across tenants.
pub const GLOBAL_CACHE_SCOPE: &str = "global";

/// Cache key settings persist under.
pub const SETTINGS_CACHE_KEY: &str = "settings";

/// Feature flags the token lifecycle consults.
#[async_trait]
pub trait FeatureFlags: Send + Sync {
    /// Whether the auto-login feature (web-scoped tokens) is enabled.
    async fn auto_login_enabled(&self) -> bool;
}

/// User-facing settings relevant to this core.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Opt-in for automatic web session bootstrap.
    #[serde(default)]
    pub auto_login: bool,
}

/// Cache-backed settings store.
pub struct SettingsStore {
    cache: ScopedCache,
}

impl SettingsStore {
    /// Create a store over the host storage backend.
    #[must_use]
    pub fn new(storage: Arc<dyn StorageBackend>) -> Self {
        Self { cache: ScopedCache::new(GLOBAL_CACHE_SCOPE, storage) }
    }

    /// Load settings, falling back to defaults when nothing is stored.
    pub async fn load(&self) -> Result<Settings, CacheError> {
        Ok(self.cache.get::<Settings>(SETTINGS_CACHE_KEY).await?.unwrap_or_default())
    }

    /// Persist settings. Stored preserved so bulk clears keep them.
    pub async fn save(&self, settings: &Settings) -> Result<(), CacheError> {
        debug!(auto_login = settings.auto_login, "saving settings");
        self.cache.set(SETTINGS_CACHE_KEY, settings, CacheOptions::preserved()).await
    }
}

#[async_trait]
impl FeatureFlags for SettingsStore {
    async fn auto_login_enabled(&self) -> bool {
        self.load().await.map(|settings| settings.auto_login).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for settings.
    use super::*;
    use crate::cache::StorageBackend as _;
    use crate::testing::MemoryStorage;

    #[tokio::test]
    async fn load_defaults_when_nothing_stored() {
        let store = SettingsStore::new(Arc::new(MemoryStorage::new()));
        let settings = store.load().await.unwrap();
        assert!(!settings.auto_login);
        assert!(!store.auto_login_enabled().await);
    }

    #[tokio::test]
    async fn save_then_load_roundtrip() {
        let store = SettingsStore::new(Arc::new(MemoryStorage::new()));

        store.save(&Settings { auto_login: true }).await.unwrap();

        assert!(store.load().await.unwrap().auto_login);
        assert!(store.auto_login_enabled().await);
    }

    /// Settings survive a bulk cache clear.
    #[tokio::test]
    async fn settings_are_preserved_across_clear_all() {
        let storage = MemoryStorage::new();
        let store = SettingsStore::new(Arc::new(storage.clone()));
        store.save(&Settings { auto_login: true }).await.unwrap();

        ScopedCache::clear_all(&storage).await.unwrap();

        assert!(store.auto_login_enabled().await);
    }

    /// A corrupt settings record degrades to defaults instead of failing.
    #[tokio::test]
    async fn corrupt_settings_degrade_to_defaults() {
        let storage = MemoryStorage::new();
        storage.set("global_settings", "{broken".to_string()).await.unwrap();
        let store = SettingsStore::new(Arc::new(storage));

        assert!(!store.auto_login_enabled().await);
    }
}
