//! In-memory fakes for unit and integration tests.
//!
//! Lives in the library proper (not behind `cfg(test)`) so downstream
//! crates' integration tests can reuse the same fakes against the real
//! lifecycle types.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::auth::{AuthError, AuthFlowHost};
use crate::cache::{CacheError, StorageBackend};
use crate::settings::FeatureFlags;
use crate::time::Clock;

/// Hash-map storage backend mirroring the host KV store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStorage {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw stored value, bypassing the cache envelope.
    #[must_use]
    pub fn raw(&self, key: &str) -> Option<String> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    /// Whether a raw key is present.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.lock().unwrap().contains_key(key)
    }

    /// Number of stored entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl StorageBackend for MemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<(), CacheError> {
        self.entries.lock().unwrap().insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), CacheError> {
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>, CacheError> {
        Ok(self.entries.lock().unwrap().keys().cloned().collect())
    }
}

/// Clock pinned to a manually advanced instant.
#[derive(Debug, Clone)]
pub struct MockClock {
    now_millis: Arc<Mutex<i64>>,
}

impl MockClock {
    /// Create a clock frozen at `start_millis`.
    #[must_use]
    pub fn new(start_millis: i64) -> Self {
        Self { now_millis: Arc::new(Mutex::new(start_millis)) }
    }

    /// Move the clock forward by `delta`.
    pub fn advance(&self, delta: Duration) {
        *self.now_millis.lock().unwrap() += delta.as_millis() as i64;
    }

    /// Move the clock forward by `delta_millis` (may be negative).
    pub fn advance_millis(&self, delta_millis: i64) {
        *self.now_millis.lock().unwrap() += delta_millis;
    }

    /// Pin the clock to an absolute instant.
    pub fn set(&self, now_millis: i64) {
        *self.now_millis.lock().unwrap() = now_millis;
    }
}

impl Clock for MockClock {
    fn now_millis(&self) -> i64 {
        *self.now_millis.lock().unwrap()
    }
}

#[derive(Debug)]
enum Script {
    Redirect(String),
    Cancel(String),
}

/// Scripted interactive flow host.
///
/// Resolves with a canned redirect URL (or a scripted cancellation) and
/// records every authorization URL it was asked to open.
#[derive(Debug)]
pub struct ScriptedFlowHost {
    script: Script,
    launched: Mutex<Vec<String>>,
}

impl ScriptedFlowHost {
    /// Host that completes the flow on `redirect_url`.
    #[must_use]
    pub fn redirecting(redirect_url: impl Into<String>) -> Self {
        Self { script: Script::Redirect(redirect_url.into()), launched: Mutex::new(Vec::new()) }
    }

    /// Host that simulates the user closing the popup.
    #[must_use]
    pub fn cancelling(reason: impl Into<String>) -> Self {
        Self { script: Script::Cancel(reason.into()), launched: Mutex::new(Vec::new()) }
    }

    /// Authorization URLs opened so far, in order.
    #[must_use]
    pub fn launched(&self) -> Vec<String> {
        self.launched.lock().unwrap().clone()
    }
}

#[async_trait]
impl AuthFlowHost for ScriptedFlowHost {
    async fn launch_auth_flow(&self, auth_url: &str) -> Result<String, AuthError> {
        self.launched.lock().unwrap().push(auth_url.to_string());
        match &self.script {
            Script::Redirect(url) => Ok(url.clone()),
            Script::Cancel(reason) => Err(AuthError::cancelled(reason.clone())),
        }
    }
}

/// Fixed feature flags.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticFlags {
    /// Value returned for the auto-login flag.
    pub auto_login: bool,
}

impl StaticFlags {
    /// Flags with auto-login enabled.
    #[must_use]
    pub fn auto_login() -> Self {
        Self { auto_login: true }
    }
}

#[async_trait]
impl FeatureFlags for StaticFlags {
    async fn auto_login_enabled(&self) -> bool {
        self.auto_login
    }
}
