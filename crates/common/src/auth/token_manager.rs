//! Token lifecycle management.
//!
//! Owns the per-tenant credential state machine: no token → interactive
//! authorization; valid → served from cache; entered the grace window →
//! silent refresh; refresh exhausted → purge and report `None` so the caller
//! re-prompts.
//!
//! Expiry math uses the locally recorded `issued_at` only (refresh-grant
//! responses carry no reliable expiry), and the refresh/grace windows come
//! from configuration, never from the token.
//!
//! Concurrent refreshes for one tenant are not serialized. Both the
//! proactive path (`ensure_token`) and the 401 recovery path
//! ([`TokenRefresher`]) may fire together; the token cache is
//! last-write-wins and the platform tolerates back-to-back refresh grants
//! with the same refresh token.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::cache::{CacheOptions, ScopedCache, StorageBackend};
use crate::settings::FeatureFlags;
use crate::tenant;
use crate::time::{Clock, SystemClock};

use super::client::OAuthClient;
use super::error::AuthError;
use super::pkce::PkcePair;
use super::traits::{AuthFlowHost, TokenRefresher};
use super::types::{AuthConfig, Token, SCOPE_WEB, TOKEN_CACHE_KEY};

/// Orchestrates interactive authorization, silent refresh, and scope
/// renegotiation for every tenant.
pub struct TokenManager {
    client: OAuthClient,
    storage: Arc<dyn StorageBackend>,
    flow_host: Arc<dyn AuthFlowHost>,
    flags: Arc<dyn FeatureFlags>,
    clock: Arc<dyn Clock>,
}

impl TokenManager {
    /// Create a manager using the system clock.
    #[must_use]
    pub fn new(
        config: AuthConfig,
        storage: Arc<dyn StorageBackend>,
        flow_host: Arc<dyn AuthFlowHost>,
        flags: Arc<dyn FeatureFlags>,
    ) -> Self {
        Self::with_clock(config, storage, flow_host, flags, Arc::new(SystemClock))
    }

    /// Create a manager with an injected clock (used by tests).
    #[must_use]
    pub fn with_clock(
        config: AuthConfig,
        storage: Arc<dyn StorageBackend>,
        flow_host: Arc<dyn AuthFlowHost>,
        flags: Arc<dyn FeatureFlags>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { client: OAuthClient::new(config), storage, flow_host, flags, clock }
    }

    fn config(&self) -> &AuthConfig {
        self.client.config()
    }

    /// Token cache scoped by the canonical identity of `tenant`.
    fn token_cache(&self, tenant: &str) -> ScopedCache {
        ScopedCache::with_clock(
            tenant::lightning_hostname(tenant),
            Arc::clone(&self.storage),
            Arc::clone(&self.clock),
        )
    }

    /// Launch the interactive OAuth2-PKCE flow and store the token.
    ///
    /// The requested scope set is the configured base set, plus `web` when
    /// the auto-login feature is enabled. The PKCE pair lives for exactly
    /// this one attempt.
    pub async fn interactive_login(&self, tenant: &str) -> Result<Token, AuthError> {
        let pkce = PkcePair::generate();
        let scopes = self.requested_scopes().await;
        let auth_url = self.client.authorization_url(tenant, &scopes, &pkce);
        info!(%tenant, "starting interactive authorization");

        let redirect = self.flow_host.launch_auth_flow(&auth_url).await?;
        let code = OAuthClient::parse_callback(&redirect)?;
        let response = self.client.exchange_code(tenant, &code, &pkce.verifier).await?;

        let token = Token::from_response(response, self.clock.now_millis());
        self.store_token(&token).await?;
        Ok(token)
    }

    /// Return a usable token for `tenant`.
    ///
    /// `None` means no credential exists (never stored, or purged by a
    /// failed refresh) and interactive authorization is required. A token
    /// that has entered the grace window is refreshed before being
    /// returned.
    pub async fn ensure_token(&self, tenant: &str) -> Result<Option<Token>, AuthError> {
        debug!(%tenant, "ensuring token");
        let Some(token) = self.token_cache(tenant).get::<Token>(TOKEN_CACHE_KEY).await? else {
            return Ok(None);
        };

        let age = token.age_millis(self.clock.now_millis());
        let proactive_window = self.config().refresh_window.as_millis() as i64
            - self.config().grace_window.as_millis() as i64;
        if age < proactive_window {
            return Ok(Some(token));
        }

        debug!(%tenant, age_millis = age, "token entered grace window");
        self.refresh_token(tenant).await
    }

    /// Force-refresh the cached token for `tenant`.
    ///
    /// Clears the cached token and returns `None` when no refresh token is
    /// available or the endpoint rejects the grant; stale credentials are
    /// never served again. Transport failures propagate without touching
    /// the cache.
    pub async fn refresh_token(&self, tenant: &str) -> Result<Option<Token>, AuthError> {
        let cache = self.token_cache(tenant);
        let previous = cache.get::<Token>(TOKEN_CACHE_KEY).await?;
        let Some(previous) = previous else {
            cache.clear(TOKEN_CACHE_KEY).await?;
            return Ok(None);
        };
        let Some(refresh_token) = previous.refresh_token.clone().filter(|t| !t.is_empty()) else {
            warn!(%tenant, "no refresh token available, clearing credential");
            cache.clear(TOKEN_CACHE_KEY).await?;
            return Ok(None);
        };

        info!(%tenant, "refreshing access token");
        match self.client.refresh_grant(&previous.instance_url, &refresh_token).await {
            Ok(response) => {
                // Refresh responses may omit the refresh token and scope;
                // carry the previous values forward so they survive the
                // full lifecycle.
                let merged = Token {
                    access_token: response.access_token,
                    refresh_token: response.refresh_token.or(Some(refresh_token)),
                    instance_url: response.instance_url,
                    scope: response.scope.or(previous.scope),
                    token_type: response.token_type.unwrap_or(previous.token_type),
                    id_token: response.id_token.or(previous.id_token),
                    issued_at: self.clock.now_millis(),
                };
                self.store_token(&merged).await?;
                Ok(Some(merged))
            }
            Err(err) if err.is_token_endpoint_rejection() => {
                warn!(%tenant, %err, "token refresh rejected, clearing credential");
                cache.clear(TOKEN_CACHE_KEY).await?;
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    /// Ensure a token able to bootstrap a web session.
    ///
    /// Used by the auto-login feature: ensures a credential,
    /// force-refreshes it, and when auto-login is enabled but the `web`
    /// scope is missing, renegotiates through a full interactive login.
    /// Returns the best token obtained, or `None` if none exists.
    pub async fn ensure_web_scoped_token(&self, tenant: &str) -> Result<Option<Token>, AuthError> {
        let Some(ensured) = self.ensure_token(tenant).await? else {
            return Ok(None);
        };
        let token = self.refresh_token(tenant).await?.unwrap_or(ensured);

        if self.flags.auto_login_enabled().await && !token.has_scope(SCOPE_WEB) {
            info!(%tenant, "granted scope lacks web, renegotiating interactively");
            return self.interactive_login(tenant).await.map(Some);
        }
        Ok(Some(token))
    }

    /// Persist `token` keyed by the canonical tenant of its instance URL.
    ///
    /// Awaited by every caller: a lifecycle operation never returns before
    /// the store it depends on has completed.
    async fn store_token(&self, token: &Token) -> Result<(), AuthError> {
        let cache = self.token_cache(&token.instance_url);
        cache.set(TOKEN_CACHE_KEY, token, CacheOptions::preserved()).await?;
        debug!(tenant = %token.tenant(), "token stored");
        Ok(())
    }

    async fn requested_scopes(&self) -> String {
        let mut scopes = self.config().base_scopes.clone();
        if self.flags.auto_login_enabled().await && !scopes.iter().any(|s| s == SCOPE_WEB) {
            scopes.push(SCOPE_WEB.to_string());
        }
        scopes.join(" ")
    }
}

#[async_trait]
impl TokenRefresher for TokenManager {
    async fn refresh_token(&self, tenant: &str) -> Result<Option<Token>, AuthError> {
        Self::refresh_token(self, tenant).await
    }
}
