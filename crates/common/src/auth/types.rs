//! OAuth token and configuration types.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::tenant;

/// Cache key a tenant's token is stored under (scoped by canonical tenant).
pub const TOKEN_CACHE_KEY: &str = "sfToken";

/// Scope granting web session bootstrap, required by the auto-login feature.
pub const SCOPE_WEB: &str = "web";

/// Scopes requested on every interactive authorization.
pub const BASE_SCOPES: &[&str] = &["api", "refresh_token"];

/// Time after issuance when the platform stops honoring the access token.
/// Mirrors the connected app's configured session timeout.
pub const DEFAULT_REFRESH_WINDOW: Duration = Duration::from_secs(24 * 3600);

/// Margin before the refresh window ends: tokens older than
/// `refresh_window - grace_window` are refreshed proactively instead of used
/// until failure.
pub const DEFAULT_GRACE_WINDOW: Duration = Duration::from_secs(4 * 3600);

fn bearer() -> String {
    "Bearer".to_string()
}

/// Tenant credential bundle.
///
/// Always stored keyed by the canonical tenant identity it was issued for,
/// and always replaced whole, never field-patched. `issued_at` is stamped
/// from the local clock at persistence time; refresh responses carry no
/// reliable expiry, so all age math stays local.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    /// Opaque bearer credential for API calls.
    pub access_token: String,

    /// Long-lived credential for silent refresh. Some refresh responses do
    /// not re-issue one; the previous value is carried forward then.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// Base URL of the issuing instance.
    pub instance_url: String,

    /// Space-delimited granted capability set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    /// Token type (always "Bearer" in practice).
    #[serde(default = "bearer")]
    pub token_type: String,

    /// OpenID Connect identity token, present when `openid` was granted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,

    /// Epoch milliseconds at which this client persisted the token.
    pub issued_at: i64,
}

impl Token {
    /// Build a token from a wire response, stamping `issued_at` locally.
    #[must_use]
    pub fn from_response(response: TokenResponse, issued_at: i64) -> Self {
        Self {
            access_token: response.access_token,
            refresh_token: response.refresh_token,
            instance_url: response.instance_url,
            scope: response.scope,
            token_type: response.token_type.unwrap_or_else(bearer),
            id_token: response.id_token,
            issued_at,
        }
    }

    /// Milliseconds elapsed since this token was persisted.
    #[must_use]
    pub fn age_millis(&self, now_millis: i64) -> i64 {
        now_millis - self.issued_at
    }

    /// Whether the granted scope set contains `scope`.
    #[must_use]
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scope
            .as_deref()
            .is_some_and(|granted| granted.split_whitespace().any(|part| part == scope))
    }

    /// Canonical tenant this token belongs to, derived from its instance
    /// URL.
    #[must_use]
    pub fn tenant(&self) -> String {
        tenant::lightning_hostname(&self.instance_url)
    }
}

/// Token endpoint response (RFC 6749 §5.1, Salesforce flavor).
///
/// `refresh_token` is present on the authorization-code grant and only
/// sometimes re-issued on refresh.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub instance_url: String,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub id_token: Option<String>,
}

/// Token endpoint error response (RFC 6749 §5.2).
#[derive(Debug, Deserialize)]
pub struct OAuthErrorResponse {
    pub error: String,
    #[serde(default)]
    pub error_description: Option<String>,
}

/// Configuration for the OAuth flows of one deployment.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Connected app consumer key.
    pub client_id: String,

    /// Redirect URI registered for the connected app.
    pub redirect_uri: String,

    /// Scopes requested on interactive authorization. The auto-login
    /// feature appends [`SCOPE_WEB`] at request time.
    pub base_scopes: Vec<String>,

    /// See [`DEFAULT_REFRESH_WINDOW`].
    pub refresh_window: Duration,

    /// See [`DEFAULT_GRACE_WINDOW`].
    pub grace_window: Duration,

    /// Override for the authorization base URL. `None` derives the tenant's
    /// Lightning URL. Used by tests and reverse-proxy deployments.
    pub authorize_base_url: Option<String>,

    /// Override for the token base URL. `None` derives the tenant's core
    /// URL.
    pub token_base_url: Option<String>,
}

impl AuthConfig {
    /// Configuration with production windows and base scopes.
    #[must_use]
    pub fn new(client_id: impl Into<String>, redirect_uri: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            redirect_uri: redirect_uri.into(),
            base_scopes: BASE_SCOPES.iter().map(|scope| (*scope).to_string()).collect(),
            refresh_window: DEFAULT_REFRESH_WINDOW,
            grace_window: DEFAULT_GRACE_WINDOW,
            authorize_base_url: None,
            token_base_url: None,
        }
    }

    pub(crate) fn authorize_base(&self, tenant: &str) -> String {
        self.authorize_base_url.clone().unwrap_or_else(|| tenant::lightning_url(tenant))
    }

    pub(crate) fn token_base(&self, tenant: &str) -> String {
        self.token_base_url.clone().unwrap_or_else(|| tenant::core_url(tenant))
    }
}
